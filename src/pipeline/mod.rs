//! The UI thread and what feeds it.
//!
//! ```text
//! InputReader ──post──▶ Dispatcher ──drain──▶ EventManager
//!                          ▲                      │
//! AutoRepeat timer ──post──┘                      ▼
//!                               terminal ◀──flush── Renderer
//! ```

pub mod dispatcher;
pub mod host;
pub mod reader;
pub mod terminal;

pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use host::{Host, Ui};
pub use reader::InputReader;
pub use terminal::{TerminalSetup, terminal_size};
