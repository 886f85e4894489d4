//! # spark-retained
//!
//! Retained-mode terminal UI core.
//!
//! Controls live in an arena ([`ControlTree`]) and are laid out with a
//! two-pass Measure/Arrange protocol. Each control renders into its own
//! buffer; buffers are composited upward through eight opacity codes, and
//! only the damaged region of the canvas is flushed to the terminal.
//! Keyboard and mouse input is routed through the tree as tunnel/bubble
//! events with capture, enter/leave tracking and focus scopes.
//!
//! ## Architecture
//!
//! ```text
//! InputRecord → EventManager (tunnel → bubble) → handlers invalidate
//!             → Renderer::update_layout (Measure/Arrange/render/composite)
//!             → Renderer::finally_apply_changes_to_canvas (one flush)
//! ```
//!
//! ## Modules
//!
//! - [`geometry`] - Point, Vector, Size, Rect, Thickness
//! - [`types`] - Cell, Rgba, Attr, Opacity codes
//! - [`control`] - Control traits and the arena tree
//! - [`layout`] - LayoutInfo, Measure/Arrange, FlexPanel
//! - [`render`] - RenderingBuffer, PhysicalCanvas, Renderer
//! - [`events`] - Routed events, EventManager, focus, auto-repeat
//! - [`pipeline`] - Dispatcher, host loop, input reader, terminal setup
//! - [`controls`] - Panel, Fill, TextBlock

pub mod config;
pub mod control;
pub mod controls;
pub mod error;
pub mod events;
pub mod geometry;
pub mod layout;
pub mod pipeline;
pub mod render;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::Config;

pub use error::{Error, Result, UsageError, fatal};

pub use geometry::{Point, Rect, Size, Thickness, Vector};

pub use control::{
    Control, ControlId, ControlTree, HorizontalAlignment, Layout, LayoutProps, Render,
    VerticalAlignment, Visibility,
};

pub use layout::{FlexPanel, LayoutContext, LayoutInfo, LayoutValidity, arrange, measure};

pub use render::{
    CrosstermPainter, LayoutReport, MemoryPainter, Painter, PhysicalCanvas, Renderer,
    RenderingBuffer,
};

pub use events::{
    BuiltinEvents, EventContext, EventData, EventManager, Handler, InputRecord, KeyRecord,
    Modifiers, MouseButtons, MouseRecord, RoutedEvent, RoutedEventArgs, RoutingStrategy,
    VirtualKey, handler,
};

pub use pipeline::{Dispatcher, DispatcherHandle, Host, Ui};

pub use controls::{Fill, Panel, TextBlock};
