//! Cell buffers, compositing and the path to the terminal.
//!
//! Every control renders into its own [`RenderingBuffer`]. The [`Renderer`]
//! composites children into their parents by opacity code, tracks which
//! areas changed and pushes only that damage through the [`PhysicalCanvas`].

pub mod buffer;
pub mod canvas;
pub mod renderer;

pub use buffer::{RenderingBuffer, compose_cell};
pub use canvas::{CrosstermPainter, MemoryPainter, Painter, PhysicalCanvas};
pub use renderer::{LayoutReport, Renderer};
