//! Primitive controls: enough to build and test real trees.

mod fill;
mod panel;
mod text;

pub use fill::Fill;
pub use panel::Panel;
pub use text::TextBlock;
