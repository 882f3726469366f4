pub mod double_buffer;
pub mod source;

pub use double_buffer::{DoubleBuffer, LoadPage, RENDER_TIMEOUT, Slot};
pub use source::{PresentationTarget, resolve_presentation};
