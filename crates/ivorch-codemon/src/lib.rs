mod diff;
pub mod editor;
mod monitor;

pub use editor::{EditorSurface, HttpEditorSurface, RawEditorRead, SelectorConfig};
pub use monitor::{CodeMonitor, CodemonOutcome};
