// Note Matrix - Data model shared by every conversion pass
// Grid of note identifiers plus the row time axis

pub mod note_matrix;
pub mod time_axis;

pub use note_matrix::{is_head, NoteMatrix, EMPTY, HOLD_BODY};
pub use time_axis::TimeAxis;
