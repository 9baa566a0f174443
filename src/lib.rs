// Keyshift - Lane-count conversion for vertical rhythm-game charts
// Module declarations

pub mod chart;
pub mod convert;
pub mod error;
pub mod groove;
pub mod matrix;
pub mod pipeline;

pub use chart::{build_matrix, convert_chart, materialize, Chart, ChartNote, UniformLayout};
pub use convert::{Conversion, ConversionReport, ConversionSettings, LaneConverter, TransformSpeed};
pub use error::ConvertError;
pub use matrix::{NoteMatrix, TimeAxis};
