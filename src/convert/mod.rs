// Lane Conversion Engine
// Adds or removes lanes from a note matrix, then corrects row density

pub mod addition;
pub mod density;
pub mod orchestrator;
pub mod oscillator;
pub mod removal;
pub mod report;
pub mod settings;

pub use addition::add_lanes;
pub use density::{correct_density, row_target, RemovalLedger};
pub use orchestrator::{Conversion, LaneConverter};
pub use oscillator::OscillatingIndex;
pub use removal::{remove_lanes, segment_regions, RemovalOutcome};
pub use report::{ConversionReport, ConversionStatus};
pub use settings::{ConversionSettings, TransformSpeed, MAX_TARGET_LANES};
