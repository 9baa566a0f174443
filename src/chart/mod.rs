// Chart module
// Chart model plus the bridge between charts and note matrices

pub mod builder;
pub mod materialize;
pub mod model;

pub use builder::build_matrix;
pub use materialize::{convert_chart, materialize, tag_difficulty, LaneLayout, UniformLayout};
pub use model::{Chart, ChartNote};
