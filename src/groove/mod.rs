// Groove timing - beat-derived windows used by the conversion passes

pub mod timing;

pub use timing::ConversionTiming;
