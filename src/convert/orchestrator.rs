// Lane Converter - Runs one lane-count conversion end to end
// Picks the addition or removal engine, then trims density

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use uuid::Uuid;

use super::addition::add_lanes;
use super::density::{correct_density, RemovalLedger};
use super::removal::remove_lanes;
use super::report::{ConversionReport, ConversionStatus};
use super::settings::ConversionSettings;
use crate::error::ConvertError;
use crate::groove::ConversionTiming;
use crate::matrix::{NoteMatrix, TimeAxis};
use crate::pipeline::{TraceBuilder, TraceEntry, TraceWriter};

/// Output of one conversion
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Converted matrix, or a copy of the input when skipped
    pub matrix: NoteMatrix,

    pub report: ConversionReport,
}

impl Conversion {
    pub fn status(&self) -> ConversionStatus {
        self.report.status
    }
}

/// Converts note matrices to the configured lane count
///
/// Holds only settings and an optional trace sink; every call builds its own
/// RNG, ledger and output buffers.
#[derive(Debug, Clone)]
pub struct LaneConverter {
    settings: ConversionSettings,
    trace: Option<TraceWriter>,
}

impl LaneConverter {
    /// Create a converter; settings are clamped into a consistent range
    pub fn new(settings: ConversionSettings) -> Self {
        LaneConverter {
            settings: settings.normalized(),
            trace: None,
        }
    }

    /// Append a JSONL trace of every conversion to this writer
    pub fn with_trace(mut self, writer: TraceWriter) -> Self {
        self.trace = Some(writer);
        self
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    /// Convert using the configured seed, or entropy when none is set
    pub fn convert(
        &self,
        matrix: &NoteMatrix,
        axis: &TimeAxis,
        bpm: f64,
    ) -> Result<Conversion, ConvertError> {
        let mut rng = match self.settings.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_entropy(),
        };
        self.convert_with_rng(matrix, axis, bpm, &mut rng)
    }

    /// Convert with a caller-supplied RNG shared by every pass
    pub fn convert_with_rng<R: Rng + ?Sized>(
        &self,
        matrix: &NoteMatrix,
        axis: &TimeAxis,
        bpm: f64,
        rng: &mut R,
    ) -> Result<Conversion, ConvertError> {
        if matrix.rows() != axis.len() {
            return Err(ConvertError::ShapeMismatch {
                matrix_rows: matrix.rows(),
                axis_rows: axis.len(),
            });
        }

        let settings = &self.settings;
        let source_lanes = matrix.cols();
        let target_lanes = settings.target_lanes;
        let run_id = Uuid::new_v4();
        let mut report = ConversionReport::new(run_id, matrix, target_lanes);

        if !settings.accepts_source(source_lanes) {
            log::info!("Skipping {}-lane chart: not in source filter", source_lanes);
            return Ok(self.skip(matrix, report, ConversionStatus::SkippedFiltered));
        }
        if source_lanes == target_lanes {
            log::info!("Skipping {}-lane chart: already at target", source_lanes);
            return Ok(self.skip(matrix, report, ConversionStatus::SkippedUnchanged));
        }

        let timing = ConversionTiming::new(bpm, settings.transform_speed.factor())?;

        self.emit(TraceBuilder::stage(run_id, "transform").start(format!(
            "{} -> {} lanes, window {:.1} ms",
            source_lanes, target_lanes, timing.conversion_window_ms
        )));

        let mut output = if target_lanes > source_lanes {
            add_lanes(
                matrix,
                axis,
                target_lanes - source_lanes,
                settings.min_lanes,
                &timing,
                rng,
            )?
        } else {
            let outcome = remove_lanes(
                matrix,
                axis,
                source_lanes - target_lanes,
                settings.min_lanes,
                &timing,
                rng,
            )?;
            report.regions = outcome.dropped_lanes.len();
            report.repaired = outcome.repaired;
            report.recovered = outcome.recovered;
            report.unrecovered = outcome.unrecovered;
            outcome.matrix
        };

        self.emit(TraceBuilder::stage(run_id, "density").start("Trimming simultaneous notes"));

        let mut ledger = RemovalLedger::new(target_lanes);
        correct_density(
            &mut output,
            settings.max_removals_per_row(),
            settings.min_lanes,
            &mut ledger,
            rng,
        );
        report.density_removed = ledger.counts().to_vec();
        report.finish(ConversionStatus::Converted, &output);

        log::info!(
            "Converted {} -> {} lanes: {} rows, {} -> {} notes, {} empty rows",
            source_lanes,
            target_lanes,
            report.rows,
            report.notes_before,
            report.notes_after,
            report.empty_rows_after
        );

        self.emit_report(TraceBuilder::stage(run_id, "complete").complete("Conversion finished"), &report);

        Ok(Conversion {
            matrix: output,
            report,
        })
    }

    fn skip(&self, matrix: &NoteMatrix, mut report: ConversionReport, status: ConversionStatus) -> Conversion {
        report.finish(status, matrix);
        self.emit_report(
            TraceBuilder::stage(report.run_id, "skipped").complete("Chart left unchanged"),
            &report,
        );
        Conversion {
            matrix: matrix.clone(),
            report,
        }
    }

    fn emit_report(&self, entry: TraceEntry, report: &ConversionReport) {
        match report.to_json() {
            Ok(data) => self.emit(entry.with_data(data)),
            Err(e) => log::warn!("Failed to serialize conversion report: {}", e),
        }
    }

    /// Tracing is best-effort; a failing sink never aborts a conversion
    fn emit(&self, entry: TraceEntry) {
        if let Some(writer) = &self.trace {
            if let Err(e) = writer.write(&entry) {
                log::warn!("Failed to write trace to {}: {}", writer.path().display(), e);
            }
        }
    }
}
