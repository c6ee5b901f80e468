mod lttb;
mod matrix;
mod series;


pub use lttb::{downsample, validate_threshold, Point, ReductionError, MIN_THRESHOLD};
pub use matrix::{AlignedMatrix, MatrixParseError, PlotData, TIME_LABEL};
pub use series::{Outcome, Sample, SeriesGroup, TimeSeries};

use crate::render::{self, Assets, DisplayOptions};
use crate::results::Measurement;
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error(transparent)]
    Reduction(#[from] ReductionError),
    #[error("failed to encode chart options: {0}")]
    Options(#[from] serde_json::Error),
    #[error("plot output failed after {written} bytes: {source}")]
    Sink {
        written: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Collects results into per-target OK/Error latency series.
///
/// Targets are kept in a sorted map so the emitted columns come out in the
/// same order on every run.
#[derive(Debug)]
pub struct LatencyPlot {
    title: String,
    threshold: usize,
    series: BTreeMap<String, SeriesGroup>,
}

impl LatencyPlot {
    pub fn new(title: impl Into<String>, threshold: usize) -> Result<Self, ReductionError> {
        validate_threshold(threshold)?;
        Ok(Self {
            title: title.into(),
            threshold,
            series: BTreeMap::new(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn add(&mut self, measurement: &Measurement) {
        let outcome = Outcome::from_error_text(&measurement.error);
        let value = measurement.latency.as_nanos() as f64 / 1_000_000.0;

        if !self.series.contains_key(&measurement.target) {
            self.series
                .insert(measurement.target.clone(), SeriesGroup::default());
        }
        if let Some(group) = self.series.get_mut(&measurement.target) {
            group.route(outcome, &measurement.target, measurement.timestamp, value);
        }
    }

    /// Close every series. No more results can be added afterwards.
    pub fn finalize(mut self) -> FinalizedPlot {
        let mut series_count = 0usize;
        let mut sample_count = 0usize;
        for group in self.series.values_mut() {
            group.finish();
            for series in group.iter() {
                series_count += 1;
                sample_count += series.len();
            }
        }
        tracing::debug!(
            targets = self.series.len(),
            series = series_count,
            samples = sample_count,
            "finalized latency plot"
        );

        FinalizedPlot {
            title: self.title,
            threshold: self.threshold,
            series: self.series,
        }
    }
}

#[derive(Debug)]
pub struct FinalizedPlot {
    title: String,
    threshold: usize,
    series: BTreeMap<String, SeriesGroup>,
}

impl FinalizedPlot {
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Every live series: targets in ascending order, OK before Error.
    pub fn series(&self) -> impl Iterator<Item = &TimeSeries> {
        self.series.values().flat_map(|group| group.iter())
    }

    /// Downsample every non-empty series and lay them out on a shared time
    /// axis. Any reduction failure aborts the whole build.
    pub fn build_plot_data(&self) -> Result<PlotData, ReductionError> {
        let mut reduced = Vec::new();
        let mut labels = vec![TIME_LABEL.to_string()];

        for series in self.series().filter(|series| !series.is_empty()) {
            let points = downsample(series.len(), self.threshold, series.points())?;
            tracing::debug!(
                series = %series.label(),
                raw = series.len(),
                reduced = points.len(),
                "downsampled series"
            );
            reduced.push(points);
            labels.push(series.label());
        }

        Ok(PlotData {
            matrix: AlignedMatrix::align(&reduced),
            labels,
        })
    }

    /// Render the complete HTML plot into `sink` and return the number of
    /// bytes written.
    pub fn write_to<W: Write>(
        &self,
        sink: W,
        options: &DisplayOptions,
        assets: &Assets,
    ) -> Result<u64, PlotError> {
        let data = self.build_plot_data()?;
        render::write_document(sink, &self.title, &data, options, assets)
    }
}
