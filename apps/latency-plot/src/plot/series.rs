use super::lttb::Point;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Outcome {
    Ok,
    Error,
}

impl Outcome {
    /// Results with an empty error text count as successful.
    pub fn from_error_text(error: &str) -> Self {
        if error.is_empty() {
            Self::Ok
        } else {
            Self::Error
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub elapsed_ms: u64,
    pub value: f64,
}

/// Append-only samples for one target and outcome, timed relative to the
/// first sample routed into it.
#[derive(Debug)]
pub struct TimeSeries {
    target: String,
    outcome: Outcome,
    origin: DateTime<Utc>,
    samples: Vec<Sample>,
    finished: bool,
}

impl TimeSeries {
    pub fn new(target: impl Into<String>, outcome: Outcome, origin: DateTime<Utc>) -> Self {
        Self {
            target: target.into(),
            outcome,
            origin,
            samples: Vec::new(),
            finished: false,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn origin(&self) -> DateTime<Utc> {
        self.origin
    }

    pub fn label(&self) -> String {
        format!("{}: {}", self.target, self.outcome)
    }

    /// Whole milliseconds between the origin and `timestamp`, truncated.
    /// Timestamps earlier than the origin map to zero.
    pub fn elapsed_since_origin(&self, timestamp: DateTime<Utc>) -> u64 {
        (timestamp - self.origin).num_milliseconds().max(0) as u64
    }

    pub fn add_sample(&mut self, elapsed_ms: u64, value: f64) {
        debug_assert!(!self.finished, "sample added to finished series {}", self.label());
        self.samples.push(Sample { elapsed_ms, value });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample> + Clone + '_ {
        self.samples.iter().copied()
    }

    /// Samples as chart points, with the elapsed time in seconds.
    pub fn points(&self) -> impl Iterator<Item = Point> + Clone + '_ {
        self.iter().map(|sample| Point {
            x: sample.elapsed_ms as f64 / 1000.0,
            y: sample.value,
        })
    }

    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.samples.shrink_to_fit();
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// The OK and Error series of a single target. Either slot stays empty until
/// a matching result arrives.
#[derive(Debug, Default)]
pub struct SeriesGroup {
    ok: Option<TimeSeries>,
    error: Option<TimeSeries>,
}

impl SeriesGroup {
    pub fn route(&mut self, outcome: Outcome, target: &str, timestamp: DateTime<Utc>, value: f64) {
        let slot = match outcome {
            Outcome::Ok => &mut self.ok,
            Outcome::Error => &mut self.error,
        };
        let series = slot.get_or_insert_with(|| {
            tracing::debug!(attack = %target, outcome = %outcome, origin = %timestamp, "created series");
            TimeSeries::new(target, outcome, timestamp)
        });
        let elapsed_ms = series.elapsed_since_origin(timestamp);
        series.add_sample(elapsed_ms, value);
    }

    pub fn get(&self, outcome: Outcome) -> Option<&TimeSeries> {
        match outcome {
            Outcome::Ok => self.ok.as_ref(),
            Outcome::Error => self.error.as_ref(),
        }
    }

    /// Live series, OK before Error.
    pub fn iter(&self) -> impl Iterator<Item = &TimeSeries> {
        self.ok.iter().chain(self.error.iter())
    }

    pub(super) fn finish(&mut self) {
        for series in self.ok.iter_mut().chain(self.error.iter_mut()) {
            series.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    #[test]
    fn elapsed_time_is_truncated_to_whole_milliseconds() {
        let series = TimeSeries::new("A", Outcome::Ok, at(0));
        let ts = at(1_999) + ChronoDuration::microseconds(999);
        assert_eq!(series.elapsed_since_origin(ts), 1_999);
        assert_eq!(series.elapsed_since_origin(at(-50)), 0);
    }

    #[test]
    fn route_creates_series_lazily_with_first_timestamp_as_origin() {
        let mut group = SeriesGroup::default();
        assert_eq!(group.iter().count(), 0);

        group.route(Outcome::Error, "A", at(500), 12.0);
        group.route(Outcome::Error, "A", at(1_500), 14.0);

        assert!(group.get(Outcome::Ok).is_none());
        let errors = group.get(Outcome::Error).unwrap();
        assert_eq!(errors.origin(), at(500));
        let samples: Vec<Sample> = errors.iter().collect();
        assert_eq!(
            samples,
            vec![
                Sample { elapsed_ms: 0, value: 12.0 },
                Sample { elapsed_ms: 1_000, value: 14.0 },
            ]
        );
    }

    #[test]
    fn group_iterates_ok_before_error() {
        let mut group = SeriesGroup::default();
        group.route(Outcome::Error, "A", at(0), 1.0);
        group.route(Outcome::Ok, "A", at(10), 2.0);

        let labels: Vec<String> = group.iter().map(TimeSeries::label).collect();
        assert_eq!(labels, vec!["A: OK", "A: Error"]);
    }

    #[test]
    fn points_convert_milliseconds_to_seconds_and_restart() {
        let mut series = TimeSeries::new("A", Outcome::Ok, at(0));
        series.add_sample(0, 50.0);
        series.add_sample(1_500, 75.0);

        let points = series.points();
        let first: Vec<Point> = points.clone().collect();
        let second: Vec<Point> = points.collect();
        assert_eq!(first, second);
        assert_eq!(first[1], Point { x: 1.5, y: 75.0 });
    }

    #[test]
    fn finish_is_idempotent() {
        let mut series = TimeSeries::new("A", Outcome::Ok, at(0));
        series.add_sample(0, 1.0);
        series.finish();
        series.finish();
        assert!(series.is_finished());
        assert_eq!(series.len(), 1);
    }
}
