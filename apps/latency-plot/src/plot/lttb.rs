//! Largest-Triangle-Three-Buckets downsampling.
//!
//! The input is walked twice in lockstep through two clones of the same
//! iterator: one scans ahead to average the next bucket while the other picks
//! the point of the current bucket that spans the largest triangle with the
//! previously chosen point and that average. Nothing beyond the output is
//! buffered.

use serde::Serialize;

pub const MIN_THRESHOLD: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReductionError {
    #[error("downsample threshold must be at least 3, got {threshold}")]
    ThresholdTooSmall { threshold: usize },
    #[error("series advertised {expected} points but yielded {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

pub fn validate_threshold(threshold: usize) -> Result<(), ReductionError> {
    if threshold < MIN_THRESHOLD {
        return Err(ReductionError::ThresholdTooSmall { threshold });
    }
    Ok(())
}

/// Reduce `len` points with non-decreasing x to at most `threshold` points.
///
/// Series that already fit are returned unchanged. Longer series always keep
/// their first and last points and yield exactly `threshold` points.
pub fn downsample<I>(len: usize, threshold: usize, points: I) -> Result<Vec<Point>, ReductionError>
where
    I: Iterator<Item = Point> + Clone,
{
    validate_threshold(threshold)?;

    if len <= threshold {
        let all: Vec<Point> = points.collect();
        if all.len() != len {
            return Err(ReductionError::LengthMismatch {
                expected: len,
                actual: all.len(),
            });
        }
        return Ok(all);
    }

    let buckets = threshold - 2;
    let interior = len - 2;
    // Index of the first point in bucket `k`; bucket `buckets` starts at the last point.
    let boundary = |k: usize| k * interior / buckets + 1;

    let mut cursor = Counted::new(points.clone(), len);
    let mut ahead = Counted::new(points, len);
    let mut sampled = Vec::with_capacity(threshold);

    let mut anchor = cursor.advance()?;
    sampled.push(anchor);
    while ahead.pos < boundary(1) {
        ahead.advance()?;
    }

    for bucket in 0..buckets {
        let next_end = boundary(bucket + 2).min(len);
        let (mut sum_x, mut sum_y, mut count) = (0.0, 0.0, 0usize);
        while ahead.pos < next_end {
            let point = ahead.advance()?;
            sum_x += point.x;
            sum_y += point.y;
            count += 1;
        }
        let average = Point {
            x: sum_x / count as f64,
            y: sum_y / count as f64,
        };

        let bucket_end = boundary(bucket + 1);
        let mut chosen = cursor.advance()?;
        let mut max_area = triangle_area(anchor, chosen, average);
        while cursor.pos < bucket_end {
            let candidate = cursor.advance()?;
            let area = triangle_area(anchor, candidate, average);
            if area > max_area {
                max_area = area;
                chosen = candidate;
            }
        }

        sampled.push(chosen);
        anchor = chosen;
    }

    let last = cursor.advance()?;
    sampled.push(last);

    let extra = cursor.inner.count();
    if extra > 0 {
        return Err(ReductionError::LengthMismatch {
            expected: len,
            actual: len + extra,
        });
    }

    Ok(sampled)
}

fn triangle_area(a: Point, b: Point, c: Point) -> f64 {
    ((a.x - c.x) * (b.y - a.y) - (a.x - b.x) * (c.y - a.y)).abs() * 0.5
}

struct Counted<I> {
    inner: I,
    pos: usize,
    expected: usize,
}

impl<I: Iterator<Item = Point>> Counted<I> {
    fn new(inner: I, expected: usize) -> Self {
        Self {
            inner,
            pos: 0,
            expected,
        }
    }

    fn advance(&mut self) -> Result<Point, ReductionError> {
        let point = self.inner.next().ok_or(ReductionError::LengthMismatch {
            expected: self.expected,
            actual: self.pos,
        })?;
        self.pos += 1;
        Ok(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(ys: &[f64]) -> Vec<Point> {
        ys.iter()
            .enumerate()
            .map(|(i, &y)| Point { x: i as f64, y })
            .collect()
    }

    fn sawtooth(len: usize) -> Vec<Point> {
        (0..len)
            .map(|i| Point {
                x: i as f64 * 0.25,
                y: ((i * 37) % 101) as f64,
            })
            .collect()
    }

    #[test]
    fn short_series_are_returned_unchanged() {
        let points = series(&[50.0, 75.0, 60.0]);
        for threshold in [3, 4, 100] {
            let reduced = downsample(points.len(), threshold, points.iter().copied()).unwrap();
            assert_eq!(reduced, points);
        }
    }

    #[test]
    fn empty_series_reduce_to_nothing() {
        let reduced = downsample(0, 3, std::iter::empty::<Point>()).unwrap();
        assert!(reduced.is_empty());
    }

    #[test]
    fn long_series_hit_threshold_and_keep_endpoints() {
        for (len, threshold) in [(4, 3), (10, 3), (101, 7), (1_000, 10), (5_003, 250)] {
            let points = sawtooth(len);
            let reduced = downsample(len, threshold, points.iter().copied()).unwrap();
            assert_eq!(reduced.len(), threshold, "len={len} threshold={threshold}");
            assert_eq!(reduced.first(), points.first());
            assert_eq!(reduced.last(), points.last());
            assert!(reduced.windows(2).all(|w| w[0].x < w[1].x));
            assert!(reduced.iter().all(|p| points.contains(p)));
        }
    }

    #[test]
    fn picks_points_spanning_the_largest_triangle() {
        let points = series(&[0.0, 10.0, 0.0, 0.0, 0.0, 0.0]);
        let reduced = downsample(points.len(), 4, points.iter().copied()).unwrap();
        let xs: Vec<f64> = reduced.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 3.0, 5.0]);
    }

    #[test]
    fn keeps_a_single_spike() {
        let mut ys = vec![1.0; 200];
        ys[117] = 900.0;
        let points = series(&ys);
        let reduced = downsample(points.len(), 20, points.iter().copied()).unwrap();
        assert!(reduced.contains(&Point { x: 117.0, y: 900.0 }));
    }

    #[test]
    fn threshold_below_three_is_rejected() {
        let points = series(&[1.0, 2.0]);
        for threshold in [0, 1, 2] {
            let err = downsample(points.len(), threshold, points.iter().copied()).unwrap_err();
            assert_eq!(err, ReductionError::ThresholdTooSmall { threshold });
        }
    }

    #[test]
    fn advertised_length_must_match_iterator() {
        let points = sawtooth(10);
        let err = downsample(12, 5, points.iter().copied()).unwrap_err();
        assert_eq!(
            err,
            ReductionError::LengthMismatch {
                expected: 12,
                actual: 10
            }
        );

        let err = downsample(8, 5, points.iter().copied()).unwrap_err();
        assert_eq!(
            err,
            ReductionError::LengthMismatch {
                expected: 8,
                actual: 10
            }
        );

        let err = downsample(4, 5, points.iter().copied()).unwrap_err();
        assert_eq!(
            err,
            ReductionError::LengthMismatch {
                expected: 4,
                actual: 10
            }
        );
    }
}
