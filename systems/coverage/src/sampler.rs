//! Fixed-spacing resampling of the monster path.

use log::{debug, warn};
use shop_advisor_core::{PathPoint, Point};

/// Upper bound on the samples produced for a single path.
pub const MAX_SAMPLES: usize = 1 << 20;

/// Converts a polyline into evenly spaced path samples.
///
/// Samples sit at arc-length offsets `s/2, 3s/2, …` where `s` is the
/// segment length, so each one stands for a stretch of length `s`
/// centred on it. The trailing stretch shorter than `s` is dropped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathSampler {
    segment_length: f64,
}

impl PathSampler {
    /// Creates a sampler emitting one sample per `segment_length` of path.
    #[must_use]
    pub const fn new(segment_length: f64) -> Self {
        Self { segment_length }
    }

    /// Arc length represented by each sample.
    #[must_use]
    pub const fn segment_length(&self) -> f64 {
        self.segment_length
    }

    /// Samples the polyline described by `vertices`.
    ///
    /// Paths shorter than one segment, or with fewer than two vertices,
    /// yield no samples at all. So do paths of non-finite length and paths
    /// that would need more than [`MAX_SAMPLES`] samples.
    #[must_use]
    pub fn sample(&self, vertices: &[Point]) -> Vec<PathPoint> {
        let spacing = self.segment_length;
        if !(spacing > 0.0) || !spacing.is_finite() {
            warn!("refusing to sample path with segment length {spacing}");
            return Vec::new();
        }

        let total: f64 = vertices
            .windows(2)
            .map(|leg| leg[0].distance(leg[1]))
            .sum();
        let segments = (total / spacing).floor();
        if !segments.is_finite() || segments > MAX_SAMPLES as f64 {
            warn!("refusing to sample path of length {total} into segments of {spacing}");
            return Vec::new();
        }
        let count = segments as usize;

        let mut samples = Vec::with_capacity(count);
        let mut leg_start = 0.0;
        for leg in vertices.windows(2) {
            if samples.len() == count {
                break;
            }

            let (from, to) = (leg[0], leg[1]);
            let length = from.distance(to);
            if length <= 0.0 {
                continue;
            }

            let leg_end = leg_start + length;
            while samples.len() < count {
                let offset = spacing * (samples.len() as f64 + 0.5);
                if offset > leg_end {
                    break;
                }
                let t = (offset - leg_start) / length;
                samples.push(PathPoint::new(from.lerp(to, t)));
            }
            leg_start = leg_end;
        }

        debug!(
            "sampled path of length {total:.2} into {} points",
            samples.len()
        );
        samples
    }
}
