use crate::{
    config::DepthRangePolicy,
    error::{Result, ViewerError},
    types::{DepthFrame, IntensityMap, MAX_DEPTH},
};

/// Cumulative depth histogram, indexed by depth value.
#[derive(Clone, Debug)]
pub struct DepthHistogram {
    bins: Vec<f32>,
}

impl Default for DepthHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl DepthHistogram {
    pub fn new() -> Self {
        Self {
            bins: vec![0.0; MAX_DEPTH],
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.bins
    }

    pub fn get(&self, depth: u16) -> f32 {
        self.bins[clamp_index(depth)]
    }

    pub fn clear(&mut self) {
        self.bins.fill(0.0);
    }

    pub fn record(&mut self, depth: u16) {
        self.bins[clamp_index(depth)] += 1.0;
    }

    /// Turns per-value counts into running totals.
    pub fn accumulate(&mut self) {
        for idx in 1..MAX_DEPTH {
            self.bins[idx] += self.bins[idx - 1];
        }
    }

    /// Maps running totals to `floor(256 * (1 - total / count))`.
    ///
    /// Bin 0 keeps its raw total, which is always 0 because zero samples are
    /// never recorded.
    pub fn equalize(&mut self, count: u32) {
        if count == 0 {
            return;
        }
        let count = count as f32;
        for bin in &mut self.bins[1..] {
            *bin = (256.0 * (1.0 - *bin / count)).floor();
        }
    }
}

fn clamp_index(depth: u16) -> usize {
    (depth as usize).min(MAX_DEPTH - 1)
}

/// Histogram-equalizes depth frames into grayscale intensities.
///
/// The histogram is scratch space: it is cleared at the start of every call,
/// so nothing carries over between frames.
#[derive(Debug)]
pub struct DepthNormalizer {
    histogram: DepthHistogram,
    policy: DepthRangePolicy,
}

impl DepthNormalizer {
    pub fn new(policy: DepthRangePolicy) -> Self {
        Self {
            histogram: DepthHistogram::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DepthRangePolicy {
        self.policy
    }

    pub fn histogram(&self) -> &DepthHistogram {
        &self.histogram
    }

    pub fn normalize(&mut self, depth: &DepthFrame) -> Result<IntensityMap> {
        self.histogram.clear();

        let mut valid_pixels = 0u32;
        let mut clamped = 0usize;
        for (index, &sample) in depth.samples().iter().enumerate() {
            if sample == 0 {
                continue;
            }
            if sample as usize >= MAX_DEPTH {
                match self.policy {
                    DepthRangePolicy::Reject => {
                        return Err(ViewerError::DataRange {
                            value: sample,
                            index,
                        });
                    }
                    DepthRangePolicy::Clamp => clamped += 1,
                }
            }
            self.histogram.record(sample);
            valid_pixels += 1;
        }

        if clamped > 0 {
            log::warn!("clamped {clamped} depth samples at or beyond {MAX_DEPTH}");
        }

        self.histogram.accumulate();
        self.histogram.equalize(valid_pixels);

        let bins = self.histogram.as_slice();
        let values = depth
            .samples()
            .iter()
            .map(|&sample| {
                if sample == 0 {
                    0
                } else {
                    bins[clamp_index(sample)] as u8
                }
            })
            .collect();

        Ok(IntensityMap {
            width: depth.width(),
            height: depth.height(),
            values,
            valid_pixels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, samples: Vec<u16>) -> DepthFrame {
        DepthFrame::new(width, height, samples).unwrap()
    }

    #[test]
    fn empty_frame_maps_to_black() {
        let mut normalizer = DepthNormalizer::new(DepthRangePolicy::Clamp);
        let map = normalizer.normalize(&frame(8, 6, vec![0; 48])).unwrap();

        assert_eq!(map.valid_pixels, 0);
        assert!(map.values.iter().all(|&v| v == 0));
        assert!(normalizer.histogram().as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn single_sample_counts_once_from_its_depth_upward() {
        let mut samples = vec![0; 9];
        samples[4] = 1_234;

        let mut histogram = DepthHistogram::new();
        for &s in samples.iter().filter(|s| **s != 0) {
            histogram.record(s);
        }
        histogram.accumulate();

        let bins = histogram.as_slice();
        assert!(bins[..1_234].iter().all(|v| *v == 0.0));
        assert!(bins[1_234..].iter().all(|v| *v == 1.0));

        histogram.equalize(1);
        assert_eq!(histogram.get(1_234), 0.0);
        assert_eq!(histogram.get(1_233), 256.0);
        assert_eq!(histogram.get(0), 0.0);

        let mut normalizer = DepthNormalizer::new(DepthRangePolicy::Clamp);
        let first = normalizer.normalize(&frame(3, 3, samples.clone())).unwrap();
        let second = normalizer.normalize(&frame(3, 3, samples)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.valid_pixels, 1);
    }

    #[test]
    fn uniform_depth_equalizes_to_zero() {
        let mut samples = vec![100u16; 16];
        samples[5] = 0;

        let mut histogram = DepthHistogram::new();
        for &s in samples.iter().filter(|s| **s != 0) {
            histogram.record(s);
        }
        histogram.accumulate();
        assert_eq!(histogram.get(99), 0.0);
        assert!(histogram.as_slice()[100..].iter().all(|v| *v == 15.0));

        let mut normalizer = DepthNormalizer::new(DepthRangePolicy::Clamp);
        let map = normalizer.normalize(&frame(4, 4, samples)).unwrap();
        assert_eq!(map.valid_pixels, 15);
        assert_eq!(normalizer.histogram().get(100), 0.0);
        assert!(map.values.iter().all(|&v| v == 0));
    }

    #[test]
    fn nearer_samples_are_brighter() {
        let samples = vec![500, 500, 1_500, 3_000];
        let mut normalizer = DepthNormalizer::new(DepthRangePolicy::Clamp);
        let map = normalizer.normalize(&frame(2, 2, samples)).unwrap();

        // 256 * (1 - 2/4) = 128, 256 * (1 - 3/4) = 64, 256 * (1 - 4/4) = 0
        assert_eq!(map.values, vec![128, 128, 64, 0]);
    }

    #[test]
    fn no_state_leaks_between_frames() {
        let mut normalizer = DepthNormalizer::new(DepthRangePolicy::Clamp);
        normalizer
            .normalize(&frame(2, 2, vec![700, 800, 900, 1_000]))
            .unwrap();
        let map = normalizer.normalize(&frame(2, 2, vec![0; 4])).unwrap();
        assert!(map.values.iter().all(|&v| v == 0));
        assert!(normalizer.histogram().as_slice().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn out_of_range_samples_follow_policy() {
        let samples = vec![200, MAX_DEPTH as u16, 0, 400];

        let mut strict = DepthNormalizer::new(DepthRangePolicy::Reject);
        let err = strict.normalize(&frame(2, 2, samples.clone())).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::DataRange {
                value: 10_000,
                index: 1
            }
        ));

        let mut lenient = DepthNormalizer::new(DepthRangePolicy::Clamp);
        let map = lenient.normalize(&frame(2, 2, samples)).unwrap();
        assert_eq!(map.valid_pixels, 3);
        assert_eq!(map.values[1], 0);
        assert_eq!(map.values[2], 0);
    }
}
