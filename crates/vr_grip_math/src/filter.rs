use core::f32::consts::TAU;
use core::ops::{Add, Mul, Sub};

use bevy_math::Vec3;

/// Values a [`OneEuroFilter`] can smooth.
pub trait Smoothable:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
    /// The additive identity.
    const ZERO: Self;

    /// Magnitude used to derive the adaptive cutoff.
    fn magnitude(self) -> f32;
}

macro_rules! impl_smoothable {
    ($t:ty, $zero:expr, $mag:expr) => {
        impl Smoothable for $t {
            const ZERO: Self = $zero;

            #[inline]
            fn magnitude(self) -> f32 {
                $mag(self)
            }
        }
    };
}

impl_smoothable!(f32, 0.0, f32::abs);
impl_smoothable!(Vec3, Vec3::ZERO, Vec3::length);

/// Tuning for a [`OneEuroFilter`].
///
/// The cutoff frequency adapts to speed: `cutoff = min_cutoff + cutoff_slope * |velocity|`.
/// Lower `min_cutoff` removes more jitter at rest, higher `cutoff_slope` reduces lag
/// during fast motion.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct OneEuroConfig {
    /// Cutoff frequency in hertz when the value is at rest.
    pub min_cutoff: f32,
    /// Cutoff frequency in hertz for the derivative estimate.
    pub delta_cutoff: f32,
    /// How fast the cutoff rises with speed.
    pub cutoff_slope: f32,
}

impl OneEuroConfig {
    /// Defaults tuned for tracked hand rotation and secondary-hand travel.
    pub const DEFAULT: Self = Self {
        min_cutoff: 0.9,
        delta_cutoff: 1.0,
        cutoff_slope: 0.007,
    };

    /// Defaults tuned for tracked translation.
    pub const TRANSLATION: Self = Self {
        min_cutoff: 0.1,
        delta_cutoff: 10.0,
        cutoff_slope: 10.0,
    };
}

impl Default for OneEuroConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Clone, Copy, Debug)]
struct LowPass<T> {
    previous: Option<T>,
    previous_raw: T,
}

impl<T: Smoothable> LowPass<T> {
    const NEW: Self = Self {
        previous: None,
        previous_raw: T::ZERO,
    };

    fn filter(&mut self, value: T, alpha: f32) -> T {
        let previous = self.previous.unwrap_or(value);
        let result = value * alpha + previous * (1.0 - alpha);
        self.previous_raw = value;
        self.previous = Some(result);
        result
    }
}

/// Adaptive low-pass filter for noisy tracked signals (Casiez et al., "1€ filter").
#[derive(Clone, Copy, Debug)]
pub struct OneEuroFilter<T> {
    /// Filter tuning.
    pub config: OneEuroConfig,
    raw: LowPass<T>,
    delta: LowPass<T>,
}

impl<T: Smoothable> OneEuroFilter<T> {
    /// Creates an empty filter; the first sample passes through unchanged.
    pub const fn new(config: OneEuroConfig) -> Self {
        Self {
            config,
            raw: LowPass::NEW,
            delta: LowPass::NEW,
        }
    }

    /// Forgets all history.
    pub fn reset(&mut self) {
        self.raw = LowPass::NEW;
        self.delta = LowPass::NEW;
    }

    /// Feeds one sample taken `delta_time` seconds after the previous one.
    pub fn run(&mut self, value: T, delta_time: f32) -> T {
        if delta_time <= 0.0 {
            return self.raw.previous.unwrap_or(value);
        }
        let derivative = match self.raw.previous {
            None => T::ZERO,
            Some(_) => (value - self.raw.previous_raw) * (1.0 / delta_time),
        };
        let smoothed_derivative = self
            .delta
            .filter(derivative, cutoff_alpha(self.config.delta_cutoff, delta_time));
        let cutoff = self.config.min_cutoff + self.config.cutoff_slope * smoothed_derivative.magnitude();
        self.raw.filter(value, cutoff_alpha(cutoff, delta_time))
    }
}

impl<T: Smoothable> Default for OneEuroFilter<T> {
    fn default() -> Self {
        Self::new(OneEuroConfig::DEFAULT)
    }
}

fn cutoff_alpha(cutoff: f32, delta_time: f32) -> f32 {
    let tau = 1.0 / (TAU * cutoff.max(f32::EPSILON));
    1.0 / (1.0 + tau / delta_time)
}

/// One step of an exponential running average over roughly `samples` values.
#[inline]
pub fn rolling_average<T: Smoothable>(current: T, sample: T, samples: u32) -> T {
    current + (sample - current) * (1.0 / samples.max(1) as f32)
}

/// Keeps the last `N` samples and reports the one with the largest magnitude.
///
/// Used for release velocities, where the peak of the last few frames reflects
/// the intended throw better than the final frame.
#[derive(Clone, Debug)]
pub struct PeakFilter<const N: usize = 30> {
    samples: [Vec3; N],
    next: usize,
    len: usize,
}

impl<const N: usize> PeakFilter<N> {
    /// Creates an empty filter.
    pub const fn new() -> Self {
        Self {
            samples: [Vec3::ZERO; N],
            next: 0,
            len: 0,
        }
    }

    /// Records a sample, evicting the oldest once full.
    pub fn push(&mut self, sample: Vec3) {
        if N == 0 {
            return;
        }
        self.samples[self.next] = sample;
        self.next = (self.next + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    /// The recorded sample with the largest length, or zero when empty.
    pub fn peak(&self) -> Vec3 {
        self.samples[..self.len]
            .iter()
            .copied()
            .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
            .unwrap_or(Vec3::ZERO)
    }

    /// Forgets all samples.
    pub fn clear(&mut self) {
        self.next = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for PeakFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn first_sample_passes_through() {
        let mut filter = OneEuroFilter::<Vec3>::default();
        let out = filter.run(Vec3::new(1.0, 2.0, 3.0), 1.0 / 90.0);
        assert_eq!(out, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn step_input_converges_without_overshoot() {
        let mut filter = OneEuroFilter::<f32>::new(OneEuroConfig::DEFAULT);
        filter.run(0.0, 0.01);
        let mut last = 0.0;
        for _ in 0..2000 {
            let out = filter.run(1.0, 0.01);
            assert!(out >= last - 1e-6 && out <= 1.0 + 1e-6);
            last = out;
        }
        assert_relative_eq!(last, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn zero_delta_time_returns_last_output() {
        let mut filter = OneEuroFilter::<f32>::default();
        let first = filter.run(5.0, 0.1);
        assert_eq!(filter.run(100.0, 0.0), first);
    }

    #[test]
    fn rolling_average_moves_a_fraction() {
        assert_relative_eq!(rolling_average(0.0_f32, 10.0, 4), 2.5);
        assert_relative_eq!(rolling_average(2.0_f32, 2.0, 0), 2.0);
    }

    #[test]
    fn peak_filter_reports_largest_recent() {
        let mut filter = PeakFilter::<3>::new();
        assert_eq!(filter.peak(), Vec3::ZERO);
        filter.push(Vec3::X * 5.0);
        filter.push(Vec3::Y);
        filter.push(Vec3::Z * 2.0);
        assert_eq!(filter.peak(), Vec3::X * 5.0);
        filter.push(Vec3::ONE);
        assert_eq!(filter.peak(), Vec3::Z * 2.0);
    }
}
