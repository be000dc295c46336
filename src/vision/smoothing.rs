//! Exponential moving average smoothing for cursor positions
//!
//! `s = alpha * sample + (1 - alpha) * s`. A larger alpha tracks the raw
//! input more tightly; a smaller one removes more jitter.

use thiserror::Error;

use super::landmarks::Point;

/// Default weight given to each new sample
pub const DEFAULT_ALPHA: f32 = 0.5;

/// EMA filter over 2D points
#[derive(Debug, Clone)]
pub struct EmaSmoother {
    alpha: f32,
    state: Option<Point>,
}

impl EmaSmoother {
    /// Create a smoother; `alpha` must lie in `(0, 1]`
    pub fn new(alpha: f32) -> Result<Self, SmoothingError> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(SmoothingError::InvalidAlpha(alpha));
        }
        Ok(Self { alpha, state: None })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Filter one sample. The first sample after a reset passes through.
    pub fn smooth(&mut self, sample: Point) -> Point {
        let next = match self.state {
            None => sample,
            Some(prev) => Point {
                x: self.alpha * sample.x + (1.0 - self.alpha) * prev.x,
                y: self.alpha * sample.y + (1.0 - self.alpha) * prev.y,
            },
        };
        self.state = Some(next);
        next
    }

    /// Current running estimate
    pub fn current(&self) -> Option<Point> {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

impl Default for EmaSmoother {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            state: None,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SmoothingError {
    #[error("Smoothing factor must be in (0, 1], got {0}")]
    InvalidAlpha(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_alpha() {
        assert!(EmaSmoother::new(0.0).is_err());
        assert!(EmaSmoother::new(1.5).is_err());
        assert!(EmaSmoother::new(f32::NAN).is_err());
        assert!(EmaSmoother::new(1.0).is_ok());
    }

    #[test]
    fn test_first_sample_passes_through() {
        let mut ema = EmaSmoother::new(0.3).unwrap();
        let p = ema.smooth(Point::new(10.0, 20.0));
        assert_eq!(p, Point::new(10.0, 20.0));
    }

    #[test]
    fn test_converges_without_overshoot() {
        let mut ema = EmaSmoother::new(0.4).unwrap();
        ema.smooth(Point::new(0.0, 0.0));

        let target = Point::new(100.0, 50.0);
        let mut last_distance = f32::MAX;
        let mut converged_at = None;

        for frame in 0..40 {
            let p = ema.smooth(target);
            assert!(
                p.x <= target.x + 1e-3 && p.y <= target.y + 1e-3,
                "overshoot at {frame}"
            );
            let d = p.distance(&target);
            assert!(d <= last_distance + 1e-3);
            last_distance = d;
            if d < 0.5 && converged_at.is_none() {
                converged_at = Some(frame);
            }
        }

        // Error shrinks by 0.6 per frame: 111.8 * 0.6^n < 0.5 by frame 11
        assert!(converged_at.unwrap() <= 11);
    }

    #[test]
    fn test_reset_forgets_state() {
        let mut ema = EmaSmoother::default();
        ema.smooth(Point::new(0.0, 0.0));
        ema.reset();
        assert!(ema.current().is_none());
        assert_eq!(ema.smooth(Point::new(5.0, 5.0)), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_blend() {
        let mut ema = EmaSmoother::new(0.5).unwrap();
        ema.smooth(Point::new(0.0, 0.0));
        assert_eq!(ema.smooth(Point::new(10.0, 4.0)), Point::new(5.0, 2.0));
    }
}
