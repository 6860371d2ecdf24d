use glam::Vec2;

/// Cubic ease-out, the curve GSAP calls `power2.out`.
pub fn power2_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// A two-channel tween that can be re-targeted mid-flight. Re-targeting
/// starts the new tween from wherever the old one currently is.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    from: Vec2,
    to: Vec2,
    start_ms: f64,
    duration_ms: f64,
}

impl Tween {
    pub fn new(value: Vec2, duration_ms: f64) -> Self {
        Self {
            from: value,
            to: value,
            start_ms: 0.0,
            duration_ms,
        }
    }

    pub fn value_at(&self, now_ms: f64) -> Vec2 {
        if self.duration_ms <= 0.0 {
            return self.to;
        }

        let progress = ((now_ms - self.start_ms) / self.duration_ms) as f32;
        self.from.lerp(self.to, power2_out(progress))
    }

    pub fn retarget(&mut self, now_ms: f64, to: Vec2) {
        self.from = self.value_at(now_ms);
        self.to = to;
        self.start_ms = now_ms;
    }

    pub fn target(&self) -> Vec2 {
        self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power2_out_endpoints() {
        assert_eq!(power2_out(0.0), 0.0);
        assert_eq!(power2_out(1.0), 1.0);
        assert_eq!(power2_out(2.0), 1.0);
        assert!((power2_out(0.5) - 0.875).abs() < 1e-6);
    }

    #[test]
    fn test_retarget_starts_from_current_value() {
        let mut tween = Tween::new(Vec2::ZERO, 1000.0);
        tween.retarget(0.0, Vec2::new(1.0, 0.0));

        let halfway = tween.value_at(500.0);
        tween.retarget(500.0, Vec2::new(0.0, 1.0));

        assert!((tween.value_at(500.0) - halfway).length() < 1e-6);
        assert!((tween.value_at(1500.0) - Vec2::new(0.0, 1.0)).length() < 1e-6);
    }
}
