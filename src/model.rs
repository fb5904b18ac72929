use crate::config::Config;

/// One trail segment. Positions are arena pixels, origin top-left,
/// x growing right and y growing down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Segment {
    pub(crate) x: f64,
    pub(crate) y: f64,
}

impl Segment {
    pub(crate) fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
    pub(crate) fn int_x(&self) -> i32 {
        self.x.round() as i32
    }
    pub(crate) fn int_y(&self) -> i32 {
        self.y.round() as i32
    }
}

/// Unit heading vector. Only renormalized after a wall reflection; drift
/// between hits is far below anything visible.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Direction {
    pub(crate) dx: f64,
    pub(crate) dy: f64,
}

impl Direction {
    pub(crate) const DEFAULT: Direction = Direction { dx: 1.0, dy: 0.0 };

    pub(crate) fn from_angle(angle: f64) -> Self {
        Self {
            dx: angle.cos(),
            dy: angle.sin(),
        }
    }

    pub(crate) fn magnitude(&self) -> f64 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }

    pub(crate) fn normalize(&mut self) {
        let len = self.magnitude();
        if len > 0.0 && len.is_finite() {
            self.dx /= len;
            self.dy /= len;
        } else {
            *self = Self::DEFAULT;
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite()
    }

    pub(crate) fn angle_deg(&self) -> f64 {
        self.dy.atan2(self.dx).to_degrees()
    }
}

/// Playfield bounds. A segment's draw rectangle must stay inside
/// [0, width - segment_size] x [0, height - segment_size].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Arena {
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) segment_size: f64,
}

impl Arena {
    pub(crate) fn from_config(cfg: &Config) -> Self {
        Self {
            width: cfg.arena_width,
            height: cfg.arena_height,
            segment_size: cfg.segment_size,
        }
    }

    pub(crate) fn max_x(&self) -> f64 {
        self.width - self.segment_size
    }

    pub(crate) fn max_y(&self) -> f64 {
        self.height - self.segment_size
    }

    pub(crate) fn clamp(&self, seg: Segment) -> Segment {
        Segment::new(seg.x.clamp(0.0, self.max_x()), seg.y.clamp(0.0, self.max_y()))
    }

    pub(crate) fn contains(&self, seg: &Segment) -> bool {
        seg.x >= 0.0 && seg.x <= self.max_x() && seg.y >= 0.0 && seg.y <= self.max_y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_degenerate_resets_to_default() {
        let mut d = Direction { dx: 0.0, dy: 0.0 };
        d.normalize();
        assert_eq!(d.dx, 1.0);
        assert_eq!(d.dy, 0.0);

        let mut nan = Direction {
            dx: f64::NAN,
            dy: 0.5,
        };
        nan.normalize();
        assert_eq!(nan.dx, 1.0);
        assert_eq!(nan.dy, 0.0);
    }

    #[test]
    fn normalize_scales_to_unit_length() {
        let mut d = Direction { dx: 3.0, dy: 4.0 };
        d.normalize();
        assert!((d.magnitude() - 1.0).abs() <= 1e-12);
        assert!((d.dx - 0.6).abs() <= 1e-12);
        assert!((d.dy - 0.8).abs() <= 1e-12);
    }

    #[test]
    fn arena_clamp_keeps_segment_in_bounds() {
        let arena = Arena {
            width: 800.0,
            height: 600.0,
            segment_size: 20.0,
        };
        let clamped = arena.clamp(Segment::new(-5.0, 900.0));
        assert_eq!(clamped, Segment::new(0.0, 580.0));
        assert!(arena.contains(&clamped));
    }
}
