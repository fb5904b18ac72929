use crate::config::Config;
use crate::model::{Arena, Direction, Segment};
use anyhow::{bail, Result};
use log::warn;
use rand::{rngs::StdRng, Rng};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Discrete control commands, produced by the input layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    SpeedUp,
    SpeedDown,
    TogglePause,
    Quit,
}

/// Transient on-screen notice, shown for a fixed window after a speed change.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StatusMessage {
    pub(crate) text: &'static str,
    pub(crate) shown_at: Instant,
}

impl StatusMessage {
    pub(crate) fn remaining(&self, window: Duration, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.shown_at);
        if elapsed < window {
            Some(window - elapsed)
        } else {
            None
        }
    }
}

/// Heading, sub-pixel accumulator and speed for the moving head.
///
/// The accumulator carries the fractional leftover displacement between
/// ticks, so speeds below one pixel per tick still make steady progress
/// instead of rounding to zero forever.
pub(crate) struct MotionState {
    pub(crate) dir: Direction,
    pub(crate) accum_x: f64,
    pub(crate) accum_y: f64,
    pub(crate) speed: f64,
    pub(crate) message: Option<StatusMessage>,
}

impl MotionState {
    pub(crate) fn new(cfg: &Config) -> Self {
        Self {
            dir: Direction::DEFAULT,
            accum_x: 0.0,
            accum_y: 0.0,
            speed: cfg.initial_speed,
            message: None,
        }
    }

    /// Pick a uniformly random heading. Called once at startup.
    pub(crate) fn randomize_direction(&mut self, rng: &mut StdRng) {
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        self.dir = Direction::from_angle(angle);
    }

    /// Advance the head by one tick: accumulate displacement, move by the
    /// rounded whole-pixel part, then resolve wall reflections per axis.
    /// Returns the resolved position and whether any wall was hit.
    pub(crate) fn step(&mut self, head: Segment, arena: &Arena) -> (Segment, bool) {
        let head = self.recover_if_invalid(head, arena);

        self.accum_x += self.dir.dx * self.speed;
        self.accum_y += self.dir.dy * self.speed;

        let move_x = self.accum_x.round();
        let move_y = self.accum_y.round();
        self.accum_x -= move_x;
        self.accum_y -= move_y;

        let mut x = head.x + move_x;
        let mut y = head.y + move_y;
        let mut reflected = false;

        if x < 0.0 {
            x = 0.0;
            self.dir.dx = self.dir.dx.abs();
            self.accum_x = 0.0;
            reflected = true;
        } else if x >= arena.max_x() {
            x = arena.max_x();
            self.dir.dx = -self.dir.dx.abs();
            self.accum_x = 0.0;
            reflected = true;
        }

        if y < 0.0 {
            y = 0.0;
            self.dir.dy = self.dir.dy.abs();
            self.accum_y = 0.0;
            reflected = true;
        } else if y >= arena.max_y() {
            y = arena.max_y();
            self.dir.dy = -self.dir.dy.abs();
            self.accum_y = 0.0;
            reflected = true;
        }

        if reflected {
            self.dir.normalize();
        }

        (Segment::new(x, y), reflected)
    }

    /// Transient-fault recovery: a non-finite heading, accumulator or head
    /// position is a programming error, but the show must go on. Reset to a
    /// sane state and keep ticking.
    fn recover_if_invalid(&mut self, head: Segment, arena: &Arena) -> Segment {
        let motion_ok = self.dir.is_finite() && self.accum_x.is_finite() && self.accum_y.is_finite();
        let head_ok = head.x.is_finite() && head.y.is_finite();
        if motion_ok && head_ok {
            return head;
        }

        debug_assert!(false, "non-finite motion state");
        warn!(
            "non-finite motion state (dir [{:.3}, {:.3}] accum [{:.3}, {:.3}] head [{:.1}, {:.1}]); resetting",
            self.dir.dx, self.dir.dy, self.accum_x, self.accum_y, head.x, head.y
        );
        self.dir = Direction::DEFAULT;
        self.accum_x = 0.0;
        self.accum_y = 0.0;
        if head_ok {
            arena.clamp(head)
        } else {
            arena.clamp(Segment::new(0.0, 0.0))
        }
    }

    /// Nudge the speed by the configured delta, clamped to its bounds, and
    /// leave a transient message for the renderer.
    pub(crate) fn set_speed(&mut self, increase: bool, cfg: &Config) {
        let (next, text) = if increase {
            ((self.speed + cfg.speed_delta).min(cfg.max_speed), "speed up")
        } else {
            ((self.speed - cfg.speed_delta).max(cfg.min_speed), "speed down")
        };
        self.speed = next;
        self.message = Some(StatusMessage {
            text,
            shown_at: Instant::now(),
        });
    }
}

/// The trail: fixed-length ordered segment list, head at the front.
pub(crate) struct Body {
    segments: VecDeque<Segment>,
    fixed_len: usize,
}

impl Body {
    /// Back-fill `length` segments walking backwards along `-dir`, each
    /// clamped into bounds, so the trail starts out visually coherent.
    pub(crate) fn initialize(start: Segment, dir: Direction, length: usize, arena: &Arena) -> Self {
        let mut segments = VecDeque::with_capacity(length + 1);
        for i in 0..length {
            let x = start.x - i as f64 * dir.dx * arena.segment_size;
            let y = start.y - i as f64 * dir.dy * arena.segment_size;
            segments.push_back(arena.clamp(Segment::new(x, y)));
        }
        Self {
            segments,
            fixed_len: length,
        }
    }

    /// Spawn at a random start position with enough margin that the whole
    /// back-filled trail fits. Fails when the arena cannot fit the body.
    pub(crate) fn spawn(cfg: &Config, arena: &Arena, dir: Direction, rng: &mut StdRng) -> Result<Self> {
        let seg = cfg.segment_size;
        let span_x = cfg.arena_width - 2.0 * seg - seg * cfg.body_length as f64;
        let span_y = cfg.arena_height - 2.0 * seg - seg * cfg.body_length as f64;
        if cfg.body_length == 0 || span_x <= 0.0 || span_y <= 0.0 {
            bail!(
                "arena {}x{} cannot fit a body of {} segments of size {}",
                cfg.arena_width,
                cfg.arena_height,
                cfg.body_length,
                cfg.segment_size
            );
        }

        let start = Segment::new(
            seg + rng.gen_range(0.0..span_x).floor(),
            seg + rng.gen_range(0.0..span_y).floor(),
        );
        Ok(Self::initialize(start, dir, cfg.body_length, arena))
    }

    /// Insert a new head and trim the tail so the length never changes.
    pub(crate) fn prepend(&mut self, head: Segment) {
        self.segments.push_front(head);
        while self.segments.len() > self.fixed_len {
            self.segments.pop_back();
        }
    }

    pub(crate) fn head(&self) -> Option<Segment> {
        self.segments.front().copied()
    }

    pub(crate) fn segments(&self) -> &VecDeque<Segment> {
        &self.segments
    }

    pub(crate) fn len(&self) -> usize {
        self.segments.len()
    }
}
