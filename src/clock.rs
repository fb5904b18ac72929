use crate::config::Config;
use crate::model::Arena;
use crate::sim::{Body, MotionState};
use anyhow::{Context, Result};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ClockState {
    Running,
    Paused,
    Stopped,
}

/// State shared between the simulation thread, the input handler and the
/// renderer. One lock per logical field: the renderer snapshotting the body
/// never contends with a speed change, and neither blocks a tick for long.
pub(crate) struct Shared {
    pub(crate) motion: Mutex<MotionState>,
    pub(crate) body: Mutex<Body>,
    paused: AtomicBool,
    stopped: AtomicBool,
    frame_dirty: AtomicBool,
}

impl Shared {
    pub(crate) fn new(motion: MotionState, body: Body) -> Self {
        Self {
            motion: Mutex::new(motion),
            body: Mutex::new(body),
            paused: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            frame_dirty: AtomicBool::new(true),
        }
    }

    pub(crate) fn state(&self) -> ClockState {
        if self.stopped.load(Ordering::Acquire) {
            ClockState::Stopped
        } else if self.paused.load(Ordering::Acquire) {
            ClockState::Paused
        } else {
            ClockState::Running
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Binary pause flip. No effect once stopped.
    pub(crate) fn toggle_pause(&self) {
        if self.is_stopped() {
            return;
        }
        let was = self.paused.fetch_xor(true, Ordering::AcqRel);
        info!("{}", if was { "resumed" } else { "paused" });
    }

    /// Request shutdown. Terminal and idempotent.
    pub(crate) fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            info!("clock stopped");
        }
    }

    /// Fire-and-forget render request; multiple ticks coalesce into one.
    pub(crate) fn request_frame(&self) {
        self.frame_dirty.store(true, Ordering::Release);
    }

    pub(crate) fn take_frame_request(&self) -> bool {
        self.frame_dirty.swap(false, Ordering::AcqRel)
    }

    /// Consume `ticks` whole ticks. While paused the ticks drain without
    /// motion, which keeps the time reference moving and prevents a burst
    /// of catch-up ticks the instant pause is lifted.
    pub(crate) fn advance(&self, arena: &Arena, ticks: u64) {
        if ticks == 0 || self.is_stopped() {
            return;
        }
        if !self.is_paused() {
            self.run_ticks(arena, ticks);
            self.request_frame();
        }
    }

    fn run_ticks(&self, arena: &Arena, ticks: u64) {
        for _ in 0..ticks {
            let mut body = self.body.lock().expect("body mutex poisoned");
            let Some(head) = body.head() else {
                return;
            };
            let mut motion = self.motion.lock().expect("motion mutex poisoned");
            let (next, _reflected) = motion.step(head, arena);
            drop(motion);
            debug_assert!(arena.contains(&next));
            body.prepend(next);
        }
    }
}

/// Spawn the fixed-timestep simulation loop on its own thread. The loop
/// tracks elapsed wall time, converts it to whole ticks at the configured
/// rate (catching up after a stall, never running fractional ticks) and
/// yields briefly between bursts.
pub(crate) fn spawn(shared: Arc<Shared>, cfg: Config) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("snakebounce-sim".to_string())
        .spawn(move || run_loop(&shared, &cfg))
        .context("failed to spawn simulation thread")
}

fn run_loop(shared: &Shared, cfg: &Config) {
    let arena = Arena::from_config(cfg);
    let tick_step = cfg.tick_step();
    let mut last = Instant::now();
    let mut accum = Duration::ZERO;

    info!("simulation loop started at {} ticks/s", cfg.tick_rate);

    while !shared.is_stopped() {
        let now = Instant::now();
        accum = accum.saturating_add(now.saturating_duration_since(last));
        last = now;

        let mut ticks = 0u64;
        while accum >= tick_step {
            accum = accum.saturating_sub(tick_step);
            ticks += 1;
        }
        shared.advance(&arena, ticks);

        thread::sleep(Duration::from_millis(1));
    }

    info!("simulation loop exited");
}

/// Wait a bounded time for the simulation thread to finish, then give up.
/// The process is exiting anyway; an unresponsive thread is only worth a
/// warning.
pub(crate) fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    if handle.is_finished() {
        if handle.join().is_err() {
            warn!("simulation thread panicked");
        }
    } else {
        warn!("simulation thread did not stop within {timeout:?}; abandoning");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Direction, Segment};

    fn shared_with_straight_motion() -> (Shared, Arena) {
        let cfg = Config::default();
        let arena = Arena::from_config(&cfg);
        let mut motion = MotionState::new(&cfg);
        motion.dir = Direction::DEFAULT;
        motion.speed = 2.0;
        let body = Body::initialize(
            Segment::new(400.0, 300.0),
            Direction::DEFAULT,
            cfg.body_length,
            &arena,
        );
        (Shared::new(motion, body), arena)
    }

    fn head_x(shared: &Shared) -> f64 {
        shared.body.lock().unwrap().head().unwrap().x
    }

    #[test]
    fn pause_toggle_is_a_binary_flip() {
        let (shared, _) = shared_with_straight_motion();
        assert_eq!(shared.state(), ClockState::Running);
        shared.toggle_pause();
        assert_eq!(shared.state(), ClockState::Paused);
        shared.toggle_pause();
        assert_eq!(shared.state(), ClockState::Running);
    }

    #[test]
    fn stop_is_terminal_and_idempotent() {
        let (shared, _) = shared_with_straight_motion();
        shared.stop();
        shared.stop();
        assert_eq!(shared.state(), ClockState::Stopped);
        shared.toggle_pause();
        assert_eq!(shared.state(), ClockState::Stopped);
    }

    #[test]
    fn advance_moves_the_head_one_step_per_tick() {
        let (shared, arena) = shared_with_straight_motion();
        let before = head_x(&shared);
        shared.advance(&arena, 3);
        assert_eq!(head_x(&shared), before + 6.0);
    }

    #[test]
    fn paused_ticks_drain_without_motion() {
        let (shared, arena) = shared_with_straight_motion();
        let before = head_x(&shared);
        shared.toggle_pause();
        shared.advance(&arena, 1000);
        assert_eq!(head_x(&shared), before);

        // Unpausing applies no catch-up burst; the next batch is just a batch.
        shared.toggle_pause();
        shared.advance(&arena, 1);
        assert_eq!(head_x(&shared), before + 2.0);
    }

    #[test]
    fn stopped_clock_ignores_ticks() {
        let (shared, arena) = shared_with_straight_motion();
        let before = head_x(&shared);
        shared.stop();
        shared.advance(&arena, 10);
        assert_eq!(head_x(&shared), before);
    }

    #[test]
    fn frame_requests_coalesce() {
        let (shared, arena) = shared_with_straight_motion();
        let _ = shared.take_frame_request();
        shared.advance(&arena, 5);
        shared.advance(&arena, 5);
        assert!(shared.take_frame_request());
        assert!(!shared.take_frame_request());
    }

    #[test]
    fn body_length_invariant_holds_across_many_ticks() {
        let (shared, arena) = shared_with_straight_motion();
        for _ in 0..2000 {
            shared.advance(&arena, 1);
            assert_eq!(shared.body.lock().unwrap().len(), 20);
        }
    }
}
