use crate::clock::{self, ClockState, Shared};
use crate::config::Config;
use crate::input::{collect_input_nonblocking, map_key_to_command};
use crate::model::Arena;
use crate::render::{self, FrameSnapshot, Terminal, BACKGROUND};
use crate::sim::{Body, Command, MotionState};
use anyhow::Result;
use log::{error, info, LevelFilter};
use rand::{rngs::StdRng, SeedableRng};
use simplelog::{Config as LogConfig, WriteLogger};
use std::fs::File;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const RENDER_FPS: u32 = 60;
const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) struct App {
    config: Config,
    shared: Arc<Shared>,
    sim: Option<JoinHandle<()>>,
    term: Terminal,
    should_quit: bool,
}

impl App {
    fn init() -> Result<Self> {
        let config = Config::default();
        let arena = Arena::from_config(&config);
        let mut rng = StdRng::from_entropy();

        let mut motion = MotionState::new(&config);
        motion.randomize_direction(&mut rng);

        // Spawn before touching the terminal so an invalid arena/body
        // combination reports as a plain error on a normal screen.
        let body = Body::spawn(&config, &arena, motion.dir, &mut rng)?;

        let shared = Arc::new(Shared::new(motion, body));
        let term = Terminal::begin()?;
        let sim = clock::spawn(shared.clone(), config)?;

        info!(
            "initialized: arena {}x{}, body length {}",
            config.arena_width, config.arena_height, config.body_length
        );

        Ok(Self {
            config,
            shared,
            sim: Some(sim),
            term,
            should_quit: false,
        })
    }

    fn run_loop(&mut self) -> Result<()> {
        let frame_dt = Duration::from_secs_f64(1.0 / RENDER_FPS as f64);

        while !self.should_quit {
            if self.term.resize_if_needed()? {
                self.shared.request_frame();
            }

            for key in collect_input_nonblocking(frame_dt)? {
                match map_key_to_command(key) {
                    Some(Command::SpeedUp) => self.change_speed(true),
                    Some(Command::SpeedDown) => self.change_speed(false),
                    Some(Command::TogglePause) => {
                        self.shared.toggle_pause();
                        self.shared.request_frame();
                    }
                    Some(Command::Quit) => {
                        self.should_quit = true;
                        break;
                    }
                    None => {}
                }
            }

            if self.shared.take_frame_request() {
                self.render_frame();
            }

            spin_sleep(frame_dt, Instant::now());
        }

        Ok(())
    }

    fn change_speed(&self, increase: bool) {
        let mut motion = self.shared.motion.lock().expect("motion mutex poisoned");
        motion.set_speed(increase, &self.config);
        drop(motion);
        self.shared.request_frame();
    }

    /// Consistent read-only snapshot of the shared state, one lock at a time.
    fn snapshot(&self) -> FrameSnapshot {
        let segments = {
            let body = self.shared.body.lock().expect("body mutex poisoned");
            body.segments().iter().copied().collect()
        };
        let (dir, speed, message) = {
            let motion = self.shared.motion.lock().expect("motion mutex poisoned");
            let message = motion.message.and_then(|m| {
                m.remaining(self.config.message_duration, Instant::now())
                    .map(|left| (m.text, left))
            });
            (motion.dir, motion.speed, message)
        };
        FrameSnapshot {
            segments,
            dir,
            speed,
            message,
            paused: self.shared.state() == ClockState::Paused,
        }
    }

    /// A failed frame never touches simulation state: log it, show a
    /// placeholder, move on.
    fn render_frame(&mut self) {
        let frame = self.snapshot();
        self.term.cur.clear(BACKGROUND);
        render::draw_scene(&mut self.term.cur, &frame, &self.config);
        if let Err(err) = self.term.present(true) {
            error!("render fault: {err:#}");
            self.term.cur.clear(BACKGROUND);
            render::draw_error_placeholder(&mut self.term.cur);
            let _ = self.term.present(false);
        }

        // Keep the transient message repainting until its window closes.
        if frame.message.is_some() {
            self.shared.request_frame();
        }
    }

    fn shutdown(&mut self) -> Result<()> {
        self.shared.stop();
        if let Some(handle) = self.sim.take() {
            clock::join_with_timeout(handle, JOIN_TIMEOUT);
        }
        self.term.end()?;
        info!("shutdown complete");
        Ok(())
    }
}

pub(crate) fn run() -> Result<()> {
    init_logging();

    let mut app = App::init()?;
    let result = app.run_loop();
    let shutdown = app.shutdown();
    result.and(shutdown)
}

/// File-backed logging; stdout belongs to the terminal UI.
fn init_logging() {
    if let Ok(file) = File::create("snakebounce.log") {
        let _ = WriteLogger::init(LevelFilter::Info, LogConfig::default(), file);
    }
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
