use crate::sim::Command;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::time::Duration;

/// Drain pending key presses without blocking longer than `max_wait`.
pub(crate) fn collect_input_nonblocking(max_wait: Duration) -> anyhow::Result<Vec<KeyCode>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_wait);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(k.code);
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

/// Pure key-to-command mapping; all decisions belong to the core.
pub(crate) fn map_key_to_command(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::Char('1') => Some(Command::SpeedUp),
        KeyCode::Char('2') => Some(Command::SpeedDown),
        KeyCode::Char(' ') => Some(Command::TogglePause),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Command::Quit),
        _ => None,
    }
}
