use crate::config::Config;
use crate::model::{Direction, Segment};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};
use std::time::Duration;

pub(crate) const BACKGROUND: Color = Color::Rgb { r: 10, g: 10, b: 25 };
const SNAKE_RGB: (u8, u8, u8) = (50, 205, 50);
const BORDER_COLOR: Color = Color::Rgb { r: 70, g: 130, b: 180 };
const INFO_COLOR: Color = Color::Rgb { r: 220, g: 220, b: 255 };
const GRID_COLOR: Color = Color::Rgb { r: 40, g: 40, b: 60 };
const GRID_SPACING_PX: f64 = 40.0;

/// Everything the renderer needs for one frame, snapshotted out of the
/// shared state so drawing never holds a lock.
pub(crate) struct FrameSnapshot {
    pub(crate) segments: Vec<Segment>,
    pub(crate) dir: Direction,
    pub(crate) speed: f64,
    pub(crate) message: Option<(&'static str, Duration)>,
    pub(crate) paused: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: BACKGROUND,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: i32, y: i32, c: Cell) {
        if x >= 0 && y >= 0 && (x as u16) < self.w && (y as u16) < self.h {
            let i = self.idx(x as u16, y as u16);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            c.ch = ' ';
            c.fg = Color::White;
            c.bg = bg;
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        let prev = CellBuffer::new(cols, rows);
        let cur = CellBuffer::new(cols, rows);

        Ok(Self {
            out,
            cols,
            rows,
            prev,
            cur,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: i32, y: i32, text: &str, fg: Color) {
    for (i, ch) in text.chars().enumerate() {
        buf.set(x + i as i32, y, Cell { ch, fg, bg: BACKGROUND });
    }
}

/// Arena pixel coordinates to terminal cell coordinates.
fn to_cell(buf: &CellBuffer, cfg: &Config, x: f64, y: f64) -> (i32, i32) {
    let cx = (x / cfg.arena_width * buf.w as f64).floor() as i32;
    let cy = (y / cfg.arena_height * buf.h as f64).floor() as i32;
    (cx, cy)
}

/// Compose the whole scene into the cell buffer. Pure buffer writes; the
/// fallible part of rendering is `Terminal::present`.
pub(crate) fn draw_scene(buf: &mut CellBuffer, frame: &FrameSnapshot, cfg: &Config) {
    draw_grid(buf, cfg);
    draw_border(buf);
    draw_snake(buf, frame, cfg);
    draw_info(buf, frame);
    draw_help(buf);

    if let Some((text, _remaining)) = frame.message {
        let x = buf.w as i32 - text.len() as i32 - 3;
        draw_text(buf, x.max(0), buf.h as i32 - 3, text, Color::White);
    }

    if frame.paused {
        draw_pause_overlay(buf);
    }
}

fn draw_grid(buf: &mut CellBuffer, cfg: &Config) {
    let grid = Cell {
        ch: '·',
        fg: GRID_COLOR,
        bg: BACKGROUND,
    };
    let mut gx = GRID_SPACING_PX;
    while gx < cfg.arena_width {
        let mut gy = GRID_SPACING_PX;
        while gy < cfg.arena_height {
            let (cx, cy) = to_cell(buf, cfg, gx, gy);
            buf.set(cx, cy, grid);
            gy += GRID_SPACING_PX;
        }
        gx += GRID_SPACING_PX;
    }
}

fn draw_border(buf: &mut CellBuffer) {
    let cols = buf.w as i32;
    let rows = buf.h as i32;
    let cell = |ch| Cell {
        ch,
        fg: BORDER_COLOR,
        bg: BACKGROUND,
    };
    for x in 0..cols {
        buf.set(x, 0, cell('─'));
        buf.set(x, rows - 1, cell('─'));
    }
    for y in 0..rows {
        buf.set(0, y, cell('│'));
        buf.set(cols - 1, y, cell('│'));
    }
    buf.set(0, 0, cell('┌'));
    buf.set(cols - 1, 0, cell('┐'));
    buf.set(0, rows - 1, cell('└'));
    buf.set(cols - 1, rows - 1, cell('┘'));
}

fn draw_snake(buf: &mut CellBuffer, frame: &FrameSnapshot, cfg: &Config) {
    // Footprint of one segment in cells, at least 1x1.
    let seg_w = ((cfg.segment_size / cfg.arena_width) * buf.w as f64).round() as i32;
    let seg_h = ((cfg.segment_size / cfg.arena_height) * buf.h as f64).round() as i32;
    let seg_w = seg_w.max(1);
    let seg_h = seg_h.max(1);

    // Tail first so the head ends up on top where segments overlap.
    for (i, seg) in frame.segments.iter().enumerate().rev() {
        let intensity = (1.0 - i as f64 * 0.05).max(0.3);
        let fg = Color::Rgb {
            r: (SNAKE_RGB.0 as f64 * intensity) as u8,
            g: (SNAKE_RGB.1 as f64 * intensity) as u8,
            b: (SNAKE_RGB.2 as f64 * intensity) as u8,
        };
        let ch = if i == 0 { '●' } else { 'o' };
        let (cx, cy) = to_cell(buf, cfg, seg.x, seg.y);
        for dy in 0..seg_h {
            for dx in 0..seg_w {
                buf.set(cx + dx, cy + dy, Cell { ch, fg, bg: BACKGROUND });
            }
        }
    }
}

fn draw_info(buf: &mut CellBuffer, frame: &FrameSnapshot) {
    draw_text(
        buf,
        2,
        1,
        &format!("speed: {:.2} px/tick", frame.speed),
        INFO_COLOR,
    );
    draw_text(
        buf,
        2,
        2,
        &format!(
            "dir:   [{:+.2}, {:+.2}]  {:.1} deg",
            frame.dir.dx,
            frame.dir.dy,
            frame.dir.angle_deg()
        ),
        INFO_COLOR,
    );
    if let Some(head) = frame.segments.first() {
        draw_text(
            buf,
            2,
            3,
            &format!("pos:   [{:3}, {:3}]", head.int_x(), head.int_y()),
            INFO_COLOR,
        );
    }
}

fn draw_help(buf: &mut CellBuffer) {
    let y = buf.h as i32 - 2;
    draw_text(
        buf,
        2,
        y,
        "1 faster   2 slower   space pause   esc quit",
        INFO_COLOR,
    );
}

fn draw_pause_overlay(buf: &mut CellBuffer) {
    let bw: i32 = 24;
    let bh: i32 = 5;
    let x0 = (buf.w as i32 - bw) / 2;
    let y0 = (buf.h as i32 - bh) / 2;

    for y in y0..y0 + bh {
        for x in x0..x0 + bw {
            buf.set(
                x,
                y,
                Cell {
                    ch: ' ',
                    fg: Color::Yellow,
                    bg: Color::Black,
                },
            );
        }
    }
    let text = "P A U S E D";
    let tx = x0 + (bw - text.len() as i32) / 2;
    for (i, ch) in text.chars().enumerate() {
        buf.set(
            tx + i as i32,
            y0 + bh / 2,
            Cell {
                ch,
                fg: Color::Yellow,
                bg: Color::Black,
            },
        );
    }
}

/// Per-frame fallback when presenting a frame failed: a minimal, loud,
/// hard-to-misdraw placeholder.
pub(crate) fn draw_error_placeholder(buf: &mut CellBuffer) {
    draw_text(buf, 2, 2, "render error", Color::Red);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_corners_map_to_buffer_corners() {
        let buf = CellBuffer::new(80, 24);
        let cfg = Config::default();
        assert_eq!(to_cell(&buf, &cfg, 0.0, 0.0), (0, 0));
        let (cx, cy) = to_cell(&buf, &cfg, cfg.arena_width - 1.0, cfg.arena_height - 1.0);
        assert!(cx < 80 && cy < 24);
        assert!(cx >= 78 && cy >= 23);
    }

    #[test]
    fn set_ignores_out_of_range_writes() {
        let mut buf = CellBuffer::new(10, 10);
        let marker = Cell {
            ch: 'X',
            fg: Color::Red,
            bg: Color::Black,
        };
        buf.set(-1, 5, marker);
        buf.set(5, -1, marker);
        buf.set(10, 5, marker);
        buf.set(5, 10, marker);
        assert!(buf.cells.iter().all(|c| *c == Cell::default()));
    }
}
