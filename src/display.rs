use crate::{
    app::App,
    policy::Advice,
    timer::Phase,
};
use anyhow::Context;
use log::trace;
use std::{io::Write, mem};

/// Renders app state as a block of text in the terminal. Only redraws when
/// the text actually changed.
#[derive(Debug)]
pub struct Display<W> {
    out: W,
    /// Whether to wipe the screen before each frame. Off when stdout isn't a
    /// terminal, so piped output stays readable
    clear_screen: bool,
    /// The text currently on the screen
    text_buffer: Vec<String>,
    /// The text to be written soon™. Empty except during a draw
    next_text_buffer: Vec<String>,
}

impl<W: Write> Display<W> {
    /// Width of the progress bar, in cells
    const BAR_WIDTH: usize = 30;
    const CLEAR: &'static str = "\x1b[2J\x1b[H";

    pub fn new(out: W, clear_screen: bool) -> Self {
        Self {
            out,
            clear_screen,
            text_buffer: Vec::new(),
            next_text_buffer: Vec::new(),
        }
    }

    /// Draw the current state. Return whether anything was written
    pub fn draw(&mut self, app: &App) -> anyhow::Result<bool> {
        trace!("Running display draw");
        self.build_frame(app);

        if self.next_text_buffer == self.text_buffer {
            self.next_text_buffer.clear();
            return Ok(false);
        }
        trace!(
            "Text changed: old={:?}; new={:?}",
            self.text_buffer,
            self.next_text_buffer
        );
        self.text_buffer = mem::take(&mut self.next_text_buffer);

        if self.clear_screen {
            write!(self.out, "{}", Self::CLEAR)?;
        }
        for line in &self.text_buffer {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush().context("Error flushing display output")?;
        Ok(true)
    }

    fn build_frame(&mut self, app: &App) {
        self.add_line("Sunscreen timer".into());
        self.add_line(String::new());

        // Location
        if let Some(coordinates) = app.coordinates() {
            self.add_line("Your location:".into());
            self.add_line(format!("  Latitude: {:.4}", coordinates.latitude));
            self.add_line(format!("  Longitude: {:.4}", coordinates.longitude));
        } else if let Some(err) = app.location_error() {
            self.add_line(err.user_message());
        } else {
            self.add_line("Locating…".into());
        }

        self.add_line(format!("Skin type: {}", app.skin()));
        let uv = match app.uv() {
            Some(reading) => reading.to_string(),
            None if app.location_error().is_some() => "-".into(),
            None => "Fetching…".into(),
        };
        self.add_line(format!("UV index: {uv}"));

        let advice = app.advice();
        if let Some(message) = advice.message() {
            self.add_line(message);
        }

        // Keep showing a countdown that's already underway, even if the
        // reading no longer has a window
        let timer = app.timer();
        if matches!(advice, Advice::Window { .. }) || timer.phase() != Phase::Idle
        {
            self.add_line(String::new());
            let progress = timer.progress_pct();
            // Floor so 100% only ever shows at zero
            self.add_line(format!(
                "[{}] {:>3}%",
                progress_bar(progress, Self::BAR_WIDTH),
                progress.floor()
            ));
            self.add_line(format!(
                "Time remaining: {}",
                timer.format_remaining()
            ));
            match timer.phase() {
                Phase::Expired => {
                    self.add_line("Time's up! Get some shade.".into())
                }
                Phase::Stopped => self.add_line(format!(
                    "Stopped, {} min countdown",
                    timer.initial_secs() / 60
                )),
                Phase::Idle | Phase::Running => {}
            }
            let action = match timer.phase() {
                Phase::Running => "Stop",
                Phase::Stopped => "Resume",
                Phase::Idle | Phase::Expired => "Start",
            };
            self.add_line(format!("[Enter] {action}"));
        }

        self.add_line(String::new());
        self.add_line(
            "Commands: t(oggle), start, stop, skin <dark|light>, q(uit)".into(),
        );
    }

    /// Add a line to the buffer, to be written later
    fn add_line(&mut self, line: String) {
        self.next_text_buffer.push(line);
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// Fill `width` cells proportionally to `progress` (0-100)
fn progress_bar(progress: f64, width: usize) -> String {
    let filled = ((progress.clamp(0.0, 100.0) / 100.0) * width as f64).floor()
        as usize;
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}
