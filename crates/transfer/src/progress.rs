use std::io::Write;
use std::sync::Mutex;

/// Number of cells in the progress bar.
pub const BAR_WIDTH: usize = 30;

const FILL: char = '█';
const EMPTY: char = '-';

/// Builds a single redrawable progress line.
///
/// `current / total` is clamped to `[0, 1]`. A non-positive `total` has no
/// meaningful percentage, so the bar stays empty and the percentage reads `?`.
pub fn render_bar(current: f64, total: f64, label: &str, annotation: &str, width: usize) -> String {
    let fraction = (total > 0.0).then(|| (current / total).clamp(0.0, 1.0));
    let filled = fraction.map_or(0, |f| ((width as f64) * f).floor() as usize);

    let mut bar = String::with_capacity(width * FILL.len_utf8());
    bar.extend(std::iter::repeat_n(FILL, filled));
    bar.extend(std::iter::repeat_n(EMPTY, width - filled));

    let percent = match fraction {
        Some(f) => format!("{:.1}%", f * 100.0),
        None => "?%".to_string(),
    };
    format!("\r{label} |{bar}| {percent} {annotation}")
}

/// Console progress bar shared by every transfer in a run.
///
/// Disabled reporters are no-ops. Write errors are ignored: a broken
/// terminal must never fail a transfer.
pub struct ProgressReporter {
    enabled: bool,
    width: usize,
    out: Mutex<Box<dyn Write + Send>>,
}

impl ProgressReporter {
    /// Creates a reporter that draws on stdout.
    pub fn new(enabled: bool) -> Self {
        Self::with_writer(enabled, Box::new(std::io::stdout()))
    }

    /// Creates a reporter that draws into `out`.
    pub fn with_writer(enabled: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            enabled,
            width: BAR_WIDTH,
            out: Mutex::new(out),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Redraws the bar in place.
    pub fn render(&self, current: f64, total: f64, label: &str, annotation: &str) {
        if !self.enabled {
            return;
        }
        let line = render_bar(current, total, label, annotation, self.width);
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = out.write_all(line.as_bytes());
        let _ = out.flush();
    }

    /// Draws a full bar and ends the line.
    pub fn finish(&self, label: &str) {
        if !self.enabled {
            return;
        }
        let blank = " ".repeat(16);
        let line = render_bar(1.0, 1.0, label, &blank, self.width);
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }

    /// Ends a partially drawn bar so the next line starts clean.
    pub fn abandon(&self) {
        if !self.enabled {
            return;
        }
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(out);
        let _ = out.flush();
    }
}
