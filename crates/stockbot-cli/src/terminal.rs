//! Display surface that writes to the terminal.

use std::io::Write;
use std::path::Path;

use stockbot::display::DisplaySurface;

/// Prints answers to a writer (stdout by default).
pub struct TerminalDisplay<W: Write> {
    out: W,
}

impl TerminalDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// Terminal writes are best effort: a closed stdout must not abort the turn.
impl<W: Write> DisplaySurface for TerminalDisplay<W> {
    fn show_text(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
    }

    fn show_fragment(&mut self, fragment: &str) {
        let _ = write!(self.out, "{fragment}");
        let _ = self.out.flush();
    }

    fn finish_stream(&mut self) {
        let _ = writeln!(self.out);
    }

    fn show_artifact(&mut self, path: &Path) {
        let _ = writeln!(self.out, "[chart saved to {}]", path.display());
    }

    fn show_notice(&mut self, notice: &str) {
        let _ = writeln!(self.out, "{notice}");
    }
}
