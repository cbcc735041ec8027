//! Colored terminal output for CLI commands.
//!
//! Honors `NO_COLOR` and the `--color` flag.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Pick the color mode: a set `NO_COLOR` wins over `--color`, and anything
/// but `always`/`never` means "when stdout is a terminal".
pub fn color_choice(flag: Option<&str>, no_color: bool) -> ColorChoice {
    match (no_color, flag) {
        (true, _) | (false, Some("never")) => ColorChoice::Never,
        (false, Some("always")) => ColorChoice::Always,
        _ => ColorChoice::Auto,
    }
}

/// Styled stdout writer.
pub struct StyledOutput {
    stdout: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
        }
    }

    fn write_styled(&mut self, text: &str, spec: &ColorSpec) {
        let _ = self.stdout.set_color(spec);
        let _ = write!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    pub fn bold(&mut self, text: &str) {
        self.write_styled(text, ColorSpec::new().set_bold(true));
    }

    /// Cyan text.
    pub fn info(&mut self, text: &str) {
        self.write_styled(text, ColorSpec::new().set_fg(Some(Color::Cyan)));
    }

    pub fn plain(&mut self, text: &str) {
        let _ = write!(self.stdout, "{}", text);
    }

    pub fn line(&mut self, text: &str) {
        let _ = writeln!(self.stdout, "{}", text);
    }

    pub fn newline(&mut self) {
        let _ = writeln!(self.stdout);
    }

    /// `label` padded to a column, then `value`.
    pub fn field(&mut self, label: &str, value: &str) {
        self.info(&format!("  {:<24}", label));
        self.line(value);
    }

    /// " PASS " or " FAIL " badge followed by the check name.
    pub fn check(&mut self, passed: bool, name: &str) {
        let (badge, bg) = if passed {
            (" PASS ", Color::Green)
        } else {
            (" FAIL ", Color::Red)
        };
        self.write_styled(
            badge,
            ColorSpec::new()
                .set_bg(Some(bg))
                .set_fg(Some(Color::White))
                .set_bold(true),
        );
        self.plain(" ");
        self.line(name);
    }

    pub fn flush(&mut self) {
        let _ = self.stdout.flush();
    }
}
