use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Green,
    Yellow,
    Red,
    Dim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// ANSI coloring, enabled per stream only when it is a terminal and
/// `NO_COLOR` is unset.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    stdout: bool,
    stderr: bool,
}

impl Style {
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some();

        Self {
            stdout: !no_color && std::io::stdout().is_terminal(),
            stderr: !no_color && std::io::stderr().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self {
            stdout: false,
            stderr: false,
        }
    }

    pub fn paint(&self, stream: Stream, color: Color, text: &str) -> String {
        let enabled = match stream {
            Stream::Stdout => self.stdout,
            Stream::Stderr => self.stderr,
        };

        if !enabled {
            return text.to_string();
        }

        let code = match color {
            Color::Green => "32",
            Color::Yellow => "33",
            Color::Red => "31",
            Color::Dim => "2",
        };

        format!("\u{1b}[{code}m{text}\u{1b}[0m")
    }

    pub fn ok(&self) -> String {
        self.paint(Stream::Stdout, Color::Green, "✔")
    }

    pub fn arrow(&self) -> String {
        self.paint(Stream::Stdout, Color::Yellow, "→")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_style_never_emits_escapes() {
        let style = Style::plain();
        assert_eq!(style.paint(Stream::Stdout, Color::Red, "x"), "x");
        assert_eq!(style.ok(), "✔");
    }

    #[test]
    fn colored_output_is_wrapped() {
        let style = Style {
            stdout: true,
            stderr: false,
        };
        assert_eq!(style.paint(Stream::Stdout, Color::Green, "ok"), "\u{1b}[32mok\u{1b}[0m");
        assert_eq!(style.paint(Stream::Stderr, Color::Green, "ok"), "ok");
    }
}
