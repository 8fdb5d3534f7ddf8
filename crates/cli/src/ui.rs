use crate::style::{Color, Stream, Style};

const LABEL_WIDTH: usize = 40;

/// Line layout shared by the commands.
pub struct Ui {
    style: Style,
    width: usize,
}

impl Ui {
    pub fn new(style: Style) -> Self {
        Self { style, width: 48 }
    }

    pub fn rule(&self) -> String {
        "-".repeat(self.width)
    }

    pub fn kv(&self, key: &str, value: &str) -> String {
        format!("{key:<14}: {value}")
    }

    pub fn ok_line(&self, message: &str) -> String {
        format!("{} {}", self.style.ok(), message)
    }

    pub fn info_line(&self, message: &str) -> String {
        format!("{} {}", self.style.arrow(), message)
    }

    /// `  • label.......... status detail`
    pub fn list_item(&self, label: &str, status: &str, color: Color, detail: Option<&str>) -> String {
        let dots = ".".repeat(LABEL_WIDTH.saturating_sub(label.chars().count()));
        let status = self.style.paint(Stream::Stdout, color, status);

        match detail {
            Some(detail) if !detail.is_empty() => format!("  • {label}{dots} {status} {detail}"),
            _ => format!("  • {label}{dots} {status}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_item_pads_with_dots() {
        let ui = Ui::new(Style::plain());
        let line = ui.list_item("001_init", "applied", Color::Green, Some("2020-01-01"));
        assert!(line.starts_with("  • 001_init...."));
        assert!(line.ends_with(" applied 2020-01-01"));

        let long = "x".repeat(LABEL_WIDTH + 5);
        assert_eq!(ui.list_item(&long, "pending", Color::Yellow, None), format!("  • {long} pending"));
    }

    #[test]
    fn kv_aligns_keys() {
        let ui = Ui::new(Style::plain());
        assert_eq!(ui.kv("applied", "3"), "applied       : 3");
    }
}
