#![forbid(unsafe_code)]

//! Line-oriented render target.
//!
//! Views write plain text lines; hosts decide how to present them. Lines are
//! clipped to the frame width (by display columns) and rows past the frame
//! height are dropped.

use unicode_width::UnicodeWidthChar;

/// A text frame of fixed size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u16,
    height: u16,
    lines: Vec<String>,
}

impl Frame {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            lines: Vec::with_capacity(usize::from(height)),
        }
    }

    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Rows still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        usize::from(self.height).saturating_sub(self.lines.len())
    }

    /// Append one row, clipped to the frame width. Returns `false` once the
    /// frame is full.
    pub fn line(&mut self, text: impl AsRef<str>) -> bool {
        if self.remaining() == 0 {
            return false;
        }
        self.lines.push(clip(text.as_ref(), usize::from(self.width)));
        true
    }

    /// Append an empty row.
    pub fn blank(&mut self) -> bool {
        self.line("")
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// All rows joined with newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Whether any row contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

fn clip(text: &str, max_cols: usize) -> String {
    let mut cols = 0;
    let mut out = String::with_capacity(text.len().min(max_cols * 4));
    for ch in text.chars() {
        if ch == '\n' || ch == '\r' {
            break;
        }
        let w = ch.width().unwrap_or(0);
        if cols + w > max_cols {
            break;
        }
        cols += w;
        out.push(ch);
    }
    out
}
