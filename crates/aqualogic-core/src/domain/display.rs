//! LCD display text decoding.
//!
//! `DISPLAY_UPDATE` frames carry the raw character buffer of the panel's
//! two-line LCD.  The buffer is mostly ASCII with three quirks:
//!
//! - `0xDF` is the LCD's degree glyph and becomes `°`.
//! - `0xBA` is a stray colon glyph and becomes `:`.
//! - Any other byte with the top bit set is a *blinking* character; the bit
//!   is stripped and the whole token is marked as blinking.
//!
//! # Layout recovery (for beginners)
//!
//! The buffer has no row separator.  The panel pads each line with spaces,
//! so the decoder uses spacing as the layout signal: one space separates
//! words on the same row, two or more spaces start the next row.
//!
//! ```text
//! "  Air Temp   84°F      \0"
//!    └─┬┘ └┬─┘   └─┬┘
//!     row 1 row 1  row 2
//! ```
//!
//! A token containing `:` (the clock, e.g. `10:04P`) is split around the
//! colon and a synthetic blinking `:` section is inserted before the last
//! piece, mirroring the panel's flashing clock colon.

use serde::{Deserialize, Serialize};
use tracing::trace;

const SPACE: u8 = 0x20;
const NUL: u8 = 0x00;
const DEGREE_GLYPH: u8 = 0xDF;
const COLON_GLYPH: u8 = 0xBA;
const BLINK_FLAG: u8 = 0x80;

/// One whitespace-delimited word of the display, before colon splitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayToken {
    pub text: String,
    pub blinking: bool,
    /// 1-based display row.
    pub row: u32,
}

/// One rendered piece of the display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySection {
    pub content: String,
    pub blinking: bool,
    /// 1-based display row.
    pub row: u32,
}

impl DisplaySection {
    fn new(content: impl Into<String>, blinking: bool, row: u32) -> Self {
        Self {
            content: content.into(),
            blinking,
            row,
        }
    }
}

/// Stateful decoder that remembers the previous buffer to detect changes.
#[derive(Debug, Default)]
pub struct DisplayDecoder {
    previous: Vec<u8>,
    tokens: Vec<DisplayToken>,
    sections: Vec<DisplaySection>,
}

impl DisplayDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `raw` and returns `true` if the display changed.
    ///
    /// A buffer identical to the previous one is not decoded again; the
    /// current tokens and sections are kept and `false` is returned.
    pub fn decode(&mut self, raw: &[u8]) -> bool {
        if raw == self.previous.as_slice() {
            return false;
        }

        self.previous = raw.to_vec();
        self.tokens = tokenize(raw);
        self.sections = split_sections(&self.tokens);
        trace!(sections = self.sections.len(), "display decoded");
        true
    }

    /// Words of the current display, in reading order.
    pub fn tokens(&self) -> &[DisplayToken] {
        &self.tokens
    }

    /// Rendered sections of the current display.
    pub fn sections(&self) -> &[DisplaySection] {
        &self.sections
    }

    /// Current display as plain text, one line per row.
    pub fn text(&self) -> String {
        let mut lines: Vec<Vec<&str>> = Vec::new();
        for token in &self.tokens {
            let index = token.row.saturating_sub(1) as usize;
            if lines.len() <= index {
                lines.resize_with(index + 1, Vec::new);
            }
            lines[index].push(&token.text);
        }
        lines
            .iter()
            .map(|words| words.join(" "))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Forgets the previous buffer so the next call always reports a change.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.tokens.clear();
        self.sections.clear();
    }
}

/// Splits a raw LCD buffer into tokens with row numbers and blink flags.
///
/// Decoding stops at the first NUL or at the end of the buffer.
pub fn tokenize(raw: &[u8]) -> Vec<DisplayToken> {
    let end = raw.iter().position(|&b| b == NUL).unwrap_or(raw.len());
    let raw = &raw[..end];

    let mut tokens = Vec::new();
    let mut row = 1;
    let mut i = skip_spaces(raw, 0);

    while i < raw.len() {
        let start = i;
        while i < raw.len() && raw[i] != SPACE {
            i += 1;
        }
        tokens.push(clean_token(&raw[start..i], row));

        let after = skip_spaces(raw, i);
        if after - i > 1 {
            row += 1;
        }
        i = after;
    }

    tokens
}

fn skip_spaces(raw: &[u8], mut i: usize) -> usize {
    while i < raw.len() && raw[i] == SPACE {
        i += 1;
    }
    i
}

fn clean_token(bytes: &[u8], row: u32) -> DisplayToken {
    let mut cleaned = Vec::with_capacity(bytes.len() + 1);
    let mut blinking = false;

    for &b in bytes {
        match b {
            DEGREE_GLYPH => cleaned.extend_from_slice("°".as_bytes()),
            COLON_GLYPH => cleaned.push(b':'),
            b if b & BLINK_FLAG != 0 => {
                blinking = true;
                cleaned.push(b & !BLINK_FLAG);
            }
            b => cleaned.push(b),
        }
    }

    DisplayToken {
        text: String::from_utf8_lossy(&cleaned).into_owned(),
        blinking,
        row,
    }
}

/// Turns tokens into display sections, splitting clock tokens on `:`.
pub fn split_sections(tokens: &[DisplayToken]) -> Vec<DisplaySection> {
    let mut sections = Vec::with_capacity(tokens.len());

    for token in tokens {
        if !token.text.contains(':') {
            sections.push(DisplaySection::new(token.text.clone(), token.blinking, token.row));
            continue;
        }

        let pieces: Vec<&str> = token.text.split(':').collect();
        let last = pieces.len() - 1;
        for (n, piece) in pieces.iter().enumerate() {
            if n == last {
                sections.push(DisplaySection::new(":", true, token.row));
            }
            sections.push(DisplaySection::new(*piece, token.blinking, token.row));
        }
    }

    sections
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lcd(text: &[u8]) -> Vec<u8> {
        let mut raw = text.to_vec();
        raw.push(NUL);
        raw
    }

    fn contents(sections: &[DisplaySection]) -> Vec<(&str, bool, u32)> {
        sections
            .iter()
            .map(|s| (s.content.as_str(), s.blinking, s.row))
            .collect()
    }

    #[test]
    fn test_single_space_keeps_row_and_run_of_spaces_advances_it() {
        let tokens = tokenize(b"  Pool Temp   80 ");
        let rows: Vec<(&str, u32)> = tokens.iter().map(|t| (t.text.as_str(), t.row)).collect();
        assert_eq!(rows, vec![("Pool", 1), ("Temp", 1), ("80", 2)]);
    }

    #[test]
    fn test_degree_glyph_becomes_degree_sign_without_blinking() {
        let tokens = tokenize(&lcd(b"84\xDFF"));
        assert_eq!(tokens[0].text, "84°F");
        assert!(!tokens[0].blinking);
    }

    #[test]
    fn test_top_bit_marks_token_blinking() {
        // 'O' | 0x80, 'n' | 0x80
        let tokens = tokenize(&lcd(&[0xCF, 0xEE, SPACE, b'x']));
        assert_eq!(tokens[0].text, "On");
        assert!(tokens[0].blinking);
        assert!(!tokens[1].blinking);
    }

    #[test]
    fn test_colon_glyph_is_rewritten() {
        let tokens = tokenize(&lcd(b"10\xBA04P"));
        assert_eq!(tokens[0].text, "10:04P");
        assert!(!tokens[0].blinking);
    }

    #[test]
    fn test_decoding_stops_at_nul() {
        let tokens = tokenize(b"Salt\0 garbage");
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn test_buffer_without_nul_is_still_decoded() {
        let tokens = tokenize(b"Heater1 Auto");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_colon_token_splits_with_blinking_colon_before_last_piece() {
        // Arrange
        let tokens = tokenize(&lcd(b"      Tuesday          10:04P    "));

        // Act
        let sections = split_sections(&tokens);

        // Assert
        assert_eq!(
            contents(&sections),
            vec![
                ("Tuesday", false, 1),
                ("10", false, 2),
                (":", true, 2),
                ("04P", false, 2),
            ]
        );
    }

    #[test]
    fn test_identical_buffer_reports_no_change() {
        // Arrange
        let mut decoder = DisplayDecoder::new();
        let raw = lcd(b"  Filter Speed   High ");

        // Act
        let first = decoder.decode(&raw);
        let second = decoder.decode(&raw);

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(decoder.sections().len(), 3);
    }

    #[test]
    fn test_text_joins_rows_with_newlines() {
        let mut decoder = DisplayDecoder::new();
        decoder.decode(&lcd(b"  Air Temp   84\xDFF "));
        assert_eq!(decoder.text(), "Air Temp\n84°F");
    }

    #[test]
    fn test_reset_forces_next_decode_to_report_change() {
        let mut decoder = DisplayDecoder::new();
        let raw = lcd(b"Spa");
        decoder.decode(&raw);
        decoder.reset();
        assert!(decoder.decode(&raw));
    }
}
