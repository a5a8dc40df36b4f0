//! Integration tests for LCD display decoding through the public API.
//!
//! Buffers are shaped like real panel captures: leading padding, words split
//! by single spaces, rows split by runs of spaces, and a trailing NUL.

use aqualogic_core::domain::display::tokenize;
use aqualogic_core::{DisplayDecoder, DisplaySection};

fn section(content: &str, blinking: bool, row: u32) -> DisplaySection {
    DisplaySection {
        content: content.to_string(),
        blinking,
        row,
    }
}

#[test]
fn test_air_temperature_screen_decodes_to_two_rows() {
    // Arrange – degree glyph 0xDF, padded to the panel width
    let mut raw = b"  Air Temp   84 \xDFF ".to_vec();
    raw.extend_from_slice(&[b' '; 20]);
    raw.push(0);
    let mut decoder = DisplayDecoder::new();

    // Act
    let changed = decoder.decode(&raw);

    // Assert
    assert!(changed);
    assert_eq!(
        decoder.sections(),
        &[
            section("Air", false, 1),
            section("Temp", false, 1),
            section("84", false, 2),
            section("°F", false, 2),
        ]
    );
}

#[test]
fn test_underscore_placeholder_stays_inside_its_token() {
    let raw = b"  Air Temp   84_F                      \0";
    let tokens = tokenize(raw);
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["Air", "Temp", "84_F"]);
    assert_eq!(tokens[2].row, 2);
}

#[test]
fn test_clock_screen_splits_on_colon() {
    // Arrange
    let raw = b"      Tuesday             10:04P       \0";
    let mut decoder = DisplayDecoder::new();

    // Act
    decoder.decode(raw);

    // Assert
    assert_eq!(
        decoder.sections(),
        &[
            section("Tuesday", false, 1),
            section("10", false, 2),
            section(":", true, 2),
            section("04P", false, 2),
        ]
    );
}

#[test]
fn test_blinking_menu_value() {
    // "Off" with the blink bit set on every character
    let mut raw = b"  Heater1   ".to_vec();
    raw.extend(b"Off".iter().map(|b| b | 0x80));
    raw.push(0);

    let mut decoder = DisplayDecoder::new();
    decoder.decode(&raw);

    assert_eq!(
        decoder.sections(),
        &[section("Heater1", false, 1), section("Off", true, 2)]
    );
}

#[test]
fn test_repeated_buffer_is_reported_unchanged() {
    let raw = b"  Pool Chlorinator   50%  \0";
    let mut decoder = DisplayDecoder::new();

    assert!(decoder.decode(raw));
    assert!(!decoder.decode(raw));
    assert!(decoder.decode(b"  Spa Chlorinator   3%  \0"));
    assert_eq!(decoder.text(), "Spa Chlorinator\n3%");
}
