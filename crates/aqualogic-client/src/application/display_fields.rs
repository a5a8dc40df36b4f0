//! Extraction of scalar readings from decoded LCD text.
//!
//! The controller never sends temperatures or chlorinator output as binary
//! values; it cycles them across the LCD.  Each screen is matched against the
//! known layouts below by its leading words.
//!
//! | Screen                         | Reading                          |
//! |--------------------------------|----------------------------------|
//! | `Pool Temp 80°F`               | pool/spa/air temperature + unit  |
//! | `Spa Chlorinator 3%`           | chlorinator output               |
//! | `Salt Level 3.1 g/L`           | salt level + unit                |
//! | `Check System <message...>`    | system alarm text                |
//! | `Heater1 Auto ...`             | heater mode (Auto / Manual)      |
//! | `Menu-Locked` / `Menu-Unlocked`| menu lock                        |

use thiserror::Error;

use aqualogic_core::DisplayToken;

/// Temperature sensors shown on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Pool,
    Spa,
    Air,
}

/// Body of water a chlorinator setting applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    Pool,
    Spa,
}

/// A reading recognised on one display screen.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayField {
    Temperature { sensor: Sensor, value: i32, metric: bool },
    Chlorinator { body: Body, percent: u8 },
    SaltLevel { value: f64, metric: bool },
    CheckSystem(String),
    HeaterAutoMode(bool),
    MenuLocked(bool),
}

/// A screen that matched a known layout but carried an unreadable value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayFieldError {
    #[error("missing value after {0:?}")]
    MissingValue(String),
    #[error("unreadable {what} value {text:?}")]
    BadNumber { what: &'static str, text: String },
}

/// Reads the known reading out of one display screen.
///
/// Returns `Ok(None)` for screens with no reading (menus, the clock).
pub fn extract(tokens: &[DisplayToken]) -> Result<Option<DisplayField>, DisplayFieldError> {
    let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

    if words.contains(&"Menu-Locked") {
        return Ok(Some(DisplayField::MenuLocked(true)));
    }
    if words.contains(&"Menu-Unlocked") {
        return Ok(Some(DisplayField::MenuLocked(false)));
    }

    match words.as_slice() {
        [name, "Temp", rest @ ..] => {
            let sensor = match *name {
                "Pool" => Sensor::Pool,
                "Spa" => Sensor::Spa,
                "Air" => Sensor::Air,
                _ => return Ok(None),
            };
            let (value, metric) = temperature(rest)?;
            Ok(Some(DisplayField::Temperature {
                sensor,
                value,
                metric,
            }))
        }
        [name, "Chlorinator", rest @ ..] => {
            let body = match *name {
                "Pool" => Body::Pool,
                "Spa" => Body::Spa,
                _ => return Ok(None),
            };
            let text = first(rest, "Chlorinator")?;
            let percent = text
                .trim_end_matches('%')
                .parse()
                .map_err(|_| bad("chlorinator", text))?;
            Ok(Some(DisplayField::Chlorinator { body, percent }))
        }
        ["Salt", "Level", rest @ ..] => {
            let text = first(rest, "Salt Level")?;
            let value: f64 = text.parse().map_err(|_| bad("salt level", text))?;
            Ok(Some(DisplayField::SaltLevel {
                value: (value * 10.0).round() / 10.0,
                metric: rest.get(1) == Some(&"g/L"),
            }))
        }
        ["Check", "System", message @ ..] => {
            Ok(Some(DisplayField::CheckSystem(message.join(" "))))
        }
        ["Heater1", "Auto", ..] => Ok(Some(DisplayField::HeaterAutoMode(true))),
        ["Heater1", "Manual", ..] => Ok(Some(DisplayField::HeaterAutoMode(false))),
        _ => Ok(None),
    }
}

/// Parses `84°F`, or `84` followed by a separate `°F` word.
fn temperature(rest: &[&str]) -> Result<(i32, bool), DisplayFieldError> {
    let text = first(rest, "Temp")?;
    let digits = text.trim_end_matches(|c: char| !c.is_ascii_digit());
    let value = digits.parse().map_err(|_| bad("temperature", text))?;

    let unit = if digits.len() < text.len() {
        text
    } else {
        rest.get(1).copied().unwrap_or_default()
    };
    Ok((value, unit.ends_with('C')))
}

fn first<'a>(rest: &[&'a str], after: &str) -> Result<&'a str, DisplayFieldError> {
    rest.first()
        .copied()
        .ok_or_else(|| DisplayFieldError::MissingValue(after.to_string()))
}

fn bad(what: &'static str, text: &str) -> DisplayFieldError {
    DisplayFieldError::BadNumber {
        what,
        text: text.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use aqualogic_core::domain::display::tokenize;

    /// Runs raw LCD bytes through the tokenizer; `\xDF` is the degree glyph.
    fn screen(raw: &[u8]) -> Result<Option<DisplayField>, DisplayFieldError> {
        extract(&tokenize(raw))
    }

    #[test]
    fn test_negative_metric_air_temperature() {
        assert_eq!(
            screen(b"  Air Temp   -6\xDFC "),
            Ok(Some(DisplayField::Temperature {
                sensor: Sensor::Air,
                value: -6,
                metric: true,
            }))
        );
    }

    #[test]
    fn test_temperature_with_separate_unit_word() {
        assert_eq!(
            screen(b"  Pool Temp   84 \xDFF "),
            Ok(Some(DisplayField::Temperature {
                sensor: Sensor::Pool,
                value: 84,
                metric: false,
            }))
        );
    }

    #[test]
    fn test_spa_chlorinator_percent() {
        assert_eq!(
            screen(b"  Spa Chlorinator   3% "),
            Ok(Some(DisplayField::Chlorinator {
                body: Body::Spa,
                percent: 3,
            }))
        );
    }

    #[test]
    fn test_salt_level_in_grams_per_litre() {
        assert_eq!(
            screen(b"  Salt Level   3.14 g/L "),
            Ok(Some(DisplayField::SaltLevel {
                value: 3.1,
                metric: true,
            }))
        );
    }

    #[test]
    fn test_salt_level_in_ppm_is_imperial() {
        assert_eq!(
            screen(b"  Salt Level   3100 PPM "),
            Ok(Some(DisplayField::SaltLevel {
                value: 3100.0,
                metric: false,
            }))
        );
    }

    #[test]
    fn test_check_system_joins_message_words() {
        assert_eq!(
            screen(b"  Check System   Low Salt "),
            Ok(Some(DisplayField::CheckSystem("Low Salt".to_string())))
        );
    }

    #[test]
    fn test_heater_mode_and_menu_lock() {
        assert_eq!(
            screen(b"  Heater1 Manual   Off "),
            Ok(Some(DisplayField::HeaterAutoMode(false)))
        );
        assert_eq!(
            screen(b"  Menu-Locked "),
            Ok(Some(DisplayField::MenuLocked(true)))
        );
    }

    #[test]
    fn test_unrelated_screen_has_no_reading() {
        assert_eq!(screen(b"  Tuesday   10:04P "), Ok(None));
        assert_eq!(screen(b"  Filter Speed   High "), Ok(None));
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        assert_eq!(
            screen(b"  Pool Temp   --\xDFF "),
            Err(DisplayFieldError::BadNumber {
                what: "temperature",
                text: "--°F".to_string(),
            })
        );
        assert!(matches!(
            screen(b"  Pool Chlorinator "),
            Err(DisplayFieldError::MissingValue(_))
        ));
    }
}
