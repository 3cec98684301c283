use crate::prelude::{SpotError, SpotResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}[Zz]?$").unwrap());
static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Largest number still treated as a frequency token (Hz for microwave spots).
const MAX_FREQUENCY_TOKEN: f64 = 1.0e11;

/// Fields recovered from one feed line, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpot {
    /// Frequency as printed; the unit is not known yet.
    pub frequency: f64,
    pub callsign: String,
    pub comment: String,
}

/// Extracts frequency, callsign and comment from a loosely structured line.
pub fn parse_line(line: &str) -> SpotResult<RawSpot> {
    let tokens: Vec<&str> = strip_marker(line.trim()).split_whitespace().collect();
    let mut saw_frequency = false;
    let mut index = 0;

    while index < tokens.len() {
        let Some(frequency) = parse_frequency(tokens[index]) else {
            index += 1;
            continue;
        };
        saw_frequency = true;

        match tokens.get(index + 1) {
            Some(candidate) if is_callsign(candidate) => {
                return Ok(RawSpot {
                    frequency,
                    callsign: candidate.to_ascii_uppercase(),
                    comment: clean_comment(&tokens[index + 2..]),
                });
            }
            // Extra field ahead of the callsign; resume on the next token.
            Some(_) => index += 1,
            None => break,
        }
    }

    let reason = if saw_frequency {
        "no callsign after frequency"
    } else {
        "no frequency token"
    };
    Err(SpotError::Malformed(format!("{reason}: {}", line.trim())))
}

/// Cluster nodes and the entity database both send Latin-1.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn strip_marker(line: &str) -> &str {
    match line.get(..2) {
        Some(marker) if marker.eq_ignore_ascii_case("DX") => {
            let rest = &line[2..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                line
            }
        }
        _ => line,
    }
}

fn parse_frequency(token: &str) -> Option<f64> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0 && *value < MAX_FREQUENCY_TOKEN)
}

fn is_callsign(token: &str) -> bool {
    !token.contains('-')
        && !TIMESTAMP.is_match(token)
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '/')
        && token.chars().any(|c| c.is_ascii_alphabetic())
        && token.chars().any(|c| c.is_ascii_digit())
}

fn clean_comment(tokens: &[&str]) -> String {
    let body = match tokens.split_last() {
        Some((last, rest)) if TIMESTAMP.is_match(last) => rest,
        _ => tokens,
    };
    let joined = body.join(" ");
    let stripped = MARKUP.replace_all(&joined, " ");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}
