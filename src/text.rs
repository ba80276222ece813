use crate::text_metrics;
use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Em-relative advance used when no system font is available. Grouped by
/// glyph shape, calibrated against Arial.
pub fn char_width_factor(ch: char) -> f32 {
    match ch {
        'i' | 'j' | 'l' | '\'' | '|' => 0.23,
        ' ' | 'f' | 't' | 'I' | '.' | ',' | ':' | ';' | '!' | '(' | ')' | '[' | ']' => 0.29,
        'r' | '"' | '-' => 0.34,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'J' => 0.51,
        'a' | 'b' | 'd' | 'e' | 'g' | 'h' | 'n' | 'o' | 'p' | 'q' | 'u' | '0'..='9' => 0.56,
        'F' | 'L' | 'T' | 'Z' => 0.61,
        'E' | 'P' | 'S' | 'X' | 'Y' | 'K' | 'V' => 0.66,
        'A' | 'B' | 'R' => 0.69,
        'C' | 'D' | 'H' | 'N' | 'U' => 0.72,
        'G' | 'O' | 'Q' => 0.78,
        'm' | 'M' => 0.83,
        'w' => 0.72,
        'W' | '@' | '%' => 0.94,
        _ => 0.58,
    }
}

pub fn fallback_text_width(text: &str, font_size: f32, bold: bool) -> f32 {
    let weight = if bold { 1.06 } else { 1.0 };
    text.chars().map(char_width_factor).sum::<f32>() * font_size * weight
}

/// Measured width of `text`; `fast` skips font lookup entirely so results
/// are identical on every machine.
pub fn text_width(text: &str, font_size: f32, font_family: &str, bold: bool, fast: bool) -> f32 {
    if fast {
        return fallback_text_width(text, font_size, bold);
    }
    text_metrics::measure_text_width(text, font_size, font_family, bold)
        .unwrap_or_else(|| fallback_text_width(text, font_size, bold))
}

/// Greedy word wrap.
///
/// Words are packed onto the current line while `line + word + " "` measures
/// within `max_width`; a word that does not fit starts a new line. A single
/// word wider than `max_width` still gets a line of its own.
pub fn wrap_message<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{line} {word} ");
        if measure(&candidate) > max_width {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        } else {
            line.push(' ');
            line.push_str(word);
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Keeps at most `max_lines` lines; the rest is dropped silently.
pub fn fit_lines(mut lines: Vec<String>, max_lines: usize) -> Vec<String> {
    lines.truncate(max_lines);
    lines
}

/// `Jan 5, 2025, 03:04 PM`: short month, day, year, then a two-digit
/// 12-hour clock.
pub fn format_timestamp<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    timestamp.format("%b %-d, %Y, %I:%M %p").to_string()
}

/// Uppercased first two characters, or `None` for an empty username.
pub fn initials(username: &str) -> Option<String> {
    let initials: String = username.chars().take(2).collect::<String>().to_uppercase();
    if initials.is_empty() { None } else { Some(initials) }
}

pub fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
