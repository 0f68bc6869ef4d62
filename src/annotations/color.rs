//! Highlight paint parsing
//!
//! Paint is read from inline `background-color` declarations, or the color
//! component of a `background` shorthand, and compared in `#rrggbb` form.
//! Transparent paint and values that do not resolve to a color are no paint
//! at all.

use tracing::debug;

enum Parsed {
    Hex(String),
    Transparent,
}

/// Paint carried by a `background-color` value.
///
/// Returns the normalized hex color, or `None` when the value does not
/// paint. Any CSS color syntax resolves; values that do not (custom
/// properties, keywords such as `inherit`) are treated as unpainted.
pub fn parse_paint(raw: &str) -> Option<String> {
    let value = clean(raw);
    if value.is_empty() {
        return None;
    }
    match parse_color(&value) {
        Some(Parsed::Hex(hex)) => Some(hex),
        Some(Parsed::Transparent) => None,
        None => {
            debug!(%value, "Ignoring paint that does not resolve to a color");
            None
        }
    }
}

/// Paint carried by a `background` shorthand value.
///
/// The color may appear anywhere in the final layer. A shorthand without a
/// color resets the background to transparent.
pub fn shorthand_paint(raw: &str) -> Option<String> {
    let value = clean(raw);
    let layers = split_top_level(&value, |c| c == ',');
    let last = layers.last()?;

    split_top_level(last, |c| c.is_ascii_whitespace())
        .into_iter()
        .find_map(parse_color)
        .and_then(|parsed| match parsed {
            Parsed::Hex(hex) => Some(hex),
            Parsed::Transparent => None,
        })
}

/// A `background` shorthand value with its color component removed.
///
/// Returns an empty string when nothing but the color was declared.
pub fn strip_shorthand_color(raw: &str) -> String {
    let layers = split_top_level(raw, |c| c == ',');
    let Some((last, earlier)) = layers.split_last() else {
        return String::new();
    };

    let kept: Vec<&str> = split_top_level(last, |c| c.is_ascii_whitespace())
        .into_iter()
        .filter(|token| parse_color(&clean(token)).is_none())
        .collect();

    let mut layers: Vec<String> = earlier.iter().map(|layer| layer.to_string()).collect();
    if kept.iter().any(|token| !token.starts_with('!')) {
        layers.push(kept.join(" "));
    }
    layers.join(", ")
}

/// Strictly normalize a color to `#rrggbb`; `None` if it is not an opaque color
pub fn normalize_hex(raw: &str) -> Option<String> {
    match parse_color(&clean(raw)) {
        Some(Parsed::Hex(hex)) => Some(hex),
        _ => None,
    }
}

fn clean(raw: &str) -> String {
    raw.trim()
        .trim_end_matches("!important")
        .trim()
        .to_ascii_lowercase()
}

fn parse_color(value: &str) -> Option<Parsed> {
    // Hex digits need their `#`
    if value.is_empty() || value.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let color = csscolorparser::parse(value).ok()?;
    if color.a <= 0.0 {
        return Some(Parsed::Transparent);
    }
    let [r, g, b, _] = color.to_rgba8();
    Some(Parsed::Hex(format!("#{:02x}{:02x}{:02x}", r, g, b)))
}

/// Split on `separator` outside parentheses, dropping empty pieces
fn split_top_level(value: &str, separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if depth == 0 && separator(c) => {
                pieces.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push(&value[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}
