//! Interactive multi-item selection parsing
//!
//! Input refers to a 1-based displayed list. Accepted forms:
//! - empty input: cancel (no items, not an error)
//! - `all`: every item in display order
//! - comma-separated integers and inclusive ranges, e.g. `1,3-5,2`
//!
//! Results are 0-based indices in the order typed, without sorting or
//! de-duplication.

use crate::error::{AssetError, Result};
use crate::resolve::resolve_key;

/// Parse a selection over `count` displayed items into 0-based indices
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if input.eq_ignore_ascii_case("all") {
        return Ok((0..count).collect());
    }

    let mut indices = Vec::new();
    for token in input.split(',').map(str::trim) {
        if token.is_empty() {
            return Err(AssetError::Validation(format!(
                "Empty item in selection '{input}'"
            )));
        }

        match token.split_once('-') {
            Some((start, end)) => {
                let start = parse_position(start.trim(), token, count)?;
                let end = parse_position(end.trim(), token, count)?;
                if start > end {
                    return Err(AssetError::Validation(format!(
                        "Invalid range '{token}': start is greater than end"
                    )));
                }
                indices.extend((start..=end).map(|n| n - 1));
            }
            None => {
                let n = parse_position(token, token, count)?;
                indices.push(n - 1);
            }
        }
    }

    Ok(indices)
}

fn parse_position(raw: &str, token: &str, count: usize) -> Result<usize> {
    let n: usize = raw.parse().map_err(|_| {
        AssetError::Validation(format!("Invalid selection '{token}': expected a number or range"))
    })?;
    if n == 0 || n > count {
        return Err(AssetError::Validation(format!(
            "Selection '{token}' is out of range (1-{count})"
        )));
    }
    Ok(n)
}

/// True when the input only uses the numeric selection grammar
fn is_selection_syntax(input: &str) -> bool {
    input.eq_ignore_ascii_case("all")
        || input
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '-' || c.is_whitespace())
}

/// Parse a selection that may also name an item directly.
///
/// Names are tried first through the name resolver; input that is pure
/// selection syntax (numbers, ranges, `all`) skips name matching so that `2`
/// always means the second item.
pub fn parse_selection_or_name(input: &str, names: &[String], kind: &str) -> Result<Vec<usize>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if !is_selection_syntax(trimmed) {
        let key = resolve_key(names.iter().map(String::as_str), kind, trimmed)?;
        let position = names
            .iter()
            .position(|n| n == key)
            .ok_or_else(|| AssetError::not_found(kind, trimmed))?;
        return Ok(vec![position]);
    }

    parse_selection(trimmed, names.len())
}
