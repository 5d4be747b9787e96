//! Ambiguity-aware name resolution
//!
//! Match tiers, tried in order until one yields candidates:
//! 1. exact key
//! 2. case-insensitive full key
//! 3. case-insensitive substring
//! 4. case-insensitive regex found anywhere in the key, where an escaped
//!    `\.` also matches the `/` hierarchy separator
//!
//! Only the first successful tier contributes candidates.

use regex::RegexBuilder;
use std::collections::HashMap;

use crate::error::{AssetError, Result};

/// The tier a query matched at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Exact,
    CaseInsensitive,
    Substring,
    Pattern,
}

/// Collect the candidate keys for `query`, sorted, with the tier they matched at
pub fn match_keys<'a, I>(keys: I, query: &str) -> Option<(MatchTier, Vec<&'a str>)>
where
    I: IntoIterator<Item = &'a str>,
{
    let keys: Vec<&'a str> = keys.into_iter().collect();

    if let Some(key) = keys.iter().find(|k| **k == query) {
        return Some((MatchTier::Exact, vec![*key]));
    }

    let query_lower = query.to_lowercase();

    let found = sorted_matches(&keys, |k| k.to_lowercase() == query_lower);
    if !found.is_empty() {
        return Some((MatchTier::CaseInsensitive, found));
    }

    let found = sorted_matches(&keys, |k| k.to_lowercase().contains(&query_lower));
    if !found.is_empty() {
        return Some((MatchTier::Substring, found));
    }

    let pattern = separator_pattern(query);
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => {
            let found = sorted_matches(&keys, |k| re.is_match(k));
            (!found.is_empty()).then_some((MatchTier::Pattern, found))
        }
        Err(e) => {
            tracing::debug!("Query {:?} is not a usable pattern: {}", query, e);
            None
        }
    }
}

/// Let an escaped `\.` also match the `/` separator. Escaped backslashes
/// are copied through untouched.
fn separator_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 8);
    let mut chars = query.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            pattern.push(c);
            continue;
        }
        match chars.next() {
            Some('.') => pattern.push_str("[./]"),
            Some(next) => {
                pattern.push('\\');
                pattern.push(next);
            }
            None => pattern.push('\\'),
        }
    }
    pattern
}

fn sorted_matches<'a>(keys: &[&'a str], matches: impl Fn(&str) -> bool) -> Vec<&'a str> {
    let mut found: Vec<&'a str> = keys.iter().copied().filter(|k| matches(k)).collect();
    found.sort_unstable();
    found
}

fn require_query(kind: &str, query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(AssetError::Validation(format!("A {kind} name is required")));
    }
    Ok(())
}

/// Resolve a query to exactly one key. Several candidates are an error that
/// lists every one of them.
pub fn resolve_key<'a, I>(keys: I, kind: &str, query: &str) -> Result<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    require_query(kind, query)?;
    match match_keys(keys, query) {
        None => Err(AssetError::not_found(kind, query)),
        Some((_, found)) if found.len() == 1 => Ok(found[0]),
        Some((_, found)) => Err(AssetError::Ambiguous {
            kind: kind.to_string(),
            query: query.to_string(),
            candidates: found.into_iter().map(str::to_string).collect(),
        }),
    }
}

/// Resolve a query to every key of the first matching tier
pub fn resolve_keys<'a, I>(keys: I, kind: &str, query: &str) -> Result<Vec<&'a str>>
where
    I: IntoIterator<Item = &'a str>,
{
    require_query(kind, query)?;
    match match_keys(keys, query) {
        None => Err(AssetError::not_found(kind, query)),
        Some((_, found)) => Ok(found),
    }
}

/// Resolve a query against a keyed map, returning the single match
pub fn resolve_one<'a, V>(
    items: &'a HashMap<String, V>,
    kind: &str,
    query: &str,
) -> Result<(&'a str, &'a V)> {
    let key = resolve_key(items.keys().map(String::as_str), kind, query)?;
    let (key, value) = items
        .get_key_value(key)
        .ok_or_else(|| AssetError::not_found(kind, query))?;
    Ok((key.as_str(), value))
}

/// Resolve a query against a keyed map, returning every match
pub fn resolve_all<'a, V>(
    items: &'a HashMap<String, V>,
    kind: &str,
    query: &str,
) -> Result<Vec<&'a str>> {
    resolve_keys(items.keys().map(String::as_str), kind, query)
}
