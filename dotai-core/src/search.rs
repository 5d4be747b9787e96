//! Multi-term search over stored and catalog entries
//!
//! A query is split on whitespace and commas into terms that must all match
//! (AND). Terms containing regex metacharacters are compiled as
//! case-insensitive patterns; other terms are case-insensitive substring
//! tests. Both run against the entry's name, description and tags. Tag
//! filters are exact, case-insensitive tag memberships, also ANDed.

use regex::{Regex, RegexBuilder};

use crate::catalog::{CatalogEntry, CatalogIndex};
use crate::category::Category;
use crate::entry::CategoryEntry;
use crate::error::{AssetError, Result};
use crate::store::CategoryStore;

/// Minimum combined term length when no tag filter is given
pub const MIN_QUERY_CHARS: usize = 3;

const REGEX_META: &[char] = &[
    '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$', '\\',
];

/// The record behind a search result
#[derive(Debug, Clone, PartialEq)]
pub enum SearchItem {
    Stored(CategoryEntry),
    Catalog(CatalogEntry),
}

/// A searchable entry, regardless of where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub category: Category,
    pub name: String,
    pub item: SearchItem,
}

impl SearchResult {
    pub fn stored(entry: &CategoryEntry) -> Self {
        Self {
            category: entry.category,
            name: entry.name.clone(),
            item: SearchItem::Stored(entry.clone()),
        }
    }

    pub fn catalog(entry: &CatalogEntry) -> Self {
        Self {
            category: entry.category,
            name: entry.name.clone(),
            item: SearchItem::Catalog(entry.clone()),
        }
    }

    /// Every catalog entry, in index order
    pub fn from_index(index: &CatalogIndex) -> Vec<Self> {
        index.all_entries().into_iter().map(Self::catalog).collect()
    }

    /// Every stored entry, category by category in display order
    pub fn from_stores<'a>(stores: impl IntoIterator<Item = &'a CategoryStore>) -> Vec<Self> {
        stores
            .into_iter()
            .flat_map(|store| store.iter().map(Self::stored))
            .collect()
    }

    pub fn description(&self) -> &str {
        match &self.item {
            SearchItem::Stored(entry) => entry.description_or_empty(),
            SearchItem::Catalog(entry) => &entry.description,
        }
    }

    pub fn tags(&self) -> &[String] {
        match &self.item {
            SearchItem::Stored(entry) => &entry.tags,
            SearchItem::Catalog(entry) => &entry.tags,
        }
    }

    pub fn catalog_entry(&self) -> Option<&CatalogEntry> {
        match &self.item {
            SearchItem::Catalog(entry) => Some(entry),
            SearchItem::Stored(_) => None,
        }
    }

    /// `category/name`
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }

    fn haystack(&self) -> String {
        let mut text = String::with_capacity(self.name.len() + self.description().len() + 32);
        text.push_str(&self.name);
        text.push(' ');
        text.push_str(self.description());
        for tag in self.tags() {
            text.push(' ');
            text.push_str(tag);
        }
        text
    }

}

/// True when `tags` carries every tag of `wanted`, ignoring case
pub fn has_all_tags(tags: &[String], wanted: &[String]) -> bool {
    wanted.iter().all(|w| {
        let w = w.to_lowercase();
        tags.iter().any(|t| t.to_lowercase() == w)
    })
}

/// How a single query term is evaluated
#[derive(Debug)]
enum TermMatcher {
    Pattern(Regex),
    Substring(String),
}

impl TermMatcher {
    fn compile(term: &str) -> Result<Self> {
        if !term.contains(REGEX_META) {
            return Ok(TermMatcher::Substring(term.to_lowercase()));
        }

        RegexBuilder::new(term)
            .case_insensitive(true)
            .build()
            .map(TermMatcher::Pattern)
            .map_err(|e| AssetError::Validation(format!("Invalid search pattern '{term}': {e}")))
    }

    fn is_match(&self, haystack: &str, haystack_lower: &str) -> bool {
        match self {
            TermMatcher::Pattern(re) => re.is_match(haystack),
            TermMatcher::Substring(needle) => haystack_lower.contains(needle.as_str()),
        }
    }
}

/// Split a query into non-empty terms on whitespace and commas
pub fn query_terms(query: &str) -> Vec<String> {
    query
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split `--tag` values on commas, dropping empties
pub fn parse_tags<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter()
        .flat_map(|v| v.as_ref().split(','))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reject queries too short to be useful, unless a tag filter narrows the search
pub fn validate_search_query(query: &str, tags: &[String]) -> Result<Vec<String>> {
    let terms = query_terms(query);
    let total: usize = terms.iter().map(|t| t.chars().count()).sum();

    if total < MIN_QUERY_CHARS && tags.is_empty() {
        return Err(AssetError::Validation(format!(
            "Search query must be at least {MIN_QUERY_CHARS} characters (or use --tag)"
        )));
    }
    Ok(terms)
}

/// Filter `entries` by query terms and tag filters, keeping input order
pub fn search(entries: &[SearchResult], query: &str, tags: &[String]) -> Result<Vec<SearchResult>> {
    let terms = validate_search_query(query, tags)?;

    // Compile every term before scanning anything
    let matchers = terms
        .iter()
        .map(|t| TermMatcher::compile(t))
        .collect::<Result<Vec<_>>>()?;

    let results: Vec<SearchResult> = entries
        .iter()
        .filter(|entry| has_all_tags(entry.tags(), tags))
        .filter(|entry| {
            if matchers.is_empty() {
                return true;
            }
            let haystack = entry.haystack();
            let lower = haystack.to_lowercase();
            matchers.iter().all(|m| m.is_match(&haystack, &lower))
        })
        .cloned()
        .collect();

    tracing::debug!(
        "Search {:?} (tags: {:?}) matched {} of {} entries",
        query,
        tags,
        results.len(),
        entries.len()
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::ConfigScope;
    use crate::entry::ContentSource;
    use pretty_assertions::assert_eq;

    fn catalog(category: Category, name: &str, description: &str, tags: &[&str]) -> SearchResult {
        let mut entry = CatalogEntry::new(category, name, &format!("mods/{name}"), "v1.0.0");
        entry.description = description.to_string();
        entry.tags = tags.iter().map(|t| t.to_string()).collect();
        SearchResult::catalog(&entry)
    }

    fn sample() -> Vec<SearchResult> {
        vec![
            catalog(
                Category::Role,
                "golang/review/architecture",
                "Reviews Go package architecture",
                &["golang", "review"],
            ),
            catalog(
                Category::Role,
                "golang/review/code",
                "Line-by-line code review",
                &["golang", "Review"],
            ),
            catalog(
                Category::Task,
                "cwd/dotai/create-role",
                "Create a role",
                &["dotai"],
            ),
            catalog(Category::Agent, "claude", "Anthropic CLI", &["anthropic"]),
        ]
    }

    fn names(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_terms_split_on_whitespace_and_commas() {
        assert_eq!(query_terms(" go,review  code ,, "), vec!["go", "review", "code"]);
        assert!(query_terms(" , ").is_empty());
    }

    #[test]
    fn test_parse_tags() {
        let raw = vec!["golang, review".to_string(), ",ops".to_string()];
        assert_eq!(parse_tags(&raw), vec!["golang", "review", "ops"]);
    }

    #[test]
    fn test_short_query_needs_tag() {
        assert!(matches!(
            search(&sample(), "go", &[]),
            Err(AssetError::Validation(_))
        ));
        assert!(matches!(
            search(&sample(), "a b", &[]),
            Err(AssetError::Validation(_))
        ));
        // Terms are summed across the query
        assert!(search(&sample(), "a bc", &[]).is_ok());

        let tags = vec!["golang".to_string()];
        assert_eq!(search(&sample(), "go", &tags).unwrap().len(), 2);
        assert_eq!(search(&sample(), "", &tags).unwrap().len(), 2);
    }

    #[test]
    fn test_and_semantics_and_stable_order() {
        let results = search(&sample(), "review golang", &[]).unwrap();
        assert_eq!(
            names(&results),
            vec!["golang/review/architecture", "golang/review/code"]
        );

        let results = search(&sample(), "review architecture", &[]).unwrap();
        assert_eq!(names(&results), vec!["golang/review/architecture"]);

        assert!(search(&sample(), "review anthropic", &[]).unwrap().is_empty());
    }

    #[test]
    fn test_substring_is_case_insensitive_across_fields() {
        assert_eq!(
            names(&search(&sample(), "ANTHROPIC", &[]).unwrap()),
            vec!["claude"]
        );
        assert_eq!(
            names(&search(&sample(), "line-by", &[]).unwrap()),
            vec!["golang/review/code"]
        );
    }

    #[test]
    fn test_regex_terms() {
        let results = search(&sample(), "^golang/.*/code", &[]).unwrap();
        assert_eq!(names(&results), vec!["golang/review/code"]);

        let results = search(&sample(), "CREATE.ROLE", &[]).unwrap();
        assert_eq!(names(&results), vec!["cwd/dotai/create-role"]);
    }

    #[test]
    fn test_malformed_regex_aborts_whole_search() {
        let err = search(&sample(), "review (unclosed", &[]).unwrap_err();
        assert!(matches!(err, AssetError::Validation(_)));
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn test_tag_filter_is_exact() {
        let tags = vec!["REVIEW".to_string()];
        assert_eq!(search(&sample(), "", &tags).unwrap().len(), 2);

        // A tag filter never matches by substring
        let tags = vec!["rev".to_string()];
        assert!(search(&sample(), "", &tags).unwrap().is_empty());

        let tags = vec!["golang".to_string(), "dotai".to_string()];
        assert!(search(&sample(), "", &tags).unwrap().is_empty());
    }

    #[test]
    fn test_tag_filter_folds_unicode_case() {
        let entries = vec![catalog(Category::Context, "i18n/notes", "Notes", &["Ünicode"])];
        let found = search(&entries, "", &["ünicode".to_string()]).unwrap();
        assert_eq!(found.len(), 1);
        assert!(has_all_tags(&["ÜNICODE".to_string()], &["ünicode".to_string()]));
        assert!(!has_all_tags(&["unicode".to_string()], &["ünicode".to_string()]));
    }

    #[test]
    fn test_stored_entries_are_searchable() {
        let mut store = CategoryStore::new(Category::Context);
        let mut entry = CategoryEntry::new_manual(
            "project-readme",
            Category::Context,
            ConfigScope::Local,
            ContentSource::File("README.md".to_string()),
        )
        .unwrap();
        entry.description = Some("Project overview".to_string());
        entry.tags = vec!["docs".to_string()];
        store.insert(entry);

        let entries = SearchResult::from_stores([&store]);
        let results = search(&entries, "overview", &[]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].qualified_name(), "context/project-readme");
        assert!(results[0].catalog_entry().is_none());
    }
}
