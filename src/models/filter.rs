//! Snippet search filters.
//!
//! A filter set is split in two: language, visibility and favorite are pushed
//! into the SQL query, while tag intersection runs over the fetched rows.
//! Per-user snippet counts are small, so post-filtering in memory is cheaper
//! than a relational division query.
//!
//! The substring filter always runs in memory with Unicode lowercasing. SQLite
//! `LIKE` only folds ASCII case, so it is used as a prefilter for ASCII
//! queries alone.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Snippet;

/// Public/private scope of a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

/// Filters accepted by snippet listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetFilters {
    /// Case-insensitive substring over title, description and code.
    pub query: Option<String>,
    /// Exact language match.
    pub language: Option<String>,
    /// Every name listed must be present on the snippet (case-insensitive).
    #[serde(default)]
    pub tags: Vec<String>,
    pub visibility: Option<Visibility>,
    pub favorite: Option<bool>,
}

impl SnippetFilters {
    /// Trim inputs, drop blanks, lowercase and dedupe tag names.
    pub fn normalized(mut self) -> Self {
        self.query = self
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        self.language = self
            .language
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        self.tags = tags;
        self
    }

    /// `LIKE` prefilter for an ASCII substring query, with wildcards escaped
    /// by `\`. `None` for non-ASCII queries, which `LIKE` would not fold.
    pub fn like_pattern(&self) -> Option<String> {
        self.query.as_deref().filter(|q| q.is_ascii()).map(|q| {
            let mut escaped = String::with_capacity(q.len() + 2);
            escaped.push('%');
            for c in q.chars() {
                if matches!(c, '%' | '_' | '\\') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped.push('%');
            escaped
        })
    }

    /// Whether the snippet carries every requested tag name.
    pub fn matches_tags(&self, snippet: &Snippet) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        let names = snippet.tag_names_lower();
        self.tags
            .iter()
            .all(|wanted| names.iter().any(|n| n == &wanted.to_lowercase()))
    }

    /// Whether title, description or code contain the query, ignoring case.
    pub fn matches_query(&self, snippet: &Snippet) -> bool {
        let Some(query) = self.query.as_deref() else {
            return true;
        };
        let needle = query.to_lowercase();
        [
            Some(snippet.title.as_str()),
            snippet.description.as_deref(),
            Some(snippet.code.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// Keep only snippets matching the in-memory part of the filters.
    pub fn retain_matching(&self, snippets: Vec<Snippet>) -> Vec<Snippet> {
        if self.tags.is_empty() && self.query.is_none() {
            return snippets;
        }
        snippets
            .into_iter()
            .filter(|s| self.matches_query(s) && self.matches_tags(s))
            .collect()
    }

    /// Stable hash of the normalized filter set, used as a cache key component.
    pub fn cache_hash(&self) -> String {
        let normalized = self.clone().normalized();
        let encoded = serde_json::to_vec(&normalized).unwrap_or_default();
        let digest = Sha256::digest(&encoded);
        hex::encode(&digest[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Snippet, SnippetRow, SnippetTagRow};
    use rstest::rstest;

    fn snippet_titled(title: &str) -> Snippet {
        let mut snippet = snippet_with_tags(&[]);
        snippet.title = title.to_string();
        snippet
    }

    fn snippet_with_tags(names: &[&str]) -> Snippet {
        let row = SnippetRow {
            id: "s1".into(),
            user_id: "u1".into(),
            title: "t".into(),
            description: None,
            code: "c".into(),
            language: "rust".into(),
            is_favorite: false,
            is_public: false,
            created_at: String::new(),
            updated_at: String::new(),
            author_username: None,
        };
        let tags: Vec<SnippetTagRow> = names
            .iter()
            .map(|n| SnippetTagRow {
                snippet_id: "s1".into(),
                id: format!("id-{}", n),
                user_id: "u1".into(),
                name: n.to_string(),
                color: "#000000".into(),
            })
            .collect();
        Snippet::from_joined(row, &tags)
    }

    #[rstest]
    #[case(&["React", "hooks"], &["react"], true)]
    #[case(&["React", "hooks"], &["REACT", "Hooks"], true)]
    #[case(&["React"], &["react", "hooks"], false)]
    #[case(&[], &["react"], false)]
    #[case(&["anything"], &[], true)]
    fn test_tag_superset(#[case] has: &[&str], #[case] wanted: &[&str], #[case] expected: bool) {
        let filters = SnippetFilters {
            tags: wanted.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
        .normalized();
        assert_eq!(filters.matches_tags(&snippet_with_tags(has)), expected);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        let filters = SnippetFilters {
            query: Some(" 100%_done\\ ".into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(filters.like_pattern().unwrap(), "%100\\%\\_done\\\\%");
    }

    #[test]
    fn test_non_ascii_query_skips_like_prefilter() {
        let filters = SnippetFilters {
            query: Some("École".into()),
            ..Default::default()
        }
        .normalized();
        assert!(filters.like_pattern().is_none());
    }

    #[rstest]
    #[case("École primaire", "école", true)]
    #[case("ÜBER cache", "über", true)]
    #[case("Debounce", "DEBOUNCE", true)]
    #[case("Debounce", "throttle", false)]
    fn test_query_folds_unicode_case(
        #[case] title: &str,
        #[case] query: &str,
        #[case] expected: bool,
    ) {
        let filters = SnippetFilters {
            query: Some(query.into()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(filters.matches_query(&snippet_titled(title)), expected);
        assert_eq!(filters.retain_matching(vec![snippet_titled(title)]).len(), expected as usize);
    }

    #[test]
    fn test_blank_filters_normalize_away() {
        let filters = SnippetFilters {
            query: Some("   ".into()),
            language: Some("".into()),
            tags: vec![" ".into(), "Web".into(), "web".into()],
            ..Default::default()
        }
        .normalized();
        assert!(filters.query.is_none());
        assert!(filters.language.is_none());
        assert_eq!(filters.tags, vec!["web"]);
    }

    #[test]
    fn test_cache_hash_ignores_tag_order_and_case() {
        let a = SnippetFilters {
            tags: vec!["b".into(), "A".into()],
            ..Default::default()
        };
        let b = SnippetFilters {
            tags: vec!["a".into(), "B".into()],
            ..Default::default()
        };
        assert_eq!(a.cache_hash(), b.cache_hash());
        assert_ne!(a.cache_hash(), SnippetFilters::default().cache_hash());
    }
}
