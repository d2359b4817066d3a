//! Cache key construction

use std::collections::BTreeMap;
use std::fmt::Display;

/// Separator between the prefix and each parameter segment
pub const SEGMENT_SEPARATOR: &str = "_";

/// Separator between a parameter name and its value
pub const VALUE_SEPARATOR: &str = ":";

/// Logical resource namespaces used as key prefixes
pub mod namespace {
    pub const TOPICS: &str = "topics";
    pub const COMPANIES: &str = "companies";
    pub const QUESTIONS: &str = "questions";
    pub const COMPANY_QUESTIONS: &str = "company_questions";
    pub const EXPERIENCES: &str = "experiences";
    pub const ALUMNI_SEARCH: &str = "alumni_search";
    pub const BOOKMARKS: &str = "bookmarks";
    pub const ADMIN_STATS: &str = "admin_stats";
}

/// Parameters for cache key generation
///
/// Absent parameters are dropped and the remaining ones are kept sorted by
/// name, so the resulting key does not depend on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheKeyParams {
    /// Logical resource name (e.g. "questions")
    pub prefix: String,
    /// Present filter parameters, sorted by name
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    /// Creates new cache key parameters for a resource prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            components: BTreeMap::new(),
        }
    }

    /// Adds a filter parameter; `None` values are skipped
    pub fn with<V: Display>(mut self, name: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.components.insert(name.into(), value.to_string());
        }
        self
    }

    /// Adds a filter parameter that is always present
    pub fn with_component(self, name: impl Into<String>, value: impl Display) -> Self {
        self.with(name, Some(value))
    }

    /// Renders the key
    pub fn build(&self) -> String {
        if self.components.is_empty() {
            return self.prefix.clone();
        }

        let params = self
            .components
            .iter()
            .map(|(name, value)| format!("{}{}{}", name, VALUE_SEPARATOR, value))
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR);

        format!("{}{}{}", self.prefix, SEGMENT_SEPARATOR, params)
    }
}

/// Builds a deterministic cache key from a prefix and named optional filters
///
/// ```
/// use prep_cache::domain::cache::build_key;
///
/// let key = build_key("questions", [("topic_id", Some("abc")), ("difficulty", None)]);
/// assert_eq!(key, "questions_topic_id:abc");
/// ```
pub fn build_key<I, K, V>(prefix: &str, filters: I) -> String
where
    I: IntoIterator<Item = (K, Option<V>)>,
    K: Into<String>,
    V: Display,
{
    filters
        .into_iter()
        .fold(CacheKeyParams::new(prefix), |params, (name, value)| {
            params.with(name, value)
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_prefix_without_params() {
        assert_eq!(CacheKeyParams::new("topics").build(), "topics");
    }

    #[test]
    fn test_none_values_are_dropped() {
        let key = build_key("questions", [("topic_id", Some("abc")), ("difficulty", None)]);
        assert_eq!(key, "questions_topic_id:abc");
    }

    #[test]
    fn test_all_none_yields_prefix() {
        let key = build_key::<_, _, &str>("alumni_search", [("company", None), ("year", None)]);
        assert_eq!(key, "alumni_search");
    }

    #[test]
    fn test_order_independent() {
        let a = build_key(
            "alumni_search",
            [("year", Some("2021")), ("company", Some("acme")), ("branch", Some("cse"))],
        );
        let b = build_key(
            "alumni_search",
            [("branch", Some("cse")), ("year", Some("2021")), ("company", Some("acme"))],
        );

        assert_eq!(a, b);
        assert_eq!(a, "alumni_search_branch:cse_company:acme_year:2021");
    }

    #[test]
    fn test_empty_string_is_not_none() {
        let empty = build_key("questions", [("difficulty", Some(""))]);
        let absent = build_key::<_, _, &str>("questions", [("difficulty", None)]);

        assert_eq!(empty, "questions_difficulty:");
        assert_ne!(empty, absent);
    }

    #[test]
    fn test_non_string_values() {
        let params = CacheKeyParams::new(namespace::COMPANY_QUESTIONS)
            .with_component("company_id", "C1")
            .with("page", Some(2))
            .with("premium", Some(true));

        assert_eq!(
            params.build(),
            "company_questions_company_id:C1_page:2_premium:true"
        );
    }
}
