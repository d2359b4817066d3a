//! Invalidation rules for writes to primary data

use super::key::{namespace, CacheKeyParams};
use super::pattern::KeyPattern;

/// A mutation of primary data that can leave cached reads stale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Topic,
    Company,
    /// Companies carry a denormalised question count, so an attached company
    /// widens the invalidation
    Question { company_id: Option<String> },
    Experience,
    Alumni,
    Bookmark { user_id: String },
    /// Role or entitlement change of a user
    User,
}

impl Mutation {
    /// Patterns covering every key derived from the mutated resource
    pub fn patterns(&self) -> Vec<KeyPattern> {
        let mut patterns = match self {
            Mutation::Topic => vec![
                KeyPattern::prefix(namespace::TOPICS),
                KeyPattern::prefix(namespace::QUESTIONS),
            ],
            Mutation::Company => vec![
                KeyPattern::prefix(namespace::COMPANIES),
                KeyPattern::prefix(namespace::COMPANY_QUESTIONS),
            ],
            Mutation::Question { company_id } => {
                let mut patterns = vec![
                    KeyPattern::prefix(namespace::QUESTIONS),
                    KeyPattern::prefix(namespace::COMPANY_QUESTIONS),
                    KeyPattern::prefix(namespace::BOOKMARKS),
                ];
                if company_id.is_some() {
                    patterns.push(KeyPattern::prefix(namespace::COMPANIES));
                }
                patterns
            }
            Mutation::Experience => vec![KeyPattern::prefix(namespace::EXPERIENCES)],
            Mutation::Alumni => vec![KeyPattern::prefix(namespace::ALUMNI_SEARCH)],
            Mutation::Bookmark { user_id } => {
                let key = CacheKeyParams::new(namespace::BOOKMARKS)
                    .with_component("user_id", user_id)
                    .build();
                vec![KeyPattern::prefix(&key)]
            }
            Mutation::User => Vec::new(),
        };

        patterns.push(KeyPattern::prefix(namespace::ADMIN_STATS));
        patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(mutation: Mutation) -> Vec<String> {
        mutation
            .patterns()
            .into_iter()
            .map(|p| p.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_question_without_company() {
        let patterns = rendered(Mutation::Question { company_id: None });

        assert_eq!(
            patterns,
            vec!["questions*", "company_questions*", "bookmarks*", "admin_stats*"]
        );
    }

    #[test]
    fn test_question_with_company_invalidates_companies() {
        let patterns = rendered(Mutation::Question {
            company_id: Some("C1".to_string()),
        });

        assert!(patterns.contains(&"companies*".to_string()));
    }

    #[test]
    fn test_bookmark_scoped_to_user() {
        let patterns = rendered(Mutation::Bookmark {
            user_id: "u1".to_string(),
        });

        assert_eq!(patterns[0], "bookmarks_user_id:u1*");
    }

    #[test]
    fn test_user_only_touches_admin_stats() {
        assert_eq!(rendered(Mutation::User), vec!["admin_stats*"]);
    }

    #[test]
    fn test_topic_does_not_touch_company_questions() {
        let patterns = Mutation::Topic.patterns();

        assert!(patterns.iter().any(|p| p.matches("questions_topic_id:T1")));
        assert!(!patterns.iter().any(|p| p.matches("company_questions_company_id:C1")));
    }
}
