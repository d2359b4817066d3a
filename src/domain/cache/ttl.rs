//! TTL tiers

use serde::Deserialize;

/// Lifetime class of a cached resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTtl {
    /// Per-user data such as bookmarks
    UserData,
    /// Aggregate lists such as filtered question lists
    AggregateList,
    /// Near-static reference data such as the topic list
    ReferenceData,
    /// Computed admin statistics
    AdminStats,
}

/// Seconds assigned to each tier
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TtlPolicy {
    #[serde(default = "default_user_data")]
    pub user_data_secs: u64,
    #[serde(default = "default_aggregate_list")]
    pub aggregate_list_secs: u64,
    #[serde(default = "default_reference_data")]
    pub reference_data_secs: u64,
    #[serde(default = "default_admin_stats")]
    pub admin_stats_secs: u64,
}

fn default_user_data() -> u64 {
    1800
}

fn default_aggregate_list() -> u64 {
    3600
}

fn default_reference_data() -> u64 {
    7200
}

fn default_admin_stats() -> u64 {
    300
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            user_data_secs: default_user_data(),
            aggregate_list_secs: default_aggregate_list(),
            reference_data_secs: default_reference_data(),
            admin_stats_secs: default_admin_stats(),
        }
    }
}

impl TtlPolicy {
    pub fn seconds(&self, tier: CacheTtl) -> u64 {
        match tier {
            CacheTtl::UserData => self.user_data_secs,
            CacheTtl::AggregateList => self.aggregate_list_secs,
            CacheTtl::ReferenceData => self.reference_data_secs,
            CacheTtl::AdminStats => self.admin_stats_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tiers() {
        let policy = TtlPolicy::default();

        assert_eq!(policy.seconds(CacheTtl::UserData), 1800);
        assert_eq!(policy.seconds(CacheTtl::AggregateList), 3600);
        assert_eq!(policy.seconds(CacheTtl::ReferenceData), 7200);
        assert_eq!(policy.seconds(CacheTtl::AdminStats), 300);
    }

    #[test]
    fn test_partial_override() {
        let policy: TtlPolicy = serde_json::from_str(r#"{"admin_stats_secs": 60}"#).unwrap();

        assert_eq!(policy.seconds(CacheTtl::AdminStats), 60);
        assert_eq!(policy.seconds(CacheTtl::ReferenceData), 7200);
    }
}
