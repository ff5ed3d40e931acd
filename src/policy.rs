//! Path classification policy.
//!
//! Pure prefix matching, kept apart from the admission algorithm so the
//! category lists can change without touching concurrency logic.

use serde::Deserialize;

/// How a request path is categorized for admission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathClass {
    /// Serviced from the priority wait queue when capacity is exhausted.
    pub is_priority: bool,
    /// Counted against the heavy sub-pool in addition to the general pool.
    pub is_heavy: bool,
}

/// Prefix lists that decide which requests are priority and which are heavy.
///
/// A path matches a category when any prefix in that category's list is a
/// prefix of the path. Unmatched paths are normal and non-heavy, which is
/// the common case.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathPolicy {
    #[serde(default)]
    pub priority_prefixes: Vec<String>,
    #[serde(default)]
    pub heavy_prefixes: Vec<String>,
}

impl PathPolicy {
    pub fn new(priority_prefixes: Vec<String>, heavy_prefixes: Vec<String>) -> Self {
        Self {
            priority_prefixes,
            heavy_prefixes,
        }
    }

    /// Classify a request path. The two categories are independent: a path
    /// can be priority, heavy, both, or neither.
    pub fn classify(&self, path: &str) -> PathClass {
        PathClass {
            is_priority: self.priority_prefixes.iter().any(|p| path.starts_with(p)),
            is_heavy: self.heavy_prefixes.iter().any(|p| path.starts_with(p)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PathPolicy {
        PathPolicy::new(
            vec!["/checkout".into(), "/api/payments".into()],
            vec!["/api/admin".into(), "/api/export".into()],
        )
    }

    #[test]
    fn test_unmatched_path_is_normal() {
        let class = policy().classify("/products/42");
        assert_eq!(class, PathClass::default());
    }

    #[test]
    fn test_priority_prefix() {
        let class = policy().classify("/checkout/confirm");
        assert!(class.is_priority);
        assert!(!class.is_heavy);
    }

    #[test]
    fn test_heavy_prefix() {
        let class = policy().classify("/api/admin/reindex");
        assert!(class.is_heavy);
        assert!(!class.is_priority);
    }

    #[test]
    fn test_prefix_must_anchor_at_start() {
        let class = policy().classify("/v2/api/admin/reindex");
        assert!(!class.is_heavy);
    }

    #[test]
    fn test_path_can_be_both() {
        let policy = PathPolicy::new(vec!["/api".into()], vec!["/api/export".into()]);
        let class = policy.classify("/api/export/full");
        assert!(class.is_priority);
        assert!(class.is_heavy);
    }

    #[test]
    fn test_empty_policy_matches_nothing() {
        let class = PathPolicy::default().classify("/anything");
        assert_eq!(class, PathClass::default());
    }
}
