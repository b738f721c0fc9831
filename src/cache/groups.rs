//! Group Classifier Module
//!
//! Decides which tier a cache group may use and how its keys are scoped.

use std::collections::BTreeSet;

/// Groups shared by every tenant out of the box.
pub const DEFAULT_GLOBAL_GROUPS: &[&str] = &[
    "users",
    "userlogins",
    "usermeta",
    "site-options",
    "site-lookup",
    "blog-lookup",
    "blog-details",
    "rss",
];

/// Groups that never leave the local cache out of the box.
pub const DEFAULT_NON_PERSISTENT_GROUPS: &[&str] = &["comment", "counts"];

// == Group Class ==
/// Classification of a cache group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupClass {
    /// Visible across tenants, keyed under the `global` scope
    Global,
    /// Local cache only, never sent to the persistent tier
    NonPersistent,
    /// Keyed under the current tenant
    TenantScoped,
}

// == Group Classifier ==
/// Mutable global / non-persistent group lists.
///
/// Lists only grow; adding a name that is already present is a no-op.
#[derive(Debug, Clone)]
pub struct GroupClassifier {
    global: BTreeSet<String>,
    non_persistent: BTreeSet<String>,
}

impl GroupClassifier {
    /// Creates a classifier seeded with the default group lists.
    pub fn new() -> Self {
        Self {
            global: DEFAULT_GLOBAL_GROUPS.iter().map(|g| g.to_string()).collect(),
            non_persistent: DEFAULT_NON_PERSISTENT_GROUPS
                .iter()
                .map(|g| g.to_string())
                .collect(),
        }
    }

    /// Creates a classifier with no seeded groups.
    pub fn empty() -> Self {
        Self {
            global: BTreeSet::new(),
            non_persistent: BTreeSet::new(),
        }
    }

    // == Classify ==
    /// Classifies a group. Global wins over non-persistent.
    pub fn classify(&self, group: &str) -> GroupClass {
        if self.global.contains(group) {
            GroupClass::Global
        } else if self.non_persistent.contains(group) {
            GroupClass::NonPersistent
        } else {
            GroupClass::TenantScoped
        }
    }

    // == Extend ==
    /// Adds one or more groups to the global list and returns the updated list.
    pub fn add_global_groups<I, S>(&mut self, groups: I) -> &BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global.extend(groups.into_iter().map(Into::into));
        &self.global
    }

    /// Adds one or more groups to the non-persistent list and returns the
    /// updated list.
    pub fn add_non_persistent_groups<I, S>(&mut self, groups: I) -> &BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_persistent.extend(groups.into_iter().map(Into::into));
        &self.non_persistent
    }

    /// Current global group list.
    pub fn global_groups(&self) -> &BTreeSet<String> {
        &self.global
    }

    /// Current non-persistent group list.
    pub fn non_persistent_groups(&self) -> &BTreeSet<String> {
        &self.non_persistent
    }
}

impl Default for GroupClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_defaults() {
        let groups = GroupClassifier::new();
        assert_eq!(groups.classify("rss"), GroupClass::Global);
        assert_eq!(groups.classify("users"), GroupClass::Global);
        assert_eq!(groups.classify("comment"), GroupClass::NonPersistent);
        assert_eq!(groups.classify("counts"), GroupClass::NonPersistent);
        assert_eq!(groups.classify("widgets"), GroupClass::TenantScoped);
        assert_eq!(groups.classify("default"), GroupClass::TenantScoped);
    }

    #[test]
    fn test_empty_classifies_everything_tenant_scoped() {
        let groups = GroupClassifier::empty();
        assert_eq!(groups.classify("rss"), GroupClass::TenantScoped);
    }

    #[test]
    fn test_add_single_and_many() {
        let mut groups = GroupClassifier::empty();
        let global = groups.add_global_groups(["themes"]);
        assert!(global.contains("themes"));

        let np = groups.add_non_persistent_groups(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(np.len(), 2);
        assert_eq!(groups.classify("b"), GroupClass::NonPersistent);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut groups = GroupClassifier::new();
        let before = groups.global_groups().len();
        groups.add_global_groups(["rss", "rss"]);
        assert_eq!(groups.global_groups().len(), before);
    }

    #[test]
    fn test_global_takes_precedence() {
        let mut groups = GroupClassifier::empty();
        groups.add_non_persistent_groups(["shared"]);
        groups.add_global_groups(["shared"]);
        assert_eq!(groups.classify("shared"), GroupClass::Global);
    }
}
