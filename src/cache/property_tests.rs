//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key derivation and group classification over
//! generated inputs.

use proptest::prelude::*;

use crate::cache::{derive_key, GroupClass, GroupClassifier, LocalCache, ScopePrefix};
use crate::cache::{CacheKey, CacheValue};

// == Strategies ==
/// Generates group or id strings without whitespace
fn token_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_\\-]{1,32}"
}

fn scope_strategy() -> impl Strategy<Value = ScopePrefix> {
    prop_oneof![
        Just(ScopePrefix::Global),
        Just(ScopePrefix::Session),
        "[0-9]{1,6}".prop_map(ScopePrefix::Tenant),
    ]
}

#[derive(Debug, Clone)]
enum LocalOp {
    Put { key: String, value: u64 },
    Delete { key: String },
}

fn local_op_strategy() -> impl Strategy<Value = LocalOp> {
    prop_oneof![
        ("[a-e]", any::<u64>()).prop_map(|(key, value)| LocalOp::Put { key, value }),
        "[a-e]".prop_map(|key| LocalOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Deriving the same logical key twice yields the same key.
    #[test]
    fn prop_key_determinism(
        scope in scope_strategy(),
        group in token_strategy(),
        id in token_strategy(),
        ns in token_strategy()
    ) {
        prop_assert_eq!(
            derive_key(&scope, &group, &id, &ns),
            derive_key(&scope, &group, &id, &ns)
        );
    }

    // Two tenants never share a key for the same tenant-scoped item.
    #[test]
    fn prop_tenant_isolation(
        a in "[0-9]{1,6}",
        b in "[0-9]{1,6}",
        group in token_strategy(),
        id in token_strategy()
    ) {
        prop_assume!(a != b);
        let ka = derive_key(&ScopePrefix::Tenant(a), &group, &id, "db");
        let kb = derive_key(&ScopePrefix::Tenant(b), &group, &id, "db");
        prop_assert_ne!(ka, kb);
    }

    // Changing only the id changes the key.
    #[test]
    fn prop_id_changes_key(
        group in token_strategy(),
        id1 in token_strategy(),
        id2 in token_strategy()
    ) {
        prop_assume!(id1 != id2);
        let scope = ScopePrefix::Tenant("1".to_string());
        prop_assert_ne!(
            derive_key(&scope, &group, &id1, "db"),
            derive_key(&scope, &group, &id2, "db")
        );
    }

    // Inserted whitespace never changes the key.
    #[test]
    fn prop_whitespace_insensitive(group in token_strategy(), id in token_strategy()) {
        let spaced: String = id.chars().flat_map(|c| [c, ' ']).collect();
        prop_assert_eq!(
            derive_key(&ScopePrefix::Global, &group, &id, "db"),
            derive_key(&ScopePrefix::Global, &group, &spaced, "db")
        );
    }

    // A group in both lists classifies as global, regardless of insertion order.
    #[test]
    fn prop_global_precedence(group in token_strategy(), global_first in any::<bool>()) {
        let mut groups = GroupClassifier::empty();
        if global_first {
            groups.add_global_groups([group.clone()]);
            groups.add_non_persistent_groups([group.clone()]);
        } else {
            groups.add_non_persistent_groups([group.clone()]);
            groups.add_global_groups([group.clone()]);
        }
        prop_assert_eq!(groups.classify(&group), GroupClass::Global);
    }

    // Adding groups repeatedly never grows a list past its distinct names.
    #[test]
    fn prop_group_add_idempotent(names in prop::collection::vec(token_strategy(), 1..20)) {
        let mut groups = GroupClassifier::empty();
        groups.add_global_groups(names.clone());
        let once = groups.global_groups().clone();
        groups.add_global_groups(names);
        prop_assert_eq!(groups.global_groups(), &once);
    }

    // The local cache behaves like a plain map.
    #[test]
    fn prop_local_cache_is_a_map(ops in prop::collection::vec(local_op_strategy(), 1..50)) {
        let mut cache = LocalCache::new();
        let mut model = std::collections::HashMap::new();
        for op in ops {
            match op {
                LocalOp::Put { key, value } => {
                    cache.put(CacheKey::from_raw(key.clone()), CacheValue::from(value));
                    model.insert(key, value);
                }
                LocalOp::Delete { key } => {
                    prop_assert_eq!(
                        cache.delete(&CacheKey::from_raw(key.clone())),
                        model.remove(&key).is_some()
                    );
                }
            }
        }
        prop_assert_eq!(cache.len(), model.len());
        for (key, value) in model {
            prop_assert_eq!(
                cache.get(&CacheKey::from_raw(key)),
                Some(&CacheValue::from(value))
            );
        }
    }
}
