//! Property-based tests for the diff engine.
//!
//! Random registries and observed trees are generated and the set algebra is
//! checked against a direct computation.

#[cfg(test)]
mod proptest_tests {
    use crate::config::{MirrorKind, MirrorSpec, Registry, VendorSpec};
    use crate::diff::{mirrors_to_add, mirrors_to_remove, outputs_to_remove};
    use proptest::collection::{btree_map, btree_set, vec};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,6}"
    }

    fn registry() -> impl Strategy<Value = Registry> {
        (
            btree_set(name(), 0..5),
            btree_map(name(), btree_map(name(), name(), 0..3), 0..4),
            vec(name(), 0..4),
        )
            .prop_map(|(sources, vendors, manual)| Registry {
                sources: sources
                    .into_iter()
                    .map(|n| (n.clone(), format!("https://example.com/{}", n)))
                    .collect(),
                vendors: vendors
                    .into_iter()
                    .map(|(n, skills)| {
                        let spec = VendorSpec {
                            source: format!("https://example.com/{}", n),
                            official: false,
                            skills,
                        };
                        (n, spec)
                    })
                    .collect(),
                manual,
            })
    }

    fn registered_paths() -> impl Strategy<Value = BTreeSet<String>> {
        btree_set(
            (prop_oneof![Just(MirrorKind::Source), Just(MirrorKind::Vendor)], name())
                .prop_map(|(kind, n)| MirrorSpec::new(kind, &n, "u").local_path),
            0..8,
        )
    }

    proptest! {
        /// Property: add = declared \ registered, remove = registered \ declared
        #[test]
        fn mirror_sets_are_exact_differences(
            registry in registry(),
            registered in registered_paths(),
        ) {
            let declared = registry.mirror_paths();
            let add: BTreeSet<String> = mirrors_to_add(&registry.mirrors(), &registered)
                .into_iter()
                .map(|m| m.local_path)
                .collect();
            let remove: BTreeSet<String> =
                mirrors_to_remove(&declared, &registered).into_iter().collect();

            let expected_add: BTreeSet<String> =
                declared.difference(&registered).cloned().collect();
            let expected_remove: BTreeSet<String> =
                registered.difference(&declared).cloned().collect();

            prop_assert_eq!(&add, &expected_add);
            prop_assert_eq!(&remove, &expected_remove);
            prop_assert!(add.is_disjoint(&remove));
        }

        /// Property: an expected output name is never scheduled for removal
        #[test]
        fn cleanup_never_targets_expected_outputs(
            registry in registry(),
            on_disk in btree_set(name(), 0..10),
        ) {
            let expected = registry.expected_outputs();
            let to_remove = outputs_to_remove(&expected, &on_disk);

            for output in &to_remove {
                prop_assert!(!expected.contains(output));
                prop_assert!(on_disk.contains(output));
            }
            for output in on_disk.difference(&expected) {
                prop_assert!(to_remove.contains(output));
            }
        }

        /// Property: results are sorted
        #[test]
        fn results_are_sorted(
            registry in registry(),
            registered in registered_paths(),
        ) {
            let add: Vec<String> = mirrors_to_add(&registry.mirrors(), &registered)
                .into_iter()
                .map(|m| m.local_path)
                .collect();
            let mut sorted = add.clone();
            sorted.sort();
            prop_assert_eq!(add, sorted);
        }
    }
}
