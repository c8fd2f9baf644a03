//! Property tests for mining and rule generation.

use proptest::prelude::*;

use basketforge::{generate_rules, mine_frequent_itemsets, IncidenceMatrix, Itemset, RankKey};

const ITEMS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Random baskets over a small item universe, one per transaction
fn baskets() -> impl Strategy<Value = Vec<Vec<bool>>> {
    prop::collection::vec(prop::collection::vec(any::<bool>(), ITEMS.len()), 1..40)
}

fn build_matrix(rows: &[Vec<bool>]) -> IncidenceMatrix {
    IncidenceMatrix::from_baskets(rows.iter().enumerate().map(|(t, row)| {
        let items: Vec<&str> = row
            .iter()
            .zip(ITEMS)
            .filter(|(&present, _)| present)
            .map(|(_, item)| item)
            .collect();
        (format!("T{t:03}"), items)
    }))
    .unwrap()
}

fn contains_all(row: &[bool], itemset: &Itemset) -> bool {
    itemset
        .iter()
        .all(|item| ITEMS.iter().position(|&i| i == item).is_some_and(|col| row[col]))
}

proptest! {
    #[test]
    fn prop_support_matches_brute_force(rows in baskets(), min_support in 0.05f64..1.0) {
        let matrix = build_matrix(&rows);
        let itemsets = mine_frequent_itemsets(&matrix, min_support, None).unwrap();

        for entry in &itemsets {
            let count = rows.iter().filter(|row| contains_all(row, &entry.itemset)).count();
            prop_assert_eq!(entry.count, count);
            prop_assert!((entry.support - count as f64 / rows.len() as f64).abs() < 1e-12);
            prop_assert!(entry.support >= min_support);
            prop_assert!((0.0..=1.0).contains(&entry.support));
        }
    }

    #[test]
    fn prop_anti_monotonicity(rows in baskets(), min_support in 0.05f64..1.0) {
        let matrix = build_matrix(&rows);
        let itemsets = mine_frequent_itemsets(&matrix, min_support, None).unwrap();

        for sup in &itemsets {
            for sub in &itemsets {
                if sub.itemset.is_subset(&sup.itemset) {
                    prop_assert!(sub.support >= sup.support);
                }
            }
            // every proper subset of a frequent itemset is itself reported
            for item in sup.itemset.iter() {
                let rest: Itemset = sup.itemset.iter().filter(|&other| other != item).collect();
                if !rest.is_empty() {
                    prop_assert!(itemsets.get(&rest).is_some());
                }
            }
        }
    }

    #[test]
    fn prop_rule_bounds_and_dedup(rows in baskets(), min_support in 0.05f64..0.6) {
        let matrix = build_matrix(&rows);
        let itemsets = mine_frequent_itemsets(&matrix, min_support, None).unwrap();
        let rules = generate_rules(&itemsets, 0.0, RankKey::ConfSupp, None).unwrap();

        for rule in &rules {
            prop_assert!((0.0..=1.0 + 1e-12).contains(&rule.confidence));
            prop_assert!(rule.lift >= 0.0);
            prop_assert!(rule.antecedents.is_disjoint(&rule.consequents));
            let union = rule.antecedents.union(&rule.consequents);
            prop_assert!(itemsets.get(&union).is_some());

            let reverse_count = rules
                .iter()
                .filter(|other| {
                    other.antecedents == rule.consequents && other.consequents == rule.antecedents
                })
                .count();
            prop_assert_eq!(reverse_count, 0);
        }

        // each frequent pair yields exactly one of its two directions
        for pair in itemsets.of_len(2) {
            let items: Vec<&str> = pair.itemset.iter().collect();
            let (a, b) = (Itemset::single(items[0]), Itemset::single(items[1]));
            let directions = rules
                .iter()
                .filter(|rule| {
                    (rule.antecedents == a && rule.consequents == b)
                        || (rule.antecedents == b && rule.consequents == a)
                })
                .count();
            prop_assert_eq!(directions, 1);
        }
    }

    #[test]
    fn prop_monotone_filtering(
        rows in baskets(),
        low in 0.05f64..0.5,
        delta in 0.0f64..0.5,
        lift_low in 0.0f64..1.5,
        lift_delta in 0.0f64..1.0,
    ) {
        let matrix = build_matrix(&rows);
        let loose = mine_frequent_itemsets(&matrix, low, None).unwrap();
        let strict = mine_frequent_itemsets(&matrix, low + delta, None).unwrap();
        prop_assert!(strict.len() <= loose.len());

        let loose_rules = generate_rules(&loose, lift_low, RankKey::ConfSupp, None).unwrap();
        let strict_rules =
            generate_rules(&loose, lift_low + lift_delta, RankKey::ConfSupp, None).unwrap();
        prop_assert!(strict_rules.len() <= loose_rules.len());
    }

    #[test]
    fn prop_generate_rules_idempotent(
        rows in baskets(),
        min_support in 0.05f64..0.6,
        top in 0usize..8,
    ) {
        let matrix = build_matrix(&rows);
        let itemsets = mine_frequent_itemsets(&matrix, min_support, None).unwrap();

        for key in [RankKey::ConfSupp, RankKey::Confidence] {
            let first = generate_rules(&itemsets, 0.0, key, Some(top)).unwrap();
            let second = generate_rules(&itemsets, 0.0, key, Some(top)).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
