use itemset_mining::*;
use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use std::collections::HashMap;

const UNIVERSE: u8 = 8;

fn arb_transactions() -> impl Strategy<Value = Vec<Itemset<u8>>> {
    vec(btree_set(0..UNIVERSE, 0..6), 1..25)
        .prop_map(|rows| rows.into_iter().map(|row| row.into_iter().collect()).collect())
}

fn arb_fraction() -> impl Strategy<Value = f64> {
    (1u32..=10).prop_map(|tenths| tenths as f64 / 10.0)
}

/// Counts every non-empty subset of the item universe directly and keeps the frequent ones.
fn brute_force(
    transactions: &[Itemset<u8>],
    minimum_support: f64,
) -> HashMap<Itemset<u8>, usize> {
    let n = transactions.len() as f64;
    (1u32..1 << UNIVERSE)
        .map(|mask| {
            (0..UNIVERSE)
                .filter(|bit| mask & (1 << bit) != 0)
                .collect::<Itemset<u8>>()
        })
        .map(|itemset| {
            let count = transactions
                .iter()
                .filter(|transaction| itemset.is_subset(transaction))
                .count();
            (itemset, count)
        })
        .filter(|&(_, count)| count as f64 / n >= minimum_support)
        .collect()
}

fn counted<S: SupportIndex<u8>>(result: &MiningResult<u8, S>) -> HashMap<Itemset<u8>, usize> {
    result
        .iter()
        .map(|(itemset, count)| (itemset.clone(), count))
        .collect()
}

proptest! {
    #[test]
    fn miners_agree(transactions in arb_transactions(), minimum_support in arb_fraction()) {
        let apriori = Apriori.find_frequent_itemsets(&transactions, minimum_support).unwrap();
        let fpgrowth = FpGrowth.find_frequent_itemsets(&transactions, minimum_support).unwrap();

        prop_assert_eq!(apriori.frequent_itemsets(), fpgrowth.frequent_itemsets());
        prop_assert_eq!(counted(&apriori), counted(&fpgrowth));
    }

    #[test]
    fn matches_brute_force(transactions in arb_transactions(), minimum_support in arb_fraction()) {
        let expected = brute_force(&transactions, minimum_support);
        let apriori = Apriori.find_frequent_itemsets(&transactions, minimum_support).unwrap();
        let fpgrowth = FpGrowth.find_frequent_itemsets(&transactions, minimum_support).unwrap();

        prop_assert_eq!(&counted(&apriori), &expected);
        prop_assert_eq!(&counted(&fpgrowth), &expected);
    }

    #[test]
    fn subsets_are_at_least_as_frequent(
        transactions in arb_transactions(),
        minimum_support in arb_fraction(),
    ) {
        let result = FpGrowth.find_frequent_itemsets(&transactions, minimum_support).unwrap();
        for (itemset, count) in result.iter() {
            if itemset.len() < 2 {
                continue;
            }
            for item in itemset.iter() {
                let subset = itemset.without(item);
                prop_assert!(result.contains(&subset), "{:?} missing", subset);
                prop_assert!(result.index().count(&subset) >= count);
            }
        }
    }

    #[test]
    fn rules_meet_minimum_confidence(
        transactions in arb_transactions(),
        minimum_support in arb_fraction(),
        minimum_confidence in arb_fraction(),
    ) {
        let result = Apriori.find_frequent_itemsets(&transactions, minimum_support).unwrap();
        let rules = generate_rules(&result, minimum_confidence).unwrap();

        for (rule, confidence) in &rules {
            let index = result.index();
            let expected = index.count(&rule.itemset()) as f64
                / index.count(rule.antecedent()) as f64;
            prop_assert_eq!(*confidence, expected);
            prop_assert!(*confidence >= minimum_confidence);
            prop_assert!(result.contains(&rule.itemset()));
        }
    }

    #[test]
    fn mining_is_repeatable(transactions in arb_transactions(), minimum_support in arb_fraction()) {
        let first = FpGrowth.find_frequent_itemsets(&transactions, minimum_support).unwrap();
        let second = FpGrowth.find_frequent_itemsets(&transactions, minimum_support).unwrap();
        prop_assert_eq!(first.frequent_itemsets(), second.frequent_itemsets());
    }
}
