use crate::{
    check_mining_input, minimum_count, FrequentItemsetMiner, Item, Itemset, MiningError,
    MiningResult, SupportCounts, SupportIndex,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// The level-wise Apriori algorithm.
///
/// Each level `k` joins the frequent `(k-1)`-itemsets that share all but their last item into
/// `k`-item candidates, drops candidates with an infrequent `(k-1)`-subset, and then counts the
/// rest with a full scan over the transactions. Mining stops at the first level with no frequent
/// itemsets.
///
/// The [`SupportCounts`] left behind holds an exact count for every single item and every
/// candidate that was scanned, which covers every frequent itemset.
///
/// ```
/// use itemset_mining::{Apriori, FrequentItemsetMiner, Itemset, SupportIndex};
///
/// let transactions = vec![
///     Itemset::new(&[1, 2, 3]),
///     Itemset::new(&[1, 2]),
///     Itemset::new(&[2, 3]),
/// ];
/// let result = Apriori.find_frequent_itemsets(&transactions, 0.6).unwrap();
///
/// assert!(result.contains(&Itemset::new(&[1, 2])));
/// assert!(!result.contains(&Itemset::new(&[1, 3])));
/// assert_eq!(result.index().count(&Itemset::new(&[2])), 3);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Apriori;

impl<I: Item> FrequentItemsetMiner<I> for Apriori {
    type Index = SupportCounts<I>;

    fn find_frequent_itemsets(
        &self,
        transactions: &[Itemset<I>],
        minimum_support: f64,
    ) -> Result<MiningResult<I, SupportCounts<I>>, MiningError> {
        check_mining_input(transactions, minimum_support)?;
        let threshold = minimum_count(minimum_support, transactions.len());
        let mut counts = SupportCounts::new(transactions.len());

        for transaction in transactions {
            for item in transaction.iter() {
                counts.increment(&Itemset::new(&[item]));
            }
        }

        let mut level: Vec<Itemset<I>> = counts
            .iter()
            .filter(|&(_, count)| count >= threshold)
            .map(|(itemset, _)| itemset.clone())
            .collect();
        let mut frequent = Vec::new();

        let mut size = 1;
        while !level.is_empty() {
            level.sort_unstable();
            debug!(size, frequent = level.len(), "apriori level");

            size += 1;
            let candidates = generate_candidates(&level)?;
            count_candidates(&candidates, transactions, &mut counts);

            frequent.append(&mut level);
            level = candidates
                .into_iter()
                .filter(|candidate| counts.count(candidate) >= threshold)
                .collect();
        }

        info!(
            transactions = transactions.len(),
            threshold,
            itemsets = frequent.len(),
            "apriori finished"
        );
        Ok(MiningResult::new(frequent, counts, minimum_support))
    }
}

/// Builds the candidate `(k+1)`-itemsets from the frequent `k`-itemsets in `level`, which must
/// be sorted.
///
/// Sorting groups itemsets sharing their first `k-1` items into one contiguous run, so each
/// itemset only needs to be paired with its successors until the prefix changes.
fn generate_candidates<I: Item>(level: &[Itemset<I>]) -> Result<Vec<Itemset<I>>, MiningError> {
    let known: HashSet<&Itemset<I>> = level.iter().collect();
    let mut candidates = Vec::new();
    let mut pruned = 0;

    for (idx, first) in level.iter().enumerate() {
        for second in &level[idx + 1..] {
            let candidate = match try_merge(first, second)? {
                Some(candidate) => candidate,
                None => break,
            };

            // Every subset of a frequent itemset is frequent, so a candidate with an infrequent
            // subset can't survive counting.
            if candidate
                .remove_one_item()
                .all(|subset| known.contains(&subset))
            {
                candidates.push(candidate);
            } else {
                pruned += 1;
            }
        }
    }

    debug!(candidates = candidates.len(), pruned, "generated candidates");
    Ok(candidates)
}

/// Merges two `k`-itemsets into a `(k+1)`-itemset if their first `k-1` items match.
///
/// Matching last items as well means the same itemset appeared twice in one level, which the
/// level-wise bookkeeping never produces; that's reported instead of quietly deduplicated.
fn try_merge<I: Item>(
    first: &Itemset<I>,
    second: &Itemset<I>,
) -> Result<Option<Itemset<I>>, MiningError> {
    let (first_last, first_prefix) = match first.as_slice().split_last() {
        Some(split) => split,
        None => return Ok(None),
    };
    let (second_last, second_prefix) = match second.as_slice().split_last() {
        Some(split) => split,
        None => return Ok(None),
    };

    if first_prefix != second_prefix {
        return Ok(None);
    }
    if first_last == second_last {
        return Err(MiningError::DuplicateCandidate(format!("{:?}", first)));
    }
    Ok(Some(first.with(*second_last)))
}

/// Adds one to the count of each candidate for every transaction that contains it.
fn count_candidates<I: Item>(
    candidates: &[Itemset<I>],
    transactions: &[Itemset<I>],
    counts: &mut SupportCounts<I>,
) {
    let size = match candidates.first() {
        Some(candidate) => candidate.len(),
        None => return,
    };

    for transaction in transactions.iter().filter(|t| t.len() >= size) {
        for candidate in candidates {
            if candidate.is_subset(transaction) {
                counts.increment(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn itemsets(sets: &[&str]) -> Vec<Itemset<char>> {
        sets.iter().map(|s| s.chars().collect()).collect()
    }

    #[test]
    fn joins_on_shared_prefix() {
        let level = itemsets(&["ab", "ac", "ad", "bc", "bd"]);
        let candidates = generate_candidates(&level).unwrap();

        // "acd" is pruned because "cd" isn't frequent.
        assert_eq!(candidates, itemsets(&["abc", "abd"]));
    }

    #[test]
    fn singletons_join_pairwise() {
        let level = itemsets(&["a", "b", "c"]);
        let candidates = generate_candidates(&level).unwrap();
        assert_eq!(candidates, itemsets(&["ab", "ac", "bc"]));
    }

    #[test]
    fn duplicate_itemsets_are_fatal() {
        let level = itemsets(&["ab", "ab", "ac"]);
        let err = generate_candidates(&level).unwrap_err();
        assert_eq!(err, MiningError::DuplicateCandidate("{'a', 'b'}".to_string()));
        assert!(err.is_internal());
    }

    #[test]
    fn counts_each_containing_transaction_once() {
        let transactions = itemsets(&["abc", "ab", "bc", "abcd"]);
        let candidates = itemsets(&["ab", "bc", "ad"]);
        let mut counts = SupportCounts::new(transactions.len());
        count_candidates(&candidates, &transactions, &mut counts);

        assert_eq!(counts.count(&Itemset::new(&['a', 'b'])), 3);
        assert_eq!(counts.count(&Itemset::new(&['b', 'c'])), 3);
        assert_eq!(counts.count(&Itemset::new(&['a', 'd'])), 1);
    }

    #[test]
    fn stops_at_first_empty_level() {
        let transactions = itemsets(&["ab", "ab", "cd"]);
        let result = Apriori.find_frequent_itemsets(&transactions, 0.5).unwrap();
        assert_eq!(result.frequent_itemsets(), &itemsets(&["a", "b", "ab"])[..]);
    }

    #[test]
    fn rejects_bad_arguments() {
        let transactions = itemsets(&["ab"]);
        assert_eq!(
            Apriori.find_frequent_itemsets(&transactions, 0.0).unwrap_err(),
            MiningError::InvalidMinimumSupport(0.0)
        );
        assert_eq!(
            Apriori
                .find_frequent_itemsets(&Vec::<Itemset<char>>::new(), 0.5)
                .unwrap_err(),
            MiningError::NoTransactions
        );
    }
}
