use crate::{FpTree, FrequentItemsetMiner, Item, Itemset, MiningError, MiningResult};
use std::collections::HashSet;
use tracing::{info, trace};

/// The FP-Growth algorithm.
///
/// It compresses the transactions into an [`FpTree`] and then grows patterns one item at a time,
/// least frequent item first. Extending a pattern with an item means conditioning the current tree
/// on that item, which leaves only the transactions containing the whole pattern. Once a tree
/// shrinks to a single path, every combination of that path's items is frequent and the
/// recursion stops.
///
/// The tree built over the input is returned as the [`MiningResult`]'s index, so reported counts
/// always come from the original transactions rather than from the recursion's bookkeeping.
///
/// ```
/// use itemset_mining::{FpGrowth, FrequentItemsetMiner, Itemset, SupportIndex};
///
/// let transactions = vec![
///     Itemset::new(&[1, 2, 3]),
///     Itemset::new(&[1, 2]),
///     Itemset::new(&[2, 3]),
/// ];
/// let result = FpGrowth.find_frequent_itemsets(&transactions, 0.6).unwrap();
///
/// assert!(result.contains(&Itemset::new(&[1, 2])));
/// assert!(!result.contains(&Itemset::new(&[1, 3])));
/// assert_eq!(result.index().count(&Itemset::new(&[2, 3])), 2);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct FpGrowth;

impl<I: Item> FrequentItemsetMiner<I> for FpGrowth {
    type Index = FpTree<I>;

    fn find_frequent_itemsets(
        &self,
        transactions: &[Itemset<I>],
        minimum_support: f64,
    ) -> Result<MiningResult<I, FpTree<I>>, MiningError> {
        let tree = FpTree::build(transactions, minimum_support)?;

        let mut frequent = HashSet::new();
        grow(&tree, &Itemset::empty(), &mut frequent);

        info!(
            transactions = transactions.len(),
            nodes = tree.node_count(),
            itemsets = frequent.len(),
            "fp-growth finished"
        );
        Ok(MiningResult::new(
            frequent.into_iter().collect(),
            tree,
            minimum_support,
        ))
    }
}

/// Adds to `frequent` every frequent itemset that extends `prefix` with items from `tree`, where
/// `tree` holds only the transactions containing `prefix`.
fn grow<I: Item>(tree: &FpTree<I>, prefix: &Itemset<I>, frequent: &mut HashSet<Itemset<I>>) {
    if tree.is_single_path() {
        frequent.extend(tree.extract_combinations_from_single_path(prefix));
        return;
    }

    for item in tree.header_items_by_ascending_support() {
        let pattern = prefix.with(item);

        // Each conditional tree is dropped before its next sibling is built.
        let conditional = tree.conditional_tree(item);
        trace!(
            pattern = ?pattern,
            nodes = conditional.node_count(),
            "conditional tree"
        );
        if !conditional.is_empty() {
            grow(&conditional, &pattern, frequent);
        }

        frequent.insert(pattern);
    }
}
