#![warn(missing_docs)]
#![doc(test(no_crate_inject))]
#![doc(test(attr(deny(unused, future_incompatible))))]

//! This crate mines frequent itemsets and association rules from a collection of transactions,
//! where each transaction is a set of items drawn from a shared universe (for example, all the
//! movies that one user rated).
//!
//! Two independent algorithms find the frequent itemsets:
//!
//! - [`Apriori`], the level-wise candidate generation algorithm from Agrawal and Srikant,
//!   [Fast Algorithms for Mining Association Rules][apriori], 1994;
//! - [`FpGrowth`], the pattern-growth algorithm over a compressed prefix tree from Han, Pei and
//!   Yin, [Mining Frequent Patterns without Candidate Generation][fpgrowth], 2000.
//!
//! [apriori]: https://www.vldb.org/conf/1994/P487.PDF
//! [fpgrowth]: https://dl.acm.org/doi/10.1145/335191.335372
//!
//! Both produce a [`MiningResult`], which carries a [`SupportIndex`] answering exact occurrence
//! counts for the mined itemsets. Feed that result to [`generate_rules`] to derive
//! confidence-filtered [`AssociationRule`]s.
//!
//! ```
//! use itemset_mining::{generate_rules, FpGrowth, FrequentItemsetMiner, Itemset};
//!
//! let transactions: Vec<Itemset<char>> = ["ab", "bc", "abc", "ac"]
//!     .iter()
//!     .map(|t| t.chars().collect())
//!     .collect();
//!
//! let result = FpGrowth.find_frequent_itemsets(&transactions, 0.5).unwrap();
//! assert_eq!(result.len(), 6);
//!
//! let rules = generate_rules(&result, 0.6).unwrap();
//! assert_eq!(rules.len(), 6);
//! ```

pub use sorted_iter;

use lasso::{LargeSpur, MicroSpur, MiniSpur, Spur};
use smallvec::SmallVec;
use sorted_iter::assume::AssumeSortedByItemExt;
use sorted_iter::sorted_iterator::SortedByItem;
use sorted_iter::SortedIterator;
use std::collections::HashMap;
use std::iter;

mod apriori;
mod error;
mod fpgrowth;
mod fptree;
mod rules;

pub use apriori::Apriori;
pub use error::MiningError;
pub use fpgrowth::FpGrowth;
pub use fptree::FpTree;
pub use rules::{generate_rules, AssociationRule};

/// Types which can be used in an [`Itemset`].
pub trait Item: Sized + Copy + std::hash::Hash + Ord + std::fmt::Debug {
    /// With its `union` feature, SmallVec keeps the heap pointer and length in the same bytes as
    /// the inline array, so itemsets will have minimum size if this array occupies exactly those
    /// two `usize`s.
    ///
    /// It can be declared like this for any implementation, or you can have the [`item_id!`]
    /// macro do it for you.
    ///
    /// ```ignore
    /// use std::mem::size_of;
    /// type SmallArray = [Self; 2 * size_of::<usize>() / size_of::<Self>()];
    /// ```
    type SmallArray: smallvec::Array<Item = Self> + Clone + std::fmt::Debug + std::hash::Hash + Ord;
}

/// Generates implementations of the [`Item`] trait which set the associated `SmallArray` type to
/// the biggest array that will fit within a [`SmallVec`][smallvec::SmallVec]'s minimum size.
///
/// It also generates a test with the given `$testname` that checks that the generated definition
/// is as small as the smallest `SmallVec`.
///
/// For example, this library provides implementations for the basic unsigned integer types using
/// this declaration:
///
/// ```ignore
/// item_id![unsigned_id_size, u8, u16, u32, u64, usize];
/// ```
#[macro_export]
macro_rules! item_id {
    ($testname:ident, $($t:ty),*) => {
        $(
            impl $crate::Item for $t {
                type SmallArray = [
                    Self;
                    2 * ::std::mem::size_of::<usize>() / ::std::mem::size_of::<Self>()
                ];
            }
        )*

        #[cfg(test)]
        #[test]
        fn $testname() {
            use $crate::Itemset;
            use smallvec::SmallVec;
            use std::mem::size_of;
            $(
                assert_eq!(
                    size_of::<Itemset<$t>>(),
                    size_of::<SmallVec<[(); 0]>>()
                );
            )*
        }
    };
}

item_id![lasso_id_size, LargeSpur, Spur, MiniSpur, MicroSpur];
item_id![unsigned_id_size, u8, u16, u32, u64, usize];
item_id![signed_id_size, i8, i16, i32, i64, isize];
item_id![char_id_size, char];

/// A set of items. Transactions, frequent patterns, and both sides of an association rule are
/// all itemsets.
///
/// Items are kept sorted and unique, so two itemsets compare equal (and hash the same) exactly
/// when they contain the same items, no matter what order those items were supplied in.
///
/// This implementation avoids heap allocations for itemsets containing a number of items smaller
/// than the length of [`Item::SmallArray`].
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Itemset<I: Item>(SmallVec<I::SmallArray>);

impl<I: Item> Itemset<I> {
    /// Creates an itemset containing the specified items.
    ///
    /// It's okay if the provided slice contains duplicates.
    ///
    /// ```
    /// use itemset_mining::Itemset;
    ///
    /// assert_eq!(Itemset::new(&[3, 1, 3, 2]), Itemset::new(&[1, 2, 3]));
    /// ```
    pub fn new(items: &[I]) -> Self {
        let mut v = SmallVec::from_slice(items);
        v.sort_unstable();
        v.dedup();
        Itemset(v)
    }

    /// Creates an itemset with no items in it.
    pub fn empty() -> Self {
        Itemset(SmallVec::new())
    }

    /// The number of items in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no items in the set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the items in ascending order.
    pub fn as_slice(&self) -> &[I] {
        &self.0
    }

    /// Returns an iterator over the items which appear in this set.
    ///
    /// ```
    /// use itemset_mining::Itemset;
    ///
    /// let abc = Itemset::new(&['b', 'c', 'a']);
    /// let mut it = abc.iter();
    /// assert_eq!(it.next(), Some('a'));
    /// assert_eq!(it.next(), Some('b'));
    /// assert_eq!(it.next(), Some('c'));
    /// assert_eq!(it.next(), None);
    /// ```
    pub fn iter(&self) -> impl Iterator<Item = I> + SortedByItem + Clone + '_ {
        self.0.iter().copied().assume_sorted_by_item()
    }

    /// Returns `true` if `item` is a member of this set.
    pub fn contains(&self, item: I) -> bool {
        self.0.binary_search(&item).is_ok()
    }

    /// Returns `true` if `other` contains every item that `self` does.
    ///
    /// ```
    /// use itemset_mining::Itemset;
    /// let nil = Itemset::new(&[]);
    /// let one = Itemset::new(&[1]);
    ///
    /// assert!(nil.is_subset(&one));
    /// assert!(nil.is_subset(&nil));
    /// assert!(one.is_subset(&one));
    /// assert!(!one.is_subset(&nil));
    /// ```
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len() <= other.len() && self.iter().intersection(other.iter()).eq(self.iter())
    }

    /// Returns `true` if `self` contains every item that `other` does.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Returns `true` if the two sets have no items in common.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.iter().intersection(other.iter()).next().is_none()
    }

    /// Returns the set of items which appear in either `self` or `other`.
    ///
    /// ```
    /// use itemset_mining::Itemset;
    ///
    /// let ab = Itemset::new(&[1, 2]);
    /// let bc = Itemset::new(&[2, 3]);
    /// assert_eq!(ab.union(&bc), Itemset::new(&[1, 2, 3]));
    /// ```
    pub fn union(&self, other: &Self) -> Self {
        Itemset(self.iter().union(other.iter()).collect())
    }

    /// Returns the set of items which appear in `self` but not in `other`.
    ///
    /// ```
    /// use itemset_mining::Itemset;
    ///
    /// let abc = Itemset::new(&[1, 2, 3]);
    /// let b = Itemset::new(&[2]);
    /// assert_eq!(abc.difference(&b), Itemset::new(&[1, 3]));
    /// ```
    pub fn difference(&self, other: &Self) -> Self {
        Itemset(self.iter().difference(other.iter()).collect())
    }

    /// Returns a copy of this set with `item` added to it.
    pub fn with(&self, item: I) -> Self {
        let mut items = self.0.clone();
        if let Err(idx) = items.binary_search(&item) {
            items.insert(idx, item);
        }
        Itemset(items)
    }

    /// Returns a copy of this set with `item` removed from it.
    pub fn without(&self, item: I) -> Self {
        let mut items = self.0.clone();
        if let Ok(idx) = items.binary_search(&item) {
            items.remove(idx);
        }
        Itemset(items)
    }

    /// Returns an iterator over every subset of this itemset that has one less item in it.
    pub(crate) fn remove_one_item(
        &self,
    ) -> impl DoubleEndedIterator<Item = Self> + ExactSizeIterator + iter::FusedIterator + '_ {
        (0..self.len()).rev().map(move |remove_idx| {
            let mut selected = Itemset(SmallVec::with_capacity(self.len() - 1));
            selected.0.extend_from_slice(&self.0[..remove_idx]);
            selected.0.extend_from_slice(&self.0[remove_idx + 1..]);
            selected
        })
    }
}

impl<I: Item> std::fmt::Debug for Itemset<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.iter()).finish()
    }
}

impl<I: Item> iter::FromIterator<I> for Itemset<I> {
    /// Creates an itemset containing the specified items.
    ///
    /// It's okay if the provided iterator contains duplicates.
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        let mut v = SmallVec::from_iter(iter);
        v.sort_unstable();
        v.dedup();
        Itemset(v)
    }
}

/// Answers how many transactions contain a given itemset.
///
/// Every mining run produces one of these alongside its frequent itemsets. The read side is all
/// that rule generation and reporting need, so both the hash-map [`SupportCounts`] and the
/// [`FpTree`] implement it.
pub trait SupportIndex<I: Item> {
    /// Returns the number of transactions containing every item of `itemset`, or 0 if this index
    /// has never seen `itemset`.
    fn count(&self, itemset: &Itemset<I>) -> usize;

    /// Returns the number of transactions this index was built from.
    fn transaction_count(&self) -> usize;

    /// Returns the fraction of transactions which contain `itemset`.
    fn support(&self, itemset: &Itemset<I>) -> f64 {
        self.count(itemset) as f64 / self.transaction_count() as f64
    }

    /// Returns the fraction of the transactions containing the rule's antecedent which also
    /// contain its consequent.
    ///
    /// # Errors
    ///
    /// Confidence is undefined when the antecedent never occurs, so this returns
    /// [`MiningError::ZeroSupportAntecedent`] rather than a made-up value.
    fn confidence(&self, rule: &AssociationRule<I>) -> Result<f64, MiningError> {
        let antecedent = self.count(rule.antecedent());
        if antecedent == 0 {
            return Err(MiningError::ZeroSupportAntecedent(format!(
                "{:?}",
                rule.antecedent()
            )));
        }
        Ok(self.count(&rule.itemset()) as f64 / antecedent as f64)
    }
}

/// A [`SupportIndex`] that stores an explicit count for each itemset it has been told about.
///
/// ```
/// use itemset_mining::{Itemset, SupportCounts, SupportIndex};
///
/// let ab = Itemset::new(&['a', 'b']);
/// let mut counts = SupportCounts::new(4);
/// assert_eq!(counts.count(&ab), 0);
///
/// counts.increment(&ab);
/// counts.increment(&ab);
/// assert_eq!(counts.count(&ab), 2);
/// assert_eq!(counts.support(&ab), 0.5);
///
/// counts.set_count(ab.clone(), 3);
/// assert_eq!(counts.support(&ab), 0.75);
/// ```
#[derive(Clone, Debug)]
pub struct SupportCounts<I: Item> {
    counts: HashMap<Itemset<I>, usize>,
    transaction_count: usize,
}

impl<I: Item> SupportCounts<I> {
    /// Creates an empty index whose supports are normalized by `transaction_count`.
    pub fn new(transaction_count: usize) -> Self {
        SupportCounts {
            counts: HashMap::new(),
            transaction_count,
        }
    }

    /// Replaces the count stored for `itemset`.
    pub fn set_count(&mut self, itemset: Itemset<I>, count: usize) -> &mut Self {
        self.counts.insert(itemset, count);
        self
    }

    /// Adds one to the count stored for `itemset`, treating an unseen itemset as 0.
    pub fn increment(&mut self, itemset: &Itemset<I>) -> &mut Self {
        if let Some(count) = self.counts.get_mut(itemset) {
            *count += 1;
        } else {
            self.counts.insert(itemset.clone(), 1);
        }
        self
    }

    /// Returns an iterator over every itemset with a stored count, in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&Itemset<I>, usize)> + '_ {
        self.counts.iter().map(|(itemset, count)| (itemset, *count))
    }
}

impl<I: Item> SupportIndex<I> for SupportCounts<I> {
    fn count(&self, itemset: &Itemset<I>) -> usize {
        self.counts.get(itemset).copied().unwrap_or(0)
    }

    fn transaction_count(&self) -> usize {
        self.transaction_count
    }
}

/// The outcome of one frequent-itemset mining run.
///
/// Every itemset in [`frequent_itemsets`](MiningResult::frequent_itemsets) has at least the
/// minimum support that was requested, and they are ordered by descending support. Ties go to
/// the smaller itemset first, then to [`Itemset`]'s natural order, so the same input always
/// produces the same list.
#[derive(Clone, Debug)]
pub struct MiningResult<I: Item, S> {
    frequent_itemsets: Vec<Itemset<I>>,
    index: S,
    transaction_count: usize,
    minimum_support: f64,
}

impl<I: Item, S: SupportIndex<I>> MiningResult<I, S> {
    pub(crate) fn new(itemsets: Vec<Itemset<I>>, index: S, minimum_support: f64) -> Self {
        let mut counted: Vec<(usize, Itemset<I>)> = itemsets
            .into_iter()
            .map(|itemset| (index.count(&itemset), itemset))
            .collect();
        counted.sort_unstable_by(|(count_a, a), (count_b, b)| {
            count_b
                .cmp(count_a)
                .then_with(|| a.len().cmp(&b.len()))
                .then_with(|| a.cmp(b))
        });

        MiningResult {
            frequent_itemsets: counted.into_iter().map(|(_, itemset)| itemset).collect(),
            transaction_count: index.transaction_count(),
            index,
            minimum_support,
        }
    }

    /// Returns the frequent itemsets, most frequent first.
    pub fn frequent_itemsets(&self) -> &[Itemset<I>] {
        &self.frequent_itemsets
    }

    /// Returns the index which counts occurrences for this run's itemsets.
    pub fn index(&self) -> &S {
        &self.index
    }

    /// Returns the number of transactions that were mined.
    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    /// Returns the minimum support this result was mined with.
    pub fn minimum_support(&self) -> f64 {
        self.minimum_support
    }

    /// The number of frequent itemsets.
    pub fn len(&self) -> usize {
        self.frequent_itemsets.len()
    }

    /// Returns `true` if no itemset reached the minimum support.
    pub fn is_empty(&self) -> bool {
        self.frequent_itemsets.is_empty()
    }

    /// Returns `true` if `itemset` was found to be frequent.
    pub fn contains(&self, itemset: &Itemset<I>) -> bool {
        self.frequent_itemsets.contains(itemset)
    }

    /// Returns the fraction of transactions which contain `itemset`.
    pub fn support(&self, itemset: &Itemset<I>) -> f64 {
        self.index.support(itemset)
    }

    /// Returns an iterator over each frequent itemset with its occurrence count, most frequent
    /// first.
    pub fn iter(&self) -> impl Iterator<Item = (&Itemset<I>, usize)> + '_ {
        self.frequent_itemsets
            .iter()
            .map(move |itemset| (itemset, self.index.count(itemset)))
    }
}

/// An algorithm which finds every itemset whose support reaches a threshold.
pub trait FrequentItemsetMiner<I: Item> {
    /// The kind of index this algorithm leaves behind for counting its itemsets.
    type Index: SupportIndex<I> + std::fmt::Debug;

    /// Finds every itemset contained in at least `minimum_support` of the `transactions`.
    ///
    /// # Errors
    ///
    /// Returns [`MiningError::InvalidMinimumSupport`] if `minimum_support` is not in `(0, 1]`,
    /// and [`MiningError::NoTransactions`] if `transactions` is empty.
    fn find_frequent_itemsets(
        &self,
        transactions: &[Itemset<I>],
        minimum_support: f64,
    ) -> Result<MiningResult<I, Self::Index>, MiningError>;
}

fn is_fraction(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

pub(crate) fn check_minimum_confidence(minimum_confidence: f64) -> Result<(), MiningError> {
    if is_fraction(minimum_confidence) {
        Ok(())
    } else {
        Err(MiningError::InvalidMinimumConfidence(minimum_confidence))
    }
}

pub(crate) fn check_mining_input<I: Item>(
    transactions: &[Itemset<I>],
    minimum_support: f64,
) -> Result<(), MiningError> {
    if !is_fraction(minimum_support) {
        return Err(MiningError::InvalidMinimumSupport(minimum_support));
    }
    if transactions.is_empty() {
        return Err(MiningError::NoTransactions);
    }
    Ok(())
}

/// Returns the smallest occurrence count `c` for which `c / transaction_count` is at least
/// `minimum_support`.
///
/// Both miners compare integer counts against this instead of comparing floating-point supports,
/// so they agree on itemsets that sit exactly on the threshold.
pub(crate) fn minimum_count(minimum_support: f64, transaction_count: usize) -> usize {
    let n = transaction_count as f64;
    let mut count = (minimum_support * n).ceil() as usize;
    while count > 0 && (count - 1) as f64 / n >= minimum_support {
        count -= 1;
    }
    while (count as f64) / n < minimum_support {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_count_matches_float_support() {
        assert_eq!(minimum_count(0.2, 10), 2);
        assert_eq!(minimum_count(0.3, 10), 3);
        assert_eq!(minimum_count(0.4, 5), 2);
        assert_eq!(minimum_count(1.0, 3), 3);
        assert_eq!(minimum_count(1e-9, 3), 1);
        assert_eq!(minimum_count(0.5, 7), 4);
    }

    #[test]
    fn mining_input_is_validated() {
        let transactions = vec![Itemset::new(&[1u8])];
        assert!(check_mining_input(&transactions, 0.5).is_ok());
        assert!(check_mining_input(&transactions, 1.0).is_ok());
        assert_eq!(
            check_mining_input(&transactions, 0.0),
            Err(MiningError::InvalidMinimumSupport(0.0))
        );
        assert_eq!(
            check_mining_input(&transactions, 1.5),
            Err(MiningError::InvalidMinimumSupport(1.5))
        );
        assert!(check_mining_input(&transactions, f64::NAN).is_err());
        assert_eq!(
            check_mining_input::<u8>(&[], 0.5),
            Err(MiningError::NoTransactions)
        );
        assert!(check_minimum_confidence(-0.1).is_err());
    }

    #[test]
    fn set_algebra() {
        let abc = Itemset::new(&['a', 'b', 'c']);
        let cd = Itemset::new(&['c', 'd']);

        assert!(abc.contains('b'));
        assert!(!abc.contains('d'));
        assert!(!abc.is_disjoint(&cd));
        assert!(abc.is_disjoint(&Itemset::new(&['x'])));
        assert_eq!(abc.with('d').without('a'), Itemset::new(&['b', 'c', 'd']));
        assert_eq!(abc.with('a'), abc);
        assert_eq!(abc.without('z'), abc);
        assert_eq!(format!("{:?}", abc), "{'a', 'b', 'c'}");

        let subsets: Vec<_> = abc.remove_one_item().collect();
        assert_eq!(
            subsets,
            vec![
                Itemset::new(&['a', 'b']),
                Itemset::new(&['a', 'c']),
                Itemset::new(&['b', 'c']),
            ]
        );
    }

    #[test]
    fn confidence_rejects_unseen_antecedent() {
        let mut counts = SupportCounts::new(4);
        counts.set_count(Itemset::new(&[1u32, 2]), 2);
        counts.set_count(Itemset::new(&[1u32]), 3);

        let rule = AssociationRule::new(Itemset::new(&[1]), Itemset::new(&[2])).unwrap();
        assert_eq!(counts.confidence(&rule), Ok(2.0 / 3.0));

        let unseen = AssociationRule::new(Itemset::new(&[2]), Itemset::new(&[1])).unwrap();
        assert!(matches!(
            counts.confidence(&unseen),
            Err(MiningError::ZeroSupportAntecedent(_))
        ));
    }

    #[test]
    fn results_sort_by_descending_count() {
        let mut counts = SupportCounts::new(10);
        counts
            .set_count(Itemset::new(&[1u8]), 4)
            .set_count(Itemset::new(&[2u8]), 7)
            .set_count(Itemset::new(&[1u8, 2]), 4)
            .set_count(Itemset::new(&[3u8]), 4);
        let result = MiningResult::new(
            vec![
                Itemset::new(&[1, 2]),
                Itemset::new(&[3]),
                Itemset::new(&[1]),
                Itemset::new(&[2]),
            ],
            counts,
            0.4,
        );

        assert_eq!(
            result.frequent_itemsets(),
            &[
                Itemset::new(&[2]),
                Itemset::new(&[1]),
                Itemset::new(&[3]),
                Itemset::new(&[1, 2]),
            ]
        );
        assert_eq!(result.transaction_count(), 10);
        assert_eq!(result.support(&Itemset::new(&[2])), 0.7);
        assert_eq!(
            result.iter().map(|(_, count)| count).collect::<Vec<_>>(),
            vec![7, 4, 4, 4]
        );
    }
}
