use crate::{check_minimum_confidence, Item, Itemset, MiningError, MiningResult, SupportIndex};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::info;

/// A rule of the form "transactions containing the antecedent also tend to contain the
/// consequent".
///
/// Both sides are non-empty and share no items. Rules compare equal exactly when both sides do.
///
/// ```
/// use itemset_mining::{AssociationRule, Itemset};
///
/// let rule = AssociationRule::new(Itemset::new(&['a', 'b']), Itemset::new(&['c'])).unwrap();
/// assert_eq!(rule.itemset(), Itemset::new(&['a', 'b', 'c']));
/// assert_eq!(format!("{:?}", rule), "{'a', 'b'} -> {'c'}");
///
/// assert!(AssociationRule::new(Itemset::new(&['a']), Itemset::new(&['a'])).is_err());
/// assert!(AssociationRule::new(Itemset::new(&[]), Itemset::new(&['a'])).is_err());
/// ```
#[derive(Clone, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AssociationRule<I: Item> {
    antecedent: Itemset<I>,
    consequent: Itemset<I>,
}

impl<I: Item> AssociationRule<I> {
    /// Creates the rule `antecedent -> consequent`.
    ///
    /// # Errors
    ///
    /// Returns [`MiningError::InvalidRule`] if either side is empty or the two sides overlap.
    pub fn new(antecedent: Itemset<I>, consequent: Itemset<I>) -> Result<Self, MiningError> {
        let rule = AssociationRule {
            antecedent,
            consequent,
        };
        if rule.antecedent.is_empty()
            || rule.consequent.is_empty()
            || !rule.antecedent.is_disjoint(&rule.consequent)
        {
            return Err(MiningError::InvalidRule(format!("{:?}", rule)));
        }
        Ok(rule)
    }

    /// The items a transaction must contain for this rule to apply.
    pub fn antecedent(&self) -> &Itemset<I> {
        &self.antecedent
    }

    /// The items this rule predicts.
    pub fn consequent(&self) -> &Itemset<I> {
        &self.consequent
    }

    /// Returns every item mentioned on either side.
    pub fn itemset(&self) -> Itemset<I> {
        self.antecedent.union(&self.consequent)
    }

    /// Returns the rule over the same items with `item` moved from the antecedent to the
    /// consequent. The antecedent must keep at least one item.
    fn moved(&self, item: I) -> Self {
        debug_assert!(self.antecedent.len() > 1 && self.antecedent.contains(item));
        AssociationRule {
            antecedent: self.antecedent.without(item),
            consequent: self.consequent.with(item),
        }
    }
}

impl<I: Item> fmt::Debug for AssociationRule<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?}", self.antecedent, self.consequent)
    }
}

/// Derives every association rule over `result`'s frequent itemsets whose confidence is at least
/// `minimum_confidence`, paired with that confidence.
///
/// For each frequent itemset, rules start with a single item in the consequent. A rule that meets
/// the threshold is kept and grown by moving one more item from its antecedent to its consequent;
/// a rule that misses it is dropped along with everything it would grow into, since a smaller
/// antecedent never has a lower count.
///
/// Rules come back with the most confident first, and ties in rule order.
///
/// # Errors
///
/// Returns [`MiningError::InvalidMinimumConfidence`] if `minimum_confidence` is not in `(0, 1]`,
/// and [`MiningError::ZeroSupportAntecedent`] if the result's index can't count an antecedent,
/// which means the index doesn't agree with the itemsets it was returned with.
pub fn generate_rules<I: Item, S: SupportIndex<I>>(
    result: &MiningResult<I, S>,
    minimum_confidence: f64,
) -> Result<Vec<(AssociationRule<I>, f64)>, MiningError> {
    check_minimum_confidence(minimum_confidence)?;
    let index = result.index();
    let mut found = HashMap::new();

    for itemset in result.frequent_itemsets().iter().filter(|s| s.len() >= 2) {
        let mut generation: HashSet<AssociationRule<I>> = itemset
            .iter()
            .map(|item| AssociationRule {
                antecedent: itemset.without(item),
                consequent: Itemset::new(&[item]),
            })
            .collect();

        while !generation.is_empty() {
            let mut next = HashSet::new();
            for rule in generation {
                let confidence = index.confidence(&rule)?;
                if confidence < minimum_confidence {
                    continue;
                }
                if rule.antecedent.len() > 1 {
                    next.extend(rule.antecedent.iter().map(|item| rule.moved(item)));
                }
                found.insert(rule, confidence);
            }
            generation = next;
        }
    }

    let mut rules: Vec<(AssociationRule<I>, f64)> = found.into_iter().collect();
    rules.sort_unstable_by(|(rule_a, a), (rule_b, b)| {
        b.total_cmp(a).then_with(|| rule_a.cmp(rule_b))
    });

    info!(
        itemsets = result.len(),
        minimum_confidence,
        rules = rules.len(),
        "generated rules"
    );
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SupportCounts;

    fn set(items: &str) -> Itemset<char> {
        items.chars().collect()
    }

    fn rule(antecedent: &str, consequent: &str) -> AssociationRule<char> {
        AssociationRule::new(set(antecedent), set(consequent)).unwrap()
    }

    /// Counts over the transactions abc, abc, ab, a, with abc as the only frequent itemset handed
    /// to rule generation.
    fn abc_result() -> MiningResult<char, SupportCounts<char>> {
        let mut counts = SupportCounts::new(4);
        counts
            .set_count(set("a"), 4)
            .set_count(set("b"), 3)
            .set_count(set("c"), 2)
            .set_count(set("ab"), 3)
            .set_count(set("ac"), 2)
            .set_count(set("bc"), 2)
            .set_count(set("abc"), 2);
        MiningResult::new(vec![set("abc")], counts, 0.5)
    }

    #[test]
    fn rejects_malformed_rules() {
        assert!(matches!(
            AssociationRule::new(set("ab"), set("bc")),
            Err(MiningError::InvalidRule(_))
        ));
        assert!(matches!(
            AssociationRule::new(set("ab"), Itemset::empty()),
            Err(MiningError::InvalidRule(_))
        ));
    }

    #[test]
    fn moving_items_keeps_the_itemset() {
        let grown = rule("abc", "d").moved('b');
        assert_eq!(grown, rule("ac", "bd"));
        assert_eq!(grown.itemset(), set("abcd"));
    }

    #[test]
    fn grows_only_passing_rules() {
        let rules = generate_rules(&abc_result(), 0.6).unwrap();

        // ab -> c has confidence 2/3 and a -> bc only 1/2, so the latter is cut off.
        assert_eq!(
            rules,
            vec![
                (rule("ac", "b"), 1.0),
                (rule("bc", "a"), 1.0),
                (rule("c", "ab"), 1.0),
                (rule("ab", "c"), 2.0 / 3.0),
                (rule("b", "ac"), 2.0 / 3.0),
            ]
        );
    }

    #[test]
    fn every_rule_at_lowest_confidence() {
        let rules = generate_rules(&abc_result(), 0.1).unwrap();
        assert_eq!(rules.len(), 6);
        assert_eq!(rules.last(), Some(&(rule("a", "bc"), 0.5)));
    }

    #[test]
    fn singletons_make_no_rules() {
        let mut counts = SupportCounts::new(2);
        counts.set_count(set("a"), 2);
        let result = MiningResult::new(vec![set("a")], counts, 0.5);
        assert!(generate_rules(&result, 0.5).unwrap().is_empty());
    }

    #[test]
    fn uncounted_antecedent_is_an_error() {
        let mut counts = SupportCounts::new(2);
        counts.set_count(set("ab"), 1).set_count(set("a"), 1);
        let result = MiningResult::new(vec![set("ab")], counts, 0.5);
        let err = generate_rules(&result, 0.5).unwrap_err();
        assert_eq!(err, MiningError::ZeroSupportAntecedent("{'b'}".to_string()));
        assert!(err.is_internal());
    }

    #[test]
    fn rejects_bad_confidence() {
        assert_eq!(
            generate_rules(&abc_result(), 0.0).unwrap_err(),
            MiningError::InvalidMinimumConfidence(0.0)
        );
        assert!(generate_rules(&abc_result(), 1.5).is_err());
    }
}
