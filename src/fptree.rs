use crate::{check_mining_input, minimum_count, Item, Itemset, MiningError, SupportIndex};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::iter;
use std::mem::take;
use std::sync::Arc;

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Clone, Debug)]
struct Node<I> {
    /// `None` only for the root.
    item: Option<I>,
    count: usize,
    parent: Option<NodeId>,
    children: BTreeMap<I, NodeId>,
    /// The next node elsewhere in the tree holding the same item.
    next: Option<NodeId>,
}

/// A frequent-pattern tree: a prefix tree over the frequent items of every transaction, with the
/// nodes for each item threaded together into a chain that starts at a header table.
///
/// Items along every root-to-leaf path appear in one fixed order, most frequent first (ties go
/// to the smaller item), so transactions sharing their most common items share a prefix and the
/// tree stays small.
///
/// Nodes live in an arena and refer to their parent, children and chain successor by index.
/// Cloning a tree therefore produces a fully independent copy, which is what
/// [`conditional_tree`](FpTree::conditional_tree) starts from.
///
/// The tree is also a [`SupportIndex`]: it can count any itemset built from its items by walking
/// up from each node of the itemset's least frequent item.
///
/// ```
/// use itemset_mining::{FpTree, Itemset, SupportIndex};
///
/// let transactions: Vec<Itemset<char>> = ["abc", "ab", "ac", "d"]
///     .iter()
///     .map(|t| t.chars().collect())
///     .collect();
/// let tree = FpTree::build(&transactions, 0.5).unwrap();
///
/// assert_eq!(tree.item_count('a'), 3);
/// assert_eq!(tree.count(&Itemset::new(&['a', 'b'])), 2);
/// // 'd' is infrequent, so the tree never indexed it.
/// assert_eq!(tree.item_count('d'), 0);
/// assert!(!tree.is_single_path());
/// ```
#[derive(Clone, Debug)]
pub struct FpTree<I: Item> {
    nodes: Vec<Node<I>>,
    header: BTreeMap<I, NodeId>,
    /// Each indexed item's position in the path order. Shared read-only between a tree and the
    /// conditional trees derived from it.
    rank: Arc<HashMap<I, usize>>,
    transaction_count: usize,
    minimum_count: usize,
}

impl<I: Item> FpTree<I> {
    fn with_order(
        rank: Arc<HashMap<I, usize>>,
        transaction_count: usize,
        minimum_count: usize,
    ) -> Self {
        FpTree {
            nodes: vec![Node {
                item: None,
                count: 0,
                parent: None,
                children: BTreeMap::new(),
                next: None,
            }],
            header: BTreeMap::new(),
            rank,
            transaction_count,
            minimum_count,
        }
    }

    /// Builds a tree over `transactions`, keeping only the items whose own support reaches
    /// `minimum_support`.
    ///
    /// A transaction that contains some infrequent items still contributes its frequent ones.
    ///
    /// # Errors
    ///
    /// Returns [`MiningError::InvalidMinimumSupport`] if `minimum_support` is not in `(0, 1]`,
    /// and [`MiningError::NoTransactions`] if `transactions` is empty.
    pub fn build(transactions: &[Itemset<I>], minimum_support: f64) -> Result<Self, MiningError> {
        check_mining_input(transactions, minimum_support)?;
        let minimum_count = minimum_count(minimum_support, transactions.len());

        let mut item_counts = HashMap::new();
        for transaction in transactions {
            for item in transaction.iter() {
                *item_counts.entry(item).or_insert(0) += 1;
            }
        }

        let mut frequent: Vec<(I, usize)> = item_counts
            .into_iter()
            .filter(|&(_, count)| count >= minimum_count)
            .collect();
        frequent.sort_unstable_by(|(a, count_a), (b, count_b)| {
            count_b.cmp(count_a).then_with(|| a.cmp(b))
        });
        let rank: HashMap<I, usize> = frequent
            .iter()
            .enumerate()
            .map(|(position, &(item, _))| (item, position))
            .collect();
        let rank = Arc::new(rank);

        let mut tree = FpTree::with_order(Arc::clone(&rank), transactions.len(), minimum_count);

        // Reuse the same heap allocation for every path to avoid hammering the allocator.
        let mut path = Vec::new();
        for transaction in transactions {
            path.extend(transaction.iter().filter(|item| rank.contains_key(item)));
            path.sort_unstable_by_key(|item| rank[item]);
            tree.insert(&path, 1);
            path.clear();
        }

        Ok(tree)
    }

    /// Walks down from the root along `path`, adding `count` to every node on the way and
    /// creating whatever suffix of the path doesn't exist yet.
    fn insert(&mut self, path: &[I], count: usize) {
        let mut current = ROOT;
        for &item in path {
            current = match self.nodes[current].children.get(&item) {
                Some(&child) => child,
                None => self.add_node(item, current),
            };
            self.nodes[current].count += count;
        }
    }

    /// Appends a zero-count node as a new child of `parent` and puts it at the head of its
    /// item's chain.
    fn add_node(&mut self, item: I, parent: NodeId) -> NodeId {
        let id = self.nodes.len();
        let next = self.header.insert(item, id);
        self.nodes.push(Node {
            item: Some(item),
            count: 0,
            parent: Some(parent),
            children: BTreeMap::new(),
            next,
        });
        self.nodes[parent].children.insert(item, id);
        id
    }

    fn chain(&self, item: I) -> impl Iterator<Item = NodeId> + '_ {
        iter::successors(self.header.get(&item).copied(), move |&id| self.nodes[id].next)
    }

    /// Returns `true` if the tree holds no items at all.
    pub fn is_empty(&self) -> bool {
        self.nodes[ROOT].children.is_empty()
    }

    /// The number of item-holding nodes in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Returns the total count along `item`'s chain: the number of transactions represented by
    /// this tree that contain `item`.
    pub fn item_count(&self, item: I) -> usize {
        self.chain(item).map(|id| self.nodes[id].count).sum()
    }

    /// Returns `true` if the tree is one unbranched path from the root.
    ///
    /// Every item then has exactly one node in its chain. The converse doesn't hold: two branches
    /// with no items in common also have single-node chains, but they are not a path.
    pub fn is_single_path(&self) -> bool {
        self.single_path().is_some()
    }

    /// If the tree is a single path, returns its items from the root down with their counts.
    pub fn single_path(&self) -> Option<Vec<(I, usize)>> {
        let mut path = Vec::new();
        let mut current = ROOT;
        loop {
            let mut children = self.nodes[current].children.iter();
            match (children.next(), children.next()) {
                (None, _) => return Some(path),
                (Some((&item, &child)), None) => {
                    path.push((item, self.nodes[child].count));
                    current = child;
                }
                (Some(_), Some(_)) => return None,
            }
        }
    }

    /// Returns the items in the header table, least frequent first.
    ///
    /// Mining in this order keeps each conditional tree as small as possible, since the least
    /// frequent items have the fewest and shortest prefix paths.
    pub fn header_items_by_ascending_support(&self) -> Vec<I> {
        let mut items: Vec<(usize, usize, I)> = self
            .header
            .keys()
            .map(|&item| (self.item_count(item), self.rank[&item], item))
            .collect();
        items.sort_unstable_by(|(count_a, rank_a, _), (count_b, rank_b, _)| {
            count_a.cmp(count_b).then_with(|| rank_b.cmp(rank_a))
        });
        items.into_iter().map(|(_, _, item)| item).collect()
    }

    /// Returns the tree of prefix paths leading to `item`, each weighted by how many of this
    /// tree's transactions contain `item` below that path, with `item` itself and any item that
    /// falls below the minimum count removed.
    ///
    /// Counting in the returned tree then gives the number of transactions that contain both
    /// `item` and whatever is being counted. This tree is not modified.
    pub fn conditional_tree(&self, item: I) -> FpTree<I> {
        let mut tree = self.clone();
        tree.weigh_prefixes_of(item);

        for id in self.chain(item).collect::<Vec<_>>() {
            tree.splice(id);
        }

        let mut totals: HashMap<I, (usize, Vec<NodeId>)> = HashMap::new();
        tree.for_each_node(|id, node| {
            if let Some(item) = node.item {
                let total = totals.entry(item).or_default();
                total.0 += node.count;
                total.1.push(id);
            }
        });
        for (_, (total, ids)) in totals {
            if total < tree.minimum_count {
                for id in ids {
                    tree.splice(id);
                }
            }
        }

        tree.compact()
    }

    /// Replaces every node's count with the number of transactions that reach `item` through
    /// that node. Nodes holding `item` keep their own count; nodes below them drop to zero.
    ///
    /// Nodes are always created after their parent, so sweeping the arena backward sees every
    /// child before its parent.
    fn weigh_prefixes_of(&mut self, item: I) {
        let mut weights = vec![0; self.nodes.len()];
        for id in (0..self.nodes.len()).rev() {
            let node = &self.nodes[id];
            let weight = if node.item == Some(item) {
                node.count
            } else {
                node.children.values().map(|&child| weights[child]).sum()
            };
            weights[id] = weight;
        }
        for (node, weight) in self.nodes.iter_mut().zip(weights) {
            node.count = weight;
        }
    }

    /// Detaches a node from the tree and hands its children to its parent, merging any child
    /// into an existing sibling holding the same item.
    ///
    /// Splicing a node that was already merged away does nothing.
    fn splice(&mut self, id: NodeId) {
        let (item, parent) = match (self.nodes[id].item, self.nodes[id].parent) {
            (Some(item), Some(parent)) => (item, parent),
            _ => return,
        };
        if self.nodes[parent].children.get(&item) != Some(&id) {
            return;
        }

        self.nodes[parent].children.remove(&item);
        for (child_item, child) in take(&mut self.nodes[id].children) {
            self.adopt(parent, child_item, child);
        }
    }

    fn adopt(&mut self, parent: NodeId, item: I, child: NodeId) {
        match self.nodes[parent].children.get(&item).copied() {
            None => {
                self.nodes[parent].children.insert(item, child);
                self.nodes[child].parent = Some(parent);
            }
            Some(sibling) => {
                self.nodes[sibling].count += self.nodes[child].count;
                for (grandchild_item, grandchild) in take(&mut self.nodes[child].children) {
                    self.adopt(sibling, grandchild_item, grandchild);
                }
            }
        }
    }

    fn for_each_node<F: FnMut(NodeId, &Node<I>)>(&self, mut f: F) {
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            f(id, node);
            stack.extend(node.children.values().copied());
        }
    }

    /// Copies the nodes still reachable from the root, minus any with a zero count, into a fresh
    /// arena with rebuilt chains.
    fn compact(&self) -> FpTree<I> {
        let mut tree = FpTree::with_order(
            Arc::clone(&self.rank),
            self.transaction_count,
            self.minimum_count,
        );
        let mut stack = vec![(ROOT, ROOT)];
        while let Some((old, new)) = stack.pop() {
            for (&item, &child) in self.nodes[old].children.iter() {
                let count = self.nodes[child].count;
                if count == 0 {
                    continue;
                }
                let id = tree.add_node(item, new);
                tree.nodes[id].count = count;
                stack.push((child, id));
            }
        }
        tree
    }

    /// Returns every itemset made of `prefix` plus a non-empty combination of the items on this
    /// tree's single path.
    ///
    /// Counts only shrink going down a path, so any combination occurs as often as its deepest
    /// item's node, and every node in a conditional tree already meets the minimum count. Returns
    /// an empty set if the tree is not a single path.
    pub fn extract_combinations_from_single_path(
        &self,
        prefix: &Itemset<I>,
    ) -> HashSet<Itemset<I>> {
        let path = match self.single_path() {
            Some(path) => path,
            None => return HashSet::new(),
        };

        let mut combinations = vec![prefix.clone()];
        for (item, _) in path {
            for idx in 0..combinations.len() {
                let extended = combinations[idx].with(item);
                combinations.push(extended);
            }
        }

        // The first entry is `prefix` alone.
        combinations.into_iter().skip(1).collect()
    }
}

impl<I: Item> SupportIndex<I> for FpTree<I> {
    /// Counts `itemset` by visiting each node of its least frequent item and checking whether the
    /// rest of the itemset lies on the path above that node.
    ///
    /// Returns 0 for the empty itemset and for any itemset with an item this tree doesn't index.
    fn count(&self, itemset: &Itemset<I>) -> usize {
        let mut wanted = Vec::with_capacity(itemset.len());
        for item in itemset.iter() {
            match self.rank.get(&item) {
                Some(&rank) => wanted.push((rank, item)),
                None => return 0,
            }
        }
        // Walking up from a node visits items in descending rank.
        wanted.sort_unstable_by(|a, b| b.cmp(a));

        let (deepest, above) = match wanted.split_first() {
            Some((&(_, deepest), above)) => (deepest, above),
            None => return 0,
        };

        self.chain(deepest)
            .filter(|&id| self.path_above_contains(id, above))
            .map(|id| self.nodes[id].count)
            .sum()
    }

    fn transaction_count(&self) -> usize {
        self.transaction_count
    }
}

impl<I: Item> FpTree<I> {
    fn path_above_contains(&self, node: NodeId, mut wanted: &[(usize, I)]) -> bool {
        let mut current = self.nodes[node].parent;
        while let (Some(&(_, item)), Some(id)) = (wanted.first(), current) {
            if self.nodes[id].item == Some(item) {
                wanted = &wanted[1..];
            }
            current = self.nodes[id].parent;
        }
        wanted.is_empty()
    }
}
