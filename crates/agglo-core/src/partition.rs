//! Flat partition comparison.
//!
//! Two engines label the same vocabulary with arbitrary integer cluster ids.
//! Labels are only meaningful within one assignment, so clusters are compared
//! by membership: each cluster becomes the sorted tuple of its tokens, and an
//! item disagrees when its tuple under partition A differs from its tuple
//! under partition B.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::error::{AlignmentError, CoreError, DegenerateInputError};

/// Cluster label as written by a producer. Negative values mean "unassigned".
pub type Label = i64;

/// Ordered, duplicate-free list of item tokens. Item `i` is `tokens[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Build a vocabulary, keeping the iteration order as item order.
    ///
    /// # Errors
    ///
    /// Returns [`AlignmentError::DuplicateToken`] when a token repeats; the
    /// reported line is 1-based.
    pub fn new<I, S>(tokens: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let mut index = HashMap::with_capacity(tokens.len());
        for (item, token) in tokens.iter().enumerate() {
            if index.insert(token.clone(), item).is_some() {
                return Err(AlignmentError::DuplicateToken {
                    token: token.clone(),
                    line: item + 1,
                }
                .into());
            }
        }
        Ok(Self { tokens, index })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn token(&self, item: usize) -> Option<&str> {
        self.tokens.get(item).map(String::as_str)
    }

    #[must_use]
    pub fn position(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Sorted token tuple of one cluster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalCluster(Vec<String>);

impl CanonicalCluster {
    fn from_members(vocab: &Vocabulary, members: &[usize]) -> Self {
        let mut tokens: Vec<String> = members
            .iter()
            .filter_map(|&item| vocab.token(item).map(str::to_owned))
            .collect();
        tokens.sort_unstable();
        Self(tokens)
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CanonicalCluster {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut tokens: Vec<String> = iter.into_iter().map(Into::into).collect();
        tokens.sort_unstable();
        Self(tokens)
    }
}

/// One (cluster in A, cluster in B) pair observed on a disagreeing item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DisagreementPair {
    pub left: CanonicalCluster,
    pub right: CanonicalCluster,
}

/// Connected set of disagreement pairs: the A clusters and B clusters that
/// split the same items differently.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DisagreementGroup {
    pub items: usize,
    pub left: Vec<CanonicalCluster>,
    pub right: Vec<CanonicalCluster>,
}

/// Result of comparing two partitions of the same vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    pub items: usize,
    pub clusters_left: usize,
    pub clusters_right: usize,
    pub mismatch_count: usize,
    pub disagreements: BTreeSet<DisagreementPair>,
    pub groups: Vec<DisagreementGroup>,
}

impl Divergence {
    /// True when both partitions describe the same clusters.
    #[must_use]
    pub fn is_equivalent(&self) -> bool {
        self.mismatch_count == 0
    }

    /// Number of clusters in (A, B).
    #[must_use]
    pub const fn cluster_counts(&self) -> (usize, usize) {
        (self.clusters_left, self.clusters_right)
    }
}

/// Items grouped by label, in order of first appearance.
struct Grouping {
    cluster_of: Vec<usize>,
    members: Vec<Vec<usize>>,
}

impl Grouping {
    fn build(vocab: &Vocabulary, labels: &[Label]) -> Result<Self, CoreError> {
        let mut by_label: BTreeMap<Label, usize> = BTreeMap::new();
        let mut cluster_of = Vec::with_capacity(labels.len());
        let mut members: Vec<Vec<usize>> = Vec::new();
        let mut cluster_labels = Vec::new();

        for (item, &label) in labels.iter().enumerate() {
            if label < 0 {
                return Err(DegenerateInputError::UnassignedItem {
                    item,
                    token: vocab.token(item).unwrap_or_default().to_owned(),
                    label,
                }
                .into());
            }
            let next = members.len();
            let cluster = *by_label.entry(label).or_insert(next);
            if cluster == next {
                members.push(Vec::new());
                cluster_labels.push(label);
            }
            members[cluster].push(item);
            cluster_of.push(cluster);
        }

        if let Some(cluster) = members.iter().position(Vec::is_empty) {
            return Err(DegenerateInputError::EmptyCluster {
                label: cluster_labels[cluster],
            }
            .into());
        }

        Ok(Self {
            cluster_of,
            members,
        })
    }

    fn canonical(&self, vocab: &Vocabulary, cluster: usize) -> CanonicalCluster {
        CanonicalCluster::from_members(vocab, &self.members[cluster])
    }
}

fn check_vocab_alignment(vocab: &Vocabulary, labels: &[Label]) -> Result<(), AlignmentError> {
    if labels.len() == vocab.len() {
        Ok(())
    } else {
        Err(AlignmentError::LengthMismatch {
            what: "labels vs vocabulary",
            left: labels.len(),
            right: vocab.len(),
        })
    }
}

/// Canonical clusters of one partition, sorted.
///
/// # Errors
///
/// Fails when `labels` is not aligned with `vocab`, or when an item carries
/// a negative (unassigned) label.
pub fn canonical_clusters(
    vocab: &Vocabulary,
    labels: &[Label],
) -> Result<Vec<CanonicalCluster>, CoreError> {
    check_vocab_alignment(vocab, labels)?;
    let grouping = Grouping::build(vocab, labels)?;
    let mut clusters: Vec<CanonicalCluster> = (0..grouping.members.len())
        .map(|cluster| grouping.canonical(vocab, cluster))
        .collect();
    clusters.sort_unstable();
    Ok(clusters)
}

/// Compare two label assignments over the same vocabulary.
///
/// Items are visited in vocabulary order. Tokens are unique, so two token
/// tuples are equal exactly when the clusters hold the same items; that is
/// checked by counting how many members each (A cluster, B cluster) pair
/// shares instead of comparing tuples item by item.
///
/// # Errors
///
/// Fails with an [`AlignmentError`] when the arrays differ in length from each
/// other or from the vocabulary, and with a [`DegenerateInputError`] when an
/// item is unassigned.
pub fn compare_partitions(
    vocab: &Vocabulary,
    left: &[Label],
    right: &[Label],
) -> Result<Divergence, CoreError> {
    if left.len() != right.len() {
        return Err(AlignmentError::LengthMismatch {
            what: "label array",
            left: left.len(),
            right: right.len(),
        }
        .into());
    }
    check_vocab_alignment(vocab, left)?;

    let a = Grouping::build(vocab, left)?;
    let b = Grouping::build(vocab, right)?;

    let mut shared: HashMap<(usize, usize), usize> = HashMap::new();
    for item in 0..vocab.len() {
        *shared
            .entry((a.cluster_of[item], b.cluster_of[item]))
            .or_default() += 1;
    }

    let mut mismatch_count = 0;
    let mut pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for item in 0..vocab.len() {
        let key = (a.cluster_of[item], b.cluster_of[item]);
        let overlap = shared.get(&key).copied().unwrap_or_default();
        let same = overlap == a.members[key.0].len() && overlap == b.members[key.1].len();
        if !same {
            mismatch_count += 1;
            pairs.insert(key);
        }
    }

    let disagreements = pairs
        .iter()
        .map(|&(ca, cb)| DisagreementPair {
            left: a.canonical(vocab, ca),
            right: b.canonical(vocab, cb),
        })
        .collect();
    let groups = disagreement_groups(vocab, &a, &b, &pairs);

    Ok(Divergence {
        items: vocab.len(),
        clusters_left: a.members.len(),
        clusters_right: b.members.len(),
        mismatch_count,
        disagreements,
        groups,
    })
}

/// Connected components of the bipartite graph formed by the pairs.
fn disagreement_groups(
    vocab: &Vocabulary,
    a: &Grouping,
    b: &Grouping,
    pairs: &BTreeSet<(usize, usize)>,
) -> Vec<DisagreementGroup> {
    let offset = a.members.len();
    let mut sets = DisjointSets::new(offset + b.members.len());
    for &(ca, cb) in pairs {
        sets.union(ca, offset + cb);
    }

    let mut components: BTreeMap<usize, (BTreeSet<usize>, BTreeSet<usize>)> = BTreeMap::new();
    for &(ca, cb) in pairs {
        let root = sets.find(ca);
        let entry = components.entry(root).or_default();
        entry.0.insert(ca);
        entry.1.insert(cb);
    }

    let mut groups: Vec<DisagreementGroup> = components
        .into_values()
        .map(|(lefts, rights)| {
            let mut left: Vec<CanonicalCluster> =
                lefts.iter().map(|&c| a.canonical(vocab, c)).collect();
            let mut right: Vec<CanonicalCluster> =
                rights.iter().map(|&c| b.canonical(vocab, c)).collect();
            left.sort_unstable();
            right.sort_unstable();
            DisagreementGroup {
                items: left.iter().map(CanonicalCluster::len).sum(),
                left,
                right,
            }
        })
        .collect();
    groups.sort_unstable();
    groups
}

/// Union-find with path halving; the lower index wins ties.
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            let grandparent = self.parent[self.parent[x]];
            self.parent[x] = grandparent;
            x = grandparent;
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        let (root, child) = match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Equal => {
                let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
                self.rank[root] = self.rank[root].saturating_add(1);
                (root, child)
            }
        };
        self.parent[child] = root;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn vocab(tokens: &[&str]) -> Vocabulary {
        Vocabulary::new(tokens.iter().copied()).expect("unique tokens")
    }

    fn cluster(tokens: &[&str]) -> CanonicalCluster {
        tokens.iter().copied().collect()
    }

    #[test]
    fn identical_up_to_renaming_is_equivalent() {
        let v = vocab(&["a", "b", "c", "d", "e"]);
        let result =
            compare_partitions(&v, &[0, 0, 1, 2, 2], &[7, 7, 3, 9, 9]).expect("aligned");
        assert!(result.is_equivalent());
        assert_eq!(result.mismatch_count, 0);
        assert!(result.disagreements.is_empty());
        assert!(result.groups.is_empty());
        assert_eq!(result.cluster_counts(), (3, 3));
    }

    #[test]
    fn crossed_pairs_disagree_on_every_item() {
        let v = vocab(&["a", "b", "c", "d"]);
        let result = compare_partitions(&v, &[0, 0, 1, 1], &[0, 1, 1, 0]).expect("aligned");
        assert_eq!(result.mismatch_count, 4);

        // a: (a,b)/(a,d)  b: (a,b)/(b,c)  c: (c,d)/(b,c)  d: (c,d)/(a,d)
        let expected: BTreeSet<DisagreementPair> = [
            (["a", "b"], ["a", "d"]),
            (["a", "b"], ["b", "c"]),
            (["c", "d"], ["b", "c"]),
            (["c", "d"], ["a", "d"]),
        ]
        .into_iter()
        .map(|(l, r)| DisagreementPair {
            left: cluster(&l),
            right: cluster(&r),
        })
        .collect();
        assert_eq!(result.disagreements, expected);

        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].items, 4);
        assert_eq!(
            result.groups[0].left,
            vec![cluster(&["a", "b"]), cluster(&["c", "d"])]
        );
    }

    #[test]
    fn one_cluster_against_singletons() {
        let v = vocab(&["w", "x", "y", "z"]);
        let result = compare_partitions(&v, &[5, 5, 5, 5], &[0, 1, 2, 3]).expect("aligned");
        assert_eq!(result.mismatch_count, 4);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].left, vec![cluster(&["w", "x", "y", "z"])]);
        assert_eq!(result.groups[0].right.len(), 4);
        assert!(
            result
                .disagreements
                .iter()
                .all(|pair| pair.left == cluster(&["w", "x", "y", "z"]))
        );
    }

    #[test]
    fn moving_one_item_touches_both_clusters() {
        let v = vocab(&["a", "b", "c", "d", "e", "f"]);
        // Move "c" from {a,b,c} to {d,e}; {f} is untouched.
        let result =
            compare_partitions(&v, &[0, 0, 0, 1, 1, 2], &[0, 0, 1, 1, 1, 2]).expect("aligned");
        assert_eq!(result.mismatch_count, 5);
        assert_eq!(result.disagreements.len(), 3);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].items, 5);
    }

    #[test]
    fn independent_disagreements_form_separate_groups() {
        let v = vocab(&["a", "b", "c", "d"]);
        let result = compare_partitions(&v, &[0, 0, 1, 1], &[0, 1, 2, 3]).expect("aligned");
        assert_eq!(result.mismatch_count, 4);
        assert_eq!(result.groups.len(), 2);
    }

    #[test]
    fn canonical_clusters_are_sorted_tuples() {
        let v = vocab(&["the", "cat", "sat", "on"]);
        let clusters = canonical_clusters(&v, &[1, 0, 1, 0]).expect("aligned");
        assert_eq!(clusters, vec![cluster(&["cat", "on"]), cluster(&["sat", "the"])]);
    }

    #[test]
    fn rejects_length_mismatch_between_partitions() {
        let v = vocab(&["a", "b", "c"]);
        let err = compare_partitions(&v, &[0, 0, 1], &[0, 0]).expect_err("mismatched");
        assert_eq!(err.code(), ErrorCode::LengthMismatch);
    }

    #[test]
    fn rejects_labels_not_aligned_with_vocabulary() {
        let v = vocab(&["a", "b", "c"]);
        let err = compare_partitions(&v, &[0, 0], &[0, 0]).expect_err("short labels");
        assert_eq!(err.code(), ErrorCode::LengthMismatch);
    }

    #[test]
    fn rejects_unassigned_items() {
        let v = vocab(&["a", "b"]);
        let err = compare_partitions(&v, &[0, -1], &[0, 0]).expect_err("unassigned");
        assert!(matches!(
            err,
            CoreError::Degenerate(DegenerateInputError::UnassignedItem { item: 1, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_vocabulary_tokens() {
        let err = Vocabulary::new(["a", "b", "a"]).expect_err("duplicate");
        assert!(matches!(
            err,
            CoreError::Alignment(AlignmentError::DuplicateToken { line: 3, .. })
        ));
    }

    #[test]
    fn empty_vocabulary_compares_equal() {
        let v = vocab(&[]);
        let result = compare_partitions(&v, &[], &[]).expect("aligned");
        assert!(result.is_equivalent());
        assert_eq!(result.items, 0);
    }
}
