//! Seeded generators for merge sequences and partitions, plus the
//! transformations the oracle applies to them.

use agglo_core::{Label, MergeRecord};

use crate::rng::DeterministicRng;

/// Random agglomeration: every step joins two live nodes picked uniformly.
#[must_use]
pub fn random_merges(rng: &mut DeterministicRng, leaves: usize) -> Vec<MergeRecord> {
    let mut live: Vec<usize> = (0..leaves).collect();
    let mut records = Vec::with_capacity(leaves.saturating_sub(1));
    for step in 0..leaves.saturating_sub(1) {
        let a = live.swap_remove(rng.next_index(live.len()));
        let b = live.swap_remove(rng.next_index(live.len()));
        records.push(MergeRecord::new(a, b));
        live.push(leaves + step);
    }
    records
}

/// Same hierarchy, different encoding: steps are emitted in a random
/// topological order with internal ids renamed to match, and each record's
/// sides are exchanged with probability `swap_percent`.
///
/// `records` must be a valid sequence over `leaves` leaves.
#[must_use]
pub fn isomorphic_variant(
    rng: &mut DeterministicRng,
    leaves: usize,
    records: &[MergeRecord],
    swap_percent: u8,
) -> Vec<MergeRecord> {
    let steps = records.len();
    // Step that consumes each internal node, and unresolved child count per step.
    let mut consumer: Vec<Option<usize>> = vec![None; steps];
    let mut pending = vec![0_u8; steps];
    for (step, record) in records.iter().enumerate() {
        for child in [record.left, record.right] {
            if let Some(internal) = child.checked_sub(leaves) {
                consumer[internal] = Some(step);
                pending[step] += 1;
            }
        }
    }

    let mut ready: Vec<usize> = (0..steps).filter(|&step| pending[step] == 0).collect();
    let mut renamed: Vec<usize> = vec![0; steps];
    let mut out = Vec::with_capacity(steps);
    let rename = |id: usize, renamed: &[usize]| {
        id.checked_sub(leaves)
            .map_or(id, |internal| renamed[internal])
    };

    while !ready.is_empty() {
        let step = ready.swap_remove(rng.next_index(ready.len()));
        let record = MergeRecord::new(
            rename(records[step].left, &renamed),
            rename(records[step].right, &renamed),
        );
        renamed[step] = leaves + out.len();
        out.push(if rng.hit_rate_percent(swap_percent) {
            record.swapped()
        } else {
            record
        });
        if let Some(parent) = consumer[step] {
            pending[parent] -= 1;
            if pending[parent] == 0 {
                ready.push(parent);
            }
        }
    }
    out
}

/// Exchange leaves `i` and `j` everywhere in the sequence.
#[must_use]
pub fn swap_leaves(records: &[MergeRecord], i: usize, j: usize) -> Vec<MergeRecord> {
    let map = |id: usize| match id {
        _ if id == i => j,
        _ if id == j => i,
        _ => id,
    };
    records
        .iter()
        .map(|record| MergeRecord::new(map(record.left), map(record.right)))
        .collect()
}

/// True when `i` and `j` are merged with each other directly.
#[must_use]
pub fn are_sibling_leaves(records: &[MergeRecord], i: usize, j: usize) -> bool {
    records
        .iter()
        .any(|r| (r.left == i && r.right == j) || (r.left == j && r.right == i))
}

/// Assign each item one of `clusters` labels uniformly.
#[must_use]
pub fn random_partition(rng: &mut DeterministicRng, items: usize, clusters: usize) -> Vec<Label> {
    let clusters = clusters.max(1);
    (0..items)
        .map(|_| Label::try_from(rng.next_index(clusters)).unwrap_or(0))
        .collect()
}

/// Rename labels through a random injective mapping.
#[must_use]
pub fn relabel_partition(rng: &mut DeterministicRng, labels: &[Label]) -> Vec<Label> {
    let mut distinct: Vec<Label> = labels.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    let mut targets: Vec<Label> = (0..)
        .map(|slot: Label| 1_000 + 7 * slot)
        .take(distinct.len())
        .collect();
    rng.shuffle(&mut targets);
    labels
        .iter()
        .map(|label| {
            distinct
                .binary_search(label)
                .map_or(*label, |slot| targets[slot])
        })
        .collect()
}

/// Move one item into the cluster labelled `target`.
#[must_use]
pub fn move_item(labels: &[Label], item: usize, target: Label) -> Vec<Label> {
    let mut moved = labels.to_vec();
    if let Some(slot) = moved.get_mut(item) {
        *slot = target;
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use agglo_core::canonicalize;

    #[test]
    fn random_merges_are_valid() {
        let mut rng = DeterministicRng::new(11);
        for leaves in 2..40 {
            let records = random_merges(&mut rng, leaves);
            assert_eq!(records.len(), leaves - 1);
            canonicalize(leaves, &records).expect("generated sequence is valid");
        }
    }

    #[test]
    fn variant_is_valid_and_isomorphic() {
        let mut rng = DeterministicRng::new(12);
        let records = random_merges(&mut rng, 30);
        let variant = isomorphic_variant(&mut rng, 30, &records, 50);
        assert_eq!(variant.len(), records.len());
        assert_eq!(
            canonicalize(30, &records).expect("valid"),
            canonicalize(30, &variant).expect("valid")
        );
    }

    #[test]
    fn swap_leaves_exchanges_both_directions() {
        let records = vec![MergeRecord::new(0, 1), MergeRecord::new(3, 2)];
        assert_eq!(
            swap_leaves(&records, 0, 2),
            vec![MergeRecord::new(2, 1), MergeRecord::new(3, 0)]
        );
        assert!(are_sibling_leaves(&records, 1, 0));
        assert!(!are_sibling_leaves(&records, 1, 2));
    }

    #[test]
    fn relabel_keeps_grouping() {
        let mut rng = DeterministicRng::new(13);
        let labels = vec![0, 3, 0, 2, 3];
        let renamed = relabel_partition(&mut rng, &labels);
        for i in 0..labels.len() {
            for j in 0..labels.len() {
                assert_eq!(labels[i] == labels[j], renamed[i] == renamed[j]);
            }
        }
    }

    #[test]
    fn move_item_changes_one_label() {
        assert_eq!(move_item(&[0, 0, 1], 1, 1), vec![0, 1, 1]);
        assert_eq!(move_item(&[0, 0, 1], 9, 1), vec![0, 0, 1]);
    }
}
