use agglo_core::{
    CanonicalTree, CoreError, Label, MergeRecord, StructuralError, Vocabulary, canonicalize,
    compare_partitions,
};

use crate::SimulationResult;
use crate::generate::{
    are_sibling_leaves, isomorphic_variant, move_item, relabel_partition, swap_leaves,
};
use crate::rng::DeterministicRng;

// ── Core result types ─────────────────────────────────────────────────────────

/// Oracle result for an invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleResult {
    /// `true` iff no violations were found.
    pub passed: bool,
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    const fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    fn fail(violation: InvariantViolation) -> Self {
        Self {
            passed: false,
            violations: vec![violation],
        }
    }

    /// Merge another result into this one (failures accumulate).
    #[must_use]
    fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self
    }
}

// ── Invariant violation diagnostics ──────────────────────────────────────────

/// Diagnostic information for a single failed invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The core rejected input that the generator guarantees is valid.
    Rejected {
        check: &'static str,
        error: String,
    },

    /// Canonical form does not hold exactly one leaf per input leaf, or a
    /// truncated record list was accepted.
    LeafCount { expected: usize, actual: usize },

    /// Exchanging sides within records changed the canonical form.
    OrderInvariance {
        variant: usize,
        offset: Option<usize>,
    },

    /// Re-ordering and renumbering steps changed the canonical form.
    Isomorphism {
        variant: usize,
        offset: Option<usize>,
    },

    /// Swapping two non-sibling leaves left the canonical form unchanged.
    Insensitive { leaf_a: usize, leaf_b: usize },

    /// Parsing the rendered fixture did not give back the same tree.
    RoundTrip { offset: Option<usize> },

    /// Renaming cluster labels produced mismatches.
    RenameInvariance { mismatch_count: usize },

    /// One cluster against all singletons did not disagree on every item
    /// within a single group.
    FullDisagreement {
        items: usize,
        mismatch_count: usize,
        groups: usize,
    },

    /// Moving one item did not disagree on exactly the source and target
    /// cluster members.
    SingleMove {
        item: usize,
        expected: usize,
        actual: usize,
    },
}

// ── Oracle ────────────────────────────────────────────────────────────────────

/// Oracle for the canonicalizer and partition comparator.
///
/// # Invariants checked
///
/// 1. **Leaf count** (`check_leaf_count`): one leaf per input leaf, and a
///    record list one step short is rejected.
/// 2. **Order invariance** (`check_order_invariance`): exchanging the sides
///    of records does not change the canonical form.
/// 3. **Isomorphism** (`check_isomorphism`): any valid re-ordering of the
///    steps with renamed internal ids gives the same canonical form.
/// 4. **Sensitivity** (`check_sensitivity`): swapping two non-sibling
///    leaves does change it.
/// 5. **Round trip** (`check_round_trip`): the rendered fixture parses back.
/// 6. **Rename invariance** (`check_rename_invariance`).
/// 7. **Full disagreement** (`check_full_disagreement`).
/// 8. **Single move** (`check_single_move`): `|X| + |Y|` mismatches.
pub struct CanonicalOracle;

impl CanonicalOracle {
    #[must_use]
    pub fn check_leaf_count(leaves: usize, merges: &[MergeRecord]) -> OracleResult {
        let tree = match canonical_or_fail("leaf_count", leaves, merges) {
            Ok(tree) => tree,
            Err(result) => return result,
        };
        if tree.leaf_count() != leaves {
            return OracleResult::fail(InvariantViolation::LeafCount {
                expected: leaves,
                actual: tree.leaf_count(),
            });
        }

        let truncated = &merges[..merges.len().saturating_sub(1)];
        match canonicalize(leaves, truncated) {
            Err(CoreError::Structural(StructuralError::MergeCount { .. })) => {
                OracleResult::pass()
            }
            Err(err) => OracleResult::fail(InvariantViolation::Rejected {
                check: "leaf_count",
                error: err.to_string(),
            }),
            Ok(short) => OracleResult::fail(InvariantViolation::LeafCount {
                expected: leaves,
                actual: short.leaf_count(),
            }),
        }
    }

    #[must_use]
    pub fn check_order_invariance(
        leaves: usize,
        merges: &[MergeRecord],
        rng: &mut DeterministicRng,
        variants: usize,
    ) -> OracleResult {
        let base = match canonical_or_fail("order_invariance", leaves, merges) {
            Ok(tree) => tree,
            Err(result) => return result,
        };
        let mut result = OracleResult::pass();
        for variant in 0..variants {
            let swapped: Vec<MergeRecord> = merges
                .iter()
                .map(|record| {
                    if rng.hit_rate_percent(50) {
                        record.swapped()
                    } else {
                        *record
                    }
                })
                .collect();
            result = result.merge(
                match canonical_or_fail("order_invariance", leaves, &swapped) {
                    Ok(tree) if tree == base => OracleResult::pass(),
                    Ok(tree) => OracleResult::fail(InvariantViolation::OrderInvariance {
                        variant,
                        offset: base.first_divergence(&tree),
                    }),
                    Err(failed) => failed,
                },
            );
        }
        result
    }

    #[must_use]
    pub fn check_isomorphism(
        leaves: usize,
        merges: &[MergeRecord],
        rng: &mut DeterministicRng,
        variants: usize,
        swap_percent: u8,
    ) -> OracleResult {
        let base = match canonical_or_fail("isomorphism", leaves, merges) {
            Ok(tree) => tree,
            Err(result) => return result,
        };
        let mut result = OracleResult::pass();
        for variant in 0..variants {
            let renumbered = isomorphic_variant(rng, leaves, merges, swap_percent);
            result = result.merge(match canonical_or_fail("isomorphism", leaves, &renumbered) {
                Ok(tree) if tree == base => OracleResult::pass(),
                Ok(tree) => OracleResult::fail(InvariantViolation::Isomorphism {
                    variant,
                    offset: base.first_divergence(&tree),
                }),
                Err(failed) => failed,
            });
        }
        result
    }

    /// Passes trivially when no non-sibling pair is found in a few draws
    /// (for example with two or three leaves).
    #[must_use]
    pub fn check_sensitivity(
        leaves: usize,
        merges: &[MergeRecord],
        rng: &mut DeterministicRng,
    ) -> OracleResult {
        let base = match canonical_or_fail("sensitivity", leaves, merges) {
            Ok(tree) => tree,
            Err(result) => return result,
        };
        for _ in 0..8 {
            let leaf_a = rng.next_index(leaves);
            let leaf_b = rng.next_index(leaves);
            if leaf_a == leaf_b || are_sibling_leaves(merges, leaf_a, leaf_b) {
                continue;
            }
            let swapped = swap_leaves(merges, leaf_a, leaf_b);
            return match canonical_or_fail("sensitivity", leaves, &swapped) {
                Ok(tree) if tree == base => {
                    OracleResult::fail(InvariantViolation::Insensitive { leaf_a, leaf_b })
                }
                Ok(_) => OracleResult::pass(),
                Err(failed) => failed,
            };
        }
        OracleResult::pass()
    }

    #[must_use]
    pub fn check_round_trip(leaves: usize, merges: &[MergeRecord]) -> OracleResult {
        let tree = match canonical_or_fail("round_trip", leaves, merges) {
            Ok(tree) => tree,
            Err(result) => return result,
        };
        match tree.to_string().parse::<CanonicalTree>() {
            Ok(parsed) if parsed == tree => OracleResult::pass(),
            Ok(parsed) => OracleResult::fail(InvariantViolation::RoundTrip {
                offset: tree.first_divergence(&parsed),
            }),
            Err(err) => OracleResult::fail(InvariantViolation::Rejected {
                check: "round_trip",
                error: err.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn check_rename_invariance(
        vocab: &Vocabulary,
        labels: &[Label],
        rng: &mut DeterministicRng,
    ) -> OracleResult {
        let renamed = relabel_partition(rng, labels);
        match compare_partitions(vocab, labels, &renamed) {
            Ok(divergence) if divergence.is_equivalent() => OracleResult::pass(),
            Ok(divergence) => OracleResult::fail(InvariantViolation::RenameInvariance {
                mismatch_count: divergence.mismatch_count,
            }),
            Err(err) => rejected("rename_invariance", &err),
        }
    }

    /// Everything in one cluster against all singletons: every item
    /// disagrees and the disagreement forms one group.
    #[must_use]
    pub fn check_full_disagreement(vocab: &Vocabulary) -> OracleResult {
        let items = vocab.len();
        if items < 2 {
            return OracleResult::pass();
        }
        let lumped = vec![0; items];
        let singletons: Vec<Label> = (0..items)
            .map(|item| Label::try_from(item).unwrap_or(Label::MAX))
            .collect();
        match compare_partitions(vocab, &lumped, &singletons) {
            Ok(divergence)
                if divergence.mismatch_count == items && divergence.groups.len() == 1 =>
            {
                OracleResult::pass()
            }
            Ok(divergence) => OracleResult::fail(InvariantViolation::FullDisagreement {
                items,
                mismatch_count: divergence.mismatch_count,
                groups: divergence.groups.len(),
            }),
            Err(err) => rejected("full_disagreement", &err),
        }
    }

    /// Move one item from cluster X into an existing cluster Y.
    ///
    /// Passes trivially when the partition has a single cluster.
    #[must_use]
    pub fn check_single_move(
        vocab: &Vocabulary,
        labels: &[Label],
        rng: &mut DeterministicRng,
    ) -> OracleResult {
        if labels.is_empty() {
            return OracleResult::pass();
        }
        let item = rng.next_index(labels.len());
        let source = labels[item];
        let mut targets: Vec<Label> = labels.iter().copied().filter(|&l| l != source).collect();
        targets.sort_unstable();
        targets.dedup();
        if targets.is_empty() {
            return OracleResult::pass();
        }
        let target = targets[rng.next_index(targets.len())];

        let size = |label: Label| labels.iter().filter(|&&l| l == label).count();
        let expected = size(source) + size(target);
        let moved = move_item(labels, item, target);
        match compare_partitions(vocab, labels, &moved) {
            Ok(divergence) if divergence.mismatch_count == expected => OracleResult::pass(),
            Ok(divergence) => OracleResult::fail(InvariantViolation::SingleMove {
                item,
                expected,
                actual: divergence.mismatch_count,
            }),
            Err(err) => rejected("single_move", &err),
        }
    }

    /// Run every check against one generated case.
    #[must_use]
    pub fn check_all(
        case: &SimulationResult,
        rng: &mut DeterministicRng,
        variants: usize,
        swap_percent: u8,
    ) -> OracleResult {
        let (leaves, merges) = (case.leaves, case.merges.as_slice());
        Self::check_leaf_count(leaves, merges)
            .merge(Self::check_order_invariance(leaves, merges, rng, variants))
            .merge(Self::check_isomorphism(
                leaves,
                merges,
                rng,
                variants,
                swap_percent,
            ))
            .merge(Self::check_sensitivity(leaves, merges, rng))
            .merge(Self::check_round_trip(leaves, merges))
            .merge(Self::check_rename_invariance(&case.vocab, &case.labels, rng))
            .merge(Self::check_full_disagreement(&case.vocab))
            .merge(Self::check_single_move(&case.vocab, &case.labels, rng))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn rejected(check: &'static str, err: &CoreError) -> OracleResult {
    OracleResult::fail(InvariantViolation::Rejected {
        check,
        error: err.to_string(),
    })
}

fn canonical_or_fail(
    check: &'static str,
    leaves: usize,
    merges: &[MergeRecord],
) -> Result<CanonicalTree, OracleResult> {
    canonicalize(leaves, merges).map_err(|err| rejected(check, &err))
}
