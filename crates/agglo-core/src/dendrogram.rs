//! Dendrogram canonicalization.
//!
//! A clustering engine reports its hierarchy as `n - 1` pairwise merge
//! records over `n` leaves; step `k` creates node `n + k`. Two engines that
//! agree on the hierarchy can still disagree on which child they call
//! "left", so the tree is re-serialized with every pair ordered by the
//! minimum leaf index below each child (its canonical key).
//!
//! Canonical keys are the leaf indices themselves, which only gives a total
//! order because leaves are the dense integers `0..n`. Sparse or
//! non-comparable leaf identifiers would need a different key.
//!
//! Encoding, rendering and parsing never recurse: caterpillar trees over a
//! large vocabulary are as deep as they are wide.

use std::cmp::Ordering;
use std::fmt::{self, Write as _};
use std::str::FromStr;

use fixedbitset::FixedBitSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, DegenerateInputError, StructuralError};
use crate::partition::Vocabulary;

/// Identifier of a leaf (`0..n`) or of the internal node created at step `k` (`n + k`).
pub type NodeId = usize;

/// One agglomeration step: the two live nodes it joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeRecord {
    pub left: NodeId,
    pub right: NodeId,
}

impl MergeRecord {
    #[must_use]
    pub const fn new(left: NodeId, right: NodeId) -> Self {
        Self { left, right }
    }

    /// The same merge with its sides exchanged.
    #[must_use]
    pub const fn swapped(self) -> Self {
        Self {
            left: self.right,
            right: self.left,
        }
    }
}

impl From<(NodeId, NodeId)> for MergeRecord {
    fn from((left, right): (NodeId, NodeId)) -> Self {
        Self::new(left, right)
    }
}

/// Node table entry. Children are stored already in canonical order.
#[derive(Debug, Clone, Copy)]
struct Node {
    children: Option<(NodeId, NodeId)>,
    key: usize,
}

/// Arena of every node created by one canonicalization call.
struct NodeTable {
    nodes: Vec<Node>,
    live: FixedBitSet,
}

impl NodeTable {
    fn with_leaves(leaves: usize) -> Self {
        let total = 2 * leaves - 1;
        let mut nodes = Vec::with_capacity(total);
        nodes.extend((0..leaves).map(|leaf| Node {
            children: None,
            key: leaf,
        }));
        let mut live = FixedBitSet::with_capacity(total);
        live.insert_range(..leaves);
        Self { nodes, live }
    }

    fn merge(&mut self, step: usize, record: MergeRecord) -> Result<NodeId, StructuralError> {
        let next_id = self.nodes.len();
        for node in [record.left, record.right] {
            if node >= next_id {
                return Err(StructuralError::UnknownNode {
                    step,
                    node,
                    next_id,
                });
            }
            if !self.live.contains(node) {
                return Err(StructuralError::NodeNotLive { step, node });
            }
        }
        if record.left == record.right {
            return Err(StructuralError::SelfMerge {
                step,
                node: record.left,
            });
        }

        let left_key = self.nodes[record.left].key;
        let right_key = self.nodes[record.right].key;
        let (first, second, key) = match left_key.cmp(&right_key) {
            Ordering::Less => (record.left, record.right, left_key),
            Ordering::Greater => (record.right, record.left, right_key),
            // Live subtrees cover disjoint leaf sets, so this is a broken table.
            Ordering::Equal => {
                return Err(StructuralError::KeyCollision {
                    step,
                    key: left_key,
                });
            }
        };

        self.live.set(record.left, false);
        self.live.set(record.right, false);
        self.live.insert(next_id);
        self.nodes.push(Node {
            children: Some((first, second)),
            key,
        });
        Ok(next_id)
    }

    fn root(&self) -> Result<NodeId, StructuralError> {
        let live = self.live.count_ones(..);
        match self.live.ones().next() {
            Some(root) if live == 1 => Ok(root),
            _ => Err(StructuralError::FinalLiveCount { live }),
        }
    }

    fn encode(&self, root: NodeId) -> CanonicalTree {
        let mut tokens = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.nodes[id];
            match node.children {
                Some((first, second)) => {
                    tokens.push(Token::Pair);
                    stack.push(second);
                    stack.push(first);
                }
                None => tokens.push(Token::Leaf(node.key)),
            }
        }
        CanonicalTree { tokens }
    }
}

/// Build the canonical serialization of the tree described by `records`.
///
/// # Errors
///
/// Returns a [`DegenerateInputError`] when `leaves < 2`, and a
/// [`StructuralError`] when the record count is not `leaves - 1`, when a
/// record references a node that does not exist yet or was already merged,
/// or when the sequence does not end with a single root.
pub fn canonicalize(leaves: usize, records: &[MergeRecord]) -> Result<CanonicalTree, CoreError> {
    if leaves < 2 {
        return Err(DegenerateInputError::TooFewLeaves { leaves }.into());
    }
    if records.len() != leaves - 1 {
        return Err(StructuralError::MergeCount {
            leaves,
            expected: leaves - 1,
            actual: records.len(),
        }
        .into());
    }

    let mut table = NodeTable::with_leaves(leaves);
    for (step, record) in records.iter().enumerate() {
        table.merge(step, *record)?;
    }
    let root = table.root()?;
    debug_assert_eq!(root, 2 * leaves - 2);
    Ok(table.encode(root))
}

/// Preorder token of a full binary tree; `Pair` is followed by its two children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Token {
    Pair,
    Leaf(usize),
}

/// Canonical form of a dendrogram.
///
/// Equality is structural: two merge sequences describing the same hierarchy
/// produce equal values regardless of side or step-numbering choices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalTree {
    tokens: Vec<Token>,
}

impl CanonicalTree {
    /// Number of leaves in the tree.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.tokens.len().div_ceil(2)
    }

    /// Render with leaves replaced by vocabulary tokens instead of indices.
    ///
    /// Leaves outside the vocabulary fall back to their index.
    #[must_use]
    pub fn render_with(&self, vocab: &Vocabulary) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_with(&mut out, |w, leaf| match vocab.token(leaf) {
            Some(token) => w.write_str(token),
            None => write!(w, "{leaf}"),
        });
        out
    }

    /// BLAKE3 digest of the rendered fixture.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("blake3:{}", blake3::hash(self.to_string().as_bytes()).to_hex())
    }

    /// Byte offset of the first difference between the two renderings.
    #[must_use]
    pub fn first_divergence(&self, other: &Self) -> Option<usize> {
        if self == other {
            return None;
        }
        let (ours, theirs) = (self.to_string(), other.to_string());
        let shared = ours
            .bytes()
            .zip(theirs.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        Some(shared)
    }

    fn write_with<W: fmt::Write>(
        &self,
        w: &mut W,
        mut leaf: impl FnMut(&mut W, usize) -> fmt::Result,
    ) -> fmt::Result {
        // One entry per open pair: how many of its children are already written.
        let mut open: Vec<u8> = Vec::new();
        for token in &self.tokens {
            if open.last() == Some(&1) {
                w.write_str(", ")?;
            }
            match *token {
                Token::Pair => {
                    w.write_char('(')?;
                    open.push(0);
                }
                Token::Leaf(index) => {
                    leaf(w, index)?;
                    while let Some(done) = open.last_mut() {
                        *done += 1;
                        if *done < 2 {
                            break;
                        }
                        open.pop();
                        w.write_char(')')?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for CanonicalTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_with(f, |w, leaf| write!(w, "{leaf}"))
    }
}

impl FromStr for CanonicalTree {
    type Err = CoreError;

    /// Parse a rendered fixture, rejecting anything not in canonical form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FixtureParser::new(s).parse().map_err(CoreError::from)
    }
}

impl Serialize for CanonicalTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CanonicalTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Pair whose children are being parsed.
struct OpenPair {
    offset: usize,
    first_key: Option<usize>,
}

enum ParseState {
    ExpectValue,
    AfterValue(usize),
}

fn malformed(offset: usize, reason: impl Into<String>) -> StructuralError {
    StructuralError::MalformedFixture {
        offset,
        reason: reason.into(),
    }
}

struct FixtureParser<'a> {
    input: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    seen: FixedBitSet,
}

impl<'a> FixtureParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            seen: FixedBitSet::new(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self
            .input
            .get(self.pos)
            .is_some_and(u8::is_ascii_whitespace)
        {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), StructuralError> {
        self.skip_whitespace();
        if self.input.get(self.pos) == Some(&byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(malformed(self.pos, format!("expected '{}'", char::from(byte))))
        }
    }

    fn leaf(&mut self) -> Result<usize, StructuralError> {
        let start = self.pos;
        while self.input.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        let digits = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| malformed(start, "invalid leaf"))?;
        if digits.len() > 1 && digits.starts_with('0') {
            return Err(malformed(start, "leaf has a leading zero"));
        }
        let leaf: usize = digits
            .parse()
            .map_err(|_| malformed(start, "leaf index out of range"))?;
        // A fixture over n leaves is at least n bytes long.
        if leaf >= self.input.len() {
            return Err(malformed(start, format!("leaf {leaf} exceeds fixture size")));
        }
        if leaf >= self.seen.len() {
            self.seen.grow(leaf + 1);
        }
        if self.seen.put(leaf) {
            return Err(malformed(start, format!("leaf {leaf} appears twice")));
        }
        Ok(leaf)
    }

    fn parse(mut self) -> Result<CanonicalTree, StructuralError> {
        let mut open: Vec<OpenPair> = Vec::new();
        let mut state = ParseState::ExpectValue;
        loop {
            state = match state {
                ParseState::ExpectValue => {
                    self.skip_whitespace();
                    match self.input.get(self.pos).copied() {
                        Some(b'(') => {
                            open.push(OpenPair {
                                offset: self.pos,
                                first_key: None,
                            });
                            self.tokens.push(Token::Pair);
                            self.pos += 1;
                            ParseState::ExpectValue
                        }
                        Some(byte) if byte.is_ascii_digit() => {
                            let leaf = self.leaf()?;
                            self.tokens.push(Token::Leaf(leaf));
                            ParseState::AfterValue(leaf)
                        }
                        _ => return Err(malformed(self.pos, "expected '(' or a leaf index")),
                    }
                }
                ParseState::AfterValue(key) => {
                    let Some(pair) = open.last_mut() else {
                        break;
                    };
                    match pair.first_key {
                        None => {
                            pair.first_key = Some(key);
                            self.expect(b',')?;
                            ParseState::ExpectValue
                        }
                        Some(first_key) => {
                            let offset = pair.offset;
                            open.pop();
                            self.expect(b')')?;
                            if first_key > key {
                                return Err(malformed(
                                    offset,
                                    format!(
                                        "pair is not in canonical order ({first_key} before {key})"
                                    ),
                                ));
                            }
                            ParseState::AfterValue(first_key)
                        }
                    }
                }
            };
        }

        self.skip_whitespace();
        if self.pos != self.input.len() {
            return Err(malformed(self.pos, "trailing input after root"));
        }
        let leaves = self.seen.count_ones(..);
        if leaves < 2 {
            return Err(malformed(0, "fixture must contain at least one merge"));
        }
        if let Some(gap) = (0..self.seen.len()).find(|&leaf| !self.seen.contains(leaf)) {
            return Err(malformed(0, format!("leaf {gap} is missing")));
        }
        Ok(CanonicalTree {
            tokens: self.tokens,
        })
    }
}
