use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for scripted test harnesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MergeCountMismatch,
    UnknownNode,
    NodeNotLive,
    SelfMerge,
    CanonicalKeyCollision,
    FinalLiveCount,
    MalformedFixture,
    LengthMismatch,
    DuplicateToken,
    UnknownToken,
    MissingToken,
    TooFewLeaves,
    EmptyCluster,
    UnassignedItem,
    ParseFailed,
    ConfigParseError,
    IoFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MergeCountMismatch => "E1001",
            Self::UnknownNode => "E1002",
            Self::NodeNotLive => "E1003",
            Self::SelfMerge => "E1004",
            Self::CanonicalKeyCollision => "E1005",
            Self::FinalLiveCount => "E1006",
            Self::MalformedFixture => "E1007",
            Self::LengthMismatch => "E2001",
            Self::DuplicateToken => "E2002",
            Self::UnknownToken => "E2003",
            Self::MissingToken => "E2004",
            Self::TooFewLeaves => "E3001",
            Self::EmptyCluster => "E3002",
            Self::UnassignedItem => "E3003",
            Self::ParseFailed => "E4001",
            Self::ConfigParseError => "E4002",
            Self::IoFailed => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MergeCountMismatch => "Wrong number of merge records",
            Self::UnknownNode => "Merge references an identifier that does not exist yet",
            Self::NodeNotLive => "Merge references an already consumed node",
            Self::SelfMerge => "Merge joins a node with itself",
            Self::CanonicalKeyCollision => "Sibling subtrees share a minimum leaf",
            Self::FinalLiveCount => "Merge sequence did not end with a single root",
            Self::MalformedFixture => "Golden fixture is not a canonical dendrogram",
            Self::LengthMismatch => "Label arrays differ in length",
            Self::DuplicateToken => "Token appears more than once",
            Self::UnknownToken => "Token is not in the vocabulary",
            Self::MissingToken => "Vocabulary token has no label",
            Self::TooFewLeaves => "At least two leaves are required",
            Self::EmptyCluster => "Cluster has no members",
            Self::UnassignedItem => "Item carries no cluster label",
            Self::ParseFailed => "Input parse error",
            Self::ConfigParseError => "Config file parse error",
            Self::IoFailed => "I/O failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::MergeCountMismatch => {
                Some("A dendrogram over n leaves needs exactly n-1 merge records.")
            }
            Self::UnknownNode | Self::NodeNotLive | Self::SelfMerge => {
                Some("Check that merge records are in step order and each id is merged once.")
            }
            Self::MalformedFixture => {
                Some("Regenerate the fixture with `agglo golden write`.")
            }
            Self::LengthMismatch | Self::UnknownToken | Self::MissingToken => {
                Some("Make sure both label tables were produced from the same vocabulary.")
            }
            Self::DuplicateToken => Some("Deduplicate the vocabulary or label table."),
            Self::UnassignedItem => {
                Some("The producer left an item unclustered (label -1); fix the producer.")
            }
            Self::ConfigParseError => Some("Fix syntax in agglo.toml and retry."),
            Self::CanonicalKeyCollision
            | Self::FinalLiveCount
            | Self::TooFewLeaves
            | Self::EmptyCluster
            | Self::ParseFailed
            | Self::IoFailed => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Malformed or inconsistent merge sequences and fixtures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("expected {expected} merge records for {leaves} leaves, got {actual}")]
    MergeCount {
        leaves: usize,
        expected: usize,
        actual: usize,
    },

    #[error("step {step}: node {node} has not been created (next id is {next_id})")]
    UnknownNode {
        step: usize,
        node: usize,
        next_id: usize,
    },

    #[error("step {step}: node {node} was already merged")]
    NodeNotLive { step: usize, node: usize },

    #[error("step {step}: node {node} is merged with itself")]
    SelfMerge { step: usize, node: usize },

    #[error("step {step}: children share canonical key {key}")]
    KeyCollision { step: usize, key: usize },

    #[error("{live} live nodes remain after all merges, expected 1")]
    FinalLiveCount { live: usize },

    #[error("malformed fixture at byte {offset}: {reason}")]
    MalformedFixture { offset: usize, reason: String },
}

/// Inputs that do not line up with each other.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlignmentError {
    #[error("{what} length mismatch: left has {left}, right has {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("token {token:?} appears more than once (line {line})")]
    DuplicateToken { token: String, line: usize },

    #[error("token {token:?} at line {line} is not in the vocabulary")]
    UnknownToken { token: String, line: usize },

    #[error("vocabulary token {token:?} has no label")]
    MissingToken { token: String },
}

/// Inputs that are well-formed but too small or empty to analyze.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DegenerateInputError {
    #[error("at least 2 leaves are required, got {leaves}")]
    TooFewLeaves { leaves: usize },

    #[error("cluster with label {label} has no members")]
    EmptyCluster { label: i64 },

    #[error("item {item} ({token:?}) has negative label {label}")]
    UnassignedItem {
        item: usize,
        token: String,
        label: i64,
    },
}

/// Every failure surfaced by the core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Alignment(#[from] AlignmentError),

    #[error(transparent)]
    Degenerate(#[from] DegenerateInputError),

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Stable error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Structural(err) => match err {
                StructuralError::MergeCount { .. } => ErrorCode::MergeCountMismatch,
                StructuralError::UnknownNode { .. } => ErrorCode::UnknownNode,
                StructuralError::NodeNotLive { .. } => ErrorCode::NodeNotLive,
                StructuralError::SelfMerge { .. } => ErrorCode::SelfMerge,
                StructuralError::KeyCollision { .. } => ErrorCode::CanonicalKeyCollision,
                StructuralError::FinalLiveCount { .. } => ErrorCode::FinalLiveCount,
                StructuralError::MalformedFixture { .. } => ErrorCode::MalformedFixture,
            },
            Self::Alignment(err) => match err {
                AlignmentError::LengthMismatch { .. } => ErrorCode::LengthMismatch,
                AlignmentError::DuplicateToken { .. } => ErrorCode::DuplicateToken,
                AlignmentError::UnknownToken { .. } => ErrorCode::UnknownToken,
                AlignmentError::MissingToken { .. } => ErrorCode::MissingToken,
            },
            Self::Degenerate(err) => match err {
                DegenerateInputError::TooFewLeaves { .. } => ErrorCode::TooFewLeaves,
                DegenerateInputError::EmptyCluster { .. } => ErrorCode::EmptyCluster,
                DegenerateInputError::UnassignedItem { .. } => ErrorCode::UnassignedItem,
            },
            Self::Parse { .. } => ErrorCode::ParseFailed,
            Self::Io { .. } => ErrorCode::IoFailed,
        }
    }

    pub(crate) fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }
}
