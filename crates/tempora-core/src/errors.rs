use thiserror::Error;

/// Errors raised while decoding proof bytes.
///
/// Every variant carries the byte offset at which decoding stopped so that a
/// corrupt proof can be diagnosed without re-parsing it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ended before a required field was fully present.
    #[error("input too short at offset {offset}: needed {needed} more byte(s)")]
    Truncated {
        /// Offset where the missing field starts.
        offset: usize,
        /// Number of bytes still required.
        needed: usize,
    },
    /// The fixed magic prefix did not match.
    #[error("bad magic at offset {offset}: not a timestamp proof")]
    BadMagic {
        /// Offset where the magic was expected.
        offset: usize,
    },
    /// Any other structural violation.
    #[error("malformed encoding at offset {offset}: {reason}")]
    Malformed {
        /// Offset of the offending field.
        offset: usize,
        /// Human-readable reason.
        reason: String,
    },
}

impl DecodeError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        DecodeError::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// Rebases an error raised while parsing a nested payload that starts at
    /// `base`. Running out of payload bytes is malformed, not truncated: the
    /// enclosing buffer was long enough.
    pub(crate) fn within_payload(self, base: usize) -> Self {
        match self {
            DecodeError::Truncated { offset, needed } => DecodeError::malformed(
                base + offset,
                format!("payload ends {needed} byte(s) early"),
            ),
            DecodeError::BadMagic { offset } => DecodeError::BadMagic {
                offset: base + offset,
            },
            DecodeError::Malformed { offset, reason } => DecodeError::Malformed {
                offset: base + offset,
                reason,
            },
        }
    }
}

/// Errors raised while building, merging, or encoding timestamp trees.
#[derive(Error, Debug)]
pub enum TimestampError {
    /// A caller-supplied child does not carry `op.apply(parent.msg)`.
    #[error("operation {op} on {parent} yields {expected}, but child message is {actual}")]
    MessageMismatch {
        /// Display form of the operation.
        op: String,
        /// Parent message (hex).
        parent: String,
        /// Message the operation produces (hex).
        expected: String,
        /// Message carried by the supplied child (hex).
        actual: String,
    },
    /// Merge was attempted between nodes for different messages.
    #[error("cannot merge timestamps for different messages: {ours} != {theirs}")]
    MergeMismatch {
        /// Message of the receiving node (hex).
        ours: String,
        /// Message of the merged-in node (hex).
        theirs: String,
    },
    /// A node with no operations and no attestations cannot be encoded.
    #[error("cannot serialize an empty timestamp (message {msg})")]
    EmptyTimestamp {
        /// Message of the empty node (hex).
        msg: String,
    },
    /// The operation cannot be encoded (argument out of bounds).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    /// The operation does not produce a fixed-length digest.
    #[error("{0} is not a digest operation")]
    NotADigestOp(String),
    /// The tree exceeds a limit decoding enforces (message length or depth).
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    /// An attestation value violates its own constraints.
    #[error("invalid attestation: {0}")]
    InvalidAttestation(String),
    /// Reading the byte source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
