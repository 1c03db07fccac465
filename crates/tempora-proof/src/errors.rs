use std::path::PathBuf;

use tempora_core::{DecodeError, TimestampError};
use thiserror::Error;

/// Errors that can occur while building, storing, or verifying proofs.
#[derive(Error, Debug)]
pub enum ProofError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Proof bytes could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Timestamp tree construction or encoding failed.
    #[error("timestamp error: {0}")]
    Timestamp(#[from] TimestampError),
    /// Root message length does not match the file hash operation.
    #[error("{op} produces {expected}-byte digests, found {actual} bytes")]
    DigestLengthMismatch {
        /// Display form of the file hash operation.
        op: String,
        /// Digest length the operation produces.
        expected: usize,
        /// Length of the root message.
        actual: usize,
    },
    /// Two proofs hashed their file with different operations.
    #[error("file hash operations differ: {ours} != {theirs}")]
    HashOpMismatch {
        /// Operation of the receiving proof.
        ours: String,
        /// Operation of the merged-in proof.
        theirs: String,
    },
    /// Unrecognised chain name.
    #[error("invalid chain name: {0}")]
    InvalidChain(String),
    /// The user's home directory could not be determined.
    #[error("home directory unavailable")]
    HomeDirUnavailable,
    /// An attestation or file digest did not verify.
    #[error("verification failed: {0}")]
    Verification(String),
    /// Refused to overwrite an existing proof file.
    #[error("proof file already exists: {}", .0.display())]
    FileExists(PathBuf),
}
