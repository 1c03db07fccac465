//! Loading proofs and hashing files from disk.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use tempora_core::Op;
use tracing::debug;

use crate::errors::ProofError;
use crate::file::DetachedTimestampFile;

/// Reads and decodes a proof file.
///
/// # Errors
///
/// [`ProofError::Io`] if the file cannot be read, [`ProofError::Decode`] if
/// its contents are not a complete, well-formed proof.
pub fn read_proof_file<P: AsRef<Path>>(path: P) -> Result<DetachedTimestampFile, ProofError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), len = bytes.len(), "read proof file");
    Ok(DetachedTimestampFile::from_bytes(&bytes)?)
}

/// Hashes the file at `path` with `op`, starting an empty proof.
pub fn stamp_file<P: AsRef<Path>>(path: P, op: Op) -> Result<DetachedTimestampFile, ProofError> {
    let mut reader = BufReader::new(File::open(path)?);
    DetachedTimestampFile::from_reader(op, &mut reader)
}
