//! Writing proofs to disk.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use crate::errors::ProofError;
use crate::file::DetachedTimestampFile;

/// Options for writing proof files.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Whether to fsync after writing (default: false).
    pub sync: bool,
    /// Whether to replace an existing file (default: false).
    pub overwrite: bool,
}

/// Encodes `proof` and writes it to `path`.
///
/// The proof is fully encoded before the file is touched, so an
/// unencodable proof never leaves a partial file behind.
///
/// # Errors
///
/// [`ProofError::FileExists`] if the file exists and `overwrite` is off,
/// [`ProofError::Timestamp`] if the proof cannot be encoded.
pub fn write_proof_file<P: AsRef<Path>>(
    path: P,
    proof: &DetachedTimestampFile,
    options: &WriteOptions,
) -> Result<(), ProofError> {
    let path = path.as_ref();
    let bytes = proof.to_bytes()?;

    let mut open = OpenOptions::new();
    open.write(true);
    if options.overwrite {
        open.create(true).truncate(true);
    } else {
        open.create_new(true);
    }
    let mut file = match open.open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(ProofError::FileExists(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    file.write_all(&bytes)?;
    file.flush()?;
    if options.sync {
        file.sync_all()?;
    }
    debug!(path = %path.display(), len = bytes.len(), "wrote proof file");
    Ok(())
}
