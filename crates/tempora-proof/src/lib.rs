//! Detached proof files for timestamped data.
//!
//! This crate provides:
//! - [`DetachedTimestampFile`]: magic-prefixed envelope binding a file
//!   digest, its hash operation, and the proof tree
//! - Reader/writer helpers for proof files on disk
//! - [`Chain`]: configured chain names and their node config locations
//! - [`verify_timestamp`]: walks a proof and hands block header
//!   attestations to a caller-supplied [`BlockHeaderVerifier`]
//!
//! ## Quick Start
//!
//! ```rust
//! use tempora_core::{Attestation, Op};
//! use tempora_proof::DetachedTimestampFile;
//!
//! let mut proof = DetachedTimestampFile::from_reader(Op::Sha256, &mut &b"hello"[..])?;
//! proof
//!     .timestamp_mut()
//!     .add_attestation(Attestation::pending("https://calendar.example.org")?);
//!
//! let bytes = proof.to_bytes()?;
//! assert_eq!(DetachedTimestampFile::from_bytes(&bytes)?, proof);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Network access (calendar servers, block explorers, node RPC) is left to
//! the caller.

#![deny(missing_docs)]

/// Chain names and node configuration paths.
pub mod chain;
/// Error types for proof operations.
pub mod errors;
/// Proof file envelope.
pub mod file;
/// Proof file reading.
pub mod reader;
/// Attestation verification boundary.
pub mod verification;
/// Proof file writing.
pub mod writer;

pub use chain::Chain;
pub use errors::ProofError;
pub use file::{DetachedTimestampFile, HEADER_MAGIC};
pub use reader::{read_proof_file, stamp_file};
pub use verification::{
    verify_file, verify_timestamp, AttestationOutcome, AttestationResult, BlockHeaderVerifier,
    VerificationReport,
};
pub use writer::{write_proof_file, WriteOptions};
