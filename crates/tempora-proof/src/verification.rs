//! Boundary between proof trees and whoever can check block headers.
//!
//! Walking the tree and recomputing messages happens here; deciding whether
//! a digest really sits in a given block is delegated to a
//! [`BlockHeaderVerifier`] supplied by the caller.

use std::io::Read;

use serde::Serialize;
use tempora_core::{Attestation, BlockChain, Timestamp};
use tracing::{debug, info, warn};

use crate::errors::ProofError;
use crate::file::DetachedTimestampFile;

/// Block headers commit to 32-byte merkle roots.
pub const BLOCK_HEADER_DIGEST_LENGTH: usize = 32;

/// Checks block header attestations against a chain.
pub trait BlockHeaderVerifier {
    /// Confirms `digest` is the merkle root committed by block `height` of
    /// `chain`, and returns that block's time in Unix seconds.
    fn verify(&self, chain: BlockChain, digest: &[u8], height: u64) -> Result<u64, ProofError>;
}

/// What became of one attestation during verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttestationOutcome {
    /// Not yet confirmed; the calendar can be asked for an upgrade.
    Pending {
        /// Calendar URI.
        uri: String,
    },
    /// The verifier confirmed the block.
    Verified {
        /// Chain of the block.
        chain: BlockChain,
        /// Block height.
        height: u64,
        /// Block time, Unix seconds.
        time: u64,
    },
    /// The verifier rejected the attestation.
    Failed {
        /// Chain of the block.
        chain: BlockChain,
        /// Block height.
        height: u64,
        /// Why it failed.
        reason: String,
    },
    /// Attestation kind not understood here; skipped.
    Unknown {
        /// Hex tag of the attestation.
        tag: String,
    },
}

/// An attestation outcome together with the message it attests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttestationResult {
    /// Attested message, hex.
    pub msg: String,
    /// Outcome of checking it.
    #[serde(flatten)]
    pub outcome: AttestationOutcome,
}

/// Outcome of every attestation in a proof, in tree order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// One entry per attestation.
    pub results: Vec<AttestationResult>,
}

impl VerificationReport {
    /// Earliest confirmed block time, if any attestation verified.
    pub fn earliest_time(&self) -> Option<u64> {
        self.results
            .iter()
            .filter_map(|result| match result.outcome {
                AttestationOutcome::Verified { time, .. } => Some(time),
                _ => None,
            })
            .min()
    }

    /// Returns `true` if at least one block header attestation verified.
    pub fn is_verified(&self) -> bool {
        self.earliest_time().is_some()
    }

    /// Calendar URIs still pending.
    pub fn pending_uris(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(|result| match &result.outcome {
                AttestationOutcome::Pending { uri } => Some(uri.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Checks every attestation in `stamp`.
///
/// Verifier failures are recorded per attestation rather than aborting, so
/// one bad path never hides a good one.
pub fn verify_timestamp(
    stamp: &Timestamp,
    verifier: &dyn BlockHeaderVerifier,
) -> VerificationReport {
    let mut report = VerificationReport::default();
    for (msg, attestation) in stamp.all_attestations() {
        let outcome = match attestation {
            Attestation::Pending { uri } => {
                debug!(%uri, "attestation pending");
                AttestationOutcome::Pending { uri: uri.clone() }
            }
            Attestation::BlockHeader { chain, height } => {
                check_block_header(*chain, msg, *height, verifier)
            }
            Attestation::Unknown(unknown) => {
                let tag = hex::encode(unknown.tag());
                debug!(%tag, "skipping unknown attestation");
                AttestationOutcome::Unknown { tag }
            }
        };
        report.results.push(AttestationResult {
            msg: hex::encode(msg),
            outcome,
        });
    }
    report
}

fn check_block_header(
    chain: BlockChain,
    msg: &[u8],
    height: u64,
    verifier: &dyn BlockHeaderVerifier,
) -> AttestationOutcome {
    if msg.len() != BLOCK_HEADER_DIGEST_LENGTH {
        warn!(?chain, height, len = msg.len(), "attested digest has wrong length");
        return AttestationOutcome::Failed {
            chain,
            height,
            reason: format!(
                "expected {BLOCK_HEADER_DIGEST_LENGTH}-byte digest, found {} bytes",
                msg.len()
            ),
        };
    }
    match verifier.verify(chain, msg, height) {
        Ok(time) => {
            info!(?chain, height, time, "block header attestation verified");
            AttestationOutcome::Verified {
                chain,
                height,
                time,
            }
        }
        Err(err) => {
            warn!(?chain, height, error = %err, "block header attestation failed");
            AttestationOutcome::Failed {
                chain,
                height,
                reason: err.to_string(),
            }
        }
    }
}

/// Re-hashes `reader` and verifies `proof` against it.
///
/// # Errors
///
/// [`ProofError::Verification`] if the data does not hash to the proof's
/// file digest.
pub fn verify_file<R: Read>(
    proof: &DetachedTimestampFile,
    reader: &mut R,
    verifier: &dyn BlockHeaderVerifier,
) -> Result<VerificationReport, ProofError> {
    let digest = proof.file_hash_op().hash_reader(reader)?;
    if digest != proof.file_digest() {
        return Err(ProofError::Verification(format!(
            "file digest {} does not match proof digest {}",
            hex::encode(&digest),
            hex::encode(proof.file_digest())
        )));
    }
    Ok(verify_timestamp(proof.timestamp(), verifier))
}
