use tempora_core::op::DIGEST_LENGTHS;
use tempora_core::{DecodeError, Deserializer, Op, Serializer, Timestamp};
use tracing::debug;

use crate::errors::ProofError;

/// Proof file magic: format identifier with embedded non-ASCII framing.
pub const HEADER_MAGIC: &[u8] =
    b"\x00OpenTimestamps\x00\x00Proof\x00\xbf\x89\xe2\xe8\x84\xe8\x92\x94\x00";

/// A timestamp proof for a file, detached from the file itself.
///
/// Layout: magic, length-prefixed file digest, file hash opcode, then the
/// root timestamp's children. The root message is always the digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedTimestampFile {
    file_hash_op: Op,
    timestamp: Timestamp,
}

impl DetachedTimestampFile {
    /// Wraps an existing timestamp whose message is a digest made by
    /// `file_hash_op`.
    ///
    /// # Errors
    ///
    /// [`ProofError::Timestamp`] if `file_hash_op` is not a digest operation,
    /// [`ProofError::DigestLengthMismatch`] if the root message has the wrong
    /// length.
    pub fn new(file_hash_op: Op, timestamp: Timestamp) -> Result<Self, ProofError> {
        check_digest(&file_hash_op, timestamp.msg())?;
        Ok(Self {
            file_hash_op,
            timestamp,
        })
    }

    /// Hashes `reader` with `file_hash_op` and starts an empty proof over
    /// the digest.
    pub fn from_reader<R: std::io::Read>(
        file_hash_op: Op,
        reader: &mut R,
    ) -> Result<Self, ProofError> {
        let digest = file_hash_op.hash_reader(reader)?;
        debug!(op = %file_hash_op, digest = %hex::encode(&digest), "hashed file");
        Ok(Self {
            file_hash_op,
            timestamp: Timestamp::new(digest),
        })
    }

    /// Operation used to hash the file.
    pub fn file_hash_op(&self) -> &Op {
        &self.file_hash_op
    }

    /// Digest of the file (the root message).
    pub fn file_digest(&self) -> &[u8] {
        self.timestamp.msg()
    }

    /// Root of the proof tree.
    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    /// Mutable root of the proof tree.
    ///
    /// The root message cannot change through this reference; replacing the
    /// whole node is caught again by [`serialize`](Self::serialize).
    pub fn timestamp_mut(&mut self) -> &mut Timestamp {
        &mut self.timestamp
    }

    /// Consumes the proof, returning its root.
    pub fn into_timestamp(self) -> Timestamp {
        self.timestamp
    }

    /// Merges another proof of the same file into this one.
    pub fn merge(&mut self, other: DetachedTimestampFile) -> Result<(), ProofError> {
        if self.file_hash_op != other.file_hash_op {
            return Err(ProofError::HashOpMismatch {
                ours: self.file_hash_op.to_string(),
                theirs: other.file_hash_op.to_string(),
            });
        }
        self.timestamp.merge(other.timestamp)?;
        Ok(())
    }

    /// Writes the full proof file.
    ///
    /// On error nothing has been written to `ser`.
    pub fn serialize(&self, ser: &mut Serializer) -> Result<(), ProofError> {
        check_digest(&self.file_hash_op, self.timestamp.msg())?;
        let tree = self.timestamp.to_bytes()?;
        ser.write_bytes(HEADER_MAGIC);
        ser.write_varbytes(self.timestamp.msg());
        ser.write_u8(self.file_hash_op.opcode());
        ser.write_bytes(&tree);
        Ok(())
    }

    /// Encoded proof file.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProofError> {
        let mut ser = Serializer::new();
        self.serialize(&mut ser)?;
        Ok(ser.into_bytes())
    }

    /// Reads a proof file from the cursor, leaving any trailing bytes.
    ///
    /// Checks run in wire order: magic, digest length against the lengths
    /// any digest operation produces, opcode, digest length against that
    /// operation, then the tree.
    pub fn deserialize(de: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        de.expect_magic(HEADER_MAGIC)?;

        let len_offset = de.position();
        let len = de.read_varuint()?;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| DIGEST_LENGTHS.contains(len))
            .ok_or_else(|| DecodeError::Malformed {
                offset: len_offset,
                reason: format!("invalid file digest length {len}"),
            })?;
        let digest = de.read_bytes(len)?;

        let op_offset = de.position();
        let opcode = de.read_u8()?;
        let file_hash_op = Op::deserialize_with_opcode(de, opcode)?;
        match file_hash_op.digest_len() {
            Some(expected) if expected == digest.len() => {}
            Some(expected) => {
                return Err(DecodeError::Malformed {
                    offset: op_offset,
                    reason: format!(
                        "{file_hash_op} produces {expected}-byte digests, found {}",
                        digest.len()
                    ),
                })
            }
            None => {
                return Err(DecodeError::Malformed {
                    offset: op_offset,
                    reason: format!("{file_hash_op} cannot hash a file"),
                })
            }
        }

        let timestamp = Timestamp::deserialize(de, digest)?;
        debug!(
            op = %file_hash_op,
            digest = %hex::encode(digest),
            nodes = timestamp.walk().count(),
            "decoded proof"
        );
        Ok(Self {
            file_hash_op,
            timestamp,
        })
    }

    /// Decodes a complete proof file; trailing bytes are malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut de = Deserializer::new(bytes);
        let proof = Self::deserialize(&mut de)?;
        de.expect_eof()?;
        Ok(proof)
    }
}

fn check_digest(op: &Op, digest: &[u8]) -> Result<(), ProofError> {
    let expected = op
        .digest_len()
        .ok_or_else(|| tempora_core::TimestampError::NotADigestOp(op.to_string()))?;
    if expected != digest.len() {
        return Err(ProofError::DigestLengthMismatch {
            op: op.to_string(),
            expected,
            actual: digest.len(),
        });
    }
    Ok(())
}
