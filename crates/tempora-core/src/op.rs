//! Deterministic byte transforms that link a message to the next one.

use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Read};

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::errors::{DecodeError, TimestampError};
use crate::ser::{Deserializer, Serializer};

/// Opcode of the SHA-1 digest operation.
pub const OPCODE_SHA1: u8 = 0x02;
/// Opcode of the RIPEMD-160 digest operation.
pub const OPCODE_RIPEMD160: u8 = 0x03;
/// Opcode of the SHA-256 digest operation.
pub const OPCODE_SHA256: u8 = 0x08;
/// Opcode of the Keccak-256 digest operation.
pub const OPCODE_KECCAK256: u8 = 0x67;
/// Opcode of the append operation.
pub const OPCODE_APPEND: u8 = 0xf0;
/// Opcode of the prepend operation.
pub const OPCODE_PREPEND: u8 = 0xf1;
/// Opcode of the reverse operation.
pub const OPCODE_REVERSE: u8 = 0xf2;
/// Opcode of the hexlify operation.
pub const OPCODE_HEXLIFY: u8 = 0xf3;

/// Largest argument accepted by append/prepend.
pub const MAX_OP_ARG_LENGTH: usize = 4096;

/// Largest message an operation is applied to while decoding, and the
/// largest result it may produce.
pub const MAX_MSG_LENGTH: usize = 4096;

/// Output lengths of every digest operation.
pub const DIGEST_LENGTHS: &[usize] = &[20, 32];

/// A single transform step.
///
/// Operations compare by opcode and argument and order by their encoded
/// bytes, which gives every node's children one canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    /// `msg || arg`.
    Append(Vec<u8>),
    /// `arg || msg`.
    Prepend(Vec<u8>),
    /// Byte order reversed.
    Reverse,
    /// Lowercase hexadecimal ASCII of the message.
    Hexlify,
    /// SHA-1 digest (20 bytes).
    Sha1,
    /// RIPEMD-160 digest (20 bytes).
    Ripemd160,
    /// SHA-256 digest (32 bytes).
    Sha256,
    /// Keccak-256 digest (32 bytes).
    Keccak256,
}

impl Op {
    /// Returns the protocol opcode.
    pub fn opcode(&self) -> u8 {
        match self {
            Op::Append(_) => OPCODE_APPEND,
            Op::Prepend(_) => OPCODE_PREPEND,
            Op::Reverse => OPCODE_REVERSE,
            Op::Hexlify => OPCODE_HEXLIFY,
            Op::Sha1 => OPCODE_SHA1,
            Op::Ripemd160 => OPCODE_RIPEMD160,
            Op::Sha256 => OPCODE_SHA256,
            Op::Keccak256 => OPCODE_KECCAK256,
        }
    }

    /// Returns the argument of a binary operation.
    pub fn arg(&self) -> Option<&[u8]> {
        match self {
            Op::Append(arg) | Op::Prepend(arg) => Some(arg),
            _ => None,
        }
    }

    /// Output length for digest operations, `None` for everything else.
    pub fn digest_len(&self) -> Option<usize> {
        match self {
            Op::Sha1 | Op::Ripemd160 => Some(20),
            Op::Sha256 | Op::Keccak256 => Some(32),
            _ => None,
        }
    }

    /// Returns `true` for the fixed-length digest operations.
    pub fn is_digest(&self) -> bool {
        self.digest_len().is_some()
    }

    /// Applies the operation to `msg`.
    pub fn apply(&self, msg: &[u8]) -> Vec<u8> {
        match self {
            Op::Append(arg) => [msg, arg.as_slice()].concat(),
            Op::Prepend(arg) => [arg.as_slice(), msg].concat(),
            Op::Reverse => msg.iter().rev().copied().collect(),
            Op::Hexlify => hex::encode(msg).into_bytes(),
            Op::Sha1 => Sha1::digest(msg).to_vec(),
            Op::Ripemd160 => Ripemd160::digest(msg).to_vec(),
            Op::Sha256 => Sha256::digest(msg).to_vec(),
            Op::Keccak256 => Keccak256::digest(msg).to_vec(),
        }
    }

    /// Streams `reader` through a digest operation.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::NotADigestOp`] for non-digest operations and
    /// [`TimestampError::Io`] if reading fails.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> Result<Vec<u8>, TimestampError> {
        match self {
            Op::Sha1 => stream::<Sha1, R>(reader),
            Op::Ripemd160 => stream::<Ripemd160, R>(reader),
            Op::Sha256 => stream::<Sha256, R>(reader),
            Op::Keccak256 => stream::<Keccak256, R>(reader),
            _ => Err(TimestampError::NotADigestOp(self.to_string())),
        }
    }

    /// Checks that the operation can be encoded and decoded again.
    pub fn validate(&self) -> Result<(), TimestampError> {
        if let Some(arg) = self.arg() {
            if arg.is_empty() || arg.len() > MAX_OP_ARG_LENGTH {
                return Err(TimestampError::InvalidOperation(format!(
                    "{} argument length {} outside 1..={}",
                    self.name(),
                    arg.len(),
                    MAX_OP_ARG_LENGTH
                )));
            }
        }
        Ok(())
    }

    /// Writes the opcode and, for binary operations, the argument.
    pub fn serialize(&self, ser: &mut Serializer) {
        ser.write_u8(self.opcode());
        if let Some(arg) = self.arg() {
            ser.write_varbytes(arg);
        }
    }

    /// Encoded form of the operation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ser = Serializer::new();
        self.serialize(&mut ser);
        ser.into_bytes()
    }

    /// Reads an opcode and the operation it introduces.
    pub fn deserialize(de: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        let opcode = de.read_u8()?;
        Self::deserialize_with_opcode(de, opcode)
    }

    /// Decodes the remainder of an operation whose opcode was already read.
    pub fn deserialize_with_opcode(
        de: &mut Deserializer<'_>,
        opcode: u8,
    ) -> Result<Self, DecodeError> {
        let op = match opcode {
            OPCODE_SHA1 => Op::Sha1,
            OPCODE_RIPEMD160 => Op::Ripemd160,
            OPCODE_SHA256 => Op::Sha256,
            OPCODE_KECCAK256 => Op::Keccak256,
            OPCODE_REVERSE => Op::Reverse,
            OPCODE_HEXLIFY => Op::Hexlify,
            OPCODE_APPEND => Op::Append(de.read_varbytes(1, MAX_OP_ARG_LENGTH)?.to_vec()),
            OPCODE_PREPEND => Op::Prepend(de.read_varbytes(1, MAX_OP_ARG_LENGTH)?.to_vec()),
            other => {
                return Err(DecodeError::malformed(
                    de.position().saturating_sub(1),
                    format!("unknown operation opcode 0x{other:02x}"),
                ))
            }
        };
        Ok(op)
    }

    fn name(&self) -> &'static str {
        match self {
            Op::Append(_) => "append",
            Op::Prepend(_) => "prepend",
            Op::Reverse => "reverse",
            Op::Hexlify => "hexlify",
            Op::Sha1 => "sha1",
            Op::Ripemd160 => "ripemd160",
            Op::Sha256 => "sha256",
            Op::Keccak256 => "keccak256",
        }
    }
}

fn stream<D: Digest + io::Write, R: Read>(reader: &mut R) -> Result<Vec<u8>, TimestampError> {
    let mut hasher = D::new();
    io::copy(reader, &mut hasher)?;
    Ok(hasher.finalize().to_vec())
}

impl Ord for Op {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl PartialOrd for Op {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arg() {
            Some(arg) => write!(f, "{} {}", self.name(), hex::encode(arg)),
            None => f.write_str(self.name()),
        }
    }
}
