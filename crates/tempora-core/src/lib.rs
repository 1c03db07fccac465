//! Proof data model for timestamping arbitrary data.
//!
//! A timestamp proof is a tree: the root holds a message (typically a file
//! digest), operation edges derive new messages from it, and attestations
//! anchor messages to something external such as a calendar server or a
//! block header. This crate provides:
//! - [`Op`]: deterministic byte transforms with fixed opcodes
//! - [`Attestation`]: pending, block header, and opaque attestations
//! - [`Timestamp`]: the recursive tree with insert and merge semantics
//! - [`Serializer`] / [`Deserializer`]: the bounds-checked wire codec
//!
//! ## Quick Start
//!
//! ```rust
//! use tempora_core::{Attestation, Deserializer, Op, Timestamp};
//!
//! let digest = Op::Sha256.apply(b"hello");
//! let mut stamp = Timestamp::new(digest.clone());
//! stamp
//!     .add_op(Op::Append(b"nonce".to_vec()))
//!     .add_op(Op::Sha256)
//!     .add_attestation(Attestation::pending("https://calendar.example.org")?);
//!
//! let bytes = stamp.to_bytes()?;
//! let decoded = Timestamp::deserialize(&mut Deserializer::new(&bytes), digest)?;
//! assert_eq!(decoded, stamp);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Everything here is synchronous and operates on owned, in-memory data.
#![deny(missing_docs)]

/// Attestation variants and their wire tags.
pub mod attestation;
/// Error types for decoding and tree manipulation.
pub mod errors;
/// Operations and opcodes.
pub mod op;
/// Wire codec primitives.
pub mod ser;
/// The timestamp tree.
pub mod timestamp;

pub use attestation::{Attestation, BlockChain, UnknownAttestation};
pub use errors::{DecodeError, TimestampError};
pub use op::Op;
pub use ser::{Deserializer, Serializer};
pub use timestamp::{Timestamp, Walk};
