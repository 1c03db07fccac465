//! The recursive proof tree.
//!
//! A [`Timestamp`] pairs a message with the attestations that vouch for it
//! and with operation edges leading to derived messages. Each child is owned
//! by exactly one edge; there is no sharing between subtrees.
//!
//! Wire grammar for a node's children, in canonical order:
//!
//! ```text
//! children := (0xff child)* child
//! child    := 0x00 attestation | op children
//! ```
//!
//! A child's message is never transmitted; the reader recomputes it by
//! applying the edge's operation to the parent message.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use tracing::{debug, trace};

use crate::attestation::Attestation;
use crate::errors::{DecodeError, TimestampError};
use crate::op::{Op, MAX_MSG_LENGTH};
use crate::ser::{Deserializer, Serializer};

/// Marker introducing a sibling that is not the last one.
pub const CONTINUATION_MARKER: u8 = 0xff;
/// Marker introducing an attestation child.
pub const ATTESTATION_MARKER: u8 = 0x00;
/// Deepest operation chain accepted when decoding.
pub const MAX_RECURSION_DEPTH: usize = 256;

/// A message together with its proof paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    msg: Vec<u8>,
    ops: BTreeMap<Op, Timestamp>,
    attestations: BTreeSet<Attestation>,
}

impl Timestamp {
    /// Creates a node with no operations and no attestations.
    pub fn new(msg: impl Into<Vec<u8>>) -> Self {
        Self {
            msg: msg.into(),
            ops: BTreeMap::new(),
            attestations: BTreeSet::new(),
        }
    }

    /// The message this node timestamps.
    pub fn msg(&self) -> &[u8] {
        &self.msg
    }

    /// Operation edges, in canonical order.
    pub fn ops(&self) -> &BTreeMap<Op, Timestamp> {
        &self.ops
    }

    /// Attestations on this node, in canonical order.
    pub fn attestations(&self) -> &BTreeSet<Attestation> {
        &self.attestations
    }

    /// Returns `true` if the node asserts nothing.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty() && self.attestations.is_empty()
    }

    /// Child reached through `op`, if present.
    pub fn get_op(&self, op: &Op) -> Option<&Timestamp> {
        self.ops.get(op)
    }

    /// Mutable child reached through `op`, if present.
    pub fn get_op_mut(&mut self, op: &Op) -> Option<&mut Timestamp> {
        self.ops.get_mut(op)
    }

    /// Adds an operation edge and returns its child.
    ///
    /// If the edge already exists the existing child is returned untouched.
    pub fn add_op(&mut self, op: Op) -> &mut Timestamp {
        let msg = &self.msg;
        self.ops
            .entry(op)
            .or_insert_with_key(|op| Timestamp::new(op.apply(msg)))
    }

    /// Replaces the child reached through `op` with `stamp`.
    ///
    /// Returns the subtree that was previously attached, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::MessageMismatch`] if `stamp.msg()` is not
    /// `op.apply(self.msg())`; the tree is left unchanged.
    pub fn set_op_result(
        &mut self,
        op: Op,
        stamp: Timestamp,
    ) -> Result<Option<Timestamp>, TimestampError> {
        let expected = op.apply(&self.msg);
        if expected != stamp.msg {
            return Err(TimestampError::MessageMismatch {
                op: op.to_string(),
                parent: hex::encode(&self.msg),
                expected: hex::encode(expected),
                actual: hex::encode(&stamp.msg),
            });
        }
        Ok(self.ops.insert(op, stamp))
    }

    /// Adds an attestation. Returns `false` if it was already present.
    pub fn add_attestation(&mut self, attestation: Attestation) -> bool {
        self.attestations.insert(attestation)
    }

    /// Merges `other` into this node.
    ///
    /// Attestations are unioned. Edges only present in `other` are adopted
    /// with their whole subtree; edges present in both are merged
    /// recursively.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::MergeMismatch`] if the messages differ.
    pub fn merge(&mut self, other: Timestamp) -> Result<(), TimestampError> {
        if self.msg != other.msg {
            return Err(TimestampError::MergeMismatch {
                ours: hex::encode(&self.msg),
                theirs: hex::encode(&other.msg),
            });
        }
        debug!(msg = %hex::encode(&self.msg), "merging timestamp");
        self.merge_same_msg(other);
        Ok(())
    }

    // Children of equal parents have equal messages, so only the root needs
    // the check.
    fn merge_same_msg(&mut self, other: Timestamp) {
        self.attestations.extend(other.attestations);
        for (op, stamp) in other.ops {
            match self.ops.entry(op) {
                Entry::Vacant(entry) => {
                    entry.insert(stamp);
                }
                Entry::Occupied(mut entry) => entry.get_mut().merge_same_msg(stamp),
            }
        }
    }

    /// Checks that every node below this one can be encoded, and that the
    /// encoding decodes back to this tree.
    ///
    /// # Errors
    ///
    /// [`TimestampError::EmptyTimestamp`] for a node that asserts nothing,
    /// [`TimestampError::InvalidOperation`] for an edge whose argument is out
    /// of bounds, [`TimestampError::InvalidAttestation`] for an unchecked
    /// pending URI, and [`TimestampError::LimitExceeded`] for messages longer
    /// than [`MAX_MSG_LENGTH`] on either side of an edge or chains deeper
    /// than [`MAX_RECURSION_DEPTH`].
    pub fn validate(&self) -> Result<(), TimestampError> {
        self.validate_at_depth(0)
    }

    fn validate_at_depth(&self, depth: usize) -> Result<(), TimestampError> {
        if depth > MAX_RECURSION_DEPTH {
            return Err(TimestampError::LimitExceeded(format!(
                "operation chain deeper than {MAX_RECURSION_DEPTH}"
            )));
        }
        if self.is_empty() {
            return Err(TimestampError::EmptyTimestamp {
                msg: hex::encode(&self.msg),
            });
        }
        for attestation in &self.attestations {
            attestation.validate()?;
        }
        if !self.ops.is_empty() && self.msg.len() > MAX_MSG_LENGTH {
            return Err(TimestampError::LimitExceeded(format!(
                "message of {} bytes is too long to transform",
                self.msg.len()
            )));
        }
        for (op, stamp) in &self.ops {
            op.validate()?;
            if stamp.msg.len() > MAX_MSG_LENGTH {
                return Err(TimestampError::LimitExceeded(format!(
                    "{op} produces {} bytes",
                    stamp.msg.len()
                )));
            }
            stamp.validate_at_depth(depth + 1)?;
        }
        Ok(())
    }

    /// Writes this node's children.
    ///
    /// The whole tree is validated first, so on error nothing has been
    /// written to `ser`.
    ///
    /// # Errors
    ///
    /// See [`validate`](Self::validate).
    pub fn serialize(&self, ser: &mut Serializer) -> Result<(), TimestampError> {
        self.validate()?;
        self.write_children(ser);
        Ok(())
    }

    fn write_children(&self, ser: &mut Serializer) {
        // 0x00 sorts before every opcode, so attestations-then-ops is the
        // byte order of the encoded children.
        let mut remaining = self.attestations.len() + self.ops.len();
        for attestation in &self.attestations {
            remaining -= 1;
            if remaining > 0 {
                ser.write_u8(CONTINUATION_MARKER);
            }
            ser.write_u8(ATTESTATION_MARKER);
            attestation.serialize(ser);
        }
        for (op, stamp) in &self.ops {
            remaining -= 1;
            if remaining > 0 {
                ser.write_u8(CONTINUATION_MARKER);
            }
            op.serialize(ser);
            stamp.write_children(ser);
        }
    }

    /// Encoded children of this node.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TimestampError> {
        let mut ser = Serializer::new();
        self.serialize(&mut ser)?;
        Ok(ser.into_bytes())
    }

    /// Decodes the children of a node whose message is `msg`.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] if input runs out, and
    /// [`DecodeError::Malformed`] for unknown opcodes or markers, duplicate
    /// children, oversized messages, or nesting deeper than
    /// [`MAX_RECURSION_DEPTH`].
    pub fn deserialize(
        de: &mut Deserializer<'_>,
        msg: impl Into<Vec<u8>>,
    ) -> Result<Self, DecodeError> {
        Self::deserialize_at_depth(de, msg.into(), 0)
    }

    fn deserialize_at_depth(
        de: &mut Deserializer<'_>,
        msg: Vec<u8>,
        depth: usize,
    ) -> Result<Self, DecodeError> {
        if depth > MAX_RECURSION_DEPTH {
            return Err(DecodeError::malformed(
                de.position(),
                format!("operation chain deeper than {MAX_RECURSION_DEPTH}"),
            ));
        }

        let mut stamp = Timestamp::new(msg);
        let mut marker = de.read_u8()?;
        while marker == CONTINUATION_MARKER {
            let next = de.read_u8()?;
            stamp.decode_child(de, next, depth)?;
            marker = de.read_u8()?;
        }
        stamp.decode_child(de, marker, depth)?;
        Ok(stamp)
    }

    fn decode_child(
        &mut self,
        de: &mut Deserializer<'_>,
        marker: u8,
        depth: usize,
    ) -> Result<(), DecodeError> {
        let offset = de.position() - 1;

        if marker == ATTESTATION_MARKER {
            let attestation = Attestation::deserialize(de)?;
            trace!(offset, %attestation, "decoded attestation");
            if !self.attestations.insert(attestation) {
                return Err(DecodeError::malformed(offset, "duplicate attestation"));
            }
            return Ok(());
        }

        let op = Op::deserialize_with_opcode(de, marker)?;
        if self.ops.contains_key(&op) {
            return Err(DecodeError::malformed(
                offset,
                format!("duplicate operation {op}"),
            ));
        }
        if self.msg.len() > MAX_MSG_LENGTH {
            return Err(DecodeError::malformed(
                offset,
                format!("message of {} bytes is too long to transform", self.msg.len()),
            ));
        }
        let result = op.apply(&self.msg);
        if result.len() > MAX_MSG_LENGTH {
            return Err(DecodeError::malformed(
                offset,
                format!("{op} produces {} bytes", result.len()),
            ));
        }
        trace!(offset, %op, depth, "decoded operation");
        let child = Self::deserialize_at_depth(de, result, depth + 1)?;
        self.ops.insert(op, child);
        Ok(())
    }

    /// Every node in the tree, parents before children, in canonical order.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Every `(message, attestation)` pair in the tree.
    pub fn all_attestations(&self) -> impl Iterator<Item = (&[u8], &Attestation)> + '_ {
        self.walk().flat_map(|stamp| {
            stamp
                .attestations
                .iter()
                .map(move |attestation| (stamp.msg(), attestation))
        })
    }

    /// Indented, human-readable rendering of the tree.
    ///
    /// Attestations print as `verify ...`. A single edge continues at the
    /// same indent; forks print each branch as ` -> op` and indent its
    /// subtree by four spaces.
    pub fn str_tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, indent: usize) {
        let pad = " ".repeat(indent);
        for attestation in &self.attestations {
            let _ = writeln!(out, "{pad}verify {attestation}");
        }
        if self.ops.len() > 1 {
            for (op, stamp) in &self.ops {
                let _ = writeln!(out, "{pad} -> {op}");
                stamp.write_tree(out, indent + 4);
            }
        } else if let Some((op, stamp)) = self.ops.iter().next() {
            let _ = writeln!(out, "{pad}{op}");
            stamp.write_tree(out, indent);
        }
    }
}

/// Pre-order iterator over a timestamp tree. See [`Timestamp::walk`].
#[derive(Debug)]
pub struct Walk<'a> {
    stack: Vec<&'a Timestamp>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Timestamp;

    fn next(&mut self) -> Option<Self::Item> {
        let stamp = self.stack.pop()?;
        self.stack.extend(stamp.ops.values().rev());
        Some(stamp)
    }
}
