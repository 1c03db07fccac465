//! Proof anchors attached to timestamp nodes.

use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{DecodeError, TimestampError};
use crate::ser::{Deserializer, Serializer};

/// Size of every attestation tag.
pub const TAG_SIZE: usize = 8;

/// Tag of a pending (calendar-submitted) attestation.
pub const PENDING_TAG: [u8; TAG_SIZE] = [0x83, 0xdf, 0xe3, 0x0d, 0x2e, 0xf9, 0x0c, 0x8e];
/// Tag of a Bitcoin block header attestation.
pub const BITCOIN_TAG: [u8; TAG_SIZE] = [0x05, 0x88, 0x96, 0x0d, 0x73, 0xd7, 0x19, 0x01];
/// Tag of a Litecoin block header attestation.
pub const LITECOIN_TAG: [u8; TAG_SIZE] = [0x06, 0x86, 0x9a, 0x0d, 0x73, 0xd7, 0x1b, 0x45];

/// Largest attestation payload accepted when decoding.
pub const MAX_PAYLOAD_LENGTH: usize = 8192;
/// Largest pending URI accepted.
pub const MAX_URI_LENGTH: usize = 1000;

/// Chains whose block headers can anchor a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockChain {
    /// Bitcoin (merkle root of the block header).
    Bitcoin,
    /// Litecoin (merkle root of the block header).
    Litecoin,
}

impl BlockChain {
    /// Wire tag of this chain's block header attestation.
    pub fn tag(self) -> [u8; TAG_SIZE] {
        match self {
            BlockChain::Bitcoin => BITCOIN_TAG,
            BlockChain::Litecoin => LITECOIN_TAG,
        }
    }

    fn from_tag(tag: &[u8; TAG_SIZE]) -> Option<Self> {
        match *tag {
            BITCOIN_TAG => Some(BlockChain::Bitcoin),
            LITECOIN_TAG => Some(BlockChain::Litecoin),
            _ => None,
        }
    }
}

/// Assertion that a message existed by some point.
///
/// `Unknown` preserves attestation kinds this crate does not interpret, so a
/// decoded proof re-encodes byte-for-byte. Its tag can never be one that
/// another variant owns; see [`UnknownAttestation::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attestation {
    /// Submitted to a remote calendar, not yet confirmed.
    Pending {
        /// Calendar URI to poll for an upgrade.
        uri: String,
    },
    /// Message is committed in the block at `height`.
    BlockHeader {
        /// Chain holding the block.
        chain: BlockChain,
        /// Block height.
        height: u64,
    },
    /// Opaque attestation kept verbatim.
    Unknown(UnknownAttestation),
}

/// Tag and raw payload of an attestation kind this crate does not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownAttestation {
    tag: [u8; TAG_SIZE],
    payload: Vec<u8>,
}

impl UnknownAttestation {
    /// Wraps an opaque attestation.
    ///
    /// # Errors
    ///
    /// [`TimestampError::InvalidAttestation`] if `tag` belongs to a pending
    /// or block header attestation, or the payload exceeds
    /// [`MAX_PAYLOAD_LENGTH`].
    pub fn new(tag: [u8; TAG_SIZE], payload: Vec<u8>) -> Result<Self, TimestampError> {
        if tag == PENDING_TAG || BlockChain::from_tag(&tag).is_some() {
            return Err(TimestampError::InvalidAttestation(format!(
                "tag {} is not an unknown attestation tag",
                hex::encode(tag)
            )));
        }
        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(TimestampError::InvalidAttestation(format!(
                "payload length {} exceeds maximum {MAX_PAYLOAD_LENGTH}",
                payload.len()
            )));
        }
        Ok(Self { tag, payload })
    }

    /// Wire tag.
    pub fn tag(&self) -> [u8; TAG_SIZE] {
        self.tag
    }

    /// Raw payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

fn uri_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._/:\-]*$").expect("invalid regex"))
}

fn check_uri(uri: &str) -> Result<(), String> {
    if uri.len() > MAX_URI_LENGTH {
        return Err(format!(
            "URI length {} exceeds maximum {}",
            uri.len(),
            MAX_URI_LENGTH
        ));
    }
    if !uri_pattern().is_match(uri) {
        return Err(format!("URI {uri:?} contains disallowed characters"));
    }
    Ok(())
}

impl Attestation {
    /// Constructs a validated pending attestation.
    pub fn pending(uri: impl Into<String>) -> Result<Self, TimestampError> {
        let uri = uri.into();
        check_uri(&uri).map_err(TimestampError::InvalidAttestation)?;
        Ok(Attestation::Pending { uri })
    }

    /// Constructs an opaque attestation. See [`UnknownAttestation::new`].
    pub fn unknown(tag: [u8; TAG_SIZE], payload: Vec<u8>) -> Result<Self, TimestampError> {
        UnknownAttestation::new(tag, payload).map(Attestation::Unknown)
    }

    /// Constructs a Bitcoin block header attestation.
    pub fn bitcoin(height: u64) -> Self {
        Attestation::BlockHeader {
            chain: BlockChain::Bitcoin,
            height,
        }
    }

    /// Constructs a Litecoin block header attestation.
    pub fn litecoin(height: u64) -> Self {
        Attestation::BlockHeader {
            chain: BlockChain::Litecoin,
            height,
        }
    }

    /// Returns the 8-byte wire tag.
    pub fn tag(&self) -> [u8; TAG_SIZE] {
        match self {
            Attestation::Pending { .. } => PENDING_TAG,
            Attestation::BlockHeader { chain, .. } => chain.tag(),
            Attestation::Unknown(unknown) => unknown.tag,
        }
    }

    /// Returns the payload bytes as they appear on the wire (without length).
    pub fn serialize_payload(&self) -> Vec<u8> {
        match self {
            Attestation::Pending { uri } => {
                let mut ser = Serializer::new();
                ser.write_varbytes(uri.as_bytes());
                ser.into_bytes()
            }
            Attestation::BlockHeader { height, .. } => {
                let mut ser = Serializer::new();
                ser.write_varuint(*height);
                ser.into_bytes()
            }
            Attestation::Unknown(unknown) => unknown.payload.clone(),
        }
    }

    /// Writes the tag followed by the length-prefixed payload.
    pub fn serialize(&self, ser: &mut Serializer) {
        ser.write_bytes(&self.tag());
        ser.write_varbytes(&self.serialize_payload());
    }

    /// Encoded form of the attestation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ser = Serializer::new();
        self.serialize(&mut ser);
        ser.into_bytes()
    }

    /// Reads a tag and its length-prefixed payload.
    ///
    /// The payload of a recognised tag must be consumed exactly; leftover
    /// bytes inside it are malformed.
    pub fn deserialize(de: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        let tag: [u8; TAG_SIZE] = de.read_array()?;
        let payload = de.read_varbytes(0, MAX_PAYLOAD_LENGTH)?;
        let base = de.position() - payload.len();

        if tag == PENDING_TAG {
            let mut inner = Deserializer::new(payload);
            let raw = inner
                .read_varbytes(0, MAX_URI_LENGTH)
                .map_err(|e| e.within_payload(base))?;
            inner.expect_eof().map_err(|e| e.within_payload(base))?;
            let uri = std::str::from_utf8(raw)
                .map_err(|e| DecodeError::malformed(base, format!("pending URI: {e}")))?;
            check_uri(uri).map_err(|reason| DecodeError::malformed(base, reason))?;
            return Ok(Attestation::Pending {
                uri: uri.to_owned(),
            });
        }

        if let Some(chain) = BlockChain::from_tag(&tag) {
            let mut inner = Deserializer::new(payload);
            let height = inner.read_varuint().map_err(|e| e.within_payload(base))?;
            inner.expect_eof().map_err(|e| e.within_payload(base))?;
            return Ok(Attestation::BlockHeader { chain, height });
        }

        Ok(Attestation::Unknown(UnknownAttestation {
            tag,
            payload: payload.to_vec(),
        }))
    }

    /// Checks the limits decoding enforces, so that anything that passes
    /// encodes to bytes that decode back to the same value.
    ///
    /// `Pending` can be built without going through [`Attestation::pending`];
    /// this catches URIs that skipped validation.
    pub fn validate(&self) -> Result<(), TimestampError> {
        match self {
            Attestation::Pending { uri } => {
                check_uri(uri).map_err(TimestampError::InvalidAttestation)
            }
            Attestation::BlockHeader { .. } | Attestation::Unknown(_) => Ok(()),
        }
    }

    /// Block height for block header attestations.
    pub fn height(&self) -> Option<u64> {
        match self {
            Attestation::BlockHeader { height, .. } => Some(*height),
            _ => None,
        }
    }
}

impl Ord for Attestation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

impl PartialOrd for Attestation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Attestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attestation::Pending { uri } => write!(f, "PendingAttestation('{uri}')"),
            Attestation::BlockHeader {
                chain: BlockChain::Bitcoin,
                height,
            } => write!(f, "BitcoinBlockHeaderAttestation({height})"),
            Attestation::BlockHeader {
                chain: BlockChain::Litecoin,
                height,
            } => write!(f, "LitecoinBlockHeaderAttestation({height})"),
            Attestation::Unknown(unknown) => write!(
                f,
                "UnknownAttestation({}, {})",
                hex::encode(unknown.tag),
                hex::encode(&unknown.payload)
            ),
        }
    }
}
