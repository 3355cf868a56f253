use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hasher::{
    HashFn, Hasher, HasherError, INNER_NODE_PREFIX, LEAF_NODE_PREFIX, MAX_DIGEST_LEN,
    MIN_DIGEST_LEN,
};
use crate::logger::trace;

/// Hard ceiling on the size of a raw proof, in bytes.
pub const MAX_PROOF_BYTES: usize = 1_048_576;

/// The only supported object-proof version.
pub const PROOF_OBJECT_VERSION: u8 = 1;

/// Errors from decoding or verifying a proof.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProofError {
    /// The raw proof exceeds [`MAX_PROOF_BYTES`].
    #[error("proof is {0} bytes, over the {MAX_PROOF_BYTES} byte limit")]
    TooLarge(usize),
    /// The hex form is not a valid even-length hex string.
    #[error("proof is not a valid hex string")]
    InvalidHex,
    /// The object form carries an unsupported version.
    #[error("unsupported proof version {0}, expected {PROOF_OBJECT_VERSION}")]
    UnsupportedVersion(u8),
    /// An object-form direction byte is neither 0 nor 1.
    #[error("proof direction must be 0 or 1, got {0}")]
    InvalidDirection(u8),
    /// The object form mixes sibling hashes of different lengths.
    #[error("all object proof hashes must be the same length")]
    MixedHashLengths,
    /// An object-form sibling hash is outside the accepted digest range.
    #[error("proof hash is {0} bytes, expected {MIN_DIGEST_LEN} to {MAX_DIGEST_LEN}")]
    HashLengthOutOfRange(usize),
    /// The raw proof does not divide into whole sibling steps.
    #[error("proof length {len} is not a multiple of the {step} byte step size")]
    BadStepLength {
        /// Total proof length in bytes.
        len: usize,
        /// Step size, one direction byte plus the digest length.
        step: usize,
    },
    /// No hash function was supplied and the proof does not name one.
    #[error("no hash function supplied and the proof does not name one")]
    MissingHashFn,
    /// The supplied hash function failed to resolve.
    #[error(transparent)]
    Hasher(#[from] HasherError),
}

/// A raw inclusion proof: sibling steps in leaf-to-root order.
///
/// Each step is one direction byte (1 if the accumulated value is the right
/// operand, 0 otherwise) followed by the sibling hash. A proof is standalone:
/// once extracted it verifies without the tree or the original data.
#[derive(Clone, PartialEq, Eq)]
pub struct Proof(Box<[u8]>);

impl Proof {
    /// Wrap raw proof bytes, enforcing the size ceiling.
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Result<Self, ProofError> {
        let bytes = bytes.into();
        if bytes.len() > MAX_PROOF_BYTES {
            return Err(ProofError::TooLarge(bytes.len()));
        }
        Ok(Proof(bytes))
    }

    /// The raw proof bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The proof length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the empty proof of a single-leaf tree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode as a lowercase hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Decode from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, ProofError> {
        let bytes = hex::decode(s).map_err(|_| ProofError::InvalidHex)?;
        Self::from_bytes(bytes)
    }

    /// Encode as an object proof, given the digest length that partitions
    /// the steps and an optional algorithm name to embed.
    pub fn to_object(
        &self,
        output_len: usize,
        hash_name: Option<&str>,
    ) -> Result<ProofObject, ProofError> {
        let step = output_len + 1;
        if self.0.len() % step != 0 {
            return Err(ProofError::BadStepLength {
                len: self.0.len(),
                step,
            });
        }
        let mut path = Vec::with_capacity(self.0.len() / step);
        for chunk in self.0.chunks(step) {
            let (direction, sibling) = (chunk[0], &chunk[1..]);
            if direction > 1 {
                return Err(ProofError::InvalidDirection(direction));
            }
            path.push(ProofStep(direction, hex::encode(sibling)));
        }
        Ok(ProofObject {
            v: PROOF_OBJECT_VERSION,
            h: hash_name.map(str::to_string),
            p: path,
        })
    }

    /// Decode an object proof back to raw bytes.
    ///
    /// All sibling hashes must decode to the same length, each within the
    /// accepted digest range, and every direction must be 0 or 1.
    pub fn from_object(obj: &ProofObject) -> Result<Self, ProofError> {
        if obj.v != PROOF_OBJECT_VERSION {
            return Err(ProofError::UnsupportedVersion(obj.v));
        }

        let mut bytes = Vec::new();
        let mut hash_len = None;
        for ProofStep(direction, sibling_hex) in &obj.p {
            if *direction > 1 {
                return Err(ProofError::InvalidDirection(*direction));
            }
            let sibling = hex::decode(sibling_hex).map_err(|_| ProofError::InvalidHex)?;
            match hash_len {
                None => {
                    if !(MIN_DIGEST_LEN..=MAX_DIGEST_LEN).contains(&sibling.len()) {
                        return Err(ProofError::HashLengthOutOfRange(sibling.len()));
                    }
                    hash_len = Some(sibling.len());
                }
                Some(expected) if expected != sibling.len() => {
                    return Err(ProofError::MixedHashLengths);
                }
                Some(_) => {}
            }
            bytes.push(*direction);
            bytes.extend_from_slice(&sibling);
        }
        Self::from_bytes(bytes)
    }
}

impl Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Proof({})", hex::encode(&self.0))
    }
}

impl AsRef<[u8]> for Proof {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// One step of an object proof: `[direction, hex sibling hash]` on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep(
    /// Direction: 1 when the accumulated value is the right operand.
    pub u8,
    /// Hex-encoded sibling hash.
    pub String,
);

/// The object wire form of a proof.
///
/// Serializes as `{"v": 1, "h": "<name>", "p": [[0|1, "<hex>"], ...]}`; `h`
/// is omitted when the tree was built with a custom hash function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofObject {
    /// Wire format version, always 1.
    pub v: u8,
    /// Name of the hash algorithm, when it is a built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<String>,
    /// The sibling path, leaf to root.
    pub p: Vec<ProofStep>,
}

/// A proof in any of the three interchangeable encodings.
#[derive(Debug)]
pub enum EncodedProof {
    /// Raw bytes.
    Binary(Proof),
    /// Lowercase hex string of the raw bytes.
    Hex(String),
    /// Structured object form.
    Object(ProofObject),
}

impl From<Proof> for EncodedProof {
    fn from(proof: Proof) -> Self {
        EncodedProof::Binary(proof)
    }
}

impl From<ProofObject> for EncodedProof {
    fn from(obj: ProofObject) -> Self {
        EncodedProof::Object(obj)
    }
}

/// Verify that `proof` links `leaf` to `root`.
///
/// The hash function may be passed explicitly; if omitted, an object proof
/// that names its algorithm supplies it. Undecodable proofs and unresolvable
/// hash functions are errors; a proof that decodes but does not establish
/// inclusion yields `Ok(false)`.
pub fn verify(
    root: &[u8],
    proof: &EncodedProof,
    leaf: &[u8],
    hash: Option<HashFn>,
) -> Result<bool, ProofError> {
    let decoded;
    let raw = match proof {
        EncodedProof::Binary(p) => p,
        EncodedProof::Hex(s) => {
            decoded = Proof::from_hex(s)?;
            &decoded
        }
        EncodedProof::Object(obj) => {
            decoded = Proof::from_object(obj)?;
            &decoded
        }
    };

    // An explicit hash function wins over the name embedded in the proof.
    let hasher = match (hash, proof) {
        (Some(f), _) => Hasher::resolve(f)?,
        (None, EncodedProof::Object(obj)) => match &obj.h {
            Some(name) => Hasher::named(name.parse()?),
            None => return Err(ProofError::MissingHashFn),
        },
        (None, _) => return Err(ProofError::MissingHashFn),
    };

    Ok(replay(root, raw, leaf, &hasher))
}

/// Replay the sibling path against `leaf` and compare the result to `root`.
fn replay(root: &[u8], proof: &Proof, leaf: &[u8], hasher: &Hasher) -> bool {
    // A single-leaf tree has an empty proof and a root equal to the leaf.
    if proof.is_empty() {
        return fixed_time_eq(root, leaf);
    }

    let output_len = hasher.output_len();
    if leaf.len() != output_len {
        return false;
    }

    // One direction byte plus one sibling hash per step. Divisibility also
    // guarantees every sibling has the hash function's output length.
    let step = output_len + 1;
    if proof.len() % step != 0 {
        return false;
    }

    let mut acc = leaf.to_vec();
    let mut preimage = Vec::with_capacity(1 + 2 * output_len);
    for (i, chunk) in proof.as_bytes().chunks(step).enumerate() {
        let (direction, sibling) = (chunk[0], &chunk[1..]);

        // The very first reduction pairs original leaves; every later one
        // pairs inner nodes. The prefixes must mirror tree construction.
        preimage.clear();
        preimage.push(if i == 0 {
            LEAF_NODE_PREFIX
        } else {
            INNER_NODE_PREFIX
        });
        if direction != 0 {
            preimage.extend_from_slice(sibling);
            preimage.extend_from_slice(&acc);
        } else {
            preimage.extend_from_slice(&acc);
            preimage.extend_from_slice(sibling);
        }
        acc = hasher.digest(&preimage);
    }

    trace!("replayed {} proof steps", proof.len() / step);
    fixed_time_eq(root, &acc)
}

/// Byte equality without an early exit, so the comparison time does not leak
/// how much of a candidate root matched.
fn fixed_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}
