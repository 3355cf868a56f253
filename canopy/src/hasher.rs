use std::fmt::{self, Debug};
use std::str::FromStr;

use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_256};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};
use thiserror::Error;

/// Byte prepended to a pair of leaves before hashing.
pub const LEAF_NODE_PREFIX: u8 = 0x00;

/// Byte prepended to a pair of inner nodes before hashing.
///
/// Using a different prefix for leaf and inner reductions prevents a leaf
/// value from being reinterpreted as an inner-node pair (a structural
/// second-preimage attack). The verifier applies the same prefixes.
pub const INNER_NODE_PREFIX: u8 = 0x01;

/// Smallest accepted hash output length, in bytes (SHA-1 sized).
pub const MIN_DIGEST_LEN: usize = 20;

/// Largest accepted hash output length, in bytes (SHA-512 sized).
pub const MAX_DIGEST_LEN: usize = 64;

/// Fixed input used to probe a custom hash function once at resolution time.
const PROBE_INPUT: [u8; 1] = [0x00];

/// Errors from resolving a hash function name or callable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HasherError {
    /// The name is not one of the nine recognized identifiers.
    #[error("unrecognized hash function name: {0}")]
    UnknownName(String),
    /// The callable returned an output outside the accepted length range.
    #[error("hash function output must be {MIN_DIGEST_LEN} to {MAX_DIGEST_LEN} bytes, got {0}")]
    BadOutputLength(usize),
}

/// The nine built-in hash algorithms, identified by their wire names.
#[allow(non_camel_case_types)] // variant names mirror the wire identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashName {
    /// SHA-224 (`sha224`)
    Sha224,
    /// SHA-256 (`sha256`)
    Sha256,
    /// SHA-384 (`sha384`)
    Sha384,
    /// SHA-512 (`sha512`)
    Sha512,
    /// SHA-512/256 (`sha512_256`)
    Sha512_256,
    /// SHA3-224 (`sha3_224`)
    Sha3_224,
    /// SHA3-256 (`sha3_256`)
    Sha3_256,
    /// SHA3-384 (`sha3_384`)
    Sha3_384,
    /// SHA3-512 (`sha3_512`)
    Sha3_512,
}

impl HashName {
    /// All recognized algorithms, in wire-name order.
    pub const ALL: [HashName; 9] = [
        HashName::Sha224,
        HashName::Sha256,
        HashName::Sha384,
        HashName::Sha512,
        HashName::Sha512_256,
        HashName::Sha3_224,
        HashName::Sha3_256,
        HashName::Sha3_384,
        HashName::Sha3_512,
    ];

    /// The identifier used on the object-proof wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HashName::Sha224 => "sha224",
            HashName::Sha256 => "sha256",
            HashName::Sha384 => "sha384",
            HashName::Sha512 => "sha512",
            HashName::Sha512_256 => "sha512_256",
            HashName::Sha3_224 => "sha3_224",
            HashName::Sha3_256 => "sha3_256",
            HashName::Sha3_384 => "sha3_384",
            HashName::Sha3_512 => "sha3_512",
        }
    }

    /// The digest length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            HashName::Sha224 | HashName::Sha3_224 => 28,
            HashName::Sha256 | HashName::Sha512_256 | HashName::Sha3_256 => 32,
            HashName::Sha384 | HashName::Sha3_384 => 48,
            HashName::Sha512 | HashName::Sha3_512 => 64,
        }
    }

    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashName::Sha224 => Sha224::digest(data).to_vec(),
            HashName::Sha256 => Sha256::digest(data).to_vec(),
            HashName::Sha384 => Sha384::digest(data).to_vec(),
            HashName::Sha512 => Sha512::digest(data).to_vec(),
            HashName::Sha512_256 => Sha512_256::digest(data).to_vec(),
            HashName::Sha3_224 => Sha3_224::digest(data).to_vec(),
            HashName::Sha3_256 => Sha3_256::digest(data).to_vec(),
            HashName::Sha3_384 => Sha3_384::digest(data).to_vec(),
            HashName::Sha3_512 => Sha3_512::digest(data).to_vec(),
        }
    }
}

impl fmt::Display for HashName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashName {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HashName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| HasherError::UnknownName(s.to_string()))
    }
}

/// A hash function supplied by name or as an opaque callable.
///
/// Resolved exactly once into a [`Hasher`]; the string form is never
/// re-dispatched per call.
pub enum HashFn {
    /// One of the nine built-in algorithms.
    Named(HashName),
    /// A caller-supplied deterministic byte transform.
    Custom(Box<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>),
}

impl HashFn {
    /// Wrap a custom hash function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        HashFn::Custom(Box::new(f))
    }
}

impl Debug for HashFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashFn::Named(name) => f.debug_tuple("Named").field(name).finish(),
            HashFn::Custom(_) => f.debug_tuple("Custom").finish(),
        }
    }
}

impl From<HashName> for HashFn {
    fn from(name: HashName) -> Self {
        HashFn::Named(name)
    }
}

impl FromStr for HashFn {
    type Err = HasherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<HashName>().map(HashFn::Named)
    }
}

/// A resolved hash function: name, output length, and the callable itself.
///
/// Bound once at tree construction; every hash performed afterwards uses
/// this exact function.
pub struct Hasher {
    name: Option<HashName>,
    output_len: usize,
    inner: HashFn,
}

impl Hasher {
    /// Resolve a named or custom hash function.
    ///
    /// Custom functions are probed once with a fixed one-byte input; the
    /// probe must succeed and return between [`MIN_DIGEST_LEN`] and
    /// [`MAX_DIGEST_LEN`] bytes. Named algorithms have statically known
    /// output lengths and are not probed.
    pub fn resolve(hash: HashFn) -> Result<Self, HasherError> {
        match hash {
            HashFn::Named(name) => Ok(Hasher {
                name: Some(name),
                output_len: name.output_len(),
                inner: HashFn::Named(name),
            }),
            HashFn::Custom(f) => {
                let probed = f(&PROBE_INPUT).len();
                if !(MIN_DIGEST_LEN..=MAX_DIGEST_LEN).contains(&probed) {
                    return Err(HasherError::BadOutputLength(probed));
                }
                Ok(Hasher {
                    name: None,
                    output_len: probed,
                    inner: HashFn::Custom(f),
                })
            }
        }
    }

    /// Resolve one of the nine built-in algorithms.
    #[must_use]
    pub fn named(name: HashName) -> Self {
        Hasher {
            name: Some(name),
            output_len: name.output_len(),
            inner: HashFn::Named(name),
        }
    }

    /// The wire name of the algorithm, if it is a built-in one.
    #[must_use]
    pub const fn hash_name(&self) -> Option<HashName> {
        self.name
    }

    /// The name as a string, `"unknown"` for custom functions.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name.map_or("unknown", HashName::as_str)
    }

    /// The digest length in bytes.
    #[must_use]
    pub const fn output_len(&self) -> usize {
        self.output_len
    }

    /// Hash `data` with the resolved function.
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match &self.inner {
            HashFn::Named(name) => name.digest(data),
            HashFn::Custom(f) => f(data),
        }
    }
}

impl Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hasher")
            .field("name", &self.name())
            .field("output_len", &self.output_len)
            .finish()
    }
}
