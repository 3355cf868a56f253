#![warn(missing_debug_implementations, rust_2018_idioms, missing_docs)]
#![deny(unsafe_code)]

//! # canopy
//!
//! A binary Merkle hash tree over an ordered sequence of fixed-length byte
//! leaves, with compact inclusion proofs that verify against a root alone.
//!
//! A [`Tree`] is built once from leaves and a hash function (one of nine
//! built-in SHA-2/SHA-3 algorithms by name, or any deterministic callable
//! producing 20 to 64 bytes) and is immutable afterwards. [`Tree::proof`]
//! extracts the sibling path for a leaf; [`verify`] replays a path against a
//! claimed root with no access to the tree or the original data. Proofs
//! convert losslessly between raw bytes, lowercase hex, and a structured
//! object form ([`ProofObject`]).
//!
//! ```
//! use canopy::{verify, EncodedProof, HashFn, HashName, Tree};
//!
//! let data = vec![vec![0u8; 32], vec![1u8; 32], vec![2u8; 32]];
//! let tree = Tree::new(&data, HashFn::Named(HashName::Sha256))?;
//!
//! let proof = tree.proof(&data[1])?;
//! let verified = verify(
//!     tree.root(),
//!     &EncodedProof::Binary(proof),
//!     &data[1],
//!     Some(HashFn::Named(HashName::Sha256)),
//! )?;
//! assert!(verified);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod hasher;

/// Logger module for the feature-gated logging facade.
pub mod logger;

mod proof;
mod tree;

pub use hasher::{
    HashFn, HashName, Hasher, HasherError, INNER_NODE_PREFIX, LEAF_NODE_PREFIX, MAX_DIGEST_LEN,
    MIN_DIGEST_LEN,
};
pub use proof::{
    verify, EncodedProof, Proof, ProofError, ProofObject, ProofStep, MAX_PROOF_BYTES,
    PROOF_OBJECT_VERSION,
};
pub use tree::{Tree, TreeError, TreeOptions};
