use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::hasher::{HashFn, Hasher, HasherError, INNER_NODE_PREFIX, LEAF_NODE_PREFIX};
use crate::logger::trace;
use crate::proof::{Proof, ProofError, ProofObject};

/// Errors from building a tree or deriving a proof from it.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The leaf sequence is empty.
    #[error("data can't be empty")]
    EmptyData,
    /// Balance was required but the leaf count is not a power of two.
    #[error("data length {0} must be a power of two when require_balanced is set")]
    UnbalancedData(usize),
    /// A leaf does not match the hash function's output length.
    #[error("data item {index} is {actual} bytes, expected {expected}")]
    LeafLengthMismatch {
        /// Index of the offending leaf.
        index: usize,
        /// The hash function's output length.
        expected: usize,
        /// The leaf's actual length.
        actual: usize,
    },
    /// The queried leaf is not in the tree's data.
    #[error("leaf not found in tree data")]
    LeafNotFound,
    /// An indexed proof was requested past the last leaf.
    #[error("leaf index {index} out of bounds for {len} leaves")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The number of leaves in the tree.
        len: usize,
    },
    /// The hash function failed to resolve.
    #[error(transparent)]
    Hasher(#[from] HasherError),
    /// A derived proof could not be encoded.
    #[error(transparent)]
    Proof(#[from] ProofError),
}

/// Construction options for a [`Tree`].
#[derive(Clone, Debug, TypedBuilder)]
pub struct TreeOptions {
    /// Reject leaf counts that are not a power of two.
    #[builder(default = false)]
    pub require_balanced: bool,
}

/// An immutable binary Merkle hash tree over fixed-length leaves.
///
/// Layer 0 holds the leaves; each later layer pairs the one below it until a
/// single root remains. Leaf pairs are hashed with a `0x00` prefix and inner
/// pairs with `0x01`. A layer with an odd count duplicates its last element
/// as its own partner.
///
/// # Known limitation
///
/// Duplicating the unpaired last element means two structurally distinct
/// inputs can produce the same subtree when the last leaf is its own
/// duplicate. This matches the established proof format and is kept for
/// byte compatibility; callers concerned with the ambiguity should pad
/// their input to a power of two or build with
/// [`TreeOptions::require_balanced`].
#[derive(Debug)]
pub struct Tree {
    /// All layers, leaves first; the last layer is the single-element root.
    layers: Vec<Vec<Box<[u8]>>>,
    hasher: Hasher,
}

impl Tree {
    /// Build a tree from `data` with default options.
    ///
    /// Every element of `data` must be exactly as long as the hash
    /// function's output.
    pub fn new<D: AsRef<[u8]>>(data: &[D], hash: HashFn) -> Result<Self, TreeError> {
        Self::with_options(data, hash, TreeOptions::builder().build())
    }

    /// Build a tree from `data` with explicit options.
    pub fn with_options<D: AsRef<[u8]>>(
        data: &[D],
        hash: HashFn,
        options: TreeOptions,
    ) -> Result<Self, TreeError> {
        let hasher = Hasher::resolve(hash)?;

        if data.is_empty() {
            return Err(TreeError::EmptyData);
        }
        if options.require_balanced && !data.len().is_power_of_two() {
            return Err(TreeError::UnbalancedData(data.len()));
        }
        for (index, item) in data.iter().enumerate() {
            let actual = item.as_ref().len();
            if actual != hasher.output_len() {
                return Err(TreeError::LeafLengthMismatch {
                    index,
                    expected: hasher.output_len(),
                    actual,
                });
            }
        }

        let leaves: Vec<Box<[u8]>> = data.iter().map(|item| item.as_ref().into()).collect();
        let layers = build_layers(leaves, &hasher);
        trace!(
            "built {} layers over {} leaves with {}",
            layers.len(),
            data.len(),
            hasher.name()
        );

        Ok(Tree { layers, hasher })
    }

    /// The Merkle root: the sole element of the last layer.
    #[must_use]
    pub fn root(&self) -> &[u8] {
        &self.layers[self.layers.len() - 1][0]
    }

    /// The number of hashing layers above the leaves.
    ///
    /// Zero for a single-leaf tree; `ceil(log2(leaf_count))` otherwise.
    #[must_use]
    pub fn height(&self) -> usize {
        self.layers.len() - 1
    }

    /// The number of leaves the tree was built from.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        self.layers[0].len()
    }

    /// The name of the tree's hash function, `"unknown"` for custom ones.
    #[must_use]
    pub fn hash_name(&self) -> &'static str {
        self.hasher.name()
    }

    /// Derive the inclusion proof for `leaf`.
    ///
    /// Leaves are scanned in index order and the first byte-equal match
    /// wins.
    pub fn proof(&self, leaf: &[u8]) -> Result<Proof, TreeError> {
        let index = self.layers[0]
            .iter()
            .position(|item| item.as_ref() == leaf)
            .ok_or(TreeError::LeafNotFound)?;
        trace!("leaf found at index {index}");
        self.proof_at(index)
    }

    /// Derive the inclusion proof for the leaf at `index`.
    ///
    /// Walks every layer below the root, recording the sibling and whether
    /// the current node is the right child of its pair. A single-leaf tree
    /// yields an empty proof.
    pub fn proof_at(&self, index: usize) -> Result<Proof, TreeError> {
        if index >= self.leaf_count() {
            return Err(TreeError::IndexOutOfBounds {
                index,
                len: self.leaf_count(),
            });
        }

        let step = 1 + self.hasher.output_len();
        let mut bytes = Vec::with_capacity(self.height() * step);

        let mut is_right = index % 2;
        let mut pair = index - is_right;
        for level in 0..self.height() {
            let hashes = &self.layers[level];

            // A right child pairs with the element to its left. A left child
            // pairs with the element to its right, or with itself when the
            // layer ends on an odd count.
            let sibling = if is_right == 1 {
                &hashes[pair]
            } else {
                hashes.get(pair + 1).unwrap_or(&hashes[pair])
            };

            bytes.push(is_right as u8);
            bytes.extend_from_slice(sibling);

            is_right = (pair / 2) % 2;
            pair = pair / 2 - is_right;
        }

        Ok(Proof::from_bytes(bytes)?)
    }

    /// The proof for `leaf`, hex encoded.
    pub fn proof_hex(&self, leaf: &[u8]) -> Result<String, TreeError> {
        Ok(self.proof(leaf)?.to_hex())
    }

    /// The proof for `leaf` in object form, named after the tree's hash
    /// function when it is a built-in one.
    pub fn proof_object(&self, leaf: &[u8]) -> Result<ProofObject, TreeError> {
        let name = self.hasher.hash_name().map(|name| name.as_str());
        Ok(self
            .proof(leaf)?
            .to_object(self.hasher.output_len(), name)?)
    }
}

/// Reduce the leaves layer by layer until a single root remains.
///
/// Iterative rather than recursive so construction cost is bounded by heap
/// memory, not stack depth.
fn build_layers(leaves: Vec<Box<[u8]>>, hasher: &Hasher) -> Vec<Vec<Box<[u8]>>> {
    let mut layers = vec![leaves];
    let mut prefix = LEAF_NODE_PREFIX;
    let mut preimage = Vec::with_capacity(1 + 2 * hasher.output_len());

    // A single-leaf tree stops here: the leaf is the root, unhashed.
    while layers[layers.len() - 1].len() > 1 {
        let next = {
            let current = &layers[layers.len() - 1];
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for chunk in current.chunks(2) {
                let left = &chunk[0];
                // Odd layer: the unpaired last element partners itself.
                let right = chunk.get(1).unwrap_or(left);

                preimage.clear();
                preimage.push(prefix);
                preimage.extend_from_slice(left);
                preimage.extend_from_slice(right);
                next.push(hasher.digest(&preimage).into_boxed_slice());
            }
            next
        };
        layers.push(next);
        prefix = INNER_NODE_PREFIX;
    }

    layers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::HashName;
    use sha2::{Digest, Sha256};
    use test_case::test_case;

    fn leaves(n: usize) -> Vec<Vec<u8>> {
        (0..n).map(|i| vec![i as u8; 32]).collect()
    }

    fn sha256_tree(n: usize) -> Tree {
        Tree::new(&leaves(n), HashFn::Named(HashName::Sha256)).unwrap()
    }

    fn prefixed(prefix: u8, left: &[u8], right: &[u8]) -> Vec<u8> {
        Sha256::digest([&[prefix][..], left, right].concat()).to_vec()
    }

    #[test]
    fn empty_data_is_rejected() {
        let data: Vec<Vec<u8>> = Vec::new();
        let err = Tree::new(&data, HashFn::Named(HashName::Sha256)).unwrap_err();
        assert!(matches!(err, TreeError::EmptyData));
    }

    #[test]
    fn wrong_leaf_length_is_rejected() {
        let mut data = leaves(3);
        data[1] = vec![0u8; 20];
        let err = Tree::new(&data, HashFn::Named(HashName::Sha256)).unwrap_err();
        assert!(matches!(
            err,
            TreeError::LeafLengthMismatch {
                index: 1,
                expected: 32,
                actual: 20
            }
        ));
    }

    #[test_case(1, true; "one leaf")]
    #[test_case(2, true; "two leaves")]
    #[test_case(3, false; "three leaves")]
    #[test_case(4, true; "four leaves")]
    #[test_case(7, false; "seven leaves")]
    #[test_case(8, true; "eight leaves")]
    fn require_balanced_gates_on_powers_of_two(n: usize, ok: bool) {
        let options = TreeOptions::builder().require_balanced(true).build();
        let result = Tree::with_options(&leaves(n), HashFn::Named(HashName::Sha256), options);
        match result {
            Ok(_) => assert!(ok),
            Err(err) => {
                assert!(!ok);
                assert!(matches!(err, TreeError::UnbalancedData(len) if len == n));
            }
        }
    }

    #[test]
    fn single_leaf_root_is_the_leaf() {
        let tree = sha256_tree(1);
        assert_eq!(tree.root(), &[0u8; 32][..]);
        assert_eq!(tree.height(), 0);
        assert!(tree.proof(&[0u8; 32]).unwrap().is_empty());
    }

    #[test]
    fn two_leaf_root_uses_the_leaf_prefix() {
        let data = leaves(2);
        let tree = sha256_tree(2);
        assert_eq!(tree.root(), prefixed(0x00, &data[0], &data[1]).as_slice());
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn unbalanced_layer_duplicates_the_last_leaf() {
        let data = leaves(3);
        let left = prefixed(0x00, &data[0], &data[1]);
        let right = prefixed(0x00, &data[2], &data[2]);
        let tree = sha256_tree(3);
        assert_eq!(tree.root(), prefixed(0x01, &left, &right).as_slice());
        assert_eq!(tree.height(), 2);
    }

    #[test_case(2)]
    #[test_case(3)]
    #[test_case(5)]
    #[test_case(8)]
    fn heights_match_log2(n: usize) {
        let tree = sha256_tree(n);
        assert_eq!(tree.height(), (n as f64).log2().ceil() as usize);
        assert_eq!(tree.leaf_count(), n);
    }

    #[test]
    fn proof_scans_leaves_in_index_order() {
        let data = leaves(4);
        let tree = sha256_tree(4);
        for (i, leaf) in data.iter().enumerate() {
            assert_eq!(tree.proof(leaf).unwrap(), tree.proof_at(i).unwrap());
        }
    }

    #[test]
    fn missing_leaf_is_not_found() {
        let tree = sha256_tree(4);
        let err = tree.proof(&[9u8; 32]).unwrap_err();
        assert!(matches!(err, TreeError::LeafNotFound));
    }

    #[test]
    fn out_of_bounds_index_is_rejected() {
        let tree = sha256_tree(4);
        let err = tree.proof_at(4).unwrap_err();
        assert!(matches!(
            err,
            TreeError::IndexOutOfBounds { index: 4, len: 4 }
        ));
    }

    #[test]
    fn two_leaf_proofs_record_direction_and_sibling() {
        let data = leaves(2);
        let tree = sha256_tree(2);

        let left_proof = tree.proof(&data[0]).unwrap();
        assert_eq!(left_proof.as_bytes()[0], 0);
        assert_eq!(&left_proof.as_bytes()[1..], data[1].as_slice());

        let right_proof = tree.proof(&data[1]).unwrap();
        assert_eq!(right_proof.as_bytes()[0], 1);
        assert_eq!(&right_proof.as_bytes()[1..], data[0].as_slice());
    }

    #[test]
    fn proof_object_carries_the_hash_name() {
        let data = leaves(2);
        let obj = sha256_tree(2).proof_object(&data[0]).unwrap();
        assert_eq!(obj.h.as_deref(), Some("sha256"));
        assert_eq!(obj.p.len(), 1);
    }

    #[test]
    fn proof_object_for_a_custom_hash_has_no_name() {
        let hash = HashFn::custom(|data| Sha256::digest(data).to_vec());
        let tree = Tree::new(&leaves(2), hash).unwrap();
        assert_eq!(tree.hash_name(), "unknown");
        let obj = tree.proof_object(&leaves(2)[0]).unwrap();
        assert_eq!(obj.h, None);
    }

    #[test]
    fn proof_hex_is_lowercase_hex_of_the_raw_proof() {
        let data = leaves(2);
        let tree = sha256_tree(2);
        let raw = tree.proof(&data[0]).unwrap();
        assert_eq!(tree.proof_hex(&data[0]).unwrap(), raw.to_hex());
    }
}
