use crate::error::{AcademyError, Result};
use crate::utils::{hash256_digest, sha256_digest, to_hex, truncate_hash, DISPLAY_HASH_LEN};
use serde::{Deserialize, Serialize};

/// Merkle tree for the Merkle lesson's build-and-prove demo
///
/// Leaves are SHA-256 of each item; parents are double SHA-256 of the
/// concatenated child digests. Odd levels duplicate their last node, the
/// same rule Bitcoin uses for block Merkle roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleTree {
    root: MerkleNode,
    /// Digests level by level, leaves first, root last
    levels: Vec<Vec<Vec<u8>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleNode {
    hash: Vec<u8>,
    left: Option<Box<MerkleNode>>,
    right: Option<Box<MerkleNode>>,
    /// Original item text, leaves only
    data: Option<String>,
}

impl MerkleNode {
    fn leaf(item: &str) -> MerkleNode {
        MerkleNode {
            hash: sha256_digest(item.as_bytes()),
            left: None,
            right: None,
            data: Some(item.to_string()),
        }
    }

    fn parent(left: MerkleNode, right: MerkleNode) -> MerkleNode {
        MerkleNode {
            hash: hash_pair(&left.hash, &right.hash),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            data: None,
        }
    }

    /// Raw 32-byte digest of this node
    pub fn hash(&self) -> &[u8] {
        &self.hash
    }

    /// Full digest as lowercase hex
    pub fn hash_hex(&self) -> String {
        to_hex(&self.hash)
    }

    /// Eight-character prefix for display. Not a digest.
    pub fn short_hash(&self) -> String {
        truncate_hash(&self.hash_hex(), DISPLAY_HASH_LEN)
    }

    pub fn left(&self) -> Option<&MerkleNode> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&MerkleNode> {
        self.right.as_deref()
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Leaves have no children
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Which side of the path node a sibling sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiblingPosition {
    Left,
    Right,
}

/// One step of a proof: the sibling digest and its side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofElement {
    pub sibling_hash: Vec<u8>,
    pub position: SiblingPosition,
}

/// Inclusion proof from one leaf up to the root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub leaf_index: usize,
    pub leaf_hash: Vec<u8>,
    pub path: Vec<ProofElement>,
}

impl MerkleProof {
    /// Fold the path over the leaf hash, hashing at every step
    pub fn compute_root(&self) -> Vec<u8> {
        self.path
            .iter()
            .fold(self.leaf_hash.clone(), |current, element| match element.position {
                SiblingPosition::Right => hash_pair(&current, &element.sibling_hash),
                SiblingPosition::Left => hash_pair(&element.sibling_hash, &current),
            })
    }

    /// Check that the path folds up to `root`
    pub fn verify(&self, root: &[u8]) -> bool {
        self.compute_root() == root
    }

    /// Also check the leaf is the hash of `item`
    pub fn verify_item(&self, item: &str, root: &[u8]) -> bool {
        sha256_digest(item.as_bytes()) == self.leaf_hash && self.verify(root)
    }
}

/// Double SHA-256 of two concatenated child digests
fn hash_pair(left: &[u8], right: &[u8]) -> Vec<u8> {
    let mut combined = Vec::with_capacity(left.len() + right.len());
    combined.extend_from_slice(left);
    combined.extend_from_slice(right);
    hash256_digest(&combined)
}

impl MerkleTree {
    /// Build the tree bottom-up from the item list; an empty list is an error
    pub fn build<S: AsRef<str>>(items: &[S]) -> Result<MerkleTree> {
        if items.is_empty() {
            return Err(AcademyError::Merkle(
                "Cannot build a Merkle tree from an empty list".to_string(),
            ));
        }

        let mut current_level: Vec<MerkleNode> =
            items.iter().map(|item| MerkleNode::leaf(item.as_ref())).collect();
        let mut levels = vec![Self::level_hashes(&current_level)];

        while current_level.len() > 1 {
            let mut next_level = Vec::with_capacity(current_level.len().div_ceil(2));
            let mut nodes = current_level.into_iter();

            while let Some(left) = nodes.next() {
                // Odd count: the last node is paired with a copy of itself
                let right = nodes.next().unwrap_or_else(|| left.clone());
                next_level.push(MerkleNode::parent(left, right));
            }

            levels.push(Self::level_hashes(&next_level));
            current_level = next_level;
        }

        let root = current_level
            .pop()
            .ok_or_else(|| AcademyError::Merkle("Failed to build Merkle tree".to_string()))?;

        log::debug!(
            "Built Merkle tree over {} items, height {}",
            items.len(),
            levels.len()
        );
        Ok(MerkleTree { root, levels })
    }

    /// Digests of one level, left to right
    fn level_hashes(nodes: &[MerkleNode]) -> Vec<Vec<u8>> {
        nodes.iter().map(|node| node.hash.clone()).collect()
    }

    /// Root node, with the whole tree hanging off it
    pub fn root(&self) -> &MerkleNode {
        &self.root
    }

    /// Get the Merkle root digest
    pub fn root_hash(&self) -> &[u8] {
        &self.root.hash
    }

    /// Merkle root as lowercase hex
    pub fn root_hex(&self) -> String {
        self.root.hash_hex()
    }

    /// Every level of digests, leaves first and root last
    pub fn levels(&self) -> &[Vec<Vec<u8>>] {
        &self.levels
    }

    /// Number of levels including the leaves; a single item has height 1
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// Number of items the tree was built from
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map(Vec::len).unwrap_or(0)
    }

    /// Get the hash of a leaf at the given index
    pub fn leaf_hash(&self, index: usize) -> Option<&[u8]> {
        self.levels
            .first()
            .and_then(|leaves| leaves.get(index))
            .map(Vec::as_slice)
    }

    /// Original item text of leaf `index`
    pub fn leaf_data(&self, index: usize) -> Option<&str> {
        let mut stack = vec![&self.root];
        let mut leaves_seen = 0;
        // Duplicated right children repeat an earlier leaf; skip them by
        // walking only as many leaves as the tree really has.
        while let Some(node) = stack.pop() {
            if node.is_leaf() {
                if leaves_seen == index {
                    return node.data();
                }
                leaves_seen += 1;
                if leaves_seen >= self.leaf_count() {
                    return None;
                }
                continue;
            }
            if let Some(right) = node.right() {
                stack.push(right);
            }
            if let Some(left) = node.left() {
                stack.push(left);
            }
        }
        None
    }

    /// Generate an inclusion proof for the leaf at the given index
    ///
    /// On odd levels the last node is its own sibling, matching how it was
    /// duplicated during the build.
    pub fn build_proof(&self, leaf_index: usize) -> Result<MerkleProof> {
        let leaf_hash = self.leaf_hash(leaf_index).ok_or_else(|| {
            AcademyError::Merkle(format!(
                "Leaf index {leaf_index} out of bounds ({} leaves)",
                self.leaf_count()
            ))
        })?;

        let mut path = Vec::with_capacity(self.height().saturating_sub(1));
        let mut index = leaf_index;

        for level in &self.levels[..self.levels.len() - 1] {
            let (sibling_index, position) = if index % 2 == 0 {
                (index + 1, SiblingPosition::Right)
            } else {
                (index - 1, SiblingPosition::Left)
            };
            let sibling_hash = level.get(sibling_index).unwrap_or(&level[index]).clone();
            path.push(ProofElement {
                sibling_hash,
                position,
            });
            index /= 2;
        }

        Ok(MerkleProof {
            leaf_index,
            leaf_hash: leaf_hash.to_vec(),
            path,
        })
    }

    /// Verify a proof against this tree's root
    pub fn verify_proof(&self, proof: &MerkleProof) -> bool {
        proof.verify(self.root_hash())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("tx-{i}")).collect()
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let empty: Vec<String> = vec![];
        assert!(MerkleTree::build(&empty).is_err());
    }

    #[test]
    fn test_single_item_root_is_leaf() {
        let tree = MerkleTree::build(&["only"]).unwrap();
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.root_hash(), sha256_digest(b"only").as_slice());

        let proof = tree.build_proof(0).unwrap();
        assert!(proof.path.is_empty());
        assert!(tree.verify_proof(&proof));
    }

    #[test]
    fn test_build_is_deterministic() {
        for n in 1..=9 {
            let a = MerkleTree::build(&items(n)).unwrap();
            let b = MerkleTree::build(&items(n)).unwrap();
            assert_eq!(a.root_hash(), b.root_hash());
        }
    }

    #[test]
    fn test_two_leaves_root() {
        let tree = MerkleTree::build(&["a", "b"]).unwrap();
        let expected = hash_pair(&sha256_digest(b"a"), &sha256_digest(b"b"));
        assert_eq!(tree.root_hash(), expected.as_slice());
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn test_odd_level_duplicates_last_node() {
        let tree = MerkleTree::build(&["a", "b", "c"]).unwrap();
        let ha = sha256_digest(b"a");
        let hb = sha256_digest(b"b");
        let hc = sha256_digest(b"c");
        let expected = hash_pair(&hash_pair(&ha, &hb), &hash_pair(&hc, &hc));
        assert_eq!(tree.root_hash(), expected.as_slice());
        assert_eq!(tree.height(), 3);
        assert_eq!(tree.levels()[1].len(), 2);
    }

    #[test]
    fn test_every_leaf_proof_reproduces_root() {
        for n in 1..=11 {
            let tree = MerkleTree::build(&items(n)).unwrap();
            for i in 0..n {
                let proof = tree.build_proof(i).unwrap();
                assert_eq!(proof.path.len(), tree.height() - 1);
                assert_eq!(proof.compute_root(), tree.root_hash());
                assert!(proof.verify_item(&format!("tx-{i}"), tree.root_hash()));
            }
        }
    }

    #[test]
    fn test_proof_positions() {
        let tree = MerkleTree::build(&items(4)).unwrap();
        let proof = tree.build_proof(2).unwrap();
        assert_eq!(proof.path[0].position, SiblingPosition::Right);
        assert_eq!(proof.path[0].sibling_hash, tree.leaf_hash(3).unwrap());
        assert_eq!(proof.path[1].position, SiblingPosition::Left);
        assert_eq!(proof.path[1].sibling_hash, tree.levels()[1][0]);
    }

    #[test]
    fn test_tampered_proof_fails() {
        let tree = MerkleTree::build(&items(5)).unwrap();
        let mut proof = tree.build_proof(3).unwrap();
        proof.path[0].sibling_hash[0] ^= 0xff;
        assert!(!tree.verify_proof(&proof));

        let proof = tree.build_proof(3).unwrap();
        assert!(!proof.verify_item("tx-4", tree.root_hash()));
    }

    #[test]
    fn test_out_of_range_proof() {
        let tree = MerkleTree::build(&items(3)).unwrap();
        assert!(tree.build_proof(3).is_err());
    }

    #[test]
    fn test_leaf_data_and_short_hash() {
        let tree = MerkleTree::build(&items(3)).unwrap();
        assert_eq!(tree.leaf_data(0), Some("tx-0"));
        assert_eq!(tree.leaf_data(2), Some("tx-2"));
        assert_eq!(tree.leaf_data(3), None);
        assert_eq!(tree.root().short_hash().len(), DISPLAY_HASH_LEN);
        assert!(tree.root_hex().starts_with(&tree.root().short_hash()));
    }
}
