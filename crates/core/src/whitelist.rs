//! Whitelist value type

use auction_merkle::{MerkleError, MerkleProof, MerkleTree};
use serde::{Deserialize, Serialize};

use crate::types::{Address, Hash};

/// Ordered list of whitelisted addresses.
///
/// Serializes as a plain JSON array of hex strings, the same document the
/// content store holds. Edits produce a new list; trees are always rebuilt
/// from scratch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Whitelist {
    addresses: Vec<Address>,
}

impl Whitelist {
    /// Take a list as-is. Duplicates are kept; each becomes its own leaf.
    pub fn new(addresses: Vec<Address>) -> Self {
        Self { addresses }
    }

    /// Addresses in stored order
    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// No entries
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Membership by address equality
    pub fn contains(&self, address: &Address) -> bool {
        self.addresses.contains(address)
    }

    /// Copy with `address` appended. Already-present addresses are not added twice.
    pub fn with_added(&self, address: Address) -> Self {
        let mut addresses = self.addresses.clone();
        if !addresses.contains(&address) {
            addresses.push(address);
        }
        Self { addresses }
    }

    /// Copy with every occurrence of `address` removed
    pub fn without(&self, address: &Address) -> Self {
        Self { addresses: self.addresses.iter().filter(|a| *a != address).copied().collect() }
    }

    /// Build the Merkle tree over this list
    pub fn tree(&self) -> Result<MerkleTree, MerkleError> {
        MerkleTree::build(&self.addresses)
    }

    /// Root of the tree over this list
    pub fn root(&self) -> Result<Hash, MerkleError> {
        Ok(self.tree()?.root())
    }

    /// Membership proof for `address`
    pub fn proof(&self, address: &Address) -> Result<MerkleProof, MerkleError> {
        self.tree()?.proof(address)
    }
}

impl From<Vec<Address>> for Whitelist {
    fn from(addresses: Vec<Address>) -> Self {
        Self::new(addresses)
    }
}

impl FromIterator<Address> for Whitelist {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Whitelist {
    type Item = &'a Address;
    type IntoIter = std::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.addresses.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    const AAA: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BBB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const CCC: &str = "0xcccccccccccccccccccccccccccccccccccccccc";

    #[test]
    fn test_two_member_scenario() {
        let list = Whitelist::new(vec![addr(AAA), addr(BBB)]);
        let reversed = Whitelist::new(vec![addr(BBB), addr(AAA)]);

        let root = list.root().unwrap();
        assert_eq!(list.root().unwrap(), root);
        assert_eq!(reversed.root().unwrap(), root);

        let proof = list.proof(&addr(AAA)).unwrap();
        assert!(auction_merkle::verify(&root, &addr(AAA).leaf(), &proof.siblings));

        assert_eq!(list.proof(&addr(CCC)), Err(MerkleError::NotFound(addr(CCC).leaf())));
    }

    #[test]
    fn test_empty_list_has_no_root() {
        assert_eq!(Whitelist::default().root(), Err(MerkleError::EmptyInput));
    }

    #[test]
    fn test_with_added_is_set_like() {
        let list = Whitelist::new(vec![addr(AAA)]);
        let added = list.with_added(addr(AAA));
        assert_eq!(added, list);
        assert_eq!(list.with_added(addr(BBB)).len(), 2);
    }

    #[test]
    fn test_without_removes_every_occurrence() {
        let list = Whitelist::new(vec![addr(AAA), addr(BBB), addr(AAA)]);
        let removed = list.without(&addr(AAA));
        assert_eq!(removed.addresses(), &[addr(BBB)]);
    }

    #[test]
    fn test_remove_and_readd_round_trip() {
        let list = Whitelist::new(vec![addr(AAA), addr(BBB), addr(CCC)]);
        let root = list.root().unwrap();
        let readded = list.without(&addr(BBB)).with_added(addr(BBB));
        assert_ne!(readded.addresses(), list.addresses());
        assert_eq!(readded.root().unwrap(), root);
    }

    #[test]
    fn test_shuffled_lists_share_root() {
        let mut addresses: Vec<Address> =
            (1..=12u8).map(|n| Address::new([n; 20])).collect();
        let root = Whitelist::new(addresses.clone()).root().unwrap();
        addresses.shuffle(&mut rand::thread_rng());
        assert_eq!(Whitelist::new(addresses).root().unwrap(), root);
    }

    #[test]
    fn test_json_document() {
        let list = Whitelist::new(vec![addr(AAA), addr(BBB)]);
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(json, format!("[\"{AAA}\",\"{BBB}\"]"));
        assert_eq!(serde_json::from_str::<Whitelist>(&json).unwrap(), list);
    }
}
