//! Owners and the owners checksum.
//!
//! An owner maps cipher method names (`gpg`, `age`, ...) to a recipient
//! identifier for that method. The sequence of owners is hashed so an
//! envelope can tell whether it was sealed for the current owner set.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use tracing::trace;

use super::ordered::OrderedMap;

/// One owner: method name → recipient identifier.
pub type Owner = OrderedMap<String>;

/// Digest of the canonicalized owner sequence.
///
/// Keys are sorted within each owner; the order of owners is kept. Every
/// key and value is base64-encoded before hashing so delimiter characters
/// inside identifiers cannot collide with the framing.
pub fn checksum(owners: &[Owner]) -> Vec<u8> {
    let mut canonical = String::new();

    for (i, owner) in owners.iter().enumerate() {
        let mut keys: Vec<&str> = owner.keys().collect();
        keys.sort_unstable();

        canonical.push_str(&format!("{}\n", i));
        for key in keys {
            let value = owner.get(key).map(String::as_str).unwrap_or_default();
            canonical.push_str(&format!(
                "\"{}\":\"{}\"\n",
                STANDARD.encode(key),
                STANDARD.encode(value)
            ));
        }
    }

    trace!(owners = owners.len(), canonical_len = canonical.len(), "owners checksum");
    Sha256::digest(canonical.as_bytes()).to_vec()
}

/// Group recipient identifiers by method.
///
/// Methods appear in the order they are first seen; identifiers keep owner
/// order and duplicates. Empty identifiers are ignored, so a method whose
/// identifiers are all empty does not appear at all.
pub fn recipients_by_method(owners: &[Owner]) -> OrderedMap<Vec<String>> {
    let mut grouped: OrderedMap<Vec<String>> = OrderedMap::new();

    for owner in owners {
        for (method, recipient) in owner.iter() {
            if recipient.is_empty() {
                continue;
            }
            match grouped.get_mut(method) {
                Some(list) => list.push(recipient.clone()),
                None => {
                    grouped.insert(method, vec![recipient.clone()]);
                }
            }
        }
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(pairs: &[(&str, &str)]) -> Owner {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_checksum_deterministic() {
        let owners = vec![owner(&[("gpg", "keyA")]), owner(&[("age", "keyB")])];
        assert_eq!(checksum(&owners), checksum(&owners.clone()));
        assert_eq!(checksum(&owners).len(), 32);
    }

    #[test]
    fn test_checksum_ignores_key_order_within_owner() {
        let a = vec![owner(&[("gpg", "k1"), ("age", "k2")])];
        let b = vec![owner(&[("age", "k2"), ("gpg", "k1")])];
        assert_eq!(checksum(&a), checksum(&b));
    }

    #[test]
    fn test_checksum_sensitive_to_owner_order() {
        let a = vec![owner(&[("gpg", "k1")]), owner(&[("gpg", "k2")])];
        let b = vec![owner(&[("gpg", "k2")]), owner(&[("gpg", "k1")])];
        assert_ne!(checksum(&a), checksum(&b));
    }

    #[test]
    fn test_checksum_sensitive_to_values_and_membership() {
        let base = vec![owner(&[("gpg", "keyA")])];
        assert_ne!(checksum(&base), checksum(&[owner(&[("gpg", "keyB")])]));
        assert_ne!(checksum(&base), checksum(&[owner(&[("age", "keyA")])]));
        assert_ne!(
            checksum(&base),
            checksum(&[owner(&[("gpg", "keyA")]), owner(&[("age", "keyB")])])
        );
        assert_ne!(checksum(&base), checksum(&[]));
    }

    #[test]
    fn test_checksum_delimiters_do_not_collide() {
        let a = vec![owner(&[("gpg", "a\"\n1\n\"b")])];
        let b = vec![owner(&[("gpg", "a")]), owner(&[("b", "")])];
        assert_ne!(checksum(&a), checksum(&b));
    }

    #[test]
    fn test_recipients_grouped_in_owner_order() {
        let owners = vec![
            owner(&[("gpg", "alice")]),
            owner(&[("age", "age1bob"), ("gpg", "bob")]),
            owner(&[("gpg", "alice")]),
        ];
        let grouped = recipients_by_method(&owners);
        assert_eq!(grouped.keys().collect::<Vec<_>>(), ["gpg", "age"]);
        assert_eq!(grouped.get("gpg").unwrap(), &["alice", "bob", "alice"]);
        assert_eq!(grouped.get("age").unwrap(), &["age1bob"]);
    }

    #[test]
    fn test_recipients_skip_empty_identifiers() {
        let owners = vec![owner(&[("gpg", ""), ("age", "age1x")])];
        let grouped = recipients_by_method(&owners);
        assert!(!grouped.contains_key("gpg"));
        assert_eq!(grouped.len(), 1);
    }
}
