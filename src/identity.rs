//! Vote identity protocol.
//!
//! Derives the vote-ledger key for a `(poll, user)` pair. Identifiable polls
//! store the raw member id; anonymous polls store
//! `HMAC-SHA256(pepper, "{poll_id}:{user_id}")`. The poll id in the keyed
//! input makes the same user's hash differ across polls, so anonymous voters
//! cannot be correlated between polls while duplicates within one poll are
//! still detectable.
//!
//! The pepper is derived from the application secret via HKDF with a purpose
//! label dedicated to vote identity. Other features deriving keys from the
//! same secret must use their own labels.

use hkdf::Hkdf;
use ring::hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::db::schema::{Poll, VotingMethod};

/// Domain separation salt, versioned for rotation.
const PEPPER_SALT: &[u8] = b"civicpoll-vote-identity-v1";
const PEPPER_INFO: &[u8] = b"hmac-sha256-pepper";

/// Vote-ledger key for one `(poll, user)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityKey {
    /// Raw member id, stored on `id_member` (identifiable polls).
    Member(String),
    /// Hex-encoded keyed hash, stored on `hashed_identifier` (anonymous polls).
    Hashed(String),
}

/// HMAC pepper for anonymous vote identity. Zeroized on drop; deliberately
/// has no `Debug` impl so it cannot end up in logs.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VotePepper([u8; 32]);

impl VotePepper {
    /// Derive the vote-identity pepper from the application secret.
    ///
    /// The salt and info strings are fixed, so the same secret always yields
    /// the same pepper and ledger hashes stay stable across restarts.
    pub fn derive(app_secret: &[u8]) -> Self {
        let hkdf = Hkdf::<Sha256>::new(Some(PEPPER_SALT), app_secret);
        let mut pepper = [0u8; 32];
        hkdf.expand(PEPPER_INFO, &mut pepper)
            .expect("HKDF expand cannot fail for a 32-byte output");

        Self(pepper)
    }
}

/// Derive the ledger key for a user on a poll, per the poll's voting method.
///
/// Deterministic: repeated calls with the same inputs yield the same key,
/// which is what makes duplicate detection possible without storing raw
/// identity in anonymous mode.
pub fn derive_identity(poll: &Poll, user_id: &str, pepper: &VotePepper) -> IdentityKey {
    match poll.voting_method {
        VotingMethod::Identifiable => IdentityKey::Member(user_id.to_owned()),
        VotingMethod::Anonymous => {
            let key = hmac::Key::new(hmac::HMAC_SHA256, &pepper.0);
            let tag = hmac::sign(&key, format!("{}:{}", poll.id, user_id).as_bytes());
            IdentityKey::Hashed(hex::encode(tag.as_ref()))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::schema::PollKind;
    use crate::roles::Visibility;

    fn poll(id: i64, method: VotingMethod) -> Poll {
        Poll {
            id,
            time_created: Utc::now(),
            id_org: "org-a".to_owned(),
            id_created_by: "admin-1".to_owned(),
            open: true,
            title: "test".to_owned(),
            description: String::new(),
            kind: PollKind::Informal,
            visibility: Visibility::Members,
            voting_method: method,
            quorum_percentage: None,
            end_time: None,
            final_results: None,
            options: Vec::new(),
        }
    }

    #[test]
    fn identifiable_mode_uses_raw_member_id() {
        let pepper = VotePepper::derive(b"secret");
        let key = derive_identity(&poll(1, VotingMethod::Identifiable), "user-9", &pepper);

        assert_eq!(key, IdentityKey::Member("user-9".to_owned()));
    }

    #[test]
    fn anonymous_key_is_stable_within_a_poll() {
        let pepper = VotePepper::derive(b"secret");
        let p = poll(1, VotingMethod::Anonymous);

        assert_eq!(
            derive_identity(&p, "user-9", &pepper),
            derive_identity(&p, "user-9", &pepper),
        );
    }

    #[test]
    fn anonymous_keys_differ_across_polls() {
        let pepper = VotePepper::derive(b"secret");

        let k1 = derive_identity(&poll(1, VotingMethod::Anonymous), "user-9", &pepper);
        let k2 = derive_identity(&poll(2, VotingMethod::Anonymous), "user-9", &pepper);

        assert_ne!(k1, k2);
    }

    #[test]
    fn anonymous_keys_differ_across_users() {
        let pepper = VotePepper::derive(b"secret");
        let p = poll(1, VotingMethod::Anonymous);

        assert_ne!(
            derive_identity(&p, "user-9", &pepper),
            derive_identity(&p, "user-10", &pepper),
        );
    }

    #[test]
    fn different_secrets_produce_different_keys() {
        let p = poll(1, VotingMethod::Anonymous);

        let k1 = derive_identity(&p, "user-9", &VotePepper::derive(b"secret-a"));
        let k2 = derive_identity(&p, "user-9", &VotePepper::derive(b"secret-b"));

        assert_ne!(k1, k2);
    }

    #[test]
    fn hashed_key_does_not_contain_the_user_id() {
        let pepper = VotePepper::derive(b"secret");

        match derive_identity(&poll(1, VotingMethod::Anonymous), "user-9", &pepper) {
            IdentityKey::Hashed(h) => {
                assert_eq!(h.len(), 64);
                assert!(!h.contains("user-9"));
            }
            IdentityKey::Member(_) => panic!("anonymous poll derived a member key"),
        }
    }
}
