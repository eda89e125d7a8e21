//! Member directory contract.
//!
//! The engine does not own member records; an embedding platform supplies
//! them. Two things are needed: the acting user's current profile for
//! eligibility checks, and the organisation's eligible-member count for
//! quorum computation at close time.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::roles::{role_at_least, Visibility};

/// Membership standing within an organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Active,
    Inactive,
}

/// A user's current profile as reported by the identity/profile store.
#[derive(Debug, Clone)]
pub struct MemberProfile {
    pub user_id: String,
    pub org_id: String,
    /// Role name, ranked via the role hierarchy table.
    pub role: String,
    pub status: MembershipStatus,
}

/// Identity/profile store consumed by the engine.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Current profile for a user, or `None` if the user is unknown.
    async fn profile(&self, user_id: &str) -> Option<MemberProfile>;

    /// Count of active members of `org_id` at or above the given visibility
    /// tier. Read live at poll close for quorum computation.
    async fn eligible_member_count(&self, org_id: &str, visibility: Visibility) -> u64;
}

/// In-memory directory for tests and embedded deployments.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    profiles: HashMap<String, MemberProfile>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: MemberProfile) {
        self.profiles.insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl MemberDirectory for StaticDirectory {
    async fn profile(&self, user_id: &str) -> Option<MemberProfile> {
        self.profiles.get(user_id).cloned()
    }

    async fn eligible_member_count(&self, org_id: &str, visibility: Visibility) -> u64 {
        self.profiles
            .values()
            .filter(|p| {
                p.org_id == org_id
                    && p.status == MembershipStatus::Active
                    && role_at_least(&p.role, visibility.required_ordinal())
            })
            .count() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(user: &str, org: &str, role: &str, status: MembershipStatus) -> MemberProfile {
        MemberProfile {
            user_id: user.to_owned(),
            org_id: org.to_owned(),
            role: role.to_owned(),
            status,
        }
    }

    #[tokio::test]
    async fn eligible_count_respects_org_status_and_tier() {
        let mut dir = StaticDirectory::new();
        dir.insert(profile("u1", "org-a", "member", MembershipStatus::Active));
        dir.insert(profile("u2", "org-a", "core", MembershipStatus::Active));
        dir.insert(profile("u3", "org-a", "executive", MembershipStatus::Inactive));
        dir.insert(profile("u4", "org-b", "admin", MembershipStatus::Active));
        dir.insert(profile("u5", "org-a", "viewer", MembershipStatus::Active));

        assert_eq!(dir.eligible_member_count("org-a", Visibility::Members).await, 2);
        assert_eq!(dir.eligible_member_count("org-a", Visibility::Core).await, 1);
        assert_eq!(dir.eligible_member_count("org-a", Visibility::Executive).await, 0);
    }
}
