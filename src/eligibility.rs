//! Vote eligibility resolver.
//!
//! A pure predicate evaluated on every vote attempt; it never mutates state.
//! Rules run in a fixed order so callers always see the most fundamental
//! failure first: organisation, then membership status, then role rank.

use crate::db::schema::Poll;
use crate::directory::{MemberProfile, MembershipStatus};
use crate::error::{EngineError, EngineResult};
use crate::roles::role_at_least;

/// Decide whether `profile` may vote on `poll`.
///
/// Returns the first failing rule as its distinct error, or `Ok(())` when the
/// user is eligible.
pub fn check_eligibility(profile: &MemberProfile, poll: &Poll) -> EngineResult<()> {
    if profile.org_id != poll.id_org {
        return Err(EngineError::NotMember);
    }

    if profile.status != MembershipStatus::Active {
        return Err(EngineError::NotActive);
    }

    if !role_at_least(&profile.role, poll.visibility.required_ordinal()) {
        return Err(EngineError::RoleTooLow);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::db::schema::{PollKind, VotingMethod};
    use crate::roles::{role_ordinal, Visibility};

    fn poll(org: &str, visibility: Visibility) -> Poll {
        Poll {
            id: 1,
            time_created: Utc::now(),
            id_org: org.to_owned(),
            id_created_by: "admin-1".to_owned(),
            open: true,
            title: "test".to_owned(),
            description: String::new(),
            kind: PollKind::Informal,
            visibility,
            voting_method: VotingMethod::Identifiable,
            quorum_percentage: None,
            end_time: None,
            final_results: None,
            options: Vec::new(),
        }
    }

    fn profile(org: &str, role: &str, status: MembershipStatus) -> MemberProfile {
        MemberProfile {
            user_id: "user-1".to_owned(),
            org_id: org.to_owned(),
            role: role.to_owned(),
            status,
        }
    }

    #[test]
    fn wrong_org_is_rejected_before_anything_else() {
        // Inactive and under-ranked too, but org mismatch must win.
        let p = poll("org-a", Visibility::Executive);
        let u = profile("org-b", "viewer", MembershipStatus::Inactive);

        assert!(matches!(check_eligibility(&u, &p), Err(EngineError::NotMember)));
    }

    #[test]
    fn inactive_member_is_rejected() {
        let p = poll("org-a", Visibility::Members);
        let u = profile("org-a", "admin", MembershipStatus::Inactive);

        assert!(matches!(check_eligibility(&u, &p), Err(EngineError::NotActive)));
    }

    #[test]
    fn role_below_visibility_is_rejected() {
        let p = poll("org-a", Visibility::Executive);
        let u = profile("org-a", "member", MembershipStatus::Active);

        assert!(matches!(check_eligibility(&u, &p), Err(EngineError::RoleTooLow)));
    }

    #[test]
    fn eligible_member_passes() {
        let p = poll("org-a", Visibility::Volunteer);
        let u = profile("org-a", "core", MembershipStatus::Active);

        assert!(check_eligibility(&u, &p).is_ok());
    }

    #[test]
    fn unknown_role_fails_closed() {
        let p = poll("org-a", Visibility::Members);
        let u = profile("org-a", "owner", MembershipStatus::Active);

        assert!(matches!(check_eligibility(&u, &p), Err(EngineError::RoleTooLow)));
    }

    #[test]
    fn eligibility_is_monotonic_in_role_ordinal() {
        let roles = ["viewer", "member", "volunteer", "core", "executive", "editor", "admin"];
        let tiers = [
            Visibility::Members,
            Visibility::Volunteer,
            Visibility::Core,
            Visibility::Executive,
        ];

        for tier in tiers {
            let p = poll("org-a", tier);
            for pair in roles.windows(2) {
                let lower = profile("org-a", pair[0], MembershipStatus::Active);
                let higher = profile("org-a", pair[1], MembershipStatus::Active);

                // If the lower role is eligible, every higher role must be too.
                if check_eligibility(&lower, &p).is_ok() {
                    assert!(check_eligibility(&higher, &p).is_ok());
                }
                assert!(role_ordinal(pair[0]) < role_ordinal(pair[1]));
            }
        }
    }
}
