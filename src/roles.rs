//! Role hierarchy table.
//!
//! The single ordinal mapping consulted by every privilege comparison in the
//! engine. Call sites must never re-encode role names or ordinals.

use std::collections::HashMap;

use once_cell::sync::Lazy;

static ROLE_ORDINALS: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert("viewer", 0);
    map.insert("member", 1);
    map.insert("volunteer", 2);
    map.insert("core", 3);
    map.insert("executive", 4);
    map.insert("editor", 5);
    map.insert("admin", 6);

    map
});

/// Ordinal rank of a role name. Unknown roles resolve to 0 (fail-closed).
pub fn role_ordinal(role: &str) -> u8 {
    ROLE_ORDINALS.get(role).copied().unwrap_or(0)
}

/// Whether `role` ranks at least as high as `required_ordinal`.
pub fn role_at_least(role: &str, required_ordinal: u8) -> bool {
    role_ordinal(role) >= required_ordinal
}

/// Whether `role` may create and close polls for its organisation.
pub fn can_manage_polls(role: &str) -> bool {
    matches!(role, "admin" | "editor")
}

/// Minimum role tier a poll is visible (and votable) to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    Members,
    Volunteer,
    Core,
    Executive,
}

impl Visibility {
    /// Role ordinal required to vote on a poll at this tier.
    pub fn required_ordinal(&self) -> u8 {
        match self {
            Visibility::Members => 1,
            Visibility::Volunteer => 2,
            Visibility::Core => 3,
            Visibility::Executive => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_strictly_increasing() {
        let order = ["viewer", "member", "volunteer", "core", "executive", "editor", "admin"];

        for pair in order.windows(2) {
            assert!(role_ordinal(pair[0]) < role_ordinal(pair[1]));
        }
    }

    #[test]
    fn unknown_role_resolves_to_lowest() {
        assert_eq!(role_ordinal("superuser"), 0);
        assert_eq!(role_ordinal(""), 0);
        assert!(!role_at_least("superuser", 1));
    }

    #[test]
    fn only_admin_and_editor_manage_polls() {
        assert!(can_manage_polls("admin"));
        assert!(can_manage_polls("editor"));
        assert!(!can_manage_polls("executive"));
        assert!(!can_manage_polls("member"));
        assert!(!can_manage_polls("administrator"));
    }

    #[test]
    fn visibility_tiers_map_to_role_ordinals() {
        assert_eq!(Visibility::Members.required_ordinal(), role_ordinal("member"));
        assert_eq!(Visibility::Volunteer.required_ordinal(), role_ordinal("volunteer"));
        assert_eq!(Visibility::Core.required_ordinal(), role_ordinal("core"));
        assert_eq!(Visibility::Executive.required_ordinal(), role_ordinal("executive"));
    }
}
