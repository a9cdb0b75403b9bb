//! Group membership reconciliation
//!
//! A group form submits its collaborators as a comma-separated list of
//! account ids. The acting identity is always part of the result. The plan
//! below turns that list into the row creations and deletions needed to make
//! the stored membership equal the submitted set.

use std::collections::BTreeSet;

use crate::models::{Identity, Membership};

/// Parse a submitted collaborator list.
///
/// Tokens are split on `,` and kept only when they are made of ASCII digits
/// and fit an `i64`. Tokens are not trimmed, so `" 4"` is dropped. Anything
/// else is discarded without error.
pub fn parse_collaborators(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|token| token.parse::<i64>().ok())
        .collect()
}

/// The full desired member set: the parsed list plus the acting identity
pub fn desired_members(raw: &str, acting: &Identity) -> BTreeSet<i64> {
    let mut desired: BTreeSet<i64> = parse_collaborators(raw).into_iter().collect();
    desired.insert(acting.id);
    desired
}

/// Creations and deletions that bring a group's membership rows in line
/// with a desired member set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipPlan {
    /// Profiles that need a new row
    pub to_add: BTreeSet<i64>,
    /// Membership row ids to delete
    pub to_remove: Vec<i64>,
}

impl MembershipPlan {
    /// Plan for a group with no prior membership
    pub fn for_new_group(desired: &BTreeSet<i64>) -> Self {
        Self {
            to_add: desired.clone(),
            to_remove: Vec::new(),
        }
    }

    /// Plan against existing rows.
    ///
    /// Rows whose profile is still desired are left alone whatever their
    /// access level or status, so no duplicate is created for them.
    pub fn between(existing: &[Membership], desired: &BTreeSet<i64>) -> Self {
        let present: BTreeSet<i64> = existing.iter().map(|m| m.user_profile_id).collect();

        let to_add = desired.difference(&present).copied().collect();
        let to_remove = existing
            .iter()
            .filter(|m| !desired.contains(&m.user_profile_id))
            .map(|m| m.id)
            .collect();

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, profile: i64, access_level: i64) -> Membership {
        Membership {
            id,
            user_profile_id: profile,
            group_id: 1,
            access_level,
            status: 0,
        }
    }

    #[test]
    fn parse_discards_non_numeric_tokens() {
        assert_eq!(parse_collaborators("2,abc,4"), vec![2, 4]);
        assert_eq!(parse_collaborators("2,4"), vec![2, 4]);
        assert_eq!(parse_collaborators(""), Vec::<i64>::new());
        assert_eq!(parse_collaborators("1,,2,"), vec![1, 2]);
    }

    #[test]
    fn parse_does_not_trim() {
        assert_eq!(parse_collaborators("1, 2,3 "), vec![1]);
        assert_eq!(parse_collaborators("-5,+6"), Vec::<i64>::new());
    }

    #[test]
    fn parse_drops_ids_that_overflow() {
        assert_eq!(parse_collaborators("99999999999999999999,3"), vec![3]);
    }

    #[test]
    fn desired_always_contains_actor() {
        let desired = desired_members("", &Identity::new(9));
        assert_eq!(desired.into_iter().collect::<Vec<_>>(), vec![9]);

        let desired = desired_members("9,9,3", &Identity::new(9));
        assert_eq!(desired.into_iter().collect::<Vec<_>>(), vec![3, 9]);
    }

    #[test]
    fn plan_adds_missing_and_removes_extra() {
        // A=1, B=2, C=3 exist; "2,3,4" submitted by 5
        let existing = vec![row(10, 1, 0), row(11, 2, 0), row(12, 3, 0)];
        let desired = desired_members("2,3,4", &Identity::new(5));

        let plan = MembershipPlan::between(&existing, &desired);
        assert_eq!(plan.to_add.into_iter().collect::<Vec<_>>(), vec![4, 5]);
        assert_eq!(plan.to_remove, vec![10]);
    }

    #[test]
    fn plan_keeps_rows_with_other_access_levels() {
        let existing = vec![row(10, 1, 2)];
        let desired = desired_members("", &Identity::new(1));

        let plan = MembershipPlan::between(&existing, &desired);
        assert!(plan.is_empty());
    }

    #[test]
    fn plan_removes_every_duplicate_of_a_dropped_profile() {
        let existing = vec![row(10, 1, 0), row(11, 1, 1), row(12, 2, 0)];
        let desired = desired_members("", &Identity::new(2));

        let plan = MembershipPlan::between(&existing, &desired);
        assert_eq!(plan.to_remove, vec![10, 11]);
        assert!(plan.to_add.is_empty());
    }

    #[test]
    fn new_group_plan_creates_everything() {
        let desired = desired_members("3,4", &Identity::new(1));
        let plan = MembershipPlan::for_new_group(&desired);
        assert_eq!(plan.to_add.len(), 3);
        assert!(plan.to_remove.is_empty());
    }
}
