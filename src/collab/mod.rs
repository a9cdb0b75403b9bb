//! Collaboration features for hunchworks
//!
//! Group membership reconciliation and invitation batches

pub mod invitations;
pub mod membership;

pub use invitations::{InvitationBatch, InvitationManager};
pub use membership::{desired_members, parse_collaborators, MembershipPlan};
