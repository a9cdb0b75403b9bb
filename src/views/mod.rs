//! Request handling independent of the HTTP framework
//!
//! Every view takes the database, the acting identity and the submitted
//! fields, and returns either the data to render or a [`ViewError`].

use crate::db::StoreError;
use crate::forms::FormErrors;

mod accounts;
mod groups;
mod hunches;

pub use accounts::{connect, create_account, edit_profile, invite, list_connections, show_profile, ProfileDetail};
pub use groups::{create_group, edit_group, group_index, show_group, GroupDetail};
pub use hunches::{
    add_evidence, create_hunch, destroy_hunch, edit_evidence, edit_hunch, hunch_index, join_hunch,
    list_evidence, show_hunch, HunchDetail,
};

/// Why a view refused or failed a request
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("Invalid submission: {0}")]
    Invalid(FormErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for ViewError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<StoreError>() {
            Some(StoreError::NotFound { entity, id }) => ViewError::NotFound(format!("{} {}", entity, id)),
            Some(StoreError::UnknownProfile(id)) => ViewError::NotFound(format!("user profile {}", id)),
            None => ViewError::Storage(err),
        }
    }
}

impl From<FormErrors> for ViewError {
    fn from(errors: FormErrors) -> Self {
        ViewError::Invalid(errors)
    }
}

pub type ViewResult<T> = Result<T, ViewError>;

/// Turn reference-check results into a view error when any were found
fn reject_if_any(errors: FormErrors) -> ViewResult<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ViewError::Invalid(errors))
    }
}

fn not_found(entity: &str, id: i64) -> ViewError {
    ViewError::NotFound(format!("{} {}", entity, id))
}
