//! Group views

use serde::Serialize;
use tracing::info;

use super::hunches::require_profile;
use super::{not_found, reject_if_any, ViewError, ViewResult};
use crate::collab::desired_members;
use crate::db::{Database, GroupPage, StoreError};
use crate::forms::{FormData, FormErrors, GroupForm};
use crate::models::{Group, Identity, Membership};

#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    pub group: Group,
    pub memberships: Vec<Membership>,
}

pub fn group_index(db: &Database, page: u32, page_size: u32) -> ViewResult<GroupPage> {
    Ok(db.list_groups(page, page_size)?)
}

pub fn show_group(db: &Database, id: i64) -> ViewResult<GroupDetail> {
    let group = db.get_group(id)?.ok_or_else(|| not_found("group", id))?;
    Ok(GroupDetail {
        memberships: db.list_memberships(id)?,
        group,
    })
}

/// Create a group whose members are the submitted collaborators plus the
/// acting identity
pub fn create_group(db: &Database, identity: &Identity, data: &FormData) -> ViewResult<GroupDetail> {
    require_profile(db, identity)?;
    let form = GroupForm::bind(data)?;
    reject_if_any(form.validate_references(db, None)?)?;

    let desired = desired_members(&form.group_collaborators, identity);
    let mut group = form.to_group(0);
    db.create_group(&mut group, &desired)
        .map_err(collaborator_error)?;

    info!(group_id = group.id, creator = identity.id, "group created");
    Ok(GroupDetail {
        memberships: db.list_memberships(group.id)?,
        group,
    })
}

/// Save a group and reconcile its members with the submitted collaborators
pub fn edit_group(db: &Database, identity: &Identity, id: i64, data: &FormData) -> ViewResult<GroupDetail> {
    require_profile(db, identity)?;
    if db.get_group(id)?.is_none() {
        return Err(not_found("group", id));
    }
    let form = GroupForm::bind(data)?;
    reject_if_any(form.validate_references(db, Some(id))?)?;

    let desired = desired_members(&form.group_collaborators, identity);
    let group = form.to_group(id);
    let plan = db.update_group(&group, &desired).map_err(collaborator_error)?;

    info!(
        group_id = id,
        editor = identity.id,
        added = plan.to_add.len(),
        removed = plan.to_remove.len(),
        "group edited"
    );
    Ok(GroupDetail {
        memberships: db.list_memberships(id)?,
        group,
    })
}

/// Report an unknown collaborator against the field that named it. The
/// actor's own profile is checked before this can happen.
fn collaborator_error(err: anyhow::Error) -> ViewError {
    if let Some(StoreError::UnknownProfile(id)) = err.downcast_ref::<StoreError>() {
        let mut errors = FormErrors::default();
        errors.add("group_collaborators", format!("No user profile with id {}.", id));
        return ViewError::Invalid(errors);
    }
    ViewError::from(err)
}
