//! Account, profile, connection and invitation views

use anyhow::anyhow;
use serde::Serialize;
use tracing::info;

use super::hunches::require_profile;
use super::{not_found, reject_if_any, ViewError, ViewResult};
use crate::collab::{InvitationBatch, InvitationManager};
use crate::db::Database;
use crate::forms::{AccountForm, FormData, FormErrors, InvitePeopleForm, ProfileForm, INVALID_INTEGER, REQUIRED};
use crate::models::{Account, Connection, Identity, Skill, UserProfile, DEFAULT_STATUS};

#[derive(Debug, Clone, Serialize)]
pub struct ProfileDetail {
    pub account: Account,
    pub profile: UserProfile,
    pub skills: Vec<Skill>,
    pub connections: Vec<Connection>,
}

/// Register an account; its profile is created in the same step
pub fn create_account(db: &Database, data: &FormData) -> ViewResult<(Account, UserProfile)> {
    let form = AccountForm::bind(data)?;
    if db.username_taken(&form.username)? {
        let mut errors = FormErrors::default();
        errors.add("username", "A user with that username already exists.");
        return Err(ViewError::Invalid(errors));
    }
    Ok(db.create_account(&form.username, &form.email)?)
}

pub fn show_profile(db: &Database, account_id: i64) -> ViewResult<ProfileDetail> {
    let account = db
        .get_account(account_id)?
        .ok_or_else(|| not_found("account", account_id))?;
    let profile = db
        .get_profile(account_id)?
        .ok_or_else(|| not_found("user profile", account_id))?;

    Ok(ProfileDetail {
        skills: db.list_profile_skills(account_id)?,
        connections: db.list_connections(account_id)?,
        account,
        profile,
    })
}

/// Users may only edit their own profile
pub fn edit_profile(
    db: &Database,
    identity: &Identity,
    account_id: i64,
    data: &FormData,
) -> ViewResult<UserProfile> {
    if identity.id != account_id {
        return Err(ViewError::Forbidden(format!(
            "profile {} belongs to another user",
            account_id
        )));
    }
    let mut profile = db
        .get_profile(account_id)?
        .ok_or_else(|| not_found("user profile", account_id))?;

    let form = ProfileForm::bind(data)?;
    reject_if_any(form.validate_references(db)?)?;
    form.apply_to(&mut profile);
    db.update_profile(&profile)?;

    info!(account_id, "updated profile");
    Ok(profile)
}

/// Record a one-way connection from the identity to `other_user_profile`
pub fn connect(db: &Database, identity: &Identity, data: &FormData) -> ViewResult<Connection> {
    require_profile(db, identity)?;

    let mut errors = FormErrors::default();
    let other = match data.get("other_user_profile").map(|v| v.trim()) {
        None | Some("") => {
            errors.add("other_user_profile", REQUIRED);
            None
        }
        Some(raw) => match raw.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add("other_user_profile", INVALID_INTEGER);
                None
            }
        },
    };
    let Some(other) = other else {
        return Err(ViewError::Invalid(errors));
    };
    if !db.profile_exists(other)? {
        errors.add("other_user_profile", format!("No user profile with id {}.", other));
        return Err(ViewError::Invalid(errors));
    }

    let connection = db.create_connection(identity.id, other, DEFAULT_STATUS)?;
    info!(from = identity.id, to = other, "connected profiles");
    Ok(connection)
}

pub fn list_connections(db: &Database, identity: &Identity) -> ViewResult<Vec<Connection>> {
    Ok(db.list_connections(identity.id)?)
}

/// Record one invitation per submitted address on behalf of `inviter`
pub fn invite(db: &Database, inviter: &Identity, data: &FormData) -> ViewResult<InvitationBatch> {
    let form = InvitePeopleForm::bind(data)?;
    if db.get_account(inviter.id)?.is_none() {
        return Err(ViewError::Storage(anyhow!(
            "Inviting account {} does not exist",
            inviter.id
        )));
    }
    Ok(InvitationManager::record(db, inviter, &form.invited_emails, None)?)
}
