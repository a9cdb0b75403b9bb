//! Hunch and evidence views

use serde::Serialize;
use tracing::{info, warn};

use super::{not_found, reject_if_any, ViewError, ViewResult};
use crate::db::Database;
use crate::forms::{EvidenceForm, FormData, HunchForm};
use crate::models::{Evidence, Hunch, HunchUser, Identity, DEFAULT_STATUS};

/// A hunch with everything its page shows
#[derive(Debug, Clone, Serialize)]
pub struct HunchDetail {
    pub hunch: Hunch,
    pub evidence: Vec<Evidence>,
    pub participants: Vec<HunchUser>,
    pub editable: bool,
    pub joinable: bool,
}

/// Hunches the identity may see, most recently modified first
pub fn hunch_index(db: &Database, identity: &Identity) -> ViewResult<Vec<Hunch>> {
    let hunches = db
        .list_hunches()?
        .into_iter()
        .filter(|h| h.is_viewable_by(identity))
        .collect();
    Ok(hunches)
}

pub fn show_hunch(db: &Database, identity: &Identity, id: i64) -> ViewResult<HunchDetail> {
    let hunch = load_viewable(db, identity, id)?;
    Ok(HunchDetail {
        evidence: db.list_evidence(id)?,
        participants: db.list_hunch_users(id)?,
        editable: hunch.is_editable_by(identity),
        joinable: hunch.is_joinable_by(identity),
        hunch,
    })
}

/// Create a hunch owned by the acting identity
pub fn create_hunch(db: &Database, identity: &Identity, data: &FormData) -> ViewResult<Hunch> {
    require_profile(db, identity)?;
    let form = HunchForm::bind(data)?;
    reject_if_any(form.validate_references(db)?)?;

    let mut hunch = Hunch::new(*identity, form.title.clone(), form.description.clone(), form.language_id);
    form.apply_to(&mut hunch);
    let id = db.save_hunch(&mut hunch)?;

    info!(hunch_id = id, creator = identity.id, "created hunch");
    Ok(hunch)
}

pub fn edit_hunch(db: &Database, identity: &Identity, id: i64, data: &FormData) -> ViewResult<Hunch> {
    let mut hunch = load_editable(db, identity, id)?;
    let form = HunchForm::bind(data)?;
    reject_if_any(form.validate_references(db)?)?;

    form.apply_to(&mut hunch);
    db.save_hunch(&mut hunch)?;

    info!(hunch_id = id, "updated hunch");
    Ok(hunch)
}

pub fn destroy_hunch(db: &Database, identity: &Identity, id: i64) -> ViewResult<()> {
    load_editable(db, identity, id)?;
    db.delete_hunch(id)?;
    info!(hunch_id = id, "deleted hunch");
    Ok(())
}

/// Add the identity as a participant. Joining twice returns the existing
/// participation.
pub fn join_hunch(db: &Database, identity: &Identity, id: i64) -> ViewResult<HunchUser> {
    require_profile(db, identity)?;
    let hunch = load_viewable(db, identity, id)?;
    if !hunch.is_joinable_by(identity) {
        return Err(ViewError::Forbidden(format!(
            "hunch {} is not open to new participants",
            id
        )));
    }

    if let Some(existing) = db
        .list_hunch_users(id)?
        .into_iter()
        .find(|u| u.user_profile_id == identity.id)
    {
        return Ok(existing);
    }

    let participant = db.add_hunch_user(id, identity.id, DEFAULT_STATUS)?;
    info!(hunch_id = id, profile = identity.id, "joined hunch");
    Ok(participant)
}

pub fn list_evidence(db: &Database, identity: &Identity, hunch_id: i64) -> ViewResult<Vec<Evidence>> {
    load_viewable(db, identity, hunch_id)?;
    Ok(db.list_evidence(hunch_id)?)
}

/// Attach evidence to a hunch the identity participates in. Open hunches
/// accept evidence from anyone; closed ones only from their participants.
pub fn add_evidence(
    db: &Database,
    identity: &Identity,
    hunch_id: i64,
    data: &FormData,
) -> ViewResult<Evidence> {
    require_profile(db, identity)?;
    let hunch = load_viewable(db, identity, hunch_id)?;
    if !hunch.is_joinable_by(identity) && !db.is_hunch_user(hunch_id, identity.id)? {
        warn!(hunch_id, identity = identity.id, "refused evidence from non-participant");
        return Err(ViewError::Forbidden(format!(
            "only participants may add evidence to hunch {}",
            hunch_id
        )));
    }
    let form = EvidenceForm::bind(data)?;
    reject_if_any(form.validate_references(db)?)?;

    let mut evidence = Evidence::new(hunch_id, *identity, form.strength, form.description.clone());
    form.apply_to(&mut evidence);
    let id = db.save_evidence(&mut evidence)?;

    info!(evidence_id = id, hunch_id, "added evidence");
    Ok(evidence)
}

pub fn edit_evidence(db: &Database, identity: &Identity, id: i64, data: &FormData) -> ViewResult<Evidence> {
    let mut evidence = db.get_evidence(id)?.ok_or_else(|| not_found("evidence", id))?;
    if !evidence.is_editable_by(identity) {
        warn!(evidence_id = id, identity = identity.id, "refused evidence edit");
        return Err(ViewError::Forbidden(format!("evidence {} belongs to another user", id)));
    }

    let form = EvidenceForm::bind(data)?;
    reject_if_any(form.validate_references(db)?)?;
    form.apply_to(&mut evidence);
    db.save_evidence(&mut evidence)?;
    Ok(evidence)
}

fn load_viewable(db: &Database, identity: &Identity, id: i64) -> ViewResult<Hunch> {
    let hunch = db.get_hunch(id)?.ok_or_else(|| not_found("hunch", id))?;
    if !hunch.is_viewable_by(identity) {
        warn!(hunch_id = id, identity = identity.id, "refused hidden hunch");
        return Err(ViewError::Forbidden(format!("hunch {} is hidden", id)));
    }
    Ok(hunch)
}

fn load_editable(db: &Database, identity: &Identity, id: i64) -> ViewResult<Hunch> {
    let hunch = db.get_hunch(id)?.ok_or_else(|| not_found("hunch", id))?;
    if !hunch.is_editable_by(identity) {
        warn!(hunch_id = id, identity = identity.id, "refused hunch edit");
        return Err(ViewError::Forbidden(format!("only the creator may change hunch {}", id)));
    }
    Ok(hunch)
}

pub(super) fn require_profile(db: &Database, identity: &Identity) -> ViewResult<()> {
    if db.profile_exists(identity.id)? {
        Ok(())
    } else {
        Err(not_found("user profile", identity.id))
    }
}
