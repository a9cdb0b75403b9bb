// Integration tests for accounts, profiles and connections

use anyhow::Result;
use hunchworks::config::HunchworksPaths;
use hunchworks::db::Database;
use hunchworks::forms::FormData;
use hunchworks::models::{Identity, PrivacyLevel, UserTitle};
use hunchworks::views::{self, ViewError};
use tempfile::TempDir;

fn setup() -> Result<(TempDir, Database)> {
    let temp_dir = TempDir::new()?;
    let paths = HunchworksPaths::at(temp_dir.path());
    paths.ensure_dirs()?;
    let db = Database::init(&paths)?;
    Ok((temp_dir, db))
}

fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_account_gets_exactly_one_profile() -> Result<()> {
    let (_temp, db) = setup()?;
    let (mut account, profile) =
        views::create_account(&db, &form(&[("username", "ana"), ("email", "ana@example.org")]))?;

    assert_eq!(profile.account_id, account.id);
    assert_eq!(db.count_profiles(account.id)?, 1);

    for email in ["a@example.org", "b@example.org", "c@example.org"] {
        account.email = email.to_string();
        db.update_account(&account)?;
    }

    assert_eq!(db.count_profiles(account.id)?, 1);
    let stored = db.get_account(account.id)?.expect("account exists");
    assert_eq!(stored.email, "c@example.org");
    Ok(())
}

#[test]
fn test_duplicate_username_is_rejected() -> Result<()> {
    let (_temp, db) = setup()?;
    views::create_account(&db, &form(&[("username", "ana")]))?;

    match views::create_account(&db, &form(&[("username", "ana")])) {
        Err(ViewError::Invalid(errors)) => assert!(errors.has("username")),
        other => panic!("expected duplicate username error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_profile_edit_by_owner_only() -> Result<()> {
    let (_temp, db) = setup()?;
    let (ana, _) = db.create_account("ana", "")?;
    let (ben, _) = db.create_account("ben", "")?;

    let data = form(&[
        ("title", "3"),
        ("privacy", "2"),
        ("bio_text", "Epidemiologist"),
        ("screen_name", "ana_k"),
    ]);

    let denied = views::edit_profile(&db, &Identity::new(ben.id), ana.id, &data);
    assert!(matches!(denied, Err(ViewError::Forbidden(_))));

    let profile = views::edit_profile(&db, &Identity::new(ana.id), ana.id, &data)?;
    assert_eq!(profile.title, UserTitle::Dr);
    assert_eq!(profile.privacy, PrivacyLevel::Open);

    let stored = db.get_profile(ana.id)?.expect("profile exists");
    assert_eq!(stored.bio_text, "Epidemiologist");
    assert_eq!(stored.screen_name, "ana_k");
    assert_eq!(db.count_profiles(ana.id)?, 1);
    Ok(())
}

#[test]
fn test_profile_field_lengths_are_checked() -> Result<()> {
    let (_temp, db) = setup()?;
    let (ana, _) = db.create_account("ana", "")?;
    let phone = "5".repeat(21);

    let result = views::edit_profile(&db, &Identity::new(ana.id), ana.id, &form(&[("phone", phone.as_str())]));
    match result {
        Err(ViewError::Invalid(errors)) => assert!(errors.has("phone")),
        other => panic!("expected invalid phone, got {:?}", other),
    }
    assert_eq!(db.get_profile(ana.id)?.expect("profile exists").phone, "");
    Ok(())
}

#[test]
fn test_connections_are_directed() -> Result<()> {
    let (_temp, db) = setup()?;
    let (ana, _) = db.create_account("ana", "")?;
    let (ben, _) = db.create_account("ben", "")?;
    let target = ben.id.to_string();

    let connection = views::connect(
        &db,
        &Identity::new(ana.id),
        &form(&[("other_user_profile", target.as_str())]),
    )?;
    assert_eq!(connection.user_profile_id, ana.id);
    assert_eq!(connection.other_user_profile_id, ben.id);
    assert_eq!(connection.status, 0);

    assert_eq!(views::list_connections(&db, &Identity::new(ana.id))?.len(), 1);
    assert!(views::list_connections(&db, &Identity::new(ben.id))?.is_empty());

    let unknown = views::connect(&db, &Identity::new(ana.id), &form(&[("other_user_profile", "999")]));
    assert!(matches!(unknown, Err(ViewError::Invalid(_))));
    Ok(())
}

#[test]
fn test_profile_shows_skills() -> Result<()> {
    let (_temp, db) = setup()?;
    let (ana, _) = db.create_account("ana", "")?;
    let swahili = db.ensure_skill("Swahili", true, false)?;
    let gis = db.ensure_skill("GIS", false, true)?;

    db.set_profile_skills(ana.id, &[swahili.id, gis.id])?;
    let detail = views::show_profile(&db, ana.id)?;

    let names: Vec<&str> = detail.skills.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["GIS", "Swahili"]);
    Ok(())
}

#[test]
fn test_missing_profile_is_not_found() -> Result<()> {
    let (_temp, db) = setup()?;
    assert!(matches!(views::show_profile(&db, 5), Err(ViewError::NotFound(_))));
    Ok(())
}
