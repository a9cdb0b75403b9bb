// Integration tests for group creation, editing and member reconciliation

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use hunchworks::config::HunchworksPaths;
use hunchworks::db::Database;
use hunchworks::forms::FormData;
use hunchworks::models::Identity;
use hunchworks::views::{self, ViewError};
use tempfile::TempDir;

fn setup() -> Result<(TempDir, Database)> {
    let temp_dir = TempDir::new()?;
    let paths = HunchworksPaths::at(temp_dir.path());
    paths.ensure_dirs()?;
    let db = Database::init(&paths)?;
    Ok((temp_dir, db))
}

fn account(db: &Database, username: &str) -> Result<i64> {
    let (account, _) = db.create_account(username, "")?;
    Ok(account.id)
}

fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn members(db: &Database, group_id: i64) -> Result<BTreeSet<i64>> {
    Ok(db
        .list_memberships(group_id)?
        .into_iter()
        .map(|m| m.user_profile_id)
        .collect())
}

#[test]
fn test_create_adds_actor_and_collaborators() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;
    let b = account(&db, "ben")?;
    let c = account(&db, "cho")?;

    let collaborators = format!("{},{}", b, c);
    let detail = views::create_group(
        &db,
        &Identity::new(a),
        &form(&[("name", "Rainfall watchers"), ("group_collaborators", collaborators.as_str())]),
    )?;

    assert_eq!(members(&db, detail.group.id)?, BTreeSet::from([a, b, c]));
    for membership in &detail.memberships {
        assert_eq!(membership.access_level, 0);
        assert_eq!(membership.status, 0);
    }
    Ok(())
}

#[test]
fn test_edit_reconciles_members() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;
    let b = account(&db, "ben")?;
    let c = account(&db, "cho")?;
    let d = account(&db, "dev")?;
    let e = account(&db, "eli")?;

    let collaborators = format!("{},{}", b, c);
    let created = views::create_group(
        &db,
        &Identity::new(a),
        &form(&[("name", "Analysts"), ("group_collaborators", collaborators.as_str())]),
    )?;
    let group_id = created.group.id;
    let before: BTreeMap<i64, i64> = created
        .memberships
        .iter()
        .map(|m| (m.user_profile_id, m.id))
        .collect();

    let collaborators = format!("{},{},{}", b, c, d);
    let edited = views::edit_group(
        &db,
        &Identity::new(e),
        group_id,
        &form(&[("name", "Analysts"), ("group_collaborators", collaborators.as_str())]),
    )?;

    assert_eq!(members(&db, group_id)?, BTreeSet::from([b, c, d, e]));
    let after: BTreeMap<i64, i64> = edited
        .memberships
        .iter()
        .map(|m| (m.user_profile_id, m.id))
        .collect();
    assert_eq!(after[&b], before[&b]);
    assert_eq!(after[&c], before[&c]);
    assert!(!after.contains_key(&a));
    Ok(())
}

#[test]
fn test_non_numeric_tokens_are_ignored() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;
    let b = account(&db, "ben")?;
    let d = account(&db, "dev")?;

    let collaborators = format!("{},abc,{}", b, d);
    let detail = views::create_group(
        &db,
        &Identity::new(a),
        &form(&[("name", "Mixed input"), ("group_collaborators", collaborators.as_str())]),
    )?;

    assert_eq!(members(&db, detail.group.id)?, BTreeSet::from([a, b, d]));
    Ok(())
}

#[test]
fn test_duplicate_ids_create_one_row() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;
    let b = account(&db, "ben")?;

    let collaborators = format!("{},{},{}", b, b, a);
    let detail = views::create_group(
        &db,
        &Identity::new(a),
        &form(&[("name", "Echo"), ("group_collaborators", collaborators.as_str())]),
    )?;

    assert_eq!(detail.memberships.len(), 2);
    Ok(())
}

#[test]
fn test_unknown_profile_rolls_back_edit() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;
    let b = account(&db, "ben")?;

    let collaborators = b.to_string();
    let created = views::create_group(
        &db,
        &Identity::new(a),
        &form(&[("name", "Before"), ("group_collaborators", collaborators.as_str())]),
    )?;
    let group_id = created.group.id;

    let result = views::edit_group(
        &db,
        &Identity::new(a),
        group_id,
        &form(&[("name", "After"), ("group_collaborators", "999")]),
    );

    match result {
        Err(ViewError::Invalid(errors)) => assert!(errors.has("group_collaborators")),
        other => panic!("expected invalid collaborators, got {:?}", other),
    }
    assert_eq!(members(&db, group_id)?, BTreeSet::from([a, b]));
    let group = db.get_group(group_id)?.expect("group still exists");
    assert_eq!(group.name, "Before");
    Ok(())
}

#[test]
fn test_unknown_profile_creates_no_group() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;

    let result = views::create_group(
        &db,
        &Identity::new(a),
        &form(&[("name", "Ghosts"), ("group_collaborators", "424242")]),
    );

    assert!(matches!(result, Err(ViewError::Invalid(_))));
    assert_eq!(db.list_groups(1, 20)?.total, 0);
    Ok(())
}

#[test]
fn test_actor_without_profile_is_not_found() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;
    let stranger = Identity::new(4040);

    let result = views::create_group(&db, &stranger, &form(&[("name", "Orphans")]));
    assert!(matches!(result, Err(ViewError::NotFound(_))));
    assert_eq!(db.list_groups(1, 20)?.total, 0);

    let created = views::create_group(&db, &Identity::new(a), &form(&[("name", "Owned")]))?;
    let result = views::edit_group(&db, &stranger, created.group.id, &form(&[("name", "Taken")]));
    assert!(matches!(result, Err(ViewError::NotFound(_))));
    assert_eq!(members(&db, created.group.id)?, BTreeSet::from([a]));
    Ok(())
}

#[test]
fn test_existing_row_with_custom_access_is_kept() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;
    let b = account(&db, "ben")?;

    let created = views::create_group(&db, &Identity::new(a), &form(&[("name", "Admins")]))?;
    let group_id = created.group.id;
    let custom = db.add_membership(group_id, b, 2, 1)?;

    let collaborators = b.to_string();
    views::edit_group(
        &db,
        &Identity::new(a),
        group_id,
        &form(&[("name", "Admins"), ("group_collaborators", collaborators.as_str())]),
    )?;

    let rows = db.list_memberships(group_id)?;
    assert_eq!(rows.len(), 2);
    let kept = rows
        .iter()
        .find(|m| m.user_profile_id == b)
        .expect("row for b");
    assert_eq!(kept.id, custom.id);
    assert_eq!(kept.access_level, 2);
    assert_eq!(kept.status, 1);
    Ok(())
}

#[test]
fn test_duplicate_group_name_is_a_field_error() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;

    views::create_group(&db, &Identity::new(a), &form(&[("name", "Twins")]))?;
    let result = views::create_group(&db, &Identity::new(a), &form(&[("name", "Twins")]));

    match result {
        Err(ViewError::Invalid(errors)) => assert!(errors.has("name")),
        other => panic!("expected duplicate name error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_edit_missing_group_is_not_found() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;

    let result = views::edit_group(&db, &Identity::new(a), 77, &form(&[("name", "Nowhere")]));
    assert!(matches!(result, Err(ViewError::NotFound(_))));
    Ok(())
}

#[test]
fn test_group_index_pages() -> Result<()> {
    let (_temp, db) = setup()?;
    let a = account(&db, "ana")?;

    for i in 0..25 {
        let name = format!("Group {:02}", i);
        views::create_group(&db, &Identity::new(a), &form(&[("name", name.as_str())]))?;
    }

    let first = views::group_index(&db, 1, 20)?;
    assert_eq!(first.groups.len(), 20);
    assert_eq!(first.total, 25);
    assert_eq!(first.page_count(), 2);

    let second = views::group_index(&db, 2, 20)?;
    assert_eq!(second.groups.len(), 5);
    assert_eq!(second.groups[0].name, "Group 20");

    let past_end = views::group_index(&db, 3, 20)?;
    assert!(past_end.groups.is_empty());
    Ok(())
}
