// Integration tests for hunches, participation and evidence

use std::thread::sleep;
use std::time::Duration;

use anyhow::Result;
use hunchworks::config::HunchworksPaths;
use hunchworks::db::{Database, DEFAULT_LANGUAGE};
use hunchworks::forms::FormData;
use hunchworks::models::{HunchStatus, Identity, PrivacyLevel};
use hunchworks::views::{self, ViewError};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    db: Database,
    creator: Identity,
    other: Identity,
    language_id: String,
}

fn setup() -> Result<Fixture> {
    let temp_dir = TempDir::new()?;
    let paths = HunchworksPaths::at(temp_dir.path());
    paths.ensure_dirs()?;
    let db = Database::init(&paths)?;

    let (creator, _) = db.create_account("ana", "ana@example.org")?;
    let (other, _) = db.create_account("ben", "ben@example.org")?;
    let language_id = db.ensure_language(DEFAULT_LANGUAGE)?.id.to_string();

    Ok(Fixture {
        _temp: temp_dir,
        db,
        creator: Identity::new(creator.id),
        other: Identity::new(other.id),
        language_id,
    })
}

fn form(pairs: &[(&str, &str)]) -> FormData {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn hunch_form(fx: &Fixture, title: &str, privacy: PrivacyLevel) -> FormData {
    let privacy = privacy.code().to_string();
    form(&[
        ("title", title),
        ("description", "Observed in three districts"),
        ("language", fx.language_id.as_str()),
        ("privacy", privacy.as_str()),
    ])
}

#[test]
fn test_new_hunch_timestamps_match() -> Result<()> {
    let fx = setup()?;
    let hunch = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Prices", PrivacyLevel::Open))?;

    let stored = fx.db.get_hunch(hunch.id.expect("saved"))?.expect("hunch exists");
    assert_eq!(stored.time_created, stored.time_modified);
    assert_eq!(stored.status, HunchStatus::Active);
    assert_eq!(stored.creator_id, fx.creator.id);
    Ok(())
}

#[test]
fn test_edit_moves_only_modified_time() -> Result<()> {
    let fx = setup()?;
    let hunch = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Prices", PrivacyLevel::Open))?;
    let id = hunch.id.expect("saved");
    let original = fx.db.get_hunch(id)?.expect("hunch exists");

    sleep(Duration::from_millis(5));
    views::edit_hunch(&fx.db, &fx.creator, id, &hunch_form(&fx, "Prices rising", PrivacyLevel::Open))?;

    let updated = fx.db.get_hunch(id)?.expect("hunch exists");
    assert_eq!(updated.title, "Prices rising");
    assert_eq!(updated.time_created, original.time_created);
    assert!(updated.time_modified > original.time_modified);
    Ok(())
}

#[test]
fn test_hidden_hunch_only_visible_to_creator() -> Result<()> {
    let fx = setup()?;
    let hidden = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Secret", PrivacyLevel::Hidden))?;
    views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Public", PrivacyLevel::Closed))?;
    let hidden_id = hidden.id.expect("saved");

    assert_eq!(views::hunch_index(&fx.db, &fx.creator)?.len(), 2);
    let seen_by_other = views::hunch_index(&fx.db, &fx.other)?;
    assert_eq!(seen_by_other.len(), 1);
    assert_eq!(seen_by_other[0].title, "Public");

    assert!(views::show_hunch(&fx.db, &fx.creator, hidden_id).is_ok());
    assert!(matches!(
        views::show_hunch(&fx.db, &fx.other, hidden_id),
        Err(ViewError::Forbidden(_))
    ));
    Ok(())
}

#[test]
fn test_index_lists_newest_first() -> Result<()> {
    let fx = setup()?;
    views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "First", PrivacyLevel::Open))?;
    sleep(Duration::from_millis(5));
    views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Second", PrivacyLevel::Open))?;

    let titles: Vec<String> = views::hunch_index(&fx.db, &fx.other)?
        .into_iter()
        .map(|h| h.title)
        .collect();
    assert_eq!(titles, vec!["Second", "First"]);
    Ok(())
}

#[test]
fn test_only_creator_edits_or_deletes() -> Result<()> {
    let fx = setup()?;
    let hunch = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Mine", PrivacyLevel::Open))?;
    let id = hunch.id.expect("saved");

    let edit = views::edit_hunch(&fx.db, &fx.other, id, &hunch_form(&fx, "Theirs", PrivacyLevel::Open));
    assert!(matches!(edit, Err(ViewError::Forbidden(_))));
    assert!(matches!(
        views::destroy_hunch(&fx.db, &fx.other, id),
        Err(ViewError::Forbidden(_))
    ));

    views::destroy_hunch(&fx.db, &fx.creator, id)?;
    assert!(matches!(
        views::show_hunch(&fx.db, &fx.creator, id),
        Err(ViewError::NotFound(_))
    ));
    Ok(())
}

#[test]
fn test_invalid_form_persists_nothing() -> Result<()> {
    let fx = setup()?;

    let missing_title = form(&[("description", "No title"), ("language", fx.language_id.as_str())]);
    match views::create_hunch(&fx.db, &fx.creator, &missing_title) {
        Err(ViewError::Invalid(errors)) => assert!(errors.has("title")),
        other => panic!("expected invalid form, got {:?}", other),
    }

    let bad_language = form(&[("title", "T"), ("description", "D"), ("language", "999")]);
    match views::create_hunch(&fx.db, &fx.creator, &bad_language) {
        Err(ViewError::Invalid(errors)) => assert!(errors.has("language")),
        other => panic!("expected invalid language, got {:?}", other),
    }

    assert!(fx.db.list_hunches()?.is_empty());
    Ok(())
}

#[test]
fn test_tags_are_saved_with_hunch() -> Result<()> {
    let fx = setup()?;
    let drought = fx.db.ensure_tag("drought")?;
    let maize = fx.db.ensure_tag("maize")?;
    let tags = format!("{},junk,{}", maize.id, drought.id);

    let mut data = hunch_form(&fx, "Tagged", PrivacyLevel::Open);
    data.insert("tags".to_string(), tags);
    let hunch = views::create_hunch(&fx.db, &fx.creator, &data)?;

    let stored = fx.db.get_hunch(hunch.id.expect("saved"))?.expect("hunch exists");
    let mut expected = vec![drought.id, maize.id];
    expected.sort();
    assert_eq!(stored.tag_ids, expected);
    Ok(())
}

#[test]
fn test_join_respects_privacy() -> Result<()> {
    let fx = setup()?;
    let open = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Open", PrivacyLevel::Open))?;
    let closed = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Closed", PrivacyLevel::Closed))?;
    let open_id = open.id.expect("saved");

    let first = views::join_hunch(&fx.db, &fx.other, open_id)?;
    let again = views::join_hunch(&fx.db, &fx.other, open_id)?;
    assert_eq!(first.id, again.id);
    assert_eq!(fx.db.list_hunch_users(open_id)?.len(), 1);

    assert!(matches!(
        views::join_hunch(&fx.db, &fx.other, closed.id.expect("saved")),
        Err(ViewError::Forbidden(_))
    ));
    Ok(())
}

#[test]
fn test_evidence_lifecycle() -> Result<()> {
    let fx = setup()?;
    let (third, _) = fx.db.create_account("cho", "")?;
    let third = Identity::new(third.id);
    let hunch = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Closed", PrivacyLevel::Closed))?;
    let hunch_id = hunch.id.expect("saved");

    let outsider = views::add_evidence(&fx.db, &fx.other, hunch_id, &form(&[("description", "Uninvited")]));
    assert!(matches!(outsider, Err(ViewError::Forbidden(_))));
    assert!(fx.db.list_evidence(hunch_id)?.is_empty());

    fx.db.add_hunch_user(hunch_id, fx.other.id, 0)?;
    let evidence = views::add_evidence(
        &fx.db,
        &fx.other,
        hunch_id,
        &form(&[("strength", "3"), ("description", "Market survey")]),
    )?;
    let evidence_id = evidence.id.expect("saved");
    assert_eq!(evidence.creator_id, fx.other.id);
    assert_eq!(views::list_evidence(&fx.db, &fx.creator, hunch_id)?.len(), 1);

    let denied = views::edit_evidence(&fx.db, &third, evidence_id, &form(&[("strength", "-2")]));
    assert!(matches!(denied, Err(ViewError::Forbidden(_))));

    let edited = views::edit_evidence(
        &fx.db,
        &fx.other,
        evidence_id,
        &form(&[("strength", "-2"), ("description", "Revised")]),
    )?;
    assert_eq!(edited.strength, -2);
    assert_eq!(edited.time_created, evidence.time_created);
    Ok(())
}

#[test]
fn test_evidence_on_hidden_hunch_is_refused() -> Result<()> {
    let fx = setup()?;
    let hunch = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Secret", PrivacyLevel::Hidden))?;

    let result = views::add_evidence(
        &fx.db,
        &fx.other,
        hunch.id.expect("saved"),
        &form(&[("description", "Peeking")]),
    );
    assert!(matches!(result, Err(ViewError::Forbidden(_))));
    Ok(())
}

#[test]
fn test_open_hunch_takes_evidence_from_anyone() -> Result<()> {
    let fx = setup()?;
    let hunch = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Open", PrivacyLevel::Open))?;
    let hunch_id = hunch.id.expect("saved");

    views::add_evidence(&fx.db, &fx.other, hunch_id, &form(&[("description", "Field report")]))?;
    assert_eq!(views::list_evidence(&fx.db, &fx.other, hunch_id)?.len(), 1);
    Ok(())
}

#[test]
fn test_edit_without_privacy_keeps_hunch_open() -> Result<()> {
    let fx = setup()?;
    let hunch = views::create_hunch(&fx.db, &fx.creator, &hunch_form(&fx, "Prices", PrivacyLevel::Open))?;
    let id = hunch.id.expect("saved");

    let data = form(&[
        ("title", "Prices rising"),
        ("description", "Observed in three districts"),
        ("language", fx.language_id.as_str()),
    ]);
    match views::edit_hunch(&fx.db, &fx.creator, id, &data) {
        Err(ViewError::Invalid(errors)) => assert!(errors.has("privacy")),
        other => panic!("expected missing privacy, got {:?}", other),
    }

    let stored = fx.db.get_hunch(id)?.expect("hunch exists");
    assert_eq!(stored.privacy, PrivacyLevel::Open);
    assert_eq!(stored.title, "Prices");
    Ok(())
}
