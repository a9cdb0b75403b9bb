//! CLI commands for hunchworks
//!
//! Write commands go through the same views as the HTTP surface, so forms
//! are validated identically.

use anyhow::{bail, Context, Result};

use crate::collab::InvitationManager;
use crate::config::{load_config, save_config, Config, HunchworksPaths};
use crate::db::Database;
use crate::forms::FormData;
use crate::models::{Group, Hunch, Identity, PrivacyLevel};
use crate::views;

/// Initialize hunchworks for first-time setup
pub fn init() -> Result<()> {
    let paths = HunchworksPaths::new()?;

    if paths.is_initialized() {
        println!("HunchWorks is already initialized at {}", paths.root.display());
        return Ok(());
    }

    println!("Initializing hunchworks at {}...", paths.root.display());

    paths.ensure_dirs()?;
    println!("  Created directory structure");

    save_config(&paths, &Config::default())?;
    println!("  Created config.toml");

    Database::init(&paths)?;
    println!("  Created database");

    println!();
    println!("HunchWorks initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  hunchworks account add <username>   Register the first account");
    println!("  hunchworks serve                    Start the HTTP server");

    Ok(())
}

/// Run the HTTP server with the configured address
pub async fn serve() -> Result<()> {
    let (paths, db) = open()?;
    let config = load_config(&paths)?;
    crate::server::serve(config, db).await
}

pub fn account_add(username: &str, email: Option<&str>) -> Result<()> {
    let (_, db) = open()?;
    let data = fields(&[("username", Some(username)), ("email", email)]);
    let (account, _) = views::create_account(&db, &data)?;

    println!("Created account {} ({})", account.id, account.username);
    Ok(())
}

pub fn account_show(id: i64) -> Result<()> {
    let (_, db) = open()?;
    let detail = views::show_profile(&db, id)?;

    println!("Account: {} ({})", detail.account.username, detail.account.id);
    println!("{}", "=".repeat(50));
    if !detail.account.email.is_empty() {
        println!("Email:       {}", detail.account.email);
    }
    println!("Joined:      {}", format_timestamp(&detail.account.date_joined));
    println!("Privacy:     {}", detail.profile.privacy);
    if !detail.profile.bio_text.is_empty() {
        println!("Bio:         {}", detail.profile.bio_text);
    }
    if !detail.skills.is_empty() {
        let names: Vec<&str> = detail.skills.iter().map(|s| s.name.as_str()).collect();
        println!("Skills:      {}", names.join(", "));
    }
    println!("Connections: {}", detail.connections.len());
    Ok(())
}

/// Page through the group index
pub fn group_list(page: u32) -> Result<()> {
    let (paths, db) = open()?;
    let config = load_config(&paths)?;
    let page = views::group_index(&db, page, config.groups.page_size)?;

    if page.groups.is_empty() {
        println!("No groups found.");
        return Ok(());
    }

    println!("{:<6} {:<30} {:<14} {:<8}", "ID", "NAME", "TYPE", "PRIVACY");
    println!("{}", "-".repeat(60));
    for group in &page.groups {
        println!(
            "{:<6} {:<30} {:<14} {:<8}",
            group.id,
            truncate(&group.name, 28),
            group.group_type,
            group.privacy
        );
    }
    println!();
    println!("Page {} of {} ({} groups)", page.page, page.page_count(), page.total);
    Ok(())
}

pub fn group_show(id: i64) -> Result<()> {
    let (_, db) = open()?;
    let detail = views::show_group(&db, id)?;
    print_group(&detail.group);

    println!();
    println!("Members: {}", detail.memberships.len());
    for membership in &detail.memberships {
        println!(
            "  profile {:<6} access {} status {}",
            membership.user_profile_id, membership.access_level, membership.status
        );
    }
    Ok(())
}

/// Create a group as `actor`, who always ends up a member
pub fn group_create(
    actor: i64,
    name: &str,
    privacy: Option<&str>,
    collaborators: Option<&str>,
) -> Result<()> {
    let (_, db) = open()?;
    let privacy = parse_privacy(privacy)?.map(|p| p.code().to_string());
    let data = fields(&[
        ("name", Some(name)),
        ("privacy", privacy.as_deref()),
        ("group_collaborators", collaborators),
    ]);

    let detail = views::create_group(&db, &Identity::new(actor), &data)?;
    println!(
        "Created group {} ({}) with {} member(s)",
        detail.group.id,
        detail.group.name,
        detail.memberships.len()
    );
    Ok(())
}

/// Edit a group and reconcile its members. Fields not given keep their
/// current values; the collaborator list always replaces the member set.
pub fn group_edit(
    actor: i64,
    id: i64,
    name: Option<&str>,
    privacy: Option<&str>,
    collaborators: &str,
) -> Result<()> {
    let (_, db) = open()?;
    let current = db
        .get_group(id)?
        .with_context(|| format!("Group not found: {}", id))?;

    let privacy = parse_privacy(privacy)?.unwrap_or(current.privacy);
    let group_type = current.group_type.code().to_string();
    let privacy = privacy.code().to_string();
    let location = current.location_id.map(|l| l.to_string());
    let data = fields(&[
        ("name", Some(name.unwrap_or(current.name.as_str()))),
        ("abbreviation", current.abbreviation.as_deref()),
        ("type", Some(group_type.as_str())),
        ("privacy", Some(privacy.as_str())),
        ("location", location.as_deref()),
        ("group_collaborators", Some(collaborators)),
    ]);

    let detail = views::edit_group(&db, &Identity::new(actor), id, &data)?;
    println!(
        "Updated group {} ({} member(s))",
        detail.group.id,
        detail.memberships.len()
    );
    Ok(())
}

/// Hunches visible to `actor`
pub fn hunch_list(actor: i64) -> Result<()> {
    let (_, db) = open()?;
    let hunches = views::hunch_index(&db, &Identity::new(actor))?;

    if hunches.is_empty() {
        println!("No hunches found.");
        return Ok(());
    }

    println!("{:<6} {:<40} {:<10} {:<8}", "ID", "TITLE", "STATUS", "PRIVACY");
    println!("{}", "-".repeat(68));
    for hunch in &hunches {
        println!(
            "{:<6} {:<40} {:<10} {:<8}",
            hunch.id.unwrap_or_default(),
            truncate(&hunch.title, 38),
            hunch.status,
            hunch.privacy
        );
    }
    Ok(())
}

pub fn hunch_show(actor: i64, id: i64) -> Result<()> {
    let (_, db) = open()?;
    let detail = views::show_hunch(&db, &Identity::new(actor), id)?;
    print_hunch(&detail.hunch);

    println!();
    println!("Participants: {}", detail.participants.len());
    println!("Evidence:     {}", detail.evidence.len());
    for evidence in &detail.evidence {
        println!(
            "  [{:+}] {}",
            evidence.strength,
            truncate(&evidence.description, 60)
        );
    }
    Ok(())
}

pub fn hunch_create(
    actor: i64,
    title: &str,
    description: &str,
    privacy: Option<&str>,
    language: Option<&str>,
) -> Result<()> {
    let (_, db) = open()?;
    let language = db.ensure_language(language.unwrap_or(crate::db::DEFAULT_LANGUAGE))?;
    let language_id = language.id.to_string();
    let privacy = parse_privacy(privacy)?.unwrap_or_default().code().to_string();
    let data = fields(&[
        ("title", Some(title)),
        ("description", Some(description)),
        ("language", Some(language_id.as_str())),
        ("privacy", Some(privacy.as_str())),
    ]);

    let hunch = views::create_hunch(&db, &Identity::new(actor), &data)?;
    println!("Created hunch {}: {}", hunch.id.unwrap_or_default(), hunch.title);
    Ok(())
}

/// Record invitations from the configured inviter
pub fn invite(emails: &[String]) -> Result<()> {
    let (paths, db) = open()?;
    let config = load_config(&paths)?;
    let joined = emails.join(",");
    let data = fields(&[("invited_emails", Some(joined.as_str()))]);

    let batch = views::invite(&db, &Identity::new(config.invitations.inviter_id), &data)?;
    print!("{}", InvitationManager::format_batch(&batch));
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub enum LookupKind {
    Language,
    Location,
    Tag,
    Skill,
}

/// Get or create a lookup entry and print its id
pub fn lookup_add(kind: LookupKind, name: &str) -> Result<()> {
    let (_, db) = open()?;
    let id = match kind {
        LookupKind::Language => db.ensure_language(name)?.id,
        LookupKind::Location => db.ensure_location(name)?.id,
        LookupKind::Tag => db.ensure_tag(name)?.id,
        LookupKind::Skill => db.ensure_skill(name, false, false)?.id,
    };
    println!("{:?} {}: {}", kind, id, name);
    Ok(())
}

fn print_group(group: &Group) {
    println!("Group: {} ({})", group.name, group.id);
    println!("{}", "=".repeat(50));
    if let Some(abbreviation) = &group.abbreviation {
        println!("Abbreviation: {}", abbreviation);
    }
    println!("Type:         {}", group.group_type);
    println!("Privacy:      {}", group.privacy);
}

fn print_hunch(hunch: &Hunch) {
    println!("Hunch: {}", hunch.id.unwrap_or_default());
    println!("{}", "=".repeat(50));
    println!("Title:    {}", hunch.title);
    println!("Status:   {}", hunch.status);
    println!("Privacy:  {}", hunch.privacy);
    println!("Creator:  {}", hunch.creator_id);
    println!();
    println!("{}", hunch.description);
    println!();
    println!("Created:  {}", format_timestamp(&hunch.time_created));
    println!("Modified: {}", format_timestamp(&hunch.time_modified));
}

fn parse_privacy(privacy: Option<&str>) -> Result<Option<PrivacyLevel>> {
    privacy
        .map(|p| p.parse::<PrivacyLevel>().map_err(|e| anyhow::anyhow!(e)))
        .transpose()
}

fn fields(pairs: &[(&str, Option<&str>)]) -> FormData {
    pairs
        .iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v.to_string())))
        .collect()
}

fn format_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn open() -> Result<(HunchworksPaths, Database)> {
    let paths = HunchworksPaths::new()?;
    ensure_initialized(&paths)?;
    let db = Database::open(&paths)?;
    Ok((paths, db))
}

fn ensure_initialized(paths: &HunchworksPaths) -> Result<()> {
    if !paths.is_initialized() {
        bail!("HunchWorks not initialized. Run `hunchworks init` first.");
    }
    Ok(())
}
