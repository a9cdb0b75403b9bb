//! Form binding and validation
//!
//! Each form binds raw submitted fields (as posted from an HTML form) to
//! typed values, collecting field-level messages instead of stopping at the
//! first problem. Checks that need the database (foreign keys, unique names)
//! run in a second `validate_references` step.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::db::Database;
use crate::models::{
    Evidence, Group, GroupType, Hunch, MessengerService, PrivacyLevel, UserProfile, UserTitle,
};

/// Raw submitted fields
pub type FormData = HashMap<String, String>;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_INTEGER: &str = "Enter a whole number.";
pub const INVALID_EMAIL: &str = "Enter a valid e-mail address.";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("username pattern is valid"));

/// Field name to messages, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

/// Reads fields out of the submitted data, recording errors as it goes
struct Binder<'a> {
    data: &'a FormData,
    errors: FormErrors,
}

impl<'a> Binder<'a> {
    fn new(data: &'a FormData) -> Self {
        Self {
            data,
            errors: FormErrors::default(),
        }
    }

    fn raw(&self, name: &str) -> Option<&'a str> {
        self.data
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn check_length(&mut self, name: &str, value: &str, max_len: usize) {
        let len = value.chars().count();
        if len > max_len {
            self.errors.add(
                name,
                format!(
                    "Ensure this value has at most {} characters (it has {}).",
                    max_len, len
                ),
            );
        }
    }

    fn required_text(&mut self, name: &str, max_len: Option<usize>) -> String {
        match self.raw(name) {
            Some(value) => {
                if let Some(max) = max_len {
                    self.check_length(name, value, max);
                }
                value.to_string()
            }
            None => {
                self.errors.add(name, REQUIRED);
                String::new()
            }
        }
    }

    /// Blank allowed; stored as an empty string
    fn text(&mut self, name: &str, max_len: Option<usize>) -> String {
        self.nullable_text(name, max_len).unwrap_or_default()
    }

    /// Blank allowed; stored as NULL
    fn nullable_text(&mut self, name: &str, max_len: Option<usize>) -> Option<String> {
        let value = self.raw(name)?;
        if let Some(max) = max_len {
            self.check_length(name, value, max);
        }
        Some(value.to_string())
    }

    fn integer(&mut self, name: &str, default: i64) -> i64 {
        match self.raw(name) {
            None => default,
            Some(value) => match value.parse::<i64>() {
                Ok(n) => n,
                Err(_) => {
                    self.errors.add(name, INVALID_INTEGER);
                    default
                }
            },
        }
    }

    fn optional_id(&mut self, name: &str) -> Option<i64> {
        let value = self.raw(name)?;
        match value.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                self.errors
                    .add(name, "Select a valid choice. That choice is not one of the available choices.");
                None
            }
        }
    }

    fn required_id(&mut self, name: &str) -> i64 {
        if self.raw(name).is_none() {
            self.errors.add(name, REQUIRED);
            return 0;
        }
        self.optional_id(name).unwrap_or(0)
    }

    /// Integer-coded choice; absent means the model default
    fn choice<T: Default>(&mut self, name: &str, from_code: fn(i64) -> Option<T>) -> T {
        let Some(value) = self.raw(name) else {
            return T::default();
        };
        match value.parse::<i64>().ok().and_then(from_code) {
            Some(choice) => choice,
            None => {
                self.errors.add(
                    name,
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        value
                    ),
                );
                T::default()
            }
        }
    }

    fn required_choice<T: Default>(&mut self, name: &str, from_code: fn(i64) -> Option<T>) -> T {
        if self.raw(name).is_none() {
            self.errors.add(name, REQUIRED);
            return T::default();
        }
        self.choice(name, from_code)
    }

    /// Comma-separated id list; tokens that are not all digits are dropped
    fn id_list(&self, name: &str) -> Vec<i64> {
        self.data
            .get(name)
            .map(|v| crate::collab::parse_collaborators(v))
            .unwrap_or_default()
    }
}

/// Editable fields of a hunch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunchForm {
    pub title: String,
    pub privacy: PrivacyLevel,
    pub language_id: i64,
    pub location_id: Option<i64>,
    pub description: String,
    pub tag_ids: Vec<i64>,
    pub skill_ids: Vec<i64>,
}

impl HunchForm {
    pub const EDITABLE: &'static [&'static str] =
        &["title", "privacy", "language", "location", "description", "tags", "skills"];
    pub const EXCLUDED: &'static [&'static str] =
        &["creator", "time_created", "time_modified", "status", "user_profiles"];

    pub fn bind(data: &FormData) -> Result<Self, FormErrors> {
        let mut b = Binder::new(data);
        let form = Self {
            title: b.required_text("title", Some(100)),
            privacy: b.required_choice("privacy", PrivacyLevel::from_code),
            language_id: b.required_id("language"),
            location_id: b.optional_id("location"),
            description: b.required_text("description", None),
            tag_ids: b.id_list("tags"),
            skill_ids: b.id_list("skills"),
        };
        b.errors.finish(form)
    }

    pub fn validate_references(&self, db: &Database) -> Result<FormErrors> {
        let mut errors = FormErrors::default();
        if !db.language_exists(self.language_id)? {
            errors.add("language", invalid_choice());
        }
        if let Some(location_id) = self.location_id {
            if !db.location_exists(location_id)? {
                errors.add("location", invalid_choice());
            }
        }
        for &tag_id in &self.tag_ids {
            if !db.tag_exists(tag_id)? {
                errors.add("tags", format!("Select a valid choice. {} is not one of the available choices.", tag_id));
            }
        }
        for &skill_id in &self.skill_ids {
            if !db.skill_exists(skill_id)? {
                errors.add("skills", format!("Select a valid choice. {} is not one of the available choices.", skill_id));
            }
        }
        Ok(errors)
    }

    /// Copy the form onto a hunch, leaving excluded fields alone
    pub fn apply_to(&self, hunch: &mut Hunch) {
        hunch.title = self.title.clone();
        hunch.privacy = self.privacy;
        hunch.language_id = self.language_id;
        hunch.location_id = self.location_id;
        hunch.description = self.description.clone();
        hunch.tag_ids = self.tag_ids.clone();
        hunch.skill_ids = self.skill_ids.clone();
    }
}

/// Editable fields of a piece of evidence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvidenceForm {
    pub strength: i64,
    pub description: String,
    pub tag_ids: Vec<i64>,
}

impl EvidenceForm {
    pub const EDITABLE: &'static [&'static str] = &["strength", "description", "tags"];
    pub const EXCLUDED: &'static [&'static str] = &[
        "hunch",
        "creator",
        "time_created",
        "time_modified",
        "attachments",
        "albums",
    ];

    pub fn bind(data: &FormData) -> Result<Self, FormErrors> {
        let mut b = Binder::new(data);
        let form = Self {
            strength: b.integer("strength", 0),
            description: b.text("description", None),
            tag_ids: b.id_list("tags"),
        };
        b.errors.finish(form)
    }

    pub fn validate_references(&self, db: &Database) -> Result<FormErrors> {
        let mut errors = FormErrors::default();
        for &tag_id in &self.tag_ids {
            if !db.tag_exists(tag_id)? {
                errors.add("tags", format!("Select a valid choice. {} is not one of the available choices.", tag_id));
            }
        }
        Ok(errors)
    }

    pub fn apply_to(&self, evidence: &mut Evidence) {
        evidence.strength = self.strength;
        evidence.description = self.description.clone();
        evidence.tag_ids = self.tag_ids.clone();
    }
}

/// Editable fields of a group plus the submitted collaborator list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupForm {
    pub name: String,
    pub abbreviation: Option<String>,
    pub group_type: GroupType,
    pub privacy: PrivacyLevel,
    pub location_id: Option<i64>,
    /// Raw comma-separated account ids, parsed during reconciliation
    pub group_collaborators: String,
}

impl GroupForm {
    pub const EDITABLE: &'static [&'static str] = &[
        "name",
        "abbreviation",
        "type",
        "privacy",
        "location",
        "group_collaborators",
    ];
    pub const EXCLUDED: &'static [&'static str] = &["members", "logo"];

    pub fn bind(data: &FormData) -> Result<Self, FormErrors> {
        let mut b = Binder::new(data);
        let form = Self {
            name: b.required_text("name", Some(100)),
            abbreviation: b.nullable_text("abbreviation", Some(10)),
            group_type: b.choice("type", GroupType::from_code),
            privacy: b.choice("privacy", PrivacyLevel::from_code),
            location_id: b.optional_id("location"),
            group_collaborators: data.get("group_collaborators").cloned().unwrap_or_default(),
        };
        b.errors.finish(form)
    }

    /// `editing` is the id of the group being edited, if any
    pub fn validate_references(&self, db: &Database, editing: Option<i64>) -> Result<FormErrors> {
        let mut errors = FormErrors::default();
        if db.group_name_taken(&self.name, editing)? {
            errors.add("name", "Group with this Name already exists.");
        }
        if let Some(location_id) = self.location_id {
            if !db.location_exists(location_id)? {
                errors.add("location", invalid_choice());
            }
        }
        Ok(errors)
    }

    pub fn to_group(&self, id: i64) -> Group {
        Group {
            id,
            name: self.name.clone(),
            abbreviation: self.abbreviation.clone(),
            group_type: self.group_type,
            privacy: self.privacy,
            location_id: self.location_id,
        }
    }
}

/// Editable fields of a user profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileForm {
    pub title: UserTitle,
    pub privacy: PrivacyLevel,
    pub bio_text: String,
    pub phone: String,
    pub skype_name: String,
    pub website: String,
    pub screen_name: String,
    pub messenger_service: MessengerService,
    pub default_language_id: Option<i64>,
}

impl ProfileForm {
    pub const EDITABLE: &'static [&'static str] = &[
        "title",
        "privacy",
        "bio_text",
        "phone",
        "skype_name",
        "website",
        "screen_name",
        "messenger_service",
        "default_language",
    ];
    pub const EXCLUDED: &'static [&'static str] =
        &["user", "invitation", "connections", "profile_picture", "show_profile_reminder"];

    pub fn bind(data: &FormData) -> Result<Self, FormErrors> {
        let mut b = Binder::new(data);
        let form = Self {
            title: b.choice("title", UserTitle::from_code),
            privacy: b.choice("privacy", PrivacyLevel::from_code),
            bio_text: b.text("bio_text", None),
            phone: b.text("phone", Some(20)),
            skype_name: b.text("skype_name", Some(30)),
            website: b.text("website", Some(100)),
            screen_name: b.text("screen_name", Some(45)),
            messenger_service: b.choice("messenger_service", MessengerService::from_code),
            default_language_id: b.optional_id("default_language"),
        };
        b.errors.finish(form)
    }

    pub fn validate_references(&self, db: &Database) -> Result<FormErrors> {
        let mut errors = FormErrors::default();
        if let Some(language_id) = self.default_language_id {
            if !db.language_exists(language_id)? {
                errors.add("default_language", invalid_choice());
            }
        }
        Ok(errors)
    }

    pub fn apply_to(&self, profile: &mut UserProfile) {
        profile.title = self.title;
        profile.privacy = self.privacy;
        profile.bio_text = self.bio_text.clone();
        profile.phone = self.phone.clone();
        profile.skype_name = self.skype_name.clone();
        profile.website = self.website.clone();
        profile.screen_name = self.screen_name.clone();
        profile.messenger_service = Some(self.messenger_service);
        profile.default_language_id = self.default_language_id;
    }
}

/// New account registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountForm {
    pub username: String,
    pub email: String,
}

impl AccountForm {
    pub fn bind(data: &FormData) -> Result<Self, FormErrors> {
        let mut b = Binder::new(data);
        let username = b.required_text("username", Some(30));
        if !username.is_empty() && !USERNAME_RE.is_match(&username) {
            b.errors.add(
                "username",
                "This value may contain only letters, numbers and @/./+/-/_ characters.",
            );
        }
        let email = b.text("email", Some(75));
        if !email.is_empty() && !is_valid_email(&email) {
            b.errors.add("email", INVALID_EMAIL);
        }
        b.errors.finish(Self { username, email })
    }
}

/// A batch of addresses to invite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitePeopleForm {
    pub invited_emails: Vec<String>,
}

impl InvitePeopleForm {
    /// Addresses may be separated by commas, spaces or newlines. Repeated
    /// addresses are kept.
    pub fn bind(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::default();
        let raw = data.get("invited_emails").map(String::as_str).unwrap_or("");

        let invited_emails: Vec<String> = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if invited_emails.is_empty() {
            errors.add("invited_emails", REQUIRED);
        }
        for email in &invited_emails {
            if !is_valid_email(email) {
                errors.add("invited_emails", format!("{} ({})", INVALID_EMAIL, email));
            }
        }
        errors.finish(Self { invited_emails })
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn invalid_choice() -> &'static str {
    "Select a valid choice. That choice is not one of the available choices."
}
