//! Data models for hunchworks
//!
//! Entities as stored in SQLite, plus the small integer-coded enumerations
//! they carry. Enumerations are persisted by their numeric code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated account making a request.
///
/// Account ids and profile ids share the same number, so an identity can be
/// compared directly against any `*_id` that points at a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
}

impl Identity {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}

/// Privacy level shared by hunches, groups and profiles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyLevel {
    /// Only visible to invited members
    #[default]
    Hidden,
    /// Visible to everyone, but only invited members can participate
    Closed,
    /// Available to any member
    Open,
}

impl PrivacyLevel {
    pub fn code(self) -> i64 {
        match self {
            PrivacyLevel::Hidden => 0,
            PrivacyLevel::Closed => 1,
            PrivacyLevel::Open => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(PrivacyLevel::Hidden),
            1 => Some(PrivacyLevel::Closed),
            2 => Some(PrivacyLevel::Open),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrivacyLevel::Hidden => write!(f, "hidden"),
            PrivacyLevel::Closed => write!(f, "closed"),
            PrivacyLevel::Open => write!(f, "open"),
        }
    }
}

impl std::str::FromStr for PrivacyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hidden" | "0" => Ok(PrivacyLevel::Hidden),
            "closed" | "1" => Ok(PrivacyLevel::Closed),
            "open" | "2" => Ok(PrivacyLevel::Open),
            _ => Err(format!("Invalid privacy level: {}. Use: hidden, closed, open", s)),
        }
    }
}

/// Outcome of a hunch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HunchStatus {
    Confirmed,
    Denied,
    #[default]
    Active,
}

impl HunchStatus {
    pub fn code(self) -> i64 {
        match self {
            HunchStatus::Confirmed => 0,
            HunchStatus::Denied => 1,
            HunchStatus::Active => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(HunchStatus::Confirmed),
            1 => Some(HunchStatus::Denied),
            2 => Some(HunchStatus::Active),
            _ => None,
        }
    }
}

impl std::fmt::Display for HunchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HunchStatus::Confirmed => write!(f, "confirmed"),
            HunchStatus::Denied => write!(f, "denied"),
            HunchStatus::Active => write!(f, "active"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    #[default]
    Informal,
    Organization,
    Company,
    Government,
}

impl GroupType {
    pub fn code(self) -> i64 {
        match self {
            GroupType::Informal => 0,
            GroupType::Organization => 1,
            GroupType::Company => 2,
            GroupType::Government => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(GroupType::Informal),
            1 => Some(GroupType::Organization),
            2 => Some(GroupType::Company),
            3 => Some(GroupType::Government),
            _ => None,
        }
    }
}

impl std::fmt::Display for GroupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupType::Informal => write!(f, "informal"),
            GroupType::Organization => write!(f, "organization"),
            GroupType::Company => write!(f, "company"),
            GroupType::Government => write!(f, "government"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserTitle {
    #[default]
    None,
    Mr,
    Ms,
    Dr,
    Prof,
}

impl UserTitle {
    pub fn code(self) -> i64 {
        match self {
            UserTitle::None => 0,
            UserTitle::Mr => 1,
            UserTitle::Ms => 2,
            UserTitle::Dr => 3,
            UserTitle::Prof => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(UserTitle::None),
            1 => Some(UserTitle::Mr),
            2 => Some(UserTitle::Ms),
            3 => Some(UserTitle::Dr),
            4 => Some(UserTitle::Prof),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessengerService {
    #[default]
    None,
    Skype,
    GoogleTalk,
    Msn,
    Yahoo,
    Aim,
}

impl MessengerService {
    pub fn code(self) -> i64 {
        match self {
            MessengerService::None => 0,
            MessengerService::Skype => 1,
            MessengerService::GoogleTalk => 2,
            MessengerService::Msn => 3,
            MessengerService::Yahoo => 4,
            MessengerService::Aim => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(MessengerService::None),
            1 => Some(MessengerService::Skype),
            2 => Some(MessengerService::GoogleTalk),
            3 => Some(MessengerService::Msn),
            4 => Some(MessengerService::Yahoo),
            5 => Some(MessengerService::Aim),
            _ => None,
        }
    }
}

/// Default access level and status for new membership, connection and
/// invite rows.
pub const DEFAULT_ACCESS_LEVEL: i64 = 0;
pub const DEFAULT_STATUS: i64 = 0;

/// A login account, owned by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub date_joined: DateTime<Utc>,
}

/// Per-account profile. `account_id` is also the profile's primary key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub account_id: i64,
    pub title: UserTitle,
    pub show_profile_reminder: i64,
    pub privacy: PrivacyLevel,
    pub bio_text: String,
    pub phone: String,
    pub skype_name: String,
    pub website: String,
    pub screen_name: String,
    pub messenger_service: Option<MessengerService>,
    pub default_language_id: Option<i64>,
    pub invitation_id: Option<i64>,
}

impl UserProfile {
    /// A blank profile as created alongside a new account
    pub fn for_account(account_id: i64) -> Self {
        Self {
            account_id,
            title: UserTitle::default(),
            show_profile_reminder: 0,
            privacy: PrivacyLevel::default(),
            bio_text: String::new(),
            phone: String::new(),
            skype_name: String::new(),
            website: String::new(),
            screen_name: String::new(),
            messenger_service: Some(MessengerService::default()),
            default_language_id: None,
            invitation_id: None,
        }
    }
}

/// Directed edge between two profiles. No inverse row is implied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub id: i64,
    pub user_profile_id: i64,
    pub other_user_profile_id: i64,
    pub status: i64,
}

/// A shared hypothesis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hunch {
    /// `None` until the first save
    pub id: Option<i64>,
    pub creator_id: i64,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
    pub status: HunchStatus,
    pub title: String,
    pub privacy: PrivacyLevel,
    pub language_id: i64,
    pub location_id: Option<i64>,
    pub description: String,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub skill_ids: Vec<i64>,
}

impl Hunch {
    pub fn new(creator: Identity, title: String, description: String, language_id: i64) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            creator_id: creator.id,
            time_created: now,
            time_modified: now,
            status: HunchStatus::default(),
            title,
            privacy: PrivacyLevel::default(),
            language_id,
            location_id: None,
            description,
            tag_ids: Vec::new(),
            skill_ids: Vec::new(),
        }
    }

    /// Apply the save-time timestamps: `time_created` only for records that
    /// have never been saved, `time_modified` always.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        if self.id.is_none() {
            self.time_created = now;
        }
        self.time_modified = now;
    }

    pub fn is_editable_by(&self, identity: &Identity) -> bool {
        self.creator_id == identity.id
    }

    /// Hidden hunches are only visible to their creator. Closed and open
    /// hunches are visible to anyone; privacy only restricts participation.
    pub fn is_viewable_by(&self, identity: &Identity) -> bool {
        if self.is_hidden() {
            return self.creator_id == identity.id;
        }
        true
    }

    /// Whether `identity` may add itself as a participant without an
    /// invitation.
    pub fn is_joinable_by(&self, identity: &Identity) -> bool {
        self.creator_id == identity.id || self.privacy == PrivacyLevel::Open
    }

    fn is_hidden(&self) -> bool {
        self.privacy == PrivacyLevel::Hidden
    }
}

/// Participation of a profile in a hunch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HunchUser {
    pub id: i64,
    pub hunch_id: i64,
    pub user_profile_id: i64,
    pub status: i64,
}

/// A response to a hunch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    /// `None` until the first save
    pub id: Option<i64>,
    pub strength: i64,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
    pub description: String,
    pub hunch_id: i64,
    pub creator_id: i64,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

impl Evidence {
    pub fn new(hunch_id: i64, creator: Identity, strength: i64, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            strength,
            time_created: now,
            time_modified: now,
            description,
            hunch_id,
            creator_id: creator.id,
            tag_ids: Vec::new(),
        }
    }

    /// Same set-once/set-always contract as [`Hunch::stamp`]
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        if self.id.is_none() {
            self.time_created = now;
        }
        self.time_modified = now;
    }

    pub fn is_editable_by(&self, identity: &Identity) -> bool {
        self.creator_id == identity.id
    }
}

/// A collaboration group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub abbreviation: Option<String>,
    pub group_type: GroupType,
    pub privacy: PrivacyLevel,
    pub location_id: Option<i64>,
}

/// Membership (or pending invitation) of a profile in a group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    pub id: i64,
    pub user_profile_id: i64,
    pub group_id: i64,
    pub access_level: i64,
    pub status: i64,
}

/// An emailed invitation to join HunchWorks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invitation {
    pub id: i64,
    pub email: String,
    pub invited_by: i64,
    pub hunch_id: Option<i64>,
}

/// Links an invitation to the account that sent it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInvite {
    pub id: i64,
    pub invitation_id: i64,
    pub account_id: i64,
    pub status: i64,
}

/// Row of one of the name lookup tables (languages, locations, tags)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Named {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Skill {
    pub id: i64,
    pub name: String,
    pub is_language: bool,
    pub is_technical: bool,
}
