//! Accounts and user profiles

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use tracing::info;

use super::{decode, Database, StoreError};
use crate::models::{
    Account, MessengerService, PrivacyLevel, Skill, UserProfile, UserTitle,
};

const PROFILE_COLUMNS: &str = "account_id, title, show_profile_reminder, privacy, bio_text, phone, \
     skype_name, website, screen_name, messenger_service, default_language_id, invitation_id";

impl Database {
    /// Create an account together with its profile.
    ///
    /// Both rows are written in one transaction; an account never exists
    /// without its profile.
    pub fn create_account(&self, username: &str, email: &str) -> Result<(Account, UserProfile)> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let date_joined = Utc::now();
        tx.execute(
            "INSERT INTO accounts (username, email, date_joined) VALUES (?1, ?2, ?3)",
            params![username, email, date_joined],
        )
        .with_context(|| format!("Failed to insert account {}", username))?;
        let account = Account {
            id: tx.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            date_joined,
        };

        let profile = create_profile(&tx, account.id)?;
        tx.commit().context("Failed to commit account creation")?;

        info!(account_id = account.id, username = %account.username, "created account");
        Ok((account, profile))
    }

    /// Save changes to an account. Never touches the profile.
    pub fn update_account(&self, account: &Account) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE accounts SET username = ?2, email = ?3 WHERE id = ?1",
                params![account.id, account.username, account.email],
            )
            .context("Failed to update account")?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "account",
                id: account.id,
            }
            .into());
        }
        Ok(())
    }

    pub fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let result = self.conn.query_row(
            "SELECT id, username, email, date_joined FROM accounts WHERE id = ?1",
            params![id],
            |row| {
                Ok(Account {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    date_joined: row.get(3)?,
                })
            },
        );

        match result {
            Ok(account) => Ok(Some(account)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn username_taken(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM accounts WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn get_profile(&self, account_id: i64) -> Result<Option<UserProfile>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM user_profiles WHERE account_id = ?1", PROFILE_COLUMNS),
            params![account_id],
            profile_from_row,
        );

        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn profile_exists(&self, account_id: i64) -> Result<bool> {
        profile_exists(&self.conn, account_id)
    }

    /// Number of profile rows for an account (0 or 1)
    pub fn count_profiles(&self, account_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM user_profiles WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        let changed = self
            .conn
            .execute(
                r#"
                UPDATE user_profiles
                SET title = ?2, show_profile_reminder = ?3, privacy = ?4, bio_text = ?5,
                    phone = ?6, skype_name = ?7, website = ?8, screen_name = ?9,
                    messenger_service = ?10, default_language_id = ?11, invitation_id = ?12
                WHERE account_id = ?1
                "#,
                params![
                    profile.account_id,
                    profile.title.code(),
                    profile.show_profile_reminder,
                    profile.privacy.code(),
                    profile.bio_text,
                    profile.phone,
                    profile.skype_name,
                    profile.website,
                    profile.screen_name,
                    profile.messenger_service.map(MessengerService::code),
                    profile.default_language_id,
                    profile.invitation_id
                ],
            )
            .context("Failed to update profile")?;
        if changed == 0 {
            return Err(StoreError::UnknownProfile(profile.account_id).into());
        }
        Ok(())
    }

    /// Replace the skill set of a profile
    pub fn set_profile_skills(&self, account_id: i64, skill_ids: &[i64]) -> Result<()> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM profile_skills WHERE user_profile_id = ?1",
            params![account_id],
        )?;
        for skill_id in skill_ids {
            tx.execute(
                "INSERT OR IGNORE INTO profile_skills (user_profile_id, skill_id) VALUES (?1, ?2)",
                params![account_id, skill_id],
            )
            .context("Failed to attach skill to profile")?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn list_profile_skills(&self, account_id: i64) -> Result<Vec<Skill>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.name, s.is_language, s.is_technical
            FROM skills s
            INNER JOIN profile_skills ps ON ps.skill_id = s.id
            WHERE ps.user_profile_id = ?1
            ORDER BY s.name
            "#,
        )?;

        let rows = stmt.query_map(params![account_id], |row| {
            Ok(Skill {
                id: row.get(0)?,
                name: row.get(1)?,
                is_language: row.get(2)?,
                is_technical: row.get(3)?,
            })
        })?;

        let mut skills = Vec::new();
        for row in rows {
            skills.push(row?);
        }
        Ok(skills)
    }
}

fn create_profile(conn: &Connection, account_id: i64) -> Result<UserProfile> {
    let profile = UserProfile::for_account(account_id);
    conn.execute(
        r#"
        INSERT INTO user_profiles (account_id, title, show_profile_reminder, privacy, messenger_service)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
        params![
            account_id,
            profile.title.code(),
            profile.show_profile_reminder,
            profile.privacy.code(),
            profile.messenger_service.map(MessengerService::code)
        ],
    )
    .with_context(|| format!("Failed to create profile for account {}", account_id))?;
    Ok(profile)
}

pub(super) fn profile_exists(conn: &Connection, account_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM user_profiles WHERE account_id = ?1",
        params![account_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    let messenger: Option<i64> = row.get(9)?;
    Ok(UserProfile {
        account_id: row.get(0)?,
        title: decode(row.get(1)?, UserTitle::from_code),
        show_profile_reminder: row.get(2)?,
        privacy: decode(row.get(3)?, PrivacyLevel::from_code),
        bio_text: row.get(4)?,
        phone: row.get(5)?,
        skype_name: row.get(6)?,
        website: row.get(7)?,
        screen_name: row.get(8)?,
        messenger_service: messenger.map(|code| decode(code, MessengerService::from_code)),
        default_language_id: row.get(10)?,
        invitation_id: row.get(11)?,
    })
}
