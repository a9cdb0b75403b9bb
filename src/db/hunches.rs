//! Hunches, their participants, and evidence

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use tracing::debug;

use super::{decode, Database, StoreError};
use crate::models::{Evidence, Hunch, HunchStatus, HunchUser, PrivacyLevel};

const HUNCH_COLUMNS: &str = "id, creator_id, time_created, time_modified, status, title, privacy, \
     language_id, location_id, description";

const EVIDENCE_COLUMNS: &str =
    "id, strength, time_created, time_modified, description, hunch_id, creator_id";

impl Database {
    /// Insert or update a hunch, stamping its timestamps.
    ///
    /// A hunch without an id is inserted and receives one. Tag and skill
    /// links are replaced with the ones on the struct.
    pub fn save_hunch(&self, hunch: &mut Hunch) -> Result<i64> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        hunch.stamp(Utc::now());

        let id = match hunch.id {
            None => {
                tx.execute(
                    r#"
                    INSERT INTO hunches (creator_id, time_created, time_modified, status, title,
                                         privacy, language_id, location_id, description)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    "#,
                    params![
                        hunch.creator_id,
                        hunch.time_created,
                        hunch.time_modified,
                        hunch.status.code(),
                        hunch.title,
                        hunch.privacy.code(),
                        hunch.language_id,
                        hunch.location_id,
                        hunch.description
                    ],
                )
                .context("Failed to insert hunch")?;
                tx.last_insert_rowid()
            }
            Some(id) => {
                let changed = tx
                    .execute(
                        r#"
                        UPDATE hunches
                        SET time_modified = ?2, status = ?3, title = ?4, privacy = ?5,
                            language_id = ?6, location_id = ?7, description = ?8
                        WHERE id = ?1
                        "#,
                        params![
                            id,
                            hunch.time_modified,
                            hunch.status.code(),
                            hunch.title,
                            hunch.privacy.code(),
                            hunch.language_id,
                            hunch.location_id,
                            hunch.description
                        ],
                    )
                    .context("Failed to update hunch")?;
                if changed == 0 {
                    return Err(StoreError::NotFound { entity: "hunch", id }.into());
                }
                id
            }
        };

        replace_links(&tx, "hunch_tags", "hunch_id", "tag_id", id, &hunch.tag_ids)?;
        replace_links(&tx, "hunch_skills", "hunch_id", "skill_id", id, &hunch.skill_ids)?;
        tx.commit().context("Failed to commit hunch")?;

        hunch.id = Some(id);
        debug!(hunch_id = id, "saved hunch");
        Ok(id)
    }

    pub fn get_hunch(&self, id: i64) -> Result<Option<Hunch>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM hunches WHERE id = ?1", HUNCH_COLUMNS),
            params![id],
            hunch_from_row,
        );

        match result {
            Ok(mut hunch) => {
                hunch.tag_ids = load_links(&self.conn, "hunch_tags", "hunch_id", "tag_id", id)?;
                hunch.skill_ids =
                    load_links(&self.conn, "hunch_skills", "hunch_id", "skill_id", id)?;
                Ok(Some(hunch))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All hunches, most recently modified first. Tag and skill links are
    /// not loaded.
    pub fn list_hunches(&self) -> Result<Vec<Hunch>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM hunches ORDER BY time_modified DESC, id DESC",
            HUNCH_COLUMNS
        ))?;
        let rows = stmt.query_map([], hunch_from_row)?;

        let mut hunches = Vec::new();
        for row in rows {
            hunches.push(row?);
        }
        Ok(hunches)
    }

    pub fn delete_hunch(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM hunches WHERE id = ?1", params![id])
            .context("Failed to delete hunch")?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "hunch", id }.into());
        }
        Ok(())
    }

    /// Add a participant row. Duplicate (hunch, profile) pairs are allowed.
    pub fn add_hunch_user(&self, hunch_id: i64, user_profile_id: i64, status: i64) -> Result<HunchUser> {
        self.conn
            .execute(
                "INSERT INTO hunch_users (hunch_id, user_profile_id, status) VALUES (?1, ?2, ?3)",
                params![hunch_id, user_profile_id, status],
            )
            .context("Failed to add hunch participant")?;
        Ok(HunchUser {
            id: self.conn.last_insert_rowid(),
            hunch_id,
            user_profile_id,
            status,
        })
    }

    pub fn list_hunch_users(&self, hunch_id: i64) -> Result<Vec<HunchUser>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, hunch_id, user_profile_id, status FROM hunch_users WHERE hunch_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![hunch_id], |row| {
            Ok(HunchUser {
                id: row.get(0)?,
                hunch_id: row.get(1)?,
                user_profile_id: row.get(2)?,
                status: row.get(3)?,
            })
        })?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    pub fn is_hunch_user(&self, hunch_id: i64, user_profile_id: i64) -> Result<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM hunch_users WHERE hunch_id = ?1 AND user_profile_id = ?2)",
            params![hunch_id, user_profile_id],
            |row| row.get(0),
        )?;
        Ok(found != 0)
    }

    /// Insert or update evidence, stamping its timestamps
    pub fn save_evidence(&self, evidence: &mut Evidence) -> Result<i64> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        evidence.stamp(Utc::now());

        let id = match evidence.id {
            None => {
                tx.execute(
                    r#"
                    INSERT INTO evidence (strength, time_created, time_modified, description, hunch_id, creator_id)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        evidence.strength,
                        evidence.time_created,
                        evidence.time_modified,
                        evidence.description,
                        evidence.hunch_id,
                        evidence.creator_id
                    ],
                )
                .context("Failed to insert evidence")?;
                tx.last_insert_rowid()
            }
            Some(id) => {
                let changed = tx
                    .execute(
                        "UPDATE evidence SET strength = ?2, time_modified = ?3, description = ?4 WHERE id = ?1",
                        params![id, evidence.strength, evidence.time_modified, evidence.description],
                    )
                    .context("Failed to update evidence")?;
                if changed == 0 {
                    return Err(StoreError::NotFound { entity: "evidence", id }.into());
                }
                id
            }
        };

        replace_links(&tx, "evidence_tags", "evidence_id", "tag_id", id, &evidence.tag_ids)?;
        tx.commit().context("Failed to commit evidence")?;

        evidence.id = Some(id);
        Ok(id)
    }

    pub fn get_evidence(&self, id: i64) -> Result<Option<Evidence>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM evidence WHERE id = ?1", EVIDENCE_COLUMNS),
            params![id],
            evidence_from_row,
        );

        match result {
            Ok(mut evidence) => {
                evidence.tag_ids =
                    load_links(&self.conn, "evidence_tags", "evidence_id", "tag_id", id)?;
                Ok(Some(evidence))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Evidence attached to a hunch, oldest first
    pub fn list_evidence(&self, hunch_id: i64) -> Result<Vec<Evidence>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM evidence WHERE hunch_id = ?1 ORDER BY time_created, id",
            EVIDENCE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![hunch_id], evidence_from_row)?;

        let mut evidence = Vec::new();
        for row in rows {
            evidence.push(row?);
        }
        Ok(evidence)
    }
}

fn replace_links(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    target_column: &str,
    owner_id: i64,
    target_ids: &[i64],
) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE {} = ?1", table, owner_column),
        params![owner_id],
    )?;
    for target_id in target_ids {
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)",
                table, owner_column, target_column
            ),
            params![owner_id, target_id],
        )
        .with_context(|| format!("Failed to link {} {}", target_column, target_id))?;
    }
    Ok(())
}

fn load_links(
    conn: &Connection,
    table: &str,
    owner_column: &str,
    target_column: &str,
    owner_id: i64,
) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {} WHERE {} = ?1 ORDER BY {}",
        target_column, table, owner_column, target_column
    ))?;
    let rows = stmt.query_map(params![owner_id], |row| row.get(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

fn hunch_from_row(row: &Row<'_>) -> rusqlite::Result<Hunch> {
    Ok(Hunch {
        id: Some(row.get(0)?),
        creator_id: row.get(1)?,
        time_created: row.get(2)?,
        time_modified: row.get(3)?,
        status: decode(row.get(4)?, HunchStatus::from_code),
        title: row.get(5)?,
        privacy: decode(row.get(6)?, PrivacyLevel::from_code),
        language_id: row.get(7)?,
        location_id: row.get(8)?,
        description: row.get(9)?,
        tag_ids: Vec::new(),
        skill_ids: Vec::new(),
    })
}

fn evidence_from_row(row: &Row<'_>) -> rusqlite::Result<Evidence> {
    Ok(Evidence {
        id: Some(row.get(0)?),
        strength: row.get(1)?,
        time_created: row.get(2)?,
        time_modified: row.get(3)?,
        description: row.get(4)?,
        hunch_id: row.get(5)?,
        creator_id: row.get(6)?,
        tag_ids: Vec::new(),
    })
}
