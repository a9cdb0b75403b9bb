//! Groups and membership rows

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{debug, info};

use super::accounts::profile_exists;
use super::{decode, Database, StoreError};
use crate::collab::MembershipPlan;
use crate::models::{Group, GroupType, Membership, PrivacyLevel, DEFAULT_ACCESS_LEVEL, DEFAULT_STATUS};

const GROUP_COLUMNS: &str = "id, name, abbreviation, group_type, privacy, location_id";

/// One page of the group index
#[derive(Debug, Clone, Serialize)]
pub struct GroupPage {
    pub groups: Vec<Group>,
    /// 1-based
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

impl GroupPage {
    pub fn page_count(&self) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        ((self.total.max(0) as u64).div_ceil(self.page_size as u64)) as u32
    }
}

impl Database {
    /// Insert a group and its initial members in one transaction.
    ///
    /// `group.id` is overwritten with the new row id. Every id in `members`
    /// must name an existing profile.
    pub fn create_group(&self, group: &mut Group, members: &BTreeSet<i64>) -> Result<MembershipPlan> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO groups (name, abbreviation, group_type, privacy, location_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                group.name,
                group.abbreviation,
                group.group_type.code(),
                group.privacy.code(),
                group.location_id
            ],
        )
        .with_context(|| format!("Failed to insert group {}", group.name))?;
        group.id = tx.last_insert_rowid();

        let plan = MembershipPlan::for_new_group(members);
        apply_plan(&tx, group.id, &plan)?;
        tx.commit().context("Failed to commit group creation")?;

        info!(group_id = group.id, members = plan.to_add.len(), "created group");
        Ok(plan)
    }

    /// Save a group's fields and reconcile its members with `members`.
    ///
    /// Existing rows are read inside the same immediate transaction that
    /// applies the changes, so a concurrent edit cannot interleave.
    pub fn update_group(&self, group: &Group, members: &BTreeSet<i64>) -> Result<MembershipPlan> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        let changed = tx
            .execute(
                r#"
                UPDATE groups
                SET name = ?2, abbreviation = ?3, group_type = ?4, privacy = ?5, location_id = ?6
                WHERE id = ?1
                "#,
                params![
                    group.id,
                    group.name,
                    group.abbreviation,
                    group.group_type.code(),
                    group.privacy.code(),
                    group.location_id
                ],
            )
            .with_context(|| format!("Failed to update group {}", group.id))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "group",
                id: group.id,
            }
            .into());
        }

        let existing = load_memberships(&tx, group.id)?;
        let plan = MembershipPlan::between(&existing, members);
        apply_plan(&tx, group.id, &plan)?;
        tx.commit().context("Failed to commit group update")?;

        info!(
            group_id = group.id,
            added = plan.to_add.len(),
            removed = plan.to_remove.len(),
            "reconciled group members"
        );
        Ok(plan)
    }

    pub fn get_group(&self, id: i64) -> Result<Option<Group>> {
        let result = self.conn.query_row(
            &format!("SELECT {} FROM groups WHERE id = ?1", GROUP_COLUMNS),
            params![id],
            group_from_row,
        );

        match result {
            Ok(group) => Ok(Some(group)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether another group already uses `name`
    pub fn group_name_taken(&self, name: &str, except_id: Option<i64>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM groups WHERE name = ?1 AND id != ?2",
            params![name, except_id.unwrap_or(-1)],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Groups ordered by id, one page at a time. Pages start at 1; a page
    /// past the end is empty.
    pub fn list_groups(&self, page: u32, page_size: u32) -> Result<GroupPage> {
        let page = page.max(1);
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM groups", [], |row| row.get(0))?;

        let offset = i64::from(page - 1) * i64::from(page_size);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM groups ORDER BY id LIMIT ?1 OFFSET ?2",
            GROUP_COLUMNS
        ))?;
        let rows = stmt.query_map(params![page_size, offset], group_from_row)?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }

        Ok(GroupPage {
            groups,
            page,
            page_size,
            total,
        })
    }

    pub fn list_memberships(&self, group_id: i64) -> Result<Vec<Membership>> {
        load_memberships(&self.conn, group_id)
    }

    /// Add a single membership row with explicit access level and status
    pub fn add_membership(
        &self,
        group_id: i64,
        user_profile_id: i64,
        access_level: i64,
        status: i64,
    ) -> Result<Membership> {
        insert_membership(&self.conn, group_id, user_profile_id, access_level, status)
    }
}

/// Creations first, then deletions
fn apply_plan(conn: &Connection, group_id: i64, plan: &MembershipPlan) -> Result<()> {
    for &profile_id in &plan.to_add {
        if !profile_exists(conn, profile_id)? {
            return Err(StoreError::UnknownProfile(profile_id).into());
        }
        insert_membership(conn, group_id, profile_id, DEFAULT_ACCESS_LEVEL, DEFAULT_STATUS)?;
    }

    for &membership_id in &plan.to_remove {
        conn.execute(
            "DELETE FROM user_profile_groups WHERE id = ?1",
            params![membership_id],
        )
        .with_context(|| format!("Failed to delete membership {}", membership_id))?;
        debug!(group_id, membership_id, "removed membership");
    }
    Ok(())
}

fn insert_membership(
    conn: &Connection,
    group_id: i64,
    user_profile_id: i64,
    access_level: i64,
    status: i64,
) -> Result<Membership> {
    conn.execute(
        r#"
        INSERT INTO user_profile_groups (user_profile_id, group_id, access_level, status)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![user_profile_id, group_id, access_level, status],
    )
    .with_context(|| format!("Failed to add profile {} to group {}", user_profile_id, group_id))?;

    Ok(Membership {
        id: conn.last_insert_rowid(),
        user_profile_id,
        group_id,
        access_level,
        status,
    })
}

fn load_memberships(conn: &Connection, group_id: i64) -> Result<Vec<Membership>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, user_profile_id, group_id, access_level, status
        FROM user_profile_groups
        WHERE group_id = ?1
        ORDER BY id
        "#,
    )?;
    let rows = stmt.query_map(params![group_id], |row| {
        Ok(Membership {
            id: row.get(0)?,
            user_profile_id: row.get(1)?,
            group_id: row.get(2)?,
            access_level: row.get(3)?,
            status: row.get(4)?,
        })
    })?;

    let mut memberships = Vec::new();
    for row in rows {
        memberships.push(row?);
    }
    Ok(memberships)
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        abbreviation: row.get(2)?,
        group_type: decode(row.get(3)?, GroupType::from_code),
        privacy: decode(row.get(4)?, PrivacyLevel::from_code),
        location_id: row.get(5)?,
    })
}
