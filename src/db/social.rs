//! Connections between profiles and invitations

use anyhow::{Context, Result};
use rusqlite::{params, Transaction, TransactionBehavior};

use super::Database;
use crate::models::{Connection as ProfileConnection, Invitation, UserInvite};

impl Database {
    /// Record a directed connection. No inverse row is created.
    pub fn create_connection(
        &self,
        user_profile_id: i64,
        other_user_profile_id: i64,
        status: i64,
    ) -> Result<ProfileConnection> {
        self.conn
            .execute(
                "INSERT INTO connections (user_profile_id, other_user_profile_id, status) VALUES (?1, ?2, ?3)",
                params![user_profile_id, other_user_profile_id, status],
            )
            .context("Failed to create connection")?;
        Ok(ProfileConnection {
            id: self.conn.last_insert_rowid(),
            user_profile_id,
            other_user_profile_id,
            status,
        })
    }

    /// Outgoing connections of a profile
    pub fn list_connections(&self, user_profile_id: i64) -> Result<Vec<ProfileConnection>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_profile_id, other_user_profile_id, status
            FROM connections
            WHERE user_profile_id = ?1
            ORDER BY id
            "#,
        )?;
        let rows = stmt.query_map(params![user_profile_id], |row| {
            Ok(ProfileConnection {
                id: row.get(0)?,
                user_profile_id: row.get(1)?,
                other_user_profile_id: row.get(2)?,
                status: row.get(3)?,
            })
        })?;

        let mut connections = Vec::new();
        for row in rows {
            connections.push(row?);
        }
        Ok(connections)
    }

    /// Write one invitation and its invite row.
    ///
    /// The pair commits together; a failure on either insert leaves neither.
    pub fn create_invitation(
        &self,
        email: &str,
        invited_by: i64,
        hunch_id: Option<i64>,
        status: i64,
    ) -> Result<(Invitation, UserInvite)> {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO invitations (email, invited_by, hunch_id) VALUES (?1, ?2, ?3)",
            params![email, invited_by, hunch_id],
        )
        .with_context(|| format!("Failed to insert invitation for {}", email))?;
        let invitation = Invitation {
            id: tx.last_insert_rowid(),
            email: email.to_string(),
            invited_by,
            hunch_id,
        };

        tx.execute(
            "INSERT INTO user_invites (invitation_id, account_id, status) VALUES (?1, ?2, ?3)",
            params![invitation.id, invited_by, status],
        )
        .with_context(|| format!("Failed to insert user invite for {}", email))?;
        let invite = UserInvite {
            id: tx.last_insert_rowid(),
            invitation_id: invitation.id,
            account_id: invited_by,
            status,
        };

        tx.commit().context("Failed to commit invitation")?;
        Ok((invitation, invite))
    }

    pub fn list_invitations(&self, invited_by: i64) -> Result<Vec<Invitation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, invited_by, hunch_id FROM invitations WHERE invited_by = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![invited_by], |row| {
            Ok(Invitation {
                id: row.get(0)?,
                email: row.get(1)?,
                invited_by: row.get(2)?,
                hunch_id: row.get(3)?,
            })
        })?;

        let mut invitations = Vec::new();
        for row in rows {
            invitations.push(row?);
        }
        Ok(invitations)
    }

    pub fn count_user_invites(&self, account_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM user_invites WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
