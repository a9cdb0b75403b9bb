//! Invitation batches

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::db::Database;
use crate::models::{Identity, Invitation, UserInvite, DEFAULT_STATUS};

/// Everything written for one batch, in submission order
#[derive(Debug, Default, Serialize)]
pub struct InvitationBatch {
    pub invitations: Vec<(Invitation, UserInvite)>,
}

impl InvitationBatch {
    pub fn len(&self) -> usize {
        self.invitations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invitations.is_empty()
    }
}

/// Records invitations sent by a single inviter
pub struct InvitationManager;

impl InvitationManager {
    /// Write one invitation and one invite row per address.
    ///
    /// Addresses are not deduplicated. Each pair commits on its own, so a
    /// failure part-way keeps the earlier pairs and stops the batch.
    pub fn record(
        db: &Database,
        inviter: &Identity,
        emails: &[String],
        hunch_id: Option<i64>,
    ) -> Result<InvitationBatch> {
        let mut batch = InvitationBatch::default();

        for email in emails {
            let (invitation, invite) = db
                .create_invitation(email, inviter.id, hunch_id, DEFAULT_STATUS)
                .with_context(|| {
                    format!(
                        "Failed to record invitation for {} after {} recorded",
                        email,
                        batch.len()
                    )
                })?;
            debug!(invitation_id = invitation.id, email = %email, "recorded invitation");
            batch.invitations.push((invitation, invite));
        }

        info!(inviter = inviter.id, count = batch.len(), "invitation batch recorded");
        Ok(batch)
    }

    /// Format a batch for display
    pub fn format_batch(batch: &InvitationBatch) -> String {
        let mut output = format!("Recorded {} invitation(s)\n", batch.len());
        for (invitation, _) in &batch.invitations {
            output.push_str(&format!("  #{} {}\n", invitation.id, invitation.email));
        }
        output
    }
}
