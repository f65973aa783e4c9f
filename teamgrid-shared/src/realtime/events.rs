/// Lifecycle events pushed through the fan-out registry
///
/// Emitted on every invitation transition: the invitee hears about new
/// invitations, organization admins hear about accepts and rejects.
/// Delivery is best-effort; the persisted notification row is the durable
/// record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A realtime lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// An invitation was sent to the recipient
    InviteReceived {
        /// Organization extending the invitation
        org_id: Uuid,
        /// Organization display name
        org_name: String,
        /// Email the invitation was addressed to
        invited_email: String,
    },

    /// An invitation into the recipient's organization was accepted
    InviteAccepted {
        /// Organization the invitee joined
        org_id: Uuid,
        /// Membership row that became active
        membership_id: Uuid,
        /// Email of the accepting user
        invited_email: String,
    },

    /// An invitation into the recipient's organization was rejected
    InviteRejected {
        /// Organization whose invitation was declined
        org_id: Uuid,
        /// Membership row that was rejected
        membership_id: Uuid,
        /// Email of the rejecting user
        invited_email: String,
    },

    /// The recipient's role in an organization changed
    RoleUpdated {
        /// Organization where the role changed
        org_id: Uuid,
        /// New role as a string
        role: String,
    },
}

impl LifecycleEvent {
    /// Stable kind string, used for the persisted notification row
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleEvent::InviteReceived { .. } => "invite_received",
            LifecycleEvent::InviteAccepted { .. } => "invite_accepted",
            LifecycleEvent::InviteRejected { .. } => "invite_rejected",
            LifecycleEvent::RoleUpdated { .. } => "role_updated",
        }
    }
}
