//! Routing of engine-generated mail.

use crate::error::CareerError;
use league_core::{Career, ClubId, MailId};
use serde::{Deserialize, Serialize};

/// Result of marking an item read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailReceipt {
    pub mail: MailId,
    /// False when the item had already been read.
    pub changed: bool,
}

/// Mail about `involved` clubs. With a managed club it only arrives when that club is involved;
/// without one it goes to everyone.
pub(crate) fn notify_clubs(
    career: &mut Career,
    involved: &[ClubId],
    subject: impl Into<String>,
    body: impl Into<String>,
) -> Option<MailId> {
    let to = match career.meta.managed_club {
        Some(m) if involved.contains(&m) => Some(m),
        Some(_) => return None,
        None => None,
    };
    Some(deliver(career, to, subject, body))
}

/// League-wide news for the manager's desk.
pub(crate) fn notify_all(
    career: &mut Career,
    subject: impl Into<String>,
    body: impl Into<String>,
) -> MailId {
    let to = career.meta.managed_club;
    deliver(career, to, subject, body)
}

fn deliver(
    career: &mut Career,
    to: Option<ClubId>,
    subject: impl Into<String>,
    body: impl Into<String>,
) -> MailId {
    let g = &mut career.graph;
    let (season, week) = (g.season.number, g.season.calendar.week);
    g.mailbox.deliver(season, week, to, subject, body)
}

/// Mark one item read; repeating it changes nothing.
pub(crate) fn mark_read(career: &mut Career, mail: MailId) -> Result<MailReceipt, CareerError> {
    let changed = career
        .graph
        .mailbox
        .mark_read(mail)
        .ok_or(CareerError::MailNotFound(mail))?;
    Ok(MailReceipt { mail, changed })
}
