//! Inbox. Append-only; items only move from unread to read.

use crate::ids::{ClubId, MailId};
use serde::{Deserialize, Serialize};

/// Read state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailStatus {
    Unread,
    Read,
}

/// A message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailItem {
    pub id: MailId,
    pub season: u32,
    pub week: u32,
    /// Addressed club; `None` goes to everyone.
    pub to: Option<ClubId>,
    pub subject: String,
    pub body: String,
    pub status: MailStatus,
}

/// All mail of a career in delivery order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mailbox {
    items: Vec<MailItem>,
}

impl Mailbox {
    /// Items oldest first.
    pub fn items(&self) -> &[MailItem] {
        &self.items
    }

    /// Deliver a new unread item.
    pub fn deliver(
        &mut self,
        season: u32,
        week: u32,
        to: Option<ClubId>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> MailId {
        let id = MailId(self.items.len() as u32 + 1);
        self.items.push(MailItem {
            id,
            season,
            week,
            to,
            subject: subject.into(),
            body: body.into(),
            status: MailStatus::Unread,
        });
        id
    }

    /// Look up an item.
    pub fn get(&self, id: MailId) -> Option<&MailItem> {
        self.items.iter().find(|m| m.id == id)
    }

    /// Mark as read. Returns whether the state changed, or `None` if the id is unknown.
    pub fn mark_read(&mut self, id: MailId) -> Option<bool> {
        let item = self.items.iter_mut().find(|m| m.id == id)?;
        let changed = item.status == MailStatus::Unread;
        item.status = MailStatus::Read;
        Some(changed)
    }

    /// Number of unread items.
    pub fn unread(&self) -> usize {
        self.items
            .iter()
            .filter(|m| m.status == MailStatus::Unread)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_transition_is_one_way() {
        let mut mb = Mailbox::default();
        let id = mb.deliver(1, 1, None, "Welcome", "Good luck");
        assert_eq!(mb.unread(), 1);
        assert_eq!(mb.mark_read(id), Some(true));
        assert_eq!(mb.mark_read(id), Some(false));
        assert_eq!(mb.mark_read(MailId(99)), None);
        assert_eq!(mb.get(id).map(|m| m.status), Some(MailStatus::Read));
    }
}
