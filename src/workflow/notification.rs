use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::cost_sheet::CostSheetSummary;
use crate::errors::{CostSheetError, Result};
use crate::types::{Role, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// a sheet is waiting on an approver
    Submitted,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    User(UserId),
    /// everyone holding the role
    Role(Role),
}

/// message produced by a transition; delivery is the notifier's business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub summary: CostSheetSummary,
    pub recipients: Vec<Recipient>,
}

impl Notification {
    pub fn subject(&self) -> String {
        let action = match self.kind {
            NotificationKind::Submitted => "awaiting approval",
            NotificationKind::Approved => "approved",
            NotificationKind::Rejected => "rejected",
        };
        format!("cost sheet for {} {}", self.summary.company_name, action)
    }
}

/// outbound notification channel (email, chat, ...)
pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// deliver and swallow failures; returns the failure reason so callers can audit it
pub fn dispatch<N: Notifier + ?Sized>(notifier: &N, notification: &Notification) -> Option<String> {
    match notifier.notify(notification) {
        Ok(()) => None,
        Err(err) => {
            warn!(
                cost_sheet_id = %notification.summary.id,
                kind = ?notification.kind,
                error = %err,
                "notification delivery failed"
            );
            Some(err.to_string())
        }
    }
}

/// notifier that writes to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            cost_sheet_id = %notification.summary.id,
            recipients = notification.recipients.len(),
            "{}",
            notification.subject()
        );
        Ok(())
    }
}

/// keeps every delivered notification in memory; can be switched to fail
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut flag) = self.failing.lock() {
            *flag = failing;
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        let failing = self.failing.lock().map(|flag| *flag).unwrap_or(false);
        if failing {
            return Err(CostSheetError::Notification {
                message: "recording notifier set to fail".to_string(),
            });
        }

        let mut sent = self.sent.lock().map_err(|_| CostSheetError::Notification {
            message: "recording notifier lock poisoned".to_string(),
        })?;
        sent.push(notification.clone());
        Ok(())
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, notification: &Notification) -> Result<()> {
        (**self).notify(notification)
    }
}
