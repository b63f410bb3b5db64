use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{CostSheetId, CostSheetStatus, RateId, RateKey, RateKind, UserId};

/// audit events emitted by the workflow and rate administration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // cost sheet lifecycle
    CostSheetCreated {
        cost_sheet_id: CostSheetId,
        status: CostSheetStatus,
        created_by: UserId,
        grand_total: Money,
        timestamp: DateTime<Utc>,
    },
    CostSheetSubmitted {
        cost_sheet_id: CostSheetId,
        submitted_by: UserId,
        timestamp: DateTime<Utc>,
    },
    CostSheetApproved {
        cost_sheet_id: CostSheetId,
        approved_by: UserId,
        remarks: Option<String>,
        timestamp: DateTime<Utc>,
    },
    CostSheetRejected {
        cost_sheet_id: CostSheetId,
        rejected_by: UserId,
        remarks: String,
        timestamp: DateTime<Utc>,
    },
    CostSheetEdited {
        cost_sheet_id: CostSheetId,
        edited_by: UserId,
        previous_status: CostSheetStatus,
        old_grand_total: Money,
        new_grand_total: Money,
        timestamp: DateTime<Utc>,
    },

    // rate administration
    RateActivated {
        rate_id: RateId,
        kind: RateKind,
        key: RateKey,
        value: Decimal,
        effective_from: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    RateFallbackUsed {
        kind: RateKind,
        key: RateKey,
        as_of: DateTime<Utc>,
    },

    // notification delivery
    NotificationFailed {
        cost_sheet_id: CostSheetId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// the cost sheet an event concerns, if any
    pub fn cost_sheet_id(&self) -> Option<CostSheetId> {
        match self {
            Event::CostSheetCreated { cost_sheet_id, .. }
            | Event::CostSheetSubmitted { cost_sheet_id, .. }
            | Event::CostSheetApproved { cost_sheet_id, .. }
            | Event::CostSheetRejected { cost_sheet_id, .. }
            | Event::CostSheetEdited { cost_sheet_id, .. }
            | Event::NotificationFailed { cost_sheet_id, .. } => Some(*cost_sheet_id),
            Event::RateActivated { .. } | Event::RateFallbackUsed { .. } => None,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// events concerning a single cost sheet, oldest first
    pub fn for_cost_sheet(&self, id: CostSheetId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.cost_sheet_id() == Some(id))
            .collect()
    }
}
