pub mod authorization;
pub mod notification;

pub use authorization::{Actor, AuthorizationModel, AuthorizationPolicy, CapabilitySet};
pub use notification::{
    dispatch, LogNotifier, Notification, NotificationKind, Notifier, Recipient, RecordingNotifier,
};

use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::cost_sheet::{CostSheet, Revision};
use crate::errors::{CostSheetError, Result};
use crate::events::Event;
use crate::types::{Capability, CostSheetStatus};

/// event names, used for legality checks and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Submit,
    Approve,
    Reject,
    Edit,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Submit => "submit",
            EventKind::Approve => "approve",
            EventKind::Reject => "reject",
            EventKind::Edit => "edit",
        };
        f.write_str(name)
    }
}

/// workflow event with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    Submit,
    Approve { remarks: Option<String> },
    Reject { remarks: String },
    /// replace inputs with a revision from `CalculationEngine::price`
    Edit(Box<Revision>),
}

impl WorkflowEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkflowEvent::Submit => EventKind::Submit,
            WorkflowEvent::Approve { .. } => EventKind::Approve,
            WorkflowEvent::Reject { .. } => EventKind::Reject,
            WorkflowEvent::Edit(_) => EventKind::Edit,
        }
    }
}

/// outcome of a successful transition; nothing has been persisted yet
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub sheet: CostSheet,
    pub notification: Option<Notification>,
    pub event: Event,
}

/// status after applying `event` in `from`, or `None` when the pair is illegal
pub fn next_status(from: CostSheetStatus, event: EventKind) -> Option<CostSheetStatus> {
    match (from, event) {
        (CostSheetStatus::Draft, EventKind::Submit) => Some(CostSheetStatus::PendingApproval),
        (CostSheetStatus::PendingApproval, EventKind::Approve) => Some(CostSheetStatus::Approved),
        (CostSheetStatus::PendingApproval, EventKind::Reject) => Some(CostSheetStatus::Rejected),
        (CostSheetStatus::Draft | CostSheetStatus::Rejected, EventKind::Edit) => {
            Some(CostSheetStatus::Draft)
        }
        _ => None,
    }
}

/// pure approval state machine; callers persist the returned sheet
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    authorization: AuthorizationPolicy,
}

impl StateMachine {
    pub fn new(model: AuthorizationModel) -> Self {
        Self {
            authorization: AuthorizationPolicy::from_model(model),
        }
    }

    pub fn with_policy(authorization: AuthorizationPolicy) -> Self {
        Self { authorization }
    }

    pub fn authorization(&self) -> &AuthorizationPolicy {
        &self.authorization
    }

    /// build a new sheet, optionally submitted in the same step
    pub fn create(
        &self,
        revision: Revision,
        actor: &Actor,
        submit: bool,
        time_provider: &SafeTimeProvider,
    ) -> Result<Transition> {
        let now = time_provider.now();
        let mut sheet = CostSheet::draft(revision, actor.user_id.clone(), now);

        let notification = if submit {
            sheet.status = CostSheetStatus::PendingApproval;
            sheet.submitted_at = Some(now);
            Some(self.submitted_notification(&sheet))
        } else {
            None
        };

        info!(
            cost_sheet_id = %sheet.id,
            status = %sheet.status,
            created_by = %actor.user_id,
            "cost sheet created"
        );

        let event = Event::CostSheetCreated {
            cost_sheet_id: sheet.id,
            status: sheet.status,
            created_by: actor.user_id.clone(),
            grand_total: sheet.grand_total(),
            timestamp: now,
        };

        Ok(Transition {
            sheet,
            notification,
            event,
        })
    }

    /// legality then privilege; payload is not inspected
    pub fn authorize(
        &self,
        sheet: &CostSheet,
        event: EventKind,
        actor: &Actor,
    ) -> Result<CostSheetStatus> {
        let to = next_status(sheet.status, event).ok_or_else(|| CostSheetError::InvalidTransition {
            from: sheet.status,
            event: event.to_string(),
        })?;

        match event {
            EventKind::Submit => self.require_owner_or(sheet, actor, Capability::Submit)?,
            EventKind::Edit => self.require_owner_or(sheet, actor, Capability::EditAny)?,
            EventKind::Approve | EventKind::Reject => {
                self.authorization.require(actor, Capability::Approve)?
            }
        }

        Ok(to)
    }

    /// apply one event; a failed guard leaves `sheet` untouched
    pub fn transition(
        &self,
        sheet: &CostSheet,
        event: WorkflowEvent,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<Transition> {
        let from = sheet.status;
        let to = self.authorize(sheet, event.kind(), actor)?;
        let now = time_provider.now();
        let mut next = sheet.clone();

        let (event, notification) = match event {
            WorkflowEvent::Submit => {
                next.submitted_at = Some(now);
                next.status = to;
                let notification = self.submitted_notification(&next);
                let event = Event::CostSheetSubmitted {
                    cost_sheet_id: next.id,
                    submitted_by: actor.user_id.clone(),
                    timestamp: now,
                };
                (event, Some(notification))
            }
            WorkflowEvent::Approve { remarks } => {
                let remarks = remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
                next.status = to;
                next.approved_at = Some(now);
                next.approved_by = Some(actor.user_id.clone());
                next.approval_remarks = remarks.clone();
                let event = Event::CostSheetApproved {
                    cost_sheet_id: next.id,
                    approved_by: actor.user_id.clone(),
                    remarks,
                    timestamp: now,
                };
                (event, Some(creator_notification(&next, NotificationKind::Approved)))
            }
            WorkflowEvent::Reject { remarks } => {
                let remarks = remarks.trim();
                if remarks.is_empty() {
                    return Err(CostSheetError::validation(
                        "approval_remarks",
                        "remarks are required when rejecting",
                    ));
                }
                next.status = to;
                next.approved_at = Some(now);
                next.approved_by = Some(actor.user_id.clone());
                next.approval_remarks = Some(remarks.to_string());
                let event = Event::CostSheetRejected {
                    cost_sheet_id: next.id,
                    rejected_by: actor.user_id.clone(),
                    remarks: remarks.to_string(),
                    timestamp: now,
                };
                (event, Some(creator_notification(&next, NotificationKind::Rejected)))
            }
            WorkflowEvent::Edit(revision) => {
                let old_grand_total = next.grand_total();
                next.apply_revision(*revision);
                next.clear_approval();
                next.status = to;
                let event = Event::CostSheetEdited {
                    cost_sheet_id: next.id,
                    edited_by: actor.user_id.clone(),
                    previous_status: from,
                    old_grand_total,
                    new_grand_total: next.grand_total(),
                    timestamp: now,
                };
                (event, None)
            }
        };

        next.touch(now);

        info!(
            cost_sheet_id = %next.id,
            from = %from,
            to = %next.status,
            actor = %actor.user_id,
            role = %actor.role,
            "cost sheet transition"
        );

        Ok(Transition {
            sheet: next,
            notification,
            event,
        })
    }

    fn require_owner_or(
        &self,
        sheet: &CostSheet,
        actor: &Actor,
        capability: Capability,
    ) -> Result<()> {
        if sheet.is_created_by(&actor.user_id) {
            return Ok(());
        }
        self.authorization.require(actor, capability)
    }

    fn submitted_notification(&self, sheet: &CostSheet) -> Notification {
        Notification {
            kind: NotificationKind::Submitted,
            summary: sheet.summary(),
            recipients: self
                .authorization
                .roles_with(Capability::Approve)
                .into_iter()
                .map(Recipient::Role)
                .collect(),
        }
    }
}

fn creator_notification(sheet: &CostSheet, kind: NotificationKind) -> Notification {
    Notification {
        kind,
        summary: sheet.summary(),
        recipients: vec![Recipient::User(sheet.created_by.clone())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost_sheet::fixtures;
    use crate::types::Role;
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 5, 6, 10, 0, 0).unwrap()))
    }

    fn approve() -> WorkflowEvent {
        WorkflowEvent::Approve { remarks: None }
    }

    fn draft(time_provider: &SafeTimeProvider) -> CostSheet {
        let vehicle = fixtures::vehicle();
        let revision = fixtures::revision(&vehicle, 2_200_000, time_provider.now());
        StateMachine::default()
            .create(revision, &Actor::staff("asha"), false, time_provider)
            .unwrap()
            .sheet
    }

    #[test]
    fn test_legal_pairs() {
        use CostSheetStatus::*;
        assert_eq!(next_status(Draft, EventKind::Submit), Some(PendingApproval));
        assert_eq!(next_status(PendingApproval, EventKind::Approve), Some(Approved));
        assert_eq!(next_status(PendingApproval, EventKind::Reject), Some(Rejected));
        assert_eq!(next_status(Rejected, EventKind::Edit), Some(Draft));
        assert_eq!(next_status(Draft, EventKind::Edit), Some(Draft));

        assert_eq!(next_status(Approved, EventKind::Edit), None);
        assert_eq!(next_status(PendingApproval, EventKind::Edit), None);
        assert_eq!(next_status(Draft, EventKind::Approve), None);
        assert_eq!(next_status(Rejected, EventKind::Submit), None);
        assert_eq!(next_status(Approved, EventKind::Reject), None);
    }

    #[test]
    fn test_create_with_submit() {
        let time = time();
        let vehicle = fixtures::vehicle();
        let revision = fixtures::revision(&vehicle, 2_200_000, time.now());

        let transition = StateMachine::default()
            .create(revision, &Actor::staff("asha"), true, &time)
            .unwrap();

        assert_eq!(transition.sheet.status, CostSheetStatus::PendingApproval);
        assert_eq!(transition.sheet.submitted_at, Some(time.now()));
        let notification = transition.notification.unwrap();
        assert_eq!(notification.kind, NotificationKind::Submitted);
        assert_eq!(notification.recipients, vec![Recipient::Role(Role::SuperAdmin)]);
    }

    #[test]
    fn test_submit_approve() {
        let time = time();
        let control = time.test_control().unwrap();
        let machine = StateMachine::default();
        let sheet = draft(&time);

        let submitted = machine
            .transition(&sheet, WorkflowEvent::Submit, &Actor::staff("asha"), &time)
            .unwrap();
        assert_eq!(submitted.sheet.status, CostSheetStatus::PendingApproval);
        assert_eq!(submitted.sheet.version, sheet.version + 1);

        control.advance(Duration::hours(3));
        let approved = machine
            .transition(
                &submitted.sheet,
                WorkflowEvent::Approve {
                    remarks: Some("  ok for Q3  ".to_string()),
                },
                &Actor::super_admin("meera"),
                &time,
            )
            .unwrap();

        assert_eq!(approved.sheet.status, CostSheetStatus::Approved);
        assert_eq!(approved.sheet.approved_by.as_deref(), Some("meera"));
        assert_eq!(approved.sheet.approval_remarks.as_deref(), Some("ok for Q3"));
        assert_eq!(approved.sheet.approved_at, Some(time.now()));
        assert_eq!(
            approved.notification.unwrap().recipients,
            vec![Recipient::User("asha".to_string())]
        );
    }

    #[test]
    fn test_submit_by_other_staff_refused() {
        let time = time();
        let sheet = draft(&time);

        let err = StateMachine::default()
            .transition(&sheet, WorkflowEvent::Submit, &Actor::staff("ravi"), &time)
            .unwrap_err();
        assert!(matches!(err, CostSheetError::InsufficientPrivilege { .. }));

        // admins hold the submit capability
        assert!(StateMachine::default()
            .transition(&sheet, WorkflowEvent::Submit, &Actor::admin("kiran"), &time)
            .is_ok());
    }

    #[test]
    fn test_admin_cannot_approve_by_default() {
        let time = time();
        let machine = StateMachine::default();
        let sheet = draft(&time);
        let pending = machine
            .transition(&sheet, WorkflowEvent::Submit, &Actor::staff("asha"), &time)
            .unwrap()
            .sheet;

        let err = machine
            .transition(&pending, approve(), &Actor::admin("kiran"), &time)
            .unwrap_err();
        assert_eq!(
            err,
            CostSheetError::InsufficientPrivilege {
                role: Role::Admin,
                capability: Capability::Approve,
            }
        );

        let lenient = StateMachine::new(AuthorizationModel::AdminApproves);
        assert!(lenient
            .transition(&pending, approve(), &Actor::admin("kiran"), &time)
            .is_ok());
    }

    #[test]
    fn test_reject_requires_remarks() {
        let time = time();
        let machine = StateMachine::default();
        let pending = machine
            .transition(&draft(&time), WorkflowEvent::Submit, &Actor::staff("asha"), &time)
            .unwrap()
            .sheet;

        let err = machine
            .transition(
                &pending,
                WorkflowEvent::Reject {
                    remarks: "   ".to_string(),
                },
                &Actor::super_admin("meera"),
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, CostSheetError::Validation { .. }));
    }

    #[test]
    fn test_privilege_checked_before_remarks() {
        let time = time();
        let machine = StateMachine::default();
        let pending = machine
            .transition(&draft(&time), WorkflowEvent::Submit, &Actor::staff("asha"), &time)
            .unwrap()
            .sheet;

        let err = machine
            .transition(
                &pending,
                WorkflowEvent::Reject { remarks: String::new() },
                &Actor::staff("asha"),
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, CostSheetError::InsufficientPrivilege { .. }));
    }

    #[test]
    fn test_edit_after_reject_resets_to_draft() {
        let time = time();
        let machine = StateMachine::default();
        let pending = machine
            .transition(&draft(&time), WorkflowEvent::Submit, &Actor::staff("asha"), &time)
            .unwrap()
            .sheet;
        let rejected = machine
            .transition(
                &pending,
                WorkflowEvent::Reject {
                    remarks: "interest too high".to_string(),
                },
                &Actor::super_admin("meera"),
                &time,
            )
            .unwrap()
            .sheet;

        let vehicle = fixtures::vehicle();
        let revision = fixtures::revision(&vehicle, 1_900_000, time.now());
        let edited = machine
            .transition(
                &rejected,
                WorkflowEvent::Edit(Box::new(revision.clone())),
                &Actor::staff("asha"),
                &time,
            )
            .unwrap();

        assert_eq!(edited.sheet.status, CostSheetStatus::Draft);
        assert_eq!(edited.sheet.approval_remarks, None);
        assert_eq!(edited.sheet.approved_by, None);
        assert_eq!(edited.sheet.submitted_at, None);
        assert_eq!(&edited.sheet.derived, revision.derived());
        assert_eq!(edited.sheet.vehicle_id(), vehicle.id);
        assert!(matches!(
            edited.event,
            Event::CostSheetEdited {
                previous_status: CostSheetStatus::Rejected,
                ..
            }
        ));
        assert!(edited.notification.is_none());
    }

    #[test]
    fn test_approved_is_immutable() {
        let time = time();
        let machine = StateMachine::new(AuthorizationModel::AdminApproves);
        let pending = machine
            .transition(&draft(&time), WorkflowEvent::Submit, &Actor::staff("asha"), &time)
            .unwrap()
            .sheet;
        let approved = machine
            .transition(&pending, approve(), &Actor::admin("kiran"), &time)
            .unwrap()
            .sheet;

        let vehicle = fixtures::vehicle();
        for actor in [Actor::staff("asha"), Actor::admin("kiran"), Actor::super_admin("meera")] {
            let revision = fixtures::revision(&vehicle, 1_900_000, time.now());
            let err = machine
                .transition(&approved, WorkflowEvent::Edit(Box::new(revision)), &actor, &time)
                .unwrap_err();
            assert_eq!(
                err,
                CostSheetError::InvalidTransition {
                    from: CostSheetStatus::Approved,
                    event: "edit".to_string(),
                }
            );
        }
    }
}
