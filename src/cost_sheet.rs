use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculation::{CostSheetInput, DerivedFields};
use crate::decimal::Money;
use crate::rates::ResolvedRates;
use crate::types::{CostSheetId, CostSheetStatus, UserId, VehicleId};

/// a priced set of inputs: what a cost sheet holds between edits
///
/// only `CalculationEngine::price` builds one, so `derived` always matches `input` and `rates`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Revision {
    input: CostSheetInput,
    derived: DerivedFields,
    rates: ResolvedRates,
    priced_at: DateTime<Utc>,
}

impl Revision {
    pub(crate) fn new(
        input: CostSheetInput,
        derived: DerivedFields,
        rates: ResolvedRates,
        priced_at: DateTime<Utc>,
    ) -> Self {
        Self {
            input,
            derived,
            rates,
            priced_at,
        }
    }

    pub fn input(&self) -> &CostSheetInput {
        &self.input
    }

    pub fn derived(&self) -> &DerivedFields {
        &self.derived
    }

    pub fn rates(&self) -> &ResolvedRates {
        &self.rates
    }

    pub fn priced_at(&self) -> DateTime<Utc> {
        self.priced_at
    }
}

/// persisted cost sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSheet {
    pub id: CostSheetId,
    pub input: CostSheetInput,
    pub derived: DerivedFields,
    pub rates: ResolvedRates,
    pub priced_at: DateTime<Utc>,

    // workflow
    pub status: CostSheetStatus,
    pub approval_remarks: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<UserId>,

    // audit
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// bumped on every write; stores compare it to detect lost updates
    pub version: u64,
}

impl CostSheet {
    /// new draft from a priced revision
    pub fn draft(revision: Revision, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            input: revision.input,
            derived: revision.derived,
            rates: revision.rates,
            priced_at: revision.priced_at,
            status: CostSheetStatus::Draft,
            approval_remarks: None,
            submitted_at: None,
            approved_at: None,
            approved_by: None,
            created_by,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn is_created_by(&self, user: &str) -> bool {
        self.created_by == user
    }

    pub fn vehicle_id(&self) -> VehicleId {
        self.input.vehicle_id
    }

    pub fn grand_total(&self) -> Money {
        self.derived.grand_total
    }

    /// replace inputs and every derived figure
    pub fn apply_revision(&mut self, revision: Revision) {
        self.input = revision.input;
        self.derived = revision.derived;
        self.rates = revision.rates;
        self.priced_at = revision.priced_at;
    }

    /// drop submission and approval stamps
    pub fn clear_approval(&mut self) {
        self.approval_remarks = None;
        self.submitted_at = None;
        self.approved_at = None;
        self.approved_by = None;
    }

    /// record a write at `now`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }

    pub fn summary(&self) -> CostSheetSummary {
        CostSheetSummary {
            id: self.id,
            company_name: self.input.company_name.clone(),
            vehicle_id: self.input.vehicle_id,
            tenure_months: self.derived.tenure_months,
            grand_total: self.derived.grand_total.to_presentation(),
            status: self.status,
            created_by: self.created_by.clone(),
            approved_by: self.approved_by.clone(),
            approval_remarks: self.approval_remarks.clone(),
        }
    }
}

/// compact view handed to notifications and listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSheetSummary {
    pub id: CostSheetId,
    pub company_name: String,
    pub vehicle_id: VehicleId,
    pub tenure_months: u32,
    pub grand_total: Money,
    pub status: CostSheetStatus,
    pub created_by: UserId,
    pub approved_by: Option<UserId>,
    pub approval_remarks: Option<String>,
}
