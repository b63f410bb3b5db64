use hourglass_rs::SafeTimeProvider;
use tracing::info;

use crate::calculation::{CalculationEngine, CostSheetInput, FinancingSchedule, FormulaPolicy};
use crate::config::EngineConfig;
use crate::cost_sheet::{CostSheet, CostSheetSummary, Revision};
use crate::errors::{CostSheetError, Result};
use crate::events::{Event, EventStore};
use crate::export::ApprovedQuotation;
use crate::rates::{NewRate, RateRecord, RateResolver, ResolvedRates};
use crate::store::{CostSheetFilter, Store};
use crate::types::{Capability, CostSheetId, RateKey, RateKind, VehicleId};
use crate::vehicle::Vehicle;
use crate::workflow::{
    dispatch, Actor, EventKind, Notifier, StateMachine, Transition, WorkflowEvent,
};

/// orchestrates pricing, the approval workflow, persistence and notification
pub struct CostSheetService<S: Store, N: Notifier> {
    store: S,
    notifier: N,
    config: EngineConfig,
    engine: CalculationEngine<FormulaPolicy>,
    state_machine: StateMachine,
    events: EventStore,
}

impl<S: Store, N: Notifier> CostSheetService<S, N> {
    pub fn new(store: S, notifier: N, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            engine: CalculationEngine::new(config.policy),
            state_machine: StateMachine::new(config.authorization),
            store,
            notifier,
            config,
            events: EventStore::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.state_machine
    }

    // master data

    pub fn register_vehicle(&mut self, vehicle: Vehicle) -> Result<Vehicle> {
        vehicle.validate()?;
        self.store.insert_vehicle(&vehicle)?;
        info!(vehicle_id = %vehicle.id, name = %vehicle.display_name(), "vehicle registered");
        Ok(vehicle)
    }

    pub fn set_vehicle_active(&mut self, id: VehicleId, active: bool) -> Result<Vehicle> {
        self.store.set_vehicle_active(id, active)
    }

    pub fn vehicle(&self, id: VehicleId) -> Result<Vehicle> {
        self.store.vehicle(id)?.ok_or_else(|| CostSheetError::NotFound {
            entity: "vehicle",
            id: id.to_string(),
        })
    }

    // rates

    /// store a new rate and flag it as the latest activation for its key
    pub fn activate_rate(
        &mut self,
        rate: NewRate,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<RateRecord> {
        self.state_machine.authorization().require(actor, Capability::ManageRates)?;

        let now = time_provider.now();
        let record = self
            .store
            .activate_rate(rate.created_by(actor.user_id.clone()), now)?;

        self.events.emit(Event::RateActivated {
            rate_id: record.id,
            kind: record.kind,
            key: record.key.clone(),
            value: record.value,
            effective_from: record.effective_from,
            timestamp: now,
        });

        Ok(record)
    }

    pub fn rate_history(&self, kind: RateKind, key: &RateKey) -> Result<Vec<RateRecord>> {
        self.store.rate_history(kind, key)
    }

    /// the record of a series in effect today in the business timezone
    pub fn active_rate(
        &self,
        kind: RateKind,
        key: &RateKey,
        time_provider: &SafeTimeProvider,
    ) -> Result<Option<RateRecord>> {
        let day = self.config.business_day(time_provider.now());
        self.store.active_rate(kind, key, day)
    }

    /// every rate in effect now, for an optional city
    pub fn resolve_rates(
        &self,
        city: Option<&str>,
        time_provider: &SafeTimeProvider,
    ) -> Result<ResolvedRates> {
        let records = self.store.rate_records()?;
        let rates = RateResolver::new(&records, &self.config.fallback_rates)
            .with_utc_offset(self.config.utc_offset())
            .resolve_all(time_provider.now(), city);
        Ok(rates)
    }

    // pricing

    /// validate and price without persisting anything
    pub fn preview(
        &mut self,
        input: CostSheetInput,
        time_provider: &SafeTimeProvider,
    ) -> Result<Revision> {
        let vehicle = self.vehicle(input.vehicle_id)?;
        input.validate(&vehicle)?;

        let as_of = time_provider.now();
        let records = self.store.rate_records()?;
        let rates = RateResolver::new(&records, &self.config.fallback_rates)
            .with_utc_offset(self.config.utc_offset())
            .resolve_for(as_of, input.city.as_deref(), vehicle.fuel_type);

        for (kind, key) in &rates.fallbacks {
            self.events.emit(Event::RateFallbackUsed {
                kind: *kind,
                key: key.clone(),
                as_of,
            });
        }

        self.engine.price(input, rates, &vehicle, as_of)
    }

    // workflow

    pub fn create(
        &mut self,
        input: CostSheetInput,
        actor: &Actor,
        submit: bool,
        time_provider: &SafeTimeProvider,
    ) -> Result<CostSheet> {
        let revision = self.preview(input, time_provider)?;
        let transition = self.state_machine.create(revision, actor, submit, time_provider)?;
        self.store.insert_cost_sheet(&transition.sheet)?;
        Ok(self.finish(transition, time_provider))
    }

    /// replace the inputs of a draft or rejected sheet and reprice it
    pub fn edit(
        &mut self,
        id: CostSheetId,
        input: CostSheetInput,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<CostSheet> {
        let sheet = self.cost_sheet(id)?;
        // approved sheets are refused before their new input is even looked at
        self.state_machine.authorize(&sheet, EventKind::Edit, actor)?;

        let revision = self.preview(input, time_provider)?;
        self.apply(&sheet, WorkflowEvent::Edit(Box::new(revision)), actor, time_provider)
    }

    pub fn submit(
        &mut self,
        id: CostSheetId,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<CostSheet> {
        let sheet = self.cost_sheet(id)?;
        self.apply(&sheet, WorkflowEvent::Submit, actor, time_provider)
    }

    pub fn approve(
        &mut self,
        id: CostSheetId,
        remarks: Option<String>,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<CostSheet> {
        let sheet = self.cost_sheet(id)?;
        self.apply(&sheet, WorkflowEvent::Approve { remarks }, actor, time_provider)
    }

    pub fn reject(
        &mut self,
        id: CostSheetId,
        remarks: impl Into<String>,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<CostSheet> {
        let sheet = self.cost_sheet(id)?;
        let event = WorkflowEvent::Reject {
            remarks: remarks.into(),
        };
        self.apply(&sheet, event, actor, time_provider)
    }

    fn apply(
        &mut self,
        sheet: &CostSheet,
        event: WorkflowEvent,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<CostSheet> {
        let transition = self.state_machine.transition(sheet, event, actor, time_provider)?;
        self.store.update_cost_sheet(&transition.sheet, sheet.version)?;
        Ok(self.finish(transition, time_provider))
    }

    /// record the event and notify; the write has already happened
    fn finish(&mut self, transition: Transition, time_provider: &SafeTimeProvider) -> CostSheet {
        let Transition {
            sheet,
            notification,
            event,
        } = transition;

        self.events.emit(event);

        if let Some(notification) = notification {
            if let Some(reason) = dispatch(&self.notifier, &notification) {
                self.events.emit(Event::NotificationFailed {
                    cost_sheet_id: sheet.id,
                    reason,
                    timestamp: time_provider.now(),
                });
            }
        }

        sheet
    }

    // queries

    pub fn cost_sheet(&self, id: CostSheetId) -> Result<CostSheet> {
        self.store.cost_sheet(id)?.ok_or_else(|| CostSheetError::NotFound {
            entity: "cost sheet",
            id: id.to_string(),
        })
    }

    pub fn cost_sheets(&self, filter: &CostSheetFilter) -> Result<Vec<CostSheetSummary>> {
        Ok(self
            .store
            .list_cost_sheets(filter)?
            .iter()
            .map(CostSheet::summary)
            .collect())
    }

    /// reducing-balance breakdown of a sheet's loan
    pub fn financing_schedule(&self, id: CostSheetId) -> Result<FinancingSchedule> {
        let sheet = self.cost_sheet(id)?;
        self.engine.financing_schedule(&sheet.derived, &sheet.rates)
    }

    /// client-facing snapshot of an approved sheet
    pub fn export(&self, id: CostSheetId) -> Result<ApprovedQuotation> {
        let sheet = self.cost_sheet(id)?;
        let vehicle = self.vehicle(sheet.vehicle_id())?;
        ApprovedQuotation::from_sheet(&sheet, &vehicle)
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::Usage;
    use crate::decimal::Money;
    use crate::store::MemoryStore;
    use crate::types::{CostSheetStatus, FuelType};
    use crate::workflow::RecordingNotifier;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()))
    }

    fn service() -> (CostSheetService<MemoryStore, RecordingNotifier>, Vehicle) {
        let config = EngineConfig::standard();
        let mut service =
            CostSheetService::new(MemoryStore::new(), RecordingNotifier::new(), config).unwrap();
        let vehicle = service
            .register_vehicle(Vehicle::new(
                "Tata",
                "Nexon",
                "EV Max",
                FuelType::Ev,
                dec!(7),
                Money::from_major(1),
            ))
            .unwrap();
        (service, vehicle)
    }

    fn input(vehicle: &Vehicle) -> CostSheetInput {
        let price = Money::from_major(1_800_000);
        let mut input = CostSheetInput::new("Umbrella Ltd", vehicle.id, 3, price);
        input.usage = Usage {
            distance_per_month: dec!(2100),
            daily_hours: dec!(9),
        };
        input
    }

    #[test]
    fn test_preview_uses_fallback_rates() {
        let (mut service, vehicle) = service();
        let time = time();

        let revision = service.preview(input(&vehicle), &time).unwrap();
        assert!(revision.rates().used_fallback());
        assert_eq!(revision.rates().interest.as_percentage(), dec!(12));
        assert!(revision.derived().is_consistent());
        assert!(service.cost_sheets(&CostSheetFilter::all()).unwrap().is_empty());
        assert!(service
            .events()
            .iter()
            .any(|e| matches!(e, Event::RateFallbackUsed { kind: RateKind::Insurance, .. })));
    }

    #[test]
    fn test_activate_rate_requires_capability() {
        let (mut service, _) = service();
        let time = time();
        let rate = NewRate::new(
            RateKind::Interest,
            RateKey::global(),
            dec!(9.5),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );

        let err = service
            .activate_rate(rate.clone(), &Actor::staff("asha"), &time)
            .unwrap_err();
        assert!(matches!(err, CostSheetError::InsufficientPrivilege { .. }));

        let record = service.activate_rate(rate, &Actor::admin("kiran"), &time).unwrap();
        assert_eq!(record.created_by.as_deref(), Some("kiran"));

        let rates = service.resolve_rates(None, &time).unwrap();
        assert_eq!(rates.interest.as_percentage(), dec!(9.5));
    }

    fn seed_rates(
        service: &mut CostSheetService<MemoryStore, RecordingNotifier>,
        time: &SafeTimeProvider,
    ) {
        let admin = Actor::admin("kiran");
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rates = [
            NewRate::new(RateKind::Interest, RateKey::global(), dec!(10), from),
            NewRate::new(RateKind::Insurance, RateKey::global(), dec!(3), from),
            NewRate::new(RateKind::AdminCharge, RateKey::global(), dec!(4), from),
            NewRate::new(RateKind::Fuel, RateKey::fuel(FuelType::Ev), dec!(9), from),
        ];
        for rate in rates {
            service.activate_rate(rate, &admin, time).unwrap();
        }
    }

    #[test]
    fn test_preview_reports_only_the_vehicle_fuel() {
        let (mut service, vehicle) = service();
        let time = time();
        seed_rates(&mut service, &time);

        let revision = service.preview(input(&vehicle), &time).unwrap();
        assert!(!revision.rates().used_fallback());
        assert_eq!(revision.rates().fuel_prices.len(), 1);
        assert!(!service
            .events()
            .iter()
            .any(|e| matches!(e, Event::RateFallbackUsed { .. })));

        // the catalogue view still shows the unpriced fuels
        let catalogue = service.resolve_rates(None, &time).unwrap();
        assert!(catalogue.used_fallback_for(FuelType::Petrol));
        assert!(!catalogue.used_fallback_for(FuelType::Ev));
    }

    #[test]
    fn test_active_rate_matches_pricing() {
        let (mut service, vehicle) = service();
        let time = time();
        seed_rates(&mut service, &time);
        let admin = Actor::admin("kiran");
        let next_year = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let scheduled = NewRate::new(RateKind::Interest, RateKey::global(), dec!(14), next_year);
        service.activate_rate(scheduled, &admin, &time).unwrap();

        let active = service
            .active_rate(RateKind::Interest, &RateKey::global(), &time)
            .unwrap()
            .unwrap();
        let revision = service.preview(input(&vehicle), &time).unwrap();
        assert_eq!(active.value, dec!(10));
        assert!(!active.is_active);
        assert_eq!(revision.rates().interest.as_percentage(), active.value);
    }

    #[test]
    fn test_rates_follow_business_timezone() {
        let config = EngineConfig::standard().with_utc_offset_minutes(330);
        let mut service =
            CostSheetService::new(MemoryStore::new(), RecordingNotifier::new(), config).unwrap();
        // 02:00 on 1 June in the business timezone
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 5, 31, 20, 30, 0).unwrap(),
        ));
        let june = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let rate = NewRate::new(RateKind::Interest, RateKey::global(), dec!(9), june);
        service.activate_rate(rate, &Actor::admin("kiran"), &time).unwrap();

        let active = service.active_rate(RateKind::Interest, &RateKey::global(), &time).unwrap();
        assert_eq!(active.map(|r| r.value), Some(dec!(9)));
        let rates = service.resolve_rates(None, &time).unwrap();
        assert_eq!(rates.interest.as_percentage(), dec!(9));
    }

    #[test]
    fn test_full_cycle() {
        let (mut service, vehicle) = service();
        let time = time();
        let control = time.test_control().unwrap();
        let staff = Actor::staff("asha");

        let sheet = service.create(input(&vehicle), &staff, true, &time).unwrap();
        assert_eq!(sheet.status, CostSheetStatus::PendingApproval);
        assert_eq!(service.notifier().sent().len(), 1);

        control.advance(Duration::hours(1));
        let approved = service
            .approve(sheet.id, None, &Actor::super_admin("meera"), &time)
            .unwrap();
        assert_eq!(approved.status, CostSheetStatus::Approved);
        assert_eq!(approved.version, 2);
        assert_eq!(service.cost_sheet(sheet.id).unwrap(), approved);

        let quotation = service.export(sheet.id).unwrap();
        assert_eq!(quotation.grand_total, approved.grand_total().to_presentation());
        assert_eq!(service.financing_schedule(sheet.id).unwrap().tenure_months, 36);
    }

    #[test]
    fn test_edit_checks_state_before_input() {
        let (mut service, vehicle) = service();
        let time = time();
        let sheet = service.create(input(&vehicle), &Actor::staff("asha"), true, &time).unwrap();
        service
            .approve(sheet.id, None, &Actor::super_admin("meera"), &time)
            .unwrap();

        let mut invalid = input(&vehicle);
        invalid.tenure_years = 0;
        let err = service
            .edit(sheet.id, invalid, &Actor::super_admin("meera"), &time)
            .unwrap_err();
        assert!(matches!(err, CostSheetError::InvalidTransition { .. }));
    }

    #[test]
    fn test_inactive_vehicle_refused() {
        let (mut service, vehicle) = service();
        let time = time();
        service.set_vehicle_active(vehicle.id, false).unwrap();

        let err = service
            .create(input(&vehicle), &Actor::staff("asha"), false, &time)
            .unwrap_err();
        assert!(matches!(err, CostSheetError::Validation { .. }));
    }

    #[test]
    fn test_unknown_sheet() {
        let (mut service, _) = service();
        let err = service
            .submit(uuid::Uuid::new_v4(), &Actor::staff("asha"), &time())
            .unwrap_err();
        assert!(matches!(err, CostSheetError::NotFound { entity: "cost sheet", .. }));
    }
}
