//! property tests for pricing, rate resolution and the approval state machine

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use fleet_cost_sheet::calculation::Usage;
use fleet_cost_sheet::{
    Actor, CalculationEngine, CostSheetInput, CostSheetStatus, Decimal, FallbackRates,
    FormulaPolicy, FuelType, Money, NewRate, Rate, RateBook, RateKey, RateKind, RateResolver,
    ResolvedRates, SafeTimeProvider, StateMachine, TimeSource, Uuid, Vehicle, VehicleId,
    WorkflowEvent,
};
use proptest::prelude::*;

fn vehicle(mileage: u32) -> Vehicle {
    Vehicle::new(
        "Hyundai",
        "Creta",
        "SX",
        FuelType::Petrol,
        Decimal::from(mileage),
        Money::from_minor(150, 2),
    )
}

fn rates(interest_bps: u32, insurance_bps: u32, admin_bps: u32, fuel: i64) -> ResolvedRates {
    ResolvedRates::new(
        Rate::from_bps(interest_bps),
        Rate::from_bps(insurance_bps),
        Rate::from_bps(admin_bps),
    )
    .with_fuel_price(FuelType::Petrol, Money::from_major(fuel))
}

prop_compose! {
    fn arb_input(vehicle_id: VehicleId)(
        tenure_years in 1u32..=10,
        ex_showroom in 300_000i64..5_000_000,
        down_payment in 0u32..=100,
        registration in 0i64..300_000,
        distance in 0u32..10_000,
        drivers in 0u32..4,
        salary in 10_000i64..40_000,
        parking in 0i64..5_000,
    ) -> CostSheetInput {
        let price = Money::from_major(ex_showroom);
        let mut input = CostSheetInput::new("Hooli", vehicle_id, tenure_years, price);
        input.down_payment_percent = Some(Decimal::from(down_payment));
        input.registration_charges = Money::from_major(registration);
        input.usage = Usage {
            distance_per_month: Decimal::from(distance),
            daily_hours: Decimal::from(10),
        };
        input.drivers.count = drivers;
        input.drivers.salary_per_driver = Money::from_major(salary);
        input.add_ons.parking = Money::from_major(parking);
        input
    }
}

fn arb_policy() -> impl Strategy<Value = FormulaPolicy> {
    prop_oneof![Just(FormulaPolicy::canonical()), Just(FormulaPolicy::legacy())]
}

proptest! {
    #[test]
    fn calculation_is_deterministic(
        input in arb_input(Uuid::new_v4()),
        policy in arb_policy(),
        interest in 0u32..2_500,
        insurance in 0u32..1_000,
        admin in 0u32..1_500,
    ) {
        let vehicle = Vehicle { id: input.vehicle_id, ..vehicle(15) };
        let rates = rates(interest, insurance, admin, 100);
        let engine = CalculationEngine::new(policy);

        let first = engine.calculate(&input, &rates, &vehicle).unwrap();
        let second = engine.calculate(&input, &rates, &vehicle).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn grand_total_is_sum_of_parts(
        input in arb_input(Uuid::new_v4()),
        policy in arb_policy(),
        interest in 0u32..2_500,
        admin in 0u32..1_500,
    ) {
        let vehicle = Vehicle { id: input.vehicle_id, ..vehicle(12) };
        prop_assert!(input.validate(&vehicle).is_ok());

        let derived = CalculationEngine::new(policy)
            .calculate(&input, &rates(interest, 350, admin, 102), &vehicle)
            .unwrap();

        prop_assert_eq!(
            derived.subtotal_a + derived.subtotal_b + derived.admin_charge_amount,
            derived.grand_total
        );
        prop_assert_eq!(derived.loan_amount + derived.down_payment_amount, derived.on_road_price);
        prop_assert!(!derived.emi.is_negative());
    }

    #[test]
    fn resolver_picks_latest_effective(
        entries in prop::collection::vec((0i64..400, 1u32..30), 1..12),
        as_of_offset in 0i64..400,
    ) {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let created = Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap();
        let mut book = RateBook::new();
        for (offset, value) in &entries {
            let rate = NewRate::new(
                RateKind::Interest,
                RateKey::global(),
                Decimal::from(*value),
                base + Duration::days(*offset),
            );
            book.activate(rate, created).unwrap();
        }

        let fallback = FallbackRates::default();
        let noon = (base + Duration::days(as_of_offset)).and_hms_opt(12, 0, 0).unwrap();
        let as_of = Utc.from_utc_datetime(&noon);
        let resolver = RateResolver::new(book.records(), &fallback);
        let resolved = resolver.resolve(RateKind::Interest, as_of, None);

        // later entries win ties on the same effective date
        let expected = entries
            .iter()
            .enumerate()
            .filter(|(_, (offset, _))| *offset <= as_of_offset)
            .max_by_key(|(index, (offset, _))| (*offset, *index))
            .map(|(_, (_, value))| Decimal::from(*value))
            .unwrap_or(fallback.interest_percent);

        prop_assert_eq!(resolved, expected);
        prop_assert_eq!(book.records().iter().filter(|r| r.is_active).count(), 1);
    }

    #[test]
    fn approved_is_terminal(events in prop::collection::vec(0u8..4, 1..16)) {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap();
        let time = SafeTimeProvider::new(TimeSource::Test(start));
        let vehicle = vehicle(14);
        let price = Money::from_major(900_000);
        let mut input = CostSheetInput::new("Pied Piper", vehicle.id, 2, price);
        input.usage.distance_per_month = Decimal::from(1500);
        let revision = CalculationEngine::new(FormulaPolicy::canonical())
            .price(input, rates(1_100, 300, 200, 101), &vehicle, time.now())
            .unwrap();

        let machine = StateMachine::default();
        let approver = Actor::super_admin("meera");
        let created = machine.create(revision.clone(), &Actor::staff("asha"), false, &time);
        let mut sheet = created.unwrap().sheet;
        let mut approved = false;

        for code in events {
            let event = match code {
                0 => WorkflowEvent::Submit,
                1 => WorkflowEvent::Approve { remarks: None },
                2 => WorkflowEvent::Reject { remarks: "revise".to_string() },
                _ => WorkflowEvent::Edit(Box::new(revision.clone())),
            };
            let before = sheet.clone();
            match machine.transition(&sheet, event, &approver, &time) {
                Ok(transition) => {
                    prop_assert!(!approved);
                    prop_assert_eq!(transition.sheet.version, before.version + 1);
                    sheet = transition.sheet;
                }
                Err(_) => prop_assert_eq!(&sheet, &before),
            }
            approved |= sheet.status == CostSheetStatus::Approved;
        }
    }
}
