/// quick start - price a cost sheet without persisting it
use fleet_cost_sheet::calculation::Usage;
use fleet_cost_sheet::{
    Actor, CostSheetInput, CostSheetService, EngineConfig, FuelType, LogNotifier, MemoryStore,
    Money, NewRate, RateKey, RateKind, SafeTimeProvider, TimeSource, Vehicle,
};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap()
    ));
    let config = EngineConfig::standard();
    let mut service = CostSheetService::new(MemoryStore::new(), LogNotifier, config)?;

    let admin = Actor::admin("kiran");
    let from = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let rates = [
        NewRate::new(RateKind::Interest, RateKey::global(), dec!(10.5), from),
        NewRate::new(RateKind::Insurance, RateKey::global(), dec!(3.2), from),
        NewRate::new(RateKind::AdminCharge, RateKey::global(), dec!(4), from),
        NewRate::new(RateKind::Fuel, RateKey::fuel(FuelType::Diesel), dec!(89.6), from),
    ];
    for rate in rates {
        service.activate_rate(rate, &admin, &time)?;
    }

    let vehicle = service.register_vehicle(Vehicle::new(
        "Toyota",
        "Innova Crysta",
        "GX",
        FuelType::Diesel,
        dec!(11.5),
        Money::from_str_exact("1.8")?,
    ))?;

    let price = Money::from_major(2_150_000);
    let mut input = CostSheetInput::new("Acme Logistics", vehicle.id, 4, price);
    input.registration_charges = Money::from_major(180_000);
    input.down_payment_percent = Some(dec!(10));
    input.usage = Usage {
        distance_per_month: dec!(3000),
        daily_hours: dec!(12),
    };
    input.drivers.count = 1;
    input.drivers.salary_per_driver = Money::from_major(24_000);

    let revision = service.preview(input, &time)?;
    let derived = revision.derived();

    println!("loan amount:      {}", derived.loan_amount.to_presentation());
    println!("emi:              {}", derived.emi.to_presentation());
    println!("fuel:             {}", derived.fuel_cost.to_presentation());
    println!("maintenance:      {}", derived.maintenance_cost.to_presentation());
    println!("subtotal a:       {}", derived.subtotal_a.to_presentation());
    println!("subtotal b:       {}", derived.subtotal_b.to_presentation());
    println!("admin charge:     {}", derived.admin_charge_amount.to_presentation());
    println!("grand total:      {}", derived.grand_total.to_presentation());
    println!("defaults used:    {}", revision.rates().used_fallback());

    Ok(())
}
