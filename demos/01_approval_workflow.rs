/// approval workflow - submit, reject, edit, resubmit, approve and export
use fleet_cost_sheet::calculation::Usage;
use fleet_cost_sheet::{
    Actor, CostSheetFilter, CostSheetInput, CostSheetService, CostSheetStatus, EngineConfig,
    FuelType, MemoryStore, Money, NewRate, RateKey, RateKind, RecordingNotifier, SafeTimeProvider,
    TimeSource, Vehicle,
};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 9, 2, 9, 30, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let config = EngineConfig::standard();
    let mut service = CostSheetService::new(MemoryStore::new(), RecordingNotifier::new(), config)?;

    let staff = Actor::staff("asha");
    let admin = Actor::admin("kiran");
    let approver = Actor::super_admin("meera");

    let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let pune_petrol = RateKey::fuel_in_city(FuelType::Petrol, "Pune");
    let interest = NewRate::new(RateKind::Interest, RateKey::global(), dec!(11), from);
    service.activate_rate(interest, &admin, &time)?;
    let fuel = NewRate::new(RateKind::Fuel, pune_petrol, dec!(104.2), from);
    service.activate_rate(fuel, &admin, &time)?;

    let vehicle = service.register_vehicle(Vehicle::new(
        "Maruti",
        "Ciaz",
        "Zeta",
        FuelType::Petrol,
        dec!(18),
        Money::from_str_exact("1.2")?,
    ))?;

    let price = Money::from_major(1_100_000);
    let mut input = CostSheetInput::new("Stark Industries", vehicle.id, 3, price);
    input.city = Some("Pune".to_string());
    input.usage = Usage {
        distance_per_month: dec!(2500),
        daily_hours: dec!(10),
    };

    // staff create and submit in one step
    let sheet = service.create(input.clone(), &staff, true, &time)?;
    let total = sheet.grand_total().to_presentation();
    println!("created {} as {} (total {})", sheet.id, sheet.status, total);

    // admins cannot approve under the default model
    if let Err(err) = service.approve(sheet.id, None, &admin, &time) {
        println!("admin approval refused: {}", err);
    }

    controller.advance(Duration::hours(4));
    let remarks = "ask the client for a 15% down payment";
    let rejected = service.reject(sheet.id, remarks, &approver, &time)?;
    println!("{}: {:?}", rejected.status, rejected.approval_remarks);

    // creator revises, back to draft, then resubmits
    input.down_payment_percent = Some(dec!(15));
    let edited = service.edit(sheet.id, input, &staff, &time)?;
    println!("edited back to {} (total {})", edited.status, edited.grand_total().to_presentation());
    service.submit(sheet.id, &staff, &time)?;

    controller.advance(Duration::days(1));
    let approved = service.approve(sheet.id, Some("good to go".to_string()), &approver, &time)?;
    assert_eq!(approved.status, CostSheetStatus::Approved);

    let quotation = service.export(sheet.id)?;
    println!("{}", quotation.to_json_pretty()?);

    for summary in service.cost_sheets(&CostSheetFilter::all())? {
        println!("{} {} {}", summary.company_name, summary.status, summary.grand_total);
    }
    println!("notifications sent: {}", service.notifier().sent().len());
    println!("events recorded: {}", service.take_events().len());

    Ok(())
}
