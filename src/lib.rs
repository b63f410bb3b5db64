pub mod calculation;
pub mod config;
pub mod cost_sheet;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod export;
pub mod rates;
pub mod service;
pub mod store;
pub mod types;
pub mod vehicle;
pub mod workflow;

// re-export key types
pub use calculation::{
    calculate_emi, CalculationEngine, CalculationPolicy, CostSheetInput, DerivedFields, DriverCost,
    FinancingSchedule, FormulaPolicy, InsuranceBasis, MaintenanceMode, MonthlyAddOns,
    SubtotalAComposition, Usage,
};
pub use config::EngineConfig;
pub use cost_sheet::{CostSheet, CostSheetSummary, Revision};
pub use decimal::{Money, Rate};
pub use errors::{CostSheetError, Result};
pub use events::{Event, EventStore};
pub use export::{ApprovedQuotation, DocumentExporter, JsonExporter};
pub use rates::{FallbackRates, NewRate, RateBook, RateRecord, RateResolver, ResolvedRates};
pub use service::CostSheetService;
pub use store::{CostSheetFilter, CostSheetStore, MemoryStore, RateStore, Store, VehicleStore};
pub use types::{
    Capability, CostSheetId, CostSheetStatus, FuelType, RateKey, RateKind, Role, UserId, VehicleId,
};
pub use vehicle::Vehicle;
pub use workflow::{
    Actor, AuthorizationModel, AuthorizationPolicy, LogNotifier, Notification, NotificationKind,
    Notifier, RecordingNotifier, StateMachine, Transition, WorkflowEvent,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
