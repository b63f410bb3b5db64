use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::cost_sheet::CostSheet;
use crate::errors::{CostSheetError, Result};
use crate::rates::{NewRate, RateBook, RateRecord};
use crate::store::{CostSheetFilter, CostSheetStore, RateStore, VehicleStore};
use crate::types::{CostSheetId, RateKey, RateKind, VehicleId};
use crate::vehicle::Vehicle;

#[derive(Debug, Default)]
struct Tables {
    rates: RateBook,
    vehicles: HashMap<VehicleId, Vehicle>,
    cost_sheets: HashMap<CostSheetId, CostSheet>,
}

/// in-process store; every operation runs under one lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| CostSheetError::Storage {
            message: "memory store lock poisoned".to_string(),
        })
    }
}

impl RateStore for MemoryStore {
    fn activate_rate(&self, rate: NewRate, now: DateTime<Utc>) -> Result<RateRecord> {
        self.lock()?.rates.activate(rate, now)
    }

    fn rate_records(&self) -> Result<Vec<RateRecord>> {
        Ok(self.lock()?.rates.records().to_vec())
    }

    fn rate_history(&self, kind: RateKind, key: &RateKey) -> Result<Vec<RateRecord>> {
        Ok(self.lock()?.rates.history(kind, key))
    }

    fn active_rate(
        &self,
        kind: RateKind,
        key: &RateKey,
        day: NaiveDate,
    ) -> Result<Option<RateRecord>> {
        Ok(self.lock()?.rates.active(kind, key, day).cloned())
    }
}

impl VehicleStore for MemoryStore {
    fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.vehicles.contains_key(&vehicle.id) {
            return Err(CostSheetError::validation("vehicle.id", "vehicle already registered"));
        }
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    fn vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        Ok(self.lock()?.vehicles.get(&id).cloned())
    }

    fn vehicles(&self) -> Result<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self.lock()?.vehicles.values().cloned().collect();
        vehicles.sort_by_key(|v| v.display_name());
        Ok(vehicles)
    }

    fn set_vehicle_active(&self, id: VehicleId, active: bool) -> Result<Vehicle> {
        let mut tables = self.lock()?;
        let vehicle = tables.vehicles.get_mut(&id).ok_or_else(|| CostSheetError::NotFound {
            entity: "vehicle",
            id: id.to_string(),
        })?;
        vehicle.is_active = active;
        Ok(vehicle.clone())
    }
}

impl CostSheetStore for MemoryStore {
    fn insert_cost_sheet(&self, sheet: &CostSheet) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.cost_sheets.contains_key(&sheet.id) {
            return Err(CostSheetError::validation("cost_sheet.id", "cost sheet already exists"));
        }
        tables.cost_sheets.insert(sheet.id, sheet.clone());
        Ok(())
    }

    fn cost_sheet(&self, id: CostSheetId) -> Result<Option<CostSheet>> {
        Ok(self.lock()?.cost_sheets.get(&id).cloned())
    }

    fn update_cost_sheet(&self, sheet: &CostSheet, expected_version: u64) -> Result<()> {
        let mut tables = self.lock()?;
        let stored = tables.cost_sheets.get_mut(&sheet.id).ok_or_else(|| CostSheetError::NotFound {
            entity: "cost sheet",
            id: sheet.id.to_string(),
        })?;

        if stored.version != expected_version {
            return Err(CostSheetError::ConcurrencyConflict {
                id: sheet.id.to_string(),
                expected: expected_version,
                found: stored.version,
            });
        }

        *stored = sheet.clone();
        Ok(())
    }

    fn list_cost_sheets(&self, filter: &CostSheetFilter) -> Result<Vec<CostSheet>> {
        let mut sheets: Vec<CostSheet> = self
            .lock()?
            .cost_sheets
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        sheets.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(sheets)
    }
}
