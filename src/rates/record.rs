use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::{CostSheetError, Result};
use crate::types::{RateId, RateKey, RateKind, UserId};

/// one effective-dated value in a rate series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub id: RateId,
    /// insertion order; breaks ties between records sharing an effective date
    pub sequence: u64,
    pub kind: RateKind,
    pub key: RateKey,
    /// percent for percentage kinds, price per unit for fuel
    pub value: Decimal,
    pub effective_from: NaiveDate,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl RateRecord {
    /// record is in effect on the given day
    pub fn is_effective_on(&self, day: NaiveDate) -> bool {
        self.effective_from <= day
    }

    /// same (kind, fuel type, city) series
    pub fn belongs_to(&self, kind: RateKind, key: &RateKey) -> bool {
        self.kind == kind && &self.key == key
    }
}

/// request to add a rate to its series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRate {
    pub kind: RateKind,
    pub key: RateKey,
    pub value: Decimal,
    pub effective_from: NaiveDate,
    pub created_by: Option<UserId>,
}

impl NewRate {
    pub fn new(kind: RateKind, key: RateKey, value: Decimal, effective_from: NaiveDate) -> Self {
        Self {
            kind,
            key,
            value,
            effective_from,
            created_by: None,
        }
    }

    pub fn created_by(mut self, user: impl Into<UserId>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.value < Decimal::ZERO {
            return Err(CostSheetError::validation(
                format!("rate.{}", self.kind),
                format!("must not be negative, got {}", self.value),
            ));
        }
        if self.kind.is_percentage() && self.value > Decimal::from(100) {
            return Err(CostSheetError::validation(
                format!("rate.{}", self.kind),
                format!("percent must be within 0..=100, got {}", self.value),
            ));
        }
        match (self.kind, self.key.fuel_type) {
            (RateKind::Fuel, None) => Err(CostSheetError::validation(
                "rate.fuel_type",
                "fuel rates need a fuel type",
            )),
            (kind, _) if kind != RateKind::Fuel && self.key != RateKey::global() => {
                Err(CostSheetError::validation(
                    format!("rate.{}", kind),
                    "only fuel rates may carry a fuel type or city",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// the record of a series in effect on `day`
///
/// latest `effective_from` not after `day`; among equal dates the highest sequence wins
pub fn latest_effective<'a>(
    records: &'a [RateRecord],
    kind: RateKind,
    key: &RateKey,
    day: NaiveDate,
) -> Option<&'a RateRecord> {
    records
        .iter()
        .filter(|r| r.belongs_to(kind, key) && r.is_effective_on(day))
        .max_by_key(|r| (r.effective_from, r.sequence))
}

/// effective-dated history of every rate series
///
/// activating a record deactivates every earlier record of the same series, so at most one
/// record per (kind, key) carries `is_active`. The flag marks the last administrative
/// activation; which record prices a sheet is decided by effective date alone. Callers
/// needing the flag consistent across threads must hold the book behind a lock
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateBook {
    records: Vec<RateRecord>,
    next_sequence: u64,
}

impl RateBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// deactivate the series and append the new record as its active value
    pub fn activate(&mut self, rate: NewRate, now: DateTime<Utc>) -> Result<RateRecord> {
        rate.validate()?;

        let mut deactivated = 0;
        for record in self
            .records
            .iter_mut()
            .filter(|r| r.is_active && r.belongs_to(rate.kind, &rate.key))
        {
            record.is_active = false;
            deactivated += 1;
        }

        self.next_sequence += 1;
        let record = RateRecord {
            id: Uuid::new_v4(),
            sequence: self.next_sequence,
            kind: rate.kind,
            key: rate.key,
            value: rate.value,
            effective_from: rate.effective_from,
            is_active: true,
            created_by: rate.created_by,
            created_at: now,
        };
        self.records.push(record.clone());

        info!(
            kind = %record.kind,
            key = %record.key,
            value = %record.value,
            effective_from = %record.effective_from,
            deactivated,
            "rate activated"
        );

        Ok(record)
    }

    /// the record of a series in effect on `day`, the same one the resolver prices with
    pub fn active(&self, kind: RateKind, key: &RateKey, day: NaiveDate) -> Option<&RateRecord> {
        latest_effective(&self.records, kind, key, day)
    }

    /// records of a series ordered by effective date, then insertion
    pub fn history(&self, kind: RateKind, key: &RateKey) -> Vec<RateRecord> {
        let mut history: Vec<RateRecord> = self
            .records
            .iter()
            .filter(|r| r.belongs_to(kind, key))
            .cloned()
            .collect();
        history.sort_by_key(|r| (r.effective_from, r.sequence));
        history
    }

    pub fn records(&self) -> &[RateRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FuelType;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn interest(value: Decimal, from: NaiveDate) -> NewRate {
        NewRate::new(RateKind::Interest, RateKey::global(), value, from)
    }

    fn fuel(key: RateKey, value: Decimal) -> NewRate {
        NewRate::new(RateKind::Fuel, key, value, day(2024, 1, 1))
    }

    #[test]
    fn test_single_active_per_series() {
        let mut book = RateBook::new();
        book.activate(interest(dec!(10), day(2024, 1, 1)), now()).unwrap();
        book.activate(interest(dec!(11), day(2024, 3, 1)), now()).unwrap();
        let latest = book.activate(interest(dec!(12), day(2024, 6, 1)), now()).unwrap();

        let active: Vec<_> = book
            .records()
            .iter()
            .filter(|r| r.kind == RateKind::Interest && r.is_active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, latest.id);

        let in_effect = book.active(RateKind::Interest, &RateKey::global(), day(2024, 7, 1));
        assert_eq!(in_effect.unwrap().value, dec!(12));
    }

    #[test]
    fn test_active_follows_effective_date() {
        let mut book = RateBook::new();
        let current = book.activate(interest(dec!(10), day(2024, 6, 1)), now()).unwrap();
        let scheduled = book.activate(interest(dec!(14), day(2025, 1, 1)), now()).unwrap();
        let key = RateKey::global();

        // the scheduled record carries the flag but is not in effect yet
        assert!(scheduled.is_active);
        assert_eq!(book.active(RateKind::Interest, &key, day(2024, 7, 1)), Some(&current));
        let next_year = book.active(RateKind::Interest, &key, day(2025, 1, 1));
        assert_eq!(next_year.unwrap().id, scheduled.id);
        assert_eq!(book.active(RateKind::Interest, &key, day(2024, 5, 31)), None);
    }

    #[test]
    fn test_activation_leaves_other_series_alone() {
        let mut book = RateBook::new();
        let diesel = RateKey::fuel(FuelType::Diesel);
        let petrol = RateKey::fuel(FuelType::Petrol);
        let pune = RateKey::fuel_in_city(FuelType::Diesel, "Pune");
        book.activate(fuel(diesel.clone(), dec!(90)), now()).unwrap();
        book.activate(fuel(petrol.clone(), dec!(100)), now()).unwrap();
        book.activate(fuel(pune.clone(), dec!(92)), now()).unwrap();

        let on = day(2024, 2, 1);
        assert_eq!(book.active(RateKind::Fuel, &diesel, on).unwrap().value, dec!(90));
        assert_eq!(book.active(RateKind::Fuel, &petrol, on).unwrap().value, dec!(100));
        assert_eq!(book.active(RateKind::Fuel, &pune, on).unwrap().value, dec!(92));
        assert_eq!(book.records().iter().filter(|r| r.is_active).count(), 3);
    }

    #[test]
    fn test_history_order() {
        let mut book = RateBook::new();
        let insurance =
            |value, from| NewRate::new(RateKind::Insurance, RateKey::global(), value, from);
        book.activate(insurance(dec!(4), day(2024, 6, 1)), now()).unwrap();
        book.activate(insurance(dec!(3.5), day(2024, 1, 1)), now()).unwrap();

        let history = book.history(RateKind::Insurance, &RateKey::global());
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].value, dec!(3.5));
        assert_eq!(history[1].value, dec!(4));
        // the record added last holds the flag even if it is dated earlier
        assert!(history[0].is_active);
        assert!(!history[1].is_active);
        // pricing still follows the dates
        let in_effect = book.active(RateKind::Insurance, &RateKey::global(), day(2024, 7, 1));
        assert_eq!(in_effect.unwrap().value, dec!(4));
    }

    #[test]
    fn test_rejects_invalid_rates() {
        let mut book = RateBook::new();
        let on = day(2024, 1, 1);
        let invalid = [
            NewRate::new(RateKind::AdminCharge, RateKey::global(), dec!(101), on),
            NewRate::new(RateKind::Fuel, RateKey::global(), dec!(90), on),
            NewRate::new(RateKind::Interest, RateKey::fuel(FuelType::Ev), dec!(9), on),
            NewRate::new(RateKind::Fuel, RateKey::fuel(FuelType::Ev), dec!(-1), on),
        ];
        for rate in invalid {
            assert!(book.activate(rate, now()).is_err());
        }
        assert!(book.records().is_empty());
    }
}
