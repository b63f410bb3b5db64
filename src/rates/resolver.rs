use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::decimal::{Money, Rate};
use crate::rates::record::{latest_effective, RateRecord};
use crate::types::{FuelType, RateId, RateKey, RateKind};

/// values used when no rate record is in effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRates {
    pub interest_percent: Decimal,
    pub insurance_percent: Decimal,
    pub admin_charge_percent: Decimal,
    pub fuel_price: Money,
}

impl Default for FallbackRates {
    fn default() -> Self {
        Self {
            interest_percent: dec!(12),
            insurance_percent: dec!(3.5),
            admin_charge_percent: dec!(0),
            fuel_price: Money::ZERO,
        }
    }
}

impl FallbackRates {
    pub fn value_for(&self, kind: RateKind) -> Decimal {
        match kind {
            RateKind::Interest => self.interest_percent,
            RateKind::Insurance => self.insurance_percent,
            RateKind::AdminCharge => self.admin_charge_percent,
            RateKind::Fuel => self.fuel_price.as_decimal(),
        }
    }
}

/// where a resolved value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    Record {
        id: RateId,
        effective_from: NaiveDate,
    },
    /// no record was in effect; the configured default was used
    Fallback,
}

/// a single resolved rate value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRate {
    pub kind: RateKind,
    pub key: RateKey,
    pub value: Decimal,
    pub source: RateSource,
}

impl ResolvedRate {
    pub fn is_fallback(&self) -> bool {
        self.source == RateSource::Fallback
    }
}

/// every rate the calculation engine needs, resolved for one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRates {
    pub interest: Rate,
    pub insurance: Rate,
    pub admin_charge: Rate,
    pub fuel_prices: BTreeMap<FuelType, Money>,
    /// series that resolved to the fallback default
    pub fallbacks: Vec<(RateKind, RateKey)>,
}

impl ResolvedRates {
    /// fixed rates with no fuel prices, mostly for previews and tests
    pub fn new(interest: Rate, insurance: Rate, admin_charge: Rate) -> Self {
        Self {
            interest,
            insurance,
            admin_charge,
            fuel_prices: BTreeMap::new(),
            fallbacks: Vec::new(),
        }
    }

    pub fn with_fuel_price(mut self, fuel_type: FuelType, price: Money) -> Self {
        self.fuel_prices.insert(fuel_type, price);
        self
    }

    /// price per fuel unit; zero when nothing was resolved for the type
    pub fn fuel_rate_for(&self, fuel_type: FuelType) -> Money {
        self.fuel_prices.get(&fuel_type).copied().unwrap_or(Money::ZERO)
    }

    pub fn used_fallback(&self) -> bool {
        !self.fallbacks.is_empty()
    }

    /// fallbacks that affect a sheet for a vehicle burning `fuel_type`
    pub fn used_fallback_for(&self, fuel_type: FuelType) -> bool {
        self.fallbacks
            .iter()
            .any(|(kind, key)| *kind != RateKind::Fuel || key.fuel_type == Some(fuel_type))
    }
}

/// pure latest-as-of lookup over a consistent snapshot of rate records
///
/// effective dates are calendar days in the business timezone, UTC unless set
pub struct RateResolver<'a> {
    records: &'a [RateRecord],
    fallback: &'a FallbackRates,
    utc_offset: FixedOffset,
}

impl<'a> RateResolver<'a> {
    pub fn new(records: &'a [RateRecord], fallback: &'a FallbackRates) -> Self {
        Self {
            records,
            fallback,
            utc_offset: Utc.fix(),
        }
    }

    pub fn with_utc_offset(mut self, utc_offset: FixedOffset) -> Self {
        self.utc_offset = utc_offset;
        self
    }

    /// business day containing `as_of`
    pub fn day_of(&self, as_of: DateTime<Utc>) -> NaiveDate {
        as_of.with_timezone(&self.utc_offset).date_naive()
    }

    /// resolve the value in effect for a series at `as_of`
    pub fn resolve(&self, kind: RateKind, as_of: DateTime<Utc>, key: Option<&RateKey>) -> Decimal {
        self.resolve_detailed(kind, as_of, key).value
    }

    /// resolve with provenance
    ///
    /// picks the record with the latest `effective_from` not after `as_of`, the highest
    /// sequence among equal dates; a city key falls back to the city-agnostic series
    pub fn resolve_detailed(
        &self,
        kind: RateKind,
        as_of: DateTime<Utc>,
        key: Option<&RateKey>,
    ) -> ResolvedRate {
        let key = key.cloned().unwrap_or_default();
        let day = self.day_of(as_of);

        let found = latest_effective(self.records, kind, &key, day).or_else(|| {
            if key.city.is_some() {
                latest_effective(self.records, kind, &key.without_city(), day)
            } else {
                None
            }
        });

        match found {
            Some(record) => ResolvedRate {
                kind,
                key,
                value: record.value,
                source: RateSource::Record {
                    id: record.id,
                    effective_from: record.effective_from,
                },
            },
            None => {
                let value = self.fallback.value_for(kind);
                warn!(
                    kind = %kind,
                    key = %key,
                    as_of = %as_of,
                    fallback = %value,
                    "no rate record in effect, using fallback"
                );
                ResolvedRate {
                    kind,
                    key,
                    value,
                    source: RateSource::Fallback,
                }
            }
        }
    }

    /// resolve the percentage rates and the fuel price of every fuel type
    pub fn resolve_all(&self, as_of: DateTime<Utc>, city: Option<&str>) -> ResolvedRates {
        self.resolve_fuels(as_of, city, &FuelType::ALL)
    }

    /// resolve what a sheet for a vehicle burning `fuel_type` needs
    ///
    /// other fuel types are left out, so their missing prices are not reported as fallbacks
    pub fn resolve_for(
        &self,
        as_of: DateTime<Utc>,
        city: Option<&str>,
        fuel_type: FuelType,
    ) -> ResolvedRates {
        self.resolve_fuels(as_of, city, &[fuel_type])
    }

    fn resolve_fuels(
        &self,
        as_of: DateTime<Utc>,
        city: Option<&str>,
        fuel_types: &[FuelType],
    ) -> ResolvedRates {
        let mut fallbacks = Vec::new();
        let mut percent = |kind: RateKind| {
            let resolved = self.resolve_detailed(kind, as_of, None);
            if resolved.is_fallback() {
                fallbacks.push((kind, resolved.key.clone()));
            }
            Rate::from_percent(resolved.value)
        };

        let interest = percent(RateKind::Interest);
        let insurance = percent(RateKind::Insurance);
        let admin_charge = percent(RateKind::AdminCharge);

        let mut fuel_prices = BTreeMap::new();
        for &fuel_type in fuel_types {
            let key = match city {
                Some(city) => RateKey::fuel_in_city(fuel_type, city),
                None => RateKey::fuel(fuel_type),
            };
            let resolved = self.resolve_detailed(RateKind::Fuel, as_of, Some(&key));
            if resolved.is_fallback() {
                fallbacks.push((RateKind::Fuel, resolved.key.clone()));
            }
            fuel_prices.insert(fuel_type, Money::from_decimal(resolved.value));
        }

        ResolvedRates {
            interest,
            insurance,
            admin_charge,
            fuel_prices,
            fallbacks,
        }
    }
}
