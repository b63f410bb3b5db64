use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::FormulaPolicy;
use crate::errors::{CostSheetError, Result};
use crate::rates::FallbackRates;
use crate::workflow::AuthorizationModel;

/// widest offset any civil timezone uses
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// engine configuration, chosen once per deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub policy: FormulaPolicy,
    #[serde(default)]
    pub authorization: AuthorizationModel,
    #[serde(default)]
    pub fallback_rates: FallbackRates,
    /// offset of the business timezone; rate effective dates are calendar days there
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl EngineConfig {
    /// canonical formulas, super admins approve, stock fallback rates
    pub fn standard() -> Self {
        Self {
            policy: FormulaPolicy::canonical(),
            authorization: AuthorizationModel::SuperAdminApproves,
            fallback_rates: FallbackRates::default(),
            utc_offset_minutes: 0,
        }
    }

    /// the older sheet layout where admins approve their own team's sheets
    pub fn legacy() -> Self {
        Self {
            policy: FormulaPolicy::legacy(),
            authorization: AuthorizationModel::AdminApproves,
            fallback_rates: FallbackRates::default(),
            utc_offset_minutes: 0,
        }
    }

    pub fn with_policy(mut self, policy: FormulaPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_authorization(mut self, authorization: AuthorizationModel) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn with_fallback_rates(mut self, fallback_rates: FallbackRates) -> Self {
        self.fallback_rates = fallback_rates;
        self
    }

    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    /// business timezone; UTC when the configured offset is out of range
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// calendar day in the business timezone at `at`
    pub fn business_day(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.utc_offset()).date_naive()
    }

    pub fn validate(&self) -> Result<()> {
        let fallback = &self.fallback_rates;
        for (name, percent) in [
            ("interest_percent", fallback.interest_percent),
            ("insurance_percent", fallback.insurance_percent),
            ("admin_charge_percent", fallback.admin_charge_percent),
        ] {
            if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
                return Err(CostSheetError::InvalidConfiguration {
                    message: format!("fallback {} must be within 0..=100, got {}", name, percent),
                });
            }
        }

        if fallback.fuel_price.is_negative() {
            return Err(CostSheetError::InvalidConfiguration {
                message: "fallback fuel_price cannot be negative".to_string(),
            });
        }

        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(CostSheetError::InvalidConfiguration {
                message: format!(
                    "utc_offset_minutes must be within -{0}..={0}, got {1}",
                    MAX_UTC_OFFSET_MINUTES, self.utc_offset_minutes
                ),
            });
        }

        Ok(())
    }

    /// parse and validate a json document; missing sections take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| CostSheetError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CostSheetError::InvalidConfiguration {
            message: e.to_string(),
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}
