use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};

/// furthest the first auto-generated due date may sit from assignment
pub const MAX_FIRST_DUE_OFFSET_MONTHS: u32 = 24;

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub receipt: ReceiptConfig,
    pub installments: InstallmentConfig,
}

/// receipt numbering and formatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// leading segment of every receipt number, e.g. "RCPT"
    pub prefix: String,
    pub currency_symbol: String,
}

/// installment planning limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallmentConfig {
    pub min_count: u32,
    pub max_count: u32,
    /// allowed gap between a manual plan's sum and the fee total
    pub plan_tolerance: Money,
    /// months between assignment and the first auto-generated due date
    pub first_due_offset_months: u32,
    pub name_prefix: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::indian_school()
    }
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            prefix: "RCPT".to_string(),
            currency_symbol: "₹".to_string(),
        }
    }
}

impl Default for InstallmentConfig {
    fn default() -> Self {
        Self {
            min_count: 2,
            max_count: 12,
            plan_tolerance: Money::PAISA,
            first_due_offset_months: 1,
            name_prefix: "Installment".to_string(),
        }
    }
}

impl LedgerConfig {
    /// rupee receipts, 2..=12 installments, one paisa plan tolerance
    pub fn indian_school() -> Self {
        Self {
            receipt: ReceiptConfig::default(),
            installments: InstallmentConfig::default(),
        }
    }

    /// load from a json document; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json).map_err(|e| {
            LedgerError::validation("config", format!("unreadable configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let prefix = &self.receipt.prefix;
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(LedgerError::validation(
                "receipt.prefix",
                "must be non-empty and alphanumeric",
            ));
        }

        let inst = &self.installments;
        if inst.min_count == 0 || inst.min_count > inst.max_count {
            return Err(LedgerError::validation(
                "installments.min_count",
                format!("invalid range {}..={}", inst.min_count, inst.max_count),
            ));
        }
        if inst.plan_tolerance.is_negative() || inst.plan_tolerance.as_decimal() > dec!(1) {
            return Err(LedgerError::validation(
                "installments.plan_tolerance",
                format!("{} outside 0.00..=1.00", inst.plan_tolerance),
            ));
        }
        if inst.first_due_offset_months > MAX_FIRST_DUE_OFFSET_MONTHS {
            return Err(LedgerError::validation(
                "installments.first_due_offset_months",
                format!(
                    "{} exceeds {} months",
                    inst.first_due_offset_months, MAX_FIRST_DUE_OFFSET_MONTHS
                ),
            ));
        }
        if inst.name_prefix.trim().is_empty() {
            return Err(LedgerError::validation(
                "installments.name_prefix",
                "must not be blank",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.installments.min_count, 2);
        assert_eq!(config.installments.max_count, 12);
        assert_eq!(config.installments.plan_tolerance, Money::from_minor(1));
    }

    #[test]
    fn test_first_due_offset_bounded() {
        let mut config = LedgerConfig::default();
        config.installments.first_due_offset_months = MAX_FIRST_DUE_OFFSET_MONTHS;
        assert!(config.validate().is_ok());

        config.installments.first_due_offset_months = u32::MAX;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation { ref field, .. } if field == "installments.first_due_offset_months"
        ));
        assert!(LedgerConfig::from_json(r#"{ "installments": { "first_due_offset_months": 4294967295 } }"#).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = LedgerConfig::from_json(r#"{ "receipt": { "prefix": "SVS" } }"#).unwrap();
        assert_eq!(config.receipt.prefix, "SVS");
        assert_eq!(config.receipt.currency_symbol, "₹");
        assert_eq!(config.installments.max_count, 12);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = LedgerConfig::from_json(r#"{ "installments": { "min_count": 5, "max_count": 3 } }"#)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "installments.min_count"));

        assert!(LedgerConfig::from_json(r#"{ "receipt": { "prefix": "R-1" } }"#).is_err());
        assert!(LedgerConfig::from_json("not json").is_err());
    }
}
