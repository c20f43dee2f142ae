//! Currency maintenance.

use serde::{Deserialize, Serialize};

use super::maintenance::{MaintainedRecord, Maintenance, MaintenanceIntent};

/// A currency as maintained by the console.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
    /// ISO 4217 code, e.g. `"USD"`.
    pub code: String,
    pub name: String,
    /// Minor-unit digits (2 for USD, 0 for JPY).
    pub decimal_places: u8,
    pub active: bool,
}

/// Currency search form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyCriteria {
    /// Code prefix, case-insensitive.
    pub code: Option<String>,
    /// Name substring, case-insensitive.
    pub name: Option<String>,
    pub active_only: bool,
}

impl CurrencyCriteria {
    /// Whether `currency` satisfies these criteria.
    pub fn matches(&self, currency: &Currency) -> bool {
        let code_ok = self.code.as_ref().is_none_or(|prefix| {
            currency
                .code
                .to_ascii_uppercase()
                .starts_with(&prefix.to_ascii_uppercase())
        });
        let name_ok = self.name.as_ref().is_none_or(|needle| {
            currency
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        code_ok && name_ok && (!self.active_only || currency.active)
    }
}

impl MaintainedRecord for Currency {
    const SLICE: &'static str = "currency";
    type Key = String;
    type Criteria = CurrencyCriteria;
}

/// The currency slice.
pub type CurrencySlice = Maintenance<Currency>;

/// Requests accepted by [`CurrencySlice`].
pub type CurrencyIntent = MaintenanceIntent<Currency>;

#[cfg(test)]
mod tests {
    use super::*;

    fn usd() -> Currency {
        Currency {
            code: "USD".into(),
            name: "US Dollar".into(),
            decimal_places: 2,
            active: true,
        }
    }

    #[test]
    fn empty_criteria_match_everything() {
        assert!(CurrencyCriteria::default().matches(&usd()));
    }

    #[test]
    fn code_is_a_case_insensitive_prefix() {
        let criteria = CurrencyCriteria {
            code: Some("us".into()),
            ..CurrencyCriteria::default()
        };
        assert!(criteria.matches(&usd()));

        let criteria = CurrencyCriteria {
            code: Some("SD".into()),
            ..CurrencyCriteria::default()
        };
        assert!(!criteria.matches(&usd()));
    }

    #[test]
    fn name_is_a_substring() {
        let criteria = CurrencyCriteria {
            name: Some("dollar".into()),
            ..CurrencyCriteria::default()
        };
        assert!(criteria.matches(&usd()));
    }

    #[test]
    fn active_only_filters_inactive() {
        let criteria = CurrencyCriteria {
            active_only: true,
            ..CurrencyCriteria::default()
        };
        let retired = Currency {
            active: false,
            ..usd()
        };
        assert!(!criteria.matches(&retired));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(usd()).unwrap();
        assert_eq!(json["decimalPlaces"], 2);
    }
}
