use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named percentage tax rate.
///
/// Invoices never reference these live: when a service line is added, the
/// tax name and rate are copied onto the line, so later edits or deletes
/// here leave existing invoices untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tax {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub rate: Decimal,
    #[serde(default)]
    pub disabled: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_utc: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_utc: DateTime<Utc>,
}

impl Tax {
    pub fn new(name: String, rate: Decimal, disabled: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            rate,
            disabled,
            created_utc: now,
            updated_utc: now,
        }
    }
}

/// Partial update for a tax. `None` fields keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct TaxChanges {
    pub name: Option<String>,
    pub rate: Option<Decimal>,
    pub disabled: Option<bool>,
}
