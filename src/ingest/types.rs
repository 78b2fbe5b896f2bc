use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value as JsonValue};

use crate::error::{ScoreError, ScoreResult};

const WALLET_FIELDS: &[&str] = &["wallet_address", "userWallet", "user", "address"];
const ACTION_FIELDS: &[&str] = &["action", "type"];
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "block_timestamp", "createdAt"];
const COUNTERPARTY_FIELDS: &[&str] = &["counterparty", "sender", "txHash"];
const USD_FIELDS: &[&str] = &["usd_amount", "amount_usd"];

/// Unix timestamps above this are taken to be milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// Lending protocol actions a wallet can take.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Deposit,
    Borrow,
    Repay,
    Redeem,
    Liquidation,
    Other(String),
}

impl Action {
    /// Classify a raw action name. Matching is case-insensitive and by
    /// substring, so `LiquidationCall` and `redeemUnderlying` classify.
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        if lower.contains("deposit") {
            Self::Deposit
        } else if lower.contains("borrow") {
            Self::Borrow
        } else if lower.contains("repay") {
            Self::Repay
        } else if lower.contains("redeem") {
            Self::Redeem
        } else if lower.contains("liquidation") {
            Self::Liquidation
        } else {
            Self::Other(lower)
        }
    }
}

/// A single validated protocol interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub wallet_address: String,
    pub action: Action,
    pub usd_amount: f64,
    pub timestamp: DateTime<Utc>,
    pub counterparty: Option<String>,
}

impl TransactionRecord {
    /// Validate one raw JSON record. `index` is the record's position in the
    /// log and is carried into any `DataError`.
    pub fn from_json(index: usize, value: &JsonValue) -> ScoreResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| ScoreError::data(index, "record is not a JSON object"))?;

        let wallet_address = first_field(obj, WALLET_FIELDS)
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ScoreError::data(index, "missing wallet_address"))?
            .to_string();

        let action = first_field(obj, ACTION_FIELDS)
            .and_then(JsonValue::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(Action::parse)
            .ok_or_else(|| ScoreError::data(index, "missing action"))?;

        let timestamp = match first_field(obj, TIMESTAMP_FIELDS) {
            Some(raw) => parse_timestamp(raw)
                .ok_or_else(|| ScoreError::data(index, format!("unparseable timestamp {}", raw)))?,
            None => return Err(ScoreError::data(index, "missing timestamp")),
        };

        let usd_amount = usd_amount(index, obj)?;

        let counterparty = first_field(obj, COUNTERPARTY_FIELDS)
            .and_then(JsonValue::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            wallet_address,
            action,
            usd_amount,
            timestamp,
            counterparty,
        })
    }
}

fn first_field<'a>(obj: &'a Map<String, JsonValue>, names: &[&str]) -> Option<&'a JsonValue> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

/// Direct USD field first, then `actionData.amount * actionData.assetPriceUSD`.
/// A record with neither carries no monetary value.
fn usd_amount(index: usize, obj: &Map<String, JsonValue>) -> ScoreResult<f64> {
    let amount = if let Some(raw) = first_field(obj, USD_FIELDS) {
        numeric(index, "usd_amount", raw)?
    } else if let Some(data) = obj.get("actionData").and_then(JsonValue::as_object) {
        let amount = match data.get("amount").filter(|v| !v.is_null()) {
            Some(raw) => numeric(index, "actionData.amount", raw)?,
            None => 0.0,
        };
        let price = match data.get("assetPriceUSD").filter(|v| !v.is_null()) {
            Some(raw) => numeric(index, "actionData.assetPriceUSD", raw)?,
            None => 1.0,
        };
        amount * price
    } else {
        0.0
    };

    if !amount.is_finite() {
        return Err(ScoreError::data(index, "usd_amount is not finite"));
    }
    if amount < 0.0 {
        return Err(ScoreError::data(
            index,
            format!("usd_amount is negative ({})", amount),
        ));
    }
    Ok(amount)
}

fn numeric(index: usize, field: &str, raw: &JsonValue) -> ScoreResult<f64> {
    let parsed = match raw {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ScoreError::data(index, format!("{} is not numeric: {}", field, raw)))
}

fn parse_timestamp(raw: &JsonValue) -> Option<DateTime<Utc>> {
    match raw {
        JsonValue::Number(n) => from_unix(n.as_f64()?),
        JsonValue::String(s) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<f64>() {
                return from_unix(secs);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

fn from_unix(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() > MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_parse() {
        assert_eq!(Action::parse("deposit"), Action::Deposit);
        assert_eq!(Action::parse("Borrow"), Action::Borrow);
        assert_eq!(Action::parse("LiquidationCall"), Action::Liquidation);
        assert_eq!(Action::parse("redeemUnderlying"), Action::Redeem);
        assert_eq!(Action::parse(" REPAY "), Action::Repay);
        assert_eq!(Action::parse("flashloan"), Action::Other("flashloan".to_string()));
    }

    #[test]
    fn test_flat_record() {
        let value = json!({
            "wallet_address": "0xabc",
            "action": "deposit",
            "usd_amount": 125.5,
            "timestamp": 1_629_178_166,
            "counterparty": "0xpool",
        });
        let record = TransactionRecord::from_json(0, &value).unwrap();
        assert_eq!(record.wallet_address, "0xabc");
        assert_eq!(record.action, Action::Deposit);
        assert_eq!(record.usd_amount, 125.5);
        assert_eq!(record.timestamp.timestamp(), 1_629_178_166);
        assert_eq!(record.counterparty.as_deref(), Some("0xpool"));
    }

    #[test]
    fn test_aave_style_record() {
        let value = json!({
            "userWallet": "0x00000000001accfa9cef68cf5371a23025b6d4b6",
            "action": "deposit",
            "timestamp": 1_629_178_166,
            "txHash": "0x695c69acf608fbf5d38e48ca5535e118cc213a89e3d6d2e66e6b0e3b2e8d4190",
            "actionData": {
                "amount": "2000",
                "assetPriceUSD": "0.9938318274296357",
            },
        });
        let record = TransactionRecord::from_json(3, &value).unwrap();
        assert!((record.usd_amount - 1987.6636548592714).abs() < 1e-9);
        assert!(record.counterparty.unwrap().starts_with("0x695c"));
    }

    #[test]
    fn test_missing_wallet() {
        let value = json!({"action": "deposit", "usd_amount": 1.0, "timestamp": 0});
        let err = TransactionRecord::from_json(7, &value).unwrap_err();
        assert_eq!(err, ScoreError::data(7, "missing wallet_address"));
    }

    #[test]
    fn test_blank_wallet() {
        let value = json!({"user": "  ", "action": "deposit", "timestamp": 0});
        assert!(TransactionRecord::from_json(0, &value).unwrap_err().is_data());
    }

    #[test]
    fn test_negative_amount() {
        let value = json!({"user": "0x1", "action": "borrow", "usd_amount": -5, "timestamp": 0});
        assert!(TransactionRecord::from_json(0, &value).unwrap_err().is_data());
    }

    #[test]
    fn test_non_numeric_amount() {
        let value = json!({"user": "0x1", "action": "borrow", "usd_amount": "lots", "timestamp": 0});
        assert!(TransactionRecord::from_json(0, &value).unwrap_err().is_data());

        let value = json!({"user": "0x1", "action": "borrow", "usd_amount": [1], "timestamp": 0});
        assert!(TransactionRecord::from_json(0, &value).unwrap_err().is_data());
    }

    #[test]
    fn test_missing_amount_is_zero() {
        let value = json!({"user": "0x1", "action": "repay", "timestamp": 0});
        let record = TransactionRecord::from_json(0, &value).unwrap();
        assert_eq!(record.usd_amount, 0.0);
    }

    #[test]
    fn test_timestamp_formats() {
        let secs = parse_timestamp(&json!(1_700_000_000)).unwrap();
        let millis = parse_timestamp(&json!(1_700_000_000_000i64)).unwrap();
        let rfc = parse_timestamp(&json!("2023-11-14T22:13:20Z")).unwrap();
        let naive = parse_timestamp(&json!("2023-11-14 22:13:20")).unwrap();
        assert_eq!(secs, millis);
        assert_eq!(secs, rfc);
        assert_eq!(secs, naive);
        assert!(parse_timestamp(&json!("yesterday")).is_none());
        assert!(parse_timestamp(&json!(true)).is_none());
    }

    #[test]
    fn test_missing_timestamp() {
        let value = json!({"user": "0x1", "action": "repay"});
        assert!(TransactionRecord::from_json(0, &value).unwrap_err().is_data());
    }
}
