//! Order domain model.
//!
//! Field names follow the JSON wire format. Every field decodes to its empty
//! value when absent or `null`, so a partially filled order still decodes and
//! the validator can report every missing field at once. Decoding only fails
//! on malformed JSON or type mismatches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Order {
    #[serde(deserialize_with = "nullable")]
    pub order_uid: String,
    #[serde(deserialize_with = "nullable")]
    pub track_number: String,
    #[serde(deserialize_with = "nullable")]
    pub entry: String,
    pub delivery: Delivery,
    pub payment: Payment,
    pub items: Vec<Item>,
    #[serde(deserialize_with = "nullable")]
    pub locale: String,
    #[serde(deserialize_with = "nullable")]
    pub internal_signature: String,
    #[serde(deserialize_with = "nullable")]
    pub customer_id: String,
    #[serde(deserialize_with = "nullable")]
    pub delivery_service: String,
    #[serde(deserialize_with = "nullable")]
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "nullable")]
    pub oof_shard: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Delivery {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub phone: String,
    #[serde(deserialize_with = "nullable")]
    pub zip: String,
    #[serde(deserialize_with = "nullable")]
    pub city: String,
    #[serde(deserialize_with = "nullable")]
    pub address: String,
    #[serde(deserialize_with = "nullable")]
    pub region: String,
    #[serde(deserialize_with = "nullable")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Payment {
    #[serde(deserialize_with = "nullable")]
    pub transaction: String,
    #[serde(deserialize_with = "nullable")]
    pub request_id: String,
    #[serde(deserialize_with = "nullable")]
    pub currency: String,
    #[serde(deserialize_with = "nullable")]
    pub provider: String,
    pub amount: i64,
    /// Unix seconds.
    pub payment_dt: i64,
    #[serde(deserialize_with = "nullable")]
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Item {
    pub chrt_id: i64,
    #[serde(deserialize_with = "nullable")]
    pub track_number: String,
    pub price: i64,
    #[serde(deserialize_with = "nullable")]
    pub rid: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    pub sale: i64,
    #[serde(deserialize_with = "nullable")]
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    #[serde(deserialize_with = "nullable")]
    pub brand: String,
    pub status: i64,
}

impl Order {
    /// Decodes an order from its raw JSON payload.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// `order_uid` for log lines, `<unknown>` when empty.
    pub fn display_uid(&self) -> &str {
        if self.order_uid.is_empty() {
            "<unknown>"
        } else {
            &self.order_uid
        }
    }
}

/// Reads a string field that producers may send as `null`.
fn nullable<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_partial_payload_uses_defaults() {
        let order = Order::decode(br#"{"order_uid": "abc", "items": []}"#).unwrap();
        assert_eq!(order.order_uid, "abc");
        assert!(order.items.is_empty());
        assert!(order.delivery.name.is_empty());
        assert_eq!(order.payment.amount, 0);
        assert!(order.date_created.is_none());
    }

    #[test]
    fn test_decode_null_strings_as_empty() {
        let mut value = serde_json::to_value(crate::sample::sample_order("NULLS1")).unwrap();
        value["internal_signature"] = serde_json::Value::Null;
        value["payment"]["request_id"] = serde_json::Value::Null;
        value["delivery"]["region"] = serde_json::Value::Null;

        let order = Order::decode(&serde_json::to_vec(&value).unwrap()).unwrap();
        assert!(order.internal_signature.is_empty());
        assert!(order.payment.request_id.is_empty());
        assert!(order.delivery.region.is_empty());
        assert_eq!(order.payment.transaction, "NULLS1");
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let err = Order::decode(b"invalid json").unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_decode_rejects_type_mismatch() {
        let err = Order::decode(br#"{"order_uid": 42}"#).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_decode_date_created() {
        let order = Order::decode(br#"{"date_created": "2021-11-26T06:22:19Z"}"#).unwrap();
        let created = order.date_created.expect("date parsed");
        assert_eq!(created.to_rfc3339(), "2021-11-26T06:22:19+00:00");
    }

    #[test]
    fn test_display_uid() {
        let mut order = Order::default();
        assert_eq!(order.display_uid(), "<unknown>");
        order.order_uid = "b563feb7b2b84b6test".into();
        assert_eq!(order.display_uid(), "b563feb7b2b84b6test");
    }
}
