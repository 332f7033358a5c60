//! Well-formed sample orders.
//!
//! Used by the `publish --sample` CLI command to feed a running service and by
//! tests across the workspace.

use chrono::{TimeZone, Utc};

use crate::order::{Delivery, Item, Order, Payment};

/// Builds a valid order identified by `order_uid`.
///
/// `order_uid` must satisfy the validator (letters and digits only) for the
/// result to pass validation.
pub fn sample_order(order_uid: &str) -> Order {
    let track_number = "WBILMTESTTRACK".to_string();
    Order {
        order_uid: order_uid.to_string(),
        track_number: track_number.clone(),
        entry: "WBIL".into(),
        delivery: Delivery {
            name: "Test Testov".into(),
            phone: "+9720000000".into(),
            zip: "2639809".into(),
            city: "Kiryat Mozkin".into(),
            address: "Ploshad Mira 15".into(),
            region: "Kraiot".into(),
            email: "test@gmail.com".into(),
        },
        payment: Payment {
            transaction: order_uid.to_string(),
            request_id: String::new(),
            currency: "USD".into(),
            provider: "wbpay".into(),
            amount: 1817,
            payment_dt: 1_637_907_727,
            bank: "alpha".into(),
            delivery_cost: 1500,
            goods_total: 317,
            custom_fee: 0,
        },
        items: vec![Item {
            chrt_id: 9_934_930,
            track_number,
            price: 453,
            rid: "ab4219087a764ae0btest".into(),
            name: "Mascaras".into(),
            sale: 30,
            size: "0".into(),
            total_price: 317,
            nm_id: 2_389_212,
            brand: "Vivienne Sabo".into(),
            status: 202,
        }],
        locale: "en".into(),
        internal_signature: String::new(),
        customer_id: "test".into(),
        delivery_service: "meest".into(),
        shardkey: "9".into(),
        sm_id: 99,
        date_created: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).single(),
        oof_shard: "1".into(),
    }
}

/// Canonical JSON payload of [`sample_order`].
pub fn sample_payload(order_uid: &str) -> Vec<u8> {
    // Serializing plain strings, integers and a timestamp cannot fail.
    serde_json::to_vec(&sample_order(order_uid)).unwrap_or_default()
}
