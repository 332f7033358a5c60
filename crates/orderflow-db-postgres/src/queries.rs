//! SQL statements for the order tables.
//!
//! Every write helper runs inside the caller's transaction.

use serde_json::Value;
use sqlx_core::query::query;
use sqlx_postgres::PgTransaction;

use orderflow_core::Order;
use orderflow_storage::StorageError;

use crate::error::write_error;

const UPSERT_ORDER: &str = r#"
INSERT INTO orders (
    order_uid, track_number, entry, locale, internal_signature, customer_id,
    delivery_service, shardkey, sm_id, date_created, oof_shard, raw_payload, updated_at
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())
ON CONFLICT (order_uid) DO UPDATE SET
    track_number       = EXCLUDED.track_number,
    entry              = EXCLUDED.entry,
    locale             = EXCLUDED.locale,
    internal_signature = EXCLUDED.internal_signature,
    customer_id        = EXCLUDED.customer_id,
    delivery_service   = EXCLUDED.delivery_service,
    shardkey           = EXCLUDED.shardkey,
    sm_id              = EXCLUDED.sm_id,
    date_created       = EXCLUDED.date_created,
    oof_shard          = EXCLUDED.oof_shard,
    raw_payload        = EXCLUDED.raw_payload,
    updated_at         = now()
"#;

const UPSERT_DELIVERY: &str = r#"
INSERT INTO deliveries (order_uid, name, phone, zip, city, address, region, email)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
ON CONFLICT (order_uid) DO UPDATE SET
    name = EXCLUDED.name, phone = EXCLUDED.phone, zip = EXCLUDED.zip,
    city = EXCLUDED.city, address = EXCLUDED.address, region = EXCLUDED.region,
    email = EXCLUDED.email
"#;

const UPSERT_PAYMENT: &str = r#"
INSERT INTO payments (
    order_uid, transaction, request_id, currency, provider, amount,
    payment_dt, bank, delivery_cost, goods_total, custom_fee
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
ON CONFLICT (order_uid) DO UPDATE SET
    transaction = EXCLUDED.transaction, request_id = EXCLUDED.request_id,
    currency = EXCLUDED.currency, provider = EXCLUDED.provider,
    amount = EXCLUDED.amount, payment_dt = EXCLUDED.payment_dt, bank = EXCLUDED.bank,
    delivery_cost = EXCLUDED.delivery_cost, goods_total = EXCLUDED.goods_total,
    custom_fee = EXCLUDED.custom_fee
"#;

const INSERT_ITEM: &str = r#"
INSERT INTO items (
    order_uid, chrt_id, track_number, price, rid, name, sale, size,
    total_price, nm_id, brand, status
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
"#;

pub const SELECT_RAW: &str = "SELECT raw_payload::text FROM orders WHERE order_uid = $1";

/// `LIMIT NULL` means no limit.
pub const SELECT_RECENT: &str =
    "SELECT order_uid, raw_payload::text FROM orders ORDER BY updated_at DESC LIMIT $1";

pub async fn upsert_order_row(
    tx: &mut PgTransaction<'_>,
    order: &Order,
    payload: &Value,
) -> Result<(), StorageError> {
    query(UPSERT_ORDER)
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .bind(payload)
        .execute(&mut **tx)
        .await
        .map_err(|e| write_error("orders upsert", e))?;
    Ok(())
}

pub async fn upsert_delivery(
    tx: &mut PgTransaction<'_>,
    order: &Order,
) -> Result<(), StorageError> {
    let delivery = &order.delivery;
    query(UPSERT_DELIVERY)
        .bind(&order.order_uid)
        .bind(&delivery.name)
        .bind(&delivery.phone)
        .bind(&delivery.zip)
        .bind(&delivery.city)
        .bind(&delivery.address)
        .bind(&delivery.region)
        .bind(&delivery.email)
        .execute(&mut **tx)
        .await
        .map_err(|e| write_error("deliveries upsert", e))?;
    Ok(())
}

pub async fn upsert_payment(
    tx: &mut PgTransaction<'_>,
    order: &Order,
) -> Result<(), StorageError> {
    let payment = &order.payment;
    query(UPSERT_PAYMENT)
        .bind(&order.order_uid)
        .bind(&payment.transaction)
        .bind(&payment.request_id)
        .bind(&payment.currency)
        .bind(&payment.provider)
        .bind(payment.amount)
        .bind(payment.payment_dt)
        .bind(&payment.bank)
        .bind(payment.delivery_cost)
        .bind(payment.goods_total)
        .bind(payment.custom_fee)
        .execute(&mut **tx)
        .await
        .map_err(|e| write_error("payments upsert", e))?;
    Ok(())
}

/// Replaces the order's items with the current list.
pub async fn replace_items(
    tx: &mut PgTransaction<'_>,
    order: &Order,
) -> Result<(), StorageError> {
    query("DELETE FROM items WHERE order_uid = $1")
        .bind(&order.order_uid)
        .execute(&mut **tx)
        .await
        .map_err(|e| write_error("items delete", e))?;

    for item in &order.items {
        query(INSERT_ITEM)
            .bind(&order.order_uid)
            .bind(item.chrt_id)
            .bind(&item.track_number)
            .bind(item.price)
            .bind(&item.rid)
            .bind(&item.name)
            .bind(item.sale)
            .bind(&item.size)
            .bind(item.total_price)
            .bind(item.nm_id)
            .bind(&item.brand)
            .bind(item.status)
            .execute(&mut **tx)
            .await
            .map_err(|e| write_error("items insert", e))?;
    }
    Ok(())
}
