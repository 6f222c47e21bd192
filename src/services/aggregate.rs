use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::services::db_models::{Order, OrderItem, OrderItemExtra};
use crate::types::sanitize_price;

/// Immutable snapshot of one extra chosen at order time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraSnapshot {
    pub id: i64,
    pub extra_id: i64,
    pub extra_name: String,
    pub extra_price: f64,
}

/// One menu line within an order, with name/price frozen at order time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub id: i64,
    pub menu_item_id: i64,
    pub quantity: i32,
    pub item_name: String,
    pub item_price: f64,
    pub extras: Vec<ExtraSnapshot>,
}

/// Canonical order shape returned by every read and write path. Carries raw
/// snapshot values only; totals are a presentation concern.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAggregate {
    pub id: i64,
    pub order_number: String,
    pub cafe_slug: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub table_number: Option<String>,
    pub order_date: NaiveDate,
    pub order_sequence: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ItemSnapshot>,
}

/// Groups extras under their owning line item. Items and extras come back in
/// ascending insertion-id order regardless of input order.
pub fn build_order_aggregate(
    order: Order,
    mut items: Vec<OrderItem>,
    mut extras: Vec<OrderItemExtra>,
) -> OrderAggregate {
    items.sort_by_key(|item| item.id);
    extras.sort_by_key(|extra| extra.id);

    let item_snapshots = items
        .into_iter()
        .map(|item| {
            let own_extras = extras
                .iter()
                .filter(|extra| extra.order_item_id == item.id)
                .map(|extra| ExtraSnapshot {
                    id: extra.id,
                    extra_id: extra.extra_id,
                    extra_name: extra.extra_name.clone(),
                    extra_price: sanitize_price(extra.extra_price),
                })
                .collect();

            ItemSnapshot {
                id: item.id,
                menu_item_id: item.menu_item_id,
                quantity: item.quantity,
                item_name: item.item_name,
                item_price: sanitize_price(item.item_price),
                extras: own_extras,
            }
        })
        .collect();

    OrderAggregate {
        id: order.id,
        order_number: order.order_number,
        cafe_slug: order.cafe_slug,
        customer_name: order.customer_name,
        customer_email: order.customer_email,
        table_number: order.table_number,
        order_date: order.order_date,
        order_sequence: order.order_sequence,
        status: order.status,
        created_at: order.created_at,
        items: item_snapshots,
    }
}
