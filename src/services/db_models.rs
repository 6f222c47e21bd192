use chrono::{DateTime, NaiveDate, Utc};
use diesel::Queryable;
use serde::Serialize;

#[derive(Queryable, Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub cafe_slug: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub table_number: Option<String>,
    pub order_number: String,
    pub order_date: NaiveDate,
    pub order_sequence: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub menu_item_id: i64,
    pub quantity: i32,
    pub item_name: String,
    pub item_price: f64,
}

#[derive(Queryable, Debug, Clone, Serialize)]
pub struct OrderItemExtra {
    pub id: i64,
    pub order_item_id: i64,
    pub extra_id: i64,
    pub extra_name: String,
    pub extra_price: f64,
}

#[derive(Queryable, Debug, Clone, Serialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

#[derive(Queryable, Debug, Clone, Serialize)]
pub struct Extra {
    pub id: i64,
    pub name: String,
    pub price: f64,
}

/// Catalog read shape for one cafe's menu: each item with the extras that
/// are permitted for it.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItemView {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub extras: Vec<Extra>,
}
