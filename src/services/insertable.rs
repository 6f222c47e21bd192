use chrono::NaiveDate;
use diesel::Insertable;

use crate::schema::cafe_daily_counters;
use crate::schema::order_item_extras;
use crate::schema::order_items;
use crate::schema::orders;

#[derive(Insertable, Clone)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub cafe_slug: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub table_number: Option<String>,
    pub order_number: String,
    pub order_date: NaiveDate,
    pub order_sequence: i32,
    pub status: String,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = order_items)]
pub struct NewOrderItem {
    pub order_id: i64,
    pub menu_item_id: i64,
    pub quantity: i32,
    pub item_name: String,
    pub item_price: f64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = order_item_extras)]
pub struct NewOrderItemExtra {
    pub order_item_id: i64,
    pub extra_id: i64,
    pub extra_name: String,
    pub extra_price: f64,
}

#[derive(Insertable, Clone)]
#[diesel(table_name = cafe_daily_counters)]
pub struct NewDailyCounter {
    pub cafe_slug: String,
    pub counter_date: NaiveDate,
    pub last_number: i32,
}
