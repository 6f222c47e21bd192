use actix::Message;
use chrono::NaiveDate;

use crate::services::aggregate::OrderAggregate;
use crate::services::db_models::MenuItemView;
use crate::services::report::ReportAggregate;
use crate::types::{CafeSlug, OrderError, OrderStatus};

/// One requested menu line: catalog reference, quantity, chosen extras.
/// Extra ids are already deduplicated and positive by the time this is built.
#[derive(Debug, Clone)]
pub struct OrderLineRequest {
    pub menu_item_id: i64,
    pub quantity: i32,
    pub extra_ids: Vec<i64>,
}

#[derive(Message)]
#[rtype(result = "Result<OrderAggregate, OrderError>")]
pub struct CreateOrder {
    pub cafe_slug: CafeSlug,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub table_number: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

#[derive(Message)]
#[rtype(result = "Result<OrderAggregate, OrderError>")]
pub struct FetchOrder(pub i64);

#[derive(Message)]
#[rtype(result = "Result<Vec<OrderAggregate>, OrderError>")]
pub struct FetchOrders {
    pub cafe_slug: Option<CafeSlug>,
    /// The public order board hides completed orders.
    pub active_only: bool,
}

#[derive(Message)]
#[rtype(result = "Result<OrderAggregate, OrderError>")]
pub struct UpdateOrderStatus {
    pub order_id: i64,
    pub status: OrderStatus,
}

#[derive(Message)]
#[rtype(result = "Result<ReportAggregate, OrderError>")]
pub struct EndOfDayReport {
    pub date: NaiveDate,
    pub cafe_slug: Option<CafeSlug>,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<MenuItemView>, OrderError>")]
pub struct FetchCafeMenu(pub CafeSlug);
