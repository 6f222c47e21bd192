use actix_web::{get, HttpResponse, Responder};
use tracing::error;

use crate::types::OrderError;

pub mod aggregate;
pub mod allocator;
pub mod db_models;
pub mod db_utils;
pub mod insertable;
pub mod messages;
pub mod notify;
pub mod pg_handling;
pub mod redis_handling;
pub mod report;

#[get("/")]
pub async fn home_page() -> impl Responder {
    HttpResponse::Ok().body("Woodlands cafe ordering service")
}

pub fn error_response(err: OrderError) -> HttpResponse {
    match err {
        OrderError::Validation(reason) => HttpResponse::BadRequest().json(reason),
        OrderError::NotFound => HttpResponse::NotFound().json("Order not found"),
        err @ OrderError::InvalidTransition { .. } => HttpResponse::BadRequest().json(err.to_string()),
        err @ OrderError::CapacityExhausted => HttpResponse::Conflict().json(err.to_string()),
        err => {
            error!(%err, "request failed");
            HttpResponse::InternalServerError().json("Unable to perform action")
        }
    }
}

// sub-route "/orders"
pub mod order_route {
    use actix::MailboxError;
    use actix_web::web::{Data, Json, Path, Query};
    use actix_web::{get, post, put, HttpResponse, Responder};
    use serde::{Deserialize, Serialize};

    use crate::services::aggregate::OrderAggregate;
    use crate::services::db_utils::AppState;
    use crate::services::messages::{
        CreateOrder, FetchOrder, FetchOrders, OrderLineRequest, UpdateOrderStatus,
    };
    use crate::services::notify::{self, DeliveryOutcome};
    use crate::services::redis_handling::{
        publish_order_event, ORDER_CREATED_CHANNEL, ORDER_STATUS_CHANNEL,
    };
    use crate::services::error_response;
    use crate::types::{is_valid_email, normalize_email, CafeSlug, OrderStatus};

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct OrderLineBody {
        pub menu_item_id: i64,
        pub quantity: i32,
        #[serde(default)]
        pub extra_ids: Vec<i64>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateOrderBody {
        pub customer_name: String,
        pub customer_email: Option<String>,
        pub table_number: Option<String>,
        pub cafe_slug: String,
        pub items: Vec<OrderLineBody>,
    }

    #[derive(Serialize)]
    struct CreatedOrderResponse {
        #[serde(flatten)]
        order: OrderAggregate,
        receipt: DeliveryOutcome,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct OrdersQuery {
        pub cafe_slug: Option<String>,
    }

    #[derive(Deserialize)]
    pub struct UpdateStatusBody {
        pub status: String,
    }

    /// Boundary normalization: everything here is caller-fixable, so it is
    /// rejected before any message reaches the database actor.
    fn normalize_create_body(body: CreateOrderBody) -> Result<CreateOrder, String> {
        let customer_name = body.customer_name.trim().to_owned();
        if customer_name.is_empty() || body.items.is_empty() {
            return Err("Customer name, cafe slug, and at least one item are required".into());
        }

        let Some(cafe_slug) = CafeSlug::parse(&body.cafe_slug) else {
            return Err("Invalid cafe slug".into());
        };

        let customer_email = body.customer_email.as_deref().and_then(normalize_email);
        if let Some(email) = customer_email.as_deref() {
            if !is_valid_email(email) {
                return Err("Invalid customer email".into());
            }
        }

        let table_number = body
            .table_number
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);

        let mut items = Vec::with_capacity(body.items.len());
        for line in body.items {
            if line.menu_item_id <= 0 || line.quantity <= 0 || line.extra_ids.iter().any(|id| *id <= 0) {
                return Err("Invalid order items".into());
            }

            // Dedupe while keeping the customer's selection order.
            let mut extra_ids: Vec<i64> = Vec::with_capacity(line.extra_ids.len());
            for extra_id in line.extra_ids {
                if !extra_ids.contains(&extra_id) {
                    extra_ids.push(extra_id);
                }
            }

            items.push(OrderLineRequest {
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
                extra_ids,
            });
        }

        Ok(CreateOrder {
            cafe_slug,
            customer_name,
            customer_email,
            table_number,
            items,
        })
    }

    fn mailbox_error(err: MailboxError) -> HttpResponse {
        HttpResponse::InternalServerError().json(format!("Unable to perform action: {err}"))
    }

    #[post("/create")]
    pub async fn create_order(state: Data<AppState>, body: Json<CreateOrderBody>) -> impl Responder {
        let msg = match normalize_create_body(body.into_inner()) {
            Ok(msg) => msg,
            Err(reason) => return HttpResponse::BadRequest().json(reason),
        };

        match state.pg_db.send(msg).await {
            Ok(Ok(order)) => {
                publish_order_event(&state.redis_db, ORDER_CREATED_CHANNEL, &order);
                let receipt = notify::deliver_receipt(&order).await;
                HttpResponse::Created().json(CreatedOrderResponse { order, receipt })
            }
            Ok(Err(err)) => error_response(err),
            Err(err) => mailbox_error(err),
        }
    }

    #[get("/all")]
    pub async fn list_orders(state: Data<AppState>, query: Query<OrdersQuery>) -> impl Responder {
        fetch_orders(state, &query, false).await
    }

    /// The public order board: live queue state, completed orders hidden.
    #[get("/board")]
    pub async fn order_board(state: Data<AppState>, query: Query<OrdersQuery>) -> impl Responder {
        fetch_orders(state, &query, true).await
    }

    async fn fetch_orders(
        state: Data<AppState>,
        query: &OrdersQuery,
        active_only: bool,
    ) -> HttpResponse {
        let cafe_slug = match query.cafe_slug.as_deref() {
            Some(raw) => match CafeSlug::parse(raw) {
                Some(cafe) => Some(cafe),
                None => return HttpResponse::BadRequest().json("Invalid cafe slug"),
            },
            None => None,
        };

        match state.pg_db.send(FetchOrders { cafe_slug, active_only }).await {
            Ok(Ok(orders)) => HttpResponse::Ok().json(orders),
            Ok(Err(err)) => error_response(err),
            Err(err) => mailbox_error(err),
        }
    }

    #[get("/{order_id}")]
    pub async fn get_order(state: Data<AppState>, path: Path<i64>) -> impl Responder {
        match state.pg_db.send(FetchOrder(path.into_inner())).await {
            Ok(Ok(order)) => HttpResponse::Ok().json(order),
            Ok(Err(err)) => error_response(err),
            Err(err) => mailbox_error(err),
        }
    }

    #[put("/{order_id}/status")]
    pub async fn update_status(
        state: Data<AppState>,
        path: Path<i64>,
        body: Json<UpdateStatusBody>,
    ) -> impl Responder {
        let Some(status) = OrderStatus::parse(body.status.trim()) else {
            return HttpResponse::BadRequest().json("Invalid status");
        };

        match state.pg_db.send(UpdateOrderStatus { order_id: path.into_inner(), status }).await {
            Ok(Ok(order)) => {
                publish_order_event(&state.redis_db, ORDER_STATUS_CHANNEL, &order);

                if status == OrderStatus::Ready {
                    let ready_order = order.clone();
                    actix_web::rt::spawn(async move {
                        notify::notify_ready(&ready_order).await;
                    });
                }

                HttpResponse::Ok().json(order)
            }
            Ok(Err(err)) => error_response(err),
            Err(err) => mailbox_error(err),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn body() -> CreateOrderBody {
            CreateOrderBody {
                customer_name: " Ada ".into(),
                customer_email: Some(" Guest@Example.COM ".into()),
                table_number: Some(" 4 ".into()),
                cafe_slug: "raysdiner".into(),
                items: vec![OrderLineBody {
                    menu_item_id: 3,
                    quantity: 2,
                    extra_ids: vec![5, 5, 9],
                }],
            }
        }

        #[test]
        fn normalization_trims_lowercases_and_dedupes() {
            let msg = normalize_create_body(body()).unwrap();
            assert_eq!(msg.customer_name, "Ada");
            assert_eq!(msg.customer_email.as_deref(), Some("guest@example.com"));
            assert_eq!(msg.table_number.as_deref(), Some("4"));
            assert_eq!(msg.cafe_slug, CafeSlug::Raysdiner);
            assert_eq!(msg.items[0].extra_ids, vec![5, 9]);
        }

        #[test]
        fn unknown_cafes_and_bad_lines_are_rejected() {
            let mut unknown_cafe = body();
            unknown_cafe.cafe_slug = "mystery".into();
            assert!(normalize_create_body(unknown_cafe).is_err());

            let mut zero_quantity = body();
            zero_quantity.items[0].quantity = 0;
            assert!(normalize_create_body(zero_quantity).is_err());

            let mut negative_extra = body();
            negative_extra.items[0].extra_ids = vec![-1];
            assert!(normalize_create_body(negative_extra).is_err());

            let mut no_items = body();
            no_items.items.clear();
            assert!(normalize_create_body(no_items).is_err());
        }

        #[test]
        fn malformed_emails_are_rejected_but_blank_ones_drop_away() {
            let mut bad_email = body();
            bad_email.customer_email = Some("not-an-email".into());
            assert!(normalize_create_body(bad_email).is_err());

            let mut blank_email = body();
            blank_email.customer_email = Some("   ".into());
            let msg = normalize_create_body(blank_email).unwrap();
            assert_eq!(msg.customer_email, None);
        }
    }
}

// sub-route "/menu"
pub mod menu_route {
    use actix_web::http::header::ContentType;
    use actix_web::web::{Data, Path};
    use actix_web::{get, HttpResponse, Responder};

    use crate::services::db_utils::AppState;
    use crate::services::error_response;
    use crate::services::messages::FetchCafeMenu;
    use crate::services::redis_handling::{cache_menu, get_cached_menu};
    use crate::types::CafeSlug;

    #[get("/{cafe}")]
    pub async fn view_menu(state: Data<AppState>, path: Path<String>) -> impl Responder {
        let Some(cafe) = CafeSlug::parse(&path.into_inner()) else {
            return HttpResponse::BadRequest().json("Invalid cafe slug");
        };

        if let Some(cached) = get_cached_menu(&state.redis_db, cafe) {
            return HttpResponse::Ok().content_type(ContentType::json()).body(cached);
        }

        match state.pg_db.send(FetchCafeMenu(cafe)).await {
            Ok(Ok(menu)) => {
                if let Ok(json) = serde_json::to_string(&menu) {
                    cache_menu(&state.redis_db, cafe, &json);
                }
                HttpResponse::Ok().json(menu)
            }
            Ok(Err(err)) => error_response(err),
            Err(err) => HttpResponse::InternalServerError()
                .json(format!("Unable to perform action: {err}")),
        }
    }
}

// sub-route "/reports"
pub mod report_route {
    use actix_web::web::{Data, Query};
    use actix_web::{get, HttpResponse, Responder};
    use chrono::Utc;
    use serde::Deserialize;

    use crate::services::db_utils::AppState;
    use crate::services::error_response;
    use crate::services::messages::EndOfDayReport;
    use crate::types::{parse_report_date, CafeSlug};

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReportQuery {
        pub date: Option<String>,
        pub cafe_slug: Option<String>,
    }

    #[get("/end-of-day")]
    pub async fn end_of_day(state: Data<AppState>, query: Query<ReportQuery>) -> impl Responder {
        let date = match query.date.as_deref() {
            Some(raw) => match parse_report_date(raw) {
                Some(date) => date,
                None => return HttpResponse::BadRequest().json("Invalid date. Use YYYY-MM-DD."),
            },
            None => Utc::now().date_naive(),
        };

        let cafe_slug = match query.cafe_slug.as_deref() {
            Some(raw) => match CafeSlug::parse(raw) {
                Some(cafe) => Some(cafe),
                None => return HttpResponse::BadRequest().json("Invalid cafe slug"),
            },
            None => None,
        };

        match state.pg_db.send(EndOfDayReport { date, cafe_slug }).await {
            Ok(Ok(report)) => HttpResponse::Ok().json(report),
            Ok(Err(err)) => error_response(err),
            Err(err) => HttpResponse::InternalServerError()
                .json(format!("Unable to perform action: {err}")),
        }
    }
}
