use std::collections::HashMap;

use actix::Handler;
use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl};
use tracing::debug;

use crate::schema::{
    extras, menu_item_cafes, menu_item_extras, menu_items, order_item_extras, order_items, orders,
};
use crate::services::aggregate::{build_order_aggregate, OrderAggregate};
use crate::services::allocator::{self, ReservedNumber};
use crate::services::db_models::{Extra, MenuItem, MenuItemView, Order, OrderItem, OrderItemExtra};
use crate::services::db_utils::PgActor;
use crate::services::insertable::{NewOrder, NewOrderItem, NewOrderItemExtra};
use crate::services::messages::{
    CreateOrder, EndOfDayReport, FetchCafeMenu, FetchOrder, FetchOrders, OrderLineRequest,
    UpdateOrderStatus,
};
use crate::services::report::{compute_report, ReportAggregate, ReportLineRow, ReportOrderRow};
use crate::types::{sanitize_price, CafeSlug, OrderError, OrderStatus};

/// Catalog name/price captured for one requested line before any write
/// happens; this is the snapshot that gets frozen into the order.
struct LineSnapshot {
    menu_item_id: i64,
    quantity: i32,
    item_name: String,
    item_price: f64,
    extras: Vec<Extra>,
}

/// Runs the reserve-then-insert step until an order row lands. A unique
/// violation on (cafe_slug, order_date, order_sequence) means the reserved
/// sequence was already taken, so the step runs again with a fresh
/// reservation; any other error aborts. Burning through every attempt means
/// the day has no free sequence left.
fn insert_until_sequence_is_free<F>(mut step: F) -> Result<OrderAggregate, OrderError>
where
    F: FnMut(usize) -> Result<OrderAggregate, OrderError>,
{
    for attempt in 0..allocator::INSERT_ATTEMPTS {
        match step(attempt) {
            Ok(aggregate) => return Ok(aggregate),
            Err(err) if is_unique_violation(&err) => continue,
            Err(err) => return Err(err),
        }
    }

    Err(OrderError::CapacityExhausted)
}

fn is_unique_violation(err: &OrderError) -> bool {
    matches!(
        err,
        OrderError::Db(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))
    )
}

/// Checks every requested line against the cafe's current catalog. An extra
/// is only legal if an association row links it to that specific menu item;
/// a globally valid extra id is not enough.
fn validate_lines(
    conn: &mut PgConnection,
    cafe: CafeSlug,
    lines: &[OrderLineRequest],
) -> Result<Vec<LineSnapshot>, OrderError> {
    let mut snapshots = Vec::with_capacity(lines.len());

    for line in lines {
        let menu_item: Option<MenuItem> = menu_items::table
            .inner_join(menu_item_cafes::table)
            .filter(menu_items::id.eq(line.menu_item_id))
            .filter(menu_item_cafes::cafe_slug.eq(cafe.as_str()))
            .select((menu_items::id, menu_items::name, menu_items::price))
            .first(conn)
            .optional()?;

        let menu_item = menu_item.ok_or_else(|| {
            OrderError::Validation(format!(
                "Menu item {} is not available for {cafe}",
                line.menu_item_id
            ))
        })?;

        let selected_extras: Vec<Extra> = if line.extra_ids.is_empty() {
            vec![]
        } else {
            extras::table
                .inner_join(menu_item_extras::table)
                .filter(menu_item_extras::menu_item_id.eq(menu_item.id))
                .filter(extras::id.eq_any(&line.extra_ids))
                .select((extras::id, extras::name, extras::price))
                .order(extras::id.asc())
                .load(conn)?
        };

        if selected_extras.len() != line.extra_ids.len() {
            return Err(OrderError::Validation(format!(
                "Invalid extras for menu item {}",
                menu_item.id
            )));
        }

        snapshots.push(LineSnapshot {
            menu_item_id: menu_item.id,
            quantity: line.quantity,
            item_name: menu_item.name,
            item_price: menu_item.price,
            extras: selected_extras,
        });
    }

    Ok(snapshots)
}

/// Inserts the order row plus all its item/extra rows in one transaction.
/// A unique-constraint conflict on the order row surfaces to the caller so
/// the allocation loop can retry with a fresh sequence; nothing partial
/// survives a failure.
fn insert_order_with_lines(
    conn: &mut PgConnection,
    msg: &CreateOrder,
    reserved: &ReservedNumber,
    snapshots: &[LineSnapshot],
) -> Result<OrderAggregate, OrderError> {
    conn.build_transaction().run(|trx| {
        let order: Order = diesel::insert_into(orders::table)
            .values(NewOrder {
                cafe_slug: msg.cafe_slug.as_str().to_owned(),
                customer_name: msg.customer_name.clone(),
                customer_email: msg.customer_email.clone(),
                table_number: msg.table_number.clone(),
                order_number: reserved.order_number.clone(),
                order_date: reserved.date,
                order_sequence: reserved.sequence,
                status: OrderStatus::Pending.as_str().to_owned(),
            })
            .get_result(trx)?;

        let mut item_rows = Vec::with_capacity(snapshots.len());
        let mut extra_rows = Vec::new();

        for snapshot in snapshots {
            let item: OrderItem = diesel::insert_into(order_items::table)
                .values(NewOrderItem {
                    order_id: order.id,
                    menu_item_id: snapshot.menu_item_id,
                    quantity: snapshot.quantity,
                    item_name: snapshot.item_name.clone(),
                    item_price: snapshot.item_price,
                })
                .get_result(trx)?;

            if !snapshot.extras.is_empty() {
                let new_extras: Vec<NewOrderItemExtra> = snapshot
                    .extras
                    .iter()
                    .map(|extra| NewOrderItemExtra {
                        order_item_id: item.id,
                        extra_id: extra.id,
                        extra_name: extra.name.clone(),
                        extra_price: extra.price,
                    })
                    .collect();

                let inserted: Vec<OrderItemExtra> = diesel::insert_into(order_item_extras::table)
                    .values(new_extras)
                    .get_results(trx)?;
                extra_rows.extend(inserted);
            }

            item_rows.push(item);
        }

        Ok(build_order_aggregate(order, item_rows, extra_rows))
    })
}

fn load_order_aggregate(
    conn: &mut PgConnection,
    order_id: i64,
) -> Result<OrderAggregate, OrderError> {
    let order: Order = orders::table
        .find(order_id)
        .first(conn)
        .optional()?
        .ok_or(OrderError::NotFound)?;

    let items: Vec<OrderItem> = order_items::table
        .filter(order_items::order_id.eq(order_id))
        .order(order_items::id.asc())
        .load(conn)?;

    let item_ids: Vec<i64> = items.iter().map(|item| item.id).collect();
    let extra_rows: Vec<OrderItemExtra> = if item_ids.is_empty() {
        vec![]
    } else {
        order_item_extras::table
            .filter(order_item_extras::order_item_id.eq_any(&item_ids))
            .order(order_item_extras::id.asc())
            .load(conn)?
    };

    Ok(build_order_aggregate(order, items, extra_rows))
}

impl Handler<CreateOrder> for PgActor {
    type Result = Result<OrderAggregate, OrderError>;

    fn handle(&mut self, msg: CreateOrder, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        // Validation happens before any mutation.
        let snapshots = validate_lines(&mut conn, msg.cafe_slug, &msg.items)?;

        // The counter is only an accelerator: if it ever diverges from the
        // orders table, the unique constraint rejects the insert and we
        // allocate again with a fresh candidate.
        insert_until_sequence_is_free(|attempt| {
            let reserved = allocator::reserve(&mut conn, msg.cafe_slug)?;

            match insert_order_with_lines(&mut conn, &msg, &reserved, &snapshots) {
                Err(err) if is_unique_violation(&err) => {
                    debug!(
                        cafe = %msg.cafe_slug,
                        sequence = reserved.sequence,
                        attempt,
                        "daily sequence already taken, reallocating"
                    );
                    Err(err)
                }
                other => other,
            }
        })
    }
}

impl Handler<FetchOrder> for PgActor {
    type Result = Result<OrderAggregate, OrderError>;

    fn handle(&mut self, msg: FetchOrder, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;
        load_order_aggregate(&mut conn, msg.0)
    }
}

impl Handler<FetchOrders> for PgActor {
    type Result = Result<Vec<OrderAggregate>, OrderError>;

    fn handle(&mut self, msg: FetchOrders, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let mut query = orders::table.into_boxed();
        if let Some(cafe) = msg.cafe_slug {
            query = query.filter(orders::cafe_slug.eq(cafe.as_str()));
        }
        if msg.active_only {
            query = query.filter(orders::status.ne(OrderStatus::Completed.as_str()));
        }

        let order_rows: Vec<Order> = query.order(orders::created_at.desc()).load(&mut conn)?;
        if order_rows.is_empty() {
            return Ok(vec![]);
        }

        let order_ids: Vec<i64> = order_rows.iter().map(|order| order.id).collect();
        let items: Vec<OrderItem> = order_items::table
            .filter(order_items::order_id.eq_any(&order_ids))
            .order(order_items::id.asc())
            .load(&mut conn)?;

        let item_ids: Vec<i64> = items.iter().map(|item| item.id).collect();
        let extra_rows: Vec<OrderItemExtra> = if item_ids.is_empty() {
            vec![]
        } else {
            order_item_extras::table
                .filter(order_item_extras::order_item_id.eq_any(&item_ids))
                .order(order_item_extras::id.asc())
                .load(&mut conn)?
        };

        let mut items_by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for item in items {
            items_by_order.entry(item.order_id).or_default().push(item);
        }
        let mut extras_by_item: HashMap<i64, Vec<OrderItemExtra>> = HashMap::new();
        for extra in extra_rows {
            extras_by_item.entry(extra.order_item_id).or_default().push(extra);
        }

        Ok(order_rows
            .into_iter()
            .map(|order| {
                let own_items = items_by_order.remove(&order.id).unwrap_or_default();
                let own_extras = own_items
                    .iter()
                    .flat_map(|item| extras_by_item.remove(&item.id).unwrap_or_default())
                    .collect();
                build_order_aggregate(order, own_items, own_extras)
            })
            .collect())
    }
}

impl Handler<UpdateOrderStatus> for PgActor {
    type Result = Result<OrderAggregate, OrderError>;

    fn handle(&mut self, msg: UpdateOrderStatus, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let current: String = orders::table
            .find(msg.order_id)
            .select(orders::status)
            .first(&mut conn)
            .optional()?
            .ok_or(OrderError::NotFound)?;

        // A stored status outside the known flow also refuses to move.
        let legal = OrderStatus::parse(&current)
            .map(|status| status.can_transition(msg.status))
            .unwrap_or(false);
        if !legal {
            return Err(OrderError::InvalidTransition { current });
        }

        diesel::update(orders::table.find(msg.order_id))
            .set(orders::status.eq(msg.status.as_str()))
            .execute(&mut conn)?;

        load_order_aggregate(&mut conn, msg.order_id)
    }
}

impl Handler<EndOfDayReport> for PgActor {
    type Result = Result<ReportAggregate, OrderError>;

    fn handle(&mut self, msg: EndOfDayReport, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let mut query = orders::table
            .select((orders::id, orders::cafe_slug, orders::status))
            .filter(orders::order_date.eq(msg.date))
            .into_boxed();
        if let Some(cafe) = msg.cafe_slug {
            query = query.filter(orders::cafe_slug.eq(cafe.as_str()));
        }

        let order_rows: Vec<(i64, String, String)> = query
            .order((orders::created_at.asc(), orders::id.asc()))
            .load(&mut conn)?;

        let report_orders: Vec<ReportOrderRow> = order_rows
            .into_iter()
            .map(|(id, cafe_slug, status)| ReportOrderRow { id, cafe_slug, status })
            .collect();

        let mut report_lines: Vec<ReportLineRow> = vec![];
        if !report_orders.is_empty() {
            let order_ids: Vec<i64> = report_orders.iter().map(|order| order.id).collect();
            let items: Vec<OrderItem> = order_items::table
                .filter(order_items::order_id.eq_any(&order_ids))
                .order(order_items::id.asc())
                .load(&mut conn)?;

            let item_ids: Vec<i64> = items.iter().map(|item| item.id).collect();
            let extra_rows: Vec<OrderItemExtra> = if item_ids.is_empty() {
                vec![]
            } else {
                order_item_extras::table
                    .filter(order_item_extras::order_item_id.eq_any(&item_ids))
                    .load(&mut conn)?
            };

            let mut extras_per_unit: HashMap<i64, f64> = HashMap::new();
            for extra in extra_rows {
                *extras_per_unit.entry(extra.order_item_id).or_insert(0.0) +=
                    sanitize_price(extra.extra_price);
            }

            report_lines = items
                .into_iter()
                .map(|item| ReportLineRow {
                    order_id: item.order_id,
                    extras_per_unit: extras_per_unit.get(&item.id).copied().unwrap_or(0.0),
                    item_name: item.item_name,
                    quantity: item.quantity,
                    item_price: item.item_price,
                })
                .collect();
        }

        Ok(compute_report(msg.date, msg.cafe_slug, &report_orders, &report_lines))
    }
}

impl Handler<FetchCafeMenu> for PgActor {
    type Result = Result<Vec<MenuItemView>, OrderError>;

    fn handle(&mut self, msg: FetchCafeMenu, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        let menu: Vec<MenuItem> = menu_items::table
            .inner_join(menu_item_cafes::table)
            .filter(menu_item_cafes::cafe_slug.eq(msg.0.as_str()))
            .select((menu_items::id, menu_items::name, menu_items::price))
            .order(menu_items::id.asc())
            .load(&mut conn)?;

        if menu.is_empty() {
            return Ok(vec![]);
        }

        let menu_ids: Vec<i64> = menu.iter().map(|item| item.id).collect();
        let pairs: Vec<(i64, Extra)> = menu_item_extras::table
            .inner_join(extras::table)
            .filter(menu_item_extras::menu_item_id.eq_any(&menu_ids))
            .select((
                menu_item_extras::menu_item_id,
                (extras::id, extras::name, extras::price),
            ))
            .order((menu_item_extras::menu_item_id.asc(), extras::id.asc()))
            .load(&mut conn)?;

        let mut extras_by_item: HashMap<i64, Vec<Extra>> = HashMap::new();
        for (menu_item_id, extra) in pairs {
            extras_by_item.entry(menu_item_id).or_default().push(extra);
        }

        Ok(menu
            .into_iter()
            .map(|item| MenuItemView {
                extras: extras_by_item.remove(&item.id).unwrap_or_default(),
                id: item.id,
                name: item.name,
                price: item.price,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use diesel::result::DatabaseErrorKind;

    fn sequence_taken() -> OrderError {
        OrderError::Db(diesel::result::Error::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_owned()),
        ))
    }

    fn created_order(order_number: &str) -> OrderAggregate {
        OrderAggregate {
            id: 7,
            order_number: order_number.into(),
            cafe_slug: "raysdiner".into(),
            customer_name: "Ada".into(),
            customer_email: None,
            table_number: None,
            order_date: NaiveDate::from_ymd_opt(2026, 8, 28).unwrap(),
            order_sequence: 7,
            status: "Pending".into(),
            created_at: Utc::now(),
            items: vec![],
        }
    }

    #[test]
    fn persistent_sequence_collisions_exhaust_capacity() {
        let mut attempts = 0;
        let result = insert_until_sequence_is_free(|_| {
            attempts += 1;
            Err(sequence_taken())
        });

        assert!(matches!(result, Err(OrderError::CapacityExhausted)));
        assert_eq!(attempts, allocator::INSERT_ATTEMPTS);
    }

    #[test]
    fn a_freed_sequence_is_claimed_after_collisions() {
        let mut attempts = 0;
        let result = insert_until_sequence_is_free(|_| {
            attempts += 1;
            if attempts < 3 {
                Err(sequence_taken())
            } else {
                Ok(created_order("07"))
            }
        });

        assert_eq!(result.unwrap().order_number, "07");
        assert_eq!(attempts, 3);
    }

    #[test]
    fn non_conflict_errors_abort_without_retrying() {
        let mut attempts = 0;
        let result = insert_until_sequence_is_free(|_| {
            attempts += 1;
            Err(OrderError::Contention)
        });

        assert!(matches!(result, Err(OrderError::Contention)));
        assert_eq!(attempts, 1);
    }
}
