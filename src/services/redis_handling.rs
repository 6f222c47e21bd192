use tracing::warn;

use crate::services::aggregate::OrderAggregate;
use crate::types::CafeSlug;

pub const ORDER_CREATED_CHANNEL: &str = "order:new";
pub const ORDER_STATUS_CHANNEL: &str = "order:status";

const MENU_KEY: &str = "menu";

fn menu_key(cafe: CafeSlug) -> String {
    format!("{MENU_KEY}_{cafe}")
}

/// Publishes an order event with the full aggregate payload for real-time
/// consumers (kitchen/admin screens and the public board). Fire-and-forget:
/// a broken broker never fails the operation that produced the event.
pub fn publish_order_event(db: &redis::Client, channel: &str, payload: &OrderAggregate) {
    let json = match serde_json::to_string(payload) {
        Ok(json) => json,
        Err(err) => {
            warn!(order_id = payload.id, %err, "failed to serialize order event");
            return;
        }
    };

    let mut conn = match db.get_connection() {
        Ok(conn) => conn,
        Err(err) => {
            warn!(%err, "failed to establish connection with redis");
            return;
        }
    };

    redis::cmd("PUBLISH").arg(channel).arg(&json).execute(&mut conn);
    redis::cmd("PUBLISH")
        .arg(format!("order_{}", payload.id))
        .arg(&json)
        .execute(&mut conn);
}

/// Cached per-cafe menu JSON, if present.
pub fn get_cached_menu(db: &redis::Client, cafe: CafeSlug) -> Option<String> {
    let mut conn = match db.get_connection() {
        Ok(conn) => conn,
        Err(err) => {
            warn!(%err, "failed to establish connection with redis");
            return None;
        }
    };

    redis::cmd("GET").arg(menu_key(cafe)).query::<String>(&mut conn).ok()
}

pub fn cache_menu(db: &redis::Client, cafe: CafeSlug, menu_json: &str) {
    let mut conn = match db.get_connection() {
        Ok(conn) => conn,
        Err(err) => {
            warn!(%err, "failed to establish connection with redis");
            return;
        }
    };

    redis::cmd("SET").arg(menu_key(cafe)).arg(menu_json).execute(&mut conn);
}
