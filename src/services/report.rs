use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::types::{round_money, sanitize_price, CafeSlug, OrderStatus};

/// Order fields the report needs; one row per order placed on the date.
#[derive(Debug, Clone)]
pub struct ReportOrderRow {
    pub id: i64,
    pub cafe_slug: String,
    pub status: String,
}

/// One order line flattened with the per-unit sum of its extras.
#[derive(Debug, Clone)]
pub struct ReportLineRow {
    pub order_id: i64,
    pub item_name: String,
    pub quantity: i32,
    pub item_price: f64,
    pub extras_per_unit: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTotals {
    pub order_count: i64,
    pub gross_revenue: f64,
    pub completed_revenue: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusCounts {
    pub pending: i64,
    pub preparing: i64,
    pub ready: i64,
    pub completed: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CafeBreakdown {
    pub cafe_slug: String,
    pub cafe_label: String,
    pub order_count: i64,
    pub gross_revenue: f64,
    pub completed_revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBreakdown {
    pub name: String,
    pub quantity: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportAggregate {
    pub report_date: NaiveDate,
    pub cafe_slug: Option<String>,
    pub cafe_label: String,
    pub generated_at: DateTime<Utc>,
    pub totals: ReportTotals,
    pub status_counts: StatusCounts,
    pub cafes: Vec<CafeBreakdown>,
    pub items: Vec<ItemBreakdown>,
}

/// Derives the end-of-day aggregates from a day's orders and lines. Every
/// revenue accumulation is a running rounded sum; line revenue itself is
/// rounded once after the full `(price + extras) * quantity` expression.
pub fn compute_report(
    report_date: NaiveDate,
    cafe: Option<CafeSlug>,
    orders: &[ReportOrderRow],
    lines: &[ReportLineRow],
) -> ReportAggregate {
    let mut order_revenue: HashMap<i64, f64> = HashMap::new();
    let mut item_order: Vec<String> = Vec::new();
    let mut item_totals: HashMap<String, (i64, f64)> = HashMap::new();

    for line in lines {
        let unit = sanitize_price(line.item_price) + sanitize_price(line.extras_per_unit);
        let line_revenue = round_money(unit * f64::from(line.quantity));

        let order_total = order_revenue.entry(line.order_id).or_insert(0.0);
        *order_total = round_money(*order_total + line_revenue);

        // Aggregation is keyed by display name: two catalog entries that
        // historically shared a name merge into one row.
        if !item_totals.contains_key(&line.item_name) {
            item_order.push(line.item_name.clone());
        }
        let entry = item_totals.entry(line.item_name.clone()).or_insert((0, 0.0));
        entry.0 += i64::from(line.quantity);
        entry.1 = round_money(entry.1 + line_revenue);
    }

    let mut status_counts = StatusCounts::default();
    let mut cafes: HashMap<String, CafeBreakdown> = HashMap::new();
    let mut gross_revenue = 0.0;
    let mut completed_revenue = 0.0;

    for order in orders {
        match OrderStatus::parse(&order.status) {
            Some(OrderStatus::Pending) => status_counts.pending += 1,
            Some(OrderStatus::Preparing) => status_counts.preparing += 1,
            Some(OrderStatus::Ready) => status_counts.ready += 1,
            Some(OrderStatus::Completed) => status_counts.completed += 1,
            None => {}
        }

        let revenue = order_revenue.get(&order.id).copied().unwrap_or(0.0);
        let completed = order.status == OrderStatus::Completed.as_str();

        gross_revenue = round_money(gross_revenue + revenue);
        if completed {
            completed_revenue = round_money(completed_revenue + revenue);
        }

        let breakdown = cafes
            .entry(order.cafe_slug.clone())
            .or_insert_with(|| CafeBreakdown {
                cafe_slug: order.cafe_slug.clone(),
                cafe_label: CafeSlug::label_for(&order.cafe_slug),
                order_count: 0,
                gross_revenue: 0.0,
                completed_revenue: 0.0,
            });

        breakdown.order_count += 1;
        breakdown.gross_revenue = round_money(breakdown.gross_revenue + revenue);
        if completed {
            breakdown.completed_revenue = round_money(breakdown.completed_revenue + revenue);
        }
    }

    let mut cafe_rows: Vec<CafeBreakdown> = cafes.into_values().collect();
    cafe_rows.sort_by(|a, b| a.cafe_slug.cmp(&b.cafe_slug));

    let mut item_rows: Vec<ItemBreakdown> = item_order
        .into_iter()
        .map(|name| {
            let (quantity, revenue) = item_totals[&name];
            ItemBreakdown { name, quantity, revenue }
        })
        .collect();
    item_rows.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.quantity.cmp(&a.quantity))
    });

    ReportAggregate {
        report_date,
        cafe_slug: cafe.map(|slug| slug.as_str().to_owned()),
        cafe_label: match cafe {
            Some(slug) => slug.label().to_owned(),
            None => "All Cafes".to_owned(),
        },
        generated_at: Utc::now(),
        totals: ReportTotals {
            order_count: orders.len() as i64,
            gross_revenue,
            completed_revenue,
        },
        status_counts,
        cafes: cafe_rows,
        items: item_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 28).unwrap()
    }

    fn order(id: i64, cafe: &str, status: &str) -> ReportOrderRow {
        ReportOrderRow {
            id,
            cafe_slug: cafe.into(),
            status: status.into(),
        }
    }

    fn line(order_id: i64, name: &str, quantity: i32, price: f64, extras: f64) -> ReportLineRow {
        ReportLineRow {
            order_id,
            item_name: name.into(),
            quantity,
            item_price: price,
            extras_per_unit: extras,
        }
    }

    #[test]
    fn full_day_scenario_totals_and_status_counts() {
        let orders = [
            order(1, "raysdiner", "Completed"),
            order(2, "raysdiner", "Completed"),
            order(3, "raysdiner", "Pending"),
        ];
        let lines = [
            line(1, "Cheese Burger", 2, 6.25, 0.0),
            line(2, "Jacket Potato", 1, 7.25, 0.0),
            line(3, "Hot Dog", 1, 5.00, 0.0),
        ];

        let report = compute_report(date(), Some(CafeSlug::Raysdiner), &orders, &lines);

        assert_eq!(report.totals.order_count, 3);
        assert_eq!(report.totals.gross_revenue, 24.75);
        assert_eq!(report.totals.completed_revenue, 19.75);
        assert_eq!(report.status_counts.completed, 2);
        assert_eq!(report.status_counts.pending, 1);
        assert_eq!(report.status_counts.preparing, 0);
        assert_eq!(report.cafe_label, "Rays Diner");
    }

    #[test]
    fn line_revenue_includes_extras_before_quantity() {
        // (6.50 + 1.00 + 1.20) * 2 = 17.40
        let orders = [order(1, "lovesgrove", "Pending")];
        let lines = [line(1, "Beef Burger", 2, 6.50, 2.20)];

        let report = compute_report(date(), None, &orders, &lines);
        assert_eq!(report.totals.gross_revenue, 17.40);
        assert_eq!(report.items[0].revenue, 17.40);
    }

    #[test]
    fn tiny_fractions_accumulate_without_float_drift() {
        let orders = [order(1, "raysdiner", "Completed")];
        let lines = [
            line(1, "Penny Sweet", 1, 0.10, 0.0),
            line(1, "Penny Sweet", 1, 0.10, 0.0),
            line(1, "Penny Sweet", 1, 0.10, 0.0),
        ];

        let report = compute_report(date(), None, &orders, &lines);
        assert_eq!(report.totals.gross_revenue, 0.30);
        assert_eq!(report.totals.completed_revenue, 0.30);
        assert_eq!(report.items[0].quantity, 3);
        assert_eq!(report.items[0].revenue, 0.30);
    }

    #[test]
    fn cafes_sort_by_slug_ascending() {
        let orders = [
            order(1, "raysdiner", "Pending"),
            order(2, "cosmiccafe", "Pending"),
            order(3, "lovesgrove", "Pending"),
        ];

        let report = compute_report(date(), None, &orders, &[]);
        let slugs: Vec<&str> = report.cafes.iter().map(|c| c.cafe_slug.as_str()).collect();
        assert_eq!(slugs, vec!["cosmiccafe", "lovesgrove", "raysdiner"]);
        assert_eq!(report.cafes[0].cafe_label, "Cosmic Cafe");
    }

    #[test]
    fn items_sort_by_revenue_then_quantity_descending() {
        let orders = [order(1, "raysdiner", "Pending")];
        let lines = [
            line(1, "Tea", 4, 1.50, 0.0),       // 6.00
            line(1, "Chips", 2, 3.00, 0.0),     // 6.00, fewer sold
            line(1, "Burger", 1, 6.50, 0.0),    // 6.50
        ];

        let report = compute_report(date(), None, &orders, &lines);
        let names: Vec<&str> = report.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Burger", "Tea", "Chips"]);
    }

    #[test]
    fn same_item_name_merges_across_orders() {
        let orders = [order(1, "raysdiner", "Pending"), order(2, "raysdiner", "Pending")];
        let lines = [
            line(1, "Chips", 1, 3.00, 0.0),
            line(2, "Chips", 2, 3.00, 0.0),
        ];

        let report = compute_report(date(), None, &orders, &lines);
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].quantity, 3);
        assert_eq!(report.items[0].revenue, 9.00);
    }

    #[test]
    fn orders_without_lines_count_but_add_no_revenue() {
        let orders = [order(1, "raysdiner", "Completed")];

        let report = compute_report(date(), None, &orders, &[]);
        assert_eq!(report.totals.order_count, 1);
        assert_eq!(report.totals.gross_revenue, 0.0);
        assert_eq!(report.status_counts.completed, 1);
        assert!(report.items.is_empty());
    }
}
