use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{get_order_for_kit, update_order_status};
use crate::db::DatabaseError;
use crate::models::enums::OrderStatus;
use crate::models::{Order, Report};

/// Move the kit's order to RESULTS_GENERATED once this run produced at least
/// one canonical result and a report. Returns the order when it was advanced.
pub fn advance_order(
    conn: &Connection,
    kit_id: &Uuid,
    results_produced: usize,
    report: Option<&Report>,
    completed_at: DateTime<Utc>,
) -> Result<Option<Order>, DatabaseError> {
    let Some(mut order) = get_order_for_kit(conn, kit_id)? else {
        return Err(DatabaseError::NotFound {
            entity_type: "Order".into(),
            id: format!("kit {kit_id}"),
        });
    };

    if results_produced == 0 || report.is_none() {
        tracing::info!(
            order_id = %order.id,
            status = %order.status,
            results_produced,
            has_report = report.is_some(),
            "Order not advanced"
        );
        return Ok(None);
    }

    update_order_status(conn, &order.id, OrderStatus::ResultsGenerated, Some(completed_at))?;
    tracing::info!(
        order_id = %order.id,
        from = %order.status,
        to = %OrderStatus::ResultsGenerated,
        "Order advanced"
    );
    order.status = OrderStatus::ResultsGenerated;
    order.completed_at = Some(completed_at);
    Ok(Some(order))
}
