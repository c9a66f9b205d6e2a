use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::OrderStatus;

/// The slice of an order the results pipeline is allowed to see and move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kit {
    pub id: Uuid,
    pub order_id: Uuid,
    pub barcode: Option<String>,
}
