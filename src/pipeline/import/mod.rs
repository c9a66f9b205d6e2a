pub mod format;
pub mod hash;
pub mod importer;

pub use format::*;
pub use hash::*;
pub use importer::*;

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::OrderStatus;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Uploaded file is empty")]
    EmptyPayload,

    #[error("File is not a PDF document")]
    NotAPdf,

    #[error("Kit not found: {0}")]
    KitNotFound(Uuid),

    #[error("Order {order_id} does not accept result uploads in status '{status}'")]
    OrderNotAccepting { order_id: Uuid, status: OrderStatus },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
