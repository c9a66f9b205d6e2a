use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_uuid, DatabaseError};
use crate::models::enums::OrderStatus;
use crate::models::{Kit, Order};

pub fn insert_order(conn: &Connection, order: &Order) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO orders (id, status, completed_at) VALUES (?1, ?2, ?3)",
        params![order.id.to_string(), order.status.as_str(), order.completed_at],
    )?;
    Ok(())
}

pub fn insert_kit(conn: &Connection, kit: &Kit) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO kits (id, order_id, barcode) VALUES (?1, ?2, ?3)",
        params![kit.id.to_string(), kit.order_id.to_string(), kit.barcode],
    )?;
    Ok(())
}

pub fn get_kit(conn: &Connection, id: &Uuid) -> Result<Option<Kit>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, order_id, barcode FROM kits WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    row.map(|(id, order_id, barcode)| {
        Ok(Kit {
            id: parse_uuid(&id)?,
            order_id: parse_uuid(&order_id)?,
            barcode,
        })
    })
    .transpose()
}

pub fn get_order(conn: &Connection, id: &Uuid) -> Result<Option<Order>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, status, completed_at FROM orders WHERE id = ?1",
            params![id.to_string()],
            order_row,
        )
        .optional()?;
    row.map(order_from_row).transpose()
}

/// The order that owns a kit, if both exist.
pub fn get_order_for_kit(conn: &Connection, kit_id: &Uuid) -> Result<Option<Order>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT o.id, o.status, o.completed_at
             FROM orders o JOIN kits k ON k.order_id = o.id
             WHERE k.id = ?1",
            params![kit_id.to_string()],
            order_row,
        )
        .optional()?;
    row.map(order_from_row).transpose()
}

pub fn update_order_status(
    conn: &Connection,
    order_id: &Uuid,
    status: OrderStatus,
    completed_at: Option<DateTime<Utc>>,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE orders SET status = ?1, completed_at = ?2 WHERE id = ?3",
        params![status.as_str(), completed_at, order_id.to_string()],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Order".into(),
            id: order_id.to_string(),
        });
    }
    Ok(())
}

type OrderRow = (String, String, Option<DateTime<Utc>>);

fn order_row(row: &rusqlite::Row<'_>) -> Result<OrderRow, rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn order_from_row((id, status, completed_at): OrderRow) -> Result<Order, DatabaseError> {
    Ok(Order {
        id: parse_uuid(&id)?,
        status: OrderStatus::from_str(&status)?,
        completed_at,
    })
}
