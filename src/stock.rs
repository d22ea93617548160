//! Snapshot normalization
//!
//! Turns the loosely-typed inventory payload into [`ProductRecord`]s.
//! Expected shape (every field optional):
//!
//! ```json
//! { "data": [ { "_id": "...", "name": "...", "available": 1, "inventory_quantity": 1079 } ] }
//! ```
//!
//! An item is in stock only when `inventory_quantity` parses as an integer
//! greater than zero and `available` is one of `1`, `true`, `"1"`, `"true"`
//! or `"yes"`. Other components depend on this exact rule.

use crate::error::{Result, StockError};
use serde::Serialize;
use serde_json::{Map, Value};

const ITEMS_FIELD: &str = "data";
const ID_FIELD: &str = "_id";
const NAME_FIELD: &str = "name";
const AVAILABLE_FIELD: &str = "available";
const QUANTITY_FIELD: &str = "inventory_quantity";

pub const UNKNOWN_ID: &str = "unknown";
pub const UNNAMED_PRODUCT: &str = "Unnamed Product";

/// One inventory item as of the latest poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub in_stock: bool,
    pub quantity: Option<u64>,
    /// Untouched upstream attributes, for filtering collaborators
    pub raw: Map<String, Value>,
}

impl ProductRecord {
    pub fn human_status(&self) -> &'static str {
        if self.in_stock {
            "IN STOCK"
        } else {
            "OUT OF STOCK"
        }
    }
}

/// Borrow the item list out of a snapshot.
pub fn parse_item_list(payload: &Value) -> Result<&[Value]> {
    match payload.get(ITEMS_FIELD) {
        Some(Value::Array(items)) => Ok(items),
        other => Err(StockError::MissingItemList(json_kind(other))),
    }
}

/// Normalize a raw snapshot. Never fails: a snapshot without an item list
/// yields no products, and malformed items fall back to item-local defaults.
pub fn normalize(payload: &Value) -> Vec<ProductRecord> {
    let items = match parse_item_list(payload) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("{}; treating cycle as empty", e);
            return Vec::new();
        }
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(parse_item)
        .collect()
}

fn parse_item(obj: &Map<String, Value>) -> ProductRecord {
    let id = scalar_to_string(obj.get(ID_FIELD)).unwrap_or_else(|| UNKNOWN_ID.to_string());
    let name =
        scalar_to_string(obj.get(NAME_FIELD)).unwrap_or_else(|| UNNAMED_PRODUCT.to_string());
    let quantity = parse_quantity(obj.get(QUANTITY_FIELD));
    let flag = is_available_flag(obj.get(AVAILABLE_FIELD));

    ProductRecord {
        id,
        name,
        in_stock: is_in_stock(quantity, flag),
        quantity,
        raw: obj.clone(),
    }
}

/// Stock rule shared by every caller
pub fn is_in_stock(quantity: Option<u64>, available_flag: bool) -> bool {
    available_flag && quantity.is_some_and(|q| q > 0)
}

/// Recognized truthy values for the availability flag (case-sensitive).
pub fn is_available_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => matches!(s.as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

/// Parse the quantity field as a non-negative integer.
///
/// Floats truncate toward zero, strings are trimmed before parsing and booleans
/// count as 0/1. Negative or unparseable values become `None`.
pub fn parse_quantity(value: Option<&Value>) -> Option<u64> {
    let parsed = match value? {
        Value::Number(n) if n.is_f64() => n.as_f64().map(|f| f.trunc() as i64),
        Value::Number(n) => return n.as_u64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };

    parsed.and_then(|q| u64::try_from(q).ok())
}

fn scalar_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: Option<&Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "a list",
        Some(Value::Object(_)) => "an object",
    }
}

#[cfg(test)]
#[path = "stock_tests.rs"]
mod tests;
