//! Pincode-based product filtering and availability listings
//!
//! Mapping file structure: `{"122001": ["product_id1", ...]}`. A pincode
//! missing from the mapping (or an empty mapping) allows every product.

use crate::error::{Result, StockError};
use crate::stock::ProductRecord;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Maximum number of products listed in one message
pub const LIST_LIMIT: usize = 30;

/// 4 to 6 ASCII digits
pub fn is_valid_pincode(text: &str) -> bool {
    (4..=6).contains(&text.len()) && text.bytes().all(|b| b.is_ascii_digit())
}

/// Pincode -> allowed product ids. Loaded once, then passed to whoever filters.
#[derive(Debug, Default, Clone)]
pub struct PincodeFilter {
    mapping: HashMap<String, HashSet<String>>,
}

impl PincodeFilter {
    /// Load the mapping file. Missing or unreadable files give an empty filter.
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            log::debug!("No pincode mapping at {}", path.display());
            return Self::default();
        }

        match std::fs::read_to_string(path)
            .map_err(StockError::from)
            .and_then(|content| Self::from_json(&content))
        {
            Ok(filter) => {
                log::info!("Loaded pincode mapping for {} pincodes", filter.len());
                filter
            }
            Err(e) => {
                log::warn!("Failed to load pincode mapping: {}", e);
                Self::default()
            }
        }
    }

    /// Parse a mapping; entries whose value is not a list are skipped.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: HashMap<String, Value> = serde_json::from_str(content)?;
        let mapping = raw
            .into_iter()
            .filter_map(|(pincode, ids)| match ids {
                Value::Array(ids) => Some((
                    pincode,
                    ids.iter()
                        .filter_map(|id| match id {
                            Value::String(s) => Some(s.clone()),
                            Value::Number(n) => Some(n.to_string()),
                            _ => None,
                        })
                        .collect(),
                )),
                _ => None,
            })
            .collect();
        Ok(Self { mapping })
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn allows(&self, product: &ProductRecord, pincode: &str) -> bool {
        match self.mapping.get(pincode) {
            Some(ids) => ids.contains(&product.id),
            None => true,
        }
    }
}

/// In-stock products deliverable to `pincode`, in snapshot order
pub fn available_for_pincode<'a>(
    products: &'a [ProductRecord],
    filter: &PincodeFilter,
    pincode: &str,
) -> Vec<&'a ProductRecord> {
    products
        .iter()
        .filter(|p| p.in_stock && filter.allows(p, pincode))
        .collect()
}

pub fn format_product_list(products: &[&ProductRecord]) -> String {
    if products.is_empty() {
        return "No products are currently in stock for your pincode.".to_string();
    }

    let mut lines = vec!["In-stock products:".to_string()];
    for p in products.iter().take(LIST_LIMIT) {
        let qty = p
            .quantity
            .map(|q| q.to_string())
            .unwrap_or_else(|| "?".to_string());
        lines.push(format!("• {} (qty: {})", p.name, qty));
    }
    if products.len() > LIST_LIMIT {
        lines.push(format!("…and {} more", products.len() - LIST_LIMIT));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn product(id: &str, in_stock: bool, quantity: Option<u64>) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: format!("Item {}", id),
            in_stock,
            quantity,
            raw: Map::new(),
        }
    }

    #[test]
    fn pincode_validation() {
        assert!(is_valid_pincode("1220"));
        assert!(is_valid_pincode("122001"));
        assert!(!is_valid_pincode("122"));
        assert!(!is_valid_pincode("1220011"));
        assert!(!is_valid_pincode("12a001"));
        assert!(!is_valid_pincode(" 12200"));
        assert!(!is_valid_pincode("١٢٣٤"));
    }

    #[test]
    fn empty_filter_allows_everything() {
        let filter = PincodeFilter::default();
        assert!(filter.allows(&product("a", true, Some(1)), "122001"));
    }

    #[test]
    fn mapped_pincode_restricts_products() {
        let filter =
            PincodeFilter::from_json(r#"{ "122001": ["a", 7], "560001": "not a list" }"#).unwrap();
        assert_eq!(filter.len(), 1);

        assert!(filter.allows(&product("a", true, Some(1)), "122001"));
        assert!(filter.allows(&product("7", true, Some(1)), "122001"));
        assert!(!filter.allows(&product("b", true, Some(1)), "122001"));
        // Unmapped pincodes fall back to allow-all
        assert!(filter.allows(&product("b", true, Some(1)), "560001"));
    }

    #[test]
    fn load_handles_missing_and_corrupt_files() {
        assert!(PincodeFilter::load(Path::new("/nonexistent/pincodes.json")).is_empty());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pincode_products.json");
        std::fs::write(&path, "[not, a, map").unwrap();
        assert!(PincodeFilter::load(&path).is_empty());

        std::fs::write(&path, r#"{ "122001": ["a"] }"#).unwrap();
        assert_eq!(PincodeFilter::load(&path).len(), 1);
    }

    #[test]
    fn available_listing_filters_stock_and_pincode() {
        let products = vec![
            product("a", true, Some(3)),
            product("b", false, Some(0)),
            product("c", true, None),
        ];
        let filter = PincodeFilter::from_json(r#"{ "122001": ["a", "b"] }"#).unwrap();

        let listed = available_for_pincode(&products, &filter, "122001");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "a");

        let listed = available_for_pincode(&products, &filter, "999999");
        assert_eq!(listed.len(), 2);
        assert_eq!(
            format_product_list(&listed),
            "In-stock products:\n• Item a (qty: 3)\n• Item c (qty: ?)"
        );
    }

    #[test]
    fn empty_listing_message() {
        assert_eq!(
            format_product_list(&[]),
            "No products are currently in stock for your pincode."
        );
    }

    #[test]
    fn listing_is_capped() {
        let products: Vec<ProductRecord> = (0..35)
            .map(|i| product(&i.to_string(), true, Some(1)))
            .collect();
        let refs: Vec<&ProductRecord> = products.iter().collect();
        let text = format_product_list(&refs);
        assert_eq!(text.lines().count(), 1 + LIST_LIMIT + 1);
        assert!(text.ends_with("…and 5 more"));
    }
}
