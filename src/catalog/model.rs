//! Catalog domain types.
//!
//! Serde names follow the storefront's camelCase convention so the same
//! structs serve as the jsonb storage shape and the API response shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visibility value assigned to every newly created product.
pub const STOREFRONT_VISIBLE: &str = "Visible";

/// Literal stand-in used when the feed carries an empty manufacturer name.
pub const FALLBACK_MANUFACTURER_NAME: &str = "ManufacturerName";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub file_name: String,
    pub cdn_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub primary_category_id: String,
    pub primary_category_name: String,
    pub secondary_category_id: String,
    pub secondary_category_name: String,
}

/// A sellable unit (SKU) belonging to a product. `id` is the supplier item id
/// and doubles as the sku.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub available: bool,
    pub description: String,
    pub cost: f64,
    pub price: f64,
    pub sku: String,
    pub packaging: String,
    pub item_code: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manufacturer {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Supplier product id; unique across the catalog.
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub short_description: String,
    /// Generated once at creation, never changed by re-import.
    pub vendor_id: String,
    /// Set once at creation, never changed by re-import.
    pub manufacturer_id: i64,
    #[serde(default)]
    pub variants: Vec<Variant>,
    pub storefront_price_visibility: String,
    pub availability: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub category: Category,
    /// Set by the store; None on a product delta that has not been persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Joined product + manufacturer shape returned by the details lookup,
/// stamped with a fresh correlation id per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub doc_id: String,
    pub product: Product,
    pub manufacturer: Manufacturer,
}

/// Canonical variant merge rule: replace in place when the id already exists
/// (position preserved), append otherwise. Applied identically by the row
/// transform and the bulk upsert path.
pub fn merge_variant(variants: &mut Vec<Variant>, variant: Variant) {
    match variants.iter_mut().find(|v| v.id == variant.id) {
        Some(existing) => *existing = variant,
        None => variants.push(variant),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: &str, price: f64) -> Variant {
        Variant {
            id: id.to_string(),
            available: true,
            description: format!("variant {id}"),
            cost: price,
            price,
            sku: id.to_string(),
            packaging: "EA".to_string(),
            item_code: String::new(),
            images: vec![],
        }
    }

    #[test]
    fn merge_replaces_in_place_keeping_position() {
        let mut variants = vec![variant("V1", 1.0), variant("V2", 2.0), variant("V3", 3.0)];
        merge_variant(&mut variants, variant("V2", 9.5));

        assert_eq!(variants.len(), 3);
        assert_eq!(variants[1].id, "V2");
        assert_eq!(variants[1].price, 9.5);
        assert_eq!(variants[0].price, 1.0);
        assert_eq!(variants[2].price, 3.0);
    }

    #[test]
    fn merge_appends_unknown_id() {
        let mut variants = vec![variant("V1", 1.0)];
        merge_variant(&mut variants, variant("V9", 4.0));

        assert_eq!(variants.len(), 2);
        assert_eq!(variants[1].id, "V9");
    }

    #[test]
    fn variant_serializes_camel_case() {
        let json = serde_json::to_value(variant("V1", 2.5)).expect("serialize");
        assert!(json.get("itemCode").is_some());
        assert!(json.get("item_code").is_none());
    }
}
