//! Per-row transform: one decoded feed row plus current catalog state becomes
//! a normalized product delta, creating the manufacturer on demand.

use crate::catalog::model::{
    merge_variant, Category, Image, Product, Variant, FALLBACK_MANUFACTURER_NAME,
    STOREFRONT_VISIBLE,
};
use crate::catalog::store::{CatalogStore, StoreError};
use crate::ids::IdSource;
use crate::importer::feed::FeedRow;
use thiserror::Error;

/// Row-scoped transform failure. The orchestrator logs it with the row index
/// and content and moves on; it never aborts the run.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("field {field} is not numeric (got {value:?})")]
    Numeric { field: &'static str, value: String },
    #[error("catalog lookup failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct TransformOutcome {
    pub product: Product,
    /// True when this row caused the manufacturer record to be created.
    pub manufacturer_created: bool,
}

fn parse_f64(field: &'static str, raw: &str) -> Result<f64, TransformError> {
    raw.trim().parse::<f64>().map_err(|_| TransformError::Numeric {
        field,
        value: raw.to_string(),
    })
}

fn parse_i64(field: &'static str, raw: &str) -> Result<i64, TransformError> {
    raw.trim().parse::<i64>().map_err(|_| TransformError::Numeric {
        field,
        value: raw.to_string(),
    })
}

fn row_images(row: &FeedRow) -> Vec<Image> {
    vec![Image {
        file_name: row.image_file_name.clone(),
        cdn_link: row.item_image_url.clone(),
    }]
}

fn build_variant(row: &FeedRow) -> Result<Variant, TransformError> {
    let on_hand = parse_i64("QuantityOnHand", &row.quantity_on_hand)?;
    // Cost and price both come from UnitPrice; the feed carries no separate
    // wholesale figure.
    let unit_price = parse_f64("UnitPrice", &row.unit_price)?;

    Ok(Variant {
        id: row.item_id.clone(),
        available: on_hand > 0,
        description: row.item_description.clone(),
        cost: unit_price,
        price: unit_price,
        sku: row.item_id.clone(),
        packaging: row.pkg.clone(),
        item_code: row.manufacturer_item_code.clone(),
        images: row_images(row),
    })
}

/// Transform one row against current catalog state.
///
/// The manufacturer is resolved (and created when missing) before anything
/// else, so a manufacturer write can land even when the row itself later
/// fails on a bad numeric field. That mirrors the feed's at-least-once,
/// idempotent-by-key contract: the retried row finds the manufacturer.
pub async fn transform_row(
    store: &dyn CatalogStore,
    ids: &dyn IdSource,
    row: &FeedRow,
) -> Result<TransformOutcome, TransformError> {
    let name = if row.manufacturer_name.trim().is_empty() {
        FALLBACK_MANUFACTURER_NAME
    } else {
        row.manufacturer_name.as_str()
    };
    let mut manufacturer_created = false;
    let manufacturer = match store.find_manufacturer(name).await? {
        Some(m) => m,
        None => {
            manufacturer_created = true;
            store.ensure_manufacturer(name).await?
        }
    };

    let variant = build_variant(row)?;

    let product = match store.find_product(&row.product_id).await? {
        Some(mut existing) => {
            merge_variant(&mut existing.variants, variant);
            existing
        }
        None => Product {
            product_id: row.product_id.clone(),
            name: row.product_name.clone(),
            description: row.product_description.clone(),
            short_description: row.item_description.clone(),
            vendor_id: ids.generate(),
            manufacturer_id: manufacturer.id,
            variants: vec![variant],
            storefront_price_visibility: STOREFRONT_VISIBLE.to_string(),
            availability: row.availability.clone(),
            images: row_images(row),
            category: Category {
                primary_category_id: row.primary_category_id.clone(),
                primary_category_name: row.primary_category_name.clone(),
                secondary_category_id: row.secondary_category_id.clone(),
                secondary_category_name: row.secondary_category_name.clone(),
            },
            created_at: None,
            updated_at: None,
        },
    };

    Ok(TransformOutcome {
        product,
        manufacturer_created,
    })
}
