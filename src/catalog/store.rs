//! Catalog persistence boundary.
//!
//! The importer core only ever talks to [`CatalogStore`]; the Postgres
//! implementation lives behind it so pipeline tests can run against an
//! in-memory double.

use crate::catalog::db::Db;
use crate::catalog::model::{
    merge_variant, Category, Image, Manufacturer, Product, ProductDetails, Variant,
};
use crate::ids::IdSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::QueryBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("product {0} not found")]
    NotFound(String),
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operations the import pipeline needs from the catalog. Implementations
/// must make `upsert_products` a single bulk round trip per call.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_manufacturer(&self, name: &str) -> StoreResult<Option<Manufacturer>>;

    /// Atomic find-or-create by exact name. Creation happens at most once per
    /// name even when concurrent runs race on the same feed.
    async fn ensure_manufacturer(&self, name: &str) -> StoreResult<Manufacturer>;

    async fn find_product(&self, product_id: &str) -> StoreResult<Option<Product>>;

    /// Idempotent bulk upsert keyed on `product_id`. Scalar and object fields
    /// are overwritten; `vendor_id`, `manufacturer_id` and `created_at` are
    /// preserved on existing rows; variants merge replace-by-id.
    async fn upsert_products(&self, batch: &[Product]) -> StoreResult<()>;

    /// The `limit` most recently created products, newest first.
    async fn recent_products(&self, limit: i64) -> StoreResult<Vec<Product>>;

    async fn update_product_description(
        &self,
        product_id: &str,
        description: &str,
    ) -> StoreResult<()>;

    /// Product joined with its manufacturer, stamped with a fresh `doc_id`.
    /// Fails with [`StoreError::NotFound`] when either side of the join is
    /// missing.
    async fn product_details(&self, product_id: &str) -> StoreResult<ProductDetails>;
}

// =============================================================================
// Postgres implementation
// =============================================================================

pub struct PgCatalogStore {
    db: Db,
    ids: Arc<dyn IdSource>,
}

impl PgCatalogStore {
    pub fn new(db: Db, ids: Arc<dyn IdSource>) -> Self {
        Self { db, ids }
    }
}

#[derive(sqlx::FromRow)]
struct ManufacturerRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<ManufacturerRow> for Manufacturer {
    fn from(row: ManufacturerRow) -> Self {
        Manufacturer {
            id: row.id,
            name: row.name,
            created_at: Some(row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    product_id: String,
    name: String,
    description: String,
    short_description: String,
    vendor_id: String,
    manufacturer_id: i64,
    variants: Json<Vec<Variant>>,
    storefront_price_visibility: String,
    availability: String,
    images: Json<Vec<Image>>,
    category: Json<Category>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            product_id: row.product_id,
            name: row.name,
            description: row.description,
            short_description: row.short_description,
            vendor_id: row.vendor_id,
            manufacturer_id: row.manufacturer_id,
            variants: row.variants.0,
            storefront_price_visibility: row.storefront_price_visibility,
            availability: row.availability,
            images: row.images.0,
            category: row.category.0,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

const PRODUCT_COLUMNS: &str = "product_id, name, description, short_description, vendor_id, \
     manufacturer_id, variants, storefront_price_visibility, availability, images, category, \
     created_at, updated_at";

/// Collapse duplicate product ids inside one batch so the bulk INSERT touches
/// each key once (Postgres rejects a multi-row upsert affecting the same row
/// twice). Later rows win on scalar fields; variants merge replace-by-id;
/// creation-time fields (`vendor_id`, `manufacturer_id`) stay from the first
/// sighting, matching their set-once semantics.
fn coalesce_batch(batch: &[Product]) -> Vec<Product> {
    let mut order: Vec<String> = Vec::with_capacity(batch.len());
    let mut merged: HashMap<String, Product> = HashMap::with_capacity(batch.len());

    for product in batch {
        match merged.get_mut(&product.product_id) {
            Some(existing) => {
                let mut update = product.clone();
                update.vendor_id = existing.vendor_id.clone();
                update.manufacturer_id = existing.manufacturer_id;
                let mut variants = std::mem::take(&mut existing.variants);
                for variant in update.variants.drain(..) {
                    merge_variant(&mut variants, variant);
                }
                update.variants = variants;
                *existing = update;
            }
            None => {
                order.push(product.product_id.clone());
                merged.insert(product.product_id.clone(), product.clone());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect()
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn find_manufacturer(&self, name: &str) -> StoreResult<Option<Manufacturer>> {
        let row = sqlx::query_as::<_, ManufacturerRow>(
            "SELECT id, name, created_at FROM manufacturers WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(row.map(Manufacturer::from))
    }

    async fn ensure_manufacturer(&self, name: &str) -> StoreResult<Manufacturer> {
        // DO UPDATE instead of DO NOTHING so RETURNING always yields the row.
        let row = sqlx::query_as::<_, ManufacturerRow>(
            "INSERT INTO manufacturers (name) VALUES ($1)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.db.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db.pool)
        .await?;
        Ok(row.map(Product::from))
    }

    #[instrument(skip_all, fields(batch = batch.len()))]
    async fn upsert_products(&self, batch: &[Product]) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let rows = coalesce_batch(batch);
        debug!(rows = rows.len(), "bulk upserting products");

        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(
            "INSERT INTO products (product_id, name, description, short_description, vendor_id, \
             manufacturer_id, variants, storefront_price_visibility, availability, images, \
             category) ",
        );
        qb.push_values(rows.iter(), |mut b, p| {
            b.push_bind(&p.product_id)
                .push_bind(&p.name)
                .push_bind(&p.description)
                .push_bind(&p.short_description)
                .push_bind(&p.vendor_id)
                .push_bind(p.manufacturer_id)
                .push_bind(Json(&p.variants))
                .push_bind(&p.storefront_price_visibility)
                .push_bind(&p.availability)
                .push_bind(Json(&p.images))
                .push_bind(Json(&p.category));
        });
        // Variant merge mirrors `merge_variant`: matched ids replaced in
        // place keeping their position, unmatched incoming variants appended
        // in feed order, untouched existing variants kept.
        qb.push(
            " ON CONFLICT (product_id) DO UPDATE SET \
               name = EXCLUDED.name, \
               description = EXCLUDED.description, \
               short_description = EXCLUDED.short_description, \
               storefront_price_visibility = EXCLUDED.storefront_price_visibility, \
               availability = EXCLUDED.availability, \
               images = EXCLUDED.images, \
               category = EXCLUDED.category, \
               variants = (\
                   SELECT COALESCE(jsonb_agg(COALESCE(new_v.v, old_v.v) ORDER BY old_v.ord), '[]'::jsonb) \
                   FROM jsonb_array_elements(products.variants) WITH ORDINALITY AS old_v(v, ord) \
                   LEFT JOIN jsonb_array_elements(EXCLUDED.variants) AS new_v(v) \
                     ON new_v.v->>'id' = old_v.v->>'id'\
               ) || (\
                   SELECT COALESCE(jsonb_agg(new_v.v ORDER BY new_v.ord), '[]'::jsonb) \
                   FROM jsonb_array_elements(EXCLUDED.variants) WITH ORDINALITY AS new_v(v, ord) \
                   WHERE NOT EXISTS (\
                       SELECT 1 FROM jsonb_array_elements(products.variants) AS old_v(v) \
                       WHERE old_v.v->>'id' = new_v.v->>'id'\
                   )\
               ), \
               updated_at = now()",
        );
        qb.build().execute(&self.db.pool).await?;
        Ok(())
    }

    async fn recent_products(&self, limit: i64) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn update_product_description(
        &self,
        product_id: &str,
        description: &str,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE products SET description = $2, updated_at = now() WHERE product_id = $1")
            .bind(product_id)
            .bind(description)
            .execute(&self.db.pool)
            .await?;
        Ok(())
    }

    async fn product_details(&self, product_id: &str) -> StoreResult<ProductDetails> {
        #[derive(sqlx::FromRow)]
        struct DetailsRow {
            #[sqlx(flatten)]
            product: ProductRow,
            m_id: i64,
            m_name: String,
            m_created_at: DateTime<Utc>,
        }

        // Inner join on purpose: a dangling manufacturer reference must read
        // as NotFound, not a half-populated document.
        let row = sqlx::query_as::<_, DetailsRow>(
            "SELECT p.product_id, p.name, p.description, p.short_description, p.vendor_id, \
                    p.manufacturer_id, p.variants, p.storefront_price_visibility, \
                    p.availability, p.images, p.category, p.created_at, p.updated_at, \
                    m.id AS m_id, m.name AS m_name, m.created_at AS m_created_at \
             FROM products p \
             JOIN manufacturers m ON m.id = p.manufacturer_id \
             WHERE p.product_id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(product_id.to_string()))?;

        Ok(ProductDetails {
            doc_id: self.ids.generate(),
            product: row.product.into(),
            manufacturer: Manufacturer {
                id: row.m_id,
                name: row.m_name,
                created_at: Some(row.m_created_at),
            },
        })
    }
}
