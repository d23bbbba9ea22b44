//! Test doubles shared by the importer test modules.

use crate::catalog::model::{merge_variant, Manufacturer, Product, ProductDetails};
use crate::catalog::store::{CatalogStore, StoreError, StoreResult};
use crate::importer::feed::FeedRow;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

pub const FEED_HEADER: &str = "SiteSource\tItemID\tManufacturerID\tManufacturerCode\tManufacturerName\tProductID\tProductName\tProductDescription\tManufacturerItemCode\tItemDescription\tImageFileName\tItemImageURL\tNDCItemCode\tPKG\tUnitPrice\tQuantityOnHand\tPriceDescription\tAvailability\tPrimaryCategoryID\tPrimaryCategoryName\tSecondaryCategoryID\tSecondaryCategoryName\tCategoryID\tCategoryName\tIsRX\tIsTBD";

/// One feed line in the supplier's tab-delimited format.
pub fn feed_line(
    item_id: &str,
    manufacturer_name: &str,
    product_id: &str,
    unit_price: &str,
    quantity_on_hand: &str,
) -> String {
    format!(
        "site\t{item_id}\tM1\tMC\t{manufacturer_name}\t{product_id}\tProduct {product_id}\tA product.\tMIC-{item_id}\tItem {item_id}\timg.jpg\thttps://cdn.example.com/img.jpg\tNDC\tEA\t{unit_price}\t{quantity_on_hand}\tper unit\tInStock\tC1\tConsumables\tC2\tGloves\tC3\tMisc\tN\tN"
    )
}

/// A decoded row matching [`feed_line`].
pub fn row(
    item_id: &str,
    manufacturer_name: &str,
    product_id: &str,
    unit_price: &str,
    quantity_on_hand: &str,
) -> FeedRow {
    FeedRow {
        site_source: "site".into(),
        item_id: item_id.into(),
        manufacturer_id: "M1".into(),
        manufacturer_code: "MC".into(),
        manufacturer_name: manufacturer_name.into(),
        product_id: product_id.into(),
        product_name: format!("Product {product_id}"),
        product_description: "A product.".into(),
        manufacturer_item_code: format!("MIC-{item_id}"),
        item_description: format!("Item {item_id}"),
        image_file_name: "img.jpg".into(),
        item_image_url: "https://cdn.example.com/img.jpg".into(),
        ndc_item_code: "NDC".into(),
        pkg: "EA".into(),
        unit_price: unit_price.into(),
        quantity_on_hand: quantity_on_hand.into(),
        price_description: "per unit".into(),
        availability: "InStock".into(),
        primary_category_id: "C1".into(),
        primary_category_name: "Consumables".into(),
        secondary_category_id: "C2".into(),
        secondary_category_name: "Gloves".into(),
        category_id: "C3".into(),
        category_name: "Misc".into(),
        is_rx: "N".into(),
        is_tbd: "N".into(),
    }
}

/// In-memory [`CatalogStore`] with the same upsert semantics as the Postgres
/// implementation, plus counters the pipeline tests assert on.
#[derive(Default)]
pub struct MemoryStore {
    manufacturers: Mutex<Vec<Manufacturer>>,
    products: Mutex<Vec<Product>>,
    clock: AtomicU64,
    doc_ids: AtomicU64,
    batch_sizes: Mutex<Vec<usize>>,
    fail_upserts: AtomicBool,
}

impl MemoryStore {
    fn tick(&self) -> DateTime<Utc> {
        let n = self.clock.fetch_add(1, Ordering::Relaxed) as i64;
        Utc.timestamp_opt(1_700_000_000 + n, 0).single().expect("in range")
    }

    /// Make every subsequent `upsert_products` call fail.
    pub fn fail_upserts(&self) {
        self.fail_upserts.store(true, Ordering::Relaxed);
    }

    pub fn manufacturer_count(&self) -> usize {
        self.manufacturers.lock().expect("lock").len()
    }

    pub fn product_count(&self) -> usize {
        self.products.lock().expect("lock").len()
    }

    pub async fn manufacturer_by_name(&self, name: &str) -> Option<Manufacturer> {
        self.find_manufacturer(name).await.expect("memory store")
    }

    pub fn product(&self, product_id: &str) -> Option<Product> {
        self.products
            .lock()
            .expect("lock")
            .iter()
            .find(|p| p.product_id == product_id)
            .cloned()
    }

    /// Batch sizes of every flush seen so far, in order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().expect("lock").clone()
    }

    /// Catalog contents with timestamps stripped, for idempotence checks.
    pub fn snapshot(&self) -> Vec<Product> {
        self.products
            .lock()
            .expect("lock")
            .iter()
            .cloned()
            .map(|mut p| {
                p.created_at = None;
                p.updated_at = None;
                p
            })
            .collect()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn find_manufacturer(&self, name: &str) -> StoreResult<Option<Manufacturer>> {
        Ok(self
            .manufacturers
            .lock()
            .expect("lock")
            .iter()
            .find(|m| m.name == name)
            .cloned())
    }

    async fn ensure_manufacturer(&self, name: &str) -> StoreResult<Manufacturer> {
        let created_at = self.tick();
        let mut manufacturers = self.manufacturers.lock().expect("lock");
        if let Some(existing) = manufacturers.iter().find(|m| m.name == name) {
            return Ok(existing.clone());
        }
        let manufacturer = Manufacturer {
            id: manufacturers.len() as i64 + 1,
            name: name.to_string(),
            created_at: Some(created_at),
        };
        manufacturers.push(manufacturer.clone());
        Ok(manufacturer)
    }

    async fn find_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
        Ok(self.product(product_id))
    }

    async fn upsert_products(&self, batch: &[Product]) -> StoreResult<()> {
        if self.fail_upserts.load(Ordering::Relaxed) {
            return Err(StoreError::Persistence(sqlx::Error::PoolClosed));
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.batch_sizes.lock().expect("lock").push(batch.len());

        for incoming in batch {
            let now = self.tick();
            let mut products = self.products.lock().expect("lock");
            match products
                .iter_mut()
                .find(|p| p.product_id == incoming.product_id)
            {
                Some(existing) => {
                    // Scalars overwritten; creation-time identity preserved.
                    existing.name = incoming.name.clone();
                    existing.description = incoming.description.clone();
                    existing.short_description = incoming.short_description.clone();
                    existing.storefront_price_visibility =
                        incoming.storefront_price_visibility.clone();
                    existing.availability = incoming.availability.clone();
                    existing.images = incoming.images.clone();
                    existing.category = incoming.category.clone();
                    for variant in incoming.variants.iter().cloned() {
                        merge_variant(&mut existing.variants, variant);
                    }
                    existing.updated_at = Some(now);
                }
                None => {
                    let mut created = incoming.clone();
                    created.created_at = Some(now);
                    created.updated_at = Some(now);
                    products.push(created);
                }
            }
        }
        Ok(())
    }

    async fn recent_products(&self, limit: i64) -> StoreResult<Vec<Product>> {
        let mut products = self.products.lock().expect("lock").clone();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        products.truncate(limit.max(0) as usize);
        Ok(products)
    }

    async fn update_product_description(
        &self,
        product_id: &str,
        description: &str,
    ) -> StoreResult<()> {
        let now = self.tick();
        let mut products = self.products.lock().expect("lock");
        if let Some(product) = products.iter_mut().find(|p| p.product_id == product_id) {
            product.description = description.to_string();
            product.updated_at = Some(now);
        }
        Ok(())
    }

    async fn product_details(&self, product_id: &str) -> StoreResult<ProductDetails> {
        let product = self
            .product(product_id)
            .ok_or_else(|| StoreError::NotFound(product_id.to_string()))?;
        let manufacturer = self
            .manufacturers
            .lock()
            .expect("lock")
            .iter()
            .find(|m| m.id == product.manufacturer_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(product_id.to_string()))?;
        let n = self.doc_ids.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(ProductDetails {
            doc_id: format!("doc-{n}"),
            product,
            manufacturer,
        })
    }
}
