pub mod db;
pub mod model;
pub mod store;

pub use db::Db;
pub use model::{Category, Image, Manufacturer, Product, ProductDetails, Variant};
pub use store::{CatalogStore, PgCatalogStore, StoreError, StoreResult};
