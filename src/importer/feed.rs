//! Supplier feed decoding.
//!
//! The feed is tab-delimited text with a header row. Decoding is streaming
//! and bounded-memory: rows come off the reader one at a time and a malformed
//! row only fails that row, not the sequence.

use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// One supplier feed record. Every field arrives as text; numeric
/// interpretation happens in the transform step so a bad number is
/// attributable to its row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedRow {
    #[serde(rename = "SiteSource", default)]
    pub site_source: String,
    #[serde(rename = "ItemID", default)]
    pub item_id: String,
    #[serde(rename = "ManufacturerID", default)]
    pub manufacturer_id: String,
    #[serde(rename = "ManufacturerCode", default)]
    pub manufacturer_code: String,
    #[serde(rename = "ManufacturerName", default)]
    pub manufacturer_name: String,
    #[serde(rename = "ProductID", default)]
    pub product_id: String,
    #[serde(rename = "ProductName", default)]
    pub product_name: String,
    #[serde(rename = "ProductDescription", default)]
    pub product_description: String,
    #[serde(rename = "ManufacturerItemCode", default)]
    pub manufacturer_item_code: String,
    #[serde(rename = "ItemDescription", default)]
    pub item_description: String,
    #[serde(rename = "ImageFileName", default)]
    pub image_file_name: String,
    #[serde(rename = "ItemImageURL", default)]
    pub item_image_url: String,
    #[serde(rename = "NDCItemCode", default)]
    pub ndc_item_code: String,
    #[serde(rename = "PKG", default)]
    pub pkg: String,
    #[serde(rename = "UnitPrice", default)]
    pub unit_price: String,
    #[serde(rename = "QuantityOnHand", default)]
    pub quantity_on_hand: String,
    #[serde(rename = "PriceDescription", default)]
    pub price_description: String,
    #[serde(rename = "Availability", default)]
    pub availability: String,
    #[serde(rename = "PrimaryCategoryID", default)]
    pub primary_category_id: String,
    #[serde(rename = "PrimaryCategoryName", default)]
    pub primary_category_name: String,
    #[serde(rename = "SecondaryCategoryID", default)]
    pub secondary_category_id: String,
    #[serde(rename = "SecondaryCategoryName", default)]
    pub secondary_category_name: String,
    #[serde(rename = "CategoryID", default)]
    pub category_id: String,
    #[serde(rename = "CategoryName", default)]
    pub category_name: String,
    #[serde(rename = "IsRX", default)]
    pub is_rx: String,
    #[serde(rename = "IsTBD", default)]
    pub is_tbd: String,
}

/// Build a tab-delimited reader over any byte stream.
pub fn feed_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::None)
        .from_reader(input)
}

/// Open the feed file for a run with a 64KB read buffer.
pub fn open_feed(path: &Path) -> io::Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(feed_reader(BufReader::with_capacity(64 * 1024, file)))
}
