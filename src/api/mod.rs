//! Trestle OData API client

pub mod client;
pub mod listings;
mod property;
pub mod query;

use std::path::Path;

use anyhow::Result;

/// Listings resource below the OData root
pub const PROPERTY_RESOURCE: &str = "Property";

/// Page through active listings and write them out as NDJSON
pub async fn fetch(max_pages: Option<usize>, output: Option<&Path>) -> Result<()> {
    listings::export_listings(max_pages, output).await
}

/// Count listings matching the configured query
pub async fn count() -> Result<()> {
    property::show_count().await
}

/// Show one listing by key
pub async fn get(listing_key: &str) -> Result<()> {
    property::show_property(listing_key).await
}
