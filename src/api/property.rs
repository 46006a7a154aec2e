//! Single-listing lookup and collection counts

use anyhow::{Context, Result};

use super::client::TrestleClient;
use super::query::{listing_key_filter, ListingQuery};
use super::PROPERTY_RESOURCE;
use crate::error::FetchError;
use crate::models::{Listing, ODataPage};

impl TrestleClient {
    /// Look up one listing by its `ListingKey`.
    pub async fn get_property(&mut self, listing_key: &str) -> Result<Option<Listing>, FetchError> {
        let url = self.resource_url(PROPERTY_RESOURCE);
        let mut params = vec![("$filter", listing_key_filter(listing_key))];
        if let Some(expand) = self.config().listings.expand.clone() {
            params.push(("$expand", expand));
        }
        params.push(("$top", "1".to_string()));

        let page: ODataPage = self.get_json(&url, &params).await?;
        Ok(page.into_parts().0.into_iter().next())
    }

    /// Number of listings matching `query`, from `Property/$count`.
    pub async fn count_properties(&mut self, query: &ListingQuery) -> Result<u64, FetchError> {
        let url = self.resource_url(&format!("{}/$count", PROPERTY_RESOURCE));
        let body = self.get_text(&url, &query.count_params()).await?;
        body.trim()
            .trim_start_matches('\u{feff}')
            .parse::<u64>()
            .map_err(|e| FetchError::Unexpected {
                url,
                reason: format!("expected an integer count, got {:?} ({})", body, e),
            })
    }
}

/// Print one listing as pretty JSON.
pub async fn show_property(listing_key: &str) -> Result<()> {
    let mut client = TrestleClient::from_env()?;
    let listing = client
        .get_property(listing_key)
        .await
        .with_context(|| format!("Failed to fetch listing {}", listing_key))?;

    match listing {
        Some(listing) => {
            let pretty =
                serde_json::to_string_pretty(&listing).context("Failed to format listing")?;
            println!("{}", pretty);
        }
        None => {
            println!("No listing with key {}", listing_key);
        }
    }
    Ok(())
}

/// Print how many listings the configured query matches.
pub async fn show_count() -> Result<()> {
    let mut client = TrestleClient::from_env()?;
    let query = ListingQuery::from(&client.config().listings);
    let count = client
        .count_properties(&query)
        .await
        .context("Failed to count listings")?;

    println!("{}", count);
    Ok(())
}
