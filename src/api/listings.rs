//! Cursor-following pager over the `Property` collection
//!
//! The first request carries the filter/expand/top parameters. Every later
//! request goes to the server-issued `@odata.nextLink` verbatim. Paging stops
//! when the link is absent, the page ceiling is hit, or any request fails.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use futures::stream::{self, LocalBoxStream, StreamExt};

use super::client::TrestleClient;
use super::query::{ListingQuery, QueryParams};
use super::PROPERTY_RESOURCE;
use crate::error::FetchError;
use crate::models::{Listing, ODataPage};

/// Why a pager stopped producing pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server stopped sending `@odata.nextLink`.
    Completed,
    /// `max_pages` requests were made and the server still had more.
    PageLimit,
    /// A token, transport, status or decode error ended paging early.
    Failed,
}

/// Pull-based sequence of non-empty listing pages. Not restartable.
pub struct ActiveListings<'a> {
    client: &'a mut TrestleClient,
    next_url: Option<String>,
    params: Option<QueryParams>,
    max_pages: usize,
    pages_requested: usize,
    pages_yielded: usize,
    records_yielded: usize,
    outcome: Option<FetchOutcome>,
}

impl TrestleClient {
    /// Page through active listings using the configured query.
    pub fn fetch_active_listings(&mut self) -> ActiveListings<'_> {
        let query = ListingQuery::from(&self.config().listings);
        self.fetch_listings(query)
    }

    pub fn fetch_listings(&mut self, query: ListingQuery) -> ActiveListings<'_> {
        ActiveListings::new(self, &query)
    }
}

impl<'a> ActiveListings<'a> {
    pub fn new(client: &'a mut TrestleClient, query: &ListingQuery) -> Self {
        let start = client.resource_url(PROPERTY_RESOURCE);
        Self {
            client,
            next_url: Some(start),
            params: Some(query.initial_params()),
            max_pages: query.max_pages,
            pages_requested: 0,
            pages_yielded: 0,
            records_yielded: 0,
            outcome: None,
        }
    }

    /// Fetch until the next non-empty page, or `None` once paging is over.
    pub async fn next_page(&mut self) -> Option<Vec<Listing>> {
        if self.outcome.is_some() {
            return None;
        }

        while let Some(url) = self.next_url.take() {
            if self.pages_requested >= self.max_pages {
                tracing::warn!("Page limit ({}) reached, stopping", self.max_pages);
                self.finish(FetchOutcome::PageLimit);
                return None;
            }
            self.pages_requested += 1;

            let params = self.params.take().unwrap_or_default();
            if params.is_empty() {
                tracing::info!("Fetching page {} from {}", self.pages_requested, url);
            } else {
                tracing::info!(
                    "Fetching page {} from {} with parameters {:?}",
                    self.pages_requested,
                    url,
                    params
                );
            }

            let page: ODataPage = match self.client.get_json(&url, &params).await {
                Ok(page) => page,
                Err(e) => {
                    log_fetch_error(&e);
                    self.finish(FetchOutcome::Failed);
                    return None;
                }
            };

            if let Some(total) = page.count {
                tracing::debug!("  Server reports {} matching listings", total);
            }
            let (listings, next_link) = page.into_parts();
            if next_link.is_none() {
                tracing::info!("No @odata.nextLink in response, paging complete");
            }
            self.next_url = next_link;

            if listings.is_empty() {
                tracing::info!("  Empty page received");
                continue;
            }

            tracing::info!("  {} listings on this page", listings.len());
            self.pages_yielded += 1;
            self.records_yielded += listings.len();
            return Some(listings);
        }

        self.finish(FetchOutcome::Completed);
        None
    }

    /// Borrow the pager as a stream of pages in cursor order.
    pub fn pages(&mut self) -> LocalBoxStream<'_, Vec<Listing>> {
        stream::unfold(self, |pager| async move {
            match pager.next_page().await {
                Some(page) => Some((page, pager)),
                None => None,
            }
        })
        .boxed_local()
    }

    pub fn outcome(&self) -> Option<FetchOutcome> {
        self.outcome
    }

    pub fn pages_requested(&self) -> usize {
        self.pages_requested
    }

    pub fn pages_yielded(&self) -> usize {
        self.pages_yielded
    }

    pub fn records_yielded(&self) -> usize {
        self.records_yielded
    }

    fn finish(&mut self, outcome: FetchOutcome) {
        self.next_url = None;
        self.outcome = Some(outcome);
        tracing::info!(
            "Paging finished ({:?}): {} listings over {} pages ({} requests)",
            outcome,
            self.records_yielded,
            self.pages_yielded,
            self.pages_requested
        );
    }
}

/// Stream listings as newline-delimited JSON to `output` (stdout if `None`).
pub async fn export_listings(max_pages: Option<usize>, output: Option<&Path>) -> Result<()> {
    let mut client = TrestleClient::from_env()?;
    write_listings(&mut client, max_pages, output).await?;
    Ok(())
}

/// Page through the listings and write one JSON object per line to `output`
/// (stdout when `None`). Returns the number of listings written, or an error
/// if paging ended on a failure.
async fn write_listings(
    client: &mut TrestleClient,
    max_pages: Option<usize>,
    output: Option<&Path>,
) -> Result<usize> {
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut pager = match max_pages {
        Some(max_pages) => {
            let mut query = ListingQuery::from(&client.config().listings);
            query.max_pages = max_pages;
            client.fetch_listings(query)
        }
        None => client.fetch_active_listings(),
    };
    {
        let mut pages = pager.pages();
        while let Some(page) = pages.next().await {
            for listing in &page {
                serde_json::to_writer(&mut out, listing).context("Failed to write listing")?;
                out.write_all(b"\n").context("Failed to write listing")?;
            }
        }
    }
    out.flush().context("Failed to flush output")?;

    if pager.outcome() == Some(FetchOutcome::Failed) {
        bail!(
            "Fetch aborted after {} listings on {} pages; see log for details",
            pager.records_yielded(),
            pager.pages_yielded()
        );
    }
    tracing::info!(
        "Wrote {} listings ({} requests)",
        pager.records_yielded(),
        pager.pages_requested()
    );
    Ok(pager.records_yielded())
}

fn log_fetch_error(err: &FetchError) {
    match err {
        FetchError::Token(e) => {
            tracing::error!("Token could not be renewed, aborting fetch: {}", e);
        }
        FetchError::Status { status, body, .. } => {
            tracing::error!("Failed to fetch listing page: {}", err);
            tracing::error!("  Last response status: {}", status);
            tracing::debug!("  Last response body: {}", body);
        }
        FetchError::Decode { body, .. } => {
            tracing::error!("Failed to decode listing page: {}", error_chain(err));
            tracing::error!("  Last response body: {}", body);
        }
        FetchError::Transport { .. } | FetchError::Unexpected { .. } => {
            tracing::error!("Failed to fetch listing page: {}", error_chain(err));
        }
    }
}

/// Error and all its sources on one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
