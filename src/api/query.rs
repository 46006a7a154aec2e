//! OData query construction for the `Property` resource

use crate::config::{ListingsConfig, MAX_PAGE_SIZE};

/// Query parameters as sent on the wire.
pub type QueryParams = Vec<(&'static str, String)>;

/// What to page through and how far.
#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub statuses: Vec<String>,
    pub exclude_counties: Vec<String>,
    pub expand: Option<String>,
    pub page_size: u32,
    pub max_pages: usize,
}

impl From<&ListingsConfig> for ListingQuery {
    fn from(cfg: &ListingsConfig) -> Self {
        Self {
            statuses: cfg.statuses.clone(),
            exclude_counties: cfg.exclude_counties.clone(),
            expand: cfg.expand.clone(),
            page_size: cfg.page_size,
            max_pages: cfg.max_pages,
        }
    }
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self::from(&ListingsConfig::default())
    }
}

/// Quote a string literal for an OData expression.
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

impl ListingQuery {
    /// `$filter` expression: status match and county exclusions, or empty.
    pub fn filter(&self) -> String {
        let mut clauses = Vec::new();

        match self.statuses.as_slice() {
            [] => {}
            [status] => clauses.push(format!("StandardStatus eq {}", literal(status))),
            many => {
                let any = many
                    .iter()
                    .map(|s| format!("StandardStatus eq {}", literal(s)))
                    .collect::<Vec<_>>()
                    .join(" or ");
                clauses.push(format!("({})", any));
            }
        }

        if !self.exclude_counties.is_empty() {
            let none_of = self
                .exclude_counties
                .iter()
                .map(|c| format!("CountyOrParish ne {}", literal(c)))
                .collect::<Vec<_>>()
                .join(" and ");
            clauses.push(format!("({})", none_of));
        }

        clauses.join(" and ")
    }

    /// Page size actually requested; the API caps `$top` at 1000.
    pub fn top(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Parameters for the first request only. Cursor links carry their own.
    pub fn initial_params(&self) -> QueryParams {
        let mut params = Vec::new();
        let filter = self.filter();
        if !filter.is_empty() {
            params.push(("$filter", filter));
        }
        if let Some(expand) = self.expand.as_deref().filter(|e| !e.is_empty()) {
            params.push(("$expand", expand.to_string()));
        }
        params.push(("$top", self.top().to_string()));
        params
    }

    /// Parameters for `Property/$count`.
    pub fn count_params(&self) -> QueryParams {
        let filter = self.filter();
        if filter.is_empty() {
            Vec::new()
        } else {
            vec![("$filter", filter)]
        }
    }
}

/// `$filter` selecting a single listing.
pub fn listing_key_filter(listing_key: &str) -> String {
    format!("ListingKey eq {}", literal(listing_key))
}
