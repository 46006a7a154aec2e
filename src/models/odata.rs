//! OData collection envelope

use serde::Deserialize;

/// A listing record, forwarded exactly as the API returned it.
pub type Listing = serde_json::Value;

/// One page of an OData collection response
#[derive(Debug, Default, Deserialize)]
pub struct ODataPage {
    #[serde(default)]
    pub value: Option<Vec<Listing>>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
    #[serde(rename = "@odata.count")]
    pub count: Option<u64>,
}

impl ODataPage {
    /// Split into the page's records and the cursor for the next page.
    /// A missing or null `value` reads as an empty page; an empty link as no link.
    pub fn into_parts(self) -> (Vec<Listing>, Option<String>) {
        let next = self.next_link.filter(|link| !link.trim().is_empty());
        (self.value.unwrap_or_default(), next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_with_next_link() {
        let page: ODataPage = serde_json::from_str(
            r#"{
                "@odata.context": "https://api/odata/$metadata#Property",
                "value": [{"ListingKey": "1"}, {"ListingKey": "2"}],
                "@odata.nextLink": "https://api/odata/Property?$skiptoken=abc"
            }"#,
        )
        .unwrap();
        let (listings, next) = page.into_parts();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[1]["ListingKey"], "2");
        assert_eq!(next.as_deref(), Some("https://api/odata/Property?$skiptoken=abc"));
    }

    #[test]
    fn test_missing_or_null_value_is_empty() {
        let page: ODataPage = serde_json::from_str(r#"{"@odata.count": 0}"#).unwrap();
        assert_eq!(page.count, Some(0));
        assert!(page.into_parts().0.is_empty());

        let page: ODataPage = serde_json::from_str(r#"{"value": null}"#).unwrap();
        assert!(page.into_parts().0.is_empty());
    }

    #[test]
    fn test_blank_next_link_ends_paging() {
        let page: ODataPage =
            serde_json::from_str(r#"{"value": [], "@odata.nextLink": ""}"#).unwrap();
        assert!(page.into_parts().1.is_none());
    }

    #[test]
    fn test_non_array_value_is_rejected() {
        assert!(serde_json::from_str::<ODataPage>(r#"{"value": "oops"}"#).is_err());
    }
}
