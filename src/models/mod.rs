//! Data models for Trestle OData responses

mod odata;

pub use odata::*;
