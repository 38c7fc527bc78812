///! Plan document links
///!
///! Candidate plan documents for document-sourced satellites: parsing of the
///! document names, selection of the links to ingest, and the link page.

// ============ Core Data Structures ============
mod types;
pub use types::SatelliteLink;

// ============ Catalog and Selection ============
mod catalog;
pub use catalog::{
    LinkCatalog, SelectionPredicate, overlaps_recent_days, starts_before, starts_or_ends_after,
};

// ============ Link Page ============
mod page;
pub use page::{base_url_of, extract_links};

// ============ Document Retrieval ============
mod source;
pub use source::{DocumentSource, HttpDocumentSource, StaticDocumentSource};
