///! Orbital element sets
///!
///! Parsing of two/three-line element sets and their retrieval from a
///! network catalog with a static-file fallback.

mod types;
pub use types::OrbitalElements;

mod fetcher;
pub use fetcher::{ElementsSource, StaticElementsSource, TleFetcher};
