///! KML plan documents
///!
///! Reading of downloaded acquisition plans into day fragments and writing
///! of export documents.

// ============ Core Data Structures ============
mod types;
pub use types::{KmlFolder, KmlPlacemark};

// ============ Reading ============
mod reader;
pub use reader::{parse_kml, parse_kml_time};

mod loader;
pub use loader::{load_fragments, placemark_event};

// ============ Writing ============
mod writer;
pub use writer::{KML_NAMESPACE, write_kml};
