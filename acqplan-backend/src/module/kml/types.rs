use acqplan_common::Geometry;

/// A placemark as read from a plan document, before time parsing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KmlPlacemark {
    pub name: String,
    pub begin: Option<String>,
    pub end: Option<String>,
    /// Style id without the leading '#'
    pub style_url: Option<String>,
    /// ExtendedData entries, in document order
    pub data: Vec<(String, String)>,
    pub geometry: Option<Geometry>,
}

/// A folder of a plan document. The document element itself is the root
/// folder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KmlFolder {
    pub name: String,
    pub folders: Vec<KmlFolder>,
    pub placemarks: Vec<KmlPlacemark>,
}

impl KmlFolder {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Placemarks of this folder and all nested folders, depth first
    pub fn all_placemarks(&self) -> Vec<&KmlPlacemark> {
        let mut result: Vec<&KmlPlacemark> = self.placemarks.iter().collect();
        for folder in &self.folders {
            result.extend(folder.all_placemarks());
        }
        result
    }

    pub fn folder(&self, name: &str) -> Option<&KmlFolder> {
        self.folders.iter().find(|f| f.name == name)
    }
}
