//! Access to decoded page geometry.
//!
//! Layout analysis never decodes PDF itself; it reads page geometry through
//! [`GeometrySource`]. [`DocumentGeometry`] is the in-memory source and
//! [`JsonGeometrySource`] loads one from a JSON dump of a decoded document.

use crate::error::{Error, Result};
use crate::model::{DocumentGeometry, PageGeometry, Rect, TocEntry};
use std::fs;
use std::path::{Path, PathBuf};

/// A supplier of decoded page geometry.
pub trait GeometrySource: Send + Sync {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Geometry of page `index`.
    fn page(&self, index: usize) -> Result<PageGeometry>;

    /// Table of contents.
    fn toc(&self) -> Result<Vec<TocEntry>>;

    /// Render a region of page `index` as PNG bytes at `dpi`.
    ///
    /// Returns `Ok(None)` when the source cannot rasterize.
    fn rasterize(&self, index: usize, dpi: u32, clip: Rect) -> Result<Option<Vec<u8>>>;
}

impl DocumentGeometry {
    /// Load a decoded document from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Source(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    /// Parse a decoded document from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl GeometrySource for DocumentGeometry {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<PageGeometry> {
        self.pages
            .get(index)
            .cloned()
            .ok_or(Error::PageIndexOutOfRange(index, self.pages.len()))
    }

    fn toc(&self) -> Result<Vec<TocEntry>> {
        Ok(self.toc.clone())
    }

    fn rasterize(&self, _index: usize, _dpi: u32, _clip: Rect) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
}

/// A decoded document read from a JSON file.
#[derive(Debug, Clone)]
pub struct JsonGeometrySource {
    path: PathBuf,
    document: DocumentGeometry,
}

impl JsonGeometrySource {
    /// Load the geometry file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = DocumentGeometry::from_json_file(path)?;
        log::debug!("Loaded {} pages from {}", document.pages.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    /// Path the geometry was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The decoded document.
    pub fn document(&self) -> &DocumentGeometry {
        &self.document
    }
}

impl GeometrySource for JsonGeometrySource {
    fn page_count(&self) -> usize {
        self.document.page_count()
    }

    fn page(&self, index: usize) -> Result<PageGeometry> {
        self.document.page(index)
    }

    fn toc(&self) -> Result<Vec<TocEntry>> {
        self.document.toc()
    }

    fn rasterize(&self, index: usize, dpi: u32, clip: Rect) -> Result<Option<Vec<u8>>> {
        self.document.rasterize(index, dpi, clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_geometry_source() {
        let json = r#"{
            "pages": [
                {"width": 612, "height": 792, "blocks": [
                    {"number": 0, "type": "text", "bbox": [72, 72, 540, 90], "lines": []}
                ]},
                {"width": 612, "height": 792}
            ],
            "toc": [{"level": 1, "title": "Intro", "page": 1}]
        }"#;
        let doc = DocumentGeometry::from_json_str(json).unwrap();

        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page(0).unwrap().blocks.len(), 1);
        assert!(doc.page(1).unwrap().blocks.is_empty());
        assert!(matches!(doc.page(2), Err(Error::PageIndexOutOfRange(2, 2))));
        assert_eq!(doc.toc().unwrap()[0].title, "Intro");
        assert!(doc
            .rasterize(0, 288, Rect::new(0.0, 0.0, 10.0, 10.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_missing_file() {
        let err = JsonGeometrySource::open("/nonexistent/doc.json").unwrap_err();
        assert!(matches!(err, Error::Source(_)));
    }

    #[test]
    fn test_json_source_open() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("paper.json");
        fs::write(&path, r#"{"pages": [{}, {}, {}]}"#).unwrap();

        let source = JsonGeometrySource::open(&path).unwrap();
        assert_eq!(source.page_count(), 3);
        assert_eq!(source.path(), path.as_path());
        assert!(source.toc().unwrap().is_empty());
    }
}
