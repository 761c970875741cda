//! Document schema names published by the Sanity studio.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level document types the site renders from.
///
/// Object schemas (`richText`, `richImage`, `seo`, `menuItem`, `pressItem`)
/// are only ever embedded inside these and never arrive as webhook subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    Homepage,
    About,
    SiteSettings,
    Collection,
    Project,
    Release,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Homepage,
        DocumentType::About,
        DocumentType::SiteSettings,
        DocumentType::Collection,
        DocumentType::Project,
        DocumentType::Release,
    ];

    /// Parse the `_type` value of a Sanity document.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "homepage" => Some(DocumentType::Homepage),
            "about" => Some(DocumentType::About),
            "siteSettings" => Some(DocumentType::SiteSettings),
            "collection" => Some(DocumentType::Collection),
            "project" => Some(DocumentType::Project),
            "release" => Some(DocumentType::Release),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Homepage => "homepage",
            DocumentType::About => "about",
            DocumentType::SiteSettings => "siteSettings",
            DocumentType::Collection => "collection",
            DocumentType::Project => "project",
            DocumentType::Release => "release",
        }
    }

    /// Singletons have one document and one tag; everything else is a
    /// slugged collection with a `:list` tag.
    pub fn is_singleton(self) -> bool {
        matches!(
            self,
            DocumentType::Homepage | DocumentType::About | DocumentType::SiteSettings
        )
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document types that embed releases by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferencingType {
    Collection,
    Project,
}

impl ReferencingType {
    pub fn document_type(self) -> DocumentType {
        match self {
            ReferencingType::Collection => DocumentType::Collection,
            ReferencingType::Project => DocumentType::Project,
        }
    }
}
