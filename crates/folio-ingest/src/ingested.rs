//! Results of an ingestion pass.

use chrono::{DateTime, Utc};

use crate::layout::CoreDoc;

/// Classification of one staged HTML file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ingested {
    /// New or changed document.
    CreateUpdate {
        /// Staging-relative path without extension, original case.
        full_path: String,
        /// Body with media links rewritten.
        content: String,
        /// Head style block, empty if none.
        style_content: String,
        /// Last modification time of the staged file.
        modified_at: DateTime<Utc>,
        /// Required script module ids, in tag order.
        script_deps: Vec<String>,
    },
    /// Document whose staged body is empty or malformed.
    Delete {
        /// Staging-relative path without extension, original case.
        full_path: String,
    },
}

impl Ingested {
    /// Logical path the record applies to.
    #[must_use]
    pub fn full_path(&self) -> &str {
        match self {
            Self::CreateUpdate { full_path, .. } | Self::Delete { full_path } => full_path,
        }
    }
}

/// Core files picked up from the core staging folder.
///
/// Empty blobs and `None` documents mean "not staged this time" and must never
/// overwrite previously loaded values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoreBundle {
    /// Global script blob.
    pub js: String,
    /// Global stylesheet blob.
    pub css: String,
    pub not_found: Option<Ingested>,
    pub footer: Option<Ingested>,
    pub root_page: Option<Ingested>,
    pub terms_of_use: Option<Ingested>,
}

impl CoreBundle {
    /// Staged record for a core document, if any.
    #[must_use]
    pub fn document(&self, doc: CoreDoc) -> Option<&Ingested> {
        match doc {
            CoreDoc::NotFound => self.not_found.as_ref(),
            CoreDoc::Footer => self.footer.as_ref(),
            CoreDoc::RootPage => self.root_page.as_ref(),
            CoreDoc::TermsOfUse => self.terms_of_use.as_ref(),
        }
    }

    pub(crate) fn set_document(&mut self, doc: CoreDoc, record: Ingested) {
        let slot = match doc {
            CoreDoc::NotFound => &mut self.not_found,
            CoreDoc::Footer => &mut self.footer,
            CoreDoc::RootPage => &mut self.root_page,
            CoreDoc::TermsOfUse => &mut self.terms_of_use,
        };
        *slot = Some(record);
    }

    /// True if nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.js.is_empty()
            && self.css.is_empty()
            && CoreDoc::ALL.iter().all(|d| self.document(*d).is_none())
    }
}

/// Everything one ingestion pass produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ingestion {
    /// Ordinary document records, in staging order.
    pub records: Vec<Ingested>,
    /// Core blobs and documents.
    pub core: CoreBundle,
    /// Script module ids written to canonical storage.
    pub modules: Vec<String>,
    /// Number of media files migrated.
    pub media_files: usize,
}

impl Ingestion {
    /// True if the pass found nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.core.is_empty() && self.modules.is_empty()
    }
}
