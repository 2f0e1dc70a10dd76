//! Rendered content unit.

use chrono::{DateTime, Utc};
use folio_ingest::paths::strip_spaces;
use folio_ingest::{Ingested, Layout};
use serde::Serialize;

/// A rendered document held by the [`DocumentCache`](crate::DocumentCache).
///
/// Immutable once built: updates replace the cache entry with a new value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Body HTML with media links rewritten.
    pub content: String,
    /// Required script module ids, in tag order.
    pub script_deps: Vec<String>,
    /// Whether a stylesheet was extracted for this document.
    pub has_style: bool,
    /// Case-preserving logical path with spaces removed.
    pub original_path: String,
    pub modified_at: DateTime<Utc>,
    /// Identifier assigned by a durable store, [`Document::UNPERSISTED_ID`] until then.
    pub persisted_id: i64,
    pub is_persisted: bool,
}

impl Document {
    /// `persisted_id` of a document no durable store has seen yet.
    pub const UNPERSISTED_ID: i64 = -1;

    #[must_use]
    pub fn new(
        content: String,
        script_deps: Vec<String>,
        has_style: bool,
        original_path: String,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            content,
            script_deps,
            has_style,
            original_path,
            modified_at,
            persisted_id: Self::UNPERSISTED_ID,
            is_persisted: false,
        }
    }

    /// Build a document from a create/update record. Deletions yield `None`.
    ///
    /// `original_path` overrides the record's own path when given.
    #[must_use]
    pub fn from_record(record: &Ingested, original_path: Option<String>) -> Option<Self> {
        match record {
            Ingested::CreateUpdate {
                full_path,
                content,
                style_content,
                modified_at,
                script_deps,
            } => Some(Self::new(
                content.clone(),
                script_deps.clone(),
                !style_content.is_empty(),
                original_path.unwrap_or_else(|| strip_spaces(full_path)),
                *modified_at,
            )),
            Ingested::Delete { .. } => None,
        }
    }

    /// Public URL of the document's stylesheet, if it has one.
    #[must_use]
    pub fn stylesheet_url(&self, layout: &Layout) -> Option<String> {
        self.has_style
            .then(|| format!("{}{}.css", layout.media_url_prefix(), self.original_path))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(
            String::new(),
            Vec::new(),
            false,
            String::new(),
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unpersisted_and_empty() {
        let doc = Document::default();

        assert!(doc.content.is_empty());
        assert_eq!(doc.persisted_id, Document::UNPERSISTED_ID);
        assert!(!doc.is_persisted);
    }

    #[test]
    fn test_from_record_strips_spaces_and_keeps_case() {
        let record = Ingested::CreateUpdate {
            full_path: "Topic/My Page".to_owned(),
            content: "<p>x</p>".to_owned(),
            style_content: "p {}".to_owned(),
            modified_at: DateTime::UNIX_EPOCH,
            script_deps: vec!["_g/lib".to_owned()],
        };

        let doc = Document::from_record(&record, None).unwrap();

        assert_eq!(doc.original_path, "Topic/MyPage");
        assert!(doc.has_style);
        assert_eq!(doc.script_deps, vec!["_g/lib".to_owned()]);
    }

    #[test]
    fn test_from_record_delete_is_none() {
        let record = Ingested::Delete {
            full_path: "a".to_owned(),
        };

        assert!(Document::from_record(&record, None).is_none());
    }

    #[test]
    fn test_stylesheet_url() {
        let layout = Layout::new("/c", "blog");
        let mut doc = Document::new(
            String::new(),
            Vec::new(),
            true,
            "Topic/Page".to_owned(),
            DateTime::UNIX_EPOCH,
        );

        assert_eq!(
            doc.stylesheet_url(&layout).as_deref(),
            Some("/blog/_m/Topic/Page.css")
        );
        doc.has_style = false;
        assert_eq!(doc.stylesheet_url(&layout), None);
    }

    #[test]
    fn test_serializes_camel_case() {
        let doc = Document::default();

        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["persistedId"], -1);
        assert_eq!(json["hasStyle"], false);
    }
}
