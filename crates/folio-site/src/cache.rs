//! In-memory document cache.
//!
//! Maps lower-cased logical paths to [`Document`]s and holds the core pages and
//! blobs. The cache is a plain value: the coordinator clones it, applies a
//! refresh to the clone, and publishes the result. Documents sit behind `Arc`
//! so clones share them.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use folio_ingest::paths::{normalize_key, relative_slash, strip_html_suffix};
use folio_ingest::{CoreBundle, CoreDoc, Ingested, Layout, Limits};
use folio_storage::{FileEntry, Storage, StorageError};

use crate::document::Document;

/// Module id of the global script blob, which is served inline, not as a module.
const CORE_MODULE: &str = "_g/core";

/// Cached documents, known script modules and core content.
#[derive(Clone, Debug, Default)]
pub struct DocumentCache {
    docs: HashMap<String, Arc<Document>>,
    known_modules: BTreeSet<String>,
    not_found: Arc<Document>,
    footer: Arc<Document>,
    root_page: Arc<Document>,
    terms_of_use: Arc<Document>,
    core_js: String,
    core_css: String,
    bootstrapped: bool,
}

/// Read a file, mapping absence to `None`.
fn read_optional(storage: &dyn Storage, path: &Path) -> Result<Option<String>, StorageError> {
    match storage.read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// List a canonical folder, mapping absence to an empty listing.
fn list_optional(storage: &dyn Storage, dir: &Path) -> Result<Vec<FileEntry>, StorageError> {
    match storage.list_files(dir) {
        Ok(files) => Ok(files),
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Parse a `.deps` sidecar, ignoring blank lines.
fn parse_deps(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

impl DocumentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True until [`bootstrap`](Self::bootstrap) has loaded canonical storage.
    #[must_use]
    pub fn needs_bootstrap(&self) -> bool {
        !self.bootstrapped
    }

    /// Number of cached documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Load core content, known script modules and documents from canonical storage.
    ///
    /// Missing folders and files are skipped. Files above the size limits are
    /// ignored.
    pub fn bootstrap(
        &mut self,
        storage: &dyn Storage,
        layout: &Layout,
        limits: &Limits,
    ) -> Result<(), StorageError> {
        self.load_core(storage, layout)?;
        self.load_modules(storage, layout, limits)?;
        self.load_documents(storage, layout, limits)?;
        self.bootstrapped = true;

        tracing::info!(
            documents = self.docs.len(),
            modules = self.known_modules.len(),
            "Bootstrapped document cache"
        );
        Ok(())
    }

    fn load_core(&mut self, storage: &dyn Storage, layout: &Layout) -> Result<(), StorageError> {
        if let Some(js) = read_optional(storage, &layout.core_js_file())? {
            self.core_js = js;
        }
        if let Some(css) = read_optional(storage, &layout.core_css_file())? {
            self.core_css = css;
        }

        for kind in CoreDoc::ALL {
            let files = layout.core_document_files(kind);
            let Some(content) = read_optional(storage, &files.html)? else {
                continue;
            };
            let deps = read_optional(storage, &files.deps)?
                .map(|d| parse_deps(&d))
                .unwrap_or_default();
            let doc = Document::new(
                content,
                deps,
                storage.exists(&files.css),
                kind.logical_path(),
                DateTime::<Utc>::UNIX_EPOCH,
            );
            *self.core_slot(kind) = Arc::new(doc);
        }
        Ok(())
    }

    fn load_modules(
        &mut self,
        storage: &dyn Storage,
        layout: &Layout,
        limits: &Limits,
    ) -> Result<(), StorageError> {
        let dir = layout.scripts_dir();
        for entry in list_optional(storage, &dir)? {
            if entry.len > limits.max_script_bytes {
                continue;
            }
            let Some(rel) = relative_slash(&entry.path, &dir) else {
                continue;
            };
            if let Some(id) = rel.strip_suffix(".js")
                && id != CORE_MODULE
            {
                self.known_modules.insert(id.to_owned());
            }
        }
        Ok(())
    }

    fn load_documents(
        &mut self,
        storage: &dyn Storage,
        layout: &Layout,
        limits: &Limits,
    ) -> Result<(), StorageError> {
        let dir = layout.docs_dir();
        for entry in list_optional(storage, &dir)? {
            if entry.len > limits.max_document_bytes {
                tracing::debug!(path = %entry.path.display(), "Skipping oversized cached document");
                continue;
            }
            let Some(rel) = relative_slash(&entry.path, &dir) else {
                continue;
            };
            let Some(address) = rel.strip_suffix(".html") else {
                continue;
            };

            let files = layout.document_files(address);
            let content = match storage.read_to_string(&entry.path) {
                Ok(content) => content,
                Err(e) if e.is_invalid_data() => {
                    tracing::warn!(
                        path = %entry.path.display(),
                        error = %e,
                        "Skipping cached document that is not valid UTF-8"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };
            let deps = read_optional(storage, &files.deps)?
                .map(|d| parse_deps(&d))
                .unwrap_or_default();
            let doc = Document::new(
                content,
                deps,
                storage.exists(&files.css),
                address.to_owned(),
                DateTime::<Utc>::from(entry.modified),
            );
            match self.docs.entry(normalize_key(address)) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(doc));
                }
                Entry::Occupied(mut slot) => {
                    let kept = slot.get();
                    tracing::warn!(
                        path = %address,
                        other = %kept.original_path,
                        "Canonical documents differ only in case"
                    );
                    if doc.modified_at > kept.modified_at {
                        slot.insert(Arc::new(doc));
                    }
                }
            }
        }
        Ok(())
    }

    fn core_slot(&mut self, kind: CoreDoc) -> &mut Arc<Document> {
        match kind {
            CoreDoc::NotFound => &mut self.not_found,
            CoreDoc::Footer => &mut self.footer,
            CoreDoc::RootPage => &mut self.root_page,
            CoreDoc::TermsOfUse => &mut self.terms_of_use,
        }
    }

    /// Apply the records and core bundle of an ingestion pass.
    ///
    /// Create/update records insert or replace their entry, deletions remove it
    /// if present. Core blobs and documents only overwrite when the bundle
    /// actually carries new content.
    pub fn apply_ingested(&mut self, records: &[Ingested], core: &CoreBundle) {
        for record in records {
            let key = normalize_key(record.full_path());
            match Document::from_record(record, None) {
                Some(doc) => {
                    self.docs.insert(key, Arc::new(doc));
                }
                None => {
                    if self.docs.remove(&key).is_some() {
                        tracing::debug!(key = %key, "Removed document");
                    }
                }
            }
        }

        if !core.js.is_empty() {
            self.core_js.clone_from(&core.js);
        }
        if !core.css.is_empty() {
            self.core_css.clone_from(&core.css);
        }
        for kind in CoreDoc::ALL {
            let doc = core
                .document(kind)
                .and_then(|r| Document::from_record(r, Some(kind.logical_path())));
            if let Some(doc) = doc {
                *self.core_slot(kind) = Arc::new(doc);
            }
        }
    }

    /// Record script module ids as available.
    pub fn insert_modules<I: IntoIterator<Item = String>>(&mut self, modules: I) {
        self.known_modules.extend(modules);
    }

    /// Case-insensitive lookup; spaces and a trailing `.html` are ignored.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<Arc<Document>> {
        self.docs
            .get(&normalize_key(strip_html_suffix(path)))
            .map(Arc::clone)
    }

    /// `(original path, modification time)` for every cached document.
    ///
    /// Sorted by path, so tree building sees a stable input order.
    #[must_use]
    pub fn to_navigation_source(&self) -> Vec<(String, DateTime<Utc>)> {
        let mut pages: Vec<_> = self
            .docs
            .values()
            .map(|d| (d.original_path.clone(), d.modified_at))
            .collect();
        pages.sort();
        pages
    }

    /// Public URL of a known script module.
    #[must_use]
    pub fn module_url(&self, module_id: &str, layout: &Layout) -> Option<String> {
        self.known_modules
            .contains(module_id)
            .then(|| format!("{}{module_id}.js", layout.scripts_url_prefix()))
    }

    /// Documents not yet recorded by a durable store.
    pub fn unpersisted(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.docs.values().filter(|d| !d.is_persisted)
    }

    #[must_use]
    pub fn known_modules(&self) -> &BTreeSet<String> {
        &self.known_modules
    }

    #[must_use]
    pub fn core_document(&self, kind: CoreDoc) -> Arc<Document> {
        let doc = match kind {
            CoreDoc::NotFound => &self.not_found,
            CoreDoc::Footer => &self.footer,
            CoreDoc::RootPage => &self.root_page,
            CoreDoc::TermsOfUse => &self.terms_of_use,
        };
        Arc::clone(doc)
    }

    #[must_use]
    pub fn core_js(&self) -> &str {
        &self.core_js
    }

    #[must_use]
    pub fn core_css(&self) -> &str {
        &self.core_css
    }
}
