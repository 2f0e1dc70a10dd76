//! Staging-folder ingestion.
//!
//! [`Ingester::ingest`] runs in two phases. Classification reads every staged
//! file (core folder first, then the main folder) and builds one
//! [`MigrationPlan`] per folder without touching canonical storage. Only when
//! both folders are fully classified are the plans committed, core first.
//! A read failure therefore leaves the disk exactly as it was. Staged files
//! that are not valid UTF-8 are left in staging and skipped.
//!
//! Canonical document names keep the author's case, but lookups ignore it. A
//! staged document therefore replaces every canonical variant of its key, so
//! `topic/page.html` supersedes an earlier `Topic/Page.html`.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use folio_storage::{FileEntry, Storage, StorageError};

use crate::error::IngestError;
use crate::ingested::{CoreBundle, Ingested, Ingestion};
use crate::layout::{
    CORE_CSS, CORE_JS, CoreDoc, DocumentFiles, FAVICON, GLOBALS_DIR, Layout, Limits,
};
use crate::paths::{normalize_key, relative_slash, strip_spaces, subfolder_of};
use crate::rewriter::{
    LinkContext, extract_body_style, parse_script_deps, rewrite_links, rewrite_script_imports,
};

/// Staged file whose (possibly rewritten) text goes to a canonical location.
#[derive(Clone, Debug)]
struct PendingWrite {
    source: PathBuf,
    target: PathBuf,
    content: String,
}

/// Classified document awaiting migration.
#[derive(Clone, Debug)]
struct PendingDoc {
    source: PathBuf,
    files: DocumentFiles,
    record: Ingested,
    modified: SystemTime,
    /// Core documents are never erased from canonical storage.
    erase_on_delete: bool,
    /// Canonical files of other-case variants of the same key.
    superseded: Vec<DocumentFiles>,
}

/// Remove a document's html, stylesheet and dependency files.
fn remove_document_files(storage: &dyn Storage, files: &DocumentFiles) -> Result<(), StorageError> {
    storage.remove(&files.html)?;
    storage.remove(&files.css)?;
    storage.remove(&files.deps)
}

/// Side effects of one staging folder, applied all at once by [`commit`](Self::commit).
#[derive(Debug)]
pub struct MigrationPlan {
    source_dir: PathBuf,
    media_dir: PathBuf,
    /// Staging-relative media paths referenced by documents.
    media: BTreeSet<String>,
    writes: Vec<PendingWrite>,
    docs: Vec<PendingDoc>,
}

impl MigrationPlan {
    fn new(source_dir: PathBuf, media_dir: PathBuf) -> Self {
        Self {
            source_dir,
            media_dir,
            media: BTreeSet::new(),
            writes: Vec::new(),
            docs: Vec::new(),
        }
    }

    /// True if committing would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.media.is_empty() && self.writes.is_empty() && self.docs.is_empty()
    }

    /// Apply the plan to canonical storage.
    ///
    /// Order: media copies, script and blob writes, document writes and
    /// deletions, and finally removal of the consumed staging files. A failure
    /// part-way leaves the staging sources in place so the next pass retries.
    pub fn commit(&self, storage: &dyn Storage) -> Result<(), StorageError> {
        if self.is_empty() {
            return Ok(());
        }

        for rel in &self.media {
            storage.copy(&self.source_dir.join(rel), &self.media_dir.join(rel))?;
        }

        for write in &self.writes {
            storage.write(&write.target, &write.content)?;
        }

        for doc in &self.docs {
            for files in &doc.superseded {
                remove_document_files(storage, files)?;
            }
            match &doc.record {
                Ingested::CreateUpdate {
                    content,
                    style_content,
                    script_deps,
                    ..
                } => {
                    storage.write(&doc.files.html, content)?;
                    storage.remove(&doc.files.css)?;
                    storage.remove(&doc.files.deps)?;
                    if !style_content.is_empty() {
                        storage.write(&doc.files.css, style_content)?;
                    }
                    if !script_deps.is_empty() {
                        storage.write(&doc.files.deps, &script_deps.join("\n"))?;
                    }
                    storage.set_modified(&doc.files.html, doc.modified)?;
                }
                Ingested::Delete { .. } if doc.erase_on_delete => {
                    remove_document_files(storage, &doc.files)?;
                }
                Ingested::Delete { .. } => {}
            }
        }

        let consumed = self
            .media
            .iter()
            .map(|rel| self.source_dir.join(rel))
            .chain(self.writes.iter().map(|w| w.source.clone()))
            .chain(self.docs.iter().map(|d| d.source.clone()));
        for source in consumed {
            storage.remove(&source)?;
        }

        tracing::debug!(
            dir = %self.source_dir.display(),
            media = self.media.len(),
            writes = self.writes.len(),
            docs = self.docs.len(),
            "Committed migration plan"
        );
        Ok(())
    }
}

/// Scans staging folders and migrates their contents into canonical storage.
pub struct Ingester {
    storage: Arc<dyn Storage>,
    layout: Layout,
    limits: Limits,
}

impl Ingester {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, layout: Layout, limits: Limits) -> Self {
        Self {
            storage,
            layout,
            limits,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Run one ingestion pass over the core and main staging folders.
    ///
    /// Missing staging folders are treated as empty. Any other storage failure
    /// aborts the pass before canonical storage is modified, or during commit.
    pub fn ingest(&self) -> Result<Ingestion, IngestError> {
        let mut core_plan =
            MigrationPlan::new(self.layout.core_staging_dir(), self.layout.media_dir());
        let (core, mut modules) = self.classify_core(&mut core_plan)?;

        let mut plan = MigrationPlan::new(self.layout.staging_dir(), self.layout.media_dir());
        let (records, staged_modules) = self.classify_staging(&mut plan)?;
        modules.extend(staged_modules);

        core_plan.commit(self.storage.as_ref())?;
        plan.commit(self.storage.as_ref())?;

        let ingestion = Ingestion {
            records,
            core,
            modules,
            media_files: core_plan.media.len() + plan.media.len(),
        };
        if !ingestion.is_empty() {
            tracing::info!(
                records = ingestion.records.len(),
                modules = ingestion.modules.len(),
                media = ingestion.media_files,
                "Ingested staged files"
            );
        }
        Ok(ingestion)
    }

    /// Classify one staged HTML file.
    ///
    /// An empty or malformed body yields [`Ingested::Delete`]. Otherwise the body
    /// has its media links rewritten (existing targets are added to `media`)
    /// and the head is scanned for script dependencies. Returns `None` when the
    /// file is not valid UTF-8.
    pub fn ingest_doc(
        &self,
        entry: &FileEntry,
        source_dir: &Path,
        media: &mut BTreeSet<String>,
    ) -> Result<Option<Ingested>, IngestError> {
        let rel = relative(&entry.path, source_dir)?;
        let full_path = rel.strip_suffix(".html").unwrap_or(&rel).to_owned();
        let Some(html) = self.read_staged(entry)? else {
            return Ok(None);
        };

        let Some(extracted) = extract_body_style(&html) else {
            tracing::debug!(path = %full_path, "Empty or malformed body, classified as delete");
            return Ok(Some(Ingested::Delete { full_path }));
        };

        let media_url_prefix = self.layout.media_url_prefix();
        let ctx = LinkContext {
            storage: self.storage.as_ref(),
            source_dir,
            media_url_prefix: &media_url_prefix,
        };
        let content = rewrite_links(extracted.body, &full_path, &ctx, media);
        let script_deps = parse_script_deps(&html, &subfolder_of(&full_path));

        tracing::debug!(path = %full_path, deps = script_deps.len(), "Classified document");
        Ok(Some(Ingested::CreateUpdate {
            full_path,
            content,
            style_content: extracted.style,
            modified_at: DateTime::<Utc>::from(entry.modified),
            script_deps,
        }))
    }

    /// List a folder, treating a missing one as empty.
    fn list_or_empty(&self, dir: &Path) -> Result<Vec<FileEntry>, IngestError> {
        match self.storage.list_files(dir) {
            Ok(files) => Ok(files),
            Err(e) if e.is_not_found() => {
                tracing::debug!(dir = %dir.display(), "Folder missing, treated as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read a staged file as text. Content that is not UTF-8 is logged and
    /// yields `None`, leaving the file in staging.
    fn read_staged(&self, entry: &FileEntry) -> Result<Option<String>, IngestError> {
        match self.storage.read_to_string(&entry.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.is_invalid_data() => {
                tracing::warn!(
                    path = %entry.path.display(),
                    error = %e,
                    "Skipping staged file that is not valid UTF-8"
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Canonical document names (spaces stripped, case kept) grouped by cache key.
    fn canonical_names(&self) -> Result<HashMap<String, Vec<String>>, IngestError> {
        let dir = self.layout.docs_dir();
        let mut names: HashMap<String, Vec<String>> = HashMap::new();
        for entry in self.list_or_empty(&dir)? {
            let Some(rel) = relative_slash(&entry.path, &dir) else {
                continue;
            };
            if let Some(name) = rel.strip_suffix(".html") {
                names
                    .entry(normalize_key(name))
                    .or_default()
                    .push(name.to_owned());
            }
        }
        Ok(names)
    }

    /// Read a script and rewrite its imports, or log and skip it.
    fn stage_script(
        &self,
        entry: &FileEntry,
        module_id: &str,
    ) -> Result<Option<PendingWrite>, IngestError> {
        let Some(script) = self.read_staged(entry)? else {
            return Ok(None);
        };
        match rewrite_script_imports(
            &script,
            &subfolder_of(module_id),
            &self.layout.scripts_url_prefix(),
        ) {
            Ok(content) => Ok(Some(PendingWrite {
                source: entry.path.clone(),
                target: self.layout.script_file(module_id),
                content,
            })),
            Err(e) => {
                tracing::warn!(
                    path = %entry.path.display(),
                    error = %e,
                    "Skipping script with unsupported imports"
                );
                Ok(None)
            }
        }
    }

    fn classify_core(
        &self,
        plan: &mut MigrationPlan,
    ) -> Result<(CoreBundle, Vec<String>), IngestError> {
        let dir = plan.source_dir.clone();
        let mut core = CoreBundle::default();
        let mut modules = Vec::new();

        for entry in self.list_or_empty(&dir)? {
            let rel = relative(&entry.path, &dir)?;

            if rel == CORE_JS || rel == CORE_CSS {
                if entry.len > self.limits.max_document_bytes {
                    tracing::debug!(path = %rel, "Skipping oversized core blob");
                    continue;
                }
                let Some(content) = self.read_staged(&entry)? else {
                    continue;
                };
                let target = if rel == CORE_JS {
                    core.js.clone_from(&content);
                    self.layout.core_js_file()
                } else {
                    core.css.clone_from(&content);
                    self.layout.core_css_file()
                };
                plan.writes.push(PendingWrite {
                    source: entry.path.clone(),
                    target,
                    content,
                });
            } else if rel == FAVICON {
                plan.media.insert(rel);
            } else if let Some(doc) = CoreDoc::ALL.into_iter().find(|d| d.file_name() == rel) {
                if entry.len > self.limits.max_document_bytes {
                    tracing::debug!(path = %rel, "Skipping oversized core document");
                    continue;
                }
                let Some(record) = self.ingest_doc(&entry, &dir, &mut plan.media)? else {
                    continue;
                };
                plan.docs.push(PendingDoc {
                    source: entry.path.clone(),
                    files: self.layout.core_document_files(doc),
                    record: record.clone(),
                    modified: entry.modified,
                    erase_on_delete: false,
                    superseded: Vec::new(),
                });
                core.set_document(doc, record);
            } else if let Some(stem) = rel.strip_suffix(".js") {
                if entry.len > self.limits.max_script_bytes {
                    tracing::debug!(path = %rel, "Skipping oversized global script");
                    continue;
                }
                let module_id = format!("{GLOBALS_DIR}/{stem}");
                if let Some(write) = self.stage_script(&entry, &module_id)? {
                    plan.writes.push(write);
                    modules.push(module_id);
                }
            }
        }

        Ok((core, modules))
    }

    fn classify_staging(
        &self,
        plan: &mut MigrationPlan,
    ) -> Result<(Vec<Ingested>, Vec<String>), IngestError> {
        let dir = plan.source_dir.clone();
        let mut records = Vec::new();
        let mut modules = Vec::new();
        let mut canonical = self.canonical_names()?;

        for entry in self.list_or_empty(&dir)? {
            let rel = relative(&entry.path, &dir)?;

            if let Some(module_id) = rel.strip_suffix(".js") {
                if entry.len > self.limits.max_script_bytes {
                    tracing::debug!(path = %rel, "Skipping oversized script");
                    continue;
                }
                if let Some(write) = self.stage_script(&entry, module_id)? {
                    plan.writes.push(write);
                    modules.push(module_id.to_owned());
                }
            } else if rel.ends_with(".html") {
                if entry.len > self.limits.max_document_bytes {
                    tracing::debug!(path = %rel, "Skipping oversized document");
                    continue;
                }
                let Some(record) = self.ingest_doc(&entry, &dir, &mut plan.media)? else {
                    continue;
                };
                let name = strip_spaces(record.full_path());
                let variants = canonical.entry(normalize_key(&name)).or_default();
                let superseded = variants
                    .drain(..)
                    .filter(|v| *v != name)
                    .map(|v| self.layout.document_files(&v))
                    .collect();
                if matches!(record, Ingested::CreateUpdate { .. }) {
                    variants.push(name);
                }
                plan.docs.push(PendingDoc {
                    source: entry.path.clone(),
                    files: self.layout.document_files(record.full_path()),
                    record: record.clone(),
                    modified: entry.modified,
                    erase_on_delete: true,
                    superseded,
                });
                records.push(record);
            }
        }

        Ok((records, modules))
    }
}

fn relative(path: &Path, dir: &Path) -> Result<String, IngestError> {
    relative_slash(path, dir).ok_or_else(|| IngestError::OutsideStaging(path.to_path_buf()))
}
