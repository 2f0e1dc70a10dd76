//! Refresh coordination and request resolution.
//!
//! [`Blog`] owns the published [`Snapshot`] (document cache plus both
//! navigation trees). Readers clone the snapshot `Arc` and never block on a
//! refresh for longer than the pointer swap. Refresh is demand-driven: the
//! first [`resolve`](Blog::resolve) past the staleness window runs one
//! ingestion cycle.
//!
//! # Thread Safety
//!
//! - `current` is an `RwLock<Arc<Snapshot>>`, written only to swap in a fully
//!   built snapshot
//! - `refresh_lock` serializes ingestion cycles; staleness is re-checked under
//!   it so concurrent callers collapse into one refresh
//! - a failed refresh leaves the previous snapshot and its timestamp in place

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use folio_ingest::paths::strip_html_suffix;
use folio_ingest::{CoreDoc, IngestError, Ingester, Layout, Limits};
use folio_storage::{Storage, StorageError};

use crate::cache::DocumentCache;
use crate::clock::{Clock, SystemClock, is_stale};
use crate::document::Document;
use crate::nav_tree::NavTree;

/// Query key selecting the temporal navigation tree.
const TEMPORAL_QUERY_KEY: &str = "temp";

/// Address of the terms-of-use page, matched ignoring case.
const TERMS_OF_USE_ADDRESS: &str = "termsofuse";

/// Configuration for [`Blog`].
#[derive(Clone, Debug)]
pub struct BlogConfig {
    /// Canonical folder layout and public URL prefixes.
    pub layout: Layout,
    /// File-size ceilings for scripts and documents.
    pub limits: Limits,
    /// How long a refresh stays fresh.
    pub refresh_interval: TimeDelta,
}

impl BlogConfig {
    /// Configuration with default limits and a five minute refresh window.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            limits: Limits::default(),
            refresh_interval: TimeDelta::minutes(5),
        }
    }
}

/// Error returned when a refresh cycle is abandoned.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Loading canonical storage into an empty cache failed.
    #[error("Failed to load canonical content: {0}")]
    Bootstrap(#[from] StorageError),
    /// Ingestion of the staging folders failed.
    #[error("Ingestion failed: {0}")]
    Ingest(#[from] IngestError),
}

/// What [`Blog::check_and_refresh`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot was still within the staleness window.
    Fresh,
    /// A refresh cycle ran and a new snapshot was published.
    Refreshed {
        /// Document records applied.
        records: usize,
        /// Script modules migrated.
        modules: usize,
    },
}

/// Immutable published state: the cache and the trees built from it.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub cache: DocumentCache,
    pub topical: Arc<NavTree>,
    pub temporal: Arc<NavTree>,
    /// `None` until the first successful refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    fn build(cache: DocumentCache, refreshed_at: Option<DateTime<Utc>>) -> Self {
        let pages = cache.to_navigation_source();
        Self {
            topical: Arc::new(NavTree::topical_of(&pages)),
            temporal: Arc::new(NavTree::temporal_of(&pages)),
            cache,
            refreshed_at,
        }
    }
}

/// Everything needed to render a response for one address.
#[derive(Clone, Debug)]
pub struct Resolved {
    /// Selected document, the not-found document if nothing matched.
    pub document: Arc<Document>,
    pub footer: Arc<Document>,
    /// Navigation tree chosen by the query.
    pub nav: Arc<NavTree>,
    /// Whether `nav` is the temporal tree.
    pub temporal: bool,
    /// Child indices from the root of `nav` to the document. Empty when the
    /// document is not in the tree.
    pub breadcrumbs: Vec<usize>,
    pub stylesheet_url: Option<String>,
    /// Public URLs of the document's known script modules, in dependency order.
    pub module_urls: Vec<String>,
    pub core_js: String,
    pub core_css: String,
    /// False when the not-found document was substituted.
    pub found: bool,
}

/// Refresh coordinator and request resolver over one content root.
pub struct Blog {
    storage: Arc<dyn Storage>,
    ingester: Ingester,
    clock: Arc<dyn Clock>,
    refresh_interval: TimeDelta,
    /// Serializes refresh cycles.
    refresh_lock: Mutex<()>,
    /// Current snapshot (atomically swappable).
    current: RwLock<Arc<Snapshot>>,
}

impl Blog {
    /// Create a coordinator using the system clock.
    ///
    /// Nothing is read until the first refresh.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>, config: BlogConfig) -> Self {
        Self::with_clock(storage, config, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(
        storage: Arc<dyn Storage>,
        config: BlogConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ingester = Ingester::new(Arc::clone(&storage), config.layout, config.limits);
        Self {
            storage,
            ingester,
            clock,
            refresh_interval: config.refresh_interval,
            refresh_lock: Mutex::new(()),
            current: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        self.ingester.layout()
    }

    /// Current snapshot, without checking staleness.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Run a refresh cycle if the snapshot is stale.
    ///
    /// Uses double-checked locking:
    /// 1. Fast path: return if the snapshot is fresh
    /// 2. Slow path: acquire `refresh_lock`, recheck, then refresh
    ///
    /// # Errors
    ///
    /// Returns [`RefreshError`] if canonical storage or the staging folders
    /// cannot be read or migrated. The previous snapshot stays published.
    pub fn check_and_refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        if !self.is_stale() {
            return Ok(RefreshOutcome::Fresh);
        }

        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !self.is_stale() {
            return Ok(RefreshOutcome::Fresh);
        }

        self.refresh_locked()
    }

    /// Run a refresh cycle regardless of staleness.
    ///
    /// # Errors
    ///
    /// Same as [`check_and_refresh`](Self::check_and_refresh).
    pub fn force_refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.refresh_locked()
    }

    fn is_stale(&self) -> bool {
        is_stale(
            self.clock.now(),
            self.snapshot().refreshed_at,
            self.refresh_interval,
        )
    }

    /// Build and publish a new snapshot. Caller must hold `refresh_lock`.
    ///
    /// If ingestion fails right after a bootstrap, the bootstrapped content is
    /// still published with the previous refresh time, so canonical documents
    /// are served and the next request retries.
    fn refresh_locked(&self) -> Result<RefreshOutcome, RefreshError> {
        let previous = self.snapshot();
        let mut cache = previous.cache.clone();
        let bootstrapped = cache.needs_bootstrap();
        if bootstrapped {
            cache.bootstrap(
                self.storage.as_ref(),
                self.ingester.layout(),
                self.ingester.limits(),
            )?;
        }

        let ingestion = match self.ingester.ingest() {
            Ok(ingestion) => ingestion,
            Err(e) => {
                if bootstrapped {
                    self.publish(Snapshot::build(cache, previous.refreshed_at));
                }
                return Err(e.into());
            }
        };
        cache.apply_ingested(&ingestion.records, &ingestion.core);
        let modules = ingestion.modules.len();
        cache.insert_modules(ingestion.modules);

        let snapshot = Snapshot::build(cache, Some(self.clock.now()));
        let documents = snapshot.cache.len();
        self.publish(snapshot);

        tracing::info!(
            records = ingestion.records.len(),
            modules,
            documents,
            "Refreshed content"
        );

        Ok(RefreshOutcome::Refreshed {
            records: ingestion.records.len(),
            modules,
        })
    }

    fn publish(&self, snapshot: Snapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }

    /// Resolve an address to a document and navigation tree.
    ///
    /// Refreshes first if the snapshot is stale; a failed refresh is logged and
    /// the previous snapshot is used. An empty address selects the root page,
    /// `termsofuse` (any case) the terms page, anything else is looked up
    /// case-insensitively with the not-found page as fallback. A `temp` query
    /// key selects the temporal tree.
    pub fn resolve(&self, sub_path: &str, query: &[(String, String)]) -> Resolved {
        if let Err(e) = self.check_and_refresh() {
            tracing::error!(error = %e, "Refresh failed, serving previous content");
        }

        let snapshot = self.snapshot();
        let cache = &snapshot.cache;
        let temporal = query.iter().any(|(key, _)| key == TEMPORAL_QUERY_KEY);
        let nav = if temporal {
            Arc::clone(&snapshot.temporal)
        } else {
            Arc::clone(&snapshot.topical)
        };

        let address = strip_html_suffix(sub_path.trim_matches('/'));
        let (document, found, in_tree) = if address.is_empty() {
            (cache.core_document(CoreDoc::RootPage), true, false)
        } else if address.eq_ignore_ascii_case(TERMS_OF_USE_ADDRESS) {
            (cache.core_document(CoreDoc::TermsOfUse), true, false)
        } else if let Some(doc) = cache.lookup(address) {
            (doc, true, true)
        } else {
            (cache.core_document(CoreDoc::NotFound), false, false)
        };

        let breadcrumbs = if in_tree {
            nav.create_breadcrumbs(&document.original_path)
        } else {
            Vec::new()
        };

        let layout = self.ingester.layout();
        let module_urls = document
            .script_deps
            .iter()
            .filter_map(|id| {
                let url = cache.module_url(id, layout);
                if url.is_none() {
                    tracing::warn!(
                        module = %id,
                        path = %document.original_path,
                        "Unknown script module"
                    );
                }
                url
            })
            .collect();

        Resolved {
            stylesheet_url: document.stylesheet_url(layout),
            footer: cache.core_document(CoreDoc::Footer),
            core_js: cache.core_js().to_owned(),
            core_css: cache.core_css().to_owned(),
            document,
            nav,
            temporal,
            breadcrumbs,
            module_urls,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use chrono::TimeZone;
    use folio_storage_fs::FsStorage;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::ManualClock;

    fn stage(root: &Path, rel: &str, content: &str) {
        let path = root.join("_ingest").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn stage_core(root: &Path, rel: &str, content: &str) {
        let path = root.join("_ingestCore").join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn page(body: &str) -> String {
        format!("<html><head></head><body>{body}</body></html>")
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn blog(root: &Path) -> (Blog, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let blog = Blog::with_clock(
            Arc::new(FsStorage::new()),
            BlogConfig::new(Layout::new(root, "blog")),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (blog, clock)
    }

    fn no_query() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_resolve_empty_root_serves_root_page() {
        let temp = tempfile::tempdir().unwrap();
        let (blog, _clock) = blog(temp.path());

        let resolved = blog.resolve("", &no_query());

        assert!(resolved.found);
        assert!(resolved.document.content.is_empty());
        assert!(resolved.nav.is_empty());
        assert!(resolved.breadcrumbs.is_empty());
        assert!(blog.snapshot().refreshed_at.is_some());
    }

    #[test]
    fn test_resolve_serves_ingested_document() {
        let temp = tempfile::tempdir().unwrap();
        stage(
            temp.path(),
            "docs/intro.html",
            "<html><head><style> p { color: red; } </style>\
             <script type=\"module\" src=\"./widget.js\"></script></head>\
             <body><p>Hello</p></body></html>",
        );
        stage(temp.path(), "docs/widget.js", "export const x = 1;\n");
        let (blog, _clock) = blog(temp.path());

        let resolved = blog.resolve("/docs/intro", &no_query());

        assert!(resolved.found);
        assert_eq!(resolved.document.content, "<p>Hello</p>");
        assert_eq!(resolved.document.original_path, "docs/intro");
        assert_eq!(resolved.breadcrumbs, vec![0, 0]);
        assert_eq!(
            resolved.stylesheet_url.as_deref(),
            Some("/blog/_m/docs/intro.css")
        );
        assert_eq!(resolved.module_urls, vec!["/blog/_s/docs/widget.js".to_owned()]);
        assert!(!resolved.temporal);
    }

    #[test]
    fn test_resolve_is_case_insensitive_and_ignores_html_suffix() {
        let temp = tempfile::tempdir().unwrap();
        stage(temp.path(), "Topic/Page.html", &page("<p>x</p>"));
        let (blog, _clock) = blog(temp.path());

        let resolved = blog.resolve("topic/PAGE.html", &no_query());

        assert!(resolved.found);
        assert_eq!(resolved.document.original_path, "Topic/Page");
    }

    #[test]
    fn test_resolve_missing_serves_not_found_document() {
        let temp = tempfile::tempdir().unwrap();
        stage_core(temp.path(), "notFound.html", &page("<p>Gone</p>"));
        let (blog, _clock) = blog(temp.path());

        let resolved = blog.resolve("nope", &no_query());

        assert!(!resolved.found);
        assert_eq!(resolved.document.content, "<p>Gone</p>");
        assert!(resolved.breadcrumbs.is_empty());
    }

    #[test]
    fn test_resolve_terms_of_use_ignores_case() {
        let temp = tempfile::tempdir().unwrap();
        stage_core(temp.path(), "termsOfUse.html", &page("<p>Terms</p>"));
        stage_core(temp.path(), "footer.html", &page("<p>Foot</p>"));
        let (blog, _clock) = blog(temp.path());

        let resolved = blog.resolve("TermsOfUse", &no_query());

        assert!(resolved.found);
        assert_eq!(resolved.document.content, "<p>Terms</p>");
        assert_eq!(resolved.footer.content, "<p>Foot</p>");
    }

    #[test]
    fn test_resolve_temp_query_selects_temporal_tree() {
        let temp = tempfile::tempdir().unwrap();
        stage(temp.path(), "a/b.html", &page("<p>b</p>"));
        let (blog, _clock) = blog(temp.path());
        let query = vec![("temp".to_owned(), String::new())];

        let resolved = blog.resolve("a/b", &query);

        assert!(resolved.temporal);
        assert_eq!(resolved.breadcrumbs, vec![0, 0, 0]);
        assert_eq!(resolved.nav.children[0].children[0].children[0].name, "a/b");
    }

    #[test]
    fn test_refresh_runs_once_within_window() {
        let temp = tempfile::tempdir().unwrap();
        stage(temp.path(), "first.html", &page("<p>1</p>"));
        let (blog, clock) = blog(temp.path());

        assert!(blog.resolve("first", &no_query()).found);
        stage(temp.path(), "second.html", &page("<p>2</p>"));
        clock.advance(TimeDelta::seconds(299));

        assert!(!blog.resolve("second", &no_query()).found);
        assert!(temp.path().join("_ingest/second.html").exists());
        assert_eq!(blog.check_and_refresh().unwrap(), RefreshOutcome::Fresh);

        clock.advance(TimeDelta::seconds(2));

        assert!(blog.resolve("second", &no_query()).found);
        assert!(!temp.path().join("_ingest/second.html").exists());
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let temp = tempfile::tempdir().unwrap();
        stage(temp.path(), "kept.html", &page("<p>kept</p>"));
        let (blog, clock) = blog(temp.path());
        assert!(blog.resolve("kept", &no_query()).found);
        let refreshed_at = blog.snapshot().refreshed_at;

        fs::remove_dir_all(temp.path().join("_ingest")).unwrap();
        fs::write(temp.path().join("_ingest"), "not a folder").unwrap();
        clock.advance(TimeDelta::minutes(10));

        assert!(blog.check_and_refresh().is_err());
        let resolved = blog.resolve("kept", &no_query());
        assert!(resolved.found);
        assert_eq!(blog.snapshot().refreshed_at, refreshed_at);
    }

    #[test]
    fn test_restart_serves_canonical_content() {
        let temp = tempfile::tempdir().unwrap();
        stage(temp.path(), "notes/day.html", &page("<p>day</p>"));
        {
            let (blog, _clock) = blog(temp.path());
            assert!(blog.resolve("notes/day", &no_query()).found);
        }

        let (restarted, _clock) = blog(temp.path());
        let resolved = restarted.resolve("notes/day", &no_query());

        assert!(resolved.found);
        assert_eq!(resolved.document.content, "<p>day</p>");
        assert_eq!(resolved.breadcrumbs, vec![0, 0]);
    }

    #[test]
    fn test_unknown_module_is_omitted() {
        let temp = tempfile::tempdir().unwrap();
        stage(
            temp.path(),
            "p.html",
            "<html><head><script src=\"missing.js\"></script></head>\
             <body><p>p</p></body></html>",
        );
        let (blog, _clock) = blog(temp.path());

        let resolved = blog.resolve("p", &no_query());

        assert_eq!(resolved.document.script_deps, vec!["_g/missing".to_owned()]);
        assert!(resolved.module_urls.is_empty());
    }

    #[test]
    fn test_force_refresh_ignores_window() {
        let temp = tempfile::tempdir().unwrap();
        let (blog, _clock) = blog(temp.path());
        assert!(matches!(
            blog.check_and_refresh().unwrap(),
            RefreshOutcome::Refreshed { records: 0, .. }
        ));
        stage(temp.path(), "late.html", &page("<p>late</p>"));

        let outcome = blog.force_refresh().unwrap();

        assert_eq!(
            outcome,
            RefreshOutcome::Refreshed {
                records: 1,
                modules: 0
            }
        );
    }

    #[test]
    fn test_concurrent_resolves_refresh_once() {
        let temp = tempfile::tempdir().unwrap();
        stage(temp.path(), "shared.html", &page("<p>s</p>"));
        let (blog, _clock) = blog(temp.path());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert!(blog.resolve("shared", &no_query()).found);
                });
            }
        });

        assert_eq!(blog.snapshot().cache.len(), 1);
        assert_eq!(blog.check_and_refresh().unwrap(), RefreshOutcome::Fresh);
    }

    #[test]
    fn test_case_variant_delete_stays_deleted_after_restart() {
        let temp = tempfile::tempdir().unwrap();
        stage(temp.path(), "Topic/Page.html", &page("<p>old</p>"));
        let (blog, clock) = blog(temp.path());
        assert!(blog.resolve("topic/page", &no_query()).found);

        stage(temp.path(), "topic/page.html", "<body> </body>");
        clock.advance(TimeDelta::seconds(301));
        assert!(!blog.resolve("topic/page", &no_query()).found);

        let (restarted, _clock) = self::blog(temp.path());
        let resolved = restarted.resolve("Topic/Page", &no_query());
        assert!(!resolved.found);
        assert!(!temp.path().join("_d/Topic/Page.html").exists());
    }

    #[test]
    fn test_case_variant_update_survives_restart() {
        let temp = tempfile::tempdir().unwrap();
        stage(temp.path(), "Topic/Page.html", &page("<p>old</p>"));
        let (blog, clock) = blog(temp.path());
        assert!(blog.resolve("topic/page", &no_query()).found);

        stage(temp.path(), "topic/page.html", &page("<p>new</p>"));
        clock.advance(TimeDelta::seconds(301));
        let live = blog.resolve("TOPIC/PAGE", &no_query());
        assert_eq!(live.document.content, "<p>new</p>");

        let (restarted, _clock) = self::blog(temp.path());
        let resolved = restarted.resolve("Topic/Page", &no_query());
        assert!(resolved.found);
        assert_eq!(resolved.document.content, "<p>new</p>");
        assert_eq!(resolved.document.original_path, "topic/page");
    }

    #[test]
    fn test_document_that_is_not_utf8_does_not_block_refresh() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("_d")).unwrap();
        fs::write(temp.path().join("_d/existing.html"), "<p>existing</p>").unwrap();
        stage(temp.path(), "good.html", &page("<p>good</p>"));
        fs::write(temp.path().join("_ingest/bad.html"), [0xff, 0xfe]).unwrap();
        let (blog, _clock) = blog(temp.path());

        assert!(blog.resolve("existing", &no_query()).found);
        assert!(blog.resolve("good", &no_query()).found);
        assert!(!blog.resolve("bad", &no_query()).found);
        assert!(blog.snapshot().refreshed_at.is_some());
        assert!(temp.path().join("_ingest/bad.html").exists());
    }

    #[test]
    fn test_cold_start_serves_canonical_when_ingest_fails() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("_d")).unwrap();
        fs::write(temp.path().join("_d/existing.html"), "<p>existing</p>").unwrap();
        fs::write(temp.path().join("_ingest"), "not a folder").unwrap();
        let (blog, _clock) = blog(temp.path());

        assert!(blog.check_and_refresh().is_err());

        let resolved = blog.resolve("existing", &no_query());
        assert!(resolved.found);
        assert_eq!(resolved.document.content, "<p>existing</p>");
        assert!(blog.snapshot().refreshed_at.is_none());
        assert!(!blog.snapshot().cache.needs_bootstrap());
    }
}
