//! Canonical folder layout and ingestion size limits.
//!
//! Everything lives under one content root:
//!
//! ```text
//! <root>/
//! ├── _ingest/        staging for documents, scripts and media
//! ├── _ingestCore/    staging for core files
//! ├── _d/             rendered documents (.html + optional .deps)
//! ├── _m/             media and per-document stylesheets
//! ├── _s/             script modules (_s/_g/ holds globals)
//! └── _core/          core documents
//! ```

use std::path::{Path, PathBuf};

/// Staging folder for ordinary documents, scripts and media.
pub const STAGING_DIR: &str = "_ingest";
/// Staging folder for core files.
pub const CORE_STAGING_DIR: &str = "_ingestCore";
/// Canonical documents folder.
pub const DOCS_DIR: &str = "_d";
/// Canonical media folder.
pub const MEDIA_DIR: &str = "_m";
/// Canonical scripts folder.
pub const SCRIPTS_DIR: &str = "_s";
/// Reserved global sub-namespace inside the scripts and media folders.
pub const GLOBALS_DIR: &str = "_g";
/// Canonical core documents folder.
pub const CORE_DIR: &str = "_core";

/// Staging name of the global script blob.
pub const CORE_JS: &str = "core.js";
/// Staging name of the global stylesheet blob.
pub const CORE_CSS: &str = "core.css";
/// Staging name of the site icon.
pub const FAVICON: &str = "favicon.ico";

/// One of the four distinguished, always-present pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoreDoc {
    NotFound,
    Footer,
    RootPage,
    TermsOfUse,
}

impl CoreDoc {
    /// All core documents, in ingestion order.
    pub const ALL: [Self; 4] = [Self::NotFound, Self::Footer, Self::RootPage, Self::TermsOfUse];

    /// File stem used in both staging and canonical storage.
    #[must_use]
    pub fn stem(self) -> &'static str {
        match self {
            Self::NotFound => "notFound",
            Self::Footer => "footer",
            Self::RootPage => "core",
            Self::TermsOfUse => "termsOfUse",
        }
    }

    /// Staging file name (`<stem>.html`).
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.html", self.stem())
    }

    /// Logical path of the document, used for its stylesheet URL.
    #[must_use]
    pub fn logical_path(self) -> String {
        format!("{CORE_DIR}/{}", self.stem())
    }
}

/// On-disk files backing one rendered document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentFiles {
    /// Rewritten body.
    pub html: PathBuf,
    /// Newline-joined script dependency sidecar.
    pub deps: PathBuf,
    /// Extracted stylesheet, served publicly from the media folder.
    pub css: PathBuf,
}

/// Canonical folder layout under a content root plus the public URL prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
    app_prefix: String,
}

impl Layout {
    /// Create a layout rooted at `root`, served under `/<app_prefix>/`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, app_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            app_prefix: app_prefix.into(),
        }
    }

    /// Content root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL prefix without slashes (e.g. `blog`).
    #[must_use]
    pub fn app_prefix(&self) -> &str {
        &self.app_prefix
    }

    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    #[must_use]
    pub fn core_staging_dir(&self) -> PathBuf {
        self.root.join(CORE_STAGING_DIR)
    }

    #[must_use]
    pub fn docs_dir(&self) -> PathBuf {
        self.root.join(DOCS_DIR)
    }

    #[must_use]
    pub fn media_dir(&self) -> PathBuf {
        self.root.join(MEDIA_DIR)
    }

    #[must_use]
    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join(SCRIPTS_DIR)
    }

    #[must_use]
    pub fn core_dir(&self) -> PathBuf {
        self.root.join(CORE_DIR)
    }

    /// `/<app>/_m/`
    #[must_use]
    pub fn media_url_prefix(&self) -> String {
        format!("/{}/{MEDIA_DIR}/", self.app_prefix)
    }

    /// `/<app>/_s/`
    #[must_use]
    pub fn scripts_url_prefix(&self) -> String {
        format!("/{}/{SCRIPTS_DIR}/", self.app_prefix)
    }

    /// Files for an ordinary document. Spaces in `logical_path` are dropped.
    #[must_use]
    pub fn document_files(&self, logical_path: &str) -> DocumentFiles {
        let name = crate::paths::strip_spaces(logical_path);
        let docs = self.docs_dir();
        DocumentFiles {
            html: docs.join(format!("{name}.html")),
            deps: docs.join(format!("{name}.deps")),
            css: self.media_dir().join(format!("{name}.css")),
        }
    }

    /// Files for a core document.
    #[must_use]
    pub fn core_document_files(&self, doc: CoreDoc) -> DocumentFiles {
        let core = self.core_dir();
        DocumentFiles {
            html: core.join(doc.file_name()),
            deps: core.join(format!("{}.deps", doc.stem())),
            css: self.media_dir().join(format!("{}.css", doc.logical_path())),
        }
    }

    /// Canonical file of a script module (`_s/<id>.js`).
    #[must_use]
    pub fn script_file(&self, module_id: &str) -> PathBuf {
        self.scripts_dir().join(format!("{module_id}.js"))
    }

    /// Canonical location of the global script blob.
    #[must_use]
    pub fn core_js_file(&self) -> PathBuf {
        self.scripts_dir().join(GLOBALS_DIR).join(CORE_JS)
    }

    /// Canonical location of the global stylesheet blob.
    #[must_use]
    pub fn core_css_file(&self) -> PathBuf {
        self.media_dir().join(GLOBALS_DIR).join(CORE_CSS)
    }
}

/// Size ceilings for ingested files. Larger files are skipped silently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum script size in bytes.
    pub max_script_bytes: u64,
    /// Maximum document size in bytes.
    pub max_document_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_script_bytes: 500_000,
            max_document_bytes: 2_000_000,
        }
    }
}
