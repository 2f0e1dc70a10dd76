//! Document cache, navigation trees and refresh coordination for folio.
//!
//! This crate provides:
//! - [`Blog`]: demand-driven refresh and request resolution
//! - [`DocumentCache`]: in-memory documents, script modules and core content
//! - [`NavTree`]: topical and temporal navigation trees with breadcrumbs
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use folio_ingest::Layout;
//! use folio_site::{Blog, BlogConfig};
//! use folio_storage_fs::FsStorage;
//!
//! let blog = Blog::new(
//!     Arc::new(FsStorage::new()),
//!     BlogConfig::new(Layout::new("content", "blog")),
//! );
//!
//! let resolved = blog.resolve("guide/intro", &[]);
//! println!("{}", resolved.document.content);
//! ```

mod blog;
mod cache;
mod clock;
mod document;
mod nav_tree;

pub use blog::{Blog, BlogConfig, RefreshError, RefreshOutcome, Resolved, Snapshot};
pub use cache::DocumentCache;
pub use clock::{Clock, SystemClock, is_stale};
pub use document::Document;
pub use nav_tree::NavTree;
