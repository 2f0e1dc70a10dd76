//! Navigation trees.
//!
//! Two trees are rebuilt from the cache on every refresh: a topical tree that
//! mirrors the folder hierarchy and a temporal tree grouped by year and month.
//! In both, leaves are named by the document's full original-case path and
//! child order is significant: breadcrumbs are child-index paths into it.
//!
//! Builders make a single sorted pass with a stack of open folder frames.
//! Breadcrumb search and serialization walk the tree with explicit
//! `(node, cursor)` frame stacks instead of recursion.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Rooted, ordered navigation tree. The root has an empty name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NavTree {
    pub name: String,
    pub children: Vec<NavTree>,
}

/// Folder-first ordering of split paths.
///
/// Only the folder segments both paths share are compared; if those are equal
/// the deeper path sorts first, and same-depth paths compare by last segment.
fn compare_folders(x: &[&str], y: &[&str]) -> Ordering {
    let shared_folders = x.len().min(y.len()).saturating_sub(1);
    for (a, b) in x.iter().zip(y).take(shared_folders) {
        match a.cmp(b) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    if x.len() == y.len() {
        x.last().cmp(&y.last())
    } else {
        y.len().cmp(&x.len())
    }
}

/// Advance the cursor of the innermost frame.
fn advance(stack: &mut [(&NavTree, usize)]) {
    if let Some(top) = stack.last_mut() {
        top.1 += 1;
    }
}

impl NavTree {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// True if the tree has no entries below the root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Node reached by following `path` child indices from `self`.
    fn node_mut(&mut self, path: &[usize]) -> &mut NavTree {
        let mut node = self;
        for &i in path {
            node = &mut node.children[i];
        }
        node
    }

    /// Append `child` under the node at `path`, returning its index.
    fn push_at(&mut self, path: &[usize], child: NavTree) -> usize {
        let parent = self.node_mut(path);
        parent.children.push(child);
        parent.children.len() - 1
    }

    /// Build the folder tree for `(path, modified)` pages.
    ///
    /// Folder nodes are named by segment; leaves carry the full path. A page
    /// whose path equals an open folder's name still becomes its own leaf.
    #[must_use]
    pub fn topical_of(pages: &[(String, DateTime<Utc>)]) -> Self {
        let mut sorted: Vec<(&str, Vec<&str>)> = pages
            .iter()
            .map(|(path, _)| (path.as_str(), path.split('/').collect()))
            .collect();
        sorted.sort_by(|a, b| compare_folders(&a.1, &b.1));

        let mut root = Self::default();
        // Open folders, one per depth: child index and segment name.
        let mut open: Vec<(usize, &str)> = Vec::new();

        for (path, segments) in &sorted {
            let folder_count = segments.len() - 1;
            let limit = open.len().min(folder_count);
            let shared = (0..limit)
                .take_while(|&d| open[d].1 == segments[d])
                .count();
            open.truncate(shared);

            for &segment in &segments[shared..folder_count] {
                let indices: Vec<usize> = open.iter().map(|f| f.0).collect();
                let idx = root.push_at(&indices, Self::new(segment));
                open.push((idx, segment));
            }
            let indices: Vec<usize> = open.iter().map(|f| f.0).collect();
            root.push_at(&indices, Self::new(*path));
        }
        root
    }

    /// Build the year / month / page tree for `(path, modified)` pages.
    ///
    /// Pages are ordered by modification time, ties broken by path.
    #[must_use]
    pub fn temporal_of(pages: &[(String, DateTime<Utc>)]) -> Self {
        let mut sorted: Vec<&(String, DateTime<Utc>)> = pages.iter().collect();
        sorted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut root = Self::default();
        let mut open: Vec<(usize, String)> = Vec::new();

        for (path, modified) in sorted {
            let levels = [
                modified.year().to_string(),
                MONTHS[modified.month0() as usize].to_owned(),
            ];
            let shared = open
                .iter()
                .zip(&levels)
                .take_while(|(frame, level)| frame.1 == **level)
                .count();
            open.truncate(shared);

            for level in &levels[shared..] {
                let indices: Vec<usize> = open.iter().map(|f| f.0).collect();
                let idx = root.push_at(&indices, Self::new(level.clone()));
                open.push((idx, level.clone()));
            }
            let indices: Vec<usize> = open.iter().map(|f| f.0).collect();
            root.push_at(&indices, Self::new(path.clone()));
        }
        root
    }

    /// Child-index path to `sub_address` in this tree.
    ///
    /// Follows the folder spine segment by segment; the last step looks for a
    /// leaf named by the full address. If any step misses, the address may not
    /// be decomposable (temporal trees, case differences), so the search falls
    /// back to [`create_breadcrumbs_temporal`](Self::create_breadcrumbs_temporal).
    /// Returns an empty path for a non-root or empty tree, or when nothing matches.
    #[must_use]
    pub fn create_breadcrumbs(&self, sub_address: &str) -> Vec<usize> {
        if !self.name.is_empty() || self.children.is_empty() {
            return Vec::new();
        }

        let segments: Vec<&str> = sub_address.split('/').collect();
        let mut result = Vec::with_capacity(segments.len());
        let mut level = &self.children;

        for segment in &segments[..segments.len() - 1] {
            let Some(idx) = level.iter().position(|c| c.name == *segment) else {
                return self.create_breadcrumbs_temporal(sub_address);
            };
            result.push(idx);
            level = &level[idx].children;
        }

        let leaf = level
            .iter()
            .position(|c| c.children.is_empty() && c.name == sub_address)
            .or_else(|| level.iter().position(|c| c.name == sub_address));
        match leaf {
            Some(idx) => {
                result.push(idx);
                result
            }
            None => self.create_breadcrumbs_temporal(sub_address),
        }
    }

    /// Child-index path to the first leaf whose name matches `sub_address`,
    /// ignoring case, found by depth-first search.
    #[must_use]
    pub fn create_breadcrumbs_temporal(&self, sub_address: &str) -> Vec<usize> {
        let target = sub_address.to_lowercase();
        let mut stack: Vec<(&NavTree, usize)> = vec![(self, 0)];

        while let Some(&(node, cursor)) = stack.last() {
            match node.children.get(cursor) {
                Some(next) if !next.children.is_empty() => stack.push((next, 0)),
                Some(next) => {
                    if next.name.to_lowercase() == target {
                        return stack.iter().map(|&(_, c)| c).collect();
                    }
                    advance(&mut stack);
                }
                None => {
                    stack.pop();
                    advance(&mut stack);
                }
            }
        }
        Vec::new()
    }

    /// Node names along a breadcrumb path, stopping at the first invalid index.
    #[must_use]
    pub fn trail(&self, breadcrumbs: &[usize]) -> Vec<&str> {
        let mut names = Vec::with_capacity(breadcrumbs.len());
        let mut node = self;
        for &idx in breadcrumbs {
            let Some(child) = node.children.get(idx) else {
                break;
            };
            names.push(child.name.as_str());
            node = child;
        }
        names
    }

    /// Flatten the tree into nested `["name", [children]]` JSON arrays.
    ///
    /// The output is the root's children array; an empty tree yields `""`.
    #[must_use]
    pub fn to_serializable(&self) -> String {
        if self.children.is_empty() {
            return String::new();
        }

        let mut out = String::with_capacity(100);
        out.push('[');
        let mut stack: Vec<(&NavTree, usize)> = vec![(self, 0)];

        while let Some(&(node, cursor)) = stack.last() {
            if let Some(next) = node.children.get(cursor) {
                if cursor > 0 {
                    out.push(',');
                }
                out.push('[');
                out.push_str(&serde_json::Value::String(next.name.clone()).to_string());
                out.push_str(",[");
                if next.children.is_empty() {
                    out.push_str("]]");
                    advance(&mut stack);
                } else {
                    stack.push((next, 0));
                }
            } else {
                stack.pop();
                if stack.is_empty() {
                    out.push(']');
                } else {
                    out.push_str("]]");
                    advance(&mut stack);
                }
            }
        }
        out
    }
}
