//! Targeted substring rewriting of staged documents and scripts.
//!
//! None of this parses HTML. Each function scans for a few literal markers
//! (`<body>`, `src="`, `<script`, leading `import` lines) and rewrites or
//! extracts what sits between them.

use std::collections::BTreeSet;
use std::path::Path;

use folio_storage::Storage;

use crate::error::RewriteError;
use crate::layout::GLOBALS_DIR;
use crate::paths::{find_ignore_case, subfolder_of};

const SRC_ATTR: &str = "src=\"";

/// Body and style extracted from a staged HTML file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyStyle<'a> {
    /// Text between the first `<body>` and the last `</body>`.
    pub body: &'a str,
    /// Trimmed contents of the first `<style>` block before `<body>`, or empty.
    pub style: String,
}

/// Extract the body and head style of an HTML document.
///
/// Returns `None` when the document should be treated as deleted: a body tag is
/// missing, the closing tag precedes the opening one, or the body is empty or
/// whitespace-only.
#[must_use]
pub fn extract_body_style(html: &str) -> Option<BodyStyle<'_>> {
    const OPEN: &str = "<body>";
    const CLOSE: &str = "</body>";

    let start = html.find(OPEN)?;
    let end = html.rfind(CLOSE)?;
    if end < start + OPEN.len() + 1 {
        return None;
    }
    let body = &html[start + OPEN.len()..end];
    if body.trim().is_empty() {
        return None;
    }

    let head = &html[..start];
    let style = head
        .find("<style>")
        .and_then(|s| {
            let inner = s + "<style>".len();
            head[inner..].find("</style>").map(|e| head[inner..inner + e].trim())
        })
        .unwrap_or_default()
        .to_owned();

    Some(BodyStyle { body, style })
}

/// Where media links point and how referenced files are discovered.
pub struct LinkContext<'a> {
    /// Used to check whether a referenced media file exists in staging.
    pub storage: &'a dyn Storage,
    /// Staging folder the document was read from.
    pub source_dir: &'a Path,
    /// Public media prefix, e.g. `/blog/_m/`.
    pub media_url_prefix: &'a str,
}

/// True for links that can name a file inside the staging folder.
fn is_local_link(link: &str) -> bool {
    !link.is_empty()
        && !link.starts_with('/')
        && !link.contains("://")
        && !link.split('/').any(|s| s == "..")
}

/// Rewrite every `src="..."` attribute to the public media path.
///
/// `logical_path` is the document's staging-relative path without extension.
/// Links resolve against its sub-folder; each one that names an existing staged
/// file is added to `media` (staging-relative) for migration. An attribute with
/// no closing quote ends the scan and the remainder is copied verbatim.
pub fn rewrite_links(
    content: &str,
    logical_path: &str,
    ctx: &LinkContext<'_>,
    media: &mut BTreeSet<String>,
) -> String {
    let subfolder = subfolder_of(logical_path);
    let mut out = String::with_capacity(content.len() + 100);
    let mut rest = content;

    while let Some(start) = rest.find(SRC_ATTR) {
        let value_start = start + SRC_ATTR.len();
        out.push_str(&rest[..value_start]);
        let after = &rest[value_start..];
        let Some(end) = after.find('"') else {
            out.push_str(after);
            return out;
        };

        let link = &after[..end];
        out.push_str(ctx.media_url_prefix);
        out.push_str(&subfolder);
        out.push_str(link);

        if is_local_link(link) {
            let rel = format!("{subfolder}{link}");
            if ctx.storage.exists(&ctx.source_dir.join(&rel)) {
                media.insert(rel);
            }
        }
        rest = &after[end..];
    }

    out.push_str(rest);
    out
}

/// Collect module ids required by `<script src="...">` tags inside `<head>`.
///
/// A source starting with `./` resolves against `subfolder` (which carries its
/// trailing `/`); anything else is a global module under `_g/`. Tag and suffix
/// matching is case-insensitive.
#[must_use]
pub fn parse_script_deps(html: &str, subfolder: &str) -> Vec<String> {
    let mut deps = Vec::new();
    let Some(head_start) = find_ignore_case(html, "<head>", 0) else {
        return deps;
    };
    let Some(head_end) = find_ignore_case(html, "</head>", head_start) else {
        return deps;
    };
    let head = &html[head_start + "<head>".len()..head_end];

    let mut cursor = 0;
    while let Some(tag) = find_ignore_case(head, "<script", cursor) {
        let attrs_start = tag + "<script".len();
        let attrs_end = head[attrs_start..]
            .find('>')
            .map_or(head.len(), |i| attrs_start + i);
        cursor = attrs_end;

        let Some(src) = head[attrs_start..attrs_end]
            .split_whitespace()
            .find(|token| token.starts_with(SRC_ATTR))
        else {
            continue;
        };
        let Some(js) = find_ignore_case(src, ".js", SRC_ATTR.len()) else {
            continue;
        };

        let raw = &src[SRC_ATTR.len()..js];
        match raw.strip_prefix("./") {
            Some(local) => deps.push(format!("{subfolder}{local}")),
            None => deps.push(format!("{GLOBALS_DIR}/{raw}")),
        }
    }
    deps
}

/// Rewrite the leading block of `import` lines of a script module.
///
/// `"global/x"` becomes `"<scripts_url_prefix>_g/x"` and `"./x"` becomes
/// `"<scripts_url_prefix><subfolder>x"`. Lines after the first non-import line
/// are left untouched.
pub fn rewrite_script_imports(
    script: &str,
    subfolder: &str,
    scripts_url_prefix: &str,
) -> Result<String, RewriteError> {
    let mut lines: Vec<String> = script.split('\n').map(str::to_owned).collect();

    for (idx, line) in lines.iter_mut().enumerate() {
        if !line.starts_with("import") {
            break;
        }
        let Some(quote) = line.find('"') else {
            return Err(RewriteError::MissingQuote { line: idx + 1 });
        };
        let (head, tail) = line.split_at(quote + 1);

        let rewritten = if let Some(rest) = tail.strip_prefix("global/") {
            format!("{head}{scripts_url_prefix}{GLOBALS_DIR}/{rest}")
        } else if let Some(rest) = tail.strip_prefix("./") {
            format!("{head}{scripts_url_prefix}{subfolder}{rest}")
        } else {
            let path = tail.split('"').next().unwrap_or_default().to_owned();
            return Err(RewriteError::UnsupportedPath {
                line: idx + 1,
                path,
            });
        };
        *line = rewritten;
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use folio_storage_fs::FsStorage;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_extract_body_style() {
        let html = "<html><head><style> p { color: red; } </style></head>\
                    <body><p>Hi</p></body></html>";

        let extracted = extract_body_style(html).unwrap();

        assert_eq!(extracted.body, "<p>Hi</p>");
        assert_eq!(extracted.style, "p { color: red; }");
    }

    #[test]
    fn test_extract_body_style_uses_last_closing_tag() {
        let html = "<body>a</body>b</body>";

        assert_eq!(extract_body_style(html).unwrap().body, "a</body>b");
    }

    #[test]
    fn test_extract_body_style_whitespace_body_is_none() {
        assert!(extract_body_style("<html><body>   </body></html>").is_none());
    }

    #[test]
    fn test_extract_body_style_missing_or_reversed_tags_is_none() {
        assert!(extract_body_style("<html><p>no body</p></html>").is_none());
        assert!(extract_body_style("<body><p>open only</p>").is_none());
        assert!(extract_body_style("</body> text <body>").is_none());
        assert!(extract_body_style("<body></body>").is_none());
    }

    #[test]
    fn test_extract_body_style_ignores_style_inside_body() {
        let html = "<body><style>x</style><p>y</p></body>";

        assert_eq!(extract_body_style(html).unwrap().style, "");
    }

    #[test]
    fn test_rewrite_links_records_existing_media_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let staging = temp_dir.path();
        fs::create_dir_all(staging.join("topic")).unwrap();
        fs::write(staging.join("topic/pic.png"), "png").unwrap();
        let storage = FsStorage::new();
        let ctx = LinkContext {
            storage: &storage,
            source_dir: staging,
            media_url_prefix: "/blog/_m/",
        };
        let mut media = BTreeSet::new();

        let out = rewrite_links(
            r#"<img src="pic.png"><img src="pic.png"><img src="gone.png">"#,
            "topic/page",
            &ctx,
            &mut media,
        );

        assert_eq!(
            out,
            r#"<img src="/blog/_m/topic/pic.png"><img src="/blog/_m/topic/pic.png"><img src="/blog/_m/topic/gone.png">"#
        );
        assert_eq!(media.into_iter().collect::<Vec<_>>(), vec!["topic/pic.png"]);
    }

    #[test]
    fn test_rewrite_links_top_level_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new();
        let ctx = LinkContext {
            storage: &storage,
            source_dir: temp_dir.path(),
            media_url_prefix: "/blog/_m/",
        };
        let mut media = BTreeSet::new();

        let out = rewrite_links(r#"<img src="a.png">"#, "page", &ctx, &mut media);

        assert_eq!(out, r#"<img src="/blog/_m/a.png">"#);
        assert!(media.is_empty());
    }

    #[test]
    fn test_rewrite_links_unterminated_attribute() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new();
        let ctx = LinkContext {
            storage: &storage,
            source_dir: temp_dir.path(),
            media_url_prefix: "/blog/_m/",
        };
        let mut media = BTreeSet::new();

        let out = rewrite_links(r#"<img src="a.png>"#, "page", &ctx, &mut media);

        assert_eq!(out, r#"<img src="a.png>"#);
    }

    #[test]
    fn test_rewrite_links_never_records_parent_escapes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let staging = temp_dir.path().join("_ingest");
        fs::create_dir_all(&staging).unwrap();
        fs::write(temp_dir.path().join("secret.txt"), "x").unwrap();
        let storage = FsStorage::new();
        let ctx = LinkContext {
            storage: &storage,
            source_dir: &staging,
            media_url_prefix: "/blog/_m/",
        };
        let mut media = BTreeSet::new();

        rewrite_links(r#"<img src="../secret.txt">"#, "page", &ctx, &mut media);

        assert!(media.is_empty());
    }

    #[test]
    fn test_parse_script_deps_global() {
        let html = r#"<html><head><script type="module" src="foo.js" /></head><body><div>x</div></body></html>"#;

        assert_eq!(parse_script_deps(html, "asdf/"), vec!["_g/foo"]);
    }

    #[test]
    fn test_parse_script_deps_mixed() {
        let html = r#"<html><HEAD>
<script type="module" src="foo.js" />
<script type="module" src="./bar/baz.js" />
<SCRIPT type="module" src="./another.JS" />
<script>inline()</script>
</head><body><script src="./ignored.js"></script></body></html>"#;

        assert_eq!(
            parse_script_deps(html, "asdf/"),
            vec!["_g/foo", "asdf/bar/baz", "asdf/another"]
        );
    }

    #[test]
    fn test_parse_script_deps_top_level_local() {
        let html = r#"<head><script src="./gcBenchmark.js"></script></head>"#;

        assert_eq!(parse_script_deps(html, ""), vec!["gcBenchmark"]);
    }

    #[test]
    fn test_parse_script_deps_without_head() {
        assert!(parse_script_deps("<body><script src=\"x.js\"></script></body>", "").is_empty());
    }

    #[test]
    fn test_rewrite_script_imports() {
        let script = "import { a } from \"global/util.js\";\n\
                      import { b } from \"./local.js\";\n\
                      const c = 1;";

        let out = rewrite_script_imports(script, "topic/", "/blog/_s/").unwrap();

        assert_eq!(
            out,
            "import { a } from \"/blog/_s/_g/util.js\";\n\
             import { b } from \"/blog/_s/topic/local.js\";\n\
             const c = 1;"
        );
    }

    #[test]
    fn test_rewrite_script_imports_only_leading_block() {
        let script = "const x = 1;\nimport { a } from \"weird\";";

        assert_eq!(
            rewrite_script_imports(script, "", "/blog/_s/").unwrap(),
            script
        );
    }

    #[test]
    fn test_rewrite_script_imports_unsupported_path() {
        let script = "import { a } from \"./ok.js\";\nimport { b } from \"https://cdn/x.js\";";

        let err = rewrite_script_imports(script, "", "/blog/_s/").unwrap_err();

        assert_eq!(
            err,
            RewriteError::UnsupportedPath {
                line: 2,
                path: "https://cdn/x.js".to_owned(),
            }
        );
    }

    #[test]
    fn test_rewrite_script_imports_missing_quote() {
        let err = rewrite_script_imports("import x from 'x.js';", "", "/blog/_s/").unwrap_err();

        assert_eq!(err, RewriteError::MissingQuote { line: 1 });
    }
}
