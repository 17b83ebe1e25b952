// src/server/html.rs

use std::path::{Path, PathBuf};

/// Tag inserted into every served HTML page.
pub const SCRIPT_TAG: &str = r#"<script src="/__livereload.js"></script>"#;

/// Map a request path to an HTML file under `root`, if it names one.
///
/// Handles `/`, `/dir/`, `/page.html`, extension-less directory paths
/// (`/dir`) and extension-less pages (`/about` -> `about.html`). Paths with
/// `..` segments never resolve.
pub fn resolve_html_path(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let trimmed = uri_path.trim_start_matches('/');
    let mut candidate = root.to_path_buf();
    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        if segment == ".." || segment == "." || segment.contains('\\') {
            return None;
        }
        candidate.push(segment);
    }

    if candidate.is_dir() {
        let index = candidate.join("index.html");
        return index.is_file().then_some(index);
    }

    if candidate.is_file() {
        let is_html = candidate
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
        return is_html.then_some(candidate);
    }

    if !trimmed.is_empty() && candidate.extension().is_none() {
        let page = candidate.with_extension("html");
        return page.is_file().then_some(page);
    }

    None
}

/// Insert the live-reload script before the last `</body>`, or append it
/// when the document has none.
pub fn inject_script(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + SCRIPT_TAG.len());
            out.push_str(&html[..idx]);
            out.push_str(SCRIPT_TAG);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{SCRIPT_TAG}"),
    }
}
