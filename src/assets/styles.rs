// src/assets/styles.rs

use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;
use tracing::{debug, warn};

use crate::assets::{SiteContext, SourceGlob};
use crate::config::AssetPaths;
use crate::task::{ArtifactSet, TaskAction, TaskError, TaskFuture};

/// Compiles every non-partial `.scss` entry, prefixes and minifies it for the
/// configured browsers and writes `<stem>.css` plus `<stem>.css.map` to
/// every destination.
#[derive(Debug, Clone)]
pub struct StyleBuild {
    ctx: SiteContext,
    paths: AssetPaths,
    browsers: Vec<String>,
}

impl StyleBuild {
    pub fn new(ctx: SiteContext, paths: AssetPaths, browsers: Vec<String>) -> Self {
        Self {
            ctx,
            paths,
            browsers,
        }
    }

    async fn run(&self) -> Result<ArtifactSet, TaskError> {
        let fs = self.ctx.fs.as_ref();
        let entries: Vec<PathBuf> = SourceGlob::new(&self.paths.src)?
            .expand(fs, &self.ctx.root)?
            .into_iter()
            .map(|f| f.path)
            .filter(|p| !is_partial(p))
            .collect();

        if entries.is_empty() {
            warn!(task = "build:styles", pattern = %self.paths.src, "no stylesheet entries matched");
            return Ok(ArtifactSet::new());
        }

        let mut artifacts = ArtifactSet::new();
        for entry in entries {
            let Some(stem) = entry.file_stem() else {
                continue;
            };
            let css_name = format!("{}.css", stem.to_string_lossy());
            let map_name = format!("{css_name}.map");

            let browsers = self.browsers.clone();
            let node_modules = self.ctx.root.join("node_modules");
            let source = entry.clone();
            let root = self.ctx.root.clone();
            let compiled = tokio::task::spawn_blocking(move || {
                compile_stylesheet(&source, &root, &[node_modules], &browsers)
            })
            .await??;
            let css = format!("{}\n/*# sourceMappingURL={map_name} */\n", compiled.css);

            for dest in &self.paths.dest {
                let dir = self.ctx.resolve(dest);
                let css_path = dir.join(&css_name);
                let map_path = dir.join(&map_name);
                fs.write(&css_path, css.as_bytes())?;
                fs.write(&map_path, compiled.map.as_bytes())?;
                debug!(task = "build:styles", path = %css_path.display(), "wrote stylesheet");
                artifacts.push(css_path);
                artifacts.push(map_path);
            }
        }

        Ok(artifacts)
    }
}

impl TaskAction for StyleBuild {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(self.run())
    }
}

/// Sass partials (`_name.scss`) are only compiled through imports.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('_'))
        .unwrap_or(false)
}

/// Minified CSS and its source map (JSON, no trailing `sourceMappingURL`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStyle {
    pub css: String,
    pub map: String,
}

/// Compile one Sass entry to minified, prefixed CSS.
///
/// The entry's own directory and `load_paths` are searched for imports.
/// grass emits no source map of its own, so the map points into the
/// compiled CSS, registered under the entry's path relative to `root`.
pub fn compile_stylesheet(
    entry: &Path,
    root: &Path,
    load_paths: &[PathBuf],
    browsers: &[String],
) -> Result<CompiledStyle, TaskError> {
    let mut options = grass::Options::default();
    if let Some(parent) = entry.parent() {
        options = options.load_path(parent);
    }
    for path in load_paths {
        options = options.load_path(path);
    }

    let css = grass::from_path(entry, &options)
        .map_err(|e| TaskError::Style(format!("{}: {}", entry.display(), e)))?;

    let source_name = entry
        .strip_prefix(root)
        .unwrap_or(entry)
        .to_string_lossy()
        .replace('\\', "/");
    minify_css(&css, &source_name, browsers)
}

/// Add vendor prefixes for `browsers`, minify, and map the result back to
/// `css` (recorded as `filename`).
pub fn minify_css(
    css: &str,
    filename: &str,
    browsers: &[String],
) -> Result<CompiledStyle, TaskError> {
    let browsers = if browsers.is_empty() {
        None
    } else {
        Browsers::from_browserslist(browsers.iter().map(String::as_str))
            .map_err(|e| TaskError::Style(format!("browserslist: {e}")))?
    };
    let targets = Targets {
        browsers,
        ..Targets::default()
    };

    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| TaskError::Style(format!("CSS parse error: {e}")))?;

    stylesheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| TaskError::Style(format!("CSS minify error: {e}")))?;

    let mut map = SourceMap::new("/");
    let index = map.add_source(filename);
    map.set_source_content(index as usize, css)
        .map_err(|e| TaskError::Style(format!("source map: {e}")))?;

    let out = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: Some(&mut map),
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| TaskError::Style(format!("CSS print error: {e}")))?;

    let map = map
        .to_json(None)
        .map_err(|e| TaskError::Style(format!("source map: {e}")))?;

    Ok(CompiledStyle {
        css: out.code,
        map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partials_are_skipped() {
        assert!(is_partial(Path::new("_assets/styles/_variables.scss")));
        assert!(!is_partial(Path::new("_assets/styles/main.scss")));
    }

    #[test]
    fn compiles_imports_and_minifies() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("_vars.scss"), "$accent: #ff0000;").unwrap();
        std::fs::write(
            dir.path().join("main.scss"),
            "@import 'vars';\n.post {\n  a { color: $accent; }\n}\n",
        )
        .unwrap();

        let compiled = compile_stylesheet(
            &dir.path().join("main.scss"),
            dir.path(),
            &[],
            &["last 2 versions".into()],
        )
        .unwrap();
        assert_eq!(compiled.css, ".post a{color:red}");

        let map: serde_json::Value = serde_json::from_str(&compiled.map).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["sources"][0], "main.scss");
        assert!(!map["mappings"].as_str().unwrap().is_empty());
    }

    #[test]
    fn invalid_sass_is_a_style_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.scss"), ".a { color: $missing; }").unwrap();

        let err =
            compile_stylesheet(&dir.path().join("main.scss"), dir.path(), &[], &[]).unwrap_err();
        assert!(matches!(err, TaskError::Style(_)));
    }
}
