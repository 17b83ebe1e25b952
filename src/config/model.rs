// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::{FailurePolicy, ReloadKind};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// default = "build"
/// failure_policy = "continue"
///
/// [paths.styles]
/// src = "_assets/styles/**/*.scss"
/// dest = ["assets/css", "_site/assets/css"]
///
/// [tools]
/// generator = "bundle exec jekyll build"
/// ```
///
/// Every section is optional; an empty file describes the stock Jekyll
/// layout. Use `ConfigFile::try_from` (see `validate.rs`) to get a checked
/// configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub paths: RawPathsSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub serve: ServeSection,

    /// `${NAME}` substitutions available to every tool command.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// `[[watch]]` tables. When present they replace the default bindings.
    #[serde(default)]
    pub watch: Vec<WatchConfig>,
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawConfigFile>`, so asset destinations
/// are always resolved and bounded.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub paths: PathsSection,
    pub tools: ToolsSection,
    pub serve: ServeSection,
    pub variables: BTreeMap<String, String>,
    pub watch: Vec<WatchConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile, paths: PathsSection) -> Self {
        Self {
            config: raw.config,
            paths,
            tools: raw.tools,
            serve: raw.serve,
            variables: raw.variables,
            watch: raw.watch,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Task or pipeline run when none is given on the command line.
    #[serde(default = "default_task")]
    pub default: String,

    /// `"continue"` (default) or `"fail-fast"`.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Maximum number of queued trigger batches while a rebuild runs.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_task() -> String {
    "build".to_string()
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            default: default_task(),
            failure_policy: FailurePolicy::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// Asset categories with their own source glob and destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AssetKind {
    Scripts,
    VendorScripts,
    Styles,
    Images,
    Fonts,
}

impl AssetKind {
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Scripts,
        AssetKind::VendorScripts,
        AssetKind::Styles,
        AssetKind::Images,
        AssetKind::Fonts,
    ];

    /// Key used in `[paths.<key>]`.
    pub fn key(self) -> &'static str {
        match self {
            AssetKind::Scripts => "scripts",
            AssetKind::VendorScripts => "vendor_scripts",
            AssetKind::Styles => "styles",
            AssetKind::Images => "images",
            AssetKind::Fonts => "fonts",
        }
    }

    /// Subdirectory below the staging root.
    fn dir(self) -> &'static str {
        match self {
            AssetKind::Scripts | AssetKind::VendorScripts => "js",
            AssetKind::Styles => "css",
            AssetKind::Images => "img",
            AssetKind::Fonts => "fonts",
        }
    }

    fn default_src(self) -> &'static str {
        match self {
            AssetKind::Scripts => "_assets/js/*.js",
            AssetKind::VendorScripts => "_assets/js/vendor/**/*.js",
            AssetKind::Styles => "_assets/styles/**/*.scss",
            AssetKind::Images => "_assets/img/**/*",
            AssetKind::Fonts => "_assets/fonts/**/*.*",
        }
    }

    /// Default destinations: the staging directory read by the generator and
    /// the same location inside the already generated site.
    pub fn default_dest(self, site_dir: &Path, staging_dir: &Path) -> Vec<PathBuf> {
        vec![
            staging_dir.join(self.dir()),
            site_dir.join(staging_dir).join(self.dir()),
        ]
    }
}

/// `[paths]` section as written in the file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPathsSection {
    #[serde(default = "default_site_dir")]
    pub site_dir: PathBuf,

    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    #[serde(default)]
    pub scripts: Option<RawAssetPaths>,
    #[serde(default)]
    pub vendor_scripts: Option<RawAssetPaths>,
    #[serde(default)]
    pub styles: Option<RawAssetPaths>,
    #[serde(default)]
    pub images: Option<RawAssetPaths>,
    #[serde(default)]
    pub fonts: Option<RawAssetPaths>,
}

fn default_site_dir() -> PathBuf {
    PathBuf::from("_site")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("assets")
}

impl Default for RawPathsSection {
    fn default() -> Self {
        Self {
            site_dir: default_site_dir(),
            staging_dir: default_staging_dir(),
            scripts: None,
            vendor_scripts: None,
            styles: None,
            images: None,
            fonts: None,
        }
    }
}

impl RawPathsSection {
    pub fn get(&self, kind: AssetKind) -> Option<&RawAssetPaths> {
        match kind {
            AssetKind::Scripts => self.scripts.as_ref(),
            AssetKind::VendorScripts => self.vendor_scripts.as_ref(),
            AssetKind::Styles => self.styles.as_ref(),
            AssetKind::Images => self.images.as_ref(),
            AssetKind::Fonts => self.fonts.as_ref(),
        }
    }
}

/// `[paths.<category>]` as written; both keys fall back to defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAssetPaths {
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub dest: Option<Vec<PathBuf>>,
}

/// Source glob plus one or two destination directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub src: String,
    pub dest: Vec<PathBuf>,
}

/// Resolved `[paths]`.
#[derive(Debug, Clone)]
pub struct PathsSection {
    pub site_dir: PathBuf,
    pub staging_dir: PathBuf,
    assets: BTreeMap<AssetKind, AssetPaths>,
}

impl PathsSection {
    pub(crate) fn new(
        site_dir: PathBuf,
        staging_dir: PathBuf,
        assets: BTreeMap<AssetKind, AssetPaths>,
    ) -> Self {
        Self {
            site_dir,
            staging_dir,
            assets,
        }
    }

    /// Paths for one category. Validation guarantees every category exists.
    pub fn asset(&self, kind: AssetKind) -> &AssetPaths {
        &self.assets[&kind]
    }
}

pub(crate) fn resolve_asset(raw: &RawPathsSection, kind: AssetKind) -> AssetPaths {
    let entry = raw.get(kind).cloned().unwrap_or_default();
    AssetPaths {
        src: entry.src.unwrap_or_else(|| kind.default_src().to_string()),
        dest: entry
            .dest
            .unwrap_or_else(|| kind.default_dest(&raw.site_dir, &raw.staging_dir)),
    }
}

/// `[tools]` section: command templates for the external collaborators.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// Transpile + minify `${input}` into `${output}`, with a source map at
    /// `${map}`.
    #[serde(default = "default_scripts_tool")]
    pub scripts: String,

    #[serde(default = "default_vendor_scripts_tool")]
    pub vendor_scripts: String,

    #[serde(default = "default_generator")]
    pub generator: String,

    /// Generator command used by `build:jekyll:local` (drafts on).
    #[serde(default = "default_generator_local")]
    pub generator_local: String,

    #[serde(default = "default_validator")]
    pub validator: String,

    /// Validator used when `COMMIT_REF` is set (CI builds).
    #[serde(default = "default_validator_ci")]
    pub validator_ci: String,

    /// Whether `test:htmltest` actually runs the validator.
    #[serde(default)]
    pub validate: bool,

    /// Browserslist queries used for vendor prefixing.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
}

fn default_scripts_tool() -> String {
    "npx babel --presets=@babel/preset-env --minified --source-maps ${input} --out-file ${output}"
        .to_string()
}

fn default_vendor_scripts_tool() -> String {
    "npx babel --presets=@babel/preset-env --minified ${input} --out-file ${output}".to_string()
}

fn default_generator() -> String {
    "bundle exec jekyll build".to_string()
}

fn default_generator_local() -> String {
    "bundle exec jekyll build -D".to_string()
}

fn default_validator() -> String {
    "htmltest".to_string()
}

fn default_validator_ci() -> String {
    "vendor/htmltest".to_string()
}

fn default_browsers() -> Vec<String> {
    vec!["last 2 versions".to_string()]
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            scripts: default_scripts_tool(),
            vendor_scripts: default_vendor_scripts_tool(),
            generator: default_generator(),
            generator_local: default_generator_local(),
            validator: default_validator(),
            validator_ci: default_validator_ci(),
            validate: false,
            browsers: default_browsers(),
        }
    }
}

/// `[serve]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Also watch `_drafts/`.
    #[serde(default)]
    pub drafts: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            drafts: false,
        }
    }
}

/// `[[watch]]` table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WatchConfig {
    pub name: String,

    /// Globs relative to the project root.
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Tasks re-run when a matching file changes.
    pub tasks: Vec<String>,

    #[serde(default)]
    pub reload: ReloadKind,
}
