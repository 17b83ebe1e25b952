// src/pipeline.rs

//! The concrete site build: every built-in task unit, the `clean` group,
//! the `build` pipeline and the reload nodes used while serving.

use std::path::PathBuf;

use tracing::info;

use crate::assets::clean::Clean;
use crate::assets::fonts::FontCopy;
use crate::assets::images::ImageBuild;
use crate::assets::scripts::ScriptBundle;
use crate::assets::site::{Generate, Validate};
use crate::assets::styles::StyleBuild;
use crate::assets::SiteContext;
use crate::config::{AssetKind, ConfigFile, WatchConfig};
use crate::server::{LiveReload, ReloadMessage};
use crate::task::{ArtifactSet, Noop, TaskAction, TaskFuture, TaskGraph, TaskUnit};
use crate::types::ReloadKind;
use crate::watch::reload_node;

pub const BUILD: &str = "build";
pub const CLEAN: &str = "clean";

pub const BUILD_SCRIPTS: &str = "build:scripts";
pub const BUILD_VENDOR_SCRIPTS: &str = "build:vendor:scripts";
pub const BUILD_STYLES: &str = "build:styles";
pub const BUILD_IMAGES: &str = "build:images";
pub const BUILD_FONTS: &str = "build:fonts";
pub const BUILD_JEKYLL: &str = "build:jekyll";
pub const BUILD_JEKYLL_LOCAL: &str = "build:jekyll:local";

pub const CLEAN_SCRIPTS: &str = "clean:scripts";
pub const CLEAN_STYLES: &str = "clean:styles";
pub const CLEAN_IMAGES: &str = "clean:images";
pub const CLEAN_FONTS: &str = "clean:fonts";
pub const CLEAN_JEKYLL: &str = "clean:jekyll";

pub const TEST_HTMLTEST: &str = "test:htmltest";

/// Register every built-in task unit and the `build` pipeline.
///
/// The returned graph is not validated yet.
pub fn build_graph(cfg: &ConfigFile, ctx: &SiteContext) -> TaskGraph {
    let paths = &cfg.paths;
    let tools = &cfg.tools;
    let mut graph = TaskGraph::new();

    graph
        .add(
            TaskUnit::new(
                BUILD_SCRIPTS,
                ScriptBundle::main(ctx.clone(), paths.asset(AssetKind::Scripts).clone(), &tools.scripts),
            )
            .describe("Concatenate, transpile and minify scripts into main.js"),
        )
        .add(
            TaskUnit::new(
                BUILD_VENDOR_SCRIPTS,
                ScriptBundle::vendor(
                    ctx.clone(),
                    paths.asset(AssetKind::VendorScripts).clone(),
                    &tools.vendor_scripts,
                ),
            )
            .describe("Bundle vendor scripts into vendor.js"),
        )
        .add(
            TaskUnit::new(
                BUILD_STYLES,
                StyleBuild::new(
                    ctx.clone(),
                    paths.asset(AssetKind::Styles).clone(),
                    tools.browsers.clone(),
                ),
            )
            .describe("Compile, prefix and minify stylesheets"),
        )
        .add(
            TaskUnit::new(
                BUILD_IMAGES,
                ImageBuild::new(ctx.clone(), paths.asset(AssetKind::Images).clone()),
            )
            .describe("Optimise and copy images"),
        )
        .add(
            TaskUnit::new(
                BUILD_FONTS,
                FontCopy::new(ctx.clone(), paths.asset(AssetKind::Fonts).clone()),
            )
            .describe("Copy fonts"),
        )
        .add(
            TaskUnit::new(BUILD_JEKYLL, Generate::build(ctx.clone(), &tools.generator))
                .describe("Run the site generator"),
        )
        .add(
            TaskUnit::new(
                BUILD_JEKYLL_LOCAL,
                Generate::local(ctx.clone(), &tools.generator_local),
            )
            .describe("Run the site generator with drafts"),
        );

    let script_dirs: Vec<PathBuf> = [AssetKind::Scripts, AssetKind::VendorScripts]
        .into_iter()
        .flat_map(|kind| paths.asset(kind).dest.clone())
        .collect();

    graph
        .add(
            TaskUnit::new(
                CLEAN_SCRIPTS,
                Clean::files(CLEAN_SCRIPTS, ctx.clone(), dedup(script_dirs), vec![".js", ".js.map"]),
            )
            .describe("Delete built scripts"),
        )
        .add(
            TaskUnit::new(
                CLEAN_STYLES,
                Clean::files(
                    CLEAN_STYLES,
                    ctx.clone(),
                    paths.asset(AssetKind::Styles).dest.clone(),
                    vec![".css", ".css.map"],
                ),
            )
            .describe("Delete built stylesheets"),
        )
        .add(
            TaskUnit::new(
                CLEAN_IMAGES,
                Clean::dirs(CLEAN_IMAGES, ctx.clone(), paths.asset(AssetKind::Images).dest.clone()),
            )
            .describe("Delete image destinations"),
        )
        .add(
            TaskUnit::new(
                CLEAN_FONTS,
                Clean::dirs(CLEAN_FONTS, ctx.clone(), paths.asset(AssetKind::Fonts).dest.clone()),
            )
            .describe("Delete font destinations"),
        )
        .add(
            TaskUnit::new(
                CLEAN_JEKYLL,
                Clean::dirs(CLEAN_JEKYLL, ctx.clone(), vec![paths.site_dir.clone()]),
            )
            .describe("Delete the generated site"),
        )
        .add(
            TaskUnit::new(CLEAN, Noop)
                .depends_on([CLEAN_SCRIPTS, CLEAN_STYLES, CLEAN_IMAGES, CLEAN_FONTS, CLEAN_JEKYLL])
                .describe("Delete every generated artifact"),
        )
        .add(
            TaskUnit::new(
                TEST_HTMLTEST,
                Validate::new(
                    ctx.clone(),
                    tools.validate,
                    &tools.validator,
                    &tools.validator_ci,
                ),
            )
            .describe("Validate the generated HTML"),
        );

    graph.register_pipeline(
        BUILD,
        "Clean, build assets, generate the site and validate it",
        vec![
            vec![CLEAN],
            vec![
                BUILD_VENDOR_SCRIPTS,
                BUILD_SCRIPTS,
                BUILD_STYLES,
                BUILD_IMAGES,
                BUILD_FONTS,
            ],
            vec![BUILD_JEKYLL],
            vec![TEST_HTMLTEST],
        ],
    );

    graph
}

fn dedup(mut dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    dirs.sort();
    dirs.dedup();
    dirs
}

/// Watch bindings for `serve`: the `[[watch]]` tables when any are
/// configured, the stock bindings otherwise.
pub fn watch_bindings(cfg: &ConfigFile, drafts: bool) -> Vec<WatchConfig> {
    if cfg.watch.is_empty() {
        default_watch_bindings(cfg, drafts)
    } else {
        cfg.watch.clone()
    }
}

/// The stock bindings of a Jekyll site.
pub fn default_watch_bindings(cfg: &ConfigFile, drafts: bool) -> Vec<WatchConfig> {
    let paths = &cfg.paths;
    let site = generic_glob_dir(&paths.site_dir);

    let mut bindings = vec![
        jekyll_binding("config", vec!["_config.yml".to_string()], vec![]),
        WatchConfig {
            name: "styles".to_string(),
            patterns: vec![paths.asset(AssetKind::Styles).src.clone()],
            exclude: vec![],
            tasks: vec![BUILD_STYLES.to_string()],
            reload: ReloadKind::Inject,
        },
        WatchConfig {
            name: "scripts".to_string(),
            patterns: vec![paths.asset(AssetKind::Scripts).src.clone()],
            exclude: vec![],
            tasks: vec![BUILD_SCRIPTS.to_string()],
            reload: ReloadKind::Full,
        },
        WatchConfig {
            name: "vendor_scripts".to_string(),
            patterns: vec![paths.asset(AssetKind::VendorScripts).src.clone()],
            exclude: vec![],
            tasks: vec![BUILD_VENDOR_SCRIPTS.to_string()],
            reload: ReloadKind::Full,
        },
        WatchConfig {
            name: "images".to_string(),
            patterns: vec![paths.asset(AssetKind::Images).src.clone()],
            exclude: vec![],
            tasks: vec![BUILD_IMAGES.to_string()],
            reload: ReloadKind::Full,
        },
        jekyll_binding("posts", vec!["_posts/**/*.{md,markdown,MD}".to_string()], vec![]),
    ];

    if drafts {
        bindings.push(jekyll_binding(
            "drafts",
            vec!["_drafts/*.{md,markdown,MD}".to_string()],
            vec![],
        ));
    }

    bindings.extend([
        jekyll_binding(
            "pages",
            vec!["**/*.{html,md,markdown,MD}".to_string()],
            vec![format!("{site}/**"), "node_modules/**".to_string()],
        ),
        jekyll_binding("feed", vec!["feed.xml".to_string()], vec![]),
        jekyll_binding(
            "data",
            vec!["_data/**/*.{yml,yaml,csv,json}".to_string()],
            vec![],
        ),
        jekyll_binding("favicon", vec!["favicon.png".to_string()], vec![]),
    ]);

    bindings
}

fn jekyll_binding(name: &str, patterns: Vec<String>, exclude: Vec<String>) -> WatchConfig {
    WatchConfig {
        name: name.to_string(),
        patterns,
        exclude,
        tasks: vec![BUILD_JEKYLL_LOCAL.to_string()],
        reload: ReloadKind::Full,
    }
}

fn generic_glob_dir(dir: &std::path::Path) -> String {
    let s = dir.to_string_lossy().replace('\\', "/");
    s.trim_start_matches("./").trim_end_matches('/').to_string()
}

/// Add one reload node per binding. The node depends on exactly the
/// binding's tasks and notifies browsers once they have settled.
pub fn register_reload_nodes(graph: &mut TaskGraph, bindings: &[WatchConfig], hub: &LiveReload) {
    for binding in bindings {
        let action = ReloadAction {
            binding: binding.name.clone(),
            kind: binding.reload,
            hub: hub.clone(),
        };
        graph.add(
            TaskUnit::new(reload_node(&binding.name), action)
                .depends_on(binding.tasks.iter().cloned())
                .describe(format!("Rebuild and reload for '{}' changes", binding.name)),
        );
    }
}

/// Pushes a live-reload message for one binding.
#[derive(Debug, Clone)]
pub struct ReloadAction {
    binding: String,
    kind: ReloadKind,
    hub: LiveReload,
}

impl ReloadAction {
    pub fn message(&self) -> ReloadMessage {
        match self.kind {
            ReloadKind::Full => ReloadMessage::Reload,
            ReloadKind::Inject => ReloadMessage::InjectCss,
        }
    }
}

impl TaskAction for ReloadAction {
    fn execute(&self) -> TaskFuture<'_> {
        Box::pin(async move {
            let msg = self.message();
            info!(binding = %self.binding, ?msg, clients = self.hub.subscriber_count(), "reloading browsers");
            self.hub.send(msg);
            Ok(ArtifactSet::new())
        })
    }
}
