//! Run configuration.
//!
//! Values are layered, later sources overriding earlier ones:
//! 1. built-in defaults (the values below)
//! 2. `kwgraph.toml` in the working directory, or the file named by
//!    `KWGRAPH_CONFIG`; a missing file is skipped
//! 3. environment variables prefixed with `KWGRAPH_`, using `__` between
//!    nested keys, e.g. `KWGRAPH_LAYOUT__SEED=7`
//!
//! ```toml
//! keywords = ["sushi", "milk", "pizza"]
//!
//! [layout]
//! seed = 42
//!
//! [render.restaurant]
//! color = "lightgreen"
//! size = 500.0
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_CONFIG_FILE: &str = "kwgraph.toml";
pub const CONFIG_PATH_VAR: &str = "KWGRAPH_CONFIG";
const ENV_PREFIX: &str = "KWGRAPH_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Dataset to read.
    #[serde(default = "default_input")]
    pub input: PathBuf,

    /// Where the rendered SVG figure is written.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Keywords allowed to appear as graph nodes.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Seed for the initial node positions.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Upper bound on spring layout iterations.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_title")]
    pub title: String,

    /// Figure width in inches.
    #[serde(default = "default_width_in")]
    pub width_in: f64,

    /// Figure height in inches.
    #[serde(default = "default_height_in")]
    pub height_in: f64,

    /// Pixels per inch; also converts point sizes to pixels.
    #[serde(default = "default_dpi")]
    pub dpi: f64,

    #[serde(default = "default_restaurant_style")]
    pub restaurant: NodeStyle,

    #[serde(default = "default_keyword_style")]
    pub keyword: NodeStyle,

    /// Edge line width in points.
    #[serde(default = "default_edge_width")]
    pub edge_width: f64,

    /// Node label font size in points.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    /// Color name (e.g. `lightgreen`) or `#rrggbb`.
    pub color: String,

    /// Marker area in points squared.
    pub size: f64,

    /// Legend entry for this node category.
    pub legend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub default: String,
}

fn default_input() -> PathBuf {
    PathBuf::from("edinburgh_knn2rest.json")
}

fn default_output() -> PathBuf {
    PathBuf::from("keyword_restaurant_graph.svg")
}

fn default_keywords() -> Vec<String> {
    ["sushi", "milk", "pizza"].iter().map(|s| s.to_string()).collect()
}

fn default_seed() -> u64 {
    42
}

fn default_iterations() -> usize {
    50
}

fn default_title() -> String {
    "Keyword-Restaurant Relationships for Selected Keywords".to_string()
}

fn default_width_in() -> f64 {
    12.0
}

fn default_height_in() -> f64 {
    8.0
}

fn default_dpi() -> f64 {
    100.0
}

fn default_restaurant_style() -> NodeStyle {
    NodeStyle {
        color: "lightgreen".to_string(),
        size: 500.0,
        legend: "Restaurants".to_string(),
    }
}

fn default_keyword_style() -> NodeStyle {
    NodeStyle {
        color: "lightblue".to_string(),
        size: 400.0,
        legend: "Keywords".to_string(),
    }
}

fn default_edge_width() -> f64 {
    1.2
}

fn default_font_size() -> f64 {
    10.0
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: default_output(),
            keywords: default_keywords(),
            layout: LayoutConfig::default(),
            render: RenderConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            iterations: default_iterations(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width_in: default_width_in(),
            height_in: default_height_in(),
            dpi: default_dpi(),
            restaurant: default_restaurant_style(),
            keyword: default_keyword_style(),
            edge_width: default_edge_width(),
            font_size: default_font_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings from the default locations.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load_from(&path)
    }

    /// Load settings using `path` as the TOML layer.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
            .extract()?;
        Ok(settings)
    }

    pub fn allow_list(&self) -> HashSet<String> {
        self.keywords.iter().cloned().collect()
    }
}
