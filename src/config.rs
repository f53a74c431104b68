use crate::color::Rgb;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub attributes: AttributesConfig,
    #[serde(default)]
    pub colors: ColorConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub transition: TransitionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data_csv: PathBuf,
    /// TopoJSON, GeoJSON or Shapefile, picked by extension.
    pub geometry: PathBuf,
    /// Object layer to decode when `geometry` is a TopoJSON topology.
    #[serde(default = "default_object")]
    pub object: String,
    #[serde(default = "default_join_key")]
    pub join_key_csv: String,
    #[serde(default = "default_join_key")]
    pub join_key_geo: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AttributesConfig {
    /// Selectable attributes; the first one is shown initially.
    pub names: Vec<String>,
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self {
            names: ["broadband", "speed", "freedom", "cost", "social"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ColorConfig {
    /// Quantile buckets ordered light to dark. The bucket count is the length of this list.
    pub classes: Vec<String>,
    pub fallback: String,
    pub highlight_stroke: String,
    pub highlight_width: f64,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            classes: ["#edf8fb", "#b2e2e2", "#66c2a4", "#2ca25f", "#006d2c"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallback: "#ccc".to_string(),
            highlight_stroke: "#000".to_string(),
            highlight_width: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub width: f64,
    pub height: f64,
    pub projection: ProjectionConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 640.0,
            height: 500.0,
            projection: ProjectionConfig::default(),
        }
    }
}

/// Albers conic equal-area parameters, in degrees.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProjectionConfig {
    pub center: [f64; 2],
    /// `[lambda, phi]` or `[lambda, phi, gamma]`.
    pub rotate: Vec<f64>,
    pub parallels: [f64; 2],
    pub scale: f64,
    /// Defaults to the middle of the map viewport.
    pub translate: Option<[f64; 2]>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            center: [20.0, 52.0],
            rotate: vec![-10.0, 0.0],
            parallels: [40.0, 65.0],
            scale: 700.0,
            translate: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub bar_padding: f64,
    pub outer_padding: f64,
    /// `{attribute}` is replaced with the capitalized attribute name.
    pub title_template: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 550.0,
            height: 500.0,
            padding: 25.0,
            bar_padding: 0.1,
            outer_padding: 0.0,
            title_template: "Internet {attribute} by Country".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TransitionConfig {
    pub duration_ms: u64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self { duration_ms: 1000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

fn default_object() -> String {
    "europe".to_string()
}

fn default_join_key() -> String {
    "id".to_string()
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.attributes.names.is_empty() {
            bail!("At least one attribute must be configured");
        }
        if self.colors.classes.is_empty() {
            bail!("The color palette must contain at least one class");
        }
        for hex in self
            .colors
            .classes
            .iter()
            .chain([&self.colors.fallback, &self.colors.highlight_stroke])
        {
            Rgb::from_hex(hex).with_context(|| format!("Invalid color in configuration: {hex}"))?;
        }
        if !matches!(self.map.projection.rotate.len(), 2 | 3) {
            bail!("projection.rotate must have two or three angles");
        }
        if self.map.width <= 0.0 || self.map.height <= 0.0 {
            bail!("Map dimensions must be positive");
        }
        let inner_width = self.chart.width - 2.0 * self.chart.padding;
        let inner_height = self.chart.height - 2.0 * self.chart.padding;
        if inner_width <= 0.0 || inner_height <= 0.0 {
            bail!("Chart dimensions must exceed twice the padding");
        }
        if !(0.0..1.0).contains(&self.chart.bar_padding) {
            bail!("chart.bar_padding must be in [0, 1)");
        }
        Ok(())
    }

    /// Bucket count of the quantile color scale.
    pub fn bucket_count(&self) -> usize {
        self.colors.classes.len()
    }

    pub fn default_attribute(&self) -> &str {
        &self.attributes.names[0]
    }
}
