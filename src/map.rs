use crate::color::{Palette, Rgb};
use crate::config::MapConfig;
use crate::projection::Albers;
use crate::scale::QuantileScale;
use crate::scene::{MapLayer, Shape};
use crate::state::ViewState;
use crate::types::Feature;
use rayon::prelude::*;

/// Projected outlines, computed once; geometry never changes after load.
#[derive(Debug, Clone)]
pub struct MapCanvas {
    pub width: f64,
    pub height: f64,
    /// SVG path data, parallel to the feature list.
    pub paths: Vec<String>,
}

impl MapCanvas {
    pub fn project(features: &[Feature], config: &MapConfig) -> Self {
        let albers = Albers::new(&config.projection, (config.width, config.height));
        let paths = features
            .par_iter()
            .map(|feature| albers.path_data(&feature.geometry))
            .collect();
        Self {
            width: config.width,
            height: config.height,
            paths,
        }
    }
}

/// Fill color of a feature: its bucket color, or the fallback when it has no value.
pub fn feature_fill(
    feature: &Feature,
    attribute: &str,
    scale: &QuantileScale<Rgb>,
    palette: &Palette,
) -> Rgb {
    feature
        .value(attribute)
        .and_then(|v| scale.apply(v))
        .copied()
        .unwrap_or(palette.fallback)
}

pub fn draw_map(
    features: &[Feature],
    canvas: &MapCanvas,
    scale: &QuantileScale<Rgb>,
    view: &ViewState,
    palette: &Palette,
) -> MapLayer {
    let shapes = features
        .iter()
        .zip(&canvas.paths)
        .map(|(feature, path)| Shape {
            key: feature.key.clone(),
            path: path.clone(),
            fill: feature_fill(feature, &view.attribute, scale, palette),
            emphasized: view.is_highlighted(feature.key.as_deref()),
        })
        .collect();

    MapLayer {
        width: canvas.width,
        height: canvas.height,
        shapes,
    }
}
