use crate::chart::draw_chart;
use crate::color::Palette;
use crate::config::AppConfig;
use crate::controller::Controller;
use crate::legend::draw_legend;
use crate::map::{draw_map, MapCanvas};
use crate::scene::{Scene, Stroke};
use crate::state::ViewState;
use crate::svg;
use crate::types::Dataset;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// The full visual state for `view`. Pure: equal inputs give equal scenes.
pub fn render_scene(
    dataset: &Dataset,
    canvas: &MapCanvas,
    view: &ViewState,
    config: &AppConfig,
    palette: &Palette,
) -> Scene {
    let scale = palette.scale_for(&dataset.records, &view.attribute);
    debug!(attribute = %view.attribute, thresholds = ?scale.thresholds(), "Color scale built");
    Scene {
        attribute: view.attribute.clone(),
        highlight: Stroke {
            color: palette.highlight_stroke,
            width: palette.highlight_width,
        },
        map: draw_map(&dataset.features, canvas, &scale, view, palette),
        chart: draw_chart(&dataset.records, &scale, view, &config.chart, palette),
        legend: draw_legend(&scale),
    }
}

/// Writes `<output>/<attribute>.svg` for each attribute.
pub fn generate_documents(
    config: &AppConfig,
    dataset: &Dataset,
    canvas: &MapCanvas,
    palette: &Palette,
    attributes: &[String],
    highlight: Option<&str>,
) -> Result<Vec<PathBuf>> {
    info!(
        "Rendering {} attribute(s) to {:?}...",
        attributes.len(),
        config.output.dir
    );
    fs::create_dir_all(&config.output.dir).context("Failed to create output directory")?;

    attributes
        .par_iter()
        .map(|attribute| {
            let mut view = ViewState::new(attribute.as_str());
            if let Some(key) = highlight {
                view.hover(key);
            }
            let scene = render_scene(dataset, canvas, &view, config, palette);
            let path = config.output.dir.join(format!("{}.svg", file_stem(attribute)));
            write_svg(&path, &scene)?;
            Ok(path)
        })
        .collect()
}

/// Writes the frames of the transition from `from` to `to`, sampled at `fps`,
/// into `<output>/frames/<from>-<to>/`.
pub fn write_frames(
    config: &AppConfig,
    controller: &mut Controller,
    from: &str,
    to: &str,
    fps: u32,
) -> Result<Vec<PathBuf>> {
    let duration = Duration::from_millis(config.transition.duration_ms);
    let dir = config
        .output
        .dir
        .join("frames")
        .join(format!("{}-{}", file_stem(from), file_stem(to)));
    fs::create_dir_all(&dir).context("Failed to create frame directory")?;

    // Settle on `from` first so the animation starts from a still image.
    controller.select(from, Duration::ZERO)?;
    controller.select(to, duration)?;

    let interval = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let mut paths = Vec::new();
    let mut elapsed = Duration::ZERO;
    loop {
        let now = duration + elapsed;
        let path = dir.join(format!("frame-{:04}.svg", paths.len()));
        write_svg(&path, &controller.frame(now))?;
        paths.push(path);
        if !controller.is_animating(now) {
            break;
        }
        elapsed += interval;
    }

    info!("Wrote {} frames to {:?}", paths.len(), dir);
    Ok(paths)
}

fn write_svg(path: &Path, scene: &Scene) -> Result<()> {
    fs::write(path, svg::document(scene))
        .with_context(|| format!("Failed to write {:?}", path))
}

fn file_stem(attribute: &str) -> String {
    attribute
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
