use crate::color::Palette;
use crate::config::AppConfig;
use crate::map::MapCanvas;
use crate::render::render_scene;
use crate::scene::Scene;
use crate::state::{Selection, ViewState};
use crate::transition::Transition;
use crate::types::Dataset;
use anyhow::Result;
use std::time::Duration;
use tracing::debug;

pub struct Controller {
    config: AppConfig,
    palette: Palette,
    dataset: Dataset,
    canvas: MapCanvas,
    selection: Selection,
    view: ViewState,
    transition: Transition,
}

impl Controller {
    /// `dataset` must already be joined.
    pub fn new(config: AppConfig, dataset: Dataset) -> Result<Self> {
        let palette = Palette::from_config(&config.colors)?;
        let selection = Selection::new(config.attributes.names.clone())?;
        let canvas = MapCanvas::project(&dataset.features, &config.map);
        let view = ViewState::new(selection.current());
        let scene = render_scene(&dataset, &canvas, &view, &config, &palette);
        Ok(Self {
            config,
            palette,
            dataset,
            canvas,
            selection,
            view,
            transition: Transition::settled(scene),
        })
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn scene(&self) -> &Scene {
        self.transition.target()
    }

    pub fn frame(&self, now: Duration) -> Scene {
        self.transition.sample(now)
    }

    pub fn is_animating(&self, now: Duration) -> bool {
        !self.transition.is_finished(now)
    }

    /// Animates from whatever was on screen at `now`.
    pub fn select(&mut self, attribute: &str, now: Duration) -> Result<&Scene> {
        let changed = self.selection.select(attribute)?;
        debug!(attribute, changed, "Attribute selected");
        self.view.attribute = self.selection.current().to_string();

        let current = self.transition.sample(now);
        let target = self.render();
        let duration = Duration::from_millis(self.config.transition.duration_ms);
        self.transition = Transition::new(current, target, now, duration);
        Ok(self.transition.target())
    }

    pub fn hover(&mut self, key: &str) -> &Scene {
        self.view.hover(key);
        self.retarget()
    }

    pub fn unhover(&mut self, key: &str) -> &Scene {
        self.view.unhover(key);
        self.retarget()
    }

    fn retarget(&mut self) -> &Scene {
        let target = self.render();
        self.transition.set_target(target);
        self.transition.target()
    }

    fn render(&self) -> Scene {
        render_scene(
            &self.dataset,
            &self.canvas,
            &self.view,
            &self.config,
            &self.palette,
        )
    }
}
