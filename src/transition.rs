use crate::scene::Scene;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Transition {
    from: Scene,
    to: Scene,
    started: Duration,
    duration: Duration,
}

/// d3's `easeCubicInOut`.
fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl Transition {
    pub fn new(from: Scene, to: Scene, started: Duration, duration: Duration) -> Self {
        Self {
            from,
            to,
            started,
            duration,
        }
    }

    pub fn settled(scene: Scene) -> Self {
        Self::new(scene.clone(), scene, Duration::ZERO, Duration::ZERO)
    }

    pub fn target(&self) -> &Scene {
        &self.to
    }

    /// Replaces the target without restarting the clock, for changes that
    /// do not animate (hover emphasis).
    pub fn set_target(&mut self, to: Scene) {
        self.to = to;
    }

    pub fn is_finished(&self, now: Duration) -> bool {
        now.saturating_sub(self.started) >= self.duration
    }

    pub fn progress(&self, now: Duration) -> f64 {
        if self.is_finished(now) {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.started).as_secs_f64();
        ease_cubic_in_out(elapsed / self.duration.as_secs_f64())
    }

    pub fn sample(&self, now: Duration) -> Scene {
        let t = self.progress(now);
        let mut scene = self.to.clone();
        if t >= 1.0 {
            return scene;
        }

        for (shape, start) in scene.map.shapes.iter_mut().zip(&self.from.map.shapes) {
            shape.fill = start.fill.lerp(shape.fill, t);
        }

        let previous: HashMap<&str, _> = self
            .from
            .chart
            .bars
            .iter()
            .map(|bar| (bar.key.as_str(), bar))
            .collect();
        for bar in &mut scene.chart.bars {
            if let Some(start) = previous.get(bar.key.as_str()) {
                bar.x = lerp(start.x, bar.x, t);
                bar.y = lerp(start.y, bar.y, t);
                bar.width = lerp(start.width, bar.width, t);
                bar.height = lerp(start.height, bar.height, t);
                bar.fill = start.fill.lerp(bar.fill, t);
            }
        }

        scene
    }
}
