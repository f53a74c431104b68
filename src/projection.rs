use crate::config::ProjectionConfig;
use geo::{Coord, MultiPolygon};
use std::f64::consts::{PI, TAU};
use std::fmt::Write;

const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
enum Raw {
    Conic { n: f64, c: f64, r0: f64 },
    /// Degenerate case of parallels symmetric about the equator.
    Cylindrical { cos_phi0: f64 },
}

impl Raw {
    fn new(phi0: f64, phi1: f64) -> Self {
        let sy0 = phi0.sin();
        let n = (sy0 + phi1.sin()) / 2.0;
        if n.abs() < EPSILON {
            return Raw::Cylindrical {
                cos_phi0: phi0.cos(),
            };
        }
        let c = 1.0 + sy0 * (2.0 * n - sy0);
        Raw::Conic {
            n,
            c,
            r0: c.sqrt() / n,
        }
    }

    fn project(&self, lambda: f64, phi: f64) -> (f64, f64) {
        match *self {
            Raw::Conic { n, c, r0 } => {
                let r = (c - 2.0 * n * phi.sin()).max(0.0).sqrt() / n;
                let x = lambda * n;
                (r * x.sin(), r0 - r * x.cos())
            }
            Raw::Cylindrical { cos_phi0 } => (lambda * cos_phi0, phi.sin() / cos_phi0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Rotation {
    delta_lambda: f64,
    cos_delta_phi: f64,
    sin_delta_phi: f64,
    cos_delta_gamma: f64,
    sin_delta_gamma: f64,
    tilted: bool,
}

impl Rotation {
    fn new(lambda: f64, phi: f64, gamma: f64) -> Self {
        Self {
            delta_lambda: lambda % TAU,
            cos_delta_phi: phi.cos(),
            sin_delta_phi: phi.sin(),
            cos_delta_gamma: gamma.cos(),
            sin_delta_gamma: gamma.sin(),
            tilted: phi != 0.0 || gamma != 0.0,
        }
    }

    fn apply(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let mut lambda = lambda + self.delta_lambda;
        if lambda.abs() > PI {
            lambda -= (lambda / TAU).round() * TAU;
        }
        if !self.tilted {
            return (lambda, phi);
        }
        let cos_phi = phi.cos();
        let x = lambda.cos() * cos_phi;
        let y = lambda.sin() * cos_phi;
        let z = phi.sin();
        let k = z * self.cos_delta_phi + x * self.sin_delta_phi;
        (
            (y * self.cos_delta_gamma - k * self.sin_delta_gamma)
                .atan2(x * self.cos_delta_phi - z * self.sin_delta_phi),
            (k * self.cos_delta_gamma + y * self.sin_delta_gamma)
                .clamp(-1.0, 1.0)
                .asin(),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Albers {
    raw: Raw,
    rotation: Rotation,
    k: f64,
    dx: f64,
    dy: f64,
}

impl Albers {
    /// `viewport` is `(width, height)`; it supplies the default translate.
    pub fn new(config: &ProjectionConfig, viewport: (f64, f64)) -> Self {
        let angle = |i: usize| config.rotate.get(i).copied().unwrap_or(0.0).to_radians();
        let rotation = Rotation::new(angle(0), angle(1), angle(2));
        let raw = Raw::new(
            config.parallels[0].to_radians(),
            config.parallels[1].to_radians(),
        );
        let [tx, ty] = config
            .translate
            .unwrap_or([viewport.0 / 2.0, viewport.1 / 2.0]);
        let k = config.scale;
        let (cx, cy) = raw.project(
            config.center[0].to_radians(),
            config.center[1].to_radians(),
        );
        Self {
            raw,
            rotation,
            k,
            dx: tx - k * cx,
            dy: ty + k * cy,
        }
    }

    /// Projects longitude/latitude degrees to screen coordinates (y down).
    pub fn project(&self, lon: f64, lat: f64) -> Coord<f64> {
        let (lambda, phi) = self
            .rotation
            .apply(lon.to_radians(), lat.to_radians());
        let (x, y) = self.raw.project(lambda, phi);
        Coord {
            x: self.dx + self.k * x,
            y: self.dy - self.k * y,
        }
    }

    /// SVG path data for a polygon set, one closed subpath per ring.
    pub fn path_data(&self, geometry: &MultiPolygon<f64>) -> String {
        let mut d = String::new();
        for polygon in geometry.iter() {
            for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
                let mut points = ring.coords().map(|c| self.project(c.x, c.y));
                let Some(first) = points.next() else {
                    continue;
                };
                let _ = write!(d, "M{:.2},{:.2}", first.x, first.y);
                for p in points {
                    let _ = write!(d, "L{:.2},{:.2}", p.x, p.y);
                }
                d.push('Z');
            }
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    fn assert_close(a: Coord<f64>, b: (f64, f64)) {
        assert!(
            (a.x - b.0).abs() < 1e-6 && (a.y - b.1).abs() < 1e-6,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_center_maps_to_viewport_middle() {
        let config = ProjectionConfig {
            rotate: vec![0.0, 0.0],
            ..ProjectionConfig::default()
        };
        let albers = Albers::new(&config, (640.0, 500.0));
        assert_close(albers.project(20.0, 52.0), (320.0, 250.0));
    }

    #[test]
    fn test_center_is_in_rotated_frame() {
        // rotate [-10, 0] shifts longitudes by -10, so lon 30 lands on center 20.
        let albers = Albers::new(&ProjectionConfig::default(), (640.0, 500.0));
        assert_close(albers.project(30.0, 52.0), (320.0, 250.0));
    }

    #[test]
    fn test_orientation() {
        let albers = Albers::new(&ProjectionConfig::default(), (640.0, 500.0));
        let center = albers.project(30.0, 52.0);
        assert!(albers.project(30.0, 60.0).y < center.y, "north is up");
        assert!(albers.project(40.0, 52.0).x > center.x, "east is right");
    }

    #[test]
    fn test_explicit_translate() {
        let config = ProjectionConfig {
            rotate: vec![0.0, 0.0],
            translate: Some([10.0, 20.0]),
            ..ProjectionConfig::default()
        };
        let albers = Albers::new(&config, (640.0, 500.0));
        assert_close(albers.project(20.0, 52.0), (10.0, 20.0));
    }

    #[test]
    fn test_symmetric_parallels_fall_back_to_cylindrical() {
        let config = ProjectionConfig {
            rotate: vec![0.0, 0.0],
            center: [0.0, 0.0],
            parallels: [-30.0, 30.0],
            ..ProjectionConfig::default()
        };
        let albers = Albers::new(&config, (100.0, 100.0));
        assert_close(albers.project(0.0, 0.0), (50.0, 50.0));
        assert!(albers.project(10.0, 0.0).x > 50.0);
    }

    #[test]
    fn test_path_data_closes_each_ring() {
        let albers = Albers::new(&ProjectionConfig::default(), (640.0, 500.0));
        let square = Polygon::new(
            LineString::from(vec![(0.0, 45.0), (5.0, 45.0), (5.0, 50.0), (0.0, 45.0)]),
            vec![],
        );
        let d = albers.path_data(&MultiPolygon::new(vec![square]));
        assert!(d.starts_with('M'));
        assert!(d.ends_with('Z'));
        assert_eq!(d.matches('L').count(), 3);
    }
}
