// Polygon, MultiPolygon and nested GeometryCollection objects only; points and lines are skipped.

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub transform: Option<Transform>,
    pub objects: HashMap<String, TopoGeometry>,
    #[serde(default)]
    pub arcs: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Deserialize)]
pub struct TopoGeometry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub arcs: Option<Value>,
    #[serde(default)]
    pub geometries: Vec<TopoGeometry>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// A decoded member of a topology object.
#[derive(Debug, Clone)]
pub struct TopoFeature {
    pub id: Option<Value>,
    pub properties: Map<String, Value>,
    pub geometry: MultiPolygon<f64>,
}

impl Topology {
    pub fn from_value(value: Value) -> Result<Self> {
        let topology: Topology =
            serde_json::from_value(value).context("Failed to parse TopoJSON topology")?;
        if topology.kind != "Topology" {
            bail!("Expected a TopoJSON Topology, found type {:?}", topology.kind);
        }
        Ok(topology)
    }

    /// Decodes the object layer `name` into features, one per member geometry
    /// when the layer is a collection.
    pub fn features(&self, name: &str) -> Result<Vec<TopoFeature>> {
        let object = self
            .objects
            .get(name)
            .ok_or_else(|| anyhow!("TopoJSON object '{}' not found", name))?;
        let arcs = self.decode_arcs();

        let members: Vec<&TopoGeometry> = match object.kind.as_deref() {
            Some("GeometryCollection") => object.geometries.iter().collect(),
            _ => vec![object],
        };

        let mut features = Vec::with_capacity(members.len());
        for member in members {
            let mut polygons = Vec::new();
            collect_polygons(member, &arcs, &mut polygons)?;
            if polygons.is_empty() {
                tracing::debug!(id = ?member.id, "Skipping non-polygonal TopoJSON geometry");
                continue;
            }
            features.push(TopoFeature {
                id: member.id.clone(),
                properties: member.properties.clone().unwrap_or_default(),
                geometry: MultiPolygon::new(polygons),
            });
        }
        Ok(features)
    }

    /// Absolute coordinates of every arc, undoing delta encoding when quantized.
    fn decode_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| match self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            Coord {
                                x: x * t.scale[0] + t.translate[0],
                                y: y * t.scale[1] + t.translate[1],
                            }
                        })
                        .collect()
                }
                None => arc
                    .iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| Coord { x: p[0], y: p[1] })
                    .collect(),
            })
            .collect()
    }
}

fn collect_polygons(
    geometry: &TopoGeometry,
    arcs: &[Vec<Coord<f64>>],
    out: &mut Vec<Polygon<f64>>,
) -> Result<()> {
    match geometry.kind.as_deref() {
        Some("Polygon") => {
            let rings: Vec<Vec<i64>> = arc_refs(geometry)?;
            if let Some(polygon) = decode_polygon(&rings, arcs)? {
                out.push(polygon);
            }
        }
        Some("MultiPolygon") => {
            let polygons: Vec<Vec<Vec<i64>>> = arc_refs(geometry)?;
            for rings in &polygons {
                if let Some(polygon) = decode_polygon(rings, arcs)? {
                    out.push(polygon);
                }
            }
        }
        Some("GeometryCollection") => {
            for child in &geometry.geometries {
                collect_polygons(child, arcs, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn arc_refs<T: serde::de::DeserializeOwned>(geometry: &TopoGeometry) -> Result<T> {
    let value = geometry.arcs.clone().unwrap_or(Value::Array(Vec::new()));
    serde_json::from_value(value)
        .with_context(|| format!("Malformed arcs in TopoJSON geometry {:?}", geometry.id))
}

fn decode_polygon(rings: &[Vec<i64>], arcs: &[Vec<Coord<f64>>]) -> Result<Option<Polygon<f64>>> {
    let mut decoded = rings
        .iter()
        .map(|ring| stitch_ring(ring, arcs))
        .collect::<Result<Vec<_>>>()?
        .into_iter();
    match decoded.next() {
        Some(exterior) => Ok(Some(Polygon::new(exterior, decoded.collect()))),
        None => Ok(None),
    }
}

/// Joins arcs into a ring. Consecutive arcs share an endpoint, which is kept once;
/// a negative reference `!i` walks arc `i` backwards.
fn stitch_ring(refs: &[i64], arcs: &[Vec<Coord<f64>>]) -> Result<LineString<f64>> {
    let mut points: Vec<Coord<f64>> = Vec::new();
    for &r in refs {
        let index = (if r < 0 { !r } else { r }) as usize;
        let arc = arcs
            .get(index)
            .ok_or_else(|| anyhow!("Arc index {} out of range ({} arcs)", r, arcs.len()))?;
        points.pop();
        if r < 0 {
            points.extend(arc.iter().rev().copied());
        } else {
            points.extend(arc.iter().copied());
        }
    }
    Ok(LineString::new(points))
}
