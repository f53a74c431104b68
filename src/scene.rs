use crate::color::Rgb;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub attribute: String,
    pub highlight: Stroke,
    pub map: MapLayer,
    pub chart: ChartLayer,
    pub legend: Legend,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Rgb,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub width: f64,
    pub height: f64,
    /// Same order as the dataset's features.
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    pub key: Option<String>,
    pub path: String,
    pub fill: Rgb,
    pub emphasized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayer {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
    pub title: String,
    /// Sorted by descending value; position 0 is the leftmost bar.
    pub bars: Vec<Bar>,
    pub value_axis: Vec<Tick>,
    pub category_axis: Vec<Tick>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub key: String,
    pub value: Option<f64>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: Rgb,
    pub emphasized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tick {
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: String,
    /// Light to dark.
    pub swatches: Vec<Swatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Swatch {
    pub fill: Rgb,
    pub label: Option<String>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("broadband"), "Broadband");
        assert_eq!(capitalize("Speed"), "Speed");
        assert_eq!(capitalize(""), "");
    }
}
