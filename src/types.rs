use geo::MultiPolygon;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One CSV row: the join key and the parsed value of every configured attribute.
/// Cells that fail to parse or are not finite are stored as NaN.
#[derive(Debug, Clone)]
pub struct Record {
    pub key: String,
    pub attributes: BTreeMap<String, f64>,
}

impl Record {
    /// NaN when the attribute is missing or was not numeric.
    pub fn value(&self, attribute: &str) -> f64 {
        self.attributes.get(attribute).copied().unwrap_or(f64::NAN)
    }
}

/// One country polygon in lon/lat degrees.
#[derive(Debug, Clone)]
pub struct Feature {
    pub key: Option<String>,
    pub geometry: MultiPolygon<f64>,
    pub properties: Map<String, Value>,
    /// Set by the joiner when a record with the same key was found.
    pub joined: bool,
}

impl Feature {
    /// The joined value of `attribute`, or `None` when there is nothing to color by.
    pub fn value(&self, attribute: &str) -> Option<f64> {
        if !self.joined {
            return None;
        }
        self.properties
            .get(attribute)
            .and_then(Value::as_f64)
            .filter(|v| !v.is_nan())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub features: Vec<Feature>,
}
