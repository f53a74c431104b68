use crate::config::{AppConfig, InputConfig};
use crate::topojson::Topology;
use crate::types::{Dataset, Feature, Record};
use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, Trim};
use geo::MultiPolygon;
use serde_json::{Map, Value};
use shapefile::Reader;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Loads the CSV table and the geometry concurrently. Both must succeed;
/// nothing is returned from a partial load.
pub async fn load_data(config: &AppConfig) -> Result<Dataset> {
    info!("Loading data...");

    let csv_input = config.input.clone();
    let attributes = config.attributes.names.clone();
    let geo_input = config.input.clone();

    let (records, features) = tokio::try_join!(
        run_blocking(move || load_records(&csv_input, &attributes)),
        run_blocking(move || load_features(&geo_input)),
    )?;

    info!(
        records = records.len(),
        features = features.len(),
        "Loaded CSV records and geometry features"
    );
    Ok(Dataset { records, features })
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .context("Loader task panicked")?
}

pub fn load_records(input: &InputConfig, attributes: &[String]) -> Result<Vec<Record>> {
    let file = File::open(&input.data_csv)
        .with_context(|| format!("Failed to open CSV file: {:?}", input.data_csv))?;
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(file);
    let headers = rdr.headers()?.clone();

    let key_idx = headers
        .iter()
        .position(|h| h == input.join_key_csv)
        .ok_or_else(|| anyhow!("Join column '{}' not found in CSV", input.join_key_csv))?;

    let attribute_indices: Vec<(&String, Option<usize>)> = attributes
        .iter()
        .map(|name| (name, headers.iter().position(|h| h == name.as_str())))
        .collect();
    for (name, idx) in &attribute_indices {
        if idx.is_none() {
            warn!(attribute = %name, "Attribute column not found in CSV; values treated as missing");
        }
    }

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result.with_context(|| format!("Malformed CSV file: {:?}", input.data_csv))?;
        let key = row.get(key_idx).unwrap_or("");
        if key.is_empty() {
            continue;
        }

        let attributes: BTreeMap<String, f64> = attribute_indices
            .iter()
            .map(|(name, idx)| {
                let value = idx
                    .and_then(|i| row.get(i))
                    .and_then(|cell| cell.parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .unwrap_or(f64::NAN);
                ((*name).clone(), value)
            })
            .collect();

        records.push(Record {
            key: key.to_string(),
            attributes,
        });
    }

    Ok(records)
}

pub fn load_features(input: &InputConfig) -> Result<Vec<Feature>> {
    let extension = input
        .geometry
        .extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input geometry file has no extension"))?;

    match extension.as_str() {
        "shp" => load_shapefile(input),
        "topojson" | "json" | "geojson" => {
            let value = read_json(&input.geometry)?;
            if value.get("type").and_then(Value::as_str) == Some("Topology") {
                load_topojson(input, value)
            } else {
                load_geojson(input, value)
            }
        }
        _ => Err(anyhow!("Unsupported geometry format: {}", extension)),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let file =
        File::open(path).with_context(|| format!("Failed to open geometry file: {:?}", path))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse geometry file: {:?}", path))
}

fn load_topojson(input: &InputConfig, value: Value) -> Result<Vec<Feature>> {
    let topology = Topology::from_value(value)?;
    let features = topology
        .features(&input.object)?
        .into_iter()
        .map(|f| Feature {
            key: feature_key(&f.properties, f.id.as_ref(), &input.join_key_geo),
            geometry: f.geometry,
            properties: f.properties,
            joined: false,
        })
        .collect();
    Ok(features)
}

fn load_geojson(input: &InputConfig, value: Value) -> Result<Vec<Feature>> {
    use geojson::{feature::Id, GeoJson};

    let geojson = GeoJson::from_json_value(value).context("Failed to parse GeoJSON")?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut features = Vec::new();
    for feature in collection.features {
        let geometry = match feature.geometry {
            Some(geom) => {
                let valid_geo: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        let id = feature.id.map(|id| match id {
            Id::String(s) => Value::String(s),
            Id::Number(n) => Value::Number(n),
        });
        let properties = feature.properties.unwrap_or_default();
        features.push(Feature {
            key: feature_key(&properties, id.as_ref(), &input.join_key_geo),
            geometry,
            properties,
            joined: false,
        });
    }

    Ok(features)
}

fn load_shapefile(input: &InputConfig) -> Result<Vec<Feature>> {
    use shapefile::dbase::FieldValue;

    let mut reader = Reader::from_path(&input.geometry)
        .with_context(|| format!("Failed to open Shapefile: {:?}", input.geometry))?;

    let mut features = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let key = match record.get(&input.join_key_geo) {
            Some(FieldValue::Character(Some(s))) => Some(s.trim().to_string()),
            Some(FieldValue::Numeric(Some(n))) => Some(n.to_string()),
            Some(_) => None,
            None => {
                return Err(anyhow!(
                    "Join column '{}' not found in Shapefile",
                    input.join_key_geo
                ))
            }
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => MultiPolygon::<f64>::try_from(polygon)
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => MultiPolygon::<f64>::try_from(polygon)
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => MultiPolygon::<f64>::try_from(polygon)
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue,
        };

        let mut properties = Map::new();
        if let Some(k) = &key {
            properties.insert(input.join_key_geo.clone(), Value::String(k.clone()));
        }
        features.push(Feature {
            key,
            geometry,
            properties,
            joined: false,
        });
    }

    Ok(features)
}

/// The join key of a feature: the configured property, else the feature's own `id`.
fn feature_key(properties: &Map<String, Value>, id: Option<&Value>, field: &str) -> Option<String> {
    properties
        .get(field)
        .and_then(key_string)
        .or_else(|| id.and_then(key_string))
}

fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    const CSV: &str = "id,broadband,speed,freedom,cost,social\n\
                       FR,85,50.2,77,30,60\n\
                       DE,88,n/a,80,35,55\n\
                       ,1,1,1,1,1\n";

    fn topology() -> Value {
        json!({
            "type": "Topology",
            "objects": {
                "europe": {
                    "type": "GeometryCollection",
                    "geometries": [
                        { "type": "Polygon", "arcs": [[0]], "properties": { "id": "FR" } },
                        { "type": "Polygon", "arcs": [[1]], "id": "DE" }
                    ]
                }
            },
            "arcs": [
                [[0.0, 45.0], [5.0, 45.0], [5.0, 50.0], [0.0, 45.0]],
                [[6.0, 48.0], [14.0, 48.0], [14.0, 54.0], [6.0, 48.0]]
            ]
        })
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn config(dir: &TempDir, geometry_name: &str, geometry: &str) -> AppConfig {
        let csv = write(dir, "internetData.csv", CSV);
        let geo = write(dir, geometry_name, geometry);
        let text = format!(
            "[input]\ndata_csv = {:?}\ngeometry = {:?}\n",
            csv.to_string_lossy(),
            geo.to_string_lossy()
        );
        AppConfig::from_toml_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_loads_csv_and_topojson() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, "europe.topojson", &topology().to_string());
        let dataset = load_data(&config).await.unwrap();

        assert_eq!(dataset.records.len(), 2, "row without key is skipped");
        assert_eq!(dataset.records[0].key, "FR");
        assert_eq!(dataset.records[0].value("speed"), 50.2);
        assert!(dataset.records[1].value("speed").is_nan());

        let keys: Vec<_> = dataset.features.iter().map(|f| f.key.clone()).collect();
        assert_eq!(keys, vec![Some("FR".to_string()), Some("DE".to_string())]);
    }

    #[tokio::test]
    async fn test_loads_geojson_feature_collection() {
        let dir = TempDir::new().unwrap();
        let geojson = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "id": "FR" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 45.0], [5.0, 45.0], [5.0, 50.0], [0.0, 45.0]]]
                }
            }]
        });
        let config = config(&dir, "europe.geojson", &geojson.to_string());
        let dataset = load_data(&config).await.unwrap();
        assert_eq!(dataset.features.len(), 1);
        assert_eq!(dataset.features[0].key.as_deref(), Some("FR"));
    }

    #[test]
    fn test_non_finite_cells_are_missing() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, "europe.topojson", &topology().to_string());
        config.input.data_csv = write(
            &dir,
            "non_finite.csv",
            "id,speed\nA,10\nB,inf\nC,-Infinity\nD,NaN\nE,90\n",
        );
        let records = load_records(&config.input, &["speed".to_string()]).unwrap();
        let values: Vec<f64> = records.iter().map(|r| r.value("speed")).collect();
        assert_eq!(values[0], 10.0);
        assert!(values[1..4].iter().all(|v| v.is_nan()));
        assert_eq!(values[4], 90.0);
    }

    #[tokio::test]
    async fn test_numeric_ids_become_string_keys() {
        let dir = TempDir::new().unwrap();
        let mut topology = topology();
        topology["objects"]["europe"]["geometries"][1]["id"] = json!(276);
        let topo_config = config(&dir, "europe.topojson", &topology.to_string());
        let features = load_features(&topo_config.input).unwrap();
        assert_eq!(features[1].key.as_deref(), Some("276"));

        let geojson = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": 250,
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 45.0], [5.0, 45.0], [5.0, 50.0], [0.0, 45.0]]]
                }
            }]
        });
        let config = config(&dir, "numeric.geojson", &geojson.to_string());
        let dataset = load_data(&config).await.unwrap();
        assert_eq!(dataset.features[0].key.as_deref(), Some("250"));
    }

    #[tokio::test]
    async fn test_loads_shapefile() {
        use shapefile::dbase::{FieldName, FieldValue, Record as DbfRecord, TableWriterBuilder};
        use shapefile::{Point, Polygon, PolygonRing, Writer};

        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, "europe.topojson", &topology().to_string());
        let shp = dir.path().join("europe.shp");
        {
            let table = TableWriterBuilder::new()
                .add_character_field(FieldName::try_from("id").unwrap(), 10)
                .add_numeric_field(FieldName::try_from("code").unwrap(), 10, 0);
            let mut writer = Writer::from_path(&shp, table).unwrap();
            let countries = [("FR", 250.0, 0.0), ("DE", 276.0, 6.0)];
            for (key, code, x) in countries {
                let polygon = Polygon::new(PolygonRing::Outer(vec![
                    Point::new(x, 45.0),
                    Point::new(x, 50.0),
                    Point::new(x + 5.0, 50.0),
                    Point::new(x + 5.0, 45.0),
                    Point::new(x, 45.0),
                ]));
                let mut record = DbfRecord::default();
                record.insert("id".to_string(), FieldValue::Character(Some(key.to_string())));
                record.insert("code".to_string(), FieldValue::Numeric(Some(code)));
                writer.write_shape_and_record(&polygon, &record).unwrap();
            }
        }
        config.input.geometry = shp;

        let dataset = load_data(&config).await.unwrap();
        let keys: Vec<_> = dataset.features.iter().map(|f| f.key.clone()).collect();
        assert_eq!(keys, vec![Some("FR".to_string()), Some("DE".to_string())]);
        assert!(!dataset.features[0].geometry.0.is_empty());

        config.input.join_key_geo = "code".to_string();
        let features = load_features(&config.input).unwrap();
        assert_eq!(features[1].key.as_deref(), Some("276"));

        config.input.join_key_geo = "name".to_string();
        assert!(load_features(&config.input).is_err());
    }

    #[tokio::test]
    async fn test_missing_csv_fails_whole_load() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, "europe.topojson", &topology().to_string());
        config.input.data_csv = dir.path().join("missing.csv");
        assert!(load_data(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_topology_fails_whole_load() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, "europe.topojson", "{ not json");
        assert!(load_data(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_object_layer_fails() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, "europe.topojson", &topology().to_string());
        config.input.object = "asia".to_string();
        assert!(load_data(&config).await.is_err());
    }

    #[test]
    fn test_missing_join_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir, "europe.topojson", &topology().to_string());
        config.input.join_key_csv = "name".to_string();
        let attributes = config.attributes.names.clone();
        assert!(load_records(&config.input, &attributes).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir, "europe.kml", "<kml/>");
        assert!(load_features(&config.input).is_err());
    }
}
