use crate::types::{Feature, Record};
use serde_json::{Number, Value};

/// Copies every attribute of a record into the properties of each feature sharing its key.
/// Returns how many features were matched. Features without a record are left untouched.
pub fn join_records(features: &mut [Feature], records: &[Record], attributes: &[String]) -> usize {
    let mut matched = 0;
    for record in records {
        for feature in features.iter_mut() {
            if feature.key.as_deref() != Some(record.key.as_str()) {
                continue;
            }
            for attribute in attributes {
                let value = Number::from_f64(record.value(attribute))
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
                feature.properties.insert(attribute.clone(), value);
            }
            if !feature.joined {
                feature.joined = true;
                matched += 1;
            }
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;
    use serde_json::Map;
    use std::collections::BTreeMap;

    fn record(key: &str, values: &[(&str, f64)]) -> Record {
        Record {
            key: key.to_string(),
            attributes: values.iter().map(|(k, v)| (k.to_string(), *v)).collect::<BTreeMap<_, _>>(),
        }
    }

    fn feature(key: Option<&str>) -> Feature {
        Feature {
            key: key.map(str::to_string),
            geometry: MultiPolygon::new(vec![]),
            properties: Map::new(),
            joined: false,
        }
    }

    fn attributes() -> Vec<String> {
        vec!["broadband".to_string(), "speed".to_string()]
    }

    #[test]
    fn test_matched_features_carry_every_attribute() {
        let records = vec![
            record("FR", &[("broadband", 85.0), ("speed", 50.2)]),
            record("DE", &[("broadband", 88.0), ("speed", 61.0)]),
        ];
        let mut features = vec![feature(Some("DE")), feature(Some("FR")), feature(Some("Z"))];

        let matched = join_records(&mut features, &records, &attributes());
        assert_eq!(matched, 2);

        for f in &features[..2] {
            for attribute in attributes() {
                assert!(f.value(&attribute).is_some(), "{:?} lacks {}", f.key, attribute);
            }
        }
        assert_eq!(features[1].value("speed"), Some(50.2));
        assert!(!features[2].joined);
        assert_eq!(features[2].value("broadband"), None);
    }

    #[test]
    fn test_nan_values_are_stored_as_missing() {
        let records = vec![record("FR", &[("broadband", f64::NAN), ("speed", 3.0)])];
        let mut features = vec![feature(Some("FR"))];
        join_records(&mut features, &records, &attributes());
        assert_eq!(features[0].properties.get("broadband"), Some(&Value::Null));
        assert_eq!(features[0].value("broadband"), None);
        assert_eq!(features[0].value("speed"), Some(3.0));
    }

    #[test]
    fn test_unkeyed_features_never_match() {
        let records = vec![record("", &[("broadband", 1.0)])];
        let mut features = vec![feature(None)];
        assert_eq!(join_records(&mut features, &records, &attributes()), 0);
    }

    #[test]
    fn test_unmatched_existing_property_is_not_a_value() {
        let mut f = feature(Some("Z"));
        f.properties.insert("broadband".to_string(), Value::from(12.0));
        let mut features = vec![f];
        join_records(&mut features, &[], &attributes());
        assert_eq!(features[0].value("broadband"), None);
    }
}
