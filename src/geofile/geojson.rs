use anyhow::{anyhow, Context};
use std::{fs, path::Path};

use super::feature::{Feature, Tags};

fn to_geojson_feature(feature: &Feature) -> geojson::Feature {
    let properties: geojson::JsonObject = feature
        .tags
        .iter()
        .map(|(key, value)| (key.clone(), geojson::JsonValue::from(value.as_str())))
        .collect();
    geojson::Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(&feature.geometry))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn from_geojson_feature(feature: geojson::Feature) -> anyhow::Result<Feature> {
    let geometry = feature
        .geometry
        .ok_or_else(|| anyhow!("Feature without geometry"))?;
    let point = match geometry.value {
        geojson::Value::Point(position) if position.len() >= 2 => {
            geo::Point::new(position[0], position[1])
        }
        other => return Err(anyhow!("Expected a point, got {:?}", other)),
    };
    let mut tags = Tags::new();
    for (key, value) in feature.properties.unwrap_or_default() {
        match value {
            geojson::JsonValue::String(text) => tags.insert(key, text),
            other => tags.insert(key, other.to_string()),
        };
    }
    Ok(Feature::new(point, tags))
}

pub fn write_features_to_geojson(features: &[Feature], output_filepath: &Path) -> anyhow::Result<()> {
    let feature_collection: geojson::FeatureCollection =
        features.iter().map(to_geojson_feature).collect();
    let geojson_contents = geojson::GeoJson::from(feature_collection);
    log::info!(
        "Writing {} features to {:?}",
        features.len(),
        output_filepath
    );
    fs::write(output_filepath, geojson_contents.to_string())
        .with_context(|| format!("Writing GeoJSON to {:?}", output_filepath))
}

pub fn read_features_from_geojson(filepath: &Path) -> anyhow::Result<Vec<Feature>> {
    let contents =
        fs::read_to_string(filepath).with_context(|| format!("Reading {:?}", filepath))?;
    let geojson_contents: geojson::GeoJson = contents.parse()?;
    match geojson_contents {
        geojson::GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .map(from_geojson_feature)
            .collect(),
        geojson::GeoJson::Feature(feature) => Ok(vec![from_geojson_feature(feature)?]),
        geojson::GeoJson::Geometry(_) => Err(anyhow!("{:?} holds a bare geometry", filepath)),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use testdir::testdir;

    use crate::geofile::feature::{Feature, Tags};

    use super::{read_features_from_geojson, write_features_to_geojson};

    fn tree(lon: f64, lat: f64, name: &str, circumference: &str) -> Feature {
        Feature::new(
            geo::Point::new(lon, lat),
            Tags::from([
                ("Nazwa polska".to_string(), name.to_string()),
                ("Obwód pnia w cm".to_string(), circumference.to_string()),
            ]),
        )
    }

    #[rstest]
    fn test_geojson_write_read_round_trip() {
        let features = vec![
            tree(20.945023, 52.364509, "czereśnia ptasia", "157"),
            tree(21.0122, 52.2297, "lipa drobnolistna", "310, 120"),
            Feature::from(geo::Point::new(21.1, 52.3)),
        ];

        let test_dir = testdir!();
        let geojson_filepath = test_dir.join("trees.geojson");
        write_features_to_geojson(&features, &geojson_filepath).unwrap();
        let mut read_back = read_features_from_geojson(&geojson_filepath).unwrap();

        let mut expected = features.clone();
        let sort_key = |feature: &Feature| (feature.geometry.x().to_bits(), feature.describe());
        expected.sort_by_key(sort_key);
        read_back.sort_by_key(sort_key);
        assert_eq!(read_back, expected);
    }

    #[rstest]
    fn test_properties_keep_tag_order() {
        let feature = Feature::new(
            geo::Point::new(21.0, 52.0),
            Tags::from([
                ("Nazwa polska".to_string(), "lipa".to_string()),
                ("Adres".to_string(), "Modlińska".to_string()),
            ]),
        );
        let test_dir = testdir!();
        let geojson_filepath = test_dir.join("ordered.geojson");
        write_features_to_geojson(&[feature], &geojson_filepath).unwrap();
        let contents = fs::read_to_string(&geojson_filepath).unwrap();
        let name_at = contents.find("Nazwa polska").unwrap();
        let address_at = contents.find("Adres").unwrap();
        assert!(name_at < address_at);

        let read_back = read_features_from_geojson(&geojson_filepath).unwrap();
        let keys: Vec<&str> = read_back[0].tags.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Nazwa polska", "Adres"]);
    }

    #[rstest]
    fn test_empty_collection_is_valid_geojson() {
        let test_dir = testdir!();
        let geojson_filepath = test_dir.join("empty.geojson");
        write_features_to_geojson(&[], &geojson_filepath).unwrap();
        assert!(read_features_from_geojson(&geojson_filepath)
            .unwrap()
            .is_empty());
    }

    #[rstest]
    fn test_non_string_properties_are_stringified() {
        let test_dir = testdir!();
        let geojson_filepath = test_dir.join("numbers.geojson");
        fs::write(
            &geojson_filepath,
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Point","coordinates":[21.0,52.0]},"properties":{"height":8}}]}"#,
        )
        .unwrap();
        let features = read_features_from_geojson(&geojson_filepath).unwrap();
        assert_eq!(features[0].tag("height"), Some("8"));
    }

    #[rstest]
    fn test_reading_non_point_geometry_fails() {
        let test_dir = testdir!();
        let geojson_filepath = test_dir.join("line.geojson");
        fs::write(
            &geojson_filepath,
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"LineString","coordinates":[[21.0,52.0],[21.1,52.1]]},"properties":{}}]}"#,
        )
        .unwrap();
        assert!(read_features_from_geojson(&geojson_filepath).is_err());
    }
}
