pub mod feature;
pub mod geojson;
pub mod kml;
