pub mod geocode;
pub mod layout;
pub mod render;
pub mod tiles;
pub mod tree;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

use self::geocode::{reverse_geocode, AddressResult};
use self::layout::build_application_form;
use self::render::{render_to_file, FontPaths};
use self::tiles::{compose_map, HttpTileSource, MapComposite, MapConfig, TileSource};
use self::tree::ApplicationInput;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FormConfig {
    pub application: ApplicationInput,
    pub output_path: PathBuf,
    pub user_agent: String,
    pub geocoder_url: String,
    pub map: MapConfig,
    pub request_timeout_secs: u64,
    pub fonts: Option<FontPaths>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            application: ApplicationInput::default(),
            output_path: PathBuf::from("output.pdf"),
            user_agent: "Pomniki Przyrody 0.0.1".to_string(),
            geocoder_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
            map: MapConfig::default(),
            request_timeout_secs: 30,
            fonts: None,
        }
    }
}

fn lookup_address(client: &reqwest::blocking::Client, config: &FormConfig) -> Option<AddressResult> {
    let location = config.application.tree.location();
    match reverse_geocode(client, &config.geocoder_url, location) {
        Ok(Some(address)) => {
            log::info!("Nearest address: {}", address.postal_line());
            Some(address)
        }
        Ok(None) => {
            log::info!("No complete address found for {:?}", location);
            None
        }
        Err(err) => {
            log::warn!("{}", err);
            None
        }
    }
}

fn render_map(source: &impl TileSource, config: &FormConfig) -> Option<MapComposite> {
    match compose_map(
        source,
        config.application.tree.location(),
        config.map.span_deg,
        config.map.zoom,
    ) {
        Ok(map) => {
            if !map.is_complete() {
                log::warn!(
                    "{} of {} map tiles are missing",
                    map.missing_tiles.len(),
                    map.range.tiles().count()
                );
            }
            Some(map)
        }
        Err(err) => {
            log::warn!("Leaving out the map: {:?}", err);
            None
        }
    }
}

/// Looks up the tree's address, renders its map and writes the application PDF.
pub fn generate_form(config: &FormConfig, date: NaiveDate) -> anyhow::Result<()> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Building HTTP client")?;
    let address = lookup_address(&client, config);
    let map = render_map(&HttpTileSource::new(&client, &config.map.tile_url), config);
    let document =
        build_application_form(&config.application, address.as_ref(), map.as_ref(), date);
    render_to_file(&document, config.fonts.as_ref(), &config.output_path)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::tiles::tests::FakeTileSource;
    use super::{render_map, FormConfig};

    #[rstest]
    fn test_default_config_matches_reference_form() {
        let config = FormConfig::default();
        assert_eq!(config.application.tree.inventory_ref, "D370612");
        assert_eq!(config.map.zoom, 13);
        assert_eq!(config.map.span_deg, 0.01);
        assert!(config.fonts.is_none());
    }

    #[rstest]
    fn test_render_map_keeps_partial_maps() {
        let config = FormConfig::default();
        let range = super::tiles::TileRange::around(
            config.application.tree.location(),
            config.map.span_deg,
            config.map.zoom,
        )
        .unwrap();
        let source = FakeTileSource::new(range.tiles().collect());
        let map = render_map(&source, &config).unwrap();
        assert_eq!(map.missing_tiles.len(), range.tiles().count());
    }

    #[rstest]
    #[case(25, 0.01)]
    #[case(13, -0.1)]
    fn test_render_map_without_valid_range(#[case] zoom: u8, #[case] span_deg: f64) {
        let mut config = FormConfig::default();
        config.map.zoom = zoom;
        config.map.span_deg = span_deg;
        assert!(render_map(&FakeTileSource::new(Vec::new()), &config).is_none());
    }
}
