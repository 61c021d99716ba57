use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::crs::crs_utils::Reprojector;
use crate::geofile::feature::{Feature, Tags};

use super::grid::NativeBoundingBox;
use super::near_json::repair_near_json;

/// Source of raw theme responses for one tile.
pub trait ThemeSource {
    fn fetch_theme(&self, theme: &str, bbox: &NativeBoundingBox) -> Result<String, PortalError>;
}

impl<T: ThemeSource + ?Sized> ThemeSource for &T {
    fn fetch_theme(&self, theme: &str, bbox: &NativeBoundingBox) -> Result<String, PortalError> {
        (**self).fetch_theme(theme, bbox)
    }
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("request for theme {theme} failed: {source}")]
    Transport {
        theme: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("portal answered {status} for theme {theme}")]
    Status {
        theme: String,
        status: reqwest::StatusCode,
    },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PortalConfig {
    pub url: String,
    pub tid: String,
    pub width: u32,
    pub height: u32,
    pub dst_srid: u32,
    pub timeout_secs: u64,
    pub retries: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: "https://mapa.um.warszawa.pl/mapviewer/foi".to_string(),
            tid: "85_311281927602616807".to_string(),
            width: 760,
            height: 1190,
            dst_srid: 2178,
            timeout_secs: 60,
            retries: 2,
        }
    }
}

/// Form fields of one `getfoi` request for `theme` inside `bbox`.
pub fn form_fields(
    theme: &str,
    bbox: &NativeBoundingBox,
    config: &PortalConfig,
) -> Vec<(&'static str, String)> {
    vec![
        ("request", "getfoi".to_string()),
        ("version", "1.0".to_string()),
        ("bbox", bbox.to_string()),
        ("width", config.width.to_string()),
        ("height", config.height.to_string()),
        ("theme", theme.to_string()),
        ("dstsrid", config.dst_srid.to_string()),
        ("cachefoi", "yes".to_string()),
        ("tid", config.tid.clone()),
        ("aw", "no".to_string()),
    ]
}

/// Posts one request per call to the city map portal.
pub struct PortalClient {
    client: reqwest::blocking::Client,
    config: PortalConfig,
}

impl PortalClient {
    pub fn new(config: PortalConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Building portal HTTP client")?;
        Ok(Self { client, config })
    }
}

impl ThemeSource for PortalClient {
    fn fetch_theme(&self, theme: &str, bbox: &NativeBoundingBox) -> Result<String, PortalError> {
        let transport = |source| PortalError::Transport {
            theme: theme.to_string(),
            source,
        };
        let response = self
            .client
            .post(&self.config.url)
            .form(&form_fields(theme, bbox, &self.config))
            .send()
            .map_err(transport)?;
        if !response.status().is_success() {
            return Err(PortalError::Status {
                theme: theme.to_string(),
                status: response.status(),
            });
        }
        response.text().map_err(transport)
    }
}

/// Repeats a failed request up to `retries` more times.
pub struct RetryingThemeSource<S: ThemeSource> {
    source: S,
    retries: u32,
}

impl<S: ThemeSource> RetryingThemeSource<S> {
    pub fn new(source: S, retries: u32) -> Self {
        Self { source, retries }
    }
}

impl<S: ThemeSource> ThemeSource for RetryingThemeSource<S> {
    fn fetch_theme(&self, theme: &str, bbox: &NativeBoundingBox) -> Result<String, PortalError> {
        let mut attempt = 0;
        loop {
            match self.source.fetch_theme(theme, bbox) {
                Ok(text) => return Ok(text),
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    log::warn!("{}, retrying ({}/{})", err, attempt, self.retries);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Deserialize, Debug)]
struct PortalResponse {
    foiarray: Vec<PortalRecord>,
}

#[derive(Deserialize, Debug)]
struct PortalRecord {
    name: String,
    x: f64,
    y: f64,
}

/// Splits a record name of `key: value` lines into tags. Lines without a
/// separator and empty values are dropped.
pub fn parse_tags(name: &str) -> Tags {
    name.split('\n')
        .filter_map(|line| line.split_once(": "))
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Parses one raw theme response into WGS84 features.
pub fn parse_theme_response(
    raw: &str,
    reprojector: &impl Reprojector,
) -> anyhow::Result<Vec<Feature>> {
    let response: PortalResponse =
        serde_json::from_str(&repair_near_json(raw)).context("Parsing theme response")?;
    response
        .foiarray
        .into_iter()
        .map(|record| {
            let geometry = reprojector.native_to_wgs84(record.x, record.y)?;
            Ok(Feature::new(geometry, parse_tags(&record.name)))
        })
        .collect()
}
