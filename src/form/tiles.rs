use anyhow::{anyhow, Context};
use image::{Rgb, RgbImage};
use serde::Deserialize;
use std::f64::consts::PI;

pub const TILE_SIZE: u32 = 256;
/// Latitude limit of the web mercator projection.
pub const MAX_LATITUDE: f64 = 85.0511;
const MAX_TILES: usize = 64;
const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const MARKER_ARM: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileIndex {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

/// Fractional slippy-map tile coordinates of a WGS84 point.
pub fn lat_lon_to_tile_fraction(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let n = 2f64.powi(zoom as i32);
    let lat_rad = lat.to_radians();
    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
    (x, y)
}

pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> TileIndex {
    let (x, y) = lat_lon_to_tile_fraction(lat, lon, zoom);
    TileIndex {
        x: x.floor() as u32,
        y: y.floor() as u32,
        zoom,
    }
}

/// North-west corner of a tile, as (lon, lat).
pub fn tile_to_lat_lon(tile: &TileIndex) -> geo::Point {
    let n = 2f64.powi(tile.zoom as i32);
    let lon = tile.x as f64 / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * tile.y as f64 / n)).sinh().atan().to_degrees();
    geo::Point::new(lon, lat)
}

/// Inclusive block of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
    pub zoom: u8,
}

impl TileRange {
    /// Tiles covering `span_deg` degrees of latitude and longitude centred on `center`.
    pub fn around(center: geo::Point, span_deg: f64, zoom: u8) -> anyhow::Result<Self> {
        let (lat, lon) = (center.y(), center.x());
        if !(span_deg > 0.0) {
            return Err(anyhow!("Map span must be positive, got {}", span_deg));
        }
        let half = span_deg / 2.0;
        if zoom > 19 {
            return Err(anyhow!("Zoom level {} is not served", zoom));
        }
        if lat.abs() + half > MAX_LATITUDE || lon.abs() + half > 180.0 {
            return Err(anyhow!("{:?} +/- {} is outside the tiled area", center, half));
        }
        let south_west = lat_lon_to_tile(lat - half, lon - half, zoom);
        let north_east = lat_lon_to_tile(lat + half, lon + half, zoom);
        let range = Self {
            x_min: south_west.x,
            x_max: north_east.x,
            y_min: north_east.y,
            y_max: south_west.y,
            zoom,
        };
        let tile_count = range.columns() as usize * range.rows() as usize;
        if tile_count > MAX_TILES {
            return Err(anyhow!(
                "{} tiles needed for a {} degree span at zoom {}",
                tile_count,
                span_deg,
                zoom
            ));
        }
        Ok(range)
    }

    pub fn columns(&self) -> u32 {
        self.x_max - self.x_min + 1
    }

    pub fn rows(&self) -> u32 {
        self.y_max - self.y_min + 1
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileIndex> + '_ {
        (self.x_min..=self.x_max).flat_map(move |x| {
            (self.y_min..=self.y_max).map(move |y| TileIndex {
                x,
                y,
                zoom: self.zoom,
            })
        })
    }

    /// Pixel offset of a tile's top-left corner in the composite.
    pub fn tile_offset(&self, tile: &TileIndex) -> (u32, u32) {
        (
            (tile.x - self.x_min) * TILE_SIZE,
            (tile.y - self.y_min) * TILE_SIZE,
        )
    }

    /// Pixel position of a WGS84 point in the composite.
    pub fn pixel_position(&self, point: geo::Point) -> (f64, f64) {
        let (x, y) = lat_lon_to_tile_fraction(point.y(), point.x(), self.zoom);
        (
            (x - self.x_min as f64) * TILE_SIZE as f64,
            (y - self.y_min as f64) * TILE_SIZE as f64,
        )
    }
}

/// Source of encoded raster tiles.
pub trait TileSource {
    fn fetch_tile(&self, tile: &TileIndex) -> anyhow::Result<Vec<u8>>;
}

impl<T: TileSource + ?Sized> TileSource for &T {
    fn fetch_tile(&self, tile: &TileIndex) -> anyhow::Result<Vec<u8>> {
        (**self).fetch_tile(tile)
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MapConfig {
    /// Template with `{z}`, `{x}` and `{y}` placeholders.
    pub tile_url: String,
    pub zoom: u8,
    pub span_deg: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: "https://a.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            zoom: 13,
            span_deg: 0.01,
        }
    }
}

pub struct HttpTileSource<'a> {
    client: &'a reqwest::blocking::Client,
    url_template: &'a str,
}

impl<'a> HttpTileSource<'a> {
    pub fn new(client: &'a reqwest::blocking::Client, url_template: &'a str) -> Self {
        Self {
            client,
            url_template,
        }
    }

    pub fn tile_url(&self, tile: &TileIndex) -> String {
        self.url_template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

impl TileSource for HttpTileSource<'_> {
    fn fetch_tile(&self, tile: &TileIndex) -> anyhow::Result<Vec<u8>> {
        let url = self.tile_url(tile);
        log::info!("Opening: {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .with_context(|| format!("Requesting {}", url))?
            .error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// A stitched map. Tiles that could not be fetched or decoded are left black
/// and listed in `missing_tiles`.
pub struct MapComposite {
    pub image: RgbImage,
    pub range: TileRange,
    pub missing_tiles: Vec<TileIndex>,
}

impl MapComposite {
    pub fn is_complete(&self) -> bool {
        self.missing_tiles.is_empty()
    }

    /// Draws a cross centred on `point`, clipped to the image.
    pub fn mark(&mut self, point: geo::Point) {
        let (x, y) = self.range.pixel_position(point);
        let (x, y) = (x.floor() as i64, y.floor() as i64);
        let (width, height) = (self.image.width() as i64, self.image.height() as i64);
        for offset in -MARKER_ARM..=MARKER_ARM {
            for (px, py) in [(x + offset, y), (x, y + offset)] {
                if (0..width).contains(&px) && (0..height).contains(&py) {
                    self.image.put_pixel(px as u32, py as u32, MARKER_COLOR);
                }
            }
        }
    }
}

fn decode_tile(bytes: &[u8]) -> anyhow::Result<RgbImage> {
    Ok(image::load_from_memory(bytes)
        .context("Decoding tile")?
        .to_rgb8())
}

/// Fetches every tile around `center` and pastes them into one image, marking
/// `center` on it.
pub fn compose_map(
    source: &impl TileSource,
    center: geo::Point,
    span_deg: f64,
    zoom: u8,
) -> anyhow::Result<MapComposite> {
    let range = TileRange::around(center, span_deg, zoom)?;
    log::debug!(
        "Map spans {:?} to {:?}",
        tile_to_lat_lon(&TileIndex {
            x: range.x_min,
            y: range.y_min,
            zoom
        }),
        tile_to_lat_lon(&TileIndex {
            x: range.x_max + 1,
            y: range.y_max + 1,
            zoom
        })
    );
    let mut image = RgbImage::new(range.columns() * TILE_SIZE, range.rows() * TILE_SIZE);
    let mut missing_tiles = Vec::new();
    for tile in range.tiles() {
        match source.fetch_tile(&tile).and_then(|bytes| decode_tile(&bytes)) {
            Ok(tile_image) => {
                let (x, y) = range.tile_offset(&tile);
                image::imageops::overlay(&mut image, &tile_image, x as i64, y as i64);
            }
            Err(err) => {
                log::warn!("Couldn't download tile {:?}: {:?}", tile, err);
                missing_tiles.push(tile);
            }
        }
    }
    let mut composite = MapComposite {
        image,
        range,
        missing_tiles,
    };
    composite.mark(center);
    Ok(composite)
}
