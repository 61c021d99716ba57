use anyhow::{anyhow, Context};
use proj::Proj;

pub type EpsgCode = u32;

/// CS2000 zone 7, the native CRS of the city map portal.
pub const EPSG_CS2000_ZONE_7: EpsgCode = 2178;
pub const EPSG_WGS84: EpsgCode = 4326;

pub fn epsg_code_to_authority_string(code: EpsgCode) -> String {
    format!("EPSG:{}", code)
}

/// Converts between the portal's native projected CRS and WGS84.
///
/// Native coordinates are given as (easting, northing), WGS84 points as (lon, lat).
pub trait Reprojector {
    fn native_to_wgs84(&self, easting: f64, northing: f64) -> anyhow::Result<geo::Point>;
    fn wgs84_to_native(&self, point: geo::Point) -> anyhow::Result<(f64, f64)>;
}

pub struct ProjReprojector {
    to_wgs84: Proj,
    from_wgs84: Proj,
}

impl ProjReprojector {
    pub fn new(native_crs: EpsgCode) -> anyhow::Result<Self> {
        let native = epsg_code_to_authority_string(native_crs);
        let wgs84 = epsg_code_to_authority_string(EPSG_WGS84);
        // new_known_crs normalizes axis order to (x, y) / (lon, lat).
        let to_wgs84 = Proj::new_known_crs(&native, &wgs84, None)
            .with_context(|| format!("Creating {} -> {} transformation", native, wgs84))?;
        let from_wgs84 = Proj::new_known_crs(&wgs84, &native, None)
            .with_context(|| format!("Creating {} -> {} transformation", wgs84, native))?;
        Ok(Self {
            to_wgs84,
            from_wgs84,
        })
    }
}

impl Reprojector for ProjReprojector {
    fn native_to_wgs84(&self, easting: f64, northing: f64) -> anyhow::Result<geo::Point> {
        let (lon, lat) = self
            .to_wgs84
            .convert((easting, northing))
            .map_err(|err| anyhow!("Could not reproject ({}, {}): {}", easting, northing, err))?;
        Ok(geo::Point::new(lon, lat))
    }

    fn wgs84_to_native(&self, point: geo::Point) -> anyhow::Result<(f64, f64)> {
        self.from_wgs84
            .convert((point.x(), point.y()))
            .map_err(|err| anyhow!("Could not reproject {:?}: {}", point, err))
    }
}
