use serde::Deserialize;
use std::fmt;

use crate::crs::crs_utils::Reprojector;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct WgsBoundingBox {
    pub left_lon: f64,
    pub right_lon: f64,
    pub bottom_lat: f64,
    pub top_lat: f64,
}

/// Bounding box in the portal's native CRS, in whole units (metres).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeBoundingBox {
    pub min_easting: i64,
    pub min_northing: i64,
    pub max_easting: i64,
    pub max_northing: i64,
}

impl NativeBoundingBox {
    pub fn from_wgs84(
        bbox: &WgsBoundingBox,
        reprojector: &impl Reprojector,
    ) -> anyhow::Result<Self> {
        let (min_easting, min_northing) =
            reprojector.wgs84_to_native(geo::Point::new(bbox.left_lon, bbox.bottom_lat))?;
        let (max_easting, max_northing) =
            reprojector.wgs84_to_native(geo::Point::new(bbox.right_lon, bbox.top_lat))?;
        Ok(Self {
            min_easting: min_easting as i64,
            min_northing: min_northing as i64,
            max_easting: max_easting as i64,
            max_northing: max_northing as i64,
        })
    }
}

/// Formats as `minE:minN:maxE:maxN`, the portal's bbox parameter.
impl fmt::Display for NativeBoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.min_easting, self.min_northing, self.max_easting, self.max_northing
        )
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    /// Divisions along the northing axis.
    pub rows: u32,
    /// Divisions along the easting axis.
    pub columns: u32,
}

impl Grid {
    pub fn tile_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }
}

/// Splits `bbox` into `grid.rows * grid.columns` equally sized tiles, row by row
/// from the south-west corner.
///
/// The step is truncated to whole units, so the last row and column may stop
/// short of the box's north and east edges.
pub fn split_into_tiles(bbox: &NativeBoundingBox, grid: &Grid) -> Vec<NativeBoundingBox> {
    if grid.rows == 0 || grid.columns == 0 {
        return Vec::new();
    }
    let northing_step = (bbox.max_northing - bbox.min_northing) / grid.rows as i64;
    let easting_step = (bbox.max_easting - bbox.min_easting) / grid.columns as i64;
    let mut tiles = Vec::with_capacity(grid.tile_count());
    for row in 0..grid.rows as i64 {
        let min_northing = bbox.min_northing + northing_step * row;
        for column in 0..grid.columns as i64 {
            let min_easting = bbox.min_easting + easting_step * column;
            tiles.push(NativeBoundingBox {
                min_easting,
                min_northing,
                max_easting: min_easting + easting_step,
                max_northing: min_northing + northing_step,
            });
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::inventory::portal::tests::ScaledReprojector;

    use super::{split_into_tiles, Grid, NativeBoundingBox, WgsBoundingBox};

    const BBOX: NativeBoundingBox = NativeBoundingBox {
        min_easting: 1000,
        min_northing: 2000,
        max_easting: 1100,
        max_northing: 2060,
    };

    #[rstest]
    fn test_display_is_portal_bbox_format() {
        assert_eq!(BBOX.to_string(), "1000:2000:1100:2060");
    }

    #[rstest]
    fn test_from_wgs84_truncates_to_whole_units() {
        let bbox = WgsBoundingBox {
            left_lon: 20.8516882,
            right_lon: 21.2711512,
            bottom_lat: 52.0978497,
            top_lat: 52.3681531,
        };
        let native = NativeBoundingBox::from_wgs84(&bbox, &ScaledReprojector).unwrap();
        assert_eq!(
            native,
            NativeBoundingBox {
                min_easting: 20851,
                min_northing: 52097,
                max_easting: 21271,
                max_northing: 52368,
            }
        );
    }

    #[rstest]
    fn test_split_two_by_two() {
        let tiles = split_into_tiles(&BBOX, &Grid { rows: 2, columns: 2 });
        let rendered: Vec<String> = tiles.iter().map(|tile| tile.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "1000:2000:1050:2030",
                "1050:2000:1100:2030",
                "1000:2030:1050:2060",
                "1050:2030:1100:2060",
            ]
        );
    }

    #[rstest]
    #[case(Grid { rows: 30, columns: 30 }, 900)]
    #[case(Grid { rows: 3, columns: 1 }, 3)]
    #[case(Grid { rows: 0, columns: 5 }, 0)]
    fn test_tile_count(#[case] grid: Grid, #[case] expected: usize) {
        assert_eq!(split_into_tiles(&BBOX, &grid).len(), expected);
    }

    #[rstest]
    fn test_uneven_step_is_truncated() {
        let tiles = split_into_tiles(&BBOX, &Grid { rows: 7, columns: 3 });
        // 60 / 7 = 8, 100 / 3 = 33
        let last = tiles.last().unwrap();
        assert_eq!(last.max_northing, 2000 + 8 * 7);
        assert_eq!(last.max_easting, 1000 + 33 * 3);
        assert!(tiles.iter().all(|tile| tile.max_easting - tile.min_easting == 33));
    }
}
