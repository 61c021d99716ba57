use anyhow::Context;
use indicatif::{MultiProgress, ProgressBar};
use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::crs::crs_utils::Reprojector;
use crate::geofile::feature::Feature;
use crate::geofile::geojson::write_features_to_geojson;
use crate::geofile::kml::{write_features_to_kml, PlacemarkNaming};

use super::download::CachedThemeDownloader;
use super::grid::{split_into_tiles, Grid, NativeBoundingBox, WgsBoundingBox};
use super::monument::{filter_monuments, CIRCUMFERENCE_TAG, NAME_TAG};
use super::portal::{PortalConfig, ThemeSource};

pub const ALL_TREES: &str = "ALL_TREES";
pub const POTENTIAL_MONUMENTS: &str = "POTENTIAL_MONUMENTS";

const MONUMENT_NAMING: PlacemarkNaming = PlacemarkNaming {
    name_tags: &[NAME_TAG, CIRCUMFERENCE_TAG],
};

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct InventoryConfig {
    pub bounding_box: WgsBoundingBox,
    pub grid: Grid,
    pub themes: Vec<String>,
    pub portal: PortalConfig,
    pub cache_dir: PathBuf,
    pub cache_enabled: bool,
    pub output_dir: PathBuf,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            // Warsaw
            bounding_box: WgsBoundingBox {
                left_lon: 20.8516882,
                right_lon: 21.2711512,
                bottom_lat: 52.0978497,
                top_lat: 52.3681531,
            },
            grid: Grid {
                rows: 30,
                columns: 30,
            },
            themes: (1..=20)
                .map(|partition| format!("dane_wawa.BOS_ZIELEN_DRZEWA_{}_SM", partition))
                .collect(),
            portal: PortalConfig::default(),
            cache_dir: PathBuf::from("umRawData"),
            cache_enabled: true,
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InventorySummary {
    pub themes: usize,
    pub tiles_requested: usize,
    pub tiles_failed: usize,
    pub trees: usize,
    pub monuments: usize,
}

pub struct TreesDownloader<'a, S: ThemeSource, R: Reprojector> {
    downloader: CachedThemeDownloader<S>,
    reprojector: &'a R,
    config: &'a InventoryConfig,
}

impl<'a, S: ThemeSource, R: Reprojector> TreesDownloader<'a, S, R> {
    pub fn new(source: S, reprojector: &'a R, config: &'a InventoryConfig) -> anyhow::Result<Self> {
        let downloader =
            CachedThemeDownloader::new(source, &config.cache_dir, config.cache_enabled)?;
        Ok(Self {
            downloader,
            reprojector,
            config,
        })
    }

    fn write_output(&self, name: &str, features: &[Feature]) -> anyhow::Result<()> {
        let output_filepath = self.config.output_dir.join(format!("{}.geojson", name));
        write_features_to_geojson(features, &output_filepath)
    }

    /// Downloads every tile of one theme and writes `<theme>.geojson`.
    pub fn process_theme(
        &self,
        theme: &str,
        tiles: &[NativeBoundingBox],
        summary: &mut InventorySummary,
        progress: &MultiProgress,
    ) -> anyhow::Result<Vec<Feature>> {
        let mut trees = Vec::new();
        let bar = progress.add(ProgressBar::new(tiles.len() as u64));
        for tile in tiles {
            summary.tiles_requested += 1;
            match self.downloader.fetch_features(theme, tile, self.reprojector) {
                Ok(features) => trees.extend(features),
                Err(err) => {
                    summary.tiles_failed += 1;
                    progress.suspend(|| log::warn!("Skipping {} in {}: {:?}", theme, tile, err));
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();
        progress.remove(&bar);
        progress.suspend(|| log::info!("Theme {} holds {} trees", theme, trees.len()));
        self.write_output(theme, &trees)?;
        Ok(trees)
    }

    /// Downloads all configured themes, then writes the merged collection and
    /// the potential monuments as GeoJSON and KML.
    pub fn download_trees(&self) -> anyhow::Result<InventorySummary> {
        fs::create_dir_all(&self.config.output_dir)
            .with_context(|| format!("Creating output directory {:?}", self.config.output_dir))?;
        let native_bbox = NativeBoundingBox::from_wgs84(&self.config.bounding_box, self.reprojector)?;
        let tiles = split_into_tiles(&native_bbox, &self.config.grid);
        log::info!(
            "Downloading {} themes over {} tiles of {}",
            self.config.themes.len(),
            tiles.len(),
            native_bbox
        );

        let mut summary = InventorySummary::default();
        let mut all_trees = Vec::new();
        let progress = MultiProgress::new();
        let themes_bar = progress.add(ProgressBar::new(self.config.themes.len() as u64));
        for theme in &self.config.themes {
            progress.suspend(|| log::info!("Processing theme {}", theme));
            all_trees.extend(self.process_theme(theme, &tiles, &mut summary, &progress)?);
            summary.themes += 1;
            themes_bar.inc(1);
        }
        themes_bar.finish_and_clear();

        let monuments = filter_monuments(&all_trees);
        summary.trees = all_trees.len();
        summary.monuments = monuments.len();

        self.write_output(ALL_TREES, &all_trees)?;
        self.write_output(POTENTIAL_MONUMENTS, &monuments)?;
        write_features_to_kml(
            &monuments,
            &MONUMENT_NAMING,
            &self
                .config
                .output_dir
                .join(format!("{}.kml", POTENTIAL_MONUMENTS)),
        )?;
        Ok(summary)
    }
}
