use anyhow::Context;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::crs::crs_utils::Reprojector;
use crate::geofile::feature::Feature;

use super::grid::NativeBoundingBox;
use super::portal::{parse_theme_response, ThemeSource};

pub fn get_cache_filename(theme: &str, bbox: &NativeBoundingBox) -> String {
    format!("{theme}-{bbox}.raw")
}

/// Fetches raw theme responses through an on-disk cache keyed by theme and tile.
pub struct CachedThemeDownloader<S: ThemeSource> {
    source: S,
    cache_dir: PathBuf,
    cache_enabled: bool,
}

impl<S: ThemeSource> CachedThemeDownloader<S> {
    pub fn new(source: S, cache_dir: &Path, cache_enabled: bool) -> anyhow::Result<Self> {
        fs::create_dir_all(cache_dir)
            .with_context(|| format!("Creating cache directory {:?}", cache_dir))?;
        Ok(Self {
            source,
            cache_dir: cache_dir.to_path_buf(),
            cache_enabled,
        })
    }

    pub fn cache_filepath(&self, theme: &str, bbox: &NativeBoundingBox) -> PathBuf {
        self.cache_dir.join(get_cache_filename(theme, bbox))
    }

    /// Makes sure the raw response for `theme` in `bbox` is on disk and returns its path.
    ///
    /// With caching enabled an existing file is reused; otherwise the portal is
    /// queried and the file (re)written. Failed requests leave the cache untouched.
    pub fn sync_theme_to_file(
        &self,
        theme: &str,
        bbox: &NativeBoundingBox,
    ) -> anyhow::Result<PathBuf> {
        let cache_filepath = self.cache_filepath(theme, bbox);
        if self.cache_enabled && cache_filepath.exists() {
            log::debug!("Local file exists for {} in {}", theme, bbox);
            return Ok(cache_filepath);
        }

        log::debug!("Downloading {} for {}", theme, bbox);
        let raw = self.source.fetch_theme(theme, bbox)?;
        fs::write(&cache_filepath, raw)
            .with_context(|| format!("Could not write raw response to {:?}", cache_filepath))?;
        Ok(cache_filepath)
    }

    /// Returns the features of one tile. A cache file that does not parse is
    /// removed so the next run fetches it again.
    pub fn fetch_features(
        &self,
        theme: &str,
        bbox: &NativeBoundingBox,
        reprojector: &impl Reprojector,
    ) -> anyhow::Result<Vec<Feature>> {
        let cache_filepath = self.sync_theme_to_file(theme, bbox)?;
        let raw = fs::read_to_string(&cache_filepath)
            .with_context(|| format!("Reading {:?}", cache_filepath))?;
        match parse_theme_response(&raw, reprojector) {
            Ok(features) => Ok(features),
            Err(err) => {
                if let Err(remove_err) = fs::remove_file(&cache_filepath) {
                    log::warn!("Could not remove {:?}: {}", cache_filepath, remove_err);
                }
                Err(err.context(format!("Invalid response cached in {:?}", cache_filepath)))
            }
        }
    }
}
