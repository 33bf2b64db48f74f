//! Release metadata as published by the artifact host.

use serde::Serialize;

use crate::domain::error::ReleaseError;

/// Tag alias for the most recent published release.
pub const LATEST: &str = "latest";

/// One downloadable asset of a release. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseAsset {
    pub tag: String,
    pub asset_name: String,
    pub download_url: String,
}

/// A published release and its assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub tag: String,
    /// `(asset_name, download_url)` pairs in publication order.
    pub assets: Vec<(String, String)>,
}

impl Release {
    /// Locate the download URL of `asset_name`.
    ///
    /// # Errors
    ///
    /// Returns `ReleaseError::AssetNotFound` listing every available name.
    pub fn find_asset_url(&self, asset_name: &str) -> Result<ReleaseAsset, ReleaseError> {
        self.assets
            .iter()
            .find(|(name, _)| name == asset_name)
            .map(|(name, url)| ReleaseAsset {
                tag: self.tag.clone(),
                asset_name: name.clone(),
                download_url: url.clone(),
            })
            .ok_or_else(|| ReleaseError::AssetNotFound {
                asset: asset_name.to_string(),
                available: self.assets.iter().map(|(n, _)| n.clone()).collect(),
            })
    }
}
