//! Logo acquisition and decoding.
//!
//! Every failure here is soft: the compositor turns a [`DecodeFailure`]
//! into a pass-through of the undecorated symbol.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tracing::debug;

/// Where a logo comes from.
#[derive(Debug, Clone)]
pub enum LogoSource {
    /// Encoded image bytes (PNG, JPEG, WebP, ...).
    Bytes(Arc<[u8]>),
    /// An image file on disk.
    File(PathBuf),
    /// An HTTP(S) URL fetched on demand.
    Url(String),
    /// An image that is already decoded.
    Decoded(Arc<DynamicImage>),
}

impl LogoSource {
    pub fn bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self::Bytes(data.into())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn decoded(img: DynamicImage) -> Self {
        Self::Decoded(Arc::new(img))
    }
}

/// Why a logo or base image could not be turned into pixels.
#[derive(Debug, thiserror::Error)]
pub enum DecodeFailure {
    #[error("Logo fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Logo fetch returned status {0}")]
    FetchStatus(u16),

    #[error("Logo read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image has no pixels")]
    Empty,

    #[error("SVG rasterization failed: {0}")]
    Rasterize(String),

    #[error("Decode timed out after {0:?}")]
    Timeout(Duration),

    #[error("Decode task failed: {0}")]
    Task(String),
}

/// Fetch or read the logo and decode it on the blocking pool.
pub async fn load_logo(source: &LogoSource) -> Result<Arc<DynamicImage>, DecodeFailure> {
    let bytes: Arc<[u8]> = match source {
        LogoSource::Decoded(img) => return non_empty(img.clone()),
        LogoSource::Bytes(data) => data.clone(),
        LogoSource::File(path) => {
            debug!(path = %path.display(), "Reading logo file");
            tokio::fs::read(path).await?.into()
        }
        LogoSource::Url(url) => {
            debug!(url, "Fetching logo");
            let resp = reqwest::get(url.as_str()).await?;
            if !resp.status().is_success() {
                return Err(DecodeFailure::FetchStatus(resp.status().as_u16()));
            }
            resp.bytes().await?.to_vec().into()
        }
    };

    let img = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| DecodeFailure::Task(e.to_string()))??;

    debug!(width = img.width(), height = img.height(), "Decoded logo");
    non_empty(Arc::new(img))
}

fn non_empty(img: Arc<DynamicImage>) -> Result<Arc<DynamicImage>, DecodeFailure> {
    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeFailure::Empty);
    }
    Ok(img)
}
