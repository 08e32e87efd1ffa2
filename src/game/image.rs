//! Sky image lookup for the current record.
//!
//! The engine only describes which cutout it wants. Fetching is delegated
//! to an [`ImageProvider`] supplied by the presentation layer, and a failed
//! fetch never affects a round.

use serde::{Deserialize, Serialize};

use crate::catalog::SkyCoordinate;

/// SDSS DR16 JPEG cutout service.
pub const SDSS_CUTOUT_URL: &str = "http://skyserver.sdss.org/dr16/SkyServerWS/ImgCutout/getjpeg";

/// Cutout parameters shared by every request.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Arcseconds per pixel.
    pub scale: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            scale: 0.15,
            width: 250,
            height: 250,
        }
    }
}

impl ImageConfig {
    /// Set the image size in pixels.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Build the request for a position on the sky.
    #[must_use]
    pub fn request(&self, coordinate: SkyCoordinate) -> CutoutRequest {
        CutoutRequest {
            coordinate,
            scale: self.scale,
            width: self.width,
            height: self.height,
        }
    }
}

/// One image cutout centred on a record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CutoutRequest {
    pub coordinate: SkyCoordinate,
    pub scale: f64,
    pub width: u32,
    pub height: u32,
}

impl CutoutRequest {
    /// URL of the cutout on the SDSS image service.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "{SDSS_CUTOUT_URL}?ra={}&dec={}&scale={}&width={}&height={}",
            self.coordinate.ra, self.coordinate.dec, self.scale, self.width, self.height
        )
    }
}

/// Fetches cutouts. Implemented outside the engine (HTTP client, cache,
/// placeholder art).
pub trait ImageProvider {
    type Image;
    type Error: std::fmt::Display;

    /// Fetch the image described by `request`.
    ///
    /// # Errors
    ///
    /// Any provider failure. Callers treat it as "no image".
    fn fetch(&self, request: &CutoutRequest) -> Result<Self::Image, Self::Error>;
}

/// Returns the URL instead of image bytes.
///
/// Enough for a front end that lets the browser load the image itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct UrlProvider;

impl ImageProvider for UrlProvider {
    type Image = String;
    type Error = std::convert::Infallible;

    fn fetch(&self, request: &CutoutRequest) -> Result<String, Self::Error> {
        Ok(request.url())
    }
}
