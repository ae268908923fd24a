use async_trait::async_trait;

use super::{is_hex_color, ColorPair, DEFAULT_COLOR};

/// Named color channels reported by a palette provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Palette {
    /// Image-analysis swatches.
    Swatches {
        dominant: Option<String>,
        vibrant: Option<String>,
        muted: Option<String>,
        dark_vibrant: Option<String>,
        dark_muted: Option<String>,
    },
    /// Platform-provider style channels.
    Platform {
        primary: Option<String>,
        secondary: Option<String>,
        background: Option<String>,
        detail: Option<String>,
    },
}

impl Palette {
    /// Collapse the channels into one ordered pair. Missing or malformed
    /// channels fall through to the next candidate, then to the defaults.
    pub fn to_pair(&self) -> ColorPair {
        let pick = |candidates: &[&Option<String>]| {
            candidates
                .iter()
                .filter_map(|c| c.as_deref())
                .find(|c| is_hex_color(c))
                .map(str::to_string)
        };

        let (main, dark) = match self {
            Palette::Swatches {
                dominant,
                vibrant,
                muted,
                dark_vibrant,
                dark_muted,
            } => (
                pick(&[dominant, vibrant, muted]),
                pick(&[dark_muted, dark_vibrant]),
            ),
            Palette::Platform {
                primary,
                secondary,
                background,
                detail,
            } => (pick(&[primary, background]), pick(&[secondary, detail])),
        };

        let main = main.unwrap_or_else(|| DEFAULT_COLOR.to_string());
        let dark = dark.unwrap_or_else(|| main.clone());
        ColorPair::new(&main, &dark).unwrap_or_else(|_| ColorPair::fallback())
    }
}

/// The optional palette capability.
#[async_trait]
pub trait PaletteSource: Send + Sync {
    /// `Ok(None)` when the image yields no palette at all.
    async fn palette(&self, image_url: &str) -> anyhow::Result<Option<Palette>>;
}

#[cfg(feature = "palette")]
pub use image_source::ImagePalette;

#[cfg(feature = "palette")]
mod image_source {
    use super::{Palette, PaletteSource};
    use crate::colors::swatches::swatches_from_pixels;
    use anyhow::Context;
    use async_trait::async_trait;

    const SAMPLE_EDGE: u32 = 64;

    /// Downloads album art and analyses it locally.
    #[derive(Debug, Clone)]
    pub struct ImagePalette {
        http: reqwest::Client,
    }

    impl ImagePalette {
        pub fn new(http: reqwest::Client) -> Self {
            Self { http }
        }
    }

    #[async_trait]
    impl PaletteSource for ImagePalette {
        async fn palette(&self, image_url: &str) -> anyhow::Result<Option<Palette>> {
            let bytes = self
                .http
                .get(image_url)
                .send()
                .await
                .context("fetch image")?
                .error_for_status()
                .context("image http status")?
                .bytes()
                .await
                .context("read image body")?;

            tokio::task::spawn_blocking(move || -> anyhow::Result<Option<Palette>> {
                let img = image::load_from_memory(&bytes).context("decode image")?;
                let sample = img.thumbnail(SAMPLE_EDGE, SAMPLE_EDGE).to_rgba8();
                Ok(swatches_from_pixels(
                    sample
                        .pixels()
                        .filter(|p| p.0[3] >= 125)
                        .map(|p| [p.0[0], p.0[1], p.0[2]]),
                ))
            })
            .await
            .context("palette task")?
        }
    }
}
