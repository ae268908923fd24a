use once_cell::sync::{Lazy, OnceCell};
use std::sync::Arc;

use super::{ColorPair, PaletteSource};

type Loader = Box<dyn Fn() -> Option<Arc<dyn PaletteSource>> + Send + Sync>;

/// Image URL to color pair. The palette capability is resolved on first use
/// and never retried; when it is unavailable every call yields `None`.
pub struct ColorExtractor {
    loader: Loader,
    module: OnceCell<Option<Arc<dyn PaletteSource>>>,
}

static GLOBAL: Lazy<ColorExtractor> = Lazy::new(ColorExtractor::builtin);
static DISABLED: Lazy<ColorExtractor> = Lazy::new(ColorExtractor::disabled);

impl ColorExtractor {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Option<Arc<dyn PaletteSource>> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            module: OnceCell::new(),
        }
    }

    /// An extractor whose capability is never available.
    pub fn disabled() -> Self {
        Self::new(|| None)
    }

    /// The process-wide extractor backed by the built-in image analysis.
    pub fn global() -> &'static ColorExtractor {
        &GLOBAL
    }

    /// `global()` unless colors are switched off in config.
    pub fn shared(enabled: bool) -> &'static ColorExtractor {
        if enabled { Self::global() } else { &DISABLED }
    }

    #[cfg(feature = "palette")]
    fn builtin() -> Self {
        Self::new(|| {
            let http = reqwest::Client::builder()
                .user_agent(concat!("snipify/", env!("CARGO_PKG_VERSION")))
                .timeout(std::time::Duration::from_secs(10))
                .build();
            match http {
                Ok(http) => {
                    let source: Arc<dyn PaletteSource> =
                        Arc::new(super::palette::ImagePalette::new(http));
                    Some(source)
                }
                Err(e) => {
                    tracing::warn!("palette http client unavailable: {e}");
                    None
                }
            }
        })
    }

    #[cfg(not(feature = "palette"))]
    fn builtin() -> Self {
        Self::disabled()
    }

    fn module(&self) -> Option<&Arc<dyn PaletteSource>> {
        self.module
            .get_or_init(|| {
                let module = (self.loader)();
                if module.is_none() {
                    tracing::debug!("palette capability unavailable; colors disabled");
                }
                module
            })
            .as_ref()
    }

    pub async fn extract(&self, image_url: Option<&str>) -> Option<ColorPair> {
        let url = image_url.map(str::trim).filter(|u| u.starts_with("http"))?;
        let module = self.module()?;
        match module.palette(url).await {
            Ok(Some(palette)) => Some(palette.to_pair()),
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("color extraction failed for {url}: {e:#}");
                None
            }
        }
    }
}
