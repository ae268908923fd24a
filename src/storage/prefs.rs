use super::{StorageHandle, KEY_APP_THEME, KEY_PROFILE_FONT, KEY_SNIPPETS_LAYOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeId {
    #[default]
    Default,
    Cream,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontId {
    #[default]
    Default,
    Doto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnippetsLayout {
    #[default]
    List,
    Grid,
}

/// A preference value drawn from a small closed set of strings.
pub trait Preference: Sized + Copy + Default {
    const KEY: &'static str;
    fn as_str(self) -> &'static str;
    fn parse(raw: &str) -> Option<Self>;
}

impl Preference for ThemeId {
    const KEY: &'static str = KEY_APP_THEME;

    fn as_str(self) -> &'static str {
        match self {
            ThemeId::Default => "default",
            ThemeId::Cream => "cream",
            ThemeId::Flat => "flat",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "default" => Some(ThemeId::Default),
            "cream" => Some(ThemeId::Cream),
            "flat" => Some(ThemeId::Flat),
            _ => None,
        }
    }
}

impl Preference for FontId {
    const KEY: &'static str = KEY_PROFILE_FONT;

    fn as_str(self) -> &'static str {
        match self {
            FontId::Default => "default",
            FontId::Doto => "Doto",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "default" => Some(FontId::Default),
            "Doto" => Some(FontId::Doto),
            _ => None,
        }
    }
}

impl Preference for SnippetsLayout {
    const KEY: &'static str = KEY_SNIPPETS_LAYOUT;

    fn as_str(self) -> &'static str {
        match self {
            SnippetsLayout::List => "list",
            SnippetsLayout::Grid => "grid",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "list" => Some(SnippetsLayout::List),
            "grid" => Some(SnippetsLayout::Grid),
            _ => None,
        }
    }
}

impl SnippetsLayout {
    pub fn toggled(self) -> Self {
        match self {
            SnippetsLayout::List => SnippetsLayout::Grid,
            SnippetsLayout::Grid => SnippetsLayout::List,
        }
    }
}

/// Read a preference; missing, unknown, or unreadable values yield the default.
pub async fn load<P: Preference>(storage: &StorageHandle) -> P {
    match storage.get(P::KEY).await {
        Ok(Some(raw)) => P::parse(&raw).unwrap_or_default(),
        Ok(None) => P::default(),
        Err(e) => {
            tracing::warn!("read {}: {e:#}", P::KEY);
            P::default()
        }
    }
}

pub async fn store<P: Preference>(storage: &StorageHandle, value: P) -> anyhow::Result<()> {
    storage.set(P::KEY, value.as_str().to_string()).await
}
