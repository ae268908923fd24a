//! Album-art colors: the `PRIMARY|SECONDARY` pair stored on snippets, the
//! palette capability that derives it, and card shading helpers.

pub mod extractor;
pub mod palette;
#[cfg(feature = "palette")]
mod swatches;

use std::fmt;
use std::str::FromStr;

pub use extractor::ColorExtractor;
pub use palette::{Palette, PaletteSource};

pub const DEFAULT_COLOR: &str = "#8B8E98";
pub const DEFAULT_DARK: &str = "#6B6E78";

/// Two hex colors, rendered as `PRIMARY|SECONDARY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPair {
    primary: String,
    secondary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed color pair: {0:?}")]
pub struct ColorPairError(String);

impl ColorPair {
    pub fn new(primary: &str, secondary: &str) -> Result<Self, ColorPairError> {
        if !is_hex_color(primary) || !is_hex_color(secondary) {
            return Err(ColorPairError(format!("{primary}|{secondary}")));
        }
        Ok(Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
        })
    }

    pub fn fallback() -> Self {
        Self {
            primary: DEFAULT_COLOR.to_string(),
            secondary: DEFAULT_DARK.to_string(),
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn secondary(&self) -> &str {
        &self.secondary
    }
}

impl fmt::Display for ColorPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.primary, self.secondary)
    }
}

impl FromStr for ColorPair {
    type Err = ColorPairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once('|')
            .ok_or_else(|| ColorPairError(s.to_string()))?;
        ColorPair::new(a.trim(), b.trim())
    }
}

/// `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
pub fn is_hex_color(s: &str) -> bool {
    let Some(digits) = s.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_rgb(s: &str) -> Option<[u8; 3]> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    let bytes = hex::decode(digits.get(..6)?).ok()?;
    Some([bytes[0], bytes[1], bytes[2]])
}

fn blend(hex_color: &str, toward: u8, amount: f32) -> Option<String> {
    let rgb = parse_rgb(hex_color)?;
    let amount = amount.clamp(0.0, 1.0);
    let mixed = rgb.map(|c| {
        let c = c as f32;
        (c + (toward as f32 - c) * amount).round().clamp(0.0, 255.0) as u8
    });
    Some(format!("#{}", hex::encode(mixed)))
}

/// Blend toward black, for readable text over a light card.
pub fn darken(hex_color: &str, amount: f32) -> String {
    blend(hex_color, 0, amount).unwrap_or_else(|| "#1a1a1a".to_string())
}

/// Blend toward white, for a soft flat card background.
pub fn lighten(hex_color: &str, amount: f32) -> String {
    blend(hex_color, 255, amount).unwrap_or_else(|| "#f5f5f5".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_parses_and_displays() {
        let pair: ColorPair = "#CF9CD1|#3A2B40".parse().unwrap();
        assert_eq!(pair.primary(), "#CF9CD1");
        assert_eq!(pair.secondary(), "#3A2B40");
        assert_eq!(pair.to_string(), "#CF9CD1|#3A2B40");
    }

    #[test]
    fn malformed_pairs_are_rejected() {
        for raw in ["", "#fff", "#fff|", "red|blue", "#12345|#123456", "#GGGGGG|#000000"] {
            assert!(raw.parse::<ColorPair>().is_err(), "{raw}");
        }
        assert!("#fff|#00000080".parse::<ColorPair>().is_ok());
    }

    #[test]
    fn shading_blends_channels() {
        assert_eq!(darken("#CF9CD1", 0.55), "#5d465e");
        assert_eq!(lighten("#A67C3B", 0.4), "#cab089");
        assert_eq!(darken("#000000", 0.5), "#000000");
        assert_eq!(lighten("#ffffff", 0.5), "#ffffff");
    }

    #[test]
    fn shading_falls_back_on_garbage() {
        assert_eq!(darken("oops", 0.5), "#1a1a1a");
        assert_eq!(lighten("#12", 0.5), "#f5f5f5");
    }
}
