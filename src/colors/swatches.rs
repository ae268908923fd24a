//! Swatch extraction from decoded pixels.

use std::collections::HashMap;

use super::Palette;

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    count: u32,
    sum: [u64; 3],
}

impl Bucket {
    fn average(&self) -> [u8; 3] {
        let n = self.count.max(1) as u64;
        self.sum.map(|s| (s / n) as u8)
    }
}

/// Hue-free HSL components: (saturation, lightness), both 0..=1.
fn saturation_lightness(rgb: [u8; 3]) -> (f32, f32) {
    let [r, g, b] = rgb.map(|c| c as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if (max - min).abs() < f32::EPSILON {
        return (0.0, l);
    }
    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
    (s, l)
}

/// Derive swatches from RGB pixels. Pixels are bucketed at 5 bits per
/// channel; each swatch is the most populous bucket in its band.
pub fn swatches_from_pixels(pixels: impl IntoIterator<Item = [u8; 3]>) -> Option<Palette> {
    let mut buckets: HashMap<u16, Bucket> = HashMap::new();
    for [r, g, b] in pixels {
        let key = ((r as u16 >> 3) << 10) | ((g as u16 >> 3) << 5) | (b as u16 >> 3);
        let bucket = buckets.entry(key).or_default();
        bucket.count += 1;
        bucket.sum[0] += r as u64;
        bucket.sum[1] += g as u64;
        bucket.sum[2] += b as u64;
    }
    if buckets.is_empty() {
        return None;
    }

    let mut ranked: Vec<(u32, [u8; 3])> = buckets
        .values()
        .map(|b| (b.count, b.average()))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let find = |accept: &dyn Fn(f32, f32) -> bool| {
        ranked
            .iter()
            .find(|(_, rgb)| {
                let (s, l) = saturation_lightness(*rgb);
                accept(s, l)
            })
            .map(|(_, rgb)| rgb_to_hex(*rgb))
    };

    Some(Palette::Swatches {
        dominant: ranked.first().map(|(_, rgb)| rgb_to_hex(*rgb)),
        vibrant: find(&|s: f32, l: f32| s >= 0.35 && (0.3..=0.75).contains(&l)),
        muted: find(&|s: f32, l: f32| s < 0.35 && (0.3..=0.75).contains(&l)),
        dark_vibrant: find(&|s: f32, l: f32| s >= 0.35 && l < 0.3),
        dark_muted: find(&|s: f32, l: f32| s < 0.35 && l < 0.3),
    })
}

fn rgb_to_hex(rgb: [u8; 3]) -> String {
    format!("#{}", hex::encode_upper(rgb))
}
