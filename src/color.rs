// src/color.rs - Username color contrast limiting

use serde::{Deserialize, Serialize};

use crate::types::Rgb;

/// Chat background the contrast is measured against
pub const DEFAULT_BACKGROUND: Rgb = Rgb(12, 12, 12);

/// WCAG AA contrast for normal text
pub const DEFAULT_MIN_CONTRAST: f64 = 4.5;

/// Keeps username colors readable on a dark chat background
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorNormalizer {
    pub background: Rgb,
    pub min_contrast: f64,
}

impl Default for ColorNormalizer {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            min_contrast: DEFAULT_MIN_CONTRAST,
        }
    }
}

impl ColorNormalizer {
    pub fn new(background: Rgb, min_contrast: f64) -> Self {
        Self { background, min_contrast }
    }

    /// Lighten `color` until it reaches the minimum contrast, or every channel is 255
    pub fn limit_contrast(&self, color: Rgb) -> Rgb {
        let mut current = color;

        while contrast_ratio(current, self.background) < self.min_contrast
            && current != Rgb(255, 255, 255)
        {
            current = Rgb(lighten(current.0), lighten(current.1), lighten(current.2));
        }

        current
    }

    /// Display token for a username color
    pub fn normalize(&self, color: Rgb) -> String {
        to_hex(self.limit_contrast(color))
    }
}

/// Move a channel a tenth of the way to 255, always by at least one step
fn lighten(channel: u8) -> u8 {
    let remaining = 255 - channel as u16;
    let step = (remaining + 9) / 10;
    (channel as u16 + step) as u8
}

/// sRGB -> linear light (IEC 61966-2-1)
fn linearize(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Relative luminance as defined by WCAG 2.x
pub fn relative_luminance(color: Rgb) -> f64 {
    0.2126 * linearize(color.0) + 0.7152 * linearize(color.1) + 0.0722 * linearize(color.2)
}

/// Contrast ratio in [1, 21]
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    let (light, dark) = if la > lb { (la, lb) } else { (lb, la) };
    (light + 0.05) / (dark + 0.05)
}

pub fn to_hex(color: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", color.0, color.1, color.2)
}
