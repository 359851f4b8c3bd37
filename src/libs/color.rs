use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Apple crayon "snow", the live map background
    pub const SNOW: Rgb = Rgb::new(255, 255, 255);

    pub const RED: Rgb = Rgb::new(255, 0, 0);
}

impl FromStr for Rgb {
    type Err = anyhow::Error;

    /// Accepts `r,g,b`, `#rrggbb` or one of a few names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "snow" | "white" => return Ok(Rgb::SNOW),
            "black" => return Ok(Rgb::new(0, 0, 0)),
            "red" => return Ok(Rgb::RED),
            _ => {}
        }

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 {
                anyhow::bail!("Malformed color [{}]", s);
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
            return Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?));
        }

        let parts: Vec<&str> = s.split(',').map(|p| p.trim()).collect();
        if parts.len() != 3 {
            anyhow::bail!("Malformed color [{}], expected r,g,b", s);
        }
        Ok(Rgb::new(parts[0].parse()?, parts[1].parse()?, parts[2].parse()?))
    }
}

/// Scale output; `alpha` runs 0 (transparent) to 255 (opaque).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

pub trait ColorScale {
    fn map(&self, value: f64) -> Rgba;
}

fn alpha_of(fraction: f64) -> u8 {
    (num_traits::clamp(fraction, 0.0, 1.0) * 255.0).round() as u8
}

/// Fades in from transparent at 0 to the full color at `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactColorScale {
    pub threshold: f64,
    pub color: Rgb,
}

impl ContactColorScale {
    pub fn new(threshold: f64, color: Rgb) -> Self {
        Self { threshold, color }
    }
}

impl ColorScale for ContactColorScale {
    fn map(&self, value: f64) -> Rgba {
        let value = if value.is_nan() { 0.0 } else { value.max(0.0) };
        let alpha = if self.threshold > 0.0 {
            alpha_of(value / self.threshold)
        } else if value > 0.0 {
            255
        } else {
            0
        };

        Rgba {
            red: self.color.r,
            green: self.color.g,
            blue: self.color.b,
            alpha,
        }
    }
}

/// Full color at distance 0, transparent at `max_distance` and beyond.
/// Pairs without data sit past the far edge and show the background.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceColorScale {
    pub max_distance: f64,
    pub color: Rgb,
}

impl DistanceColorScale {
    pub fn new(max_distance: f64, color: Rgb) -> Self {
        Self {
            max_distance,
            color,
        }
    }
}

impl ColorScale for DistanceColorScale {
    fn map(&self, value: f64) -> Rgba {
        let fraction = if value.is_nan() {
            1.0
        } else if self.max_distance > 0.0 {
            value / self.max_distance
        } else if value > 0.0 {
            1.0
        } else {
            0.0
        };

        Rgba {
            red: self.color.r,
            green: self.color.g,
            blue: self.color.b,
            alpha: alpha_of(1.0 - num_traits::clamp(fraction, 0.0, 1.0)),
        }
    }
}

/// Colors shared by both live maps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub contact_color: Rgb,
    pub distance_color: Rgb,
    pub background: Rgb,
    /// Upper bound of the contact scale; `None` follows the largest count
    pub contact_threshold: Option<f64>,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            contact_color: Rgb::RED,
            distance_color: Rgb::RED,
            background: Rgb::SNOW,
            contact_threshold: None,
        }
    }
}

/// Alpha-over of `foreground` onto an opaque `background`
///
/// ```
/// use livemap::libs::color::{composite, Rgb, Rgba};
/// let fg = Rgba { red: 255, green: 0, blue: 0, alpha: 255 };
/// assert_eq!(composite(fg, Rgb::SNOW), Rgb::new(255, 0, 0));
/// let fg = Rgba { alpha: 0, ..fg };
/// assert_eq!(composite(fg, Rgb::SNOW), Rgb::SNOW);
/// ```
pub fn composite(foreground: Rgba, background: Rgb) -> Rgb {
    let alpha = foreground.alpha as f64 / 255.0;
    let over = |f: u8, b: u8| (f as f64 * alpha + b as f64 * (1.0 - alpha)).round() as u8;

    Rgb::new(
        over(foreground.red, background.r),
        over(foreground.green, background.g),
        over(foreground.blue, background.b),
    )
}

/// Square RGBA byte buffer, channel order R, G, B, A.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RgbaMatrix {
    side: usize,
    data: Vec<u8>,
}

impl RgbaMatrix {
    pub fn new(side: usize) -> Self {
        Self {
            side,
            data: vec![0; side * side * 4],
        }
    }

    /// Sizes the buffer for `side x side` pixels, zeroed. The allocation is
    /// kept when the length already matches.
    pub fn prepare(&mut self, side: usize) {
        let len = side * side * 4;
        if self.data.len() == len {
            self.data.fill(0);
        } else {
            self.data = vec![0; len];
        }
        self.side = side;
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Maps every value through `scale`, composites it onto `background` and writes
/// opaque pixels into `out`, reusing its allocation.
pub fn paint_into(
    out: &mut RgbaMatrix,
    values: &[f64],
    side: usize,
    scale: &dyn ColorScale,
    background: Rgb,
) {
    debug_assert_eq!(values.len(), side * side);
    out.prepare(side);

    for (pixel, value) in out.data.chunks_exact_mut(4).zip(values) {
        let Rgb { r, g, b } = composite(scale.map(*value), background);
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = b;
        pixel[3] = 255;
    }
}

pub fn paint(values: &[f64], side: usize, scale: &dyn ColorScale, background: Rgb) -> RgbaMatrix {
    let mut out = RgbaMatrix::default();
    paint_into(&mut out, values, side, scale, background);
    out
}
