use crate::config::ColorConfig;
use crate::scale::QuantileScale;
use crate::types::Record;
use anyhow::{anyhow, Context, Result};
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parses `#rgb` or `#rrggbb`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim_start_matches('#');
        if !digits.is_ascii() {
            return Err(anyhow!("Invalid hex color: {hex}"));
        }
        let channel = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|_| anyhow!("Invalid hex color: {hex}"))
        };
        match digits.len() {
            3 => {
                let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
                Ok(Rgb {
                    r: expand(0)?,
                    g: expand(1)?,
                    b: expand(2)?,
                })
            }
            6 => Ok(Rgb {
                r: channel(&digits[0..2])?,
                g: channel(&digits[2..4])?,
                b: channel(&digits[4..6])?,
            }),
            _ => Err(anyhow!("Invalid hex color: {hex}")),
        }
    }

    /// Channel-wise interpolation in sRGB, `t` in [0, 1].
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8;
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parsed colors used by every renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    /// Light to dark.
    pub classes: Vec<Rgb>,
    pub fallback: Rgb,
    pub highlight_stroke: Rgb,
    pub highlight_width: f64,
}

impl Palette {
    pub fn from_config(config: &ColorConfig) -> Result<Self> {
        let classes = config
            .classes
            .iter()
            .map(|hex| Rgb::from_hex(hex))
            .collect::<Result<Vec<_>>>()
            .context("Invalid color class")?;
        Ok(Self {
            classes,
            fallback: Rgb::from_hex(&config.fallback).context("Invalid fallback color")?,
            highlight_stroke: Rgb::from_hex(&config.highlight_stroke)
                .context("Invalid highlight color")?,
            highlight_width: config.highlight_width,
        })
    }

    /// Quantile scale over every record's value of `attribute`.
    pub fn scale_for(&self, records: &[Record], attribute: &str) -> QuantileScale<Rgb> {
        QuantileScale::new(
            records.iter().map(|r| r.value(attribute)),
            self.classes.clone(),
        )
    }
}
