// SPDX-License-Identifier: GPL-3.0-only

//! Core types for frame processing results
//!
//! These types describe what the decoder found in a frame and the product
//! record carried by a scanned code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A rectangular region within a frame
///
/// Coordinates are normalized (0.0 to 1.0) relative to the frame dimensions.
/// This allows easy transformation to screen coordinates regardless of
/// the actual frame size or display scaling.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRegion {
    /// Left edge (0.0 = left of frame, 1.0 = right of frame)
    pub x: f32,
    /// Top edge (0.0 = top of frame, 1.0 = bottom of frame)
    pub y: f32,
    /// Width as fraction of frame width
    pub width: f32,
    /// Height as fraction of frame height
    pub height: f32,
}

impl FrameRegion {
    /// Create a frame region from pixel coordinates
    pub fn from_pixels(
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    ) -> Self {
        Self {
            x: x as f32 / frame_width as f32,
            y: y as f32 / frame_height as f32,
            width: width as f32 / frame_width as f32,
            height: height as f32 / frame_height as f32,
        }
    }
}

/// Guide rectangle drawn on the preview, in pixel coordinates
///
/// Purely visual: codes outside the region are still decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRegion {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl ScanRegion {
    /// The middle half of a frame: (w/4, h/4) to (3w/4, 3h/4)
    pub fn centered(width: u32, height: u32) -> Self {
        Self {
            x0: width / 4,
            y0: height / 4,
            x1: width * 3 / 4,
            y1: height * 3 / 4,
        }
    }
}

/// One symbol found in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct RawSymbol {
    /// Decoded payload bytes, not yet interpreted
    pub payload: Vec<u8>,
    /// Where the symbol sits in the frame, when the detector reports it
    pub bounds: Option<FrameRegion>,
}

/// Product price as written by the QR generator
///
/// The generator writes prices as numeric strings (`"12.50"`), but plain
/// JSON numbers are accepted too. The decimal text is kept verbatim so no
/// precision is lost on the way to the display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PriceRepr", into = "String")]
pub struct Price(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum PriceRepr {
    Number(serde_json::Number),
    Text(String),
}

impl TryFrom<PriceRepr> for Price {
    type Error = String;

    fn try_from(repr: PriceRepr) -> Result<Self, Self::Error> {
        match repr {
            PriceRepr::Number(n) => Ok(Price(n.to_string())),
            PriceRepr::Text(text) => Price::parse(&text),
        }
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Price {
    /// Accept decimal text such as `12`, `12.5`, `-0.99` or `1E+3`
    pub fn parse(text: &str) -> Result<Self, String> {
        let trimmed = text.trim();
        let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
        let (mantissa, exponent) = match digits.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => (mantissa, Some(exponent)),
            None => (digits, None),
        };
        let (whole, frac) = match mantissa.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (mantissa, None),
        };

        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let valid = all_digits(whole)
            && frac.is_none_or(all_digits)
            && exponent.is_none_or(|e| {
                all_digits(e.strip_prefix(['+', '-']).unwrap_or(e))
            });

        if valid {
            Ok(Price(trimmed.to_string()))
        } else {
            Err(format!("price is not a number: {:?}", text))
        }
    }

    /// The decimal text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Product record carried by a scanned code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecodedRecord {
    pub product_id: i64,
    pub name: String,
    pub category: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DecodedRecord {
    /// Labeled rows in display order; the description row only when present
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = vec![
            ("ID", self.product_id.to_string()),
            ("Name", self.name.clone()),
            ("Category", self.category.clone()),
            ("Price", self.price.to_string()),
        ];
        if let Some(description) = &self.description {
            rows.push(("Description", description.clone()));
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_scan_region() {
        let region = ScanRegion::centered(640, 480);
        assert_eq!(
            region,
            ScanRegion {
                x0: 160,
                y0: 120,
                x1: 480,
                y1: 360
            }
        );
    }

    #[test]
    fn test_frame_region_from_pixels() {
        let region = FrameRegion::from_pixels(160, 120, 320, 240, 640, 480);
        assert_eq!(region.x, 0.25);
        assert_eq!(region.height, 0.5);
    }

    #[test]
    fn test_price_accepts_numbers_and_numeric_text() {
        let from_text: Price = serde_json::from_str(r#""12.50""#).unwrap();
        assert_eq!(from_text.as_str(), "12.50");
        assert_eq!(from_text.to_string(), "$12.50");

        let from_number: Price = serde_json::from_str("3").unwrap();
        assert_eq!(from_number.as_str(), "3");
    }

    #[test]
    fn test_price_rejects_non_numeric_text() {
        assert!(Price::parse("cheap").is_err());
        assert!(Price::parse("1.").is_err());
        assert!(Price::parse("").is_err());
        assert!(Price::parse("-4.25").is_ok());
        assert!(Price::parse("1E").is_err());
        assert!(Price::parse("1e+").is_err());
        assert!(Price::parse("E5").is_err());
    }

    #[test]
    fn test_price_accepts_exponent_text() {
        assert_eq!(Price::parse("1E+3").unwrap().as_str(), "1E+3");
        assert!(Price::parse("1E-7").is_ok());
        assert!(Price::parse("2.5e2").is_ok());

        let record = crate::frame_processor::parse(
            br#"{"product_id": 3, "name": "Bolt", "category": "Parts", "price": "1E-7"}"#,
        )
        .unwrap();
        assert_eq!(record.price.to_string(), "$1E-7");
    }

    #[test]
    fn test_rows_skip_missing_description() {
        let record = DecodedRecord {
            product_id: 7,
            name: "Widget".into(),
            category: "Tools".into(),
            price: Price::parse("9.99").unwrap(),
            description: None,
        };
        let rows = record.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], ("Price", "$9.99".to_string()));
    }
}
