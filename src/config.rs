//! Page geometry options and the metrics derived from them

use crate::error::{PaginationError, Result};
use serde::{Deserialize, Serialize};

/// Token replaced by the running page number in header/footer templates
pub const PAGE_TOKEN: &str = "{page}";

/// User-facing pagination options.
///
/// Field names serialize in camelCase so the same JSON object can be shared
/// with the JavaScript side of the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationOptions {
    pub page_height: f32,
    pub page_width: f32,
    pub page_gap: f32,
    pub page_gap_border_size: f32,
    pub page_break_background: String,
    pub page_header_height: f32,
    pub page_margin_left: f32,
    pub page_margin_right: f32,
    pub footer_right: String,
    pub footer_left: String,
    pub header_right: String,
    pub header_left: String,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            page_height: 800.0,
            page_width: 790.0,
            page_gap: 50.0,
            page_gap_border_size: 1.0,
            page_break_background: "#ffffff".to_string(),
            page_header_height: 10.0,
            page_margin_left: 57.0,
            page_margin_right: 57.0,
            footer_right: PAGE_TOKEN.to_string(),
            footer_left: String::new(),
            header_right: String::new(),
            header_left: String::new(),
        }
    }
}

impl PaginationOptions {
    /// Parse and validate options from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Check that the options describe a usable page.
    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("pageHeight", self.page_height),
            ("pageWidth", self.page_width),
        ];
        for (name, value) in sizes {
            if !value.is_finite() || value <= 0.0 {
                return Err(PaginationError::InvalidOptions(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        let offsets = [
            ("pageGap", self.page_gap),
            ("pageGapBorderSize", self.page_gap_border_size),
            ("pageHeaderHeight", self.page_header_height),
            ("pageMarginLeft", self.page_margin_left),
            ("pageMarginRight", self.page_margin_right),
        ];
        for (name, value) in offsets {
            if !value.is_finite() || value < 0.0 {
                return Err(PaginationError::InvalidOptions(format!(
                    "{name} must be zero or positive, got {value}"
                )));
            }
        }

        if self.page_header_height * 2.0 >= self.page_height {
            return Err(PaginationError::InvalidOptions(format!(
                "pageHeaderHeight {} leaves no content area on a {}px page",
                self.page_header_height, self.page_height
            )));
        }

        if self.page_margin_left + self.page_margin_right >= self.page_width {
            return Err(PaginationError::InvalidOptions(format!(
                "horizontal margins {} + {} exceed pageWidth {}",
                self.page_margin_left, self.page_margin_right, self.page_width
            )));
        }

        Ok(())
    }

    /// Validate and derive the vertical metrics used by the layout engine.
    pub fn metrics(&self) -> Result<PageMetrics> {
        self.validate()?;
        Ok(PageMetrics {
            page_height: self.page_height,
            header_height: self.page_header_height,
            page_gap: self.page_gap,
        })
    }
}

/// Vertical page geometry, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    pub page_height: f32,
    pub header_height: f32,
    pub page_gap: f32,
}

impl PageMetrics {
    /// Space left for flowing content once header and footer are removed
    pub fn content_height(&self) -> f32 {
        self.page_height - 2.0 * self.header_height
    }

    /// Footer + gap + header band between two pages
    pub fn chrome_height(&self) -> f32 {
        2.0 * self.header_height + self.page_gap
    }

    /// Distance from the document top to the first content pixel of page 1.
    /// Page 0 also carries the first-page header.
    pub fn first_page_usable(&self) -> f32 {
        self.content_height() + self.header_height + self.chrome_height()
    }

    /// Distance between the first content pixels of two consecutive pages
    pub fn page_usable(&self) -> f32 {
        self.content_height() + self.chrome_height()
    }

    /// Page pitch used when removing pages
    pub fn page_stride(&self) -> f32 {
        self.page_height + self.page_gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metrics() {
        let metrics = PaginationOptions::default().metrics().unwrap();
        assert_eq!(metrics.content_height(), 780.0);
        assert_eq!(metrics.chrome_height(), 70.0);
        assert_eq!(metrics.first_page_usable(), 860.0);
        assert_eq!(metrics.page_usable(), 850.0);
        assert_eq!(metrics.page_stride(), 850.0);
    }

    #[test]
    fn test_from_json_partial() {
        let options = PaginationOptions::from_json(r#"{"pageHeight": 1000, "footerLeft": "p. {page}"}"#)
            .unwrap();
        assert_eq!(options.page_height, 1000.0);
        assert_eq!(options.footer_left, "p. {page}");
        assert_eq!(options.page_gap, 50.0);
    }

    #[test]
    fn test_rejects_header_larger_than_page() {
        let options = PaginationOptions {
            page_height: 100.0,
            page_header_height: 50.0,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(PaginationError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_rejects_negative_gap() {
        let err = PaginationOptions::from_json(r#"{"pageGap": -4}"#).unwrap_err();
        assert!(err.to_string().contains("pageGap"));
    }
}
