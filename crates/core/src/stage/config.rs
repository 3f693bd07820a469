//! Configuration for pipeline stages.

use serde::{Deserialize, Serialize};

/// Background removal service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundConfig {
    /// API key sent as `x-api-key`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Segmentation endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://sdk.photoroom.com/v1/segment".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Drop-shadow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowConfig {
    /// When disabled the stage copies its input unchanged.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Shadow offset in pixels; the canvas grows by four times this.
    #[serde(default = "default_offset_px")]
    pub offset_px: u32,

    /// Blur radius; the shadow is blurred with a sigma of three times this.
    #[serde(default = "default_blur_radius")]
    pub blur_radius: f32,

    /// Larger images are downscaled so their longest side fits.
    #[serde(default = "default_max_side")]
    pub max_side: u32,
}

fn default_true() -> bool {
    true
}

fn default_offset_px() -> u32 {
    10
}

fn default_blur_radius() -> f32 {
    10.0
}

fn default_max_side() -> u32 {
    1600
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            offset_px: default_offset_px(),
            blur_radius: default_blur_radius(),
            max_side: default_max_side(),
        }
    }
}

/// Page layout for the composed document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    #[serde(default = "default_grid")]
    pub columns: usize,

    #[serde(default = "default_grid")]
    pub rows: usize,

    #[serde(default = "default_margin_mm")]
    pub margin_mm: f32,

    #[serde(default = "default_page_width_mm")]
    pub page_width_mm: f32,

    #[serde(default = "default_page_height_mm")]
    pub page_height_mm: f32,

    /// Document title embedded in the PDF metadata.
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_grid() -> usize {
    3
}

fn default_margin_mm() -> f32 {
    10.0
}

fn default_page_width_mm() -> f32 {
    210.0
}

fn default_page_height_mm() -> f32 {
    297.0
}

fn default_title() -> String {
    "AutoCanvas".to_string()
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            columns: default_grid(),
            rows: default_grid(),
            margin_mm: default_margin_mm(),
            page_width_mm: default_page_width_mm(),
            page_height_mm: default_page_height_mm(),
            title: default_title(),
        }
    }
}

impl ComposeConfig {
    /// Images per page.
    pub fn per_page(&self) -> usize {
        self.columns * self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let compose = ComposeConfig::default();
        assert_eq!(compose.per_page(), 9);
        assert_eq!(compose.margin_mm, 10.0);

        let shadow = ShadowConfig::default();
        assert!(shadow.enabled);
        assert_eq!(shadow.offset_px, 10);
        assert_eq!(shadow.max_side, 1600);

        let background = BackgroundConfig::default();
        assert!(background.api_key.is_none());
        assert_eq!(background.timeout_secs, 60);
    }

    #[test]
    fn test_partial_toml() {
        let shadow: ShadowConfig = toml::from_str(
            r#"
enabled = false
offset_px = 4
"#,
        )
        .unwrap();
        assert!(!shadow.enabled);
        assert_eq!(shadow.offset_px, 4);
        assert_eq!(shadow.blur_radius, 10.0);
    }
}
