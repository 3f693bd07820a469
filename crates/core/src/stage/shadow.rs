//! Drop shadow drawn from the image's alpha channel.
//!
//! The image is downscaled to `max_side`, a black silhouette is cut from its
//! alpha, enlarged by 1%, blurred, and pasted twice under the image on a
//! transparent canvas padded by four times the offset.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use printpdf::image_crate::{
    self,
    imageops::{self, FilterType},
    ImageFormat, Rgba, RgbaImage,
};
use tracing::debug;

use super::config::ShadowConfig;
use super::error::StageError;
use super::traits::ImageStage;

const STAGE: &str = "add-shadow";

/// Adds a soft drop shadow to each image.
pub struct ShadowStage {
    config: ShadowConfig,
}

impl ShadowStage {
    pub fn new(config: ShadowConfig) -> Self {
        Self { config }
    }
}

/// Shrinks `image` so its longest side is at most `max_side`.
fn fit(image: RgbaImage, max_side: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let longest = w.max(h);
    if max_side == 0 || longest <= max_side {
        return image;
    }
    let scale = max_side as f32 / longest as f32;
    let nw = ((w as f32 * scale) as u32).max(1);
    let nh = ((h as f32 * scale) as u32).max(1);
    imageops::resize(&image, nw, nh, FilterType::Lanczos3)
}

/// Gaussian blur; wide kernels run on a reduced copy and are scaled back.
fn soften(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    let factor = ((sigma / 8.0).floor() as u32).clamp(1, w.min(h).max(1));
    if factor == 1 {
        return imageops::blur(image, sigma);
    }
    let small = imageops::resize(image, w / factor, h / factor, FilterType::Triangle);
    let blurred = imageops::blur(&small, sigma / factor as f32);
    imageops::resize(&blurred, w, h, FilterType::Triangle)
}

pub(crate) fn add_shadow(image: RgbaImage, config: &ShadowConfig) -> RgbaImage {
    let image = fit(image, config.max_side);
    let (w, h) = image.dimensions();

    let silhouette =
        RgbaImage::from_fn(w, h, |x, y| Rgba([0, 0, 0, image.get_pixel(x, y)[3]]));
    let silhouette = imageops::resize(
        &silhouette,
        (w * 101 / 100).max(1),
        (h * 101 / 100).max(1),
        FilterType::Lanczos3,
    );
    let shadow = soften(&silhouette, config.blur_radius * 3.0);

    let offset = config.offset_px;
    let mut canvas = RgbaImage::new(w + offset * 4, h + offset * 4);
    let at = i64::from(offset * 2);
    for _ in 0..2 {
        imageops::overlay(&mut canvas, &shadow, at, at);
    }
    imageops::overlay(&mut canvas, &image, at, at);
    canvas
}

fn render(config: &ShadowConfig, input: &Path, output: &Path) -> Result<(), StageError> {
    let decoded = image_crate::open(input)
        .map_err(|e| StageError::failed(STAGE, format!("cannot decode {}: {e}", input.display())))?;
    add_shadow(decoded.to_rgba8(), config)
        .save_with_format(output, ImageFormat::Png)
        .map_err(|e| StageError::failed(STAGE, format!("cannot write {}: {e}", output.display())))
}

#[async_trait]
impl ImageStage for ShadowStage {
    fn name(&self) -> &str {
        STAGE
    }

    async fn process(&self, input: &Path, output: &Path) -> Result<(), StageError> {
        if !input.exists() {
            return Err(StageError::InputNotFound {
                stage: STAGE.to_string(),
                path: input.to_path_buf(),
            });
        }

        if !self.config.enabled {
            tokio::fs::copy(input, output)
                .await
                .map_err(|e| StageError::io(STAGE, output, e))?;
            return Ok(());
        }

        let config = self.config.clone();
        let (src, dest): (PathBuf, PathBuf) = (input.to_path_buf(), output.to_path_buf());
        tokio::task::spawn_blocking(move || render(&config, &src, &dest))
            .await
            .map_err(|e| StageError::failed(STAGE, format!("shadow task failed: {e}")))??;

        debug!("Added shadow: {:?} -> {:?}", input, output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RED: Rgba<u8> = Rgba([220, 20, 20, 255]);

    fn small_config() -> ShadowConfig {
        ShadowConfig {
            enabled: true,
            offset_px: 2,
            blur_radius: 1.0,
            max_side: 1600,
        }
    }

    #[test]
    fn test_shadow_pads_canvas_and_keeps_subject() {
        // Opaque 10x10 square in the middle of a transparent 20x20 cutout.
        let subject = RgbaImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                RED
            } else {
                Rgba([0, 0, 0, 0])
            }
        });

        let out = add_shadow(subject, &small_config());

        assert_eq!(out.dimensions(), (28, 28));
        // Corners stay transparent.
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        // Subject is drawn on top at twice the offset.
        let center = out.get_pixel(14, 14);
        assert_eq!(center[3], 255);
        assert!(center[0] > 200 && center[1] < 40, "got {:?}", center);
        // Blurred silhouette shows just outside the square.
        let beside = out.get_pixel(20, 14);
        assert!(beside[3] > 0, "expected shadow, got {:?}", beside);
        assert_eq!((beside[0], beside[1], beside[2]), (0, 0, 0));
    }

    #[test]
    fn test_transparent_subject_casts_no_shadow() {
        let subject = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 0]));

        let out = add_shadow(subject, &small_config());

        assert!(out.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_large_images_are_downscaled() {
        let subject = RgbaImage::from_pixel(400, 200, RED);
        let config = ShadowConfig {
            max_side: 100,
            blur_radius: 0.0,
            ..small_config()
        };

        let out = add_shadow(subject, &config);

        assert_eq!(out.dimensions(), (108, 58));
    }

    #[test]
    fn test_wide_blur_keeps_dimensions() {
        let shadow = RgbaImage::from_pixel(64, 48, Rgba([0, 0, 0, 255]));
        assert_eq!(soften(&shadow, 30.0).dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn test_process_writes_png() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.png");
        let output = dir.path().join("b.png");
        RgbaImage::from_pixel(16, 12, RED).save(&input).unwrap();

        let stage = ShadowStage::new(small_config());
        stage.process(&input, &output).await.unwrap();

        let written = image_crate::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (24, 20));
    }

    #[tokio::test]
    async fn test_disabled_copies_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.png");
        let output = dir.path().join("b.png");
        std::fs::write(&input, b"png-bytes").unwrap();

        let stage = ShadowStage::new(ShadowConfig {
            enabled: false,
            ..Default::default()
        });
        stage.process(&input, &output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_undecodable_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.png");
        std::fs::write(&input, b"not a png").unwrap();

        let stage = ShadowStage::new(small_config());
        let err = stage
            .process(&input, &dir.path().join("b.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::Failed { .. }));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let stage = ShadowStage::new(small_config());
        let err = stage
            .process(&dir.path().join("gone.png"), &dir.path().join("b.png"))
            .await
            .unwrap_err();

        assert!(matches!(err, StageError::InputNotFound { .. }));
    }
}
