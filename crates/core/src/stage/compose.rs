//! PDF contact-sheet composition.
//!
//! Images are laid out row by row on fixed-size pages, `columns x rows` per
//! page. Each image is scaled to fit its cell with its aspect ratio kept and
//! centred in the cell. The document is written to the output directory as
//! `canvas_<YYYYmmdd_HHMMSS>.pdf`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use printpdf::image_crate::{self, DynamicImage, RgbImage};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use tracing::debug;

use super::config::ComposeConfig;
use super::error::StageError;
use super::traits::{ComposedArtifact, Composer};

const STAGE: &str = "compose-artifact";
const DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;

/// Placement of one image on a page, in millimetres from the bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Placement {
    pub page: usize,
    pub x_mm: f32,
    pub y_mm: f32,
    pub scale: f32,
}

/// Writes batches of images into A4 PDF grids.
pub struct PdfComposer {
    config: ComposeConfig,
    output_dir: PathBuf,
}

impl PdfComposer {
    pub fn new(config: ComposeConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Number of pages needed for `count` images.
pub(crate) fn page_count(count: usize, per_page: usize) -> usize {
    count.div_ceil(per_page.max(1))
}

/// Computes where the `index`-th image of `width_px x height_px` goes.
pub(crate) fn place(
    config: &ComposeConfig,
    index: usize,
    width_px: u32,
    height_px: u32,
) -> Placement {
    let per_page = config.per_page().max(1);
    let page = index / per_page;
    let slot = index % per_page;
    let row = slot / config.columns.max(1);
    let col = slot % config.columns.max(1);

    let cell_w = (config.page_width_mm - 2.0 * config.margin_mm) / config.columns.max(1) as f32;
    let cell_h = (config.page_height_mm - 2.0 * config.margin_mm) / config.rows.max(1) as f32;

    // Natural size at the embedding DPI.
    let natural_w = width_px.max(1) as f32 * MM_PER_INCH / DPI;
    let natural_h = height_px.max(1) as f32 * MM_PER_INCH / DPI;
    let scale = (cell_w / natural_w).min(cell_h / natural_h);

    let drawn_w = natural_w * scale;
    let drawn_h = natural_h * scale;
    let cell_x = config.margin_mm + col as f32 * cell_w;
    // Rows fill from the top of the page.
    let cell_top = config.page_height_mm - config.margin_mm - row as f32 * cell_h;

    Placement {
        page,
        x_mm: cell_x + (cell_w - drawn_w) / 2.0,
        y_mm: cell_top - cell_h + (cell_h - drawn_h) / 2.0,
        scale,
    }
}

/// Picks `canvas_<stamp>.pdf`, adding `_<n>` if the name is taken.
pub(crate) fn unique_output_path(dir: &Path, stamp: &str) -> PathBuf {
    let first = dir.join(format!("canvas_{stamp}.pdf"));
    if !first.exists() {
        return first;
    }
    (1..)
        .map(|n| dir.join(format!("canvas_{stamp}_{n}.pdf")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

/// Composites transparent pixels onto white.
fn flatten(image: DynamicImage) -> DynamicImage {
    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut rgb = RgbImage::new(w, h);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, image_crate::Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(rgb)
}

fn render(config: &ComposeConfig, images: &[PathBuf]) -> Result<(Vec<u8>, usize), StageError> {
    let page_w = Mm(config.page_width_mm);
    let page_h = Mm(config.page_height_mm);
    let pages = page_count(images.len(), config.per_page());

    let (doc, first_page, first_layer) = PdfDocument::new(&config.title, page_w, page_h, "Layer 1");
    let mut layers = vec![doc.get_page(first_page).get_layer(first_layer)];
    for _ in 1..pages {
        let (page, layer) = doc.add_page(page_w, page_h, "Layer 1");
        layers.push(doc.get_page(page).get_layer(layer));
    }

    for (index, path) in images.iter().enumerate() {
        let decoded = image_crate::open(path)
            .map_err(|e| StageError::failed(STAGE, format!("cannot decode {}: {e}", path.display())))?;
        let placement = place(config, index, decoded.width(), decoded.height());

        Image::from_dynamic_image(&flatten(decoded)).add_to_layer(
            layers[placement.page].clone(),
            ImageTransform {
                translate_x: Some(Mm(placement.x_mm)),
                translate_y: Some(Mm(placement.y_mm)),
                scale_x: Some(placement.scale),
                scale_y: Some(placement.scale),
                dpi: Some(DPI),
                ..Default::default()
            },
        );
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| StageError::failed(STAGE, format!("failed to write PDF: {e}")))?;
    Ok((bytes, pages))
}

#[async_trait]
impl Composer for PdfComposer {
    async fn compose(&self, images: &[PathBuf]) -> Result<ComposedArtifact, StageError> {
        if images.is_empty() {
            return Err(StageError::failed(STAGE, "no images to compose"));
        }
        for path in images {
            if !path.exists() {
                return Err(StageError::InputNotFound {
                    stage: STAGE.to_string(),
                    path: path.clone(),
                });
            }
        }

        let config = self.config.clone();
        let inputs = images.to_vec();
        let (bytes, pages) = tokio::task::spawn_blocking(move || render(&config, &inputs))
            .await
            .map_err(|e| StageError::failed(STAGE, format!("render task failed: {e}")))??;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| StageError::io(STAGE, &self.output_dir, e))?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let path = unique_output_path(&self.output_dir, &stamp);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| StageError::io(STAGE, &path, e))?;

        debug!("Composed {} images into {:?} ({} pages)", images.len(), path, pages);
        Ok(ComposedArtifact { path, pages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(path: &Path, w: u32, h: u32) {
        let img = image_crate::RgbaImage::from_pixel(w, h, image_crate::Rgba([200, 10, 10, 128]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 9), 0);
        assert_eq!(page_count(1, 9), 1);
        assert_eq!(page_count(9, 9), 1);
        assert_eq!(page_count(10, 9), 2);
    }

    #[test]
    fn test_placement_fills_rows_from_top() {
        let config = ComposeConfig::default();
        let first = place(&config, 0, 300, 300);
        let third = place(&config, 2, 300, 300);
        let fourth = place(&config, 3, 300, 300);
        let tenth = place(&config, 9, 300, 300);

        assert_eq!(first.page, 0);
        assert!(third.x_mm > first.x_mm);
        assert!((third.y_mm - first.y_mm).abs() < 0.01);
        assert!(fourth.y_mm < first.y_mm);
        assert_eq!(tenth.page, 1);
    }

    #[test]
    fn test_placement_preserves_aspect_and_stays_in_cell() {
        let config = ComposeConfig::default();
        let cell_w = (210.0 - 20.0) / 3.0;
        let cell_h = (297.0 - 20.0) / 3.0;

        // Wide image: width-bound.
        let p = place(&config, 0, 2000, 1000);
        let drawn_w = 2000.0 * MM_PER_INCH / DPI * p.scale;
        let drawn_h = 1000.0 * MM_PER_INCH / DPI * p.scale;
        assert!((drawn_w - cell_w).abs() < 0.01);
        assert!(drawn_h < cell_h);
        assert!((drawn_w / drawn_h - 2.0).abs() < 0.001);
        assert!(p.x_mm >= 10.0 - 0.01);
        assert!(p.y_mm + drawn_h <= 297.0 - 10.0 + 0.01);
    }

    #[test]
    fn test_unique_output_path() {
        let dir = TempDir::new().unwrap();
        let first = unique_output_path(dir.path(), "20240101_120000");
        assert!(first.ends_with("canvas_20240101_120000.pdf"));

        std::fs::write(&first, b"x").unwrap();
        let second = unique_output_path(dir.path(), "20240101_120000");
        assert!(second.ends_with("canvas_20240101_120000_1.pdf"));
    }

    #[test]
    fn test_flatten_onto_white() {
        let img = image_crate::RgbaImage::from_pixel(1, 1, image_crate::Rgba([0, 0, 0, 0]));
        let flat = flatten(DynamicImage::ImageRgba8(img)).to_rgb8();
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[tokio::test]
    async fn test_compose_writes_pdf() {
        let dir = TempDir::new().unwrap();
        let mut images = Vec::new();
        for i in 0..10 {
            let path = dir.path().join(format!("{i}.png"));
            write_png(&path, 40 + i, 30);
            images.push(path);
        }

        let composer = PdfComposer::new(ComposeConfig::default(), dir.path().join("out"));
        let artifact = composer.compose(&images).await.unwrap();

        assert_eq!(artifact.pages, 2);
        let bytes = std::fs::read(&artifact.path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let name = artifact.path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("canvas_") && name.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_compose_missing_input_fails() {
        let dir = TempDir::new().unwrap();
        let composer = PdfComposer::new(ComposeConfig::default(), dir.path());
        let err = composer
            .compose(&[dir.path().join("gone.png")])
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_compose_undecodable_input_fails() {
        let dir = TempDir::new().unwrap();
        let bogus = dir.path().join("bogus.png");
        std::fs::write(&bogus, b"not an image").unwrap();

        let composer = PdfComposer::new(ComposeConfig::default(), dir.path());
        let err = composer.compose(&[bogus]).await.unwrap_err();
        assert!(matches!(err, StageError::Failed { .. }));
    }
}
