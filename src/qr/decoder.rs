//! QR code decoder using rqrr

use crate::discover::defang;
use crate::error::Result;
use crate::qr::QrPayload;
use image::{DynamicImage, GrayImage};
use std::path::{Path, PathBuf};

/// QR code decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl QrDecoder {
    /// Create a new QR decoder with default settings
    pub fn new() -> Self {
        Self
    }

    /// Decode every QR code in the image at `path`.
    ///
    /// An image without any code yields an empty vector. Grids that are
    /// detected but cannot be decoded are logged and skipped.
    pub fn decode_file(&self, path: &Path) -> Result<Vec<QrPayload>> {
        let img = image::open(path)?;
        Ok(self.decode_image(&img, path))
    }

    /// Decode every QR code in an already loaded image.
    pub fn decode_image(&self, img: &DynamicImage, source: &Path) -> Vec<QrPayload> {
        self.decode_gray(img.to_luma8(), source)
    }

    fn decode_gray(&self, img: GrayImage, source: &Path) -> Vec<QrPayload> {
        let mut prepared = rqrr::PreparedImage::prepare(img);
        let grids = prepared.detect_grids();

        let mut payloads = Vec::with_capacity(grids.len());
        for (index, grid) in grids.into_iter().enumerate() {
            match grid.decode() {
                Ok((meta, content)) => {
                    tracing::debug!(
                        source = %source.display(),
                        index,
                        ecc_level = meta.ecc_level,
                        length = content.len(),
                        "Decoded QR code"
                    );
                    payloads.push(QrPayload::new(content, source, index));
                }
                Err(e) => {
                    tracing::warn!(
                        source = %source.display(),
                        index,
                        "Failed to decode one QR code: {:?}",
                        e
                    );
                }
            }
        }

        payloads
    }

    /// Decode all images in order.
    ///
    /// An unreadable image is reported and contributes nothing; the rest of
    /// the batch is still processed. Every payload is echoed de-fanged.
    pub fn decode_batch(&self, paths: &[PathBuf]) -> Vec<QrPayload> {
        tracing::info!("Raw Dump:");
        let mut payloads = Vec::new();

        for path in paths {
            match self.decode_file(path) {
                Ok(found) => {
                    if found.is_empty() {
                        tracing::info!(source = %path.display(), "No QR code found");
                    }
                    for payload in &found {
                        tracing::info!("{}", defang(payload.as_str()));
                    }
                    payloads.extend(found);
                }
                Err(err) => {
                    tracing::error!(source = %path.display(), "Could not read image: {err}");
                }
            }
        }

        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};
    use qrcode::QrCode;

    fn qr_image(data: &str) -> DynamicImage {
        let code = QrCode::new(data.as_bytes()).unwrap();
        let image = code.render::<Luma<u8>>().min_dimensions(300, 300).build();
        DynamicImage::ImageLuma8(image)
    }

    #[test]
    fn decodes_generated_code() {
        let decoder = QrDecoder::new();
        let img = qr_image("http://evil.test/login");
        let payloads = decoder.decode_image(&img, Path::new("mem.png"));

        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].as_str(), "http://evil.test/login");
        assert_eq!(payloads[0].index, 0);
    }

    #[test]
    fn blank_image_has_no_payloads() {
        let decoder = QrDecoder::new();
        let blank: GrayImage = ImageBuffer::from_pixel(120, 120, Luma([255u8]));
        let payloads = decoder.decode_image(&DynamicImage::ImageLuma8(blank), Path::new("blank.png"));
        assert!(payloads.is_empty());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        assert!(QrDecoder::new().decode_file(&path).is_err());
    }

    #[test]
    fn batch_skips_unreadable_images() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"nope").unwrap();
        let good = dir.path().join("good.png");
        qr_image("https://ok.test").save(&good).unwrap();

        let payloads = QrDecoder::new().decode_batch(&[broken, good.clone()]);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].source, good);
    }
}
