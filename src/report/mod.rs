//! Evidence report assembly
//!
//! The report is an A4 word-processing document with one section per
//! evidence record: a centered heading, the score, the screenshot and a
//! spacer. Assembly is best effort. By this point every screenshot is already
//! on disk, so a section that cannot be built is logged and left out while
//! the remaining findings still make it into the document.

mod docx;

use crate::error::{Error, Result};
use crate::evidence::{EvidenceRecord, file_timestamp};
use image::ImageFormat;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// English Metric Units per inch, the unit of drawing extents.
pub const EMU_PER_INCH: f64 = 914_400.0;
/// Twentieths of a point per inch, the unit of page geometry.
pub const TWIPS_PER_INCH: f64 = 1_440.0;
const MM_PER_INCH: f64 = 25.4;

/// Page size and margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Page width in millimetres
    pub width_mm: f64,
    /// Page height in millimetres
    pub height_mm: f64,
    /// Margin on every side, in inches
    pub margin_in: f64,
}

impl PageGeometry {
    /// A4 portrait with half-inch margins.
    pub const A4: Self = Self {
        width_mm: 210.0,
        height_mm: 297.0,
        margin_in: 0.5,
    };

    pub(crate) fn width_twips(&self) -> u32 {
        (self.width_mm / MM_PER_INCH * TWIPS_PER_INCH).round() as u32
    }

    pub(crate) fn height_twips(&self) -> u32 {
        (self.height_mm / MM_PER_INCH * TWIPS_PER_INCH).round() as u32
    }

    pub(crate) fn margin_twips(&self) -> u32 {
        (self.margin_in * TWIPS_PER_INCH).round() as u32
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// A PNG placed inline at a fixed display size.
#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    /// PNG bytes
    pub png: Vec<u8>,
    /// Display width in EMU
    pub width_emu: u64,
    /// Display height in EMU
    pub height_emu: u64,
}

impl Picture {
    /// Load an image file and scale it to `width_in` inches, keeping aspect ratio.
    ///
    /// Non-PNG inputs are re-encoded as PNG.
    pub fn load(path: &Path, width_in: f64) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let img = image::load_from_memory(&bytes)?;
        let (w, h) = (img.width(), img.height());
        if w == 0 || h == 0 {
            return Err(Error::Report(format!("{} has no pixels", path.display())));
        }

        let png = if image::guess_format(&bytes)? == ImageFormat::Png {
            bytes
        } else {
            let mut out = std::io::Cursor::new(Vec::new());
            img.write_to(&mut out, ImageFormat::Png)?;
            out.into_inner()
        };

        let width_emu = (width_in * EMU_PER_INCH).round() as u64;
        let height_emu = (width_emu as f64 * h as f64 / w as f64).round() as u64;
        Ok(Self {
            png,
            width_emu,
            height_emu,
        })
    }
}

/// Document content, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Centered title-style heading
    Heading(String),
    /// Plain paragraph; empty text makes a spacer
    Paragraph(String),
    /// Inline picture in its own paragraph
    Picture(Picture),
}

/// Heading, score, screenshot and spacer for one evidence record.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    heading: String,
    score: String,
    picture: Picture,
}

impl Section {
    /// Stage a section; fails without side effects if the screenshot is unusable.
    pub fn build(record: &EvidenceRecord, image_width_in: f64) -> Result<Self> {
        let picture = Picture::load(&record.screenshot_path, image_width_in)?;
        Ok(Self {
            heading: record.heading.clone(),
            score: record.score_text.clone(),
            picture,
        })
    }
}

/// In-memory word-processing document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    geometry: PageGeometry,
    blocks: Vec<Block>,
}

impl Document {
    /// Empty document with the given page geometry.
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            blocks: Vec::new(),
        }
    }

    /// Page geometry.
    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Content blocks in document order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Heading texts in document order.
    pub fn headings(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Heading(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Append a staged section as four blocks.
    pub fn push_section(&mut self, section: Section) {
        self.blocks.push(Block::Heading(section.heading));
        self.blocks.push(Block::Paragraph(section.score));
        self.blocks.push(Block::Picture(section.picture));
        self.blocks.push(Block::Paragraph(String::new()));
    }

    /// Write the document as `.docx` to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| {
            Error::Report(format!("Failed to create {}: {e}", path.display()))
        })?;
        let mut writer = BufWriter::new(file);
        docx::write(self, &mut writer)?;
        Ok(())
    }
}

/// Builds the final report from evidence records.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    docs_dir: PathBuf,
    geometry: PageGeometry,
    image_width_in: f64,
}

impl ReportAssembler {
    /// Assembler writing into `docs_dir` with A4 pages and 7 in wide screenshots.
    pub fn new(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            geometry: PageGeometry::A4,
            image_width_in: 7.0,
        }
    }

    /// Build the document in memory; sections that fail are logged and skipped.
    pub fn build(&self, records: &[EvidenceRecord]) -> Document {
        tracing::info!("Setting Doc size to A4");
        let mut doc = Document::new(self.geometry);

        for record in records {
            match Section::build(record, self.image_width_in) {
                Ok(section) => doc.push_section(section),
                Err(err) => tracing::error!(
                    heading = %record.heading,
                    "Skipping report section: {err}"
                ),
            }
        }

        doc
    }

    /// Build and save the report; returns where it was written.
    pub fn assemble(&self, records: &[EvidenceRecord]) -> Result<PathBuf> {
        let doc = self.build(records);

        std::fs::create_dir_all(&self.docs_dir).map_err(|e| {
            Error::Report(format!(
                "Failed to create {}: {e}",
                self.docs_dir.display()
            ))
        })?;
        let path = self.docs_dir.join(format!("RCA_{}.docx", file_timestamp()));
        doc.save(&path)?;

        tracing::info!("File successfully saved at location: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn screenshot(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.join(name);
        ImageBuffer::from_pixel(w, h, Rgb([10u8, 20, 30]))
            .save(&path)
            .unwrap();
        path
    }

    fn record(heading: &str, path: PathBuf) -> EvidenceRecord {
        EvidenceRecord {
            heading: heading.into(),
            score_text: "3/20".into(),
            screenshot_path: path,
            report_url: format!("https://report.test/{heading}"),
        }
    }

    #[test]
    fn a4_geometry_in_twips() {
        let g = PageGeometry::A4;
        assert_eq!(g.width_twips(), 11906);
        assert_eq!(g.height_twips(), 16838);
        assert_eq!(g.margin_twips(), 720);
    }

    #[test]
    fn picture_keeps_aspect_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let path = screenshot(dir.path(), "wide.png", 200, 100);
        let picture = Picture::load(&path, 7.0).unwrap();
        assert_eq!(picture.width_emu, 6_400_800);
        assert_eq!(picture.height_emu, 3_200_400);
    }

    #[test]
    fn non_png_is_reencoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = screenshot(dir.path(), "shot.bmp", 10, 10);
        let picture = Picture::load(&path, 1.0).unwrap();
        assert_eq!(image::guess_format(&picture.png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn sections_follow_record_order() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record("first_test", screenshot(dir.path(), "a.png", 4, 4)),
            record("second_test", screenshot(dir.path(), "b.png", 4, 4)),
        ];

        let doc = ReportAssembler::new(dir.path()).build(&records);
        assert_eq!(doc.headings(), vec!["first_test", "second_test"]);
        assert_eq!(doc.blocks().len(), 8);
        assert_eq!(doc.blocks()[1], Block::Paragraph("3/20".into()));
        assert_eq!(doc.blocks()[3], Block::Paragraph(String::new()));
    }

    #[test]
    fn unreadable_screenshot_skips_only_its_section() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();
        let records = vec![
            record("broken_test", broken),
            record("good_test", screenshot(dir.path(), "good.png", 4, 4)),
            record("missing_test", dir.path().join("missing.png")),
        ];

        let doc = ReportAssembler::new(dir.path()).build(&records);
        assert_eq!(doc.headings(), vec!["good_test"]);
    }
}
