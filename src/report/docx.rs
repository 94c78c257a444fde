//! Office Open XML (`.docx`) serialization
//!
//! Emits the smallest package Word and LibreOffice open without repair:
//! content types, package relationships, a styles part carrying the `Title`
//! style used for headings, the main document and one media part per picture.

use super::{Block, Document, Picture};
use crate::error::Result;
use std::fmt::Write as _;
use std::io::{Seek, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:rPr><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:pPr><w:spacing w:after="300"/></w:pPr><w:rPr><w:color w:val="17365D"/><w:sz w:val="52"/></w:rPr></w:style></w:styles>"#;

const STYLES_REL_ID: &str = "rIdStyles";

const DOC_NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#,
);

/// Serialize `doc` as a `.docx` package into `writer`.
pub(crate) fn write<W: Write + Seek>(doc: &Document, writer: W) -> Result<()> {
    let mut zip = ZipWriter::new(writer);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(CONTENT_TYPES.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(PACKAGE_RELS.as_bytes())?;

    zip.start_file("word/styles.xml", options)?;
    zip.write_all(STYLES.as_bytes())?;

    let pictures: Vec<&Picture> = doc
        .blocks()
        .iter()
        .filter_map(|block| match block {
            Block::Picture(picture) => Some(picture),
            _ => None,
        })
        .collect();

    zip.start_file("word/_rels/document.xml.rels", options)?;
    zip.write_all(document_rels(pictures.len()).as_bytes())?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(document_xml(doc).as_bytes())?;

    for (index, picture) in pictures.iter().enumerate() {
        // PNG is already compressed.
        let stored = options.compression_method(zip::CompressionMethod::Stored);
        zip.start_file(format!("word/media/{}", media_name(index)), stored)?;
        zip.write_all(&picture.png)?;
    }

    zip.finish()?;
    Ok(())
}

fn media_name(index: usize) -> String {
    format!("image{}.png", index + 1)
}

fn image_rel_id(index: usize) -> String {
    format!("rIdImage{}", index + 1)
}

fn document_rels(picture_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    let _ = write!(
        xml,
        r#"<Relationship Id="{STYLES_REL_ID}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    );
    for index in 0..picture_count {
        let _ = write!(
            xml,
            r#"<Relationship Id="{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/{}"/>"#,
            image_rel_id(index),
            media_name(index)
        );
    }
    xml.push_str("</Relationships>");
    xml
}

pub(crate) fn document_xml(doc: &Document) -> String {
    let mut xml = String::with_capacity(4096);
    let _ = write!(
        xml,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document {DOC_NAMESPACES}><w:body>"#
    );

    let mut picture_index = 0;
    for block in doc.blocks() {
        match block {
            Block::Heading(text) => {
                let _ = write!(
                    xml,
                    r#"<w:p><w:pPr><w:pStyle w:val="Title"/><w:jc w:val="center"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                    escape(text)
                );
            }
            Block::Paragraph(text) if text.is_empty() => xml.push_str("<w:p/>"),
            Block::Paragraph(text) => {
                let _ = write!(
                    xml,
                    r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                    escape(text)
                );
            }
            Block::Picture(picture) => {
                push_picture(&mut xml, picture, picture_index);
                picture_index += 1;
            }
        }
    }

    let geometry = doc.geometry();
    let margin = geometry.margin_twips();
    let _ = write!(
        xml,
        r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}"/><w:pgMar w:top="{margin}" w:right="{margin}" w:bottom="{margin}" w:left="{margin}" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#,
        geometry.width_twips(),
        geometry.height_twips()
    );
    xml
}

fn push_picture(xml: &mut String, picture: &Picture, index: usize) {
    let id = index + 1;
    let name = media_name(index);
    let rel = image_rel_id(index);
    let (cx, cy) = (picture.width_emu, picture.height_emu);
    let _ = write!(
        xml,
        concat!(
            r#"<w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{id}" name="Picture {id}"/>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
            r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
        ),
        cx = cx,
        cy = cy,
        id = id,
        name = name,
        rel = rel,
    );
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
