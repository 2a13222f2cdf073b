use crate::{Error, Result};
use image::imageops::FilterType;
use image::ImageFormat;
use lopdf::{Dictionary, Document, Object};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Section headers recognized by the line-scan splitter
const SECTION_HEADERS: &[&str] = &[
    "ABSTRACT",
    "INTRODUCTION",
    "METHODS",
    "MATERIALS AND METHODS",
    "RESULTS",
    "DISCUSSION",
    "CONCLUSION",
    "CONCLUSIONS",
];

const CAPTION_PREFIXES: &[&str] = &["figure", "fig.", "fig "];

/// Extraction thresholds; defaults match the journal-article sweet spot
#[derive(Debug, Clone)]
pub struct PdfExtractOptions {
    /// Images below either dimension are treated as logos and dropped
    pub min_image_width: u32,
    pub min_image_height: u32,
    /// Hard cap on extracted figures per document
    pub max_figures: usize,
    /// Longest side above this gets downsampled
    pub max_image_side: u32,
}

impl Default for PdfExtractOptions {
    fn default() -> Self {
        Self {
            min_image_width: 200,
            min_image_height: 200,
            max_figures: 10,
            max_image_side: 2000,
        }
    }
}

/// An extracted figure with its heuristic caption
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub figure_num: usize,
    pub page: u32,
    pub width: u32,
    pub height: u32,
    /// "jpeg" or "png" after re-encoding
    pub format: String,
    pub caption: Option<String>,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Document metadata from the PDF info dictionary
#[derive(Debug, Clone, Default, Serialize)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub pages: usize,
}

/// Everything pulled out of one article PDF
#[derive(Debug, Clone, Serialize)]
pub struct PdfContent {
    pub text: String,
    pub sections: BTreeMap<String, String>,
    pub figures: Vec<Figure>,
    pub metadata: PdfMetadata,
}

/// Extracts text, sections, and filtered figures from a downloaded PDF.
pub struct PdfExtractor {
    doc: Document,
    options: PdfExtractOptions,
}

impl PdfExtractor {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_options(path, PdfExtractOptions::default())
    }

    pub fn open_with_options(path: &Path, options: PdfExtractOptions) -> Result<Self> {
        let doc = Document::load(path).map_err(|e| Error::Pdf(format!("{}: {e}", path.display())))?;
        info!(
            "Opened PDF: {} ({} pages)",
            path.display(),
            doc.get_pages().len()
        );
        Ok(Self { doc, options })
    }

    /// Extract all content in one pass
    pub fn extract(&self) -> PdfContent {
        let text = self.extract_text();
        PdfContent {
            sections: split_sections(&text),
            figures: self.extract_figures(),
            metadata: self.metadata(),
            text,
        }
    }

    /// Concatenated page text, pages separated by blank lines
    pub fn extract_text(&self) -> String {
        let mut parts = Vec::new();
        for &page_num in self.doc.get_pages().keys() {
            match self.doc.extract_text(&[page_num]) {
                Ok(text) => parts.push(text),
                Err(e) => {
                    warn!("Error extracting text from page {}: {}", page_num, e);
                    parts.push(String::new());
                }
            }
        }
        let full = parts.join("\n\n");
        info!("Extracted {} characters of text", full.len());
        full
    }

    /// Embedded images above the size floor, re-encoded and downsampled
    pub fn extract_figures(&self) -> Vec<Figure> {
        let mut figures = Vec::new();

        for (&page_num, &page_id) in &self.doc.get_pages() {
            if figures.len() >= self.options.max_figures {
                break;
            }

            let captions = self.page_captions(page_num);
            let mut page_image_index = 0usize;

            for stream in self.page_image_streams(page_id) {
                if figures.len() >= self.options.max_figures {
                    break;
                }

                match self.build_figure(&stream, page_num) {
                    Ok(Some(mut figure)) => {
                        figure.figure_num = figures.len() + 1;
                        figure.caption = captions.get(page_image_index).cloned();
                        page_image_index += 1;
                        debug!(
                            "Extracted figure {}: {}x{}px from page {}",
                            figure.figure_num, figure.width, figure.height, page_num
                        );
                        figures.push(figure);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!("Error extracting image on page {}: {}", page_num, e);
                    }
                }
            }
        }

        info!("Extracted {} figures", figures.len());
        figures
    }

    /// Image XObject streams reachable from a page's own resources.
    ///
    /// Resources inherited from the page tree are not chased; journal PDFs
    /// carry per-page resources in practice.
    fn page_image_streams(&self, page_id: lopdf::ObjectId) -> Vec<lopdf::Stream> {
        let mut streams = Vec::new();

        let Ok(page) = self.doc.get_dictionary(page_id) else {
            return streams;
        };
        let Some(resources) = page
            .get(b"Resources")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
        else {
            return streams;
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|obj| self.resolve_dict(obj))
        else {
            return streams;
        };

        for (_, value) in xobjects.iter() {
            let object = match value {
                Object::Reference(id) => match self.doc.get_object(*id) {
                    Ok(obj) => obj,
                    Err(_) => continue,
                },
                other => other,
            };
            if let Ok(stream) = object.as_stream() {
                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .map(|n| n == b"Image")
                    .unwrap_or(false);
                if is_image {
                    streams.push(stream.clone());
                }
            }
        }

        streams
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match obj {
            Object::Reference(id) => self
                .doc
                .get_object(*id)
                .ok()
                .and_then(|o| o.as_dict().ok()),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn build_figure(&self, stream: &lopdf::Stream, page_num: u32) -> Result<Option<Figure>> {
        let width = dict_u32(&stream.dict, b"Width").unwrap_or(0);
        let height = dict_u32(&stream.dict, b"Height").unwrap_or(0);

        // Filter out small images (logos, icons, decorations)
        if width < self.options.min_image_width || height < self.options.min_image_height {
            debug!("Skipping small image: {}x{}", width, height);
            return Ok(None);
        }

        // DCTDecode streams carry JPEG bytes directly; everything else needs
        // a decode attempt on the decompressed content
        let raw = if has_filter(&stream.dict, b"DCTDecode") {
            stream.content.clone()
        } else {
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone())
        };

        let Ok(decoded) = image::load_from_memory(&raw) else {
            // Raw colorspace payloads the decoder can't identify are skipped
            debug!("Undecodable image stream on page {}", page_num);
            return Ok(None);
        };

        let source_format = image::guess_format(&raw).ok();
        let (width, height, data, format) = self.normalize_image(decoded, source_format)?;

        Ok(Some(Figure {
            figure_num: 0, // assigned by the caller
            page: page_num,
            width,
            height,
            format,
            caption: None,
            data,
        }))
    }

    /// Re-encode to JPEG unless already JPEG/PNG, and downsample oversized
    /// images to the configured cap
    fn normalize_image(
        &self,
        decoded: image::DynamicImage,
        source_format: Option<ImageFormat>,
    ) -> Result<(u32, u32, Vec<u8>, String)> {
        let max_side = self.options.max_image_side;
        let needs_resize = decoded.width().max(decoded.height()) > max_side;
        let keep_format = matches!(source_format, Some(ImageFormat::Jpeg | ImageFormat::Png));

        let image = if needs_resize {
            decoded.resize(max_side, max_side, FilterType::Lanczos3)
        } else {
            decoded
        };

        let (target, name) = if keep_format && !needs_resize {
            match source_format {
                Some(ImageFormat::Png) => (ImageFormat::Png, "png"),
                _ => (ImageFormat::Jpeg, "jpeg"),
            }
        } else {
            (ImageFormat::Jpeg, "jpeg")
        };

        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        let image = if target == ImageFormat::Jpeg {
            image::DynamicImage::ImageRgb8(image.to_rgb8())
        } else {
            image
        };
        image
            .write_to(&mut cursor, target)
            .map_err(|e| Error::Pdf(format!("re-encoding failed: {e}")))?;

        Ok((image.width(), image.height(), buffer, name.to_string()))
    }

    /// Caption candidates on a page, in reading order.
    ///
    /// lopdf exposes no layout boxes, so captions are matched by figure-label
    /// prefix over the page text and paired with images positionally.
    fn page_captions(&self, page_num: u32) -> Vec<String> {
        let Ok(text) = self.doc.extract_text(&[page_num]) else {
            return Vec::new();
        };

        text.lines()
            .map(str::trim)
            .filter(|line| {
                let lowered = line.to_lowercase();
                CAPTION_PREFIXES.iter().any(|p| lowered.starts_with(p))
            })
            .map(truncate_caption)
            .collect()
    }

    /// Title, author and page count from the info dictionary
    pub fn metadata(&self) -> PdfMetadata {
        let info = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| match obj {
                Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
                Object::Dictionary(dict) => Some(dict),
                _ => None,
            });

        let field = |key: &[u8]| {
            info.and_then(|dict| dict.get(key).ok())
                .and_then(|obj| obj.as_str().ok())
                .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
                .filter(|s| !s.is_empty())
        };

        PdfMetadata {
            title: field(b"Title"),
            author: field(b"Author"),
            pages: self.doc.get_pages().len(),
        }
    }
}

/// First sentence, or the first 200 characters when there is no period
fn truncate_caption(line: &str) -> String {
    match line.find('.') {
        Some(pos) if pos + 1 < line.len() => line[..=pos].to_string(),
        _ => line.chars().take(200).collect(),
    }
}

/// Split article text into sections by scanning for known header lines.
///
/// The current section changes whenever a line's upper-cased prefix matches
/// one of the fixed headers; content before the first header lands in
/// PREAMBLE. Deliberately naive, with no layout awareness.
pub fn split_sections(text: &str) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    let mut current_section = "PREAMBLE".to_string();
    let mut current_text: Vec<&str> = Vec::new();

    for line in text.lines() {
        let upper = line.trim().to_uppercase();

        if let Some(header) = SECTION_HEADERS.iter().find(|h| upper.starts_with(*h)) {
            if !current_text.is_empty() {
                sections.insert(current_section.clone(), current_text.join("\n").trim().to_string());
            }
            current_section = header
                .split_whitespace()
                .next()
                .unwrap_or(header)
                .to_string();
            current_text = Vec::new();
        } else {
            current_text.push(line);
        }
    }

    if !current_text.is_empty() {
        sections.insert(current_section, current_text.join("\n").trim().to_string());
    }

    sections
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .ok()
        .and_then(|obj| obj.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
}

fn has_filter(dict: &Dictionary, name: &[u8]) -> bool {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => n == name,
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|f| matches!(f, Object::Name(n) if n == name)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_split_sections_basic() {
        let text = "Preamble line\nABSTRACT\nabstract text\nMETHODS\nmethod text\nRESULTS\nresult text";
        let sections = split_sections(text);

        assert_eq!(sections.get("PREAMBLE").unwrap(), "Preamble line");
        assert_eq!(sections.get("ABSTRACT").unwrap(), "abstract text");
        assert_eq!(sections.get("METHODS").unwrap(), "method text");
        assert_eq!(sections.get("RESULTS").unwrap(), "result text");
    }

    #[test]
    fn test_split_sections_materials_and_methods() {
        let text = "MATERIALS AND METHODS\nsome protocol";
        let sections = split_sections(text);
        // Keyed by the first word of the matched header
        assert_eq!(sections.get("MATERIALS").unwrap(), "some protocol");
    }

    #[test]
    fn test_split_sections_prefix_false_positive() {
        // Known limitation: body text starting with a header word reassigns
        // the section
        let text = "INTRODUCTION\nintro\nResults were promising overall\nmore intro";
        let sections = split_sections(text);
        assert!(sections.contains_key("RESULTS"));
    }

    #[test]
    fn test_truncate_caption_first_sentence() {
        assert_eq!(
            truncate_caption("Figure 1. Flap design. Additional detail here."),
            "Figure 1."
        );
    }

    #[test]
    fn test_truncate_caption_no_period() {
        let long = format!("Figure 2 {}", "x".repeat(300));
        assert_eq!(truncate_caption(&long).chars().count(), 200);
    }

    #[test]
    fn test_default_options() {
        let options = PdfExtractOptions::default();
        assert_eq!(options.min_image_width, 200);
        assert_eq!(options.min_image_height, 200);
        assert_eq!(options.max_figures, 10);
        assert_eq!(options.max_image_side, 2000);
    }

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 90, 60]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Jpeg)
            .unwrap();
        buf
    }

    fn image_stream(width: u32, height: u32) -> lopdf::Stream {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(i64::from(width)));
        dict.set("Height", Object::Integer(i64::from(height)));
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        lopdf::Stream::new(dict, jpeg_bytes(width, height))
    }

    /// One-page document carrying an image XObject per requested size
    fn doc_with_images(sizes: &[(u32, u32)]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut xobjects = Dictionary::new();
        for (i, &(w, h)) in sizes.iter().enumerate() {
            let id = doc.add_object(Object::Stream(image_stream(w, h)));
            xobjects.set(format!("Im{i}"), Object::Reference(id));
        }
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let content_id =
            doc.add_object(Object::Stream(lopdf::Stream::new(Dictionary::new(), vec![])));
        let page_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => resources,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(lopdf::dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn test_small_images_are_dropped() {
        let extractor = PdfExtractor {
            doc: doc_with_images(&[(50, 50), (300, 300), (300, 100)]),
            options: PdfExtractOptions::default(),
        };
        let figures = extractor.extract_figures();

        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].width, 300);
        assert_eq!(figures[0].height, 300);
        assert_eq!(figures[0].format, "jpeg");
        assert_eq!(figures[0].figure_num, 1);
    }

    #[test]
    fn test_figure_count_cap() {
        let extractor = PdfExtractor {
            doc: doc_with_images(&[(250, 250), (250, 250), (250, 250), (250, 250)]),
            options: PdfExtractOptions {
                max_figures: 2,
                ..PdfExtractOptions::default()
            },
        };
        let figures = extractor.extract_figures();

        assert_eq!(figures.len(), 2);
        assert_eq!(figures[0].figure_num, 1);
        assert_eq!(figures[1].figure_num, 2);
    }
}
