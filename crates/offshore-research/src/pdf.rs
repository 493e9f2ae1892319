use std::io::Cursor;

use offshore_models::ReportConfig;
use printpdf::{IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use thiserror::Error;
use tracing::debug;

use crate::report::Report;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const LAYER: &str = "Layer 1";

/// Millimetres per typographic point.
const MM_PER_PT: f32 = 0.3528;
const LINE_SPACING: f32 = 1.4;
/// Average glyph advance as a share of the font size, used for wrapping.
const GLYPH_WIDTH: f32 = 0.5;

const TITLE_SIZE: f32 = 22.0;
const HEADING_SIZE: f32 = 16.0;
const ENTRY_TITLE_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 11.0;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Cannot read font {path}: {source}")]
    Font {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF writer failed: {0}")]
    Pdf(String),
}

fn pdf_error(err: printpdf::Error) -> ReportError {
    ReportError::Pdf(format!("{err:?}"))
}

/// Renders a [`Report`] to an A4 PDF with an embedded TrueType font.
pub struct PdfRenderer {
    regular: Vec<u8>,
    bold: Option<Vec<u8>>,
}

impl PdfRenderer {
    pub fn new(regular: Vec<u8>, bold: Option<Vec<u8>>) -> Self {
        Self { regular, bold }
    }

    /// Load the fonts named in the report configuration.
    pub fn from_config(config: &ReportConfig) -> Result<Self, ReportError> {
        let regular = read_font(&config.font_path)?;
        let bold = config.bold_font_path.as_deref().map(read_font).transpose()?;
        Ok(Self::new(regular, bold))
    }

    pub fn render(&self, report: &Report) -> Result<Vec<u8>, ReportError> {
        self.render_pages(report).map(|(bytes, _)| bytes)
    }

    /// Render and also return the number of pages written.
    pub(crate) fn render_pages(&self, report: &Report) -> Result<(Vec<u8>, usize), ReportError> {
        let (doc, page, layer) = PdfDocument::new(
            report.title.as_str(),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            LAYER,
        );
        let regular = doc
            .add_external_font(Cursor::new(self.regular.as_slice()))
            .map_err(pdf_error)?;
        let bold = match &self.bold {
            Some(bytes) => doc
                .add_external_font(Cursor::new(bytes.as_slice()))
                .map_err(pdf_error)?,
            None => regular.clone(),
        };

        let mut writer = PageWriter {
            layer: doc.get_page(page).get_layer(layer),
            doc: &doc,
            cursor: PAGE_HEIGHT_MM / 2.0 + 20.0,
            regular: &regular,
            bold: &bold,
            pages: 1,
        };

        writer.paragraph(&report.title, TITLE_SIZE, true);
        writer.gap(6.0);
        let stamp = format!(
            "Generated at {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        writer.line(&stamp, BODY_SIZE, false);

        for section in &report.sections {
            writer.new_page();
            writer.paragraph(&section.heading, HEADING_SIZE, true);
            writer.gap(4.0);
            for entry in &section.entries {
                writer.paragraph(&entry.heading_line(), ENTRY_TITLE_SIZE, true);
                writer.line(&entry.stance_line(), BODY_SIZE, false);
                writer.paragraph(&entry.summary_line(), BODY_SIZE, false);
                writer.gap(5.0);
            }
        }
        let pages = writer.pages;

        let bytes = doc.save_to_bytes().map_err(pdf_error)?;
        debug!(pages, bytes = bytes.len(), "Rendered report PDF");
        Ok((bytes, pages))
    }
}

fn read_font(path: &str) -> Result<Vec<u8>, ReportError> {
    std::fs::read(path).map_err(|source| ReportError::Font {
        path: path.to_string(),
        source,
    })
}

/// Writes lines top to bottom, starting a new page when the bottom margin is reached.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    cursor: f32,
    regular: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    pages: usize,
}

impl PageWriter<'_> {
    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT_MM - MARGIN_MM;
        self.pages += 1;
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        let height = size * MM_PER_PT * LINE_SPACING;
        if self.cursor - height < MARGIN_MM {
            self.new_page();
        }
        self.cursor -= height;
        let font = if bold { self.bold } else { self.regular };
        self.layer
            .use_text(text, size, Mm(MARGIN_MM), Mm(self.cursor), font);
    }

    fn paragraph(&mut self, text: &str, size: f32, bold: bool) {
        for line in wrap(text, chars_per_line(size)) {
            self.line(&line, size, bold);
        }
    }

    fn gap(&mut self, mm: f32) {
        self.cursor -= mm;
    }
}

fn chars_per_line(size: f32) -> usize {
    let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    ((usable / (size * MM_PER_PT * GLYPH_WIDTH)) as usize).max(1)
}

/// Greedy word wrap on character count. Words longer than a line are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut current = String::new();
        let mut current_len = 0;
        for word in raw.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
            if needed > width && current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ReportEntry, ReportSection, SectionKind};
    use crate::test_support::day;
    use chrono::{DateTime, Utc};
    use offshore_models::Stance;

    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    fn sample_report(entries: usize) -> Report {
        let entries = (0..entries)
            .map(|i| ReportEntry {
                title: format!("Análise {i}"),
                source: "N/A".to_string(),
                stance: Stance::Neutral,
                summary: "Política monetária restritiva por mais tempo. ".repeat(8),
                publication_date: day(2025, 7, 1),
            })
            .collect();
        Report {
            title: "Global Research Report".to_string(),
            generated_at: DateTime::<Utc>::from_timestamp(1_750_000_000, 0).unwrap(),
            sections: vec![ReportSection {
                kind: SectionKind::Macro,
                heading: SectionKind::Macro.heading().to_string(),
                entries,
            }],
        }
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, ["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));
    }

    #[test]
    fn wrap_splits_long_words_and_keeps_breaks() {
        assert_eq!(wrap("abcdefghij", 4), ["abcd", "efgh", "ij"]);
        assert_eq!(wrap("one\ntwo", 20), ["one", "two"]);
        assert_eq!(wrap("", 20), [""]);
    }

    #[test]
    fn wrap_counts_characters_not_bytes() {
        let lines = wrap("ação ação ação", 9);
        assert_eq!(lines, ["ação ação", "ação"]);
    }

    #[test]
    fn missing_font_is_an_error() {
        let config = ReportConfig {
            font_path: "/nonexistent/font.ttf".to_string(),
            ..Default::default()
        };
        let err = PdfRenderer::from_config(&config).err().unwrap();
        assert!(matches!(err, ReportError::Font { .. }));
        assert!(err.to_string().contains("/nonexistent/font.ttf"));
    }

    fn system_font() -> Vec<u8> {
        std::fs::read(SYSTEM_FONT)
            .unwrap_or_else(|err| panic!("PDF tests need {SYSTEM_FONT}: {err}"))
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn section(kind: SectionKind, title: &str) -> ReportSection {
        ReportSection {
            kind,
            heading: kind.heading().to_string(),
            entries: vec![ReportEntry {
                title: title.to_string(),
                source: "BlackRock".to_string(),
                stance: Stance::Overweight,
                summary: "Short note.".to_string(),
                publication_date: day(2025, 6, 1),
            }],
        }
    }

    #[test]
    fn each_section_starts_a_page() {
        let mut report = sample_report(0);
        report.sections = vec![
            section(SectionKind::Macro, "Brazil rates"),
            section(SectionKind::Thematic, "AI capex"),
        ];
        let (bytes, pages) = PdfRenderer::new(system_font(), None)
            .render_pages(&report)
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(pages, 3);
    }

    #[test]
    fn title_only_report_is_one_page() {
        let mut report = sample_report(0);
        report.sections.clear();
        let (bytes, pages) = PdfRenderer::new(system_font(), None)
            .render_pages(&report)
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(pages, 1);
    }

    #[test]
    fn long_sections_spill_onto_more_pages() {
        let (bytes, pages) = PdfRenderer::new(system_font(), None)
            .render_pages(&sample_report(40))
            .unwrap();
        assert!(pages > 2);
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn truetype_font_is_embedded() {
        let bytes = PdfRenderer::new(system_font(), None)
            .render(&sample_report(1))
            .unwrap();
        assert!(contains(&bytes, b"/FontFile2"));
    }
}
