use anyhow::{anyhow, Context};
use printpdf::{
    BuiltinFont, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};
use serde::Deserialize;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use super::layout::{Alignment, Block, FormDocument, Span, Table, Weight};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const FONT_SIZE: f32 = 11.0;
const LINE_HEIGHT: f32 = 6.0;
const ROW_HEIGHT: f32 = 7.0;
const CELL_PADDING: f32 = 2.0;
const LABEL_COLUMN_WIDTH: f32 = 75.0;
const PT_TO_MM: f32 = 25.4 / 72.0;

/// TrueType fonts to embed. Without them the PDF base fonts are used, which
/// cannot show most Polish diacritics.
#[derive(Deserialize, Debug, Clone)]
pub struct FontPaths {
    pub regular: PathBuf,
    pub bold: PathBuf,
}

fn add_builtin_font(
    doc: &PdfDocumentReference,
    font: BuiltinFont,
) -> anyhow::Result<IndirectFontRef> {
    doc.add_builtin_font(font)
        .map_err(|err| anyhow!("Could not add base font: {:?}", err))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    builtin: bool,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference, paths: Option<&FontPaths>) -> anyhow::Result<Self> {
        match paths {
            Some(paths) => {
                let load = |path: &Path| -> anyhow::Result<IndirectFontRef> {
                    let file =
                        File::open(path).with_context(|| format!("Opening font {:?}", path))?;
                    doc.add_external_font(file)
                        .map_err(|err| anyhow!("Could not load font {:?}: {:?}", path, err))
                };
                Ok(Self {
                    regular: load(&paths.regular)?,
                    bold: load(&paths.bold)?,
                    builtin: false,
                })
            }
            None => Ok(Self {
                regular: add_builtin_font(doc, BuiltinFont::Helvetica)?,
                bold: add_builtin_font(doc, BuiltinFont::HelveticaBold)?,
                builtin: true,
            }),
        }
    }

    fn get(&self, weight: Weight) -> &IndirectFontRef {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }

    fn prepare(&self, text: &str) -> String {
        if self.builtin {
            fold_polish_diacritics(text)
        } else {
            text.to_string()
        }
    }
}

/// Replaces Polish letters missing from the base fonts' encoding with their
/// plain Latin counterparts.
pub fn fold_polish_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ź' | 'ż' => 'z',
            'Ą' => 'A',
            'Ć' => 'C',
            'Ę' => 'E',
            'Ł' => 'L',
            'Ń' => 'N',
            'Ó' => 'O',
            'Ś' => 'S',
            'Ź' | 'Ż' => 'Z',
            other => other,
        })
        .collect()
}

/// Rough text width in mm; no glyph metrics are consulted.
pub fn estimate_text_width(text: &str, weight: Weight) -> f32 {
    let em = match weight {
        Weight::Regular => 0.5,
        Weight::Bold => 0.55,
    };
    text.chars().count() as f32 * FONT_SIZE * em * PT_TO_MM
}

/// Writes blocks top to bottom, starting a new page when one runs out.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    cursor: f32,
}

impl PageWriter<'_> {
    fn reserve(&mut self, height: f32) {
        if self.cursor - height < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.cursor = PAGE_HEIGHT - MARGIN;
        }
    }

    fn write_line(&mut self, spans: &[Span], alignment: Alignment) {
        self.reserve(LINE_HEIGHT);
        let spans: Vec<(String, Weight)> = spans
            .iter()
            .map(|span| (self.fonts.prepare(&span.text), span.weight))
            .collect();
        let width: f32 = spans
            .iter()
            .map(|(text, weight)| estimate_text_width(text, *weight))
            .sum();
        let mut x = match alignment {
            Alignment::Left => MARGIN,
            Alignment::Centered => (PAGE_WIDTH - width) / 2.0,
            Alignment::Right => PAGE_WIDTH - MARGIN - width,
        };
        let baseline = self.cursor - LINE_HEIGHT + 1.5;
        for (text, weight) in &spans {
            self.layer.use_text(
                text.as_str(),
                FONT_SIZE,
                Mm(x),
                Mm(baseline),
                self.fonts.get(*weight),
            );
            x += estimate_text_width(text, *weight);
        }
        self.cursor -= LINE_HEIGHT;
    }

    fn rectangle(&self, left: f32, top: f32, width: f32, height: f32) {
        let corners = [
            (left, top),
            (left + width, top),
            (left + width, top - height),
            (left, top - height),
        ];
        self.layer.add_line(Line {
            points: corners
                .iter()
                .map(|(x, y)| (Point::new(Mm(*x), Mm(*y)), false))
                .collect(),
            is_closed: true,
        });
    }

    fn write_table(&mut self, table: &Table) {
        let value_column_width = PAGE_WIDTH - 2.0 * MARGIN - LABEL_COLUMN_WIDTH;
        self.layer.set_outline_thickness(0.5);
        for (label, value) in &table.rows {
            self.reserve(ROW_HEIGHT);
            let top = self.cursor;
            self.rectangle(MARGIN, top, LABEL_COLUMN_WIDTH, ROW_HEIGHT);
            self.rectangle(MARGIN + LABEL_COLUMN_WIDTH, top, value_column_width, ROW_HEIGHT);
            let baseline = top - ROW_HEIGHT + CELL_PADDING;
            self.layer.use_text(
                self.fonts.prepare(label),
                FONT_SIZE,
                Mm(MARGIN + CELL_PADDING),
                Mm(baseline),
                &self.fonts.bold,
            );
            self.layer.use_text(
                self.fonts.prepare(value),
                FONT_SIZE,
                Mm(MARGIN + LABEL_COLUMN_WIDTH + CELL_PADDING),
                Mm(baseline),
                &self.fonts.regular,
            );
            self.cursor -= ROW_HEIGHT;
        }
        self.cursor -= CELL_PADDING;
    }

    fn write_image(&mut self, image: &image::RgbImage, width_pt: f32) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let width = width_pt * PT_TO_MM;
        let height = width * image.height() as f32 / image.width() as f32;
        self.reserve(height + CELL_PADDING);
        let dpi = image.width() as f32 * 72.0 / width_pt;
        let pdf_image =
            printpdf::Image::from_dynamic_image(&image::DynamicImage::ImageRgb8(image.clone()));
        pdf_image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.cursor - height)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.cursor -= height + CELL_PADDING;
    }
}

pub fn render_to_bytes(document: &FormDocument, fonts: Option<&FontPaths>) -> anyhow::Result<Vec<u8>> {
    let (doc, page, layer) =
        PdfDocument::new(document.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let layer = doc.get_page(page).get_layer(layer);
    let fonts = Fonts::load(&doc, fonts)?;
    let mut writer = PageWriter {
        doc: &doc,
        layer,
        fonts,
        cursor: PAGE_HEIGHT - MARGIN,
    };
    for block in &document.blocks {
        match block {
            Block::Line { spans, alignment } => writer.write_line(spans, *alignment),
            Block::Table(table) => writer.write_table(table),
            Block::Image { image, width_pt } => writer.write_image(image, *width_pt),
        }
    }
    doc.save_to_bytes()
        .map_err(|err| anyhow!("Could not serialize PDF: {:?}", err))
}

pub fn render_to_file(
    document: &FormDocument,
    fonts: Option<&FontPaths>,
    output_filepath: &Path,
) -> anyhow::Result<()> {
    let bytes = render_to_bytes(document, fonts)?;
    log::info!("Writing application form to {:?}", output_filepath);
    fs::write(output_filepath, bytes)
        .with_context(|| format!("Writing PDF to {:?}", output_filepath))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rstest::rstest;
    use testdir::testdir;

    use crate::form::layout::{build_application_form, tests::{address, map}, Weight};
    use crate::form::tree::ApplicationInput;

    use super::{estimate_text_width, fold_polish_diacritics, render_to_bytes, render_to_file};

    #[rstest]
    #[case("Białołęka", "Bialoleka")]
    #[case("Źródło danych", "Zrodlo danych")]
    #[case("ŻÓŁĆ gęślą jaźń", "ZOLC gesla jazn")]
    #[case("plain text 123", "plain text 123")]
    fn test_fold_polish_diacritics(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(fold_polish_diacritics(text), expected);
    }

    #[rstest]
    fn test_bold_text_is_wider() {
        assert!(estimate_text_width("Gatunek", Weight::Bold) > estimate_text_width("Gatunek", Weight::Regular));
        assert_eq!(estimate_text_width("", Weight::Regular), 0.0);
    }

    #[rstest]
    fn test_render_full_form() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 28).unwrap();
        let map = map();
        let document = build_application_form(
            &ApplicationInput::default(),
            Some(&address()),
            Some(&map),
            date,
        );
        let bytes = render_to_bytes(&document, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[rstest]
    fn test_render_without_address_and_map_to_file() {
        let date = NaiveDate::from_ymd_opt(2023, 5, 28).unwrap();
        let document = build_application_form(&ApplicationInput::default(), None, None, date);
        let output_filepath = testdir!().join("output.pdf");
        render_to_file(&document, None, &output_filepath).unwrap();
        assert!(std::fs::metadata(&output_filepath).unwrap().len() > 0);
    }
}
