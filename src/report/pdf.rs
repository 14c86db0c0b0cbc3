// PDF serialization of a laid-out Document (printpdf, builtin Helvetica)

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color as PdfColor, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference,
    Point, Polygon, Rgb,
};

use super::layout::{
    Color, Document, DrawItem, FontWeight, TableRow, TextRun, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
};
use crate::errors::{QrqcError, Result};

const DOCUMENT_TITLE: &str = "QRQC report";
const LAYER_NAME: &str = "Report";
const CELL_PADDING_MM: f32 = 2.0;
const CELL_LINE_HEIGHT_MM: f32 = 5.0;
const CELL_FONT_SIZE: f32 = 10.0;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, weight: FontWeight) -> &IndirectFontRef {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }
}

/// Paint every page of `document` and return the PDF file bytes
pub fn to_pdf_bytes(document: &Document) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        DOCUMENT_TITLE,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        LAYER_NAME,
    );

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| QrqcError::Render(format!("font setup failed: {}", e)))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| QrqcError::Render(format!("font setup failed: {}", e)))?,
    };

    for (index, page) in document.pages.iter().enumerate() {
        let layer = if index == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER_NAME);
            doc.get_page(page_index).get_layer(layer_index)
        };

        for item in &page.items {
            match item {
                DrawItem::Text(run) => draw_text(&layer, &fonts, run),
                DrawItem::TableRow(row) => draw_table_row(&layer, &fonts, row),
            }
        }
    }

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| QrqcError::Render(format!("could not serialize PDF: {}", e)))?;

    tracing::debug!(
        "Wrote {}-page PDF ({} bytes)",
        document.page_count(),
        bytes.len()
    );
    Ok(bytes)
}

fn pdf_color(color: Color) -> PdfColor {
    PdfColor::Rgb(Rgb::new(
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
        None,
    ))
}

/// Layout works from the top edge, PDF from the bottom
fn flip(y: f32) -> Mm {
    Mm(PAGE_HEIGHT_MM - y)
}

fn point(x: f32, y: f32) -> (Point, bool) {
    (Point::new(Mm(x), flip(y)), false)
}

fn draw_text(layer: &PdfLayerReference, fonts: &Fonts, run: &TextRun) {
    layer.set_fill_color(pdf_color(run.color));
    layer.use_text(
        run.text.clone(),
        run.size,
        Mm(run.x),
        flip(run.y),
        fonts.get(run.weight),
    );
}

fn draw_table_row(layer: &PdfLayerReference, fonts: &Fonts, row: &TableRow) {
    let total_width: f32 = row.column_widths.iter().sum();
    let (left, top) = (row.x, row.y);
    let (right, bottom) = (row.x + total_width, row.y + row.height);

    if row.header {
        layer.set_fill_color(pdf_color(Color::ACCENT));
        layer.add_polygon(Polygon {
            rings: vec![vec![
                point(left, top),
                point(right, top),
                point(right, bottom),
                point(left, bottom),
            ]],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
    }

    layer.set_outline_color(pdf_color(Color::GRID));
    layer.set_outline_thickness(0.5);
    layer.add_line(Line {
        points: vec![
            point(left, top),
            point(right, top),
            point(right, bottom),
            point(left, bottom),
        ],
        is_closed: true,
    });

    let mut x = left;
    for width in &row.column_widths[..row.column_widths.len().saturating_sub(1)] {
        x += width;
        layer.add_line(Line {
            points: vec![point(x, top), point(x, bottom)],
            is_closed: false,
        });
    }

    let (color, font) = if row.header {
        (Color::WHITE, fonts.get(FontWeight::Bold))
    } else {
        (Color::BODY, fonts.get(FontWeight::Regular))
    };
    layer.set_fill_color(pdf_color(color));

    let mut cell_x = left;
    for (lines, width) in row.cells.iter().zip(&row.column_widths) {
        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let baseline = top + CELL_PADDING_MM + (i as f32 + 1.0) * CELL_LINE_HEIGHT_MM - 1.0;
            layer.use_text(
                line.clone(),
                CELL_FONT_SIZE,
                Mm(cell_x + CELL_PADDING_MM),
                flip(baseline),
                font,
            );
        }
        cell_x += width;
    }
}
