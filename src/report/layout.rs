// Paginated layout of a report
//
// Walks the template top to bottom with a vertical cursor (millimetres from
// the top edge) and emits positioned text runs and table rows per page. The
// PDF writer only has to paint what is laid out here.

use chrono::{DateTime, Local};
use serde_json::Value;

use super::data_path::{interpolate, lookup, lookup_text, value_to_text};
use super::template::{LayoutElement, ReportTemplate, DEFAULT_TABLE_COLUMNS};
use crate::conversation::transcript::label;
use crate::conversation::{ChatTurn, Speaker};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 15.0;
pub const LINE_HEIGHT_MM: f32 = 7.0;
pub const START_Y_MM: f32 = 20.0;
/// Space that must remain on the page before any element is placed
pub const MIN_ELEMENT_SPACE_MM: f32 = 30.0;
/// Per-row estimate used to decide whether a table fits
pub const TABLE_ROW_ESTIMATE_MM: f32 = 14.0;
pub const TABLE_EXTRA_SPACE_MM: f32 = 20.0;
pub const PRINTABLE_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

const TABLE_FONT_SIZE: f32 = 10.0;
const TABLE_CELL_PADDING_MM: f32 = 2.0;
const TABLE_LINE_HEIGHT_MM: f32 = 5.0;

// Average Helvetica glyph width is about half an em
const AVG_GLYPH_EM: f32 = 0.5;
const PT_TO_MM: f32 = 0.3528;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const HEADER: Color = Color::rgb(0x55, 0x00, 0x00);
    pub const ACCENT: Color = Color::rgb(0xd7, 0x2c, 0x4b);
    pub const BODY: Color = Color::rgb(0x51, 0x4e, 0x57);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const GRID: Color = Color::rgb(0xbf, 0xbf, 0xbf);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// One line of text; `y` is the baseline measured from the top edge
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Color,
    pub weight: FontWeight,
    pub text: String,
}

/// One table row; `y` is the top of the row
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub x: f32,
    pub y: f32,
    pub height: f32,
    pub column_widths: Vec<f32>,
    /// Wrapped lines per cell
    pub cells: Vec<Vec<String>>,
    pub header: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    Text(TextRun),
    TableRow(TableRow),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<DrawItem>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &TextRun> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::Text(run) => Some(run),
            DrawItem::TableRow(_) => None,
        })
    }

    pub fn table_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::TableRow(row) => Some(row),
            DrawItem::Text(_) => None,
        })
    }

    pub fn contains_text(&self, needle: &str) -> bool {
        self.texts().any(|run| run.text.contains(needle))
    }
}

/// Laid-out report, ready to be painted
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub pages: Vec<Page>,
    /// Elements skipped because their data was missing or malformed
    pub warnings: Vec<String>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn table_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.pages.iter().flat_map(Page::table_rows)
    }

    /// Index of the first page with a text run containing `needle`
    pub fn page_of(&self, needle: &str) -> Option<usize> {
        self.pages.iter().position(|page| page.contains_text(needle))
    }
}

/// Lay out `template` with the current local time
pub fn render(template: &ReportTemplate, data: &Value, transcript: &[ChatTurn]) -> Document {
    render_at(template, data, transcript, Local::now())
}

/// Lay out `template` with an explicit clock for the `date_time` element
pub fn render_at(
    template: &ReportTemplate,
    data: &Value,
    transcript: &[ChatTurn],
    now: DateTime<Local>,
) -> Document {
    let mut renderer = Renderer::new(now);
    for element in template.elements() {
        renderer.place(element, data, transcript);
    }
    renderer.finish()
}

struct Renderer {
    pages: Vec<Page>,
    warnings: Vec<String>,
    y: f32,
    now: DateTime<Local>,
}

impl Renderer {
    fn new(now: DateTime<Local>) -> Self {
        Self {
            pages: vec![Page::default()],
            warnings: Vec::new(),
            y: START_Y_MM,
            now,
        }
    }

    fn finish(self) -> Document {
        Document {
            pages: self.pages,
            warnings: self.warnings,
        }
    }

    fn place(&mut self, element: &LayoutElement, data: &Value, transcript: &[ChatTurn]) {
        self.ensure_space(MIN_ELEMENT_SPACE_MM);

        match element {
            LayoutElement::Header { text } => {
                let size = 20.0;
                let x = ((PAGE_WIDTH_MM - estimate_width(text, size)) / 2.0).max(MARGIN_MM);
                self.push_run(x, size, Color::HEADER, FontWeight::Bold, text.clone());
                self.y += 15.0;
            }
            LayoutElement::DateTime {
                text_prefix,
                text_suffix,
            } => {
                let line = format!(
                    "{}{}{}{}",
                    text_prefix,
                    self.now.format("%d/%m/%Y"),
                    text_suffix,
                    self.now.format("%H:%M:%S")
                );
                self.push_run(MARGIN_MM, 10.0, Color::BODY, FontWeight::Regular, line);
                self.y += 10.0;
            }
            LayoutElement::SectionTitle { text } => {
                let (title, missing) = interpolate(text, data);
                for path in missing {
                    self.warn(element, &path);
                }
                self.add_text(&title, 16.0, Color::ACCENT, FontWeight::Bold);
                self.y += 10.0;
            }
            LayoutElement::MainSectionTitle { text } => {
                self.add_text(text, 16.0, Color::HEADER, FontWeight::Bold);
                self.y += LINE_HEIGHT_MM;
            }
            LayoutElement::MainSectionTitleAppendix { text } => {
                if !self.page_is_blank() {
                    self.new_page();
                }
                self.add_text(text, 16.0, Color::HEADER, FontWeight::Bold);
                self.y += 10.0;
            }
            LayoutElement::SubSectionTitle { text } => {
                self.add_text(text, 12.0, Color::ACCENT, FontWeight::Bold);
                self.y += LINE_HEIGHT_MM;
            }
            LayoutElement::Text { data_path, title } => match lookup_text(data, data_path) {
                Some(value) => {
                    let line = match title {
                        Some(title) => format!("{} : {}", title, value),
                        None => value,
                    };
                    self.add_text(&line, 10.0, Color::BODY, FontWeight::Regular);
                    self.y += LINE_HEIGHT_MM;
                }
                None => self.warn(element, data_path),
            },
            LayoutElement::KeyValueText { key, data_path } => match lookup_text(data, data_path) {
                Some(value) => {
                    let line = format!("{} {}", key, value);
                    self.add_text(&line, 10.0, Color::BODY, FontWeight::Regular);
                }
                None => self.warn(element, data_path),
            },
            LayoutElement::List { data_path } => match array_at(data, data_path) {
                Some(items) => {
                    for item in items {
                        if let Some(text) = value_to_text(item) {
                            self.add_text(&format!("- {}", text), 10.0, Color::BODY, FontWeight::Regular);
                        }
                    }
                    self.y += 10.0;
                }
                None => self.warn(element, data_path),
            },
            LayoutElement::List5Why { data_path } => match array_at(data, data_path) {
                Some(items) => {
                    for item in items {
                        let question = item.get("question").and_then(value_to_text).unwrap_or_default();
                        let answer = item.get("reponse").and_then(value_to_text).unwrap_or_default();
                        let line = format!("{} {}", question, answer);
                        self.add_text(line.trim(), 10.0, Color::BODY, FontWeight::Regular);
                    }
                    self.y += 10.0;
                }
                None => self.warn(element, data_path),
            },
            LayoutElement::Table {
                data_path,
                headers,
                columns,
            } => match array_at(data, data_path) {
                Some(rows) => {
                    let columns: Vec<&str> = match columns {
                        Some(columns) => columns.iter().map(String::as_str).collect(),
                        None => DEFAULT_TABLE_COLUMNS.to_vec(),
                    };
                    self.place_table(headers, &columns, rows);
                }
                None => self.warn(element, data_path),
            },
            LayoutElement::ChatTranscript {} => {
                for turn in transcript {
                    let color = match turn.speaker {
                        Speaker::User => Color::ACCENT,
                        Speaker::Assistant => Color::BODY,
                    };
                    let line = format!("{} {}", label(turn.speaker), turn.text);
                    self.add_text(&line, 10.0, color, FontWeight::Regular);
                    self.y += 5.0;
                }
            }
        }
    }

    fn place_table(&mut self, headers: &[String], columns: &[&str], rows: &[Value]) {
        let column_count = headers.len().max(columns.len()).max(1);
        let width = PRINTABLE_WIDTH_MM / column_count as f32;
        let column_widths = vec![width; column_count];

        let estimated = (rows.len() as f32 + 1.0) * TABLE_ROW_ESTIMATE_MM;
        self.ensure_space(estimated + TABLE_EXTRA_SPACE_MM);
        self.y += 5.0;

        let header_cells: Vec<String> = (0..column_count)
            .map(|i| headers.get(i).cloned().unwrap_or_default())
            .collect();
        self.push_table_row(&column_widths, header_cells, true);

        for row in rows {
            let cells: Vec<String> = (0..column_count)
                .map(|i| {
                    columns
                        .get(i)
                        .and_then(|field| row.get(*field))
                        .and_then(value_to_text)
                        .unwrap_or_default()
                })
                .collect();
            self.push_table_row(&column_widths, cells, false);
        }

        self.y += 10.0;
    }

    fn push_table_row(&mut self, column_widths: &[f32], cells: Vec<String>, header: bool) {
        let wrapped: Vec<Vec<String>> = cells
            .iter()
            .zip(column_widths)
            .map(|(cell, width)| {
                wrap_text(cell, width - 2.0 * TABLE_CELL_PADDING_MM, TABLE_FONT_SIZE)
            })
            .collect();
        let line_count = wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let height = line_count as f32 * TABLE_LINE_HEIGHT_MM + 2.0 * TABLE_CELL_PADDING_MM;

        // Rows are never split; an overflowing row moves to the next page
        self.ensure_space(height);

        let row = TableRow {
            x: MARGIN_MM,
            y: self.y,
            height,
            column_widths: column_widths.to_vec(),
            cells: wrapped,
            header,
        };
        self.current_page().items.push(DrawItem::TableRow(row));
        self.y += height;
    }

    /// Wrapped paragraph; moves to a new page first when the block would
    /// cross the bottom margin
    fn add_text(&mut self, text: &str, size: f32, color: Color, weight: FontWeight) {
        let lines = wrap_text(text, PRINTABLE_WIDTH_MM, size);
        self.ensure_space(lines.len() as f32 * LINE_HEIGHT_MM);

        for line in lines {
            if self.y > PAGE_HEIGHT_MM - MARGIN_MM {
                self.new_page();
            }
            self.push_run(MARGIN_MM, size, color, weight, line);
            self.y += LINE_HEIGHT_MM;
        }
    }

    fn push_run(&mut self, x: f32, size: f32, color: Color, weight: FontWeight, text: String) {
        let run = TextRun {
            x,
            y: self.y,
            size,
            color,
            weight,
            text,
        };
        self.current_page().items.push(DrawItem::Text(run));
    }

    /// A fresh page is never followed by another one, even when `required`
    /// exceeds a whole page
    fn ensure_space(&mut self, required: f32) {
        if self.y + required > PAGE_HEIGHT_MM - MARGIN_MM && !self.page_is_blank() {
            self.new_page();
        }
    }

    fn page_is_blank(&self) -> bool {
        self.pages.last().map_or(true, |p| p.items.is_empty())
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = MARGIN_MM;
    }

    fn current_page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn warn(&mut self, element: &LayoutElement, path: &str) {
        let message = format!(
            "{} element skipped: no usable value at '{}'",
            element.kind(),
            path
        );
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

fn array_at<'a>(data: &'a Value, path: &str) -> Option<&'a [Value]> {
    lookup(data, path).and_then(Value::as_array).map(Vec::as_slice)
}

fn glyph_width_mm(size: f32) -> f32 {
    size * PT_TO_MM * AVG_GLYPH_EM
}

/// Rough rendered width of `text` at `size` points
pub fn estimate_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * glyph_width_mm(size)
}

/// Greedy word wrap to `width_mm`; explicit newlines are kept and words
/// longer than a line are hard-split
pub fn wrap_text(text: &str, width_mm: f32, size: f32) -> Vec<String> {
    let max_chars = ((width_mm / glyph_width_mm(size)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0usize;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > max_chars {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed > max_chars && current_len > 0 {
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

    // Trailing empty paragraphs only add blank space
    while lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
