// src/report/layout.rs
//
// Page layout for reports: positions every line of text and every cell box
// on fixed-size pages. Units are PDF points, origin bottom-left.

use std::mem;

use super::{Body, Report};

pub const INCH: f32 = 72.0;

/// Widest a record table may get before its columns are scaled down.
const MAX_TABLE_WIDTH: f32 = 7.5 * INCH;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub f32, pub f32, pub f32);

const BLACK: Rgb = Rgb(0.0, 0.0, 0.0);
const GREY: Rgb = Rgb(0.5, 0.5, 0.5);
const WHITESMOKE: Rgb = Rgb(0.961, 0.961, 0.961);
const TITLE_BLUE: Rgb = Rgb(0.122, 0.467, 0.706); // #1f77b4
const HEADING_SLATE: Rgb = Rgb(0.173, 0.243, 0.314); // #2c3e50
const HEADER_BLUE: Rgb = Rgb(0.204, 0.596, 0.859); // #3498db
const KEY_GREY: Rgb = Rgb(0.925, 0.941, 0.945); // #ecf0f1
const KEY_BLUE: Rgb = Rgb(0.910, 0.957, 0.973); // #e8f4f8
const ZEBRA: Rgb = Rgb(0.973, 0.976, 0.980); // #f8f9fa

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

/// A position in the exported table: row `row`, column `col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// One line of text with its baseline at `y`.
    Text {
        x: f32,
        y: f32,
        size: f32,
        font: Font,
        color: Rgb,
        text: String,
        /// Set when the line is (part of) an exported cell value.
        cell: Option<CellRef>,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub width: f32,
    pub height: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl PageSpec {
    pub const A4: PageSpec = PageSpec {
        width: 595.28,
        height: 841.89,
        left: 20.0,
        right: 20.0,
        top: 30.0,
        bottom: 18.0,
    };

    pub const LETTER: PageSpec = PageSpec {
        width: 612.0,
        height: 792.0,
        left: 72.0,
        right: 72.0,
        top: 72.0,
        bottom: 18.0,
    };

    pub fn printable_width(&self) -> f32 {
        self.width - self.left - self.right
    }
}

/// Width in inches for a column, by keyword on its name.
fn nominal_width(column: &str) -> f32 {
    let c = column.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| c.contains(w));
    if has(&["serial", "sr", "no"]) {
        0.5
    } else if has(&["case", "type", "number"]) {
        1.5
    } else if has(&["party", "name"]) {
        3.0
    } else if has(&["advocate", "lawyer"]) {
        1.5
    } else {
        1.0
    }
}

/// Column widths in points, scaled down uniformly when they would not fit
/// in `max_width`.
pub fn column_widths<S: AsRef<str>>(columns: &[S], max_width: f32) -> Vec<f32> {
    let widths: Vec<f32> = columns
        .iter()
        .map(|c| nominal_width(c.as_ref()) * INCH)
        .collect();
    let total: f32 = widths.iter().sum();
    if total > max_width {
        let scale = max_width / total;
        widths.into_iter().map(|w| w * scale).collect()
    } else {
        widths
    }
}

/// Approximate Helvetica advance width of `text`.
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let em: f32 = text
        .chars()
        .map(|c| match c {
            'i' | 'j' | 'l' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' => 0.25,
            ' ' | 'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '/' | '-' => 0.33,
            'm' | 'w' | 'M' | 'W' => 0.85,
            'A'..='Z' => 0.68,
            '0'..='9' => 0.556,
            _ => 0.53,
        })
        .sum();
    let weight = match font {
        Font::Regular => 1.0,
        Font::Bold => 1.08,
    };
    em * size * weight
}

/// Greedy word wrap. A word wider than `width` gets a line of its own.
pub fn wrap(text: &str, font: Font, size: f32, width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", line, word);
        if text_width(&candidate, font, size) <= width {
            line = candidate;
        } else {
            lines.push(mem::take(&mut line));
            line.push_str(word);
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Look of one table.
#[derive(Debug, Clone)]
pub struct TableStyle {
    pub widths: Vec<f32>,
    pub size: f32,
    pub leading: f32,
    pub header_size: f32,
    pub header_leading: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    /// Background and bold text for the first column (key/value tables).
    pub key_fill: Option<Rgb>,
    /// Background for every other data row.
    pub zebra: Option<Rgb>,
}

impl TableStyle {
    fn records(widths: Vec<f32>) -> Self {
        Self {
            widths,
            size: 7.0,
            leading: 9.0,
            header_size: 8.0,
            header_leading: 10.0,
            pad_x: 5.0,
            pad_y: 6.0,
            key_fill: None,
            zebra: Some(ZEBRA),
        }
    }

    fn key_value(widths: Vec<f32>, size: f32, pad_y: f32, key_fill: Rgb) -> Self {
        Self {
            widths,
            size,
            leading: size + 2.0,
            header_size: size,
            header_leading: size + 2.0,
            pad_x: 5.0,
            pad_y,
            key_fill: Some(key_fill),
            zebra: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<String>,
    pub refs: Vec<Option<CellRef>>,
}

impl TableRow {
    pub fn plain(cells: Vec<String>) -> Self {
        let refs = vec![None; cells.len()];
        Self { cells, refs }
    }
}

/// Fills pages top to bottom.
pub struct Layout {
    spec: PageSpec,
    done: Vec<Page>,
    current: Page,
    y: f32,
}

impl Layout {
    pub fn new(spec: PageSpec) -> Self {
        Self {
            spec,
            done: Vec::new(),
            current: Page::default(),
            y: spec.height - spec.top,
        }
    }

    pub fn page_break(&mut self) {
        self.done.push(mem::take(&mut self.current));
        self.y = self.spec.height - self.spec.top;
    }

    /// Start a new page unless `h` still fits. Returns whether it broke.
    fn ensure(&mut self, h: f32) -> bool {
        if self.y - h < self.spec.bottom && !self.current.items.is_empty() {
            self.page_break();
            true
        } else {
            false
        }
    }

    pub fn space(&mut self, h: f32) {
        self.y -= h;
    }

    pub fn title(&mut self, text: &str, size: f32) {
        self.ensure(size * 1.5);
        let w = text_width(text, Font::Bold, size);
        let x = ((self.spec.width - w) / 2.0).max(self.spec.left);
        self.y -= size;
        self.current.items.push(Item::Text {
            x,
            y: self.y,
            size,
            font: Font::Bold,
            color: TITLE_BLUE,
            text: text.to_string(),
            cell: None,
        });
        self.y -= size * 0.5;
    }

    /// A left-aligned bold heading. `keep_with` reserves room for what must
    /// follow it on the same page.
    pub fn heading(&mut self, text: &str, size: f32, color: Rgb, keep_with: f32) {
        self.ensure(size * 1.5 + keep_with);
        self.y -= size;
        self.current.items.push(Item::Text {
            x: self.spec.left,
            y: self.y,
            size,
            font: Font::Bold,
            color,
            text: text.to_string(),
            cell: None,
        });
        self.y -= size * 0.5;
    }

    fn table_x(&self, style: &TableStyle) -> f32 {
        let total: f32 = style.widths.iter().sum();
        self.spec.left + ((self.spec.printable_width() - total) / 2.0).max(0.0)
    }

    /// Lay out a table; the header row repeats on every page the table
    /// spills onto. A row taller than a page continues on the next one.
    pub fn table(&mut self, style: &TableStyle, header: Option<&[String]>, rows: &[TableRow]) {
        let header = header.map(|h| Self::cell_lines(style, h, true));
        if let Some(h) = &header {
            self.ensure(Self::lines_height(style, h, true));
            self.draw_lines(style, h.clone(), &[], true, None);
        }
        for (i, row) in rows.iter().enumerate() {
            let fill = match style.zebra {
                Some(z) if i % 2 == 1 => Some(z),
                _ => None,
            };
            let mut lines = Self::cell_lines(style, &row.cells, false);
            if self.ensure(Self::lines_height(style, &lines, false)) {
                if let Some(h) = &header {
                    self.draw_lines(style, h.clone(), &[], true, None);
                }
            }
            loop {
                let room = ((self.y - self.spec.bottom - 2.0 * style.pad_y) / style.leading)
                    .floor()
                    .max(1.0) as usize;
                let rest: Vec<Vec<String>> = lines
                    .iter_mut()
                    .map(|cell| {
                        if cell.len() > room {
                            cell.split_off(room)
                        } else {
                            Vec::new()
                        }
                    })
                    .collect();
                self.draw_lines(style, lines, &row.refs, false, fill);
                if rest.iter().all(Vec::is_empty) {
                    break;
                }
                lines = rest;
                self.page_break();
                if let Some(h) = &header {
                    self.draw_lines(style, h.clone(), &[], true, None);
                }
            }
        }
    }

    fn cell_lines(style: &TableStyle, cells: &[String], header: bool) -> Vec<Vec<String>> {
        let size = if header { style.header_size } else { style.size };
        cells
            .iter()
            .zip(&style.widths)
            .enumerate()
            .map(|(col, (text, w))| {
                let font = Self::cell_font(style, header, col);
                wrap(text, font, size, w - 2.0 * style.pad_x)
            })
            .collect()
    }

    fn cell_font(style: &TableStyle, header: bool, col: usize) -> Font {
        if header || (col == 0 && style.key_fill.is_some()) {
            Font::Bold
        } else {
            Font::Regular
        }
    }

    fn lines_height(style: &TableStyle, lines: &[Vec<String>], header: bool) -> f32 {
        let leading = if header { style.header_leading } else { style.leading };
        let n = lines.iter().map(Vec::len).max().unwrap_or(0).max(1);
        n as f32 * leading + 2.0 * style.pad_y
    }

    fn draw_lines(
        &mut self,
        style: &TableStyle,
        lines: Vec<Vec<String>>,
        refs: &[Option<CellRef>],
        header: bool,
        row_fill: Option<Rgb>,
    ) {
        let height = Self::lines_height(style, &lines, header);
        let (size, leading) = if header {
            (style.header_size, style.header_leading)
        } else {
            (style.size, style.leading)
        };
        let top = self.y;
        let mut x = self.table_x(style);

        for (col, lines) in lines.into_iter().enumerate() {
            let w = style.widths[col];
            let fill = if header {
                Some(HEADER_BLUE)
            } else if col == 0 && style.key_fill.is_some() {
                style.key_fill
            } else {
                row_fill
            };
            self.current.items.push(Item::Rect {
                x,
                y: top - height,
                w,
                h: height,
                fill,
                stroke: Some(GREY),
            });

            let font = Self::cell_font(style, header, col);
            let color = if header { WHITESMOKE } else { BLACK };
            let cell = refs.get(col).copied().flatten();
            for (i, line) in lines.into_iter().enumerate() {
                self.current.items.push(Item::Text {
                    x: x + style.pad_x,
                    y: top - style.pad_y - size - i as f32 * leading,
                    size,
                    font,
                    color,
                    text: line,
                    cell,
                });
            }
            x += w;
        }
        self.y = top - height;
    }

    pub fn finish(mut self) -> Vec<Page> {
        if !self.current.items.is_empty() || self.done.is_empty() {
            self.done.push(self.current);
        }
        self.done
    }
}

/// Sections in order of first appearance, with the record indices in each.
fn group_sections(rows: &[Vec<String>], col: usize) -> Vec<(String, Vec<usize>)> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let section = row.get(col).cloned().unwrap_or_default();
        match groups.iter_mut().find(|(s, _)| *s == section) {
            Some((_, members)) => members.push(i),
            None => groups.push((section, vec![i])),
        }
    }
    groups
}

fn record_rows(rows: &[Vec<String>], members: &[usize], columns: &[usize]) -> Vec<TableRow> {
    members
        .iter()
        .map(|&r| TableRow {
            cells: columns.iter().map(|&c| rows[r][c].clone()).collect(),
            refs: columns
                .iter()
                .map(|&c| Some(CellRef { row: r, col: c }))
                .collect(),
        })
        .collect()
}

/// Place a whole report on pages.
pub fn lay_out(report: &Report) -> Vec<Page> {
    let spec = report.page;
    let mut layout = Layout::new(spec);

    // 1) title and metadata
    layout.title(&report.title, report.title_size);
    layout.space(report.title_size * 0.5);
    let meta_widths = report.metadata_widths.iter().map(|w| w * INCH).collect();
    let meta_style = TableStyle::key_value(
        meta_widths,
        report.metadata_size,
        report.metadata_size * 0.75,
        KEY_GREY,
    );
    let meta_rows: Vec<TableRow> = report
        .metadata
        .iter()
        .map(|(k, v)| TableRow::plain(vec![format!("{}:", k), v.clone()]))
        .collect();
    layout.table(&meta_style, None, &meta_rows);
    layout.space(15.0);

    // 2) body
    let export = &report.export;
    match &report.body {
        Body::Records { section_column } => {
            let max_width = MAX_TABLE_WIDTH.min(spec.printable_width());
            let columns: Vec<usize> = (0..export.headers.len())
                .filter(|c| Some(*c) != *section_column)
                .collect();
            let headers: Vec<String> = columns.iter().map(|&c| export.headers[c].clone()).collect();
            let style = TableStyle::records(column_widths(&headers, max_width));

            match section_column {
                Some(sc) => {
                    let groups = group_sections(&export.rows, *sc);
                    let last = groups.len().saturating_sub(1);
                    for (g, (section, members)) in groups.iter().enumerate() {
                        let keep = style.header_leading + style.leading + 4.0 * style.pad_y;
                        layout.heading(
                            &format!("{} ({} cases)", section, members.len()),
                            12.0,
                            BLACK,
                            keep,
                        );
                        layout.space(8.0);
                        let rows = record_rows(&export.rows, members, &columns);
                        layout.table(&style, Some(&headers), &rows);
                        layout.space(12.0);
                        if g != last {
                            layout.page_break();
                        }
                    }
                }
                None => {
                    let members: Vec<usize> = (0..export.rows.len()).collect();
                    let rows = record_rows(&export.rows, &members, &columns);
                    layout.table(&style, Some(&headers), &rows);
                }
            }
        }
        Body::KeyValues { heading, pairs } => {
            layout.space(5.0);
            layout.heading(heading, 14.0, HEADING_SLATE, 40.0);
            layout.space(6.0);
            let style = TableStyle::key_value(vec![2.0 * INCH, 4.0 * INCH], 10.0, 12.0, KEY_BLUE);
            let rows: Vec<TableRow> = pairs
                .iter()
                .enumerate()
                .map(|(i, (k, v))| TableRow {
                    cells: vec![format!("{}:", k), v.clone()],
                    refs: vec![None, Some(CellRef { row: 0, col: i })],
                })
                .collect();
            layout.table(&style, None, &rows);
        }
    }

    layout.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_widths_by_keyword() {
        let cols = strings(&[
            "Serial Number",
            "Case Type/Case Number/Case Year",
            "Party Name",
            "Advocate",
            "Remarks",
        ]);
        let w = column_widths(&cols, MAX_TABLE_WIDTH);
        assert_eq!(
            w,
            vec![0.5 * INCH, 1.5 * INCH, 3.0 * INCH, 1.5 * INCH, 1.0 * INCH]
        );
    }

    #[test]
    fn test_widths_scaled_to_fit() {
        let cols = strings(&["Party", "Name of Petitioner", "Respondent Name", "Case"]);
        let w = column_widths(&cols, MAX_TABLE_WIDTH);
        let total: f32 = w.iter().sum();
        assert!((total - MAX_TABLE_WIDTH).abs() < 0.01, "{}", total);
        // proportions survive scaling
        assert!((w[0] / w[3] - 2.0).abs() < 1e-4);

        let narrow = column_widths(&cols, PageSpec::LETTER.printable_width());
        assert!(narrow.iter().sum::<f32>() <= PageSpec::LETTER.printable_width() + 0.01);
    }

    #[test]
    fn test_wrap_keeps_words_and_width() {
        let text = "Ramesh Kumar and others Vs State of NCT of Delhi through SHO";
        let width = 80.0;
        let lines = wrap(text, Font::Regular, 7.0, width);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" "), text);
        for l in &lines {
            assert!(text_width(l, Font::Regular, 7.0) <= width || !l.contains(' '));
        }
        assert!(wrap("", Font::Regular, 7.0, width).is_empty());
    }

    #[test]
    fn test_long_table_repeats_header_on_each_page() {
        let mut layout = Layout::new(PageSpec::A4);
        let headers = strings(&["Serial Number", "Party Name"]);
        let style = TableStyle::records(column_widths(&headers, MAX_TABLE_WIDTH));
        let rows: Vec<TableRow> = (0..200)
            .map(|i| TableRow::plain(vec![i.to_string(), format!("Party {}", i)]))
            .collect();
        layout.table(&style, Some(&headers), &rows);
        let pages = layout.finish();
        assert!(pages.len() > 1);

        for page in &pages {
            let has_header = page.items.iter().any(|it| {
                matches!(it, Item::Text { text, font: Font::Bold, .. } if text == "Party Name")
            });
            assert!(has_header);
            for it in &page.items {
                if let Item::Rect { y, .. } = it {
                    assert!(*y >= PageSpec::A4.bottom - 0.01);
                }
            }
        }
    }

    #[test]
    fn test_row_taller_than_a_page_continues_on_the_next() {
        let mut layout = Layout::new(PageSpec::A4);
        let headers = strings(&["Serial Number", "Party Name"]);
        let style = TableStyle::records(column_widths(&headers, MAX_TABLE_WIDTH));
        let parties: Vec<String> = (0..3000).map(|i| format!("Respondent{}", i)).collect();
        let parties = parties.join(" ");
        let cell = CellRef { row: 0, col: 1 };
        let row = TableRow {
            cells: vec!["1".into(), parties.clone()],
            refs: vec![None, Some(cell)],
        };
        layout.table(&style, Some(&headers), &[row]);
        let pages = layout.finish();
        assert!(pages.len() > 1, "{} page(s)", pages.len());

        let mut shown = Vec::new();
        for page in &pages {
            assert!(page.items.iter().any(|it| {
                matches!(it, Item::Text { text, font: Font::Bold, .. } if text == "Party Name")
            }));
            for it in &page.items {
                match it {
                    Item::Rect { y, .. } => assert!(*y >= PageSpec::A4.bottom - 0.01, "rect at {}", y),
                    Item::Text { y, .. } => assert!(*y >= PageSpec::A4.bottom, "text at {}", y),
                }
                if let Item::Text { text, cell: Some(c), .. } = it {
                    assert_eq!(*c, cell);
                    shown.push(text.as_str());
                }
            }
        }
        // nothing lost or repeated across the breaks
        assert_eq!(shown.join(" "), parties);
    }

    #[test]
    fn test_group_sections_in_first_seen_order() {
        let rows = vec![
            strings(&["B", "1"]),
            strings(&["A", "2"]),
            strings(&["B", "3"]),
        ];
        let groups = group_sections(&rows, 0);
        assert_eq!(
            groups,
            vec![("B".to_string(), vec![0, 2]), ("A".to_string(), vec![1])]
        );
    }
}
