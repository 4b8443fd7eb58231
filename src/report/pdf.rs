// src/report/pdf.rs
//
// Renders laid-out pages with the base-14 Helvetica fonts.

use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

use super::layout::{Font, Item, Page, PageSpec, Rgb};

const REGULAR: &str = "F1";
const BOLD: &str = "F2";
const GRID_WIDTH: f32 = 0.5;

/// WinAnsi bytes 0x80-0x9F. Printable ASCII and 0xA0-0xFF match Latin-1.
const WIN_ANSI_HIGH: [(u8, char); 27] = [
    (0x80, '\u{20ac}'),
    (0x82, '\u{201a}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201e}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02c6}'),
    (0x89, '\u{2030}'),
    (0x8a, '\u{0160}'),
    (0x8b, '\u{2039}'),
    (0x8c, '\u{0152}'),
    (0x8e, '\u{017d}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201c}'),
    (0x94, '\u{201d}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02dc}'),
    (0x99, '\u{2122}'),
    (0x9a, '\u{0161}'),
    (0x9b, '\u{203a}'),
    (0x9c, '\u{0153}'),
    (0x9e, '\u{017e}'),
    (0x9f, '\u{0178}'),
];

static WIN_ANSI: Lazy<HashMap<char, u8>> = Lazy::new(|| {
    let mut map: HashMap<char, u8> = (0x20u8..=0x7e)
        .chain(0xa0..=0xff)
        .map(|b| (char::from(b), b))
        .collect();
    map.extend(WIN_ANSI_HIGH.iter().map(|&(b, c)| (c, b)));
    map
});

/// Text as WinAnsi bytes; characters the code page lacks become `?`.
fn win_ansi(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| WIN_ANSI.get(&c).copied().unwrap_or(b'?'))
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

/// Inverse of [`win_ansi`] for reading rendered pages back.
#[cfg(test)]
pub(crate) fn decode_win_ansi(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            WIN_ANSI_HIGH
                .iter()
                .find(|(x, _)| *x == b)
                .map_or(char::from(b), |&(_, c)| c)
        })
        .collect()
}

fn rgb(op: &str, c: Rgb) -> Operation {
    Operation::new(op, vec![c.0.into(), c.1.into(), c.2.into()])
}

fn operations(page: &Page) -> Vec<Operation> {
    let mut ops = vec![Operation::new("w", vec![GRID_WIDTH.into()])];
    for item in &page.items {
        match item {
            Item::Rect {
                x,
                y,
                w,
                h,
                fill,
                stroke,
            } => {
                if let Some(c) = fill {
                    ops.push(rgb("rg", *c));
                }
                if let Some(c) = stroke {
                    ops.push(rgb("RG", *c));
                }
                ops.push(Operation::new(
                    "re",
                    vec![(*x).into(), (*y).into(), (*w).into(), (*h).into()],
                ));
                let paint = match (fill.is_some(), stroke.is_some()) {
                    (true, true) => "B",
                    (true, false) => "f",
                    (false, true) => "S",
                    (false, false) => "n",
                };
                ops.push(Operation::new(paint, vec![]));
            }
            Item::Text {
                x,
                y,
                size,
                font,
                color,
                text,
                ..
            } => {
                let name = match font {
                    Font::Regular => REGULAR,
                    Font::Bold => BOLD,
                };
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec![name.into(), (*size).into()]));
                ops.push(rgb("rg", *color));
                ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                ops.push(Operation::new("Tj", vec![win_ansi(text)]));
                ops.push(Operation::new("ET", vec![]));
            }
        }
    }
    ops
}

/// Write `pages` to `path` as a PDF document.
pub fn write_pdf(pages: &[Page], spec: &PageSpec, path: &Path) -> Result<()> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font = |base: &str| {
        dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => Object::Name(base.as_bytes().to_vec()),
            "Encoding" => "WinAnsiEncoding",
        }
    };
    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            REGULAR => regular_id,
            BOLD => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        let content = Content {
            operations: operations(page),
        };
        let bytes = content
            .encode()
            .with_context(|| format!("encoding page {}", i + 1))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let media_box: Vec<Object> = vec![0.into(), 0.into(), spec.width.into(), spec.height.into()];
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
