use std::collections::BTreeSet;
use std::fmt::Write as _;

use lopdf::{dictionary, Document, Object, Stream};
use tracing::warn;

use crate::error::RenderError;

use super::raster::{DrawOp, FontFace, Raster};
use super::{FontFamily, PageSize};

/// Tops of the page-height bands covering a raster of `height` pixels.
///
/// Always at least one band. A trailing partial band gets its own page, a
/// raster of exactly two bands gets two.
pub fn page_bands(height: u32, band_height: f32) -> Vec<f32> {
    let mut tops = vec![0.0];
    if band_height <= 0.0 {
        return tops;
    }
    let mut remaining = height as f32 - band_height;
    while remaining > 0.0 {
        tops.push(height as f32 - remaining);
        remaining -= band_height;
    }
    tops
}

fn base_font(family: FontFamily, face: FontFace) -> &'static str {
    match (family, face) {
        (FontFamily::Serif, FontFace::Regular) => "Times-Roman",
        (FontFamily::Serif, FontFace::Bold) => "Times-Bold",
        (FontFamily::Serif, FontFace::Italic) => "Times-Italic",
        (FontFamily::Serif, FontFace::BoldItalic) => "Times-BoldItalic",
        (FontFamily::Sans, FontFace::Regular) => "Helvetica",
        (FontFamily::Sans, FontFace::Bold) => "Helvetica-Bold",
        (FontFamily::Sans, FontFace::Italic) => "Helvetica-Oblique",
        (FontFamily::Sans, FontFace::BoldItalic) => "Helvetica-BoldOblique",
    }
}

fn font_key(face: FontFace) -> &'static str {
    match face {
        FontFace::Regular => "F1",
        FontFace::Bold => "F2",
        FontFace::Italic => "F3",
        FontFace::BoldItalic => "F4",
    }
}

/// Map a character to its WinAnsiEncoding byte.
fn win_ansi(c: char) -> Option<u8> {
    Some(match c {
        ' '..='~' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    })
}

/// WinAnsi spelling of common characters the encoding lacks.
fn substitute(c: char) -> Option<&'static str> {
    Some(match c {
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2043}' | '\u{2212}' => "-",
        '\u{2015}' => "—",
        '\u{2002}'..='\u{200a}' | '\u{202f}' | '\u{205f}' => " ",
        '\u{200b}'..='\u{200d}' | '\u{2060}' | '\u{feff}' => "",
        '\u{201b}' | '\u{2032}' => "'",
        '\u{201f}' | '\u{2033}' => "\"",
        '\u{2044}' | '\u{2215}' => "/",
        '\u{2264}' => "<=",
        '\u{2265}' => ">=",
        '\u{2260}' => "!=",
        '\u{2248}' => "~",
        '\u{2192}' => "->",
        '\u{2190}' => "<-",
        '\u{2116}' => "Nº",
        _ => return None,
    })
}

/// Encode text as the body of a PDF literal string.
///
/// Characters with no WinAnsi byte and no substitute become `?` and are
/// added to `missing`.
fn pdf_string(text: &str, missing: &mut BTreeSet<char>) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match win_ansi(c) {
            Some(b) => push_byte(&mut out, b),
            None => match substitute(c) {
                Some(replacement) => replacement
                    .chars()
                    .filter_map(win_ansi)
                    .for_each(|b| push_byte(&mut out, b)),
                None => {
                    missing.insert(c);
                    out.push('?');
                }
            },
        }
    }
    out
}

fn push_byte(out: &mut String, b: u8) {
    match b {
        b'(' => out.push_str("\\("),
        b')' => out.push_str("\\)"),
        b'\\' => out.push_str("\\\\"),
        0x20..=0x7e => out.push(b as char),
        _ => {
            let _ = write!(out, "\\{:03o}", b);
        }
    }
}

/// Content stream for the band starting at `top`.
fn page_content(
    raster: &Raster,
    top: f32,
    band: f32,
    (page_w, page_h): (f32, f32),
    missing: &mut BTreeSet<char>,
) -> Vec<u8> {
    let s = page_w / raster.width as f32;
    let y = |v: f32| page_h - (v - top) * s;

    let mut out = String::new();
    let _ = writeln!(out, "q 0 0 {} {} re W n", page_w, page_h);
    for op in &raster.ops {
        let (op_top, op_bottom) = op.extent();
        if op_bottom <= top || op_top >= top + band {
            continue;
        }
        match op {
            DrawOp::Text {
                x,
                baseline,
                size,
                face,
                text,
            } => {
                let _ = writeln!(
                    out,
                    "BT /{} {:.2} Tf {:.2} {:.2} Td ({}) Tj ET",
                    font_key(*face),
                    size * s,
                    x * s,
                    y(*baseline),
                    pdf_string(text, missing)
                );
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
            } => {
                let _ = writeln!(
                    out,
                    "{:.2} w {:.2} {:.2} m {:.2} {:.2} l S",
                    width * s,
                    x1 * s,
                    y(*y1),
                    x2 * s,
                    y(*y2)
                );
            }
        }
    }
    out.push_str("Q\n");
    out.into_bytes()
}

/// Slice a raster into page bands and assemble them into a PDF.
pub fn assemble(raster: &Raster, page_size: PageSize) -> Result<Vec<u8>, RenderError> {
    if raster.width == 0 {
        return Err(RenderError::PdfAssembly("raster has no width".to_string()));
    }
    let (page_w, page_h) = page_size.points();
    let band = page_h as f32 * raster.width as f32 / page_w as f32;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for face in FontFace::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base_font(raster.family, face),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font_key(face), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let media_box: Vec<Object> = [0, 0, page_w, page_h]
        .iter()
        .map(|v| Object::Integer(*v as i64))
        .collect();

    let mut kids: Vec<Object> = Vec::new();
    let mut missing = BTreeSet::new();
    for top in page_bands(raster.height, band) {
        let content = page_content(
            raster,
            top,
            band,
            (page_w as f32, page_h as f32),
            &mut missing,
        );
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }
    if !missing.is_empty() {
        warn!(
            characters = %missing.iter().collect::<String>(),
            "characters without a glyph in the PDF fonts were replaced with '?'"
        );
    }

    let count = kids.len() as i64;
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

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError::PdfAssembly(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn test_page_bands() {
        assert_eq!(page_bands(240, 100.0), vec![0.0, 100.0, 200.0]);
        assert_eq!(page_bands(200, 100.0).len(), 2);
        assert_eq!(page_bands(50, 100.0), vec![0.0]);
        assert_eq!(page_bands(0, 100.0), vec![0.0]);
        assert_eq!(page_bands(201, 100.0).len(), 3);
    }

    #[test]
    fn test_pdf_string_escaping() {
        let mut missing = BTreeSet::new();
        assert_eq!(pdf_string("a (b) \\", &mut missing), "a \\(b\\) \\\\");
        assert_eq!(pdf_string("ção", &mut missing), "\\347\\343o");
        assert_eq!(pdf_string("—", &mut missing), "\\227");
        assert!(missing.is_empty());
        assert_eq!(pdf_string("漢", &mut missing), "?");
        assert_eq!(missing, BTreeSet::from(['漢']));
    }

    #[test]
    fn test_pdf_string_substitutes_near_equivalents() {
        let mut missing = BTreeSet::new();
        assert_eq!(pdf_string("art. 5\u{2010}A", &mut missing), "art. 5-A");
        assert_eq!(pdf_string("área ≥ 50 m²", &mut missing), "\\341rea >= 50 m\\262");
        assert_eq!(pdf_string("a\u{200b}b", &mut missing), "ab");
        assert!(missing.is_empty());
    }

    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn assemble_logged(raster: &Raster) -> String {
        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, || assemble(raster, PageSize::A4).unwrap());
        let logged = capture.0.lock().unwrap().clone();
        String::from_utf8(logged).unwrap()
    }

    #[test]
    fn test_unencodable_characters_are_logged() {
        let (mut raster, _) = raster_with_pages(1.0);
        raster.ops.push(DrawOp::Text {
            x: 112.0,
            baseline: 400.0,
            size: 32.0,
            face: FontFace::Regular,
            text: "cartório 漢 ≥ ∑".to_string(),
        });
        let logged = assemble_logged(&raster);
        assert!(logged.contains("WARN"));
        assert!(logged.contains("∑漢"));
        assert!(!logged.contains('≥'));
    }

    #[test]
    fn test_encodable_text_logs_nothing() {
        let (raster, _) = raster_with_pages(1.0);
        assert!(assemble_logged(&raster).is_empty());
    }

    fn raster_with_pages(pages: f32) -> (Raster, f32) {
        let width = 1587;
        let band = 842.0 * width as f32 / 595.0;
        let raster = Raster {
            width,
            height: (band * pages).ceil() as u32,
            scale: 2,
            family: FontFamily::Serif,
            ops: vec![
                DrawOp::Text {
                    x: 112.0,
                    baseline: 200.0,
                    size: 32.0,
                    face: FontFace::Regular,
                    text: "primeira".to_string(),
                },
                DrawOp::Text {
                    x: 112.0,
                    baseline: band + 200.0,
                    size: 32.0,
                    face: FontFace::Bold,
                    text: "segunda".to_string(),
                },
                DrawOp::Line {
                    x1: 112.0,
                    y1: band - 1.0,
                    x2: 112.0,
                    y2: band + 1.0,
                    width: 2.0,
                },
            ],
        };
        (raster, band)
    }

    #[test]
    fn test_assemble_slices_into_pages() {
        let (raster, _) = raster_with_pages(2.4);
        let bytes = assemble(&raster, PageSize::A4).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);

        let ids: Vec<_> = pages.values().copied().collect();
        let first = String::from_utf8_lossy(&doc.get_page_content(ids[0]).unwrap()).into_owned();
        let second = String::from_utf8_lossy(&doc.get_page_content(ids[1]).unwrap()).into_owned();
        let third = String::from_utf8_lossy(&doc.get_page_content(ids[2]).unwrap()).into_owned();

        assert!(first.contains("(primeira) Tj"));
        assert!(!first.contains("segunda"));
        assert!(second.contains("/F2"));
        assert!(second.contains("(segunda) Tj"));
        // A line across the cut is drawn on both pages and clipped
        assert!(first.contains(" l S"));
        assert!(second.contains(" l S"));
        assert!(!third.contains("Tj"));
    }

    #[test]
    fn test_exact_two_pages() {
        let (mut raster, band) = raster_with_pages(2.0);
        raster.height = (band * 2.0).floor() as u32;
        let bytes = assemble(&raster, PageSize::A4).unwrap();
        assert_eq!(Document::load_mem(&bytes).unwrap().get_pages().len(), 2);
    }

    #[test]
    fn test_letter_media_box() {
        let (raster, _) = raster_with_pages(0.5);
        let bytes = assemble(&raster, PageSize::Letter).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_zero_width_raster_fails() {
        let raster = Raster {
            width: 0,
            height: 10,
            scale: 2,
            family: FontFamily::Sans,
            ops: Vec::new(),
        };
        let err = assemble(&raster, PageSize::A4).unwrap_err();
        assert!(matches!(err, RenderError::PdfAssembly(_)));
    }
}
