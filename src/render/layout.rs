//! Block layout at scale 1, in CSS pixels.

use std::mem;

use super::html::{Align, Block, Span, Table, TextBlock, TextKind, TextStyle};
use super::raster::{DrawOp, FontFace};
use super::PrintStylesheet;

/// Baseline position inside a line box, as a fraction of the font size.
const ASCENT: f32 = 0.8;
const UNDERLINE_OFFSET: f32 = 0.12;
const UNDERLINE_WIDTH: f32 = 0.06;
const MARKER_GAP: f32 = 6.0;

pub(super) struct Layout {
    pub ops: Vec<DrawOp>,
    pub height: f32,
}

pub(super) fn lay_out(blocks: &[Block], style: &PrintStylesheet, width: f32) -> Layout {
    let mut cursor = Cursor {
        style,
        left: style.page_margin_px,
        right: width - style.page_margin_px,
        y: style.page_margin_px,
        ops: Vec::new(),
    };
    for block in blocks {
        match block {
            Block::Text(text) => cursor.text_block(text),
            Block::Table(table) => cursor.table(table),
            Block::Rule => cursor.rule(),
        }
    }
    Layout {
        height: cursor.y + style.page_margin_px,
        ops: cursor.ops,
    }
}

struct Cursor<'a> {
    style: &'a PrintStylesheet,
    left: f32,
    right: f32,
    y: f32,
    ops: Vec<DrawOp>,
}

impl Cursor<'_> {
    fn text_block(&mut self, block: &TextBlock) {
        let style = self.style;
        let (size, heading) = match block.kind {
            TextKind::Heading(level) => (style.heading_px(level), true),
            _ => (style.base_font_px, false),
        };
        let line_h = size * style.line_height;

        let quote_indent = block.quote_depth as f32 * style.blockquote_indent_px;
        let list_indent = match &block.kind {
            TextKind::ListItem { depth, .. } => *depth as f32 * style.list_indent_px,
            _ => 0.0,
        };
        let left = self.left + quote_indent + list_indent;
        let max_width = (self.right - left).max(size);

        let lines = wrap(&block.spans, style, size, heading, max_width);
        let top = self.y;

        if let TextKind::ListItem { marker, .. } = &block.kind {
            if !marker.is_empty() {
                let marker_w = style.text_width(marker, size, false);
                self.ops.push(DrawOp::Text {
                    x: left - marker_w - MARKER_GAP,
                    baseline: baseline(top, line_h, size),
                    size,
                    face: FontFace::Regular,
                    text: marker.clone(),
                });
            }
        }

        let height = emit_lines(&mut self.ops, &lines, left, max_width, block.align, top, size, line_h);

        for depth in 0..block.quote_depth {
            let x = self.left + depth as f32 * style.blockquote_indent_px + style.blockquote_bar_px / 2.0;
            self.ops.push(DrawOp::Line {
                x1: x,
                y1: top,
                x2: x,
                y2: top + height,
                width: style.blockquote_bar_px,
            });
        }

        self.y = top + height + size * style.block_spacing_em;
    }

    fn table(&mut self, table: &Table) {
        let style = self.style;
        let columns = table.columns().max(1);
        let col_w = (self.right - self.left) / columns as f32;
        let size = style.base_font_px;
        let line_h = size * style.line_height;
        let pad = style.cell_padding_px;
        let border = style.table_border_px;

        let table_top = self.y;
        self.horizontal(table_top, border);
        for row in &table.rows {
            let row_top = self.y;
            let mut row_height = line_h + 2.0 * pad;
            for (i, cell) in row.iter().enumerate() {
                let left = self.left + i as f32 * col_w + pad;
                let inner = (col_w - 2.0 * pad).max(size);
                let lines = wrap(&cell.spans, style, size, cell.header, inner);
                let h = emit_lines(&mut self.ops, &lines, left, inner, Align::Left, row_top + pad, size, line_h);
                row_height = row_height.max(h + 2.0 * pad);
            }
            self.y = row_top + row_height;
            self.horizontal(self.y, border);
        }
        for i in 0..=columns {
            let x = self.left + i as f32 * col_w;
            self.ops.push(DrawOp::Line {
                x1: x,
                y1: table_top,
                x2: x,
                y2: self.y,
                width: border,
            });
        }
        self.y += size * style.block_spacing_em;
    }

    fn rule(&mut self) {
        let gap = self.style.base_font_px * self.style.block_spacing_em;
        self.y += gap / 2.0;
        self.horizontal(self.y, self.style.rule_px);
        self.y += gap;
    }

    fn horizontal(&mut self, y: f32, width: f32) {
        self.ops.push(DrawOp::Line {
            x1: self.left,
            y1: y,
            x2: self.right,
            y2: y,
            width,
        });
    }
}

fn baseline(line_top: f32, line_h: f32, size: f32) -> f32 {
    line_top + (line_h - size) / 2.0 + size * ASCENT
}

#[derive(Debug, Default)]
struct Run {
    x: f32,
    width: f32,
    text: String,
    face: Option<FontFace>,
    underline: bool,
}

#[derive(Debug, Default)]
struct Line {
    runs: Vec<Run>,
    width: f32,
}

enum Piece<'a> {
    Word {
        text: &'a str,
        style: TextStyle,
        space_before: bool,
    },
    Break,
}

fn pieces(spans: &[Span]) -> Vec<Piece<'_>> {
    let mut out = Vec::new();
    let mut pending_space = false;
    for span in spans {
        for (i, segment) in span.text.split('\n').enumerate() {
            if i > 0 {
                out.push(Piece::Break);
                pending_space = false;
            }
            for (j, word) in segment.split(' ').enumerate() {
                if j > 0 {
                    pending_space = true;
                }
                if word.is_empty() {
                    continue;
                }
                out.push(Piece::Word {
                    text: word,
                    style: span.style,
                    space_before: pending_space,
                });
                pending_space = false;
            }
        }
    }
    out
}

/// Greedy line breaking at spaces. Words wider than the line overflow.
fn wrap(spans: &[Span], style: &PrintStylesheet, size: f32, bold: bool, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::default();
    for piece in pieces(spans) {
        let (text, span_style, space_before) = match piece {
            Piece::Break => {
                lines.push(mem::take(&mut current));
                continue;
            }
            Piece::Word {
                text,
                style,
                space_before,
            } => (text, style, space_before),
        };

        let mut face = FontFace::from_style(span_style);
        if bold {
            face = face.emboldened();
        }
        let word_w = style.text_width(text, size, face.is_bold());
        let mut space_w = if space_before && !current.runs.is_empty() {
            style.text_width(" ", size, face.is_bold())
        } else {
            0.0
        };
        if space_before && !current.runs.is_empty() && current.width + space_w + word_w > max_width {
            lines.push(mem::take(&mut current));
            space_w = 0.0;
        }

        match current.runs.last_mut() {
            Some(run) if run.face == Some(face) && run.underline == span_style.underline => {
                if space_w > 0.0 {
                    run.text.push(' ');
                }
                run.text.push_str(text);
                run.width += space_w + word_w;
            }
            _ => current.runs.push(Run {
                x: current.width + space_w,
                width: word_w,
                text: text.to_string(),
                face: Some(face),
                underline: span_style.underline,
            }),
        }
        current.width += space_w + word_w;
    }
    lines.push(current);
    lines
}

#[allow(clippy::too_many_arguments)]
fn emit_lines(
    ops: &mut Vec<DrawOp>,
    lines: &[Line],
    left: f32,
    max_width: f32,
    align: Align,
    top: f32,
    size: f32,
    line_h: f32,
) -> f32 {
    for (i, line) in lines.iter().enumerate() {
        let slack = (max_width - line.width).max(0.0);
        let offset = match align {
            Align::Left => 0.0,
            Align::Center => slack / 2.0,
            Align::Right => slack,
        };
        let base = baseline(top + i as f32 * line_h, line_h, size);
        for run in &line.runs {
            let x = left + offset + run.x;
            ops.push(DrawOp::Text {
                x,
                baseline: base,
                size,
                face: run.face.unwrap_or(FontFace::Regular),
                text: run.text.clone(),
            });
            if run.underline {
                let y = base + size * UNDERLINE_OFFSET;
                ops.push(DrawOp::Line {
                    x1: x,
                    y1: y,
                    x2: x + run.width,
                    y2: y,
                    width: size * UNDERLINE_WIDTH,
                });
            }
        }
    }
    lines.len() as f32 * line_h
}
