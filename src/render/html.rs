//! Sanitizing and parsing of contract HTML into printable blocks.
//!
//! Contract content comes from a rich-text editor, so the accepted markup is
//! the small set such editors emit: paragraphs, headings, lists, quotes,
//! tables, rules and inline bold/italic/underline. Unknown tags are ignored
//! and their text kept.

use std::collections::HashSet;
use std::sync::OnceLock;

use ammonia::Builder;
use scraper::{ElementRef, Html, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextKind {
    Paragraph,
    Heading(u8),
    /// `marker` is empty for continuation paragraphs of the same item
    ListItem { marker: String, depth: u8 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub kind: TextKind,
    pub spans: Vec<Span>,
    pub quote_depth: u8,
    pub align: Align,
}

impl TextBlock {
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub spans: Vec<Span>,
    pub header: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub rows: Vec<Vec<TableCell>>,
}

impl Table {
    pub fn columns(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Table(Table),
    Rule,
}

fn cleaner() -> &'static Builder<'static> {
    static CLEANER: OnceLock<Builder<'static>> = OnceLock::new();
    CLEANER.get_or_init(|| {
        let mut cleaner = Builder::default();
        cleaner.add_tags(&[
            "p", "div", "section", "article", "header", "footer", "span", "br", "hr", "h1", "h2",
            "h3", "h4", "h5", "h6", "b", "strong", "i", "em", "u", "ins", "ul", "ol", "li",
            "blockquote", "table", "thead", "tbody", "tfoot", "tr", "td", "th",
        ]);
        cleaner.add_clean_content_tags(&["noscript", "iframe", "object", "embed"]);
        cleaner.add_generic_attributes(&["style", "align"]);
        cleaner.add_tag_attributes("ol", &["start"]);
        cleaner.filter_style_properties(HashSet::from(["text-align"]));
        cleaner.url_schemes(HashSet::from(["http", "https", "mailto"]));
        cleaner
    })
}

/// Strip active content from untrusted HTML.
///
/// Comments, script-like elements with their bodies, event handlers and
/// non-web URLs are removed. Layout attributes other than alignment are
/// dropped.
pub fn sanitize(html: &str) -> String {
    cleaner().clean(html).to_string()
}

/// Parse sanitized HTML into blocks in document order.
pub fn parse(html: &str) -> Vec<Block> {
    let fragment = Html::parse_fragment(html);
    let mut parser = Parser::default();
    parser.children(fragment.root_element());
    parser.finish()
}

fn align_of(element: ElementRef<'_>) -> Align {
    let from_style = element.value().attr("style").and_then(|style| {
        style.split(';').find_map(|decl| {
            let (property, value) = decl.split_once(':')?;
            property
                .trim()
                .eq_ignore_ascii_case("text-align")
                .then(|| value.trim().to_ascii_lowercase())
        })
    });
    let value = from_style.or_else(|| element.value().attr("align").map(|a| a.trim().to_ascii_lowercase()));
    match value.as_deref() {
        Some("center") => Align::Center,
        Some("right") => Align::Right,
        _ => Align::Left,
    }
}

fn child_elements(element: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Rows of `table`, without descending into nested tables.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|r| r.value().name() == "tr"))
            }
            _ => {}
        }
    }
    rows
}

fn row_cells(row: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    child_elements(row).filter(|c| matches!(c.value().name(), "td" | "th"))
}

struct ListState {
    ordered: bool,
    next: u32,
}

#[derive(Default)]
struct Parser {
    blocks: Vec<Block>,
    current: Option<TextBlock>,
    style: TextStyle,
    lists: Vec<ListState>,
    in_item: bool,
    quote_depth: u8,
    /// Spans of the table cell being filled, if any
    cell: Option<Vec<Span>>,
}

impl Parser {
    fn children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let saved = self.style;
        match element.value().name() {
            "b" | "strong" => {
                self.style.bold = true;
                self.children(element);
            }
            "i" | "em" => {
                self.style.italic = true;
                self.children(element);
            }
            "u" | "ins" => {
                self.style.underline = true;
                self.children(element);
            }
            "br" => self.line_break(),
            "hr" => {
                if self.cell.is_some() {
                    self.line_break();
                } else {
                    self.flush();
                    self.blocks.push(Block::Rule);
                }
            }
            "table" => self.table(element),
            "ul" => self.list(element, false),
            "ol" => self.list(element, true),
            "li" => self.list_item(element),
            "blockquote" => self.blockquote(element),
            "p" | "div" | "section" | "article" | "header" | "footer" => {
                self.block(element, TextKind::Paragraph)
            }
            name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
                let level = name[1..].parse().unwrap_or(1);
                self.block(element, TextKind::Heading(level));
            }
            _ => self.children(element),
        }
        self.style = saved;
    }

    fn block(&mut self, element: ElementRef<'_>, kind: TextKind) {
        if self.cell.is_some() {
            self.cell_break();
            return self.children(element);
        }
        if self.in_item {
            // Editors wrap list item text in <p>; only later paragraphs start a new line
            if !matches!(&self.current, Some(block) if block.spans.is_empty()) {
                self.start(self.continuation(), align_of(element));
            }
            return self.children(element);
        }
        self.start(kind, align_of(element));
        self.children(element);
        self.flush();
    }

    fn list(&mut self, element: ElementRef<'_>, ordered: bool) {
        if self.cell.is_some() {
            self.cell_break();
            return self.children(element);
        }
        self.flush();
        let next = element
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        self.lists.push(ListState { ordered, next });
        let in_item = std::mem::replace(&mut self.in_item, false);
        self.children(element);
        self.flush();
        self.in_item = in_item;
        self.lists.pop();
    }

    fn list_item(&mut self, element: ElementRef<'_>) {
        if self.cell.is_some() {
            self.cell_break();
            return self.children(element);
        }
        let marker = match self.lists.last_mut() {
            Some(list) if list.ordered => {
                let marker = format!("{}.", list.next);
                list.next += 1;
                marker
            }
            _ => "•".to_string(),
        };
        self.start(
            TextKind::ListItem {
                marker,
                depth: self.list_depth(),
            },
            align_of(element),
        );
        let in_item = std::mem::replace(&mut self.in_item, true);
        self.children(element);
        self.flush();
        self.in_item = in_item;
    }

    fn blockquote(&mut self, element: ElementRef<'_>) {
        if self.cell.is_some() {
            self.cell_break();
            return self.children(element);
        }
        self.flush();
        self.quote_depth = self.quote_depth.saturating_add(1);
        self.children(element);
        self.flush();
        self.quote_depth = self.quote_depth.saturating_sub(1);
    }

    fn table(&mut self, element: ElementRef<'_>) {
        if self.cell.is_some() {
            return self.inline_table(element);
        }
        self.flush();
        let mut table = Table::default();
        for row in table_rows(element) {
            let mut cells = Vec::new();
            for cell in row_cells(row) {
                self.cell = Some(Vec::new());
                self.children(cell);
                let mut spans = self.cell.take().unwrap_or_default();
                trim_spans(&mut spans);
                cells.push(TableCell {
                    spans,
                    header: cell.value().name() == "th",
                });
            }
            if !cells.is_empty() {
                table.rows.push(cells);
            }
        }
        if !table.rows.is_empty() {
            self.blocks.push(Block::Table(table));
        }
    }

    /// A table nested in a cell is written into that cell, one line per row.
    fn inline_table(&mut self, element: ElementRef<'_>) {
        for row in table_rows(element) {
            self.cell_break();
            for (i, cell) in row_cells(row).enumerate() {
                if i > 0 {
                    self.text(" ");
                }
                self.children(cell);
            }
        }
    }

    fn list_depth(&self) -> u8 {
        self.lists.len().clamp(1, u8::MAX as usize) as u8
    }

    fn continuation(&self) -> TextKind {
        TextKind::ListItem {
            marker: String::new(),
            depth: self.list_depth(),
        }
    }

    fn start(&mut self, kind: TextKind, align: Align) {
        self.flush();
        self.current = Some(TextBlock {
            kind,
            spans: Vec::new(),
            quote_depth: self.quote_depth,
            align,
        });
    }

    fn flush(&mut self) {
        if let Some(mut block) = self.current.take() {
            trim_spans(&mut block.spans);
            if !block.spans.is_empty() {
                self.blocks.push(Block::Text(block));
            }
        }
    }

    fn cell_break(&mut self) {
        let style = self.style;
        if let Some(spans) = &mut self.cell {
            if !spans.is_empty() {
                push_raw(spans, "\n", style);
            }
        }
    }

    fn line_break(&mut self) {
        let style = self.style;
        if let Some(spans) = &mut self.cell {
            push_raw(spans, "\n", style);
            return;
        }
        if self.current.is_none() {
            let kind = if self.in_item { self.continuation() } else { TextKind::Paragraph };
            self.start(kind, Align::Left);
        }
        if let Some(block) = &mut self.current {
            push_raw(&mut block.spans, "\n", style);
        }
    }

    fn text(&mut self, raw: &str) {
        let text = collapse_whitespace(raw);
        if text.is_empty() {
            return;
        }
        let style = self.style;
        if let Some(spans) = &mut self.cell {
            push_text(spans, &text, style);
            return;
        }
        if self.current.is_none() {
            if text.trim().is_empty() {
                return;
            }
            let kind = if self.in_item { self.continuation() } else { TextKind::Paragraph };
            self.start(kind, Align::Left);
        }
        if let Some(block) = &mut self.current {
            push_text(&mut block.spans, &text, style);
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn at_line_start(spans: &[Span]) -> bool {
    spans
        .last()
        .map_or(true, |s| s.text.ends_with(' ') || s.text.ends_with('\n'))
}

fn push_text(spans: &mut Vec<Span>, text: &str, style: TextStyle) {
    let text = if at_line_start(spans) {
        text.trim_start_matches(' ')
    } else {
        text
    };
    if !text.is_empty() {
        push_raw(spans, text, style);
    }
}

fn push_raw(spans: &mut Vec<Span>, text: &str, style: TextStyle) {
    match spans.last_mut() {
        Some(last) if last.style == style => last.text.push_str(text),
        _ => spans.push(Span {
            text: text.to_string(),
            style,
        }),
    }
}

fn trim_spans(spans: &mut Vec<Span>) {
    while let Some(last) = spans.last_mut() {
        let trimmed = last.text.trim_end_matches(|c: char| c == ' ' || c == '\n').len();
        last.text.truncate(trimmed);
        if last.text.is_empty() {
            spans.pop();
        } else {
            break;
        }
    }
    while spans.first().is_some_and(|s| s.text.trim_start_matches('\n').is_empty()) {
        spans.remove(0);
    }
    if let Some(first) = spans.first_mut() {
        first.text = first.text.trim_start_matches('\n').to_string();
    }
    if spans.iter().all(|s| s.text.trim().is_empty()) {
        spans.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_blocks(blocks: &[Block]) -> Vec<&TextBlock> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_sanitize_strips_active_content() {
        let html = r#"<p onclick="steal()">Olá</p><script>alert(1)</script><!-- nota --><a href="javascript:void(0)">x</a><style>p{}</style>"#;
        let clean = sanitize(html);
        assert!(!clean.contains("onclick"));
        assert!(!clean.contains("alert"));
        assert!(!clean.contains("nota"));
        assert!(!clean.contains("javascript"));
        assert!(!clean.contains("p{}"));
        assert!(clean.contains("<p>Olá</p>"));
    }

    #[test]
    fn test_sanitize_unclosed_script() {
        let clean = sanitize("<p>a</p><script src=x>");
        assert_eq!(clean, "<p>a</p>");
    }

    #[test]
    fn test_sanitize_handler_without_space_and_encoded_url() {
        let html = r#"<p title='x'onclick="steal()">a</p><a href="&#106;avascript:alert(1)">b</a>"#;
        let clean = sanitize(html);
        assert!(!clean.contains("onclick"));
        assert!(!clean.contains("steal"));
        assert!(!clean.contains("avascript"));
        assert!(!clean.contains("href"));
        assert!(clean.contains(">a</p>"));
    }

    #[test]
    fn test_sanitize_keeps_alignment_only() {
        let clean = sanitize(r#"<p style="text-align: right; position: fixed" class="x">a</p>"#);
        assert!(clean.contains("text-align"));
        assert!(!clean.contains("position"));
        assert!(!clean.contains("class"));
    }

    #[test]
    fn test_attribute_value_with_angle_bracket() {
        let blocks = parse(r#"<p data-note="a>b">Cláusula primeira</p>"#);
        assert_eq!(blocks.len(), 1);
        assert_eq!(text_blocks(&blocks)[0].plain_text(), "Cláusula primeira");

        let blocks = parse(&sanitize(r#"<p data-note="a>b">Cláusula primeira</p>"#));
        assert_eq!(text_blocks(&blocks)[0].plain_text(), "Cláusula primeira");
    }

    #[test]
    fn test_nested_table_keeps_outer_grid() {
        let blocks = parse(
            "<table><tr><td><table><tr><td>a</td><td>a2</td></tr><tr><td>a3</td></tr></table></td><td>b</td></tr>\
             <tr><td>c</td><td>d</td></tr></table>",
        );
        assert_eq!(blocks.len(), 1);
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table, got {:?}", blocks[0]);
        };
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.columns(), 2);
        let text = |cell: &TableCell| cell.spans.iter().map(|s| s.text.as_str()).collect::<String>();
        assert_eq!(text(&table.rows[0][0]), "a a2\na3");
        assert_eq!(text(&table.rows[0][1]), "b");
        assert_eq!(text(&table.rows[1][0]), "c");
        assert_eq!(text(&table.rows[1][1]), "d");
    }

    #[test]
    fn test_parse_paragraphs_and_headings() {
        let blocks = parse("<h1>Contrato</h1>\n<p>Primeira   cláusula.</p><p>  </p><h3>Do preço</h3>");
        let texts = text_blocks(&blocks);
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[0].kind, TextKind::Heading(1));
        assert_eq!(texts[1].plain_text(), "Primeira cláusula.");
        assert_eq!(texts[2].kind, TextKind::Heading(3));
    }

    #[test]
    fn test_parse_inline_styles() {
        let blocks = parse("<p>O <strong>VENDEDOR</strong> e a <em><u>COMPRADORA</u></em></p>");
        let block = text_blocks(&blocks)[0];
        assert_eq!(block.spans.len(), 4);
        assert!(block.spans[1].style.bold);
        assert_eq!(block.spans[1].text, "VENDEDOR");
        assert!(block.spans[3].style.italic && block.spans[3].style.underline);
    }

    #[test]
    fn test_parse_lists() {
        let blocks = parse("<ol start=\"3\"><li><p>um</p></li><li>dois<ul><li>sub</li></ul></li></ol>");
        let texts = text_blocks(&blocks);
        assert_eq!(texts.len(), 3);
        assert_eq!(
            texts[0].kind,
            TextKind::ListItem { marker: "3.".into(), depth: 1 }
        );
        assert_eq!(texts[0].plain_text(), "um");
        assert_eq!(
            texts[1].kind,
            TextKind::ListItem { marker: "4.".into(), depth: 1 }
        );
        assert_eq!(
            texts[2].kind,
            TextKind::ListItem { marker: "•".into(), depth: 2 }
        );
    }

    #[test]
    fn test_parse_blockquote_and_align() {
        let blocks = parse(r#"<blockquote><p style="text-align: center">citação</p></blockquote><p>fora</p>"#);
        let texts = text_blocks(&blocks);
        assert_eq!(texts[0].quote_depth, 1);
        assert_eq!(texts[0].align, Align::Center);
        assert_eq!(texts[1].quote_depth, 0);
        assert_eq!(texts[1].align, Align::Left);
    }

    #[test]
    fn test_parse_table_and_rule() {
        let blocks = parse(
            "<table><tr><th>Parte</th><th>CPF</th></tr><tr><td><p>Ana</p></td><td>123</td></tr></table><hr>",
        );
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::Table(table) => {
                assert_eq!(table.rows.len(), 2);
                assert_eq!(table.columns(), 2);
                assert!(table.rows[0][0].header);
                assert_eq!(table.rows[1][0].spans[0].text, "Ana");
            }
            other => panic!("expected table, got {:?}", other),
        }
        assert_eq!(blocks[1], Block::Rule);
    }

    #[test]
    fn test_line_breaks_and_entities() {
        let blocks = parse("<p>Linha&nbsp;1<br>Linha 2 &amp; 3 &#186; &desconhecido;</p>");
        let text = text_blocks(&blocks)[0].plain_text();
        assert_eq!(text, "Linha\u{a0}1\nLinha 2 & 3 º &desconhecido;");
    }

    #[test]
    fn test_bare_text_becomes_paragraph() {
        let blocks = parse("texto solto");
        assert_eq!(text_blocks(&blocks)[0].plain_text(), "texto solto");
        assert!(parse("").is_empty());
    }
}
