use super::FontFamily;

/// Fixed print stylesheet applied to every rendered contract.
///
/// All lengths are CSS pixels at scale 1. Nothing here depends on the viewer,
/// so the same content always produces the same layout.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintStylesheet {
    pub font_family: FontFamily,
    pub base_font_px: f32,
    pub line_height: f32,
    /// Multipliers of the base size for h1..h6
    pub heading_scale: [f32; 6],
    pub page_margin_px: f32,
    /// Space after a block, in ems of that block's font size
    pub block_spacing_em: f32,
    pub list_indent_px: f32,
    pub blockquote_indent_px: f32,
    pub blockquote_bar_px: f32,
    pub table_border_px: f32,
    pub cell_padding_px: f32,
    pub rule_px: f32,
}

impl PrintStylesheet {
    pub fn new(font_family: FontFamily) -> Self {
        Self {
            font_family,
            base_font_px: 16.0,
            line_height: 1.5,
            heading_scale: [2.0, 1.5, 1.17, 1.0, 0.83, 0.67],
            page_margin_px: 56.0,
            block_spacing_em: 0.75,
            list_indent_px: 28.0,
            blockquote_indent_px: 24.0,
            blockquote_bar_px: 3.0,
            table_border_px: 1.0,
            cell_padding_px: 6.0,
            rule_px: 1.0,
        }
    }

    /// Font size of a heading level (1-6)
    pub fn heading_px(&self, level: u8) -> f32 {
        let index = level.clamp(1, 6) as usize - 1;
        self.base_font_px * self.heading_scale[index]
    }

    /// Advance width of `text` at `size` px.
    pub fn text_width(&self, text: &str, size: f32, bold: bool) -> f32 {
        let em: f32 = text
            .chars()
            .map(|c| char_advance(c, self.font_family))
            .sum();
        let weight = if bold { 1.06 } else { 1.0 };
        em * size * weight
    }
}

/// Approximate advance of a character in ems for the standard PDF fonts.
fn char_advance(c: char, family: FontFamily) -> f32 {
    let base = match c {
        ' ' | '\u{a0}' => 0.25,
        'i' | 'j' | 'l' | '.' | ',' | ';' | ':' | '\'' | '|' | '!' | 'í' | 'ì' => 0.28,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.85,
        '—' => 1.0,
        c if c.is_ascii_digit() => 0.5,
        c if c.is_uppercase() => 0.68,
        _ => 0.5,
    };
    match family {
        FontFamily::Serif => base,
        FontFamily::Sans => base * 1.08,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_sizes() {
        let style = PrintStylesheet::new(FontFamily::Serif);
        assert_eq!(style.heading_px(1), 32.0);
        assert_eq!(style.heading_px(4), 16.0);
        assert_eq!(style.heading_px(9), style.heading_px(6));
    }

    #[test]
    fn test_text_width_grows_with_size_and_weight() {
        let style = PrintStylesheet::new(FontFamily::Serif);
        let regular = style.text_width("Contrato", 16.0, false);
        assert!(style.text_width("Contrato", 32.0, false) > regular);
        assert!(style.text_width("Contrato", 16.0, true) > regular);
        assert_eq!(style.text_width("", 16.0, false), 0.0);
    }

    #[test]
    fn test_sans_is_wider() {
        let serif = PrintStylesheet::new(FontFamily::Serif);
        let sans = PrintStylesheet::new(FontFamily::Sans);
        assert!(sans.text_width("abc", 16.0, false) > serif.text_width("abc", 16.0, false));
    }
}
