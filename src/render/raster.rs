use crate::error::RenderError;

use super::html::TextStyle;
use super::layout;
use super::{FontFamily, Surface};

/// Tallest raster the pipeline accepts, in device pixels.
pub const MAX_RASTER_HEIGHT: u32 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontFace {
    pub const ALL: [FontFace; 4] = [
        FontFace::Regular,
        FontFace::Bold,
        FontFace::Italic,
        FontFace::BoldItalic,
    ];

    pub fn from_style(style: TextStyle) -> Self {
        match (style.bold, style.italic) {
            (false, false) => FontFace::Regular,
            (true, false) => FontFace::Bold,
            (false, true) => FontFace::Italic,
            (true, true) => FontFace::BoldItalic,
        }
    }

    pub fn is_bold(&self) -> bool {
        matches!(self, FontFace::Bold | FontFace::BoldItalic)
    }

    pub fn emboldened(self) -> Self {
        match self {
            FontFace::Regular | FontFace::Bold => FontFace::Bold,
            FontFace::Italic | FontFace::BoldItalic => FontFace::BoldItalic,
        }
    }
}

/// One drawing instruction in raster coordinates (origin top-left, y down).
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        x: f32,
        baseline: f32,
        size: f32,
        face: FontFace,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    },
}

impl DrawOp {
    /// Vertical extent as (top, bottom).
    pub fn extent(&self) -> (f32, f32) {
        match self {
            DrawOp::Text { baseline, size, .. } => (baseline - size, baseline + size * 0.25),
            DrawOp::Line { y1, y2, width, .. } => {
                let half = width / 2.0;
                (y1.min(*y2) - half, y1.max(*y2) + half)
            }
        }
    }

    fn scaled(self, s: f32) -> DrawOp {
        match self {
            DrawOp::Text {
                x,
                baseline,
                size,
                face,
                text,
            } => DrawOp::Text {
                x: x * s,
                baseline: baseline * s,
                size: size * s,
                face,
                text,
            },
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
            } => DrawOp::Line {
                x1: x1 * s,
                y1: y1 * s,
                x2: x2 * s,
                y2: y2 * s,
                width: width * s,
            },
        }
    }
}

/// The whole document as one tall display list, one page wide.
///
/// Coordinates are raster pixels, `scale` per CSS pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub family: FontFamily,
    pub ops: Vec<DrawOp>,
}

pub trait Rasterizer {
    fn rasterize(&self, surface: &Surface, scale: u32) -> Result<Raster, RenderError>;
}

/// Rasterizer that lays the surface's blocks out with its print stylesheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutRasterizer;

impl Rasterizer for LayoutRasterizer {
    fn rasterize(&self, surface: &Surface, scale: u32) -> Result<Raster, RenderError> {
        if scale == 0 {
            return Err(RenderError::Rasterization(
                "scale must be at least 1".to_string(),
            ));
        }
        let stylesheet = surface.stylesheet();
        let laid_out = layout::lay_out(surface.blocks(), stylesheet, surface.width_px());

        let s = scale as f32;
        let width = (surface.width_px() * s).ceil() as u32;
        let height = (laid_out.height * s).ceil().max(1.0);
        if height > MAX_RASTER_HEIGHT as f32 {
            return Err(RenderError::Rasterization(format!(
                "document is {} px tall, limit is {}",
                height, MAX_RASTER_HEIGHT
            )));
        }

        Ok(Raster {
            width,
            height: height as u32,
            scale,
            family: stylesheet.font_family,
            ops: laid_out.ops.into_iter().map(|op| op.scaled(s)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{PageSize, PrintStylesheet, SurfaceHost};

    fn rasterize(html: &str, scale: u32) -> Result<Raster, RenderError> {
        let host = SurfaceHost::new(1);
        let mut surface = host.acquire(PageSize::A4, PrintStylesheet::new(FontFamily::Sans))?;
        surface.inject(html);
        LayoutRasterizer.rasterize(&surface, scale)
    }

    #[test]
    fn test_scale_multiplies_dimensions() {
        let one = rasterize("<p>Cláusula primeira</p>", 1).unwrap();
        let two = rasterize("<p>Cláusula primeira</p>", 2).unwrap();
        assert_eq!(two.width, 1587);
        assert!(two.height >= one.height * 2 - 1);
        assert_eq!(two.family, FontFamily::Sans);
        match (&one.ops[0], &two.ops[0]) {
            (DrawOp::Text { size: a, .. }, DrawOp::Text { size: b, .. }) => assert_eq!(*b, a * 2.0),
            other => panic!("expected text ops, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_scale_is_rejected() {
        let err = rasterize("<p>x</p>", 0).unwrap_err();
        assert!(matches!(err, RenderError::Rasterization(_)));
    }

    #[test]
    fn test_empty_document_still_has_height() {
        let raster = rasterize("", 2).unwrap();
        assert!(raster.height > 0);
        assert!(raster.ops.is_empty());
    }

    #[test]
    fn test_face_from_style() {
        let style = TextStyle {
            bold: true,
            italic: true,
            underline: false,
        };
        assert_eq!(FontFace::from_style(style), FontFace::BoldItalic);
        assert_eq!(FontFace::Italic.emboldened(), FontFace::BoldItalic);
        assert!(!FontFace::Regular.is_bold());
    }

    #[test]
    fn test_line_extent() {
        let op = DrawOp::Line {
            x1: 0.0,
            y1: 10.0,
            x2: 5.0,
            y2: 20.0,
            width: 2.0,
        };
        assert_eq!(op.extent(), (9.0, 21.0));
    }
}
