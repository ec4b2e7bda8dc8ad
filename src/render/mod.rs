//! Document rendering pipeline: contract HTML in, multi-page PDF out.
//!
//! The content is injected into an off-screen [`Surface`] sized to one page
//! width, laid out into one tall [`Raster`] display list on a grid of
//! `scale` pixels per CSS pixel, then sliced into page-height bands, one
//! band per PDF page. Bands are cut at fixed heights, so a line of text may
//! straddle two pages.
//!
//! Glyphs and rules reach the PDF as vector operators. The scale only sets
//! how finely the raster grid, and therefore the band cuts, are resolved.

mod html;
mod layout;
mod pdf;
mod raster;
mod stylesheet;
mod surface;

pub use html::{parse, sanitize, Align, Block, Span, Table, TableCell, TextBlock, TextKind, TextStyle};
pub use pdf::{assemble, page_bands};
pub use raster::{DrawOp, FontFace, LayoutRasterizer, Raster, Rasterizer};
pub use stylesheet::PrintStylesheet;
pub use surface::{Surface, SurfaceHost};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RenderConfig;
use crate::error::RenderError;

/// CSS pixels per inch used to size the rendering surface.
pub const CSS_DPI: f32 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    /// Page size in PDF points (1/72 inch)
    pub fn points(&self) -> (u32, u32) {
        match self {
            PageSize::A4 => (595, 842),
            PageSize::Letter => (612, 792),
        }
    }

    /// Page size in CSS pixels
    pub fn css_pixels(&self) -> (f32, f32) {
        let (w, h) = self.points();
        (w as f32 * CSS_DPI / 72.0, h as f32 * CSS_DPI / 72.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Serif,
    Sans,
}

/// Turns contract content into a printable document.
pub trait DocumentRenderer {
    fn render(&self, content: &str) -> Result<Vec<u8>, RenderError>;
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub page_size: PageSize,
    pub scale: u32,
    pub font_family: FontFamily,
    pub max_live_surfaces: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderConfig::default().into()
    }
}

impl From<RenderConfig> for RenderOptions {
    fn from(config: RenderConfig) -> Self {
        Self {
            page_size: config.page_size,
            scale: config.scale,
            font_family: config.font_family,
            max_live_surfaces: config.max_live_surfaces,
        }
    }
}

/// HTML to PDF renderer built from a surface host and a rasterizer.
pub struct Renderer<R = LayoutRasterizer> {
    host: SurfaceHost,
    rasterizer: R,
    options: RenderOptions,
}

impl Renderer<LayoutRasterizer> {
    pub fn new(options: RenderOptions) -> Self {
        Self::with_rasterizer(options, LayoutRasterizer)
    }
}

impl<R: Rasterizer> Renderer<R> {
    pub fn with_rasterizer(options: RenderOptions, rasterizer: R) -> Self {
        Self {
            host: SurfaceHost::new(options.max_live_surfaces),
            rasterizer,
            options,
        }
    }

    pub fn host(&self) -> &SurfaceHost {
        &self.host
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }
}

impl<R: Rasterizer> DocumentRenderer for Renderer<R> {
    fn render(&self, content: &str) -> Result<Vec<u8>, RenderError> {
        let stylesheet = PrintStylesheet::new(self.options.font_family);
        // Released on drop, whichever step below fails
        let mut surface = self.host.acquire(self.options.page_size, stylesheet)?;
        surface.inject(content);

        let raster = self.rasterizer.rasterize(&surface, self.options.scale)?;
        debug!(
            width = raster.width,
            height = raster.height,
            ops = raster.ops.len(),
            "content rasterized"
        );

        let pdf = assemble(&raster, self.options.page_size)?;
        debug!(bytes = pdf.len(), "pdf assembled");
        Ok(pdf)
    }
}
