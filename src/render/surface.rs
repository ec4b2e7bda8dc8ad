use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::error::RenderError;

use super::html::{self, Block};
use super::{PageSize, PrintStylesheet};

/// Hands out off-screen rendering surfaces and tracks how many are alive.
#[derive(Debug)]
pub struct SurfaceHost {
    live: Arc<AtomicUsize>,
    max_live: usize,
}

impl SurfaceHost {
    pub fn new(max_live: usize) -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            max_live,
        }
    }

    /// Create a surface one page wide. It is released when dropped.
    pub fn acquire(
        &self,
        page_size: PageSize,
        stylesheet: PrintStylesheet,
    ) -> Result<Surface, RenderError> {
        let (width_px, page_height_px) = page_size.css_pixels();
        if width_px <= 2.0 * stylesheet.page_margin_px {
            return Err(RenderError::SurfaceCreation(format!(
                "page width {}px leaves no room for content",
                width_px
            )));
        }

        let max = self.max_live;
        self.live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .map_err(|n| {
                RenderError::SurfaceCreation(format!(
                    "{} rendering surfaces already in use (limit {})",
                    n, max
                ))
            })?;

        trace!(width_px, page_height_px, "rendering surface acquired");
        Ok(Surface {
            page_size,
            width_px,
            stylesheet,
            blocks: Vec::new(),
            live: Arc::clone(&self.live),
        })
    }

    pub fn live_surfaces(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Off-screen page-wide surface holding the parsed document.
#[derive(Debug)]
pub struct Surface {
    page_size: PageSize,
    width_px: f32,
    stylesheet: PrintStylesheet,
    blocks: Vec<Block>,
    live: Arc<AtomicUsize>,
}

impl Surface {
    /// Sanitize `content` and replace the surface's document with it.
    pub fn inject(&mut self, content: &str) {
        self.blocks = html::parse(&html::sanitize(content));
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn stylesheet(&self) -> &PrintStylesheet {
        &self.stylesheet
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn width_px(&self) -> f32 {
        self.width_px
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        trace!("rendering surface released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FontFamily;

    #[test]
    fn test_acquire_and_release() {
        let host = SurfaceHost::new(2);
        let style = PrintStylesheet::new(FontFamily::Serif);
        {
            let _a = host.acquire(PageSize::A4, style.clone()).unwrap();
            let _b = host.acquire(PageSize::A4, style.clone()).unwrap();
            assert_eq!(host.live_surfaces(), 2);
            let third = host.acquire(PageSize::A4, style.clone());
            assert!(matches!(third, Err(RenderError::SurfaceCreation(_))));
        }
        assert_eq!(host.live_surfaces(), 0);
        assert!(host.acquire(PageSize::A4, style).is_ok());
    }

    #[test]
    fn test_inject_replaces_document() {
        let host = SurfaceHost::new(1);
        let mut surface = host
            .acquire(PageSize::A4, PrintStylesheet::new(FontFamily::Serif))
            .unwrap();
        surface.inject("<p>um</p><p>dois</p>");
        assert_eq!(surface.blocks().len(), 2);
        surface.inject("<p>três</p>");
        assert_eq!(surface.blocks().len(), 1);
    }
}
