use crate::libs::color::{Rgb, RgbaMatrix};
use crate::libs::error::LiveMapError;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use std::path::Path;
use std::sync::Arc;

pub type Frame = RgbaImage;

/// A presentation target. Its pixel size is set independently of whatever
/// matrix gets drawn into it; the displayed frame is replaced whole.
#[derive(Debug, Clone, Default)]
pub struct DisplaySurface {
    width: u32,
    height: u32,
    frame: Option<Arc<Frame>>,
    swaps: u64,
}

impl DisplaySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame: None,
            swaps: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// The frame on display. Holders keep their copy even after a swap.
    pub fn snapshot(&self) -> Option<Arc<Frame>> {
        self.frame.clone()
    }

    /// Number of frame swaps so far, clears included
    pub fn swaps(&self) -> u64 {
        self.swaps
    }

    /// Replaces the displayed frame in one step; `None` clears it.
    pub fn transfer_from_bitmap(&mut self, frame: Option<Frame>) {
        self.frame = frame.map(Arc::new);
        self.swaps += 1;
    }

    /// Shows a background-only frame at the surface size.
    pub fn clear_to(&mut self, background: Rgb) {
        if self.width == 0 || self.height == 0 {
            self.transfer_from_bitmap(None);
            return;
        }
        let fill = Rgba([background.r, background.g, background.b, 255]);
        self.transfer_from_bitmap(Some(RgbaImage::from_pixel(
            self.width,
            self.height,
            fill,
        )));
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let Some(frame) = &self.frame else {
            anyhow::bail!("Nothing to save, the surface holds no frame");
        };
        frame.save(path.as_ref())?;
        Ok(())
    }
}

/// Draws a square RGBA matrix onto `surface`.
///
/// Equal sizes move the buffer straight in. Otherwise the matrix is rasterized
/// at its own resolution and resampled nearest-neighbor to the surface size.
/// A surface with a zero dimension is left untouched.
pub fn present(rgba: &RgbaMatrix, surface: &mut DisplaySurface) -> Result<(), LiveMapError> {
    let (width, height) = (surface.width(), surface.height());
    if width == 0 || height == 0 {
        return Err(LiveMapError::Presentation { width, height });
    }

    let side = rgba.side() as u32;
    let source = RgbaImage::from_raw(side, side, rgba.as_bytes().to_vec())
        .filter(|_| side > 0)
        .ok_or(LiveMapError::Presentation {
            width: side,
            height: side,
        })?;

    let frame = if side == width && side == height {
        source
    } else {
        imageops::resize(&source, width, height, FilterType::Nearest)
    };
    log::debug!(
        "Presenting {}x{} matrix on {}x{} surface",
        side,
        side,
        width,
        height
    );
    surface.transfer_from_bitmap(Some(frame));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::color::{paint, ContactColorScale};

    fn uniform(side: usize, color: Rgb) -> RgbaMatrix {
        let scale = ContactColorScale::new(1.0, color);
        paint(&vec![1.0; side * side], side, &scale, Rgb::SNOW)
    }

    #[test]
    fn test_direct_transfer() {
        let rgba = uniform(4, Rgb::RED);
        let mut surface = DisplaySurface::new(4, 4);
        present(&rgba, &mut surface).unwrap();

        let frame = surface.snapshot().unwrap();
        assert_eq!(frame.as_raw().as_slice(), rgba.as_bytes());
    }

    #[test]
    fn test_uniform_resample() {
        let color = Rgb::new(12, 200, 7);
        let rgba = uniform(5, color);
        for (w, h) in [(1, 1), (3, 7), (5, 13), (64, 10), (101, 101)] {
            let mut surface = DisplaySurface::new(w, h);
            present(&rgba, &mut surface).unwrap();
            let frame = surface.snapshot().unwrap();
            assert_eq!(frame.dimensions(), (w, h));
            assert!(frame.pixels().all(|p| *p == Rgba([12, 200, 7, 255])));
        }
    }

    #[test]
    fn test_nearest_blocks() {
        // 2x2 checker scaled to 4x4 keeps hard edges
        let mut source = RgbaImage::new(2, 2);
        source.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        source.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        source.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        source.put_pixel(1, 1, Rgba([0, 0, 0, 255]));

        let scaled = imageops::resize(&source, 4, 4, FilterType::Nearest);
        assert_eq!(*scaled.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
        assert_eq!(*scaled.get_pixel(2, 1), Rgba([0, 255, 0, 255]));
        assert_eq!(*scaled.get_pixel(1, 2), Rgba([0, 0, 255, 255]));
        assert_eq!(*scaled.get_pixel(3, 3), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_zero_surface_keeps_frame() {
        let mut surface = DisplaySurface::new(3, 3);
        present(&uniform(3, Rgb::RED), &mut surface).unwrap();
        let before = surface.snapshot().unwrap();
        let swaps = surface.swaps();

        surface.set_size(0, 3);
        let err = present(&uniform(3, Rgb::new(0, 0, 255)), &mut surface).unwrap_err();
        assert_eq!(
            err,
            LiveMapError::Presentation {
                width: 0,
                height: 3
            }
        );
        assert!(Arc::ptr_eq(&before, &surface.snapshot().unwrap()));
        assert_eq!(surface.swaps(), swaps);
    }

    #[test]
    fn test_back_to_back_supersedes() {
        let mut surface = DisplaySurface::new(8, 8);
        present(&uniform(2, Rgb::RED), &mut surface).unwrap();
        let held = surface.snapshot().unwrap();
        present(&uniform(4, Rgb::new(0, 0, 255)), &mut surface).unwrap();

        // the earlier holder still sees a complete old frame
        assert!(held.pixels().all(|p| *p == Rgba([255, 0, 0, 255])));
        let now = surface.snapshot().unwrap();
        assert!(now.pixels().all(|p| *p == Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn test_clear() {
        let mut surface = DisplaySurface::new(2, 3);
        surface.clear_to(Rgb::SNOW);
        let frame = surface.snapshot().unwrap();
        assert_eq!(frame.dimensions(), (2, 3));
        assert!(frame.pixels().all(|p| *p == Rgba([255, 255, 255, 255])));
    }
}
