//! [`TileSurface`] backends.

use super::tile_canvas::{
    CellGeometry, ImageSource, SurfaceError, TileBackground, TileBuffer, TileSurface,
};
use image::{ImageFormat, RgbaImage, imageops};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurfaceCall {
    CreateGrid {
        width: u32,
        height: u32,
        cells: usize,
    },
    SetTileImage {
        row: u32,
        col: u32,
        buffer: TileBuffer,
        background: TileBackground,
    },
    SwapBuffer {
        row: u32,
        col: u32,
        buffer: TileBuffer,
        z_index: u32,
    },
    Reposition {
        dx: i32,
        dy: i32,
    },
    LoadImage {
        url: String,
        generation: u64,
        bytes: usize,
    },
}

/// Records every rendering call. Clones share one log.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: SurfaceCall) {
        self.calls.lock().push(call);
    }
}

impl TileSurface for RecordingSurface {
    fn create_grid(
        &mut self,
        width: u32,
        height: u32,
        cells: &[CellGeometry],
    ) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::CreateGrid {
            width,
            height,
            cells: cells.len(),
        });
        Ok(())
    }

    fn set_tile_image(
        &mut self,
        cell: &CellGeometry,
        buffer: TileBuffer,
        background: &TileBackground,
    ) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::SetTileImage {
            row: cell.row,
            col: cell.col,
            buffer,
            background: background.clone(),
        });
        Ok(())
    }

    fn swap_buffer(
        &mut self,
        cell: &CellGeometry,
        buffer: TileBuffer,
        z_index: u32,
    ) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::SwapBuffer {
            row: cell.row,
            col: cell.col,
            buffer,
            z_index,
        });
        Ok(())
    }

    fn reposition(&mut self, dx: i32, dy: i32) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::Reposition { dx, dy });
        Ok(())
    }

    fn load_image(&mut self, source: &ImageSource, bytes: &[u8]) -> Result<(), SurfaceError> {
        self.record(SurfaceCall::LoadImage {
            url: source.url.clone(),
            generation: source.generation,
            bytes: bytes.len(),
        });
        Ok(())
    }
}

#[derive(Default)]
struct CellBuffers {
    pixels: [Option<RgbaImage>; 2],
    z_index: [u32; 2],
}

impl CellBuffers {
    fn top(&self) -> Option<&RgbaImage> {
        let top = if self.z_index[1] > self.z_index[0] { 1 } else { 0 };
        self.pixels[top].as_ref()
    }
}

struct Framebuffer {
    image: RgbaImage,
    sheet: Option<(u64, RgbaImage)>,
    cells: HashMap<(u32, u32), CellBuffers>,
    origin: (i32, i32),
}

/// Off-screen compositor: decodes sprite sheets, keeps both buffers of every
/// cell and blits the topmost one into an RGBA framebuffer.
#[derive(Clone)]
pub struct FramebufferSurface {
    inner: Arc<Mutex<Framebuffer>>,
}

impl FramebufferSurface {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Framebuffer {
                image: RgbaImage::new(0, 0),
                sheet: None,
                cells: HashMap::new(),
                origin: (0, 0),
            })),
        }
    }

    pub fn snapshot(&self) -> RgbaImage {
        self.inner.lock().image.clone()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.lock().image.dimensions()
    }

    /// Offset of the grid inside the host window.
    pub fn origin(&self) -> (i32, i32) {
        self.inner.lock().origin
    }

    pub fn save_png(&self, path: &Path) -> Result<(), SurfaceError> {
        let image = self.snapshot();
        image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}

impl Default for FramebufferSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TileSurface for FramebufferSurface {
    fn create_grid(
        &mut self,
        width: u32,
        height: u32,
        cells: &[CellGeometry],
    ) -> Result<(), SurfaceError> {
        let mut fb = self.inner.lock();
        fb.image = RgbaImage::new(width, height);
        fb.cells = cells
            .iter()
            .map(|cell| ((cell.row, cell.col), CellBuffers::default()))
            .collect();
        Ok(())
    }

    fn set_tile_image(
        &mut self,
        cell: &CellGeometry,
        buffer: TileBuffer,
        background: &TileBackground,
    ) -> Result<(), SurfaceError> {
        let mut fb = self.inner.lock();
        let generation = background.image.generation;
        let sheet = match &fb.sheet {
            Some((loaded, sheet)) if *loaded == generation => sheet,
            _ => return Err(SurfaceError::ImageNotLoaded { generation }),
        };

        // Regions past the sheet edge stay transparent.
        let mut pixels = RgbaImage::new(cell.width, cell.height);
        let src_x = background.offset_x.saturating_neg();
        let src_y = background.offset_y.saturating_neg();
        if src_x >= 0 && src_y >= 0 {
            let (sheet_w, sheet_h) = sheet.dimensions();
            let (src_x, src_y) = (src_x as u32, src_y as u32);
            if src_x < sheet_w && src_y < sheet_h {
                let width = cell.width.min(sheet_w - src_x);
                let height = cell.height.min(sheet_h - src_y);
                let region = imageops::crop_imm(sheet, src_x, src_y, width, height).to_image();
                imageops::replace(&mut pixels, &region, 0, 0);
            }
        }

        let buffers = fb
            .cells
            .get_mut(&(cell.row, cell.col))
            .ok_or(SurfaceError::CellOutOfRange {
                row: cell.row,
                col: cell.col,
            })?;
        buffers.pixels[buffer.index()] = Some(pixels);
        Ok(())
    }

    fn swap_buffer(
        &mut self,
        cell: &CellGeometry,
        buffer: TileBuffer,
        z_index: u32,
    ) -> Result<(), SurfaceError> {
        let mut fb = self.inner.lock();
        let Framebuffer { image, cells, .. } = &mut *fb;
        let buffers = cells
            .get_mut(&(cell.row, cell.col))
            .ok_or(SurfaceError::CellOutOfRange {
                row: cell.row,
                col: cell.col,
            })?;
        buffers.z_index[buffer.index()] = z_index;
        if let Some(top) = buffers.top() {
            imageops::replace(image, top, i64::from(cell.x), i64::from(cell.y));
        }
        trace!(
            target: "porthole::canvas",
            row = cell.row,
            col = cell.col,
            ?buffer,
            z_index,
            "composited cell"
        );
        Ok(())
    }

    fn reposition(&mut self, dx: i32, dy: i32) -> Result<(), SurfaceError> {
        let mut fb = self.inner.lock();
        fb.origin = (fb.origin.0 + dx, fb.origin.1 + dy);
        Ok(())
    }

    fn load_image(&mut self, source: &ImageSource, bytes: &[u8]) -> Result<(), SurfaceError> {
        let sheet = image::load_from_memory(bytes)?.to_rgba8();
        trace!(
            target: "porthole::canvas",
            url = %source.url,
            generation = source.generation,
            width = sheet.width(),
            height = sheet.height(),
            "decoded sprite sheet"
        );
        self.inner.lock().sheet = Some((source.generation, sheet));
        Ok(())
    }
}
