//! Double-buffered tile grid.
//!
//! The console screen is a grid of fixed-size cells. Every cell owns two
//! overlay buffers; repainting a cell styles the hidden buffer first and then
//! raises it above the visible one, so a cell is never seen half-painted.

use crate::protocol::TilePos;
use crate::telemetry::PerfGuard;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Z-index at which buffers are renormalized back down to [`Z_INDEX_BASE`].
pub const Z_INDEX_CEILING: u32 = 10_000;
pub const Z_INDEX_BASE: u32 = 1;

/// Largest framebuffer side, in pixels, a console may ask for.
pub const MAX_CANVAS_SIDE: u32 = 16_384;
/// Largest number of grid cells a console may ask for.
pub const MAX_CELLS: u32 = 65_536;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("invalid canvas geometry {width}x{height} with {tile_width}x{tile_height} tiles")]
    InvalidGeometry {
        width: u32,
        height: u32,
        tile_width: u32,
        tile_height: u32,
    },
    #[error("cell {row},{col} is outside the grid")]
    CellOutOfRange { row: u32, col: u32 },
    #[error("image generation {generation} has not been loaded")]
    ImageNotLoaded { generation: u64 },
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileBuffer {
    Primary,
    Secondary,
}

impl TileBuffer {
    pub const fn index(self) -> usize {
        match self {
            TileBuffer::Primary => 0,
            TileBuffer::Secondary => 1,
        }
    }

    pub const fn other(self) -> Self {
        match self {
            TileBuffer::Primary => TileBuffer::Secondary,
            TileBuffer::Secondary => TileBuffer::Primary,
        }
    }
}

/// Placement of one cell. `x`/`y` are relative to the grid, `left`/`top`
/// include the canvas origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellGeometry {
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

/// A sprite sheet fetched from the console host. `generation` increases on
/// every reload so surfaces can tell a refreshed sheet from a stale one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSource {
    pub url: String,
    pub generation: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileBackground {
    pub image: Arc<ImageSource>,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl TileBackground {
    pub fn css_position(&self) -> String {
        format!("{}px {}px", self.offset_x, self.offset_y)
    }
}

/// Rendering backend for a [`TileCanvas`].
pub trait TileSurface: Send {
    /// Replaces every existing cell with a fresh grid.
    fn create_grid(&mut self, width: u32, height: u32, cells: &[CellGeometry])
    -> Result<(), SurfaceError>;

    /// Points a buffer at a region of a sprite sheet. The buffer is created on
    /// first use.
    fn set_tile_image(
        &mut self,
        cell: &CellGeometry,
        buffer: TileBuffer,
        background: &TileBackground,
    ) -> Result<(), SurfaceError>;

    /// Sets a buffer's stacking order; the higher buffer of a cell is visible.
    fn swap_buffer(
        &mut self,
        cell: &CellGeometry,
        buffer: TileBuffer,
        z_index: u32,
    ) -> Result<(), SurfaceError>;

    fn reposition(&mut self, dx: i32, dy: i32) -> Result<(), SurfaceError>;

    /// Hands over the bytes of a freshly fetched sprite sheet.
    fn load_image(&mut self, _source: &ImageSource, _bytes: &[u8]) -> Result<(), SurfaceError> {
        Ok(())
    }
}

/// Per-cell buffer bookkeeping.
#[derive(Clone, Debug)]
pub struct Tile {
    pub geometry: CellGeometry,
    pub active: Option<TileBuffer>,
    pub z_index: [u32; 2],
    pub background: Option<TileBackground>,
}

impl Tile {
    fn new(geometry: CellGeometry) -> Self {
        Self {
            geometry,
            active: None,
            z_index: [0; 2],
            background: None,
        }
    }

    pub fn active_z_index(&self) -> u32 {
        self.active.map_or(0, |buffer| self.z_index[buffer.index()])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasGeometry {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

impl CanvasGeometry {
    /// Rejects empty tiles and grids past [`MAX_CANVAS_SIDE`] or
    /// [`MAX_CELLS`].
    pub fn validate(self) -> Result<Self, SurfaceError> {
        let sides = [self.width, self.height, self.tile_width, self.tile_height];
        let in_range = sides
            .iter()
            .all(|side| (1..=MAX_CANVAS_SIDE).contains(side))
            && self
                .rows()
                .checked_mul(self.cols())
                .is_some_and(|cells| cells <= MAX_CELLS);
        if !in_range {
            return Err(SurfaceError::InvalidGeometry {
                width: self.width,
                height: self.height,
                tile_width: self.tile_width,
                tile_height: self.tile_height,
            });
        }
        Ok(self)
    }

    pub fn cols(&self) -> u32 {
        self.width.div_ceil(self.tile_width.max(1))
    }

    pub fn rows(&self) -> u32 {
        self.height.div_ceil(self.tile_height.max(1))
    }
}

/// Negated sprite offset of slot `index` for tiles of `size` pixels, or
/// `None` if it does not fit an `i32`.
fn sprite_offset(index: usize, size: u32) -> Option<i32> {
    let pixels = i64::try_from(index).ok()?.checked_mul(i64::from(size))?;
    i32::try_from(-pixels).ok()
}

pub struct TileCanvas {
    surface: Box<dyn TileSurface>,
    geometry: CanvasGeometry,
    origin: (i32, i32),
    tiles: Vec<Tile>,
    tile_map: Vec<TilePos>,
    full_image: bool,
    dirty: bool,
    image: Option<Arc<ImageSource>>,
    generation: u64,
}

impl fmt::Debug for TileCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileCanvas")
            .field("geometry", &self.geometry)
            .field("origin", &self.origin)
            .field("tiles", &self.tiles.len())
            .field("dirty", &self.dirty)
            .field("image", &self.image)
            .finish()
    }
}

impl TileCanvas {
    pub fn new(
        surface: Box<dyn TileSurface>,
        geometry: CanvasGeometry,
    ) -> Result<Self, SurfaceError> {
        let mut canvas = Self {
            surface,
            geometry: geometry.validate()?,
            origin: (0, 0),
            tiles: Vec::new(),
            tile_map: Vec::new(),
            full_image: true,
            dirty: false,
            image: None,
            generation: 0,
        };
        canvas.build_grid()?;
        Ok(canvas)
    }

    pub fn geometry(&self) -> CanvasGeometry {
        self.geometry
    }

    pub fn cols(&self) -> u32 {
        self.geometry.cols()
    }

    pub fn rows(&self) -> u32 {
        self.geometry.rows()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn image(&self) -> Option<&ImageSource> {
        self.image.as_deref()
    }

    pub fn tile(&self, row: u32, col: u32) -> Option<&Tile> {
        self.cell_index(row, col).map(|index| &self.tiles[index])
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    fn cell_index(&self, row: u32, col: u32) -> Option<usize> {
        (row < self.rows() && col < self.cols())
            .then(|| (row * self.cols() + col) as usize)
    }

    fn build_grid(&mut self) -> Result<(), SurfaceError> {
        let CanvasGeometry {
            width,
            height,
            tile_width,
            tile_height,
        } = self.geometry;
        let (origin_x, origin_y) = self.origin;
        let mut tiles = Vec::with_capacity((self.rows() * self.cols()) as usize);
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                let x = col * tile_width;
                let y = row * tile_height;
                tiles.push(Tile::new(CellGeometry {
                    row,
                    col,
                    x,
                    y,
                    left: origin_x + x as i32,
                    top: origin_y + y as i32,
                    width: tile_width.min(width - x),
                    height: tile_height.min(height - y),
                }));
            }
        }
        let cells: Vec<CellGeometry> = tiles.iter().map(|tile| tile.geometry).collect();
        self.surface.create_grid(width, height, &cells)?;
        self.tiles = tiles;
        debug!(
            target: "porthole::canvas",
            rows = self.rows(),
            cols = self.cols(),
            "built tile grid"
        );
        Ok(())
    }

    /// Installs a freshly fetched sprite sheet and the tiles to paint from it.
    pub fn refresh(
        &mut self,
        image_url: &str,
        bytes: &[u8],
        tile_map: Vec<TilePos>,
        full_image: bool,
    ) -> Result<(), SurfaceError> {
        self.generation += 1;
        let source = Arc::new(ImageSource {
            url: image_url.to_string(),
            generation: self.generation,
        });
        self.surface.load_image(&source, bytes)?;
        self.image = Some(source);
        self.tile_map = tile_map;
        self.full_image = full_image;
        self.dirty = true;
        Ok(())
    }

    /// Re-arms the update chain without anything to paint.
    pub fn mark_dirty(&mut self) {
        self.tile_map.clear();
        self.dirty = true;
    }

    /// Paints every tile in the pending tile map and clears the dirty flag.
    /// Returns the number of cells painted.
    pub fn update_tile(&mut self) -> Result<usize, SurfaceError> {
        if !self.dirty {
            return Ok(0);
        }
        self.dirty = false;
        let Some(image) = self.image.clone() else {
            return Ok(0);
        };
        let _guard = PerfGuard::new("canvas_update_tile");

        let CanvasGeometry {
            tile_width,
            tile_height,
            ..
        } = self.geometry;
        let mut paints = Vec::with_capacity(self.tile_map.len());
        for (index, pos) in self.tile_map.iter().enumerate() {
            let Some(cell) = self.cell_index(pos.row, pos.col) else {
                warn!(
                    target: "porthole::canvas",
                    row = pos.row,
                    col = pos.col,
                    rows = self.rows(),
                    cols = self.cols(),
                    "tile map entry outside the grid; skipping"
                );
                continue;
            };
            let offsets = if self.full_image {
                sprite_offset(pos.col as usize, tile_width)
                    .zip(sprite_offset(pos.row as usize, tile_height))
            } else {
                sprite_offset(index, tile_width).map(|offset_x| (offset_x, 0))
            };
            let Some((offset_x, offset_y)) = offsets else {
                warn!(
                    target: "porthole::canvas",
                    index,
                    row = pos.row,
                    col = pos.col,
                    "sprite offset out of range; skipping"
                );
                continue;
            };
            paints.push((
                cell,
                TileBackground {
                    image: image.clone(),
                    offset_x,
                    offset_y,
                },
            ));
        }

        let painted = paints.len();
        for (cell, background) in paints {
            self.display_cell(cell, background)?;
        }
        Ok(painted)
    }

    /// Paints one cell into its hidden buffer and raises it above the
    /// visible one.
    pub fn display_cell(
        &mut self,
        index: usize,
        background: TileBackground,
    ) -> Result<(), SurfaceError> {
        let Some(tile) = self.tiles.get_mut(index) else {
            let cols = self.geometry.cols().max(1);
            return Err(SurfaceError::CellOutOfRange {
                row: index as u32 / cols,
                col: index as u32 % cols,
            });
        };
        let next = tile.active.map_or(TileBuffer::Primary, TileBuffer::other);
        let current_z = tile.active_z_index();

        self.surface
            .set_tile_image(&tile.geometry, next, &background)?;

        if current_z >= Z_INDEX_CEILING {
            if let Some(active) = tile.active {
                self.surface
                    .swap_buffer(&tile.geometry, active, Z_INDEX_BASE)?;
                tile.z_index[active.index()] = Z_INDEX_BASE;
            }
            self.surface
                .swap_buffer(&tile.geometry, next, Z_INDEX_BASE + 1)?;
            tile.z_index[next.index()] = Z_INDEX_BASE + 1;
        } else {
            self.surface
                .swap_buffer(&tile.geometry, next, current_z + 1)?;
            tile.z_index[next.index()] = current_z + 1;
        }
        tile.active = Some(next);
        tile.background = Some(background);
        Ok(())
    }

    /// Tears the grid down and rebuilds it for a new framebuffer size.
    pub fn resize(&mut self, geometry: CanvasGeometry) -> Result<(), SurfaceError> {
        self.geometry = geometry.validate()?;
        self.tile_map.clear();
        self.build_grid()
    }

    /// Moves every tile so the grid starts at `origin`.
    pub fn reposition(&mut self, origin: (i32, i32)) -> Result<(), SurfaceError> {
        let dx = origin.0 - self.origin.0;
        let dy = origin.1 - self.origin.1;
        if dx == 0 && dy == 0 {
            return Ok(());
        }
        for tile in &mut self.tiles {
            tile.geometry.left += dx;
            tile.geometry.top += dy;
        }
        self.origin = origin;
        self.surface.reposition(dx, dy)
    }

    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::surface::{RecordingSurface, SurfaceCall};

    fn new_canvas(width: u32, height: u32, tile: u32) -> (TileCanvas, RecordingSurface) {
        let surface = RecordingSurface::new();
        let canvas = TileCanvas::new(
            Box::new(surface.clone()),
            CanvasGeometry {
                width,
                height,
                tile_width: tile,
                tile_height: tile,
            },
        )
        .expect("canvas");
        (canvas, surface)
    }

    fn background(offset_x: i32, offset_y: i32) -> TileBackground {
        TileBackground {
            image: Arc::new(ImageSource {
                url: "sheet.png".into(),
                generation: 1,
            }),
            offset_x,
            offset_y,
        }
    }

    #[test]
    fn grid_dimensions_round_up() {
        let (canvas, _) = new_canvas(128, 128, 64);
        assert_eq!((canvas.rows(), canvas.cols()), (2, 2));

        let (canvas, _) = new_canvas(130, 100, 64);
        assert_eq!((canvas.rows(), canvas.cols()), (2, 3));
        let edge = canvas.tile(1, 2).expect("edge tile");
        assert_eq!((edge.geometry.width, edge.geometry.height), (2, 36));
    }

    #[test]
    fn rejects_zero_sized_tiles() {
        let result = TileCanvas::new(
            Box::new(RecordingSurface::new()),
            CanvasGeometry {
                width: 100,
                height: 100,
                tile_width: 0,
                tile_height: 64,
            },
        );
        assert!(matches!(result, Err(SurfaceError::InvalidGeometry { .. })));
    }

    #[test]
    fn rejects_oversized_grids() {
        let oversized = [
            (65_536, 65_537, 1, 1),
            (MAX_CANVAS_SIDE + 1, 64, 64, 64),
            (1024, 1024, 2, 2),
            (64, 64, u32::MAX, 64),
        ];
        for (width, height, tile_width, tile_height) in oversized {
            let geometry = CanvasGeometry {
                width,
                height,
                tile_width,
                tile_height,
            };
            assert!(
                matches!(geometry.validate(), Err(SurfaceError::InvalidGeometry { .. })),
                "{geometry:?} accepted"
            );
        }

        let (mut canvas, surface) = new_canvas(128, 128, 64);
        surface.clear();
        let result = canvas.resize(CanvasGeometry {
            width: 65_536,
            height: 65_537,
            tile_width: 1,
            tile_height: 1,
        });
        assert!(result.is_err());
        assert!(surface.calls().is_empty());
        assert_eq!((canvas.rows(), canvas.cols()), (2, 2));
    }

    #[test]
    fn strip_slots_past_i32_range_are_skipped() {
        assert_eq!(sprite_offset(3, 64), Some(-192));
        assert_eq!(sprite_offset(0, 64), Some(0));
        assert_eq!(sprite_offset(40_000_000, MAX_CANVAS_SIDE), None);
    }

    #[test]
    fn display_cell_raises_new_buffer_above_previous() {
        let (mut canvas, _) = new_canvas(128, 128, 64);
        canvas.display_cell(0, background(0, 0)).unwrap();
        let first = canvas.tile(0, 0).unwrap().clone();
        canvas.display_cell(0, background(-64, 0)).unwrap();
        let second = canvas.tile(0, 0).unwrap();

        assert_eq!(first.active, Some(TileBuffer::Primary));
        assert_eq!(second.active, Some(TileBuffer::Secondary));
        assert!(second.active_z_index() > first.active_z_index());
    }

    #[test]
    fn new_buffer_is_styled_before_it_is_raised() {
        let (mut canvas, surface) = new_canvas(64, 64, 64);
        canvas.display_cell(0, background(0, 0)).unwrap();
        let calls = surface.calls();
        let set = calls
            .iter()
            .position(|call| matches!(call, SurfaceCall::SetTileImage { .. }))
            .unwrap();
        let swap = calls
            .iter()
            .position(|call| matches!(call, SurfaceCall::SwapBuffer { .. }))
            .unwrap();
        assert!(set < swap);
    }

    #[test]
    fn z_index_renormalizes_at_ceiling() {
        let (mut canvas, surface) = new_canvas(64, 64, 64);
        canvas.display_cell(0, background(0, 0)).unwrap();
        canvas.tiles[0].z_index = [Z_INDEX_CEILING, Z_INDEX_CEILING - 1];
        surface.clear();

        canvas.display_cell(0, background(0, 0)).unwrap();
        let tile = canvas.tile(0, 0).unwrap();
        assert_eq!(tile.active, Some(TileBuffer::Secondary));
        assert_eq!(tile.z_index, [Z_INDEX_BASE, Z_INDEX_BASE + 1]);

        let swaps: Vec<_> = surface
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                SurfaceCall::SwapBuffer { buffer, z_index, .. } => Some((buffer, z_index)),
                _ => None,
            })
            .collect();
        assert_eq!(
            swaps,
            vec![
                (TileBuffer::Primary, Z_INDEX_BASE),
                (TileBuffer::Secondary, Z_INDEX_BASE + 1)
            ]
        );
    }

    #[test]
    fn full_image_tile_map_paints_sprite_offsets() {
        let (mut canvas, _) = new_canvas(128, 128, 64);
        canvas
            .refresh(
                "sheet.png",
                &[],
                vec![TilePos::new(0, 0), TilePos::new(1, 1)],
                true,
            )
            .unwrap();
        assert_eq!(canvas.update_tile().unwrap(), 2);
        assert!(!canvas.is_dirty());

        let origin = canvas.tile(0, 0).unwrap().background.clone().unwrap();
        let corner = canvas.tile(1, 1).unwrap().background.clone().unwrap();
        assert_eq!(origin.css_position(), "0px 0px");
        assert_eq!(corner.css_position(), "-64px -64px");
        assert!(canvas.tile(0, 1).unwrap().background.is_none());
    }

    #[test]
    fn incremental_tile_map_paints_strip_offsets() {
        let (mut canvas, _) = new_canvas(128, 128, 64);
        canvas
            .refresh(
                "strip.png",
                &[],
                vec![TilePos::new(1, 1), TilePos::new(0, 1)],
                false,
            )
            .unwrap();
        canvas.update_tile().unwrap();
        let first = canvas.tile(1, 1).unwrap().background.clone().unwrap();
        let second = canvas.tile(0, 1).unwrap().background.clone().unwrap();
        assert_eq!(first.css_position(), "0px 0px");
        assert_eq!(second.css_position(), "-64px 0px");
    }

    #[test]
    fn out_of_grid_entries_are_skipped() {
        let (mut canvas, _) = new_canvas(128, 128, 64);
        canvas
            .refresh(
                "sheet.png",
                &[],
                vec![TilePos::new(5, 0), TilePos::new(0, 1)],
                true,
            )
            .unwrap();
        assert_eq!(canvas.update_tile().unwrap(), 1);
        assert!(canvas.tile(0, 1).unwrap().background.is_some());
    }

    #[test]
    fn update_tile_is_a_no_op_when_clean() {
        let (mut canvas, surface) = new_canvas(128, 128, 64);
        surface.clear();
        assert_eq!(canvas.update_tile().unwrap(), 0);
        assert!(surface.calls().is_empty());
    }

    #[test]
    fn resize_rebuilds_and_reposition_shifts() {
        let (mut canvas, surface) = new_canvas(128, 128, 64);
        canvas
            .resize(CanvasGeometry {
                width: 256,
                height: 64,
                tile_width: 64,
                tile_height: 64,
            })
            .unwrap();
        assert_eq!((canvas.rows(), canvas.cols()), (1, 4));

        surface.clear();
        canvas.reposition((10, 20)).unwrap();
        canvas.reposition((15, 20)).unwrap();
        assert_eq!(canvas.tile(0, 3).unwrap().geometry.left, 15 + 192);
        assert_eq!(
            surface.calls(),
            vec![
                SurfaceCall::Reposition { dx: 10, dy: 20 },
                SurfaceCall::Reposition { dx: 5, dy: 0 }
            ]
        );
    }
}
