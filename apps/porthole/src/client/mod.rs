pub mod event_queue;
pub mod keyboard;
pub mod status;
pub mod surface;
pub mod tile_canvas;
pub mod viewer;

pub use event_queue::EventQueue;
pub use keyboard::KeyboardTranslator;
pub use status::{HostHooks, NoopHooks, StatusNotifier, ViewerStatus};
pub use surface::{FramebufferSurface, RecordingSurface, SurfaceCall};
pub use tile_canvas::{CanvasGeometry, SurfaceError, TileCanvas, TileSurface};
pub use viewer::{ConsoleViewer, ViewerError, ViewerState};
