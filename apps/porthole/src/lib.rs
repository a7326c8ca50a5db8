pub mod client;
pub mod config;
pub mod console;
pub mod protocol;
pub mod telemetry;
pub mod transport;

pub use porthole_keymaps as keymaps;
