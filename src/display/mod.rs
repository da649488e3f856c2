//! Display window tracking and resize orchestration

pub mod resize;
pub mod table;

pub use resize::apply_geometry;
pub use table::{WindowRecord, WindowTable, CHANNEL_MAX, MONITOR_MAX};
