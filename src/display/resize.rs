//! Monitor resize orchestration
//!
//! Walks the window table and issues the enable + geometry + commit sequence
//! against the main channel. Only the first occupied slot is resized even
//! when several are occupied; see DESIGN.md for why this limitation is
//! carried deliberately.

use tracing::{debug, info};

use crate::display::table::WindowTable;
use crate::error::{DisplayError, Result};
use crate::proto::{DisplayGeometry, SessionBackend};

/// Applies a geometry to the first occupied window slot
///
/// Issues exactly one enable call, one geometry call, and one commit call,
/// in that order. Repeated invocations with identical geometry produce
/// identical call sequences.
///
/// # Errors
///
/// Returns `NoMainChannel` if no main control channel has been discovered,
/// `NoActiveDisplay` if the table has no occupied slot, or a session error
/// if the backend rejects a call.
pub fn apply_geometry(
    table: &WindowTable,
    main_channel: Option<u8>,
    backend: &mut dyn SessionBackend,
    geometry: DisplayGeometry,
) -> Result<()> {
    let main_channel = main_channel.ok_or(DisplayError::NoMainChannel)?;
    let record = table.first_occupied().ok_or(DisplayError::NoActiveDisplay)?;

    let display_index = record.display_index();
    debug!(
        "resizing display {} (window {}:{}) via main channel {}",
        display_index,
        record.channel_id(),
        record.monitor_id(),
        main_channel
    );

    backend.enable_display(display_index, true, false)?;
    backend.set_display_geometry(display_index, geometry, true)?;
    backend.commit_monitor_config()?;

    info!(
        "display {} set to {}x{} at ({}, {})",
        display_index, geometry.width, geometry.height, geometry.x, geometry.y
    );
    Ok(())
}
