//! Fixed-capacity window table
//!
//! Maps (channel id, monitor id) pairs to window records. The table is an
//! arena of `CHANNEL_MAX * MONITOR_MAX` optional slots addressed by a packed
//! index; accessors are bounds-checked and return a result instead of
//! clamping or reading out of bounds.

use crate::error::{TableError, TableResult};

/// Maximum number of display channels tracked per connection
pub const CHANNEL_MAX: usize = 4;

/// Maximum number of monitors tracked per display channel
pub const MONITOR_MAX: usize = 4;

/// Bookkeeping entry for one (channel, monitor) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRecord {
    channel_id: u8,
    monitor_id: u8,
    /// Whether the window is fullscreen. Tracked but not yet consulted.
    pub fullscreen: bool,
    /// Whether the window has grabbed the mouse. Tracked but not yet consulted.
    pub mouse_grabbed: bool,
    /// Id of the owning display channel (weak reference, resolved on use)
    display_channel: u8,
}

impl WindowRecord {
    /// Creates a record for a (channel, monitor) pair owned by a display channel
    pub fn new(channel_id: u8, monitor_id: u8, display_channel: u8) -> Self {
        Self {
            channel_id,
            monitor_id,
            fullscreen: false,
            mouse_grabbed: false,
            display_channel,
        }
    }

    /// Channel id component of the slot key
    pub fn channel_id(&self) -> u8 {
        self.channel_id
    }

    /// Monitor id component of the slot key
    pub fn monitor_id(&self) -> u8 {
        self.monitor_id
    }

    /// Id of the owning display channel
    pub fn display_channel(&self) -> u8 {
        self.display_channel
    }

    /// Logical display index this record addresses on the main channel
    ///
    /// In every supported topology either the channel id or the monitor id
    /// is zero, so the sum selects the nonzero component.
    pub fn display_index(&self) -> u8 {
        self.channel_id + self.monitor_id
    }
}

/// Fixed-capacity table of window records
///
/// At most one record exists per (channel id, monitor id) pair; an absent
/// pair is an empty slot.
#[derive(Debug)]
pub struct WindowTable {
    slots: [Option<WindowRecord>; CHANNEL_MAX * MONITOR_MAX],
}

impl Default for WindowTable {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Total number of slots
    pub const fn capacity() -> usize {
        CHANNEL_MAX * MONITOR_MAX
    }

    fn slot_index(channel_id: u8, monitor_id: u8) -> TableResult<usize> {
        if (channel_id as usize) < CHANNEL_MAX && (monitor_id as usize) < MONITOR_MAX {
            Ok(channel_id as usize * CHANNEL_MAX + monitor_id as usize)
        } else {
            Err(TableError::InvalidIndex {
                channel_id,
                monitor_id,
            })
        }
    }

    /// Inserts a record at its (channel id, monitor id) slot
    ///
    /// # Errors
    ///
    /// Returns `InvalidIndex` if either id is out of bounds, or
    /// `SlotOccupied` if a record already exists at that slot.
    pub fn add(&mut self, record: WindowRecord) -> TableResult<()> {
        let index = Self::slot_index(record.channel_id, record.monitor_id)?;

        if self.slots[index].is_some() {
            return Err(TableError::SlotOccupied {
                channel_id: record.channel_id,
                monitor_id: record.monitor_id,
            });
        }

        self.slots[index] = Some(record);
        Ok(())
    }

    /// Looks up the record at a slot
    ///
    /// # Errors
    ///
    /// Returns `InvalidIndex` if either id is out of bounds.
    pub fn get(&self, channel_id: u8, monitor_id: u8) -> TableResult<Option<&WindowRecord>> {
        let index = Self::slot_index(channel_id, monitor_id)?;
        Ok(self.slots[index].as_ref())
    }

    /// Evicts the record at a slot, returning it
    ///
    /// Idempotent: removing an absent slot is a no-op and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIndex` if either id is out of bounds.
    pub fn remove(&mut self, channel_id: u8, monitor_id: u8) -> TableResult<Option<WindowRecord>> {
        let index = Self::slot_index(channel_id, monitor_id)?;
        Ok(self.slots[index].take())
    }

    /// Iterates occupied slots in packed-index order
    pub fn occupied(&self) -> impl Iterator<Item = &WindowRecord> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// First occupied slot in packed-index order, if any
    pub fn first_occupied(&self) -> Option<&WindowRecord> {
        self.occupied().next()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.occupied().count()
    }

    /// Whether the table has no occupied slots
    pub fn is_empty(&self) -> bool {
        self.first_occupied().is_none()
    }
}
