//! Event kinds and their stable transaction opcodes.

use std::fmt;

/// The five callback transactions, one per opcode.
///
/// Opcodes are assigned once and never reordered or reused; peers that were
/// never rebuilt rely on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Notify,
    DataDelivered,
    TimestampedDataDelivered,
    LockStatusChanged,
    ResultReceived,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Notify,
        EventKind::DataDelivered,
        EventKind::TimestampedDataDelivered,
        EventKind::LockStatusChanged,
        EventKind::ResultReceived,
    ];

    pub fn opcode(self) -> u32 {
        match self {
            EventKind::Notify => 1,
            EventKind::DataDelivered => 2,
            EventKind::TimestampedDataDelivered => 3,
            EventKind::LockStatusChanged => 4,
            EventKind::ResultReceived => 5,
        }
    }

    pub fn from_opcode(opcode: u32) -> Option<Self> {
        match opcode {
            1 => Some(EventKind::Notify),
            2 => Some(EventKind::DataDelivered),
            3 => Some(EventKind::TimestampedDataDelivered),
            4 => Some(EventKind::LockStatusChanged),
            5 => Some(EventKind::ResultReceived),
            _ => None,
        }
    }

    /// Stable lowercase label, used for log fields and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Notify => "notify",
            EventKind::DataDelivered => "data",
            EventKind::TimestampedDataDelivered => "data_timestamp",
            EventKind::LockStatusChanged => "lock_status_changed",
            EventKind::ResultReceived => "result_received",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
