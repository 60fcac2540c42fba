//! Core data types for the transfer engine.

use crate::device::DeviceId;

/// One committed transfer: the engine's only observable output.
///
/// Endpoints are an unordered pair reported in candidate order; a
/// device-local operation repeats the same id on both sides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: DeviceId,
    pub to: DeviceId,
    /// 1-based index of the round that committed this transfer.
    pub round: u32,
}

impl TransferRecord {
    pub fn new(from: DeviceId, to: DeviceId, round: u32) -> Self {
        Self { from, to, round }
    }

    /// Endpoint pair normalized for order-insensitive comparisons.
    pub fn endpoints(&self) -> (DeviceId, DeviceId) {
        (self.from.min(self.to), self.from.max(self.to))
    }
}
