use crate::{Action, Result, Status};

/// The three operations a filter device instance offers. Every call is one
/// blocking round trip.
pub trait DeviceLink {
    /// Read the 32-bit word at a register address. `Ok(None)` means the
    /// device refused the access (expected while it is disabled).
    fn read(&mut self, address: u8) -> Result<Option<u32>>;

    /// Write a 32-bit word to a register address.
    fn write(&mut self, address: u8, data: u32) -> Result<Status>;

    /// Issue a control command.
    fn command(&mut self, action: Action) -> Result<Status>;

    /// Push one sample through the signal path and return the response sample.
    fn signal(&mut self, sample: i64) -> Result<i64>;
}
