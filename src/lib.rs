#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

#[macro_use]
mod fmt;

pub mod bus;
pub mod device;
pub mod params;
pub mod registers;

// Re-export main types
pub use bus::{BusId, BusRegistry, BUS_LOCK_TIMEOUT};
pub use device::{ActuatorType, Da7281Driver, DeviceAddress, OperationMode};
pub use params::{LraConfig, RegisterCodes};

/// Expected value of the `CHIP_ID` register (datasheet v3.1, Table 20)
///
/// Read during [`Da7281Driver::init`] to verify device identity before any
/// register is written.
pub const CHIP_ID_VALUE: u8 = 0xCA;

/// `CHIP_ID` value reported by the earlier silicon revision
///
/// Legacy parts identify with this value instead of [`CHIP_ID_VALUE`]; both
/// are accepted during initialization. Any other value aborts with
/// [`Error::IdentityMismatch`].
pub const CHIP_ID_LEGACY: u8 = 0xBA;

/// Driver errors
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error with the device (transport NACK or bus error)
    Bus(E),
    /// The bus lock could not be acquired within [`BUS_LOCK_TIMEOUT`]
    ///
    /// Distinct from [`Error::Bus`] so callers can tell contention from a
    /// hardware fault.
    LockTimeout,
    /// Invalid parameter: out-of-range configuration value, an unbound bus,
    /// or an undefined mode pattern read back from the device
    InvalidParameter,
    /// Operation requires an initialized (or powered) device
    NotInitialized,
    /// [`Da7281Driver::init`] called on an already-initialized device
    AlreadyInitialized,
    /// Unrecognized `CHIP_ID` value (contains the byte actually read)
    IdentityMismatch(u8),
    /// The power-enable GPIO reported an error
    Gpio,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
