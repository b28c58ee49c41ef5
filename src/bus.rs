//! Shared-bus register transactions
//!
//! The DA7281 shares its I2C bus with up to three siblings (four
//! strap-selectable addresses), and a board may carry devices on two
//! independent buses. [`BusRegistry`] owns one async mutex and one transport
//! slot per bus: devices on the same bus serialize through that bus's lock,
//! devices on different buses proceed concurrently.
//!
//! Every register access must funnel through this layer - the per-bus lock
//! is the only thing making [`BusRegistry::modify_register`] atomic with
//! respect to other traffic on the same bus.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{with_timeout, Duration};
use embedded_hal_async::i2c::I2c;

use crate::Error;

/// Number of independent buses a registry manages
pub const BUS_COUNT: usize = 2;

/// Bounded wait for a bus lock before giving up with
/// [`Error::LockTimeout`]
pub const BUS_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// Identifier of one of the two independent buses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusId {
    /// First bus
    Bus0 = 0,
    /// Second bus
    Bus1 = 1,
}

impl BusId {
    /// Registry slot index for this bus
    pub const fn index(self) -> usize {
        self as usize
    }
}

type Slot<BUS> = Mutex<CriticalSectionRawMutex, Option<BUS>>;

/// Arena of bus transports, one lock per physical bus
///
/// Constructed once at startup and passed by shared reference into every
/// [`crate::Da7281Driver`]. A slot starts empty; [`BusRegistry::bind`]
/// installs the transport the first time a bus is brought up, and further
/// binds are no-op successes so that several devices sharing a bus can each
/// trigger bring-up independently.
pub struct BusRegistry<BUS> {
    slots: [Slot<BUS>; BUS_COUNT],
}

impl<BUS> BusRegistry<BUS> {
    /// Create a registry with all bus slots empty
    pub const fn new() -> Self {
        Self {
            slots: [Mutex::new(None), Mutex::new(None)],
        }
    }
}

impl<BUS> Default for BusRegistry<BUS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<BUS, E> BusRegistry<BUS>
where
    BUS: I2c<Error = E>,
{
    /// Acquire a bus lock within [`BUS_LOCK_TIMEOUT`]
    ///
    /// The guard releases the lock when dropped, on every exit path.
    async fn lock(
        &self,
        bus: BusId,
    ) -> Result<MutexGuard<'_, CriticalSectionRawMutex, Option<BUS>>, Error<E>> {
        with_timeout(BUS_LOCK_TIMEOUT, self.slots[bus.index()].lock())
            .await
            .map_err(|_| Error::LockTimeout)
    }

    /// Install the transport for a bus
    ///
    /// Idempotent: if the bus is already bound the existing transport is
    /// kept, the new one is dropped and the call succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockTimeout`] if the bus lock cannot be acquired.
    pub async fn bind(&self, bus: BusId, transport: BUS) -> Result<(), Error<E>> {
        let mut slot = self.lock(bus).await?;
        if slot.is_none() {
            *slot = Some(transport);
            info!("bus {} bound", bus.index());
        } else {
            debug!("bus {} already bound, keeping existing transport", bus.index());
        }
        Ok(())
    }

    /// Write a single byte to a device register
    ///
    /// Issues one two-byte transaction (register address, value) to the
    /// 7-bit `address` under the bus lock.
    ///
    /// # Errors
    ///
    /// [`Error::LockTimeout`] on lock contention, [`Error::InvalidParameter`]
    /// if the bus was never bound, [`Error::Bus`] on a transport fault.
    pub async fn write_register(
        &self,
        bus: BusId,
        address: u8,
        reg: u8,
        value: u8,
    ) -> Result<(), Error<E>> {
        let mut slot = self.lock(bus).await?;
        let transport = slot.as_mut().ok_or(Error::InvalidParameter)?;
        transport.write(address, &[reg, value]).await?;
        debug!("write: bus {} addr {} reg {} val {}", bus.index(), address, reg, value);
        Ok(())
    }

    /// Read a single byte from a device register
    ///
    /// Writes the register address without a stop condition, then reads one
    /// byte with a repeated start, all under the bus lock.
    ///
    /// # Errors
    ///
    /// [`Error::LockTimeout`] on lock contention, [`Error::InvalidParameter`]
    /// if the bus was never bound, [`Error::Bus`] on a transport fault.
    pub async fn read_register(&self, bus: BusId, address: u8, reg: u8) -> Result<u8, Error<E>> {
        let mut slot = self.lock(bus).await?;
        let transport = slot.as_mut().ok_or(Error::InvalidParameter)?;
        let mut value = [0u8; 1];
        transport.write_read(address, &[reg], &mut value).await?;
        debug!("read: bus {} addr {} reg {} val {}", bus.index(), address, reg, value[0]);
        Ok(value[0])
    }

    /// Read-modify-write a device register
    ///
    /// Computes `(old & !mask) | (bits & mask)` - bits outside `mask` are
    /// never changed. The read and the write happen under a single lock
    /// acquisition; taking the lock twice would let another device's traffic
    /// interleave between them.
    ///
    /// # Errors
    ///
    /// [`Error::LockTimeout`] on lock contention, [`Error::InvalidParameter`]
    /// if the bus was never bound, [`Error::Bus`] on a transport fault.
    pub async fn modify_register(
        &self,
        bus: BusId,
        address: u8,
        reg: u8,
        mask: u8,
        bits: u8,
    ) -> Result<(), Error<E>> {
        let mut slot = self.lock(bus).await?;
        let transport = slot.as_mut().ok_or(Error::InvalidParameter)?;

        let mut old = [0u8; 1];
        transport.write_read(address, &[reg], &mut old).await?;
        let new = (old[0] & !mask) | (bits & mask);
        transport.write(address, &[reg, new]).await?;

        debug!(
            "modify: addr {} reg {} old {} new {} mask {}",
            address, reg, old[0], new, mask
        );
        Ok(())
    }
}
