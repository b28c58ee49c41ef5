//! High-level driver API for the DA7281
//!
//! This module provides the per-device handle: lifecycle control (power,
//! init, deinit), operating-mode selection, amplifier and amplitude control,
//! LRA configuration and the built-in self-test. Register addresses, bit
//! layouts and unit conversion stay behind this API.
//!
//! Lifecycle is `unpowered → powered → initialized`; every mode-dependent
//! operation checks its precondition and fails with
//! [`Error::NotInitialized`] instead of silently doing nothing.

use embassy_time::Timer;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::i2c::I2c;

use crate::bus::{BusId, BusRegistry};
use crate::params::{self, LraConfig};
use crate::registers as regs;
use crate::{Error, CHIP_ID_LEGACY, CHIP_ID_VALUE};

/// Settling delay after driving the enable line high
///
/// Datasheet minimum is 1.5 ms; 2 ms gives margin.
pub const POWER_ON_SETTLE_MS: u64 = 2;

/// Settling delay after leaving an active mode before triggering a self-test
const SELF_TEST_MODE_SETTLE_MS: u64 = 10;

/// Time the chip needs to run the self-test autonomously
const SELF_TEST_WAIT_MS: u64 = 150;

/// I2C device address, selected by the ADDR_1/ADDR_0 strap pins
///
/// Unshifted 7-bit values; the HAL owns the R/W bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceAddress {
    /// ADDR_1 = GND, ADDR_0 = GND
    Addr48 = 0x48,
    /// ADDR_1 = GND, ADDR_0 = VDDIO
    Addr49 = 0x49,
    /// ADDR_1 = VDDIO, ADDR_0 = GND
    Addr4A = 0x4A,
    /// ADDR_1 = VDDIO, ADDR_0 = VDDIO
    Addr4B = 0x4B,
}

impl DeviceAddress {
    /// The raw 7-bit bus address
    pub const fn value(self) -> u8 {
        self as u8
    }
}

/// Operation mode, the OP_MODE field of `TOP_CFG1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperationMode {
    /// Chip powered but not driving the actuator
    Inactive = 0x00,
    /// Direct register override - host controls amplitude via
    /// [`Da7281Driver::set_override_amplitude`]
    DirectOverride = 0x01,
    /// External PWM input controls amplitude
    PwmInput = 0x02,
    /// Real-time waveform memory playback
    RealtimeWaveform = 0x03,
    /// Embedded waveform memory playback
    EmbeddedWaveform = 0x04,
    /// Low-power standby
    Standby = 0x06,
}

impl OperationMode {
    /// Register bits of this mode
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode a raw OP_MODE field; `None` for undefined patterns
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x00 => Some(Self::Inactive),
            0x01 => Some(Self::DirectOverride),
            0x02 => Some(Self::PwmInput),
            0x03 => Some(Self::RealtimeWaveform),
            0x04 => Some(Self::EmbeddedWaveform),
            0x06 => Some(Self::Standby),
            _ => None,
        }
    }
}

/// Actuator type, the ACTUATOR_TYPE field of `TOP_CFG2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorType {
    /// Linear resonant actuator
    Lra = 0x00,
    /// ERM with back-EMF sensing (bar type)
    ErmBar = 0x01,
    /// ERM coin type
    ErmCoin = 0x02,
}

/// Driver for one DA7281 device
///
/// A handle pairs a bus/address with its lifecycle state. Several handles
/// may share one [`BusRegistry`]; the registry serializes devices on the
/// same bus and lets devices on different buses proceed concurrently. The
/// caller must not create two live handles with the same bus and address -
/// device identity would be undefined.
///
/// # Example
///
/// ```ignore
/// let mut haptic = Da7281Driver::new(&registry, BusId::Bus0, DeviceAddress::Addr4A, Some(pin));
/// haptic.power_on().await?;
/// haptic.init().await?;
/// haptic.configure_lra(&LraConfig::default()).await?;
/// haptic.set_operation_mode(OperationMode::DirectOverride).await?;
/// haptic.set_amplifier_enable(true).await?;
/// haptic.set_override_amplitude(200).await?;
/// ```
pub struct Da7281Driver<'r, BUS, PIN> {
    registry: &'r BusRegistry<BUS>,
    bus: BusId,
    address: DeviceAddress,
    enable_pin: Option<PIN>,
    powered: bool,
    initialized: bool,
    mode: OperationMode,
}

impl<'r, BUS, PIN, E> Da7281Driver<'r, BUS, PIN>
where
    BUS: I2c<Error = E>,
    PIN: OutputPin,
{
    /// Create a driver handle
    ///
    /// No bus traffic happens here; call [`Da7281Driver::power_on`] and
    /// [`Da7281Driver::init`] before anything else. Pass `None` as
    /// `enable_pin` on boards where the device is hard-wired to power.
    pub fn new(
        registry: &'r BusRegistry<BUS>,
        bus: BusId,
        address: DeviceAddress,
        enable_pin: Option<PIN>,
    ) -> Self {
        Self {
            registry,
            bus,
            address,
            enable_pin,
            powered: false,
            initialized: false,
            mode: OperationMode::Inactive,
        }
    }

    /// Whether the device is powered
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Whether the device has been initialized
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The last operation mode recorded by this handle
    ///
    /// Only meaningful while initialized; use
    /// [`Da7281Driver::get_operation_mode`] to query the hardware.
    pub fn recorded_mode(&self) -> OperationMode {
        self.mode
    }

    async fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<E>> {
        self.registry
            .write_register(self.bus, self.address.value(), reg, value)
            .await
    }

    async fn read_reg(&mut self, reg: u8) -> Result<u8, Error<E>> {
        self.registry
            .read_register(self.bus, self.address.value(), reg)
            .await
    }

    async fn modify_reg(&mut self, reg: u8, mask: u8, bits: u8) -> Result<(), Error<E>> {
        self.registry
            .modify_register(self.bus, self.address.value(), reg, mask, bits)
            .await
    }

    /// Power the device on
    ///
    /// Drives the enable line high and waits [`POWER_ON_SETTLE_MS`] for the
    /// supply to settle. Idempotent: a second call returns `Ok` with no GPIO
    /// or delay side effects. On handles without an enable pin (hard-wired
    /// power) only the lifecycle state changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gpio`] if the enable pin reports a failure.
    pub async fn power_on(&mut self) -> Result<(), Error<E>> {
        if self.powered {
            return Ok(());
        }

        if let Some(pin) = self.enable_pin.as_mut() {
            pin.set_high().map_err(|_| Error::Gpio)?;
            Timer::after_millis(POWER_ON_SETTLE_MS).await;
        }
        self.powered = true;

        info!("device powered on (bus {}, addr {})", self.bus.index(), self.address.value());
        Ok(())
    }

    /// Power the device off
    ///
    /// Drives the enable line low unconditionally. Always clears the
    /// initialized state - any power cycle forces a full re-init.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gpio`] if the enable pin reports a failure; the
    /// lifecycle state is cleared regardless.
    pub async fn power_off(&mut self) -> Result<(), Error<E>> {
        self.initialized = false;
        self.mode = OperationMode::Inactive;
        self.powered = false;

        if let Some(pin) = self.enable_pin.as_mut() {
            pin.set_low().map_err(|_| Error::Gpio)?;
        }

        info!("device powered off (bus {}, addr {})", self.bus.index(), self.address.value());
        Ok(())
    }

    /// Initialize the device
    ///
    /// Verifies chip identity, clears latched fault events, fixes the
    /// actuator type to LRA and forces the operation mode to
    /// [`OperationMode::Inactive`]. The fault-latch clear and the actuator
    /// type read-back are advisory: their failures are logged, not
    /// propagated. A failure while forcing the mode leaves the handle
    /// un-initialized.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] if the device is not powered
    /// - [`Error::AlreadyInitialized`] if called twice without a power cycle
    ///   or [`Da7281Driver::deinit`]
    /// - [`Error::IdentityMismatch`] if `CHIP_ID` is neither the current nor
    ///   the legacy revision value (nothing is written in that case)
    /// - bus-layer errors propagated unchanged
    pub async fn init(&mut self) -> Result<(), Error<E>> {
        if !self.powered {
            return Err(Error::NotInitialized);
        }
        if self.initialized {
            warn!("device already initialized");
            return Err(Error::AlreadyInitialized);
        }

        let chip_id = self.read_reg(regs::CHIP_ID).await?;
        if chip_id != CHIP_ID_VALUE && chip_id != CHIP_ID_LEGACY {
            error!("chip identity mismatch: expected {}, got {}", CHIP_ID_VALUE, chip_id);
            return Err(Error::IdentityMismatch(chip_id));
        }

        match self.read_reg(regs::CHIP_REV).await {
            Ok(revision) => info!("chip id {}, revision {}", chip_id, revision),
            Err(_) => warn!("failed to read chip revision"),
        }

        // Stale fault latches from a previous session would mask new events.
        if self
            .write_reg(regs::TOP_INT_STATUS, regs::TOP_INT_STATUS_CLEAR_ALL)
            .await
            .is_err()
        {
            warn!("failed to clear latched fault events");
        }

        self.modify_reg(
            regs::TOP_CFG2,
            regs::TOP_CFG2_ACTUATOR_TYPE_MASK,
            ActuatorType::Lra as u8,
        )
        .await?;

        // Read-back is advisory: the write succeeding is authoritative.
        match self.read_reg(regs::TOP_CFG2).await {
            Ok(value) => {
                let actuator = value & regs::TOP_CFG2_ACTUATOR_TYPE_MASK;
                if actuator != ActuatorType::Lra as u8 {
                    warn!("actuator type verification failed: read back {}", actuator);
                }
            }
            Err(_) => warn!("actuator type read-back failed"),
        }

        // `initialized` is still false here, so a failed mode write leaves
        // the handle rolled back rather than half-initialized.
        self.apply_mode(OperationMode::Inactive).await?;

        self.initialized = true;
        self.mode = OperationMode::Inactive;

        info!("device initialized (bus {}, addr {})", self.bus.index(), self.address.value());
        Ok(())
    }

    /// Deinitialize the device
    ///
    /// Best-effort teardown: forces [`OperationMode::Inactive`], disables
    /// the amplifier, and marks the handle not-initialized. Sub-step
    /// failures are logged but never propagated; the handle always ends
    /// not-initialized. A no-op on a handle that is not initialized.
    pub async fn deinit(&mut self) -> Result<(), Error<E>> {
        if !self.initialized {
            return Ok(());
        }

        if self.apply_mode(OperationMode::Inactive).await.is_err() {
            warn!("deinit: failed to force inactive mode");
        }
        if self
            .modify_reg(regs::TOP_CFG1, regs::TOP_CFG1_AMP_EN, 0)
            .await
            .is_err()
        {
            warn!("deinit: failed to disable amplifier");
        }

        self.initialized = false;
        self.mode = OperationMode::Inactive;

        info!("device deinitialized");
        Ok(())
    }

    /// Write the OP_MODE field and verify by read-back
    ///
    /// No lifecycle check: used by `init` before the handle is marked
    /// initialized. The read-back is advisory - a mismatch or a failed
    /// verification read is logged, not returned.
    async fn apply_mode(&mut self, mode: OperationMode) -> Result<(), Error<E>> {
        self.modify_reg(regs::TOP_CFG1, regs::TOP_CFG1_OP_MODE_MASK, mode.bits())
            .await?;

        match self.read_reg(regs::TOP_CFG1).await {
            Ok(value) => {
                let actual = value & regs::TOP_CFG1_OP_MODE_MASK;
                if actual != mode.bits() {
                    warn!(
                        "operation mode verification failed: requested {}, read back {}",
                        mode.bits(),
                        actual
                    );
                }
            }
            Err(_) => warn!("operation mode read-back failed"),
        }
        Ok(())
    }

    /// Set the operation mode
    ///
    /// Writes the 3-bit OP_MODE field of `TOP_CFG1`, leaving the other bits
    /// untouched, and verifies by an advisory read-back. The handle's
    /// recorded mode is updated only after a successful write.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] on an uninitialized handle; bus-layer
    /// errors propagated unchanged.
    pub async fn set_operation_mode(&mut self, mode: OperationMode) -> Result<(), Error<E>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        self.apply_mode(mode).await?;
        self.mode = mode;

        info!("operation mode set to {}", mode.bits());
        Ok(())
    }

    /// Read the operation mode from the device
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] on an uninitialized handle;
    /// [`Error::InvalidParameter`] if the hardware reports an undefined mode
    /// pattern; bus-layer errors propagated unchanged.
    pub async fn get_operation_mode(&mut self) -> Result<OperationMode, Error<E>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let value = self.read_reg(regs::TOP_CFG1).await?;
        OperationMode::from_bits(value & regs::TOP_CFG1_OP_MODE_MASK)
            .ok_or(Error::InvalidParameter)
    }

    /// Enable or disable the output amplifier
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] on an uninitialized handle; bus-layer
    /// errors propagated unchanged.
    pub async fn set_amplifier_enable(&mut self, enable: bool) -> Result<(), Error<E>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let bits = if enable { regs::TOP_CFG1_AMP_EN } else { 0 };
        self.modify_reg(regs::TOP_CFG1, regs::TOP_CFG1_AMP_EN, bits)
            .await?;

        if enable {
            info!("amplifier enabled");
        } else {
            info!("amplifier disabled");
        }
        Ok(())
    }

    /// Set the override amplitude (0 = off, 255 = maximum)
    ///
    /// Only takes effect while the device is in
    /// [`OperationMode::DirectOverride`]; that precondition is the caller's
    /// responsibility - violating it affects actuator behavior, not driver
    /// state.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] on an uninitialized handle; bus-layer
    /// errors propagated unchanged.
    pub async fn set_override_amplitude(&mut self, amplitude: u8) -> Result<(), Error<E>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        self.write_reg(regs::TOP_CTL2, amplitude).await?;

        debug!("override amplitude set to {}", amplitude);
        Ok(())
    }

    /// Configure the LRA parameters
    ///
    /// Validates the whole specification and computes every register code
    /// before the first write, then programs seven registers in fixed order:
    /// period (high, low), V2I factor (high, low), nominal maximum voltage,
    /// absolute maximum voltage, maximum current.
    ///
    /// The first bus failure aborts the remaining writes. The device is then
    /// partially configured - an error state requiring a full
    /// re-configuration, not a partial success.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] on an uninitialized handle;
    /// [`Error::InvalidParameter`] for an out-of-range specification (no bus
    /// traffic in that case); bus-layer errors propagated unchanged.
    pub async fn configure_lra(&mut self, config: &LraConfig) -> Result<(), Error<E>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let codes = params::register_codes(config, &regs::DATASHEET_V31)?;
        let [per_h, per_l] = codes.lra_period.to_be_bytes();
        let [v2i_h, v2i_l] = codes.v2i_factor.to_be_bytes();

        self.write_reg(regs::LRA_PER_H, per_h).await?;
        self.write_reg(regs::LRA_PER_L, per_l).await?;
        self.write_reg(regs::V2I_FACTOR_H, v2i_h).await?;
        self.write_reg(regs::V2I_FACTOR_L, v2i_l).await?;
        self.write_reg(regs::ACTUATOR_NOMMAX, codes.nom_max).await?;
        self.write_reg(regs::ACTUATOR_ABSMAX, codes.abs_max).await?;
        self.write_reg(regs::ACTUATOR_IMAX, codes.i_max).await?;

        info!(
            "LRA configured: {} Hz -> period {}, v2i {}, nommax {}, absmax {}, imax {}",
            config.resonant_freq_hz,
            codes.lra_period,
            codes.v2i_factor,
            codes.nom_max,
            codes.abs_max,
            codes.i_max
        );
        Ok(())
    }

    /// Run the built-in self-test
    ///
    /// The chip drives the actuator with a known signal and measures the
    /// response. The device is switched to [`OperationMode::Inactive`] for
    /// the duration if it is not there already, and the previous mode is
    /// restored afterwards (restore failure is a warning, never the test
    /// result).
    ///
    /// Returns `Ok(true)` on a passed test and `Ok(false)` on a
    /// completed-but-failed test - a failing actuator is a valid result,
    /// not a driver error.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] on an uninitialized handle; bus-layer
    /// errors propagated unchanged.
    pub async fn run_self_test(&mut self) -> Result<bool, Error<E>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let saved_mode = self.mode;
        if saved_mode != OperationMode::Inactive {
            self.set_operation_mode(OperationMode::Inactive).await?;
            Timer::after_millis(SELF_TEST_MODE_SETTLE_MS).await;
        }

        self.write_reg(regs::SELFTEST_CFG, regs::SELFTEST_TRIGGER)
            .await?;

        // The chip executes the test autonomously.
        Timer::after_millis(SELF_TEST_WAIT_MS).await;

        let result = self.read_reg(regs::SELFTEST_RESULT).await?;
        let passed = result == regs::SELFTEST_RESULT_PASS;

        if passed {
            info!("self-test passed");
        } else {
            warn!("self-test failed, result {}", result);
        }

        if saved_mode != OperationMode::Inactive
            && self.set_operation_mode(saved_mode).await.is_err()
        {
            warn!("failed to restore operation mode after self-test");
        }

        Ok(passed)
    }

    /// Read the `CHIP_ID` register
    ///
    /// Should return [`CHIP_ID_VALUE`] (or [`CHIP_ID_LEGACY`] on earlier
    /// silicon).
    ///
    /// # Errors
    ///
    /// Bus-layer errors propagated unchanged.
    pub async fn read_chip_id(&mut self) -> Result<u8, Error<E>> {
        self.read_reg(regs::CHIP_ID).await
    }

    /// Read the `CHIP_REV` register (major/minor nibbles)
    ///
    /// # Errors
    ///
    /// Bus-layer errors propagated unchanged.
    pub async fn read_chip_revision(&mut self) -> Result<u8, Error<E>> {
        self.read_reg(regs::CHIP_REV).await
    }
}
