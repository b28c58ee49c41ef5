//! Register definitions for the DA7281
//!
//! Addresses, bit fields and unit-scaling constants for the current register
//! map revision (datasheet v3.1). Earlier revisions of this part moved the
//! override-amplitude value and changed several scaling constants; those
//! historical maps are deliberately not represented here. All scaling
//! constants live in [`ScalingConstants`] so a future revision bump is a data
//! change, not a formula change.

/// `CHIP_ID` - device identity (read-only)
///
/// Expected to read [`crate::CHIP_ID_VALUE`] (or [`crate::CHIP_ID_LEGACY`]
/// on earlier silicon).
pub const CHIP_ID: u8 = 0x00;

/// `CHIP_REV` - silicon revision, major/minor nibbles (read-only)
pub const CHIP_REV: u8 = 0x01;

/// `TOP_INT_STATUS` - latched fault/event bits, write 1 to clear
pub const TOP_INT_STATUS: u8 = 0x09;

/// `TOP_CFG1` - operation mode and amplifier control
pub const TOP_CFG1: u8 = 0x13;

/// `TOP_CFG2` - actuator type selection
pub const TOP_CFG2: u8 = 0x14;

/// `TOP_CTL2` - override amplitude value (DRO mode)
pub const TOP_CTL2: u8 = 0x23;

/// `LRA_PER_H` - LRA resonance period, high byte
pub const LRA_PER_H: u8 = 0x96;

/// `LRA_PER_L` - LRA resonance period, low byte
pub const LRA_PER_L: u8 = 0x97;

/// `V2I_FACTOR_H` - voltage-to-current factor, high byte
pub const V2I_FACTOR_H: u8 = 0x98;

/// `V2I_FACTOR_L` - voltage-to-current factor, low byte
pub const V2I_FACTOR_L: u8 = 0x99;

/// `ACTUATOR_NOMMAX` - actuator nominal maximum voltage
pub const ACTUATOR_NOMMAX: u8 = 0x9B;

/// `ACTUATOR_ABSMAX` - actuator absolute maximum voltage
pub const ACTUATOR_ABSMAX: u8 = 0x9C;

/// `ACTUATOR_IMAX` - actuator maximum current
pub const ACTUATOR_IMAX: u8 = 0x9D;

/// `SELFTEST_CFG` - self-test configuration/trigger
pub const SELFTEST_CFG: u8 = 0xAA;

/// `SELFTEST_RESULT` - self-test result (read-only)
pub const SELFTEST_RESULT: u8 = 0xAB;

// ==================== TOP_CFG1 bit fields ====================

/// `TOP_CFG1` OP_MODE field mask, bits \[2:0\]
pub const TOP_CFG1_OP_MODE_MASK: u8 = 0x07;

/// `TOP_CFG1` amplifier enable, bit 3
pub const TOP_CFG1_AMP_EN: u8 = 0x08;

// ==================== TOP_CFG2 bit fields ====================

/// `TOP_CFG2` ACTUATOR_TYPE field mask, bits \[1:0\]
pub const TOP_CFG2_ACTUATOR_TYPE_MASK: u8 = 0x03;

// ==================== Fixed register values ====================

/// Value written to [`TOP_INT_STATUS`] to clear every latched event
pub const TOP_INT_STATUS_CLEAR_ALL: u8 = 0xFF;

/// Value written to [`SELFTEST_CFG`] to start the built-in self-test
pub const SELFTEST_TRIGGER: u8 = 0x01;

/// [`SELFTEST_RESULT`] pattern indicating a passed test; any other value is
/// a completed-but-failed test
pub const SELFTEST_RESULT_PASS: u8 = 0x01;

/// Unit-scaling constants of one register-map revision
///
/// The conversion formulas in [`crate::params`] take these by reference; the
/// constants changed between silicon revisions, so they are data, not
/// literals baked into the math.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScalingConstants {
    /// `LRA_PER` time scale in seconds per LSB
    pub period_time_scale: f32,
    /// Offset added to the `IMAX` code in the V2I factor formula
    pub v2i_imax_offset: f32,
    /// Divisor of the V2I factor formula
    pub v2i_divisor: f32,
    /// `ACTUATOR_NOMMAX` scale in mV per LSB
    pub nommax_scale_mv: f32,
    /// `ACTUATOR_ABSMAX` scale in mV per LSB
    pub absmax_scale_mv: f32,
    /// `ACTUATOR_IMAX` offset in mA
    pub imax_offset_ma: f32,
    /// `ACTUATOR_IMAX` scale in mA per LSB
    pub imax_scale_ma: f32,
}

/// Scaling constants of the current register map (datasheet v3.1)
pub const DATASHEET_V31: ScalingConstants = ScalingConstants {
    period_time_scale: 1.024e-6,
    v2i_imax_offset: 4.0,
    v2i_divisor: 1.6104,
    nommax_scale_mv: 23.4375,
    absmax_scale_mv: 48.75,
    imax_offset_ma: 28.6,
    imax_scale_ma: 7.2,
};
