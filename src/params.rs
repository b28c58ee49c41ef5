//! LRA parameter calculation
//!
//! Pure conversion from physical actuator specifications (Hz, Ω, V, mA) to
//! register codes, per the datasheet scaling laws. No bus access happens
//! here; [`crate::Da7281Driver::configure_lra`] writes the resulting
//! [`RegisterCodes`].
//!
//! All inputs are validated against the datasheet limits before anything is
//! computed, so an out-of-range specification can never produce a partial
//! result.

use libm::roundf;

use crate::registers::ScalingConstants;
use crate::Error;

/// Minimum supported resonant frequency in Hz
pub const RESONANT_FREQ_HZ_MIN: u16 = 50;
/// Maximum supported resonant frequency in Hz
pub const RESONANT_FREQ_HZ_MAX: u16 = 300;
/// Minimum supported actuator impedance in Ω
pub const IMPEDANCE_OHM_MIN: f32 = 1.0;
/// Maximum supported actuator impedance in Ω
pub const IMPEDANCE_OHM_MAX: f32 = 50.0;
/// Minimum nominal voltage in V RMS
pub const NOM_MAX_V_RMS_MIN: f32 = 0.5;
/// Maximum nominal voltage in V RMS
pub const NOM_MAX_V_RMS_MAX: f32 = 6.0;
/// Minimum absolute voltage in V peak
pub const ABS_MAX_V_PEAK_MIN: f32 = 1.0;
/// Maximum absolute voltage in V peak
pub const ABS_MAX_V_PEAK_MAX: f32 = 12.0;
/// Minimum actuator current limit in mA
pub const MAX_CURRENT_MA_MIN: u16 = 50;
/// Maximum actuator current limit in mA
pub const MAX_CURRENT_MA_MAX: u16 = 500;

/// LRA (linear resonant actuator) specification
///
/// Taken from the actuator's datasheet. Validated against the chip limits by
/// [`register_codes`] before any conversion runs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LraConfig {
    /// Resonant frequency in Hz (e.g. 170)
    pub resonant_freq_hz: u16,
    /// Coil impedance in Ω (e.g. 6.75)
    pub impedance_ohm: f32,
    /// Nominal maximum drive voltage in V RMS (e.g. 2.5)
    pub nom_max_v_rms: f32,
    /// Absolute maximum drive voltage in V peak (e.g. 3.5)
    pub abs_max_v_peak: f32,
    /// Maximum coil current in mA (e.g. 350)
    pub max_current_ma: u16,
}

impl Default for LraConfig {
    fn default() -> Self {
        Self {
            resonant_freq_hz: 170,
            impedance_ohm: 6.75,
            nom_max_v_rms: 2.5,
            abs_max_v_peak: 3.5,
            max_current_ma: 350,
        }
    }
}

/// Register codes derived from an [`LraConfig`]
///
/// Ephemeral: these exist only between calculation and the register writes;
/// the chip's registers are the durable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterCodes {
    /// `LRA_PER` - resonance period, written high byte first
    pub lra_period: u16,
    /// `V2I_FACTOR` - voltage-to-current factor, written high byte first
    pub v2i_factor: u16,
    /// `ACTUATOR_NOMMAX` - nominal maximum voltage code
    pub nom_max: u8,
    /// `ACTUATOR_ABSMAX` - absolute maximum voltage code
    pub abs_max: u8,
    /// `ACTUATOR_IMAX` - maximum current code
    pub i_max: u8,
}

/// Convert an actuator specification into register codes
///
/// Conversions, in dependency order (`IMAX` feeds the V2I factor):
///
/// - `IMAX = round((I_ma − imax_offset_ma) / imax_scale_ma)`, clamped at 0
/// - `LRA_PER = round((1 / f) / period_time_scale)`, minimum 1
/// - `V2I_FACTOR = round(Z × (IMAX + v2i_imax_offset) / v2i_divisor)`,
///   minimum 1
/// - `NOMMAX = floor(V_rms × 1000 / nommax_scale_mv)`
/// - `ABSMAX = floor(V_peak × 1000 / absmax_scale_mv)`
///
/// The voltage codes truncate rather than round: rounding up would raise the
/// limit past what the actuator is rated for.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if any field is outside the datasheet
/// limits. Validation happens before any computation.
pub fn register_codes<E>(
    config: &LraConfig,
    scale: &ScalingConstants,
) -> Result<RegisterCodes, Error<E>> {
    validate(config)?;

    let i_max_f = roundf(
        (f32::from(config.max_current_ma) - scale.imax_offset_ma) / scale.imax_scale_ma,
    );
    let i_max = if i_max_f < 0.0 { 0 } else { i_max_f as u8 };

    let period_s = 1.0 / f32::from(config.resonant_freq_hz);
    let lra_period = (roundf(period_s / scale.period_time_scale) as u16).max(1);

    let v2i_f = roundf(
        config.impedance_ohm * (f32::from(i_max) + scale.v2i_imax_offset) / scale.v2i_divisor,
    );
    let v2i_factor = (v2i_f as u16).max(1);

    // Truncating casts floor the (validated, positive) voltage codes.
    let nom_max = (config.nom_max_v_rms * 1000.0 / scale.nommax_scale_mv) as u8;
    let abs_max = (config.abs_max_v_peak * 1000.0 / scale.absmax_scale_mv) as u8;

    Ok(RegisterCodes {
        lra_period,
        v2i_factor,
        nom_max,
        abs_max,
        i_max,
    })
}

/// Check an [`LraConfig`] against the datasheet limits
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] on the first field outside its range.
pub fn validate<E>(config: &LraConfig) -> Result<(), Error<E>> {
    if config.resonant_freq_hz < RESONANT_FREQ_HZ_MIN
        || config.resonant_freq_hz > RESONANT_FREQ_HZ_MAX
    {
        return Err(Error::InvalidParameter);
    }
    if config.impedance_ohm < IMPEDANCE_OHM_MIN || config.impedance_ohm > IMPEDANCE_OHM_MAX {
        return Err(Error::InvalidParameter);
    }
    if config.nom_max_v_rms < NOM_MAX_V_RMS_MIN || config.nom_max_v_rms > NOM_MAX_V_RMS_MAX {
        return Err(Error::InvalidParameter);
    }
    if config.abs_max_v_peak < ABS_MAX_V_PEAK_MIN || config.abs_max_v_peak > ABS_MAX_V_PEAK_MAX {
        return Err(Error::InvalidParameter);
    }
    if config.max_current_ma < MAX_CURRENT_MA_MIN || config.max_current_ma > MAX_CURRENT_MA_MAX {
        return Err(Error::InvalidParameter);
    }
    Ok(())
}
