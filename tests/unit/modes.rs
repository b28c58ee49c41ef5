//! Unit tests for operation mode, amplifier and amplitude control

use da7281::registers;
use da7281::{BusId, Da7281Driver, Error, OperationMode};

use crate::common::{chip_bus, powered_initialized, registry_with, MockPin, TEST_ADDRESS};

#[tokio::test]
async fn set_mode_requires_initialization() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = Da7281Driver::new(&registry, BusId::Bus0, TEST_ADDRESS, Some(MockPin::new()));

    for mode in [
        OperationMode::Inactive,
        OperationMode::DirectOverride,
        OperationMode::PwmInput,
        OperationMode::RealtimeWaveform,
        OperationMode::EmbeddedWaveform,
        OperationMode::Standby,
    ] {
        assert_eq!(
            device.set_operation_mode(mode).await,
            Err(Error::NotInitialized)
        );
    }
}

#[tokio::test]
async fn set_mode_writes_field_and_records_mode() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = powered_initialized(&registry).await;

    device
        .set_operation_mode(OperationMode::DirectOverride)
        .await
        .unwrap();

    assert_eq!(device.recorded_mode(), OperationMode::DirectOverride);
    assert_eq!(
        bus.get_register(TEST_ADDRESS.value(), registers::TOP_CFG1)
            & registers::TOP_CFG1_OP_MODE_MASK,
        OperationMode::DirectOverride.bits()
    );
}

#[tokio::test]
async fn set_mode_leaves_bits_outside_the_field_alone() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = powered_initialized(&registry).await;

    // Amplifier + tracking bits set by someone else.
    bus.set_register(TEST_ADDRESS.value(), registers::TOP_CFG1, 0xF8);

    device
        .set_operation_mode(OperationMode::Standby)
        .await
        .unwrap();

    assert_eq!(
        bus.get_register(TEST_ADDRESS.value(), registers::TOP_CFG1),
        0xF8 | OperationMode::Standby.bits()
    );
}

#[tokio::test]
async fn set_mode_survives_a_failed_verification_read() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = powered_initialized(&registry).await;

    // Reads during set_operation_mode: #0 the RMW read, #1 the advisory
    // verification read. Fail the verification only.
    bus.fail_read_in(1);

    device
        .set_operation_mode(OperationMode::PwmInput)
        .await
        .unwrap();
    assert_eq!(device.recorded_mode(), OperationMode::PwmInput);
}

#[tokio::test]
async fn get_mode_reads_the_hardware_field() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = powered_initialized(&registry).await;

    device
        .set_operation_mode(OperationMode::EmbeddedWaveform)
        .await
        .unwrap();
    assert_eq!(
        device.get_operation_mode().await,
        Ok(OperationMode::EmbeddedWaveform)
    );
}

#[tokio::test]
async fn get_mode_rejects_undefined_patterns() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = powered_initialized(&registry).await;

    for undefined in [0x05, 0x07] {
        bus.set_register(TEST_ADDRESS.value(), registers::TOP_CFG1, undefined);
        assert_eq!(
            device.get_operation_mode().await,
            Err(Error::InvalidParameter)
        );
        // The handle's recorded mode is untouched by the bad read.
        assert_eq!(device.recorded_mode(), OperationMode::Inactive);
    }
}

#[tokio::test]
async fn get_mode_requires_initialization() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = Da7281Driver::new(&registry, BusId::Bus0, TEST_ADDRESS, Some(MockPin::new()));

    assert_eq!(device.get_operation_mode().await, Err(Error::NotInitialized));
}

#[tokio::test]
async fn amplifier_enable_toggles_one_bit() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = powered_initialized(&registry).await;

    bus.set_register(TEST_ADDRESS.value(), registers::TOP_CFG1, 0x01);

    device.set_amplifier_enable(true).await.unwrap();
    assert_eq!(
        bus.get_register(TEST_ADDRESS.value(), registers::TOP_CFG1),
        0x01 | registers::TOP_CFG1_AMP_EN
    );

    device.set_amplifier_enable(false).await.unwrap();
    assert_eq!(
        bus.get_register(TEST_ADDRESS.value(), registers::TOP_CFG1),
        0x01
    );
}

#[tokio::test]
async fn override_amplitude_writes_the_control_register() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = powered_initialized(&registry).await;

    for amplitude in [0u8, 128, 255] {
        device.set_override_amplitude(amplitude).await.unwrap();
        assert_eq!(
            bus.get_register(TEST_ADDRESS.value(), registers::TOP_CTL2),
            amplitude
        );
    }
}

#[tokio::test]
async fn override_amplitude_requires_initialization() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    let mut device = Da7281Driver::new(&registry, BusId::Bus0, TEST_ADDRESS, Some(MockPin::new()));

    assert_eq!(
        device.set_override_amplitude(128).await,
        Err(Error::NotInitialized)
    );
}
