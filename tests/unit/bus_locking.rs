//! Unit tests for bus sharing, serialization and lock timeouts

use da7281::registers;
use da7281::{BusId, BusRegistry, Error};
use embassy_futures::join::join;
use embassy_futures::select::{select, Either};

use crate::common::mock_bus::{MockBus, MockBusError};
use crate::common::{chip_bus, registry_with, TEST_ADDRESS};

const ADDR: u8 = 0x4A;
const SIBLING: u8 = 0x48;

#[tokio::test]
async fn modify_register_never_touches_bits_outside_the_mask() {
    let bus = MockBus::new();
    let registry = registry_with(&bus).await;

    // The documented worked example plus a few edge masks.
    let cases = [
        (0b1100_1100, 0b0011_1100, 0b0010_1000, 0b1110_1000),
        (0xFF, 0x0F, 0x00, 0xF0),
        (0x00, 0xFF, 0xA5, 0xA5),
        (0x5A, 0x00, 0xFF, 0x5A),
    ];

    for (old, mask, bits, expected) in cases {
        bus.set_register(ADDR, registers::TOP_CFG1, old);
        registry
            .modify_register(BusId::Bus0, ADDR, registers::TOP_CFG1, mask, bits)
            .await
            .unwrap();
        let result = bus.get_register(ADDR, registers::TOP_CFG1);
        assert_eq!(result, expected);
        assert_eq!(result & !mask, old & !mask);
    }
}

#[tokio::test]
async fn concurrent_modifies_on_one_bus_serialize() {
    let bus = MockBus::new();
    let registry = registry_with(&bus).await;
    bus.set_register(ADDR, registers::TOP_CFG1, 0x00);

    // Each transaction yields mid-flight; without the bus lock these two
    // read-modify-writes would interleave and one update would be lost.
    let low_nibble = registry.modify_register(BusId::Bus0, ADDR, registers::TOP_CFG1, 0x0F, 0x03);
    let high_nibble = registry.modify_register(BusId::Bus0, ADDR, registers::TOP_CFG1, 0xF0, 0x30);

    let (a, b) = join(low_nibble, high_nibble).await;
    a.unwrap();
    b.unwrap();

    assert_eq!(bus.get_register(ADDR, registers::TOP_CFG1), 0x33);
    assert!(
        !bus.overlap_detected(),
        "transactions on one bus must never interleave"
    );
}

#[tokio::test]
async fn two_devices_sharing_a_bus_serialize() {
    let bus = MockBus::new();
    let registry = registry_with(&bus).await;

    let first = registry.write_register(BusId::Bus0, ADDR, registers::TOP_CTL2, 0x40);
    let second = registry.write_register(BusId::Bus0, SIBLING, registers::TOP_CTL2, 0x80);

    let (a, b) = join(first, second).await;
    a.unwrap();
    b.unwrap();

    assert!(!bus.overlap_detected());
    assert_eq!(bus.get_register(ADDR, registers::TOP_CTL2), 0x40);
    assert_eq!(bus.get_register(SIBLING, registers::TOP_CTL2), 0x80);
}

#[tokio::test]
async fn devices_on_different_buses_proceed_concurrently() {
    let stuck_bus = MockBus::new();
    let live_bus = MockBus::new();

    let registry = BusRegistry::new();
    registry.bind(BusId::Bus0, stuck_bus.clone()).await.unwrap();
    registry.bind(BusId::Bus1, live_bus.clone()).await.unwrap();

    // Bus 0 wedges mid-transaction with its lock held; bus 1 must not care.
    stuck_bus.stall(true);

    let stuck = registry.write_register(BusId::Bus0, ADDR, registers::TOP_CTL2, 0x11);
    let live = registry.write_register(BusId::Bus1, ADDR, registers::TOP_CTL2, 0x22);

    match select(stuck, live).await {
        Either::Second(result) => {
            result.unwrap();
            assert_eq!(live_bus.get_register(ADDR, registers::TOP_CTL2), 0x22);
        }
        Either::First(_) => panic!("stalled bus completed"),
    }
}

#[tokio::test]
async fn lock_contention_times_out_distinctly() {
    let bus = chip_bus(TEST_ADDRESS);
    let registry = registry_with(&bus).await;
    bus.stall(true);

    // The holder acquires the lock and wedges inside the transport; the
    // contender must give up with LockTimeout, not a bus fault.
    let holder = registry.write_register(BusId::Bus0, ADDR, registers::TOP_CFG1, 0x01);
    let contender = registry.write_register(BusId::Bus0, ADDR, registers::TOP_CTL2, 0x40);

    match select(holder, contender).await {
        Either::Second(result) => {
            assert_eq!(result, Err(Error::LockTimeout));
        }
        Either::First(_) => panic!("stalled holder completed"),
    }
}

#[tokio::test]
async fn unbound_bus_is_rejected() {
    let registry: BusRegistry<MockBus> = BusRegistry::new();

    assert_eq!(
        registry
            .read_register(BusId::Bus1, ADDR, registers::CHIP_ID)
            .await,
        Err(Error::InvalidParameter)
    );
    assert_eq!(
        registry
            .write_register(BusId::Bus1, ADDR, registers::TOP_CTL2, 0x00)
            .await,
        Err(Error::InvalidParameter)
    );
}

#[tokio::test]
async fn bind_is_idempotent_and_keeps_the_first_transport() {
    let first = MockBus::new();
    first.set_register(ADDR, registers::CHIP_ID, 0xCA);
    let second = MockBus::new();
    second.set_register(ADDR, registers::CHIP_ID, 0x00);

    let registry = BusRegistry::new();
    registry.bind(BusId::Bus0, first.clone()).await.unwrap();
    // Another device on the same bus triggers bring-up again: no-op success.
    registry.bind(BusId::Bus0, second.clone()).await.unwrap();

    assert_eq!(
        registry
            .read_register(BusId::Bus0, ADDR, registers::CHIP_ID)
            .await,
        Ok(0xCA),
        "the transport installed first must stay in place"
    );
}

#[tokio::test]
async fn bus_fault_is_not_a_lock_timeout() {
    let bus = MockBus::new();
    let registry = registry_with(&bus).await;

    bus.fail_next_write();
    assert_eq!(
        registry
            .write_register(BusId::Bus0, ADDR, registers::TOP_CTL2, 0x01)
            .await,
        Err(Error::Bus(MockBusError::Nack))
    );

    // And the lock was released on the failure path: the next access works.
    registry
        .write_register(BusId::Bus0, ADDR, registers::TOP_CTL2, 0x02)
        .await
        .unwrap();
    assert_eq!(bus.get_register(ADDR, registers::TOP_CTL2), 0x02);
}
