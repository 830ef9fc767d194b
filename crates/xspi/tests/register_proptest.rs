//! Property-based tests for configuration and transfer invariants.
//! Every property runs against the simulated register blocks.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use xspi::sim::{SimPort, SimSpi, SimUsart};
use xspi::spi::{receive_packet, send_packet, transfer_byte};
use xspi::{
    configure_master, mspi_baud_divisor, BindingError, MasterConfig, PeripheralBinding, SpiPins,
};

/// Four distinct bit positions in random order: (mosi, miso, sck, ss).
fn distinct_pins() -> impl Strategy<Value = (u8, u8, u8, u8)> {
    proptest::sample::subsequence((0u8..8).collect::<Vec<_>>(), 4)
        .prop_shuffle()
        .prop_map(|p| (p[0], p[1], p[2], p[3]))
}

proptest! {
    /// configure_master sets exactly the MOSI, SCK and SS direction bits and
    /// leaves every other bit of DIR as it was.
    #[test]
    fn configure_master_touches_only_output_pins(
        (mosi, miso, sck, ss) in distinct_pins(),
        initial in any::<u8>(),
    ) {
        let pins = SpiPins::new(mosi, miso, sck, ss).unwrap();
        let spi = SimSpi::loopback();
        let port = SimPort::with_dir(initial);
        configure_master(&PeripheralBinding::new(&spi, &port, pins), &MasterConfig::default());

        let outputs = (1u8 << mosi) | (1u8 << sck) | (1u8 << ss);
        prop_assert_eq!(port.dir(), initial | outputs);
        prop_assert_eq!(port.dir() & (1u8 << miso), initial & (1u8 << miso));
    }

    /// Pin layouts are accepted exactly when all four pins are in range
    /// and pairwise distinct.
    #[test]
    fn spi_pins_validation(mosi in 0u8..12, miso in 0u8..12, sck in 0u8..12, ss in 0u8..12) {
        let all = [mosi, miso, sck, ss];
        let in_range = all.iter().all(|&p| p <= 7);
        let distinct = (0..4).all(|i| (i + 1..4).all(|j| all[i] != all[j]));
        let result = SpiPins::new(mosi, miso, sck, ss);
        match result {
            Ok(_) => {
                prop_assert!(in_range && distinct);
            }
            Err(BindingError::PinOutOfRange(p)) => {
                prop_assert!(!in_range);
                prop_assert!(p > 7);
            }
            Err(BindingError::PinConflict(_)) => {
                prop_assert!(in_range && !distinct);
            }
        }
    }

    /// MISO looped to MOSI returns every byte unchanged, whatever the latency.
    #[test]
    fn loopback_transfer_identity(value in any::<u8>(), latency in 0u32..8) {
        let spi = SimSpi::loopback().with_latency(latency);
        prop_assert_eq!(transfer_byte(&spi, value), value);
    }

    /// send_packet puts every byte on the wire in order and never reads DATA.
    #[test]
    fn send_packet_preserves_order(data in proptest::collection::vec(any::<u8>(), 0..64)) {
        let spi = SimSpi::loopback().with_latency(1);
        send_packet(&spi, &data);
        let sent = spi.sent();
        prop_assert_eq!(sent.as_slice(), data.as_slice());
        prop_assert_eq!(spi.counts().data_reads, 0);
        if data.is_empty() {
            prop_assert_eq!(spi.counts().total(), 0);
        }
    }

    /// receive_packet returns the remote bytes and clocks 0xFF once per byte.
    #[test]
    fn receive_packet_returns_script(script in proptest::collection::vec(any::<u8>(), 0..64)) {
        let spi = SimSpi::scripted(&script);
        let mut buffer = vec![0u8; script.len()];
        receive_packet(&spi, &mut buffer);
        prop_assert_eq!(&buffer, &script);
        prop_assert_eq!(spi.sent().len(), script.len());
        prop_assert_eq!(spi.sent_count(0xFF), script.len());
    }

    /// A quarter-clock rate gives cpu / (2 * baud) - 1.
    #[test]
    fn baud_divisor_quarter_clock(cpu in 4u32..=32_000_000) {
        let baud = cpu / 4;
        let expected = u16::try_from(cpu / (2 * baud) - 1).unwrap();
        prop_assert_eq!(mspi_baud_divisor(cpu, baud), expected);
    }

    /// Rates at or above half the clock give divisor 0.
    #[test]
    fn baud_divisor_saturates_at_half_clock(cpu in 2u32..=32_000_000, extra in any::<u32>()) {
        let baud = (cpu / 2).saturating_add(extra);
        prop_assert_eq!(mspi_baud_divisor(cpu, baud), 0);
    }

    /// USART transfers always leave TXCIF cleared, one STATUS write per byte.
    #[test]
    fn usart_transfer_clears_txc(
        data in proptest::collection::vec(any::<u8>(), 1..32),
        latency in 0u32..4,
    ) {
        let usart = SimUsart::loopback().with_latency(latency);
        for &byte in &data {
            prop_assert_eq!(xspi::usart::transfer_byte(&usart, byte), byte);
            prop_assert!(!usart.txc_flag());
        }
        prop_assert_eq!(usart.counts().status_writes as usize, data.len());
    }
}
