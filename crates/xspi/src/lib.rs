//! Blocking SPI drivers for AVR XMEGA microcontrollers
//!
//! Two ways to run an SPI bus as master on an XMEGA A-series part:
//!
//! - the dedicated **SPI module** (`SPIC`..`SPIF`), master or slave, clocked
//!   by a fixed prescaler;
//! - a **USART in master SPI mode** (`USARTC0`..`USARTF0`), master only, with
//!   a 16-bit baud divisor and a one-byte transmit buffer.
//!
//! # Architecture
//!
//! ```text
//! spi / usart      configure_*, *Driver, SpiBus impls
//!      ↓
//! wait             WaitStrategy (Spin, BoundedSpin)
//!      ↓
//! mmio             SpiRegisters / UsartRegisters / PortRegisters
//!      ↓
//! volatile MMIO (SpiBlock, UsartBlock, PortBlock)  |  sim (host model)
//! ```
//!
//! Every operation busy-waits on a status flag. With the default [`Spin`]
//! wait a peripheral that never completes hangs the caller; use
//! [`BoundedSpin`] to turn that into [`TransferError::Timeout`].
//!
//! # Features
//!
//! - `defmt`: `defmt::Format` derives and configuration logging
//!
//! # Example
//!
//! ```no_run
//! use xspi::mmio::{PORTD, USARTD0};
//! use xspi::{configure_usart_master, SpiMode, UsartBinding, UsartDriver, UsartPins, UsartSpiConfig};
//!
//! let binding = UsartBinding::new(USARTD0, PORTD, UsartPins::USART0);
//! configure_usart_master(
//!     &binding,
//!     &UsartSpiConfig {
//!         mode: SpiMode::Mode3,
//!         ..UsartSpiConfig::default()
//!     },
//! );
//!
//! let mut bus = UsartDriver::new(USARTD0);
//! let _ = bus.send_packet(&[0x02, 0x00, 0x10]);
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)]
// Pedantic lints suppressed for this register-level crate:
#![allow(clippy::doc_markdown)] // register and bit names in doc comments
#![allow(clippy::must_use_candidate)] // register accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod binding;
pub mod config;
pub mod mmio;
pub mod registers;
pub mod sim;
pub mod spi;
pub mod usart;
pub mod wait;

pub use binding::{BindingError, PeripheralBinding, Pin, SpiPins, UsartBinding, UsartPins};
pub use config::{
    mspi_baud_divisor, BitOrder, MasterConfig, Prescaler, SlaveConfig, SpiClock, SpiMode,
    UsartSpiConfig, DEFAULT_BAUD_RATE, DEFAULT_CPU_HZ,
};
pub use mmio::{PortRegisters, SpiRegisters, UsartRegisters};
pub use spi::{configure_master, configure_slave, SpiDriver};
pub use usart::{configure_usart_master, UsartDriver};
pub use wait::{BoundedSpin, Spin, TransferError, WaitStrategy};
