//! SPI module driver
//!
//! Initialization writes the pin directions and a fully derived `CTRL`
//! value; transfers are byte-at-a-time with a blocking wait on `STATUS.IF`.
//!
//! # Example
//!
//! ```no_run
//! use xspi::mmio::{PORTC, SPIC};
//! use xspi::spi::{configure_master, transfer_byte};
//! use xspi::{MasterConfig, PeripheralBinding, SpiPins};
//!
//! let binding = PeripheralBinding::new(SPIC, PORTC, SpiPins::XMEGA);
//! configure_master(&binding, &MasterConfig::default());
//!
//! binding.select();
//! let id = transfer_byte(binding.spi(), 0x9F);
//! binding.deselect();
//! # let _ = id;
//! ```

use embedded_hal::spi::{ErrorType, SpiBus};

use crate::binding::PeripheralBinding;
use crate::config::{MasterConfig, SlaveConfig};
use crate::mmio::{PortRegisters, SpiRegisters};
use crate::registers::{FILLER_BYTE, SPI_IF_BM};
use crate::wait::{Spin, WaitStrategy};

/// Configure an SPI module as bus master.
///
/// MOSI, SCK and SS become outputs (other `DIR` bits untouched), then `CTRL`
/// is written once with enable, master, mode, clock and bit order. Calling
/// it again simply reconfigures.
pub fn configure_master<S, P>(binding: &PeripheralBinding<S, P>, config: &MasterConfig)
where
    S: SpiRegisters,
    P: PortRegisters,
{
    let pins = binding.pins();
    let outputs = pins.mosi().mask() | pins.sck().mask() | pins.ss().mask();
    binding.port().dir_set(outputs);
    binding.spi().write_ctrl(config.ctrl_value());

    #[cfg(feature = "defmt")]
    defmt::trace!("xspi: DIRSET {=u8:#b}", outputs);

    #[cfg(feature = "defmt")]
    defmt::debug!("xspi: master CTRL={=u8:#x} ({})", config.ctrl_value(), config);
}

/// Configure an SPI module as bus slave.
///
/// MISO becomes an output, SCK and SS become inputs, then `CTRL` is written
/// with enable, mode and bit order.
pub fn configure_slave<S, P>(binding: &PeripheralBinding<S, P>, config: &SlaveConfig)
where
    S: SpiRegisters,
    P: PortRegisters,
{
    let pins = binding.pins();
    let inputs = pins.sck().mask() | pins.ss().mask();
    binding.port().dir_set(pins.miso().mask());
    binding.port().dir_clear(inputs);
    binding.spi().write_ctrl(config.ctrl_value());

    #[cfg(feature = "defmt")]
    defmt::trace!("xspi: DIRSET {=u8:#b} DIRCLR {=u8:#b}", pins.miso().mask(), inputs);

    #[cfg(feature = "defmt")]
    defmt::debug!("xspi: slave CTRL={=u8:#x} ({})", config.ctrl_value(), config);
}

/// Blocking transfers over one SPI module.
///
/// `W` decides how completion is awaited: [`Spin`] never fails, a
/// [`crate::BoundedSpin`] turns a stuck peripheral into an error.
#[derive(Debug)]
pub struct SpiDriver<S, W = Spin> {
    spi: S,
    wait: W,
}

impl<S: SpiRegisters> SpiDriver<S, Spin> {
    /// Driver with an unbounded completion wait.
    pub const fn new(spi: S) -> Self {
        Self { spi, wait: Spin }
    }
}

impl<S: SpiRegisters, W: WaitStrategy> SpiDriver<S, W> {
    /// Driver with a custom completion wait.
    pub const fn with_wait(spi: S, wait: W) -> Self {
        Self { spi, wait }
    }

    /// Underlying register block.
    pub fn registers(&self) -> &S {
        &self.spi
    }

    /// Give back the register block.
    pub fn release(self) -> S {
        self.spi
    }

    fn wait_complete(&mut self) -> Result<(), W::Error> {
        let spi = &self.spi;
        self.wait.wait_until(|| spi.read_status() & SPI_IF_BM != 0)
    }

    /// Shift `value` out and return the byte shifted in.
    ///
    /// # Errors
    ///
    /// Whatever the wait strategy reports when `STATUS.IF` does not rise.
    pub fn transfer_byte(&mut self, value: u8) -> Result<u8, W::Error> {
        self.spi.write_data(value);
        self.wait_complete()?;
        Ok(self.spi.read_data())
    }

    /// Send every byte of `data` in order, discarding what comes back.
    ///
    /// An empty slice touches no register.
    ///
    /// # Errors
    ///
    /// Stops at the first byte whose completion wait fails.
    pub fn send_packet(&mut self, data: &[u8]) -> Result<(), W::Error> {
        for &byte in data {
            self.spi.write_data(byte);
            self.wait_complete()?;
        }
        Ok(())
    }

    /// Fill `buffer` by clocking out [`FILLER_BYTE`] once per slot.
    ///
    /// An empty slice touches no register.
    ///
    /// # Errors
    ///
    /// Stops at the first byte whose completion wait fails; earlier slots
    /// hold their received bytes.
    pub fn receive_packet(&mut self, buffer: &mut [u8]) -> Result<(), W::Error> {
        for slot in buffer.iter_mut() {
            *slot = self.transfer_byte(FILLER_BYTE)?;
        }
        Ok(())
    }
}

/// [`SpiDriver::transfer_byte`] with an unbounded wait.
pub fn transfer_byte<S: SpiRegisters>(spi: &S, value: u8) -> u8 {
    match SpiDriver::new(spi).transfer_byte(value) {
        Ok(byte) => byte,
        Err(never) => match never {},
    }
}

/// [`SpiDriver::send_packet`] with an unbounded wait.
pub fn send_packet<S: SpiRegisters>(spi: &S, data: &[u8]) {
    match SpiDriver::new(spi).send_packet(data) {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// [`SpiDriver::receive_packet`] with an unbounded wait.
pub fn receive_packet<S: SpiRegisters>(spi: &S, buffer: &mut [u8]) {
    match SpiDriver::new(spi).receive_packet(buffer) {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

impl<S: SpiRegisters, W: WaitStrategy> ErrorType for SpiDriver<S, W> {
    type Error = W::Error;
}

impl<S: SpiRegisters, W: WaitStrategy> SpiBus<u8> for SpiDriver<S, W> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.receive_packet(words)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.send_packet(words)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        for i in 0..read.len().max(write.len()) {
            let out = write.get(i).copied().unwrap_or(FILLER_BYTE);
            let received = self.transfer_byte(out)?;
            if let Some(slot) = read.get_mut(i) {
                *slot = received;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for word in words.iter_mut() {
            *word = self.transfer_byte(*word)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        // Every transfer already waited for IF.
        Ok(())
    }
}
