//! USART in master SPI mode
//!
//! An XMEGA USART with `CMODE = MSPI` acts as an SPI master: XCK is SCK,
//! TxD is MOSI and RxD is MISO. Unlike the SPI module it has a transmit
//! buffer, so [`UsartDriver::send_byte`] only waits for buffer space
//! (`DREIF`) while [`UsartDriver::transfer_byte`] waits for the whole frame
//! (`TXCIF`) and must clear that flag itself.

use embedded_hal::spi::{ErrorType, SpiBus};

use crate::binding::UsartBinding;
use crate::config::UsartSpiConfig;
use crate::mmio::{PortRegisters, UsartRegisters};
use crate::registers::{
    FILLER_BYTE, PORT_INVEN_BM, USART_DREIF_BM, USART_RXCIF_BM, USART_RXEN_BM, USART_TXCIF_BM,
    USART_TXEN_BM,
};
use crate::wait::{Spin, WaitStrategy};

/// Configure a USART as SPI bus master.
///
/// XCK and TxD become outputs and RxD an input. Clock polarity goes to the
/// XCK pin's `INVEN` bit (set for modes 2 and 3). The baud divisor is
/// written high byte first, then `CTRLC` selects MSPI with phase and bit
/// order, and finally `CTRLB` enables receiver and transmitter.
pub fn configure_usart_master<U, P>(binding: &UsartBinding<U, P>, config: &UsartSpiConfig)
where
    U: UsartRegisters,
    P: PortRegisters,
{
    let pins = binding.pins();
    let port = binding.port();
    let outputs = pins.xck().mask() | pins.txd().mask();
    port.dir_set(outputs);
    port.dir_clear(pins.rxd().mask());

    #[cfg(feature = "defmt")]
    defmt::trace!("xspi: DIRSET {=u8:#b} DIRCLR {=u8:#b}", outputs, pins.rxd().mask());

    let xck_ctrl = port.read_pin_ctrl(pins.xck());
    let xck_ctrl = if config.mode.idle_high() {
        xck_ctrl | PORT_INVEN_BM
    } else {
        xck_ctrl & !PORT_INVEN_BM
    };
    port.write_pin_ctrl(pins.xck(), xck_ctrl);

    let [high, low] = config.baud_divisor().to_be_bytes();
    let usart = binding.usart();
    usart.write_baudctrlb(high);
    usart.write_baudctrla(low);
    usart.write_ctrlc(config.ctrlc_value());
    usart.write_ctrlb(USART_RXEN_BM | USART_TXEN_BM);

    #[cfg(feature = "defmt")]
    defmt::debug!(
        "xspi: usart mspi BSEL={=u16} (~{=u32} Hz) CTRLC={=u8:#x}",
        config.baud_divisor(),
        config.actual_baud(),
        config.ctrlc_value()
    );
}

/// Blocking transfers over a USART in master SPI mode.
#[derive(Debug)]
pub struct UsartDriver<U, W = Spin> {
    usart: U,
    wait: W,
    // A byte went out through the transmit buffer without a TXCIF wait.
    tx_pending: bool,
}

impl<U: UsartRegisters> UsartDriver<U, Spin> {
    /// Driver with an unbounded completion wait.
    pub const fn new(usart: U) -> Self {
        Self::with_wait(usart, Spin)
    }
}

impl<U: UsartRegisters, W: WaitStrategy> UsartDriver<U, W> {
    /// Driver with a custom completion wait.
    pub const fn with_wait(usart: U, wait: W) -> Self {
        Self {
            usart,
            wait,
            tx_pending: false,
        }
    }

    /// Underlying register block.
    pub fn registers(&self) -> &U {
        &self.usart
    }

    /// Give back the register block.
    pub fn release(self) -> U {
        self.usart
    }

    fn wait_status(&mut self, flag: u8) -> Result<(), W::Error> {
        let usart = &self.usart;
        self.wait.wait_until(|| usart.read_status() & flag != 0)
    }

    /// Shift `value` out, wait for the frame to finish and return the byte
    /// shifted in. `TXCIF` is cleared before returning.
    ///
    /// # Errors
    ///
    /// Whatever the wait strategy reports when `TXCIF` does not rise.
    pub fn transfer_byte(&mut self, value: u8) -> Result<u8, W::Error> {
        self.usart.write_data(value);
        self.wait_status(USART_TXCIF_BM)?;
        self.usart.write_status(USART_TXCIF_BM);
        Ok(self.usart.read_data())
    }

    /// Queue `value` as soon as the transmit buffer has room.
    ///
    /// Returns without waiting for the frame; the received byte stays in
    /// the receive buffer. `TXCIF` is cleared after the write, so the next
    /// time it rises it marks the end of this frame.
    ///
    /// # Errors
    ///
    /// Whatever the wait strategy reports when `DREIF` does not rise.
    pub fn send_byte(&mut self, value: u8) -> Result<(), W::Error> {
        self.wait_status(USART_DREIF_BM)?;
        // TXCIF is cleared only once DATA holds the new frame.
        self.usart.write_data(value);
        self.usart.write_status(USART_TXCIF_BM);
        self.tx_pending = true;
        Ok(())
    }

    /// Clock in one byte by sending [`FILLER_BYTE`].
    ///
    /// # Errors
    ///
    /// See [`Self::transfer_byte`].
    pub fn get_byte(&mut self) -> Result<u8, W::Error> {
        self.transfer_byte(FILLER_BYTE)
    }

    /// [`Self::send_byte`] for every byte of `data`, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first byte whose wait fails.
    pub fn send_packet(&mut self, data: &[u8]) -> Result<(), W::Error> {
        for &byte in data {
            self.send_byte(byte)?;
        }
        Ok(())
    }

    /// [`Self::get_byte`] for every slot of `buffer`, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first byte whose wait fails.
    pub fn get_packet(&mut self, buffer: &mut [u8]) -> Result<(), W::Error> {
        for slot in buffer.iter_mut() {
            *slot = self.get_byte()?;
        }
        Ok(())
    }

    /// Wait out queued frames and discard the bytes they shifted in.
    fn drain(&mut self) -> Result<(), W::Error> {
        if self.tx_pending {
            self.wait_status(USART_TXCIF_BM)?;
            self.usart.write_status(USART_TXCIF_BM);
            self.tx_pending = false;
        }
        while self.usart.read_status() & USART_RXCIF_BM != 0 {
            let _ = self.usart.read_data();
        }
        Ok(())
    }
}

/// [`UsartDriver::transfer_byte`] with an unbounded wait.
pub fn transfer_byte<U: UsartRegisters>(usart: &U, value: u8) -> u8 {
    match UsartDriver::new(usart).transfer_byte(value) {
        Ok(byte) => byte,
        Err(never) => match never {},
    }
}

/// [`UsartDriver::send_byte`] with an unbounded wait.
pub fn send_byte<U: UsartRegisters>(usart: &U, value: u8) {
    match UsartDriver::new(usart).send_byte(value) {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// [`UsartDriver::get_byte`] with an unbounded wait.
pub fn get_byte<U: UsartRegisters>(usart: &U) -> u8 {
    match UsartDriver::new(usart).get_byte() {
        Ok(byte) => byte,
        Err(never) => match never {},
    }
}

/// [`UsartDriver::send_packet`] with an unbounded wait.
pub fn send_packet<U: UsartRegisters>(usart: &U, data: &[u8]) {
    match UsartDriver::new(usart).send_packet(data) {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// [`UsartDriver::get_packet`] with an unbounded wait.
pub fn get_packet<U: UsartRegisters>(usart: &U, buffer: &mut [u8]) {
    match UsartDriver::new(usart).get_packet(buffer) {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

impl<U: UsartRegisters, W: WaitStrategy> ErrorType for UsartDriver<U, W> {
    type Error = W::Error;
}

/// Writes are pipelined through the transmit buffer; every read-side
/// operation flushes first so stale receive bytes never leak into it.
impl<U: UsartRegisters, W: WaitStrategy> SpiBus<u8> for UsartDriver<U, W> {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.drain()?;
        self.get_packet(words)
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.send_packet(words)
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.drain()?;
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
        self.drain()?;
        for word in words.iter_mut() {
            *word = self.transfer_byte(*word)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.drain()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::binding::UsartPins;
    use crate::config::{BitOrder, SpiMode};
    use crate::registers::{USART_CMODE_MSPI_GC, USART_UCPHA_BM, USART_UDORD_BM};
    use crate::sim::{SimPort, SimUsart};
    use crate::wait::{BoundedSpin, TransferError};

    fn config(mode: SpiMode) -> UsartSpiConfig {
        UsartSpiConfig {
            mode,
            ..UsartSpiConfig::default()
        }
    }

    #[test]
    fn configure_sets_pins_baud_and_control() {
        let usart = SimUsart::loopback();
        let port = SimPort::with_dir(0b0000_0100);
        let binding = UsartBinding::new(&usart, &port, UsartPins::USART0);
        let config = UsartSpiConfig {
            mode: SpiMode::Mode1,
            bit_order: BitOrder::LsbFirst,
            baud_rate: 4_000_000,
            cpu_hz: 32_000_000,
        };

        configure_usart_master(&binding, &config);

        // XCK=1 and TXD=3 outputs, RXD=2 input.
        assert_eq!(port.dir(), 0b0000_1010);
        assert_eq!(usart.baud_divisor(), 3);
        assert_eq!(
            usart.ctrlc(),
            USART_CMODE_MSPI_GC | USART_UCPHA_BM | USART_UDORD_BM
        );
        assert_eq!(usart.ctrlb(), USART_RXEN_BM | USART_TXEN_BM);
        assert_eq!(port.pin_ctrl(UsartPins::USART0.xck()) & PORT_INVEN_BM, 0);
    }

    #[test]
    fn idle_high_modes_invert_xck() {
        for mode in SpiMode::ALL {
            let usart = SimUsart::loopback();
            let port = SimPort::new();
            let binding = UsartBinding::new(&usart, &port, UsartPins::USART1);
            configure_usart_master(&binding, &config(mode));

            let inverted = port.pin_ctrl(UsartPins::USART1.xck()) & PORT_INVEN_BM != 0;
            assert_eq!(inverted, mode.idle_high(), "{mode:?}");
        }
    }

    #[test]
    fn reconfiguring_to_idle_low_clears_inversion() {
        let usart = SimUsart::loopback();
        let port = SimPort::new();
        let binding = UsartBinding::new(&usart, &port, UsartPins::USART0);
        configure_usart_master(&binding, &config(SpiMode::Mode3));
        configure_usart_master(&binding, &config(SpiMode::Mode0));
        assert_eq!(port.pin_ctrl(UsartPins::USART0.xck()), 0);
    }

    #[test]
    fn zero_baud_uses_slowest_divisor() {
        let usart = SimUsart::loopback();
        let port = SimPort::new();
        let binding = UsartBinding::new(&usart, &port, UsartPins::USART0);
        let slow = UsartSpiConfig {
            baud_rate: 0,
            ..UsartSpiConfig::default()
        };
        configure_usart_master(&binding, &slow);
        assert_eq!(usart.baud_divisor(), 0xFFFF);
    }

    #[test]
    fn transfer_byte_clears_txc_once() {
        let usart = SimUsart::scripted(&[0x3C]).with_latency(2);
        let byte = transfer_byte(&usart, 0x81);
        assert_eq!(byte, 0x3C);
        assert!(!usart.txc_flag());
        assert_eq!(usart.counts().status_writes, 1);
    }

    #[test]
    fn send_byte_waits_only_for_buffer_space() {
        let usart = SimUsart::loopback().with_latency(100);
        send_byte(&usart, 0x01);
        assert_eq!(usart.counts().status_reads, 1);
        assert_eq!(usart.counts().status_writes, 1);
        assert!(!usart.txc_flag(), "frame still shifting");
    }

    #[test]
    fn send_byte_clears_txc_left_by_earlier_frame() {
        let usart = SimUsart::loopback().with_latency(3);
        send_byte(&usart, 0x01);
        for _ in 0..4 {
            usart.read_status();
        }
        assert!(usart.txc_flag(), "first frame done");
        send_byte(&usart, 0x02);
        assert!(!usart.txc_flag());
    }

    #[test]
    fn get_packet_sends_filler() {
        let usart = SimUsart::scripted(&[1, 2, 3]);
        let mut buffer = [0u8; 3];
        get_packet(&usart, &mut buffer);
        assert_eq!(buffer, [1, 2, 3]);
        assert_eq!(usart.sent().as_slice(), &[FILLER_BYTE; 3]);
    }

    #[test]
    fn bounded_wait_reports_stuck_frame() {
        let usart = SimUsart::loopback().stuck();
        let mut driver = UsartDriver::with_wait(&usart, BoundedSpin::new(8));
        assert_eq!(driver.transfer_byte(0x00), Err(TransferError::Timeout));
        assert_eq!(usart.counts().status_writes, 0);
    }

    #[test]
    fn bus_write_then_flush_leaves_nothing_behind() {
        let usart = SimUsart::loopback();
        let mut driver = UsartDriver::new(&usart);
        SpiBus::write(&mut driver, &[0x11, 0x22, 0x33]).unwrap();
        SpiBus::flush(&mut driver).unwrap();
        assert_eq!(usart.sent().as_slice(), &[0x11, 0x22, 0x33]);
        assert!(!usart.txc_flag());
        assert_eq!(usart.rx_pending(), 0);
    }

    #[test]
    fn bus_read_after_write_ignores_stale_bytes() {
        let usart = SimUsart::scripted(&[0xEE, 0xEE, 0x42]);
        let mut driver = UsartDriver::new(&usart);
        SpiBus::write(&mut driver, &[0x01, 0x02]).unwrap();
        let mut read = [0u8; 1];
        SpiBus::read(&mut driver, &mut read).unwrap();
        assert_eq!(read, [0x42]);
    }

    #[test]
    fn flush_without_pending_write_returns() {
        let usart = SimUsart::loopback();
        let mut driver = UsartDriver::new(&usart);
        driver.transfer_byte(0x00).unwrap();
        SpiBus::flush(&mut driver).unwrap();
        assert_eq!(usart.counts().status_writes, 1);
    }
}
