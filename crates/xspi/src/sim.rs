//! Host-side register models
//!
//! This module provides simulated SPI, USART and PORT blocks implementing
//! the [`crate::mmio`] traits with the same bit-level semantics as the
//! silicon, for use in unit and integration tests:
//!
//! - SPI `STATUS.IF` sets a configurable number of polls after a `DATA`
//!   write and auto-clears on the first `DATA` access after it was observed.
//! - USART `STATUS.TXCIF` is write-one-to-clear and never auto-clears;
//!   `DREIF` follows a two-deep transmit pipeline (buffer + shifter); received
//!   bytes land in a two-deep FIFO.
//! - PORT `DIRSET`/`DIRCLR`/`OUTSET`/`OUTCLR` act on `DIR`/`OUT` bit-wise.
//!
//! Every model counts register accesses so tests can assert that an
//! operation touched nothing at all.

use core::cell::{Cell, RefCell};

use heapless::{Deque, Vec};

use crate::binding::Pin;
use crate::mmio::{PortRegisters, SpiRegisters, UsartRegisters};
use crate::registers::*;

/// Bytes kept in a transfer log or response script.
pub const SIM_CAPACITY: usize = 256;

/// Level MISO idles at once a response script runs dry.
pub const IDLE_LINE: u8 = 0xFF;

/// What the remote side drives onto MISO during each transfer.
#[derive(Debug, Clone)]
pub enum Response {
    /// MISO wired to MOSI: every byte comes straight back
    Loopback,
    /// Successive transfers return successive bytes, then [`IDLE_LINE`]
    Script(Deque<u8, SIM_CAPACITY>),
}

impl Response {
    /// Script from a slice; bytes past [`SIM_CAPACITY`] are dropped.
    pub fn script(bytes: &[u8]) -> Self {
        let mut queue = Deque::new();
        for &byte in bytes {
            let _ = queue.push_back(byte);
        }
        Self::Script(queue)
    }

    fn next(&mut self, outgoing: u8) -> u8 {
        match self {
            Self::Loopback => outgoing,
            Self::Script(queue) => queue.pop_front().unwrap_or(IDLE_LINE),
        }
    }
}

// ---------------------------------------------------------------------------
// SPI
// ---------------------------------------------------------------------------

/// Register access counters for [`SimSpi`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpiAccessCounts {
    /// `CTRL` reads
    pub ctrl_reads: u32,
    /// `CTRL` writes
    pub ctrl_writes: u32,
    /// `STATUS` reads
    pub status_reads: u32,
    /// `DATA` reads
    pub data_reads: u32,
    /// `DATA` writes
    pub data_writes: u32,
}

impl SpiAccessCounts {
    /// Sum of all accesses.
    pub fn total(&self) -> u32 {
        self.ctrl_reads
            .saturating_add(self.ctrl_writes)
            .saturating_add(self.status_reads)
            .saturating_add(self.data_reads)
            .saturating_add(self.data_writes)
    }
}

/// Simulated SPI module
#[derive(Debug)]
pub struct SimSpi {
    ctrl: Cell<u8>,
    status: Cell<u8>,
    data: Cell<u8>,
    // Incoming byte and remaining busy polls of the transfer in flight.
    shifting: Cell<Option<(u8, u32)>>,
    if_observed: Cell<bool>,
    latency: u32,
    stuck: bool,
    response: RefCell<Response>,
    sent: RefCell<Vec<u8, SIM_CAPACITY>>,
    counts: Cell<SpiAccessCounts>,
}

impl SimSpi {
    fn with_response(response: Response) -> Self {
        Self {
            ctrl: Cell::new(0),
            status: Cell::new(0),
            data: Cell::new(0),
            shifting: Cell::new(None),
            if_observed: Cell::new(false),
            latency: 0,
            stuck: false,
            response: RefCell::new(response),
            sent: RefCell::new(Vec::new()),
            counts: Cell::new(SpiAccessCounts::default()),
        }
    }

    /// MISO looped back to MOSI.
    pub fn loopback() -> Self {
        Self::with_response(Response::Loopback)
    }

    /// Remote side answers with `bytes`, in order.
    pub fn scripted(bytes: &[u8]) -> Self {
        Self::with_response(Response::script(bytes))
    }

    /// Report "busy" for `polls` status reads before each completion.
    #[must_use]
    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency = polls;
        self
    }

    /// Never complete a transfer (unclocked or unpowered peripheral).
    #[must_use]
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Current `CTRL` contents.
    pub fn ctrl(&self) -> u8 {
        self.ctrl.get()
    }

    /// `STATUS.IF`, without counting as a register read.
    pub fn if_flag(&self) -> bool {
        self.status.get() & SPI_IF_BM != 0
    }

    /// Every byte written to `DATA`, in order.
    pub fn sent(&self) -> Vec<u8, SIM_CAPACITY> {
        self.sent.borrow().clone()
    }

    /// Number of `DATA` writes carrying `value`.
    pub fn sent_count(&self, value: u8) -> usize {
        self.sent.borrow().iter().filter(|&&b| b == value).count()
    }

    /// Register access counters.
    pub fn counts(&self) -> SpiAccessCounts {
        self.counts.get()
    }

    fn count(&self, update: impl FnOnce(&mut SpiAccessCounts)) {
        let mut counts = self.counts.get();
        update(&mut counts);
        self.counts.set(counts);
    }

    // IF clears on a DATA access once STATUS has been read with IF set.
    fn data_access(&self) {
        if self.if_observed.get() {
            self.status.set(self.status.get() & !SPI_IF_BM);
            self.if_observed.set(false);
        }
    }
}

impl SpiRegisters for SimSpi {
    fn read_ctrl(&self) -> u8 {
        self.count(|c| c.ctrl_reads = c.ctrl_reads.saturating_add(1));
        self.ctrl.get()
    }

    fn write_ctrl(&self, value: u8) {
        self.count(|c| c.ctrl_writes = c.ctrl_writes.saturating_add(1));
        self.ctrl.set(value);
    }

    fn read_status(&self) -> u8 {
        self.count(|c| c.status_reads = c.status_reads.saturating_add(1));
        if let Some((incoming, busy)) = self.shifting.get() {
            if self.stuck {
                // Flag never rises.
            } else if busy == 0 {
                self.data.set(incoming);
                self.status.set(self.status.get() | SPI_IF_BM);
                self.shifting.set(None);
            } else {
                self.shifting.set(Some((incoming, busy.saturating_sub(1))));
            }
        }
        let status = self.status.get();
        if status & SPI_IF_BM != 0 {
            self.if_observed.set(true);
        }
        status
    }

    fn read_data(&self) -> u8 {
        self.count(|c| c.data_reads = c.data_reads.saturating_add(1));
        self.data_access();
        self.data.get()
    }

    fn write_data(&self, value: u8) {
        self.count(|c| c.data_writes = c.data_writes.saturating_add(1));
        self.data_access();
        let _ = self.sent.borrow_mut().push(value);
        let incoming = self.response.borrow_mut().next(value);
        self.shifting.set(Some((incoming, self.latency)));
    }
}

// ---------------------------------------------------------------------------
// USART
// ---------------------------------------------------------------------------

/// Register access counters for [`SimUsart`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsartAccessCounts {
    /// `STATUS` reads
    pub status_reads: u32,
    /// `STATUS` writes (flag clears)
    pub status_writes: u32,
    /// `DATA` reads
    pub data_reads: u32,
    /// `DATA` writes
    pub data_writes: u32,
    /// `CTRLB`, `CTRLC` and `BAUDCTRLA/B` writes
    pub config_writes: u32,
}

impl UsartAccessCounts {
    /// Sum of all accesses.
    pub fn total(&self) -> u32 {
        self.status_reads
            .saturating_add(self.status_writes)
            .saturating_add(self.data_reads)
            .saturating_add(self.data_writes)
            .saturating_add(self.config_writes)
    }
}

/// Simulated USART module in master SPI mode
#[derive(Debug)]
pub struct SimUsart {
    ctrlb: Cell<u8>,
    ctrlc: Cell<u8>,
    baudctrla: Cell<u8>,
    baudctrlb: Cell<u8>,
    txc: Cell<bool>,
    // Transmit pipeline: front is in the shifter, back waits in the buffer.
    // Each entry holds the byte to receive and the remaining busy polls.
    tx: RefCell<Deque<(u8, u32), 2>>,
    rx: RefCell<Deque<u8, 2>>,
    last_rx: Cell<u8>,
    overruns: Cell<u32>,
    latency: u32,
    stuck: bool,
    response: RefCell<Response>,
    sent: RefCell<Vec<u8, SIM_CAPACITY>>,
    counts: Cell<UsartAccessCounts>,
}

impl SimUsart {
    fn with_response(response: Response) -> Self {
        Self {
            ctrlb: Cell::new(0),
            ctrlc: Cell::new(0),
            baudctrla: Cell::new(0),
            baudctrlb: Cell::new(0),
            txc: Cell::new(false),
            tx: RefCell::new(Deque::new()),
            rx: RefCell::new(Deque::new()),
            last_rx: Cell::new(0),
            overruns: Cell::new(0),
            latency: 0,
            stuck: false,
            response: RefCell::new(response),
            sent: RefCell::new(Vec::new()),
            counts: Cell::new(UsartAccessCounts::default()),
        }
    }

    /// RxD looped back to TxD.
    pub fn loopback() -> Self {
        Self::with_response(Response::Loopback)
    }

    /// Remote side answers with `bytes`, in order.
    pub fn scripted(bytes: &[u8]) -> Self {
        Self::with_response(Response::script(bytes))
    }

    /// Report "busy" for `polls` status reads before each frame completes.
    #[must_use]
    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency = polls;
        self
    }

    /// Never finish shifting a frame.
    #[must_use]
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Current `CTRLB` contents.
    pub fn ctrlb(&self) -> u8 {
        self.ctrlb.get()
    }

    /// Current `CTRLC` contents.
    pub fn ctrlc(&self) -> u8 {
        self.ctrlc.get()
    }

    /// 16-bit divisor assembled from `BAUDCTRLB:BAUDCTRLA`.
    pub fn baud_divisor(&self) -> u16 {
        u16::from_be_bytes([self.baudctrlb.get(), self.baudctrla.get()])
    }

    /// `STATUS.TXCIF`, without counting as a register read.
    pub fn txc_flag(&self) -> bool {
        self.txc.get()
    }

    /// Received bytes still waiting in the FIFO.
    pub fn rx_pending(&self) -> usize {
        self.rx.borrow().len()
    }

    /// Frames lost because the receive FIFO was full.
    pub fn overruns(&self) -> u32 {
        self.overruns.get()
    }

    /// Every byte written to `DATA`, in order.
    pub fn sent(&self) -> Vec<u8, SIM_CAPACITY> {
        self.sent.borrow().clone()
    }

    /// Register access counters.
    pub fn counts(&self) -> UsartAccessCounts {
        self.counts.get()
    }

    fn count(&self, update: impl FnOnce(&mut UsartAccessCounts)) {
        let mut counts = self.counts.get();
        update(&mut counts);
        self.counts.set(counts);
    }

    fn config_write(&self, reg: &Cell<u8>, value: u8) {
        self.count(|c| c.config_writes = c.config_writes.saturating_add(1));
        reg.set(value);
    }

    // Advance the frame in the shifter by one poll.
    fn tick(&self) {
        if self.stuck {
            return;
        }
        let mut tx = self.tx.borrow_mut();
        let Some((incoming, busy)) = tx.front_mut() else {
            return;
        };
        if *busy > 0 {
            *busy = busy.saturating_sub(1);
            return;
        }
        let incoming = *incoming;
        let _ = tx.pop_front();
        if self.rx.borrow_mut().push_back(incoming).is_err() {
            self.overruns.set(self.overruns.get().saturating_add(1));
        }
        if tx.is_empty() {
            self.txc.set(true);
        }
    }

    fn status_bits(&self) -> u8 {
        let mut status = 0;
        if !self.rx.borrow().is_empty() {
            status |= USART_RXCIF_BM;
        }
        if self.txc.get() {
            status |= USART_TXCIF_BM;
        }
        if self.tx.borrow().len() < 2 {
            status |= USART_DREIF_BM;
        }
        status
    }
}

impl UsartRegisters for SimUsart {
    fn read_data(&self) -> u8 {
        self.count(|c| c.data_reads = c.data_reads.saturating_add(1));
        if let Some(byte) = self.rx.borrow_mut().pop_front() {
            self.last_rx.set(byte);
        }
        self.last_rx.get()
    }

    fn write_data(&self, value: u8) {
        self.count(|c| c.data_writes = c.data_writes.saturating_add(1));
        let _ = self.sent.borrow_mut().push(value);
        let incoming = self.response.borrow_mut().next(value);
        // A full buffer drops the write, as the silicon does.
        let _ = self.tx.borrow_mut().push_back((incoming, self.latency));
    }

    fn read_status(&self) -> u8 {
        self.count(|c| c.status_reads = c.status_reads.saturating_add(1));
        self.tick();
        self.status_bits()
    }

    fn write_status(&self, value: u8) {
        self.count(|c| c.status_writes = c.status_writes.saturating_add(1));
        if value & USART_TXCIF_BM != 0 {
            self.txc.set(false);
        }
    }

    fn write_ctrlb(&self, value: u8) {
        self.config_write(&self.ctrlb, value);
    }

    fn write_ctrlc(&self, value: u8) {
        self.config_write(&self.ctrlc, value);
    }

    fn write_baudctrla(&self, value: u8) {
        self.config_write(&self.baudctrla, value);
    }

    fn write_baudctrlb(&self, value: u8) {
        self.config_write(&self.baudctrlb, value);
    }
}

// ---------------------------------------------------------------------------
// PORT
// ---------------------------------------------------------------------------

/// Simulated I/O port
#[derive(Debug, Default)]
pub struct SimPort {
    dir: Cell<u8>,
    out: Cell<u8>,
    pin_ctrl: [Cell<u8>; 8],
    writes: Cell<u32>,
}

impl SimPort {
    /// Port with every pin an input and driven low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Port whose `DIR` register starts at `dir`.
    pub fn with_dir(dir: u8) -> Self {
        let port = Self::default();
        port.dir.set(dir);
        port
    }

    /// Current `DIR` contents.
    pub fn dir(&self) -> u8 {
        self.dir.get()
    }

    /// Current `OUT` contents.
    pub fn out(&self) -> u8 {
        self.out.get()
    }

    /// Current `PINnCTRL` contents for `pin`.
    pub fn pin_ctrl(&self, pin: Pin) -> u8 {
        self.pin_ctrl
            .get(usize::from(pin.index()))
            .map_or(0, Cell::get)
    }

    /// Number of register writes.
    pub fn writes(&self) -> u32 {
        self.writes.get()
    }

    fn write(&self, reg: &Cell<u8>, value: u8) {
        self.writes.set(self.writes.get().saturating_add(1));
        reg.set(value);
    }
}

impl PortRegisters for SimPort {
    fn read_dir(&self) -> u8 {
        self.dir.get()
    }

    fn dir_set(&self, mask: u8) {
        self.write(&self.dir, self.dir.get() | mask);
    }

    fn dir_clear(&self, mask: u8) {
        self.write(&self.dir, self.dir.get() & !mask);
    }

    fn out_set(&self, mask: u8) {
        self.write(&self.out, self.out.get() | mask);
    }

    fn out_clear(&self, mask: u8) {
        self.write(&self.out, self.out.get() & !mask);
    }

    fn read_pin_ctrl(&self, pin: Pin) -> u8 {
        self.pin_ctrl(pin)
    }

    fn write_pin_ctrl(&self, pin: Pin, value: u8) {
        if let Some(reg) = self.pin_ctrl.get(usize::from(pin.index())) {
            self.write(reg, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spi_if_rises_after_latency_polls() {
        let spi = SimSpi::loopback().with_latency(2);
        spi.write_data(0x42);
        assert_eq!(spi.read_status() & SPI_IF_BM, 0);
        assert_eq!(spi.read_status() & SPI_IF_BM, 0);
        assert_ne!(spi.read_status() & SPI_IF_BM, 0);
        assert_eq!(spi.read_data(), 0x42);
        assert!(!spi.if_flag(), "IF clears on DATA access after STATUS read");
    }

    #[test]
    fn spi_if_stays_set_until_data_access() {
        let spi = SimSpi::loopback();
        spi.write_data(0x01);
        assert_ne!(spi.read_status() & SPI_IF_BM, 0);
        assert_ne!(spi.read_status() & SPI_IF_BM, 0);
        assert!(spi.if_flag());
        let _ = spi.read_data();
        assert!(!spi.if_flag());
    }

    #[test]
    fn stuck_spi_never_completes() {
        let spi = SimSpi::loopback().stuck();
        spi.write_data(0x00);
        for _ in 0..100 {
            assert_eq!(spi.read_status() & SPI_IF_BM, 0);
        }
    }

    #[test]
    fn script_runs_dry_to_idle_line() {
        let spi = SimSpi::scripted(&[0xA5]);
        spi.write_data(0x00);
        let _ = spi.read_status();
        assert_eq!(spi.read_data(), 0xA5);
        spi.write_data(0x00);
        let _ = spi.read_status();
        assert_eq!(spi.read_data(), IDLE_LINE);
    }

    #[test]
    fn usart_txc_is_write_one_to_clear() {
        let usart = SimUsart::loopback();
        usart.write_data(0x10);
        assert_ne!(usart.read_status() & USART_TXCIF_BM, 0);
        // Reading DATA does not clear TXCIF.
        assert_eq!(usart.read_data(), 0x10);
        assert!(usart.txc_flag());
        usart.write_status(USART_RXCIF_BM);
        assert!(usart.txc_flag(), "only the TXCIF bit clears TXCIF");
        usart.write_status(USART_TXCIF_BM);
        assert!(!usart.txc_flag());
    }

    #[test]
    fn usart_dre_drops_when_pipeline_full() {
        let usart = SimUsart::loopback().with_latency(10);
        assert_ne!(usart.status_bits() & USART_DREIF_BM, 0);
        usart.write_data(1);
        assert_ne!(usart.status_bits() & USART_DREIF_BM, 0, "shifter busy, buffer free");
        usart.write_data(2);
        assert_eq!(usart.status_bits() & USART_DREIF_BM, 0);
    }

    #[test]
    fn usart_rx_fifo_overruns_after_two_frames() {
        let usart = SimUsart::loopback();
        for byte in 0..3 {
            usart.write_data(byte);
            let _ = usart.read_status();
        }
        assert_eq!(usart.rx_pending(), 2);
        assert_eq!(usart.overruns(), 1);
    }

    #[test]
    fn port_set_and_clear_are_bitwise() {
        let port = SimPort::with_dir(0b1000_0001);
        port.dir_set(0b0000_0110);
        assert_eq!(port.dir(), 0b1000_0111);
        port.dir_clear(0b1000_0010);
        assert_eq!(port.dir(), 0b0000_0101);
        assert_eq!(port.writes(), 2);
    }
}
