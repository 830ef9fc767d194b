//! Typed register-block access
//!
//! Each peripheral is modelled as a trait exposing named register accessors.
//! The hardware implementations ([`SpiBlock`], [`UsartBlock`], [`PortBlock`])
//! are `Copy` handles around a fixed base address and perform every access
//! with `read_volatile` / `write_volatile`, so the compiler neither caches
//! nor reorders them. The simulator in [`crate::sim`] implements the same
//! traits for host tests.
//!
//! All accessors take `&self`: the registers are shared hardware state, and
//! exclusive use is the caller's responsibility (single execution context).

use crate::binding::Pin;
use crate::registers::*;

/// SPI module register block (`SPI_t`)
pub trait SpiRegisters {
    /// Read `CTRL`
    fn read_ctrl(&self) -> u8;

    /// Write `CTRL`
    fn write_ctrl(&self, value: u8);

    /// Read `STATUS`
    fn read_status(&self) -> u8;

    /// Read `DATA` (the byte shifted in by the last transfer)
    fn read_data(&self) -> u8;

    /// Write `DATA` (starts shifting `value` out)
    fn write_data(&self, value: u8);
}

/// USART module register block (`USART_t`), as used in master SPI mode
pub trait UsartRegisters {
    /// Read `DATA` (receive buffer)
    fn read_data(&self) -> u8;

    /// Write `DATA` (transmit buffer)
    fn write_data(&self, value: u8);

    /// Read `STATUS`
    fn read_status(&self) -> u8;

    /// Write `STATUS` (flags are write-one-to-clear)
    fn write_status(&self, value: u8);

    /// Write `CTRLB`
    fn write_ctrlb(&self, value: u8);

    /// Write `CTRLC`
    fn write_ctrlc(&self, value: u8);

    /// Write `BAUDCTRLA`
    fn write_baudctrla(&self, value: u8);

    /// Write `BAUDCTRLB`
    fn write_baudctrlb(&self, value: u8);
}

/// I/O port register block (`PORT_t`)
pub trait PortRegisters {
    /// Read `DIR`
    fn read_dir(&self) -> u8;

    /// Write `DIRSET`: pins in `mask` become outputs
    fn dir_set(&self, mask: u8);

    /// Write `DIRCLR`: pins in `mask` become inputs
    fn dir_clear(&self, mask: u8);

    /// Write `OUTSET`: pins in `mask` are driven high
    fn out_set(&self, mask: u8);

    /// Write `OUTCLR`: pins in `mask` are driven low
    fn out_clear(&self, mask: u8);

    /// Read `PINnCTRL` for `pin`
    fn read_pin_ctrl(&self, pin: Pin) -> u8;

    /// Write `PINnCTRL` for `pin`
    fn write_pin_ctrl(&self, pin: Pin, value: u8);
}

impl<T: SpiRegisters + ?Sized> SpiRegisters for &T {
    fn read_ctrl(&self) -> u8 {
        (**self).read_ctrl()
    }
    fn write_ctrl(&self, value: u8) {
        (**self).write_ctrl(value);
    }
    fn read_status(&self) -> u8 {
        (**self).read_status()
    }
    fn read_data(&self) -> u8 {
        (**self).read_data()
    }
    fn write_data(&self, value: u8) {
        (**self).write_data(value);
    }
}

impl<T: UsartRegisters + ?Sized> UsartRegisters for &T {
    fn read_data(&self) -> u8 {
        (**self).read_data()
    }
    fn write_data(&self, value: u8) {
        (**self).write_data(value);
    }
    fn read_status(&self) -> u8 {
        (**self).read_status()
    }
    fn write_status(&self, value: u8) {
        (**self).write_status(value);
    }
    fn write_ctrlb(&self, value: u8) {
        (**self).write_ctrlb(value);
    }
    fn write_ctrlc(&self, value: u8) {
        (**self).write_ctrlc(value);
    }
    fn write_baudctrla(&self, value: u8) {
        (**self).write_baudctrla(value);
    }
    fn write_baudctrlb(&self, value: u8) {
        (**self).write_baudctrlb(value);
    }
}

impl<T: PortRegisters + ?Sized> PortRegisters for &T {
    fn read_dir(&self) -> u8 {
        (**self).read_dir()
    }
    fn dir_set(&self, mask: u8) {
        (**self).dir_set(mask);
    }
    fn dir_clear(&self, mask: u8) {
        (**self).dir_clear(mask);
    }
    fn out_set(&self, mask: u8) {
        (**self).out_set(mask);
    }
    fn out_clear(&self, mask: u8) {
        (**self).out_clear(mask);
    }
    fn read_pin_ctrl(&self, pin: Pin) -> u8 {
        (**self).read_pin_ctrl(pin)
    }
    fn write_pin_ctrl(&self, pin: Pin, value: u8) {
        (**self).write_pin_ctrl(pin, value);
    }
}

// ---------------------------------------------------------------------------
// Volatile hardware handles
// ---------------------------------------------------------------------------

/// Base address of an 8-bit register block in the data address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mmio {
    base: usize,
}

impl Mmio {
    #[inline(always)]
    fn read(self, offset: usize) -> u8 {
        // SAFETY: `base` was supplied to an `unsafe` block constructor whose
        // contract guarantees a valid, permanently mapped register block that
        // covers every offset used by this crate.
        unsafe { core::ptr::read_volatile(self.base.wrapping_add(offset) as *const u8) }
    }

    #[inline(always)]
    fn write(self, offset: usize, value: u8) {
        // SAFETY: see `read`.
        unsafe { core::ptr::write_volatile(self.base.wrapping_add(offset) as *mut u8, value) }
    }
}

/// Memory-mapped SPI module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiBlock(Mmio);

impl SpiBlock {
    /// Bind to the SPI module at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of an XMEGA SPI module on the running
    /// device. The handle performs volatile accesses at `base..base + 4`.
    pub const unsafe fn new(base: usize) -> Self {
        Self(Mmio { base })
    }

    /// Base address of the block.
    pub const fn base(self) -> usize {
        self.0.base
    }
}

impl SpiRegisters for SpiBlock {
    #[inline(always)]
    fn read_ctrl(&self) -> u8 {
        self.0.read(SPI_CTRL)
    }
    #[inline(always)]
    fn write_ctrl(&self, value: u8) {
        self.0.write(SPI_CTRL, value);
    }
    #[inline(always)]
    fn read_status(&self) -> u8 {
        self.0.read(SPI_STATUS)
    }
    #[inline(always)]
    fn read_data(&self) -> u8 {
        self.0.read(SPI_DATA)
    }
    #[inline(always)]
    fn write_data(&self, value: u8) {
        self.0.write(SPI_DATA, value);
    }
}

/// Memory-mapped USART module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsartBlock(Mmio);

impl UsartBlock {
    /// Bind to the USART module at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of an XMEGA USART module on the running
    /// device. The handle performs volatile accesses at `base..base + 8`.
    pub const unsafe fn new(base: usize) -> Self {
        Self(Mmio { base })
    }

    /// Base address of the block.
    pub const fn base(self) -> usize {
        self.0.base
    }
}

impl UsartRegisters for UsartBlock {
    #[inline(always)]
    fn read_data(&self) -> u8 {
        self.0.read(USART_DATA)
    }
    #[inline(always)]
    fn write_data(&self, value: u8) {
        self.0.write(USART_DATA, value);
    }
    #[inline(always)]
    fn read_status(&self) -> u8 {
        self.0.read(USART_STATUS)
    }
    #[inline(always)]
    fn write_status(&self, value: u8) {
        self.0.write(USART_STATUS, value);
    }
    #[inline(always)]
    fn write_ctrlb(&self, value: u8) {
        self.0.write(USART_CTRLB, value);
    }
    #[inline(always)]
    fn write_ctrlc(&self, value: u8) {
        self.0.write(USART_CTRLC, value);
    }
    #[inline(always)]
    fn write_baudctrla(&self, value: u8) {
        self.0.write(USART_BAUDCTRLA, value);
    }
    #[inline(always)]
    fn write_baudctrlb(&self, value: u8) {
        self.0.write(USART_BAUDCTRLB, value);
    }
}

/// Memory-mapped I/O port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBlock(Mmio);

impl PortBlock {
    /// Bind to the I/O port at `base`.
    ///
    /// # Safety
    ///
    /// `base` must be the address of an XMEGA PORT module on the running
    /// device. The handle performs volatile accesses at `base..base + 0x18`.
    pub const unsafe fn new(base: usize) -> Self {
        Self(Mmio { base })
    }

    /// Base address of the block.
    pub const fn base(self) -> usize {
        self.0.base
    }
}

impl PortRegisters for PortBlock {
    #[inline(always)]
    fn read_dir(&self) -> u8 {
        self.0.read(PORT_DIR)
    }
    #[inline(always)]
    fn dir_set(&self, mask: u8) {
        self.0.write(PORT_DIRSET, mask);
    }
    #[inline(always)]
    fn dir_clear(&self, mask: u8) {
        self.0.write(PORT_DIRCLR, mask);
    }
    #[inline(always)]
    fn out_set(&self, mask: u8) {
        self.0.write(PORT_OUTSET, mask);
    }
    #[inline(always)]
    fn out_clear(&self, mask: u8) {
        self.0.write(PORT_OUTCLR, mask);
    }
    #[inline(always)]
    fn read_pin_ctrl(&self, pin: Pin) -> u8 {
        self.0.read(PORT_PIN0CTRL.wrapping_add(usize::from(pin.index())))
    }
    #[inline(always)]
    fn write_pin_ctrl(&self, pin: Pin, value: u8) {
        self.0
            .write(PORT_PIN0CTRL.wrapping_add(usize::from(pin.index())), value);
    }
}

// ---------------------------------------------------------------------------
// ATxmega A1/A3 module addresses
// ---------------------------------------------------------------------------

/// PORTC base address
pub const PORTC_BASE: usize = 0x0640;
/// PORTD base address
pub const PORTD_BASE: usize = 0x0660;
/// PORTE base address
pub const PORTE_BASE: usize = 0x0680;
/// PORTF base address
pub const PORTF_BASE: usize = 0x06A0;

/// SPIC base address
pub const SPIC_BASE: usize = 0x08C0;
/// SPID base address
pub const SPID_BASE: usize = 0x09C0;
/// SPIE base address
pub const SPIE_BASE: usize = 0x0AC0;
/// SPIF base address
pub const SPIF_BASE: usize = 0x0BC0;

/// USARTC0 base address
pub const USARTC0_BASE: usize = 0x08A0;
/// USARTC1 base address
pub const USARTC1_BASE: usize = 0x08B0;
/// USARTD0 base address
pub const USARTD0_BASE: usize = 0x09A0;
/// USARTD1 base address
pub const USARTD1_BASE: usize = 0x09B0;
/// USARTE0 base address
pub const USARTE0_BASE: usize = 0x0AA0;
/// USARTF0 base address
pub const USARTF0_BASE: usize = 0x0BA0;

// Base addresses follow the ATxmega128A1 module address map (A1/A3 parts).

/// PORTC
// SAFETY: PORTC_BASE is the PORTC register block in the A1/A3 address map.
pub const PORTC: PortBlock = unsafe { PortBlock::new(PORTC_BASE) };
/// PORTD
// SAFETY: PORTD_BASE is the PORTD register block in the A1/A3 address map.
pub const PORTD: PortBlock = unsafe { PortBlock::new(PORTD_BASE) };
/// PORTE
// SAFETY: PORTE_BASE is the PORTE register block in the A1/A3 address map.
pub const PORTE: PortBlock = unsafe { PortBlock::new(PORTE_BASE) };
/// PORTF
// SAFETY: PORTF_BASE is the PORTF register block in the A1/A3 address map.
pub const PORTF: PortBlock = unsafe { PortBlock::new(PORTF_BASE) };

/// SPI module on PORTC
// SAFETY: SPIC_BASE is the SPIC register block in the A1/A3 address map.
pub const SPIC: SpiBlock = unsafe { SpiBlock::new(SPIC_BASE) };
/// SPI module on PORTD
// SAFETY: SPID_BASE is the SPID register block in the A1/A3 address map.
pub const SPID: SpiBlock = unsafe { SpiBlock::new(SPID_BASE) };
/// SPI module on PORTE
// SAFETY: SPIE_BASE is the SPIE register block in the A1/A3 address map.
pub const SPIE: SpiBlock = unsafe { SpiBlock::new(SPIE_BASE) };
/// SPI module on PORTF
// SAFETY: SPIF_BASE is the SPIF register block in the A1/A3 address map.
pub const SPIF: SpiBlock = unsafe { SpiBlock::new(SPIF_BASE) };

/// USART 0 on PORTC
// SAFETY: USARTC0_BASE is the USARTC0 register block in the A1/A3 address map.
pub const USARTC0: UsartBlock = unsafe { UsartBlock::new(USARTC0_BASE) };
/// USART 1 on PORTC
// SAFETY: USARTC1_BASE is the USARTC1 register block in the A1/A3 address map.
pub const USARTC1: UsartBlock = unsafe { UsartBlock::new(USARTC1_BASE) };
/// USART 0 on PORTD
// SAFETY: USARTD0_BASE is the USARTD0 register block in the A1/A3 address map.
pub const USARTD0: UsartBlock = unsafe { UsartBlock::new(USARTD0_BASE) };
/// USART 1 on PORTD
// SAFETY: USARTD1_BASE is the USARTD1 register block in the A1/A3 address map.
pub const USARTD1: UsartBlock = unsafe { UsartBlock::new(USARTD1_BASE) };
/// USART 0 on PORTE
// SAFETY: USARTE0_BASE is the USARTE0 register block in the A1/A3 address map.
pub const USARTE0: UsartBlock = unsafe { UsartBlock::new(USARTE0_BASE) };
/// USART 0 on PORTF
// SAFETY: USARTF0_BASE is the USARTF0 register block in the A1/A3 address map.
pub const USARTF0: UsartBlock = unsafe { UsartBlock::new(USARTF0_BASE) };

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn spi_modules_sit_0x100_apart() {
        assert_eq!(SPID.base() - SPIC.base(), 0x100);
        assert_eq!(SPIE.base() - SPID.base(), 0x100);
        assert_eq!(SPIF.base() - SPIE.base(), 0x100);
    }

    #[test]
    fn usart_pairs_share_a_port_block() {
        assert_eq!(USARTC1.base() - USARTC0.base(), 0x10);
        assert_eq!(USARTD1.base() - USARTD0.base(), 0x10);
        // USART blocks precede the SPI block of the same port.
        assert!(USARTC1.base() < SPIC.base());
        assert!(USARTD1.base() < SPID.base());
    }

    #[test]
    fn port_blocks_are_0x20_wide() {
        assert_eq!(PORTD.base() - PORTC.base(), 0x20);
        assert_eq!(PORTF.base() - PORTE.base(), 0x20);
    }
}
