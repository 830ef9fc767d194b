//! XMEGA A-series register map for the SPI, USART and PORT modules
//!
//! Source: Atmel AVR XMEGA A Manual (doc8077), sections 13 (I/O Ports),
//! 21 (SPI), 22 (USART) and 23 (USART in Master SPI Mode), plus the
//! ATxmega128A1 datasheet peripheral module address map.
//!
//! # Flag clearing rules
//!
//! ## SPI `STATUS.IF`
//! Cleared by hardware when `STATUS` is read with `IF` set and `DATA` is
//! accessed afterwards. Drivers never write `STATUS`.
//!
//! ## USART `STATUS.TXCIF`
//! Not cleared by `DATA` access. Must be cleared by writing a one to its bit
//! location, otherwise the next transfer-complete wait returns immediately.
//!
//! ## USART in MSPI mode
//! `CTRLC.CHSIZE[2:1]` are reused as `UDORD` (data order) and `UCPHA`
//! (clock phase). Clock polarity has no register bit: it is selected by the
//! `INVEN` bit of the XCK pin's `PINnCTRL` register.

// ---------------------------------------------------------------------------
// SPI register offsets
// ---------------------------------------------------------------------------

/// SPI control register
pub const SPI_CTRL: usize = 0x00;

/// SPI interrupt control register
pub const SPI_INTCTRL: usize = 0x01;

/// SPI status register
pub const SPI_STATUS: usize = 0x02;

/// SPI data register (write starts a shift, read returns the shifted-in byte)
pub const SPI_DATA: usize = 0x03;

// ---------------------------------------------------------------------------
// SPI field values
// ---------------------------------------------------------------------------

/// CTRL: double clock speed
pub const SPI_CLK2X_BM: u8 = 0x80;

/// CTRL: module enable
pub const SPI_ENABLE_BM: u8 = 0x40;

/// CTRL: data order, set = LSB first
pub const SPI_DORD_BM: u8 = 0x20;

/// CTRL: master select
pub const SPI_MASTER_BM: u8 = 0x10;

/// CTRL: transfer mode field (CPOL, CPHA)
pub const SPI_MODE_GM: u8 = 0x0C;

/// CTRL: clock prescaler field
pub const SPI_PRESCALER_GM: u8 = 0x03;

/// STATUS: interrupt flag, set when a byte transfer completes
pub const SPI_IF_BM: u8 = 0x80;

/// STATUS: write collision flag
pub const SPI_WRCOL_BM: u8 = 0x40;

// ---------------------------------------------------------------------------
// USART register offsets
// ---------------------------------------------------------------------------

/// USART data register
pub const USART_DATA: usize = 0x00;

/// USART status register
pub const USART_STATUS: usize = 0x01;

/// USART control register A (interrupt levels)
pub const USART_CTRLA: usize = 0x03;

/// USART control register B (receiver/transmitter enable)
pub const USART_CTRLB: usize = 0x04;

/// USART control register C (communication mode, frame format)
pub const USART_CTRLC: usize = 0x05;

/// USART baud rate register A, BSEL\[7:0\]
pub const USART_BAUDCTRLA: usize = 0x06;

/// USART baud rate register B, upper divisor byte
pub const USART_BAUDCTRLB: usize = 0x07;

// ---------------------------------------------------------------------------
// USART field values
// ---------------------------------------------------------------------------

/// STATUS: receive complete
pub const USART_RXCIF_BM: u8 = 0x80;

/// STATUS: transmit complete (write one to clear)
pub const USART_TXCIF_BM: u8 = 0x40;

/// STATUS: data register empty
pub const USART_DREIF_BM: u8 = 0x20;

/// CTRLB: receiver enable
pub const USART_RXEN_BM: u8 = 0x10;

/// CTRLB: transmitter enable
pub const USART_TXEN_BM: u8 = 0x08;

/// CTRLC: communication mode field
pub const USART_CMODE_GM: u8 = 0xC0;

/// CTRLC: communication mode = master SPI
pub const USART_CMODE_MSPI_GC: u8 = 0xC0;

/// CTRLC (MSPI mode): data order, set = LSB first. Aliases CHSIZE2.
pub const USART_UDORD_BM: u8 = 0x04;

/// CTRLC (MSPI mode): clock phase, set = sample on trailing edge. Aliases CHSIZE1.
pub const USART_UCPHA_BM: u8 = 0x02;

// ---------------------------------------------------------------------------
// PORT register offsets
// ---------------------------------------------------------------------------

/// Data direction
pub const PORT_DIR: usize = 0x00;

/// Data direction set (write-one-to-set)
pub const PORT_DIRSET: usize = 0x01;

/// Data direction clear (write-one-to-clear)
pub const PORT_DIRCLR: usize = 0x02;

/// Output value
pub const PORT_OUT: usize = 0x04;

/// Output value set (write-one-to-set)
pub const PORT_OUTSET: usize = 0x05;

/// Output value clear (write-one-to-clear)
pub const PORT_OUTCLR: usize = 0x06;

/// First pin configuration register; pin `n` lives at `PORT_PIN0CTRL + n`
pub const PORT_PIN0CTRL: usize = 0x10;

/// PINnCTRL: inverted I/O
pub const PORT_INVEN_BM: u8 = 0x40;

// ---------------------------------------------------------------------------
// Transfer constants
// ---------------------------------------------------------------------------

/// Byte shifted out while reading.
///
/// Keeps MOSI high for the whole frame, which most SPI slaves treat as a
/// no-op command.
pub const FILLER_BYTE: u8 = 0xFF;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spi_ctrl_fields_do_not_overlap() {
        let fields = [
            SPI_CLK2X_BM,
            SPI_ENABLE_BM,
            SPI_DORD_BM,
            SPI_MASTER_BM,
            SPI_MODE_GM,
            SPI_PRESCALER_GM,
        ];
        let mut seen = 0u8;
        for field in fields {
            assert_eq!(seen & field, 0, "field {field:#04x} overlaps");
            seen |= field;
        }
        assert_eq!(seen, 0xFF, "SPI CTRL fields cover the whole register");
    }

    #[test]
    fn mspi_ctrlc_bits_sit_below_cmode() {
        assert_eq!(USART_UDORD_BM & USART_CMODE_GM, 0);
        assert_eq!(USART_UCPHA_BM & USART_CMODE_GM, 0);
        assert_eq!(USART_CMODE_MSPI_GC & !USART_CMODE_GM, 0);
    }

    #[test]
    fn usart_status_flags_are_distinct() {
        assert_eq!(USART_RXCIF_BM & USART_TXCIF_BM, 0);
        assert_eq!(USART_TXCIF_BM & USART_DREIF_BM, 0);
        assert_eq!(USART_RXCIF_BM & USART_DREIF_BM, 0);
    }
}
