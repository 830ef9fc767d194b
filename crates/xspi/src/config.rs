//! Transfer configuration
//!
//! Typed replacements for the raw group-configuration values the XMEGA
//! headers pass around (`SPI_MODE_t`, `SPI_PRESCALER_t`, the LSB flag and
//! `F_CPU`). Every type knows the exact register bits it contributes, and
//! the `*_value` methods derive complete register contents from scratch so
//! that configuration never depends on what the register held before.

use crate::registers::*;

/// Peripheral base clock assumed by [`UsartSpiConfig::default`].
///
/// 32 MHz is the XMEGA A-series maximum, reached from the internal 32 MHz RC
/// oscillator. Boards running the 2 MHz reset clock must override
/// [`UsartSpiConfig::cpu_hz`].
pub const DEFAULT_CPU_HZ: u32 = 32_000_000;

/// Default USART-as-SPI bit rate.
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

/// SPI modes (CPOL, CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiMode {
    /// Mode 0: CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// All modes, in numeric order.
    pub const ALL: [Self; 4] = [Self::Mode0, Self::Mode1, Self::Mode2, Self::Mode3];

    /// `SPI.CTRL` MODE field value.
    #[must_use]
    pub const fn ctrl_bits(self) -> u8 {
        match self {
            Self::Mode0 => 0x00,
            Self::Mode1 => 0x04,
            Self::Mode2 => 0x08,
            Self::Mode3 => 0x0C,
        }
    }

    /// Clock idles high (CPOL=1).
    #[must_use]
    pub const fn idle_high(self) -> bool {
        matches!(self, Self::Mode2 | Self::Mode3)
    }

    /// Data is sampled on the trailing clock edge (CPHA=1).
    #[must_use]
    pub const fn trailing_edge(self) -> bool {
        matches!(self, Self::Mode1 | Self::Mode3)
    }
}

impl From<embedded_hal::spi::Mode> for SpiMode {
    fn from(mode: embedded_hal::spi::Mode) -> Self {
        use embedded_hal::spi::{Phase, Polarity};
        match (mode.polarity, mode.phase) {
            (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => Self::Mode0,
            (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => Self::Mode1,
            (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => Self::Mode2,
            (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => Self::Mode3,
        }
    }
}

/// Bit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    /// Most significant bit first
    #[default]
    MsbFirst,
    /// Least significant bit first
    LsbFirst,
}

impl BitOrder {
    /// Map the header-style `lsb` flag (`true` = LSB first).
    #[must_use]
    pub const fn from_lsb_first(lsb: bool) -> Self {
        if lsb {
            Self::LsbFirst
        } else {
            Self::MsbFirst
        }
    }

    /// `true` for [`BitOrder::LsbFirst`].
    #[must_use]
    pub const fn is_lsb_first(self) -> bool {
        matches!(self, Self::LsbFirst)
    }
}

/// SPI clock prescaler (`SPI.CTRL` PRESCALER field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    /// clk_PER / 4
    #[default]
    Div4,
    /// clk_PER / 16
    Div16,
    /// clk_PER / 64
    Div64,
    /// clk_PER / 128
    Div128,
}

impl Prescaler {
    /// All prescalers, fastest first.
    pub const ALL: [Self; 4] = [Self::Div4, Self::Div16, Self::Div64, Self::Div128];

    /// PRESCALER field value.
    #[must_use]
    pub const fn ctrl_bits(self) -> u8 {
        match self {
            Self::Div4 => 0x00,
            Self::Div16 => 0x01,
            Self::Div64 => 0x02,
            Self::Div128 => 0x03,
        }
    }

    /// Nominal divisor, before CLK2X.
    #[must_use]
    pub const fn divisor(self) -> u8 {
        match self {
            Self::Div4 => 4,
            Self::Div16 => 16,
            Self::Div64 => 64,
            Self::Div128 => 128,
        }
    }
}

/// SCK generation: prescaler plus the optional double-speed bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiClock {
    /// Base prescaler
    pub prescaler: Prescaler,
    /// CLK2X: halve the prescaler divisor
    pub double_speed: bool,
}

impl SpiClock {
    /// Settings ordered by resulting SCK, fastest first.
    const BY_SPEED: [Self; 7] = [
        Self::new(Prescaler::Div4, true),
        Self::new(Prescaler::Div4, false),
        Self::new(Prescaler::Div16, true),
        Self::new(Prescaler::Div16, false),
        Self::new(Prescaler::Div64, true),
        Self::new(Prescaler::Div64, false),
        Self::new(Prescaler::Div128, false),
    ];

    /// Create a clock setting.
    #[must_use]
    pub const fn new(prescaler: Prescaler, double_speed: bool) -> Self {
        Self {
            prescaler,
            double_speed,
        }
    }

    /// PRESCALER and CLK2X bits of `SPI.CTRL`.
    #[must_use]
    pub const fn ctrl_bits(self) -> u8 {
        let clk2x = if self.double_speed { SPI_CLK2X_BM } else { 0 };
        self.prescaler.ctrl_bits() | clk2x
    }

    /// Effective clk_PER / SCK ratio.
    #[must_use]
    pub const fn divisor(self) -> u8 {
        if self.double_speed {
            self.prescaler.divisor() >> 1
        } else {
            self.prescaler.divisor()
        }
    }

    /// Resulting SCK frequency for a peripheral clock of `cpu_hz`.
    #[must_use]
    pub const fn sck_hz(self, cpu_hz: u32) -> u32 {
        match cpu_hz.checked_div(self.divisor() as u32) {
            Some(hz) => hz,
            None => 0,
        }
    }

    /// Fastest setting whose SCK does not exceed `max_hz`.
    ///
    /// Returns `None` when even clk_PER / 128 is too fast.
    #[must_use]
    pub fn fastest_within(cpu_hz: u32, max_hz: u32) -> Option<Self> {
        Self::BY_SPEED
            .into_iter()
            .find(|clock| clock.sck_hz(cpu_hz) <= max_hz)
    }
}

/// SPI master configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MasterConfig {
    /// SPI mode (CPOL, CPHA)
    pub mode: SpiMode,
    /// Bit order
    pub bit_order: BitOrder,
    /// SCK generation
    pub clock: SpiClock,
}

impl MasterConfig {
    /// Complete `SPI.CTRL` value for master operation.
    #[must_use]
    pub const fn ctrl_value(&self) -> u8 {
        let dord = if self.bit_order.is_lsb_first() { SPI_DORD_BM } else { 0 };
        SPI_ENABLE_BM | SPI_MASTER_BM | self.mode.ctrl_bits() | self.clock.ctrl_bits() | dord
    }
}

/// SPI slave configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveConfig {
    /// SPI mode (CPOL, CPHA)
    pub mode: SpiMode,
    /// Bit order
    pub bit_order: BitOrder,
}

impl SlaveConfig {
    /// Complete `SPI.CTRL` value for slave operation.
    #[must_use]
    pub const fn ctrl_value(&self) -> u8 {
        let dord = if self.bit_order.is_lsb_first() { SPI_DORD_BM } else { 0 };
        SPI_ENABLE_BM | self.mode.ctrl_bits() | dord
    }
}

/// USART master SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsartSpiConfig {
    /// SPI mode (CPOL, CPHA)
    pub mode: SpiMode,
    /// Bit order
    pub bit_order: BitOrder,
    /// Requested XCK frequency in Hz
    pub baud_rate: u32,
    /// Peripheral clock in Hz
    pub cpu_hz: u32,
}

impl Default for UsartSpiConfig {
    fn default() -> Self {
        Self {
            mode: SpiMode::Mode0,
            bit_order: BitOrder::MsbFirst,
            baud_rate: DEFAULT_BAUD_RATE,
            cpu_hz: DEFAULT_CPU_HZ,
        }
    }
}

impl UsartSpiConfig {
    /// BSEL value written to `BAUDCTRLB:BAUDCTRLA`.
    #[must_use]
    pub const fn baud_divisor(&self) -> u16 {
        mspi_baud_divisor(self.cpu_hz, self.baud_rate)
    }

    /// Complete `CTRLC` value: MSPI mode plus phase and data order.
    ///
    /// Clock polarity is not part of `CTRLC`; it is applied through the XCK
    /// pin's `INVEN` bit.
    #[must_use]
    pub const fn ctrlc_value(&self) -> u8 {
        let ucpha = if self.mode.trailing_edge() { USART_UCPHA_BM } else { 0 };
        let udord = if self.bit_order.is_lsb_first() { USART_UDORD_BM } else { 0 };
        USART_CMODE_MSPI_GC | ucpha | udord
    }

    /// XCK frequency actually produced by [`Self::baud_divisor`].
    #[must_use]
    pub const fn actual_baud(&self) -> u32 {
        let steps = (self.baud_divisor() as u32).wrapping_add(1).wrapping_mul(2);
        match self.cpu_hz.checked_div(steps) {
            Some(hz) => hz,
            None => 0,
        }
    }
}

/// Master SPI baud divisor: `cpu_hz / (2 * baud) - 1`.
///
/// Rates at or above `cpu_hz / 2` map to 0 (fastest possible). A rate of 0
/// maps to the slowest divisor, `0xFFFF`. Divisors above 16 bits are
/// truncated, not clamped.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn mspi_baud_divisor(cpu_hz: u32, baud: u32) -> u16 {
    if baud == 0 {
        return u16::MAX;
    }
    if baud >= cpu_hz / 2 {
        return 0;
    }
    // baud < cpu_hz / 2, so 2 * baud fits and the quotient is at least 1.
    match cpu_hz.checked_div(baud.wrapping_mul(2)) {
        Some(quotient) => quotient.wrapping_sub(1) as u16,
        None => 0,
    }
}
