//! Peripheral bindings: which register blocks and which port pins belong to
//! one SPI (or USART-as-SPI) instance.
//!
//! A binding never owns the hardware. It pairs two register handles with a
//! validated pin layout and is immutable once built; all mutable state lives
//! in the registers it designates.

use thiserror_no_std::Error;

use crate::mmio::{PortRegisters, SpiRegisters, UsartRegisters};

/// Highest valid bit index on an 8-bit port.
pub const MAX_PIN: u8 = 7;

/// Binding construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BindingError {
    /// Pin number does not fit an 8-bit port
    #[error("pin {0} is not a valid port bit (0-7)")]
    PinOutOfRange(u8),
    /// The same pin was assigned to two signals
    #[error("pin {0} is assigned to more than one signal")]
    PinConflict(u8),
}

/// Bit position (0–7) within an 8-bit I/O port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct Pin(u8);

impl Pin {
    /// Create a `Pin`, rejecting indices above [`MAX_PIN`].
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::PinOutOfRange`] if `index > 7`.
    pub const fn new(index: u8) -> Result<Self, BindingError> {
        if index > MAX_PIN {
            Err(BindingError::PinOutOfRange(index))
        } else {
            Ok(Self(index))
        }
    }

    /// Bit index within the port.
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Single-bit mask for this pin.
    #[must_use]
    pub const fn mask(self) -> u8 {
        1u8.wrapping_shl(self.0 as u32)
    }
}

impl TryFrom<u8> for Pin {
    type Error = BindingError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

/// Reject layouts where two signals share a pin.
const fn check_distinct(mut pins: &[Pin]) -> Result<(), BindingError> {
    let mut seen = 0u8;
    while let [pin, rest @ ..] = pins {
        if seen & pin.mask() != 0 {
            return Err(BindingError::PinConflict(pin.index()));
        }
        seen |= pin.mask();
        pins = rest;
    }
    Ok(())
}

/// Unwraps a pin in a `const` context; only used with literal indices below.
const fn fixed(index: u8) -> Pin {
    Pin(index & MAX_PIN)
}

// ---------------------------------------------------------------------------
// SPI
// ---------------------------------------------------------------------------

/// Pin layout of an SPI module: four distinct bits of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiPins {
    mosi: Pin,
    miso: Pin,
    sck: Pin,
    ss: Pin,
}

impl SpiPins {
    /// Fixed XMEGA layout shared by SPIC..SPIF: SS=4, MOSI=5, MISO=6, SCK=7.
    pub const XMEGA: Self = Self {
        mosi: fixed(5),
        miso: fixed(6),
        sck: fixed(7),
        ss: fixed(4),
    };

    /// Validate a pin layout.
    ///
    /// # Errors
    ///
    /// [`BindingError::PinOutOfRange`] for an index above 7,
    /// [`BindingError::PinConflict`] if two signals share a pin.
    pub const fn new(mosi: u8, miso: u8, sck: u8, ss: u8) -> Result<Self, BindingError> {
        let pins = match (Pin::new(mosi), Pin::new(miso), Pin::new(sck), Pin::new(ss)) {
            (Ok(mosi), Ok(miso), Ok(sck), Ok(ss)) => Self {
                mosi,
                miso,
                sck,
                ss,
            },
            (Err(e), _, _, _) | (_, Err(e), _, _) | (_, _, Err(e), _) | (_, _, _, Err(e)) => {
                return Err(e)
            }
        };
        match check_distinct(&[pins.mosi, pins.miso, pins.sck, pins.ss]) {
            Ok(()) => Ok(pins),
            Err(e) => Err(e),
        }
    }

    /// Master-out / slave-in
    pub const fn mosi(&self) -> Pin {
        self.mosi
    }

    /// Master-in / slave-out
    pub const fn miso(&self) -> Pin {
        self.miso
    }

    /// Serial clock
    pub const fn sck(&self) -> Pin {
        self.sck
    }

    /// Slave select
    pub const fn ss(&self) -> Pin {
        self.ss
    }
}

/// One SPI module together with the port its pins live on.
#[derive(Debug, Clone, Copy)]
pub struct PeripheralBinding<S, P> {
    spi: S,
    port: P,
    pins: SpiPins,
}

impl<S: SpiRegisters, P: PortRegisters> PeripheralBinding<S, P> {
    /// Bind an SPI register block and its port.
    pub const fn new(spi: S, port: P, pins: SpiPins) -> Self {
        Self { spi, port, pins }
    }

    /// SPI register block
    pub fn spi(&self) -> &S {
        &self.spi
    }

    /// Port register block
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Pin layout
    pub fn pins(&self) -> SpiPins {
        self.pins
    }

    /// Drive the slave-select pin low (slave selected).
    ///
    /// Only meaningful after `configure_master` has made SS an output.
    pub fn select(&self) {
        self.port.out_clear(self.pins.ss.mask());
    }

    /// Drive the slave-select pin high (slave released).
    pub fn deselect(&self) {
        self.port.out_set(self.pins.ss.mask());
    }
}

// ---------------------------------------------------------------------------
// USART in master SPI mode
// ---------------------------------------------------------------------------

/// Pin layout of a USART used in master SPI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsartPins {
    xck: Pin,
    txd: Pin,
    rxd: Pin,
}

impl UsartPins {
    /// USARTn0 layout: XCK=1, RXD=2, TXD=3.
    pub const USART0: Self = Self {
        xck: fixed(1),
        rxd: fixed(2),
        txd: fixed(3),
    };

    /// USARTn1 layout: XCK=5, RXD=6, TXD=7.
    pub const USART1: Self = Self {
        xck: fixed(5),
        rxd: fixed(6),
        txd: fixed(7),
    };

    /// Validate a pin layout.
    ///
    /// # Errors
    ///
    /// [`BindingError::PinOutOfRange`] for an index above 7,
    /// [`BindingError::PinConflict`] if two signals share a pin.
    pub const fn new(xck: u8, txd: u8, rxd: u8) -> Result<Self, BindingError> {
        let pins = match (Pin::new(xck), Pin::new(txd), Pin::new(rxd)) {
            (Ok(xck), Ok(txd), Ok(rxd)) => Self { xck, txd, rxd },
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return Err(e),
        };
        match check_distinct(&[pins.xck, pins.txd, pins.rxd]) {
            Ok(()) => Ok(pins),
            Err(e) => Err(e),
        }
    }

    /// Transfer clock (SCK in MSPI mode)
    pub const fn xck(&self) -> Pin {
        self.xck
    }

    /// Transmit data (MOSI in MSPI mode)
    pub const fn txd(&self) -> Pin {
        self.txd
    }

    /// Receive data (MISO in MSPI mode)
    pub const fn rxd(&self) -> Pin {
        self.rxd
    }
}

/// One USART module together with the port its pins live on.
#[derive(Debug, Clone, Copy)]
pub struct UsartBinding<U, P> {
    usart: U,
    port: P,
    pins: UsartPins,
}

impl<U: UsartRegisters, P: PortRegisters> UsartBinding<U, P> {
    /// Bind a USART register block and its port.
    pub const fn new(usart: U, port: P, pins: UsartPins) -> Self {
        Self { usart, port, pins }
    }

    /// USART register block
    pub fn usart(&self) -> &U {
        &self.usart
    }

    /// Port register block
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Pin layout
    pub fn pins(&self) -> UsartPins {
        self.pins
    }
}
