//! Completion waits
//!
//! Every transfer ends by polling a status flag. The polling policy is a
//! type parameter of the drivers so the call sites stay identical whether
//! the wait is the classic unbounded spin or something bounded.
//!
//! | Strategy        | Error             | Stuck hardware               |
//! |-----------------|-------------------|------------------------------|
//! | [`Spin`]        | `Infallible`      | hangs the caller             |
//! | [`BoundedSpin`] | [`TransferError`] | `Err(Timeout)` after N polls |

use core::convert::Infallible;

use embedded_hal::spi::ErrorKind;
use thiserror_no_std::Error;

/// Policy for waiting on a hardware completion flag.
pub trait WaitStrategy {
    /// Returned when the wait gives up.
    type Error: embedded_hal::spi::Error;

    /// Poll `ready` until it returns `true`.
    ///
    /// `ready` performs the status register read; it is called at least
    /// once unless the strategy has no budget at all.
    fn wait_until<F: FnMut() -> bool>(&mut self, ready: F) -> Result<(), Self::Error>;
}

/// Unbounded busy-wait. Never fails; a peripheral that never completes
/// hangs the caller, which is the accepted failure model on bare metal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Spin;

impl WaitStrategy for Spin {
    type Error = Infallible;

    #[inline(always)]
    fn wait_until<F: FnMut() -> bool>(&mut self, mut ready: F) -> Result<(), Self::Error> {
        while !ready() {
            core::hint::spin_loop();
        }
        Ok(())
    }
}

/// Busy-wait that gives up after a fixed number of flag polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BoundedSpin {
    max_polls: u32,
}

impl BoundedSpin {
    /// Allow up to `max_polls` status reads per wait.
    #[must_use]
    pub const fn new(max_polls: u32) -> Self {
        Self { max_polls }
    }

    /// Poll budget per wait.
    #[must_use]
    pub const fn max_polls(&self) -> u32 {
        self.max_polls
    }
}

impl WaitStrategy for BoundedSpin {
    type Error = TransferError;

    fn wait_until<F: FnMut() -> bool>(&mut self, mut ready: F) -> Result<(), Self::Error> {
        for _ in 0..self.max_polls {
            if ready() {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("xspi: completion flag not set after {=u32} polls", self.max_polls);
        Err(TransferError::Timeout)
    }
}

/// Transfer errors raised by bounded waits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferError {
    /// The completion flag never appeared within the poll budget
    #[error("peripheral did not signal completion in time")]
    Timeout,
}

impl embedded_hal::spi::Error for TransferError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn spin_returns_once_ready() {
        let mut polls = 0;
        let result = Spin.wait_until(|| {
            polls += 1;
            polls == 5
        });
        assert_eq!(result, Ok(()));
        assert_eq!(polls, 5);
    }

    #[test]
    fn bounded_spin_succeeds_within_budget() {
        let mut polls = 0u32;
        let result = BoundedSpin::new(10).wait_until(|| {
            polls += 1;
            polls == 10
        });
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn bounded_spin_times_out_after_budget() {
        let mut polls = 0u32;
        let result = BoundedSpin::new(3).wait_until(|| {
            polls += 1;
            false
        });
        assert_eq!(result, Err(TransferError::Timeout));
        assert_eq!(polls, 3, "exactly the budgeted number of polls");
    }

    #[test]
    fn zero_budget_never_polls() {
        let mut polled = false;
        let result = BoundedSpin::new(0).wait_until(|| {
            polled = true;
            true
        });
        assert_eq!(result, Err(TransferError::Timeout));
        assert!(!polled);
    }

    #[test]
    fn timeout_maps_to_other_error_kind() {
        use embedded_hal::spi::Error as _;
        assert_eq!(TransferError::Timeout.kind(), ErrorKind::Other);
    }
}
