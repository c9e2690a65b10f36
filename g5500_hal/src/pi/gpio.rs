//! Memory-mapped BCM GPIO block.
//!
//! Maps the GPIO register window from `/dev/gpiomem` (no root required on
//! a stock Raspberry Pi OS) and drives pins through the GPFSEL / GPSET0 /
//! GPCLR0 registers with volatile accesses.

use std::ffi::c_void;
use std::fs::OpenOptions;
use std::num::NonZeroUsize;
use std::os::fd::AsFd;
use std::ptr::NonNull;

use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};
use tracing::debug;

use crate::driver::HalError;

const GPIO_DEV: &str = "/dev/gpiomem";
const GPIO_BLOCK_LEN: NonZeroUsize = NonZeroUsize::new(4096).unwrap();

// Word offsets into the GPIO register block.
const GPFSEL0: usize = 0;
const GPSET0: usize = 7;
const GPCLR0: usize = 10;
const GPLEV0: usize = 13;

const FSEL_OUTPUT: u32 = 0b001;
const FSEL_MASK: u32 = 0b111;

/// GPFSEL register index for a BCM pin (ten pins per register).
const fn fsel_reg(pin: u8) -> usize {
    GPFSEL0 + pin as usize / 10
}

/// Bit shift of a pin's three-bit function field within its GPFSEL register.
const fn fsel_shift(pin: u8) -> u32 {
    (pin as u32 % 10) * 3
}

/// Mapped GPIO register window.
pub struct GpioBlock {
    base: NonNull<c_void>,
}

// The mapping is exclusively owned and only touched through &mut methods.
unsafe impl Send for GpioBlock {}

impl GpioBlock {
    /// Map the GPIO block.
    pub fn open() -> Result<Self, HalError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(GPIO_DEV)
            .map_err(|e| HalError::InitFailed(format!("open {GPIO_DEV}: {e}")))?;

        let base = unsafe {
            mmap(
                None,
                GPIO_BLOCK_LEN,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file.as_fd(),
                0 as libc::off_t,
            )
        }
        .map_err(|e| HalError::InitFailed(format!("mmap {GPIO_DEV}: {e}")))?;

        debug!("GPIO block mapped");
        Ok(Self { base })
    }

    fn word(&self, offset: usize) -> *mut u32 {
        debug_assert!(offset < GPIO_BLOCK_LEN.get() / 4);
        self.base.as_ptr().cast::<u32>().wrapping_add(offset)
    }

    /// Configure a pin as an output.
    pub fn set_output(&mut self, pin: u8) {
        let reg = self.word(fsel_reg(pin));
        let shift = fsel_shift(pin);
        unsafe {
            let cur = reg.read_volatile();
            reg.write_volatile((cur & !(FSEL_MASK << shift)) | (FSEL_OUTPUT << shift));
        }
    }

    /// Drive a pin high or low. Set/clear registers make this idempotent.
    pub fn write(&mut self, pin: u8, high: bool) {
        let reg = self.word(if high { GPSET0 } else { GPCLR0 });
        unsafe { reg.write_volatile(1 << pin) };
    }

    /// Read back a pin level.
    pub fn level(&self, pin: u8) -> bool {
        let lev = unsafe { self.word(GPLEV0).read_volatile() };
        lev & (1 << pin) != 0
    }
}

impl Drop for GpioBlock {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.base, GPIO_BLOCK_LEN.get());
        }
    }
}
