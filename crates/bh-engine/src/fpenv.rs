//! Scoped floating-point environment for calls into objective code.
//!
//! Native objectives may have been built expecting invalid-operation,
//! division-by-zero and overflow exceptions to be non-trapping. The guard
//! masks those three traps on the current thread and restores the previous
//! control word when dropped.

use std::marker::PhantomData;

#[cfg(target_arch = "x86_64")]
mod imp {
    use std::arch::asm;

    // MXCSR exception mask bits: IM (7), ZM (9), OM (10)
    const TRAP_MASKS: u32 = (1 << 7) | (1 << 9) | (1 << 10);

    pub(super) type ControlWord = u32;

    pub(super) fn read() -> ControlWord {
        let mut csr: u32 = 0;
        // SAFETY: stmxcsr stores 4 bytes into `csr`, a live local; SSE is
        // baseline on x86_64.
        unsafe {
            asm!("stmxcsr [{}]", in(reg) std::ptr::addr_of_mut!(csr), options(nostack, preserves_flags));
        }
        csr
    }

    pub(super) fn write(csr: ControlWord) {
        // SAFETY: ldmxcsr reads 4 bytes from `csr`. Callers pass a word read
        // back from stmxcsr with only mask bits set, so no reserved bit is set.
        unsafe {
            asm!("ldmxcsr [{}]", in(reg) std::ptr::addr_of!(csr), options(nostack, readonly, preserves_flags));
        }
    }

    pub(super) fn with_traps_masked(csr: ControlWord) -> ControlWord {
        csr | TRAP_MASKS
    }

    pub(super) fn traps_masked(csr: ControlWord) -> bool {
        csr & TRAP_MASKS == TRAP_MASKS
    }
}

#[cfg(target_arch = "aarch64")]
mod imp {
    use std::arch::asm;

    // FPCR trap enable bits: IOE (8), DZE (9), OFE (10)
    const TRAP_ENABLES: u64 = (1 << 8) | (1 << 9) | (1 << 10);

    pub(super) type ControlWord = u64;

    pub(super) fn read() -> ControlWord {
        let fpcr: u64;
        // SAFETY: FPCR is readable at EL0 and the read touches no memory.
        unsafe {
            asm!("mrs {}, fpcr", out(reg) fpcr, options(nomem, nostack, preserves_flags));
        }
        fpcr
    }

    pub(super) fn write(fpcr: ControlWord) {
        // SAFETY: FPCR is writable at EL0. Callers pass a word read back from
        // FPCR with only trap enable bits cleared.
        unsafe {
            asm!("msr fpcr, {}", in(reg) fpcr, options(nomem, nostack, preserves_flags));
        }
    }

    pub(super) fn with_traps_masked(fpcr: ControlWord) -> ControlWord {
        fpcr & !TRAP_ENABLES
    }

    pub(super) fn traps_masked(fpcr: ControlWord) -> bool {
        fpcr & TRAP_ENABLES == 0
    }
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
mod imp {
    // traps are off by default on the remaining targets Rust supports
    pub(super) type ControlWord = ();

    pub(super) fn read() -> ControlWord {}

    pub(super) fn write(_: ControlWord) {}

    pub(super) fn with_traps_masked(_: ControlWord) -> ControlWord {}

    pub(super) fn traps_masked(_: ControlWord) -> bool {
        true
    }
}

/// Masks FP traps on this thread until dropped.
///
/// Not `Send`: the control word is per-thread state.
#[must_use = "traps are restored as soon as the guard is dropped"]
pub struct FpEnvGuard {
    saved: imp::ControlWord,
    _thread_bound: PhantomData<*const ()>,
}

impl FpEnvGuard {
    pub fn mask_traps() -> Self {
        let saved = imp::read();
        imp::write(imp::with_traps_masked(saved));
        Self {
            saved,
            _thread_bound: PhantomData,
        }
    }

    /// Whether the three traps are currently masked on this thread.
    pub fn traps_masked() -> bool {
        imp::traps_masked(imp::read())
    }
}

impl Drop for FpEnvGuard {
    fn drop(&mut self) {
        imp::write(self.saved);
    }
}
