//! # Architecture Abstraction Layer
//!
//! The only thing the lock needs from a port is control over the calling
//! core's interrupt mask. Each port implements [`Interrupt`] for its own
//! `ArchInterrupt`:
//!
//! - [`hosted`]: threads pinned to host cores, interrupts modelled per core
//! - [`rp2040`]: PRIMASK on each Cortex-M0+ core, plus the SIO hardware
//!   spinlock

#[cfg(feature = "std")]
pub mod hosted;

#[cfg(all(feature = "rp2040", target_os = "none"))]
pub mod rp2040;

/// Save, disable and restore the calling core's interrupts.
///
/// The flag returned by [`Interrupt::get_flag`] is opaque to callers; it is
/// only ever handed back to [`Interrupt::set_flag`] on the same core.
pub trait Interrupt {
    /// Get current interrupt flag(s).
    fn get_flag() -> usize;

    /// Disable interrupts on the calling core.
    fn disable();

    /// Set interrupt flag(s).
    fn set_flag(flag: usize);
}
