use std::{io, mem, ptr};

use libc::c_int;

use crate::Signal;

/// The various signals we bind, in the order they are bound
pub const FATAL_SIGNALS: [Signal; 7] = [
    Signal::Segv,
    Signal::Bus,
    Signal::Abort,
    Signal::Fpe,
    Signal::Terminate,
    Signal::Interrupt,
    Signal::Illegal,
];

impl Signal {
    /// Checks whether this signal is currently routed to the dispatcher
    pub fn is_bound(self) -> bool {
        // SAFETY: syscall, only queries the current disposition
        unsafe {
            let mut current: libc::sigaction = mem::zeroed();
            libc::sigaction(self.raw(), ptr::null(), &mut current) == 0
                && current.sa_sigaction == handler_address(crate::handler::signal_handler)
        }
    }
}

/// The smallest alternate signal stack we are willing to dispatch on.
///
/// The memory is only committed if a signal is actually handled on it.
const SIG_STACK_SIZE: usize = if libc::SIGSTKSZ > 16 * 1024 {
    libc::SIGSTKSZ
} else {
    16 * 1024
};

/// Makes sure the calling thread has an alternate signal stack, so that a
/// stack overflow on it can still be reported.
///
/// Threads started by the Rust runtime usually have one already, threads
/// created by foreign code don't. Returns `true` if a new stack was mapped,
/// it is never unmapped.
pub(crate) unsafe fn install_sigaltstack() -> io::Result<bool> {
    unsafe {
        let mut old_stack: libc::stack_t = mem::zeroed();
        if libc::sigaltstack(ptr::null(), &mut old_stack) == -1 {
            return Err(io::Error::last_os_error());
        }

        if old_stack.ss_flags & libc::SS_DISABLE == 0 && old_stack.ss_size >= SIG_STACK_SIZE {
            return Ok(false);
        }

        // One guard page below the stack itself
        let guard_size = libc::sysconf(libc::_SC_PAGESIZE) as usize;
        let alloc_size = guard_size + SIG_STACK_SIZE;

        let mapping = libc::mmap(
            ptr::null_mut(),
            alloc_size,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        );
        if mapping == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let stack_ptr = mapping.cast::<u8>().add(guard_size).cast::<libc::c_void>();
        if libc::mprotect(stack_ptr, SIG_STACK_SIZE, libc::PROT_READ | libc::PROT_WRITE) == -1 {
            let err = io::Error::last_os_error();
            libc::munmap(mapping, alloc_size);
            return Err(err);
        }

        let new_stack = libc::stack_t {
            ss_sp: stack_ptr,
            ss_flags: 0,
            ss_size: SIG_STACK_SIZE,
        };
        if libc::sigaltstack(&new_stack, ptr::null_mut()) == -1 {
            let err = io::Error::last_os_error();
            libc::munmap(mapping, alloc_size);
            return Err(err);
        }

        Ok(true)
    }
}

#[inline]
fn handler_address(handler: extern "C" fn(c_int)) -> libc::sighandler_t {
    handler as libc::sighandler_t
}

/// Replaces the disposition of the signal with the specified handler
pub(crate) unsafe fn bind(signal: Signal, handler: extern "C" fn(c_int)) -> io::Result<()> {
    unsafe {
        let mut sa: libc::sigaction = mem::zeroed();
        if libc::sigemptyset(&mut sa.sa_mask) == -1 {
            return Err(io::Error::last_os_error());
        }

        // Hold off the other fatal signals on this thread while one of them is
        // being dispatched, a fault inside the dispatcher then takes the
        // process down rather than recursing
        for sig in FATAL_SIGNALS {
            libc::sigaddset(&mut sa.sa_mask, sig.raw());
        }

        sa.sa_sigaction = handler_address(handler);
        // Run on the alternate signal stack if the faulting thread has one,
        // otherwise a stack overflow can't be reported. See
        // `install_sigaltstack`
        sa.sa_flags = libc::SA_ONSTACK;

        if libc::sigaction(signal.raw(), &sa, ptr::null_mut()) == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}
