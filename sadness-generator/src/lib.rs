//! Various ways to make your program sad, one for each of the fatal signals
//! `crash-dispatch` intercepts.
//!
//! Where the architecture allows it the signal is the result of an actual
//! fault, otherwise it is sent with `raise`.

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
use std::arch::asm;

/// The kinds of sadness that can be generated
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SadnessFlavor {
    /// `SIGABRT`
    Abort,
    /// `SIGBUS`
    #[cfg(unix)]
    Bus,
    /// `SIGFPE`
    DivideByZero,
    /// `SIGILL`
    Illegal,
    /// `SIGSEGV`
    Segfault,
    /// `SIGSEGV`, on a thread's guard page. Windows reports this as a
    /// structured exception rather than a signal.
    #[cfg(unix)]
    StackOverflow,
    /// `SIGTERM`
    Terminate,
    /// `SIGINT`
    Interrupt,
}

impl SadnessFlavor {
    /// Makes the program sad in the manner of this flavor.
    ///
    /// `scratch_dir` is only used by [`Self::Bus`], which needs a file it can
    /// create and map.
    pub fn make_sad(self, scratch_dir: &std::path::Path) {
        match self {
            Self::Abort => raise_abort(),
            #[cfg(unix)]
            Self::Bus => raise_bus(&scratch_dir.join("sadness-bus")),
            Self::DivideByZero => raise_floating_point_exception(),
            Self::Illegal => raise_illegal_instruction(),
            Self::Segfault => raise_segfault(),
            #[cfg(unix)]
            Self::StackOverflow => raise_stack_overflow(),
            Self::Terminate => raise_terminate(),
            Self::Interrupt => raise_interrupt(),
        }

        #[cfg(not(unix))]
        let _ = scratch_dir;
    }
}

/// Raises `SIGABRT`
pub fn raise_abort() {
    std::process::abort();
}

/// Raises `SIGSEGV` by loading from the null page.
///
/// The load is done in assembly, a null dereference in Rust is caught by the
/// debug assertions and turned into an abort before it ever reaches memory.
/// Architectures we don't have a load for raise the signal directly.
pub fn raise_segfault() {
    #[cfg(target_arch = "x86_64")]
    {
        let value = unsafe {
            let value: u32;
            asm!(
                "mov {val:e}, dword ptr [{addr}]",
                addr = in(reg) 0usize,
                val = out(reg) value,
                options(nostack, readonly),
            );
            value
        };

        println!("we are crashing by accessing the null page: {value}");
    }

    #[cfg(target_arch = "aarch64")]
    {
        let value = unsafe {
            let value: u32;
            asm!(
                "ldr {val:w}, [{addr}]",
                addr = in(reg) 0usize,
                val = out(reg) value,
                options(nostack, readonly),
            );
            value
        };

        println!("we are crashing by accessing the null page: {value}");
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    raise_signal(libc::SIGSEGV);
}

/// Raises `SIGFPE` with an integer division by zero on `x86_64`. Other
/// architectures don't trap on that, so the signal is raised directly.
pub fn raise_floating_point_exception() {
    #[cfg(target_arch = "x86_64")]
    {
        let ohno = unsafe {
            let divisor: u32;
            asm!(
                "mov eax, 1",
                "cdq",
                "mov {div:e}, 0",
                "idiv {div:e}",
                div = out(reg) divisor,
                out("eax") _,
                out("edx") _,
            );
            divisor
        };

        println!("we are crashing by dividing by zero: {ohno}");
    }

    #[cfg(not(target_arch = "x86_64"))]
    raise_signal(libc::SIGFPE);
}

/// Raises `SIGILL` by executing an undefined instruction
pub fn raise_illegal_instruction() {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        asm!("ud2");
    }

    #[cfg(target_arch = "aarch64")]
    unsafe {
        asm!("udf #0");
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    raise_signal(libc::SIGILL);
}

/// Raises `SIGBUS` by reading from a mapping of an empty file.
///
/// The file at `path` is created, or truncated if it already exists.
#[cfg(unix)]
pub fn raise_bus(path: &std::path::Path) {
    use std::os::unix::ffi::OsStrExt;

    let path = std::ffi::CString::new(path.as_os_str().as_bytes())
        .expect("bus file path contains a NUL byte");

    unsafe {
        let bus_fd = libc::open(path.as_ptr(), libc::O_RDWR | libc::O_CREAT | libc::O_TRUNC, 0o666);
        assert!(bus_fd != -1, "failed to open {path:?}");

        let mapping = std::slice::from_raw_parts_mut(
            libc::mmap(
                std::ptr::null_mut(),
                128,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                bus_fd,
                0,
            )
            .cast::<u8>(),
            128,
        );

        println!("{}", mapping[1]);
    }
}

/// Raises `SIGSEGV` by blowing the stack of the calling thread
#[cfg(unix)]
pub fn raise_stack_overflow() {
    let mut big_boi = [0u8; 9 * 1024 * 1024];
    big_boi[big_boi.len() - 1] = 1;

    println!("{:?}", &big_boi[big_boi.len() - 20..]);
}

/// Raises `SIGTERM`
pub fn raise_terminate() {
    raise_signal(libc::SIGTERM);
}

/// Raises `SIGINT`
pub fn raise_interrupt() {
    raise_signal(libc::SIGINT);
}

#[inline]
fn raise_signal(signum: libc::c_int) {
    unsafe {
        libc::raise(signum);
    }
}
