use crate::Signal;

/// An error that can occur while binding the fatal signals to the dispatcher
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The OS refused to replace the disposition of a signal. The remaining
    /// signals are still bound.
    #[error("can't set up a signal handler for {signal}")]
    Register {
        signal: Signal,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// The signal this error pertains to
    #[inline]
    pub fn signal(&self) -> Signal {
        match self {
            Self::Register { signal, .. } => *signal,
        }
    }
}
