//! Hardware abstraction traits for the module's UART and control lines
//!
//! The radio driver is written against these traits so the real UART/GPIO
//! bindings can be swapped with mocks for testing.

use core::future::Future;

/// Errors reported by the byte transport and control lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// UART write failed
    WriteFailed,
    /// Baud rate could not be applied
    BaudRateRejected,
    /// A bounded wait elapsed
    Timeout,
    /// Payload exceeds what the current configuration allows
    InvalidArgument,
    /// The operation needs a hardware signal this board does not wire up
    Unsupported,
}

/// Byte transport to the module: UART TX plus an interrupt-fed RX ring.
///
/// `available`/`read_byte` are non-blocking views of the ring so the frame
/// receiver can implement its quiet-gap heuristic on top.
pub trait ByteLink {
    /// Write raw bytes to the module.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), LinkError>>;

    /// Number of received bytes currently buffered.
    fn available(&self) -> usize;

    /// Pop one buffered byte, if any.
    fn read_byte(&mut self) -> Option<u8>;

    /// Reprogram the UART baud rate (mode switches need this).
    ///
    /// Implementations without a baud helper may accept silently.
    fn set_baud_rate(&mut self, baud: u32) -> Result<(), LinkError>;
}

/// The two mode-select GPIO lines (M0, M1).
pub trait ModePins {
    fn set_levels(&mut self, m0: bool, m1: bool);
}

/// Optional AUX/busy line from the module.
///
/// When wired, it replaces fixed delays with precise event waits: a rising
/// edge ends a transmission, a falling edge announces incoming data.
pub trait AuxSignal {
    /// Whether the line is physically connected.
    fn is_present(&self) -> bool;

    /// Wait for the end-of-transmission edge, bounded by `timeout_ms`.
    fn wait_tx_done(&mut self, timeout_ms: u32) -> impl Future<Output = Result<(), LinkError>>;

    /// Wait for the start-of-reception edge, bounded by `timeout_ms`.
    fn wait_rx_start(&mut self, timeout_ms: u32) -> impl Future<Output = Result<(), LinkError>>;
}

/// AUX line stand-in for boards that leave the pin unconnected.
///
/// Every wait reports [`LinkError::Unsupported`]; the radio falls back to
/// computed Time-on-Air delays for transmission and polling for reception.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAux;

impl AuxSignal for NoAux {
    fn is_present(&self) -> bool {
        false
    }

    async fn wait_tx_done(&mut self, _timeout_ms: u32) -> Result<(), LinkError> {
        Err(LinkError::Unsupported)
    }

    async fn wait_rx_start(&mut self, _timeout_ms: u32) -> Result<(), LinkError> {
        Err(LinkError::Unsupported)
    }
}
