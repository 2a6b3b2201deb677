//! Hardware bindings for embassy-based targets
//!
//! Adapts concrete UART/GPIO peripherals to the link-layer traits. The
//! UART receive side is expected to be interrupt-fed into a
//! `heapless::spsc` queue; pass its consumer end here.

use crate::link::traits::{AuxSignal, ByteLink, LinkError, ModePins};
use embassy_time::{with_timeout, Duration};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::digital::Wait;
use embedded_io_async::Write;
use heapless::spsc::Consumer;

pub use crate::time::EmbassyClock;

/// Hook for reprogramming the UART divider on mode switches.
///
/// Peripherals that cannot change rate at runtime may accept silently
/// as long as both operating rates match.
pub trait BaudControl {
    fn set_baud(&mut self, baud: u32) -> Result<(), LinkError>;
}

/// [`ByteLink`] over an async UART writer and an interrupt-fed RX queue.
pub struct UartLink<'a, W, B, const N: usize>
where
    W: Write,
    B: BaudControl,
{
    tx: W,
    rx: Consumer<'a, u8, N>,
    baud: B,
}

impl<'a, W, B, const N: usize> UartLink<'a, W, B, N>
where
    W: Write,
    B: BaudControl,
{
    pub fn new(tx: W, rx: Consumer<'a, u8, N>, baud: B) -> Self {
        Self { tx, rx, baud }
    }
}

impl<'a, W, B, const N: usize> ByteLink for UartLink<'a, W, B, N>
where
    W: Write,
    B: BaudControl,
{
    async fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.tx
            .write_all(data)
            .await
            .map_err(|_| LinkError::WriteFailed)?;
        self.tx.flush().await.map_err(|_| LinkError::WriteFailed)
    }

    fn available(&self) -> usize {
        self.rx.len()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.rx.dequeue()
    }

    fn set_baud_rate(&mut self, baud: u32) -> Result<(), LinkError> {
        self.baud.set_baud(baud)
    }
}

/// [`ModePins`] over two push-pull GPIO outputs.
pub struct GpioModePins<P0, P1>
where
    P0: OutputPin,
    P1: OutputPin,
{
    m0: P0,
    m1: P1,
}

impl<P0, P1> GpioModePins<P0, P1>
where
    P0: OutputPin,
    P1: OutputPin,
{
    pub fn new(m0: P0, m1: P1) -> Self {
        Self { m0, m1 }
    }
}

impl<P0, P1> ModePins for GpioModePins<P0, P1>
where
    P0: OutputPin,
    P1: OutputPin,
{
    fn set_levels(&mut self, m0: bool, m1: bool) {
        let _ = self.m0.set_state(m0.into());
        let _ = self.m1.set_state(m1.into());
    }
}

/// [`AuxSignal`] over the module's AUX pin.
///
/// AUX idles high, goes low while the module is busy and drops on
/// incoming data, so end-of-transmission is a high level and start of
/// reception a falling edge.
pub struct AuxLine<P: Wait> {
    pin: P,
}

impl<P: Wait> AuxLine<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }
}

impl<P: Wait> AuxSignal for AuxLine<P> {
    fn is_present(&self) -> bool {
        true
    }

    async fn wait_tx_done(&mut self, timeout_ms: u32) -> Result<(), LinkError> {
        let wait = self.pin.wait_for_high();
        match with_timeout(Duration::from_millis(timeout_ms as u64), wait).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(LinkError::Unsupported),
            Err(_) => Err(LinkError::Timeout),
        }
    }

    async fn wait_rx_start(&mut self, timeout_ms: u32) -> Result<(), LinkError> {
        let wait = self.pin.wait_for_falling_edge();
        match with_timeout(Duration::from_millis(timeout_ms as u64), wait).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(LinkError::Unsupported),
            Err(_) => Err(LinkError::Timeout),
        }
    }
}
