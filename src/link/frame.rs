//! Logical radio frames and the frame channel seam
//!
//! A [`Frame`] is one receive episode as the module delivers it: up to 200
//! payload bytes plus a trailing RSSI byte that the receiver strips. The
//! [`FrameChannel`] trait is the boundary between the hardware driver and
//! the transport protocol, so the protocol state machine can be tested
//! against a scripted channel.

use crate::config::frame::MAX_FRAME_PAYLOAD;
use crate::link::traits::LinkError;
use core::future::Future;
use heapless::Vec;

/// One received radio frame with its signal strength.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Payload bytes (trailing RSSI byte already removed)
    pub data: Vec<u8, MAX_FRAME_PAYLOAD>,
    /// Received signal strength in dBm (always negative)
    pub rssi: i16,
}

impl Frame {
    /// Build a frame from a raw receive buffer whose last byte is the
    /// RSSI indicator (unsigned representation of a negative dBm value).
    pub fn from_raw(raw: &[u8]) -> Option<Self> {
        let (rssi_byte, payload) = raw.split_last()?;
        let mut data = Vec::new();
        data.extend_from_slice(payload).ok()?;
        Some(Self {
            data,
            rssi: *rssi_byte as i16 - 256,
        })
    }
}

/// Frame-level interface to one radio.
///
/// Implemented by the hardware driver ([`E220Radio`](crate::link::E220Radio))
/// and by the test mock.
pub trait FrameChannel {
    /// Transmit `data` to `(dest_address, dest_channel)` and wait for the
    /// transmission to leave the air.
    fn send_frame(
        &mut self,
        dest_address: u16,
        dest_channel: u8,
        data: &[u8],
    ) -> impl Future<Output = Result<(), LinkError>>;

    /// Receive one frame, waiting up to `timeout_ms` for it to start.
    fn receive_frame(&mut self, timeout_ms: u32) -> impl Future<Output = Result<Frame, LinkError>>;
}
