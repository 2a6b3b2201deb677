//! E220-900T22S(JP) driver
//!
//! Wraps a [`ByteLink`] (UART), the two mode pins and the optional AUX
//! line, and implements [`FrameChannel`] for the transport protocol.
//!
//! The module has no frame-length field on the wire, so reception relies
//! on a quiet-gap heuristic: once bytes have been seen and the link stays
//! silent past a short grace period, the frame is complete.

use crate::config::command::{CONFIGURATION_MODE_BAUD, CONFIG_COMMAND_LEN};
use crate::config::frame::{ADDRESS_PREFIX_LEN, MAX_FRAME_PAYLOAD, MAX_RECV_BUFFER};
use crate::config::timing;
use crate::link::airtime::time_on_air_ms;
use crate::link::command::{encode_config, verify_response, CommandError};
use crate::link::frame::{Frame, FrameChannel};
use crate::link::settings::{Mode, RadioConfig};
use crate::link::traits::{AuxSignal, ByteLink, LinkError, ModePins};
use crate::time::Clock;
use heapless::Vec;
use log::{debug, warn};

/// How `receive_frame` detects the start of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReceiveMode {
    /// Poll the RX ring; portable, works without the AUX line.
    #[default]
    Polling,
    /// Wait for the AUX falling edge; requires the AUX line.
    EventDriven,
}

/// Errors from module configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    Link(LinkError),
    Config(CommandError),
}

impl From<LinkError> for RadioError {
    fn from(e: LinkError) -> Self {
        RadioError::Link(e)
    }
}

impl From<CommandError> for RadioError {
    fn from(e: CommandError) -> Self {
        RadioError::Config(e)
    }
}

/// Driver for one E220 module.
pub struct E220Radio<L, P, A, K>
where
    L: ByteLink,
    P: ModePins,
    A: AuxSignal,
    K: Clock,
{
    link: L,
    pins: P,
    aux: A,
    clock: K,
    config: RadioConfig,
    receive_mode: ReceiveMode,
}

impl<L, P, A, K> E220Radio<L, P, A, K>
where
    L: ByteLink,
    P: ModePins,
    A: AuxSignal,
    K: Clock,
{
    /// Create a driver with the module's factory-default configuration.
    pub fn new(link: L, pins: P, aux: A, clock: K) -> Self {
        Self {
            link,
            pins,
            aux,
            clock,
            config: RadioConfig::default(),
            receive_mode: ReceiveMode::Polling,
        }
    }

    pub fn with_receive_mode(mut self, mode: ReceiveMode) -> Self {
        self.receive_mode = mode;
        self
    }

    /// Configuration the module currently runs with.
    pub fn config(&self) -> &RadioConfig {
        &self.config
    }

    /// Write a new register configuration to the module.
    ///
    /// The module must answer with a 0xC1 echo of the command; anything
    /// else leaves the stored configuration untouched. The caller is
    /// responsible for switching back to an operating mode afterwards.
    pub async fn init_module(&mut self, config: RadioConfig) -> Result<(), RadioError> {
        self.enter_mode(Mode::Configuration).await?;

        let command = encode_config(&config);
        debug!("config command: {:02x?}", command);
        self.link.write(&command).await?;
        self.clock
            .sleep_ms(timing::CONFIG_RESPONSE_DELAY_MS)
            .await;

        let mut response: Vec<u8, CONFIG_COMMAND_LEN> = Vec::new();
        while let Some(byte) = self.link.read_byte() {
            if response.push(byte).is_err() {
                break;
            }
        }
        debug!("config response: {:02x?}", response.as_slice());
        verify_response(&response)?;

        self.config = config;
        Ok(())
    }

    pub async fn switch_to_normal_mode(&mut self) -> Result<(), LinkError> {
        self.enter_mode(Mode::Normal).await
    }

    pub async fn switch_to_wor_sending_mode(&mut self) -> Result<(), LinkError> {
        self.enter_mode(Mode::WorSend).await
    }

    pub async fn switch_to_wor_receiving_mode(&mut self) -> Result<(), LinkError> {
        self.enter_mode(Mode::WorReceive).await
    }

    pub async fn switch_to_configuration_mode(&mut self) -> Result<(), LinkError> {
        self.enter_mode(Mode::Configuration).await
    }

    async fn enter_mode(&mut self, mode: Mode) -> Result<(), LinkError> {
        // Configuration mode always talks at 9600 bps regardless of the
        // configured UART rate.
        let baud = match mode {
            Mode::Configuration => CONFIGURATION_MODE_BAUD,
            _ => self.config.baud_rate.bps(),
        };
        self.link.set_baud_rate(baud)?;

        let (m0, m1) = mode.pin_levels();
        self.pins.set_levels(m0, m1);
        self.clock.sleep_ms(timing::MODE_SWITCH_SETTLE_MS).await;
        Ok(())
    }

    /// Drop any bytes the module echoed back after a transmission.
    fn flush_rx(&mut self) {
        while self.link.read_byte().is_some() {}
    }

    fn complete_frame(raw: &[u8]) -> Result<Frame, LinkError> {
        Frame::from_raw(raw).ok_or(LinkError::Timeout)
    }

    async fn receive_polling(&mut self, timeout_ms: u32) -> Result<Frame, LinkError> {
        let deadline = self.clock.now_ms() + timeout_ms as u64;
        let mut raw: Vec<u8, MAX_RECV_BUFFER> = Vec::new();

        loop {
            while let Some(byte) = self.link.read_byte() {
                // Force-terminate on a full buffer rather than erroring
                let _ = raw.push(byte);
                if raw.is_full() {
                    return Self::complete_frame(&raw);
                }
            }

            if raw.is_empty() {
                if self.clock.now_ms() >= deadline {
                    return Err(LinkError::Timeout);
                }
                self.clock.sleep_ms(timing::POLL_IDLE_MS).await;
            } else {
                // Bytes seen and the ring just drained: wait out the
                // grace period, then re-check for quiescence.
                self.clock.sleep_ms(timing::QUIET_GAP_POLL_MS).await;
                if self.link.available() == 0 {
                    return Self::complete_frame(&raw);
                }
            }
        }
    }

    async fn receive_event(&mut self, timeout_ms: u32) -> Result<Frame, LinkError> {
        if !self.aux.is_present() {
            return Err(LinkError::Unsupported);
        }

        self.aux.wait_rx_start(timeout_ms).await?;

        // The start edge is precise, so the grace period is short. Count
        // it down in 1 ms steps and reset on every received byte.
        let mut grace = timing::QUIET_GAP_EVENT_MS;
        let mut raw: Vec<u8, MAX_RECV_BUFFER> = Vec::new();
        while grace > 0 {
            if let Some(byte) = self.link.read_byte() {
                let _ = raw.push(byte);
                if raw.is_full() {
                    break;
                }
                grace = timing::QUIET_GAP_EVENT_MS;
            } else {
                self.clock.sleep_ms(1).await;
                grace -= 1;
            }
        }

        if raw.is_empty() {
            // Reception was signalled but nothing arrived: an empty
            // frame, not a failure.
            return Ok(Frame {
                data: Vec::new(),
                rssi: 0,
            });
        }
        Self::complete_frame(&raw)
    }
}

impl<L, P, A, K> FrameChannel for E220Radio<L, P, A, K>
where
    L: ByteLink,
    P: ModePins,
    A: AuxSignal,
    K: Clock,
{
    async fn send_frame(
        &mut self,
        dest_address: u16,
        dest_channel: u8,
        data: &[u8],
    ) -> Result<(), LinkError> {
        // The address prefix counts against the module's subpacket size
        if data.len() + ADDRESS_PREFIX_LEN > self.config.payload_size.max_bytes() {
            return Err(LinkError::InvalidArgument);
        }

        let mut wire: Vec<u8, MAX_FRAME_PAYLOAD> = Vec::new();
        let prefix = [
            (dest_address >> 8) as u8,
            (dest_address & 0xFF) as u8,
            dest_channel,
        ];
        wire.extend_from_slice(&prefix)
            .map_err(|_| LinkError::InvalidArgument)?;
        wire.extend_from_slice(data)
            .map_err(|_| LinkError::InvalidArgument)?;

        self.link.write(&wire).await?;

        let wait_outcome = if self.aux.is_present() {
            self.aux.wait_tx_done(timing::TX_DONE_TIMEOUT_MS).await
        } else {
            let toa = time_on_air_ms(self.config.air_data_rate, wire.len());
            self.clock
                .sleep_ms(toa + timing::TX_DONE_MARGIN_MS)
                .await;
            Ok(())
        };

        if wait_outcome.is_err() {
            warn!("tx-done wait timed out");
        }

        // The module may echo status bytes during transmission; they must
        // not be mistaken for the next frame.
        self.flush_rx();

        wait_outcome
    }

    async fn receive_frame(&mut self, timeout_ms: u32) -> Result<Frame, LinkError> {
        match self.receive_mode {
            ReceiveMode::Polling => self.receive_polling(timeout_ms).await,
            ReceiveMode::EventDriven => self.receive_event(timeout_ms).await,
        }
    }
}
