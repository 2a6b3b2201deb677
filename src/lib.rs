//! Transport stack for the CLEALINK E220-900T22S(JP) LoRa module
//!
//! Layers, bottom up:
//! - [`link`]: the module driver, covering UART frame RX/TX with the quiet-gap
//!   receive heuristic, register configuration, mode switching and
//!   Time-on-Air math, all behind hardware-abstraction traits.
//! - [`protocol`]: a stop-and-wait ARQ transport that fragments payloads
//!   of up to ~48 KiB, with optional per-fragment ACKs and pluggable
//!   streaming compression.
//! - [`status`] / [`history`]: shared transfer progress and a ring of
//!   per-transmission outcome records with CSV export.
//! - [`adr`]: recommends rate/power settings from the recorded outcomes.
//!
//! Everything above the hardware traits is host-testable; enable the
//! `embedded` feature for the embassy/embedded-hal bindings in [`hal`].

#![cfg_attr(not(test), no_std)]

pub mod adr;
pub mod config;
pub mod history;
pub mod link;
pub mod protocol;
pub mod status;
pub mod time;

#[cfg(feature = "embedded")]
pub mod hal;

pub use history::{CommHistory, CommLogEntry};
pub use link::{E220Radio, Frame, FrameChannel, RadioConfig, ReceiveMode};
pub use protocol::{LoraTransport, NodeConfig, TransportError};
pub use status::{TransferProgress, TransferStatus};
pub use time::Clock;
