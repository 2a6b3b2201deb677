//! Fragment header codec for the stop-and-wait transport
//!
//! Every transport packet starts with an 8-byte header identifying the
//! sender, the transaction and the fragment's place in it. ACK packets
//! reuse the same layout with an empty payload.

use crate::config::transport::HEADER_SIZE;

/// Control bit: the sender expects an ACK for this fragment.
pub const CONTROL_ACK_REQUEST: u8 = 1 << 7;
/// Control bit: this packet is an ACK, not data.
pub const CONTROL_IS_ACK: u8 = 1 << 6;
/// Control bit: end of transaction, no further fragments follow.
pub const CONTROL_EOT: u8 = 1 << 5;

/// Parsed fragment header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Address of the sending node
    pub source_address: u16,
    /// Channel of the sending node
    pub source_channel: u8,
    /// Control flags (ACK request, ACK, EOT)
    pub control: u8,
    /// Identifies the transaction this fragment belongs to
    pub transaction_id: u8,
    /// Total number of fragments in the transaction
    pub total_packets: u8,
    /// Zero-based index of this fragment
    pub packet_index: u8,
    /// Number of payload bytes following the header
    pub payload_length: u8,
}

impl FragmentHeader {
    /// Serialise into the 8-byte wire layout (address big-endian).
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        [
            (self.source_address >> 8) as u8,
            (self.source_address & 0xFF) as u8,
            self.source_channel,
            self.control,
            self.transaction_id,
            self.total_packets,
            self.packet_index,
            self.payload_length,
        ]
    }

    /// Parse a header from the start of a received packet.
    ///
    /// Returns `None` when fewer than [`HEADER_SIZE`] bytes are present.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            source_address: u16::from_be_bytes([data[0], data[1]]),
            source_channel: data[2],
            control: data[3],
            transaction_id: data[4],
            total_packets: data[5],
            packet_index: data[6],
            payload_length: data[7],
        })
    }

    pub fn ack_requested(&self) -> bool {
        self.control & CONTROL_ACK_REQUEST != 0
    }

    pub fn is_ack(&self) -> bool {
        self.control & CONTROL_IS_ACK != 0
    }

    pub fn is_eot(&self) -> bool {
        self.control & CONTROL_EOT != 0
    }
}
