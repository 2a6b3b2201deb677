//! Communication history ring and CSV export
//!
//! Every transmission the transport starts leaves one [`CommLogEntry`]
//! behind, successful or not. The fixed-capacity ring keeps the most
//! recent entries; [`CommHistory::export_csv`] renders them for offline
//! analysis, and the adaptive-rate advisor reads them at runtime.

use crate::config::history::HISTORY_SIZE;
use crate::link::settings::{AirDataRate, TransmitPower};
use core::fmt::Write;
use heapless::HistoryBuffer;
use log::info;

/// Outcome record of one transmission transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommLogEntry {
    /// Milliseconds since boot when the transaction started
    pub timestamp_ms: u32,
    /// Total payload size of the transaction in bytes
    pub data_size: u32,
    /// Air data rate the transaction ran at
    pub air_data_rate: AirDataRate,
    /// Transmit power the transaction ran at
    pub transmitting_power: TransmitPower,
    /// Whether per-fragment ACKs were requested
    pub ack_requested: bool,
    /// Whether every requested ACK arrived
    pub ack_success: bool,
    /// RSSI of the last ACK received, if any
    pub last_ack_rssi: Option<i16>,
    /// Retransmissions summed over all fragments
    pub total_retries: u16,
}

/// Ring of the most recent [`CommLogEntry`] records.
///
/// Oldest entries are overwritten once `N` is exceeded.
pub struct CommHistory<const N: usize = HISTORY_SIZE> {
    entries: HistoryBuffer<CommLogEntry, N>,
}

impl<const N: usize> CommHistory<N> {
    pub const fn new() -> Self {
        Self {
            entries: HistoryBuffer::new(),
        }
    }

    pub fn append(&mut self, entry: CommLogEntry) {
        self.entries.write(entry);
    }

    /// Entries oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &CommLogEntry> {
        self.entries.oldest_ordered()
    }

    /// Most recently appended entry.
    pub fn latest(&self) -> Option<&CommLogEntry> {
        self.entries.recent()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Write the history as CSV, oldest entry first.
    ///
    /// Enums are rendered as their register codes, booleans as 0/1, and a
    /// missing ACK RSSI as 0 so each row stays numeric.
    pub fn export_csv<W: Write>(&self, out: &mut W) -> core::fmt::Result {
        writeln!(
            out,
            "timestamp_lo,data_size,air_data_rate,transmitting_power,\
             ack_requested,ack_success,last_ack_rssi,total_retries"
        )?;
        for entry in self.iter() {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                entry.timestamp_ms,
                entry.data_size,
                entry.air_data_rate as u8,
                entry.transmitting_power as u8,
                entry.ack_requested as u8,
                entry.ack_success as u8,
                entry.last_ack_rssi.unwrap_or(0),
                entry.total_retries,
            )?;
        }
        Ok(())
    }

    /// Dump the history through the logger, one line per entry.
    pub fn dump(&self) {
        info!("comm history ({} entries)", self.len());
        for (i, entry) in self.iter().enumerate() {
            info!(
                "  [{}] t={}ms size={} rate={:?} power={:?} ack={}/{} rssi={:?} retries={}",
                i,
                entry.timestamp_ms,
                entry.data_size,
                entry.air_data_rate,
                entry.transmitting_power,
                entry.ack_requested as u8,
                entry.ack_success as u8,
                entry.last_ack_rssi,
                entry.total_retries,
            );
        }
    }
}

impl<const N: usize> Default for CommHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}
