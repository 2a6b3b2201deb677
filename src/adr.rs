//! Adaptive data-rate advisor
//!
//! Maps the outcome of the most recent transmission to a recommended
//! air-data-rate / power pair. Classification itself is behind the
//! [`LinkClassifier`] trait so a model (or a plain heuristic) can be
//! plugged in; the advisor owns the class-to-configuration map.

use crate::history::{CommHistory, CommLogEntry};
use crate::link::settings::{AirDataRate, TransmitPower};
use log::debug;

/// The classifier could not produce a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyError;

/// Advisor failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisorError {
    /// No history to reason about yet
    NotReady,
    /// The classifier failed or produced an unknown class
    InferenceFailed,
}

/// Link-quality features extracted from one log entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkFeatures {
    /// RSSI of the last ACK, 0 when none was received
    pub last_ack_rssi: i16,
    /// Retransmissions over the whole transaction
    pub total_retries: u16,
    /// Whether the transaction was fully acknowledged
    pub ack_success: bool,
    /// Spreading factor the transaction ran at
    pub spreading_factor: u32,
    /// Bandwidth in kHz the transaction ran at
    pub bandwidth_khz: u32,
}

impl From<&CommLogEntry> for LinkFeatures {
    fn from(entry: &CommLogEntry) -> Self {
        Self {
            last_ack_rssi: entry.last_ack_rssi.unwrap_or(0),
            total_retries: entry.total_retries,
            ack_success: entry.ack_success,
            spreading_factor: entry.air_data_rate.spreading_factor(),
            bandwidth_khz: entry.air_data_rate.bandwidth_khz(),
        }
    }
}

/// Maps link features to a class index into the advisor's table.
pub trait LinkClassifier {
    fn classify(&mut self, features: &LinkFeatures) -> Result<usize, ClassifyError>;
}

/// A rate/power pair the advisor suggests applying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendedConfig {
    pub air_data_rate: AirDataRate,
    pub transmit_power: TransmitPower,
}

/// Class index to configuration, ordered from best to worst link.
const CLASS_MAP: [RecommendedConfig; 4] = [
    RecommendedConfig {
        air_data_rate: AirDataRate::Sf7Bw500,
        transmit_power: TransmitPower::Dbm13,
    },
    RecommendedConfig {
        air_data_rate: AirDataRate::Sf7Bw125,
        transmit_power: TransmitPower::Dbm13,
    },
    RecommendedConfig {
        air_data_rate: AirDataRate::Sf9Bw125,
        transmit_power: TransmitPower::Dbm13,
    },
    RecommendedConfig {
        air_data_rate: AirDataRate::Sf11Bw500,
        transmit_power: TransmitPower::Dbm13,
    },
];

/// Advisor bound to one classifier.
pub struct AdaptiveRateAdvisor<M: LinkClassifier> {
    classifier: M,
}

impl<M: LinkClassifier> AdaptiveRateAdvisor<M> {
    pub fn new(classifier: M) -> Self {
        Self { classifier }
    }

    /// Recommend a configuration from the most recent transmission.
    pub fn recommend(&mut self, history: &CommHistory) -> Result<RecommendedConfig, AdvisorError> {
        let entry = history.latest().ok_or(AdvisorError::NotReady)?;
        let features = LinkFeatures::from(entry);
        let class = self
            .classifier
            .classify(&features)
            .map_err(|_| AdvisorError::InferenceFailed)?;
        let recommended = CLASS_MAP
            .get(class)
            .copied()
            .ok_or(AdvisorError::InferenceFailed)?;
        debug!("link class {} -> {:?}", class, recommended.air_data_rate);
        Ok(recommended)
    }
}
