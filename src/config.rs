//! Protocol and timing constants for the E220-900T22S(JP) stack

/// Physical frame limits
pub mod frame {
    /// Capacity of the raw receive buffer (payload + trailing RSSI byte)
    pub const MAX_RECV_BUFFER: usize = 201;

    /// Maximum payload bytes in one received frame (RSSI byte stripped)
    pub const MAX_FRAME_PAYLOAD: usize = 200;

    /// Bytes prefixed to every transmitted frame (address hi/lo + channel)
    pub const ADDRESS_PREFIX_LEN: usize = 3;
}

/// Transport-protocol fragment limits
pub mod transport {
    /// Size of the fragment header
    pub const HEADER_SIZE: usize = 8;

    /// Maximum application payload per fragment (197 - header)
    pub const MAX_FRAGMENT_PAYLOAD: usize = 197 - HEADER_SIZE;

    /// Largest payload one transaction can move (255 fragments)
    pub const MAX_TOTAL_SIZE: usize = 255 * MAX_FRAGMENT_PAYLOAD;

    /// Send attempts per fragment when an ACK is requested
    pub const RETRY_COUNT: u8 = 3;

    /// Wait budget for one ACK (also the inter-fragment receive budget)
    pub const ACK_TIMEOUT_MS: u32 = 2000;
}

/// Receive quiescence and polling intervals
pub mod timing {
    /// Quiet gap that terminates a frame in the polling receiver
    pub const QUIET_GAP_POLL_MS: u32 = 10;

    /// Quiet gap in the event-driven receiver (AUX gives a precise start edge)
    pub const QUIET_GAP_EVENT_MS: u32 = 5;

    /// Idle delay between polls while no byte has arrived yet
    pub const POLL_IDLE_MS: u32 = 100;

    /// Ceiling on the AUX tx-done wait
    pub const TX_DONE_TIMEOUT_MS: u32 = 6000;

    /// Margin added to the computed Time-on-Air when no AUX line exists
    pub const TX_DONE_MARGIN_MS: u32 = 10;

    /// Settle delay after toggling the mode pins
    pub const MODE_SWITCH_SETTLE_MS: u32 = 100;

    /// Settle delay after writing a configuration command
    pub const CONFIG_RESPONSE_DELAY_MS: u32 = 100;
}

/// Module configuration command framing
pub mod command {
    /// Fixed length of the 0xC0 write command and its 0xC1 echo
    pub const CONFIG_COMMAND_LEN: usize = 11;

    /// Leading byte of a configuration write
    pub const CONFIG_WRITE: u8 = 0xC0;

    /// Leading byte of a configuration response
    pub const CONFIG_RESPONSE: u8 = 0xC1;

    /// UART baud rate while the module is in Configuration mode
    pub const CONFIGURATION_MODE_BAUD: u32 = 9600;
}

/// Communication history
pub mod history {
    /// Number of send transactions retained in the ring
    pub const HISTORY_SIZE: usize = 32;
}
