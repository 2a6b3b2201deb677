//! Stop-and-wait ARQ transport over a [`FrameChannel`]
//!
//! Splits payloads of up to [`MAX_TOTAL_SIZE`] bytes into fragments of at
//! most [`MAX_FRAGMENT_PAYLOAD`] bytes, each carrying a
//! [`FragmentHeader`]. With ACKs enabled every fragment is retransmitted
//! up to [`RETRY_COUNT`] times until the peer acknowledges it; without
//! ACKs fragments are fired once, back to back.
//!
//! Progress is published through a shared [`TransferStatus`] and every
//! transmission leaves a [`CommLogEntry`] in the history ring.

use crate::config::frame::MAX_FRAME_PAYLOAD;
use crate::config::transport::{
    ACK_TIMEOUT_MS, HEADER_SIZE, MAX_FRAGMENT_PAYLOAD, MAX_TOTAL_SIZE, RETRY_COUNT,
};
use crate::history::{CommHistory, CommLogEntry};
use crate::link::frame::FrameChannel;
use crate::link::settings::{AirDataRate, TransmitPower};
use crate::link::traits::LinkError;
use crate::protocol::header::{
    FragmentHeader, CONTROL_ACK_REQUEST, CONTROL_EOT, CONTROL_IS_ACK,
};
use crate::status::TransferStatus;
use crate::time::Clock;
use heapless::Vec;
use log::{debug, warn};

/// Transport layer failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Payload larger than the protocol can carry
    InvalidArgument,
    /// Caller's buffer is too small for the announced transaction
    BufferOverflow,
    /// No first fragment arrived within the caller's budget
    Timeout,
    /// A fragment went unacknowledged through all retries
    AckFailed,
    /// A fragment broke the transaction's sequencing
    InvalidPacket,
    /// The compressor reported an internal failure
    CompressFailed,
    /// The decompressor could not reconstruct the payload
    DecompressFailed,
    /// Underlying frame channel failure
    Link(LinkError),
}

impl From<LinkError> for TransportError {
    fn from(e: LinkError) -> Self {
        TransportError::Link(e)
    }
}

/// This node's identity and current link profile.
///
/// The profile fields are only recorded into history entries; changing
/// them does not reconfigure the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    pub address: u16,
    pub channel: u8,
    pub air_data_rate: AirDataRate,
    pub transmit_power: TransmitPower,
}

/// Stop-and-wait transport bound to one frame channel.
pub struct LoraTransport<'a, C, K>
where
    C: FrameChannel,
    K: Clock,
{
    channel: C,
    clock: K,
    node: NodeConfig,
    next_transaction_id: u8,
    status: &'a TransferStatus,
    history: CommHistory,
}

/// Running tally of one outgoing transaction, folded into the log entry.
struct SendOutcome {
    retries: u16,
    last_ack_rssi: Option<i16>,
}

impl<'a, C, K> LoraTransport<'a, C, K>
where
    C: FrameChannel,
    K: Clock,
{
    pub fn new(channel: C, clock: K, node: NodeConfig, status: &'a TransferStatus) -> Self {
        Self {
            channel,
            clock,
            node,
            next_transaction_id: 0,
            status,
            history: CommHistory::new(),
        }
    }

    pub fn node_config(&self) -> &NodeConfig {
        &self.node
    }

    /// The frame channel this transport drives.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Update the node identity / link profile recorded in log entries.
    pub fn set_node_config(&mut self, node: NodeConfig) {
        self.node = node;
    }

    pub fn history(&self) -> &CommHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut CommHistory {
        &mut self.history
    }

    /// Send `data` to the peer, fragmenting as needed.
    ///
    /// With `request_ack` every fragment waits up to [`ACK_TIMEOUT_MS`]
    /// for the peer's acknowledgement and is retried up to
    /// [`RETRY_COUNT`] attempts; without it each fragment is sent once.
    pub async fn send_data(
        &mut self,
        dest_address: u16,
        dest_channel: u8,
        data: &[u8],
        request_ack: bool,
    ) -> Result<(), TransportError> {
        if data.len() > MAX_TOTAL_SIZE {
            return Err(TransportError::InvalidArgument);
        }

        // Zero fragments for an empty payload: nothing goes on air
        let total_packets = data.len().div_ceil(MAX_FRAGMENT_PAYLOAD) as u8;
        let transaction_id = self.next_transaction_id;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1);

        let started_ms = self.clock.now_ms() as u32;
        self.status.set_active(total_packets);

        let mut outcome = SendOutcome {
            retries: 0,
            last_ack_rssi: None,
        };
        let result = self
            .send_fragments(
                dest_address,
                dest_channel,
                data,
                request_ack,
                transaction_id,
                total_packets,
                &mut outcome,
            )
            .await;

        self.status.set_idle();
        self.history.append(CommLogEntry {
            timestamp_ms: started_ms,
            data_size: data.len() as u32,
            air_data_rate: self.node.air_data_rate,
            transmitting_power: self.node.transmit_power,
            ack_requested: request_ack,
            ack_success: request_ack && result.is_ok(),
            last_ack_rssi: outcome.last_ack_rssi,
            total_retries: outcome.retries,
        });
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_fragments(
        &mut self,
        dest_address: u16,
        dest_channel: u8,
        data: &[u8],
        request_ack: bool,
        transaction_id: u8,
        total_packets: u8,
        outcome: &mut SendOutcome,
    ) -> Result<(), TransportError> {
        for index in 0..total_packets {
            self.status.set_progress(index);

            let offset = index as usize * MAX_FRAGMENT_PAYLOAD;
            let end = (offset + MAX_FRAGMENT_PAYLOAD).min(data.len());
            let chunk = &data[offset..end];

            let mut control = 0u8;
            if request_ack {
                control |= CONTROL_ACK_REQUEST;
            }
            if index == total_packets - 1 {
                control |= CONTROL_EOT;
            }
            let header = FragmentHeader {
                source_address: self.node.address,
                source_channel: self.node.channel,
                control,
                transaction_id,
                total_packets,
                packet_index: index,
                payload_length: chunk.len() as u8,
            };

            let mut packet: Vec<u8, MAX_FRAME_PAYLOAD> = Vec::new();
            packet
                .extend_from_slice(&header.encode())
                .map_err(|_| TransportError::InvalidArgument)?;
            packet
                .extend_from_slice(chunk)
                .map_err(|_| TransportError::InvalidArgument)?;

            self.send_one_fragment(
                dest_address,
                dest_channel,
                &packet,
                &header,
                request_ack,
                outcome,
            )
            .await?;
        }
        Ok(())
    }

    /// Transmit one fragment, retrying until acknowledged (when asked to).
    async fn send_one_fragment(
        &mut self,
        dest_address: u16,
        dest_channel: u8,
        packet: &[u8],
        header: &FragmentHeader,
        request_ack: bool,
        outcome: &mut SendOutcome,
    ) -> Result<(), TransportError> {
        for attempt in 0..RETRY_COUNT {
            if attempt > 0 {
                outcome.retries += 1;
                debug!(
                    "retry {} for fragment {}/{}",
                    attempt,
                    header.packet_index + 1,
                    header.total_packets
                );
            }

            match self.channel.send_frame(dest_address, dest_channel, packet).await {
                Ok(()) => {}
                // Bytes are on air even when the tx-done wait lapsed
                Err(LinkError::Timeout) => warn!("tx-done timeout on fragment send"),
                Err(e) => return Err(e.into()),
            }

            if !request_ack {
                return Ok(());
            }

            match self.channel.receive_frame(ACK_TIMEOUT_MS).await {
                Ok(frame) => {
                    if Self::matching_ack(&frame.data, header) {
                        outcome.last_ack_rssi = Some(frame.rssi);
                        return Ok(());
                    }
                    // Stale or foreign packet: costs this attempt
                    debug!("discarding non-matching packet while waiting for ACK");
                }
                Err(LinkError::Timeout) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Err(TransportError::AckFailed)
    }

    /// Whether `data` acknowledges exactly the fragment in `header`.
    fn matching_ack(data: &[u8], header: &FragmentHeader) -> bool {
        match FragmentHeader::parse(data) {
            Some(ack) => {
                ack.is_ack()
                    && ack.transaction_id == header.transaction_id
                    && ack.packet_index == header.packet_index
            }
            None => false,
        }
    }

    /// Receive one complete transaction into `buffer`.
    ///
    /// Waits up to `timeout_ms` for the transaction to start; stray or
    /// malformed frames during that window are skipped. Returns the
    /// reassembled payload length.
    pub async fn receive_data(
        &mut self,
        buffer: &mut [u8],
        timeout_ms: u32,
    ) -> Result<usize, TransportError> {
        let result = self.receive_transaction(buffer, timeout_ms).await;
        self.status.set_idle();
        result
    }

    async fn receive_transaction(
        &mut self,
        buffer: &mut [u8],
        timeout_ms: u32,
    ) -> Result<usize, TransportError> {
        let deadline = self.clock.now_ms() + timeout_ms as u64;

        // Receiving counts as active from the moment we start waiting;
        // the fragment count is unknown until the first header arrives.
        self.status.set_active(0);

        // First fragment: lenient. Anything that is not the start of a
        // transaction is dropped and the wait continues on the remaining
        // budget.
        let (first_header, mut received) = loop {
            let now = self.clock.now_ms();
            if now >= deadline {
                return Err(TransportError::Timeout);
            }
            let remaining = (deadline - now) as u32;

            let frame = match self.channel.receive_frame(remaining).await {
                Ok(frame) => frame,
                Err(LinkError::Timeout) => return Err(TransportError::Timeout),
                Err(e) => return Err(e.into()),
            };
            match Self::data_fragment(&frame.data, None, 0) {
                Some(header) => break (header, frame),
                None => debug!("skipping stray frame while idle"),
            }
        };

        let total_packets = first_header.total_packets.max(1);
        // Reject before any copy if the announced transaction cannot fit
        if total_packets as usize * MAX_FRAGMENT_PAYLOAD > buffer.len() {
            return Err(TransportError::BufferOverflow);
        }

        self.status.set_active(total_packets);

        let mut length = 0usize;
        let mut header = first_header;
        let mut expected_index = 0u8;
        loop {
            self.status.set_progress(expected_index);

            let payload = received
                .data
                .get(HEADER_SIZE..HEADER_SIZE + header.payload_length as usize)
                .ok_or(TransportError::InvalidPacket)?;
            buffer[length..length + payload.len()].copy_from_slice(payload);
            length += payload.len();

            if header.ack_requested() {
                self.send_ack(&header).await;
            }

            if header.is_eot() {
                return Ok(length);
            }
            if expected_index == total_packets - 1 {
                // Final fragment must carry the EOT mark
                return Err(TransportError::InvalidPacket);
            }
            expected_index += 1;

            // Mid-transaction the peer is committed: one strict receive
            // per fragment.
            let frame = match self.channel.receive_frame(ACK_TIMEOUT_MS).await {
                Ok(frame) => frame,
                Err(LinkError::Timeout) => return Err(TransportError::Timeout),
                Err(e) => return Err(e.into()),
            };
            header = Self::data_fragment(
                &frame.data,
                Some(first_header.transaction_id),
                expected_index,
            )
            .ok_or(TransportError::InvalidPacket)?;
            received = frame;
        }
    }

    /// Parse `data` as the expected data fragment.
    ///
    /// With `transaction_id == None` any transaction is accepted (start
    /// of reception), otherwise transaction and index must match.
    fn data_fragment(
        data: &[u8],
        transaction_id: Option<u8>,
        expected_index: u8,
    ) -> Option<FragmentHeader> {
        let header = FragmentHeader::parse(data)?;
        if header.is_ack() {
            return None;
        }
        if header.payload_length as usize > MAX_FRAGMENT_PAYLOAD {
            return None;
        }
        if header.packet_index >= header.total_packets.max(1) {
            return None;
        }
        if header.packet_index != expected_index {
            return None;
        }
        if let Some(id) = transaction_id {
            if header.transaction_id != id {
                return None;
            }
        }
        if data.len() < HEADER_SIZE + header.payload_length as usize {
            return None;
        }
        Some(header)
    }

    /// Echo an acknowledgement for `header`. Failures are logged only;
    /// the sender will retry if the ACK is lost.
    async fn send_ack(&mut self, header: &FragmentHeader) {
        let ack = FragmentHeader {
            source_address: self.node.address,
            source_channel: self.node.channel,
            control: CONTROL_IS_ACK,
            transaction_id: header.transaction_id,
            total_packets: header.total_packets,
            packet_index: header.packet_index,
            payload_length: 0,
        };
        if let Err(e) = self
            .channel
            .send_frame(header.source_address, header.source_channel, &ack.encode())
            .await
        {
            warn!("failed to send ACK: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::frame::mock::{AckMode, MockFrameChannel};
    use crate::link::frame::Frame;
    use crate::time::mock::TestClock;
    use futures::executor::block_on;

    fn node() -> NodeConfig {
        NodeConfig {
            address: 0x2000,
            channel: 0x02,
            air_data_rate: AirDataRate::Sf9Bw125,
            transmit_power: TransmitPower::Dbm13,
        }
    }

    fn transport<'a>(
        channel: MockFrameChannel,
        clock: &'a TestClock,
        status: &'a TransferStatus,
    ) -> LoraTransport<'a, MockFrameChannel, &'a TestClock> {
        LoraTransport::new(channel, clock, node(), status)
    }

    fn data_frame(header: FragmentHeader, payload: &[u8], rssi: i16) -> Frame {
        let mut data = heapless::Vec::new();
        data.extend_from_slice(&header.encode()).unwrap();
        data.extend_from_slice(payload).unwrap();
        Frame { data, rssi }
    }

    #[test]
    fn test_send_without_ack_single_attempt() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let mut tp = transport(MockFrameChannel::new(), &clock, &status);

        block_on(async {
            tp.send_data(0x1001, 0x02, &[1, 2, 3], false).await.unwrap();
        });

        let sent = tp.channel.sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].dest_address, 0x1001);
        let header = FragmentHeader::parse(&sent[0].data).unwrap();
        assert!(!header.ack_requested());
        assert!(header.is_eot());
        assert_eq!(header.total_packets, 1);
        assert_eq!(&sent[0].data[HEADER_SIZE..], &[1, 2, 3]);
        assert!(!status.snapshot().active);

        let entry = tp.history().latest().unwrap();
        assert!(!entry.ack_requested);
        assert!(!entry.ack_success);
        assert_eq!(entry.total_retries, 0);
    }

    #[test]
    fn test_send_with_ack_success() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new().with_ack_mode(AckMode::Auto);
        let mut tp = transport(channel, &clock, &status);

        block_on(async {
            tp.send_data(0x1001, 0x02, &[0xAB; 10], true).await.unwrap();
        });

        assert_eq!(tp.channel.sent_count(), 1);
        let entry = tp.history().latest().unwrap();
        assert!(entry.ack_requested);
        assert!(entry.ack_success);
        assert_eq!(entry.last_ack_rssi, Some(-60));
        assert_eq!(entry.total_retries, 0);
    }

    #[test]
    fn test_send_retry_exhaustion() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new().with_ack_mode(AckMode::Silent);
        let mut tp = transport(channel, &clock, &status);

        block_on(async {
            let result = tp.send_data(0x1001, 0x02, &[1, 2, 3], true).await;
            assert_eq!(result, Err(TransportError::AckFailed));
        });

        assert_eq!(tp.channel.sent_count(), RETRY_COUNT as usize);
        assert!(!status.snapshot().active);
        let entry = tp.history().latest().unwrap();
        assert!(!entry.ack_success);
        assert_eq!(entry.total_retries, (RETRY_COUNT - 1) as u16);
        assert_eq!(entry.last_ack_rssi, None);
    }

    #[test]
    fn test_send_empty_payload_transmits_nothing() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let mut tp = transport(MockFrameChannel::new(), &clock, &status);

        block_on(async {
            tp.send_data(0x1001, 0x02, &[], true).await.unwrap();
        });

        assert_eq!(tp.channel.sent_count(), 0);
        assert!(!status.snapshot().active);
        // The transaction still leaves its record
        assert_eq!(tp.history().latest().unwrap().data_size, 0);
    }

    #[test]
    fn test_send_rejects_stale_ack() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new().with_ack_mode(AckMode::AutoWrongTransaction);
        let mut tp = transport(channel, &clock, &status);

        block_on(async {
            let result = tp.send_data(0x1001, 0x02, &[5; 4], true).await;
            assert_eq!(result, Err(TransportError::AckFailed));
        });
        // Every attempt consumed by a mismatching ACK
        assert_eq!(tp.channel.sent_count(), RETRY_COUNT as usize);
    }

    #[test]
    fn test_send_rejects_wrong_index_ack() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new().with_ack_mode(AckMode::AutoWrongIndex);
        let mut tp = transport(channel, &clock, &status);

        block_on(async {
            let result = tp.send_data(0x1001, 0x02, &[5; 4], true).await;
            assert_eq!(result, Err(TransportError::AckFailed));
        });
        assert_eq!(tp.channel.sent_count(), RETRY_COUNT as usize);
        assert!(!tp.history().latest().unwrap().ack_success);
    }

    #[test]
    fn test_send_recovers_after_one_lost_ack() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new().with_ack_mode(AckMode::Auto);
        // A stale ACK burns the first attempt; the synthesised one saves
        // the second.
        let stale = FragmentHeader {
            source_address: 0x1001,
            source_channel: 0x02,
            control: CONTROL_IS_ACK,
            transaction_id: 0xEE,
            total_packets: 1,
            packet_index: 0,
            payload_length: 0,
        };
        channel.queue_frame(data_frame(stale, &[], -80));
        let mut tp = transport(channel, &clock, &status);

        block_on(async {
            tp.send_data(0x1001, 0x02, &[9; 8], true).await.unwrap();
        });

        assert_eq!(tp.channel.sent_count(), 2);
        assert_eq!(tp.history().latest().unwrap().total_retries, 1);
    }

    #[test]
    fn test_send_fragments_large_payload() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new().with_ack_mode(AckMode::Auto);
        let mut tp = transport(channel, &clock, &status);

        let payload = [0x5A; 500];
        block_on(async {
            tp.send_data(0x1001, 0x02, &payload, true).await.unwrap();
        });

        let sent = tp.channel.sent_frames();
        assert_eq!(sent.len(), 3);
        let sizes: [usize; 3] = core::array::from_fn(|i| sent[i].data.len() - HEADER_SIZE);
        assert_eq!(sizes, [189, 189, 122]);
        for (i, frame) in sent.iter().enumerate() {
            let header = FragmentHeader::parse(&frame.data).unwrap();
            assert_eq!(header.packet_index, i as u8);
            assert_eq!(header.total_packets, 3);
            assert_eq!(header.is_eot(), i == 2);
        }
    }

    #[test]
    fn test_send_rejects_oversize_payload() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let mut tp = transport(MockFrameChannel::new(), &clock, &status);

        // One byte over the 255-fragment ceiling
        let payload = [0u8; MAX_TOTAL_SIZE + 1];
        block_on(async {
            let result = tp.send_data(0x1001, 0x02, &payload, false).await;
            assert_eq!(result, Err(TransportError::InvalidArgument));
        });
        assert_eq!(tp.channel.sent_count(), 0);
        assert!(tp.history().is_empty());
    }

    #[test]
    fn test_receive_single_fragment() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new();
        let header = FragmentHeader {
            source_address: 0x1001,
            source_channel: 0x02,
            control: CONTROL_ACK_REQUEST | CONTROL_EOT,
            transaction_id: 9,
            total_packets: 1,
            packet_index: 0,
            payload_length: 4,
        };
        channel.queue_frame(data_frame(header, &[1, 2, 3, 4], -70));
        let mut tp = transport(channel, &clock, &status);

        let mut buffer = [0u8; MAX_FRAGMENT_PAYLOAD];
        let length = block_on(tp.receive_data(&mut buffer, 1000)).unwrap();

        assert_eq!(length, 4);
        assert_eq!(&buffer[..4], &[1, 2, 3, 4]);
        assert!(!status.snapshot().active);

        // The ACK echo went back to the fragment's source
        let sent = tp.channel.sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].dest_address, 0x1001);
        let ack = FragmentHeader::parse(&sent[0].data).unwrap();
        assert!(ack.is_ack());
        assert_eq!(ack.transaction_id, 9);
        assert_eq!(ack.packet_index, 0);
    }

    #[test]
    fn test_receive_skips_stray_frames() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new();
        // Garbage, then an ACK, then the real first fragment
        channel.queue_frame(Frame {
            data: heapless::Vec::from_slice(&[0xFF, 0x00]).unwrap(),
            rssi: -90,
        });
        let foreign_ack = FragmentHeader {
            source_address: 0x3000,
            source_channel: 0x05,
            control: CONTROL_IS_ACK,
            transaction_id: 1,
            total_packets: 1,
            packet_index: 0,
            payload_length: 0,
        };
        channel.queue_frame(data_frame(foreign_ack, &[], -85));
        let header = FragmentHeader {
            source_address: 0x1001,
            source_channel: 0x02,
            control: CONTROL_EOT,
            transaction_id: 2,
            total_packets: 1,
            packet_index: 0,
            payload_length: 2,
        };
        channel.queue_frame(data_frame(header, &[7, 8], -60));
        let mut tp = transport(channel, &clock, &status);

        let mut buffer = [0u8; MAX_FRAGMENT_PAYLOAD];
        let length = block_on(tp.receive_data(&mut buffer, 1000)).unwrap();
        assert_eq!(length, 2);
        assert_eq!(&buffer[..2], &[7, 8]);
        // No ACK was requested
        assert_eq!(tp.channel.sent_count(), 0);
    }

    #[test]
    fn test_receive_wait_publishes_active_status() {
        use crate::status::TransferProgress;

        // Observes the shared status from inside the receive wait, the
        // way a concurrent status poller would see it.
        struct SnoopChannel<'s> {
            status: &'s TransferStatus,
            observed: core::cell::Cell<Option<TransferProgress>>,
        }

        impl FrameChannel for SnoopChannel<'_> {
            async fn send_frame(
                &mut self,
                _dest_address: u16,
                _dest_channel: u8,
                _data: &[u8],
            ) -> Result<(), LinkError> {
                Ok(())
            }

            async fn receive_frame(&mut self, _timeout_ms: u32) -> Result<Frame, LinkError> {
                self.observed.set(Some(self.status.snapshot()));
                Err(LinkError::Timeout)
            }
        }

        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = SnoopChannel {
            status: &status,
            observed: core::cell::Cell::new(None),
        };
        let mut tp = LoraTransport::new(channel, &clock, node(), &status);

        let mut buffer = [0u8; 32];
        let result = block_on(tp.receive_data(&mut buffer, 500));
        assert_eq!(result, Err(TransportError::Timeout));

        let observed = tp.channel().observed.get().unwrap();
        assert!(observed.active);
        // Fragment count is unknown until the first header arrives
        assert_eq!(observed.total_fragments, 0);
        // Idle again once the wait is over
        assert!(!status.snapshot().active);
    }

    #[test]
    fn test_receive_timeout_when_silent() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let mut tp = transport(MockFrameChannel::new(), &clock, &status);

        let mut buffer = [0u8; 32];
        let result = block_on(tp.receive_data(&mut buffer, 500));
        assert_eq!(result, Err(TransportError::Timeout));
        assert!(!status.snapshot().active);
    }

    #[test]
    fn test_receive_multi_fragment_transaction() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new();
        let base = FragmentHeader {
            source_address: 0x1001,
            source_channel: 0x02,
            control: 0,
            transaction_id: 4,
            total_packets: 2,
            packet_index: 0,
            payload_length: MAX_FRAGMENT_PAYLOAD as u8,
        };
        channel.queue_frame(data_frame(base, &[0x11; MAX_FRAGMENT_PAYLOAD], -65));
        let last = FragmentHeader {
            control: CONTROL_EOT,
            packet_index: 1,
            payload_length: 10,
            ..base
        };
        channel.queue_frame(data_frame(last, &[0x22; 10], -66));
        let mut tp = transport(channel, &clock, &status);

        let mut buffer = [0u8; 2 * MAX_FRAGMENT_PAYLOAD];
        let length = block_on(tp.receive_data(&mut buffer, 1000)).unwrap();

        assert_eq!(length, MAX_FRAGMENT_PAYLOAD + 10);
        assert_eq!(buffer[MAX_FRAGMENT_PAYLOAD - 1], 0x11);
        assert_eq!(buffer[MAX_FRAGMENT_PAYLOAD], 0x22);
    }

    #[test]
    fn test_receive_rejects_undersized_buffer() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new();
        let header = FragmentHeader {
            source_address: 0x1001,
            source_channel: 0x02,
            control: 0,
            transaction_id: 3,
            total_packets: 3,
            packet_index: 0,
            payload_length: MAX_FRAGMENT_PAYLOAD as u8,
        };
        channel.queue_frame(data_frame(header, &[0u8; MAX_FRAGMENT_PAYLOAD], -60));
        let mut tp = transport(channel, &clock, &status);

        // Room for two fragments, three announced
        let mut buffer = [0u8; 2 * MAX_FRAGMENT_PAYLOAD];
        let result = block_on(tp.receive_data(&mut buffer, 1000));
        assert_eq!(result, Err(TransportError::BufferOverflow));
        // Nothing was copied
        assert!(buffer.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_receive_missing_eot_is_invalid() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new();
        let header = FragmentHeader {
            source_address: 0x1001,
            source_channel: 0x02,
            // Last announced fragment but no EOT mark
            control: 0,
            transaction_id: 6,
            total_packets: 1,
            packet_index: 0,
            payload_length: 1,
        };
        channel.queue_frame(data_frame(header, &[0xAA], -60));
        let mut tp = transport(channel, &clock, &status);

        let mut buffer = [0u8; MAX_FRAGMENT_PAYLOAD];
        let result = block_on(tp.receive_data(&mut buffer, 1000));
        assert_eq!(result, Err(TransportError::InvalidPacket));
    }

    #[test]
    fn test_receive_early_eot_completes() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new();
        let header = FragmentHeader {
            source_address: 0x1001,
            source_channel: 0x02,
            // Announces three fragments but ends at the first
            control: CONTROL_EOT,
            transaction_id: 8,
            total_packets: 3,
            packet_index: 0,
            payload_length: 5,
        };
        channel.queue_frame(data_frame(header, &[1, 2, 3, 4, 5], -60));
        let mut tp = transport(channel, &clock, &status);

        let mut buffer = [0u8; 3 * MAX_FRAGMENT_PAYLOAD];
        let length = block_on(tp.receive_data(&mut buffer, 1000)).unwrap();
        assert_eq!(length, 5);
    }

    #[test]
    fn test_receive_mid_transaction_mismatch_is_terminal() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let channel = MockFrameChannel::new();
        let first = FragmentHeader {
            source_address: 0x1001,
            source_channel: 0x02,
            control: 0,
            transaction_id: 5,
            total_packets: 2,
            packet_index: 0,
            payload_length: 3,
        };
        channel.queue_frame(data_frame(first, &[1, 2, 3], -60));
        // Wrong transaction id on the second fragment
        let wrong = FragmentHeader {
            transaction_id: 6,
            control: CONTROL_EOT,
            packet_index: 1,
            ..first
        };
        channel.queue_frame(data_frame(wrong, &[4, 5, 6], -60));
        let mut tp = transport(channel, &clock, &status);

        let mut buffer = [0u8; 2 * MAX_FRAGMENT_PAYLOAD];
        let result = block_on(tp.receive_data(&mut buffer, 1000));
        assert_eq!(result, Err(TransportError::InvalidPacket));
        assert!(!status.snapshot().active);
    }

    #[test]
    fn test_end_to_end_via_mirrored_mocks() {
        let clock = TestClock::new();
        let send_status = TransferStatus::new();
        let recv_status = TransferStatus::new();

        let sender_channel = MockFrameChannel::new().with_ack_mode(AckMode::Auto);
        let mut sender = transport(sender_channel, &clock, &send_status);

        let payload: heapless::Vec<u8, 400> =
            (0..400u16).map(|i| (i % 251) as u8).collect();
        block_on(async {
            sender
                .send_data(0x1001, 0x02, &payload, true)
                .await
                .unwrap();
        });

        // Replay the sender's fragments into a receiving transport
        let receiver_channel = MockFrameChannel::new();
        for frame in sender.channel.sent_frames() {
            receiver_channel.queue_frame(Frame {
                data: frame.data.clone(),
                rssi: -55,
            });
        }
        let mut receiver = LoraTransport::new(
            receiver_channel,
            &clock,
            NodeConfig {
                address: 0x1001,
                channel: 0x02,
                air_data_rate: AirDataRate::Sf9Bw125,
                transmit_power: TransmitPower::Dbm13,
            },
            &recv_status,
        );

        let mut buffer = [0u8; 600];
        let length = block_on(receiver.receive_data(&mut buffer, 1000)).unwrap();
        assert_eq!(length, 400);
        assert_eq!(&buffer[..400], payload.as_slice());
        // One ACK per fragment went back
        assert_eq!(receiver.channel.sent_count(), 3);
    }

    #[test]
    fn test_transaction_ids_increment_and_wrap() {
        let clock = TestClock::new();
        let status = TransferStatus::new();
        let mut tp = transport(MockFrameChannel::new(), &clock, &status);
        tp.next_transaction_id = 0xFF;

        block_on(async {
            tp.send_data(0x1001, 0x02, &[1], false).await.unwrap();
            tp.send_data(0x1001, 0x02, &[2], false).await.unwrap();
        });

        let sent = tp.channel.sent_frames();
        let first = FragmentHeader::parse(&sent[0].data).unwrap();
        let second = FragmentHeader::parse(&sent[1].data).unwrap();
        assert_eq!(first.transaction_id, 0xFF);
        assert_eq!(second.transaction_id, 0x00);
    }
}
