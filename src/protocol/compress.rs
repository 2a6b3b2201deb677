//! Compressed payloads over the transport
//!
//! The transport does not carry a compressor of its own; callers plug in
//! any streaming codec implementing the byte-oriented sink/poll/finish
//! contract (heatshrink-style). The codec is driven to completion into a
//! caller-provided work buffer, then the compressed bytes travel through
//! the ordinary [`send_data`](super::transport::LoraTransport::send_data)
//! path. The receiving side reverses the steps.
//!
//! Codecs are stateful, so exclusive access is expressed directly through
//! the `&mut` borrow the operations take.

use crate::protocol::transport::{LoraTransport, TransportError};
use crate::link::frame::FrameChannel;
use crate::time::Clock;
use log::debug;

/// Internal failure of a compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecError;

/// Outcome of one `poll` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Internal buffers drained; feed more input or finish
    Empty,
    /// More output pending than the destination could take
    More,
}

/// Outcome of one `finish` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishStatus {
    /// All output flushed, stream complete
    Done,
    /// Output still pending; poll and call `finish` again
    More,
}

/// Streaming compressor.
pub trait Encoder {
    /// Drop all state and start a fresh stream.
    fn reset(&mut self);

    /// Offer input bytes; returns how many were consumed.
    fn sink(&mut self, input: &[u8]) -> Result<usize, CodecError>;

    /// Move pending output into `output`; returns bytes written and
    /// whether more output is pending.
    fn poll(&mut self, output: &mut [u8]) -> Result<(usize, PollStatus), CodecError>;

    /// Flush the stream tail.
    fn finish(&mut self) -> Result<FinishStatus, CodecError>;
}

/// Streaming decompressor, mirroring [`Encoder`].
pub trait Decoder {
    fn reset(&mut self);
    fn sink(&mut self, input: &[u8]) -> Result<usize, CodecError>;
    fn poll(&mut self, output: &mut [u8]) -> Result<(usize, PollStatus), CodecError>;
    fn finish(&mut self) -> Result<FinishStatus, CodecError>;
}

/// Run `encoder` over all of `input`, writing into `output`.
fn encode_all<E: Encoder>(
    encoder: &mut E,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, TransportError> {
    encoder.reset();
    let mut consumed = 0;
    let mut written = 0;

    while consumed < input.len() {
        let taken = encoder
            .sink(&input[consumed..])
            .map_err(|_| TransportError::CompressFailed)?;
        consumed += taken;

        loop {
            let (n, status) = encoder
                .poll(&mut output[written..])
                .map_err(|_| TransportError::CompressFailed)?;
            written += n;
            match status {
                PollStatus::Empty => break,
                PollStatus::More if written == output.len() => {
                    return Err(TransportError::BufferOverflow)
                }
                PollStatus::More => {}
            }
        }
    }

    loop {
        match encoder.finish().map_err(|_| TransportError::CompressFailed)? {
            FinishStatus::Done => return Ok(written),
            FinishStatus::More => {
                let (n, status) = encoder
                    .poll(&mut output[written..])
                    .map_err(|_| TransportError::CompressFailed)?;
                written += n;
                if status == PollStatus::More && written == output.len() {
                    return Err(TransportError::BufferOverflow);
                }
            }
        }
    }
}

/// Run `decoder` over all of `input`, writing into `output`.
fn decode_all<D: Decoder>(
    decoder: &mut D,
    input: &[u8],
    output: &mut [u8],
) -> Result<usize, TransportError> {
    decoder.reset();
    let mut consumed = 0;
    let mut written = 0;

    while consumed < input.len() {
        let taken = decoder
            .sink(&input[consumed..])
            .map_err(|_| TransportError::DecompressFailed)?;
        consumed += taken;

        loop {
            let (n, status) = decoder
                .poll(&mut output[written..])
                .map_err(|_| TransportError::DecompressFailed)?;
            written += n;
            match status {
                PollStatus::Empty => break,
                PollStatus::More if written == output.len() => {
                    return Err(TransportError::BufferOverflow)
                }
                PollStatus::More => {}
            }
        }
    }

    loop {
        match decoder
            .finish()
            .map_err(|_| TransportError::DecompressFailed)?
        {
            FinishStatus::Done => return Ok(written),
            FinishStatus::More => {
                let (n, status) = decoder
                    .poll(&mut output[written..])
                    .map_err(|_| TransportError::DecompressFailed)?;
                written += n;
                if status == PollStatus::More && written == output.len() {
                    return Err(TransportError::BufferOverflow);
                }
            }
        }
    }
}

impl<'a, C, K> LoraTransport<'a, C, K>
where
    C: FrameChannel,
    K: Clock,
{
    /// Compress `data` into `work`, then send the compressed bytes.
    ///
    /// `work` must be at least as large as `data`; codecs can expand
    /// incompressible input, but never past that bound under this
    /// contract.
    pub async fn send_compressed_data<E: Encoder>(
        &mut self,
        dest_address: u16,
        dest_channel: u8,
        data: &[u8],
        request_ack: bool,
        encoder: &mut E,
        work: &mut [u8],
    ) -> Result<(), TransportError> {
        if work.len() < data.len() {
            return Err(TransportError::BufferOverflow);
        }

        let compressed_len = encode_all(encoder, data, work)?;
        debug!(
            "compressed {} bytes to {} for transmission",
            data.len(),
            compressed_len
        );
        self.send_data(dest_address, dest_channel, &work[..compressed_len], request_ack)
            .await
    }

    /// Receive a compressed transaction into `work` and decompress it
    /// into `buffer`. Returns the plain-text length.
    pub async fn receive_compressed_data<D: Decoder>(
        &mut self,
        buffer: &mut [u8],
        timeout_ms: u32,
        decoder: &mut D,
        work: &mut [u8],
    ) -> Result<usize, TransportError> {
        let compressed_len = self.receive_data(work, timeout_ms).await?;
        let length = decode_all(decoder, &work[..compressed_len], buffer)?;
        debug!("decompressed {} bytes to {}", compressed_len, length);
        Ok(length)
    }
}
