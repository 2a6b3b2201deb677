//! Transport protocol: fragmentation, ACKs and compressed transfers

pub mod compress;
pub mod header;
pub mod transport;

pub use compress::{CodecError, Decoder, Encoder, FinishStatus, PollStatus};
pub use header::FragmentHeader;
pub use transport::{LoraTransport, NodeConfig, TransportError};
