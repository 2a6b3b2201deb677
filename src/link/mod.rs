//! Link layer: E220 module driver, settings, frame codec and airtime math

pub mod airtime;
pub mod command;
pub mod frame;
pub mod radio;
pub mod settings;
pub mod traits;

pub use frame::{Frame, FrameChannel};
pub use radio::{E220Radio, RadioError, ReceiveMode};
pub use settings::{AirDataRate, Mode, RadioConfig, TransmitPower};
pub use traits::{AuxSignal, ByteLink, LinkError, ModePins, NoAux};
