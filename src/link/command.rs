//! Configuration command codec
//!
//! The module is configured with an 11-byte register write issued in
//! Configuration mode; a successful write is echoed back with the leading
//! byte changed from 0xC0 to 0xC1.

use crate::config::command::{CONFIG_COMMAND_LEN, CONFIG_RESPONSE, CONFIG_WRITE};
use crate::link::settings::RadioConfig;

/// Failures of a configuration write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// No response or a short response from the module
    ResponseTruncated,
    /// Response did not start with the 0xC1 acknowledge byte
    Rejected,
}

/// Pack a [`RadioConfig`] into the 0xC0 register-write command.
pub fn encode_config(config: &RadioConfig) -> [u8; CONFIG_COMMAND_LEN] {
    let mut command = [0u8; CONFIG_COMMAND_LEN];
    command[0] = CONFIG_WRITE;
    command[1] = 0x00; // start register
    command[2] = 0x08; // register count
    command[3] = (config.own_address >> 8) as u8;
    command[4] = (config.own_address & 0xFF) as u8;
    command[5] = ((config.baud_rate as u8) << 5) | (config.air_data_rate as u8);
    command[6] = ((config.payload_size as u8) << 6)
        | ((config.rssi_ambient_noise as u8) << 5)
        | (config.transmit_power as u8);
    command[7] = config.own_channel;
    command[8] = ((config.rssi_byte as u8) << 7)
        | ((config.transmission_method as u8) << 6)
        | (config.wor_cycle as u8);
    command[9] = (config.encryption_key >> 8) as u8;
    command[10] = (config.encryption_key & 0xFF) as u8;
    command
}

/// Check the module's echo of a configuration write.
pub fn verify_response(response: &[u8]) -> Result<(), CommandError> {
    if response.len() != CONFIG_COMMAND_LEN {
        return Err(CommandError::ResponseTruncated);
    }
    if response[0] != CONFIG_RESPONSE {
        return Err(CommandError::Rejected);
    }
    Ok(())
}
