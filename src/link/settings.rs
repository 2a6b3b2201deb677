//! E220-900T22S(JP) register-level parameter model
//!
//! Enum discriminants are the raw register field encodings, so the
//! configuration command can pack them directly.

/// One-bit enable flag used by several register fields
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    #[default]
    Disabled = 0b0,
    Enabled = 0b1,
}

/// UART baud rate between the MCU and the module
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UartBaudRate {
    Baud1200 = 0b000,
    Baud2400 = 0b001,
    Baud4800 = 0b010,
    #[default]
    Baud9600 = 0b011,
    Baud19200 = 0b100,
    Baud38400 = 0b101,
    Baud57600 = 0b110,
    Baud115200 = 0b111,
}

impl UartBaudRate {
    /// Concrete bits-per-second value for the UART driver.
    pub fn bps(self) -> u32 {
        match self {
            UartBaudRate::Baud1200 => 1200,
            UartBaudRate::Baud2400 => 2400,
            UartBaudRate::Baud4800 => 4800,
            UartBaudRate::Baud9600 => 9600,
            UartBaudRate::Baud19200 => 19200,
            UartBaudRate::Baud38400 => 38400,
            UartBaudRate::Baud57600 => 57600,
            UartBaudRate::Baud115200 => 115200,
        }
    }
}

/// Air data rate: a (spreading factor, bandwidth) pair.
///
/// The 5-bit register code packs the bandwidth in bits 1..0 and the
/// spreading factor in bits 4..2.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AirDataRate {
    /// 15,625 bps
    Sf5Bw125 = 0b00000,
    /// 9,375 bps
    Sf6Bw125 = 0b00100,
    /// 5,469 bps
    Sf7Bw125 = 0b01000,
    /// 3,125 bps
    Sf8Bw125 = 0b01100,
    /// 1,758 bps (module default)
    #[default]
    Sf9Bw125 = 0b10000,
    /// 31,250 bps
    Sf5Bw250 = 0b00001,
    /// 18,750 bps
    Sf6Bw250 = 0b00101,
    /// 10,938 bps
    Sf7Bw250 = 0b01001,
    /// 6,250 bps
    Sf8Bw250 = 0b01101,
    /// 3,516 bps
    Sf9Bw250 = 0b10001,
    /// 1,953 bps
    Sf10Bw250 = 0b10101,
    /// 62,500 bps
    Sf5Bw500 = 0b00010,
    /// 37,500 bps
    Sf6Bw500 = 0b00110,
    /// 21,875 bps
    Sf7Bw500 = 0b01010,
    /// 12,500 bps
    Sf8Bw500 = 0b01110,
    /// 7,031 bps
    Sf9Bw500 = 0b10010,
    /// 3,906 bps
    Sf10Bw500 = 0b10110,
    /// 2,148 bps
    Sf11Bw500 = 0b11010,
}

impl AirDataRate {
    /// LoRa spreading factor (5..=11).
    pub fn spreading_factor(self) -> u32 {
        5 + (self as u32 >> 2)
    }

    /// Channel bandwidth in kHz.
    pub fn bandwidth_khz(self) -> u32 {
        match self as u8 & 0b11 {
            0b00 => 125,
            0b01 => 250,
            _ => 500,
        }
    }

    /// Nominal air data rate in bits per second.
    pub fn bps(self) -> u32 {
        match self {
            AirDataRate::Sf5Bw125 => 15_625,
            AirDataRate::Sf6Bw125 => 9_375,
            AirDataRate::Sf7Bw125 => 5_469,
            AirDataRate::Sf8Bw125 => 3_125,
            AirDataRate::Sf9Bw125 => 1_758,
            AirDataRate::Sf5Bw250 => 31_250,
            AirDataRate::Sf6Bw250 => 18_750,
            AirDataRate::Sf7Bw250 => 10_938,
            AirDataRate::Sf8Bw250 => 6_250,
            AirDataRate::Sf9Bw250 => 3_516,
            AirDataRate::Sf10Bw250 => 1_953,
            AirDataRate::Sf5Bw500 => 62_500,
            AirDataRate::Sf6Bw500 => 37_500,
            AirDataRate::Sf7Bw500 => 21_875,
            AirDataRate::Sf8Bw500 => 12_500,
            AirDataRate::Sf9Bw500 => 7_031,
            AirDataRate::Sf10Bw500 => 3_906,
            AirDataRate::Sf11Bw500 => 2_148,
        }
    }
}

/// Maximum over-the-air payload the module accepts per frame
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadSize {
    #[default]
    Bytes200 = 0b00,
    Bytes128 = 0b01,
    Bytes64 = 0b10,
    Bytes32 = 0b11,
}

impl PayloadSize {
    pub fn max_bytes(self) -> usize {
        match self {
            PayloadSize::Bytes200 => 200,
            PayloadSize::Bytes128 => 128,
            PayloadSize::Bytes64 => 64,
            PayloadSize::Bytes32 => 32,
        }
    }
}

/// Transmit power
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransmitPower {
    #[default]
    Dbm13 = 0b01,
    Dbm7 = 0b10,
    Dbm0 = 0b11,
}

impl TransmitPower {
    pub fn dbm(self) -> i8 {
        match self {
            TransmitPower::Dbm13 => 13,
            TransmitPower::Dbm7 => 7,
            TransmitPower::Dbm0 => 0,
        }
    }
}

/// Addressing behaviour of the module
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransmissionMethod {
    /// Broadcast to everyone on the channel
    #[default]
    Transparent = 0b0,
    /// Address/channel prefix selects the receiver
    Fixed = 0b1,
}

/// Wake-on-radio polling cycle
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorCycle {
    Ms500 = 0b000,
    Ms1000 = 0b001,
    Ms1500 = 0b010,
    #[default]
    Ms2000 = 0b011,
    Ms3000 = 0b101,
}

/// Module operating mode, selected by the two mode pins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    WorSend,
    WorReceive,
    Configuration,
}

impl Mode {
    /// (M0, M1) pin levels for this mode.
    pub fn pin_levels(self) -> (bool, bool) {
        match self {
            Mode::Normal => (false, false),
            Mode::WorSend => (true, false),
            Mode::WorReceive => (false, true),
            Mode::Configuration => (true, true),
        }
    }
}

/// Complete register configuration of one module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub own_address: u16,
    pub baud_rate: UartBaudRate,
    pub air_data_rate: AirDataRate,
    pub payload_size: PayloadSize,
    pub rssi_ambient_noise: Flag,
    pub transmit_power: TransmitPower,
    pub own_channel: u8,
    pub rssi_byte: Flag,
    pub transmission_method: TransmissionMethod,
    pub wor_cycle: WorCycle,
    pub encryption_key: u16,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            own_address: 0x0000,
            baud_rate: UartBaudRate::default(),
            air_data_rate: AirDataRate::default(),
            payload_size: PayloadSize::default(),
            rssi_ambient_noise: Flag::Disabled,
            transmit_power: TransmitPower::default(),
            own_channel: 0,
            // The transport protocol needs the trailing RSSI byte and
            // addressed frames, so both default on.
            rssi_byte: Flag::Enabled,
            transmission_method: TransmissionMethod::Fixed,
            wor_cycle: WorCycle::default(),
            encryption_key: 0x0000,
        }
    }
}
