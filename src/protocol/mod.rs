//! Controller protocol vocabulary
//!
//! Inbound events arrive already framed from the controller link; the
//! [`decode`] module turns them into command lines and [`command_line`]
//! splits those lines into mnemonic, addresses and parameters. Outbound
//! traffic is expressed as [`OutboundCommand`]s.

pub mod command_line;
mod cp1250;
pub mod decode;

pub use command_line::{CommandArgs, Layout};
pub use decode::{DecodedCommand, EventDecoder, StringAssembler};

use std::collections::HashSet;
use std::fmt;

/// Size of the controller's string buffer; a fragment that fills it is
/// followed by more fragments
pub const STRING_BUFFER_SIZE: usize = 1500;

// ============================================================================
// Inbound events
// ============================================================================

/// Channel switched on or off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    pub device: u16,
    pub port: u16,
    pub channel: u16,
    pub on: bool,
}

/// Level value with its numeric wire type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelValue {
    Byte(u8),
    Char(u8),
    Int(u16),
    SignedInt(i16),
    Dword(u32),
    SignedDword(i32),
    Float(f32),
    Double(f64),
}

impl LevelValue {
    pub const TAG_BYTE: u8 = 0x10;
    pub const TAG_CHAR: u8 = 0x11;
    pub const TAG_INT: u8 = 0x20;
    pub const TAG_SIGNED_INT: u8 = 0x21;
    pub const TAG_DWORD: u8 = 0x40;
    pub const TAG_SIGNED_DWORD: u8 = 0x41;
    pub const TAG_FLOAT: u8 = 0x4F;
    pub const TAG_DOUBLE: u8 = 0x8F;

    /// Decode a big-endian value by its type tag
    pub fn from_wire(tag: u8, bytes: &[u8]) -> Option<Self> {
        fn take<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
            bytes.get(..N)?.try_into().ok()
        }

        Some(match tag {
            Self::TAG_BYTE => LevelValue::Byte(*bytes.first()?),
            Self::TAG_CHAR => LevelValue::Char(*bytes.first()?),
            Self::TAG_INT => LevelValue::Int(u16::from_be_bytes(take(bytes)?)),
            Self::TAG_SIGNED_INT => LevelValue::SignedInt(i16::from_be_bytes(take(bytes)?)),
            Self::TAG_DWORD => LevelValue::Dword(u32::from_be_bytes(take(bytes)?)),
            Self::TAG_SIGNED_DWORD => LevelValue::SignedDword(i32::from_be_bytes(take(bytes)?)),
            Self::TAG_FLOAT => LevelValue::Float(f32::from_be_bytes(take(bytes)?)),
            Self::TAG_DOUBLE => LevelValue::Double(f64::from_be_bytes(take(bytes)?)),
            _ => return None,
        })
    }

    /// Integer value used for button levels; floats are rounded
    pub fn as_i32(&self) -> i32 {
        match *self {
            LevelValue::Byte(v) | LevelValue::Char(v) => v as i32,
            LevelValue::Int(v) => v as i32,
            LevelValue::SignedInt(v) => v as i32,
            LevelValue::Dword(v) => v.min(i32::MAX as u32) as i32,
            LevelValue::SignedDword(v) => v,
            LevelValue::Float(v) => v.round() as i32,
            LevelValue::Double(v) => v.round() as i32,
        }
    }
}

impl fmt::Display for LevelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelValue::Byte(v) | LevelValue::Char(v) => write!(f, "{}", v),
            LevelValue::Int(v) => write!(f, "{}", v),
            LevelValue::SignedInt(v) => write!(f, "{}", v),
            LevelValue::Dword(v) => write!(f, "{}", v),
            LevelValue::SignedDword(v) => write!(f, "{}", v),
            // Display for floats never prints trailing zeros
            LevelValue::Float(v) => write!(f, "{}", v),
            LevelValue::Double(v) => write!(f, "{}", v),
        }
    }
}

/// Level change reported by the controller
#[derive(Debug, Clone, PartialEq)]
pub struct LevelEvent {
    pub device: u16,
    pub port: u16,
    pub channel: u16,
    pub value: LevelValue,
}

/// One fragment of a string or command string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringMessage {
    pub device: u16,
    pub port: u16,
    pub content: Vec<u8>,
    pub is_final_fragment: bool,
    /// Set for strings generated inside the panel, always UTF-8
    pub is_internal_utf8: bool,
}

impl StringMessage {
    /// Internal command line, e.g. injected from the REPL
    pub fn internal(port: u16, line: &str) -> Self {
        Self {
            device: 0,
            port,
            content: line.as_bytes().to_vec(),
            is_final_fragment: true,
            is_internal_utf8: true,
        }
    }
}

/// Periodic time broadcast carrying the LED blink state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
    /// Bit 0 is the LED state
    pub led: u8,
}

/// File transfer control message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransfer {
    pub ftype: u16,
    pub function: u16,
    pub count: u32,
    pub info1: u32,
    pub data: Vec<u8>,
}

impl FileTransfer {
    pub const SYNC: u16 = 0x0100;
    pub const START: u16 = 0x0101;
    pub const PART: u16 = 0x0102;
    pub const END: u16 = 0x0103;
    pub const FILE_START: u16 = 0x0104;
}

/// Decoded unit from the controller link
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolEvent {
    Channel(ChannelState),
    Level(LevelEvent),
    String(StringMessage),
    Blink(BlinkTime),
    FileTransfer(FileTransfer),
}

// ============================================================================
// Outbound commands
// ============================================================================

/// Custom event sent in reply to a get command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomEvent {
    /// State number the reply describes
    pub instance: u16,
    pub value1: i32,
    pub value2: i32,
    pub value3: i32,
    pub text: String,
    pub event_type: u16,
}

/// Panel to controller message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Push,
    Release,
    Level(i32),
    String(String),
    Command(String),
    Custom(CustomEvent),
}

impl Message {
    pub const CLASS_PUSH: u16 = 0x0084;
    pub const CLASS_RELEASE: u16 = 0x0085;
    pub const CLASS_LEVEL: u16 = 0x008a;
    pub const CLASS_STRING: u16 = 0x008b;
    pub const CLASS_COMMAND: u16 = 0x008c;
    pub const CLASS_CUSTOM: u16 = 0x008d;

    /// Message class on the wire
    pub fn class(&self) -> u16 {
        match self {
            Message::Push => Self::CLASS_PUSH,
            Message::Release => Self::CLASS_RELEASE,
            Message::Level(_) => Self::CLASS_LEVEL,
            Message::String(_) => Self::CLASS_STRING,
            Message::Command(_) => Self::CLASS_COMMAND,
            Message::Custom(_) => Self::CLASS_CUSTOM,
        }
    }
}

/// Message addressed to a port and channel of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    pub port: u16,
    pub channel: u16,
    pub message: Message,
}

impl OutboundCommand {
    pub fn new(port: u16, channel: u16, message: Message) -> Self {
        Self {
            port,
            channel,
            message,
        }
    }
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#06x}] {}:{} ", self.message.class(), self.port, self.channel)?;
        match &self.message {
            Message::Push => write!(f, "PUSH"),
            Message::Release => write!(f, "RELEASE"),
            Message::Level(v) => write!(f, "LEVEL {}", v),
            Message::String(s) => write!(f, "STRING '{}'", s),
            Message::Command(s) => write!(f, "COMMAND '{}'", s),
            Message::Custom(ev) => write!(
                f,
                "CUSTOM type={} instance={} values=({},{},{}) '{}'",
                ev.event_type, ev.instance, ev.value1, ev.value2, ev.value3, ev.text
            ),
        }
    }
}

// ============================================================================
// Address range lists
// ============================================================================

/// Parse an address range list such as `1.5&7&10`
///
/// `.` separates the bounds of an inclusive range, `&` separates entries.
/// Duplicates are dropped, first occurrence order is kept. Returns `None`
/// for any malformed entry; an empty field yields an empty list.
pub fn parse_range_list(field: &str) -> Option<Vec<u16>> {
    let field = field.trim();
    let mut numbers: Vec<u16> = Vec::new();
    let mut seen: HashSet<u16> = HashSet::new();
    if field.is_empty() {
        return Some(numbers);
    }

    for entry in field.split('&') {
        let entry = entry.trim();
        let (from, to) = match entry.split_once('.') {
            Some((a, b)) => (a.trim().parse::<u16>().ok()?, b.trim().parse::<u16>().ok()?),
            None => {
                let n = entry.parse::<u16>().ok()?;
                (n, n)
            }
        };
        let (low, high) = if from <= to { (from, to) } else { (to, from) };
        for n in low..=high {
            if seen.insert(n) {
                numbers.push(n);
            }
        }
    }
    Some(numbers)
}
