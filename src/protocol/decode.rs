//! Protocol event decoding into command lines
//!
//! Every inbound event becomes one textual command line, e.g. `ON-12`,
//! `LEVEL-3,40` or the reassembled `^TXT-1,0,Hello`. String fragments are
//! buffered per (device, port) until the final fragment arrives.

use super::{
    cp1250, BlinkTime, ChannelState, FileTransfer, LevelEvent, ProtocolEvent, StringMessage,
    STRING_BUFFER_SIZE,
};
use std::collections::HashMap;
use tracing::{debug, trace};

/// A command line ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCommand {
    pub device: u16,
    pub port: u16,
    pub line: String,
}

#[derive(Debug, Default)]
struct PendingString {
    bytes: Vec<u8>,
    utf8: bool,
}

/// Reassembles fragmented strings per (device, port)
#[derive(Debug, Default)]
pub struct StringAssembler {
    pending: HashMap<(u16, u16), PendingString>,
}

impl StringAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment; returns the complete line once the final fragment
    /// arrived
    ///
    /// A fragment that fills the whole string buffer is continued by the
    /// next one unless it is explicitly flagged final.
    pub fn push(&mut self, msg: StringMessage) -> Option<DecodedCommand> {
        let key = (msg.device, msg.port);
        let is_final = msg.is_final_fragment || msg.content.len() < STRING_BUFFER_SIZE;
        let pending = self.pending.entry(key).or_default();
        pending.bytes.extend_from_slice(&msg.content);
        pending.utf8 |= msg.is_internal_utf8;

        if !is_final {
            trace!(
                "Buffered {} byte fragment for {}:{} ({} total)",
                msg.content.len(),
                msg.device,
                msg.port,
                pending.bytes.len()
            );
            return None;
        }

        let pending = self.pending.remove(&key)?;
        let line = if pending.utf8 || pending.bytes.starts_with(b"^UTF") {
            String::from_utf8_lossy(&pending.bytes).into_owned()
        } else {
            cp1250::decode(&pending.bytes)
        };
        Some(DecodedCommand {
            device: msg.device,
            port: msg.port,
            line,
        })
    }

    /// Number of (device, port) pairs with buffered fragments
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Turns protocol events into command lines
#[derive(Debug, Default)]
pub struct EventDecoder {
    strings: StringAssembler,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, event: ProtocolEvent) -> Option<DecodedCommand> {
        match event {
            ProtocolEvent::Channel(ChannelState {
                device,
                port,
                channel,
                on,
            }) => Some(DecodedCommand {
                device,
                port,
                line: format!("{}-{}", if on { "ON" } else { "OFF" }, channel),
            }),
            ProtocolEvent::Level(LevelEvent {
                device,
                port,
                channel,
                value,
            }) => Some(DecodedCommand {
                device,
                port,
                line: format!("LEVEL-{},{}", channel, value),
            }),
            ProtocolEvent::String(msg) => self.strings.push(msg),
            ProtocolEvent::Blink(blink) => Some(DecodedCommand {
                device: 0,
                port: 0,
                line: blink_line(&blink),
            }),
            ProtocolEvent::FileTransfer(ftr) => {
                let line = file_transfer_line(&ftr);
                if line.is_none() {
                    debug!(
                        "Ignoring file transfer function {:#06x} (type {})",
                        ftr.function, ftr.ftype
                    );
                }
                line.map(|line| DecodedCommand {
                    device: 0,
                    port: 0,
                    line,
                })
            }
        }
    }

    pub fn pending_strings(&self) -> usize {
        self.strings.pending()
    }
}

fn blink_line(blink: &BlinkTime) -> String {
    format!(
        "TIME-{:02}:{:02}:{:02},{:04}-{:02}-{:02},{},{}",
        blink.hour,
        blink.minute,
        blink.second,
        blink.year,
        blink.month,
        blink.day,
        blink.weekday,
        if blink.led & 0x01 != 0 { "ON" } else { "OFF" }
    )
}

fn file_transfer_line(ftr: &FileTransfer) -> Option<String> {
    Some(match ftr.function {
        FileTransfer::SYNC => format!("#FTR-SYNC:{}:{}", ftr.count, ftr.info1),
        FileTransfer::START => "#FTR-START".to_string(),
        FileTransfer::PART => format!("#FTR-FTRPART:{}:{}", ftr.count, ftr.info1),
        FileTransfer::END => "#FTR-END".to_string(),
        FileTransfer::FILE_START => format!(
            "#FTR-FTRSTART:{}:{}:{}",
            ftr.count,
            ftr.info1,
            String::from_utf8_lossy(&ftr.data).trim_end_matches('\0')
        ),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::LevelValue;

    fn fragment(content: Vec<u8>, is_final: bool) -> StringMessage {
        StringMessage {
            device: 10001,
            port: 1,
            content,
            is_final_fragment: is_final,
            is_internal_utf8: false,
        }
    }

    #[test]
    fn test_fragments_deliver_one_command() {
        let mut decoder = EventDecoder::new();
        let mut full = b"^TXT-1,0,".to_vec();
        full.resize(STRING_BUFFER_SIZE, b'x');

        assert!(decoder
            .decode(ProtocolEvent::String(fragment(full.clone(), false)))
            .is_none());
        assert_eq!(decoder.pending_strings(), 1);

        let done = decoder
            .decode(ProtocolEvent::String(fragment(b"yz".to_vec(), false)))
            .unwrap();
        assert_eq!(done.line.len(), STRING_BUFFER_SIZE + 2);
        assert!(done.line.ends_with("xyz"));
        assert_eq!(decoder.pending_strings(), 0);
    }

    #[test]
    fn test_fragments_are_per_port() {
        let mut assembler = StringAssembler::new();
        let big = vec![b'a'; STRING_BUFFER_SIZE];
        assert!(assembler.push(fragment(big, false)).is_none());
        let other = StringMessage {
            port: 2,
            ..fragment(b"PAGE-Main".to_vec(), true)
        };
        assert_eq!(assembler.push(other).unwrap().line, "PAGE-Main");
        assert_eq!(assembler.pending(), 1);
    }

    #[test]
    fn test_string_encodings() {
        let mut assembler = StringAssembler::new();
        let cp = assembler.push(fragment(vec![b'^', b'T', b'X', b'T', b'-', 0x8A], true));
        assert_eq!(cp.unwrap().line, "^TXT-Š");

        let utf = assembler.push(fragment("^UTF-1,0,Š".as_bytes().to_vec(), true));
        assert_eq!(utf.unwrap().line, "^UTF-1,0,Š");

        let internal = assembler.push(StringMessage::internal(1, "^TXT-1,0,ž"));
        assert_eq!(internal.unwrap().line, "^TXT-1,0,ž");
    }

    #[test]
    fn test_channel_level_blink_lines() {
        let mut decoder = EventDecoder::new();
        let on = decoder.decode(ProtocolEvent::Channel(ChannelState {
            device: 1,
            port: 1,
            channel: 12,
            on: true,
        }));
        assert_eq!(on.unwrap().line, "ON-12");

        let level = decoder.decode(ProtocolEvent::Level(LevelEvent {
            device: 1,
            port: 1,
            channel: 3,
            value: LevelValue::Float(12.5),
        }));
        assert_eq!(level.unwrap().line, "LEVEL-3,12.5");

        let blink = decoder.decode(ProtocolEvent::Blink(BlinkTime {
            hour: 9,
            minute: 5,
            second: 0,
            year: 2024,
            month: 3,
            day: 7,
            weekday: 4,
            led: 1,
        }));
        assert_eq!(blink.unwrap().line, "TIME-09:05:00,2024-03-07,4,ON");
    }

    #[test]
    fn test_file_transfer_lines() {
        let mut decoder = EventDecoder::new();
        let ftr = FileTransfer {
            ftype: 4,
            function: FileTransfer::FILE_START,
            count: 2,
            info1: 512,
            data: b"panel.tp4\0".to_vec(),
        };
        let line = decoder.decode(ProtocolEvent::FileTransfer(ftr.clone())).unwrap();
        assert_eq!(line.line, "#FTR-FTRSTART:2:512:panel.tp4");

        let unknown = FileTransfer { function: 0x7777, ..ftr };
        assert!(decoder.decode(ProtocolEvent::FileTransfer(unknown)).is_none());
    }
}
