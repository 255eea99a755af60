//! Command line splitting: `<MNEMONIC>[-<params>]`

use super::parse_range_list;
use crate::error::{CommandError, CommandResult};
use std::str::FromStr;

/// Parameter layout of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Address range list followed by up to `params` comma separated
    /// parameters; the last one absorbs the rest of the line
    Addressed { params: usize },
    /// Comma separated parameters with quotes removed
    Split,
    /// `<name>[;<rest>]`
    Popup,
    /// Whole tail as one parameter
    Raw,
}

/// Split a line into mnemonic and optional tail
///
/// The mnemonic ends at the first `-`. A line without `-` is a bare
/// mnemonic such as `BEEP` or `^VER?`.
pub fn split_mnemonic(line: &str) -> (&str, Option<&str>) {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.split_once('-') {
        Some((mnemonic, tail)) => (mnemonic.trim(), Some(tail)),
        None => (line.trim(), None),
    }
}

/// Arguments handed to a command handler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    pub mnemonic: String,
    pub device: u16,
    pub port: u16,
    /// Address list of addressed commands
    pub channels: Vec<u16>,
    pub params: Vec<String>,
}

impl CommandArgs {
    /// Parse the tail of a command line according to its layout
    pub fn parse(
        mnemonic: &str,
        device: u16,
        port: u16,
        layout: Layout,
        tail: Option<&str>,
    ) -> CommandResult<Self> {
        let mut args = CommandArgs {
            mnemonic: mnemonic.to_string(),
            device,
            port,
            ..Self::default()
        };
        let tail = match tail {
            Some(tail) => tail,
            None => return Ok(args),
        };

        match layout {
            Layout::Addressed { params } => {
                let mut fields = tail.splitn(params + 1, ',');
                let addresses = fields.next().unwrap_or_default();
                args.channels = parse_range_list(addresses)
                    .ok_or_else(|| CommandError::invalid(mnemonic, addresses, "address list"))?;
                args.params = fields.map(str::to_string).collect();
            }
            Layout::Split => {
                if !tail.trim().is_empty() {
                    args.params = tail.split(',').map(unquote).collect();
                }
            }
            Layout::Popup => {
                args.params = tail.splitn(2, ';').map(|s| s.trim().to_string()).collect();
            }
            Layout::Raw => args.params.push(tail.to_string()),
        }
        Ok(args)
    }

    /// Fail unless at least `count` parameters are present
    pub fn require(&self, count: usize) -> CommandResult {
        if self.params.len() < count {
            return Err(CommandError::missing(&self.mnemonic, count, self.params.len()));
        }
        Ok(())
    }

    /// Fail unless at least one address was given
    pub fn require_channels(&self) -> CommandResult {
        if self.channels.is_empty() {
            return Err(CommandError::missing(&self.mnemonic, 1, 0));
        }
        Ok(())
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Parameter `index` or an empty string
    pub fn text(&self, index: usize) -> &str {
        self.param(index).unwrap_or_default()
    }

    /// Parse parameter `index` as a number
    pub fn number<T: FromStr>(&self, index: usize) -> CommandResult<T> {
        let raw = self
            .param(index)
            .ok_or_else(|| CommandError::missing(&self.mnemonic, index + 1, self.params.len()))?;
        raw.trim()
            .parse()
            .map_err(|_| CommandError::invalid(&self.mnemonic, raw, "not a number"))
    }

    /// Parse parameter `index` as a number, or return `default` if absent
    pub fn number_or<T: FromStr>(&self, index: usize, default: T) -> CommandResult<T> {
        match self.param(index) {
            Some(raw) if !raw.trim().is_empty() => self.number(index),
            _ => Ok(default),
        }
    }
}

fn unquote(token: &str) -> String {
    let token = token.trim();
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_mnemonic() {
        assert_eq!(split_mnemonic("ON-12"), ("ON", Some("12")));
        assert_eq!(split_mnemonic("^TXT-1,0,a-b"), ("^TXT", Some("1,0,a-b")));
        assert_eq!(split_mnemonic("BEEP\r\n"), ("BEEP", None));
        assert_eq!(split_mnemonic("^VER?"), ("^VER?", None));
    }

    #[test]
    fn test_addressed_last_param_keeps_commas() {
        let args = CommandArgs::parse(
            "^TXT",
            1,
            1,
            Layout::Addressed { params: 2 },
            Some("1.3&8,0,Hello, world"),
        )
        .unwrap();
        assert_eq!(args.channels, vec![1, 2, 3, 8]);
        assert_eq!(args.params, vec!["0", "Hello, world"]);
        assert_eq!(args.number::<u16>(0).unwrap(), 0);
    }

    #[test]
    fn test_bad_address_list() {
        let err = CommandArgs::parse("^BCF", 1, 1, Layout::Addressed { params: 2 }, Some("a,0,#FF0000"))
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidParameter { .. }));
    }

    #[test]
    fn test_split_popup_raw() {
        let args = CommandArgs::parse("^AFP", 1, 1, Layout::Split, Some("\"Main\", fade ,10")).unwrap();
        assert_eq!(args.params, vec!["Main", "fade", "10"]);

        let args = CommandArgs::parse("@PPN", 1, 1, Layout::Popup, Some("Volume;Main")).unwrap();
        assert_eq!(args.params, vec!["Volume", "Main"]);

        let args = CommandArgs::parse("PAGE", 1, 1, Layout::Raw, Some("Main Page")).unwrap();
        assert_eq!(args.params, vec!["Main Page"]);
    }

    #[test]
    fn test_missing_parameters() {
        let args = CommandArgs::parse("ON", 1, 1, Layout::Addressed { params: 0 }, None).unwrap();
        assert!(args.require_channels().is_err());
        assert!(args.require(1).is_err());
        assert!(matches!(
            args.number::<i32>(0),
            Err(CommandError::MissingParameters { .. })
        ));
        assert_eq!(args.number_or(0, 7).unwrap(), 7);
    }
}
