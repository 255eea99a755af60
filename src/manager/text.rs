//! Button text commands: `^TXT ^BAT ^UNI ^BAU ^UTF ^BMF ^BMC`

use super::appearance::states;
use super::bmf::{AttrCode, ModifyOp};
use super::resolve::AddressSpace;
use super::PageManager;
use crate::error::{CommandError, CommandResult};
use crate::panel::ButtonInstance;
use crate::protocol::CommandArgs;
use tracing::{debug, trace};

/// Decode UTF-16BE code units written as hex, e.g. `00480069` for "Hi"
///
/// Surrogate pairs are combined; lone surrogates become U+FFFD.
pub(crate) fn decode_unicode_hex(hex_text: &str) -> Option<String> {
    let digits: String = hex_text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 4 != 0 {
        return None;
    }
    let bytes = hex::decode(&digits).ok()?;
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    Some(
        char::decode_utf16(units)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect(),
    )
}

/// Change the text of the selected states of every addressed button
fn edit_text<F>(pm: &mut PageManager, args: &CommandArgs, text: &str, edit: F) -> CommandResult
where
    F: Fn(&mut ButtonInstance, &str),
{
    let selection = states(args, 0)?;
    let handles = pm.resolve_args(args)?;
    pm.update_buttons(&handles, |button| {
        for instance in button.instances_mut(&selection) {
            edit(instance, text);
        }
        trace!("{} text '{}'", button.handle, button.current().text);
        Ok(())
    })
}

fn replace(instance: &mut ButtonInstance, text: &str) {
    instance.text = text.to_string();
}

fn append(instance: &mut ButtonInstance, text: &str) {
    instance.text.push_str(text);
}

fn unicode_param(args: &CommandArgs) -> CommandResult<String> {
    let raw = args.text(1);
    decode_unicode_hex(raw)
        .ok_or_else(|| CommandError::invalid(&args.mnemonic, raw, "expected UTF-16 hex"))
}

/// `^TXT-<addr>,<states>,<text>`
pub(super) fn set_text(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    edit_text(pm, args, args.text(1), replace)
}

pub(super) fn append_text(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    edit_text(pm, args, args.text(1), append)
}

pub(super) fn set_unicode(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    let text = unicode_param(args)?;
    edit_text(pm, args, &text, replace)
}

pub(super) fn append_unicode(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let text = unicode_param(args)?;
    edit_text(pm, args, &text, append)
}

/// `^UTF`, the line itself was already decoded as UTF-8
pub(super) fn set_utf8(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(1)?;
    edit_text(pm, args, args.text(1), replace)
}

/// `^BMF-<addr>,<states>,<data>`
pub(super) fn modify(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(2)?;
    let selection = states(args, 0)?;
    let ops = ModifyOp::parse(args.text(1));
    if ops.is_empty() {
        return Err(CommandError::invalid(&args.mnemonic, args.text(1), "no valid sub-command"));
    }
    let handles = pm.resolve_args(args)?;
    debug!("^BMF: {} operation(s) on {} button(s)", ops.len(), handles.len());
    pm.update_buttons(&handles, |button| {
        for op in &ops {
            op.apply(button, &selection);
        }
        Ok(())
    })
}

/// Parse `^BMC` codes: `%BM%CF`, `BMCF` or `BM&CF`
fn copy_codes(args: &CommandArgs, raw: &str) -> CommandResult<Vec<AttrCode>> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, '%' | '&' | ' '))
        .collect();
    if compact.is_empty() || compact.len() % 2 != 0 || !compact.is_ascii() {
        return Err(CommandError::invalid(&args.mnemonic, raw, "expected two letter codes"));
    }
    compact
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let code = String::from_utf8_lossy(pair);
            AttrCode::from_copy_code(&code)
                .ok_or_else(|| CommandError::invalid(&args.mnemonic, &code, "unknown attribute"))
        })
        .collect()
}

/// `^BMC-<addr>,<states>,<source port>,<source address>,<source state>,<codes>`
pub(super) fn copy_attributes(pm: &mut PageManager, args: &CommandArgs) -> CommandResult {
    args.require(5)?;
    let selection = states(args, 0)?;
    let source_port: u16 = args.number(1)?;
    let source_address: u16 = args.number(2)?;
    let source_state: usize = args.number(3)?;
    let codes = copy_codes(args, args.text(4))?;

    let source_handle = *pm
        .resolve(AddressSpace::Address, source_port, &[source_address])?
        .first()
        .ok_or(CommandError::UnresolvedButton {
            port: source_port,
            channel: source_address,
        })?;
    let source = pm
        .button(source_handle)
        .and_then(|b| b.instances.get(source_state.saturating_sub(1)))
        .cloned()
        .ok_or_else(|| {
            CommandError::invalid(&args.mnemonic, args.text(3), "source state does not exist")
        })?;

    let handles = pm.resolve_args(args)?;
    pm.update_buttons(&handles, |button| {
        for instance in button.instances_mut(&selection) {
            for code in &codes {
                code.copy(&source, instance);
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_unicode_hex() {
        assert_eq!(decode_unicode_hex("00480069").as_deref(), Some("Hi"));
        // U+1F600 as a surrogate pair
        assert_eq!(decode_unicode_hex("D83DDE00").as_deref(), Some("😀"));
        assert_eq!(decode_unicode_hex("D83D").as_deref(), Some("\u{FFFD}"));
        assert_eq!(decode_unicode_hex("004"), None);
        assert_eq!(decode_unicode_hex("zzzz"), None);
    }
}
