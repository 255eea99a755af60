//! Global mnemonic table
//!
//! Built once on first use and immutable afterwards. Several mnemonics are
//! aliases of one handler (`^PPN`, `@PPN` and `PPON` all show a popup).

use super::{appearance, channels, navigation, query, subview, system, text, PageManager};
use crate::error::CommandResult;
use crate::protocol::{CommandArgs, Layout};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Command handler
pub type Handler = fn(&mut PageManager, &CommandArgs) -> CommandResult;

/// Table entry: handler plus the parameter layout of the command
#[derive(Clone, Copy)]
pub struct CommandEntry {
    pub handler: Handler,
    pub layout: Layout,
}

/// Mnemonic to handler map
pub struct CommandTable {
    entries: HashMap<&'static str, CommandEntry>,
}

impl CommandTable {
    /// Case-sensitive lookup
    pub fn get(&self, mnemonic: &str) -> Option<&CommandEntry> {
        self.entries.get(mnemonic)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mnemonics(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    fn register(&mut self, mnemonics: &[&'static str], layout: Layout, handler: Handler) {
        for mnemonic in mnemonics {
            self.entries.insert(mnemonic, CommandEntry { handler, layout });
        }
    }
}

const fn addressed(params: usize) -> Layout {
    Layout::Addressed { params }
}

pub static COMMANDS: Lazy<CommandTable> = Lazy::new(|| {
    use Layout::{Popup, Raw, Split};

    let mut t = CommandTable {
        entries: HashMap::new(),
    };

    // Navigation and popups
    t.register(&["PAGE", "^PGE"], Raw, navigation::page_flip);
    t.register(&["^AFP", "@AFP"], Split, navigation::animated_page_flip);
    t.register(&["@PPN", "^PPN", "PPON"], Popup, navigation::popup_show);
    t.register(&["@PPF", "^PPF", "PPOF"], Popup, navigation::popup_hide);
    t.register(&["@PPG", "^PPG", "PPOG"], Popup, navigation::popup_toggle);
    t.register(&["@PPK", "^PPK"], Popup, navigation::popup_kill);
    t.register(&["@PPM", "^PPM"], Popup, navigation::popup_modality);
    t.register(&["@PPT", "^PPT"], Popup, navigation::popup_timeout);
    t.register(&["@PPX", "^PPX"], Raw, navigation::popup_close_all);
    t.register(&["@PPA", "^PPA"], Popup, navigation::popup_close_page);
    t.register(&["@APG"], Popup, navigation::group_add);
    t.register(&["@CPG"], Popup, navigation::group_clear);
    t.register(&["@DPG"], Popup, navigation::group_remove);
    t.register(&["@PDR"], Popup, navigation::popup_reset_position);
    t.register(&["@PSE"], Popup, navigation::popup_show_effect);
    t.register(&["@PHE"], Popup, navigation::popup_hide_effect);
    t.register(&["@PST"], Popup, navigation::popup_show_time);
    t.register(&["@PHT"], Popup, navigation::popup_hide_time);
    t.register(&["@PSP"], Popup, navigation::popup_show_position);
    t.register(&["@PHP"], Popup, navigation::popup_hide_position);
    t.register(&["^PCO"], Popup, navigation::collapse_open);
    t.register(&["^PCL"], Popup, navigation::collapse_close);
    t.register(&["^PCT"], Popup, navigation::collapse_toggle);

    // Button appearance
    t.register(&["^BCB"], addressed(2), appearance::border_color);
    t.register(&["^BCF"], addressed(2), appearance::fill_color);
    t.register(&["^BCT"], addressed(2), appearance::text_color);
    t.register(&["^TEC"], addressed(2), appearance::text_effect_color);
    t.register(&["^BOR"], addressed(1), appearance::border_style_all);
    t.register(&["^BRD"], addressed(2), appearance::border_style_states);
    t.register(&["^FON"], addressed(2), appearance::font);
    t.register(&["^ICO"], addressed(2), appearance::icon);
    t.register(&["^BMP"], addressed(5), appearance::bitmap);
    t.register(&["^BBR"], addressed(2), appearance::resource_bitmap);
    t.register(&["^BOP"], addressed(2), appearance::opacity);
    t.register(&["^BWW"], addressed(2), appearance::word_wrap);
    t.register(&["^TEF"], addressed(2), appearance::text_effect);
    t.register(&["^JST"], addressed(4), appearance::justify_text);
    t.register(&["^JSB"], addressed(4), appearance::justify_bitmap);
    t.register(&["^JSI"], addressed(4), appearance::justify_icon);
    t.register(&["^BDO"], addressed(2), appearance::draw_order);
    t.register(&["^BFB"], addressed(1), appearance::feedback);
    t.register(&["^BIM"], addressed(1), appearance::input_mask);
    t.register(&["^BML"], addressed(1), appearance::max_length);
    t.register(&["^BMC"], addressed(5), text::copy_attributes);
    t.register(&["^BSP"], addressed(4), appearance::size_position);
    t.register(&["^BSO"], addressed(2), appearance::sound);
    t.register(&["^BVL"], addressed(1), appearance::volume);
    t.register(&["^ENA"], addressed(1), appearance::enable);
    t.register(&["^SHO"], addressed(1), appearance::show);
    t.register(&["^MSP"], addressed(1), appearance::marquee_speed);
    t.register(&["^BOS"], addressed(2), appearance::video);
    t.register(&["^BSF"], addressed(1), appearance::focus);
    t.register(&["^BSM"], addressed(0), appearance::submit_text);
    t.register(&["^ANI"], addressed(3), appearance::animate);
    t.register(&["^APF"], addressed(2), appearance::page_flip_add);
    t.register(&["^CPF"], addressed(0), appearance::page_flip_clear);
    t.register(&["^DPF"], addressed(2), appearance::page_flip_delete);
    t.register(&["^GDI"], addressed(1), appearance::bargraph_drag_increment);
    t.register(&["^GIV"], addressed(1), appearance::bargraph_invert);
    t.register(&["^GLH"], addressed(1), appearance::bargraph_high);
    t.register(&["^GLL"], addressed(1), appearance::bargraph_low);
    t.register(&["^GRD"], addressed(1), appearance::bargraph_ramp_down);
    t.register(&["^GRU"], addressed(1), appearance::bargraph_ramp_up);
    t.register(&["^GSC"], addressed(1), appearance::bargraph_slider_color);
    t.register(&["^GSN"], addressed(1), appearance::bargraph_slider_name);

    // Button text
    t.register(&["^TXT"], addressed(2), text::set_text);
    t.register(&["^BAT"], addressed(2), text::append_text);
    t.register(&["^UNI"], addressed(2), text::set_unicode);
    t.register(&["^BAU"], addressed(2), text::append_unicode);
    t.register(&["^UTF"], addressed(2), text::set_utf8);
    t.register(&["^BMF"], addressed(2), text::modify);

    // Get commands
    t.register(&["?TXT"], addressed(1), query::text);
    t.register(&["?BMP"], addressed(1), query::bitmap);
    t.register(&["?ICO"], addressed(1), query::icon);
    t.register(&["?JST"], addressed(1), query::justify_text);
    t.register(&["?JSB"], addressed(1), query::justify_bitmap);
    t.register(&["?JSI"], addressed(1), query::justify_icon);
    t.register(&["?FON"], addressed(1), query::font);
    t.register(&["?TEF"], addressed(1), query::text_effect);
    t.register(&["?TEC"], addressed(1), query::text_effect_color);
    t.register(&["?BWW"], addressed(1), query::word_wrap);
    t.register(&["?BCB"], addressed(1), query::border_color);
    t.register(&["?BCF"], addressed(1), query::fill_color);
    t.register(&["?BCT"], addressed(1), query::text_color);
    t.register(&["?BRD"], addressed(1), query::border_style);
    t.register(&["?BOP"], addressed(1), query::opacity);

    // Subviews and list views
    t.register(&["^SSH"], addressed(3), subview::show_item);
    t.register(&["^SHD"], addressed(2), subview::hide_item);
    t.register(&["^STG"], addressed(2), subview::toggle_item);
    t.register(&["^SHA"], addressed(1), subview::hide_all);
    t.register(&["^SPD"], addressed(1), subview::padding);
    t.register(&["^SCE"], addressed(4), subview::custom_events);
    t.register(&["^LVD"], addressed(1), subview::list_source);
    t.register(&["^LVE"], addressed(1), subview::list_event);
    t.register(&["^LVF"], addressed(1), subview::list_filter);
    t.register(&["^LVL"], addressed(1), subview::list_layout);
    t.register(&["^LVM"], addressed(1), subview::list_map);
    t.register(&["^LVN"], addressed(1), subview::list_navigate);
    t.register(&["^LVR"], addressed(1), subview::list_refresh);
    t.register(&["^LVS"], addressed(1), subview::list_sort);

    // State
    t.register(&["ON"], addressed(0), channels::channel_on);
    t.register(&["OFF"], addressed(0), channels::channel_off);
    t.register(&["LEVEL"], addressed(1), channels::level);
    t.register(&["TIME"], Split, channels::blink_time);
    t.register(&["#FTR"], Raw, channels::file_transfer);

    // System
    t.register(&["BEEP", "^ABP", "ABEEP"], Raw, system::beep);
    t.register(&["DBEEP", "^ADB", "ADBEEP"], Raw, system::double_beep);
    t.register(&["@SOU", "^SOU"], Raw, system::play_sound);
    t.register(&["^MUT"], Raw, system::mute);
    t.register(&["@AKB"], Popup, system::keyboard);
    t.register(&["AKEYB"], Raw, system::keyboard);
    t.register(&["@AKP", "@EKP"], Popup, system::keypad);
    t.register(&["AKEYP"], Raw, system::keypad);
    t.register(&["@PKB"], Popup, system::private_keyboard);
    t.register(&["@PKP"], Popup, system::private_keypad);
    t.register(&["PKEYP"], Raw, system::private_keypad);
    t.register(&["@AKR", "AKEYR"], Raw, system::remove_keyboard);
    t.register(&["@TKP", "^TKP"], Popup, system::telephone_keypad);
    t.register(&["@VKB", "^VKB"], Raw, system::virtual_keyboard);
    t.register(&["SETUP", "^STP"], Raw, system::setup);
    t.register(&["SHUTDOWN"], Raw, system::shutdown);
    t.register(&["^VER?"], Raw, system::version);
    t.register(&["@WLD"], Raw, system::wake);
    t.register(&["^TOP"], Raw, system::touch_reporting);
    t.register(&["^VTP"], Split, system::virtual_touch);
    t.register(&["^RAF", "^RMF"], Split, system::resource_add);
    t.register(&["^RFR"], Raw, system::resource_refresh);
    t.register(&["^RSR"], Split, system::resource_rate);
    t.register(&["^LPC"], Raw, system::user_passwords_clear);
    t.register(&["^LPR"], Raw, system::user_password_remove);
    t.register(&["^LPS"], Raw, system::logout_timeout);
    t.register(&["^LPB"], Split, system::user_password_add);
    t.register(&["@PWD", "^PWD"], Split, system::page_password);
    t.register(&["^KPS"], Raw, system::keyboard_passthru);
    t.register(&["^VKS"], Raw, system::virtual_keystrokes);

    t
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_share_handler() {
        let canonical = COMMANDS.get("^PPN").unwrap();
        for alias in ["@PPN", "PPON"] {
            let entry = COMMANDS.get(alias).unwrap();
            assert_eq!(entry.handler as usize, canonical.handler as usize);
            assert_eq!(entry.layout, Layout::Popup);
        }
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(COMMANDS.get("^TXT").is_some());
        assert!(COMMANDS.get("^txt").is_none());
        assert!(COMMANDS.get("^VER?").is_some());
        assert!(COMMANDS.len() > 150);
    }
}
