//! tpanel-gw - AMX NetLinx touch panel emulator core
//!
//! The [`manager::PageManager`] owns every page, popup and button of a
//! loaded project and executes the commands a NetLinx controller sends.
//! [`runtime::PanelRuntime`] runs it on a tokio task fed by channels, and the
//! [`link`] and [`surface`] traits connect it to the controller and to the
//! renderer.

pub mod cli;
pub mod config;
pub mod error;
pub mod link;
pub mod manager;
pub mod panel;
pub mod project;
pub mod protocol;
pub mod runtime;
pub mod surface;
