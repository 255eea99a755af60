//! Command-line interface and REPL
//!
//! Every line typed at the `tpanel> ` prompt is delivered to the panel as an
//! internal string command, exactly as if the controller had sent it.

use crate::protocol::{Message, OutboundCommand};
use crate::runtime::PanelHandle;
use anyhow::{Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const HELP: &str = "\
  <command>     send a command line, e.g. ^TXT-1,0,Hello or @PPN-Volume
  :port <n>     set the port commands are sent on
  :login [user] <password>
                enter a page-flip or user password
  :status       show the active page and visible popups
  :help         this text
  exit, quit    leave the prompt";

/// Run the interactive prompt until the user leaves or the panel stops
///
/// rustyline blocks, so the prompt lives on a blocking thread; status
/// queries hop back onto the runtime.
pub async fn run_repl(panel: PanelHandle, port: u16) -> Result<()> {
    let runtime = tokio::runtime::Handle::current();
    tokio::task::spawn_blocking(move || repl_loop(panel, port, runtime))
        .await
        .context("REPL thread panicked")?
}

fn repl_loop(panel: PanelHandle, mut port: u16, runtime: tokio::runtime::Handle) -> Result<()> {
    let mut rl = DefaultEditor::new().context("Failed to start line editor")?;
    println!("{}", "Type :help for commands".dimmed());

    loop {
        let line = match rl.readline("tpanel> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("Failed to read line"),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);

        match line {
            "exit" | "quit" => break,
            ":help" => println!("{}", HELP),
            ":status" => match runtime.block_on(panel.snapshot()) {
                Some(snapshot) => {
                    let page = snapshot.actual_page.unwrap_or_else(|| "-".to_string());
                    println!("{} {}", "page:".bold(), page.green());
                    for (name, parent, z) in snapshot.visible_popups {
                        println!("  {} on {} z={}", name.yellow(), parent, z);
                    }
                    println!("{} {}", "dispatched:".bold(), snapshot.dispatched);
                }
                None => {
                    println!("{}", "panel is not running".red());
                    break;
                }
            },
            _ if line.starts_with(":login") => {
                let words: Vec<&str> = line[6..].split_whitespace().collect();
                match words.as_slice() {
                    [password] => panel.login(None, password),
                    [user, password] => panel.login(Some(*user), password),
                    _ => println!("{}", "usage: :login [user] <password>".red()),
                }
            }
            _ if line.starts_with(":port") => match line[5..].trim().parse::<u16>() {
                Ok(p) => {
                    port = p;
                    println!("port set to {}", port.to_string().cyan());
                }
                Err(_) => println!("{}", "usage: :port <number>".red()),
            },
            _ => {
                if !panel.is_running() {
                    println!("{}", "panel is not running".red());
                    break;
                }
                panel.inject_line(port, line);
            }
        }
    }
    Ok(())
}

/// Print one outbound command, colored by message class
pub fn print_outbound(command: &OutboundCommand) {
    let address = format!("{}:{}", command.port, command.channel);
    let body = match &command.message {
        Message::Push => "PUSH".green().bold(),
        Message::Release => "RELEASE".green(),
        Message::Level(value) => format!("LEVEL {}", value).cyan(),
        Message::String(text) => format!("STRING '{}'", text).yellow(),
        Message::Command(text) => format!("COMMAND '{}'", text).magenta(),
        Message::Custom(event) => format!(
            "CUSTOM {} state {} ({},{},{}) '{}'",
            event.event_type, event.instance, event.value1, event.value2, event.value3, event.text
        )
        .bright_blue(),
    };
    println!("{} {} {}", "→".dimmed(), address.bold(), body);
}
