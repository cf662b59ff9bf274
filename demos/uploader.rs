//! # Uploader Example
//!
//! Copies the files named on the command line into a destination directory
//! through a [`DirectoryTransport`], one at a time:
//! - Driving the [`Uploader`] queue with `upload` / `stop` / `enable` / `disable`
//! - Loading filters from a TOML preset file with [`Config::load`]
//! - Showing status and error notices as they arrive
//!
//! Keys: `u` upload, `s` stop, `d` toggle enabled, `q` quit.
//!
//! Run with: `cargo run --example uploader -- <dest-dir> <file>...`
//! (reads `perch.toml` from the working directory if present)

use perch::crossterm::event::KeyCode;
use perch::ratatui::layout::{Constraint, Layout};
use perch::ratatui::text::Line;
use perch::ratatui::widgets::{Block, Paragraph};
use perch::ratatui::Frame;
use perch::widgets::config::Config;
use perch::widgets::uploader::{self, DirectoryTransport, Uploader};
use perch::{terminal_events, Command, Component, Model, Subscription, TerminalEvent};
use std::path::PathBuf;

struct Flags {
    uploader: Uploader,
    files: Vec<PathBuf>,
}

struct UploadApp {
    uploader: Uploader,
    notices: Vec<String>,
}

#[derive(Debug)]
enum Msg {
    Upload(uploader::Message),
    ToggleEnabled,
    Quit,
}

impl Model for UploadApp {
    type Message = Msg;
    type Flags = Flags;

    fn init(flags: Flags) -> (Self, Command<Msg>) {
        let app = UploadApp {
            uploader: flags.uploader,
            notices: Vec::new(),
        };
        let add = app.uploader.add(flags.files).map(Msg::Upload);
        (app, add)
    }

    fn update(&mut self, msg: Msg) -> Command<Msg> {
        match msg {
            Msg::Quit => return Command::quit(),
            Msg::ToggleEnabled => {
                if self.uploader.is_enabled() {
                    self.uploader.disable();
                } else {
                    self.uploader.enable();
                }
                Command::none()
            }
            Msg::Upload(msg) => {
                match &msg {
                    uploader::Message::Rejected { path, reason } => {
                        self.notices.push(format!("rejected {}: {reason:?}", path.display()));
                    }
                    uploader::Message::Failed { error, .. } => self.notices.push(error.to_string()),
                    uploader::Message::Complete => self.notices.push("queue complete".into()),
                    _ => {}
                }
                self.uploader.update(msg).map(Msg::Upload)
            }
        }
    }

    fn view(&self, frame: &mut Frame) {
        let [files, log] = Layout::vertical([Constraint::Fill(2), Constraint::Fill(1)]).areas(frame.area());
        self.uploader.view(frame, files);
        let lines: Vec<Line> = self.notices.iter().map(|n| Line::raw(n.as_str())).collect();
        let help = " u upload  s stop  d enable/disable  q quit ";
        frame.render_widget(Paragraph::new(lines).block(Block::bordered().title(help)), log);
    }

    fn subscriptions(&self) -> Vec<Subscription<Msg>> {
        vec![terminal_events(|ev| match ev {
            TerminalEvent::Key(key) => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => Some(Msg::Quit),
                KeyCode::Char('u') => Some(Msg::Upload(uploader::Message::Upload)),
                KeyCode::Char('s') => Some(Msg::Upload(uploader::Message::Stop)),
                KeyCode::Char('d') => Some(Msg::ToggleEnabled),
                _ => None,
            },
            _ => None,
        })]
    }
}

#[perch::tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(dest) = args.next() else {
        eprintln!("usage: uploader <dest-dir> <file>...");
        return Ok(());
    };
    let config = Config::load("perch.toml")?;
    let flags = Flags {
        uploader: Uploader::new(DirectoryTransport::new(dest), config.uploader.options()),
        files: args.collect(),
    };
    let app = perch::run::<UploadApp>(flags).await?;
    for file in app.uploader.files() {
        println!("{}: {:?}", file.name, file.status);
    }
    Ok(())
}
