//! # Popups Example
//!
//! A toolbar whose buttons carry `data-title` tooltips, a context menu on the
//! canvas and an "About" dialog, all sharing one [`Stage`]:
//! - Feeding terminal input to the stage and handing the resulting scene
//!   events to every widget
//! - Routing `Shown`/`Hidden` stage notices to `popup_changed`
//! - Reacting to widget notices (menu selection opens the dialog)
//!
//! Hover a button for its tip, right-click the canvas for the menu, `q` quits.
//!
//! Run with: `cargo run --example tooltips`

use perch::crossterm::event::KeyCode;
use perch::ratatui::layout::Rect;
use perch::ratatui::style::{Color, Style};
use perch::ratatui::text::Line;
use perch::ratatui::widgets::{Block, Paragraph};
use perch::ratatui::Frame;
use perch::widgets::context_menu::{self, ContextMenu, ContextMenuOptions};
use perch::widgets::dialog::{self, Action, Dialog, DialogOptions};
use perch::widgets::stage::{self, Stage};
use perch::widgets::tooltip::{self, Tooltip, TooltipOptions};
use perch::widgets::Widget;
use perch::{terminal_events, Command, Component, Element, ElementId, Model, ProgramOptions, Scene, Subscription, TerminalEvent};

struct Popups {
    stage: Stage,
    buttons: Vec<(ElementId, &'static str)>,
    canvas: ElementId,
    tips: Tooltip,
    menu: ContextMenu,
    about: Dialog,
    log: Vec<String>,
}

#[derive(Debug)]
enum Msg {
    Stage(stage::Message),
    Tip(tooltip::Message),
    Menu(context_menu::Message),
    About(dialog::Message),
    Quit,
}

impl Popups {
    fn build() -> Result<Self, perch::Error> {
        let mut scene = Scene::new(Rect::new(0, 0, 80, 24));
        let mut buttons = Vec::new();
        for (i, (label, title)) in [("New", "Create a file"), ("Open", "Open a file"), ("Save", "Save changes")]
            .into_iter()
            .enumerate()
        {
            let rect = Rect::new(2 + i as u16 * 8, 1, 6, 1);
            let id = scene.add(Element::button(rect).with_attr("data-title", title));
            buttons.push((id, label));
        }
        let canvas = scene.add(Element::region(Rect::new(0, 3, 80, 21)));

        let mut stage = Stage::new(scene);
        let triggers: Vec<ElementId> = buttons.iter().map(|(id, _)| *id).collect();
        let tips = Tooltip::attach(&mut stage, triggers, TooltipOptions::default())?;
        let menu = ContextMenu::attach(
            &mut stage,
            [canvas],
            ContextMenuOptions::items(["Cut", "Copy", "Paste", "About"]),
        )?;
        let about = Dialog::attach(
            &mut stage,
            Vec::<ElementId>::new(),
            DialogOptions::new("About perch")
                .body("Popups, tooltips and form widgets for ratatui.")
                .action(Action::new("OK").with_shortcut('o')),
        )?;
        Ok(Self {
            stage,
            buttons,
            canvas,
            tips,
            menu,
            about,
            log: Vec::new(),
        })
    }

    /// Hand one scene event to every widget.
    fn dispatch(&mut self, event: &perch::DomEvent) -> Vec<Command<Msg>> {
        let stage = &mut self.stage;
        vec![
            self.tips.handle(stage, event).map(Msg::Tip),
            self.menu.handle(stage, event).map(Msg::Menu),
            self.about.handle(stage, event).map(Msg::About),
        ]
    }

    fn popup_changed(&mut self, popup: perch::ComponentId, shown: bool) -> Vec<Command<Msg>> {
        let stage = &mut self.stage;
        vec![
            self.tips.popup_changed(stage, popup, shown).map(Msg::Tip),
            self.menu.popup_changed(stage, popup, shown).map(Msg::Menu),
            self.about.popup_changed(stage, popup, shown).map(Msg::About),
        ]
    }
}

impl Model for Popups {
    type Message = Msg;
    type Flags = Popups;

    fn init(popups: Popups) -> (Self, Command<Msg>) {
        (popups, Command::none())
    }

    fn update(&mut self, msg: Msg) -> Command<Msg> {
        let mut cmds = match msg {
            Msg::Quit => return Command::quit(),
            Msg::Stage(stage::Message::Terminal(input)) => {
                let events = self.stage.feed(&input);
                events.iter().flat_map(|e| self.dispatch(e)).collect()
            }
            Msg::Stage(stage::Message::Shown { popup, .. }) => self.popup_changed(popup, true),
            Msg::Stage(stage::Message::Hidden { popup }) => self.popup_changed(popup, false),
            Msg::Stage(other) => vec![self.stage.update(other).map(Msg::Stage)],
            Msg::Tip(m) => vec![self.tips.update(&mut self.stage, m).map(Msg::Tip)],
            Msg::Menu(context_menu::Message::Selected(_, label)) => {
                self.log.push(format!("menu: {label}"));
                if label == "About" {
                    self.about.show(&mut self.stage);
                }
                vec![]
            }
            Msg::Menu(m) => vec![self.menu.update(&mut self.stage, m).map(Msg::Menu)],
            Msg::About(dialog::Message::Selected(i)) => {
                self.log.push(format!("dialog: action {i}"));
                vec![]
            }
            Msg::About(m) => vec![self.about.update(&mut self.stage, m).map(Msg::About)],
        };
        cmds.push(self.stage.drain().map(Msg::Stage));
        Command::batch(cmds)
    }

    fn view(&self, frame: &mut Frame) {
        let area = frame.area();
        for (id, label) in &self.buttons {
            if let Some(rect) = self.stage.scene().rect(*id) {
                let style = Style::default().fg(Color::Black).bg(Color::Cyan);
                frame.render_widget(Paragraph::new(*label).style(style), rect);
            }
        }
        if let Some(canvas) = self.stage.scene().rect(self.canvas) {
            let lines: Vec<Line> = self.log.iter().rev().take(10).map(|l| Line::raw(l.as_str())).collect();
            let block = Block::bordered().title(" right-click for a menu, q to quit ");
            frame.render_widget(Paragraph::new(lines).block(block), canvas);
        }
        self.tips.view(&self.stage, frame, area);
        self.stage.render_layers(frame, area);
        self.menu.view(&self.stage, frame, area);
        self.about.view(&self.stage, frame, area);
    }

    fn subscriptions(&self) -> Vec<Subscription<Msg>> {
        vec![terminal_events(|ev| match ev {
            TerminalEvent::Key(key) if key.code == KeyCode::Char('q') => Some(Msg::Quit),
            ev => Some(Msg::Stage(stage::Message::Terminal(ev))),
        })]
    }
}

#[perch::tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let popups = Popups::build()?;
    let options = ProgramOptions {
        log_file: std::env::var_os("PERCH_LOG_FILE").map(Into::into),
        ..ProgramOptions::default()
    };
    let model = perch::run_with::<Popups>(popups, options).await?;
    for line in &model.log {
        println!("{line}");
    }
    Ok(())
}
