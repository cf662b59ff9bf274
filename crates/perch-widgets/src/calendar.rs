//! Month calendar and an input-bound date picker.
//!
//! [`Calendar`] is a plain [`Component`]: a month grid with a keyboard
//! cursor (`focus`) and a selected date, both kept inside the optional
//! `min`/`max` bounds by validators. [`DatePicker`] puts a calendar in a
//! popup below an input element; picking a date writes it into the input.

use crate::mount::Widget;
use crate::popup::Popup;
use crate::position::{self, Placement};
use crate::stage::Stage;
use crate::trigger::{TriggerKind, TriggerSpec};
use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};
use crossterm::event::{KeyCode, KeyEvent};
use perch_core::{
    Change, Command, Component, ComponentId, DomEvent, DomEventKind, Element, ElementId, Error,
    Life, Lifecycle, Role, SetOptions,
};
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph};
use ratatui::Frame;
use std::time::Duration;

/// Outer size of a rendered calendar, border included.
pub const CALENDAR_WIDTH: u16 = 22;
pub const CALENDAR_HEIGHT: u16 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarOptions {
    pub selected: Option<NaiveDate>,
    pub today: NaiveDate,
    pub min: Option<NaiveDate>,
    pub max: Option<NaiveDate>,
    pub week_start: Weekday,
}

impl Default for CalendarOptions {
    fn default() -> Self {
        Self {
            selected: None,
            today: Local::now().date_naive(),
            min: None,
            max: None,
            week_start: Weekday::Mon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Key(KeyEvent),
    /// Move the cursor to a date.
    Focus(NaiveDate),
    /// Select a date.
    Select(NaiveDate),
    Sync,
    /// Notice: a date was selected.
    Selected(NaiveDate),
}

fn clamp(date: NaiveDate, min: Option<NaiveDate>, max: Option<NaiveDate>) -> NaiveDate {
    let date = min.map_or(date, |m| date.max(m));
    max.map_or(date, |m| date.min(m))
}

pub struct Calendar {
    life: Life<Option<NaiveDate>>,
    min: Option<NaiveDate>,
    max: Option<NaiveDate>,
    today: NaiveDate,
    week_start: Weekday,
}

impl Calendar {
    pub fn new(options: CalendarOptions) -> Self {
        let CalendarOptions {
            selected,
            today,
            min,
            max,
            week_start,
        } = options;
        let mut life = Life::new();
        let focus = clamp(selected.unwrap_or(today), min, max);
        life.define_property("focus", Some(focus));
        life.define_property("selected", selected.map(|d| clamp(d, min, max)));
        for name in ["focus", "selected"] {
            life.validate(
                name,
                Box::new(move |candidate: Option<NaiveDate>, _: &Option<NaiveDate>| {
                    candidate.map(|d| clamp(d, min, max))
                }),
            );
        }
        life.init();
        Self {
            life,
            min,
            max,
            today,
            week_start,
        }
    }

    pub fn focus(&self) -> NaiveDate {
        self.life
            .property("focus")
            .copied()
            .flatten()
            .unwrap_or(self.today)
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.life.property("selected").copied().flatten()
    }

    pub fn bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (self.min, self.max)
    }

    /// Move the cursor. Clamped to the bounds.
    pub fn set_focus(&mut self, date: NaiveDate) -> Command<Message> {
        self.set_property("focus", Some(date), SetOptions::default())
            .then(Message::Sync)
    }

    /// Select `date` (clamped) and move the cursor there.
    pub fn select(&mut self, date: NaiveDate) -> Command<Message> {
        let flush = self
            .set_property("selected", Some(date), SetOptions::default())
            .and(self.set_property("focus", Some(date), SetOptions::default()));
        let selected = self.selected().unwrap_or(date);
        tracing::debug!(calendar = %self.life.id(), %selected, "date selected");
        Command::batch([
            flush.then(Message::Sync),
            Command::message(Message::Selected(selected)),
        ])
    }

    /// Keyboard navigation: arrows move by day and week, PageUp/PageDown by
    /// month, Home/End to the ends of the month, Enter/Space select.
    pub fn press(&mut self, key: &KeyEvent) -> Command<Message> {
        let focus = self.focus();
        let target = match key.code {
            KeyCode::Left => focus.checked_sub_days(Days::new(1)),
            KeyCode::Right => focus.checked_add_days(Days::new(1)),
            KeyCode::Up => focus.checked_sub_days(Days::new(7)),
            KeyCode::Down => focus.checked_add_days(Days::new(7)),
            KeyCode::PageUp => focus.checked_sub_months(Months::new(1)),
            KeyCode::PageDown => focus.checked_add_months(Months::new(1)),
            KeyCode::Home => focus.with_day(1),
            KeyCode::End => last_of_month(focus),
            KeyCode::Enter | KeyCode::Char(' ') => return self.select(focus),
            _ => None,
        };
        match target {
            Some(date) => self.set_focus(date),
            None => Command::none(),
        }
    }

    /// Weeks of the focused month; days outside it are `None`.
    pub fn weeks(&self) -> Vec<[Option<NaiveDate>; 7]> {
        let focus = self.focus();
        let Some(first) = focus.with_day(1) else {
            return Vec::new();
        };
        let offset = (first.weekday().num_days_from_monday() + 7
            - self.week_start.num_days_from_monday())
            % 7;
        let mut weeks = Vec::new();
        let mut week = [None; 7];
        let mut slot = offset as usize;
        let mut day = Some(first);
        while let Some(date) = day.filter(|d| d.month() == first.month()) {
            week[slot] = Some(date);
            slot += 1;
            if slot == 7 {
                weeks.push(week);
                week = [None; 7];
                slot = 0;
            }
            day = date.succ_opt();
        }
        if slot > 0 {
            weeks.push(week);
        }
        weeks
    }

    /// The date drawn at `pos` when the calendar was rendered into `area`.
    pub fn date_at(&self, area: Rect, pos: Position) -> Option<NaiveDate> {
        let inner = Block::bordered().inner(area);
        if !inner.contains(pos) || pos.y < inner.y + 2 {
            return None;
        }
        let row = (pos.y - inner.y - 2) as usize;
        let col = ((pos.x - inner.x) / 3) as usize;
        self.weeks().get(row)?.get(col).copied().flatten()
    }

    fn weekday_names(&self) -> String {
        let mut day = self.week_start;
        let mut names = Vec::with_capacity(7);
        for _ in 0..7 {
            let name = format!("{day}");
            names.push(name.chars().take(2).collect::<String>());
            day = day.succ();
        }
        names.join(" ")
    }
}

fn last_of_month(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

impl Lifecycle for Calendar {
    type Value = Option<NaiveDate>;

    fn life(&self) -> &Life<Option<NaiveDate>> {
        &self.life
    }

    fn life_mut(&mut self) -> &mut Life<Option<NaiveDate>> {
        &mut self.life
    }

    fn update_property(&mut self, name: &'static str, change: &Change<Option<NaiveDate>>) {
        tracing::trace!(calendar = %self.life.id(), name, old = ?change.old, new = ?change.new, "calendar changed");
    }
}

impl Component for Calendar {
    type Message = Message;

    fn update(&mut self, msg: Message) -> Command<Message> {
        match msg {
            Message::Key(key) => self.press(&key),
            Message::Focus(date) => self.set_focus(date),
            Message::Select(date) => self.select(date),
            Message::Sync => {
                self.sync();
                Command::none()
            }
            Message::Selected(_) => Command::none(),
        }
    }

    fn view(&self, frame: &mut Frame, area: Rect) {
        let focus = self.focus();
        let selected = self.selected();
        let mut lines = vec![
            Line::from(focus.format("%B %Y").to_string()).alignment(Alignment::Center),
            Line::from(self.weekday_names()),
        ];
        for week in self.weeks() {
            let mut spans = Vec::with_capacity(14);
            for (i, day) in week.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::raw(" "));
                }
                let Some(date) = day else {
                    spans.push(Span::raw("  "));
                    continue;
                };
                let mut style = Style::default();
                if Some(*date) == selected {
                    style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                }
                if *date == focus {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                if *date == self.today {
                    style = style.add_modifier(Modifier::ITALIC);
                }
                spans.push(Span::styled(format!("{:>2}", date.day()), style));
            }
            lines.push(Line::from(spans));
        }
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(lines).block(Block::bordered()), area);
    }

    fn dispose(&mut self) -> Command<Message> {
        self.dispose_life();
        Command::none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePickerOptions {
    pub calendar: CalendarOptions,
    /// chrono format used to read and write the input's text.
    pub format: String,
}

impl Default for DatePickerOptions {
    fn default() -> Self {
        Self {
            calendar: CalendarOptions::default(),
            format: "%Y-%m-%d".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerMessage {
    Calendar(Message),
    /// Notice: a date was written into the input.
    Picked(NaiveDate),
}

/// A calendar popup below an input element.
pub struct DatePicker {
    input: ElementId,
    layer: ElementId,
    popup: ComponentId,
    calendar: Calendar,
    format: String,
}

impl DatePicker {
    /// Fails unless `input` is an input element on the stage.
    pub fn attach(stage: &mut Stage, input: ElementId, options: DatePickerOptions) -> Result<Self, Error> {
        let role = stage.scene().require(input)?.role();
        if role != Role::Input {
            return Err(Error::InvalidAttribute {
                element: input,
                name: "role".into(),
                value: format!("{role:?}"),
                reason: "a date picker needs an input element".into(),
            });
        }
        let layer = stage
            .scene_mut()
            .add(Element::layer().with_attr("data-role", "date-picker"));
        let popup = Popup::new(layer)
            .with_trigger(input)
            .show_on(TriggerSpec::new([TriggerKind::Click], Duration::ZERO))
            .hide_on(TriggerSpec::new([TriggerKind::Blur], Duration::ZERO))
            .on_show(move |scene, reveal| {
                let anchor = scene.rect(input).unwrap_or_default();
                let (rect, _) = position::place(
                    anchor,
                    CALENDAR_WIDTH,
                    CALENDAR_HEIGHT,
                    scene.bounds(),
                    Placement::Bottom,
                );
                scene.set_rect(reveal.layer, rect);
                scene.set_visible(reveal.layer, true);
                scene.raise(reveal.layer);
            });
        let popup = stage.add(popup)?;
        Ok(Self {
            input,
            layer,
            popup,
            calendar: Calendar::new(options.calendar),
            format: options.format,
        })
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn layer(&self) -> ElementId {
        self.layer
    }

    pub fn is_open(&self, stage: &Stage) -> bool {
        stage.is_shown(self.popup)
    }

    /// The date currently written in the input, if it parses.
    pub fn value(&self, stage: &Stage) -> Option<NaiveDate> {
        let text = stage.scene().content(self.input)?;
        NaiveDate::parse_from_str(text.trim(), &self.format).ok()
    }

    fn pick(&mut self, stage: &mut Stage, date: NaiveDate) -> Command<PickerMessage> {
        let text = date.format(&self.format).to_string();
        stage.scene_mut().set_content(self.input, Some(text));
        stage.hide(self.popup);
        Command::message(PickerMessage::Picked(date))
    }
}

impl Widget for DatePicker {
    type Message = PickerMessage;

    fn handle(&mut self, stage: &mut Stage, event: &DomEvent) -> Command<PickerMessage> {
        if !self.is_open(stage) {
            return Command::none();
        }
        match event.kind {
            DomEventKind::KeyDown if event.key.is_some_and(|k| k.code == KeyCode::Esc) => {
                stage.hide(self.popup);
                Command::none()
            }
            DomEventKind::KeyDown => match event.key {
                Some(key) => self.calendar.press(&key).map(PickerMessage::Calendar),
                None => Command::none(),
            },
            DomEventKind::Click if event.on(self.layer) => {
                let area = stage.scene().rect(self.layer).unwrap_or_default();
                match event.pos.and_then(|p| self.calendar.date_at(area, p)) {
                    Some(date) => self.calendar.select(date).map(PickerMessage::Calendar),
                    None => Command::none(),
                }
            }
            _ => Command::none(),
        }
    }

    /// Opening reads the input's current date into the calendar.
    fn popup_changed(&mut self, stage: &mut Stage, popup: ComponentId, shown: bool) -> Command<PickerMessage> {
        if popup != self.popup || !shown {
            return Command::none();
        }
        match self.value(stage) {
            Some(date) => {
                let flush = self
                    .calendar
                    .set_property("selected", Some(date), SetOptions::default())
                    .and(self.calendar.set_property("focus", Some(date), SetOptions::default()));
                flush.then(PickerMessage::Calendar(Message::Sync))
            }
            None => Command::none(),
        }
    }

    fn update(&mut self, stage: &mut Stage, msg: PickerMessage) -> Command<PickerMessage> {
        match msg {
            PickerMessage::Calendar(Message::Selected(date)) => self.pick(stage, date),
            PickerMessage::Calendar(msg) => self.calendar.update(msg).map(PickerMessage::Calendar),
            PickerMessage::Picked(_) => Command::none(),
        }
    }

    fn view(&self, stage: &Stage, frame: &mut Frame, area: Rect) {
        if !self.is_open(stage) {
            return;
        }
        if let Some(rect) = stage.scene().rect(self.layer) {
            self.calendar.view(frame, rect.intersection(area));
        }
    }

    fn dispose(&mut self, stage: &mut Stage) -> Command<PickerMessage> {
        stage.dispose_popup(self.popup);
        self.calendar.dispose().map(PickerMessage::Calendar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mount::{Message as MountedMessage, Mounted};
    use crate::stage::tests::click;
    use crossterm::event::KeyModifiers;
    use perch_core::testing::TestComponent;
    use perch_core::{Scene, TerminalEvent};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn options() -> CalendarOptions {
        CalendarOptions {
            today: date(2026, 10, 19),
            ..CalendarOptions::default()
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_move_by_day_week_and_month() {
        let mut t = TestComponent::new(Calendar::new(options()));
        t.send(Message::Key(key(KeyCode::Right)));
        t.send(Message::Key(key(KeyCode::Down)));
        assert_eq!(t.component().focus(), date(2026, 10, 27));
        t.send(Message::Key(key(KeyCode::PageDown)));
        assert_eq!(t.component().focus(), date(2026, 11, 27));
        t.send(Message::Key(key(KeyCode::End)));
        assert_eq!(t.component().focus(), date(2026, 11, 30));
        t.send(Message::Key(key(KeyCode::Home)));
        assert_eq!(t.component().focus(), date(2026, 11, 1));
        t.drain_messages();
        assert!(!t.component().life().has_pending());
    }

    #[test]
    fn bounds_clamp_cursor_and_selection() {
        let mut cal = Calendar::new(CalendarOptions {
            min: Some(date(2026, 10, 10)),
            max: Some(date(2026, 10, 25)),
            ..options()
        });
        let _ = cal.set_focus(date(2026, 12, 1));
        assert_eq!(cal.focus(), date(2026, 10, 25));
        let _ = cal.select(date(2026, 1, 1));
        assert_eq!(cal.selected(), Some(date(2026, 10, 10)));
    }

    #[test]
    fn enter_selects_and_notifies() {
        let mut t = TestComponent::new(Calendar::new(options()));
        let cmd = t.component_mut().update(Message::Key(key(KeyCode::Enter)));
        let notice = cmd
            .into_batch()
            .into_iter()
            .flatten()
            .find_map(|c| c.into_message());
        assert_eq!(notice, Some(Message::Selected(date(2026, 10, 19))));
        assert_eq!(t.component().selected(), Some(date(2026, 10, 19)));
    }

    #[test]
    fn grid_starts_on_week_start() {
        // 1 October 2026 is a Thursday.
        let cal = Calendar::new(options());
        let weeks = cal.weeks();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0][3], Some(date(2026, 10, 1)));
        assert_eq!(weeks[0][2], None);
        assert_eq!(weeks[4][5], Some(date(2026, 10, 31)));

        let sunday = Calendar::new(CalendarOptions {
            week_start: Weekday::Sun,
            ..options()
        });
        assert_eq!(sunday.weeks()[0][4], Some(date(2026, 10, 1)));
        assert_eq!(sunday.weekday_names(), "Su Mo Tu We Th Fr Sa");
    }

    #[test]
    fn date_at_maps_cells() {
        let cal = Calendar::new(options());
        let area = Rect::new(0, 0, CALENDAR_WIDTH, CALENDAR_HEIGHT);
        // Row 3 of the widget is the first week; column 10 is Thursday.
        assert_eq!(cal.date_at(area, Position::new(10, 3)), Some(date(2026, 10, 1)));
        assert_eq!(cal.date_at(area, Position::new(1, 3)), None);
        assert_eq!(cal.date_at(area, Position::new(1, 1)), None);
    }

    #[test]
    fn renders_month_title() {
        let t = TestComponent::new(Calendar::new(options()));
        let screen = t.render_string(CALENDAR_WIDTH, CALENDAR_HEIGHT);
        assert!(screen.contains("October 2026"));
        assert!(screen.contains("Mo Tu We Th Fr Sa Su"));
    }

    fn picker() -> (TestComponent<Mounted<DatePicker>>, ElementId) {
        let mut scene = Scene::new(Rect::new(0, 0, 60, 24));
        let input = scene.add(Element::input(Rect::new(2, 2, 12, 1)).with_content("2026-10-05"));
        let m = Mounted::attach(Stage::new(scene), |s| {
            DatePicker::attach(
                s,
                input,
                DatePickerOptions {
                    calendar: options(),
                    ..DatePickerOptions::default()
                },
            )
        })
        .unwrap();
        (TestComponent::new(m), input)
    }

    fn ui(msg: crate::stage::Message) -> MountedMessage<PickerMessage> {
        MountedMessage::Stage(msg)
    }

    fn press(code: KeyCode) -> MountedMessage<PickerMessage> {
        ui(crate::stage::Message::Terminal(TerminalEvent::Key(key(code))))
    }

    #[test]
    fn picker_opens_below_input_with_its_date() {
        let (mut t, _) = picker();
        t.send(ui(click(3, 2)));
        t.drain_messages();
        let m = t.component();
        assert!(m.widget().is_open(m.stage()));
        assert_eq!(
            m.stage().scene().rect(m.widget().layer()),
            Some(Rect::new(0, 3, CALENDAR_WIDTH, CALENDAR_HEIGHT))
        );
        assert_eq!(m.widget().calendar().focus(), date(2026, 10, 5));
    }

    #[test]
    fn picking_writes_input_and_closes() {
        let (mut t, input) = picker();
        t.send(ui(click(3, 2)));
        t.drain_messages();
        t.send(press(KeyCode::Right));
        t.send(press(KeyCode::Enter));
        t.drain_messages();
        let m = t.component();
        assert_eq!(m.stage().scene().content(input), Some("2026-10-06"));
        assert!(!m.widget().is_open(m.stage()));
    }

    #[test]
    fn clicking_outside_closes_without_picking() {
        let (mut t, input) = picker();
        t.send(ui(click(3, 2)));
        t.send(ui(click(50, 20)));
        t.drain_messages();
        let m = t.component();
        assert!(!m.widget().is_open(m.stage()));
        assert_eq!(m.stage().scene().content(input), Some("2026-10-05"));
    }

    #[test]
    fn rejects_non_inputs() {
        let mut scene = Scene::new(Rect::new(0, 0, 60, 24));
        let region = scene.add(Element::region(Rect::new(0, 0, 5, 1)));
        let mut stage = Stage::new(scene);
        assert!(matches!(
            DatePicker::attach(&mut stage, region, DatePickerOptions::default()),
            Err(Error::InvalidAttribute { .. })
        ));
    }
}
