//! Numeric form control with stepper buttons.
//!
//! Attaches to a wrapper element holding exactly one named input. Bounds,
//! step and the initial value come from `data-min`, `data-max`, `data-step`
//! and `data-value` (on the input, falling back to the wrapper). Whatever the
//! user leaves in the input is read back with [`to_number_or`] and clamped, and
//! the input's text is rewritten to the canonical value.

use crate::keyboard::Repeater;
use crate::mount::Widget;
use crate::stage::Stage;
use crossterm::event::KeyCode;
use perch_core::{
    Change, Command, DomEvent, DomEventKind, Element, ElementId, Error, Life, Lifecycle, Role,
    Scene, SetOptions, TimerId,
};
use ratatui::layout::Rect;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

/// `text` as a finite number, or `default`.
pub fn to_number_or(text: &str, default: f64) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            step: 1.0,
        }
    }
}

impl Bounds {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Digits after the decimal point of `step`, used when writing values.
    fn decimals(&self) -> usize {
        let text = self.step.to_string();
        text.split_once('.').map_or(0, |(_, frac)| frac.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Sync,
    /// Auto-repeat tick while a stepper button is held.
    Repeat(TimerId),
    /// Notice: the committed value changed.
    Changed(f64),
}

pub struct NumberInput {
    life: Life<f64>,
    wrapper: ElementId,
    input: ElementId,
    name: String,
    minus: ElementId,
    plus: ElementId,
    bounds: Bounds,
    repeater: Repeater,
    held: Option<f64>,
}

/// Number from a `data-*` attribute of `input`, else of `wrapper`.
fn number_attr(scene: &Scene, input: ElementId, wrapper: ElementId, name: &str) -> Result<Option<f64>, Error> {
    let found = [input, wrapper]
        .into_iter()
        .find_map(|id| scene.get(id)?.data(name).map(|v| (id, v.to_string())));
    let Some((element, raw)) = found else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if !v.is_nan() => Ok(Some(v)),
        _ => Err(Error::InvalidAttribute {
            element,
            name: format!("data-{name}"),
            value: raw,
            reason: "expected a number".into(),
        }),
    }
}

impl NumberInput {
    /// Fails unless `wrapper` contains exactly one input element and that
    /// input has a `name`.
    pub fn attach(stage: &mut Stage, wrapper: ElementId) -> Result<Self, Error> {
        let scene = stage.scene();
        let area = scene.require(wrapper)?.rect();
        let inputs: Vec<ElementId> = scene
            .descendants(wrapper)
            .into_iter()
            .filter(|id| scene.get(*id).is_some_and(|e| e.role() == Role::Input))
            .collect();
        let &[input] = inputs.as_slice() else {
            return Err(Error::Structure {
                element: wrapper,
                what: "input",
                expected: 1,
                found: inputs.len(),
            });
        };
        let name = scene
            .get(input)
            .and_then(|e| e.attr("name"))
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| Error::MissingAttribute {
                element: input,
                name: "name".into(),
            })?
            .to_string();

        let defaults = Bounds::default();
        let bounds = Bounds {
            min: number_attr(scene, input, wrapper, "min")?.unwrap_or(defaults.min),
            max: number_attr(scene, input, wrapper, "max")?.unwrap_or(defaults.max),
            step: number_attr(scene, input, wrapper, "step")?.unwrap_or(defaults.step),
        };
        if bounds.min > bounds.max || bounds.step <= 0.0 || !bounds.step.is_finite() {
            return Err(Error::InvalidAttribute {
                element: wrapper,
                name: "data-min|data-max|data-step".into(),
                value: format!("{}..{} by {}", bounds.min, bounds.max, bounds.step),
                reason: "min must not exceed max and step must be positive".into(),
            });
        }
        let fallback = bounds.clamp(0.0);
        let initial = match number_attr(scene, input, wrapper, "value")? {
            Some(v) => v,
            None => to_number_or(scene.content(input).unwrap_or_default(), fallback),
        };

        let scene = stage.scene_mut();
        let minus = scene.add(
            Element::button(Rect::new(area.right().saturating_sub(2), area.y, 1, 1))
                .with_parent(wrapper)
                .with_attr("data-role", "decrement"),
        );
        let plus = scene.add(
            Element::button(Rect::new(area.right().saturating_sub(1), area.y, 1, 1))
                .with_parent(wrapper)
                .with_attr("data-role", "increment"),
        );

        let mut life = Life::new();
        life.define_property("value", bounds.clamp(initial));
        life.validate(
            "value",
            Box::new(move |candidate: f64, current: &f64| {
                if candidate.is_finite() {
                    bounds.clamp(candidate)
                } else {
                    *current
                }
            }),
        );
        life.init();

        let this = Self {
            life,
            wrapper,
            input,
            name,
            minus,
            plus,
            bounds,
            repeater: Repeater::default(),
            held: None,
        };
        this.write(stage.scene_mut());
        tracing::debug!(number_input = %this.life.id(), name = %this.name, ?bounds, "number input attached");
        Ok(this)
    }

    pub fn value(&self) -> f64 {
        self.life.property("value").copied().unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input(&self) -> ElementId {
        self.input
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn steppers(&self) -> (ElementId, ElementId) {
        (self.minus, self.plus)
    }

    pub fn is_repeating(&self) -> bool {
        self.repeater.is_running()
    }

    /// The canonical text for the current value.
    pub fn text(&self) -> String {
        format!("{:.*}", self.bounds.decimals(), self.value())
    }

    pub fn set_value(&mut self, stage: &mut Stage, value: f64) -> Command<Message> {
        let before = self.value();
        let flush = self.set_property("value", value, SetOptions::default());
        self.write(stage.scene_mut());
        let after = self.value();
        let notice = if after == before {
            Command::none()
        } else {
            Command::message(Message::Changed(after))
        };
        Command::batch([flush.then(Message::Sync), notice])
    }

    /// Move by `steps` steps.
    pub fn step_by(&mut self, stage: &mut Stage, steps: f64) -> Command<Message> {
        let target = self.value() + steps * self.bounds.step;
        self.set_value(stage, target)
    }

    /// Read the input's text back as the value.
    pub fn commit(&mut self, stage: &mut Stage) -> Command<Message> {
        let text = stage.scene().content(self.input).unwrap_or_default().to_string();
        let value = to_number_or(&text, self.value());
        self.set_value(stage, value)
    }

    fn write(&self, scene: &mut Scene) {
        scene.set_content(self.input, Some(self.text()));
    }

    fn press(&mut self, stage: &mut Stage, direction: f64) -> Command<Message> {
        self.held = Some(direction);
        let step = self.step_by(stage, direction);
        Command::batch([step, self.repeater.start(Message::Repeat)])
    }

    fn release(&mut self) -> Command<Message> {
        self.held = None;
        self.repeater.stop()
    }
}

impl Lifecycle for NumberInput {
    type Value = f64;

    fn life(&self) -> &Life<f64> {
        &self.life
    }

    fn life_mut(&mut self) -> &mut Life<f64> {
        &mut self.life
    }

    fn update_property(&mut self, _name: &'static str, change: &Change<f64>) {
        tracing::trace!(number_input = %self.life.id(), old = change.old, new = change.new, "value changed");
    }
}

impl Widget for NumberInput {
    type Message = Message;

    fn handle(&mut self, stage: &mut Stage, event: &DomEvent) -> Command<Message> {
        match event.kind {
            DomEventKind::PointerDown if event.on(self.minus) => self.press(stage, -1.0),
            DomEventKind::PointerDown if event.on(self.plus) => self.press(stage, 1.0),
            DomEventKind::PointerUp if self.held.is_some() => self.release(),
            DomEventKind::PointerLeave
                if self.held.is_some() && (event.on(self.minus) || event.on(self.plus)) =>
            {
                self.release()
            }
            DomEventKind::FocusOut if event.on(self.input) => self.commit(stage),
            DomEventKind::KeyDown if event.on(self.input) => match event.key.map(|k| k.code) {
                Some(KeyCode::Up) => self.step_by(stage, 1.0),
                Some(KeyCode::Down) => self.step_by(stage, -1.0),
                Some(KeyCode::PageUp) => self.step_by(stage, 10.0),
                Some(KeyCode::PageDown) => self.step_by(stage, -10.0),
                Some(KeyCode::Enter) => self.commit(stage),
                _ => Command::none(),
            },
            _ => Command::none(),
        }
    }

    fn update(&mut self, stage: &mut Stage, msg: Message) -> Command<Message> {
        match msg {
            Message::Sync => {
                self.sync();
                Command::none()
            }
            Message::Repeat(timer) => {
                let Some(direction) = self.held else {
                    return Command::none();
                };
                match self.repeater.fire(timer, Message::Repeat) {
                    Some(next) => Command::batch([self.step_by(stage, direction), next]),
                    None => Command::none(),
                }
            }
            Message::Changed(_) => Command::none(),
        }
    }

    fn view(&self, stage: &Stage, frame: &mut Frame, area: Rect) {
        let scene = stage.scene();
        if let Some(r) = scene.rect(self.input) {
            frame.render_widget(Paragraph::new(self.text()), r.intersection(area));
        }
        for (id, glyph) in [(self.minus, "-"), (self.plus, "+")] {
            if let Some(r) = scene.rect(id) {
                frame.render_widget(Paragraph::new(glyph), r.intersection(area));
            }
        }
    }

    fn dispose(&mut self, stage: &mut Stage) -> Command<Message> {
        let stop = self.release();
        for id in [self.minus, self.plus] {
            stage.scene_mut().remove(id);
        }
        self.dispose_life();
        tracing::debug!(wrapper = %self.wrapper, "number input detached");
        stop
    }
}
