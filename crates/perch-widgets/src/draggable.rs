//! Pointer dragging of an element by a handle.
//!
//! Pressing on the handle grabs the target; pointer motion moves the target
//! and every descendant by the same offset, kept inside the scene bounds;
//! releasing drops it.

use crate::mount::Widget;
use crate::position;
use crate::stage::Stage;
use perch_core::{Command, DomEvent, DomEventKind, ElementId, Scene};
use ratatui::layout::{Position, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    Started { at: Position },
    Moved { rect: Rect },
    Dropped { rect: Rect },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Grab {
    last: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draggable {
    target: ElementId,
    handle: ElementId,
    grab: Option<Grab>,
    enabled: bool,
}

impl Draggable {
    pub fn new(target: ElementId, handle: ElementId) -> Self {
        Self {
            target,
            handle,
            grab: None,
            enabled: true,
        }
    }

    pub fn target(&self) -> ElementId {
        self.target
    }

    pub fn is_dragging(&self) -> bool {
        self.grab.is_some()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.grab = None;
        }
    }

    /// Feed one scene event. Returns what happened, if anything.
    pub fn track(&mut self, scene: &mut Scene, event: &DomEvent) -> Option<Message> {
        if !self.enabled {
            return None;
        }
        let pos = event.pos?;
        match (event.kind, self.grab) {
            (DomEventKind::PointerDown, None) if event.on(self.handle) => {
                self.grab = Some(Grab { last: pos });
                tracing::trace!(target_el = %self.target, "drag started");
                Some(Message::Started { at: pos })
            }
            (DomEventKind::PointerMove, Some(grab)) => {
                let dx = pos.x as i32 - grab.last.x as i32;
                let dy = pos.y as i32 - grab.last.y as i32;
                self.grab = Some(Grab { last: pos });
                let rect = move_tree(scene, self.target, dx, dy)?;
                Some(Message::Moved { rect })
            }
            (DomEventKind::PointerUp, Some(_)) => {
                self.grab = None;
                let rect = scene.rect(self.target)?;
                tracing::trace!(target_el = %self.target, ?rect, "drag dropped");
                Some(Message::Dropped { rect })
            }
            _ => None,
        }
    }
}

/// Move `root` by up to (`dx`, `dy`) inside the scene bounds and carry its
/// descendants along. Returns the new rectangle of `root`.
pub fn move_tree(scene: &mut Scene, root: ElementId, dx: i32, dy: i32) -> Option<Rect> {
    let from = scene.rect(root)?;
    let to = position::shift_within(from, dx, dy, scene.bounds());
    let (dx, dy) = (to.x as i32 - from.x as i32, to.y as i32 - from.y as i32);
    if dx == 0 && dy == 0 {
        return Some(from);
    }
    scene.set_rect(root, to);
    for child in scene.descendants(root) {
        if let Some(r) = scene.rect(child) {
            let x = (r.x as i32 + dx).max(0) as u16;
            let y = (r.y as i32 + dy).max(0) as u16;
            scene.set_rect(child, Rect::new(x, y, r.width, r.height));
        }
    }
    Some(to)
}

impl Widget for Draggable {
    type Message = Message;

    fn handle(&mut self, stage: &mut Stage, event: &DomEvent) -> Command<Message> {
        match self.track(stage.scene_mut(), event) {
            Some(notice) => Command::message(notice),
            None => Command::none(),
        }
    }

    fn update(&mut self, _stage: &mut Stage, _msg: Message) -> Command<Message> {
        Command::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::MouseButton;
    use perch_core::Element;

    fn panel() -> (Scene, ElementId, ElementId, ElementId) {
        let mut scene = Scene::new(Rect::new(0, 0, 40, 20));
        let panel = scene.add(Element::region(Rect::new(5, 5, 10, 6)));
        let title = scene.add(Element::region(Rect::new(5, 5, 10, 1)).with_parent(panel));
        let ok = scene.add(Element::button(Rect::new(6, 9, 4, 1)).with_parent(panel));
        (scene, panel, title, ok)
    }

    fn run(drag: &mut Draggable, scene: &mut Scene, events: Vec<DomEvent>) -> Vec<Message> {
        events.iter().filter_map(|e| drag.track(scene, e)).collect()
    }

    #[test]
    fn drags_target_and_children_by_handle() {
        let (mut scene, panel, title, ok) = panel();
        let mut drag = Draggable::new(panel, title);

        let events = scene.pointer_pressed(Position::new(7, 5), MouseButton::Left);
        let notices = run(&mut drag, &mut scene, events);
        assert_eq!(notices, vec![Message::Started { at: Position::new(7, 5) }]);

        let events = scene.pointer_moved(Position::new(10, 7));
        run(&mut drag, &mut scene, events);
        assert_eq!(scene.rect(panel), Some(Rect::new(8, 7, 10, 6)));
        assert_eq!(scene.rect(ok), Some(Rect::new(9, 11, 4, 1)));

        let events = scene.pointer_released(Position::new(10, 7));
        let notices = run(&mut drag, &mut scene, events);
        assert_eq!(notices, vec![Message::Dropped { rect: Rect::new(8, 7, 10, 6) }]);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn pressing_outside_handle_does_nothing() {
        let (mut scene, panel, title, _) = panel();
        let mut drag = Draggable::new(panel, title);
        let events = scene.pointer_pressed(Position::new(7, 8), MouseButton::Left);
        assert!(run(&mut drag, &mut scene, events).is_empty());
        let events = scene.pointer_moved(Position::new(12, 12));
        assert!(run(&mut drag, &mut scene, events).is_empty());
        assert_eq!(scene.rect(panel), Some(Rect::new(5, 5, 10, 6)));
    }

    #[test]
    fn stays_inside_bounds() {
        let (mut scene, panel, title, _) = panel();
        assert_eq!(move_tree(&mut scene, panel, -50, 100), Some(Rect::new(0, 14, 10, 6)));
        assert_eq!(scene.rect(title), Some(Rect::new(0, 14, 10, 1)));
    }
}
