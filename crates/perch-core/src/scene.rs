//! Addressable screen regions standing in for a document tree.
//!
//! A [`Scene`] records the elements an application lays out (trigger
//! regions, inputs, buttons and floating layers) together with their
//! rectangles, visibility, text content and `data-*` style attributes. It
//! tracks the pointer and keyboard focus, and turns raw [`TerminalEvent`]s
//! into element-addressed [`DomEvent`]s that widgets listen for.
//!
//! Layers always stack above ordinary elements; among equals, later
//! insertions stack higher.

use crate::error::Error;
use crate::event::TerminalEvent;
use crossterm::event::{KeyEvent, KeyEventKind, MouseButton, MouseEventKind};
use ratatui::layout::{Position, Rect};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Handle to an element registered in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an element is for. Inputs and buttons take focus when clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Plain region, typically a trigger.
    Region,
    /// Floating layer shown and hidden by popups.
    Layer,
    /// Text or value input.
    Input,
    /// Clickable button.
    Button,
}

impl Role {
    /// Whether clicking an element of this role moves keyboard focus to it.
    pub fn focusable(self) -> bool {
        matches!(self, Role::Input | Role::Button)
    }
}

/// One element of a scene.
///
/// Build with the role constructors and `with_*` methods, then hand it to
/// [`Scene::add`], which assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: ElementId,
    role: Role,
    parent: Option<ElementId>,
    rect: Rect,
    visible: bool,
    content: Option<String>,
    attrs: BTreeMap<String, String>,
}

impl Element {
    /// A new visible element.
    pub fn new(role: Role, rect: Rect) -> Self {
        Self {
            id: ElementId(0),
            role,
            parent: None,
            rect,
            visible: true,
            content: None,
            attrs: BTreeMap::new(),
        }
    }

    pub fn region(rect: Rect) -> Self {
        Self::new(Role::Region, rect)
    }

    pub fn input(rect: Rect) -> Self {
        Self::new(Role::Input, rect)
    }

    pub fn button(rect: Rect) -> Self {
        Self::new(Role::Button, rect)
    }

    /// A hidden layer with an empty rectangle; popups size and reveal it.
    pub fn layer() -> Self {
        Self::new(Role::Layer, Rect::default()).hidden()
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent: ElementId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Raw attribute lookup.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// `data-<name>` attribute lookup, ignoring blank values.
    pub fn data(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(&format!("data-{name}"))
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Kinds of element-level events a scene produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEventKind {
    Click,
    ContextMenu,
    PointerDown,
    PointerUp,
    PointerMove,
    PointerEnter,
    PointerLeave,
    FocusIn,
    FocusOut,
    KeyDown,
}

/// An event addressed to scene elements.
///
/// `path` is the target followed by its ancestors; listeners bound to any
/// element on the path see the event. Enter/leave events carry only their
/// own element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: DomEventKind,
    pub target: Option<ElementId>,
    pub path: Vec<ElementId>,
    pub pos: Option<Position>,
    pub key: Option<KeyEvent>,
}

impl DomEvent {
    fn new(kind: DomEventKind, target: Option<ElementId>, path: Vec<ElementId>) -> Self {
        Self {
            kind,
            target,
            path,
            pos: None,
            key: None,
        }
    }

    fn at(mut self, pos: Position) -> Self {
        self.pos = Some(pos);
        self
    }

    /// Whether `id` is the target or one of its ancestors.
    pub fn on(&self, id: ElementId) -> bool {
        self.path.contains(&id)
    }
}

/// The element registry plus pointer and focus state.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    elements: BTreeMap<ElementId, Element>,
    order: Vec<ElementId>,
    next_id: u32,
    bounds: Rect,
    pointer: Option<Position>,
    hovered: BTreeSet<ElementId>,
    focused: Option<ElementId>,
}

impl Scene {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    /// The screen area layers are kept inside.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
    }

    /// Register an element and return its id.
    pub fn add(&mut self, mut element: Element) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        element.id = id;
        self.elements.insert(id, element);
        self.order.push(id);
        id
    }

    /// Remove an element and all of its descendants.
    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        for child in self.descendants(id) {
            self.forget(child);
        }
        self.forget(id)
    }

    fn forget(&mut self, id: ElementId) -> Option<Element> {
        self.order.retain(|e| *e != id);
        self.hovered.remove(&id);
        if self.focused == Some(id) {
            self.focused = None;
        }
        self.elements.remove(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Look an element up, failing with [`Error::MissingElement`].
    pub fn require(&self, id: ElementId) -> Result<&Element, Error> {
        self.elements.get(&id).ok_or(Error::MissingElement(id))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn is_visible(&self, id: ElementId) -> bool {
        self.elements.get(&id).is_some_and(|e| e.visible)
    }

    /// Whether `id` and all of its ancestors are visible.
    pub fn is_displayed(&self, id: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.elements.get(&current) {
                Some(e) if e.visible => cursor = e.parent,
                _ => return false,
            }
        }
        true
    }

    fn displayed_at(&self, id: ElementId, pos: Position) -> bool {
        self.elements[&id].rect.contains(pos) && self.is_displayed(id)
    }

    pub fn rect(&self, id: ElementId) -> Option<Rect> {
        self.elements.get(&id).map(|e| e.rect)
    }

    pub fn content(&self, id: ElementId) -> Option<&str> {
        self.elements.get(&id).and_then(|e| e.content())
    }

    pub fn set_rect(&mut self, id: ElementId, rect: Rect) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.rect = rect;
        }
    }

    pub fn set_content(&mut self, id: ElementId, content: Option<String>) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.content = content;
        }
    }

    pub fn set_attr(&mut self, id: ElementId, name: impl Into<String>, value: impl Into<String>) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.attrs.insert(name.into(), value.into());
        }
    }

    /// Show or hide an element. A hidden element and its descendants stop
    /// counting as hovered, so they report a fresh enter the next time the
    /// pointer moves over them.
    pub fn set_visible(&mut self, id: ElementId, visible: bool) {
        if let Some(e) = self.elements.get_mut(&id) {
            e.visible = visible;
            if !visible {
                self.hovered.remove(&id);
                for child in self.descendants(id) {
                    self.hovered.remove(&child);
                }
            }
        }
    }

    /// Direct children in insertion order.
    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.order
            .iter()
            .copied()
            .filter(|e| self.elements.get(e).and_then(|el| el.parent) == Some(id))
            .collect()
    }

    /// All descendants, depth first.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = self.children(id);
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut kids = self.children(next);
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Whether `id` is `ancestor` or sits somewhere below it.
    pub fn contains(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.elements.get(&current).and_then(|e| e.parent);
        }
        false
    }

    /// First element whose attribute `name` equals `value`.
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<ElementId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.elements[id].attr(name) == Some(value))
    }

    /// The target followed by its ancestors.
    pub fn path(&self, target: ElementId) -> Vec<ElementId> {
        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(current) = cursor {
            path.push(current);
            cursor = self.elements.get(&current).and_then(|e| e.parent);
        }
        path
    }

    /// Elements bottom to top: ordinary elements first, then layers, each
    /// in insertion order.
    pub fn stacked(&self) -> Vec<&Element> {
        let (layers, rest): (Vec<&Element>, Vec<&Element>) = self
            .order
            .iter()
            .filter_map(|id| self.elements.get(id))
            .partition(|e| e.role == Role::Layer);
        rest.into_iter().chain(layers).collect()
    }

    /// Move `id` to the top of its stacking group.
    pub fn raise(&mut self, id: ElementId) {
        if self.elements.contains_key(&id) {
            self.order.retain(|e| *e != id);
            self.order.push(id);
        }
    }

    /// The nearest layer at or above `id`.
    fn layer_of(&self, id: ElementId) -> Option<ElementId> {
        self.path(id)
            .into_iter()
            .find(|e| self.elements.get(e).is_some_and(|el| el.role == Role::Layer))
    }

    /// Topmost visible element under `pos`. Anything inside a layer beats
    /// anything outside; among layers the later one wins; inside one layer
    /// deeper elements win.
    pub fn hit(&self, pos: Position) -> Option<ElementId> {
        let rank = |id: ElementId| self.layer_of(id).and_then(|l| self.order.iter().position(|e| *e == l));
        self.order
            .iter()
            .enumerate()
            .filter(|(_, id)| self.displayed_at(**id, pos))
            .max_by_key(|(index, id)| (rank(**id), self.path(**id).len(), *index))
            .map(|(_, id)| *id)
    }

    pub fn pointer(&self) -> Option<Position> {
        self.pointer
    }

    /// Whether the pointer currently rests inside the displayed element `id`.
    pub fn pointer_within(&self, id: ElementId) -> bool {
        match self.pointer {
            Some(pos) => self.elements.contains_key(&id) && self.displayed_at(id, pos),
            None => false,
        }
    }

    pub fn focused(&self) -> Option<ElementId> {
        self.focused
    }

    /// Move keyboard focus, producing focus-out then focus-in events.
    pub fn focus(&mut self, id: Option<ElementId>) -> Vec<DomEvent> {
        if self.focused == id {
            return Vec::new();
        }
        let mut events = Vec::new();
        if let Some(old) = self.focused.take() {
            events.push(DomEvent::new(DomEventKind::FocusOut, Some(old), self.path(old)));
        }
        if let Some(new) = id.filter(|id| self.elements.contains_key(id)) {
            self.focused = Some(new);
            events.push(DomEvent::new(DomEventKind::FocusIn, Some(new), self.path(new)));
        }
        events
    }

    /// Record a pointer position and report the leaves and enters it causes,
    /// followed by a move event.
    pub fn pointer_moved(&mut self, pos: Position) -> Vec<DomEvent> {
        self.pointer = Some(pos);
        let now: BTreeSet<ElementId> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.displayed_at(*id, pos))
            .collect();

        let mut events = Vec::new();
        for left in self.hovered.difference(&now) {
            events.push(DomEvent::new(DomEventKind::PointerLeave, Some(*left), vec![*left]).at(pos));
        }
        for entered in now.difference(&self.hovered) {
            events.push(
                DomEvent::new(DomEventKind::PointerEnter, Some(*entered), vec![*entered]).at(pos),
            );
        }
        self.hovered = now;

        let target = self.hit(pos);
        let path = target.map(|t| self.path(t)).unwrap_or_default();
        events.push(DomEvent::new(DomEventKind::PointerMove, target, path).at(pos));
        events
    }

    /// Events for a pointer press at `pos`, including focus changes and the
    /// click (left button) or context-menu (right button) event.
    pub fn pointer_pressed(&mut self, pos: Position, button: MouseButton) -> Vec<DomEvent> {
        let mut events = self.pointer_moved(pos);
        let target = self.hit(pos);
        let path = target.map(|t| self.path(t)).unwrap_or_default();
        events.push(DomEvent::new(DomEventKind::PointerDown, target, path.clone()).at(pos));

        match button {
            MouseButton::Left => {
                let focus_target = target.filter(|t| self.elements[t].role.focusable());
                events.extend(self.focus(focus_target));
                events.push(DomEvent::new(DomEventKind::Click, target, path).at(pos));
            }
            MouseButton::Right => {
                events.push(DomEvent::new(DomEventKind::ContextMenu, target, path).at(pos));
            }
            MouseButton::Middle => {}
        }
        events
    }

    pub fn pointer_released(&mut self, pos: Position) -> Vec<DomEvent> {
        self.pointer = Some(pos);
        let target = self.hit(pos);
        let path = target.map(|t| self.path(t)).unwrap_or_default();
        vec![DomEvent::new(DomEventKind::PointerUp, target, path).at(pos)]
    }

    /// A key press addressed to the focused element.
    pub fn key_pressed(&self, key: KeyEvent) -> DomEvent {
        let path = self.focused.map(|f| self.path(f)).unwrap_or_default();
        let mut event = DomEvent::new(DomEventKind::KeyDown, self.focused, path);
        event.key = Some(key);
        event
    }

    /// Translate raw terminal input into scene events.
    pub fn translate(&mut self, event: &TerminalEvent) -> Vec<DomEvent> {
        match event {
            TerminalEvent::Mouse(mouse) => {
                let pos = Position::new(mouse.column, mouse.row);
                match mouse.kind {
                    MouseEventKind::Moved | MouseEventKind::Drag(_) => self.pointer_moved(pos),
                    MouseEventKind::Down(button) => self.pointer_pressed(pos, button),
                    MouseEventKind::Up(_) => self.pointer_released(pos),
                    _ => Vec::new(),
                }
            }
            TerminalEvent::Key(key) if key.kind != KeyEventKind::Release => {
                vec![self.key_pressed(*key)]
            }
            TerminalEvent::Resize(w, h) => {
                self.bounds = Rect::new(0, 0, *w, *h);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn scene_with_button() -> (Scene, ElementId, ElementId) {
        let mut scene = Scene::new(Rect::new(0, 0, 80, 24));
        let panel = scene.add(Element::region(Rect::new(0, 0, 20, 5)));
        let button = scene.add(
            Element::button(Rect::new(2, 1, 6, 1))
                .with_parent(panel)
                .with_attr("data-title", "Save"),
        );
        (scene, panel, button)
    }

    #[test]
    fn click_path_bubbles_to_ancestors() {
        let (mut scene, panel, button) = scene_with_button();
        let events = scene.pointer_pressed(Position::new(3, 1), MouseButton::Left);
        let click = events
            .iter()
            .find(|e| e.kind == DomEventKind::Click)
            .expect("click event");
        assert_eq!(click.target, Some(button));
        assert_eq!(click.path, vec![button, panel]);
        assert!(click.on(panel));
    }

    #[test]
    fn clicking_focusable_moves_focus() {
        let (mut scene, _, button) = scene_with_button();
        let events = scene.pointer_pressed(Position::new(3, 1), MouseButton::Left);
        assert!(events
            .iter()
            .any(|e| e.kind == DomEventKind::FocusIn && e.target == Some(button)));
        assert_eq!(scene.focused(), Some(button));

        let events = scene.pointer_pressed(Position::new(15, 3), MouseButton::Left);
        assert!(events
            .iter()
            .any(|e| e.kind == DomEventKind::FocusOut && e.target == Some(button)));
        assert_eq!(scene.focused(), None);
    }

    #[test]
    fn enter_and_leave_follow_pointer() {
        let (mut scene, panel, button) = scene_with_button();
        let events = scene.pointer_moved(Position::new(3, 1));
        let entered: Vec<_> = events
            .iter()
            .filter(|e| e.kind == DomEventKind::PointerEnter)
            .filter_map(|e| e.target)
            .collect();
        assert_eq!(entered, vec![panel, button]);

        let events = scene.pointer_moved(Position::new(10, 3));
        let left: Vec<_> = events
            .iter()
            .filter(|e| e.kind == DomEventKind::PointerLeave)
            .filter_map(|e| e.target)
            .collect();
        assert_eq!(left, vec![button]);
        assert!(scene.pointer_within(panel));
        assert!(!scene.pointer_within(button));
    }

    #[test]
    fn layers_stack_above_regions() {
        let (mut scene, _, button) = scene_with_button();
        let layer = scene.add(Element::layer());
        scene.set_rect(layer, Rect::new(0, 0, 10, 3));
        assert_eq!(scene.hit(Position::new(3, 1)), Some(button));
        scene.set_visible(layer, true);
        assert_eq!(scene.hit(Position::new(3, 1)), Some(layer));
    }

    #[test]
    fn raise_reorders_layers() {
        let mut scene = Scene::new(Rect::new(0, 0, 80, 24));
        let low = scene.add(Element::layer());
        let high = scene.add(Element::layer());
        let region = scene.add(Element::region(Rect::new(0, 0, 5, 5)));
        for layer in [low, high] {
            scene.set_rect(layer, Rect::new(0, 0, 10, 3));
            scene.set_visible(layer, true);
        }
        assert_eq!(scene.hit(Position::new(1, 1)), Some(high));
        scene.raise(low);
        assert_eq!(scene.hit(Position::new(1, 1)), Some(low));
        let order: Vec<_> = scene.stacked().iter().map(|e| e.id()).collect();
        assert_eq!(order, vec![region, high, low]);
    }

    #[test]
    fn children_of_layers_are_hit_before_the_layer() {
        let mut scene = Scene::new(Rect::new(0, 0, 80, 24));
        let layer = scene.add(Element::layer());
        scene.set_rect(layer, Rect::new(0, 0, 20, 5));
        scene.set_visible(layer, true);
        let ok = scene.add(Element::button(Rect::new(2, 3, 4, 1)).with_parent(layer));
        scene.raise(layer);
        assert_eq!(scene.hit(Position::new(3, 3)), Some(ok));
        assert_eq!(scene.hit(Position::new(10, 1)), Some(layer));
        scene.set_visible(layer, false);
        assert_eq!(scene.hit(Position::new(3, 3)), None);
        assert!(!scene.is_displayed(ok));
    }

    #[test]
    fn hiding_clears_hover() {
        let mut scene = Scene::new(Rect::new(0, 0, 80, 24));
        let layer = scene.add(Element::layer());
        scene.set_rect(layer, Rect::new(0, 0, 10, 3));
        scene.set_visible(layer, true);
        scene.pointer_moved(Position::new(1, 1));
        scene.set_visible(layer, false);
        scene.set_visible(layer, true);
        let events = scene.pointer_moved(Position::new(2, 1));
        assert!(events
            .iter()
            .any(|e| e.kind == DomEventKind::PointerEnter && e.target == Some(layer)));
    }

    #[test]
    fn data_attributes_ignore_blank_values() {
        let mut scene = Scene::default();
        let id = scene.add(
            Element::region(Rect::default())
                .with_attr("data-title", "  ")
                .with_attr("data-placement", "left"),
        );
        let el = scene.require(id).unwrap();
        assert_eq!(el.data("title"), None);
        assert_eq!(el.data("placement"), Some("left"));
        assert_eq!(scene.find_by_attr("data-placement", "left"), Some(id));
    }

    #[test]
    fn remove_drops_descendants() {
        let (mut scene, panel, button) = scene_with_button();
        scene.remove(panel);
        assert!(scene.get(button).is_none());
        assert!(scene.is_empty());
        assert_eq!(scene.require(panel), Err(Error::MissingElement(panel)));
    }

    #[test]
    fn keys_target_focused_element() {
        let (mut scene, panel, button) = scene_with_button();
        scene.focus(Some(button));
        let key = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        let events = scene.translate(&TerminalEvent::Key(key));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, DomEventKind::KeyDown);
        assert_eq!(events[0].path, vec![button, panel]);
        assert_eq!(events[0].key, Some(key));
    }
}
