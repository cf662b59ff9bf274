//! Layer placement relative to an anchor, and centred rectangles.

use ratatui::layout::{Position, Rect};
use std::str::FromStr;

/// Side of the anchor a layer prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
    /// The first side with enough room, trying top, bottom, right, left.
    Auto,
}

impl FromStr for Placement {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Placement::Top),
            "bottom" => Ok(Placement::Bottom),
            "left" => Ok(Placement::Left),
            "right" => Ok(Placement::Right),
            "auto" => Ok(Placement::Auto),
            _ => Err(()),
        }
    }
}

impl Placement {
    fn opposite(self) -> Placement {
        match self {
            Placement::Top => Placement::Bottom,
            Placement::Bottom => Placement::Top,
            Placement::Left => Placement::Right,
            Placement::Right => Placement::Left,
            Placement::Auto => Placement::Auto,
        }
    }

    /// Room available on this side of `anchor` inside `bounds`, measured
    /// along the axis the layer extends in.
    fn room(self, anchor: Rect, bounds: Rect) -> u16 {
        match self {
            Placement::Top => anchor.y.saturating_sub(bounds.y),
            Placement::Bottom => bounds.bottom().saturating_sub(anchor.bottom()),
            Placement::Left => anchor.x.saturating_sub(bounds.x),
            Placement::Right => bounds.right().saturating_sub(anchor.right()),
            Placement::Auto => 0,
        }
    }

    fn needs(self, width: u16, height: u16) -> u16 {
        match self {
            Placement::Top | Placement::Bottom => height,
            _ => width,
        }
    }
}

/// Place a `width` x `height` layer next to `anchor`.
///
/// The preferred side flips to the opposite one when the layer does not fit
/// and the opposite side does; the result is then clamped into `bounds`.
/// Returns the rectangle and the side actually used.
pub fn place(anchor: Rect, width: u16, height: u16, bounds: Rect, preferred: Placement) -> (Rect, Placement) {
    let side = match preferred {
        Placement::Auto => [Placement::Top, Placement::Bottom, Placement::Right, Placement::Left]
            .into_iter()
            .find(|p| p.room(anchor, bounds) >= p.needs(width, height))
            .unwrap_or(Placement::Bottom),
        p if p.room(anchor, bounds) < p.needs(width, height)
            && p.opposite().room(anchor, bounds) >= p.needs(width, height) =>
        {
            p.opposite()
        }
        p => p,
    };

    let centre_x = anchor.x as i32 + anchor.width as i32 / 2 - width as i32 / 2;
    let centre_y = anchor.y as i32 + anchor.height as i32 / 2 - height as i32 / 2;
    let (x, y) = match side {
        Placement::Top => (centre_x, anchor.y as i32 - height as i32),
        Placement::Bottom | Placement::Auto => (centre_x, anchor.bottom() as i32),
        Placement::Left => (anchor.x as i32 - width as i32, centre_y),
        Placement::Right => (anchor.right() as i32, centre_y),
    };
    (clamp(x, y, width, height, bounds), side)
}

/// A `width` x `height` rectangle with its top-left corner at `at`,
/// moved back inside `bounds` if it would overflow.
pub fn at_point(at: Position, width: u16, height: u16, bounds: Rect) -> Rect {
    clamp(at.x as i32, at.y as i32, width, height, bounds)
}

fn clamp(x: i32, y: i32, width: u16, height: u16, bounds: Rect) -> Rect {
    let w = width.min(bounds.width);
    let h = height.min(bounds.height);
    let max_x = bounds.right() as i32 - w as i32;
    let max_y = bounds.bottom() as i32 - h as i32;
    let x = x.clamp(bounds.x as i32, max_x.max(bounds.x as i32));
    let y = y.clamp(bounds.y as i32, max_y.max(bounds.y as i32));
    Rect::new(x as u16, y as u16, w, h)
}

/// A centred rectangle of fixed size, clamped to `area`.
pub fn centered_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width - w) / 2;
    let y = area.y + (area.height - h) / 2;
    Rect::new(x, y, w, h)
}

/// Move `rect` by (`dx`, `dy`) while keeping it inside `bounds`.
pub fn shift_within(rect: Rect, dx: i32, dy: i32, bounds: Rect) -> Rect {
    clamp(rect.x as i32 + dx, rect.y as i32 + dy, rect.width, rect.height, bounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect::new(0, 0, 80, 24);

    #[test]
    fn top_centres_above_anchor() {
        let anchor = Rect::new(30, 10, 10, 1);
        let (rect, side) = place(anchor, 8, 3, SCREEN, Placement::Top);
        assert_eq!(side, Placement::Top);
        assert_eq!(rect, Rect::new(31, 7, 8, 3));
    }

    #[test]
    fn flips_when_out_of_room() {
        let anchor = Rect::new(30, 1, 10, 1);
        let (rect, side) = place(anchor, 8, 3, SCREEN, Placement::Top);
        assert_eq!(side, Placement::Bottom);
        assert_eq!(rect.y, 2);
    }

    #[test]
    fn clamps_horizontally() {
        let anchor = Rect::new(0, 10, 2, 1);
        let (rect, _) = place(anchor, 12, 3, SCREEN, Placement::Bottom);
        assert_eq!(rect.x, 0);
        let anchor = Rect::new(78, 10, 2, 1);
        let (rect, _) = place(anchor, 12, 3, SCREEN, Placement::Bottom);
        assert_eq!(rect.right(), 80);
    }

    #[test]
    fn auto_picks_a_side_with_room() {
        let anchor = Rect::new(30, 0, 10, 1);
        let (_, side) = place(anchor, 8, 3, SCREEN, Placement::Auto);
        assert_eq!(side, Placement::Bottom);
    }

    #[test]
    fn point_placement_stays_on_screen() {
        let rect = at_point(Position::new(75, 22), 10, 4, SCREEN);
        assert_eq!(rect, Rect::new(70, 20, 10, 4));
    }

    #[test]
    fn centered_fixed_clamps_to_area() {
        assert_eq!(centered_fixed(40, 20, Rect::new(10, 5, 80, 40)), Rect::new(30, 15, 40, 20));
        assert_eq!(centered_fixed(100, 50, Rect::new(0, 0, 20, 10)), Rect::new(0, 0, 20, 10));
    }

    #[test]
    fn parse_placement() {
        assert_eq!("LEFT".parse::<Placement>(), Ok(Placement::Left));
        assert!("diagonal".parse::<Placement>().is_err());
    }
}
