//! Index iteration over a fixed number of items.
//!
//! A [`Cursor`] either loops (stepping past the last item lands on the
//! first) or clamps at both ends. Carousels loop; menus and lists usually
//! clamp.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    index: usize,
    count: usize,
    looping: bool,
}

impl Cursor {
    pub fn new(count: usize, looping: bool) -> Self {
        Self {
            index: 0,
            count,
            looping,
        }
    }

    pub fn looping(count: usize) -> Self {
        Self::new(count, true)
    }

    pub fn clamped(count: usize) -> Self {
        Self::new(count, false)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.count == 0 || self.index + 1 == self.count
    }

    /// Change the item count, keeping the index in range.
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.index = self.index.min(count.saturating_sub(1));
    }

    /// Where `index` lands: wrapped when looping, clamped otherwise.
    pub fn resolve(&self, index: i64) -> usize {
        if self.count == 0 {
            return 0;
        }
        let count = self.count as i64;
        if self.looping {
            index.rem_euclid(count) as usize
        } else {
            index.clamp(0, count - 1) as usize
        }
    }

    /// Move by `delta` items. Returns whether the index changed.
    pub fn step(&mut self, delta: i64) -> bool {
        self.go(self.index as i64 + delta)
    }

    pub fn next(&mut self) -> bool {
        self.step(1)
    }

    pub fn prev(&mut self) -> bool {
        self.step(-1)
    }

    /// Jump to `index`. Returns whether the index changed.
    pub fn go(&mut self, index: i64) -> bool {
        let target = self.resolve(index);
        let changed = target != self.index;
        self.index = target;
        changed
    }

    pub fn first(&mut self) -> bool {
        self.go(0)
    }

    pub fn last(&mut self) -> bool {
        self.go(self.count as i64 - 1)
    }
}
