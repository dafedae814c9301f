/// Active row within whichever sequence is currently displayed.
///
/// `index` is `Some(i)` with `i < len` whenever `len > 0`, and `None`
/// otherwise. Every mutator re-establishes this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionCursor {
    index: Option<usize>,
    len: usize,
}

impl SelectionCursor {
    /// Cursor over a sequence of `len` rows, on the first row.
    pub fn new(len: usize) -> Self {
        Self {
            index: if len > 0 { Some(0) } else { None },
            len,
        }
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// Move one row up; a no-op on the first row.
    pub fn move_up(&mut self) {
        self.move_by(-1);
    }

    /// Move one row down; a no-op on the last row.
    pub fn move_down(&mut self) {
        self.move_by(1);
    }

    /// Move by `delta` rows, clamped at both ends.
    pub fn move_by(&mut self, delta: isize) {
        if let Some(i) = self.index {
            let target = if delta.is_negative() {
                i.saturating_sub(delta.unsigned_abs())
            } else {
                i.saturating_add(delta as usize)
            };
            self.set_to(target);
        }
    }

    pub fn first(&mut self) {
        self.set_to(0);
    }

    pub fn last(&mut self) {
        self.set_to(usize::MAX);
    }

    /// Jump to `index`, clamping silently to the last row.
    pub fn set_to(&mut self, index: usize) {
        self.index = if self.len == 0 {
            None
        } else {
            Some(index.min(self.len - 1))
        };
    }

    /// Bind to a new sequence of `len` rows. `found` is where the previously
    /// selected item sits in the new sequence, if it is still there.
    pub fn rebind(&mut self, len: usize, found: Option<usize>) {
        self.len = len;
        match found {
            Some(i) if i < len => self.index = Some(i),
            _ => self.set_to(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_in_bounds(cursor: &SelectionCursor) {
        match cursor.index() {
            Some(i) => assert!(i < cursor.len),
            None => assert_eq!(cursor.len, 0),
        }
    }

    #[test]
    fn empty_cursor_has_no_index() {
        let mut cursor = SelectionCursor::new(0);
        assert_eq!(cursor.index(), None);
        cursor.move_down();
        cursor.set_to(4);
        assert_eq!(cursor.index(), None);
    }

    #[test]
    fn moves_are_clamped_not_cyclic() {
        let mut cursor = SelectionCursor::new(3);
        cursor.move_up();
        assert_eq!(cursor.index(), Some(0));
        cursor.move_down();
        cursor.move_down();
        cursor.move_down();
        assert_eq!(cursor.index(), Some(2));
    }

    #[test]
    fn set_to_clamps_silently() {
        let mut cursor = SelectionCursor::new(5);
        cursor.set_to(99);
        assert_eq!(cursor.index(), Some(4));
        cursor.first();
        assert_eq!(cursor.index(), Some(0));
        cursor.last();
        assert_eq!(cursor.index(), Some(4));
    }

    #[test]
    fn move_by_pages() {
        let mut cursor = SelectionCursor::new(10);
        cursor.move_by(3);
        assert_eq!(cursor.index(), Some(3));
        cursor.move_by(-10);
        assert_eq!(cursor.index(), Some(0));
        cursor.move_by(isize::MAX);
        assert_eq!(cursor.index(), Some(9));
    }

    #[test]
    fn rebind_preserves_found_item() {
        let mut cursor = SelectionCursor::new(5);
        cursor.set_to(3);
        cursor.rebind(8, Some(6));
        assert_eq!(cursor.index(), Some(6));
    }

    #[test]
    fn rebind_without_match_resets_to_first() {
        let mut cursor = SelectionCursor::new(5);
        cursor.set_to(3);
        cursor.rebind(2, None);
        assert_eq!(cursor.index(), Some(0));
        cursor.rebind(0, None);
        assert_eq!(cursor.index(), None);
        cursor.rebind(4, Some(9));
        assert_eq!(cursor.index(), Some(0));
    }

    #[test]
    fn any_operation_sequence_stays_in_bounds() {
        let mut cursor = SelectionCursor::new(4);
        let lens = [4usize, 0, 1, 7, 3, 0, 2];
        for (step, len) in lens.iter().enumerate() {
            cursor.move_by(step as isize * 2 - 5);
            assert_in_bounds(&cursor);
            cursor.rebind(*len, Some(step));
            assert_in_bounds(&cursor);
            cursor.last();
            cursor.move_down();
            assert_in_bounds(&cursor);
            cursor.set_to(step * 3);
            assert_in_bounds(&cursor);
        }
    }
}
