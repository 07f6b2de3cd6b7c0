use std::borrow::Cow;

/// A cursor for character-by-character scanning with position tracking.
///
/// The text is borrowed for the caller's input and owned for handler output
/// being reparsed.
#[derive(Debug, Clone)]
pub struct Cursor<'t> {
    /// The string being scanned.
    text: Cow<'t, str>,
    /// Current byte index into `text`. Always on a char boundary.
    pub i: usize,
}

impl<'t> Cursor<'t> {
    /// Creates a new cursor at the start of `text`.
    pub fn new(text: impl Into<Cow<'t, str>>) -> Self {
        Self {
            text: text.into(),
            i: 0,
        }
    }

    /// Returns true if at end of string.
    pub fn eof(&self) -> bool {
        self.i >= self.text.len()
    }

    /// The unscanned remainder.
    pub fn rest(&self) -> &str {
        &self.text[self.i..]
    }

    /// Text between `start` and the cursor.
    pub fn since(&self, start: usize) -> &str {
        &self.text[start..self.i]
    }

    /// Peeks at the current character without advancing.
    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Checks if the remaining input starts with `pat`.
    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    /// Advances by one character, returning it.
    pub fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.i += ch.len_utf8();
        Some(ch)
    }

    /// Advances by `n` bytes. `n` must land on a char boundary.
    pub fn bump_n(&mut self, n: usize) {
        self.i += n;
    }
}

/// The string being scanned plus every string suspended by a reparse.
///
/// Suspended cursors keep their position, so unwinding restores the exact
/// offset the outer scan stopped at.
#[derive(Debug)]
pub struct Input<'t> {
    pub cur: Cursor<'t>,
    suspended: Vec<Cursor<'t>>,
}

impl<'t> Input<'t> {
    pub fn new(text: &'t str) -> Self {
        Self {
            cur: Cursor::new(text),
            suspended: Vec::new(),
        }
    }

    /// Number of suspended strings.
    pub fn depth(&self) -> usize {
        self.suspended.len()
    }

    /// Suspends the current string at its cursor and starts scanning `text`.
    pub fn suspend(&mut self, text: String) {
        let outer = std::mem::replace(&mut self.cur, Cursor::new(text));
        self.suspended.push(outer);
    }

    /// Returns to the most recently suspended string, if any.
    pub fn resume(&mut self) -> bool {
        match self.suspended.pop() {
            Some(outer) => {
                self.cur = outer;
                true
            }
            None => false,
        }
    }
}
