use crate::grammar::BlockSpec;
use crate::value::{Part, assemble};

use super::cursor::Cursor;

/// Name reported for the root frame.
pub const ROOT_NAME: &str = "root";

/// Where a literal fragment ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// A nested block starts or a block result is appended.
    Block,
    /// A split rule matched.
    Split,
    /// The frame closes or the input ends.
    End,
}

/// One open block on the engine's stack.
///
/// Literal text is accumulated lazily: `run_start` marks where the current
/// run began in the string being scanned, and `run` holds text already
/// collected from earlier strings, escapes and strips.
pub struct Frame<'g, C> {
    pub spec: &'g BlockSpec<C>,
    pub name: &'g str,
    /// Offset of the start delimiter, for diagnostics.
    pub opened_at: usize,
    pub run_start: usize,
    run: String,
    parts: Vec<Part>,
    /// Whether the segment since the last split boundary holds anything.
    touched: bool,
    split_seen: bool,
}

impl<'g, C> Frame<'g, C> {
    pub fn root(spec: &'g BlockSpec<C>) -> Self {
        Self::new(ROOT_NAME, spec, 0, 0)
    }

    /// A frame for a nested block whose start delimiter sits at `opened_at`.
    /// Its first run begins right after the delimiter.
    pub fn open(name: &'g str, spec: &'g BlockSpec<C>, opened_at: usize, start: &str) -> Self {
        let mut frame = Self::new(name, spec, opened_at, opened_at + start.len());
        if spec.keep_start_stop {
            frame.parts.push(Part::from(start));
        }
        frame
    }

    fn new(name: &'g str, spec: &'g BlockSpec<C>, opened_at: usize, run_start: usize) -> Self {
        Self {
            spec,
            name,
            opened_at,
            run_start,
            run: String::new(),
            parts: Vec::new(),
            touched: false,
            split_seen: false,
        }
    }

    /// Moves the text between `run_start` and the cursor into the run.
    pub fn collect(&mut self, cur: &Cursor<'_>) {
        self.run.push_str(cur.since(self.run_start));
        self.run_start = cur.i;
    }

    /// Appends text that does not come from the scanned string verbatim,
    /// such as a replaced escape.
    pub fn push_literal(&mut self, text: &str) {
        self.run.push_str(text);
    }

    /// Restarts the run at `at` without collecting the skipped text.
    pub fn skip_to(&mut self, at: usize) {
        self.run_start = at;
    }

    /// Takes the pending run as a fragment, if the boundary produces one.
    ///
    /// A non-empty run always does. An empty one only does when it is the
    /// whole segment between split boundaries and its block keeps empties.
    pub fn take_fragment(&mut self, boundary: Boundary) -> Option<String> {
        if !self.run.is_empty() {
            return Some(std::mem::take(&mut self.run));
        }
        let empty_segment = match boundary {
            Boundary::Block => false,
            Boundary::Split => !self.touched,
            Boundary::End => !self.touched && self.split_seen,
        };
        (empty_segment && !self.spec.ignore_empty).then(String::new)
    }

    /// Appends a value that belongs to the current segment.
    pub fn push_value(&mut self, part: Part) {
        self.parts.push(part);
        self.touched = true;
    }

    /// Appends a stored split token or delimiter, which is not segment content.
    pub fn push_token(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub fn end_segment(&mut self) {
        self.touched = false;
        self.split_seen = true;
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    pub fn into_result(self) -> Part {
        assemble(self.parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{BlockDef, Grammar};

    fn grammar(def: BlockDef) -> Grammar {
        def.resolve().unwrap()
    }

    #[test]
    fn collect_moves_text_since_run_start() {
        let g = grammar(BlockDef::new());
        let mut frame = Frame::root(g.root());
        let mut cur = Cursor::new("abc,def");
        cur.bump_n(3);
        frame.collect(&cur);
        assert_eq!(frame.run_start, 3);
        assert_eq!(frame.take_fragment(Boundary::Split), Some("abc".to_string()));
    }

    #[test]
    fn empty_segments_only_between_splits() {
        let g = grammar(BlockDef::new());
        let mut frame = Frame::root(g.root());
        assert_eq!(frame.take_fragment(Boundary::End), None);
        assert_eq!(frame.take_fragment(Boundary::Block), None);
        assert_eq!(frame.take_fragment(Boundary::Split), Some(String::new()));

        frame.end_segment();
        assert_eq!(frame.take_fragment(Boundary::End), Some(String::new()));

        frame.push_value(Part::from("x"));
        assert_eq!(frame.take_fragment(Boundary::Split), None);
    }

    #[test]
    fn ignore_empty_drops_empty_segments() {
        let g = grammar(BlockDef::new().ignore_empty(true));
        let mut frame = Frame::root(g.root());
        frame.end_segment();
        assert_eq!(frame.take_fragment(Boundary::Split), None);
        assert_eq!(frame.take_fragment(Boundary::End), None);
    }

    #[test]
    fn keep_start_stop_seeds_delimiter_as_token() {
        let g = grammar(BlockDef::new().block("q", BlockDef::delimited("\"", "\"").keep_start_stop(true)));
        let (name, id) = g.root().blocks().next().unwrap();
        let mut frame = Frame::open(name, g.spec(id), 4, "\"");
        assert_eq!(frame.run_start, 5);
        assert_eq!(frame.take_fragment(Boundary::Split), Some(String::new()));
        assert_eq!(frame.into_parts(), vec![Part::from("\"")]);
    }
}
