//! # Block Stack Engine
//!
//! The scan loop: a cursor walk over the input that keeps open blocks on an
//! explicit frame stack.
//!
//! ## Architecture
//!
//! At each cursor position [`step::classify`] picks one transition for the
//! active frame, in fixed priority order:
//!
//! 1. Escaped stop → literal text
//! 2. Stop → close the block, run its handler, maybe reparse
//! 3. Nested escaped start → literal text
//! 4. Nested start → push a frame
//! 5. Split → end the current segment
//! 6. Strip → drop the matched text
//! 7. Anything else → extend the literal run by one character
//!
//! A reparse suspends the current string at its cursor and scans the
//! handler output with the same frame stack. When that string runs out the
//! suspended one is resumed exactly where it stopped.
//!
//! ## Modules
//!
//! - **`cursor`**: `Cursor` and the suspended-string stack (`Input`)
//! - **`frame`**: `Frame`, the per-block literal accumulator
//! - **`step`**: `Step` and `classify()`, the transition table
//! - **`rules`**: split/strip resolution
//! - **`options`**: `ScanOptions`

pub mod cursor;
pub mod frame;
pub mod options;
pub mod rules;
pub mod step;

use crate::error::ScanError;
use crate::grammar::{BlockId, Grammar, Handler};
use crate::trace::TraceSink;
use crate::value::Part;

use cursor::Input;
use frame::{Boundary, Frame};
use options::{ScanOptions, UnterminatedPolicy};
use step::{Step, classify};

/// Scans `text` with a grammar whose handlers need no context.
pub fn scan(text: &str, grammar: &Grammar) -> Result<Part, ScanError> {
    Scanner::new(grammar).scan(text, &mut ())
}

/// Scans `text`, passing `ctx` to every handler invocation.
pub fn scan_with_context<C>(text: &str, grammar: &Grammar<C>, ctx: &mut C) -> Result<Part, ScanError> {
    Scanner::new(grammar).scan(text, ctx)
}

/// A configured scan: grammar, options and an optional trace sink.
pub struct Scanner<'g, 's, C = ()> {
    grammar: &'g Grammar<C>,
    options: ScanOptions,
    trace: Option<&'s mut dyn TraceSink>,
}

impl<'g, 's, C> Scanner<'g, 's, C> {
    pub fn new(grammar: &'g Grammar<C>) -> Self {
        Self {
            grammar,
            options: ScanOptions::default(),
            trace: None,
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_trace(mut self, trace: &'s mut dyn TraceSink) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Scans `text`. A handler error aborts the scan with no partial result.
    pub fn scan(&mut self, text: &str, ctx: &mut C) -> Result<Part, ScanError> {
        let mut engine = Engine {
            grammar: self.grammar,
            options: self.options,
            trace: self.trace.take(),
            input: Input::new(text),
            frames: Stack::new(Frame::root(self.grammar.root())),
            end_reparses: 0,
        };
        let result = engine.run(ctx);
        self.trace = engine.trace.take();
        result
    }
}

/// The root frame plus every open block above it.
struct Stack<'g, C> {
    root: Frame<'g, C>,
    open: Vec<Frame<'g, C>>,
}

impl<'g, C> Stack<'g, C> {
    fn new(root: Frame<'g, C>) -> Self {
        Self {
            root,
            open: Vec::new(),
        }
    }

    fn at_root(&self) -> bool {
        self.open.is_empty()
    }

    fn active(&self) -> &Frame<'g, C> {
        self.open.last().unwrap_or(&self.root)
    }

    fn active_mut(&mut self) -> &mut Frame<'g, C> {
        self.open.last_mut().unwrap_or(&mut self.root)
    }
}

struct Engine<'g, 't, 's, C> {
    grammar: &'g Grammar<C>,
    options: ScanOptions,
    trace: Option<&'s mut dyn TraceSink>,
    input: Input<'t>,
    frames: Stack<'g, C>,
    /// Reparses started by closing a block at end of input. Resuming does
    /// not lower this, so it bounds blocks that reopen themselves at the end.
    end_reparses: usize,
}

fn invoke<C>(handle: &Handler<C>, part: Part, ctx: &mut C, block: &str) -> Result<Part, ScanError> {
    handle(part, ctx).map_err(|source| ScanError::Handler {
        block: block.to_string(),
        source,
    })
}

impl<'g, C> Engine<'g, '_, '_, C> {
    fn run(&mut self, ctx: &mut C) -> Result<Part, ScanError> {
        loop {
            if !self.input.cur.eof() {
                self.step(ctx)?;
            } else if self.input.depth() > 0 {
                self.resume();
            } else if !self.frames.at_root() {
                match self.options.unterminated {
                    UnterminatedPolicy::Error => {
                        let frame = self.frames.active();
                        return Err(ScanError::Unterminated {
                            block: frame.name.to_string(),
                            offset: frame.opened_at,
                        });
                    }
                    UnterminatedPolicy::Close => self.close_block(None, ctx)?,
                }
            } else {
                break;
            }
        }

        self.flush(Boundary::End, ctx)?;
        let root = std::mem::replace(&mut self.frames.root, Frame::root(self.grammar.root()));
        Ok(root.into_result())
    }

    fn step(&mut self, ctx: &mut C) -> Result<(), ScanError> {
        let frame = self.frames.active();
        let (spec, name) = (frame.spec, frame.name);
        let offset = self.input.cur.i;

        match classify(self.grammar, spec, self.input.cur.rest()) {
            Step::Escape { len, literal } => {
                if let Some(t) = self.trace.as_deref_mut() {
                    t.on_escape(offset, name, &self.input.cur.rest()[..len]);
                }
                let frame = self.frames.active_mut();
                frame.collect(&self.input.cur);
                frame.push_literal(literal);
                self.input.cur.bump_n(len);
                frame.skip_to(self.input.cur.i);
            }
            Step::Close { stop } => self.close_block(Some(stop), ctx)?,
            Step::Open { name, id, start } => self.open_block(name, id, start, ctx)?,
            Step::Split { len, token } => {
                if let Some(t) = self.trace.as_deref_mut() {
                    t.on_split_matched(offset, name, &self.input.cur.rest()[..len]);
                }
                self.flush(Boundary::Split, ctx)?;
                let frame = self.frames.active_mut();
                if let Some(token) = token {
                    frame.push_token(Part::Text(token));
                }
                frame.end_segment();
                self.input.cur.bump_n(len);
                frame.skip_to(self.input.cur.i);
            }
            Step::Strip { len } => {
                if let Some(t) = self.trace.as_deref_mut() {
                    t.on_strip_matched(offset, name, &self.input.cur.rest()[..len]);
                }
                let frame = self.frames.active_mut();
                frame.collect(&self.input.cur);
                self.input.cur.bump_n(len);
                frame.skip_to(self.input.cur.i);
            }
            Step::Char => {
                let ch = self.input.cur.bump();
                if let (Some(ch), Some(t)) = (ch, self.trace.as_deref_mut()) {
                    t.on_character(offset, ch, name);
                }
            }
        }
        Ok(())
    }

    /// Ends the active frame's literal run at the cursor and appends it as a
    /// part. Fragments of the root frame go through the root handler.
    fn flush(&mut self, boundary: Boundary, ctx: &mut C) -> Result<(), ScanError> {
        let at_root = self.frames.at_root();
        let frame = self.frames.active_mut();
        frame.collect(&self.input.cur);
        let Some(text) = frame.take_fragment(boundary) else {
            return Ok(());
        };
        let spec = frame.spec;
        let part = match &spec.handle {
            Some(handle) if at_root => invoke(handle, Part::Text(text), ctx, frame.name)?,
            _ => Part::Text(text),
        };
        frame.push_value(part);
        Ok(())
    }

    fn open_block(&mut self, name: &'g str, id: BlockId, start: &'g str, ctx: &mut C) -> Result<(), ScanError> {
        let child = self.grammar.spec(id);
        let offset = self.input.cur.i;
        if let Some(t) = self.trace.as_deref_mut() {
            t.on_block_enter(offset, name, start);
        }

        // Text before a reparsing block stays pending so the reparsed output
        // continues the same literal run.
        if child.reparses() {
            self.frames.active_mut().collect(&self.input.cur);
        } else {
            self.flush(Boundary::Block, ctx)?;
        }

        self.input.cur.bump_n(start.len());
        self.frames.open.push(Frame::open(name, child, offset, start));
        Ok(())
    }

    /// Closes the active block. `stop` is `None` when closing at end of input.
    fn close_block(&mut self, stop: Option<&'g str>, ctx: &mut C) -> Result<(), ScanError> {
        self.flush(Boundary::End, ctx)?;
        let offset = self.input.cur.i;
        if let Some(stop) = stop {
            self.input.cur.bump_n(stop.len());
        }

        let Some(mut frame) = self.frames.open.pop() else {
            return Ok(());
        };
        let (spec, name) = (frame.spec, frame.name);
        if let Some(t) = self.trace.as_deref_mut() {
            t.on_block_exit(offset, name, stop);
        }
        if let Some(stop) = stop
            && spec.keep_start_stop
        {
            frame.push_token(Part::from(stop));
        }

        let output = match &spec.handle {
            Some(handle) => invoke(handle, Part::Group(frame.into_parts()), ctx, name)?,
            None => frame.into_result(),
        };

        if spec.reparses()
            && let Part::Text(text) = output
        {
            return self.reparse(name, text, stop.is_none());
        }

        let at_root = self.frames.at_root();
        self.frames.active_mut().skip_to(self.input.cur.i);
        // Flushes a run kept pending for a reparse that did not happen.
        self.flush(Boundary::Block, ctx)?;

        let parent = self.frames.active_mut();
        let parent_spec = parent.spec;
        let output = match &parent_spec.handle {
            Some(handle) if at_root && parent_spec.handle_all => invoke(handle, output, ctx, parent.name)?,
            _ => output,
        };
        parent.push_value(output);
        Ok(())
    }

    fn reparse(&mut self, block: &str, text: String, at_end: bool) -> Result<(), ScanError> {
        let limit = self.options.max_reparse_depth;
        if self.input.depth() + self.end_reparses >= limit {
            return Err(ScanError::ReparseLimit {
                block: block.to_string(),
                limit,
            });
        }
        if at_end {
            self.end_reparses += 1;
        }
        if let Some(t) = self.trace.as_deref_mut() {
            t.on_reparse_start(block, &text, self.input.depth() + 1);
        }
        self.input.suspend(text);
        self.frames.active_mut().skip_to(0);
        Ok(())
    }

    /// Returns to the suspended string once the reparsed text is exhausted.
    fn resume(&mut self) {
        self.frames.active_mut().collect(&self.input.cur);
        if self.input.resume() {
            self.frames.active_mut().skip_to(self.input.cur.i);
            if let Some(t) = self.trace.as_deref_mut() {
                t.on_reparse_end(self.input.cur.i, self.input.depth());
            }
        }
    }
}
