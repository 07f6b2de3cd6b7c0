//! # Trace Sinks
//!
//! The scan engine reports what it does through an optional [`TraceSink`].
//! Every callback has a no-op default, so a sink only implements the events
//! it cares about. Without a sink the engine does no tracing work at all.
//!
//! Offsets are byte offsets into the string being scanned at the time of the
//! event, which is a handler's output while a reparse is in progress.
//!
//! - **`Recorder`**: keeps owned [`TraceEvent`]s, for tests and tooling
//! - **`LogTrace`**: forwards events to the `log` facade

/// Receives scan events.
pub trait TraceSink {
    fn on_character(&mut self, _offset: usize, _ch: char, _block: &str) {}
    fn on_block_enter(&mut self, _offset: usize, _block: &str, _start: &str) {}
    fn on_block_exit(&mut self, _offset: usize, _block: &str, _stop: Option<&str>) {}
    fn on_escape(&mut self, _offset: usize, _block: &str, _escaped: &str) {}
    fn on_split_matched(&mut self, _offset: usize, _block: &str, _matched: &str) {}
    fn on_strip_matched(&mut self, _offset: usize, _block: &str, _matched: &str) {}
    fn on_reparse_start(&mut self, _block: &str, _text: &str, _depth: usize) {}
    fn on_reparse_end(&mut self, _resume_at: usize, _depth: usize) {}
}

/// An owned trace event, as kept by [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Character { offset: usize, ch: char, block: String },
    BlockEnter { offset: usize, block: String, start: String },
    BlockExit { offset: usize, block: String, stop: Option<String> },
    Escape { offset: usize, block: String, escaped: String },
    Split { offset: usize, block: String, matched: String },
    Strip { offset: usize, block: String, matched: String },
    ReparseStart { block: String, text: String, depth: usize },
    ReparseEnd { resume_at: usize, depth: usize },
}

/// Collects every event. Character events are kept only when `characters`
/// is set, since they dominate any trace.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<TraceEvent>,
    pub characters: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_characters() -> Self {
        Self {
            events: Vec::new(),
            characters: true,
        }
    }

    /// One line per event, in the order they were recorded.
    pub fn render(&self) -> String {
        let lines: Vec<String> = self.events.iter().map(describe).collect();
        lines.join("\n")
    }
}

fn describe(event: &TraceEvent) -> String {
    match event {
        TraceEvent::Character { offset, ch, block } => format!("{offset} char {ch:?} in {block}"),
        TraceEvent::BlockEnter { offset, block, start } => {
            format!("{offset} enter {block} {start:?}")
        }
        TraceEvent::BlockExit { offset, block, stop } => match stop {
            Some(stop) => format!("{offset} exit {block} {stop:?}"),
            None => format!("{offset} exit {block} at end of input"),
        },
        TraceEvent::Escape {
            offset,
            block,
            escaped,
        } => format!("{offset} escape {escaped:?} in {block}"),
        TraceEvent::Split {
            offset,
            block,
            matched,
        } => format!("{offset} split {matched:?} in {block}"),
        TraceEvent::Strip {
            offset,
            block,
            matched,
        } => format!("{offset} strip {matched:?} in {block}"),
        TraceEvent::ReparseStart { block, text, depth } => {
            format!("reparse {text:?} from {block} (depth {depth})")
        }
        TraceEvent::ReparseEnd { resume_at, depth } => {
            format!("resume at {resume_at} (depth {depth})")
        }
    }
}

impl TraceSink for Recorder {
    fn on_character(&mut self, offset: usize, ch: char, block: &str) {
        if self.characters {
            self.events.push(TraceEvent::Character {
                offset,
                ch,
                block: block.to_string(),
            });
        }
    }

    fn on_block_enter(&mut self, offset: usize, block: &str, start: &str) {
        self.events.push(TraceEvent::BlockEnter {
            offset,
            block: block.to_string(),
            start: start.to_string(),
        });
    }

    fn on_block_exit(&mut self, offset: usize, block: &str, stop: Option<&str>) {
        self.events.push(TraceEvent::BlockExit {
            offset,
            block: block.to_string(),
            stop: stop.map(str::to_string),
        });
    }

    fn on_escape(&mut self, offset: usize, block: &str, escaped: &str) {
        self.events.push(TraceEvent::Escape {
            offset,
            block: block.to_string(),
            escaped: escaped.to_string(),
        });
    }

    fn on_split_matched(&mut self, offset: usize, block: &str, matched: &str) {
        self.events.push(TraceEvent::Split {
            offset,
            block: block.to_string(),
            matched: matched.to_string(),
        });
    }

    fn on_strip_matched(&mut self, offset: usize, block: &str, matched: &str) {
        self.events.push(TraceEvent::Strip {
            offset,
            block: block.to_string(),
            matched: matched.to_string(),
        });
    }

    fn on_reparse_start(&mut self, block: &str, text: &str, depth: usize) {
        self.events.push(TraceEvent::ReparseStart {
            block: block.to_string(),
            text: text.to_string(),
            depth,
        });
    }

    fn on_reparse_end(&mut self, resume_at: usize, depth: usize) {
        self.events.push(TraceEvent::ReparseEnd { resume_at, depth });
    }
}

/// Forwards scan events to the `log` facade under the `blockscan` target.
///
/// Structural events are logged at `debug`; characters at `trace`, and only
/// when `verbose` is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace {
    pub verbose: bool,
}

impl LogTrace {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

const TARGET: &str = "blockscan";

impl TraceSink for LogTrace {
    fn on_character(&mut self, offset: usize, ch: char, block: &str) {
        if self.verbose {
            log::trace!(target: TARGET, "{offset}: {ch:?} in {block}");
        }
    }

    fn on_block_enter(&mut self, offset: usize, block: &str, start: &str) {
        log::debug!(target: TARGET, "{offset}: found a start for block {block}: {start:?}");
    }

    fn on_block_exit(&mut self, offset: usize, block: &str, stop: Option<&str>) {
        match stop {
            Some(stop) => {
                log::debug!(target: TARGET, "{offset}: found a stop for block {block}: {stop:?}")
            }
            None => log::debug!(target: TARGET, "{offset}: closing block {block} at end of input"),
        }
    }

    fn on_escape(&mut self, offset: usize, block: &str, escaped: &str) {
        log::debug!(target: TARGET, "{offset}: escaped {escaped:?} in block {block}");
    }

    fn on_split_matched(&mut self, offset: usize, block: &str, matched: &str) {
        log::debug!(target: TARGET, "{offset}: split {matched:?} in block {block}");
    }

    fn on_strip_matched(&mut self, offset: usize, block: &str, matched: &str) {
        log::debug!(target: TARGET, "{offset}: strip {matched:?} in block {block}");
    }

    fn on_reparse_start(&mut self, block: &str, text: &str, depth: usize) {
        log::debug!(target: TARGET, "reparsing output of {block} at depth {depth}: {text:?}");
    }

    fn on_reparse_end(&mut self, resume_at: usize, depth: usize) {
        log::debug!(target: TARGET, "reset string at {resume_at}, depth {depth}");
    }
}
