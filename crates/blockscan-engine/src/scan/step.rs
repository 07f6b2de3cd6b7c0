use crate::grammar::{BlockId, BlockSpec, Grammar};

use super::rules::{match_split, match_strip};

/// What the engine does at the cursor, decided by [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<'g> {
    /// An escaped delimiter: emit `literal` in its place.
    Escape { len: usize, literal: &'g str },
    /// The active block's stop delimiter.
    Close { stop: &'g str },
    /// A nested block's start delimiter.
    Open {
        name: &'g str,
        id: BlockId,
        start: &'g str,
    },
    Split { len: usize, token: Option<String> },
    Strip { len: usize },
    /// Ordinary character, part of the current literal run.
    Char,
}

/// Decides the transition for the remaining input `rest` under the active
/// frame's `spec`.
///
/// Priority: escaped stop, stop, escaped starts of nested blocks, nested
/// starts (declaration order, first match wins), split, strip.
pub fn classify<'g, C>(grammar: &'g Grammar<C>, spec: &'g BlockSpec<C>, rest: &str) -> Step<'g> {
    if let Some(escaped) = spec.escaped_stop.as_deref()
        && rest.starts_with(escaped)
    {
        let literal = match spec.stop.as_deref() {
            Some(stop) if spec.replace_escapes => stop,
            _ => escaped,
        };
        return Step::Escape {
            len: escaped.len(),
            literal,
        };
    }

    if let Some(stop) = spec.stop.as_deref()
        && rest.starts_with(stop)
    {
        return Step::Close { stop };
    }

    for (_, id) in spec.blocks() {
        let child = grammar.spec(id);
        if let Some(escaped) = child.escaped_start.as_deref()
            && rest.starts_with(escaped)
        {
            let literal = match child.start.as_deref() {
                Some(start) if child.replace_escapes => start,
                _ => escaped,
            };
            return Step::Escape {
                len: escaped.len(),
                literal,
            };
        }
    }

    for (name, id) in spec.blocks() {
        if let Some(start) = grammar.spec(id).start.as_deref()
            && rest.starts_with(start)
        {
            return Step::Open { name, id, start };
        }
    }

    if let Some(m) = match_split(spec, rest) {
        return Step::Split {
            len: m.len,
            token: m.token,
        };
    }

    if let Some(len) = match_strip(spec, rest) {
        return Step::Strip { len };
    }

    Step::Char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::BlockDef;
    use pretty_assertions::assert_eq;

    fn angle_grammar(replace: bool) -> Grammar {
        BlockDef::new()
            .split(",")
            .block(
                "block",
                BlockDef::delimited("<", ">")
                    .escaped_start("<<")
                    .escaped_stop(">>")
                    .replace_escapes(replace)
                    .split(","),
            )
            .resolve()
            .unwrap()
    }

    #[test]
    fn escaped_start_beats_start() {
        let g = angle_grammar(false);
        assert_eq!(
            classify(&g, g.root(), "<<1"),
            Step::Escape {
                len: 2,
                literal: "<<"
            }
        );
        assert!(matches!(
            classify(&g, g.root(), "<1"),
            Step::Open { name: "block", start: "<", .. }
        ));
    }

    #[test]
    fn escaped_stop_beats_stop_and_may_be_replaced() {
        let g = angle_grammar(true);
        let (_, id) = g.root().blocks().next().unwrap();
        let block = g.spec(id);
        assert_eq!(
            classify(&g, block, ">>2"),
            Step::Escape {
                len: 2,
                literal: ">"
            }
        );
        assert_eq!(classify(&g, block, ">2"), Step::Close { stop: ">" });
        assert_eq!(
            classify(&g, g.root(), "<<1"),
            Step::Escape {
                len: 2,
                literal: "<"
            }
        );
    }

    #[test]
    fn first_declared_block_wins() {
        let g = BlockDef::<()>::new()
            .block("single", BlockDef::delimited("{", "}"))
            .block("double", BlockDef::delimited("{{", "}}"))
            .resolve()
            .unwrap();
        assert!(matches!(
            classify(&g, g.root(), "{{x}}"),
            Step::Open { name: "single", .. }
        ));
    }

    #[test]
    fn nested_start_beats_split() {
        let g = BlockDef::<()>::new()
            .split(",")
            .block("comma", BlockDef::delimited(",", ";"))
            .resolve()
            .unwrap();
        assert!(matches!(classify(&g, g.root(), ",x;"), Step::Open { .. }));
    }

    #[test]
    fn split_beats_strip_and_falls_through_to_char() {
        let g = BlockDef::<()>::new()
            .split(" ")
            .strip(" ")
            .strip("!")
            .resolve()
            .unwrap();
        assert_eq!(
            classify(&g, g.root(), " x"),
            Step::Split {
                len: 1,
                token: None
            }
        );
        assert_eq!(classify(&g, g.root(), "!x"), Step::Strip { len: 1 });
        assert_eq!(classify(&g, g.root(), "x"), Step::Char);
    }
}
