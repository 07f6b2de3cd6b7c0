use std::collections::BTreeMap;
use std::sync::Arc;

use blockscan_engine::{Handler, Part};

/// Handlers a grammar file can name with `handle = "<name>"`.
pub struct HandlerRegistry<C = ()> {
    handlers: BTreeMap<String, Handler<C>>,
}

impl<C> Default for HandlerRegistry<C> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<C> HandlerRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handle` under `name`, replacing any earlier entry.
    pub fn register<F>(&mut self, name: impl Into<String>, handle: F) -> &mut Self
    where
        F: Fn(Part, &mut C) -> anyhow::Result<Part> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(handle));
        self
    }

    pub fn get(&self, name: &str) -> Option<Handler<C>> {
        self.handlers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl<C: 'static> HandlerRegistry<C> {
    /// A registry holding the context-free builtins:
    ///
    /// - `first`: the first collected part
    /// - `join`: all text concatenated
    /// - `trim`: all text concatenated, surrounding whitespace removed
    /// - `upper` / `lower`: all text concatenated, case converted
    /// - `flatten`: every text leaf as one flat group
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("first", |part: Part, _: &mut C| {
                Ok(part.first().cloned().unwrap_or_default())
            })
            .register("join", |part: Part, _: &mut C| Ok(Part::Text(part.flatten_text())))
            .register("trim", |part: Part, _: &mut C| {
                Ok(Part::from(part.flatten_text().trim()))
            })
            .register("upper", |part: Part, _: &mut C| {
                Ok(Part::Text(part.flatten_text().to_uppercase()))
            })
            .register("lower", |part: Part, _: &mut C| {
                Ok(Part::Text(part.flatten_text().to_lowercase()))
            })
            .register("flatten", |part: Part, _: &mut C| Ok(flatten(part)));
        registry
    }
}

fn flatten(part: Part) -> Part {
    fn collect(part: Part, out: &mut Vec<Part>) {
        match part {
            Part::Text(_) => out.push(part),
            Part::Group(items) => items.into_iter().for_each(|p| collect(p, out)),
        }
    }

    let mut out = Vec::new();
    collect(part, &mut out);
    Part::Group(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn sample() -> Part {
        Part::Group(vec![
            " Ab".into(),
            Part::Group(vec!["\"".into(), "cD".into(), "\"".into()]),
            "e ".into(),
        ])
    }

    #[rstest]
    #[case("first", Part::from(" Ab"))]
    #[case("join", Part::from(" Ab\"cD\"e "))]
    #[case("trim", Part::from("Ab\"cD\"e"))]
    #[case("upper", Part::from(" AB\"CD\"E "))]
    #[case("lower", Part::from(" ab\"cd\"e "))]
    #[case(
        "flatten",
        Part::Group(vec![" Ab".into(), "\"".into(), "cD".into(), "\"".into(), "e ".into()])
    )]
    fn test_builtin(#[case] name: &str, #[case] expected: Part) {
        let registry = HandlerRegistry::<()>::with_builtins();
        let handle = registry.get(name).unwrap();
        assert_eq!(handle(sample(), &mut ()).unwrap(), expected);
    }

    #[test]
    fn test_first_of_empty_group_is_empty_text() {
        let registry = HandlerRegistry::<()>::with_builtins();
        let handle = registry.get("first").unwrap();
        assert_eq!(handle(Part::Group(vec![]), &mut ()).unwrap(), Part::from(""));
    }

    #[test]
    fn test_register_replaces_and_lists_sorted() {
        let mut registry = HandlerRegistry::<u32>::with_builtins();
        registry.register("count", |part, seen: &mut u32| {
            *seen += 1;
            Ok(part)
        });
        registry.register("upper", |_, _| Ok(Part::from("replaced")));

        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["count", "first", "flatten", "join", "lower", "trim", "upper"]
        );

        let mut seen = 0;
        let count = registry.get("count").unwrap();
        count(Part::from("x"), &mut seen).unwrap();
        assert_eq!(seen, 1);

        let upper = registry.get("upper").unwrap();
        assert_eq!(upper(Part::from("x"), &mut seen).unwrap(), Part::from("replaced"));
    }
}
