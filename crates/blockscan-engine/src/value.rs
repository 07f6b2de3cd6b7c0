use serde::Serialize;

/// A value produced by a scan.
///
/// Literal fragments and split tokens are `Text`. Blocks that keep their
/// delimiters, or handlers that return several values, produce a `Group`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text(String),
    Group(Vec<Part>),
}

impl Part {
    /// Returns the text if this is a `Text` part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text(s) => Some(s),
            Part::Group(_) => None,
        }
    }

    /// The elements of a `Group`, or the part itself as a single element.
    pub fn into_items(self) -> Vec<Part> {
        match self {
            Part::Group(items) => items,
            text => vec![text],
        }
    }

    /// The first element of a `Group`, or the part itself.
    pub fn first(&self) -> Option<&Part> {
        match self {
            Part::Group(items) => items.first(),
            text => Some(text),
        }
    }

    /// Concatenates all text in this part, depth first.
    pub fn flatten_text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Part::Text(s) => out.push_str(s),
            Part::Group(items) => items.iter().for_each(|p| p.push_text(out)),
        }
    }
}

impl Default for Part {
    fn default() -> Self {
        Part::Text(String::new())
    }
}

impl From<&str> for Part {
    fn from(s: &str) -> Self {
        Part::Text(s.to_string())
    }
}

impl From<String> for Part {
    fn from(s: String) -> Self {
        Part::Text(s)
    }
}

impl From<Vec<Part>> for Part {
    fn from(items: Vec<Part>) -> Self {
        Part::Group(items)
    }
}

/// Collapses a frame's parts into its result: no parts is the empty string,
/// a single part is unwrapped, anything else stays a group.
pub fn assemble(mut parts: Vec<Part>) -> Part {
    match parts.len() {
        0 => Part::default(),
        1 => parts.remove(0),
        _ => Part::Group(parts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn assemble_collapses_by_length() {
        assert_eq!(assemble(vec![]), Part::Text(String::new()));
        assert_eq!(assemble(vec!["a".into()]), Part::from("a"));
        assert_eq!(
            assemble(vec!["a".into(), "b".into()]),
            Part::Group(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn single_group_is_unwrapped_not_flattened() {
        let inner = Part::Group(vec!["\"".into(), "x".into(), "\"".into()]);
        assert_eq!(assemble(vec![inner.clone()]), inner);
    }

    #[test]
    fn into_items_wraps_text() {
        assert_eq!(Part::from("a").into_items(), vec![Part::from("a")]);
        assert_eq!(
            Part::Group(vec!["a".into(), "b".into()]).into_items().len(),
            2
        );
    }

    #[test]
    fn flatten_text_walks_nested_groups() {
        let part = Part::Group(vec![
            "<".into(),
            Part::Group(vec!["a".into(), "b".into()]),
            ">".into(),
        ]);
        assert_eq!(part.flatten_text(), "<ab>");
    }

    #[test]
    fn serializes_untagged() {
        let part = Part::Group(vec!["a".into(), Part::Group(vec!["b".into()])]);
        assert_eq!(serde_json::to_string(&part).unwrap(), r#"["a",["b"]]"#);
        assert_eq!(serde_json::to_string(&Part::from("x")).unwrap(), r#""x""#);
    }
}
