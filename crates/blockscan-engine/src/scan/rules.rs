//! Split and strip resolution.
//!
//! Only the active frame's own rules apply; nothing is inherited from the
//! blocks around it. Rules are consulted after escapes, the stop delimiter and
//! nested block starts have all failed to match at the cursor.

use crate::grammar::{BlockSpec, StoreSplit};

/// A split match at the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitMatch {
    pub len: usize,
    /// The token to store as its own element, per `store_split`.
    pub token: Option<String>,
}

pub fn match_split<C>(spec: &BlockSpec<C>, rest: &str) -> Option<SplitMatch> {
    let m = spec.split.as_ref()?.match_prefix(rest)?;
    let token = match spec.store_split {
        StoreSplit::No => None,
        StoreSplit::Whole => Some(m.as_str().to_string()),
        StoreSplit::Group(n) => Some(m.group(n).to_string()),
    };
    Some(SplitMatch {
        len: m.len(),
        token,
    })
}

/// Length of the first strip rule, in declaration order, that matches.
pub fn match_strip<C>(spec: &BlockSpec<C>, rest: &str) -> Option<usize> {
    spec.strip
        .iter()
        .find_map(|rule| rule.match_prefix(rest))
        .map(|m| m.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::BlockDef;
    use rstest::rstest;

    #[rstest]
    #[case(StoreSplit::No, None)]
    #[case(StoreSplit::Whole, Some(" , "))]
    #[case(StoreSplit::Group(1), Some(","))]
    #[case(StoreSplit::Group(0), Some(" , "))]
    #[case(StoreSplit::Group(9), Some(" , "))]
    fn store_split_selects_token(#[case] store: StoreSplit, #[case] token: Option<&str>) {
        let g = BlockDef::<()>::new()
            .split_pattern(" *([,=]) *")
            .store_split(store)
            .resolve()
            .unwrap();
        let m = match_split(g.root(), " , b").unwrap();
        assert_eq!(m.len, 3);
        assert_eq!(m.token.as_deref(), token);
    }

    #[test]
    fn literal_split_stores_itself_for_any_group() {
        let g = BlockDef::<()>::new()
            .split("::")
            .store_split(StoreSplit::Group(2))
            .resolve()
            .unwrap();
        assert_eq!(
            match_split(g.root(), "::x"),
            Some(SplitMatch {
                len: 2,
                token: Some("::".into())
            })
        );
        assert_eq!(match_split(g.root(), "x::"), None);
    }

    #[test]
    fn first_strip_rule_in_order_wins() {
        let g = BlockDef::<()>::new()
            .strip("a")
            .strip_pattern("a+")
            .resolve()
            .unwrap();
        assert_eq!(match_strip(g.root(), "aaa"), Some(1));

        let g = BlockDef::<()>::new()
            .strip_pattern("a+")
            .strip("a")
            .resolve()
            .unwrap();
        assert_eq!(match_strip(g.root(), "aaa"), Some(3));
        assert_eq!(match_strip(g.root(), "baa"), None);
    }
}
