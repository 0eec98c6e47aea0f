use jclean_ast::{Ast, NodeId, TextRange, TextRangeExt};

/// Extracts a byte range selection from a fixture containing `/*start*/` and
/// `/*end*/` markers.
///
/// Returns the fixture with markers removed and the selection `TextRange`
/// pointing at the extracted region.
pub fn extract_range(fixture: &str) -> (String, TextRange) {
    let start_marker = "/*start*/";
    let end_marker = "/*end*/";

    let start = fixture
        .find(start_marker)
        .expect("fixture missing /*start*/ marker");
    let after_start = start + start_marker.len();
    let end = fixture
        .find(end_marker)
        .expect("fixture missing /*end*/ marker");
    assert!(end >= after_start, "/*end*/ must come after /*start*/");

    let mut text = String::with_capacity(fixture.len());
    text.push_str(&fixture[..start]);
    text.push_str(&fixture[after_start..end]);
    text.push_str(&fixture[end + end_marker.len()..]);

    let range = TextRange::from_offsets(start, end - start_marker.len());
    (text, range)
}

/// Outermost node whose range is exactly `range`.
pub fn node_with_range(ast: &Ast, range: TextRange) -> Option<NodeId> {
    ast.preorder(ast.root())
        .into_iter()
        .find(|id| ast.range(*id) == range)
}

/// Outermost node whose text is `snippet`, at the first occurrence of
/// `snippet` that is a node at all.
pub fn find_node(ast: &Ast, source: &str, snippet: &str) -> NodeId {
    let mut from = 0;
    while let Some(rel) = source[from..].find(snippet) {
        let start = from + rel;
        if let Some(id) = node_with_range(ast, TextRange::from_len(start, snippet.len())) {
            return id;
        }
        from = start + 1;
    }
    panic!("no node with text {snippet:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fixture;
    use jclean_ast::NodeKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn extract_range_strips_markers() {
        let (text, range) = extract_range("a /*start*/b + c/*end*/;");
        assert_eq!(text, "a b + c;");
        assert_eq!(range.slice(&text), "b + c");
    }

    #[test]
    fn find_node_prefers_the_outermost_match() {
        let source = "class A { void m() { x = (y); } }";
        let unit = parse_fixture(source);
        let assign = find_node(&unit.ast, source, "x = (y)");
        assert!(matches!(unit.ast.kind(assign), NodeKind::Assign { .. }));
        let paren = find_node(&unit.ast, source, "(y)");
        assert!(matches!(unit.ast.kind(paren), NodeKind::Paren { .. }));
    }
}
