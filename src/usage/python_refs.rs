//! Name references in Python source via a tree-sitter syntax tree.
use tree_sitter::{Node, Parser};

use crate::error::{DepsaurusError, Result};

/// An `identifier` node matching the searched name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameReference {
    /// 1-based
    pub line: usize,
    pub column: usize,
}

pub struct PythonReferenceFinder {
    parser: Parser,
}

impl PythonReferenceFinder {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language: tree_sitter::Language =
            tree_sitter_python::LANGUAGE.into();
        parser
            .set_language(&language)
            .map_err(|e| DepsaurusError::SyntaxTreeError(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Every identifier equal to `name`, in source order.
    ///
    /// This over-matches: local variables that shadow the module name are
    /// reported too.
    pub fn find(
        &mut self,
        source: &str,
        name: &str,
    ) -> Result<Vec<NameReference>> {
        let tree = self.parser.parse(source, None).ok_or_else(|| {
            DepsaurusError::SyntaxTreeError("parser produced no tree".into())
        })?;

        let mut references = vec![];
        collect_identifiers(
            &tree.root_node(),
            source.as_bytes(),
            name,
            &mut references,
        );
        Ok(references)
    }
}

fn collect_identifiers(
    node: &Node,
    source: &[u8],
    name: &str,
    references: &mut Vec<NameReference>,
) {
    if node.kind() == "identifier"
        && node.utf8_text(source).is_ok_and(|text| text == name)
    {
        let position = node.start_position();
        references.push(NameReference {
            line: position.row + 1,
            column: position.column,
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_identifiers(&child, source, name, references);
    }
}
