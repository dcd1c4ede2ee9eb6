//! Source-level module detection, used before anything is compiled.

use std::path::Path;
use tree_sitter::Parser;

pub const MODULE_INFO_SOURCE_FILE: &str = "module-info.java";

/// True if any root directly contains `module-info.java`. Stops at the first hit.
pub fn is_module_source<I, P>(source_roots: I) -> bool
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    source_roots
        .into_iter()
        .any(|root| is_module_source_folder(root.as_ref()))
}

fn is_module_source_folder(folder: &Path) -> bool {
    folder.join(MODULE_INFO_SOURCE_FILE).exists()
}

/// Module name declared by the first root holding a `module-info.java`.
pub fn declared_module_name<I, P>(source_roots: I) -> Option<String>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let root = source_roots
        .into_iter()
        .find(|root| is_module_source_folder(root.as_ref()))?;
    let source = std::fs::read_to_string(root.as_ref().join(MODULE_INFO_SOURCE_FILE)).ok()?;
    parse_module_name(&source)
}

pub fn parse_module_name(source: &str) -> Option<String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .ok()?;
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();

    let mut cursor = root.walk();
    let decl = root
        .children(&mut cursor)
        .find(|child| child.kind() == "module_declaration")?;
    let name = decl.child_by_field_name("name")?;
    let text = name.utf8_text(source.as_bytes()).ok()?;
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}
