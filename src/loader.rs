//! Loading a macro script file into a [`MacroDocument`].
//!
//! Scripts are CSV records, one node per line:
//!
//! ```text
//! command , process-name , comment , module , main-class , class-path , vm-parameters , [TAG]arg ...
//! ```
//!
//! Double-quoted cells may contain commas; `""` escapes a quote.
//! Missing trailing cells default to empty. Every argument cell must
//! start with one of the `[IN]`/`[OUT]`/`[STR]`/`[PUB]`/`[SUB]` tags.

use std::path::Path;

use engine::{ArgKind, MacroDocument, MacroNode, ModuleArgument};
use parser::CommandError;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read macro script")]
    Io(#[from] std::io::Error),
    #[error("line {line}: unterminated quote")]
    UnterminatedQuote { line: usize },
    #[error("line {line}: argument cell '{cell}' does not start with a type tag")]
    UntaggedArgument { line: usize, cell: String },
}

/// A grammar error in one node's command cell, kept with its source
/// line for reporting.
#[derive(Debug)]
pub struct NodeError {
    pub line: usize,
    pub error: CommandError,
}

/// The loaded document plus any grammar errors. Nodes with errors stay
/// in the document (unregistered); execution must refuse to start while
/// `errors` is non-empty.
#[derive(Debug)]
pub struct LoadedScript {
    pub document: MacroDocument,
    pub errors: Vec<NodeError>,
}

pub fn load_script(path: &Path) -> Result<LoadedScript, LoadError> {
    let source = std::fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_script(&source, &name)
}

pub fn parse_script(source: &str, name: &str) -> Result<LoadedScript, LoadError> {
    let mut document = MacroDocument::new(name);
    let mut errors = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }

        let cells = split_record(line)
            .ok_or(LoadError::UnterminatedQuote { line: line_no })?;
        let mut cells = cells.into_iter();

        let mut node = MacroNode::new(line_no);
        node.set_command(cells.next().unwrap_or_default());
        node.set_process_name(cells.next().unwrap_or_default());
        node.set_comment(cells.next().unwrap_or_default());
        node.set_module_path(cells.next().unwrap_or_default());
        node.set_main_class(cells.next().unwrap_or_default());
        node.set_class_path(cells.next().unwrap_or_default());
        node.set_vm_parameters(cells.next().unwrap_or_default());
        for cell in cells.filter(|cell| !cell.is_empty()) {
            node.add_argument(parse_argument(line_no, &cell)?);
        }

        if let Err(error) = node.parse_action() {
            errors.push(NodeError {
                line: line_no,
                error,
            });
        }
        document.add_macro_node(node);
    }

    debug!(
        nodes = document.nodes().len(),
        errors = errors.len(),
        "loaded macro '{name}'"
    );
    Ok(LoadedScript { document, errors })
}

fn parse_argument(line: usize, cell: &str) -> Result<ModuleArgument, LoadError> {
    let untagged = || LoadError::UntaggedArgument {
        line,
        cell: cell.to_owned(),
    };
    let trimmed = cell.trim_start();
    let tag_end = trimmed.find(']').ok_or_else(untagged)?;
    let (tag, value) = trimmed.split_at(tag_end + 1);
    let kind = ArgKind::from_tag(tag).ok_or_else(untagged)?;
    Ok(ModuleArgument::new(kind, value))
}

/// Split one line on unquoted commas, then strip cell quoting.
fn split_record(line: &str) -> Option<Vec<String>> {
    let mut raw = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => raw.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    if quoted {
        return None;
    }
    raw.push(current);
    Some(raw.iter().map(|cell| clean_cell(cell)).collect())
}

fn clean_cell(cell: &str) -> String {
    let cell = cell.trim();
    match cell
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\"\"", "\""),
        None => cell.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_nodes_in_order() {
        let script = "\
RUN,P1,first step,modules/conv,pkg.Main,,-Xmx64m,[IN]in.csv,[OUT]out.csv
ECHO,,done ${P1}

EXIT,0";
        let loaded = parse_script(script, "test").unwrap();
        assert!(loaded.errors.is_empty());

        let nodes = loaded.document.nodes();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].process_name(), "P1");
        assert_eq!(nodes[0].module_path(), "modules/conv");
        assert_eq!(nodes[0].main_class(), "pkg.Main");
        assert_eq!(nodes[0].vm_parameters(), "-Xmx64m");
        assert_eq!(nodes[0].arguments().len(), 2);
        assert_eq!(nodes[0].arguments()[0].kind(), ArgKind::In);
        assert_eq!(nodes[1].comment(), "done ${P1}");
        assert_eq!(nodes[2].process_name(), "0");
        assert!(loaded.document.has_process_name("P1"));
    }

    #[test]
    fn quoted_cells_keep_commas_and_quotes() {
        let script = r#"RUN,P1,"a, b, and ""c""",tool.sh"#;
        let loaded = parse_script(script, "test").unwrap();
        assert_eq!(loaded.document.nodes()[0].comment(), r#"a, b, and "c""#);
    }

    #[test]
    fn command_cells_with_name_lists_need_quoting() {
        // unquoted, the comma ends the command cell mid-list
        let unquoted = parse_script("ERRORCOND(P1,P2)", "test").unwrap();
        assert_eq!(unquoted.errors.len(), 1);
        assert_eq!(unquoted.document.nodes()[0].command_text(), "ERRORCOND(P1");

        let quoted = parse_script(r#""ERRORCOND(P1,P2)",,after both"#, "test").unwrap();
        assert!(quoted.errors.is_empty());
        assert_eq!(
            quoted.document.nodes()[0].command_text(),
            "ERRORCOND(P1,P2)"
        );
    }

    #[test]
    fn grammar_errors_are_collected_not_fatal() {
        let loaded = parse_script("BOGUS,P1\nRUN,P2", "test").unwrap();
        assert_eq!(loaded.errors.len(), 1);
        assert_eq!(loaded.errors[0].line, 1);
        assert_eq!(loaded.document.nodes().len(), 2);
        assert!(!loaded.document.has_process_name("P1"));
        assert!(loaded.document.has_process_name("P2"));
    }

    #[test]
    fn untagged_argument_cell_is_an_error() {
        let err = parse_script("RUN,P1,,m,,,,plain", "test").unwrap_err();
        assert!(matches!(err, LoadError::UntaggedArgument { line: 1, .. }));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = parse_script("RUN,P1,\"oops", "test").unwrap_err();
        assert!(matches!(err, LoadError::UnterminatedQuote { line: 1 }));
    }
}
