//! Expansion of embedded references against a document snapshot.
//!
//! Both policies are read-only over the document and best-effort:
//! whatever cannot be resolved stays in place as literal text. Macros
//! may reference optional upstream nodes, so a missing name is not an
//! error here.

use parser::refs;

use crate::document::MacroDocument;

/// Argument-conversion policy: expand every embedded reference in
/// `text` to its concrete runtime value.
pub fn convert_reference(doc: &MacroDocument, text: &str) -> String {
    // a value that is nothing but a temp-file id becomes the bare path
    if let Some(id) = refs::valid_temporary_id(text) {
        if let Some(path) = doc.temp_file(&id) {
            return path.to_string_lossy().into_owned();
        }
    }

    let mut out = String::new();
    let mut pos = 0;
    while let Some(start) = refs::find_reference_start(text, pos) {
        out.push_str(&text[pos..start]);

        let temporary = refs::is_temporary_at(text, start);
        let body_start = start
            + if temporary {
                refs::TMP_OPEN.len()
            } else {
                refs::REF_OPEN.len()
            };
        let Some(end) = refs::find_reference_end(text, body_start) else {
            // unterminated span: no more references, emit the rest
            out.push_str(&text[start..]);
            return out;
        };

        let literal = &text[start..=end];
        let body = &text[body_start..end];
        let resolved = if temporary {
            doc.temp_file(&format!("$tmp{{{}}}", body.trim()))
                .map(|path| path.to_string_lossy().into_owned())
        } else if body.contains('{') {
            // a sub-bracket disqualifies the span
            None
        } else {
            lookup_reference(doc, literal, body)
        };

        match resolved {
            Some(value) => out.push_str(&value),
            None => out.push_str(literal),
        }
        pos = end + 1;
    }
    out.push_str(&text[pos..]);
    out
}

/// Macro arguments win over a same-named process. Arguments are keyed
/// by the full reference text; a bare-name key is accepted as well.
fn lookup_reference(doc: &MacroDocument, literal: &str, body: &str) -> Option<String> {
    let name = body.trim();
    doc.macro_arg(literal)
        .or_else(|| doc.macro_arg(&format!("${{{name}}}")))
        .or_else(|| doc.macro_arg(name))
        .map(str::to_owned)
        .or_else(|| doc.process_exit_code(name).map(|code| code.to_string()))
}

/// Echo-display policy: append the expansion of `text` to `buf`,
/// separating non-empty fields with a single space.
pub fn append_echo_string(doc: &MacroDocument, buf: &mut String, text: &str) {
    let resolved = convert_reference(doc, text);
    if resolved.is_empty() {
        return;
    }
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(&resolved);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn doc() -> MacroDocument {
        let mut doc = MacroDocument::new("test");
        doc.put_macro_arg("${A}", "X");
        doc.put_process_exit_code("A", 5);
        doc.put_process_exit_code("P", 3);
        doc.put_temp_file("$tmp{1}", PathBuf::from("/abs/path"));
        doc
    }

    #[test]
    fn macro_argument_wins_over_process() {
        assert_eq!(convert_reference(&doc(), "${A}"), "X");
    }

    #[test]
    fn process_exit_code_substituted() {
        assert_eq!(convert_reference(&doc(), "code=${P}"), "code=3");
    }

    #[test]
    fn whole_string_temp_id_is_exact() {
        assert_eq!(convert_reference(&doc(), "$tmp{1}"), "/abs/path");
        assert_eq!(convert_reference(&doc(), "  $tmp{1}  "), "/abs/path");
    }

    #[test]
    fn embedded_temp_id_substituted() {
        assert_eq!(convert_reference(&doc(), "-o $tmp{1} -v"), "-o /abs/path -v");
    }

    #[test]
    fn unresolved_references_pass_through() {
        let doc = MacroDocument::new("empty");
        assert_eq!(convert_reference(&doc, "${unknown}"), "${unknown}");
        assert_eq!(convert_reference(&doc, "$tmp{9}"), "$tmp{9}");
    }

    #[test]
    fn unset_exit_code_passes_through() {
        let mut doc = MacroDocument::new("test");
        let mut node = crate::node::MacroNode::new(1);
        node.set_command("RUN");
        node.set_process_name("Later");
        doc.add_macro_node(node);
        // registered but not yet run
        assert_eq!(convert_reference(&doc, "${Later}"), "${Later}");
    }

    #[test]
    fn unterminated_span_emits_rest_literally() {
        assert_eq!(convert_reference(&doc(), "x ${A"), "x ${A");
        assert_eq!(convert_reference(&doc(), "${P} then ${oops"), "3 then ${oops");
        assert_eq!(convert_reference(&doc(), "$tmp{1"), "$tmp{1");
    }

    #[test]
    fn sub_bracket_disqualifies_span() {
        assert_eq!(convert_reference(&doc(), "${a{b}"), "${a{b}");
    }

    #[test]
    fn echo_policy_joins_with_single_spaces() {
        let doc = doc();
        let mut buf = String::new();
        append_echo_string(&doc, &mut buf, "run");
        append_echo_string(&doc, &mut buf, "");
        append_echo_string(&doc, &mut buf, "${P}");
        assert_eq!(buf, "run 3");
    }
}
