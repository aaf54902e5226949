//! Locating embedded reference spans inside raw command strings.
//!
//! Two reference shapes exist: `${name}` for process-name or
//! macro-argument references and `$tmp{id}` for temporary files, told
//! apart by the `tmp` designator between the `$` and the brace. These
//! functions only find and classify spans; what a reference means is
//! the resolver's business.

/// Opening of a plain process/macro-argument reference.
pub const REF_OPEN: &str = "${";
/// Opening of a temporary-file reference.
pub const TMP_OPEN: &str = "$tmp{";
/// Closing delimiter shared by both reference shapes.
pub const REF_CLOSE: char = '}';

/// Find the next `$` that begins a `${...}` or `$tmp{...}` reference at
/// or after byte index `from`.
pub fn find_reference_start(s: &str, from: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        // `$` is ASCII, so a match is always a char boundary
        if bytes[i] == b'$' {
            let rest = &s[i..];
            if rest.starts_with(REF_OPEN) || rest.starts_with(TMP_OPEN) {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Find the closing `}` of a reference whose body starts at `from` (the
/// index right after the opening brace). References do not nest; the
/// first close wins. `None` means the span is unterminated.
pub fn find_reference_end(s: &str, from: usize) -> Option<usize> {
    if from > s.len() {
        return None;
    }
    s[from..].find(REF_CLOSE).map(|i| from + i)
}

/// Whether the span beginning at `start` is a temporary-file reference.
/// `start` must come from [`find_reference_start`].
pub fn is_temporary_at(s: &str, start: usize) -> bool {
    s[start..].starts_with(TMP_OPEN)
}

/// The inner name of a string that is (after trimming) exactly a
/// `${name}` reference and nothing else.
pub fn referenced_identifier(s: &str) -> Option<&str> {
    let body = s
        .trim()
        .strip_prefix(REF_OPEN)?
        .strip_suffix(REF_CLOSE)?;
    if body.is_empty() || body.contains(['{', '}']) {
        return None;
    }
    Some(body)
}

/// Whether a bare identifier string is itself wrapped as a
/// process-name reference.
pub fn is_reference_identifier(s: &str) -> bool {
    referenced_identifier(s).is_some()
}

/// If the whole string is (after trimming) exactly a well-formed
/// temp-file identifier, return it in normalized `$tmp{id}` form.
pub fn valid_temporary_id(s: &str) -> Option<String> {
    let body = s
        .trim()
        .strip_prefix(TMP_OPEN)?
        .strip_suffix(REF_CLOSE)?
        .trim();
    if body.is_empty() || body.contains(['{', '}', '$']) {
        return None;
    }
    Some(format!("$tmp{{{body}}}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plain_and_temp_starts() {
        let s = "a $x ${P1} b $tmp{1}";
        assert_eq!(find_reference_start(s, 0), Some(5));
        assert_eq!(find_reference_start(s, 6), Some(13));
        assert_eq!(find_reference_start(s, 14), None);
    }

    #[test]
    fn lone_dollar_is_not_a_reference() {
        assert_eq!(find_reference_start("100$ $ tmp{x}", 0), None);
    }

    #[test]
    fn end_is_first_close() {
        let s = "${A}}";
        assert_eq!(find_reference_end(s, 2), Some(3));
        assert_eq!(find_reference_end("${A", 2), None);
    }

    #[test]
    fn whole_string_identifier() {
        assert_eq!(referenced_identifier(" ${Proc} "), Some("Proc"));
        assert!(is_reference_identifier("${Proc}"));
        assert!(!is_reference_identifier("x${Proc}"));
        assert!(!is_reference_identifier("${a{b}"));
        assert!(!is_reference_identifier("$tmp{1}"));
    }

    #[test]
    fn temporary_id_normalization() {
        assert_eq!(valid_temporary_id(" $tmp{ 1 } "), Some("$tmp{1}".into()));
        assert_eq!(valid_temporary_id("$tmp{}"), None);
        assert_eq!(valid_temporary_id("${1}"), None);
        assert_eq!(valid_temporary_id("$tmp{1} extra"), None);
    }
}
