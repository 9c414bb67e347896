//! Literal stripping.
//!
//! [`strip_literals`] blanks the contents of quoted strings and quoted
//! identifiers so that pattern matching only ever sees SQL tokens. The output
//! has exactly the same byte length as the input, and the delimiters stay in
//! place, so offsets found in the stripped copy are valid in the original.

/// Replace the contents of `'…'`, `"…"` and `` `…` `` literals with spaces.
///
/// Inside single- and double-quoted strings a backslash escapes the next
/// character. Inside any literal a doubled delimiter stands for one literal
/// character and does not close it. Backslash has no special meaning inside
/// backtick-quoted identifiers.
///
/// An unterminated literal is blanked up to the end of the input.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::validation::strip_literals;
///
/// assert_eq!(strip_literals("SELECT 'a;b'"), "SELECT '   '");
/// ```
pub fn strip_literals(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if !matches!(b, b'\'' | b'"' | b'`') {
            out.push(b);
            i += 1;
            continue;
        }

        let delim = b;
        let backslash_escapes = delim != b'`';
        out.push(delim);
        i += 1;

        while i < bytes.len() {
            let c = bytes[i];
            if backslash_escapes && c == b'\\' {
                // The escaped byte may be the start of a multi-byte char; the
                // continuation bytes are blanked by the loop either way.
                out.push(b' ');
                if i + 1 < bytes.len() {
                    out.push(b' ');
                }
                i += 2;
            } else if c == delim {
                if bytes.get(i + 1) == Some(&delim) {
                    out.extend_from_slice(b"  ");
                    i += 2;
                } else {
                    out.push(delim);
                    i += 1;
                    break;
                }
            } else {
                out.push(b' ');
                i += 1;
            }
        }
    }

    // Every non-ASCII byte is either copied from outside a literal (keeping the
    // char intact) or replaced by a space, so the result is valid UTF-8.
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
