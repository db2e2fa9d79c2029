//! Prepared-statement support: normalizing host-variable markers in a query
//! template to the positional placeholders the statement builder fills.
//!
//! The registry itself lives on the session; this module owns the template
//! normalization. A `:identifier` marker outside quoted literals becomes one
//! `?`, preserving left-to-right order. A `::` cast is not a marker.

/// Replaces every `:identifier` host-variable marker with `?`.
pub fn normalize_template(template: &str) -> String {
    let bytes = template.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match b {
            b'\'' => {
                if !(in_string && i > 0 && bytes[i - 1] == b'\\') {
                    in_string = !in_string;
                }
                out.push(b);
                i += 1;
            }
            b':' if !in_string => {
                // "::" is a cast, not a host variable
                if i + 1 < bytes.len() && bytes[i + 1] == b':' {
                    out.extend_from_slice(b"::");
                    i += 2;
                    continue;
                }
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_identifier_byte(bytes[end], end > start) {
                    end += 1;
                }
                if end > start {
                    out.push(b'?');
                    i = end;
                } else {
                    out.push(b':');
                    i += 1;
                }
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }

    // Substitutions are pure ASCII over valid UTF-8 input.
    String::from_utf8(out).expect("normalization preserves UTF-8")
}

fn is_identifier_byte(b: u8, continuation: bool) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || (continuation && b.is_ascii_digit())
}
