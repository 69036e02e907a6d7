/// Decode a request-target component: `%XX` and the legacy
/// `%uXXXX` escapes are unescaped, `+` becomes a space when `query` is
/// true, and a `%` not followed by two (or, for `%u`, four) valid hex
/// digits passes through as a literal `%` rather than erroring — percent
/// decoding here is lenient by design, the parser never rejects a request
/// over a malformed escape.
pub fn decode_uri_component(input: &str, query: bool) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' if query => {
                out.push(' ');
                i += 1;
            }
            b'%' => {
                if bytes.get(i + 1) == Some(&b'u') || bytes.get(i + 1) == Some(&b'U') {
                    if let Some(hex) = bytes.get(i + 2..i + 6) {
                        if let Some(cp) = parse_hex_u32(hex) {
                            if let Some(ch) = char::from_u32(cp) {
                                out.push(ch);
                                i += 6;
                                continue;
                            }
                        }
                    }
                    out.push('%');
                    i += 1;
                } else if let Some(hex) = bytes.get(i + 1..i + 3) {
                    if let Some(byte) = parse_hex_u8(hex) {
                        // Accumulate raw decoded bytes; handled below via a
                        // byte buffer so multi-byte UTF-8 sequences formed
                        // by consecutive %XX escapes decode correctly.
                        let mut raw = vec![byte];
                        i += 3;
                        while bytes.get(i) == Some(&b'%') {
                            if let Some(hex2) = bytes.get(i + 1..i + 3) {
                                if let Some(b2) = parse_hex_u8(hex2) {
                                    raw.push(b2);
                                    i += 3;
                                    continue;
                                }
                            }
                            break;
                        }
                        out.push_str(&String::from_utf8_lossy(&raw));
                        continue;
                    } else {
                        out.push('%');
                        i += 1;
                    }
                } else {
                    out.push('%');
                    i += 1;
                }
            }
            b => {
                // SAFETY-free: re-decode ASCII byte directly; non-ASCII
                // input bytes never appear here since `input` came from a
                // validated `&str`.
                out.push(b as char);
                i += 1;
            }
        }
    }
    out
}

fn parse_hex_u8(hex: &[u8]) -> Option<u8> {
    if hex.len() != 2 {
        return None;
    }
    let s = std::str::from_utf8(hex).ok()?;
    u8::from_str_radix(s, 16).ok()
}

fn parse_hex_u32(hex: &[u8]) -> Option<u32> {
    if hex.len() != 4 {
        return None;
    }
    let s = std::str::from_utf8(hex).ok()?;
    u32::from_str_radix(s, 16).ok()
}

/// Split a request-target into `(path, query)`, percent-decoding the path
/// and decoding `+` as space only within the query string.
pub fn split_and_decode(target: &str) -> (String, Option<String>) {
    match target.find('?') {
        Some(idx) => (
            decode_uri_component(&target[..idx], false),
            Some(decode_uri_component(&target[idx + 1..], true)),
        ),
        None => (decode_uri_component(target, false), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_percent_escapes() {
        assert_eq!(decode_uri_component("%2Fa%2Fb", false), "/a/b");
    }

    #[test]
    fn decodes_legacy_u_escape() {
        assert_eq!(decode_uri_component("%u0041", false), "A");
    }

    #[test]
    fn plus_is_space_only_in_query() {
        assert_eq!(decode_uri_component("a+b", true), "a b");
        assert_eq!(decode_uri_component("a+b", false), "a+b");
    }

    #[test]
    fn lone_percent_passes_through() {
        assert_eq!(decode_uri_component("100%", false), "100%");
        assert_eq!(decode_uri_component("50% off", false), "50% off");
    }

    #[test]
    fn split_and_decode_separates_query() {
        let (path, query) = split_and_decode("/search?q=a+b");
        assert_eq!(path, "/search");
        assert_eq!(query.as_deref(), Some("q=a b"));
    }
}
