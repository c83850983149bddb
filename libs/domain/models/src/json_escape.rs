//! A minimal JSON string-literal decoder for the byte-level entity
//! scanner (C2). Deliberately narrower than a general JSON parser: it
//! only has to understand the escape grammar inside a single quoted
//! string, because the scanner locates field boundaries with literal
//! byte search rather than building a DOM.

/// Decodes a JSON string literal, including its surrounding quotes.
/// Returns `None` only if the literal itself is unterminated or a
/// `\u` escape is truncated mid-string, since those leave the scanner
/// unable to tell where the literal ends. Within an otherwise
/// well-formed literal, an unpaired surrogate decodes to the Unicode
/// replacement character and an escape outside the grammar below is
/// dropped (the backslash and the character after it vanish), rather
/// than invalidating the whole title.
pub fn unquote(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '/' => out.push('/'),
            'b' => out.push('\u{0008}'),
            'f' => out.push('\u{000C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => {
                let high = read_hex4(&mut chars)?;
                if (0xD800..=0xDBFF).contains(&high) {
                    let mut lookahead = chars.clone();
                    let paired_low = (lookahead.next() == Some('\\') && lookahead.next() == Some('u'))
                        .then(|| read_hex4(&mut lookahead))
                        .flatten()
                        .filter(|low| (0xDC00..=0xDFFF).contains(low));
                    match paired_low {
                        Some(low) => {
                            chars = lookahead;
                            let code_point = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                            out.push(char::from_u32(code_point).unwrap_or('\u{FFFD}'));
                        }
                        None => out.push('\u{FFFD}'),
                    }
                } else if (0xDC00..=0xDFFF).contains(&high) {
                    out.push('\u{FFFD}');
                } else {
                    out.push(char::from_u32(high).unwrap_or('\u{FFFD}'));
                }
            }
            _ => {}
        }
    }
    Some(out)
}

fn read_hex4(chars: &mut std::str::Chars<'_>) -> Option<u32> {
    let mut value: u32 = 0;
    for _ in 0..4 {
        value = value * 16 + chars.next()?.to_digit(16)?;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_text() {
        assert_eq!(unquote("\"hello\"").unwrap(), "hello");
    }

    #[test]
    fn decodes_simple_escapes() {
        assert_eq!(unquote("\"a\\nb\\tc\"").unwrap(), "a\nb\tc");
    }

    #[test]
    fn decodes_bmp_unicode_escape() {
        assert_eq!(unquote("\"\\uc11c\\uacbd\\uc8fc\\uc5ed\"").unwrap(), "서경주역");
    }

    #[test]
    fn decodes_surrogate_pair() {
        // U+1F600 GRINNING FACE, encoded as a UTF-16 surrogate pair.
        assert_eq!(unquote("\"\\ud83d\\ude00\"").unwrap(), "\u{1F600}");
    }

    #[test]
    fn rejects_unterminated_literal() {
        assert!(unquote("\"unterminated").is_none());
    }

    #[test]
    fn drops_unknown_escapes_instead_of_failing_the_whole_literal() {
        assert_eq!(unquote("\"a\\qb\"").unwrap(), "ab");
    }

    #[test]
    fn replaces_an_unpaired_high_surrogate() {
        assert_eq!(unquote("\"a\\ud800b\"").unwrap(), "a\u{FFFD}b");
    }

    #[test]
    fn replaces_a_lone_low_surrogate() {
        assert_eq!(unquote("\"a\\udc00b\"").unwrap(), "a\u{FFFD}b");
    }

    #[test]
    fn replaces_a_high_surrogate_followed_by_a_non_surrogate_escape() {
        assert_eq!(unquote("\"\\ud800\\n\"").unwrap(), "\u{FFFD}\n");
    }
}
