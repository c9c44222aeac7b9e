//! Regular expression helpers for pattern operators.

/// Characters with special meaning in a MongoDB (PCRE) regular expression.
const REGEX_META: &[char] = &[
    '\\', '.', '*', '+', '?', '^', '$', '(', ')', '[', ']', '{', '}', '|',
];

/// Escape every regex metacharacter in `input`.
pub fn escape_regex(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    for c in input.chars() {
        if REGEX_META.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Convert a SQL `LIKE` pattern into an anchored regular expression.
///
/// The pattern is escaped first, then `%` becomes `.*` and `_` becomes `.`.
pub fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            c if REGEX_META.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex_lite::Regex;

    fn like(pattern: &str, candidate: &str) -> bool {
        Regex::new(&like_to_regex(pattern))
            .unwrap()
            .is_match(candidate)
    }

    #[test]
    fn test_escape_regex_covers_metacharacters() {
        assert_eq!(
            escape_regex(r"a\b.c*d+e?f^g$h(i)j[k]l{m}n|o"),
            r"a\\b\.c\*d\+e\?f\^g\$h\(i\)j\[k\]l\{m\}n\|o"
        );
        assert_eq!(escape_regex("plain text"), "plain text");
    }

    #[test]
    fn test_escaped_input_matches_literally() {
        let needle = "1+1=(2)?";
        let re = Regex::new(&escape_regex(needle)).unwrap();
        assert!(re.is_match("is 1+1=(2)? yes"));
        assert!(!re.is_match("11=2"));
    }

    #[test]
    fn test_like_percent_matches_any_run() {
        assert_eq!(like_to_regex("%test%"), "^.*test.*$");
        assert!(like("%test%", "a test here"));
        assert!(like("%test%", "test"));
        assert!(!like("%test%", "tset"));
    }

    #[test]
    fn test_like_underscore_matches_one_char() {
        assert_eq!(like_to_regex("te_t"), "^te.t$");
        assert!(like("te_t", "text"));
        assert!(like("te_t", "test"));
        assert!(!like("te_t", "tet"));
        assert!(!like("te_t", "teest"));
    }

    #[test]
    fn test_like_escapes_before_substituting() {
        assert_eq!(like_to_regex("v1.0%"), r"^v1\.0.*$");
        assert!(like("v1.0%", "v1.0-beta"));
        assert!(!like("v1.0%", "v100"));
        assert!(like("(a|b)_", "(a|b)!"));
        assert!(!like("(a|b)_", "a!"));
    }
}
