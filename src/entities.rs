//! Character reference decoding: `&name;`, `&#NNN;`, `&#xHH;`.
//!
//! References that cannot be resolved (unknown name, malformed number) are
//! left as written.

use html_escape::decode_html_entities;

/// Decode one level of character references.
pub fn unescape(text: &str) -> String {
    decode_html_entities(text).into_owned()
}

/// Decode twice, so a single level of double encoding (`&amp;nbsp;`)
/// also resolves.
pub fn unescape_twice(text: &str) -> String {
    unescape(&unescape(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_references() {
        assert_eq!(unescape("&lt;ref&gt; &amp; &quot;x&quot;"), "<ref> & \"x\"");
        assert_eq!(unescape("&copy;&euro;&hellip;"), "©€…");
    }

    #[test]
    fn numeric_references() {
        assert_eq!(unescape("&#20013;&#x6587;"), "中文");
        assert_eq!(unescape("&#65;&#x42;"), "AB");
    }

    #[test]
    fn unknown_name_left_as_is() {
        assert_eq!(unescape("&bogus; 甲&乙"), "&bogus; 甲&乙");
    }

    #[test]
    fn malformed_numbers_left_as_is() {
        assert_eq!(unescape("&#xZZ;"), "&#xZZ;");
    }

    #[test]
    fn double_encoding_needs_two_passes() {
        assert_eq!(unescape("&amp;nbsp;"), "&nbsp;");
        assert_eq!(unescape_twice("&amp;nbsp;"), "\u{a0}");
        assert_eq!(unescape_twice("&amp;lt;b&amp;gt;"), "<b>");
    }

    #[test]
    fn text_without_ampersand_is_unchanged() {
        assert_eq!(unescape("没有实体"), "没有实体");
    }
}
