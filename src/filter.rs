use crate::config::QualityThresholds;

/// CJK Unified Ideographs (U+4E00..=U+9FFF).
pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Anything that is not a letter, digit or underscore.
fn is_non_word(c: char) -> bool {
    !(c.is_alphanumeric() || c == '_')
}

/// Heuristic accept/reject for a finished page text.
///
/// Rejects empty text, text that is not mostly CJK, text with too few CJK
/// characters, punctuation-heavy text, and text containing a long run of
/// non-CJK characters (tables of numbers, romanizations, leftover markup).
pub fn accept(text: &str, thresholds: &QualityThresholds) -> bool {
    let mut total = 0usize;
    let mut cjk = 0usize;
    let mut punct = 0usize;
    let mut run = 0usize;
    let mut longest_run = 0usize;

    for c in text.chars() {
        total += 1;
        if is_cjk(c) {
            cjk += 1;
            run = 0;
        } else {
            run += 1;
            longest_run = longest_run.max(run);
        }
        if is_non_word(c) {
            punct += 1;
        }
    }

    if total == 0 {
        return false;
    }

    let cjk_ratio = cjk as f64 / total as f64;
    let punct_ratio = punct as f64 / total as f64;

    cjk_ratio >= thresholds.min_cjk_ratio
        && cjk >= thresholds.min_cjk_chars
        && punct_ratio <= thresholds.max_punct_ratio
        && longest_run < thresholds.max_non_cjk_run
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(text: &str) -> bool {
        accept(text, &QualityThresholds::default())
    }

    #[test]
    fn rejects_empty() {
        assert!(!ok(""));
    }

    #[test]
    fn accepts_pure_cjk() {
        let text = "北".repeat(50);
        assert!(ok(&text));
    }

    #[test]
    fn rejects_too_few_cjk_chars() {
        // ratio and punctuation pass, but only 9 ideographs
        assert!(!ok("北京是中国的首都城"));
        assert!(ok("北京是中国的首都城市"));
    }

    #[test]
    fn rejects_low_cjk_ratio() {
        // 13 CJK out of 29, no run reaches 10
        assert!(!ok("北京是中国的首都城市abcdefgh北京abcdefgh京"));
    }

    #[test]
    fn rejects_heavy_punctuation() {
        // 12 CJK, 4 punctuation: 25% punctuation
        assert!(!ok("北京，是中国。的首都，城市。北京"));
    }

    #[test]
    fn rejects_long_non_cjk_run() {
        let text = format!("{}{}{}", "中".repeat(40), "1234567890", "文".repeat(40));
        assert!(!ok(&text));
        let text = format!("{}{}{}", "中".repeat(40), "123456789", "文".repeat(40));
        assert!(ok(&text));
    }

    #[test]
    fn typical_paragraph_passes() {
        assert!(ok("北京市，简称京，是中华人民共和国的首都，也是中国的政治、文化中心。"));
    }
}
