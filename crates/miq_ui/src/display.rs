//! Display-width helpers. Wide characters (CJK, full-width forms) take two
//! terminal cells, everything printable else one.

use unicode_width::UnicodeWidthChar;

/// Values wider than this are shown truncated.
pub const MAX_CELL_WIDTH: usize = 50;
/// Width kept before the ellipsis when truncating.
pub const TRUNCATED_WIDTH: usize = 47;
const ELLIPSIS: &str = "...";

#[must_use]
pub fn display_width(s: &str) -> usize {
    s.chars().map(|c| c.width().unwrap_or(0)).sum()
}

#[must_use]
pub fn is_truncated(s: &str) -> bool {
    display_width(s) > MAX_CELL_WIDTH
}

/// Cut `s` to at most [`TRUNCATED_WIDTH`] cells plus `...` when it is wider
/// than [`MAX_CELL_WIDTH`]; otherwise return it unchanged.
#[must_use]
pub fn truncate_display(s: &str) -> String {
    if !is_truncated(s) {
        return s.to_string();
    }
    let mut width = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > TRUNCATED_WIDTH {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    out
}

/// Right-pad `s` with spaces to `width` display cells.
#[must_use]
pub fn pad_display(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(s));
    format!("{s}{}", " ".repeat(pad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cjk_counts_double() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("订单"), 4);
        assert_eq!(display_width("ｆｕｌｌ"), 8);
    }

    #[test]
    fn sixty_ascii_chars_are_truncated() {
        let s = "a".repeat(60);
        let t = truncate_display(&s);
        assert_eq!(t, format!("{}...", "a".repeat(47)));
    }

    #[test]
    fn thirty_cjk_chars_are_truncated() {
        let s = "中".repeat(30);
        assert_eq!(display_width(&s), 60);
        let t = truncate_display(&s);
        assert!(t.ends_with("..."));
        assert_eq!(t.trim_end_matches("...").chars().count(), 23);
        assert!(display_width(&t) <= MAX_CELL_WIDTH);
    }

    #[test]
    fn exactly_fifty_is_kept() {
        let s = "b".repeat(50);
        assert_eq!(truncate_display(&s), s);
        assert!(!is_truncated(&s));
    }

    #[test]
    fn pads_by_display_width() {
        assert_eq!(pad_display("中", 4), "中  ");
        assert_eq!(pad_display("long", 2), "long");
    }
}
