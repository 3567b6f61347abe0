//! crates/tcm_assistant_core/src/parse.rs
//!
//! Classifies model replies, splits structured assessments into their two
//! sections, and normalizes presentation markup. Normalization is an ordered
//! pipeline of small rewrite rules; running it twice yields the same text.

use regex::{Captures, Regex};

/// Exact section markers of a structured assessment reply.
pub const ANALYSIS_MARKER: &str = "一、辨证分析";
pub const ADVICE_MARKER: &str = "二、养生建议";

/// What kind of reply the model produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// A clarifying-question turn; displayed as a single block.
    FollowUp,
    /// A full assessment carrying both labeled sections.
    Structured,
}

/// A reply is structured if and only if it contains both section markers.
pub fn classify(text: &str) -> ResponseKind {
    if text.contains(ANALYSIS_MARKER) && text.contains(ADVICE_MARKER) {
        ResponseKind::Structured
    } else {
        ResponseKind::FollowUp
    }
}

/// Splits a structured reply into (analysis, advice).
///
/// Splits at the advice marker's first occurrence and strips the first
/// analysis marker from the head. Markers out of order count as inconsistent
/// and yield `None`; callers fall back to single-block display.
pub fn split(text: &str) -> Option<(String, String)> {
    let analysis_at = text.find(ANALYSIS_MARKER)?;
    let advice_at = text.find(ADVICE_MARKER)?;
    if analysis_at >= advice_at {
        return None;
    }

    let head = text[..advice_at].replacen(ANALYSIS_MARKER, "", 1);
    let tail = &text[advice_at + ADVICE_MARKER.len()..];
    Some((head.trim().to_string(), tail.trim().to_string()))
}

/// Output style of the normalization pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmphasisStyle {
    /// Markdown bold becomes `<b>` tags.
    Tagged,
    /// Bold delimiters and emphasis tags are stripped.
    Plain,
}

/// Normalizes a reply into the canonical display form with `<b>` emphasis
/// and `<br>` block separators.
pub fn normalize(text: &str) -> String {
    normalize_with(text, EmphasisStyle::Tagged)
}

/// Normalizes a reply into undecorated text: same block separators, no
/// emphasis markup.
pub fn normalize_plain(text: &str) -> String {
    normalize_with(text, EmphasisStyle::Plain)
}

fn normalize_with(text: &str, style: EmphasisStyle) -> String {
    let mut out = strip_box_tokens(text);
    out = repair_tags(&out);
    out = canonicalize_bullets(&out);
    out = separate_numbered_markers(&out);
    out = separate_paren_ordinals(&out);
    out = separate_ordinal_headings(&out);
    out = convert_bold(&out, style);
    out = strip_stray_angle_brackets(&out);
    collapse_newlines(&out)
}

/// Drops the model's internal box tokens.
fn strip_box_tokens(text: &str) -> String {
    text.replace("<|begin_of_box|>", "")
        .replace("<|end_of_box|>", "")
}

/// Repairs malformed break/bold tags (`<br/>`, `<br />`, `<b >`, `</b >`).
fn repair_tags(text: &str) -> String {
    let br = Regex::new(r"<br\s*/?\s*>").unwrap();
    let b_open = Regex::new(r"<b\s+>").unwrap();
    let b_close = Regex::new(r"</b\s+>").unwrap();
    let out = br.replace_all(text, "<br>");
    let out = b_open.replace_all(&out, "<b>");
    b_close.replace_all(&out, "</b>").into_owned()
}

/// Converts bullet-point lines into the canonical `<br>• ` item form.
fn canonicalize_bullets(text: &str) -> String {
    let bullet = Regex::new(r"(?m)^\s*[-*•·]\s+").unwrap();
    bullet.replace_all(text, "<br>• ").into_owned()
}

/// Inserts a block separator before a marker unless one is already there.
fn separate_marker(text: &str, pattern: &str) -> String {
    let re = Regex::new(pattern).unwrap();
    re.replace_all(text, |caps: &Captures| {
        if caps.get(1).is_some() {
            caps[0].to_string()
        } else {
            format!("<br>{}", &caps[2])
        }
    })
    .into_owned()
}

/// `1.`-style numbered-list markers.
fn separate_numbered_markers(text: &str) -> String {
    separate_marker(text, r"(<br>)?(\d+\.)")
}

/// `（一）`-style parenthesized CJK ordinals.
fn separate_paren_ordinals(text: &str) -> String {
    separate_marker(text, r"(<br>)?(（[一二三四五六七八九十]+）)")
}

/// `一、`-style CJK ordinal headings.
fn separate_ordinal_headings(text: &str) -> String {
    separate_marker(text, r"(<br>)?([一二三四五六七八九十]+、)")
}

/// Converts `**bold**` pairs and drops unpaired `**` leftovers.
fn convert_bold(text: &str, style: EmphasisStyle) -> String {
    let bold = Regex::new(r"\*\*([^*]+?)\*\*").unwrap();
    let out = match style {
        EmphasisStyle::Tagged => bold.replace_all(text, "<b>$1</b>").into_owned(),
        EmphasisStyle::Plain => {
            let stripped = bold.replace_all(text, "$1").into_owned();
            stripped.replace("<b>", "").replace("</b>", "")
        }
    };
    out.replace("**", "")
}

/// Removes `<` characters that do not open a recognized markup tag.
fn strip_stray_angle_brackets(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("<b>") || tail.starts_with("</b>") || tail.starts_with("<br>") {
            out.push('<');
        }
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

/// Literal newlines are redundant once separators are in place.
fn collapse_newlines(text: &str) -> String {
    text.replace('\r', "").replace('\n', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_requires_both_markers() {
        let structured = "一、辨证分析\n肝郁气滞。\n二、养生建议\n1. 早睡。";
        assert_eq!(classify(structured), ResponseKind::Structured);
        assert_eq!(classify("一、辨证分析 仅此"), ResponseKind::FollowUp);
        assert_eq!(classify("二、养生建议 仅此"), ResponseKind::FollowUp);
        assert_eq!(classify("请问症状持续多久了？"), ResponseKind::FollowUp);
        assert_eq!(classify(""), ResponseKind::FollowUp);
    }

    #[test]
    fn split_strips_markers_and_trims() {
        let (analysis, advice) =
            split("一、辨证分析\n肝郁气滞，气机不畅。\n二、养生建议\n1. 疏肝解郁。\n").unwrap();
        assert_eq!(analysis, "肝郁气滞，气机不畅。");
        assert_eq!(advice, "1. 疏肝解郁。");
    }

    #[test]
    fn split_rejects_out_of_order_markers() {
        assert!(split("二、养生建议 …… 一、辨证分析 ……").is_none());
        assert!(split("没有任何标记").is_none());
    }

    #[test]
    fn bold_pairs_become_tags() {
        assert_eq!(normalize("**肝郁**为主"), "<b>肝郁</b>为主");
    }

    #[test]
    fn unpaired_bold_markers_are_dropped() {
        assert_eq!(normalize("残缺**标记"), "残缺标记");
        assert_eq!(normalize("**一对** 加 ** 残缺"), "<b>一对</b> 加  残缺");
    }

    #[test]
    fn numbered_markers_get_block_separators() {
        assert_eq!(normalize("建议：1. 早睡 2. 运动"), "建议：<br>1. 早睡 <br>2. 运动");
    }

    #[test]
    fn cjk_ordinals_get_block_separators() {
        assert_eq!(normalize("（一）茶饮（二）药膳"), "<br>（一）茶饮<br>（二）药膳");
        assert_eq!(normalize("一、辨证分析内容"), "<br>一、辨证分析内容");
    }

    #[test]
    fn bullet_lines_become_canonical_items() {
        assert_eq!(normalize("要点：\n- 早睡\n* 运动"), "要点：<br>• 早睡<br>• 运动");
    }

    #[test]
    fn stray_angle_brackets_are_removed() {
        assert_eq!(normalize("风寒<表证，注意<b>保暖</b>"), "风寒表证，注意<b>保暖</b>");
        assert_eq!(normalize("<|begin_of_box|>内容<|end_of_box|>"), "内容");
    }

    #[test]
    fn malformed_tags_are_repaired() {
        assert_eq!(normalize("甲<br/>乙<br />丙"), "甲<br>乙<br>丙");
    }

    #[test]
    fn plain_variant_strips_emphasis() {
        assert_eq!(normalize_plain("**肝郁**为主"), "肝郁为主");
        assert_eq!(normalize_plain("注意<b>保暖</b>"), "注意保暖");
    }

    #[test]
    fn newlines_collapse_into_separators() {
        assert_eq!(normalize("第一行\n1. 第二行"), "第一行<br>1. 第二行");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "",
            "请问症状持续多久了？",
            "**肝郁**为主，建议：1. 早睡 2. 运动",
            "（一）茶饮：**菊花茶**\n（二）药膳",
            "一、辨证分析\n内容\n二、养生建议\n- 早睡\n- 运动",
            "残缺**标记 与 <奇异括号",
            "<|begin_of_box|>一、膏方建议<|end_of_box|>\n1. 膏方",
            "甲<br/>乙 ** 丙 * 丁",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
            let plain_once = normalize_plain(input);
            assert_eq!(
                normalize_plain(&plain_once),
                plain_once,
                "plain variant not idempotent for {input:?}"
            );
        }
    }
}
