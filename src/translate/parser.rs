// Response parsing — slicing the model's output between literal section
// markers.
//
// Models occasionally ignore format instructions, so parsing never fails:
// a response with no markers at all is treated as one big translation with
// an empty comment.

use super::traits::Translation;

pub const TRANSLATION_MARKER: &str = "[翻译]";
pub const QUOTED_MARKER: &str = "[引用翻译]";
pub const COMMENT_MARKER: &str = "[锐评]";

/// Parse a raw completion into translation, optional quoted translation,
/// and comment.
pub fn parse_response(raw: &str) -> Translation {
    let Some(t_pos) = raw.find(TRANSLATION_MARKER) else {
        // No markers: the whole response is the translation.
        return Translation {
            translated_text: raw.trim().to_string(),
            comment_text: String::new(),
            quoted_translated_text: None,
        };
    };

    let tail = &raw[t_pos + TRANSLATION_MARKER.len()..];
    let quoted = tail
        .find(QUOTED_MARKER)
        .map(|i| (i, i + QUOTED_MARKER.len()));
    let comment = tail
        .find(COMMENT_MARKER)
        .map(|i| (i, i + COMMENT_MARKER.len()));

    let translation_end = [quoted.map(|m| m.0), comment.map(|m| m.0)]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(tail.len());
    let translated_text = tail[..translation_end].trim().to_string();

    let quoted_translated_text = quoted
        .map(|(start, content)| {
            let end = match comment {
                Some((c_start, _)) if c_start > start => c_start,
                _ => tail.len(),
            };
            tail[content..end].trim().to_string()
        })
        .filter(|s| !s.is_empty());

    let comment_text = comment
        .map(|(start, content)| {
            let end = match quoted {
                Some((q_start, _)) if q_start > start => q_start,
                _ => tail.len(),
            };
            tail[content..end].trim().to_string()
        })
        .unwrap_or_default();

    Translation {
        translated_text,
        comment_text,
        quoted_translated_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_translation_and_comment() {
        let parsed = parse_response("[翻译]\nHola\n[锐评]\nNice");
        assert_eq!(parsed.translated_text, "Hola");
        assert_eq!(parsed.comment_text, "Nice");
        assert_eq!(parsed.quoted_translated_text, None);
    }

    #[test]
    fn parses_all_three_sections() {
        let parsed =
            parse_response("[翻译]\n主推文翻译\n[引用翻译]\n引用翻译内容\n[锐评]\n一句锐评");
        assert_eq!(parsed.translated_text, "主推文翻译");
        assert_eq!(parsed.quoted_translated_text.as_deref(), Some("引用翻译内容"));
        assert_eq!(parsed.comment_text, "一句锐评");
    }

    #[test]
    fn no_markers_degrades_to_whole_response() {
        let parsed = parse_response("  The model just chatted instead.  ");
        assert_eq!(parsed.translated_text, "The model just chatted instead.");
        assert_eq!(parsed.comment_text, "");
        assert_eq!(parsed.quoted_translated_text, None);
    }

    #[test]
    fn missing_comment_marker_leaves_comment_empty() {
        let parsed = parse_response("[翻译]\n只有翻译");
        assert_eq!(parsed.translated_text, "只有翻译");
        assert_eq!(parsed.comment_text, "");
    }

    #[test]
    fn preamble_before_first_marker_is_dropped() {
        let parsed = parse_response("好的，以下是翻译：\n[翻译]\n正文\n[锐评]\n评论");
        assert_eq!(parsed.translated_text, "正文");
        assert_eq!(parsed.comment_text, "评论");
    }

    #[test]
    fn empty_quoted_section_becomes_none() {
        let parsed = parse_response("[翻译]\n正文\n[引用翻译]\n[锐评]\n评论");
        assert_eq!(parsed.translated_text, "正文");
        assert_eq!(parsed.quoted_translated_text, None);
        assert_eq!(parsed.comment_text, "评论");
    }
}
