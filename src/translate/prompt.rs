// Prompt templates — two fixed shapes, with and without a quoted post.
//
// The output-format markers here are the same literals parser.rs slices on.

/// System role for the completion call.
pub const SYSTEM_PROMPT: &str =
    "你是一个专业的社交媒体翻译与评论员，把英文推文翻译成地道的中文。";

/// Build the user prompt for one post.
pub fn build_prompt(text: &str, quoted_text: Option<&str>) -> String {
    match quoted_text {
        Some(quoted) => format!(
            "请将下面这条推文及其引用的推文翻译成中文，并附上一句简短的锐评。\n\
             \n\
             要求：\n\
             1. 忠实原意，技术术语、@提及 和 #话题标签 保留原文不译。\n\
             2. 锐评一句话即可，观点鲜明。\n\
             \n\
             严格按以下格式输出：\n\
             [翻译]\n\
             <推文的中文翻译>\n\
             [引用翻译]\n\
             <引用推文的中文翻译>\n\
             [锐评]\n\
             <一句锐评>\n\
             \n\
             推文原文：\n\
             {text}\n\
             \n\
             引用推文原文：\n\
             {quoted}"
        ),
        None => format!(
            "请将下面这条推文翻译成中文，并附上一句简短的锐评。\n\
             \n\
             要求：\n\
             1. 忠实原意，技术术语、@提及 和 #话题标签 保留原文不译。\n\
             2. 锐评一句话即可，观点鲜明。\n\
             \n\
             严格按以下格式输出：\n\
             [翻译]\n\
             <推文的中文翻译>\n\
             [锐评]\n\
             <一句锐评>\n\
             \n\
             推文原文：\n\
             {text}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::parser::{COMMENT_MARKER, QUOTED_MARKER, TRANSLATION_MARKER};

    #[test]
    fn prompt_without_quote_omits_quoted_section() {
        let prompt = build_prompt("hello @world #rust", None);
        assert!(prompt.contains("hello @world #rust"));
        assert!(prompt.contains(TRANSLATION_MARKER));
        assert!(prompt.contains(COMMENT_MARKER));
        assert!(!prompt.contains(QUOTED_MARKER));
    }

    #[test]
    fn prompt_with_quote_includes_both_texts() {
        let prompt = build_prompt("my take", Some("the original"));
        assert!(prompt.contains("my take"));
        assert!(prompt.contains("the original"));
        assert!(prompt.contains(QUOTED_MARKER));
    }
}
