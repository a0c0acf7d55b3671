/// Appended to every published post
pub const POST_SIGNATURE: &str = "Generated automatically";

pub const CHANNEL_USER_PROMPT: &str = "Write one engaging post for the channel.";

/// System prompt for channel posts: the owner's instructions plus a fixed
/// style and length directive
pub fn channel_system_prompt(owner_prompt: &str) -> String {
    format!(
        "You are a professional content writer for Telegram channels.\n\
         Write a post that is:\n\
         - engaging and useful\n\
         - about 200-300 words\n\
         - ready to publish as is, with a clear structure\n\
         - focused on practical takeaways\n\n\
         Channel instructions: {}",
        owner_prompt.trim()
    )
}

/// Escapes text for Bot API HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn format_post(content: &str) -> String {
    format!("{}\n\n<i>{}</i>", escape_html(content.trim()), POST_SIGNATURE)
}
