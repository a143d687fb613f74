//! Final reply assembly.

/// Header line of the appended resources block.
pub const RESOURCES_HEADER: &str = "📚 **Here are some potentially helpful resources:**";

/// Append a bulleted resources section to `reply` when there is anything to
/// list. With no resources the reply is returned as is.
pub fn compose_reply(reply: &str, resources: &[&str]) -> String {
    if resources.is_empty() {
        return reply.to_string();
    }

    let mut text = String::with_capacity(
        reply.len() + RESOURCES_HEADER.len() + resources.iter().map(|r| r.len() + 3).sum::<usize>() + 4,
    );
    text.push_str(reply);
    text.push_str("\n\n");
    text.push_str(RESOURCES_HEADER);
    text.push('\n');
    for resource in resources {
        text.push_str("- ");
        text.push_str(resource);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_resources_leaves_reply_untouched() {
        assert_eq!(compose_reply("Just the answer.", &[]), "Just the answer.");
    }

    #[test]
    fn resources_are_bulleted_in_order() {
        let text = compose_reply("Answer.", &["First (https://a.example)", "Second (https://b.example)"]);
        assert_eq!(
            text,
            "Answer.\n\n📚 **Here are some potentially helpful resources:**\n\
             - First (https://a.example)\n\
             - Second (https://b.example)\n"
        );
    }

    #[test]
    fn fallback_replies_still_get_resources() {
        let text = compose_reply("Sorry, there was a technical problem contacting the AI assistant.", &["Link"]);
        assert!(text.starts_with("Sorry,"));
        assert!(text.ends_with("- Link\n"));
    }
}
