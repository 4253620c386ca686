/// Join URL path segments onto a base, normalising slashes.
pub fn build_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for seg in segments {
        url.push('/');
        url.push_str(seg.trim_start_matches('/'));
    }
    url
}

/// Format a user mention the Revolt client renders as a pill.
pub fn mention(user_id: &str) -> String {
    format!("<@{user_id}>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_collapses_slashes() {
        assert_eq!(
            build_url("https://api.revolt.chat/", &["/channels", "abc", "messages"]),
            "https://api.revolt.chat/channels/abc/messages"
        );
    }

    #[test]
    fn mention_wraps_id() {
        assert_eq!(mention("01ABC"), "<@01ABC>");
    }
}
