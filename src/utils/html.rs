use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) survive, while <script>, <iframe>
/// and event-handler attributes are stripped together with their content.
///
/// Only applied to question text and explanations. Option strings are compared
/// verbatim by the marking engine and must not be rewritten.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_plain_text() {
        assert_eq!(clean_html("Which option is best?"), "Which option is best?");
    }

    #[test]
    fn drops_event_handlers() {
        assert_eq!(clean_html(r#"<p onclick="x()">Hi</p>"#), "<p>Hi</p>");
    }
}
