use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Question text, option text and group titles may carry light formatting
/// (like <b>, <code>), but never scripts or event handlers: `<script>` and its
/// content are removed, dangerous attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_script_keeps_formatting() {
        assert_eq!(
            clean_html("<b>Which</b> is correct?<script>alert(1)</script>"),
            "<b>Which</b> is correct?"
        );
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(clean_html("What is 2 + 2?"), "What is 2 + 2?");
    }
}
