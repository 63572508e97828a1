//! HTML whitespace collapsing.

use crate::error::TransformError;

/// Collapse insignificant whitespace, keeping comments and closing tags.
pub fn collapse_whitespace(html: &str) -> Result<String, TransformError> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = true;

    let minified = minify_html::minify(html.as_bytes(), &cfg);
    String::from_utf8(minified).map_err(|e| TransformError::Html(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<!DOCTYPE html>\n<html>\n  <head>\n    <title>Home</title>\n  </head>\n  <body>\n    <!-- hero -->\n    <p>\n      Hello   world\n    </p>\n  </body>\n</html>\n";

    #[test]
    fn removes_indentation_between_tags() {
        let out = collapse_whitespace(PAGE).unwrap();

        assert!(!out.contains("\n    <"));
        assert!(!out.contains("Hello   world"));
        assert!(out.len() < PAGE.len());
    }

    #[test]
    fn keeps_comments_and_closing_tags() {
        let out = collapse_whitespace(PAGE).unwrap();

        assert!(out.contains("<!-- hero -->"));
        assert!(out.contains("</p>"));
        assert!(out.contains("</body>"));
    }
}
