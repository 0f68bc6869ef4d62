//! Pre-load sanitizing using lol_html for streaming HTML rewriting
//!
//! Loaded documents are inert: scripts, embedded frames and event handler
//! attributes are removed before the document is parsed into a tree.

use lol_html::{element, rewrite_str, RewriteStrSettings};

use super::dom::DomError;

/// Remove active content while keeping the document's structure and styling
pub fn sanitize_html(html: &str) -> Result<String, DomError> {
    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                // Remove active embedded content entirely
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("noscript", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("iframe", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("object", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("embed", |el| {
                    el.remove();
                    Ok(())
                }),
                // Strip event handlers and javascript: URLs from all elements
                element!("*", |el| {
                    let handlers: Vec<String> = el
                        .attributes()
                        .iter()
                        .map(|attr| attr.name())
                        .filter(|name| name.starts_with("on"))
                        .collect();
                    for name in handlers {
                        el.remove_attribute(&name);
                    }
                    for attr in ["href", "src", "action"] {
                        if let Some(value) = el.get_attribute(attr) {
                            if value.trim().to_lowercase().starts_with("javascript:") {
                                el.remove_attribute(attr);
                            }
                        }
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| DomError::Rewrite(e.to_string()))?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_script_removal() {
        let html = "<p>Hello</p><script>if (a < b) alert('xss')</script><p>World</p>";
        let result = sanitize_html(html).unwrap();

        assert!(!result.contains("script"));
        assert!(result.contains("Hello"));
        assert!(result.contains("World"));
    }

    #[test]
    fn test_sanitize_event_handlers() {
        let html = r#"<p onclick="alert('xss')" onmouseover="x()" class="keep">Hello</p>"#;
        let result = sanitize_html(html).unwrap();

        assert!(!result.contains("onclick"));
        assert!(!result.contains("onmouseover"));
        assert!(result.contains(r#"class="keep""#));
    }

    #[test]
    fn test_sanitize_javascript_urls() {
        let html = r#"<a href="javascript:alert(1)">x</a><a href="https://example.com">y</a>"#;
        let result = sanitize_html(html).unwrap();

        assert!(!result.contains("javascript:"));
        assert!(result.contains("https://example.com"));
    }

    #[test]
    fn test_sanitize_keeps_highlight_markup() {
        let html = r#"<span style="background-color: #ffff00;" data-annotation-id="a1">kept</span>"#;
        let result = sanitize_html(html).unwrap();
        assert_eq!(result, html);
    }
}
