//! Link form state and href normalization.

/// Notice shown when the link form is opened without a selection.
pub const SELECT_TEXT_FIRST: &str = "Please select some text first";

/// Trim `href` and prefix `https://` unless it already has an http(s) scheme.
///
/// Returns `None` for an empty href.
pub fn normalize_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(href.to_owned())
    } else {
        Some(format!("https://{href}"))
    }
}

/// Open link form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkForm {
    pub href: String,
}

impl LinkForm {
    /// Open pre-filled with the active link, if any.
    pub fn open(current: Option<&str>) -> Self {
        Self {
            href: current.unwrap_or_default().to_owned(),
        }
    }

    /// The href to apply, or `None` when the field was left empty.
    pub fn submit(&self) -> Option<String> {
        normalize_href(&self.href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_href() {
        assert_eq!(normalize_href("example.com").as_deref(), Some("https://example.com"));
        assert_eq!(
            normalize_href("  http://example.com/a ").as_deref(),
            Some("http://example.com/a")
        );
        assert_eq!(normalize_href("HTTPS://X.test").as_deref(), Some("HTTPS://X.test"));
        assert_eq!(normalize_href("   "), None);
    }

    #[test]
    fn test_form_prefill_and_submit() {
        let form = LinkForm::open(Some("https://a.test"));
        assert_eq!(form.href, "https://a.test");
        assert_eq!(LinkForm::open(None).submit(), None);
    }
}
