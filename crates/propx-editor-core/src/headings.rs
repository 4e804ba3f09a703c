//! Heading outline extraction and id assignment.

use std::borrow::Cow;

use markup5ever_rcdom::{Handle, NodeData};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::html::{find_element, from_html, get_attr, parse_dom, text_content, to_html};
use crate::model::Document;
use crate::slug::{DuplicateIdPolicy, SlugRegistry, slugify};

/// One entry of the heading outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingDescriptor {
    /// Anchor id. Empty when the heading has no usable text.
    pub id: SmolStr,
    /// Trimmed text content.
    pub text: String,
    pub level: u8,
    /// Lowercase tag name, `h1`..`h6`.
    pub tag: SmolStr,
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Extract the heading outline from serialized HTML, in document order.
///
/// Headings without an `id` attribute fall back to the slug of their text, so
/// the list always has one entry per heading element.
pub fn extract_headings(html: &str) -> Vec<HeadingDescriptor> {
    let dom = parse_dom(html);
    let mut out = Vec::new();
    if let Some(body) = find_element(&dom.document, "body") {
        walk_headings(&body, &mut out);
    }
    out
}

fn walk_headings(node: &Handle, out: &mut Vec<HeadingDescriptor>) {
    for child in node.children.borrow().iter() {
        if let NodeData::Element {
            ref name,
            ref attrs,
            ..
        } = child.data
        {
            let tag = name.local.as_ref();
            if let Some(level) = heading_level(tag) {
                let mut raw = String::new();
                text_content(child, &mut raw);
                let text = raw.trim().to_owned();
                let id = get_attr(attrs, "id")
                    .filter(|id| !id.is_empty())
                    .unwrap_or_else(|| slugify(&text));
                out.push(HeadingDescriptor {
                    id: SmolStr::from(id),
                    text,
                    level,
                    tag: SmolStr::from(tag),
                });
                continue;
            }
            walk_headings(child, out);
        }
    }
}

/// Give every heading with non-empty text and no id an id derived from its text.
///
/// Existing ids are kept and reserved first, so generated ids never collide
/// with them under [`DuplicateIdPolicy::Suffix`]. Returns the input untouched
/// when nothing needed an id.
pub fn ensure_heading_ids(html: &str, policy: DuplicateIdPolicy) -> Cow<'_, str> {
    let mut doc = from_html(html);
    if assign_missing_ids(&mut doc, policy) {
        Cow::Owned(to_html(&doc))
    } else {
        Cow::Borrowed(html)
    }
}

/// Assign ids to headings lacking one. Returns whether any heading changed.
pub fn assign_missing_ids(doc: &mut Document, policy: DuplicateIdPolicy) -> bool {
    let mut registry = SlugRegistry::new(policy);
    for (_, heading) in doc.headings() {
        if let Some(id) = heading.id.as_deref() {
            registry.reserve(id);
        }
    }

    let mut changed = false;
    for heading in doc.headings_mut() {
        if heading.id.is_some() {
            continue;
        }
        let text = heading.content.text_content();
        if text.trim().is_empty() {
            continue;
        }
        if let Some(id) = registry.allocate(&text) {
            heading.id = Some(SmolStr::from(id));
            changed = true;
        }
    }
    changed
}

/// The id every heading should carry for its current text, in outline order.
///
/// `None` means the heading has no sluggable text and keeps whatever it has.
/// A heading whose id already fits its text (the slug, or a `slug-N`
/// duplicate suffix) keeps it, and those ids are claimed before any other
/// heading is allocated one.
pub fn expected_ids(headings: &[HeadingDescriptor], policy: DuplicateIdPolicy) -> Vec<Option<SmolStr>> {
    let mut registry = SlugRegistry::new(policy);
    let mut keep = vec![false; headings.len()];
    for (heading, keep) in headings.iter().zip(keep.iter_mut()) {
        let slug = slugify(&heading.text);
        if slug.is_empty() {
            registry.reserve(&heading.id);
            continue;
        }
        let unclaimed = policy == DuplicateIdPolicy::Preserve || !registry.is_taken(&heading.id);
        if unclaimed && registry.is_variant_of(&heading.id, &slug) {
            registry.reserve(&heading.id);
            *keep = true;
        }
    }

    headings
        .iter()
        .zip(keep)
        .map(|(heading, keep)| {
            if keep {
                Some(heading.id.clone())
            } else {
                registry.allocate(&heading.text).map(SmolStr::from)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getting_started_example() {
        let html = ensure_heading_ids("<h2>Getting Started</h2><p>intro</p>", DuplicateIdPolicy::Suffix);
        assert_eq!(
            html,
            r#"<h2 id="getting-started">Getting Started</h2><p>intro</p>"#
        );
        assert_eq!(
            extract_headings(&html),
            vec![HeadingDescriptor {
                id: "getting-started".into(),
                text: "Getting Started".into(),
                level: 2,
                tag: "h2".into(),
            }]
        );
    }

    #[test]
    fn test_existing_ids_kept() {
        let input = r#"<h1 id="custom">Title</h1>"#;
        let html = ensure_heading_ids(input, DuplicateIdPolicy::Suffix);
        assert!(matches!(html, Cow::Borrowed(_)));
        assert_eq!(extract_headings(&html)[0].id, "custom");
    }

    #[test]
    fn test_empty_heading_listed_without_id() {
        let html = ensure_heading_ids("<h1></h1><h2>!!!</h2><h3>Real</h3>", DuplicateIdPolicy::Suffix);
        assert_eq!(html, r#"<h1></h1><h2>!!!</h2><h3 id="real">Real</h3>"#);
        let headings = extract_headings(&html);
        assert_eq!(headings.len(), 3);
        assert_eq!(headings[0].id, "");
        assert_eq!(headings[1].id, "");
        assert_eq!(headings[1].text, "!!!");
        assert_eq!(headings[2].id, "real");
    }

    #[test]
    fn test_duplicates_get_suffixes() {
        let html = ensure_heading_ids(
            r#"<h2>Setup</h2><h2 id="setup-1">Other</h2><h2>Setup</h2>"#,
            DuplicateIdPolicy::Suffix,
        );
        let ids: Vec<_> = extract_headings(&html).into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec!["setup", "setup-1", "setup-2"]);
    }

    #[test]
    fn test_duplicates_preserved_when_configured() {
        let html = ensure_heading_ids("<h2>Setup</h2><h2>Setup</h2>", DuplicateIdPolicy::Preserve);
        let ids: Vec<_> = extract_headings(&html).into_iter().map(|h| h.id).collect();
        assert_eq!(ids, vec!["setup", "setup"]);
    }

    #[test]
    fn test_nested_headings_found_in_order() {
        let html = "<blockquote><h4>Quoted</h4></blockquote><ul><li><h5>Listed</h5></li></ul><h6>Last <em>one</em></h6>";
        let headings = extract_headings(html);
        let summary: Vec<_> = headings
            .iter()
            .map(|h| (h.level, h.tag.as_str(), h.text.as_str(), h.id.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (4, "h4", "Quoted", "quoted"),
                (5, "h5", "Listed", "listed"),
                (6, "h6", "Last one", "last-one"),
            ]
        );
    }

    #[test]
    fn test_heading_count_matches_html() {
        let html = ensure_heading_ids(
            "<h1>A</h1><p>x</p><h2></h2><table><tr><td><h3>In cell</h3></td></tr></table>",
            DuplicateIdPolicy::Suffix,
        );
        let tags = html.matches("<h").count();
        assert_eq!(extract_headings(&html).len(), tags);
    }

    #[test]
    fn test_expected_ids_follow_text() {
        let headings = extract_headings(r#"<h2 id="getting-started">Getting Started Now</h2><h2></h2><h2>Now</h2>"#);
        let expected = expected_ids(&headings, DuplicateIdPolicy::Suffix);
        assert_eq!(
            expected,
            vec![Some("getting-started-now".into()), None, Some("now".into())]
        );
    }

    #[test]
    fn test_expected_ids_keep_fitting_ids() {
        let live = |ids: [&str; 3]| -> Vec<HeadingDescriptor> {
            ids.iter()
                .map(|id| HeadingDescriptor {
                    id: (*id).into(),
                    text: "Setup".into(),
                    level: 2,
                    tag: "h2".into(),
                })
                .collect()
        };

        // A new duplicate above an existing heading does not take its anchor.
        let expected = expected_ids(&live(["", "setup", "setup-1"]), DuplicateIdPolicy::Suffix);
        assert_eq!(
            expected,
            vec![Some("setup-2".into()), Some("setup".into()), Some("setup-1".into())]
        );

        // Two headings claiming the same id: the first keeps it.
        let expected = expected_ids(&live(["setup", "setup", "other"]), DuplicateIdPolicy::Suffix);
        assert_eq!(
            expected,
            vec![Some("setup".into()), Some("setup-1".into()), Some("setup-2".into())]
        );
    }

    #[test]
    fn test_sync_and_delayed_passes_agree() {
        let html = r#"<h2>Setup</h2><h2 id="setup">Setup</h2>"#;
        let emitted = ensure_heading_ids(html, DuplicateIdPolicy::Suffix);
        let emitted_ids: Vec<_> = extract_headings(&emitted).into_iter().map(|h| Some(h.id)).collect();
        assert_eq!(emitted_ids, vec![Some("setup-1".into()), Some("setup".into())]);

        let mut live = extract_headings(html);
        live[0].id = SmolStr::default();
        assert_eq!(expected_ids(&live, DuplicateIdPolicy::Suffix), emitted_ids);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let once = ensure_heading_ids("<h2>One</h2><h3>Two</h3>", DuplicateIdPolicy::Suffix).into_owned();
        let twice = ensure_heading_ids(&once, DuplicateIdPolicy::Suffix);
        assert_eq!(once, twice);
        assert_eq!(extract_headings(&once), extract_headings(&twice));
    }
}
