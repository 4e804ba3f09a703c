//! Heading anchor slugs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Generate an anchor slug from heading text.
///
/// Lowercases, drops everything that is not an ASCII letter, digit, underscore,
/// whitespace or hyphen, then collapses runs of whitespace/underscores/hyphens
/// into a single `-` and trims hyphens from both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_separator = true;
        }
        // Anything else is stripped without acting as a separator.
    }

    slug
}

/// What to do when two headings normalize to the same slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateIdPolicy {
    /// Later occurrences get `-1`, `-2`, ... appended, in document order.
    #[default]
    Suffix,
    /// Keep duplicate ids as-is.
    Preserve,
}

/// Hands out heading ids, tracking which ones are already taken.
#[derive(Debug, Clone, Default)]
pub struct SlugRegistry {
    policy: DuplicateIdPolicy,
    taken: HashSet<String>,
}

impl SlugRegistry {
    pub fn new(policy: DuplicateIdPolicy) -> Self {
        Self {
            policy,
            taken: HashSet::new(),
        }
    }

    /// Mark an id as used without allocating it.
    pub fn reserve(&mut self, id: &str) {
        if !id.is_empty() {
            self.taken.insert(id.to_owned());
        }
    }

    pub fn is_taken(&self, id: &str) -> bool {
        self.taken.contains(id)
    }

    /// Whether `id` is an id this registry could have produced for `base`:
    /// the base itself, or under [`DuplicateIdPolicy::Suffix`] `base-N`.
    pub fn is_variant_of(&self, id: &str, base: &str) -> bool {
        if id == base {
            return true;
        }
        if self.policy == DuplicateIdPolicy::Preserve {
            return false;
        }
        id.strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    }

    /// Allocate an id for `text`. Returns `None` when the text has no slug.
    pub fn allocate(&mut self, text: &str) -> Option<String> {
        let base = slugify(text);
        if base.is_empty() {
            return None;
        }

        let id = match self.policy {
            DuplicateIdPolicy::Preserve => base,
            DuplicateIdPolicy::Suffix => {
                if !self.taken.contains(&base) {
                    base
                } else {
                    (1..)
                        .map(|n| format!("{base}-{n}"))
                        .find(|candidate| !self.taken.contains(candidate))
                        .unwrap_or(base)
                }
            }
        };

        self.taken.insert(id.clone());
        Some(id)
    }
}
