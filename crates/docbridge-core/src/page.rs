//! In-memory page model shared by both pipelines.

use docbridge_store::PageId;

/// One documentation page.
///
/// A page is owned by whichever pass is processing it. `location` is the
/// page's address in the representation the pass reads from or writes to:
/// the input-relative source path on import (`net/classFoo.html`) and the
/// output-relative file path on export (`net/01_classFoo.md`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Store identity, absent until the page is allocated.
    pub id: Option<PageId>,
    /// Slug, unique within the page's category.
    pub uri: String,
    /// Declared position among sibling pages.
    pub order: Option<u32>,
    pub title: String,
    pub abstract_text: String,
    /// HTML body.
    pub body: String,
    /// Category names from beneath the root to the page's parent.
    pub category_path: Vec<String>,
    /// Slash-separated path, see above.
    pub location: String,
}

impl Page {
    /// Human-readable identity used in logs and reports.
    pub fn display_id(&self) -> String {
        if self.location.is_empty() {
            let mut parts = self.category_path.clone();
            parts.push(self.uri.clone());
            parts.join("/")
        } else {
            self.location.clone()
        }
    }
}

/// A hyperlink found in a page body.
///
/// Lives only for the duration of a pass; its effect is the rewritten href
/// in the stored or written body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    /// The href exactly as it appeared in the body.
    pub source_token: String,
    /// Page the token points to, `None` while unresolved or dangling.
    pub resolved_target: Option<PageId>,
}

impl LinkReference {
    pub(crate) fn unresolved(token: &str) -> Self {
        Self {
            source_token: token.to_owned(),
            resolved_target: None,
        }
    }
}

/// Output of normalizing one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPage {
    pub page: Page,
    /// Candidate links, in document order.
    pub links: Vec<LinkReference>,
    /// Paragraph that became `page.abstract_text`, removed from `page.body`.
    pub lead: Option<String>,
}

impl NormalizedPage {
    /// Put the lead paragraph back at the start of the body.
    pub fn restore_lead(&mut self) {
        if let Some(lead) = self.lead.take() {
            self.page.body.insert_str(0, &lead);
        }
    }

    /// Replace the extracted abstract.
    ///
    /// The lead paragraph returns to the body unless `abstract_text` matches
    /// it, so no text is lost to the override.
    pub fn override_abstract(&mut self, abstract_text: &str) {
        if abstract_text != self.page.abstract_text {
            self.restore_lead();
            abstract_text.clone_into(&mut self.page.abstract_text);
        }
    }
}
