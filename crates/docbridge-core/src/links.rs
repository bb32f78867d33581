//! Link resolution across address spaces.
//!
//! Pages are addressed three ways over their life: by generated file name in
//! the Doxygen output, by store id inside the CMS and by relative file path
//! in the Markdown tree. A [`LinkIndex`] maps source-space tokens to the pages
//! they name and [`rewrite`] swaps every internal href for the destination
//! address selected by [`TargetAddressing`].
//!
//! # Two passes
//!
//! The index must be built from the complete page set, every page already
//! holding its destination identity, before any body is rewritten. Forward
//! references would otherwise resolve as dangling.
//!
//! # Dangling links
//!
//! A link whose token is internal but unknown is unwrapped: the `<a>` element
//! disappears and its text stays. Each occurrence is reported as an
//! [`UnresolvedLink`].

use std::collections::HashMap;

use docbridge_store::PageId;
use scraper::ElementRef;

use crate::doxygen::alias;
use crate::html::{Action, Rewriter, parse_fragment, serialize_children};
use crate::page::{LinkReference, Page};
use crate::report::UnresolvedLink;
use crate::util::{has_scheme, join_relative, relative_path};

/// Scheme and path of store-internal link markers.
pub const MARKER_PREFIX: &str = "cms://page/";

/// Store-internal link marker for a page.
pub fn marker(id: PageId) -> String {
    format!("{MARKER_PREFIX}{id}")
}

fn parse_marker(path: &str) -> Option<PageId> {
    path.strip_prefix(MARKER_PREFIX)?.parse().ok()
}

/// Destination address space for rewritten links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetAddressing {
    /// Import direction: hrefs become `cms://page/{id}` markers.
    InternalId,
    /// Export direction: hrefs become paths relative to the current page.
    RelativePath,
}

/// How one href resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    /// Not an internal link, left as is.
    External,
    Resolved { id: PageId, href: String },
    Dangling,
}

/// Token to page mapping for one run.
#[derive(Debug)]
pub struct LinkIndex {
    addressing: TargetAddressing,
    /// Source path (import) or marker (export) to page.
    exact: HashMap<String, PageId>,
    /// Doxygen alias (import) or page uri (export) to page.
    secondary: HashMap<String, PageId>,
    /// Page to destination address.
    destinations: HashMap<PageId, String>,
    service_host: Option<String>,
}

impl LinkIndex {
    /// Build the index from fully allocated pages.
    ///
    /// Pages without an `id` cannot be link targets and are left out. For
    /// [`TargetAddressing::InternalId`] each page is keyed by its source
    /// `location` and its Doxygen alias; for
    /// [`TargetAddressing::RelativePath`] by its marker and its `uri`, with
    /// `location` as the destination. Secondary keys shared by several pages
    /// go to the first page in location order.
    pub fn build(pages: &[Page], addressing: TargetAddressing) -> Self {
        let mut sorted: Vec<(&Page, PageId)> = pages
            .iter()
            .filter_map(|page| page.id.map(|id| (page, id)))
            .collect();
        sorted.sort_by(|(a, _), (b, _)| a.location.cmp(&b.location));

        let mut exact = HashMap::with_capacity(sorted.len());
        let mut secondary = HashMap::with_capacity(sorted.len());
        let mut destinations = HashMap::with_capacity(sorted.len());

        for (page, id) in sorted {
            match addressing {
                TargetAddressing::InternalId => {
                    exact.insert(page.location.clone(), id);
                    let file_name = page.location.rsplit('/').next().unwrap_or_default();
                    if let Some(alias) = alias(file_name) {
                        secondary.entry(alias).or_insert(id);
                    }
                    destinations.insert(id, marker(id));
                }
                TargetAddressing::RelativePath => {
                    exact.insert(marker(id), id);
                    secondary.entry(page.uri.clone()).or_insert(id);
                    destinations.insert(id, page.location.clone());
                }
            }
        }

        tracing::debug!(pages = destinations.len(), ?addressing, "Built link index");

        Self {
            addressing,
            exact,
            secondary,
            destinations,
            service_host: None,
        }
    }

    /// Treat absolute URLs under `host` as links to exported pages, matched
    /// by their last path segment.
    #[must_use]
    pub fn with_service_host(mut self, host: Option<String>) -> Self {
        self.service_host = host.filter(|h| !h.is_empty());
        self
    }

    /// Number of pages that can be linked to.
    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn addressing(&self) -> TargetAddressing {
        self.addressing
    }

    fn resolve(&self, from: &str, href: &str) -> Resolution {
        let (path, anchor) = match href.split_once('#') {
            Some((path, anchor)) => (path, Some(anchor)),
            None => (href, None),
        };
        let path = path.split_once('?').map_or(path, |(p, _)| p);

        let target = match self.addressing {
            TargetAddressing::InternalId => self.resolve_source(from, href, path),
            TargetAddressing::RelativePath => self.resolve_stored(href, path),
        };
        let Some(target) = target else {
            return Resolution::External;
        };
        let Some((id, destination)) =
            target.and_then(|id| self.destinations.get(&id).map(|dest| (id, dest)))
        else {
            return Resolution::Dangling;
        };

        let mut href = match self.addressing {
            TargetAddressing::InternalId => destination.clone(),
            TargetAddressing::RelativePath => relative_path(from, destination),
        };
        if let Some(anchor) = anchor.filter(|a| !a.is_empty()) {
            href.push('#');
            href.push_str(anchor);
        }
        Resolution::Resolved { id, href }
    }

    /// `None` for external hrefs, `Some(None)` for unknown internal ones.
    fn resolve_source(&self, from: &str, href: &str, path: &str) -> Option<Option<PageId>> {
        if is_external(href) || !is_html_path(path) {
            return None;
        }
        let exact = join_relative(from, path).and_then(|joined| self.exact.get(&joined));
        let by_alias = || {
            let file_name = path.rsplit('/').next().unwrap_or_default();
            alias(file_name).and_then(|a| self.secondary.get(&a))
        };
        Some(exact.or_else(by_alias).copied())
    }

    fn resolve_stored(&self, href: &str, path: &str) -> Option<Option<PageId>> {
        if path.starts_with(MARKER_PREFIX) {
            return Some(parse_marker(path).filter(|id| self.exact.contains_key(&marker(*id))));
        }
        if let Some(host) = &self.service_host
            && let Some(rest) = path.strip_prefix(host.as_str())
        {
            let segment = rest.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
            // Other pages on the CMS host stay absolute.
            return self.secondary.get(segment).map(|id| Some(*id));
        }
        if is_external(href) {
            return None;
        }
        // Relative HTML links have no counterpart in the Markdown tree.
        is_html_path(path).then_some(None)
    }
}

fn is_external(href: &str) -> bool {
    href.is_empty() || href.starts_with('#') || href.starts_with('/') || has_scheme(href)
}

fn is_html_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

/// Result of rewriting one page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub body: String,
    /// Every internal link seen, with its resolution.
    pub links: Vec<LinkReference>,
    /// Links degraded to plain text.
    pub unresolved: Vec<UnresolvedLink>,
}

/// Rewrite every internal link in `page.body` for the index's addressing.
///
/// Pure with respect to the body: the same body and index always produce
/// the same output. Hrefs are resolved relative to `page.location`.
pub fn rewrite(page: &Page, index: &LinkIndex) -> RewriteOutcome {
    let fragment = parse_fragment(&page.body);
    let mut rewriter = LinkRewriter {
        index,
        from: &page.location,
        links: Vec::new(),
        dangling: Vec::new(),
    };
    let mut body = String::with_capacity(page.body.len());
    serialize_children(fragment.root_element(), &mut rewriter, &mut body);

    let display_id = page.display_id();
    let unresolved = rewriter
        .dangling
        .into_iter()
        .map(|token| {
            tracing::warn!(page = %display_id, href = %token, "Dangling link degraded to text");
            UnresolvedLink {
                page: display_id.clone(),
                token,
            }
        })
        .collect();

    RewriteOutcome {
        body,
        links: rewriter.links,
        unresolved,
    }
}

struct LinkRewriter<'a> {
    index: &'a LinkIndex,
    from: &'a str,
    links: Vec<LinkReference>,
    dangling: Vec<String>,
}

impl Rewriter for LinkRewriter<'_> {
    fn element(&mut self, el: ElementRef<'_>) -> Action {
        if el.value().name() != "a" {
            return Action::Keep;
        }
        let Some(href) = el.value().attr("href") else {
            return Action::Keep;
        };

        match self.index.resolve(self.from, href) {
            Resolution::External => Action::Keep,
            Resolution::Resolved { id, href: target } => {
                self.links.push(LinkReference {
                    source_token: href.to_owned(),
                    resolved_target: Some(id),
                });
                let attrs = el
                    .value()
                    .attrs()
                    .map(|(name, value)| {
                        let value = if name == "href" { target.as_str() } else { value };
                        (name.to_owned(), value.to_owned())
                    })
                    .collect();
                Action::Retag {
                    name: "a".to_owned(),
                    attrs,
                }
            }
            Resolution::Dangling => {
                self.links.push(LinkReference::unresolved(href));
                self.dangling.push(href.to_owned());
                Action::Unwrap
            }
        }
    }
}
