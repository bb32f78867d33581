//! Doxygen HTML normalization.
//!
//! Turns one generated HTML document into a [`NormalizedPage`]: tool chrome
//! removed, Doxygen markup simplified, title/abstract extracted and the
//! category path derived from the page's qualified name or location.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

use crate::doxygen::qualified_name;
use crate::error::Error;
use crate::html::{
    Action, Rewriter, collapsed_text, escape_attr, escape_text, has_class, push_end_tag,
    push_start_tag, serialize_children,
};
use crate::page::{LinkReference, NormalizedPage, Page};

/// Structural signature of an element.
#[derive(Debug, Clone, Copy)]
enum Signature {
    Tag(&'static str),
    Class(&'static str),
    Id(&'static str),
    Stylesheet,
}

impl Signature {
    fn matches(self, el: ElementRef<'_>) -> bool {
        let element = el.value();
        match self {
            Self::Tag(name) => element.name() == name,
            Self::Class(class) => has_class(el, class),
            Self::Id(id) => element.id() == Some(id),
            Self::Stylesheet => {
                element.name() == "link"
                    && element
                        .attr("rel")
                        .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"))
            }
        }
    }
}

/// Navigation, search and styling elements emitted around the content.
const CHROME: &[Signature] = &[
    Signature::Id("top"),
    Signature::Class("header"),
    Signature::Class("tabs"),
    Signature::Class("navpath"),
    Signature::Id("nav-tree"),
    Signature::Id("splitbar"),
    Signature::Id("side-nav"),
    Signature::Class("footer"),
    Signature::Id("MSearchBox"),
    Signature::Id("MSearchSelectWindow"),
    Signature::Id("MSearchResultsWindow"),
    Signature::Tag("script"),
    Signature::Tag("style"),
    Signature::Stylesheet,
];

/// Content root candidates, most specific first.
const CONTENT_ROOTS: &[Signature] = &[
    Signature::Class("contents"),
    Signature::Id("doc-content"),
    Signature::Class("textblock"),
    Signature::Tag("body"),
];

const DROPPED_ATTRS: &[&str] = &["onclick", "onload", "style"];

/// Member markup class renames, checked in order.
const CLASS_RENAMES: &[(&str, &str)] = &[
    ("memitem", "member-item"),
    ("memtitle", "member-title"),
    ("memdoc", "member-doc"),
    ("groupheader", "section-header"),
];

static GENERATED_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"The documentation for this \w+ was generated from the following files?:")
        .expect("invalid generated-from regex")
});

fn is_chrome(el: ElementRef<'_>) -> bool {
    CHROME.iter().any(|sig| sig.matches(el))
}

fn inside_chrome(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(is_chrome)
}

fn descendant_elements(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.descendants().skip(1).filter_map(ElementRef::wrap)
}

/// Normalizer settings.
#[derive(Debug, Clone)]
pub struct NormalizerOptions {
    /// Category for pages with no hierarchy information.
    pub default_category: String,
    /// Language hint added to converted code fragments.
    pub code_language: Option<String>,
    /// Explicit page uri to category name assignments.
    pub category_overrides: HashMap<String, String>,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            default_category: "Reference".to_owned(),
            code_language: None,
            category_overrides: HashMap::new(),
        }
    }
}

/// Doxygen HTML normalizer.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizerOptions,
}

impl Normalizer {
    #[must_use]
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    /// Normalize one generated document.
    ///
    /// `location` is the document's input-relative path with `/` separators;
    /// its file stem becomes the page `uri` and its directories the fallback
    /// category path. The page `id` is left unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the input is not UTF-8 or the
    /// content root has no visible text.
    pub fn normalize(&self, raw: &[u8], location: &str) -> Result<NormalizedPage, Error> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| Error::malformed(location, format!("not valid UTF-8: {e}")))?;
        let document = Html::parse_document(text);

        let content = find_content_root(&document)
            .ok_or_else(|| Error::malformed(location, "no content element"))?;

        let (dirs, file_name) = match location.rsplit_once('/') {
            Some((dirs, name)) => (dirs.split('/').map(str::to_owned).collect(), name),
            None => (Vec::new(), location),
        };
        let uri = file_stem(file_name).to_owned();

        let heading = TitleSource::find(&document, content);
        let qualified = heading.as_ref().and_then(|h| qualified_name(&h.text));
        let title = match (&qualified, &heading) {
            (Some(segments), _) => segments.last().cloned().unwrap_or_default(),
            (None, Some(heading)) => heading.text.clone(),
            (None, None) => uri.clone(),
        };
        let title_element = heading.as_ref().and_then(|h| h.element_in_content);

        let (abstract_text, abstract_element) = match find_abstract(content, title_element) {
            Some((text, el)) => (text, Some(el)),
            None => (String::new(), None),
        };
        let category_path = self.category_path(&uri, qualified.as_deref(), dirs);

        let mut rewriter = ContentRewriter::new(&self.options, content, title_element);
        rewriter.abstract_element = abstract_element;
        let mut body = String::new();
        serialize_children(content, &mut rewriter, &mut body);

        if !rewriter.has_text {
            return Err(Error::malformed(location, "content has no visible text"));
        }

        tracing::debug!(location, %title, links = rewriter.links.len(), "Normalized page");

        Ok(NormalizedPage {
            page: Page {
                id: None,
                uri,
                order: None,
                title,
                abstract_text,
                body: body.trim().to_owned(),
                category_path,
                location: location.to_owned(),
            },
            links: rewriter.links,
            lead: rewriter.lead,
        })
    }

    fn category_path(
        &self,
        uri: &str,
        qualified: Option<&[String]>,
        dirs: Vec<String>,
    ) -> Vec<String> {
        if let Some(name) = self.options.category_overrides.get(uri) {
            return vec![name.clone()];
        }
        if let Some(segments) = qualified
            && segments.len() > 1
        {
            return segments[..segments.len() - 1].to_vec();
        }
        if !dirs.is_empty() {
            return dirs;
        }
        vec![self.options.default_category.clone()]
    }
}

/// File name without its `.html`/`.htm` extension.
pub(crate) fn file_stem(file_name: &str) -> &str {
    file_name
        .strip_suffix(".html")
        .or_else(|| file_name.strip_suffix(".htm"))
        .unwrap_or(file_name)
}

fn find_content_root(document: &Html) -> Option<ElementRef<'_>> {
    let root = document.root_element();
    CONTENT_ROOTS.iter().find_map(|sig| {
        std::iter::once(root)
            .chain(descendant_elements(root))
            .find(|el| sig.matches(*el) && !inside_chrome(*el))
    })
}

/// Where the page title was found.
struct TitleSource<'a> {
    text: String,
    /// Heading inside the content root, removed from the body.
    element_in_content: Option<ElementRef<'a>>,
}

impl<'a> TitleSource<'a> {
    fn find(document: &'a Html, content: ElementRef<'a>) -> Option<Self> {
        let visible_headings = |levels: &'static [&'static str]| {
            descendant_elements(content).find(move |el| {
                levels.contains(&el.value().name())
                    && !inside_chrome(*el)
                    && !collapsed_text(*el).is_empty()
            })
        };

        if let Some(h1) = visible_headings(&["h1"]) {
            return Some(Self {
                text: collapsed_text(h1),
                element_in_content: Some(h1),
            });
        }

        let header_title = descendant_elements(document.root_element())
            .filter(|el| has_class(*el, "header"))
            .flat_map(descendant_elements)
            .find(|el| has_class(*el, "title"))
            .map(collapsed_text)
            .filter(|text| !text.is_empty());
        if let Some(text) = header_title {
            return Some(Self {
                text,
                element_in_content: None,
            });
        }

        visible_headings(&["h2", "h3", "h4"]).map(|h| Self {
            text: collapsed_text(h),
            element_in_content: Some(h),
        })
    }
}

/// First non-empty paragraph after the title heading.
fn find_abstract<'d>(
    content: ElementRef<'d>,
    title: Option<ElementRef<'d>>,
) -> Option<(String, ElementRef<'d>)> {
    let mut after_title = title.is_none();
    for el in descendant_elements(content) {
        if !after_title {
            after_title = title.is_some_and(|t| t.id() == el.id());
            continue;
        }
        if el.value().name() == "p" && !inside_chrome(el) {
            let text = collapsed_text(el);
            if !text.is_empty() {
                return Some((text, el));
            }
        }
    }
    None
}

/// Serialization decisions for the content root.
struct ContentRewriter<'o, 'd> {
    options: &'o NormalizerOptions,
    title_element: Option<ElementRef<'d>>,
    /// Lead paragraph moved out of the body into `lead`.
    abstract_element: Option<ElementRef<'d>>,
    lead: Option<String>,
    /// File listing following the "generated from" sentence.
    generated_list: Option<ElementRef<'d>>,
    links: Vec<LinkReference>,
    has_text: bool,
}

impl<'o, 'd> ContentRewriter<'o, 'd> {
    fn new(
        options: &'o NormalizerOptions,
        content: ElementRef<'d>,
        title_element: Option<ElementRef<'d>>,
    ) -> Self {
        let generated_list = if GENERATED_FROM.is_match(&content.text().collect::<String>()) {
            descendant_elements(content)
                .filter(|el| el.value().name() == "ul")
                .last()
                .filter(|ul| {
                    let text = ul.text().collect::<String>();
                    text.contains(".h") || text.contains(".cpp")
                })
        } else {
            None
        };

        Self {
            options,
            title_element,
            abstract_element: None,
            lead: None,
            generated_list,
            links: Vec::new(),
            has_text: false,
        }
    }

    fn code_fragment(&mut self, el: ElementRef<'_>) -> String {
        let lines: Vec<String> = descendant_elements(el)
            .filter(|child| has_class(*child, "line"))
            .map(code_text)
            .collect();
        let code = if lines.is_empty() {
            code_text(el)
        } else {
            lines.join("\n")
        };
        if !code.trim().is_empty() {
            self.has_text = true;
        }

        let mut out = String::from(r#"<pre class="code-block"><code"#);
        if let Some(lang) = &self.options.code_language {
            out.push_str(r#" class="language-"#);
            escape_attr(lang, &mut out);
            out.push('"');
        }
        out.push('>');
        escape_text(&code, &mut out);
        out.push_str("</code></pre>");
        out
    }
}

/// Text of a code element, skipping generated line numbers.
fn code_text(el: ElementRef<'_>) -> String {
    fn walk(el: ElementRef<'_>, out: &mut String) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => out.push_str(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child)
                        && !has_class(child, "lineno")
                    {
                        walk(child, out);
                    }
                }
                _ => {}
            }
        }
    }
    let mut out = String::new();
    walk(el, &mut out);
    out
}

fn in_parameter_list(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "dl")
        .is_some_and(|dl| has_class(dl, "params"))
}

/// Attributes kept after hygiene, with the class attribute replaced.
fn clean_attrs(el: ElementRef<'_>, class: Option<String>) -> Vec<(String, String)> {
    let mut attrs: Vec<(String, String)> = el
        .value()
        .attrs()
        .filter(|(name, value)| {
            if DROPPED_ATTRS.contains(name) || (class.is_some() && *name == "class") {
                return false;
            }
            let generated_id = *name == "id"
                && value.len() > 10
                && value.starts_with(['a', 'g', '_']);
            !generated_id
        })
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect();
    if let Some(class) = class {
        attrs.insert(0, ("class".to_owned(), class));
    }
    attrs
}

fn table_class(el: ElementRef<'_>) -> String {
    let kept: Vec<&str> = el
        .value()
        .classes()
        .filter(|c| {
            !c.starts_with("dox") && !c.starts_with("Dox") && *c != "memberdecls" && *c != "memname"
        })
        .collect();
    if kept.is_empty() {
        "api-table".to_owned()
    } else {
        kept.join(" ")
    }
}

impl Rewriter for ContentRewriter<'_, '_> {
    fn element(&mut self, el: ElementRef<'_>) -> Action {
        let name = el.value().name();

        if is_chrome(el)
            || self.title_element.is_some_and(|t| t.id() == el.id())
            || self.generated_list.is_some_and(|ul| ul.id() == el.id())
        {
            return Action::Drop;
        }
        if self.abstract_element.is_some_and(|a| a.id() == el.id()) {
            let mut lead = String::new();
            push_start_tag(&mut lead, "p", std::iter::empty());
            serialize_children(el, self, &mut lead);
            push_end_tag(&mut lead, "p");
            self.lead = Some(lead);
            return Action::Drop;
        }
        if name == "div" && has_class(el, "fragment") {
            return Action::Replace(self.code_fragment(el));
        }
        if name == "a"
            && let Some(href) = el.value().attr("href")
        {
            self.links.push(LinkReference::unresolved(href));
        }

        if name == "dl" && has_class(el, "params") {
            return Action::Retag {
                name: "dl".to_owned(),
                attrs: clean_attrs(el, Some("parameter-list".to_owned())),
            };
        }
        if (name == "dt" || name == "dd") && in_parameter_list(el) {
            let (tag, class) = if name == "dt" {
                ("strong", "param-name")
            } else {
                ("div", "param-description")
            };
            return Action::Retag {
                name: tag.to_owned(),
                attrs: clean_attrs(el, Some(class.to_owned())),
            };
        }

        let class = if name == "table" {
            Some(table_class(el))
        } else {
            CLASS_RENAMES
                .iter()
                .find(|(from, _)| has_class(el, from))
                .map(|(_, to)| (*to).to_owned())
        };
        Action::Retag {
            name: name.to_owned(),
            attrs: clean_attrs(el, class),
        }
    }

    fn text<'t>(&mut self, text: &'t str) -> Cow<'t, str> {
        let text = GENERATED_FROM.replace_all(text, "");
        if !text.trim().is_empty() {
            self.has_text = true;
        }
        text
    }
}
