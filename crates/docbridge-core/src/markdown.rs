//! HTML to Markdown conversion for exported page bodies.
//!
//! Conversion runs in two stages. A `scraper` pass reduces the document to
//! the elements the converter renders: unknown elements are unwrapped so
//! their text survives, metadata (`head`, `script`, `style`) is dropped, and
//! code is lifted out verbatim together with its `language-*` hint. `htmd`
//! then renders the reduced document through the element handlers below, and
//! a final pass tidies blank lines and splices the code back in as fenced
//! blocks and inline spans.

use std::borrow::Cow;
use std::sync::Arc;

use htmd::{Element, HtmlToMarkdown};
use scraper::{ElementRef, Html};

use crate::html::{Action, Rewriter, collapse_whitespace, collapsed_text, serialize_children};

/// Elements whose content is never rendered.
const SKIPPED: &[&str] = &[
    "head", "title", "script", "style", "meta", "link", "template", "noscript",
];

/// Elements rendered as blocks of their children.
const CONTAINERS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "nav", "aside", "figure",
    "figcaption", "dl", "dt", "dd", "details", "summary", "center", "form", "fieldset",
];

/// Elements passed to `htmd` unchanged.
const RENDERED: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "hr", "strong", "b", "em", "i", "a", "img",
    "ul", "ol", "li", "blockquote", "table", "tr", "th", "td",
];

/// Elements holding code text.
const CODE: &[&str] = &["code", "tt", "kbd", "samp"];

/// Starts a list item; list handlers split their content on it.
const ITEM: char = '\u{1e}';
/// Starts a rendered list; list items join it to the preceding line.
const LIST: char = '\u{1d}';
/// Starts a table row.
const ROW: char = '\u{1c}';
/// Starts a table cell.
const CELL: char = '\u{1f}';
/// Indentation that survives line trimming until the final pass.
const INDENT: char = '\u{1b}';
/// Delimits a code block reference.
const CODE_REF: char = '\u{1a}';

/// Convert an HTML document or fragment to Markdown.
///
/// The result has no trailing newline. Consecutive blocks are separated by a
/// single blank line.
///
/// # Examples
///
/// ```
/// use docbridge_core::markdown;
///
/// let md = markdown::convert("<h2>Usage</h2><p>Call <code>begin()</code> first.</p>");
/// assert_eq!(md, "## Usage\n\nCall `begin()` first.");
/// ```
pub fn convert(html: &str) -> String {
    let (reduced, code) = reduce(html);
    if reduced.trim().is_empty() {
        return String::new();
    }

    let code = Arc::new(code);
    let markdown = match converter(&code).convert(&reduced) {
        Ok(markdown) => markdown,
        Err(err) => {
            tracing::warn!(error = %err, "Markdown conversion failed, keeping plain text");
            return collapsed_text(Html::parse_fragment(&reduced).root_element());
        }
    };

    let tidied = tidy(&markdown, false).replace(INDENT, " ");
    splice_code_blocks(&tidied, &code.blocks)
}

/// Code lifted out of the document before conversion.
#[derive(Debug, Default)]
struct Code {
    blocks: Vec<CodeBlock>,
    spans: Vec<String>,
}

#[derive(Debug)]
struct CodeBlock {
    language: Option<String>,
    text: String,
}

fn language_class(el: ElementRef<'_>) -> Option<String> {
    el.value()
        .classes()
        .find_map(|c| c.strip_prefix("language-"))
        .filter(|lang| !lang.is_empty())
        .map(str::to_owned)
}

/// Reduce `html` to rendered elements, returning the markup and the code it
/// referenced.
fn reduce(html: &str) -> (String, Code) {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let start = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .unwrap_or(root);

    let mut reducer = Reducer::default();
    let mut out = String::new();
    serialize_children(start, &mut reducer, &mut out);
    (out, reducer.code)
}

#[derive(Default)]
struct Reducer {
    code: Code,
}

impl Reducer {
    fn code_block(&mut self, pre: ElementRef<'_>) -> Action {
        let code = pre
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "code");
        let language = code.and_then(language_class).or_else(|| language_class(pre));
        let text: String = pre.text().collect();

        let index = self.code.blocks.len();
        self.code.blocks.push(CodeBlock {
            language,
            text: text.trim_matches('\n').to_owned(),
        });
        Action::Replace(format!("<pre data-block=\"{index}\">{index}</pre>"))
    }

    fn inline_code(&mut self, el: ElementRef<'_>) -> Action {
        let text = collapsed_text(el);
        if text.is_empty() {
            return Action::Drop;
        }
        let index = self.code.spans.len();
        self.code.spans.push(text);
        Action::Replace(format!("<code data-span=\"{index}\">{index}</code>"))
    }
}

/// Marker for an `li`, numbered from its list's `start`.
fn list_marker(li: ElementRef<'_>) -> String {
    let list = li.parent().and_then(ElementRef::wrap);
    if list.is_none_or(|list| list.value().name() != "ol") {
        return "- ".to_owned();
    }
    let start: usize = list
        .and_then(|list| list.value().attr("start"))
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1);
    let position = li
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| sibling.value().name() == "li")
        .count();
    format!("{}. ", start + position)
}

fn kept_attrs(el: ElementRef<'_>, names: &[&str]) -> Vec<(String, String)> {
    el.value()
        .attrs()
        .filter(|(name, _)| names.contains(name))
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect()
}

impl Rewriter for Reducer {
    fn element(&mut self, el: ElementRef<'_>) -> Action {
        let name = el.value().name();
        if SKIPPED.contains(&name) {
            return Action::Drop;
        }
        if name == "pre" {
            return self.code_block(el);
        }
        if CODE.contains(&name) {
            return self.inline_code(el);
        }
        if CONTAINERS.contains(&name) {
            return Action::Retag {
                name: "div".to_owned(),
                attrs: Vec::new(),
            };
        }
        if !RENDERED.contains(&name) {
            return Action::Unwrap;
        }

        let attrs = match name {
            "a" => kept_attrs(el, &["href"]),
            "img" => kept_attrs(el, &["src", "alt"]),
            "li" => vec![("data-marker".to_owned(), list_marker(el))],
            _ => Vec::new(),
        };
        Action::Retag {
            name: name.to_owned(),
            attrs,
        }
    }

    fn text<'t>(&mut self, text: &'t str) -> Cow<'t, str> {
        if text.contains(|c: char| c.is_whitespace() && c != ' ') || text.contains("  ") {
            let mut collapsed = String::with_capacity(text.len());
            for ch in text.chars() {
                if !ch.is_whitespace() {
                    collapsed.push(ch);
                } else if !collapsed.ends_with(' ') {
                    collapsed.push(' ');
                }
            }
            Cow::Owned(collapsed)
        } else {
            Cow::Borrowed(text)
        }
    }
}

fn attr(element: &Element, name: &str) -> Option<String> {
    element
        .attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
}

fn block(text: &str) -> Option<String> {
    Some(format!("\n\n{text}\n\n"))
}

/// `htmd` converter rendering the reduced element set.
fn converter(code: &Arc<Code>) -> HtmlToMarkdown {
    let spans = Arc::clone(code);
    HtmlToMarkdown::builder()
        .skip_tags(SKIPPED.to_vec())
        .add_handler(vec!["html", "body", "thead", "tbody", "tfoot"], |element: Element| {
            Some(element.content.to_owned())
        })
        .add_handler(vec!["div", "p"], |element: Element| block(element.content.trim()))
        .add_handler(vec!["h1", "h2", "h3", "h4", "h5", "h6"], heading)
        .add_handler(vec!["strong", "b"], |element: Element| {
            Some(delimit(element.content, "**"))
        })
        .add_handler(vec!["em", "i"], |element: Element| Some(delimit(element.content, "*")))
        .add_handler(vec!["br"], |_: Element| Some("  \n".to_owned()))
        .add_handler(vec!["hr"], |_: Element| block("---"))
        .add_handler(vec!["a"], link)
        .add_handler(vec!["img"], image)
        .add_handler(vec!["blockquote"], blockquote)
        .add_handler(vec!["ul", "ol"], list)
        .add_handler(vec!["li"], list_item)
        .add_handler(vec!["table"], table)
        .add_handler(vec!["tr"], |element: Element| {
            Some(format!("{ROW}{}", element.content))
        })
        .add_handler(vec!["th", "td"], |element: Element| {
            let text = collapse_whitespace(element.content).replace("\\|", "|");
            Some(format!("{CELL}{}", text.replace('|', "\\|")))
        })
        .add_handler(vec!["pre"], |element: Element| {
            let index = attr(&element, "data-block")?;
            block(&format!("{CODE_REF}{index}{CODE_REF}"))
        })
        .add_handler(vec!["code"], move |element: Element| {
            let text = attr(&element, "data-span")
                .and_then(|index| index.parse::<usize>().ok())
                .and_then(|index| spans.spans.get(index))?;
            Some(code_span(text))
        })
        .build()
}

fn heading(element: Element) -> Option<String> {
    let level = element.tag.strip_prefix('h')?.parse::<usize>().ok()?;
    let text = collapse_whitespace(element.content);
    if text.is_empty() {
        return Some(String::new());
    }
    block(&format!("{} {text}", "#".repeat(level)))
}

fn link(element: Element) -> Option<String> {
    let text = element.content;
    match attr(&element, "href").filter(|h| !h.is_empty()) {
        Some(href) if !text.trim().is_empty() => {
            let lead = if text.starts_with(char::is_whitespace) { " " } else { "" };
            let trail = if text.ends_with(char::is_whitespace) { " " } else { "" };
            Some(format!("{lead}[{}]({href}){trail}", text.trim()))
        }
        _ => Some(text.to_owned()),
    }
}

fn image(element: Element) -> Option<String> {
    let src = attr(&element, "src")?;
    let alt = attr(&element, "alt").unwrap_or_default();
    Some(format!("![{alt}]({src})"))
}

fn blockquote(element: Element) -> Option<String> {
    let inner = tidy(element.content, false);
    if inner.is_empty() {
        return Some(String::new());
    }
    let quoted = inner
        .lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_owned()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    block(&quoted)
}

fn list(element: Element) -> Option<String> {
    let items: Vec<&str> = element
        .content
        .split(ITEM)
        .skip(1)
        .map(str::trim_end)
        .filter(|item| !item.trim().is_empty())
        .collect();
    if items.is_empty() {
        return Some(String::new());
    }
    block(&format!("{LIST}{}", items.join("\n")))
}

/// Render one item with its marker, indenting continuation lines under it.
fn list_item(element: Element) -> Option<String> {
    let marker = attr(&element, "data-marker").unwrap_or_else(|| "- ".to_owned());
    let content = tidy(element.content, true);

    let indent: String = std::iter::repeat_n(INDENT, marker.len()).collect();
    let mut out = String::from(ITEM);
    out.push_str(marker.trim_end());
    for (i, line) in content.lines().enumerate() {
        if i == 0 {
            out.push(' ');
            out.push_str(line);
        } else {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
                out.push_str(line);
            }
        }
    }
    Some(out)
}

/// GitHub-flavored table; the first row is the header.
fn table(element: Element) -> Option<String> {
    let rows: Vec<Vec<&str>> = element
        .content
        .split(ROW)
        .skip(1)
        .map(|row| row.split(CELL).skip(1).map(str::trim).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();

    let Some(columns) = rows.iter().map(Vec::len).max() else {
        return Some(String::new());
    };
    let format_row = |cells: &[&str]| {
        let mut padded = cells.to_vec();
        padded.resize(columns, "");
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format_row(&rows[0]));
    lines.push(format!("|{}", " --- |".repeat(columns)));
    lines.extend(rows[1..].iter().map(|row| format_row(row)));
    block(&lines.join("\n"))
}

/// Wrap the trimmed content in `marker`, keeping surrounding spaces outside.
fn delimit(content: &str, marker: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_owned();
    }
    let lead = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{lead}{marker}{trimmed}{marker}{trail}")
}

fn code_span(text: &str) -> String {
    let ticks = "`".repeat(longest_run(text, '`') + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{ticks} {text} {ticks}")
    } else {
        format!("{ticks}{text}{ticks}")
    }
}

fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Trim lines and collapse blank runs to one blank line.
///
/// Two trailing spaces before a non-empty line are a hard break and kept.
/// With `tight_lists`, a nested list is joined to the line above it.
fn tidy(text: &str, tight_lists: bool) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim_matches(|c| c == ' ' || c == '\t');
        if line.is_empty() {
            if out.last().is_some_and(|last| !last.is_empty()) {
                out.push(String::new());
            }
            continue;
        }

        let next_has_text = lines.get(i + 1).is_some_and(|next| !next.trim().is_empty());
        let hard_break = raw.ends_with("  ") && next_has_text;

        let line = match line.strip_prefix(LIST) {
            Some(rest) => {
                if tight_lists && out.last().is_some_and(String::is_empty) {
                    out.pop();
                }
                rest
            }
            None => line,
        };
        out.push(if hard_break {
            format!("{line}  ")
        } else {
            line.to_owned()
        });
    }

    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }
    out.join("\n")
}

/// Replace code block references with fenced blocks, repeating the
/// reference line's prefix (list indentation, quote markers) on every line.
fn splice_code_blocks(markdown: &str, blocks: &[CodeBlock]) -> String {
    let mut out = Vec::new();
    for line in markdown.lines() {
        let reference = line.split_once(CODE_REF).and_then(|(prefix, rest)| {
            let (index, _) = rest.split_once(CODE_REF)?;
            let block = blocks.get(index.parse::<usize>().ok()?)?;
            Some((prefix, block))
        });
        let Some((prefix, block)) = reference else {
            out.push(line.to_owned());
            continue;
        };

        let fence = "`".repeat(longest_run(&block.text, '`').max(2) + 1);
        let language = block.language.as_deref().unwrap_or_default();
        out.push(format!("{prefix}{fence}{language}"));
        for code_line in block.text.split('\n') {
            if code_line.is_empty() {
                out.push(prefix.trim_end().to_owned());
            } else {
                out.push(format!("{prefix}{code_line}"));
            }
        }
        out.push(format!("{prefix}{fence}"));
    }
    out.join("\n")
}
