//! Reply markup to Markdown.
//!
//! Generic elements go through htmd's turndown-style mapping (ATX headings,
//! `*` bullets, fenced code). Two host-specific rules take precedence: the
//! `<code-block>` container emitted by the chat page and `<hr>`.

use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, Options};
use htmd::{Element, HtmlToMarkdown};
use markup5ever_rcdom::{Node, NodeData};
use tracing::warn;

const FENCE: &str = "```";

const DROPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "button", "svg", "template"];

/// Whether the converted body started or ended on a block boundary. htmd
/// strips edge newlines from its output, so they are recorded here and put
/// back as a single `\n` each.
#[derive(Default)]
struct BodyEdges {
    leading: AtomicBool,
    trailing: AtomicBool,
}

/// Converts one reply's inner HTML into Markdown. Pure and deterministic.
pub fn to_markdown(html: &str) -> String {
    let edges = Arc::new(BodyEdges::default());
    let converter = converter(Arc::clone(&edges));

    match converter.convert(html) {
        Ok(body) => finish(
            &body,
            edges.leading.load(Ordering::Relaxed),
            edges.trailing.load(Ordering::Relaxed),
        ),
        Err(e) => {
            warn!(error = %e, "could not parse reply markup");
            String::new()
        }
    }
}

fn converter(edges: Arc<BodyEdges>) -> HtmlToMarkdown {
    let options = Options {
        heading_style: HeadingStyle::Atx,
        code_block_style: CodeBlockStyle::Fenced,
        bullet_list_marker: BulletListMarker::Asterisk,
        ..Default::default()
    };

    HtmlToMarkdown::builder()
        .options(options)
        .skip_tags(DROPPED_ELEMENTS.to_vec())
        .add_handler(vec!["code-block"], |element: Element| Some(code_block(element.node)))
        .add_handler(vec!["hr"], |_: Element| Some("\n---\n".to_string()))
        .add_handler(vec!["body"], move |element: Element| {
            edges.leading.store(element.content.starts_with('\n'), Ordering::Relaxed);
            edges.trailing.store(element.content.ends_with('\n'), Ordering::Relaxed);
            Some(element.content.to_string())
        })
        .build()
}

/// The chat page's code container: a decoration bar holding the language
/// label, and a `pre > code` with the source. Code is emitted verbatim.
fn code_block(node: &Rc<Node>) -> String {
    let lang = find_descendant(node, &|el, _| has_class(el, "code-block-decoration"))
        .and_then(|decoration| child_element(&decoration, "span"))
        .map(|label| text_of(&label).trim().to_lowercase())
        .unwrap_or_default();

    let code = find_descendant(node, &|el, parent| {
        tag_name(el) == Some("code") && tag_name(parent) == Some("pre")
    })
    .map(|code| text_of(&code))
    .unwrap_or_default();

    format!("\n{FENCE}{lang}\n{code}\n{FENCE}\n")
}

/// Collapses newline runs at either end of the output to a single newline.
fn finish(body: &str, leading: bool, trailing: bool) -> String {
    let body = body.trim_matches('\n');
    if body.is_empty() {
        return String::new();
    }
    let lead = if leading { "\n" } else { "" };
    let trail = if trailing { "\n" } else { "" };
    format!("{lead}{body}{trail}")
}

fn tag_name(node: &Node) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

fn has_class(node: &Node, class: &str) -> bool {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs.borrow().iter().any(|attr| {
            &*attr.name.local == "class" && attr.value.split_whitespace().any(|c| c == class)
        }),
        _ => false,
    }
}

/// Depth-first search below `node`. The predicate sees each element and its parent.
fn find_descendant(node: &Rc<Node>, matches: &dyn Fn(&Node, &Node) -> bool) -> Option<Rc<Node>> {
    for child in node.children.borrow().iter() {
        if matches(child, node) {
            return Some(Rc::clone(child));
        }
        if let Some(found) = find_descendant(child, matches) {
            return Some(found);
        }
    }
    None
}

fn child_element(node: &Rc<Node>, name: &str) -> Option<Rc<Node>> {
    let children = node.children.borrow();
    let found = children.iter().find(|child| tag_name(child) == Some(name)).cloned();
    found
}

fn text_of(node: &Node) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Node, out: &mut String) {
    if let NodeData::Text { contents } = &node.data {
        out.push_str(&contents.borrow());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}
