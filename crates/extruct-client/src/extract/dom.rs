use scraper::{ElementRef, Html};
use url::Url;

/// Elements whose text never counts as content.
const NON_TEXT_TAGS: [&str; 3] = ["script", "style", "template"];

/// All elements under `root` (inclusive), in document order.
pub(crate) fn elements<'a>(root: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.descendants().filter_map(ElementRef::wrap)
}

/// Direct element children of `el`.
pub(crate) fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.children().filter_map(ElementRef::wrap)
}

/// Raw text content of `el`, skipping script and style bodies.
pub(crate) fn raw_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    let mut pending: Vec<_> = el.children().rev().collect();
    while let Some(node) = pending.pop() {
        if let Some(text) = node.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(node)
            && !NON_TEXT_TAGS.contains(&child.value().name())
        {
            pending.extend(node.children().rev());
        }
    }
    out
}

/// Text content with runs of whitespace collapsed to single spaces.
pub(crate) fn text_content(el: ElementRef<'_>) -> String {
    raw_text(el).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve `href` against `base`, falling back to the trimmed input when
/// there is no base or the reference cannot be joined.
pub(crate) fn resolve(base: Option<&Url>, href: &str) -> String {
    let href = href.trim();
    base.and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// The URL relative references in `doc` resolve against: the document's
/// `<base href>` (joined onto `base_url`) if present, else `base_url`.
pub(crate) fn effective_base(doc: &Html, base_url: &str) -> Option<Url> {
    let base = Url::parse(base_url).ok();
    let declared = elements(doc.root_element())
        .find(|e| e.value().name() == "base" && e.value().attr("href").is_some())
        .and_then(|e| e.value().attr("href"));

    match (declared, &base) {
        (Some(href), Some(b)) => b.join(href.trim()).ok().or(base),
        (Some(href), None) => Url::parse(href.trim()).ok(),
        (None, _) => base,
    }
}
