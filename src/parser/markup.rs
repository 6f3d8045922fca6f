//! HTML → event stream.
//!
//! The catalog page is not well-formed (half of its `<tr>`s are never closed),
//! so the reader runs with end-name checking off and simply reports tags in
//! the order they appear. Pairing opens with closes is the state machine's job.
//!
//! quick-xml reads XML, not HTML, so the page is first rewritten: text that
//! HTML treats as text but XML would not (script and style bodies, a `<` that
//! can't open a tag, a stray `&`) is escaped. Positions in `Markup` errors
//! refer to that rewritten text.

use std::borrow::Cow;
use std::io::Cursor;

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;

use crate::error::CatalogError;

/// Elements whose content runs as plain text up to the matching end tag.
const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    TagOpen {
        name: String,
        attributes: Vec<(String, String)>,
    },
    TagClose {
        name: String,
    },
    Text(String),
}

impl MarkupEvent {
    pub fn close(name: &str) -> Self {
        MarkupEvent::TagClose {
            name: name.to_string(),
        }
    }

    /// Value of the first attribute named `key` on a `TagOpen`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            MarkupEvent::TagOpen { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
impl MarkupEvent {
    pub fn open(name: &str, attributes: &[(&str, &str)]) -> Self {
        MarkupEvent::TagOpen {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn text(value: &str) -> Self {
        MarkupEvent::Text(value.to_string())
    }
}

/// Lazily tokenize `html`.
pub fn events(html: &str) -> MarkupEvents {
    let mut reader = Reader::from_reader(Cursor::new(escape_text(html).into_bytes()));
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    MarkupEvents {
        reader,
        buf: Vec::new(),
        queued: None,
        done: false,
    }
}

pub struct MarkupEvents {
    reader: Reader<Cursor<Vec<u8>>>,
    buf: Vec<u8>,
    // close half of a self-closing tag
    queued: Option<MarkupEvent>,
    done: bool,
}

impl Iterator for MarkupEvents {
    type Item = Result<MarkupEvent, CatalogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.queued.take() {
            return Some(Ok(event));
        }
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => tag_open(&e),
                Ok(Event::Empty(e)) => {
                    self.queued = Some(MarkupEvent::TagClose {
                        name: lower(e.name().as_ref()),
                    });
                    tag_open(&e)
                }
                Ok(Event::End(e)) => MarkupEvent::TagClose {
                    name: lower(e.name().as_ref()),
                },
                Ok(Event::Text(e)) => MarkupEvent::Text(text(&e)),
                Ok(Event::CData(e)) => MarkupEvent::Text(String::from_utf8_lossy(&e).into_owned()),
                Ok(Event::Eof) => {
                    self.done = true;
                    return None;
                }
                // comments, doctype, processing instructions
                Ok(_) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(CatalogError::Markup {
                        position: self.reader.error_position() as u64,
                        message: e.to_string(),
                    }));
                }
            };
            return Some(Ok(event));
        }
    }
}

/// Escape everything in `html` that an HTML parser reads as text but an XML
/// reader would take for markup or reject as a bad entity.
fn escape_text(html: &str) -> String {
    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' if opens_markup(&bytes[i + 1..]) => {
                let end = markup_end(html, i);
                let tag = &html[i..end];
                out.push_str(tag);
                i = end;
                if let Some(name) = raw_text_element(tag) {
                    let body_end = find_end_tag(html, i, name);
                    escape_all(&html[i..body_end], &mut out);
                    i = body_end;
                }
            }
            b'<' => {
                out.push_str("&lt;");
                i += 1;
            }
            b'&' => {
                out.push_str(if is_entity(&html[i..]) { "&" } else { "&amp;" });
                i += 1;
            }
            _ => {
                let next = html[i..].find(['<', '&']).map_or(html.len(), |n| i + n);
                out.push_str(&html[i..next]);
                i = next;
            }
        }
    }
    out
}

/// `rest` follows a `<`: a tag name, an end tag, `<!...>` or `<?...>`.
fn opens_markup(rest: &[u8]) -> bool {
    match rest {
        [b'/', c, ..] => c.is_ascii_alphabetic(),
        [b'!' | b'?', ..] => true,
        [c, ..] => c.is_ascii_alphabetic(),
        [] => false,
    }
}

/// Byte offset just past the markup starting at `start`. Runs to the end of
/// input when unterminated so the reader reports it.
fn markup_end(html: &str, start: usize) -> usize {
    let rest = &html[start..];
    let closing = if rest.starts_with("<!--") {
        Some("-->")
    } else if rest.starts_with("<![CDATA[") {
        Some("]]>")
    } else {
        None
    };
    if let Some(closing) = closing {
        return rest
            .find(closing)
            .map_or(html.len(), |n| start + n + closing.len());
    }

    let mut quote = None;
    for (n, b) in rest.bytes().enumerate().skip(1) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return start + n + 1,
            _ => {}
        }
    }
    html.len()
}

/// Name of the raw text element `tag` opens, if any.
fn raw_text_element(tag: &str) -> Option<&'static str> {
    if tag.ends_with("/>") {
        return None;
    }
    let name: String = tag[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    RAW_TEXT_ELEMENTS
        .into_iter()
        .find(|raw| name.eq_ignore_ascii_case(raw))
}

/// Offset of `</name` at or after `from`, ignoring case.
fn find_end_tag(html: &str, from: usize, name: &str) -> usize {
    let haystack = html[from..].to_ascii_lowercase();
    let needle = format!("</{}", name);
    let mut pos = 0;
    while let Some(n) = haystack[pos..].find(&needle) {
        let at = pos + n;
        let next = haystack.as_bytes().get(at + needle.len());
        if next.map_or(true, |b| !b.is_ascii_alphanumeric()) {
            return from + at;
        }
        pos = at + needle.len();
    }
    html.len()
}

fn escape_all(body: &str, out: &mut String) {
    for c in body.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
}

/// `rest` starts with a character reference or a known named entity.
fn is_entity(rest: &str) -> bool {
    let Some(len) = rest[1..].find(';') else {
        return false;
    };
    let name = &rest[1..1 + len];
    match name.strip_prefix('#') {
        Some(num) => match num.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !num.is_empty() && num.chars().all(|c| c.is_ascii_digit()),
        },
        None => resolve_html5_entity(name).is_some(),
    }
}

fn tag_open(start: &BytesStart<'_>) -> MarkupEvent {
    let attributes = start
        .html_attributes()
        .filter_map(Result::ok)
        .map(|attr| {
            let value = attr
                .unescape_value_with(|entity| resolve_html5_entity(entity))
                .map(Cow::into_owned)
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (lower(attr.key.as_ref()), value)
        })
        .collect();

    MarkupEvent::TagOpen {
        name: lower(start.name().as_ref()),
        attributes,
    }
}

/// Unescape HTML entities; a stray `&` leaves the text as-is.
fn text(raw: &BytesText<'_>) -> String {
    raw.unescape_with(|entity| resolve_html5_entity(entity))
        .map(Cow::into_owned)
        .unwrap_or_else(|_| String::from_utf8_lossy(raw).into_owned())
}

fn lower(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(html: &str) -> Vec<MarkupEvent> {
        events(html).collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn uppercase_names_are_lowered() {
        let evs = collect(r#"<TABLE SUMMARY="Course List"></TABLE>"#);
        assert_eq!(
            evs,
            vec![
                MarkupEvent::open("table", &[("summary", "Course List")]),
                MarkupEvent::close("table"),
            ]
        );
        assert_eq!(evs[0].attribute("summary"), Some("Course List"));
        assert_eq!(evs[0].attribute("class"), None);
    }

    #[test]
    fn unclosed_rows_pass_through() {
        let evs = collect("<table><tr><td>a</td><tr><td>b</td></table>");
        let opens = evs
            .iter()
            .filter(|e| matches!(e, MarkupEvent::TagOpen { name, .. } if name == "tr"))
            .count();
        let closes = evs
            .iter()
            .filter(|e| matches!(e, MarkupEvent::TagClose { name } if name == "tr"))
            .count();
        assert_eq!(opens, 2);
        assert_eq!(closes, 0);
    }

    #[test]
    fn entities_are_resolved() {
        let evs = collect("<td>Fish &amp; Chips&nbsp;101</td>");
        assert_eq!(evs[1], MarkupEvent::text("Fish & Chips\u{a0}101"));
    }

    #[test]
    fn stray_ampersand_is_kept() {
        let evs = collect("<td>R & D</td>");
        assert_eq!(evs[1], MarkupEvent::text("R & D"));
    }

    #[test]
    fn self_closing_tag_opens_and_closes() {
        let evs = collect("a<br/>b");
        assert_eq!(
            evs,
            vec![
                MarkupEvent::text("a"),
                MarkupEvent::open("br", &[]),
                MarkupEvent::close("br"),
                MarkupEvent::text("b"),
            ]
        );
    }

    #[test]
    fn valueless_and_unquoted_attributes() {
        let evs = collect("<td nowrap width=100%>x</td>");
        assert_eq!(evs[0].attribute("nowrap"), Some(""));
        assert_eq!(evs[0].attribute("width"), Some("100%"));
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        let evs = collect("<!DOCTYPE html><!-- nav --><p>hi</p>");
        assert_eq!(
            evs,
            vec![
                MarkupEvent::open("p", &[]),
                MarkupEvent::text("hi"),
                MarkupEvent::close("p"),
            ]
        );
    }

    #[test]
    fn less_than_in_text_is_kept() {
        let evs = collect("<td>Grade of 2.0 or better; enrollment < 30</td>");
        assert_eq!(evs[1], MarkupEvent::text("Grade of 2.0 or better; enrollment < 30"));
        assert_eq!(evs[2], MarkupEvent::close("td"));
    }

    #[test]
    fn stray_ampersand_next_to_less_than() {
        let evs = collect("<td>R & D <3 &copy; &#65;&#x42; &bogus;</td>");
        assert_eq!(evs[1], MarkupEvent::text("R & D <3 \u{a9} AB &bogus;"));
    }

    #[test]
    fn script_body_is_raw_text() {
        let html = r#"<HEAD><SCRIPT type="text/javascript">if (a<b) { alert('it\'s'); }</SCRIPT></HEAD><p>x</p>"#;
        let evs = collect(html);
        assert_eq!(
            evs,
            vec![
                MarkupEvent::open("head", &[]),
                MarkupEvent::open("script", &[("type", "text/javascript")]),
                MarkupEvent::text(r#"if (a<b) { alert('it\'s'); }"#),
                MarkupEvent::close("script"),
                MarkupEvent::close("head"),
                MarkupEvent::open("p", &[]),
                MarkupEvent::text("x"),
                MarkupEvent::close("p"),
            ]
        );
    }

    #[test]
    fn style_body_and_comment_markers_are_raw_text() {
        let evs = collect("<style><!-- td > a { content: \"&\"; } --></Style ><p>y</p>");
        assert_eq!(evs[1], MarkupEvent::text("<!-- td > a { content: \"&\"; } -->"));
        assert_eq!(evs[2], MarkupEvent::close("style"));
        assert_eq!(evs[4], MarkupEvent::text("y"));
    }

    #[test]
    fn unterminated_script_runs_to_end() {
        let evs = collect("<script>var x = 1 < 2;");
        assert_eq!(evs[1], MarkupEvent::text("var x = 1 < 2;"));
    }

    #[test]
    fn quoted_gt_inside_attribute() {
        let evs = collect(r#"<a title="x > y">z</a>"#);
        assert_eq!(evs[0].attribute("title"), Some("x > y"));
        assert_eq!(evs[1], MarkupEvent::text("z"));
    }

    #[test]
    fn truncated_tag_is_an_error() {
        let result: Result<Vec<_>, _> = events("<table><tr class=\"x").collect();
        assert!(matches!(result, Err(CatalogError::Markup { .. })));
    }
}
