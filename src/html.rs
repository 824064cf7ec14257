//! Lightweight HTML tag scanning.
//!
//! Feed discovery only ever needs three things out of a page: its anchors, its
//! `<link>` declarations, and an optional `<meta http-equiv="refresh">`
//! target. Simple string scanning covers all three without an HTML parser
//! dependency, and keeps working on the tag soup real sites serve.
//!
//! Attribute values are returned as written (case preserved); tag and
//! attribute names are matched case-insensitively.

/// A `<link>` element's attributes, as far as feed discovery cares.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkTag {
    pub rel: Option<String>,
    pub link_type: Option<String>,
    pub href: Option<String>,
    pub title: Option<String>,
}

/// An anchor element with a resolvable href.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorTag {
    pub href: String,
    /// Visible text content, tags stripped, whitespace as written.
    pub text: String,
}

/// Collects every `<link>` element in the document.
pub fn link_tags(html: &str) -> Vec<LinkTag> {
    scan_tags(html, "link")
        .into_iter()
        .map(|tag| LinkTag {
            rel: extract_attr(tag, "rel").map(str::to_owned),
            link_type: extract_attr(tag, "type").map(str::to_owned),
            href: extract_attr(tag, "href").map(str::to_owned),
            title: extract_attr(tag, "title").map(str::to_owned),
        })
        .collect()
}

/// Collects every anchor that has an href, with its visible text.
pub fn anchor_tags(html: &str) -> Vec<AnchorTag> {
    let lower = html.to_ascii_lowercase();
    let mut anchors = Vec::new();
    let mut pos = 0;

    while let Some(rel_start) = lower[pos..].find("<a") {
        let start = pos + rel_start;
        // Reject <abbr>, <area> and friends: "<a" must end the tag name.
        let after = lower.as_bytes().get(start + 2).copied();
        if !matches!(after, Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/')) {
            pos = start + 2;
            continue;
        }
        let Some(tag_end) = lower[start..].find('>') else {
            break;
        };
        let tag_end = start + tag_end;
        let tag = &html[start..=tag_end];

        let text_end = lower[tag_end + 1..]
            .find("</a")
            .map_or(html.len(), |i| tag_end + 1 + i);
        if let Some(href) = extract_attr(tag, "href") {
            anchors.push(AnchorTag {
                href: href.to_owned(),
                text: strip_tags(&html[tag_end + 1..text_end]),
            });
        }
        pos = text_end.max(tag_end + 1);
    }

    anchors
}

/// Extracts the redirect target of the first `<meta http-equiv="refresh">`.
///
/// Handles the `content="5; url=/target"` form with or without quotes around
/// the URL. Returns the target as written (possibly relative).
pub fn meta_refresh_target(html: &str) -> Option<String> {
    for tag in scan_tags(html, "meta") {
        let is_refresh = extract_attr(tag, "http-equiv")
            .is_some_and(|v| v.eq_ignore_ascii_case("refresh"));
        if !is_refresh {
            continue;
        }
        let content = extract_attr(tag, "content")?;
        for part in content.split(';') {
            let part = part.trim();
            if part.len() >= 4 && part[..4].eq_ignore_ascii_case("url=") {
                let target = part[4..].trim().trim_matches(['\'', '"']);
                if !target.is_empty() {
                    return Some(target.to_owned());
                }
            }
        }
    }
    None
}

/// Returns the full text of every `<name ...>` tag in the document.
fn scan_tags<'a>(html: &'a str, name: &str) -> Vec<&'a str> {
    let lower = html.to_ascii_lowercase();
    let needle = format!("<{name}");
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(rel_start) = lower[pos..].find(&needle) {
        let start = pos + rel_start;
        let after = lower.as_bytes().get(start + needle.len()).copied();
        if !matches!(after, Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/')) {
            pos = start + needle.len();
            continue;
        }
        match lower[start..].find('>') {
            Some(end) => {
                tags.push(&html[start..=start + end]);
                pos = start + end + 1;
            }
            None => break,
        }
    }

    tags
}

/// Extracts an attribute value from a single tag, case preserved.
///
/// Accepts double-quoted, single-quoted, and bare values. The attribute name
/// must stand on its own (`href=`, not `data-href=`).
fn extract_attr<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let lower = tag.to_ascii_lowercase();
    let needle = format!("{attr}=");
    let mut from = 0;

    while let Some(rel) = lower[from..].find(&needle) {
        let at = from + rel;
        let boundary = at == 0
            || matches!(
                lower.as_bytes()[at - 1],
                b' ' | b'\t' | b'\n' | b'\r' | b'"' | b'\''
            );
        if !boundary {
            from = at + needle.len();
            continue;
        }

        let value_start = at + needle.len();
        let rest = &tag[value_start..];
        return match rest.as_bytes().first() {
            Some(&q @ (b'"' | b'\'')) => {
                let inner = &rest[1..];
                inner.find(q as char).map(|end| &inner[..end])
            }
            Some(_) => {
                let end = rest
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                Some(rest[..end].trim_end_matches('/'))
            }
            None => None,
        };
    }

    None
}

/// Removes markup from an anchor's inner HTML, leaving the visible text.
fn strip_tags(inner: &str) -> String {
    let mut text = String::with_capacity(inner.len());
    let mut in_tag = false;
    for c in inner.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn link_tags_with_mixed_attribute_order() {
        let html = r#"<head>
            <link rel="alternate" type="application/rss+xml" href="/feed.xml" title="RSS">
            <link href="/style.css" rel="stylesheet">
        </head>"#;
        let links = link_tags(html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].rel.as_deref(), Some("alternate"));
        assert_eq!(links[0].link_type.as_deref(), Some("application/rss+xml"));
        assert_eq!(links[0].href.as_deref(), Some("/feed.xml"));
        assert_eq!(links[0].title.as_deref(), Some("RSS"));
        assert_eq!(links[1].rel.as_deref(), Some("stylesheet"));
    }

    #[test]
    fn link_tags_single_quotes_and_case() {
        let html = "<LINK REL='alternate' TYPE='application/atom+xml' HREF='/atom'>";
        let links = link_tags(html);
        assert_eq!(links[0].rel.as_deref(), Some("alternate"));
        assert_eq!(links[0].href.as_deref(), Some("/atom"));
    }

    #[test]
    fn anchors_extract_href_and_text() {
        let html = r#"<body><a href="/feed"><b>RSS</b> feed</a><a name="top"></a></body>"#;
        let anchors = anchor_tags(html);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].href, "/feed");
        assert_eq!(anchors[0].text, "RSS feed");
    }

    #[test]
    fn anchors_do_not_match_other_a_tags() {
        let html = r#"<abbr title="x">y</abbr><area href="/map"><a href="/real">ok</a>"#;
        let anchors = anchor_tags(html);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].href, "/real");
    }

    #[test]
    fn unquoted_href_is_accepted() {
        let anchors = anchor_tags("<a href=/feed.xml>feed</a>");
        assert_eq!(anchors[0].href, "/feed.xml");
    }

    #[test]
    fn data_href_does_not_shadow_href() {
        let links = link_tags(r#"<link data-href="/wrong" href="/right" rel="alternate">"#);
        assert_eq!(links[0].href.as_deref(), Some("/right"));
    }

    #[test]
    fn meta_refresh_with_delay_and_quotes() {
        let html = r#"<meta http-equiv="refresh" content="5; url='/new-home'">"#;
        assert_eq!(meta_refresh_target(html).as_deref(), Some("/new-home"));
    }

    #[test]
    fn meta_refresh_case_insensitive() {
        let html = r#"<META HTTP-EQUIV="Refresh" CONTENT="0;URL=https://example.com/moved">"#;
        assert_eq!(
            meta_refresh_target(html).as_deref(),
            Some("https://example.com/moved")
        );
    }

    #[test]
    fn meta_without_refresh_is_ignored() {
        let html = r#"<meta charset="utf-8"><meta name="viewport" content="width=device-width">"#;
        assert_eq!(meta_refresh_target(html), None);
    }

    #[test]
    fn unclosed_tag_does_not_panic() {
        assert_eq!(link_tags("<link rel=\"alternate\""), Vec::<LinkTag>::new());
        assert!(anchor_tags("<a href=\"/x\"").is_empty());
    }
}
