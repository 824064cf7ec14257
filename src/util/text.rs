use unicode_width::UnicodeWidthStr;

/// Ellipsis string used for truncation
const ELLIPSIS: &str = "...";

/// Truncates a URL for a progress line, keeping the domain intact and cutting
/// the path in the middle.
///
/// Widths are display columns, not bytes, so CJK hostnames and paths do not
/// overflow the line. Falls back to a plain tail-truncation when the input is
/// not a parseable URL.
pub fn truncate_url(url: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(url) <= max_width {
        return url.to_owned();
    }

    let Ok(parsed) = url::Url::parse(url) else {
        return tail_truncate(url, max_width);
    };
    let Some(domain) = parsed.host_str() else {
        return tail_truncate(url, max_width);
    };

    // No room for domain plus any path: truncate the domain itself.
    if UnicodeWidthStr::width(domain) + ELLIPSIS.len() + 2 > max_width {
        return tail_truncate(domain, max_width);
    }

    let path = parsed.path();
    let remaining = max_width - UnicodeWidthStr::width(domain) - ELLIPSIS.len();
    let half = remaining / 2;
    let begin = take_width(path, half);
    let end = take_width_back(path, half);
    format!("{domain}{begin}{ELLIPSIS}{end}")
}

fn tail_truncate(s: &str, max_width: usize) -> String {
    if max_width <= ELLIPSIS.len() {
        return take_width(s, max_width).to_owned();
    }
    let kept = take_width(s, max_width - ELLIPSIS.len());
    format!("{kept}{ELLIPSIS}")
}

/// Longest prefix that fits in `width` display columns.
fn take_width(s: &str, width: usize) -> &str {
    let mut used = 0;
    let mut end = 0;
    for (i, c) in s.char_indices() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        end = i + c.len_utf8();
    }
    &s[..end]
}

/// Longest suffix that fits in `width` display columns.
fn take_width_back(s: &str, width: usize) -> &str {
    let mut used = 0;
    let mut start = s.len();
    for (i, c) in s.char_indices().rev() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        start = i;
    }
    &s[start..]
}
