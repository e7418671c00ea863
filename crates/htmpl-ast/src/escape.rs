//! Entity encoding/decoding and raw-markup sanitization.
//!
//! `encode_entities` is applied to text and attribute values when they are
//! rendered, `decode_entities` to template text when it is parsed, and
//! `sanitize_html` to `SafeHtml` content when it is rendered.

/// Named character references understood by `decode_entities`.
const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '©'),
    ("reg", '®'),
    ("trade", '™'),
    ("hellip", '…'),
    ("mdash", '—'),
    ("ndash", '–'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("ldquo", '“'),
    ("rdquo", '”'),
    ("laquo", '«'),
    ("raquo", '»'),
    ("middot", '·'),
    ("bull", '•'),
    ("times", '×'),
    ("euro", '€'),
];

/// Tags kept by `sanitize_html`. Everything else is removed, keeping its text.
const ALLOWED_TAGS: &[&str] = &[
    "h3", "h4", "h5", "h6", "blockquote", "p", "a", "ul", "ol", "nl", "li", "b", "i", "strong",
    "em", "strike", "abbr", "code", "hr", "br", "div", "table", "thead", "caption", "tbody", "tr",
    "th", "td", "pre",
];

/// Tags removed together with their content.
const DISCARDED_TAGS: &[&str] = &["script", "style", "textarea", "option", "noscript"];

const ALLOWED_ATTRIBUTES: &[(&str, &[&str])] = &[("a", &["href", "name", "target"])];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "ftp", "mailto"];

/// Encode the characters that are significant in markup.
pub fn encode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace character references (`&amp;`, `&#169;`, `&#xA9;`) with the
/// characters they stand for. Unknown references are left as written.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_reference(rest) {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decode the reference at the start of `input` (which starts with `&`).
/// Returns the character and the length of the reference including `;`.
fn decode_reference(input: &str) -> Option<(char, usize)> {
    let end = input.find(';')?;
    if end > 32 {
        return None;
    }
    let body = &input[1..end];
    let c = match body.strip_prefix('#') {
        Some(number) => {
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            char::from_u32(code)?
        }
        None => NAMED_ENTITIES
            .iter()
            .find(|(name, _)| *name == body)
            .map(|(_, c)| *c)?,
    };
    Some((c, end + 1))
}

/// Reduce untrusted markup to an allow-list of tags and attributes.
///
/// Comments are dropped, disallowed tags are removed but their text is kept
/// (except for `script`, `style` and friends, whose content goes too), links
/// keep only `http`, `https`, `ftp` and `mailto` URLs, and text is
/// re-encoded.
pub fn sanitize_html(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }

        if rest.starts_with('<') {
            match parse_tag(rest) {
                Some((tag, after)) => {
                    rest = after;
                    if !tag.closing && DISCARDED_TAGS.contains(&tag.name.as_str()) {
                        rest = skip_past_end_tag(rest, &tag.name);
                    } else if ALLOWED_TAGS.contains(&tag.name.as_str()) {
                        write_tag(&tag, &mut out);
                    }
                }
                None => {
                    out.push_str("&lt;");
                    rest = &rest[1..];
                }
            }
            continue;
        }

        let end = rest.find('<').unwrap_or(rest.len());
        out.push_str(&encode_entities(&decode_entities(&rest[..end])));
        rest = &rest[end..];
    }

    out
}

#[derive(Debug)]
struct Tag {
    /// Lowercased.
    name: String,
    closing: bool,
    attributes: Vec<(String, Option<String>)>,
}

/// Parse the tag at the start of `input`. Returns `None` if `input` does not
/// start with a complete tag.
fn parse_tag(input: &str) -> Option<(Tag, &str)> {
    let bytes = input.as_bytes();
    let mut i = 1;

    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    let name_start = i;
    if !bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    let name = input[name_start..i].to_ascii_lowercase();

    let mut attributes = Vec::new();
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/' | b'=') => i += 1,
            Some(_) => {
                let start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/')
                {
                    i += 1;
                }
                let attribute = input[start..i].to_ascii_lowercase();

                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let value = if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    match bytes.get(i) {
                        Some(&quote @ (b'"' | b'\'')) => {
                            let end = i + 1 + input[i + 1..].find(quote as char)?;
                            let value = decode_entities(&input[i + 1..end]);
                            i = end + 1;
                            Some(value)
                        }
                        _ => {
                            let start = i;
                            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>'
                            {
                                i += 1;
                            }
                            Some(decode_entities(&input[start..i]))
                        }
                    }
                } else {
                    None
                };
                attributes.push((attribute, value));
            }
        }
    }

    Some((
        Tag {
            name,
            closing,
            attributes,
        },
        &input[i..],
    ))
}

fn skip_past_end_tag<'a>(input: &'a str, name: &str) -> &'a str {
    let lower = input.to_ascii_lowercase();
    let Some(start) = lower.find(&format!("</{name}")) else {
        return "";
    };
    match lower[start..].find('>') {
        Some(end) => &input[start + end + 1..],
        None => "",
    }
}

fn write_tag(tag: &Tag, out: &mut String) {
    let void = matches!(tag.name.as_str(), "br" | "hr");
    if tag.closing {
        if !void {
            out.push_str("</");
            out.push_str(&tag.name);
            out.push('>');
        }
        return;
    }

    out.push('<');
    out.push_str(&tag.name);
    for (name, value) in &tag.attributes {
        if !attribute_allowed(&tag.name, name, value.as_deref()) {
            continue;
        }
        out.push(' ');
        out.push_str(name);
        if let Some(value) = value {
            out.push_str("=\"");
            out.push_str(&encode_entities(value));
            out.push('"');
        }
    }
    out.push_str(if void { " />" } else { ">" });
}

fn attribute_allowed(tag: &str, name: &str, value: Option<&str>) -> bool {
    let listed = ALLOWED_ATTRIBUTES
        .iter()
        .any(|(t, names)| *t == tag && names.contains(&name));
    if !listed {
        return false;
    }
    match (name, value) {
        ("href" | "src", Some(url)) => has_allowed_scheme(url),
        _ => true,
    }
}

/// Relative URLs are allowed; absolute ones need a listed scheme.
fn has_allowed_scheme(url: &str) -> bool {
    let url: String = url
        .chars()
        .filter(|c| !c.is_ascii_control() && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match url.find([':', '/', '?', '#']) {
        Some(i) if url.as_bytes()[i] == b':' => ALLOWED_SCHEMES.contains(&&url[..i]),
        _ => true,
    }
}
