use url::Url;

/// Turns a possibly-relative `src`/`href` into an absolute URL
///
/// # Rules
///
/// | Input | Output |
/// |-------|--------|
/// | empty | empty |
/// | starts with a scheme (`https:`, `data:`, ...) | unchanged |
/// | starts with `//` | prefixed with `https:` |
/// | anything else | resolved against `base_url` |
///
/// Surrounding ASCII whitespace is stripped first, as browsers do for
/// attribute URLs. A reference that cannot be resolved becomes empty.
///
/// # Example
///
/// ```
/// use page_harvest::extract::to_absolute_url;
///
/// assert_eq!(
///     to_absolute_url("/a.png", "https://site.com/p"),
///     "https://site.com/a.png"
/// );
/// ```
pub fn to_absolute_url(raw: &str, base_url: &str) -> String {
    let base = Url::parse(base_url).ok();
    resolve(raw, base.as_ref())
}

/// Same as [`to_absolute_url`] with the base already parsed
pub(crate) fn resolve(raw: &str, base: Option<&Url>) -> String {
    let raw = raw.trim_matches(|c: char| c.is_ascii_whitespace());

    if raw.is_empty() {
        return String::new();
    }

    if has_scheme(raw) {
        return raw.to_string();
    }

    if raw.starts_with("//") {
        return format!("https:{}", raw);
    }

    match base.map(|base| base.join(raw)) {
        Some(Ok(absolute)) => absolute.to_string(),
        _ => String::new(),
    }
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"` prefix
fn has_scheme(raw: &str) -> bool {
    let Some((scheme, _)) = raw.split_once(':') else {
        return false;
    };

    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}
