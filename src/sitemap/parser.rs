use super::SitemapError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// The two sitemap shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<urlset>`: page URLs in document order
    UrlSet(Vec<String>),
    /// `<sitemapindex>`: child sitemap URLs in document order
    Index(Vec<String>),
}

impl SitemapDocument {
    pub fn locations(&self) -> &[String] {
        match self {
            Self::UrlSet(locs) | Self::Index(locs) => locs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    UrlSet,
    Index,
}

/// Parses a sitemap or sitemap index
///
/// Element names are matched by local name, so prefixed and default
/// namespaces both work. `loc` values may be plain text or CDATA; they are
/// trimmed and empty ones are skipped. Elements other than `loc` inside an
/// entry (`lastmod`, `priority`, image extensions, ...) are ignored.
///
/// # Errors
///
/// * `SitemapError::Xml` - The document is not well-formed
/// * `SitemapError::UnexpectedRoot` - The root is neither `urlset` nor `sitemapindex`
/// * `SitemapError::Empty` - The document has no root element
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut root: Option<Root> = None;
    let mut locs = Vec::new();

    // Open element path below the root
    let mut path: Vec<String> = Vec::new();
    let mut current_loc = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if root.is_none() {
                    root = Some(match name.as_str() {
                        "urlset" => Root::UrlSet,
                        "sitemapindex" => Root::Index,
                        _ => return Err(SitemapError::UnexpectedRoot(name)),
                    });
                    buf.clear();
                    continue;
                }
                if name == "loc" {
                    current_loc.clear();
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                if root.is_none() {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    return match name.as_str() {
                        "urlset" => Ok(SitemapDocument::UrlSet(Vec::new())),
                        "sitemapindex" => Ok(SitemapDocument::Index(Vec::new())),
                        _ => Err(SitemapError::UnexpectedRoot(name)),
                    };
                }
            }
            Ok(Event::End(_)) => {
                if let Some(name) = path.pop() {
                    if name == "loc" && in_entry(&path, root) {
                        let loc = current_loc.trim();
                        if !loc.is_empty() {
                            locs.push(loc.to_string());
                        }
                        current_loc.clear();
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if is_loc(&path, root) {
                    let text = e
                        .unescape()
                        .map_err(|err| SitemapError::Xml(err.to_string()))?;
                    current_loc.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if is_loc(&path, root) {
                    current_loc.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SitemapError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    match root {
        Some(Root::UrlSet) => Ok(SitemapDocument::UrlSet(locs)),
        Some(Root::Index) => Ok(SitemapDocument::Index(locs)),
        None => Err(SitemapError::Empty),
    }
}

/// True when the innermost open element is the `loc` of an entry
fn is_loc(path: &[String], root: Option<Root>) -> bool {
    match path.split_last() {
        Some((last, parents)) => last == "loc" && in_entry(parents, root),
        None => false,
    }
}

/// True when `path` is exactly one entry element (`url` or `sitemap`)
fn in_entry(path: &[String], root: Option<Root>) -> bool {
    match (path, root) {
        ([entry], Some(Root::UrlSet)) => entry == "url",
        ([entry], Some(Root::Index)) => entry == "sitemap",
        _ => false,
    }
}
