//! Structural record extraction
//!
//! This module turns sanitized page markup into product and article records:
//! - Candidate containers are found through the rule tables in [`rules`]
//! - Names, prices, images and links are read from each container's descendants
//! - Relative URLs are resolved against the page URL
//! - Records without a URL are dropped and repeated URLs collapse to the first
//!
//! Extraction is a pure function of its inputs and never fails; markup that
//! matches nothing yields an empty [`Extraction`].

mod normalize;
pub mod rules;

pub use normalize::to_absolute_url;

use crate::model::{ArticleRecord, ProductRecord};
use rules::{is_live_price, live_text, CompiledRules, ARTICLE_RULES, PRODUCT_RULES};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Records extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub products: Vec<ProductRecord>,
    pub articles: Vec<ArticleRecord>,
}

impl Extraction {
    /// True when both kinds fall below their thresholds
    pub fn under_yields(&self, min_products: usize, min_articles: usize) -> bool {
        self.products.len() < min_products && self.articles.len() < min_articles
    }

    /// Appends records obtained elsewhere (e.g. a remote classifier)
    ///
    /// Incoming records are URL-normalized against `base_url`, nameless ones are
    /// discarded, and the combined lists are deduplicated by URL so that records
    /// already present keep precedence.
    pub fn absorb(&mut self, other: Extraction, base_url: &str) {
        let base = Url::parse(base_url).ok();

        let products = other
            .products
            .into_iter()
            .map(|p| ProductRecord {
                name: collapse_whitespace(&p.name),
                price: collapse_whitespace(&p.price),
                image: normalize::resolve(&p.image, base.as_ref()),
                url: normalize::resolve(&p.url, base.as_ref()),
            })
            .filter(|p| !p.name.is_empty());
        let articles = other
            .articles
            .into_iter()
            .map(|a| ArticleRecord {
                title: collapse_whitespace(&a.title),
                url: normalize::resolve(&a.url, base.as_ref()),
                image: normalize::resolve(&a.image, base.as_ref()),
            })
            .filter(|a| !a.title.is_empty());

        let mut all_products = std::mem::take(&mut self.products);
        all_products.extend(products);
        self.products = dedup_by_url(all_products, |p| &p.url);

        let mut all_articles = std::mem::take(&mut self.articles);
        all_articles.extend(articles);
        self.articles = dedup_by_url(all_articles, |a| &a.url);
    }
}

/// Extracts product and article records from page markup
///
/// # Arguments
///
/// * `html` - Sanitized page markup (a full document or a body fragment)
/// * `base_url` - The page URL, used to resolve relative `src`/`href` values
///
/// # Example
///
/// ```
/// use page_harvest::extract::extract_records;
///
/// let html = r#"<div class="product-item">
///     <h3>Desk Lamp</h3>
///     <span class="price">$20</span>
///     <a href="/lamp">View</a>
/// </div>"#;
/// let extraction = extract_records(html, "https://shop.example/");
/// assert_eq!(extraction.products[0].name, "Desk Lamp");
/// assert_eq!(extraction.products[0].url, "https://shop.example/lamp");
/// ```
pub fn extract_records(html: &str, base_url: &str) -> Extraction {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok();

    let products = match CompiledRules::compile(PRODUCT_RULES) {
        Some(rules) => extract_products(&document, &rules, base.as_ref()),
        None => Vec::new(),
    };
    let articles = match CompiledRules::compile(ARTICLE_RULES) {
        Some(rules) => extract_articles(&document, &rules, base.as_ref()),
        None => Vec::new(),
    };

    tracing::debug!(
        "Extracted {} products and {} articles from {}",
        products.len(),
        articles.len(),
        base_url
    );

    Extraction {
        products: dedup_by_url(products, |p| &p.url),
        articles: dedup_by_url(articles, |a| &a.url),
    }
}

fn extract_products(
    document: &Html,
    rules: &CompiledRules,
    base: Option<&Url>,
) -> Vec<ProductRecord> {
    document
        .select(&rules.container)
        .filter_map(|card| {
            let name = first_text(card, &rules.title)?;
            let price = rules
                .price
                .as_ref()
                .map(|selector| live_price(card, selector))
                .unwrap_or_default();

            Some(ProductRecord {
                name,
                price,
                image: first_attr(card, rules.image.as_ref(), "src", base),
                url: first_attr(card, rules.link.as_ref(), "href", base),
            })
        })
        .collect()
}

fn extract_articles(
    document: &Html,
    rules: &CompiledRules,
    base: Option<&Url>,
) -> Vec<ArticleRecord> {
    document
        .select(&rules.container)
        .filter_map(|card| {
            let title = first_text(card, &rules.title)?;

            Some(ArticleRecord {
                title,
                url: first_attr(card, rules.link.as_ref(), "href", base),
                image: first_attr(card, rules.image.as_ref(), "src", base),
            })
        })
        .collect()
}

/// Text of the first matching descendant, if non-empty
fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// First price node that is live and carries live text
fn live_price(card: ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector)
        .filter(|node| is_live_price(*node, card))
        .map(|node| collapse_whitespace(&live_text(node)))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// Normalized attribute of the first matching descendant
fn first_attr(
    card: ElementRef<'_>,
    selector: Option<&Selector>,
    attr: &str,
    base: Option<&Url>,
) -> String {
    selector
        .and_then(|selector| card.select(selector).next())
        .and_then(|element| element.value().attr(attr))
        .map(|raw| normalize::resolve(raw, base))
        .unwrap_or_default()
}

fn element_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops records without a URL and keeps the first record per URL
pub(crate) fn dedup_by_url<T>(records: Vec<T>, url_of: impl Fn(&T) -> &str) -> Vec<T> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let url = url_of(record);
            !url.is_empty() && seen.insert(url.to_string())
        })
        .collect()
}
