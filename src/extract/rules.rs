//! Declarative selector tables for record extraction
//!
//! Each record kind is described by a table of `{ role, selector }` pairs. The
//! extractor compiles a table once per pass and never inspects selectors itself.

use scraper::{ElementRef, Selector};

/// What a selector contributes to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Elements that start a new candidate record
    Container,
    /// Product name or article title
    Title,
    /// Displayed price; candidates are filtered through [`is_live_price`]
    Price,
    /// `img` whose `src` becomes the record image
    Image,
    /// `a` whose `href` becomes the record URL
    Link,
}

/// One row of a rule table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub role: Role,
    pub selector: &'static str,
}

pub const PRODUCT_RULES: &[Rule] = &[
    Rule {
        role: Role::Container,
        selector: r#"div[class*="product"], li[class*="product"]"#,
    },
    Rule {
        role: Role::Title,
        selector: "h2, h3, .product-title, .title",
    },
    Rule {
        role: Role::Price,
        selector: r#".price, .product-price, [class*="price"]"#,
    },
    Rule {
        role: Role::Image,
        selector: "img",
    },
    Rule {
        role: Role::Link,
        selector: "a",
    },
];

pub const ARTICLE_RULES: &[Rule] = &[
    Rule {
        role: Role::Container,
        selector: r#"div[class*="article"], li[class*="article"], div[class*="post"], li[class*="post"], article"#,
    },
    Rule {
        role: Role::Title,
        selector: "h2, h3, .article-title, .post-title, .title",
    },
    Rule {
        role: Role::Image,
        selector: "img",
    },
    Rule {
        role: Role::Link,
        selector: "a",
    },
];

/// Class fragments that mark a crossed-out original price
const STRUCK_CLASS_FRAGMENTS: &[&str] = &["old", "original", "strike", "gach"];

/// Elements that render their content struck through
const STRUCK_TAGS: &[&str] = &["del", "s", "strike"];

/// A rule table with its selectors parsed
#[derive(Debug)]
pub struct CompiledRules {
    pub container: Selector,
    pub title: Selector,
    pub price: Option<Selector>,
    pub image: Option<Selector>,
    pub link: Option<Selector>,
}

impl CompiledRules {
    /// Compiles a rule table
    ///
    /// Returns `None` when the table lacks a container or title rule, or when a
    /// required selector does not parse; optional roles that fail to parse are
    /// simply absent.
    pub fn compile(rules: &[Rule]) -> Option<Self> {
        let find = |role: Role| {
            rules
                .iter()
                .find(|rule| rule.role == role)
                .and_then(|rule| Selector::parse(rule.selector).ok())
        };

        Some(Self {
            container: find(Role::Container)?,
            title: find(Role::Title)?,
            price: find(Role::Price),
            image: find(Role::Image),
            link: find(Role::Link),
        })
    }
}

/// Decides whether a price node shows the price a buyer pays
///
/// Rejects nodes that are styled or classed as the crossed-out original
/// price, absolutely positioned badges, and anything inside a `del`/`s`/`strike`
/// element between the node and its `card`.
pub fn is_live_price(node: ElementRef<'_>, card: ElementRef<'_>) -> bool {
    if is_struck(node) {
        return false;
    }

    if style_of(node).is_some_and(|style| style.contains("position:absolute")) {
        return false;
    }

    for ancestor in node.ancestors() {
        if ancestor == *card {
            break;
        }
        if let Some(parent) = ElementRef::wrap(ancestor) {
            if STRUCK_TAGS.contains(&parent.value().name()) {
                return false;
            }
        }
    }

    true
}

/// Text of a price node with struck-through descendants left out
///
/// A wrapper such as `<span class="price"><del>100</del> <ins>80</ins></span>`
/// reads as `80`.
pub fn live_text(node: ElementRef<'_>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        let Some(fragment) = descendant.value().as_text() else {
            continue;
        };
        let struck = descendant
            .ancestors()
            .take_while(|ancestor| *ancestor != *node)
            .filter_map(ElementRef::wrap)
            .any(is_struck);
        if !struck {
            text.push_str(fragment);
        }
    }
    text
}

/// Tag, inline style or class marks the element as a crossed-out price
fn is_struck(element: ElementRef<'_>) -> bool {
    if STRUCK_TAGS.contains(&element.value().name()) {
        return true;
    }

    if style_of(element).is_some_and(|style| style.contains("line-through")) {
        return true;
    }

    element.value().attr("class").is_some_and(|class| {
        let class = class.to_ascii_lowercase();
        STRUCK_CLASS_FRAGMENTS
            .iter()
            .any(|fragment| class.contains(fragment))
    })
}

/// Inline style, lowercased with whitespace removed
fn style_of(element: ElementRef<'_>) -> Option<String> {
    element.value().attr("style").map(|style| {
        style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase()
    })
}
