use crate::model::{ArticleRecord, PageResult, ProductRecord};
use indexmap::IndexMap;

/// Cross-page record set for one crawl
///
/// Records are keyed by their identity key (lower-cased `name|url` or
/// `title|url`). The first record seen for a key is kept and later ones are
/// dropped, and insertion order is preserved so the finalized lists follow
/// page order.
#[derive(Debug, Default)]
pub struct CrawlAggregate {
    products: IndexMap<String, ProductRecord>,
    articles: IndexMap<String, ArticleRecord>,
    offered: usize,
}

impl CrawlAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a product unless its identity key is already present
    ///
    /// Returns `true` when the record was inserted.
    pub fn offer_product(&mut self, product: ProductRecord) -> bool {
        self.offered += 1;
        let key = product.identity_key();
        if self.products.contains_key(&key) {
            return false;
        }
        self.products.insert(key, product);
        true
    }

    /// Adds an article unless its identity key is already present
    ///
    /// Returns `true` when the record was inserted.
    pub fn offer_article(&mut self, article: ArticleRecord) -> bool {
        self.offered += 1;
        let key = article.identity_key();
        if self.articles.contains_key(&key) {
            return false;
        }
        self.articles.insert(key, article);
        true
    }

    /// Folds one page's records into the aggregate
    ///
    /// Returns the number of records that were new.
    pub fn absorb(&mut self, page: PageResult) -> usize {
        let offered = page.products.len() + page.articles.len();
        let mut added = 0;
        for product in page.products {
            if self.offer_product(product) {
                added += 1;
            }
        }
        for article in page.articles {
            if self.offer_article(article) {
                added += 1;
            }
        }
        tracing::debug!(
            "{} of {} records from {} are new ({} held)",
            added,
            offered,
            page.source_url,
            self.len()
        );
        added
    }

    /// Number of distinct records held
    pub fn len(&self) -> usize {
        self.products.len() + self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records offered so far, duplicates included
    pub fn offered(&self) -> usize {
        self.offered
    }

    /// Converts into ordered product and article lists
    pub fn finalize(self) -> (Vec<ProductRecord>, Vec<ArticleRecord>) {
        (
            self.products.into_values().collect(),
            self.articles.into_values().collect(),
        )
    }
}
