use crate::domain::category::Category;
use chrono::NaiveDate;
use std::hash::{Hash, Hasher};
use url::Url;

/// One entry of a category's recipe listing page
///
/// Two items are equal when they point at the same URL, were listed in the
/// same category (by id) and carry the same publication date.
#[derive(Debug, Clone)]
pub struct RecipeOverviewItem {
    pub url: Url,
    pub category: Category,
    pub published: NaiveDate,
}

impl RecipeOverviewItem {
    pub fn new(url: Url, category: Category, published: NaiveDate) -> Self {
        Self {
            url,
            category,
            published,
        }
    }
}

impl PartialEq for RecipeOverviewItem {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.category.id() == other.category.id()
            && self.published == other.published
    }
}

impl Eq for RecipeOverviewItem {}

impl Hash for RecipeOverviewItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
        self.category.id().hash(state);
        self.published.hash(state);
    }
}
