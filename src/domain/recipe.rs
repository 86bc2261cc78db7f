//! Recipe entity and its factory

use crate::domain::category::Category;
use crate::domain::entity::{EntityMeta, EntityState};
use crate::domain::values::{AggregateRating, Author, Ingredient, RecipeUrl, WebUrl};
use crate::domain::vendor::Vendor;
use crate::{ValidationError, ValidationResult};
use chrono::NaiveDate;
use std::fmt;
use uuid::Uuid;

const ENTITY: &str = "Recipe";

/// Raw recipe fields as extracted from a page, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub name: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: String,
    pub author: Option<String>,
    pub date_published: NaiveDate,
    pub rating: Option<AggregateRating>,
}

/// A recipe published by a vendor within one of its categories
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    meta: EntityMeta,
    vendor_id: Uuid,
    category_id: Uuid,
    name: String,
    description: String,
    url: RecipeUrl,
    image_url: Option<WebUrl>,
    ingredients: Vec<Ingredient>,
    instructions: String,
    author: Option<Author>,
    date_published: NaiveDate,
    rating: Option<AggregateRating>,
}

impl Recipe {
    /// Validates `new` and creates a recipe of `vendor` in `category`
    ///
    /// # Arguments
    /// * `new` - Raw recipe fields
    /// * `vendor` - Vendor the recipe was crawled from
    /// * `category` - Category of `vendor` the recipe was listed in
    ///
    /// # Returns
    /// The recipe, or the first validation failure: the URL must match the
    /// vendor's recipe pattern and the category must belong to the vendor.
    pub fn create(new: NewRecipe, vendor: &Vendor, category: &Category) -> ValidationResult<Self> {
        if !vendor.state().is_active() {
            return Err(ValidationError::Discarded {
                entity: "Vendor",
                id: vendor.id(),
            });
        }
        if !category.state().is_active() {
            return Err(ValidationError::Discarded {
                entity: "Category",
                id: category.id(),
            });
        }
        if category.vendor_id() != vendor.id() {
            return Err(ValidationError::ForeignCategory {
                category: category.name().to_string(),
                vendor: vendor.name().to_string(),
            });
        }

        let name = new.name.trim();
        if name.is_empty() {
            return Err(ValidationError::field(ENTITY, "name", "must not be empty"));
        }

        let url = RecipeUrl::new(&new.url, vendor.recipe_pattern())?;

        let image_url = match new.image_url.as_deref().map(str::trim) {
            Some(image) if !image.is_empty() => Some(WebUrl::parse(ENTITY, image)?),
            _ => None,
        };

        let ingredients = new
            .ingredients
            .into_iter()
            .map(Ingredient::new)
            .collect::<ValidationResult<Vec<_>>>()?;

        let author = match new.author {
            Some(author) if !author.trim().is_empty() => Some(Author::new(author)?),
            _ => None,
        };

        Ok(Self {
            meta: EntityMeta::new(),
            vendor_id: vendor.id(),
            category_id: category.id(),
            name: name.to_string(),
            description: new.description,
            url,
            image_url,
            ingredients,
            instructions: new.instructions,
            author,
            date_published: new.date_published,
            rating: new.rating,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        meta: EntityMeta,
        vendor_id: Uuid,
        category_id: Uuid,
        name: String,
        description: String,
        url: RecipeUrl,
        image_url: Option<WebUrl>,
        ingredients: Vec<Ingredient>,
        instructions: String,
        author: Option<Author>,
        date_published: NaiveDate,
        rating: Option<AggregateRating>,
    ) -> Self {
        Self {
            meta,
            vendor_id,
            category_id,
            name,
            description,
            url,
            image_url,
            ingredients,
            instructions,
            author,
            date_published,
            rating,
        }
    }

    pub fn id(&self) -> Uuid {
        self.meta.id()
    }

    pub fn version(&self) -> u32 {
        self.meta.version()
    }

    pub fn state(&self) -> EntityState {
        self.meta.state()
    }

    pub fn vendor_id(&self) -> Uuid {
        self.vendor_id
    }

    pub fn category_id(&self) -> Uuid {
        self.category_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn url(&self) -> &RecipeUrl {
        &self.url
    }

    pub fn image_url(&self) -> Option<&WebUrl> {
        self.image_url.as_ref()
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    pub fn date_published(&self) -> NaiveDate {
        self.date_published
    }

    pub fn rating(&self) -> Option<AggregateRating> {
        self.rating
    }

    pub fn discard(&mut self) {
        self.meta.discard();
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}
