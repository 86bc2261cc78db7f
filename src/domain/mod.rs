//! Domain model of the recipe catalog
//!
//! This module contains the entities filled by the crawler:
//! - [`Vendor`]: an external recipe website owning its categories
//! - [`Category`]: a vendor-scoped grouping of recipes
//! - [`Recipe`]: one recipe, validated against its vendor and category
//! - [`RecipeOverviewItem`]: a listing entry used to detect new recipes
//!
//! Entities are constructed through validating factories and carry an
//! [`EntityMeta`] with id, version and lifecycle state.

mod category;
mod entity;
mod overview;
mod recipe;
mod values;
mod vendor;

pub use category::Category;
pub use entity::{EntityMeta, EntityState};
pub use overview::RecipeOverviewItem;
pub use recipe::{NewRecipe, Recipe};
pub use values::{AggregateRating, Author, Ingredient, RecipePattern, RecipeUrl, WebUrl};
pub use vendor::{ScraperKind, Vendor};
