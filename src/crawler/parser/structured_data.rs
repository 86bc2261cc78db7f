//! JSON-LD recipe extraction
//!
//! Recipe pages embed a schema.org `Recipe` object in one of their
//! `<script type="application/ld+json">` blocks. The block may hold a single
//! object, an array of objects or an `@graph`, and several fields come in
//! more than one shape (string, array, nested object).

use crate::domain::{AggregateRating, NewRecipe};
use crate::{ValidationError, ValidationResult};
use chrono::NaiveDate;
use scraper::{Html, Selector};
use serde_json::{Map, Value};

const ENTITY: &str = "Recipe";

/// Finds the first JSON-LD object whose `@type` is or contains `Recipe`
///
/// A block that is not valid JSON is an error unless another block on the
/// page holds a recipe.
pub(super) fn find_recipe_block(document: &Html) -> Result<Option<Value>, String> {
    let selector = match Selector::parse(r#"script[type="application/ld+json"]"#) {
        Ok(selector) => selector,
        Err(e) => return Err(e.to_string()),
    };

    let mut malformed = None;

    for element in document.select(&selector) {
        let text: String = element.text().collect();
        if text.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => {
                if let Some(recipe) = find_recipe(value) {
                    return Ok(Some(recipe));
                }
            }
            Err(e) => {
                tracing::debug!("Skipping malformed structured data block: {}", e);
                malformed.get_or_insert_with(|| e.to_string());
            }
        }
    }

    match malformed {
        Some(reason) => Err(reason),
        None => Ok(None),
    }
}

fn find_recipe(value: Value) -> Option<Value> {
    match value {
        Value::Array(items) => items.into_iter().find_map(find_recipe),
        Value::Object(mut object) => {
            if is_recipe(&object) {
                return Some(Value::Object(object));
            }
            object.remove("@graph").and_then(find_recipe)
        }
        _ => None,
    }
}

fn is_recipe(object: &Map<String, Value>) -> bool {
    match object.get("@type") {
        Some(Value::String(kind)) => kind == "Recipe",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("Recipe")),
        _ => false,
    }
}

/// Maps a JSON-LD recipe object to raw recipe fields
///
/// Fields of an unexpected JSON type are rejected. `url` is the page the
/// block was found on.
pub(super) fn to_new_recipe(block: &Value, url: &str) -> ValidationResult<NewRecipe> {
    let name = match block.get("name") {
        Some(Value::String(name)) => name.clone(),
        Some(_) => return Err(wrong_type("name", "a string")),
        None => return Err(ValidationError::field(ENTITY, "name", "is missing")),
    };

    Ok(NewRecipe {
        name,
        description: optional_string(block, "description")?.unwrap_or_default(),
        url: url.to_string(),
        image_url: image(block.get("image"))?,
        ingredients: ingredients(block.get("recipeIngredient"))?,
        instructions: instructions(block.get("recipeInstructions"))?,
        author: author(block.get("author"))?,
        date_published: date_published(block.get("datePublished"))?,
        rating: rating(block.get("aggregateRating"))?,
    })
}

fn wrong_type(field: &'static str, expected: &str) -> ValidationError {
    ValidationError::field(ENTITY, field, format!("must be {}", expected))
}

fn optional_string(block: &Value, field: &'static str) -> ValidationResult<Option<String>> {
    match block.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(wrong_type(field, "a string")),
    }
}

fn image(value: Option<&Value>) -> ValidationResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(url)) => Ok(Some(url.clone())),
        Some(Value::Array(images)) => match images.first() {
            Some(first) => image(Some(first)),
            None => Ok(None),
        },
        Some(Value::Object(object)) => image(object.get("url")),
        Some(_) => Err(wrong_type("image", "a URL, a list of URLs or an ImageObject")),
    }
}

fn ingredients(value: Option<&Value>) -> ValidationResult<Vec<String>> {
    let items = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(wrong_type("recipeIngredient", "a list of strings")),
    };

    let mut ingredients = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(text) if text.trim().is_empty() => {}
            Value::String(text) => ingredients.push(text.clone()),
            _ => return Err(wrong_type("recipeIngredient", "a list of strings")),
        }
    }
    Ok(ingredients)
}

/// Flattens instructions given as text, HowToStep or HowToSection lists
fn instructions(value: Option<&Value>) -> ValidationResult<String> {
    let mut steps = Vec::new();
    collect_steps(value, &mut steps)?;
    Ok(steps.join("\n"))
}

fn collect_steps(value: Option<&Value>, steps: &mut Vec<String>) -> ValidationResult<()> {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(text)) => {
            let text = text.trim();
            if !text.is_empty() {
                steps.push(text.to_string());
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                collect_steps(Some(item), steps)?;
            }
        }
        Some(Value::Object(object)) => {
            if let Some(elements) = object.get("itemListElement") {
                collect_steps(Some(elements), steps)?;
            } else {
                collect_steps(object.get("text"), steps)?;
            }
        }
        Some(_) => return Err(wrong_type("recipeInstructions", "text or a list of steps")),
    }
    Ok(())
}

fn author(value: Option<&Value>) -> ValidationResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => Ok(Some(name.clone())),
        Some(Value::Array(authors)) => match authors.first() {
            Some(first) => author(Some(first)),
            None => Ok(None),
        },
        Some(Value::Object(object)) => match object.get("name") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(name)) => Ok(Some(name.clone())),
            Some(_) => Err(wrong_type("author", "a Person with a name")),
        },
        Some(_) => Err(wrong_type("author", "a Person with a name")),
    }
}

/// Reads `YYYY-MM-DD` from the start of the value, ignoring any time part
fn date_published(value: Option<&Value>) -> ValidationResult<NaiveDate> {
    let raw = match value {
        Some(Value::String(raw)) => raw.trim(),
        Some(_) => return Err(wrong_type("datePublished", "a date string")),
        None => {
            return Err(ValidationError::field(
                ENTITY,
                "datePublished",
                "is missing",
            ))
        }
    };

    let date = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
        ValidationError::field(
            ENTITY,
            "datePublished",
            format!("'{}' is not a date: {}", raw, e),
        )
    })
}

fn rating(value: Option<&Value>) -> ValidationResult<Option<AggregateRating>> {
    let object = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(object)) => object,
        Some(_) => return Err(wrong_type("aggregateRating", "an AggregateRating")),
    };

    let Some(rating_value) = number(object.get("ratingValue"), "aggregateRating")? else {
        return Ok(None);
    };

    let count = number(object.get("ratingCount"), "aggregateRating")?
        .or(number(object.get("reviewCount"), "aggregateRating")?)
        .unwrap_or(0.0);

    if count < 0.0 || count.fract() != 0.0 || count > f64::from(u32::MAX) {
        return Err(ValidationError::field(
            "AggregateRating",
            "count",
            format!("must be a non-negative integer, got {}", count),
        ));
    }

    AggregateRating::new(count as u32, rating_value).map(Some)
}

/// Reads a JSON number, also accepting numeric strings like "4.49"
fn number(value: Option<&Value>, field: &'static str) -> ValidationResult<Option<f64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .map(Some)
            .map_err(|_| wrong_type(field, "numeric")),
        Some(_) => Err(wrong_type(field, "numeric")),
    }
}
