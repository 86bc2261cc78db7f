use crate::domain::entity::{EntityMeta, EntityState};
use crate::domain::values::WebUrl;
use crate::domain::vendor::Vendor;
use crate::{ValidationError, ValidationResult};
use uuid::Uuid;

const ENTITY: &str = "Category";

/// A vendor-scoped grouping of recipes, e.g. "Party"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    meta: EntityMeta,
    name: String,
    url: WebUrl,
    vendor_id: Uuid,
}

impl Category {
    /// Creates a category belonging to `vendor`
    ///
    /// The category is not added to the vendor; use
    /// [`Vendor::add_category`] once it has been stored.
    pub fn create(name: &str, url: &str, vendor: &Vendor) -> ValidationResult<Self> {
        vendor_is_active(vendor)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::field(ENTITY, "name", "must not be empty"));
        }

        Ok(Self {
            meta: EntityMeta::new(),
            name: name.to_string(),
            url: WebUrl::parse(ENTITY, url)?,
            vendor_id: vendor.id(),
        })
    }

    pub(crate) fn restore(meta: EntityMeta, name: String, url: WebUrl, vendor_id: Uuid) -> Self {
        Self {
            meta,
            name,
            url,
            vendor_id,
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

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &WebUrl {
        &self.url
    }

    pub fn vendor_id(&self) -> Uuid {
        self.vendor_id
    }

    pub fn rename(&mut self, name: &str) -> ValidationResult<()> {
        self.meta.ensure_active(ENTITY)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::field(ENTITY, "name", "must not be empty"));
        }
        self.name = name.to_string();
        Ok(())
    }

    pub fn discard(&mut self) {
        self.meta.discard();
    }
}

fn vendor_is_active(vendor: &Vendor) -> ValidationResult<()> {
    if vendor.state().is_active() {
        Ok(())
    } else {
        Err(ValidationError::Discarded {
            entity: "Vendor",
            id: vendor.id(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScraperKind;

    fn vendor() -> Vendor {
        Vendor::create(
            "Chefkoch",
            "",
            "https://www.chefkoch.de",
            "https://www.chefkoch.de/rezepte/kategorien/",
            "",
            ScraperKind::Chefkoch,
        )
        .unwrap()
    }

    #[test]
    fn test_create_category() {
        let vendor = vendor();
        let category =
            Category::create(" Party ", "https://www.chefkoch.de/rs/s0g119/Partyrezepte.html", &vendor)
                .unwrap();

        assert_eq!(category.name(), "Party");
        assert_eq!(category.vendor_id(), vendor.id());
        assert_eq!(
            category.url().as_str(),
            "https://www.chefkoch.de/rs/s0g119/Partyrezepte.html"
        );
    }

    #[test]
    fn test_create_category_invalid_url() {
        let vendor = vendor();
        let result = Category::create("Party", "/rs/s0g119/Partyrezepte.html", &vendor);
        assert!(matches!(
            result,
            Err(ValidationError::InvalidUrl {
                entity: "Category",
                ..
            })
        ));
    }

    #[test]
    fn test_create_category_for_discarded_vendor() {
        let mut vendor = vendor();
        vendor.discard();
        let result = Category::create("Party", "https://www.chefkoch.de/rs/s0g119/x.html", &vendor);
        assert!(matches!(result, Err(ValidationError::Discarded { .. })));
    }

    #[test]
    fn test_rename() {
        let vendor = vendor();
        let mut category =
            Category::create("Party", "https://www.chefkoch.de/rs/s0g119/x.html", &vendor).unwrap();

        category.rename("Partyrezepte").unwrap();
        assert_eq!(category.name(), "Partyrezepte");
        assert!(category.rename("").is_err());

        category.discard();
        assert!(category.rename("Feiern").is_err());
    }
}
