use anyhow::{Result, bail};
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog;
use crate::quantity::{need_quantity, parse_quantity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PantryIngredient {
    pub id: String,
    pub name: String,
    pub quantity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl RecipeIngredient {
    #[must_use]
    pub fn need(&self) -> f64 {
        need_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_dish_image"
    )]
    pub image_key: Option<DishImage>,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub quantity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
}

impl ShoppingItem {
    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.checked.unwrap_or(false)
    }
}

/// Icon tag shown next to a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DishImage {
    Cake,
    Eggs,
    Noodles,
    Salad,
    Pizza,
    Bento,
}

pub const DISH_IMAGES: &[DishImage] = &[
    DishImage::Cake,
    DishImage::Eggs,
    DishImage::Noodles,
    DishImage::Salad,
    DishImage::Pizza,
    DishImage::Bento,
];

impl DishImage {
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Cake => "cake",
            Self::Eggs => "eggs",
            Self::Noodles => "noodles",
            Self::Salad => "salad",
            Self::Pizza => "pizza",
            Self::Bento => "bento",
        }
    }

    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Cake => "🍰",
            Self::Eggs => "🍳",
            Self::Noodles => "🍜",
            Self::Salad => "🥗",
            Self::Pizza => "🍕",
            Self::Bento => "🍱",
        }
    }

    pub fn parse(key: &str) -> Result<Self> {
        let lower = key.trim().to_lowercase();
        match DISH_IMAGES.iter().find(|d| d.key() == lower) {
            Some(d) => Ok(*d),
            None => {
                let valid: Vec<&str> = DISH_IMAGES.iter().map(|d| d.key()).collect();
                bail!(
                    "Invalid dish image '{key}'. Must be one of: {}",
                    valid.join(", ")
                )
            }
        }
    }
}

/// Emoji for an optional tag, with the plate fallback for recipes without one.
#[must_use]
pub fn dish_emoji(image: Option<DishImage>) -> &'static str {
    image.map_or("🍽️", DishImage::emoji)
}

// Unknown tags (e.g. from other app builds) deserialize as None.
fn lenient_dish_image<'de, D>(deserializer: D) -> Result<Option<DishImage>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| DishImage::parse(&s).ok()))
}

// --- Input types ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecipe {
    pub title: String,
    #[serde(default)]
    pub image_key: Option<DishImage>,
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePantryIngredient {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShoppingItem {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
}

// --- Export / Import ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub version: u32,
    pub exported_at: String,
    #[serde(default)]
    pub pantry: Vec<PantryIngredient>,
    #[serde(default)]
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub shopping: Vec<ShoppingItem>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub pantry: usize,
    pub recipes: usize,
    pub shopping: usize,
}

// --- Validation ---

/// Gate for guided-entry flows: the name must be in the ingredient catalog.
/// Returns the catalog's canonical key.
pub fn validate_catalog_name(name: &str) -> Result<String> {
    match catalog::canonical_name(name) {
        Some(key) => Ok(key.to_string()),
        None => bail!("Unknown ingredient '{}'. Pick one from the catalog", name.trim()),
    }
}

pub fn validate_positive_quantity(raw: &str) -> Result<f64> {
    let qty = parse_quantity(raw);
    if qty <= 0.0 {
        bail!("Invalid quantity '{}'. Enter a number greater than 0", raw.trim());
    }
    Ok(qty)
}

/// Checks title and ingredients, and canonicalises ingredient names and needs.
pub fn validate_recipe(recipe: &NewRecipe) -> Result<NewRecipe> {
    let title = recipe.title.trim();
    if title.is_empty() {
        bail!("Recipe title cannot be empty");
    }
    if recipe.ingredients.is_empty() {
        bail!("Add at least 1 ingredient");
    }
    let ingredients = recipe
        .ingredients
        .iter()
        .map(|ing| {
            Ok(RecipeIngredient {
                name: validate_catalog_name(&ing.name)?,
                quantity: Some(ing.need()),
                unit: ing
                    .unit
                    .as_deref()
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(str::to_lowercase),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(NewRecipe {
        title: title.to_string(),
        image_key: recipe.image_key,
        ingredients,
    })
}

pub fn validate_export_data(data: &ExportData) -> Result<()> {
    if data.version != crate::EXPORT_VERSION {
        bail!(
            "Unsupported export version {} (expected {})",
            data.version,
            crate::EXPORT_VERSION
        );
    }
    for r in &data.recipes {
        if r.id.trim().is_empty() || r.title.trim().is_empty() {
            bail!("Recipe records need a non-empty id and title");
        }
    }
    let mut ids = data
        .pantry
        .iter()
        .map(|p| &p.id)
        .chain(data.shopping.iter().map(|s| &s.id));
    if ids.any(|id| id.trim().is_empty()) {
        bail!("Pantry and shopping records need a non-empty id");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(name: &str, quantity: Option<f64>) -> RecipeIngredient {
        RecipeIngredient {
            name: name.to_string(),
            quantity,
            unit: None,
        }
    }

    #[test]
    fn test_recipe_json_uses_image_key() {
        let recipe = Recipe {
            id: "1".to_string(),
            title: "Omelette".to_string(),
            image_key: Some(DishImage::Eggs),
            ingredients: vec![ingredient("egg", Some(2.0))],
        };
        let json = serde_json::to_value(&recipe).unwrap();
        assert_eq!(json["imageKey"], "eggs");
        assert_eq!(json["ingredients"][0]["quantity"], 2.0);
    }

    #[test]
    fn test_recipe_unknown_image_key_is_dropped() {
        let json = r#"{"id":"1","title":"Soup","imageKey":"soup","ingredients":[]}"#;
        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.image_key, None);
    }

    #[test]
    fn test_shopping_item_defaults() {
        let json = r#"{"id":"a","name":"Milk","quantity":"1"}"#;
        let item: ShoppingItem = serde_json::from_str(json).unwrap();
        assert!(!item.is_checked());
        assert_eq!(item.unit, None);
    }

    #[test]
    fn test_dish_image_parse() {
        assert_eq!(DishImage::parse("Pizza").unwrap(), DishImage::Pizza);
        assert!(DishImage::parse("burger").is_err());
        assert_eq!(dish_emoji(None), "🍽️");
        assert_eq!(dish_emoji(Some(DishImage::Cake)), "🍰");
    }

    #[test]
    fn test_validate_recipe_ok_canonicalises() {
        let recipe = NewRecipe {
            title: "  Omelette ".to_string(),
            image_key: None,
            ingredients: vec![ingredient(" Egg", None), ingredient("milk", Some(-1.0))],
        };
        let valid = validate_recipe(&recipe).unwrap();
        assert_eq!(valid.title, "Omelette");
        assert_eq!(valid.ingredients[0].name, "egg");
        assert_eq!(valid.ingredients[0].quantity, Some(1.0));
        assert_eq!(valid.ingredients[1].quantity, Some(1.0));
    }

    #[test]
    fn test_validate_recipe_empty_title() {
        let recipe = NewRecipe {
            title: "   ".to_string(),
            image_key: None,
            ingredients: vec![ingredient("egg", None)],
        };
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_recipe_no_ingredients() {
        let recipe = NewRecipe {
            title: "Air".to_string(),
            image_key: None,
            ingredients: vec![],
        };
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_recipe_unknown_ingredient() {
        let recipe = NewRecipe {
            title: "Mystery".to_string(),
            image_key: None,
            ingredients: vec![ingredient("unobtainium", None)],
        };
        assert!(validate_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_positive_quantity() {
        assert_eq!(validate_positive_quantity("2").unwrap(), 2.0);
        assert!(validate_positive_quantity("0").is_err());
        assert!(validate_positive_quantity("none").is_err());
    }

    #[test]
    fn test_validate_export_data_version() {
        let data = ExportData {
            version: 99,
            exported_at: String::new(),
            pantry: vec![],
            recipes: vec![],
            shopping: vec![],
        };
        assert!(validate_export_data(&data).is_err());
    }

    #[test]
    fn test_validate_export_data_blank_id() {
        let data = ExportData {
            version: crate::EXPORT_VERSION,
            exported_at: String::new(),
            pantry: vec![PantryIngredient {
                id: " ".to_string(),
                name: "egg".to_string(),
                quantity: "1".to_string(),
                unit: None,
            }],
            recipes: vec![],
            shopping: vec![],
        };
        assert!(validate_export_data(&data).is_err());
    }
}
