use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// A recipe in the shape Mealie stores it.
///
/// Every source importer produces one of these; the publisher serializes it
/// into the document that gets patched onto the stub recipe.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    pub image: Option<String>,
    pub description: String,
    pub recipe_category: Vec<String>,
    pub tags: Vec<String>,
    pub rating: i32,
    pub recipe_yield: String,
    pub recipe_ingredient: Vec<Ingredient>,
    pub recipe_instructions: Vec<Instruction>,
    pub nutrition: Option<Nutrition>,
    pub total_time: String,
    pub prep_time: String,
    pub perform_time: String,
    pub settings: Settings,
    pub assets: Vec<serde_json::Value>,
    pub notes: Vec<Note>,
    #[serde(rename = "orgURL")]
    pub org_url: Option<String>,
    pub extras: HashMap<String, String>,
    pub comments: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub reference_id: String,
    pub title: String,
    pub note: String,
    pub unit: Option<String>,
    pub food: Option<String>,
    pub disable_amount: bool,
    pub quantity: f64,
}

impl Ingredient {
    /// Units and foods are lower-cased so they line up with the names Mealie
    /// already has. A missing amount becomes 0.
    pub fn new(unit: Option<&str>, food: Option<&str>, quantity: Option<f64>) -> Self {
        Self {
            reference_id: Uuid::new_v4().to_string(),
            title: String::new(),
            note: String::new(),
            unit: unit
                .map(|u| u.trim().to_lowercase())
                .filter(|u| !u.is_empty()),
            food: food
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty()),
            disable_amount: false,
            quantity: quantity.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub id: String,
    pub title: String,
    pub text: String,
    pub ingredient_references: Vec<String>,
}

impl Instruction {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            text: text.into(),
            ingredient_references: Vec::new(),
        }
    }
}

/// Nutrition facts; fields the source did not provide are left out.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_content: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_content: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbohydrate_content: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_content: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sodium_content: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sugar_content: Option<f64>,
}

impl Nutrition {
    pub fn is_empty(&self) -> bool {
        *self == Nutrition::default()
    }

    /// `None` when nothing was recognised, so an unusable block never turns
    /// into a zeroed one.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub public: bool,
    pub show_nutrition: bool,
    pub show_assets: bool,
    pub landscape_view: bool,
    pub disable_comments: bool,
    pub disable_amount: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            public: true,
            show_nutrition: true,
            show_assets: true,
            landscape_view: true,
            disable_comments: false,
            disable_amount: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Note {
    pub title: Option<String>,
    pub text: String,
}
