use super::{
    fetch_json, normalize_step, parse_number, text_value, trim_reference, RecipeSource,
    SourceContext,
};
use crate::error::{ImportError, Result};
use crate::model::{Ingredient, Instruction, Nutrition, Recipe};
use async_trait::async_trait;
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "ica";
const API_PREFIX: &str = "https://handla.api.ica.se/api/recipes/recipe";
const SITE_PREFIX: &str = "https://www.ica.se/recept";

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct IcaRecipe {
    title: Option<String>,
    image_url: Option<String>,
    #[serde(rename = "PreambleHTML")]
    preamble_html: Option<String>,
    mdsa_categories: Option<Vec<String>>,
    categories: Option<Vec<String>>,
    portions: Option<Value>,
    ingredient_groups: Option<Vec<IngredientGroup>>,
    cooking_steps: Option<Vec<String>>,
    nutrition_per_portion: Option<NutritionPerPortion>,
    cooking_time: Option<Value>,
    absolute_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct IngredientGroup {
    ingredients: Option<Vec<IcaIngredient>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct IcaIngredient {
    unit: Option<String>,
    quantity: Option<Value>,
    ingredient: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct NutritionPerPortion {
    #[serde(rename = "KCalories")]
    kcalories: Option<Value>,
    #[serde(rename = "Fat")]
    fat: Option<Value>,
    #[serde(rename = "Protein")]
    protein: Option<Value>,
    #[serde(rename = "Carbohydrate")]
    carbohydrate: Option<Value>,
    #[serde(rename = "Salt")]
    salt: Option<Value>,
}

/// Importer for recipes from ica.se
pub struct Ica {
    url: String,
    context: SourceContext,
}

impl Ica {
    pub fn new(reference: &str, context: SourceContext) -> Result<Self> {
        let id = Self::recipe_id(reference)?;
        let url = format!("{}/{}", context.endpoints.ica_api.trim_end_matches('/'), id);
        Ok(Self { url, context })
    }

    /// Extracts the numeric recipe id from an API URL, a recipe page URL
    /// (`.../recept/scones-690203/`) or a bare id.
    pub fn recipe_id(reference: &str) -> Result<String> {
        let reference = trim_reference(reference);
        let last_segment = reference.rsplit('/').next().unwrap_or_default();

        let id = if reference.starts_with(API_PREFIX) {
            last_segment
        } else if reference.starts_with(SITE_PREFIX) {
            last_segment.rsplit('-').next().unwrap_or_default()
        } else {
            reference
        };

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ImportError::InvalidReference {
                source_name: "ICA",
                reference: reference.to_string(),
            });
        }
        Ok(id.to_string())
    }

    fn ingredients(&self, groups: Vec<IngredientGroup>) -> Vec<Ingredient> {
        self.context.sink.info("Loading ingredients from recipe");
        groups
            .into_iter()
            .flat_map(|group| group.ingredients.unwrap_or_default())
            .map(|ingredient| {
                Ingredient::new(
                    ingredient.unit.as_deref(),
                    ingredient.ingredient.as_deref(),
                    ingredient.quantity.as_ref().and_then(parse_number),
                )
            })
            .collect()
    }

    fn instructions(&self, steps: Vec<String>) -> Vec<Instruction> {
        self.context
            .sink
            .info("Loading step by step instructions from recipe");
        steps
            .iter()
            .filter_map(|step| normalize_step(step, &[]))
            .map(Instruction::new)
            .collect()
    }

    fn nutrition(&self, per_portion: Option<NutritionPerPortion>) -> Option<Nutrition> {
        let per_portion = per_portion?;
        self.context
            .sink
            .info("Loading nutrition information from recipe");
        // Values are per portion, which is also how Mealie displays them
        Nutrition {
            calories: per_portion.kcalories.as_ref().and_then(parse_number),
            fat_content: per_portion.fat.as_ref().and_then(parse_number),
            protein_content: per_portion.protein.as_ref().and_then(parse_number),
            carbohydrate_content: per_portion.carbohydrate.as_ref().and_then(parse_number),
            sodium_content: per_portion.salt.as_ref().and_then(parse_number),
            ..Default::default()
        }
        .non_empty()
    }

    fn convert(&self, recipe: IcaRecipe) -> Recipe {
        let categories = recipe
            .mdsa_categories
            .unwrap_or_default()
            .into_iter()
            .chain(recipe.categories.unwrap_or_default())
            .collect();

        Recipe {
            name: recipe.title.unwrap_or_default(),
            image: recipe.image_url.filter(|url| !url.is_empty()),
            description: recipe
                .preamble_html
                .as_deref()
                .map(html_to_text)
                .unwrap_or_default(),
            recipe_category: categories,
            recipe_yield: recipe.portions.map(text_value).unwrap_or_default(),
            recipe_ingredient: self.ingredients(recipe.ingredient_groups.unwrap_or_default()),
            recipe_instructions: self.instructions(recipe.cooking_steps.unwrap_or_default()),
            nutrition: self.nutrition(recipe.nutrition_per_portion),
            total_time: recipe.cooking_time.map(text_value).unwrap_or_default(),
            org_url: recipe.absolute_url,
            ..Default::default()
        }
    }
}

#[async_trait]
impl RecipeSource for Ica {
    fn source_name(&self) -> &'static str {
        NAME
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn load(&self) -> Result<Recipe> {
        let sink = &self.context.sink;
        sink.info(format!("Loading recipe from {:?}", self.url));
        let recipe: IcaRecipe = fetch_json(&self.context.client, &self.url).await?;
        sink.info(format!(
            "Recipe name {:?}",
            recipe.title.as_deref().unwrap_or_default()
        ));

        let recipe = self.convert(recipe);
        sink.info(format!(
            "Recipe has been successfully loaded from {:?}",
            self.url
        ));
        Ok(recipe)
    }
}

/// Flattens the preamble markup into plain text.
fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    // The parser has already decoded entities
    let text: String = fragment.root_element().text().collect();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
