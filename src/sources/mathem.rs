use super::assets::resolve_image_url;
use super::{
    fetch_json, normalize_step, parse_number, text_value, trim_reference, RecipeSource,
    SourceContext,
};
use crate::error::{ImportError, Result};
use crate::model::{Ingredient, Instruction, Nutrition, Recipe};
use async_trait::async_trait;
use log::debug;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "mathem";
const API_PREFIX: &str = "https://api.mathem.io";
const SITE_PREFIX: &str = "https://www.mathem.se/recept";

/// Credits Mathem mixes into the instruction list
const ATTRIBUTION_MARKERS: [&str; 2] = ["Recept:", "Foto:"];

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct MathemRecipe {
    heading: Option<String>,
    title: Option<String>,
    image_url: Option<String>,
    course_type: Option<Vec<Named>>,
    meal_type: Option<Vec<Named>>,
    occasion: Option<Vec<Named>>,
    origin: Option<Vec<Named>>,
    diet: Option<Vec<Named>>,
    original_portions: Option<Value>,
    ingredients: Option<Vec<IngredientGroup>>,
    instructions: Option<Vec<String>>,
    nutrition_info: Option<String>,
    cooking_time_string: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct IngredientGroup {
    ingredients: Option<Vec<MathemIngredient>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct MathemIngredient {
    unit: Option<String>,
    amount: Option<Value>,
    name: Option<String>,
}

/// Importer for recipes from mathem.se
pub struct Mathem {
    slug: String,
    url: String,
    context: SourceContext,
}

impl Mathem {
    pub fn new(reference: &str, context: SourceContext) -> Result<Self> {
        let slug = Self::recipe_slug(reference)?;
        let api = context.endpoints.mathem_api.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/", api)).map_err(|_| invalid(api))?;
        url.query_pairs_mut().append_pair("url", &slug);
        Ok(Self {
            slug,
            url: url.to_string(),
            context,
        })
    }

    /// Extracts the recipe slug from an API URL (`...?url=<slug>`) or a
    /// recipe page URL (`https://www.mathem.se/recept/<slug>`).
    pub fn recipe_slug(reference: &str) -> Result<String> {
        let reference = trim_reference(reference);

        let slug = if reference.starts_with(API_PREFIX) {
            Url::parse(reference).ok().and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "url")
                    .map(|(_, value)| value.into_owned())
            })
        } else if reference.starts_with(SITE_PREFIX) {
            reference
                .rsplit('/')
                .next()
                .filter(|slug| *slug != "recept")
                .map(str::to_string)
        } else {
            None
        };

        slug.filter(|slug| !slug.is_empty())
            .ok_or_else(|| invalid(reference))
    }

    fn categories(recipe: &mut MathemRecipe) -> Vec<String> {
        [
            recipe.course_type.take(),
            recipe.meal_type.take(),
            recipe.occasion.take(),
            recipe.origin.take(),
            recipe.diet.take(),
        ]
        .into_iter()
        .flatten()
        .flatten()
        .map(|category| category.name)
        .filter(|name| !name.is_empty())
        .collect()
    }

    fn ingredients(&self, groups: Vec<IngredientGroup>) -> Vec<Ingredient> {
        self.context.sink.info("Loading ingredients from recipe");
        groups
            .into_iter()
            .flat_map(|group| group.ingredients.unwrap_or_default())
            .map(|ingredient| {
                Ingredient::new(
                    ingredient.unit.as_deref(),
                    ingredient.name.as_deref(),
                    ingredient.amount.as_ref().and_then(parse_number),
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
            .filter_map(|step| normalize_step(step, &ATTRIBUTION_MARKERS))
            .map(Instruction::new)
            .collect()
    }

    fn nutrition(&self, nutrition_info: Option<&str>) -> Option<Nutrition> {
        let nutrition_info = nutrition_info.filter(|info| !info.trim().is_empty())?;
        self.context
            .sink
            .info("Loading nutrition information from recipe");
        debug!("Mathem nutrition info: {}", nutrition_info);
        parse_nutrition_info(nutrition_info)
    }

    async fn image(&self, image: Option<&str>) -> Result<Option<String>> {
        let Some(image) = image.filter(|image| !image.trim().is_empty()) else {
            return Ok(None);
        };
        let url = resolve_image_url(image, &self.context.endpoints.mathem_site)?;
        self.context
            .sink
            .info(format!("Downloading image from {}", url));
        let hosted = self
            .context
            .assets
            .rehost(&self.context.client, &url)
            .await?;
        self.context
            .sink
            .info(format!("Image is now served from {}", hosted));
        Ok(Some(hosted))
    }
}

#[async_trait]
impl RecipeSource for Mathem {
    fn source_name(&self) -> &'static str {
        NAME
    }

    fn url(&self) -> &str {
        &self.url
    }

    async fn load(&self) -> Result<Recipe> {
        let sink = &self.context.sink;
        sink.info(format!("Loading recipe from {:?}", self.url));
        let mut recipe: MathemRecipe = fetch_json(&self.context.client, &self.url).await?;
        sink.info(format!(
            "Recipe name {:?}",
            recipe.heading.as_deref().unwrap_or_default()
        ));

        let image = self.image(recipe.image_url.as_deref()).await?;
        let recipe_category = Self::categories(&mut recipe);

        let recipe = Recipe {
            name: recipe.heading.unwrap_or_default(),
            image,
            description: recipe.title.unwrap_or_default(),
            recipe_category,
            recipe_yield: recipe.original_portions.map(text_value).unwrap_or_default(),
            recipe_ingredient: self.ingredients(recipe.ingredients.unwrap_or_default()),
            recipe_instructions: self.instructions(recipe.instructions.unwrap_or_default()),
            nutrition: self.nutrition(recipe.nutrition_info.as_deref()),
            total_time: recipe.cooking_time_string.unwrap_or_default(),
            org_url: Some(format!(
                "{}/recept/{}",
                self.context.endpoints.mathem_site.trim_end_matches('/'),
                self.slug
            )),
            ..Default::default()
        };
        sink.info(format!(
            "Recipe has been successfully loaded from {:?}",
            self.url
        ));
        Ok(recipe)
    }
}

fn invalid(reference: &str) -> ImportError {
    ImportError::InvalidReference {
        source_name: "Mathem",
        reference: reference.to_string(),
    }
}

/// Parses Mathem's free-text summary, e.g.
/// `"450 kcal, 25 g protein, 12,5 g fett, 40 g kolhydrater"`.
///
/// Entries are separated by commas; a comma between two digits is a decimal
/// comma. The value is the first word of an entry and the label the last.
/// Entries without a label, unknown labels and unparsable values are skipped.
pub fn parse_nutrition_info(info: &str) -> Option<Nutrition> {
    let mut nutrition = Nutrition::default();
    for entry in split_entries(info) {
        let words: Vec<&str> = entry.split_whitespace().collect();
        let [value, .., label] = words.as_slice() else {
            continue;
        };
        let Some(value) = parse_number(&Value::String(value.to_string())) else {
            continue;
        };
        let label = label.to_lowercase();
        if label.starts_with("kcal") {
            nutrition.calories = Some(value);
        } else if label.starts_with("protein") {
            nutrition.protein_content = Some(value);
        } else if label.starts_with("fett") {
            nutrition.fat_content = Some(value);
        } else if label.starts_with("kolhydrat") {
            nutrition.carbohydrate_content = Some(value);
        } else if label.starts_with("fiber") {
            nutrition.fiber_content = Some(value);
        } else if label.starts_with("socker") {
            nutrition.sugar_content = Some(value);
        }
    }
    nutrition.non_empty()
}

/// Splits on every comma that is not a decimal comma, trimming each entry.
fn split_entries(info: &str) -> Vec<&str> {
    let bytes = info.as_bytes();
    let mut entries = Vec::new();
    let mut start = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if byte != b',' {
            continue;
        }
        let decimal = i > 0
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if !decimal {
            entries.push(info[start..i].trim());
            start = i + 1;
        }
    }
    entries.push(info[start..].trim());
    entries.retain(|entry| !entry.is_empty());
    entries
}
