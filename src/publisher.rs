use crate::error::{ImportError, Result};
use crate::mealie::{Food, MealieClient, Unit};
use crate::model::Recipe;
use crate::progress::ProgressSink;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Publishes recipes to Mealie, removing the half-created recipe again when a
/// later step fails.
pub struct Publisher {
    client: MealieClient,
    sink: ProgressSink,
}

impl Publisher {
    pub fn new(client: MealieClient, sink: ProgressSink) -> Self {
        Self { client, sink }
    }

    /// Creates `recipe` in Mealie and returns its slug.
    ///
    /// The recipe is first created by name only. Categories, foods and units
    /// are then resolved to Mealie ids and the full document is patched onto
    /// it. Any failure after the first step deletes the stub again before
    /// the error is returned.
    pub async fn publish(&self, recipe: Recipe) -> Result<String> {
        self.sink
            .info(format!("Creating recipe with name {}", recipe.name));
        let slug = match self.client.create_recipe(&recipe.name).await {
            Ok(slug) => slug,
            Err(err) => {
                let err = match err {
                    ImportError::PublishFailed(reason) => ImportError::CreateFailed(reason),
                    other => ImportError::CreateFailed(other.to_string()),
                };
                self.sink.error(&err);
                return Err(err);
            }
        };
        self.sink.info(format!("Slug for new recipe: {}", slug));

        match self.populate(&slug, &recipe).await {
            Ok(()) => Ok(slug),
            Err(err) => {
                self.sink.error(&err);
                self.rollback(&slug, &recipe.name).await;
                Err(err)
            }
        }
    }

    async fn populate(&self, slug: &str, recipe: &Recipe) -> Result<()> {
        let mut document = serde_json::to_value(recipe)?;

        self.check_cancelled()?;
        self.resolve_categories(&mut document).await?;
        self.check_cancelled()?;
        self.resolve_foods(&mut document).await?;
        self.check_cancelled()?;
        self.resolve_units(&mut document).await?;
        self.check_cancelled()?;

        self.sink
            .info(format!("Patching in recipe information to {}", recipe.name));
        self.client.update_recipe(slug, &document).await?;

        if let Some(image) = &recipe.image {
            self.sink
                .info(format!("Adding image from {} to recipe.", image));
            self.client.set_image_from_url(slug, image).await?;
            self.sink.info(format!("{} added successfully.", image));
        }
        Ok(())
    }

    async fn rollback(&self, slug: &str, name: &str) {
        self.sink.info(format!(
            "Attempting to clean up recipe {} due to errors.",
            name
        ));
        if let Err(err) = self.client.delete_recipe(slug).await {
            log::debug!("Delete of {} failed: {}", slug, err);
            self.sink.error(ImportError::RollbackFailed {
                slug: slug.to_string(),
            });
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.sink.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        Ok(())
    }

    /// Replaces each category name with a `{name, slug, id}` reference,
    /// creating categories Mealie does not have yet.
    async fn resolve_categories(&self, document: &mut Value) -> Result<()> {
        let names: Vec<String> = document["recipeCategory"]
            .as_array()
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| name.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let mut categories = Vec::with_capacity(names.len());
        for name in names {
            let slug = slugify(&name);
            let category = match self.client.find_category(&slug).await? {
                Some(category) => category,
                None => {
                    self.sink
                        .info(format!("Category {} does not exist, creating it.", name));
                    self.client.create_category(&name).await?
                }
            };
            self.sink.info(format!(
                "Category {} has been added with id {}.",
                name, category.id
            ));
            categories.push(json!({
                "name": name,
                "slug": slug,
                "id": category.id,
            }));
        }
        document["recipeCategory"] = Value::Array(categories);
        Ok(())
    }

    /// Replaces each ingredient's food name with a `{name, id}` reference.
    /// Missing foods are created once, however often they appear.
    async fn resolve_foods(&self, document: &mut Value) -> Result<()> {
        let mut foods: HashMap<String, Food> = self
            .client
            .foods()
            .await?
            .into_iter()
            .map(|food| (food.name.clone(), food))
            .collect();

        for ingredient in ingredients_mut(document) {
            let Some(name) = ingredient["food"].as_str().map(str::to_string) else {
                continue;
            };
            let food = match foods.get(&name) {
                Some(food) => food.clone(),
                None => {
                    self.sink
                        .info(format!("Food {} does not exist, creating it.", name));
                    let food = self.client.create_food(&name).await?;
                    foods.insert(name.clone(), food.clone());
                    self.sink.info(format!(
                        "Food {} has been added with id {}.",
                        food.name, food.id
                    ));
                    food
                }
            };
            ingredient["food"] = json!({ "name": food.name, "id": food.id });
        }
        Ok(())
    }

    /// Replaces each ingredient's unit abbreviation with a `{name, id}`
    /// reference. Units are never created: an unknown one stops the import.
    async fn resolve_units(&self, document: &mut Value) -> Result<()> {
        let units: HashMap<String, Unit> = self
            .client
            .units()
            .await?
            .into_iter()
            .map(|unit| (unit.abbreviation.clone(), unit))
            .collect();

        for ingredient in ingredients_mut(document) {
            let Some(abbreviation) = ingredient["unit"].as_str().map(str::to_string) else {
                continue;
            };
            let unit = units
                .get(&abbreviation)
                .ok_or(ImportError::UnitNotFound(abbreviation))?;
            ingredient["unit"] = json!({ "name": unit.name, "id": unit.id });
        }
        Ok(())
    }
}

fn ingredients_mut(document: &mut Value) -> impl Iterator<Item = &mut Value> {
    document
        .get_mut("recipeIngredient")
        .and_then(Value::as_array_mut)
        .into_iter()
        .flat_map(|ingredients| ingredients.iter_mut())
}

/// Builds the slug Mealie derives from a category name: lower-case ASCII
/// words joined by `-`. Common Latin diacritics are transliterated.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        let replacement = match c {
            'å' | 'ä' | 'à' | 'á' | 'â' | 'ã' => "a",
            'ö' | 'ø' | 'ò' | 'ó' | 'ô' | 'õ' => "o",
            'é' | 'è' | 'ê' | 'ë' => "e",
            'ü' | 'ù' | 'ú' | 'û' => "u",
            'ï' | 'ì' | 'í' | 'î' => "i",
            'ç' => "c",
            'ñ' => "n",
            'æ' => "ae",
            'ß' => "ss",
            c if c.is_ascii_alphanumeric() => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(c);
                continue;
            }
            _ => {
                pending_dash = true;
                continue;
            }
        };
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        slug.push_str(replacement);
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Kyckling"), "kyckling");
        assert_eq!(slugify("Förrätt"), "forratt");
        assert_eq!(slugify("Bakning & Fika"), "bakning-fika");
        assert_eq!(slugify("  Mellanmål  "), "mellanmal");
        assert_eq!(slugify("Vegetariskt (laktosfritt)"), "vegetariskt-laktosfritt");
    }

    #[test]
    fn test_ingredients_mut_without_ingredients() {
        let mut document = json!({ "name": "Empty" });
        assert_eq!(ingredients_mut(&mut document).count(), 0);
    }
}
