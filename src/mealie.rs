//! Thin client for the parts of the Mealie REST API the importer uses.

use crate::config::MealieConfig;
use crate::error::{ImportError, Result};
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// A food as Mealie lists it
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Food {
    pub id: String,
    pub name: String,
}

/// A unit as Mealie lists it; ingredients are matched on `abbreviation`
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Unit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// One page of a paginated list endpoint
#[derive(Debug, Deserialize)]
struct Page<T> {
    items: Vec<T>,
    page: u32,
    total_pages: u32,
}

pub struct MealieClient {
    client: Client,
    base_url: String,
    group_id: String,
}

impl MealieClient {
    pub fn new(config: &MealieConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut token = HeaderValue::from_str(&format!("Bearer {}", config.token))?;
        token.set_sensitive(true);
        headers.insert(AUTHORIZATION, token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            group_id: config.group_id.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    fn grouped(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, path)
            .query(&[("group_id", self.group_id.as_str())])
    }

    /// Creates a recipe holding only `name` and returns its slug.
    pub async fn create_recipe(&self, name: &str) -> Result<String> {
        let response = self
            .grouped(Method::POST, "/recipes")
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let slug: String = checked(response).await?.json().await?;
        Ok(slug)
    }

    pub async fn update_recipe(&self, slug: &str, document: &Value) -> Result<()> {
        let response = self
            .grouped(Method::PATCH, &format!("/recipes/{}", slug))
            .json(document)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    pub async fn delete_recipe(&self, slug: &str) -> Result<()> {
        let response = self
            .grouped(Method::DELETE, &format!("/recipes/{}", slug))
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    /// Asks Mealie to fetch the image at `url` for the recipe.
    pub async fn set_image_from_url(&self, slug: &str, url: &str) -> Result<()> {
        let response = self
            .request(Method::POST, &format!("/recipes/{}/image", slug))
            .json(&json!({ "url": url, "includeTags": true }))
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    /// Looks a category up by slug; `None` when Mealie does not know it.
    pub async fn find_category(&self, slug: &str) -> Result<Option<Category>> {
        let response = self
            .request(Method::GET, &format!("/organizers/categories/slug/{}", slug))
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let response = self
            .grouped(Method::POST, "/organizers/categories")
            .json(&json!({ "name": name }))
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    pub async fn foods(&self) -> Result<Vec<Food>> {
        self.get_all("/foods").await
    }

    pub async fn create_food(&self, name: &str) -> Result<Food> {
        let response = self
            .request(Method::POST, "/foods")
            .json(&json!({ "name": name }))
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }

    pub async fn units(&self) -> Result<Vec<Unit>> {
        self.get_all("/units").await
    }

    /// Walks every page of a list endpoint and concatenates the items.
    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let first: Page<T> = self.get_page(path, 1).await?;
        let mut items = first.items;
        for page in first.page + 1..=first.total_pages {
            let next: Page<T> = self.get_page(path, page).await?;
            items.extend(next.items);
        }
        debug!("Fetched {} items from {}", items.len(), path);
        Ok(items)
    }

    async fn get_page<T: DeserializeOwned>(&self, path: &str, page: u32) -> Result<Page<T>> {
        let response = self
            .request(Method::GET, path)
            .query(&[("page", page)])
            .send()
            .await?;
        Ok(checked(response).await?.json().await?)
    }
}

/// Turns an error status into [`ImportError::PublishFailed`], keeping the
/// response body for the log.
async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    Err(ImportError::PublishFailed(format!(
        "{} returned {}: {}",
        url.path(),
        status,
        body
    )))
}
