use mealie_import::config::SourcesConfig;
use mealie_import::sources::{AssetStore, Source, SourceContext};
use mealie_import::ImportError;
use mealie_import::ProgressSink;
use mockito::Matcher;
use std::path::Path;

const SLUG: &str = "pizza-bianco-med-serrano--fetaost-och-kramigt-agg";

const PIZZA_JSON: &str = r#"
{
    "heading": "Pizza bianco med serrano, fetaost och krämigt ägg",
    "title": "En vit pizza utan tomatsås",
    "imageUrl": "/images/recipes/pizza-bianco.jpg",
    "courseType": [{"name": "Huvudrätt"}],
    "mealType": [{"name": "Middag"}],
    "occasion": [],
    "origin": [{"name": "Italien"}],
    "diet": [],
    "originalPortions": 4,
    "ingredients": [
        {
            "name": "Pizzadeg",
            "ingredients": [
                {"name": "Vetemjöl", "amount": 6, "unit": "DL"},
                {"name": "Jäst", "amount": "0,5", "unit": "Pkt"}
            ]
        },
        {
            "name": "Topping",
            "ingredients": [
                {"name": "Serranoskinka", "amount": 70, "unit": "G"},
                {"name": "Ägg", "amount": null, "unit": "St"}
            ]
        }
    ],
    "instructions": [
        "1. Sätt ugnen på 250 grader.",
        "2. Kavla ut degen.",
        "Recept: Mathems provkök",
        "Foto: Anna Andersson"
    ],
    "nutritionInfo": "520 kcal, 28 g protein, 21 g fett, 55 g kolhydrater",
    "cookingTimeString": "30 min"
}
"#;

fn context(server_url: &str, static_dir: &Path) -> SourceContext {
    SourceContext {
        client: reqwest::Client::new(),
        sink: ProgressSink::detached(),
        assets: AssetStore::new(static_dir, "http://importer.local:8000"),
        endpoints: SourcesConfig {
            mathem_api: format!("{}/detail", server_url),
            mathem_site: server_url.to_string(),
            ..Default::default()
        },
    }
}

#[tokio::test]
async fn test_load_rehosts_image_and_maps_fields() {
    let mut server = mockito::Server::new_async().await;
    let detail = server
        .mock("GET", "/detail/")
        .match_query(Matcher::UrlEncoded("url".into(), SLUG.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PIZZA_JSON)
        .create_async()
        .await;
    let image = server
        .mock("GET", "/images/recipes/pizza-bianco.jpg")
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body(b"pizza".to_vec())
        .create_async()
        .await;

    let static_dir = tempfile::tempdir().unwrap();
    let recipe = Source::Mathem
        .open(
            &format!("https://www.mathem.se/recept/{}", SLUG),
            context(&server.url(), static_dir.path()),
        )
        .unwrap()
        .load()
        .await
        .unwrap();
    detail.assert_async().await;
    image.assert_async().await;

    assert_eq!(
        recipe.name,
        "Pizza bianco med serrano, fetaost och krämigt ägg"
    );
    assert_eq!(recipe.description, "En vit pizza utan tomatsås");
    assert_eq!(recipe.recipe_yield, "4");
    assert_eq!(recipe.total_time, "30 min");
    assert_eq!(
        recipe.org_url,
        Some(format!("{}/recept/{}", server.url(), SLUG))
    );
    assert_eq!(
        recipe.recipe_category,
        vec!["Huvudrätt", "Middag", "Italien"]
    );

    // Image is served from this importer instead of Mathem
    assert_eq!(
        recipe.image.as_deref(),
        Some("http://importer.local:8000/static/pizza-bianco.jpg")
    );
    assert_eq!(
        std::fs::read(static_dir.path().join("pizza-bianco.jpg")).unwrap(),
        b"pizza"
    );

    let ingredients: Vec<_> = recipe
        .recipe_ingredient
        .iter()
        .map(|i| (i.unit.as_deref().unwrap(), i.food.as_deref().unwrap(), i.quantity))
        .collect();
    assert_eq!(
        ingredients,
        vec![
            ("dl", "vetemjöl", 6.0),
            ("pkt", "jäst", 0.5),
            ("g", "serranoskinka", 70.0),
            ("st", "ägg", 0.0),
        ]
    );

    // Ordinals stripped and credit lines dropped
    let steps: Vec<_> = recipe
        .recipe_instructions
        .iter()
        .map(|s| s.text.as_str())
        .collect();
    assert_eq!(steps, vec!["Sätt ugnen på 250 grader.", "Kavla ut degen."]);

    let nutrition = recipe.nutrition.unwrap();
    assert_eq!(nutrition.calories, Some(520.0));
    assert_eq!(nutrition.protein_content, Some(28.0));
    assert_eq!(nutrition.fat_content, Some(21.0));
    assert_eq!(nutrition.carbohydrate_content, Some(55.0));
}

#[tokio::test]
async fn test_api_url_without_image_or_nutrition() {
    let mut server = mockito::Server::new_async().await;
    let detail = server
        .mock("GET", "/detail/")
        .match_query(Matcher::UrlEncoded(
            "url".into(),
            "jordartskockssoppa-med-timjan".into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"heading": "Jordärtskockssoppa", "nutritionInfo": ""}"#)
        .create_async()
        .await;

    let static_dir = tempfile::tempdir().unwrap();
    let recipe = Source::Mathem
        .open(
            "https://api.mathem.io/ecom-recipe/noauth/recipes/detail?url=jordartskockssoppa-med-timjan",
            context(&server.url(), static_dir.path()),
        )
        .unwrap()
        .load()
        .await
        .unwrap();
    detail.assert_async().await;

    assert_eq!(recipe.name, "Jordärtskockssoppa");
    assert!(recipe.image.is_none());
    assert!(recipe.nutrition.is_none());
    assert!(recipe.recipe_category.is_empty());
}

#[tokio::test]
async fn test_failed_image_download_aborts_load() {
    let mut server = mockito::Server::new_async().await;
    let _detail = server
        .mock("GET", "/detail/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(PIZZA_JSON)
        .create_async()
        .await;
    let _image = server
        .mock("GET", "/images/recipes/pizza-bianco.jpg")
        .with_status(500)
        .create_async()
        .await;

    let static_dir = tempfile::tempdir().unwrap();
    let err = Source::Mathem
        .open(
            &format!("https://www.mathem.se/recept/{}/", SLUG),
            context(&server.url(), static_dir.path()),
        )
        .unwrap()
        .load()
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::UpstreamFetch { .. }));
}

#[tokio::test]
async fn test_invalid_reference_makes_no_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let static_dir = tempfile::tempdir().unwrap();
    for reference in ["690203", "https://www.ica.se/recept/scones-690203/"] {
        let result = Source::Mathem.open(reference, context(&server.url(), static_dir.path()));
        assert!(matches!(result, Err(ImportError::InvalidReference { .. })));
    }
    mock.assert_async().await;
}
