use crate::config::ImporterConfig;
use crate::error::{ImportError, Result};
use crate::mealie::MealieClient;
use crate::model::Recipe;
use crate::progress::ProgressSink;
use crate::publisher::Publisher;
use crate::sources::{AssetStore, Source, SourceContext};
use reqwest::Client;

/// Runs one recipe through a source importer and into Mealie.
#[derive(Debug, Clone)]
pub struct Importer {
    config: ImporterConfig,
    client: Client,
}

impl Importer {
    pub fn new(config: ImporterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("mealie-import/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Imports `reference` using the importer named by `source` and returns
    /// the slug of the new Mealie recipe.
    ///
    /// Progress and failures are reported through `sink`, and every failure
    /// ends with an explicit error line. The caller is responsible for
    /// signalling `done` afterwards.
    pub async fn run(&self, source: &str, reference: &str, sink: &ProgressSink) -> Result<String> {
        let result = self.import(source, reference, sink).await;
        match &result {
            Ok(slug) => sink.info(format!(
                "Mealie import completed successfully! Recipe slug: {}",
                slug
            )),
            Err(_) => sink.error(format!("Import of {:?} failed", reference)),
        }
        result
    }

    async fn import(&self, source: &str, reference: &str, sink: &ProgressSink) -> Result<String> {
        let recipe = match self.load(source, reference, sink).await {
            Ok(recipe) => recipe,
            Err(err) => {
                sink.error(&err);
                return Err(err);
            }
        };

        sink.info("Start the import to mealie");
        let client = match MealieClient::new(&self.config.mealie, self.config.timeout()) {
            Ok(client) => client,
            Err(err) => {
                sink.error(&err);
                return Err(err);
            }
        };
        // Publisher reports its own failures, including the rollback
        Publisher::new(client, sink.clone()).publish(recipe).await
    }

    /// Nothing in Mealie is touched until this has succeeded.
    async fn load(&self, source: &str, reference: &str, sink: &ProgressSink) -> Result<Recipe> {
        let source: Source = source.parse()?;
        let context = SourceContext {
            client: self.client.clone(),
            sink: sink.clone(),
            assets: AssetStore::new(
                &self.config.server.static_dir,
                &self.config.server.public_url,
            ),
            endpoints: self.config.sources.clone(),
        };
        let importer = source.open(reference, context)?;
        sink.info(format!(
            "Using the {} importer for {:?}",
            importer.source_name(),
            reference
        ));
        let recipe = importer.load().await?;
        if sink.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        Ok(recipe)
    }
}
