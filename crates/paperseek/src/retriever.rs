use indicatif::{ProgressBar, ProgressStyle};
use paperseek_common::{AppConfig, PaperSeekError, Record, Result};
use paperseek_llm::{LlmClient, MetadataExtractor, OllamaClient, PageInput, TextEmbedder};
use paperseek_vector::{
    DocId, EngineConfig, Facet, FacetVectors, IndexStats, RetrievalEngine, SearchHit,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Extraction, embedding and the retrieval engine behind one interface
pub struct PaperRetriever {
    config: AppConfig,
    engine: RetrievalEngine,
    extractor: MetadataExtractor,
    embedder: TextEmbedder,
}

impl PaperRetriever {
    /// Create retriever backed by the configured Ollama server
    pub fn new(config: AppConfig) -> Result<Self> {
        let client: Arc<dyn LlmClient> = Arc::new(OllamaClient::new(&config.ollama_base_url)?);
        Self::with_client(config, client)
    }

    /// Create retriever with an explicit LLM client
    pub fn with_client(config: AppConfig, client: Arc<dyn LlmClient>) -> Result<Self> {
        let engine = RetrievalEngine::new(EngineConfig::from_app_config(&config))?;
        let extractor = MetadataExtractor::new(client.clone(), &config.extraction_model);
        let embedder = TextEmbedder::new(client, &config.embedding_model, config.embedding_dim);

        info!("PaperRetriever initialized");
        Ok(Self {
            config,
            engine,
            extractor,
            embedder,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Embed all three facets of a record; a blank facet is rejected
    pub async fn embed_record(&self, record: &Record) -> Result<FacetVectors> {
        let mut vectors = FacetVectors::default();
        for facet in Facet::ALL {
            let vector = self.embedder.embed(facet.text(record)).await?.ok_or_else(|| {
                PaperSeekError::invalid_input(format!("Record has an empty {}", facet))
            })?;
            *vectors.get_mut(facet) = vector;
        }
        Ok(vectors)
    }

    /// Index every article in a JSON array file
    ///
    /// Articles with a blank field are skipped. Returns the number indexed.
    pub async fn initialize_index(&mut self, articles_path: &Path) -> Result<usize> {
        info!("Initializing index from metadata file: {}", articles_path.display());
        let data = std::fs::read(articles_path)?;
        let articles: Vec<Record> = serde_json::from_slice(&data)?;

        let progress = ProgressBar::new(articles.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut indexed = 0;
        for (position, article) in articles.into_iter().enumerate() {
            progress.inc(1);
            let blank = article.blank_fields();
            if !blank.is_empty() {
                warn!("Skipping article {}: empty {}", position, blank.join(", "));
                continue;
            }
            let vectors = self.embed_record(&article).await?;
            self.engine.add(article, &vectors)?;
            indexed += 1;
        }
        progress.finish_and_clear();

        info!("Index initialized - {} documents in the index", self.engine.len());
        Ok(indexed)
    }

    /// Restore the persisted index
    pub fn load_index(&mut self) -> Result<()> {
        info!("Loading indexes and metadata from disk");
        self.engine.restore_all()?;
        info!("Total documents in the index: {}", self.engine.len());
        Ok(())
    }

    /// Restore the persisted index when one exists
    pub fn load_index_if_present(&mut self) -> Result<bool> {
        if !self.engine.has_persisted_state() {
            return Ok(false);
        }
        self.load_index()?;
        Ok(true)
    }

    /// Embed and add one document
    pub async fn add_to_index(&mut self, record: Record) -> Result<DocId> {
        info!("Adding document to index: title='{}'", record.title);
        let vectors = self.embed_record(&record).await?;
        let doc_id = self.engine.add(record, &vectors)?;
        info!("Total documents in the index: {}", self.engine.len());
        Ok(doc_id)
    }

    /// Persist the index
    pub fn save_index(&self) -> Result<()> {
        self.config.ensure_directories()?;
        self.engine.persist_all()
    }

    /// Find papers similar to the given first page
    pub async fn search_by_page(&self, page: PageInput, top_k: usize) -> Result<Vec<SearchHit>> {
        let record = self.extractor.extract(page).await?;
        self.search_by_record(&record, top_k).await
    }

    /// Find papers similar to the given metadata
    pub async fn search_by_record(&self, record: &Record, top_k: usize) -> Result<Vec<SearchHit>> {
        let query = self.embed_record(record).await?;
        let hits = self.engine.search(&query, top_k)?;
        info!("Search completed. Found {} results", hits.len());
        Ok(hits)
    }

    pub fn total_documents(&self) -> usize {
        self.engine.len()
    }

    pub fn stats(&self) -> IndexStats {
        self.engine.stats()
    }
}
