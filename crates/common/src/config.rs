use crate::error::PaperSeekError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix for environment variable overrides (e.g. `PAPERSEEK_TOP_K`)
pub const ENV_PREFIX: &str = "PAPERSEEK";

/// Per-facet fusion weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceWeights {
    pub title: f32,
    pub authors: f32,
    #[serde(rename = "abstract")]
    pub abstract_text: f32,
}

impl Default for RelevanceWeights {
    fn default() -> Self {
        Self {
            title: 0.4,
            authors: 0.3,
            abstract_text: 0.3,
        }
    }
}

impl RelevanceWeights {
    pub fn new(title: f32, authors: f32, abstract_text: f32) -> Self {
        Self {
            title,
            authors,
            abstract_text,
        }
    }

    /// Weights must be finite and non-negative
    pub fn validate(&self) -> Result<(), PaperSeekError> {
        for (name, weight) in [
            ("title", self.title),
            ("authors", self.authors),
            ("abstract", self.abstract_text),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(PaperSeekError::config(format!(
                    "Weight for '{}' must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }

    pub fn total(&self) -> f32 {
        self.title + self.authors + self.abstract_text
    }
}

/// Locations of the four persisted index artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPaths {
    pub title: PathBuf,
    pub authors: PathBuf,
    pub abstract_text: PathBuf,
    pub metadata: PathBuf,
}

impl IndexPaths {
    /// Standard layout under one directory
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            title: dir.join("title.index"),
            authors: dir.join("author.index"),
            abstract_text: dir.join("abstract.index"),
            metadata: dir.join("metadata.json"),
        }
    }

    pub fn all(&self) -> [&Path; 4] {
        [&self.title, &self.authors, &self.abstract_text, &self.metadata]
    }

    /// True when every artifact is present on disk
    pub fn all_exist(&self) -> bool {
        self.all().iter().all(|p| p.exists())
    }
}

/// PaperSeek application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base data directory
    pub data_dir: PathBuf,

    /// Directory holding the per-facet vector index files
    pub index_dir: PathBuf,

    /// Metadata (record store) file path
    pub metadata_file: PathBuf,

    /// Embedding dimension shared by all three facets
    pub embedding_dim: usize,

    /// Embedding model name
    pub embedding_model: String,

    /// Vision model used for metadata extraction
    pub extraction_model: String,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Default number of results per search
    pub top_k: usize,

    /// Minimum neighbors fetched per facet before fusion
    pub lookahead: usize,

    /// Fusion weights
    pub weights: RelevanceWeights,

    /// Log directory
    pub log_dir: PathBuf,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            index_dir: PathBuf::from("./data/indexes"),
            metadata_file: PathBuf::from("./data/metadata/metadata.json"),
            embedding_dim: 768,
            embedding_model: "nomic-embed-text".to_string(),
            extraction_model: "llava:latest".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            top_k: 5,
            lookahead: 10,
            weights: RelevanceWeights::default(),
            log_dir: PathBuf::from("./data/logs"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration: defaults, then optional TOML file, then
    /// `PAPERSEEK_*` environment variables (nested keys use `__`)
    pub fn load(config_file: Option<&Path>) -> Result<Self, PaperSeekError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(PaperSeekError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| PaperSeekError::config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Paths of the three vector indexes plus the metadata file
    pub fn index_paths(&self) -> IndexPaths {
        IndexPaths {
            metadata: self.metadata_file.clone(),
            ..IndexPaths::in_dir(&self.index_dir)
        }
    }

    /// Ensure required directories exist, create if not
    pub fn ensure_directories(&self) -> Result<(), PaperSeekError> {
        let mut dirs = vec![self.data_dir.clone(), self.index_dir.clone(), self.log_dir.clone()];
        if let Some(parent) = self.metadata_file.parent() {
            dirs.push(parent.to_path_buf());
        }

        for dir in dirs.iter().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    PaperSeekError::config(format!(
                        "Failed to create directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), PaperSeekError> {
        if self.embedding_dim == 0 {
            return Err(PaperSeekError::config("Embedding dimension cannot be 0"));
        }

        if self.embedding_model.is_empty() {
            return Err(PaperSeekError::config("Embedding model name cannot be empty"));
        }

        if !self.ollama_base_url.starts_with("http://")
            && !self.ollama_base_url.starts_with("https://")
        {
            return Err(PaperSeekError::config(
                "Ollama base URL must start with http:// or https://",
            ));
        }

        if self.top_k == 0 {
            return Err(PaperSeekError::config("top_k must be at least 1"));
        }

        self.weights.validate()
    }
}
