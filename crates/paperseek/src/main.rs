mod retriever;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use paperseek_common::{logger, AppConfig, Record};
use paperseek_llm::PageInput;
use paperseek_vector::SearchHit;
use std::path::PathBuf;

use crate::retriever::PaperRetriever;

#[derive(Parser)]
#[command(name = "paperseek")]
#[command(about = "PaperSeek - find similar papers by title, authors and abstract", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a fresh index from a JSON array of articles
    Build {
        /// Articles file ([{"title", "authors", "abstract"}, ...])
        #[arg(long)]
        articles: PathBuf,

        /// Do not write the index to disk
        #[arg(long)]
        no_save: bool,
    },

    /// Add one paper to the persisted index
    Add {
        #[arg(long)]
        title: String,

        /// Author names, comma separated
        #[arg(long)]
        authors: String,

        #[arg(long = "abstract")]
        abstract_text: String,
    },

    /// Find papers similar to a first page
    Search {
        #[command(flatten)]
        page: PageArgs,

        /// Number of results (defaults to the configured top_k)
        #[arg(long)]
        top_k: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics
    Stats,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PageArgs {
    /// Image of the first page (JPEG/PNG)
    #[arg(long)]
    image: Option<PathBuf>,

    /// Text of the first page
    #[arg(long)]
    text: Option<PathBuf>,
}

impl PageArgs {
    fn into_input(self) -> Result<PageInput> {
        Ok(match (self.image, self.text) {
            (Some(image), _) => PageInput::from_image_file(&image)?,
            (None, Some(text)) => PageInput::from_text_file(&text)?,
            (None, None) => bail!("either --image or --text is required"),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.ensure_directories()?;
    logger::init_logging(Some(config.log_dir.as_path()), &config.log_level)?;

    tracing::info!("PaperSeek starting...");
    tracing::info!("  Index directory: {}", config.index_dir.display());
    tracing::info!("  Embedding model: {} ({} dims)", config.embedding_model, config.embedding_dim);

    let default_top_k = config.top_k;
    let mut retriever = PaperRetriever::new(config)?;

    match cli.command {
        Commands::Build { articles, no_save } => {
            let indexed = retriever.initialize_index(&articles).await?;
            if !no_save {
                retriever.save_index()?;
            }
            println!("Indexed {} documents", indexed);
        }
        Commands::Add {
            title,
            authors,
            abstract_text,
        } => {
            load_existing(&mut retriever)?;
            let authors: Vec<&str> = authors.split(',').collect();
            let doc_id = retriever
                .add_to_index(Record::with_author_list(title, &authors, abstract_text))
                .await?;
            retriever.save_index()?;
            println!(
                "Added document {} ({} total)",
                doc_id,
                retriever.total_documents()
            );
        }
        Commands::Search { page, top_k, json } => {
            if !load_existing(&mut retriever)? {
                bail!("No index found, run `paperseek build` first");
            }
            let hits = retriever
                .search_by_page(page.into_input()?, top_k.unwrap_or(default_top_k))
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print_hits(&hits);
            }
        }
        Commands::Stats => {
            load_existing(&mut retriever)?;
            let stats = retriever.stats();
            println!("Documents: {}", stats.documents);
            println!("Dimension: {}", stats.dimension);
            println!("Weights:   {:?}", retriever.config().weights);
        }
    }

    Ok(())
}

/// Restore the persisted index, pointing at a rebuild when it is damaged
fn load_existing(retriever: &mut PaperRetriever) -> Result<bool> {
    retriever.load_index_if_present().map_err(|e| {
        if e.is_state_corruption() {
            anyhow!("{}; rebuild the index with `paperseek build`", e)
        } else {
            e.into()
        }
    })
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results");
        return;
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("{}. [{:.4}] {}", rank + 1, hit.score, hit.record.title);
        println!("   {}", hit.record.authors);
    }
}
