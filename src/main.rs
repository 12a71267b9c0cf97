use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use docqa_cli::{display_banner, print_answer, print_chunks, print_sources, run_chat};
use docqa_core::{
    CorpusSnapshot, Embedder, HashingEmbedder, RetrievalConfig, snapshot::DEFAULT_SNAPSHOT_FILE,
};
use docqa_gemini::{GeminiClient, GeminiConfig, GeminiEmbedder};
use docqa_rag::{
    IngestReport, PromptAssembler, PromptTemplate, QaEngine, Retriever, load_documents,
};

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Ask questions about your documents", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one question from the documents
    Ask {
        question: String,
        #[command(flatten)]
        corpus: CorpusArgs,
        #[command(flatten)]
        answer: AnswerArgs,
        /// Print the answer and its sources as JSON
        #[arg(long)]
        json: bool,
    },
    /// Chunk the documents and print or save the chunks
    Chunks {
        #[command(flatten)]
        corpus: CorpusArgs,
        /// Write the chunks as JSON instead of printing them
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_SNAPSHOT_FILE)]
        out: Option<PathBuf>,
    },
    /// Show the chunks closest to a query
    Search {
        query: String,
        #[command(flatten)]
        corpus: CorpusArgs,
    },
    /// Ask questions interactively
    Chat {
        #[command(flatten)]
        corpus: CorpusArgs,
        #[command(flatten)]
        answer: AnswerArgs,
    },
}

#[derive(Args)]
struct CorpusArgs {
    /// Document file or directory (.txt, .md)
    #[arg(short, long = "doc", required = true)]
    docs: Vec<PathBuf>,

    /// Characters per chunk [env: DOCQA_CHUNK_SIZE]
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks [env: DOCQA_CHUNK_OVERLAP]
    #[arg(long)]
    overlap: Option<usize>,

    /// Number of chunks to retrieve [env: DOCQA_TOP_K]
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Embed locally with feature hashing instead of Gemini
    #[arg(long)]
    offline: bool,
}

#[derive(Args)]
struct AnswerArgs {
    /// Prompt template: free_form, yes_no or decision_record
    #[arg(short, long, default_value = "free_form")]
    template: PromptTemplate,

    /// What the documents are, used in the prompt (e.g. "insurance policy documents")
    #[arg(long, default_value = "documents")]
    domain: String,

    /// Print the assembled prompt
    #[arg(long)]
    show_prompt: bool,
}

impl CorpusArgs {
    /// Env settings overridden by flags
    fn retrieval_config(&self) -> Result<RetrievalConfig> {
        let mut config = RetrievalConfig::from_env()?;
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(overlap) = self.overlap {
            config.chunk_overlap = overlap;
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        config.validate()?;
        Ok(config)
    }

    fn load_texts(&self) -> Result<Vec<String>> {
        let documents = load_documents(&self.docs).context("Failed to load documents")?;
        tracing::info!(documents = documents.len(), "loaded documents");
        Ok(documents.into_iter().map(|d| d.text).collect())
    }

    fn embedder(&self) -> Result<CorpusEmbedder> {
        if self.offline {
            Ok(CorpusEmbedder::Hashing(HashingEmbedder::default()))
        } else {
            Ok(CorpusEmbedder::Gemini(GeminiEmbedder::new(GeminiConfig::from_env()?)?))
        }
    }
}

/// Embedding backend picked at startup
enum CorpusEmbedder {
    Gemini(GeminiEmbedder),
    Hashing(HashingEmbedder),
}

#[async_trait]
impl Embedder for CorpusEmbedder {
    fn model_id(&self) -> &str {
        match self {
            CorpusEmbedder::Gemini(e) => e.model_id(),
            CorpusEmbedder::Hashing(e) => e.model_id(),
        }
    }

    async fn embed(&self, text: &str) -> docqa_core::Result<Vec<f32>> {
        match self {
            CorpusEmbedder::Gemini(e) => e.embed(text).await,
            CorpusEmbedder::Hashing(e) => e.embed(text).await,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> docqa_core::Result<Vec<Vec<f32>>> {
        match self {
            CorpusEmbedder::Gemini(e) => e.embed_batch(texts).await,
            CorpusEmbedder::Hashing(e) => e.embed_batch(texts).await,
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCQA_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Chunks { corpus, out } => chunks(&corpus, out.as_deref()),
        Command::Search { query, corpus } => search(&corpus, &query).await,
        Command::Ask {
            question,
            corpus,
            answer,
            json,
        } => ask(&corpus, &answer, &question, json).await,
        Command::Chat { corpus, answer } => chat(&corpus, &answer).await,
    }
}

fn chunks(corpus: &CorpusArgs, out: Option<&Path>) -> Result<()> {
    let config = corpus.retrieval_config()?;
    let chunker = config.chunker()?;

    let mut chunks = Vec::new();
    for text in corpus.load_texts()? {
        let next_id = chunks.len() as u64;
        chunks.extend(chunker.chunk_from(&text, next_id));
    }
    let snapshot = CorpusSnapshot::new(chunker.chunk_size(), chunker.overlap(), &chunks);

    match out {
        Some(path) => {
            snapshot
                .write_json(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} Saved {} chunks to {}",
                "✅".green(),
                snapshot.len(),
                path.display()
            );
        }
        None => print_chunks(&snapshot),
    }
    Ok(())
}

async fn search(corpus: &CorpusArgs, query: &str) -> Result<()> {
    let config = corpus.retrieval_config()?;
    let top_k = config.top_k;
    let retriever = Retriever::new(Arc::new(corpus.embedder()?), config)?;
    retriever.ingest(&corpus.load_texts()?).await?;

    let results = retriever.retrieve_scored(query, top_k).await?;
    print_sources(&results);
    Ok(())
}

async fn build_engine(
    corpus: &CorpusArgs,
    answer: &AnswerArgs,
) -> Result<(QaEngine<CorpusEmbedder, GeminiClient>, IngestReport)> {
    let config = corpus.retrieval_config()?;
    let generator = GeminiClient::from_env().context("Gemini is required to generate answers")?;
    let engine = QaEngine::new(Arc::new(corpus.embedder()?), Arc::new(generator), config)?
        .with_assembler(PromptAssembler::new().with_domain(answer.domain.clone()));

    let report = engine.ingest(&corpus.load_texts()?).await?;
    Ok((engine, report))
}

async fn ask(corpus: &CorpusArgs, args: &AnswerArgs, question: &str, json: bool) -> Result<()> {
    let (engine, _) = build_engine(corpus, args).await?;
    let answer = engine.ask(question, args.template).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer, args.show_prompt);
        print_sources(&answer.sources);
    }
    Ok(())
}

async fn chat(corpus: &CorpusArgs, args: &AnswerArgs) -> Result<()> {
    let (engine, report) = build_engine(corpus, args).await?;

    display_banner(&report, engine.retriever().embedder().model_id());
    run_chat(&engine, args.template, args.show_prompt).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from([
            "docqa", "-v", "ask", "Is knee surgery covered?", "--doc", "policy.md", "-d", "extra",
            "-t", "yes-no", "-k", "5", "--offline",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Ask {
                question,
                corpus,
                answer,
                json,
            } => {
                assert_eq!(question, "Is knee surgery covered?");
                assert_eq!(corpus.docs, [PathBuf::from("policy.md"), PathBuf::from("extra")]);
                assert_eq!(corpus.top_k, Some(5));
                assert!(corpus.offline);
                assert_eq!(answer.template, PromptTemplate::YesNo);
                assert_eq!(answer.domain, "documents");
                assert!(!json);
            }
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_cli_rejects_bad_input() {
        // --doc is required
        assert!(Cli::try_parse_from(["docqa", "search", "query"]).is_err());
        assert!(
            Cli::try_parse_from(["docqa", "ask", "q", "--doc", "a.txt", "--template", "poem"])
                .is_err()
        );
    }

    #[test]
    fn test_chunks_out_defaults_to_snapshot_file() {
        let cli = Cli::try_parse_from(["docqa", "chunks", "--doc", "a.txt", "--out"]).unwrap();
        match cli.command {
            Command::Chunks { out, .. } => {
                assert_eq!(out, Some(PathBuf::from(DEFAULT_SNAPSHOT_FILE)))
            }
            _ => panic!("expected chunks"),
        }
    }

    #[test]
    fn test_chunks_writes_snapshot() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("doc.txt");
        let out = dir.path().join("chunks.json");
        fs::write(&doc, "abcdefghij").unwrap();

        let corpus = CorpusArgs {
            docs: vec![doc],
            chunk_size: Some(4),
            overlap: Some(1),
            top_k: None,
            offline: true,
        };
        chunks(&corpus, Some(&out)).unwrap();

        let snapshot = CorpusSnapshot::read_json(&out).unwrap();
        let texts: Vec<String> = snapshot.chunks.into_iter().map(|c| c.text).collect();
        assert_eq!(texts, ["abcd", "defg", "ghij"]);
    }
}
