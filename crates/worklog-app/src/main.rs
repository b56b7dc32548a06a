//! worklog application binary - composition root.
//!
//! 1. Init tracing, then load configuration from TOML
//! 2. Open the saved index, embedding the work-log directory on first use
//! 3. Run the requested command (ask, chat, embed, status)

mod cli;

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

use worklog_core::{EmbedderKind, IngestConfig, WorklogConfig};
use worklog_retrieval::{
    AnswerGenerator, ChatRequest, ChatResponse, ChatService, ExtractiveAnswerer, PromptAnswerer,
    SimilarityIndex,
};
use worklog_vector::{
    BoxedEmbedder, IndexBuilder, IndexStore, IngestSummary, MemoryIndex, OnnxEmbeddingService,
    TextSplitter, TokenHashEmbedder, UpdateOutcome, WorkLogLoader,
};

use cli::{expand_home, CliArgs, Command};

type AppIndex = MemoryIndex<BoxedEmbedder>;

/// Everything the commands work on.
struct Workspace {
    builder: IndexBuilder,
    store: IndexStore,
    index: Arc<AppIndex>,
}

/// Build the embedding backend named in the config, plus a label that
/// identifies it in the snapshot fingerprint.
fn select_embedder(ingest: &IngestConfig) -> Result<(BoxedEmbedder, String), Box<dyn Error>> {
    match ingest.embedder {
        EmbedderKind::Onnx => {
            let model_dir = expand_home(&ingest.model_dir);
            let service = OnnxEmbeddingService::from_directory(&model_dir).map_err(|e| {
                format!(
                    "{}. Place model.onnx and tokenizer.json there, or set \
                     ingest.embedder = \"token-hash\" in the config",
                    e
                )
            })?;
            let embedder: BoxedEmbedder = Box::new(service);
            Ok((embedder, format!("onnx:{}", model_dir.display())))
        }
        EmbedderKind::TokenHash => {
            tracing::warn!(
                "Using the lexical token-hash embedder; content questions only match closely worded entries"
            );
            let embedder: BoxedEmbedder = Box::new(TokenHashEmbedder::new(ingest.embedding_dim)?);
            Ok((embedder, format!("token-hash:{}", ingest.embedding_dim)))
        }
    }
}

fn open_workspace(
    config: &WorklogConfig,
    data_dir: &Path,
    index_dir: PathBuf,
) -> Result<Workspace, Box<dyn Error>> {
    let ingest = &config.ingest;
    let (embedder, embedder_label) = select_embedder(ingest)?;
    let builder = IndexBuilder::new(
        WorkLogLoader::with_extension(data_dir, ingest.extension.clone()),
        TextSplitter::from_config(ingest)?,
    )
    .with_max_incremental_files(ingest.max_incremental_files);

    let fingerprint = format!(
        "data={};embedder={};chunks={}/{};ext={}",
        data_dir.display(),
        embedder_label,
        ingest.chunk_size,
        ingest.chunk_overlap,
        ingest.extension
    );
    Ok(Workspace {
        builder,
        store: IndexStore::new(index_dir, fingerprint),
        index: Arc::new(MemoryIndex::new(embedder)),
    })
}

/// Embed every work log from scratch and save the snapshot.
async fn rebuild(ws: &Workspace) -> Result<IngestSummary, Box<dyn Error>> {
    let started = Local::now().naive_local();
    let summary = ws.builder.build(&ws.index).await?;
    ws.store.save(&ws.index, started)?;
    Ok(summary)
}

/// Load the saved index for querying, embedding the work logs if there is
/// no usable snapshot yet.
async fn open_index(ws: &Workspace) -> Result<(), Box<dyn Error>> {
    match ws.store.load(&ws.index) {
        Ok(Some(_)) => {
            if let Some(since) = ws.store.last_update()? {
                let pending = ws.builder.loader().modified_after(since)?.len();
                if pending > 0 {
                    tracing::warn!(
                        pending,
                        "Work logs changed since the last embed; run `worklog embed` to include them"
                    );
                }
            }
            return Ok(());
        }
        Ok(None) => tracing::info!("No saved index; embedding work logs"),
        Err(e) => tracing::warn!(error = %e, "Saved index unreadable; rebuilding"),
    }
    rebuild(ws).await?;
    Ok(())
}

fn print_summary(verb: &str, summary: &IngestSummary) {
    println!(
        "{} {} files into {} chunks ({} skipped, {} removed)",
        verb,
        summary.files_processed,
        summary.documents_processed,
        summary.files_skipped,
        summary.files_removed
    );
}

/// `worklog embed [--force]`: update the saved index incrementally, or
/// rebuild it when forced or when there is nothing to update from.
async fn embed(ws: &Workspace, force: bool) -> Result<(), Box<dyn Error>> {
    if !ws.builder.loader().exists()? {
        println!(
            "No work logs found in {}",
            ws.builder.loader().root().display()
        );
        return Ok(());
    }

    let since = if force {
        None
    } else {
        match ws.store.load(&ws.index) {
            Ok(Some(_)) => ws.store.last_update()?,
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Saved index unreadable; rebuilding");
                None
            }
        }
    };

    let Some(since) = since else {
        let summary = rebuild(ws).await?;
        print_summary("Embedded", &summary);
        return Ok(());
    };

    let started = Local::now().naive_local();
    match ws.builder.update(&ws.index, since).await? {
        UpdateOutcome::UpToDate => {
            println!("No new or modified files found. Embeddings are up to date.");
        }
        UpdateOutcome::Updated(summary) => {
            ws.store.save(&ws.index, started)?;
            print_summary("Updated", &summary);
        }
        UpdateOutcome::RebuildRecommended { changed } => {
            return Err(format!(
                "{} files changed since the last embed. Run `worklog embed --force` for a full rebuild.",
                changed
            )
            .into());
        }
    }
    Ok(())
}

async fn status(ws: &Workspace) -> Result<(), Box<dyn Error>> {
    let loader = ws.builder.loader();
    println!("Data directory: {}", loader.root().display());
    println!("Work-log files: {}", loader.list_files()?.len());
    println!("Index directory: {}", ws.store.dir().display());

    match ws.store.load(&ws.index)? {
        Some(chunks) => {
            println!("Chunks indexed: {}", chunks);
            match ws.store.last_update()? {
                Some(at) => {
                    println!("Last update: {}", at.format("%Y-%m-%d %H:%M:%S"));
                    println!(
                        "Changed since then: {}",
                        loader.modified_after(at)?.len()
                    );
                }
                None => println!("Last update: unknown"),
            }
        }
        None => println!("Saved index: none (run `worklog embed`)"),
    }
    println!(
        "Index available: {}",
        if ws.index.is_available().await { "yes" } else { "no" }
    );
    Ok(())
}

fn print_response(response: &ChatResponse) {
    println!("Answer:\n{}\n", response.answer);
    if !response.sources.is_empty() {
        println!("Sources: {}", response.sources.join(", "));
    }
    println!("Found {} relevant documents", response.documents_found);
    println!(
        "Query type: {}\n",
        if response.is_temporal {
            "Temporal"
        } else {
            "Content-based"
        }
    );
}

/// Read questions from stdin until "exit" or end of input.
async fn chat_loop(
    chat: &ChatService,
    max_results: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    println!("Ask me anything about your work logs (type \"exit\" to quit):\n");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }
        if input.is_empty() {
            continue;
        }

        let mut request = ChatRequest::new(input);
        request.max_results = max_results;
        match chat.process_query(&request, Local::now().naive_local()).await {
            Ok(response) => print_response(&response),
            Err(e) => {
                tracing::debug!(error = ?e, "Query failed");
                eprintln!("Error: {}\n", e);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = CliArgs::parse();

    // Tracing. RUST_LOG wins; otherwise the level is settled once the config
    // has been read.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let level_from_env = env_filter.is_some();
    let initial = env_filter
        .unwrap_or_else(|| EnvFilter::new(args.log_level.as_deref().unwrap_or("warn")));
    let (filter, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    // Config.
    let config_file = args.resolve_config_path();
    let config = WorklogConfig::load_or_default(&config_file);
    if !level_from_env {
        filter_handle.reload(EnvFilter::new(
            args.resolve_log_level(&config.general.log_level),
        ))?;
    }
    tracing::debug!(
        path = %config_file.display(),
        "Starting worklog v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Index.
    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    let index_dir = expand_home(&config.general.index_dir);
    let ws = open_workspace(&config, &data_dir, index_dir)?;

    match args.command {
        Command::Status => status(&ws).await?,
        Command::Embed { force } => embed(&ws, force).await?,
        Command::Ask {
            query,
            max_results,
            json,
            prompt,
        } => {
            open_index(&ws).await?;
            let generator: Arc<dyn AnswerGenerator> = if prompt {
                Arc::new(PromptAnswerer)
            } else {
                Arc::new(ExtractiveAnswerer::new(&config.retrieval))
            };
            let chat = ChatService::new(ws.index.clone(), generator, config.retrieval.clone());
            let mut request = ChatRequest::new(query.join(" "));
            request.max_results = max_results;
            let response = chat
                .process_query(&request, Local::now().naive_local())
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else if prompt {
                println!("{}", response.answer);
            } else {
                print_response(&response);
            }
        }
        Command::Chat { max_results } => {
            open_index(&ws).await?;
            let chat = ChatService::new(
                ws.index.clone(),
                Arc::new(ExtractiveAnswerer::new(&config.retrieval)),
                config.retrieval.clone(),
            );
            chat_loop(&chat, max_results).await?;
        }
    }

    Ok(())
}
