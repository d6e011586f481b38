use clap::Parser;
use chrono::Utc;
use pdf_chat_core::{
    IndexOptions, LopdfExtractor, OpenAiChatClient, OpenAiEmbedder, SessionController,
    SessionError, UploadedFile, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBEDDING_MODEL,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-chat", version)]
struct Cli {
    /// PDF files to load into the chat session.
    pdf_files: Vec<PathBuf>,

    /// OpenAI-compatible API base URL.
    #[arg(long, default_value = "https://api.openai.com")]
    api_base: String,

    /// API key, read once at startup.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Chat completion model.
    #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Embedding model.
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Vector dimensions reported by the embedding model.
    #[arg(long, default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Reuse a persisted index across runs (building and saving one if absent).
    #[arg(long, default_value_t = false)]
    reuse: bool,

    /// Directory holding the persisted index when --reuse is set.
    #[arg(long, default_value = "persist")]
    persist_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "pdf-chat boot"
    );

    let mut uploads = Vec::with_capacity(cli.pdf_files.len());
    for path in &cli.pdf_files {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = std::fs::read(path)
            .map_err(|error| anyhow::anyhow!("unable to read {}: {error}", path.display()))?;
        uploads.push(UploadedFile::new(name, bytes));
    }

    let embedder = OpenAiEmbedder::new(&cli.api_base, &cli.api_key)
        .with_model(&cli.embedding_model, cli.embedding_dimensions);
    let chat_client =
        OpenAiChatClient::new(&cli.api_base, &cli.api_key).with_model(&cli.chat_model);
    let options = IndexOptions {
        reuse: cli.reuse,
        persist_dir: cli.persist_dir.clone(),
    };

    if cli.reuse && options.has_persisted_index() {
        println!("Reusing index from {}", cli.persist_dir.display());
    }

    let mut session = SessionController::new(LopdfExtractor, chat_client, embedder, options);

    match session.upload(&uploads).await {
        Ok(()) => {
            info!(files = uploads.len(), documents = session.document_count(), "index ready");
        }
        Err(error @ SessionError::NoUploads) => {
            // Nothing to index; mirror the message and stop here.
            println!("{error}");
            return Ok(());
        }
        Err(error) => {
            return Err(anyhow::anyhow!(error.to_string()));
        }
    }

    println!("Ask questions about your PDFs. :clear resets history, :quit exits.");

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("question> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            "" => continue,
            ":quit" => break,
            ":clear" => {
                session.clear_history();
                println!("History cleared.");
            }
            question => match session.ask(question).await {
                Ok(Some(answer)) => {
                    println!("{answer}");
                }
                Ok(None) => {}
                Err(error) => {
                    // The failed exchange is not recorded; the user may
                    // simply ask again.
                    println!("An error occurred: {error}");
                }
            },
        }
    }

    info!(turns = session.history().len(), "session ended");
    Ok(())
}
