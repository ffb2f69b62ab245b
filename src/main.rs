// src/main.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal,
};
use tracing_subscriber::EnvFilter;

use ytrag_assistant::browser::WatchPage;
use ytrag_assistant::config::{AssistantConfig, DEFAULT_BACKEND_URL, DEFAULT_TIMEOUT_SECS};
use ytrag_assistant::player::{FixedUrl, NoPlayer, watch_url};
use ytrag_assistant::timestamps::{DEFAULT_MIN_GAP_SECS, format_time};
use ytrag_assistant::widget::{EntryId, TITLE, Visibility};
use ytrag_assistant::{Assistant, Dispatched, RagClient, WidgetEvent};

#[derive(Parser)]
#[command(version, about = "Ask questions about a YouTube video's transcript")]
struct Args {
    /// Base URL of the RAG backend.
    #[arg(long, global = true, default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// Minimum spacing between seek markers, in seconds.
    #[arg(long, global = true, default_value_t = DEFAULT_MIN_GAP_SECS)]
    min_gap: f64,

    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question without opening a browser.
    Ask {
        #[arg(long)]
        video_id: String,
        question: String,
    },
    /// Open the video in Chromium and chat about it.
    Watch {
        #[arg(long)]
        video_id: String,
        /// Show the browser window.
        #[arg(long)]
        headed: bool,
    },
    /// Check that the backend is up.
    Status,
}

/// One line typed at the watch prompt.
#[derive(Debug, PartialEq)]
enum Input {
    Ask(String),
    /// `marker` is 1-based, as printed.
    Seek { entry: Option<u64>, marker: usize },
    Toggle,
    History,
    Quit,
    Unknown(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Some(Input::Ask(line.to_string()));
    };

    let input = match command {
        "toggle" => Input::Toggle,
        "history" => Input::History,
        "q" | "quit" => Input::Quit,
        _ => parse_seek(command).unwrap_or_else(|| Input::Unknown(line.to_string())),
    };
    Some(input)
}

fn parse_seek(command: &str) -> Option<Input> {
    let (entry, marker) = match command.split_once('.') {
        Some((entry, marker)) => (Some(entry.parse().ok()?), marker),
        None => (None, command),
    };
    let marker: usize = marker.parse().ok()?;
    (marker > 0).then_some(Input::Seek { entry, marker })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let headless = !matches!(args.command, Command::Watch { headed: true, .. });
    let config = AssistantConfig::new(&args.backend_url, args.min_gap, args.timeout_secs, headless)?;

    match args.command {
        Command::Ask { video_id, question } => ask(&config, &video_id, &question).await,
        Command::Watch { video_id, .. } => watch(&config, &video_id).await,
        Command::Status => status(&config).await,
    }
}

async fn ask(config: &AssistantConfig, video_id: &str, question: &str) -> Result<()> {
    let backend = Arc::new(RagClient::new(config)?);
    let assistant = Assistant::new(
        config.min_gap_secs,
        backend,
        Arc::new(FixedUrl(watch_url(video_id))),
        Arc::new(NoPlayer),
    );

    assistant.dispatch(WidgetEvent::ToggleRequested).await?;
    let submit = WidgetEvent::SubmitRequested {
        question: question.to_string(),
    };
    match assistant.dispatch(submit).await? {
        Dispatched::Answered(id) => print_entry(&assistant, id).await,
        _ => anyhow::bail!("question is empty"),
    }
    Ok(())
}

async fn status(config: &AssistantConfig) -> Result<()> {
    let client = RagClient::new(config)?;
    let health = client
        .health()
        .await
        .with_context(|| format!("backend at {} is not reachable", config.backend_url))?;
    println!("✅ {}", health.message);
    Ok(())
}

async fn watch(config: &AssistantConfig, video_id: &str) -> Result<()> {
    let backend = Arc::new(RagClient::new(config)?);
    let page = Arc::new(WatchPage::open(config, video_id).await?);
    let assistant = Arc::new(Assistant::new(
        config.min_gap_secs,
        backend,
        page.clone(),
        page.clone(),
    ));

    println!("💬 {TITLE}");
    let title = page.title().await;
    if !title.is_empty() {
        println!("🎬 {title}");
    }
    println!("Type a question, :N to jump to marker N, :toggle, :history or :quit.");

    assistant.dispatch(WidgetEvent::ToggleRequested).await?;
    print_history(&assistant, false).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = signal::ctrl_c() => {
                println!("Graceful shutdown triggered");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };
        let Some(input) = parse_input(&line) else {
            continue;
        };

        match input {
            Input::Quit => break,
            Input::Ask(question) => {
                let assistant = Arc::clone(&assistant);
                tokio::spawn(async move {
                    match assistant
                        .dispatch(WidgetEvent::SubmitRequested { question })
                        .await
                    {
                        Ok(Dispatched::Answered(id)) => print_entry(&assistant, id).await,
                        Ok(_) => {}
                        Err(err) => println!("⚠️  {err}"),
                    }
                });
            }
            Input::Seek { entry, marker } => seek(&assistant, entry, marker).await,
            Input::Toggle => {
                if let Dispatched::Toggled(Visibility::Open) =
                    assistant.dispatch(WidgetEvent::ToggleRequested).await?
                {
                    print_history(&assistant, false).await;
                }
            }
            Input::History => print_history(&assistant, true).await,
            Input::Unknown(raw) => println!("Unknown command `{raw}`"),
        }
    }

    page.close().await;
    Ok(())
}

async fn seek(assistant: &Assistant, entry: Option<u64>, marker: usize) {
    let entry = match entry {
        Some(id) => Some(EntryId(id)),
        None => assistant.widget().lock().await.latest_with_markers(),
    };
    let Some(entry) = entry else {
        println!("No markers to jump to yet.");
        return;
    };

    let event = WidgetEvent::MarkerSelected {
        entry,
        marker: marker - 1,
    };
    match assistant.dispatch(event).await {
        Ok(Dispatched::Seeked { start }) => println!("⏩ {}", format_time(start)),
        Ok(Dispatched::NoPlayer) => println!("No video player on this page."),
        Ok(_) => {}
        Err(err) => println!("⚠️  {err}"),
    }
}

async fn print_entry(assistant: &Assistant, id: EntryId) {
    let widget = assistant.widget().lock().await;
    if widget.visibility() == Visibility::Closed {
        return;
    }
    if let Some(entry) = widget.entry(id) {
        println!("{entry}");
    }
}

async fn print_history(assistant: &Assistant, with_ids: bool) {
    let widget = assistant.widget().lock().await;
    for entry in widget.entries() {
        if with_ids {
            println!("[{} {}] {entry}", entry.posted_at.format("%H:%M:%S"), entry.id);
        } else {
            println!("{entry}");
        }
    }
}
