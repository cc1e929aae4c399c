use anyhow::{Context, Result, anyhow};
use assistant::{AssistantConfig, ChatRequest, Orchestrator};
use catalog::{CatalogIndex, CatalogStore};
use clap::{Parser, Subcommand};
use colored::Colorize;
use ml_client::testing::{BagOfWordsEmbedder, ScriptedModel};
use ml_client::{Embedder, InferenceClient, LanguageModel, ModelBackend};
use rand::Rng;
use retrieval::{CatalogResolver, EpisodeDetector, Resolution, ToolName, ToolRegistry};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// ReelChat - movie catalog assistant
#[derive(Parser)]
#[command(name = "reel-chat")]
#[command(about = "Answer questions about a movie catalog", long_about = None)]
struct Cli {
    /// Directory holding the catalog export (movies.json, ...)
    #[arg(short, long, default_value = "data/catalog")]
    data_dir: PathBuf,

    /// TOML file with assistant settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the inference service address
    #[arg(long)]
    inference_addr: Option<String>,

    /// Override the model backend (primary | constrained)
    #[arg(long)]
    backend: Option<String>,

    /// Run without the inference service: local embeddings, no generation
    #[arg(long)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        question: String,

        /// Slug of the page the question is asked from
        #[arg(long)]
        slug: Option<String>,

        /// Episode of the page the question is asked from
        #[arg(long)]
        episode: Option<u32>,

        #[arg(long)]
        session: Option<String>,
    },

    /// Interactive chat; type `exit` or `quit` to leave
    Chat {
        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Show how a movie reference resolves
    Resolve { text: String },

    /// Run one tool with JSON arguments
    Tool {
        /// Tool name, e.g. find_movie_by_name
        name: String,

        #[arg(default_value = "{}")]
        args: String,
    },

    /// Fire concurrent questions and report latencies
    Bench {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,

        /// Number of distinct sessions the requests are spread over
        #[arg(long, default_value = "8")]
        sessions: usize,
    },
}

/// Everything the commands need, built once
struct Runtime {
    store: Arc<CatalogIndex>,
    model: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
    config: AssistantConfig,
}

impl Runtime {
    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::from_parts(
            self.store.clone(),
            self.model.clone(),
            self.embedder.clone(),
            &self.config,
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let runtime = build_runtime(&cli)?;

    match cli.command {
        Commands::Ask {
            question,
            slug,
            episode,
            session,
        } => handle_ask(&runtime, question, slug, episode, session).await,
        Commands::Chat { session } => handle_chat(&runtime, session).await?,
        Commands::Resolve { text } => handle_resolve(&runtime, &text).await,
        Commands::Tool { name, args } => handle_tool(&runtime, &name, &args).await?,
        Commands::Bench {
            requests,
            concurrent,
            sessions,
        } => handle_bench(&runtime, requests, concurrent, sessions).await?,
    }

    Ok(())
}

fn build_runtime(cli: &Cli) -> Result<Runtime> {
    let mut config = AssistantConfig::load(cli.config.as_deref())?;
    if let Some(addr) = &cli.inference_addr {
        config.inference.addr = addr.clone();
    }
    if let Some(backend) = &cli.backend {
        config.inference.backend = backend.parse::<ModelBackend>().map_err(|e| anyhow!(e))?;
    }

    println!("Loading catalog from {}...", cli.data_dir.display());
    let start = Instant::now();
    let store = Arc::new(
        CatalogIndex::load_from_dir(&cli.data_dir).context("Failed to load catalog export")?,
    );
    let (entries, segments, embeddings) = store.counts();
    println!(
        "{} Loaded {} entries, {} segments, {} embeddings in {:?}",
        "✓".green(),
        entries,
        segments,
        embeddings,
        start.elapsed()
    );

    let (model, embedder): (Arc<dyn LanguageModel>, Arc<dyn Embedder>) = if cli.offline {
        println!("{} Offline: generation disabled, local embeddings", "!".yellow());
        (
            Arc::new(ScriptedModel::failing(config.inference.backend)),
            Arc::new(BagOfWordsEmbedder::default()),
        )
    } else {
        let client = InferenceClient::connect_lazy(config.inference.clone())
            .context("Failed to set up inference client")?;
        (Arc::new(client.clone()), Arc::new(client))
    };

    Ok(Runtime {
        store,
        model,
        embedder,
        config,
    })
}

/// Handle the 'ask' command
async fn handle_ask(
    runtime: &Runtime,
    question: String,
    slug: Option<String>,
    episode: Option<u32>,
    session: Option<String>,
) {
    let mut request = ChatRequest::new(question);
    request.current_slug = slug;
    request.current_episode = episode;
    request.session_id = session;

    let start = Instant::now();
    let reply = runtime.orchestrator().reply(request).await;
    println!("{}", reply);
    println!("{}", format!("({:?})", start.elapsed()).dimmed());
}

/// Handle the 'chat' command
async fn handle_chat(runtime: &Runtime, session: String) -> Result<()> {
    let orchestrator = runtime.orchestrator();
    println!("{}", "Chat started. Type 'exit' to leave.".bold().blue());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} ", "bạn>".green().bold());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let reply = orchestrator
            .reply(ChatRequest::new(message).with_session(session.clone()))
            .await;
        println!("{} {}\n", "bot>".cyan().bold(), reply);
    }
    Ok(())
}

/// Handle the 'resolve' command
async fn handle_resolve(runtime: &Runtime, text: &str) {
    let resolver = CatalogResolver::new(runtime.store.clone(), runtime.embedder.clone())
        .with_config(runtime.config.resolver.clone());

    println!("{}", format!("Resolving '{}':", text).bold().blue());
    match resolver.resolve(text).await {
        Resolution::Matched(entry) => {
            println!("{}Matched: {} [{}]", "• ".green(), entry.title, entry.slug);
            println!("{}Kind: {}", "• ".green(), entry.kind.as_str());
            if let Some(link) = entry.link() {
                println!("{}Link: {}", "• ".green(), link);
            }
        }
        Resolution::Ambiguous(candidates) => {
            println!("{}Ambiguous between:", "• ".yellow());
            for (i, brief) in candidates.iter().enumerate() {
                println!(
                    "  {} [{}] score {:.1}",
                    brief.clarification_line(i + 1),
                    brief.slug,
                    brief.score.unwrap_or(0.0)
                );
            }
        }
        Resolution::NotFound => println!("{}Not found", "• ".red()),
    }

    match EpisodeDetector::new().detect(text) {
        Some(episode) => println!("{}Detected episode: {}", "• ".cyan(), episode),
        None => println!("{}No episode mentioned", "• ".cyan()),
    }
}

/// Handle the 'tool' command
async fn handle_tool(runtime: &Runtime, name: &str, args: &str) -> Result<()> {
    if ToolName::parse(name).is_none() {
        let known: Vec<&str> = ToolName::ALL.iter().map(ToolName::as_str).collect();
        return Err(anyhow!("Unknown tool '{}', expected one of: {}", name, known.join(", ")));
    }
    let args: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(args).context("Tool arguments must be a JSON object")?;

    let registry = ToolRegistry::new(runtime.store.clone(), runtime.embedder.clone());
    let result = registry.execute_named(name, &args).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to render tool result")?
    );
    Ok(())
}

/// Handle the 'bench' command
async fn handle_bench(
    runtime: &Runtime,
    requests: usize,
    concurrent: usize,
    sessions: usize,
) -> Result<()> {
    let titles: Vec<String> = runtime
        .store
        .list_headlines()
        .context("Failed to list catalog")?
        .into_iter()
        .map(|h| h.title)
        .collect();
    if titles.is_empty() {
        return Err(anyhow!("Catalog is empty, nothing to ask about"));
    }

    let orchestrator = Arc::new(runtime.orchestrator());
    let permits = Arc::new(Semaphore::new(concurrent.max(1)));

    let questions: Vec<(String, String)> = {
        let mut rng = rand::rng();
        (0..requests)
            .map(|i| {
                let title = &titles[rng.random_range(0..titles.len())];
                let episode = rng.random_range(1..=5);
                (
                    format!("bench-{}", i % sessions.max(1)),
                    format!("{} tập {} nói về gì", title, episode),
                )
            })
            .collect()
    };

    let start = Instant::now();
    let mut handles = Vec::with_capacity(requests);
    for (session, question) in questions {
        let orchestrator = orchestrator.clone();
        let permits = permits.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let started = Instant::now();
            orchestrator
                .reply(ChatRequest::new(question).with_session(session))
                .await;
            Ok::<_, anyhow::Error>(started.elapsed())
        }));
    }

    let mut timings = Vec::with_capacity(requests);
    for handle in handles {
        timings.push(handle.await??);
    }
    let total_time = start.elapsed();

    let Some(stats) = LatencyStats::from_timings(timings) else {
        println!("No requests made");
        return Ok(());
    };
    println!("{}", "Benchmark results:".bold().blue());
    println!("Total time: {:?}", total_time);
    println!("Average latency: {:?}", stats.average);
    println!("P50 latency: {:?}", stats.p50);
    println!("P95 latency: {:?}", stats.p95);
    println!("P99 latency: {:?}", stats.p99);
    println!(
        "Throughput: {:.2} requests/second",
        stats.count as f64 / total_time.as_secs_f64().max(f64::EPSILON)
    );
    Ok(())
}

struct LatencyStats {
    count: usize,
    average: Duration,
    p50: Duration,
    p95: Duration,
    p99: Duration,
}

impl LatencyStats {
    fn from_timings(mut timings: Vec<Duration>) -> Option<Self> {
        if timings.is_empty() {
            return None;
        }
        timings.sort();
        let count = timings.len();
        let percentile = |p: f64| timings[((count as f64 * p) as usize).min(count - 1)];
        Some(Self {
            count,
            average: timings.iter().sum::<Duration>() / count as u32,
            p50: percentile(0.50),
            p95: percentile(0.95),
            p99: percentile(0.99),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_stats() {
        let timings: Vec<Duration> = (1..=100).rev().map(Duration::from_millis).collect();
        let stats = LatencyStats::from_timings(timings).unwrap();

        assert_eq!(stats.count, 100);
        assert_eq!(stats.p50, Duration::from_millis(51));
        assert_eq!(stats.p95, Duration::from_millis(96));
        assert_eq!(stats.p99, Duration::from_millis(100));
        assert_eq!(stats.average, Duration::from_micros(50_500));
    }

    #[test]
    fn test_latency_stats_single_and_empty() {
        assert!(LatencyStats::from_timings(Vec::new()).is_none());

        let stats = LatencyStats::from_timings(vec![Duration::from_millis(7)]).unwrap();
        assert_eq!(stats.p99, Duration::from_millis(7));
    }
}
