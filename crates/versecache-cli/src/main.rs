//! versecache - operator CLI for the content cache and quiz engine.
//!
//! Warms and inspects the on-disk content cache, clears entries, prints
//! quiz progress and plays a quiz session in the terminal.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use versecache_core::cache::{ContentRegistry, Loaded};
use versecache_core::content::{QUIZ_CATEGORIES, QUIZ_QUESTIONS};
use versecache_core::quiz::{AdvanceOutcome, QuizState, QuizSummary};
use versecache_core::utils::format_elapsed;
use versecache_core::{
    CacheManager, Config, ContentSources, FileStore, HttpFetcher, LoadOrigin, QuizEngine,
    RevealPolicy,
};

const USAGE: &str = "\
Usage: versecache <command>

Commands:
  sources                                  List content sources and cache ages
  load <source-id> [--refresh]             Load a source through the cache
  clear [<source-id>]                      Clear one or every cache entry
  progress                                 Show quiz progress
  quiz <category> [--count N] [--at-end]   Play a quiz
";

/// Questions per quiz when `--count` is not given.
const DEFAULT_QUESTION_COUNT: usize = 10;

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing() -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

/// Everything a command needs, built from config.
struct App {
    config: Config,
    sources: ContentSources,
    registry: ContentRegistry,
    cache: CacheManager,
}

impl App {
    fn new() -> Result<Self> {
        Self::from_config(Config::load())
    }

    fn from_config(config: Config) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let store = FileStore::new(data_dir.clone())
            .with_context(|| format!("Failed to open data directory: {}", data_dir.display()))?;
        let fetcher = HttpFetcher::with_timeout(config.request_timeout())?;
        let cache = CacheManager::new(Arc::new(store), Arc::new(fetcher))
            .with_fetch_timeout(config.request_timeout());

        let sources = ContentSources::new(config.content_base_url());
        let registry = sources.registry()?;
        Ok(Self {
            config,
            sources,
            registry,
            cache,
        })
    }

    fn quiz_engine(&self) -> QuizEngine {
        QuizEngine::new(
            self.cache.clone(),
            self.sources.quiz_questions.clone(),
            self.sources.quiz_categories.clone(),
            self.config.user_id(),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprint!("{}", USAGE);
        return Ok(());
    };
    let rest = &args[1..];

    // Help must work without touching config or the data directory.
    if is_help(command) {
        print!("{}", USAGE);
        return Ok(());
    }

    let app = App::new()?;
    info!(command = %command, data_dir = ?app.config.data_dir().ok(), "versecache starting");

    match command.as_str() {
        "sources" => list_sources(&app),
        "load" => {
            let Some(source_id) = rest.iter().find(|a| !a.starts_with("--")) else {
                bail!("load needs a source id\n\n{}", USAGE);
            };
            let refresh = rest.iter().any(|a| a == "--refresh");
            load_source(&app, source_id, refresh).await
        }
        "clear" => {
            println!("{}", clear(&app, rest.first().map(String::as_str))?);
            Ok(())
        }
        "progress" => show_progress(&app),
        "quiz" => {
            let Some(category) = rest.iter().find(|a| !a.starts_with("--")) else {
                bail!("quiz needs a category (try \"all\")\n\n{}", USAGE);
            };
            let count = flag_value(rest, "--count")
                .map(|v| v.parse::<usize>().with_context(|| format!("Invalid --count: {}", v)))
                .transpose()?
                .unwrap_or(DEFAULT_QUESTION_COUNT);
            let policy = if rest.iter().any(|a| a == "--at-end") {
                RevealPolicy::AtEnd
            } else {
                RevealPolicy::AfterEach
            };
            play_quiz(&app, category, count, policy).await
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn is_help(command: &str) -> bool {
    matches!(command, "help" | "--help" | "-h")
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn format_ttl(ttl: chrono::Duration) -> String {
    if ttl == chrono::Duration::zero() {
        "always refetch".to_string()
    } else if ttl.num_minutes() < 60 {
        format!("{}m", ttl.num_minutes())
    } else {
        format!("{}h", ttl.num_hours())
    }
}

fn list_sources(app: &App) -> Result<()> {
    let ages = app.cache.cache_ages(&app.registry);
    println!("{:<18} {:<16} {:<10} URL", "SOURCE", "TTL", "CACHED");
    for (info, age) in app.registry.iter().zip(ages.iter()) {
        println!(
            "{:<18} {:<16} {:<10} {}",
            info.source_id,
            format_ttl(info.ttl),
            age.display(),
            info.remote_url
        );
    }
    Ok(())
}

fn print_origin<T>(loaded: &Loaded<T>) {
    print!("origin: {:?}", loaded.origin);
    if let Some(at) = loaded.fetched_at {
        print!(" (fetched {})", at.format("%Y-%m-%d %H:%M UTC"));
    }
    println!();
    if let Some(ref e) = loaded.fetch_error {
        println!("fetch error: {}", e);
    }
}

/// Top-level shape of an opaque payload.
fn describe(value: &Value) -> String {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                Value::Array(items) => format!("{}: {} items", k, items.len()),
                Value::Object(fields) => format!("{}: {} entries", k, fields.len()),
                _ => k.clone(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Array(items) => format!("{} items", items.len()),
        other => other.to_string(),
    }
}

async fn load_source(app: &App, source_id: &str, refresh: bool) -> Result<()> {
    match source_id {
        QUIZ_QUESTIONS => {
            let loaded = app.cache.load(&app.sources.quiz_questions, refresh).await?;
            print_origin(&loaded);
            println!(
                "{} questions in {} categories",
                loaded.payload.total_questions(),
                loaded.payload.category_ids().count()
            );
        }
        QUIZ_CATEGORIES => {
            let loaded = app.cache.load(&app.sources.quiz_categories, refresh).await?;
            print_origin(&loaded);
            for category in loaded.payload.iter() {
                println!("  {:<20} {}", category.id, category.name);
            }
        }
        other => {
            let Some(source) = app.sources.opaque(other) else {
                bail!("Unknown source: {}", other);
            };
            let loaded = app.cache.load(source, refresh).await?;
            print_origin(&loaded);
            println!("{}", describe(&loaded.payload));
        }
    }
    Ok(())
}

/// Clear one or every entry, returning the line to report.
fn clear(app: &App, source_id: Option<&str>) -> Result<String> {
    match source_id {
        None => {
            app.cache.clear_all(&app.registry)?;
            Ok(format!("Cleared {} cache entries", app.registry.len()))
        }
        Some(source_id) => {
            match source_id {
                QUIZ_QUESTIONS => app.cache.clear(&app.sources.quiz_questions)?,
                QUIZ_CATEGORIES => app.cache.clear(&app.sources.quiz_categories)?,
                other => {
                    let Some(source) = app.sources.opaque(other) else {
                        bail!("Unknown source: {}", other);
                    };
                    app.cache.clear(source)?;
                }
            }
            Ok(format!("Cleared cache entry for {}", source_id))
        }
    }
}

fn show_progress(app: &App) -> Result<()> {
    let progress = app.quiz_engine().progress()?;
    println!("User:              {}", app.config.user_id());
    println!("Quizzes completed: {}", progress.total_quizzes_completed);
    println!("Correct answers:   {}", progress.total_correct_answers);
    println!(
        "Points:            {} (level {}, {} to next)",
        progress.total_points,
        progress.level(),
        progress.points_to_next_level()
    );
    for (category, stats) in &progress.per_category {
        println!(
            "  {:<20} {} quizzes, {} correct",
            category, stats.completed_count, stats.correct_answers
        );
    }
    Ok(())
}

/// Read one line from stdin without blocking the runtime.
async fn read_line() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| -> Result<Option<String>> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        Ok(if read == 0 { None } else { Some(line.trim().to_string()) })
    })
    .await?
}

async fn play_quiz(app: &App, category: &str, count: usize, policy: RevealPolicy) -> Result<()> {
    let mut engine = app.quiz_engine();
    engine.start_session(category, count, policy).await?;
    if let Some(origin) = engine.content_origin() {
        if matches!(origin, LoadOrigin::Stale | LoadOrigin::Fallback) {
            println!("(offline: using {:?} questions)", origin);
        }
    }

    loop {
        let Some(session) = engine.session() else {
            break;
        };
        let Some(question) = session.current_question().cloned() else {
            break;
        };
        println!(
            "\nQuestion {}/{}: {}",
            session.current_index() + 1,
            session.len(),
            question.question
        );
        let choices = question.choices();
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}) {}", i + 1, choice);
        }
        print!("> ");
        io::stdout().flush()?;

        let started = Instant::now();
        let Some(input) = read_line().await? else {
            engine.abandon();
            println!("\nQuiz abandoned.");
            return Ok(());
        };
        let chosen = match input.parse::<usize>() {
            Ok(n) if (1..=choices.len()).contains(&n) => n - 1,
            _ => {
                println!("Enter a number between 1 and {}", choices.len());
                continue;
            }
        };
        for _ in 0..started.elapsed().as_secs() {
            engine.tick();
        }

        let answer = engine.submit_answer(chosen)?;
        if policy == RevealPolicy::AfterEach {
            if answer.is_correct {
                println!("Correct! ({})", format_elapsed(answer.elapsed_seconds));
            } else {
                println!("Wrong. Answer: {}", question.correct_answer_text());
            }
            if let Some(ref explanation) = question.explanation {
                println!("{}", explanation);
            }
            if let AdvanceOutcome::SessionCompleted(_) = engine.advance()? {
                break;
            }
        }
    }

    match engine.state() {
        QuizState::Completed(summary) => print_summary(summary),
        other => bail!("Quiz ended while {}", other.name()),
    }
    Ok(())
}

fn print_summary(summary: &QuizSummary) {
    println!(
        "\n{} / {} correct ({}%), score {}, time {}",
        summary.correct_count,
        summary.total_questions,
        summary.percentage(),
        summary.score,
        format_elapsed(summary.total_elapsed_seconds)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use versecache_core::KeyValueStore;

    fn test_app(dir: &TempDir) -> App {
        let config = Config {
            content_base_url: Some("http://127.0.0.1:9".to_string()),
            data_dir: Some(dir.path().join("data")),
            ..Default::default()
        };
        App::from_config(config).unwrap()
    }

    #[test]
    fn test_help_recognised() {
        assert!(is_help("help"));
        assert!(is_help("--help"));
        assert!(is_help("-h"));
        assert!(!is_help("sources"));
    }

    #[test]
    fn test_clear_reports_single_and_all() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);
        let store = FileStore::new(dir.path().join("data")).unwrap();
        store.set("bible_facts_data_v1", b"{}").unwrap();

        assert_eq!(
            clear(&app, Some("bible_facts")).unwrap(),
            "Cleared cache entry for bible_facts"
        );
        assert!(store.get("bible_facts_data_v1").unwrap().is_none());
        assert_eq!(
            clear(&app, Some(QUIZ_QUESTIONS)).unwrap(),
            "Cleared cache entry for quiz_questions"
        );
        assert_eq!(clear(&app, None).unwrap(), "Cleared 7 cache entries");
        assert!(clear(&app, Some("unknown")).is_err());
    }
}
