mod settings;

use std::fmt;
use std::sync::Arc;

use dioxus::LaunchBuilder;
use dioxus::desktop::{Config as DesktopConfig, WindowBuilder};
use quiz_core::model::{ContentKey, QuizKind, TaskId};
use quiz_core::normalize::RawQuestion;
use services::{
    Clock, HttpQuizApi, QuizApiConfig, QuizLoopConfig, QuizLoopService, TracingReporter,
};
use storage::repository::{InMemorySessionCache, Storage};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use ui::{App, QuizLaunch, UiApp, build_app_context};

use crate::settings::AppConfig;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidKind { raw: String },
    InvalidTaskId { raw: String },
    InvalidContentId { raw: String },
    InvalidDbUrl { raw: String },
    Questions { path: String, reason: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidKind { raw } => write!(f, "invalid --kind value: {raw}"),
            ArgsError::InvalidTaskId { raw } => write!(f, "invalid --task-id value: {raw}"),
            ArgsError::InvalidContentId { raw } => {
                write!(f, "invalid --content-id value: {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::Questions { path, reason } => {
                write!(f, "cannot read questions from {path}: {reason}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

struct DesktopApp {
    quiz_loop: Arc<QuizLoopService>,
    launch: QuizLaunch,
}

impl UiApp for DesktopApp {
    fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    fn launch(&self) -> QuizLaunch {
        self.launch.clone()
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  cargo run -p app -- [--db <sqlite_url>] [--kind <kind>] [--task-id <id>] \
         [--content-id <id>] [--preview] [--questions <file.json>]"
    );
    eprintln!();
    eprintln!("Kinds:");
    let kinds: Vec<&str> = QuizKind::ALL.iter().map(|kind| kind.as_str()).collect();
    eprintln!("  {}", kinds.join(", "));
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db from QUIZ__DATABASE__URL or config/<APP_ENV>.toml");
    eprintln!("  --kind flashcard");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  APP_ENV, QUIZ__API__BASE_URL, QUIZ__API__TIMEOUT_SECS, RUST_LOG");
}

struct Args {
    db_url: String,
    launch: QuizLaunch,
}

impl Args {
    fn parse(
        args: &mut impl Iterator<Item = String>,
        default_db_url: &str,
    ) -> Result<Option<Self>, ArgsError> {
        let mut db_url = normalize_sqlite_url(default_db_url.to_string());
        let mut kind = QuizKind::Flashcard;
        let mut task_id = None;
        let mut key = None;
        let mut preview = false;
        let mut questions_path = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--kind" => {
                    let value = require_value(args, "--kind")?;
                    kind = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidKind { raw: value.clone() })?;
                }
                "--task-id" => {
                    let value = require_value(args, "--task-id")?;
                    let parsed: TaskId = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidTaskId { raw: value.clone() })?;
                    task_id = Some(parsed);
                }
                "--content-id" => {
                    let value = require_value(args, "--content-id")?;
                    let parsed: u64 = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidContentId { raw: value.clone() })?;
                    key = Some(ContentKey::for_content(parsed));
                }
                "--preview" => preview = true,
                "--questions" => questions_path = Some(require_value(args, "--questions")?),
                "--help" | "-h" => return Ok(None),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let preview_questions = questions_path.map(|path| read_questions(&path)).transpose()?;
        // Supplying questions inline only makes sense for an authoring preview.
        let preview = preview || preview_questions.is_some();

        Ok(Some(Self {
            db_url,
            launch: QuizLaunch {
                key: key.unwrap_or_else(ContentKey::generate),
                kind,
                task_id,
                preview,
                preview_questions,
            },
        }))
    }
}

fn read_questions(path: &str) -> Result<Vec<RawQuestion>, ArgsError> {
    let failed = |reason: String| ArgsError::Questions {
        path: path.to_string(),
        reason,
    };
    let raw = std::fs::read_to_string(path).map_err(|err| failed(err.to_string()))?;
    serde_json::from_str(&raw).map_err(|err| failed(err.to_string()))
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app=info,services=info,storage=info,ui=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = AppConfig::load()?;
    init_tracing();

    let mut argv = std::env::args().skip(1);
    let Some(parsed) = Args::parse(&mut argv, &settings.database.url).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?
    else {
        print_usage();
        return Ok(());
    };

    // Open + migrate SQLite at startup so the services stay free of file handling.
    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    tracing::info!(db = %parsed.db_url, api = %settings.api.base_url, "storage ready");

    let api = Arc::new(HttpQuizApi::new(QuizApiConfig::new(
        settings.api.base_url.clone(),
    )));
    let cache = Arc::new(InMemorySessionCache::with_capacity(settings.cache.capacity));
    let quiz_loop = Arc::new(
        QuizLoopService::new(
            Clock::system(),
            api,
            cache,
            Arc::clone(&storage.device),
            Arc::new(TracingReporter),
        )
        .with_config(QuizLoopConfig::with_timeout(settings.request_timeout())),
    );

    let title = format!("Quiz: {}", parsed.launch.kind);
    tracing::info!(
        kind = %parsed.launch.kind,
        key = %parsed.launch.key,
        preview = parsed.launch.preview,
        "launching quiz window"
    );

    let app: Arc<dyn UiApp> = Arc::new(DesktopApp {
        quiz_loop,
        launch: parsed.launch,
    });
    let context = build_app_context(&app);

    // Dioxus/tao can default to an always-on-top window in some dev setups.
    let desktop_cfg = DesktopConfig::new().with_window(
        WindowBuilder::new()
            .with_title(title)
            .with_always_on_top(false),
    );

    LaunchBuilder::desktop()
        .with_cfg(desktop_cfg)
        .with_context(context)
        .launch(App);
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
