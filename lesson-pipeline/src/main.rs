use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use email_delivery::{LessonMailer, MailSettings, SmtpConfig};
use interfaces::LogOnlyNotifier;
use lesson_pipeline::{
    build_dashboard, AppConfig, ArticleSource, ChatCompletionsComposer, ContentCache, FailureReporter,
    Fetcher, LessonArchive, LessonGenerator, LessonNotifier, LessonPipeline, NewsApiSource, RssFeedSource,
    SerpApiSource, SqliteStore, TrendAggregator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lesson-pipeline", about = "Daily micro-lesson generation and delivery")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and deliver lessons
    Run {
        /// Lesson date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Only run this track
        #[arg(long)]
        track: Option<String>,
        /// Log lessons instead of emailing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Print learning progress as JSON
    Dashboard {
        #[arg(long, default_value_t = 10)]
        recent: usize,
    },
    /// Print aggregated trends and insights for a track as JSON
    Trends {
        #[arg(long)]
        track: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = Arc::new(AppConfig::load(cli.config.as_deref())?);
    info!("Configuration: {} tracks, secrets {:?}", config.tracks.len(), config.secrets);

    let store = Arc::new(SqliteStore::connect(&config.storage.database_url).await.map_err(|e| {
        error!("Failed to open lesson store at {}: {}", config.storage.database_url, e);
        e
    })?);

    match cli.command {
        Command::Run { date, track, dry_run } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let aggregator = Arc::new(build_aggregator(&config, store.clone())?);

            let fetcher = Arc::new(Fetcher::new(&config.fetch)?);
            let composer = Arc::new(ChatCompletionsComposer::new(
                fetcher,
                config.apis.composer.clone(),
                config.secrets.llm_api_key.clone(),
            ));

            let (notifier, reporter) = delivery_channels(&config, dry_run)?;
            let archive: Arc<dyn LessonArchive> = store;

            let pipeline = LessonPipeline::new(
                config.clone(),
                LessonGenerator::new(aggregator, composer),
                archive,
                notifier,
                reporter,
            );

            let summary = pipeline.run_for_date(date, track.as_deref()).await?;
            if !summary.failed.is_empty() {
                warn!("Tracks without a delivered lesson: {}", summary.failed.join(", "));
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Dashboard { recent } => {
            let history = store.lessons().await?;
            let view = build_dashboard(&history, Local::now().date_naive(), recent);
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::Trends { track: name } => {
            let track = config
                .track(&name)
                .ok_or_else(|| anyhow::anyhow!("unknown track '{}'", name))?;
            let aggregator = build_aggregator(&config, store.clone())?;
            let content = aggregator.content_for(track).await;
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
    }

    Ok(())
}

fn build_aggregator(config: &AppConfig, store: Arc<SqliteStore>) -> anyhow::Result<TrendAggregator> {
    let fetcher = Arc::new(Fetcher::new(&config.fetch)?);
    // Feeds tolerate redirects and self-signed certificates.
    let feed_fetcher = Arc::new(Fetcher::new(&config.fetch.relaxed())?);

    let sources: Vec<Box<dyn ArticleSource>> = vec![
        Box::new(NewsApiSource::new(
            fetcher.clone(),
            config.apis.news_api.clone(),
            config.secrets.news_api_key.clone(),
        )),
        Box::new(SerpApiSource::new(
            fetcher,
            config.apis.serp_api.clone(),
            config.secrets.serp_api_key.clone(),
        )),
        Box::new(RssFeedSource::new(feed_fetcher)),
    ];

    let cache = ContentCache::new(store, config.cache.ttl_seconds);
    Ok(TrendAggregator::new(sources, cache, config.aggregation.clone()))
}

fn delivery_channels(
    config: &AppConfig,
    dry_run: bool,
) -> anyhow::Result<(Arc<dyn LessonNotifier>, Arc<dyn FailureReporter>)> {
    let smtp_uri = config.secrets.smtp_uri.as_deref();
    let recipient = config.delivery.recipient.clone();

    match (dry_run, smtp_uri, recipient) {
        (false, Some(uri), Some(recipient)) => {
            let smtp = SmtpConfig::from_uri(uri, config.secrets.smtp_password.clone())?;
            let mailer = Arc::new(LessonMailer::new(
                smtp,
                MailSettings {
                    sender: config.delivery.sender.clone(),
                    recipient,
                    operator: config.delivery.operator.clone(),
                    subject_prefix: config.delivery.subject_prefix.clone(),
                },
            ));
            let notifier: Arc<dyn LessonNotifier> = mailer.clone();
            let reporter: Arc<dyn FailureReporter> = mailer;
            Ok((notifier, reporter))
        }
        (false, _, _) => {
            warn!("SMTP_URI or recipient not configured; lessons will only be logged");
            Ok(log_only())
        }
        (true, _, _) => Ok(log_only()),
    }
}

fn log_only() -> (Arc<dyn LessonNotifier>, Arc<dyn FailureReporter>) {
    let notifier: Arc<dyn LessonNotifier> = Arc::new(LogOnlyNotifier);
    let reporter: Arc<dyn FailureReporter> = Arc::new(LogOnlyNotifier);
    (notifier, reporter)
}
