use anyhow::Context;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use homework_tutor::{
    cli::{Command, HELP},
    config::Config,
    metrics,
    models::{FileUpload, SettingsUpdate},
    render,
    services::{submission_flow::SubmitOutcome, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    init_tracing(&config);
    tracing::info!(
        "Starting homework tutor client for environment: {}",
        std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string())
    );

    let state = AppState::new(config).context("Failed to initialize application state")?;

    for message in state.store.history() {
        println!("{}", render::render_message(&message));
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => handle(&state, command).await,
            Err(e) => println!("{}", e),
        }
    }

    shutdown_telemetry();
    Ok(())
}

async fn handle(state: &AppState, command: Command) {
    match command {
        Command::Ask(text) => {
            let outcome = state.flow.submit_text(&text).await;
            print_outcome(state, outcome);
        }
        Command::Upload(path) => match read_upload(Path::new(&path)).await {
            Ok(upload) => {
                let outcome = state.flow.submit_file(upload).await;
                print_outcome(state, outcome);
            }
            Err(e) => println!("error: {:#}", e),
        },
        Command::Hint => {
            let guidance = state.store.guidance();
            if guidance.is_none() {
                println!("Ask a question first.");
                return;
            }
            let level = state.store.advance_reveal();
            println!("{}", render::render_reveal(guidance.as_ref(), level));
        }
        Command::Practice(count) => {
            let outcome = state.flow.load_practice(count).await;
            if outcome == SubmitOutcome::Completed {
                println!("{}", render::render_practice(&state.store.practice_problems()));
            } else {
                print_outcome(state, outcome);
            }
        }
        Command::Problem(index) => {
            let outcome = state.flow.select_problem(index).await;
            print_outcome(state, outcome);
        }
        Command::ListProblems => match state.flow.refresh_submission().await {
            SubmitOutcome::Completed => {
                if let Some(submission) = state.store.submission() {
                    println!(
                        "{}",
                        render::render_problems(&submission, state.store.problem_index())
                    );
                }
            }
            outcome => print_outcome(state, outcome),
        },
        Command::NewQuestion => {
            state.store.reset_session();
            println!("Ready for a new question.");
        }
        Command::ClearHistory => {
            state.store.clear_history();
            println!("History cleared.");
        }
        Command::SetProvider(provider) => {
            state
                .store
                .update_settings(SettingsUpdate::provider(provider));
            println!("Provider set to {}.", provider.as_str());
        }
        Command::SetApiKey(api_key) => {
            state.store.update_settings(SettingsUpdate::api_key(api_key));
            let stored = state.store.settings().api_key.is_some();
            println!("{}", if stored { "API key saved." } else { "API key cleared." });
        }
        Command::StartSession(persona) => {
            if let Some(session_id) = state.flow.ensure_session(persona).await {
                println!("Session: {}", session_id);
            } else if let Some(error) = state.store.error() {
                println!("error: {}", error);
            }
        }
        Command::Metrics => match metrics::render_metrics() {
            Ok(text) => println!("{}", text),
            Err(e) => println!("error: {}", e),
        },
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

fn print_outcome(state: &AppState, outcome: SubmitOutcome) {
    match outcome {
        SubmitOutcome::Completed => {
            if let Some(message) = state.store.history().last() {
                println!("{}", render::render_message(message));
            }
            println!(
                "{}",
                render::render_reveal(state.store.guidance().as_ref(), state.store.reveal_level())
            );
        }
        SubmitOutcome::Rejected(reason) | SubmitOutcome::Failed(reason) => {
            println!("error: {}", reason)
        }
        SubmitOutcome::Skipped | SubmitOutcome::Superseded => {}
    }
}

async fn read_upload(path: &Path) -> anyhow::Result<FileUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .context("Upload path has no file name")?
        .to_string();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    Ok(FileUpload::new(
        file_name,
        FileUpload::mime_for_extension(&extension),
        bytes,
    ))
}

fn init_tracing(config: &Config) {
    // OpenTelemetry is only wired up when an OTLP endpoint is configured
    let tracer = config
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| match init_telemetry(endpoint) {
            Ok(tracer) => Some(tracer),
            Err(e) => {
                eprintln!("WARNING: OpenTelemetry disabled: {:#}", e);
                None
            }
        });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "homework_tutor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer)))
        .init();
}

fn init_telemetry(endpoint: &str) -> anyhow::Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use opentelemetry_sdk::Resource;

    // Configure OTLP exporter
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .context("Failed to create OTLP exporter")?;

    // Create resource with service information
    let resource = Resource::builder_empty()
        .with_service_name("homework-tutor-client")
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build();

    let tracer = provider.tracer("homework-tutor");

    // Set global tracer provider
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracer)
}

fn shutdown_telemetry() {
    tracing::info!("Shutting down");
    // In opentelemetry 0.31, shutdown is handled by dropping the provider
}
