use std::{io::Read, process, sync::Arc};

use geographer::{
    application::{
        auth::WebhookAuthenticator,
        content::ContentService,
        error::AppError,
        repos::{ContentStore, FetchMode, QueryParams, RepoError},
        revalidate::RevalidationService,
        tags::{Resolution, TagResolver},
    },
    cache::{CacheConfig, CacheState, TagNamespace},
    config,
    domain::notification::normalize,
    infra::{
        error::InfraError,
        http::{self, ContentState, RouterState, WebhookState},
        sanity::SanityClient,
        telemetry,
    },
};
use serde_json::Value;
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Resolve(args) => run_resolve(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store: Arc<dyn ContentStore> = Arc::new(SanityClient::new(&settings.sanity)?);
    let cache = CacheState::new(CacheConfig::from(&settings.cache));

    let authenticator = WebhookAuthenticator::new(settings.revalidate.secret.clone());
    if !authenticator.is_configured() {
        warn!(
            target = "geographer::serve",
            "No revalidation secret configured; webhook deliveries will be rejected"
        );
    }

    let resolver = TagResolver::new(store.clone(), cache.namespace());
    let revalidation =
        RevalidationService::new(authenticator, resolver, Arc::new(cache.invalidator()));
    let content = ContentService::new(store, cache);

    let router = http::build_router(RouterState {
        webhook: WebhookState {
            revalidation: Arc::new(revalidation),
        },
        content: ContentState {
            content: Arc::new(content),
        },
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "geographer::serve",
        addr = %settings.server.addr,
        "Listening"
    );

    let graceful = settings.server.graceful_shutdown;
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!(
                target = "geographer::serve",
                timeout_secs = graceful.as_secs(),
                "Shutdown signal received; draining connections"
            );
            tokio::spawn(async move {
                tokio::time::sleep(graceful).await;
                warn!(
                    target = "geographer::serve",
                    "Graceful shutdown timed out; exiting"
                );
                process::exit(1);
            });
        })
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_resolve(settings: config::Settings, args: config::ResolveArgs) -> Result<(), AppError> {
    let body = read_payload(&args.file)?;
    let payload: Value = serde_json::from_slice(&body).map_err(AppError::invalid_json)?;
    let notification = normalize(&payload)?;

    let store: Arc<dyn ContentStore> = if args.offline {
        Arc::new(OfflineStore)
    } else {
        Arc::new(SanityClient::new(&settings.sanity)?)
    };
    let resolver = TagResolver::new(
        store,
        TagNamespace::new(settings.cache.tag_namespace.clone()),
    );

    let output = match resolver.resolve(&notification).await? {
        Resolution::Tags(tags) => serde_json::json!({
            "documentType": notification.document_type,
            "tags": tags.into_iter().map(|tag| tag.into_string()).collect::<Vec<_>>(),
        }),
        Resolution::Unhandled(document_type) => serde_json::json!({
            "documentType": document_type,
            "unhandled": true,
        }),
    };
    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|err| AppError::unexpected(format!("failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}

fn read_payload(path: &std::path::Path) -> Result<Vec<u8>, AppError> {
    let mut body = Vec::new();
    if path.as_os_str() == "-" {
        std::io::stdin()
            .read_to_end(&mut body)
            .map_err(|err| AppError::from(InfraError::from(err)))?;
    } else {
        body = std::fs::read(path).map_err(|err| AppError::from(InfraError::from(err)))?;
    }
    Ok(body)
}

/// Answers every reference lookup with no rows.
struct OfflineStore;

#[async_trait::async_trait]
impl ContentStore for OfflineStore {
    async fn query(
        &self,
        _groq: &str,
        _params: &QueryParams,
        _mode: FetchMode,
    ) -> Result<Value, RepoError> {
        Ok(Value::Null)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
