use std::net::{SocketAddr, ToSocketAddrs as _};
use std::sync::Arc;

use axum::extract::Request;
use axum::{Router, ServiceExt};
use thiserror::Error;
use tower::Layer as _;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tracing_subscriber::EnvFilter;

use crate::batch::{self, BatchRequest};
use crate::cmd::{ImportCommand, NestedCommand, ServeCommand, SiteCommand};
use crate::conf::{LogFormat, SiteConf};
use crate::errors::ApiError;
use crate::store::{self, DocumentStore, StoreError};
use crate::value::RowValues;
use crate::views::{self, parse_id};
use crate::{layers, watch};

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Import failed: {0}")]
    Import(#[from] ApiError),

    #[error("Invalid import file: {0}")]
    ImportFile(#[from] serde_json::Error),

    #[error("Serve error: {0}")]
    ServeError(#[from] axum::Error),

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

/// Installs the global subscriber. `RUST_LOG` wins over the defaults.
pub fn init_tracing(conf: &SiteConf, verbose: bool) {
    if !conf.log_init {
        return;
    }
    let default = if verbose { "ipodesk=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match conf.log_format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

pub struct SiteBuilder {
    conf: SiteConf,
    store: Option<Arc<dyn DocumentStore>>,
}

impl SiteBuilder {
    fn new(conf: SiteConf) -> Self {
        Self { conf, store: None }
    }

    /// Uses `store` instead of connecting to `conf.database`.
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub async fn build(self) -> Result<Site, SiteError> {
        let store = match self.store {
            Some(store) => store,
            None => store::connect(&self.conf.database).await?,
        };

        let router = views::router()
            .fallback(layers::not_found)
            .layer(axum::middleware::from_fn(layers::trace_requests))
            .layer(CatchPanicLayer::custom(layers::panic_response));

        #[cfg(feature = "cors")]
        let router = router.layer(tower_http::cors::CorsLayer::permissive());

        Ok(Site {
            inner: Arc::new(SiteInner {
                start_time: std::time::Instant::now(),
                conf: self.conf,
                store,
                router,
            }),
        })
    }
}

struct SiteInner {
    start_time: std::time::Instant,
    conf: SiteConf,
    store: Arc<dyn DocumentStore>,
    router: Router<Site>,
}

#[derive(Clone)]
pub struct Site {
    inner: Arc<SiteInner>,
}

impl Site {
    pub fn builder(conf: SiteConf) -> SiteBuilder {
        SiteBuilder::new(conf)
    }

    /// In-memory site, mostly for tests.
    pub async fn memory() -> Result<Site, SiteError> {
        Site::builder(SiteConf::memory())
            .with_store(Arc::new(store::MemoryStore::new()))
            .build()
            .await
    }

    pub fn conf(&self) -> &SiteConf {
        &self.inner.conf
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.inner.start_time.elapsed()
    }

    /// Mainly needed for testing purposes.
    pub fn router(&self) -> Router {
        self.inner.router.clone().with_state(self.clone())
    }

    async fn serve_forever(self, opts: ServeCommand, verbose: bool) -> Result<(), SiteError> {
        let host = opts.host.unwrap_or_else(|| self.inner.conf.host.clone());
        let port = opts.port.unwrap_or(self.inner.conf.port);

        let addr: SocketAddr = format!("{}:{}", host, port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut iter| iter.next())
            .ok_or_else(|| {
                SiteError::ConfigError(format!(
                    "Failed to resolve address for {}:{}. Ensure the address is valid.",
                    host, port
                ))
            })?;

        let listener = tokio::net::TcpListener::bind(addr).await?;

        if verbose {
            println!("Server running at http://{}", addr);
        }
        tracing::info!(%addr, "Listening");

        // Trailing slashes are trimmed before routing.
        let service = NormalizePathLayer::trim_trailing_slash().layer(self.router());

        let touch_reload = self.inner.conf.touch_reload.clone();
        axum::serve(listener, ServiceExt::<Request>::into_make_service(service))
            .with_graceful_shutdown(watch::shutdown_signal(touch_reload))
            .await?;

        Ok(())
    }

    async fn import_file(self, opts: ImportCommand) -> Result<(), SiteError> {
        let table_id = parse_id(&opts.table_id, "table")?;
        let raw = tokio::fs::read(&opts.file).await?;
        let data: Vec<RowValues> = serde_json::from_slice(&raw)?;

        let summary = batch::import(
            self.store().as_ref(),
            BatchRequest {
                table_id,
                data,
                unique_key_field: opts.unique_key,
                skip_duplicates: opts.skip_duplicates,
            },
        )
        .await?;

        println!("{}", summary.message());
        for failure in &summary.errors {
            println!("  row {}: {}", failure.index, failure.error);
        }
        Ok(())
    }

    pub async fn run(self, cmd: SiteCommand) -> Result<(), SiteError> {
        match cmd.nested {
            NestedCommand::Serve(opts) => self.serve_forever(opts, cmd.verbose).await,
            NestedCommand::Import(opts) => self.import_file(opts).await,
        }
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("conf", &self.inner.conf)
            .field("uptime", &self.uptime())
            .finish()
    }
}
