use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router, middleware,
    routing::{get, post},
};
use orderflow_storage::{DynOrderStore, OrderStore};
use orderflow_stream::MemoryStream;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::{
    cache::{BoundedCache, OrderCache},
    config::{AppConfig, StorageBackend},
    handlers,
    ingest::IngestPipeline,
    lookup::LookupService,
    metrics,
    middleware as app_middleware,
};

/// Shared request state.
#[derive(Clone)]
pub struct AppState {
    pub lookup: LookupService,
    pub cache: Arc<BoundedCache>,
    pub store: DynOrderStore,
    pub stream: MemoryStream,
}

impl AppState {
    pub fn new(store: DynOrderStore, cache: Arc<BoundedCache>, stream: MemoryStream) -> Self {
        let lookup = LookupService::new(cache.clone() as Arc<dyn OrderCache>, store.clone());
        Self {
            lookup,
            cache,
            store,
            stream,
        }
    }

    /// Ingest pipeline reading from this state's stream into its store and cache.
    pub fn ingest_pipeline(&self) -> IngestPipeline {
        IngestPipeline::new(
            Arc::new(self.stream.reader()),
            self.store.clone(),
            self.cache.clone(),
        )
    }
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;

    let mut router = Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .route("/order", get(handlers::missing_order_id))
        .route("/order/", get(handlers::missing_order_id))
        .route("/order/{order_uid}", get(handlers::get_order));
    if cfg.stream.publish_endpoint {
        router = router.route("/publish", post(handlers::publish));
    }

    router
        .route_layer(middleware::from_fn(app_middleware::http_metrics))
        .with_state(state)
        // Middleware stack (outermost last: request id -> trace -> cors/compression -> timeout -> body limit)
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(cfg.request_timeout()))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .headers()
                        .get(&app_middleware::REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
}

/// Loads the most recent orders into the cache.
///
/// Entries come back newest first and are inserted oldest first, so the
/// newest order ends up most recently used. Failures are logged and leave the
/// cache as it was. Returns the number of orders loaded.
pub async fn warmup_cache(store: &dyn OrderStore, cache: &BoundedCache, limit: usize) -> usize {
    if limit == 0 {
        tracing::debug!("cache warmup disabled");
        return 0;
    }
    match store.warmup(limit).await {
        Ok(entries) => {
            for (order_uid, raw) in entries.iter().rev() {
                cache.set(order_uid, raw);
            }
            metrics::set_cache_entries(cache.len());
            tracing::info!(
                loaded = entries.len(),
                limit,
                store = store.backend_name(),
                "cache warmed up"
            );
            entries.len()
        }
        Err(e) => {
            tracing::warn!(error = %e, category = %e.category(), "cache warmup failed");
            0
        }
    }
}

pub struct OrderflowServer {
    addr: SocketAddr,
    app: Router,
    state: AppState,
    shutdown: CancellationToken,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    store: Option<DynOrderStore>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            store: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Uses `store` instead of creating one from the storage configuration.
    pub fn with_store(mut self, store: DynOrderStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Connects the store, warms the cache and wires the routes.
    pub async fn build(self) -> anyhow::Result<OrderflowServer> {
        let store = match self.store {
            Some(store) => store,
            None => create_store(&self.config).await?,
        };
        tracing::info!(backend = store.backend_name(), "order store ready");

        let cache = Arc::new(BoundedCache::new(self.config.cache.capacity));
        warmup_cache(store.as_ref(), &cache, self.config.cache.warmup_limit).await;

        let stream = MemoryStream::with_redelivery_delay(
            self.config.stream.topic.clone(),
            Duration::from_millis(self.config.stream.redelivery_delay_ms),
        );
        let state = AppState::new(store, cache, stream);
        let app = build_app(&self.config, state.clone());

        Ok(OrderflowServer {
            addr: self.addr,
            app,
            state,
            shutdown: CancellationToken::new(),
        })
    }
}

async fn create_store(cfg: &AppConfig) -> anyhow::Result<DynOrderStore> {
    let store = match cfg.storage.backend {
        StorageBackend::Memory => orderflow_db_memory::create_store(),
        StorageBackend::Postgres => {
            let pg = cfg.storage.postgres.to_postgres_config();
            tracing::info!(
                url = %orderflow_db_postgres::mask_password(&pg.url),
                "connecting to postgres"
            );
            orderflow_db_postgres::create_store(pg).await?
        }
    };
    Ok(store)
}

impl OrderflowServer {
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Token that stops the server and the ingest loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener).await
    }

    /// Serves HTTP on `listener` while the ingest loop runs alongside.
    ///
    /// Stops on SIGINT, SIGTERM, cancellation of the shutdown token, or a
    /// fatal ingest error, which is returned after the HTTP server drains.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let Self {
            app,
            state,
            shutdown,
            ..
        } = self;

        tracing::info!("listening on {}", listener.local_addr()?);

        let pipeline = state.ingest_pipeline();
        let ingest_shutdown = shutdown.clone();
        let ingest = tokio::spawn(async move {
            let result = pipeline.run(ingest_shutdown.clone()).await;
            if result.is_err() {
                // A dead consumer takes the whole service down.
                ingest_shutdown.cancel();
            }
            result
        });

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
            .await;

        shutdown.cancel();
        state.stream.close();
        let ingested = ingest.await;

        served?;
        ingested??;
        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("shutdown signal received"),
        _ = terminate => tracing::info!("terminate signal received"),
        _ = shutdown.cancelled() => tracing::info!("shutdown requested"),
    }
    shutdown.cancel();
}
