use presale_assistant::api::middleware::StaticTokens;
use presale_assistant::api::{create_router, AppState, JobProducer};
use presale_assistant::application::{EmbeddingIndexer, IngestionService, RagService};
use presale_assistant::domain::ports::{DocumentSource, IndexMirror};
use presale_assistant::domain::ContentExtractor;
use presale_assistant::infrastructure::config::{MirrorKind, SourceKind};
use presale_assistant::infrastructure::{
    create_pool, AppConfig, GeminiComposer, GeminiEmbedding, GoogleDriveSource,
    IngestDocumentsJob, InMemoryVectorStore, JobConsumer, LocalFileSource, QdrantMirror,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "presale_assistant=debug,api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let app_config = Arc::new(AppConfig::load()?);
    let config = &app_config.config;

    let redis_pool = create_pool(&config.redis_url)?;
    info!("Redis pool initialized");

    let embedding = Arc::new(GeminiEmbedding::from_config(&config.embedding));
    let index = Arc::new(InMemoryVectorStore::with_dimension(Some(config.embedding.dimension)));

    let mut indexer = EmbeddingIndexer::new(
        embedding.clone(),
        index.clone(),
        config.embedding.timeout(),
        config.embedding.concurrency,
    );
    if config.index.mirror == MirrorKind::Qdrant {
        let mirror = Arc::new(
            QdrantMirror::new(
                &config.index.qdrant_url,
                &config.index.collection,
                config.embedding.dimension,
            )
            .await?,
        );
        let records = mirror.load(&config.embedding.model).await?;
        let restored = index.restore(&config.embedding.model, records)?;
        info!(restored, collection = %config.index.collection, "index restored from Qdrant");
        indexer = indexer.with_mirror(mirror);
    }

    let source: Arc<dyn DocumentSource> = match config.source.kind {
        SourceKind::Drive => Arc::new(GoogleDriveSource::new(&config.source)?),
        SourceKind::Local => Arc::new(LocalFileSource::new(&config.source.data_dir)),
    };

    let ingestion = Arc::new(IngestionService::new(
        source,
        ContentExtractor::new(config.extraction.chunk_size),
        Arc::new(indexer),
        config.source.timeout(),
        config.worker.document_concurrency,
    ));

    let rag = Arc::new(
        RagService::new(
            embedding,
            index.clone(),
            Arc::new(GeminiComposer::new(&app_config)),
            config.rag.top_k,
        )
        .with_timeouts(config.embedding.timeout(), config.llm.timeout()),
    );

    let consumer = JobConsumer::new(
        redis_pool.clone(),
        ingestion.clone(),
        config.retry.clone(),
        config.worker.concurrency,
        config.worker.result_ttl_seconds,
    );
    tokio::spawn(async move {
        if let Err(e) = consumer.start().await {
            tracing::error!(error = %e, "ingestion consumer stopped");
        }
    });

    if config.source.sync_on_startup {
        let producer = JobProducer::new(redis_pool.clone(), config.worker.result_ttl_seconds);
        let job = IngestDocumentsJob::sync_folder(config.source.folder_id.clone());
        match producer.push_ingest_job(&job).await {
            Ok(job_id) => info!(%job_id, "startup sync queued"),
            Err(e) => tracing::warn!(error = %e, "could not queue startup sync"),
        }
    }

    let tokens = StaticTokens::new(config.auth.tokens.clone());
    let state = AppState::new(
        redis_pool,
        app_config.clone(),
        rag,
        ingestion,
        index,
        Arc::new(tokens),
    );
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
