//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use aurelion_core::config::AppConfig;
use aurelion_core::traits::StorageProvider;
use aurelion_database::{ChangeLedger, FileRepository};
use aurelion_service::{
    ContentStore, DigestService, OwnershipGuard, RangeReader, SyncService, ThumbnailPipeline,
};
use aurelion_storage::thumbnail::ThumbnailRenderer;

use crate::auth::TokenVerifier;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// File rows and the change ledger
    pub files: Arc<dyn FileRepository>,
    /// Content bytes
    pub content: Arc<dyn StorageProvider>,
    /// Cached thumbnails
    pub thumbnail_store: Arc<dyn StorageProvider>,

    // ── Auth ─────────────────────────────────────────────────
    /// Bearer token verifier
    pub tokens: Arc<TokenVerifier>,

    // ── Services ─────────────────────────────────────────────
    /// Upload, listing, and deletion
    pub store: Arc<ContentStore>,
    /// State fingerprint
    pub digest: Arc<DigestService>,
    /// Ledger pulls
    pub sync: Arc<SyncService>,
    /// Content streaming
    pub reader: Arc<RangeReader>,
    /// Thumbnail derivation
    pub thumbnails: Arc<ThumbnailPipeline>,
}

/// Collaborators [`AppState::new`] wires the services from.
#[derive(Debug, Clone)]
pub struct Backends {
    /// File rows.
    pub files: Arc<dyn FileRepository>,
    /// Change ledger.
    pub ledger: Arc<dyn ChangeLedger>,
    /// Content bytes.
    pub content: Arc<dyn StorageProvider>,
    /// Cached thumbnails.
    pub thumbnails: Arc<dyn StorageProvider>,
    /// Thumbnail transcoder.
    pub renderer: Arc<dyn ThumbnailRenderer>,
}

impl AppState {
    /// Build every service on top of the given backends.
    pub fn new(config: AppConfig, backends: Backends) -> Self {
        let Backends {
            files,
            ledger,
            content,
            thumbnails,
            renderer,
        } = backends;

        let guard = Arc::new(OwnershipGuard::new(Arc::clone(&files)));
        let store = Arc::new(ContentStore::new(
            Arc::clone(&files),
            Arc::clone(&content),
            Arc::clone(&thumbnails),
            Arc::clone(&guard),
            config.storage.max_upload_size_bytes,
        ));
        let digest = Arc::new(DigestService::new(Arc::clone(&files)));
        let sync = Arc::new(SyncService::new(ledger, &config.sync));
        let reader = Arc::new(RangeReader::new(
            Arc::clone(&files),
            Arc::clone(&content),
            Arc::clone(&guard),
        ));
        let pipeline = Arc::new(ThumbnailPipeline::new(
            Arc::clone(&files),
            Arc::clone(&content),
            Arc::clone(&thumbnails),
            renderer,
            guard,
            config.thumbnails.workers,
        ));

        Self {
            tokens: Arc::new(TokenVerifier::new(&config.auth)),
            config: Arc::new(config),
            files,
            content,
            thumbnail_store: thumbnails,
            store,
            digest,
            sync,
            reader,
            thumbnails: pipeline,
        }
    }
}
