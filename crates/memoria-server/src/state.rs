//! Server state management.
//!
//! The teacher's `AppState` wrapped a lazily-`configure()`-able `Memory`
//! behind a single `RwLock`, since a deployment could reconfigure its
//! provider stack at runtime via `POST /configure`. This service builds its
//! backend once, eagerly, from `MemoryConfig::from_env()` at startup — there
//! is no runtime reconfiguration surface — so `AppState` holds the already-
//! built `Arc<UnifiedStore>` and optional GRAPH handle directly. The one
//! thing that still needs shared mutable state is the import-job registry,
//! since bulk imports run in the background and are polled by id.

use std::collections::HashMap;
use std::sync::Arc;

use memoria_core::import::ImportJob;
use memoria_core::traits::GraphQuery;
use memoria_core::UnifiedStore;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::factory::Backend;

/// One entry in the import-job registry: the job's current state plus a
/// flag a caller can flip to request cancellation.
pub struct ImportJobHandle {
    pub job: Arc<RwLock<ImportJob>>,
    pub cancel: memoria_core::import::CancellationFlag,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UnifiedStore>,
    pub graph: Option<Arc<dyn GraphQuery>>,
    pub import_jobs: Arc<RwLock<HashMap<Uuid, ImportJobHandle>>>,
}

impl AppState {
    pub fn new(backend: Backend) -> Self {
        Self {
            store: backend.store,
            graph: backend.graph,
            import_jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The GRAPH provider's query handle, or an error if this deployment
    /// has `GRAPH_ENABLED=false`.
    pub fn graph(&self) -> crate::error::ApiResult<&Arc<dyn GraphQuery>> {
        self.graph
            .as_ref()
            .ok_or_else(|| crate::error::ApiError::service_unavailable("graph provider is not enabled"))
    }

    /// Register a newly created import job and return its handle for the
    /// caller to drive with `run_import`.
    pub async fn register_import_job(&self, job: Arc<RwLock<ImportJob>>, cancel: memoria_core::import::CancellationFlag) -> Uuid {
        let job_id = job.read().await.job_id;
        self.import_jobs
            .write()
            .await
            .insert(job_id, ImportJobHandle { job, cancel });
        job_id
    }

    pub async fn get_import_job(&self, job_id: Uuid) -> Option<Arc<RwLock<ImportJob>>> {
        self.import_jobs.read().await.get(&job_id).map(|handle| handle.job.clone())
    }
}
