use super::memory::InMemoryCaseStore;
use super::{CaseStore, CaseStoreError, CaseStoreStats, FeedbackRecord};
use crate::models::{CaseStudy, Evidence, RootCauseType, SimilarCase};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Case table persisted as a JSON array, rewritten after every mutation
pub struct FileCaseStore {
    path: PathBuf,
    cases: InMemoryCaseStore,
    /// Serializes writers so the file always reflects the latest table
    write_lock: Mutex<()>,
}

impl FileCaseStore {
    /// Load cases from `path`. A missing file starts an empty table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CaseStoreError> {
        let path = path.as_ref().to_path_buf();
        let cases = if path.exists() {
            let data = std::fs::read(&path).map_err(|source| CaseStoreError::Io {
                path: path.clone(),
                source,
            })?;
            let cases: Vec<CaseStudy> = serde_json::from_slice(&data)?;
            info!(path = %path.display(), cases = cases.len(), "Loaded case store from disk");
            cases
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            cases: InMemoryCaseStore::with_cases(cases),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> Result<(), CaseStoreError> {
        let _guard = self.write_lock.lock().await;
        let cases = self.cases.snapshot().await;
        let json = serde_json::to_vec_pretty(&cases)?;

        let io_err = |source| CaseStoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // Write to a sibling temp file and rename over the target
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &json).await.map_err(io_err)?;
        tokio::fs::rename(&temp_path, &self.path).await.map_err(io_err)?;

        debug!(path = %self.path.display(), cases = cases.len(), "Persisted case store");
        Ok(())
    }
}

#[async_trait]
impl CaseStore for FileCaseStore {
    async fn add_case_study(&self, case: CaseStudy) -> Result<(), CaseStoreError> {
        self.cases.add_case_study(case).await?;
        self.persist().await
    }

    async fn find_similar_cases(
        &self,
        evidence: &Evidence,
        root_cause: Option<RootCauseType>,
        limit: usize,
    ) -> Result<Vec<SimilarCase>, CaseStoreError> {
        self.cases.find_similar_cases(evidence, root_cause, limit).await
    }

    async fn add_feedback(
        &self,
        case_id: &str,
        feedback: &FeedbackRecord,
    ) -> Result<bool, CaseStoreError> {
        let attached = self.cases.add_feedback(case_id, feedback).await?;
        if attached {
            self.persist().await?;
        }
        Ok(attached)
    }

    async fn statistics(&self) -> Result<CaseStoreStats, CaseStoreError> {
        let mut stats = self.cases.statistics().await?;
        stats.storage = self.backend().to_string();
        Ok(stats)
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
