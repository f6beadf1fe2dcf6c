use super::{attach_feedback, rank_cases, stats_for, CaseStore, CaseStoreError, CaseStoreStats, FeedbackRecord};
use crate::models::{CaseStudy, Evidence, RootCauseType, SimilarCase};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Case table held in process memory, insertion ordered
#[derive(Default)]
pub struct InMemoryCaseStore {
    cases: RwLock<Vec<CaseStudy>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cases(cases: Vec<CaseStudy>) -> Self {
        let mut table = Vec::with_capacity(cases.len());
        for case in cases {
            upsert(&mut table, case);
        }
        Self {
            cases: RwLock::new(table),
        }
    }

    pub(crate) async fn snapshot(&self) -> Vec<CaseStudy> {
        self.cases.read().await.clone()
    }
}

pub(crate) fn upsert(table: &mut Vec<CaseStudy>, case: CaseStudy) {
    match table.iter_mut().find(|c| c.id == case.id) {
        Some(existing) => *existing = case,
        None => table.push(case),
    }
}

#[async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn add_case_study(&self, case: CaseStudy) -> Result<(), CaseStoreError> {
        upsert(&mut *self.cases.write().await, case);
        Ok(())
    }

    async fn find_similar_cases(
        &self,
        evidence: &Evidence,
        root_cause: Option<RootCauseType>,
        limit: usize,
    ) -> Result<Vec<SimilarCase>, CaseStoreError> {
        let cases = self.cases.read().await;
        Ok(rank_cases(cases.iter(), evidence, root_cause, limit))
    }

    async fn add_feedback(
        &self,
        case_id: &str,
        feedback: &FeedbackRecord,
    ) -> Result<bool, CaseStoreError> {
        let mut cases = self.cases.write().await;
        match cases.iter_mut().find(|c| c.id == case_id) {
            Some(case) => {
                attach_feedback(case, feedback)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn statistics(&self) -> Result<CaseStoreStats, CaseStoreError> {
        let cases = self.cases.read().await;
        Ok(stats_for(cases.iter(), self.backend()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
