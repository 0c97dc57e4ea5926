use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::auto_tagger::{MetadataExtractor, MetadataReview};
use crate::catalog::{DataStore, QuestionCatalog};
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::models::*;
use crate::retest::RetestComposer;
use crate::similarity::{SimilarQuestion, SimilarityRanker};

/// How a reviewer resolves a batch of auto-tag suggestions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Accept exactly these fields, in order.
    Accept(Vec<MetadataField>),
    /// Accept everything at or above the bulk threshold.
    AcceptConfident,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ReviewOutcome {
    pub metadata: WorksheetMetadata,
    pub applied: Vec<MetadataField>,
    pub pending: Vec<AutoTagSuggestion>,
}

/// Application state the engines read from, plus the engines themselves.
#[derive(Clone)]
pub struct WorksheetService {
    store: Arc<RwLock<DataStore>>,
    ranker: SimilarityRanker,
    extractor: Arc<MetadataExtractor>,
    composer: RetestComposer,
    rng: Arc<Mutex<ChaCha8Rng>>,
    config: EngineConfig,
}

impl WorksheetService {
    pub fn new(store: DataStore, config: EngineConfig) -> Self {
        let rng = match config.retest_rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Self {
            store: Arc::new(RwLock::new(store)),
            ranker: SimilarityRanker::new(config.min_similarity_score),
            extractor: Arc::new(MetadataExtractor::new()),
            composer: RetestComposer::new(
                config.retest_default_selection,
                config.retest_similar_per_question,
            ),
            rng: Arc::new(Mutex::new(rng)),
            config,
        }
    }

    /// Replace the auto-tagger, e.g. to pin the reference year.
    pub fn with_extractor(mut self, extractor: MetadataExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    async fn catalog(&self) -> Arc<QuestionCatalog> {
        Arc::clone(&self.store.read().await.catalog)
    }

    // Catalog operations
    pub async fn list_questions(&self, subject: Option<Subject>) -> Vec<Question> {
        let catalog = self.catalog().await;
        match subject {
            Some(subject) => catalog.by_subject(subject).into_iter().cloned().collect(),
            None => catalog.get_all().to_vec(),
        }
    }

    pub async fn get_question(&self, id: &str) -> Option<Question> {
        self.catalog().await.find(id).cloned()
    }

    pub async fn catalog_size(&self) -> usize {
        self.catalog().await.len()
    }

    // Similarity
    pub async fn similar_questions(
        &self,
        question_id: &str,
        top_n: Option<usize>,
    ) -> Result<Vec<SimilarQuestion>, EngineError> {
        let catalog = self.catalog().await;
        let base = catalog
            .find(question_id)
            .ok_or_else(|| EngineError::QuestionNotFound(question_id.to_string()))?;
        let top_n = top_n.unwrap_or(self.config.similar_top_n);

        Ok(self.ranker.rank_similar(base, catalog.get_all(), top_n))
    }

    // Auto-tagging
    pub fn suggest_metadata(&self, text: &str, filename: &str) -> Vec<AutoTagSuggestion> {
        self.extractor.suggest(text, filename)
    }

    pub fn review_metadata(
        &self,
        metadata: WorksheetMetadata,
        suggestions: Vec<AutoTagSuggestion>,
        decision: ReviewDecision,
    ) -> Result<ReviewOutcome, EngineError> {
        let mut review = MetadataReview::new(metadata, suggestions)
            .with_bulk_threshold(self.config.auto_tag_bulk_threshold);

        let applied = match decision {
            ReviewDecision::Accept(fields) => {
                for field in &fields {
                    review.accept(*field)?;
                }
                fields
            }
            ReviewDecision::AcceptConfident => review.accept_confident(),
        };

        let (metadata, pending) = review.into_parts();
        debug!(applied = applied.len(), pending = pending.len(), "Metadata review applied");
        Ok(ReviewOutcome {
            metadata,
            applied,
            pending,
        })
    }

    // Learning results
    pub async fn record_learning_result(
        &self,
        request: SubmitLearningResultRequest,
    ) -> Result<LearningResult, EngineError> {
        if request.answers.is_empty() {
            return Err(EngineError::InvalidArgument(
                "a learning result needs at least one answer".to_string(),
            ));
        }

        let mut store = self.store.write().await;
        if store.history.contains(&request.id) {
            return Err(EngineError::InvalidArgument(format!(
                "learning result '{}' already exists",
                request.id
            )));
        }

        let submitted_at = request.submitted_at.unwrap_or_else(Utc::now);
        let catalog = Arc::clone(&store.catalog);
        let result = LearningResult::from_answers(request, submitted_at, |id| {
            catalog.find(id).map(|q| q.difficulty)
        });

        info!(
            result_id = %result.id,
            student_id = %result.student_id,
            total_score = result.total_score,
            "Learning result recorded"
        );
        store.history.record(result.clone());
        Ok(result)
    }

    pub async fn learning_results(&self, student_id: &str) -> Vec<LearningResult> {
        self.store
            .read()
            .await
            .history
            .get_learning_results(student_id)
            .to_vec()
    }

    // Retest
    pub async fn analyze_wrong_answers(&self, student_id: &str) -> RetestAnalysis {
        let (catalog, results) = self.snapshot(student_id).await;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.composer.analyze_wrong_answers(&results, &catalog, &mut *rng)
    }

    /// Compose a retest from the student's wrong answers. Without an explicit
    /// selection the analysis' default selection is used.
    pub async fn compose_retest(
        &self,
        student_id: &str,
        selected_ids: Option<Vec<QuestionId>>,
        mode: RetestMode,
    ) -> Result<RetestOutcome, EngineError> {
        let (catalog, results) = self.snapshot(student_id).await;
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let analysis = self.composer.analyze_wrong_answers(&results, &catalog, &mut *rng);
        let selected_ids = selected_ids.unwrap_or_else(|| analysis.default_selection.clone());
        self.composer
            .compose(&analysis, &selected_ids, mode, &catalog, &mut *rng)
    }

    async fn snapshot(&self, student_id: &str) -> (Arc<QuestionCatalog>, Vec<LearningResult>) {
        let store = self.store.read().await;
        (
            Arc::clone(&store.catalog),
            store.history.get_learning_results(student_id).to_vec(),
        )
    }
}
