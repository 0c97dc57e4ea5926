use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::EngineError;
use crate::models::{LearningResult, Question, Subject};

// Import logging macros
use crate::{log_performance, log_validation};

/// Read-only question bank snapshot. Order is the catalog order used for
/// stable tie-breaking by the ranking engines.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    /// Build a catalog, rejecting malformed questions and duplicate ids.
    pub fn new(questions: Vec<Question>) -> Result<Self, EngineError> {
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(questions.len());
        for (index, question) in questions.iter().enumerate() {
            if let Err(e) = question.validate() {
                log_validation!(failure, "question_catalog", error = e);
                return Err(e);
            }
            if let Some(previous) = seen.insert(question.id.as_str(), index) {
                let e = EngineError::InvalidQuestion(format!(
                    "duplicate question id '{}' at positions {} and {}",
                    question.id, previous, index
                ));
                log_validation!(failure, "question_catalog", error = e);
                return Err(e);
            }
        }
        log_validation!(success, "question_catalog", format!("{} questions validated", questions.len()));
        Ok(Self { questions })
    }

    pub fn get_all(&self) -> &[Question] {
        &self.questions
    }

    pub fn by_subject(&self, subject: Subject) -> Vec<&Question> {
        self.questions.iter().filter(|q| q.subject == subject).collect()
    }

    pub fn find(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Submitted learning results keyed by student, oldest first.
#[derive(Debug, Clone, Default)]
pub struct LearningHistory {
    by_student: HashMap<String, Vec<LearningResult>>,
}

impl LearningHistory {
    /// Build a history from stored results, rejecting duplicate result ids.
    pub fn new(results: Vec<LearningResult>) -> Result<Self, EngineError> {
        let mut history = Self::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(results.len());
        for result in results {
            if !seen.insert(result.id.clone()) {
                let e = EngineError::InvalidArgument(format!(
                    "duplicate learning result id '{}'",
                    result.id
                ));
                log_validation!(failure, "learning_history", error = e);
                return Err(e);
            }
            history.record(result);
        }
        Ok(history)
    }

    pub fn record(&mut self, result: LearningResult) {
        let entries = self.by_student.entry(result.student_id.clone()).or_default();
        let position = entries.partition_point(|existing| existing.submitted_at <= result.submitted_at);
        entries.insert(position, result);
    }

    pub fn contains(&self, result_id: &str) -> bool {
        self.by_student
            .values()
            .flatten()
            .any(|result| result.id == result_id)
    }

    pub fn get_learning_results(&self, student_id: &str) -> &[LearningResult] {
        self.by_student
            .get(student_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn student_count(&self) -> usize {
        self.by_student.len()
    }
}

/// On-disk seed snapshot format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    pub questions: Vec<Question>,
    #[serde(default)]
    pub learning_results: Vec<LearningResult>,
}

/// Everything the engines read from: the question bank plus learning history.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    pub catalog: Arc<QuestionCatalog>,
    pub history: LearningHistory,
}

impl DataStore {
    pub fn from_seed(seed: SeedData) -> Result<Self, EngineError> {
        Ok(Self {
            catalog: Arc::new(QuestionCatalog::new(seed.questions)?),
            history: LearningHistory::new(seed.learning_results)?,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, EngineError> {
        let seed: SeedData = serde_json::from_str(raw)?;
        Self::from_seed(seed)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let started = Instant::now();
        let raw = std::fs::read_to_string(path)?;
        let store = Self::from_json(&raw)?;
        log_performance!(
            "seed_load",
            duration_ms = started.elapsed().as_millis() as u64,
            items = store.catalog.len()
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, CurriculumPath, Difficulty, QuestionKind, Source};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn question(id: &str, subject: Subject) -> Question {
        Question {
            id: id.to_string(),
            subject,
            content: format!("content of {}", id),
            kind: QuestionKind::ShortAnswer,
            difficulty: Difficulty::Medium,
            source: Source::Internal,
            curriculum: CurriculumPath::new("ch1", "s1", "l1"),
            correct_answer: "1".to_string(),
            correct_rate: 50,
            tags: Default::default(),
            similar_questions: vec![],
        }
    }

    fn result(id: &str, student: &str, day: u32) -> LearningResult {
        LearningResult {
            id: id.to_string(),
            student_id: student.to_string(),
            assignment_id: "a-1".to_string(),
            submitted_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
            answers: vec![Answer {
                question_id: "q1".to_string(),
                student_answer: "2".to_string(),
                is_correct: false,
                time_spent: 20,
            }],
            total_score: 0,
            correct_rate: 0.0,
            total_time_spent: 20,
            difficulty_performance: BTreeMap::new(),
        }
    }

    #[test]
    fn test_catalog_lookup_and_filter() {
        let catalog = QuestionCatalog::new(vec![
            question("m1", Subject::Math),
            question("e1", Subject::English),
            question("m2", Subject::Math),
        ])
        .unwrap();

        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.find("e1").map(|q| q.subject), Some(Subject::English));
        assert!(catalog.find("missing").is_none());

        let math: Vec<&str> = catalog
            .by_subject(Subject::Math)
            .iter()
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(math, vec!["m1", "m2"]);
    }

    #[test]
    fn test_catalog_rejects_duplicates_and_invalid_questions() {
        let duplicate = QuestionCatalog::new(vec![
            question("m1", Subject::Math),
            question("m1", Subject::Math),
        ]);
        assert!(matches!(duplicate, Err(EngineError::InvalidQuestion(_))));

        let mut bad = question("m2", Subject::Math);
        bad.correct_rate = 120;
        assert!(QuestionCatalog::new(vec![bad]).is_err());
    }

    #[test]
    fn test_history_keeps_results_in_submission_order() {
        let history = LearningHistory::new(vec![
            result("r3", "s1", 20),
            result("r1", "s1", 1),
            result("r2", "s1", 10),
            result("x1", "s2", 5),
        ])
        .unwrap();

        let ids: Vec<&str> = history
            .get_learning_results("s1")
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
        assert_eq!(history.student_count(), 2);
        assert!(history.contains("x1"));
        assert!(history.get_learning_results("nobody").is_empty());
    }

    #[test]
    fn test_history_rejects_duplicate_result_ids() {
        // Same id across two students is still a duplicate
        let duplicate = LearningHistory::new(vec![result("r1", "s1", 1), result("r1", "s2", 2)]);
        assert!(matches!(duplicate, Err(EngineError::InvalidArgument(_))));

        let seed = SeedData {
            questions: vec![question("q1", Subject::Math)],
            learning_results: vec![result("r1", "s1", 1), result("r1", "s1", 1)],
        };
        assert!(matches!(DataStore::from_seed(seed), Err(EngineError::InvalidArgument(_))));
    }

    #[test]
    fn test_store_from_json() {
        let raw = r#"{
            "questions": [{
                "id": "m1",
                "subject": "math",
                "content": "2 + 2 = ?",
                "type": "short_answer",
                "difficulty": "low",
                "source": "internal",
                "curriculum": {"chapter_id": "ch1", "section_id": "s1", "lesson_id": "l1"},
                "correct_answer": "4",
                "correct_rate": 95
            }]
        }"#;

        let store = DataStore::from_json(raw).unwrap();
        assert_eq!(store.catalog.len(), 1);
        assert_eq!(store.history.student_count(), 0);

        assert!(matches!(
            DataStore::from_json("{\"questions\": 3}"),
            Err(EngineError::SeedDataFormat(_))
        ));
    }
}
