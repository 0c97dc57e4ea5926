use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::errors::EngineError;

pub type QuestionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Math,
    English,
    Korean,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Math => "math",
            Subject::English => "english",
            Subject::Korean => "korean",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "math" => Ok(Subject::Math),
            "english" => Ok(Subject::English),
            "korean" => Ok(Subject::Korean),
            other => Err(EngineError::InvalidArgument(format!("unknown subject '{}'", other))),
        }
    }
}

/// Difficulty ladder: low < medium < high < highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Low,
    Medium,
    High,
    Highest,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Low,
        Difficulty::Medium,
        Difficulty::High,
        Difficulty::Highest,
    ];

    pub fn index(&self) -> usize {
        match self {
            Difficulty::Low => 0,
            Difficulty::Medium => 1,
            Difficulty::High => 2,
            Difficulty::Highest => 3,
        }
    }

    pub fn is_adjacent(&self, other: Difficulty) -> bool {
        self.index().abs_diff(other.index()) == 1
    }

    /// Levels strictly below this one, closest first.
    pub fn lower_levels(&self) -> Vec<Difficulty> {
        Difficulty::ALL
            .iter()
            .copied()
            .filter(|level| level < self)
            .rev()
            .collect()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Low => "low",
            Difficulty::Medium => "medium",
            Difficulty::High => "high",
            Difficulty::Highest => "highest",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Internal,
    Textbook,
    SchoolExam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumPath {
    pub chapter_id: String,
    pub section_id: String,
    pub lesson_id: String,
}

impl CurriculumPath {
    pub fn new(chapter_id: &str, section_id: &str, lesson_id: &str) -> Self {
        Self {
            chapter_id: chapter_id.to_string(),
            section_id: section_id.to_string(),
            lesson_id: lesson_id.to_string(),
        }
    }
}

/// Question format. Choices only exist on the multiple choice variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice { choices: Vec<String> },
    ShortAnswer,
    Essay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    ShortAnswer,
    Essay,
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::ShortAnswer => QuestionType::ShortAnswer,
            QuestionKind::Essay => QuestionType::Essay,
        }
    }

    pub fn choices(&self) -> Option<&[String]> {
        match self {
            QuestionKind::MultipleChoice { choices } => Some(choices),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub subject: Subject,
    pub content: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub difficulty: Difficulty,
    pub source: Source,
    pub curriculum: CurriculumPath,
    pub correct_answer: String,
    /// Percentage of historical test-takers who answered correctly (0-100).
    pub correct_rate: u8,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Precomputed links; may reference questions that no longer exist.
    #[serde(default)]
    pub similar_questions: Vec<QuestionId>,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    pub fn same_chapter(&self, other: &Question) -> bool {
        self.subject == other.subject
            && self.curriculum.chapter_id == other.curriculum.chapter_id
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::InvalidQuestion("question id is empty".to_string()));
        }
        if self.correct_rate > 100 {
            return Err(EngineError::InvalidQuestion(format!(
                "question '{}' has correct_rate {} outside 0-100",
                self.id, self.correct_rate
            )));
        }
        let path = &self.curriculum;
        if [&path.chapter_id, &path.section_id, &path.lesson_id]
            .iter()
            .any(|segment| segment.trim().is_empty())
        {
            return Err(EngineError::InvalidQuestion(format!(
                "question '{}' has an incomplete curriculum path",
                self.id
            )));
        }
        if let QuestionKind::MultipleChoice { choices } = &self.kind {
            if choices.is_empty() {
                return Err(EngineError::InvalidQuestion(format!(
                    "multiple choice question '{}' has no choices",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    pub student_answer: String,
    pub is_correct: bool,
    /// Seconds spent on the question.
    pub time_spent: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultyStats {
    pub correct: u32,
    pub total: u32,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningResult {
    pub id: String,
    pub student_id: String,
    pub assignment_id: String,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<Answer>,
    pub total_score: u32,
    pub correct_rate: f64,
    pub total_time_spent: u64,
    #[serde(default)]
    pub difficulty_performance: BTreeMap<Difficulty, DifficultyStats>,
}

impl LearningResult {
    /// Build a submission record, deriving the aggregate fields from the answers.
    /// Answers whose question is unknown to `difficulty_of` count toward the
    /// totals but not toward any difficulty bucket.
    pub fn from_answers<F>(
        submission: SubmitLearningResultRequest,
        submitted_at: DateTime<Utc>,
        difficulty_of: F,
    ) -> Self
    where
        F: Fn(&str) -> Option<Difficulty>,
    {
        let total = submission.answers.len() as u32;
        let correct = submission.answers.iter().filter(|a| a.is_correct).count() as u32;
        let total_time_spent = submission.answers.iter().map(|a| u64::from(a.time_spent)).sum();

        let mut difficulty_performance: BTreeMap<Difficulty, DifficultyStats> = Difficulty::ALL
            .iter()
            .map(|level| (*level, DifficultyStats::default()))
            .collect();
        for answer in &submission.answers {
            if let Some(level) = difficulty_of(&answer.question_id) {
                let stats = difficulty_performance.entry(level).or_default();
                stats.total += 1;
                if answer.is_correct {
                    stats.correct += 1;
                }
            }
        }
        for stats in difficulty_performance.values_mut() {
            stats.rate = percentage(stats.correct, stats.total);
        }

        Self {
            id: submission.id,
            student_id: submission.student_id,
            assignment_id: submission.assignment_id,
            submitted_at,
            answers: submission.answers,
            total_score: correct,
            correct_rate: percentage(correct, total),
            total_time_spent,
            difficulty_performance,
        }
    }
}

fn percentage(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64 * 1000.0).round() / 10.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitLearningResultRequest {
    pub id: String,
    pub student_id: String,
    pub assignment_id: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: Vec<Answer>,
}

// ============================================================================
// Auto-tagging
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    SchoolName,
    Region,
    Subject,
    Grade,
    Semester,
    ExamType,
    ExamYear,
    QuestionCount,
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MetadataField::SchoolName => "school_name",
            MetadataField::Region => "region",
            MetadataField::Subject => "subject",
            MetadataField::Grade => "grade",
            MetadataField::Semester => "semester",
            MetadataField::ExamType => "exam_type",
            MetadataField::ExamYear => "exam_year",
            MetadataField::QuestionCount => "question_count",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoTagSuggestion {
    pub field: MetadataField,
    pub value: String,
    pub confidence: u8,
    pub reason: String,
}

/// Worksheet metadata a reviewer edits while tagging an uploaded document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorksheetMetadata {
    pub school_name: Option<String>,
    pub region: Option<String>,
    pub subject: Option<Subject>,
    pub grade: Option<String>,
    pub semester: Option<String>,
    pub exam_type: Option<String>,
    pub exam_year: Option<i32>,
    pub question_count: Option<u32>,
}

// ============================================================================
// Retest
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetestMode {
    WrongOnly,
    WithSimilar,
    Adaptive,
}

impl RetestMode {
    pub fn minutes_per_question(&self) -> f64 {
        match self {
            RetestMode::WrongOnly => 3.0,
            RetestMode::WithSimilar => 2.5,
            RetestMode::Adaptive => 2.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RetestMode::WrongOnly => "오답 재시험",
            RetestMode::WithSimilar => "오답 + 유사문제",
            RetestMode::Adaptive => "적응형 난이도",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub submitted_at: DateTime<Utc>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrongAnswerAnalysis {
    pub question: Question,
    pub wrong_count: u32,
    pub attempts: Vec<Attempt>,
    pub last_attempted_at: DateTime<Utc>,
    pub trend: Trend,
    pub similar_questions: Vec<Question>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetestAnalysis {
    pub items: Vec<WrongAnswerAnalysis>,
    pub default_selection: Vec<QuestionId>,
}

impl RetestAnalysis {
    pub fn is_perfect_score(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetestWorksheet {
    pub title: String,
    pub description: String,
    pub mode: RetestMode,
    pub questions: Vec<Question>,
    pub total_questions: usize,
    pub difficulty_distribution: BTreeMap<Difficulty, usize>,
    /// Minutes.
    pub estimated_time: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetestOutcome {
    PerfectScore,
    Worksheet(RetestWorksheet),
}
