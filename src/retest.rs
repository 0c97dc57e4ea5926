use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use crate::catalog::QuestionCatalog;
use crate::errors::EngineError;
use crate::models::{
    Attempt, Difficulty, LearningResult, Question, QuestionId, RetestAnalysis, RetestMode,
    RetestOutcome, RetestWorksheet, Trend, WrongAnswerAnalysis,
};

// Import logging macros
use crate::{log_engine_start, log_engine_success, log_engine_warn};

pub const DEFAULT_SELECTION: usize = 5;
pub const DEFAULT_SIMILAR_PER_QUESTION: usize = 3;

/// Attempts compared on each side of the trend window.
const TREND_WINDOW: usize = 3;

/// Compare the three most recent attempts against the (up to) three before
/// them. Fewer than two recent attempts is not enough history to call a trend.
pub fn classify_trend(attempts: &[Attempt]) -> Trend {
    let mut ordered: Vec<&Attempt> = attempts.iter().collect();
    ordered.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    let recent = &ordered[..ordered.len().min(TREND_WINDOW)];
    if recent.len() < 2 {
        return Trend::Stable;
    }
    let older = &ordered[recent.len()..ordered.len().min(TREND_WINDOW * 2)];

    let recent_correct = recent.iter().filter(|a| a.is_correct).count();
    let older_correct = older.iter().filter(|a| a.is_correct).count();

    match recent_correct.cmp(&older_correct) {
        std::cmp::Ordering::Greater => Trend::Improving,
        std::cmp::Ordering::Less => Trend::Declining,
        std::cmp::Ordering::Equal => Trend::Stable,
    }
}

/// Builds remedial worksheets from a student's wrong answers.
#[derive(Debug, Clone)]
pub struct RetestComposer {
    default_selection: usize,
    similar_per_question: usize,
}

impl Default for RetestComposer {
    fn default() -> Self {
        Self::new(DEFAULT_SELECTION, DEFAULT_SIMILAR_PER_QUESTION)
    }
}

impl RetestComposer {
    pub fn new(default_selection: usize, similar_per_question: usize) -> Self {
        Self {
            default_selection,
            similar_per_question,
        }
    }

    /// Aggregate every question the student has missed at least once, most
    /// frequently missed first. An empty result means a perfect score.
    pub fn analyze_wrong_answers<R>(
        &self,
        results: &[LearningResult],
        catalog: &QuestionCatalog,
        rng: &mut R,
    ) -> RetestAnalysis
    where
        R: Rng + ?Sized,
    {
        let started = Instant::now();
        log_engine_start!("retest", "analyze_wrong_answers", result_count = results.len());

        let mut order: Vec<&str> = Vec::new();
        let mut attempts: HashMap<&str, Vec<Attempt>> = HashMap::new();
        for result in results {
            for answer in result.answers.iter().filter(|a| !a.is_correct) {
                if !attempts.contains_key(answer.question_id.as_str()) {
                    order.push(answer.question_id.as_str());
                    attempts.insert(answer.question_id.as_str(), Vec::new());
                }
            }
        }

        // Second pass collects correct attempts too, for the trend
        for result in results {
            for answer in &result.answers {
                if let Some(entry) = attempts.get_mut(answer.question_id.as_str()) {
                    entry.push(Attempt {
                        submitted_at: result.submitted_at,
                        is_correct: answer.is_correct,
                    });
                }
            }
        }

        let mut items = Vec::with_capacity(order.len());
        for question_id in order {
            let Some(question) = catalog.find(question_id) else {
                log_engine_warn!(
                    "retest",
                    "analyze_wrong_answers",
                    question_id = question_id,
                    "answered question missing from catalog, skipped"
                );
                continue;
            };

            let mut question_attempts = attempts.remove(question_id).unwrap_or_default();
            question_attempts.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
            let wrong_count = question_attempts.iter().filter(|a| !a.is_correct).count() as u32;
            let last_attempted_at = question_attempts[0].submitted_at;

            items.push(WrongAnswerAnalysis {
                question: question.clone(),
                wrong_count,
                trend: classify_trend(&question_attempts),
                attempts: question_attempts,
                last_attempted_at,
                similar_questions: self.attach_similar(question, catalog, rng),
            });
        }

        // Stable: equal counts keep first-missed order
        items.sort_by(|a, b| b.wrong_count.cmp(&a.wrong_count));

        let default_selection = items
            .iter()
            .take(self.default_selection)
            .map(|item| item.question.id.clone())
            .collect();

        log_engine_success!(
            "retest",
            "analyze_wrong_answers",
            result_count = items.len(),
            duration_us = started.elapsed().as_micros() as u64
        );
        RetestAnalysis {
            items,
            default_selection,
        }
    }

    /// Same subject and chapter, shuffled, first few. Cheaper than full
    /// similarity ranking.
    fn attach_similar<R>(&self, question: &Question, catalog: &QuestionCatalog, rng: &mut R) -> Vec<Question>
    where
        R: Rng + ?Sized,
    {
        let mut candidates: Vec<&Question> = catalog
            .get_all()
            .iter()
            .filter(|candidate| candidate.id != question.id && candidate.same_chapter(question))
            .collect();
        candidates.shuffle(rng);
        candidates
            .into_iter()
            .take(self.similar_per_question)
            .cloned()
            .collect()
    }

    /// Assemble a worksheet from the selected wrong questions.
    ///
    /// Selected ids that are not in the analysis are ignored. `wrong_only` is
    /// deterministic; the other modes only vary in which extra questions are
    /// attached.
    pub fn compose<R>(
        &self,
        analysis: &RetestAnalysis,
        selected_ids: &[QuestionId],
        mode: RetestMode,
        catalog: &QuestionCatalog,
        rng: &mut R,
    ) -> Result<RetestOutcome, EngineError>
    where
        R: Rng + ?Sized,
    {
        if analysis.is_perfect_score() {
            return Ok(RetestOutcome::PerfectScore);
        }

        for id in selected_ids {
            if !analysis.items.iter().any(|item| &item.question.id == id) {
                log_engine_warn!("retest", "compose", question_id = id, "selected question has no wrong answers, ignored");
            }
        }

        let selected: Vec<&WrongAnswerAnalysis> = analysis
            .items
            .iter()
            .filter(|item| selected_ids.contains(&item.question.id))
            .collect();
        if selected.is_empty() {
            return Err(EngineError::EmptySelection);
        }

        let mut questions: Vec<Question> = selected.iter().map(|item| item.question.clone()).collect();

        match mode {
            RetestMode::WrongOnly => {}
            RetestMode::WithSimilar => {
                for item in &selected {
                    let extra = item
                        .similar_questions
                        .iter()
                        .find(|similar| !contains(&questions, &similar.id))
                        .cloned();
                    if let Some(extra) = extra {
                        questions.push(extra);
                    }
                }
            }
            RetestMode::Adaptive => {
                for item in &selected {
                    if let Some(step_down) = pick_step_down(&item.question, &questions, catalog, rng) {
                        questions.push(step_down);
                    }
                }
            }
        }

        Ok(RetestOutcome::Worksheet(summarize(mode, selected.len(), questions)))
    }
}

fn contains(questions: &[Question], id: &str) -> bool {
    questions.iter().any(|q| q.id == id)
}

/// A same-chapter question from the closest strictly lower difficulty level
/// that has one.
fn pick_step_down<R>(
    wrong: &Question,
    already: &[Question],
    catalog: &QuestionCatalog,
    rng: &mut R,
) -> Option<Question>
where
    R: Rng + ?Sized,
{
    for level in wrong.difficulty.lower_levels() {
        let candidates: Vec<&Question> = catalog
            .get_all()
            .iter()
            .filter(|c| c.difficulty == level && c.same_chapter(wrong) && !contains(already, &c.id))
            .collect();
        if let Some(choice) = candidates.choose(rng) {
            return Some((*choice).clone());
        }
    }
    None
}

fn summarize(mode: RetestMode, wrong_count: usize, questions: Vec<Question>) -> RetestWorksheet {
    let mut difficulty_distribution: BTreeMap<Difficulty, usize> =
        Difficulty::ALL.iter().map(|level| (*level, 0)).collect();
    for question in &questions {
        *difficulty_distribution.entry(question.difficulty).or_insert(0) += 1;
    }

    let total_questions = questions.len();
    let estimated_time = (total_questions as f64 * mode.minutes_per_question()).ceil() as u32;

    RetestWorksheet {
        title: format!("{} ({}문항)", mode.label(), total_questions),
        description: format!(
            "틀린 문제 {}개를 바탕으로 만든 {} 학습지입니다.",
            wrong_count,
            mode.label()
        ),
        mode,
        questions,
        total_questions,
        difficulty_distribution,
        estimated_time,
    }
}
