use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::models::Question;

// Import logging macros
use crate::{log_engine_start, log_engine_success};

pub const DEFAULT_MIN_SCORE: u32 = 30;
pub const DEFAULT_TOP_N: usize = 5;
pub const MAX_SCORE: u32 = 100;

/// Points awarded per matching feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub same_chapter: u32,
    pub same_section: u32,
    pub same_lesson: u32,
    pub same_difficulty: u32,
    pub adjacent_difficulty: u32,
    pub same_type: u32,
    pub per_shared_tag: u32,
    pub tag_cap: u32,
    /// Awarded when the correct rates differ by at most 10 points.
    pub close_correct_rate: u32,
    /// Awarded when the correct rates differ by at most 20 points.
    pub near_correct_rate: u32,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            same_chapter: 40,
            same_section: 20,
            same_lesson: 20,
            same_difficulty: 20,
            adjacent_difficulty: 10,
            same_type: 15,
            per_shared_tag: 5,
            tag_cap: 15,
            close_correct_rate: 10,
            near_correct_rate: 5,
        }
    }
}

/// Per-axis points for one base/candidate pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub curriculum: u32,
    pub difficulty: u32,
    pub question_type: u32,
    pub tags: u32,
    pub correct_rate: u32,
}

impl ScoreBreakdown {
    /// Unclamped sum of every axis. Can exceed 100.
    pub fn raw_total(&self) -> u32 {
        self.curriculum + self.difficulty + self.question_type + self.tags + self.correct_rate
    }

    /// Similarity percentage, clamped to 100.
    pub fn score(&self) -> u32 {
        self.raw_total().min(MAX_SCORE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarQuestion {
    pub question: Question,
    /// Similarity percentage (0-100).
    pub score: u32,
    pub breakdown: ScoreBreakdown,
}

/// Ranks catalog questions by weighted-feature similarity to a base question.
#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    weights: SimilarityWeights,
    min_score: u32,
}

impl Default for SimilarityRanker {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCORE)
    }
}

impl SimilarityRanker {
    pub fn new(min_score: u32) -> Self {
        Self {
            weights: SimilarityWeights::default(),
            min_score,
        }
    }

    pub fn with_weights(mut self, weights: SimilarityWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn min_score(&self) -> u32 {
        self.min_score
    }

    pub fn breakdown(&self, base: &Question, candidate: &Question) -> ScoreBreakdown {
        let w = &self.weights;
        let (a, b) = (&base.curriculum, &candidate.curriculum);

        // Each curriculum level only counts when every level above it matches
        let mut curriculum = 0;
        if a.chapter_id == b.chapter_id {
            curriculum += w.same_chapter;
            if a.section_id == b.section_id {
                curriculum += w.same_section;
                if a.lesson_id == b.lesson_id {
                    curriculum += w.same_lesson;
                }
            }
        }

        let difficulty = if base.difficulty == candidate.difficulty {
            w.same_difficulty
        } else if base.difficulty.is_adjacent(candidate.difficulty) {
            w.adjacent_difficulty
        } else {
            0
        };

        let question_type = if base.question_type() == candidate.question_type() {
            w.same_type
        } else {
            0
        };

        let shared_tags = base.tags.intersection(&candidate.tags).count() as u32;
        let tags = (shared_tags * w.per_shared_tag).min(w.tag_cap);

        let rate_gap = base.correct_rate.abs_diff(candidate.correct_rate);
        let correct_rate = if rate_gap <= 10 {
            w.close_correct_rate
        } else if rate_gap <= 20 {
            w.near_correct_rate
        } else {
            0
        };

        ScoreBreakdown {
            curriculum,
            difficulty,
            question_type,
            tags,
            correct_rate,
        }
    }

    pub fn score(&self, base: &Question, candidate: &Question) -> u32 {
        self.breakdown(base, candidate).score()
    }

    /// Same-subject candidates other than the base, before any scoring.
    fn eligible<'a, I>(base: &Question, candidates: I) -> Vec<&'a Question>
    where
        I: IntoIterator<Item = &'a Question>,
    {
        candidates
            .into_iter()
            .filter(|candidate| candidate.subject == base.subject && candidate.id != base.id)
            .collect()
    }

    /// Top `top_n` candidates scoring at least the minimum, best first.
    ///
    /// Candidates in another subject, and the base question itself, are skipped.
    /// Equal scores keep the order the candidates were supplied in.
    pub fn rank_similar<'a, I>(&self, base: &Question, candidates: I, top_n: usize) -> Vec<SimilarQuestion>
    where
        I: IntoIterator<Item = &'a Question>,
    {
        let started = Instant::now();
        if top_n == 0 {
            return Vec::new();
        }

        let pool = Self::eligible(base, candidates);
        log_engine_start!("similarity", "rank_similar", candidate_count = pool.len());

        let mut ranked: Vec<SimilarQuestion> = pool
            .into_iter()
            .filter_map(|candidate| {
                let breakdown = self.breakdown(base, candidate);
                let score = breakdown.score();
                (score >= self.min_score).then(|| SimilarQuestion {
                    question: candidate.clone(),
                    score,
                    breakdown,
                })
            })
            .collect();

        // sort_by is stable, so ties stay in catalog order
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked.truncate(top_n);

        log_engine_success!(
            "similarity",
            "rank_similar",
            result_count = ranked.len(),
            duration_us = started.elapsed().as_micros() as u64
        );
        ranked
    }
}
