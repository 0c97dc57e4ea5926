use chrono::{Datelike, Utc};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Instant;

use crate::errors::EngineError;
use crate::models::{AutoTagSuggestion, MetadataField, Subject, WorksheetMetadata};

// Import logging macros
use crate::{log_engine_start, log_engine_success, log_engine_warn};

pub const DEFAULT_BULK_THRESHOLD: u8 = 80;

static SCHOOL_FULL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[가-힣]{2,}?(?:초등학교|중학교|고등학교)").unwrap());
static SCHOOL_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[가-힣]{2,}학교").unwrap());
static SCHOOL_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([가-힣]{2,}(?:초|중|고))(?:[^가-힣]|$)").unwrap());

static REGION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([가-힣]{2,4}(?:시|구|군))(?:[^가-힣]|$)").unwrap());

static GRADE_SCHOOL_LEVEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(중|고)([1-3])(?:학년)?(?:[^0-9]|$)").unwrap());
static GRADE_HAKNYEON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])([1-6])\s?학년(?:[^도]|$)").unwrap());
static GRADE_NYEON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^0-9])([1-6])년(?:[^도0-9]|$)").unwrap());

static SEMESTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([12])\s*학기\s*(중간|기말)").unwrap());

// Whole digit runs, so adjacent tokens never share a boundary character
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[0-9]{1,3}\.(?:[ \t]|$)").unwrap());

const MAJOR_REGIONS: [&str; 17] = [
    "서울", "부산", "대구", "인천", "광주", "대전", "울산", "세종", "경기", "강원", "충북", "충남",
    "전북", "전남", "경북", "경남", "제주",
];

const SUBJECT_KEYWORDS: [(Subject, &[&str]); 3] = [
    (
        Subject::Math,
        &["수학", "math", "미적분", "확률과 통계", "기하", "대수", "함수"],
    ),
    (
        Subject::English,
        &["영어", "english", "영문법", "독해", "reading", "grammar"],
    ),
    (
        Subject::Korean,
        &["국어", "korean", "문학", "독서", "화법과 작문", "언어와 매체"],
    ),
];

const EXAM_TYPES: [&str; 5] = ["중간고사", "기말고사", "모의고사", "단원평가", "월말고사"];

/// Text a detector inspects.
#[derive(Debug, Clone)]
pub struct DetectionInput {
    /// Filename and document text joined by a space.
    pub combined: String,
    /// Lower-cased `combined`, for keyword matching.
    pub lowered: String,
    /// Document text alone.
    pub text: String,
}

impl DetectionInput {
    pub fn new(text: &str, filename: &str) -> Self {
        let combined = format!("{} {}", filename, text);
        let lowered = combined.to_lowercase();
        Self {
            combined,
            lowered,
            text: text.to_string(),
        }
    }
}

/// One independent metadata detector. Yields at most one suggestion, from the
/// first pattern in its family that matches.
pub trait Detector: Send + Sync {
    fn field(&self) -> MetadataField;

    fn detect(&self, input: &DetectionInput) -> Option<AutoTagSuggestion>;
}

fn suggestion(field: MetadataField, value: impl Into<String>, confidence: u8, reason: String) -> AutoTagSuggestion {
    AutoTagSuggestion {
        field,
        value: value.into(),
        confidence,
        reason,
    }
}

pub struct SchoolNameDetector;

impl Detector for SchoolNameDetector {
    fn field(&self) -> MetadataField {
        MetadataField::SchoolName
    }

    fn detect(&self, input: &DetectionInput) -> Option<AutoTagSuggestion> {
        let name = SCHOOL_FULL
            .find(&input.combined)
            .or_else(|| SCHOOL_GENERIC.find(&input.combined))
            .map(|m| m.as_str().to_string())
            .or_else(|| {
                SCHOOL_SHORT
                    .captures(&input.combined)
                    .map(|caps| caps[1].to_string())
            })?;

        Some(suggestion(
            self.field(),
            name.clone(),
            85,
            format!("Found school name pattern '{}'", name),
        ))
    }
}

pub struct RegionDetector;

impl Detector for RegionDetector {
    fn field(&self) -> MetadataField {
        MetadataField::Region
    }

    fn detect(&self, input: &DetectionInput) -> Option<AutoTagSuggestion> {
        if let Some(region) = MAJOR_REGIONS.iter().find(|r| input.combined.contains(*r)) {
            return Some(suggestion(
                self.field(),
                *region,
                80,
                format!("Found region name '{}'", region),
            ));
        }

        let caps = REGION_SUFFIX.captures(&input.combined)?;
        let region = caps[1].to_string();
        Some(suggestion(
            self.field(),
            region.clone(),
            80,
            format!("Found administrative district '{}'", region),
        ))
    }
}

pub struct SubjectDetector;

impl Detector for SubjectDetector {
    fn field(&self) -> MetadataField {
        MetadataField::Subject
    }

    fn detect(&self, input: &DetectionInput) -> Option<AutoTagSuggestion> {
        SUBJECT_KEYWORDS.iter().find_map(|(subject, keywords)| {
            keywords
                .iter()
                .find(|keyword| input.lowered.contains(*keyword))
                .map(|keyword| {
                    suggestion(
                        self.field(),
                        subject.as_str(),
                        90,
                        format!("Found subject keyword '{}'", keyword),
                    )
                })
        })
    }
}

pub struct GradeDetector;

impl Detector for GradeDetector {
    fn field(&self) -> MetadataField {
        MetadataField::Grade
    }

    fn detect(&self, input: &DetectionInput) -> Option<AutoTagSuggestion> {
        let text = &input.combined;
        let (grade, matched) = if let Some(caps) = GRADE_SCHOOL_LEVEL.captures(text) {
            let grade = format!("{}{}", &caps[1], &caps[2]);
            (grade.clone(), grade)
        } else if let Some(caps) = GRADE_HAKNYEON.captures(text) {
            (format!("{}학년", &caps[1]), format!("{}학년", &caps[1]))
        } else if let Some(caps) = GRADE_NYEON.captures(text) {
            (format!("{}학년", &caps[1]), format!("{}년", &caps[1]))
        } else {
            return None;
        };

        Some(suggestion(
            self.field(),
            grade,
            85,
            format!("Found grade pattern '{}'", matched),
        ))
    }
}

pub struct SemesterDetector;

impl Detector for SemesterDetector {
    fn field(&self) -> MetadataField {
        MetadataField::Semester
    }

    fn detect(&self, input: &DetectionInput) -> Option<AutoTagSuggestion> {
        let caps = SEMESTER.captures(&input.combined)?;
        let term = if &caps[2] == "중간" { 1 } else { 2 };
        let code = format!("{}-{}", &caps[1], term);
        Some(suggestion(
            self.field(),
            code,
            80,
            format!("Found semester pattern '{}'", &caps[0]),
        ))
    }
}

pub struct ExamTypeDetector;

impl Detector for ExamTypeDetector {
    fn field(&self) -> MetadataField {
        MetadataField::ExamType
    }

    fn detect(&self, input: &DetectionInput) -> Option<AutoTagSuggestion> {
        let exam_type = EXAM_TYPES.iter().find(|t| input.combined.contains(*t))?;
        Some(suggestion(
            self.field(),
            *exam_type,
            95,
            format!("Found exam type '{}'", exam_type),
        ))
    }
}

pub struct ExamYearDetector {
    reference_year: i32,
}

impl ExamYearDetector {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }
}

impl Detector for ExamYearDetector {
    fn field(&self) -> MetadataField {
        MetadataField::ExamYear
    }

    fn detect(&self, input: &DetectionInput) -> Option<AutoTagSuggestion> {
        let year = DIGIT_RUN
            .find_iter(&input.combined)
            .filter(|run| run.as_str().len() == 4)
            .filter_map(|run| run.as_str().parse::<i32>().ok())
            .find(|year| (2000..=self.reference_year).contains(year))?;

        Some(suggestion(
            self.field(),
            year.to_string(),
            90,
            format!("Found exam year {}", year),
        ))
    }
}

pub struct QuestionCountDetector;

impl Detector for QuestionCountDetector {
    fn field(&self) -> MetadataField {
        MetadataField::QuestionCount
    }

    fn detect(&self, input: &DetectionInput) -> Option<AutoTagSuggestion> {
        let count = NUMBERED_LINE.find_iter(&input.text).count();
        if count == 0 {
            return None;
        }
        Some(suggestion(
            self.field(),
            count.to_string(),
            70,
            format!("Counted {} numbered question lines", count),
        ))
    }
}

/// Proposes worksheet metadata from a document's filename and text.
pub struct MetadataExtractor {
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataExtractor {
    /// Standard detector battery, judging exam years against the current year.
    pub fn new() -> Self {
        Self::with_reference_year(Utc::now().year())
    }

    pub fn with_reference_year(reference_year: i32) -> Self {
        Self {
            detectors: vec![
                Box::new(SchoolNameDetector),
                Box::new(RegionDetector),
                Box::new(SubjectDetector),
                Box::new(GradeDetector),
                Box::new(SemesterDetector),
                Box::new(ExamTypeDetector),
                Box::new(ExamYearDetector::new(reference_year)),
                Box::new(QuestionCountDetector),
            ],
        }
    }

    /// Append a detector; it runs after the existing ones.
    pub fn with_detector(mut self, detector: Box<dyn Detector>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn fields(&self) -> Vec<MetadataField> {
        self.detectors.iter().map(|d| d.field()).collect()
    }

    pub fn suggest(&self, text: &str, filename: &str) -> Vec<AutoTagSuggestion> {
        let started = Instant::now();
        if text.trim().is_empty() && filename.trim().is_empty() {
            log_engine_success!("auto_tagger", "suggest", "empty input, no suggestions");
            return Vec::new();
        }

        log_engine_start!("auto_tagger", "suggest");
        let input = DetectionInput::new(text, filename);
        let suggestions: Vec<AutoTagSuggestion> = self
            .detectors
            .iter()
            .filter_map(|detector| detector.detect(&input))
            .collect();

        log_engine_success!(
            "auto_tagger",
            "suggest",
            result_count = suggestions.len(),
            duration_us = started.elapsed().as_micros() as u64
        );
        suggestions
    }
}

/// Write an accepted suggestion into the metadata, overwriting the field.
pub fn apply_suggestion(
    metadata: &mut WorksheetMetadata,
    suggestion: &AutoTagSuggestion,
) -> Result<(), EngineError> {
    let invalid = || EngineError::InvalidSuggestion {
        field: suggestion.field,
        value: suggestion.value.clone(),
    };
    let value = suggestion.value.trim();

    match suggestion.field {
        MetadataField::SchoolName => metadata.school_name = Some(value.to_string()),
        MetadataField::Region => metadata.region = Some(value.to_string()),
        MetadataField::Subject => {
            metadata.subject = Some(value.parse::<Subject>().map_err(|_| invalid())?)
        }
        MetadataField::Grade => metadata.grade = Some(value.to_string()),
        MetadataField::Semester => metadata.semester = Some(value.to_string()),
        MetadataField::ExamType => metadata.exam_type = Some(value.to_string()),
        MetadataField::ExamYear => {
            metadata.exam_year = Some(value.parse::<i32>().map_err(|_| invalid())?)
        }
        MetadataField::QuestionCount => {
            metadata.question_count = Some(value.parse::<u32>().map_err(|_| invalid())?)
        }
    }
    Ok(())
}

/// Accept/reject protocol over a set of pending suggestions. Nothing reaches
/// the metadata without an explicit accept.
#[derive(Debug, Clone)]
pub struct MetadataReview {
    metadata: WorksheetMetadata,
    pending: Vec<AutoTagSuggestion>,
    bulk_threshold: u8,
}

impl MetadataReview {
    pub fn new(metadata: WorksheetMetadata, suggestions: Vec<AutoTagSuggestion>) -> Self {
        Self {
            metadata,
            pending: suggestions,
            bulk_threshold: DEFAULT_BULK_THRESHOLD,
        }
    }

    pub fn with_bulk_threshold(mut self, threshold: u8) -> Self {
        self.bulk_threshold = threshold;
        self
    }

    pub fn metadata(&self) -> &WorksheetMetadata {
        &self.metadata
    }

    pub fn pending(&self) -> &[AutoTagSuggestion] {
        &self.pending
    }

    pub fn into_parts(self) -> (WorksheetMetadata, Vec<AutoTagSuggestion>) {
        (self.metadata, self.pending)
    }

    /// Apply the pending suggestion for `field` and drop it from the list.
    /// A value that cannot be parsed leaves both metadata and list untouched.
    pub fn accept(&mut self, field: MetadataField) -> Result<(), EngineError> {
        let index = self.position(field)?;
        apply_suggestion(&mut self.metadata, &self.pending[index])?;
        self.pending.remove(index);
        Ok(())
    }

    pub fn reject(&mut self, field: MetadataField) -> Result<AutoTagSuggestion, EngineError> {
        let index = self.position(field)?;
        Ok(self.pending.remove(index))
    }

    /// Accept every pending suggestion at or above the bulk threshold in one
    /// pass. Returns the fields that were applied.
    pub fn accept_confident(&mut self) -> Vec<MetadataField> {
        let mut applied = Vec::new();
        let mut remaining = Vec::with_capacity(self.pending.len());

        for suggestion in std::mem::take(&mut self.pending) {
            if suggestion.confidence < self.bulk_threshold {
                remaining.push(suggestion);
                continue;
            }
            match apply_suggestion(&mut self.metadata, &suggestion) {
                Ok(()) => applied.push(suggestion.field),
                Err(e) => {
                    log_engine_warn!("auto_tagger", "accept_confident", e.to_string());
                    remaining.push(suggestion);
                }
            }
        }

        self.pending = remaining;
        applied
    }

    fn position(&self, field: MetadataField) -> Result<usize, EngineError> {
        self.pending
            .iter()
            .position(|s| s.field == field)
            .ok_or(EngineError::SuggestionNotFound(field))
    }
}
