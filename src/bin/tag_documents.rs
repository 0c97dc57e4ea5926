use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use worksheet_engine::auto_tagger::DEFAULT_BULK_THRESHOLD;
use worksheet_engine::{AutoTagSuggestion, MetadataExtractor, MetadataReview, WorksheetMetadata};

#[derive(Debug, Serialize)]
struct DocumentReport {
    file: PathBuf,
    suggestions: Vec<AutoTagSuggestion>,
    /// Metadata after accepting every suggestion at or above the threshold.
    bulk_applied: WorksheetMetadata,
}

#[derive(Debug, Default)]
struct TagStats {
    documents: usize,
    documents_without_suggestions: usize,
    suggestions: usize,
    errors: Vec<String>,
}

impl TagStats {
    fn print_summary(&self) {
        println!("\n=== Tagging Summary ===");
        println!("Documents examined: {}", self.documents);
        println!("Suggestions produced: {}", self.suggestions);
        println!("Documents with nothing detected: {}", self.documents_without_suggestions);
        if !self.errors.is_empty() {
            println!("Errors encountered: {}", self.errors.len());
            for error in &self.errors {
                println!("  - {}", error);
            }
        }
    }
}

struct Options {
    json: bool,
    threshold: u8,
    files: Vec<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options {
        json: false,
        threshold: DEFAULT_BULK_THRESHOLD,
        files: Vec::new(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => options.json = true,
            "--threshold" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| anyhow!("--threshold needs a value"))?;
                options.threshold = raw
                    .parse::<u8>()
                    .ok()
                    .filter(|value| *value <= 100)
                    .ok_or_else(|| anyhow!("Invalid threshold '{}'. Must be 0-100", raw))?;
            }
            other => options.files.push(PathBuf::from(other)),
        }
    }

    if options.files.is_empty() {
        return Err(anyhow!(
            "usage: tag_documents [--json] [--threshold N] <file>..."
        ));
    }
    Ok(options)
}

async fn tag_document(
    extractor: &MetadataExtractor,
    path: &Path,
    threshold: u8,
) -> Result<DocumentReport> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let suggestions = extractor.suggest(&text, &filename);
    let mut review = MetadataReview::new(WorksheetMetadata::default(), suggestions.clone())
        .with_bulk_threshold(threshold);
    review.accept_confident();
    let (bulk_applied, _) = review.into_parts();

    Ok(DocumentReport {
        file: path.to_path_buf(),
        suggestions,
        bulk_applied,
    })
}

fn print_report(report: &DocumentReport) {
    println!("\n{}", report.file.display());
    if report.suggestions.is_empty() {
        println!("  (no metadata detected)");
        return;
    }
    for suggestion in &report.suggestions {
        println!(
            "  {:<15} {:<20} {:>3}%  {}",
            suggestion.field.to_string(),
            suggestion.value,
            suggestion.confidence,
            suggestion.reason
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(&args)?;
    let extractor = MetadataExtractor::new();

    let mut stats = TagStats::default();
    let mut reports = Vec::new();

    for path in &options.files {
        stats.documents += 1;
        match tag_document(&extractor, path, options.threshold).await {
            Ok(report) => {
                stats.suggestions += report.suggestions.len();
                if report.suggestions.is_empty() {
                    stats.documents_without_suggestions += 1;
                }
                reports.push(report);
            }
            Err(e) => stats.errors.push(format!("{:#}", e)),
        }
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("=== Worksheet Auto-Tagging ===");
        println!("Bulk-accept threshold: {}%", options.threshold);
        for report in &reports {
            print_report(report);
        }
        stats.print_summary();
    }

    if stats.errors.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{} document(s) could not be tagged", stats.errors.len()))
    }
}
