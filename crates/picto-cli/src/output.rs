//! Human-readable rendering of results.

use picto::{BatchReport, IndexSummary, RequestOutcome};

pub fn render_outcome(outcome: &RequestOutcome) -> String {
    match outcome {
        RequestOutcome::Evaluated { analysis, guidance } => format!(
            "=== Image analysis ===\n{analysis}\n\n=== Shooting guidelines ===\n{guidance}"
        ),
        RequestOutcome::Error { message } => format!("Error: {message}"),
        RequestOutcome::Notice { message } => format!("Notice: {message}"),
    }
}

pub fn render_summary(summary: Option<&IndexSummary>) -> String {
    let Some(summary) = summary else {
        return "The index is empty or has not been built.".to_string();
    };

    let mut out = format!(
        "=== Index contents ===\nTotal documents: {}\n\nIndexed PDF files:",
        summary.document_count
    );
    for source in &summary.sources {
        out.push_str(&format!("\n- {source}"));
    }
    out
}

pub fn render_report(report: &BatchReport) -> String {
    format!(
        "Processed {} records: {} analysed, {} download failures, {} analysis failures",
        report.total, report.analyzed, report.download_failures, report.analysis_failures
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_render_outcomes() {
        let evaluated = RequestOutcome::Evaluated {
            analysis: "Warm".to_string(),
            guidance: "Use fill light".to_string(),
        };
        let text = render_outcome(&evaluated);
        assert!(text.starts_with("=== Image analysis ===\nWarm"));
        assert!(text.ends_with("=== Shooting guidelines ===\nUse fill light"));

        assert_eq!(render_outcome(&RequestOutcome::error("boom")), "Error: boom");
        assert_eq!(render_outcome(&RequestOutcome::notice("hint")), "Notice: hint");
    }

    #[test]
    fn test_render_summary() {
        assert!(render_summary(None).contains("empty"));

        let summary = IndexSummary {
            document_count: 12,
            sources: BTreeSet::from(["a.pdf".to_string(), "b.pdf".to_string()]),
        };
        let text = render_summary(Some(&summary));
        assert!(text.contains("Total documents: 12"));
        assert!(text.ends_with("- a.pdf\n- b.pdf"));
    }
}
