//! Plain-text rendering for terminal output.

use analysis::{AnalysisSnapshot, AnalysisStep};
use chat::{ChatMessage, Role};
use report::{MappingDefault, ReportData};

/// `[ 55%] 4/6 Linking Evidence - Extracting claims`
pub fn progress_line(snap: &AnalysisSnapshot) -> String {
    format!(
        "[{:>3}%] {}/{} {} - {}",
        snap.progress,
        snap.current_step.index() + 1,
        AnalysisStep::ALL.len(),
        snap.current_step.label(),
        snap.message
    )
}

pub fn report_text(report: &ReportData) -> String {
    let mut out = format!(
        "{} sections, {} claims, {} evidence, {} gaps, {} questions\n",
        report.sections.len(),
        report.claims.len(),
        report.evidence_count(),
        report.gap_count(),
        report.question_count()
    );

    if !report.sections.is_empty() {
        out.push_str("\nSections\n");
        for section in &report.sections {
            out.push_str(&format!(
                "  p.{:<4} {:<13} {}\n",
                section.page,
                section.role.as_str(),
                section.title
            ));
        }
    }

    for claim in &report.claims {
        out.push_str(&format!(
            "\n[{}] ({}) {}\n",
            claim.id,
            claim.confidence.as_str(),
            claim.statement
        ));
        for evidence in &claim.evidence {
            let location = match evidence.page {
                0 => evidence.source.clone(),
                page => format!("{}, p.{}", evidence.source, page),
            };
            out.push_str(&format!("    + {} ({})\n", evidence.text, location));
        }
        for gap in &claim.gaps {
            out.push_str(&format!("    ! {}: {}\n", gap.kind.as_str(), gap.message));
        }
        for assumption in &claim.assumptions {
            out.push_str(&format!(
                "    ~ {} assumption: {}\n",
                assumption.kind, assumption.statement
            ));
        }
        for question in &claim.questions {
            out.push_str(&format!("    ? {}\n", question.text));
        }
    }

    out
}

pub fn defaults_text(defaults: &[MappingDefault]) -> String {
    if defaults.is_empty() {
        return "No fields were defaulted.\n".to_string();
    }

    let mut out = format!("{} fields defaulted:\n", defaults.len());
    for default in defaults {
        out.push_str(&format!("  {} -> {:?}\n", default.path, default.substituted));
    }
    out
}

pub fn chat_message(message: &ChatMessage) -> String {
    let speaker = match message.role {
        Role::User => "you",
        Role::Assistant => "readify",
    };

    let mut out = format!("{}> {}\n", speaker, message.content);
    for (idx, citation) in message.citations.iter().enumerate() {
        out.push_str(&format!("    [{}] {}\n", idx + 1, citation));
    }
    out
}
