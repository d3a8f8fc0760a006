//! Prompts for drug-name extraction and interaction report synthesis.

use std::fmt::Write;

use medcheck_core::models::{Finding, PatientContext};

/// System prompt for drug-name extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a clinical pharmacology assistant that extracts drug names from patient records.

Read the patient profile, any attached documents, and the patient's question.
List every medication, drug, or active ingredient the patient takes, has taken, or asks about.

Rules:
- Use the drug name as written (generic or brand). Do not add doses, routes, or schedules.
- Do not invent drugs that are not mentioned.
- Ignore allergies to non-drug substances (foods, pollen, latex).
- If no drugs are mentioned, return an empty list.

Output only a JSON array of strings, for example: ["Warfarin", "Aspirin"]"#;

/// System prompt for the patient-facing interaction report.
pub const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You are a careful, empathetic medical assistant writing for a patient, not a clinician.

You receive the patient's profile, their question, and drug-pair interaction outcomes taken from an FDA-derived interaction database.

Write a short report that:
- Explains each reported interaction in plain language without frightening the patient.
- Relates the interactions to the patient's question and profile where relevant.
- Says clearly when no interaction data was found, and still offers general guidance.
- Never tells the patient to start, stop, or change a medication on their own.
- Ends with a list titled "Questions to ask your doctor" containing 3 to 6 concrete questions.

Answer in plain text. Do not wrap the answer in JSON or code fences."#;

/// Render the patient context as labelled lines. Empty free-text fields are skipped.
pub fn render_patient_context(context: &PatientContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Age: {}", context.age());
    let _ = writeln!(out, "Sex: {}", context.sex());
    let _ = writeln!(out, "Height: {} cm", context.height_cm());
    let _ = writeln!(out, "Weight: {} kg", context.weight_kg());

    let fields = [
        ("Allergies", context.allergies()),
        ("Pre-existing conditions", context.preexisting_conditions()),
        ("Current medications", context.medications()),
        ("Family history", context.family_history()),
    ];
    for (label, value) in fields {
        let value = value.trim();
        if !value.is_empty() {
            let _ = writeln!(out, "{label}: {value}");
        }
    }

    let documents = context.supplementary_document_text().trim();
    if !documents.is_empty() {
        let _ = writeln!(out, "\nAttached documents:\n\"\"\"\n{documents}\n\"\"\"");
    }

    out
}

/// User prompt for extraction.
pub fn build_extraction_prompt(context: &PatientContext, question: &str) -> String {
    format!(
        r#"Patient profile:
{}
Patient question:
"{}"

Return the JSON array of drug names mentioned above."#,
        render_patient_context(context),
        question.trim()
    )
}

/// User prompt for synthesis.
///
/// Outcomes are listed per pair exactly as stored; pairs without data are
/// listed too so the model can say so.
pub fn build_synthesis_prompt(findings: &[Finding], context: &PatientContext, question: &str) -> String {
    let mut data = String::new();
    if findings.is_empty() {
        data.push_str("No drug pairs could be checked.\n");
    }
    for finding in findings {
        let (a, b) = finding.pair.names();
        if finding.outcomes.is_empty() {
            let _ = writeln!(data, "- {a} + {b}: no interaction data found");
        } else {
            let _ = writeln!(data, "- {a} + {b}: {}", finding.outcomes.join("; "));
        }
    }

    format!(
        r#"Patient profile:
{}
Patient question:
"{}"

Interaction outcomes by drug pair:
{}
Write the report for this patient."#,
        render_patient_context(context),
        question.trim(),
        data
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use medcheck_core::models::{DrugPair, PairMember, Sex};

    fn context() -> PatientContext {
        PatientContext::new(64, Sex::Male, 178.0, 82.5)
            .unwrap()
            .with_medications("Warfarin 5mg daily")
            .with_allergies("Penicillin")
    }

    fn finding(outcomes: &[&str]) -> Finding {
        let pair = DrugPair::new(
            PairMember::new("Warfarin".into(), "W"),
            PairMember::new("Aspirin".into(), "A"),
        )
        .unwrap();
        Finding::new(pair, outcomes.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_context_skips_empty_fields() {
        let rendered = render_patient_context(&context());
        assert!(rendered.contains("Age: 64"));
        assert!(rendered.contains("Sex: Male"));
        assert!(rendered.contains("Current medications: Warfarin 5mg daily"));
        assert!(rendered.contains("Allergies: Penicillin"));
        assert!(!rendered.contains("Family history"));
        assert!(!rendered.contains("Attached documents"));
    }

    #[test]
    fn test_context_includes_documents() {
        let ctx = context().with_supplementary_document_text("Discharged on metoprolol.");
        assert!(render_patient_context(&ctx).contains("Discharged on metoprolol."));
    }

    #[test]
    fn test_extraction_prompt() {
        let prompt = build_extraction_prompt(&context(), "Can I take ibuprofen?");
        assert!(prompt.contains("Warfarin 5mg daily"));
        assert!(prompt.contains("Can I take ibuprofen?"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("JSON array"));
    }

    #[test]
    fn test_synthesis_prompt_lists_outcomes() {
        let findings = vec![finding(&["bleeding", "hemorrhage"])];
        let prompt = build_synthesis_prompt(&findings, &context(), "Is this safe?");
        assert!(prompt.contains("Aspirin + Warfarin: bleeding; hemorrhage"));
        assert!(prompt.contains("Is this safe?"));
    }

    #[test]
    fn test_synthesis_prompt_without_data() {
        let prompt = build_synthesis_prompt(&[finding(&[])], &context(), "?");
        assert!(prompt.contains("no interaction data found"));

        let prompt = build_synthesis_prompt(&[], &context(), "?");
        assert!(prompt.contains("No drug pairs could be checked."));
    }
}
