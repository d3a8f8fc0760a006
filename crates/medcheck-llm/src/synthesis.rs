//! Patient-facing interaction report synthesis.

use medcheck_core::models::{Finding, PatientContext};
use medcheck_core::{ReportSynthesizer, StageError};
use serde_json::Value;

use crate::generator::TextGenerator;
use crate::prompts::{build_synthesis_prompt, SYNTHESIS_SYSTEM_PROMPT};

/// Shared wording of both notices; callers can search reports for it.
pub const NO_DATA_PHRASE: &str = "No drug interaction data was available";

/// Prefixed when no drug pair could be formed.
pub const NO_PAIRS_NOTICE: &str = "No drug interaction data was available: fewer than two of your medications could be identified, so no pairs were checked.";

/// Prefixed when pairs were checked but none had recorded outcomes.
pub const NO_OUTCOMES_NOTICE: &str = "No drug interaction data was available for the medication pairs we checked.";

/// Keys a model may wrap its answer in.
const ANSWER_KEYS: &[&str] = &["report", "narrative", "answer"];

/// Fixed notice for findings without any outcome, if one applies.
pub fn no_data_notice(findings: &[Finding]) -> Option<&'static str> {
    if findings.is_empty() {
        Some(NO_PAIRS_NOTICE)
    } else if !findings.iter().any(Finding::has_outcomes) {
        Some(NO_OUTCOMES_NOTICE)
    } else {
        None
    }
}

/// Strip code fences and unwrap a JSON answer object. `None` when nothing is left.
pub fn clean_narrative(raw: &str) -> Option<String> {
    let text = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();

    if text.starts_with('{') {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
            if let Some(answer) = ANSWER_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
            {
                let answer = answer.trim();
                return (!answer.is_empty()).then(|| answer.to_string());
            }
        }
    }

    (!text.is_empty()).then(|| text.to_string())
}

/// Report synthesizer backed by a text generator.
pub struct LlmSynthesizer<G> {
    generator: G,
}

impl<G: TextGenerator> LlmSynthesizer<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }
}

impl<G: TextGenerator> ReportSynthesizer for LlmSynthesizer<G> {
    fn synthesize(
        &self,
        findings: &[Finding],
        context: &PatientContext,
        question: &str,
    ) -> Result<String, StageError> {
        let prompt = build_synthesis_prompt(findings, context, question);
        tracing::debug!(
            prompt_len = prompt.len(),
            findings = findings.len(),
            "Requesting interaction report"
        );

        let raw = self.generator.generate(SYNTHESIS_SYSTEM_PROMPT, &prompt)?;
        let body = clean_narrative(&raw)
            .ok_or_else(|| StageError::Malformed("empty narrative".into()))?;

        Ok(match no_data_notice(findings) {
            Some(notice) => format!("{notice}\n\n{body}"),
            None => body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GenerationError, MockGenerator};
    use medcheck_core::models::{DrugPair, PairMember, Sex};

    fn context() -> PatientContext {
        PatientContext::new(70, Sex::Female, 160.0, 60.0)
            .unwrap()
            .with_medications("Warfarin, Aspirin")
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
    fn test_notice_selection() {
        assert_eq!(no_data_notice(&[]), Some(NO_PAIRS_NOTICE));
        assert_eq!(no_data_notice(&[finding(&[])]), Some(NO_OUTCOMES_NOTICE));
        assert_eq!(no_data_notice(&[finding(&[]), finding(&["bleeding"])]), None);
        assert!(NO_PAIRS_NOTICE.starts_with(NO_DATA_PHRASE));
        assert!(NO_OUTCOMES_NOTICE.starts_with(NO_DATA_PHRASE));
    }

    #[test]
    fn test_clean_narrative() {
        assert_eq!(clean_narrative("  Hello.  ").as_deref(), Some("Hello."));
        assert_eq!(
            clean_narrative("```markdown\nTake care.\n```").as_deref(),
            Some("Take care.")
        );
        assert_eq!(
            clean_narrative(r#"{"report": "All clear."}"#).as_deref(),
            Some("All clear.")
        );
        assert_eq!(
            clean_narrative("```json\n{\"answer\": \"Ask your doctor.\"}\n```").as_deref(),
            Some("Ask your doctor.")
        );
        assert_eq!(clean_narrative("```\n```"), None);
        assert_eq!(clean_narrative(r#"{"report": "  "}"#), None);
    }

    #[test]
    fn test_unknown_json_kept_verbatim() {
        assert_eq!(
            clean_narrative(r#"{"summary": "x"}"#).as_deref(),
            Some(r#"{"summary": "x"}"#)
        );
    }

    #[test]
    fn test_outcomes_reach_prompt_without_notice() {
        let mock = MockGenerator::always("Warfarin and aspirin together can raise bleeding risk.");
        let synthesizer = LlmSynthesizer::new(&mock);

        let text = synthesizer
            .synthesize(&[finding(&["bleeding"])], &context(), "Should I worry?")
            .unwrap();

        assert!(!text.contains(NO_DATA_PHRASE));
        let calls = mock.calls();
        assert_eq!(calls[0].0, SYNTHESIS_SYSTEM_PROMPT);
        assert!(calls[0].1.contains("bleeding"));
        assert!(calls[0].1.contains("Should I worry?"));
    }

    #[test]
    fn test_empty_findings_get_notice() {
        let synthesizer = LlmSynthesizer::new(MockGenerator::always("Keep taking care."));
        let text = synthesizer.synthesize(&[], &context(), "?").unwrap();
        assert!(text.starts_with(NO_PAIRS_NOTICE));
        assert!(text.ends_with("Keep taking care."));
    }

    #[test]
    fn test_blank_answer_is_malformed() {
        let synthesizer = LlmSynthesizer::new(MockGenerator::always("   "));
        assert!(matches!(
            synthesizer.synthesize(&[], &context(), "?"),
            Err(StageError::Malformed(_))
        ));
    }

    #[test]
    fn test_transport_failure() {
        let synthesizer = LlmSynthesizer::new(MockGenerator::scripted(vec![Err(
            GenerationError::Api {
                status: 429,
                body: "quota".into(),
            },
        )]));
        assert!(matches!(
            synthesizer.synthesize(&[], &context(), "?"),
            Err(StageError::Unavailable(msg)) if msg.contains("429")
        ));
    }
}
