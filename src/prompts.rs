//! Versioned essay-grading prompt templates.
//!
//! The grading prompt has gone through several wording revisions that only
//! differ in the JSON fields requested of the model, so the revisions live
//! here as data rather than as separate handlers. One template is selected at
//! startup via `PROMPT_VERSION`; new revisions get a new version string and
//! the old ones stay callable.

use once_cell::sync::Lazy;
use std::collections::HashMap;

pub struct GradingTemplate {
    pub version: &'static str,
    /// Fixed system instruction establishing the grading persona.
    pub system: &'static str,
    /// Task text; `{question}` and `{answer}` are substituted verbatim.
    task: &'static str,
}

impl GradingTemplate {
    pub fn render(&self, question: &str, answer: &str) -> String {
        self.task
            .replace("{question}", question)
            .replace("{answer}", answer)
    }
}

const SYSTEM: &str = "You are an experienced writing instructor grading short essay answers. \
You grade strictly but constructively, and you reply with JSON only, with no surrounding prose.";

static TEMPLATES: &[GradingTemplate] = &[
    GradingTemplate {
        version: "v1",
        system: SYSTEM,
        task: r#"Grade the following essay answer.

Question:
{question}

Answer:
{answer}

Reply with a single JSON object of exactly this shape:
{
  "score": <number from 0 to 100>,
  "overall_feedback": [<strings summarizing the strengths and weaknesses of the answer>],
  "suggestions": [
    {
      "original_sentence": <a sentence from the answer, as written>,
      "suggested_sentence": <your improved replacement>,
      "sentence_index": <zero-based index of the sentence within the answer>
    }
  ]
}"#,
    },
    GradingTemplate {
        version: "v2",
        system: SYSTEM,
        task: r#"Grade the following essay answer.

Question:
{question}

Answer:
{answer}

Reply with a single JSON object of exactly this shape:
{
  "score": <number from 0 to 100>,
  "overall_feedback": [<strings summarizing the strengths and weaknesses of the answer>],
  "suggestions": [
    {
      "original_sentence": <a sentence from the answer, as written>,
      "suggested_sentence": <your improved replacement>,
      "sentence_index": <zero-based index of the sentence within the answer>,
      "explanation": <why the replacement is better>,
      "actionable_advice": <one concrete step the writer can practice>
    }
  ]
}

Provide between 10 and 50 suggestion items."#,
    },
];

pub const LATEST_VERSION: &str = "v2";

static BY_VERSION: Lazy<HashMap<&'static str, &'static GradingTemplate>> =
    Lazy::new(|| TEMPLATES.iter().map(|t| (t.version, t)).collect());

pub fn get(version: &str) -> Option<&'static GradingTemplate> {
    BY_VERSION.get(version).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_version_is_registered_and_latest_exists() {
        for template in TEMPLATES {
            assert_eq!(get(template.version).unwrap().version, template.version);
        }
        assert!(get(LATEST_VERSION).is_some());
        assert!(get("v999").is_none());
    }

    #[test]
    fn render_substitutes_both_fields() {
        let rendered = get("v1")
            .unwrap()
            .render("Why is the sky blue?", "Because of Rayleigh scattering.");
        assert!(rendered.contains("Why is the sky blue?"));
        assert!(rendered.contains("Because of Rayleigh scattering."));
        assert!(!rendered.contains("{question}"));
        assert!(!rendered.contains("{answer}"));
    }

    #[test]
    fn v2_adds_the_expanded_suggestion_fields() {
        let v1 = get("v1").unwrap().render("q", "a");
        let v2 = get("v2").unwrap().render("q", "a");

        assert!(!v1.contains("actionable_advice"));
        assert!(v2.contains("explanation"));
        assert!(v2.contains("actionable_advice"));
        assert!(v2.contains("between 10 and 50"));
    }
}
