//! Call-quality scoring.
//!
//! One generation call evaluates the transcript against a fixed five-check
//! binary rubric; the answers fold into a total plus a satisfactory flag
//! that drives the committer's comment highlighting. A separate
//! convention-based aggregation sums every extracted field whose literal
//! value is "0" or "1", so rubric sub-answers mapped into ordinary sheet
//! columns roll up without any field being special-cased by name.

use crate::{extract::ExtractedValue, llm::GenerationClient};

use std::collections::HashMap;

use tracing::{debug, instrument, warn};

/// Marker in the recommendation text that vetoes a satisfactory rating.
pub const NEGATIVE_MARKER: &str = "НЕ РЕКОМЕНДУЮ";

/// Minimum rubric total for a satisfactory call.
pub const SATISFACTORY_THRESHOLD: u32 = 4;

/// What an evaluation outage means for the satisfactory flag.
///
/// The historical behavior is fail-open: an outage must neither block the
/// row write nor wrongly flag the row for review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationPolicy {
    /// `true`: a failed rubric call counts as satisfactory (zero-scored);
    /// `false`: a failed call flags the row for review.
    pub fail_open: bool,
}

impl Default for EvaluationPolicy {
    fn default() -> Self {
        Self { fail_open: true }
    }
}

/// The five binary rubric checks, each 0 or 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RubricScores {
    /// Was the manager polite?
    pub politeness: u8,
    /// Did the manager stay professional?
    pub professionalism: u8,
    /// Did the manager respond promptly and to the point?
    pub responsiveness: u8,
    /// Was the caller's issue resolved?
    pub resolution: u8,
    /// Did the manager follow the call protocol?
    pub protocol: u8,
}

impl RubricScores {
    /// Sum of the five checks.
    pub fn total(&self) -> u32 {
        u32::from(self.politeness)
            + u32::from(self.professionalism)
            + u32::from(self.responsiveness)
            + u32::from(self.resolution)
            + u32::from(self.protocol)
    }
}

/// Outcome of one rubric evaluation, immutable once produced.
#[derive(Debug, Clone)]
pub struct EvaluationResult {
    /// Per-check binary scores.
    pub scores: RubricScores,
    /// Sum of the per-check scores.
    pub total: u32,
    /// Free-text overall assessment from the model.
    pub narrative: String,
    /// Free-text recommendation from the model.
    pub recommendation: String,
    /// Whether the call passed review; `false` triggers comment
    /// highlighting in the committed row.
    pub is_satisfactory: bool,
}

impl EvaluationResult {
    fn from_scores(scores: RubricScores, narrative: String, recommendation: String) -> Self {
        let total = scores.total();
        let vetoed = recommendation.to_uppercase().contains(NEGATIVE_MARKER);
        Self {
            scores,
            total,
            narrative,
            recommendation,
            is_satisfactory: total >= SATISFACTORY_THRESHOLD && !vetoed,
        }
    }

    /// Result substituted when the rubric call fails outright.
    fn outage(policy: EvaluationPolicy) -> Self {
        Self {
            scores: RubricScores::default(),
            total: 0,
            narrative: String::new(),
            recommendation: String::new(),
            is_satisfactory: policy.fail_open,
        }
    }
}

/// Evaluates the transcript against the rubric in exactly one generation
/// call.
///
/// Missing checks in the response default to 0 — an unanswered check never
/// silently passes. A failed call yields a zero-scored result whose
/// satisfactory flag follows `policy`.
#[instrument(skip(client, transcript))]
pub async fn evaluate<C: GenerationClient + ?Sized>(
    client: &C,
    transcript: &str,
    policy: EvaluationPolicy,
) -> EvaluationResult {
    let prompt = rubric_prompt(transcript);

    let Some(response) = client.generate(&prompt).await else {
        warn!("Rubric call failed, substituting outage result");
        return EvaluationResult::outage(policy);
    };

    let result = parse_rubric_response(&response);
    debug!(
        total = result.total,
        satisfactory = result.is_satisfactory,
        "Rubric evaluation complete"
    );
    result
}

/// Parses the rubric response line by line on `key: value`.
///
/// Keys are matched case-insensitively in Ukrainian or English; lines with
/// unrecognized keys are ignored rather than treated as errors.
pub fn parse_rubric_response(response: &str) -> EvaluationResult {
    let mut scores = RubricScores::default();
    let mut narrative = String::new();
    let mut recommendation = String::new();

    for line in response.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().trim_start_matches(['-', '*', ' ']).to_lowercase();
        let value = value.trim();

        if let Some(check) = check_slot(&mut scores, &key) {
            if let Some(score) = parse_binary(value) {
                *check = score;
            }
        } else if matches_any(&key, &["загальна оцінка", "overall", "assessment"]) {
            narrative = value.to_string();
        } else if matches_any(&key, &["рекомендація", "рекомендация", "recommendation"]) {
            recommendation = value.to_string();
        }
    }

    EvaluationResult::from_scores(scores, narrative, recommendation)
}

/// Sums every extracted value whose literal text is exactly "0" or "1".
///
/// This is a convention, not a schema contract: any field whose extracted
/// text happens to be a bare binary digit contributes to the score.
pub fn aggregate_score(extracted: &HashMap<String, ExtractedValue>) -> u32 {
    extracted
        .values()
        .filter_map(|v| match v.as_str() {
            "0" => Some(0),
            "1" => Some(1),
            _ => None,
        })
        .sum()
}

fn check_slot<'a>(scores: &'a mut RubricScores, key: &str) -> Option<&'a mut u8> {
    if matches_any(key, &["ввічливість", "вежливость", "politeness"]) {
        Some(&mut scores.politeness)
    } else if matches_any(
        key,
        &["професійність", "професіоналізм", "professionalism"],
    ) {
        Some(&mut scores.professionalism)
    } else if matches_any(key, &["оперативність", "responsiveness"]) {
        Some(&mut scores.responsiveness)
    } else if matches_any(key, &["вирішення", "resolution", "issue resolution"]) {
        Some(&mut scores.resolution)
    } else if matches_any(key, &["протокол", "protocol"]) {
        Some(&mut scores.protocol)
    } else {
        None
    }
}

fn matches_any(key: &str, candidates: &[&str]) -> bool {
    candidates.iter().any(|c| key.contains(c))
}

fn parse_binary(value: &str) -> Option<u8> {
    match value.chars().find(|c| c.is_ascii_digit())? {
        '0' => Some(0),
        '1' => Some(1),
        _ => None,
    }
}

fn rubric_prompt(transcript: &str) -> String {
    format!(
        "Оціни роботу менеджера за транскриптом телефонної розмови.\n\
         Відповідь дай рядками у форматі «ключ: значення», по одному на рядок:\n\n\
         Ввічливість: 1 або 0\n\
         Професійність: 1 або 0\n\
         Оперативність: 1 або 0\n\
         Вирішення проблеми: 1 або 0\n\
         Дотримання протоколу: 1 або 0\n\
         Загальна оцінка: короткий висновок про розмову (2-3 речення)\n\
         Рекомендація: РЕКОМЕНДУЮ або НЕ РЕКОМЕНДУЮ, з коротким поясненням\n\n\
         Транскрипт розмови:\n{transcript}"
    )
}
