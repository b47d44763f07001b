//! Bounded debate loop with stability safeguards.
//!
//! Each disagreement runs as an explicit finite state machine:
//! `Start → Round(k) → (Consensus | Timeout | Repetition | k == max)
//!  → Resolved | Forced`. No path loops past `max_rounds`, and when forced
//! consensus is enabled every safeguard exit still closes the debate.

use chrono::Utc;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::DebateConfig;
use crate::llm::{GenerationRequest, LlmGateway};
use crate::state::{DebateOutcome, Disagreement};

/// Floor applied to the confidence of any forced consensus.
const FORCED_CONFIDENCE_FLOOR: f64 = 0.5;

/// Convergence above which an unsignalled consensus is still recognised.
const NATURAL_CONVERGENCE_BAR: f64 = 0.7;

/// How a debate left its round loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebateExit {
    Natural,
    Timeout,
    Repetition,
    MaxRounds,
}

/// One round's parsed model output.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct DebateRound {
    revised_positions: BTreeMap<String, String>,
    consensus_reached: bool,
    consensus_explanation: String,
    common_ground: Vec<String>,
    remaining_differences: Vec<String>,
}

/// Outcome of running all of a round's debates.
#[derive(Debug, Default)]
pub struct DebateCycleResult {
    pub outcomes: Vec<DebateOutcome>,
    /// Failure notes for debates excluded from the outcome set.
    pub warnings: Vec<String>,
    /// Safeguard flags fired during the cycle.
    pub safeguards: Vec<String>,
}

/// Drives bounded debates through the LLM gateway.
pub struct DebateEngine {
    gateway: Arc<LlmGateway>,
    config: DebateConfig,
}

impl DebateEngine {
    pub fn new(gateway: Arc<LlmGateway>, config: DebateConfig) -> Self {
        Self { gateway, config }
    }

    /// Debate every disagreement concurrently. A single failed debate is
    /// recorded as a warning and excluded; it never fails the cycle.
    pub async fn run_all(
        self: &Arc<Self>,
        disagreements: &[Disagreement],
        context: &str,
    ) -> DebateCycleResult {
        if disagreements.is_empty() {
            return DebateCycleResult::default();
        }

        tracing::info!(count = disagreements.len(), "debate cycle started");

        let mut join_set = JoinSet::new();
        for disagreement in disagreements.iter().cloned() {
            let engine = Arc::clone(self);
            let context = context.to_string();
            join_set.spawn(async move {
                let id = disagreement.id.clone();
                (id, engine.facilitate(disagreement, &context).await)
            });
        }

        let mut by_id: BTreeMap<String, (DebateOutcome, Vec<String>)> = BTreeMap::new();
        let mut result = DebateCycleResult::default();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((id, (outcome, safeguards))) => {
                    by_id.insert(id, (outcome, safeguards));
                }
                Err(e) => {
                    tracing::error!(error = %e, "debate task failed");
                    result.warnings.push(format!("debate task failed: {e}"));
                }
            }
        }

        // Merge deterministically: input order, not arrival order.
        for disagreement in disagreements {
            if let Some((outcome, safeguards)) = by_id.remove(&disagreement.id) {
                result.outcomes.push(outcome);
                result.safeguards.extend(safeguards);
            }
        }

        tracing::info!(
            completed = result.outcomes.len(),
            failed = disagreements.len() - result.outcomes.len(),
            "debate cycle completed"
        );
        result
    }

    /// Run one debate to completion. Returns the outcome plus any
    /// safeguard flags that fired.
    pub async fn facilitate(
        &self,
        disagreement: Disagreement,
        context: &str,
    ) -> (DebateOutcome, Vec<String>) {
        let debate_id = Uuid::new_v4().to_string();
        tracing::info!(
            debate_id = %debate_id,
            topic = %disagreement.topic,
            "debate started"
        );

        let initial_positions = disagreement.positions.clone();
        let mut positions = disagreement.positions.clone();
        let mut rounds_run: u32 = 0;
        let mut exit = DebateExit::MaxRounds;
        let mut natural_signal = false;
        let mut safeguards = Vec::new();

        'rounds: for round in 1..=self.config.max_rounds {
            let round_future = self.run_round(&disagreement, &positions, round, context);
            let round_result =
                match tokio::time::timeout(self.config.round_timeout(), round_future).await {
                    Ok(round_result) => round_result,
                    Err(_) => {
                        tracing::warn!(
                            debate_id = %debate_id,
                            round,
                            timeout_secs = self.config.round_timeout_secs,
                            "debate round timed out"
                        );
                        safeguards.push(format!("debate_round_timeout:{}", disagreement.id));
                        // Positions carry over; the round is abandoned.
                        if self.config.enable_forced_consensus {
                            rounds_run = round;
                            exit = DebateExit::Timeout;
                            break 'rounds;
                        }
                        rounds_run = round;
                        continue;
                    }
                };
            rounds_run = round;

            tracing::debug!(
                debate_id = %debate_id,
                round,
                explanation = %round_result.consensus_explanation,
                common_ground = round_result.common_ground.len(),
                remaining = round_result.remaining_differences.len(),
                "debate round assessed"
            );

            let new_positions = if round_result.revised_positions.is_empty() {
                positions.clone()
            } else {
                round_result.revised_positions.clone()
            };

            if self.config.enable_repetition_detection && round > 1 {
                let similarity = position_similarity(&positions, &new_positions);
                tracing::debug!(debate_id = %debate_id, round, similarity, "repetition check");
                if similarity >= self.config.repetition_similarity_threshold {
                    tracing::warn!(
                        debate_id = %debate_id,
                        round,
                        similarity,
                        "repetitive debate detected"
                    );
                    safeguards.push(format!("debate_repetition:{}", disagreement.id));
                    positions = new_positions;
                    if self.config.enable_forced_consensus {
                        exit = DebateExit::Repetition;
                        break 'rounds;
                    }
                    continue;
                }
            }

            positions = new_positions;

            if round_result.consensus_reached {
                tracing::info!(debate_id = %debate_id, round, "natural consensus reached");
                natural_signal = true;
                exit = DebateExit::Natural;
                break 'rounds;
            }
        }

        if exit == DebateExit::MaxRounds {
            safeguards.push(format!("debate_max_rounds:{}", disagreement.id));
        }

        let convergence = convergence(&initial_positions, &positions);
        let (consensus_reached, confidence, summary, forced) =
            self.assess(exit, natural_signal, convergence, rounds_run);

        if forced {
            safeguards.push(format!("forced_consensus:{}", disagreement.id));
        }

        tracing::info!(
            debate_id = %debate_id,
            rounds = rounds_run,
            consensus_reached,
            confidence,
            "debate completed"
        );

        (
            DebateOutcome {
                id: debate_id,
                disagreement,
                rounds: rounds_run,
                revised_positions: positions,
                consensus_reached,
                resolution_summary: summary,
                confidence,
                timestamp: Utc::now(),
            },
            safeguards,
        )
    }

    async fn run_round(
        &self,
        disagreement: &Disagreement,
        positions: &BTreeMap<String, String>,
        round: u32,
        context: &str,
    ) -> DebateRound {
        let prompt = self.round_prompt(disagreement, positions, round, context);
        let request = GenerationRequest::new(prompt)
            .with_selector_hint(format!("Debate on {}", disagreement.topic))
            .with_role("debate_facilitator".to_string())
            .json();

        match self.gateway.generate(request).await {
            Ok(raw) => match serde_json::from_str::<DebateRound>(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(round, error = %e, "debate round output failed to parse");
                    DebateRound {
                        revised_positions: positions.clone(),
                        consensus_reached: false,
                        consensus_explanation: format!("round output failed to parse: {e}"),
                        ..Default::default()
                    }
                }
            },
            Err(e) => {
                tracing::error!(round, error = %e, "debate round failed");
                DebateRound {
                    revised_positions: positions.clone(),
                    consensus_reached: false,
                    consensus_explanation: format!("debate round failed: {e}"),
                    ..Default::default()
                }
            }
        }
    }

    fn round_prompt(
        &self,
        disagreement: &Disagreement,
        positions: &BTreeMap<String, String>,
        round: u32,
        context: &str,
    ) -> String {
        let formatted_positions = positions
            .iter()
            .map(|(role, position)| format!("**{role}**: {position}"))
            .collect::<Vec<_>>()
            .join("\n");

        let context_excerpt: String = context.chars().take(2000).collect();

        format!(
            "You are facilitating a debate between architectural review agents.\n\n\
             **Topic of Disagreement:** {}\n\
             **Category:** {}\n\
             **Severity:** {}\n\n\
             **Current Positions:**\n{formatted_positions}\n\n\
             **Design Context:**\n{context_excerpt}\n\n\
             **Debate Round:** {round}/{}\n\n\
             Your task:\n\
             1. Analyse each agent's position and rationale\n\
             2. Identify areas of potential common ground\n\
             3. Generate revised positions that move toward consensus\n\
             4. Assess whether consensus has been reached\n\n\
             Return ONLY a JSON object:\n\
             {{\n\
               \"revised_positions\": {{\"agent_role\": \"revised position with justification\"}},\n\
               \"consensus_reached\": true,\n\
               \"consensus_explanation\": \"why consensus was or was not reached\",\n\
               \"common_ground\": [\"point\"],\n\
               \"remaining_differences\": [\"difference\"]\n\
             }}",
            disagreement.topic, disagreement.category, disagreement.severity, self.config.max_rounds
        )
    }

    /// Final consensus assessment.
    ///
    /// A forced exit closes the debate with confidence floored at 0.5 and a
    /// summary naming the safeguard; that takes precedence over incidental
    /// convergence. Without forcing, consensus holds when the model
    /// signalled it or the positions converged past the bar.
    fn assess(
        &self,
        exit: DebateExit,
        natural_signal: bool,
        convergence: f64,
        rounds: u32,
    ) -> (bool, f64, String, bool) {
        let forced = self.config.enable_forced_consensus && exit != DebateExit::Natural;
        let mut consensus = natural_signal || convergence > NATURAL_CONVERGENCE_BAR;
        let mut confidence = convergence;

        if forced {
            consensus = true;
            confidence = convergence.max(FORCED_CONFIDENCE_FLOOR);
        }

        let summary = if !consensus {
            format!("No consensus after {rounds} round(s). Requires adjudication.")
        } else if forced {
            let reason = match exit {
                DebateExit::Timeout => "timeout",
                DebateExit::Repetition => "repetitive arguments",
                DebateExit::MaxRounds => "max rounds reached",
                DebateExit::Natural => "safeguards",
            };
            format!(
                "Forced consensus after {rounds} round(s) due to {reason}. \
                 Confidence: {confidence:.2}. Proceeding with best available resolution."
            )
        } else if natural_signal {
            format!(
                "Natural consensus reached after {rounds} round(s). \
                 Agents converged on a unified approach."
            )
        } else {
            format!(
                "Natural consensus reached after {rounds} round(s). \
                 Positions converged without an explicit signal."
            )
        };

        (consensus, confidence, summary, forced)
    }
}

/// Average per-role sequence-matching ratio between two position sets,
/// used for repetition detection. 1.0 means identical arguments.
pub fn position_similarity(
    a: &BTreeMap<String, String>,
    b: &BTreeMap<String, String>,
) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let roles: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let mut similarities = Vec::new();
    for role in roles {
        let pos_a = a.get(role).map(String::as_str).unwrap_or("");
        let pos_b = b.get(role).map(String::as_str).unwrap_or("");
        if pos_a.is_empty() || pos_b.is_empty() {
            similarities.push(0.0);
            continue;
        }
        similarities.push(sequence_ratio(
            &pos_a.to_lowercase(),
            &pos_b.to_lowercase(),
        ));
    }

    if similarities.is_empty() {
        0.0
    } else {
        similarities.iter().sum::<f64>() / similarities.len() as f64
    }
}

/// Sequence-matching ratio: `2·LCS(a, b) / (|a| + |b|)` over characters.
fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() && b_chars.is_empty() {
        return 1.0;
    }
    if a_chars.is_empty() || b_chars.is_empty() {
        return 0.0;
    }

    // LCS length with a rolling row.
    let mut previous = vec![0usize; b_chars.len() + 1];
    let mut current = vec![0usize; b_chars.len() + 1];
    for &ca in &a_chars {
        for (j, &cb) in b_chars.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
        current.fill(0);
    }
    let lcs = previous[b_chars.len()];

    (2.0 * lcs as f64) / (a_chars.len() + b_chars.len()) as f64
}

/// Jaccard overlap of tokenised initial vs final position strings, in [0, 1].
pub fn convergence(initial: &BTreeMap<String, String>, fin: &BTreeMap<String, String>) -> f64 {
    if initial.is_empty() || fin.is_empty() {
        return 0.0;
    }

    let tokens = |positions: &BTreeMap<String, String>| -> BTreeSet<String> {
        positions
            .values()
            .flat_map(|v| {
                v.to_lowercase()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect()
    };

    let initial_tokens = tokens(initial);
    let final_tokens = tokens(fin);
    if initial_tokens.is_empty() {
        return 0.0;
    }

    let overlap = initial_tokens.intersection(&final_tokens).count();
    let total = initial_tokens.union(&final_tokens).count();
    if total == 0 {
        0.0
    } else {
        overlap as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::llm::provider::{InferenceProvider, ProviderRequest, ProviderResponse};
    use crate::llm::{ModelSelector, PromptGuard};
    use crate::types::{AgentRole, LlmError, Severity};
    use async_trait::async_trait;
    use std::time::Duration;

    fn disagreement() -> Disagreement {
        let mut positions = BTreeMap::new();
        positions.insert(
            "reviewer_nfr".to_string(),
            "Use synchronous calls for simplicity".to_string(),
        );
        positions.insert(
            "reviewer_integration".to_string(),
            "Use an asynchronous queue for resilience".to_string(),
        );
        Disagreement {
            id: Uuid::new_v4().to_string(),
            agent_roles: vec![AgentRole::ReviewerNfr, AgentRole::ReviewerIntegration],
            topic: "Technical Approach: Sync Vs Async".into(),
            positions,
            severity: Severity::Medium,
            category: "pattern_conflict_sync_vs_async".into(),
            detected_at: Utc::now(),
        }
    }

    struct ScriptedDebater {
        consensus_on_round: Option<u32>,
        sleep: Option<Duration>,
        identical_positions: bool,
        calls: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl InferenceProvider for ScriptedDebater {
        async fn generate(&self, req: &ProviderRequest) -> Result<ProviderResponse, LlmError> {
            if let Some(sleep) = self.sleep {
                tokio::time::sleep(sleep).await;
            }
            let round = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                + 1;
            let consensus = self.consensus_on_round.map_or(false, |n| round >= n);
            let positions = if self.identical_positions {
                serde_json::json!({
                    "reviewer_nfr": "I maintain my position exactly as stated before.",
                    "reviewer_integration": "I maintain my position exactly as stated before."
                })
            } else {
                serde_json::json!({
                    "reviewer_nfr": format!("Round {round}: lean towards a shared hybrid approach"),
                    "reviewer_integration": format!("Round {round}: accept queue with sync fallback")
                })
            };
            let _ = req;
            Ok(ProviderResponse {
                content: serde_json::json!({
                    "revised_positions": positions,
                    "consensus_reached": consensus,
                    "consensus_explanation": "test",
                    "common_ground": [],
                    "remaining_differences": []
                })
                .to_string(),
                model: "scripted".into(),
            })
        }

        fn provider_name(&self) -> &str {
            "scripted-debater"
        }
    }

    fn engine_with(provider: Arc<dyn InferenceProvider>, config: DebateConfig) -> Arc<DebateEngine> {
        let gateway = Arc::new(
            LlmGateway::new(
                provider,
                PromptGuard::new(false),
                ModelSelector::new(SelectorConfig::default()),
            )
            .with_retry(1, Duration::from_millis(1)),
        );
        Arc::new(DebateEngine::new(gateway, config))
    }

    #[tokio::test]
    async fn natural_consensus_closes_the_debate() {
        let provider = Arc::new(ScriptedDebater {
            consensus_on_round: Some(1),
            sleep: None,
            identical_positions: false,
            calls: Default::default(),
        });
        let engine = engine_with(provider, DebateConfig::default());
        let (outcome, safeguards) = engine.facilitate(disagreement(), "context").await;
        assert!(outcome.consensus_reached);
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.resolution_summary.contains("Natural consensus"));
        assert!(safeguards.is_empty());
    }

    #[tokio::test]
    async fn timeout_forces_consensus_with_floored_confidence() {
        let provider = Arc::new(ScriptedDebater {
            consensus_on_round: None,
            sleep: Some(Duration::from_secs(20)),
            identical_positions: false,
            calls: Default::default(),
        });
        let config = DebateConfig {
            round_timeout_secs: 1,
            ..DebateConfig::default()
        };
        let engine = engine_with(provider, config);
        let (outcome, safeguards) = engine.facilitate(disagreement(), "context").await;
        assert!(outcome.consensus_reached);
        assert!(outcome.confidence >= 0.5);
        assert!(outcome.resolution_summary.contains("timeout"));
        assert!(outcome.rounds <= 3);
        assert!(safeguards.iter().any(|s| s.starts_with("debate_round_timeout")));
    }

    #[tokio::test]
    async fn repetition_forces_consensus_before_max_rounds() {
        let provider = Arc::new(ScriptedDebater {
            consensus_on_round: None,
            sleep: None,
            identical_positions: true,
            calls: Default::default(),
        });
        let engine = engine_with(provider, DebateConfig::default());
        let (outcome, safeguards) = engine.facilitate(disagreement(), "context").await;
        assert!(outcome.consensus_reached);
        assert!(outcome.rounds < DebateConfig::default().max_rounds);
        assert!(outcome.resolution_summary.contains("repetitive arguments"));
        assert!(safeguards.iter().any(|s| s.starts_with("debate_repetition")));
    }

    #[tokio::test]
    async fn max_rounds_without_consensus_forces_exit() {
        let provider = Arc::new(ScriptedDebater {
            consensus_on_round: None,
            sleep: None,
            identical_positions: false,
            calls: Default::default(),
        });
        let config = DebateConfig {
            enable_repetition_detection: false,
            ..DebateConfig::default()
        };
        let engine = engine_with(provider, config.clone());
        let (outcome, safeguards) = engine.facilitate(disagreement(), "context").await;
        assert!(outcome.consensus_reached);
        assert_eq!(outcome.rounds, config.max_rounds);
        assert!(outcome.resolution_summary.contains("max rounds"));
        assert!(safeguards.iter().any(|s| s.starts_with("debate_max_rounds")));
    }

    #[tokio::test]
    async fn disabled_forced_consensus_leaves_debate_unresolved() {
        let provider = Arc::new(ScriptedDebater {
            consensus_on_round: None,
            sleep: None,
            identical_positions: false,
            calls: Default::default(),
        });
        let config = DebateConfig {
            enable_forced_consensus: false,
            enable_repetition_detection: false,
            max_rounds: 2,
            ..DebateConfig::default()
        };
        let engine = engine_with(provider, config);
        let (outcome, _) = engine.facilitate(disagreement(), "context").await;
        // Positions were rewritten each round, so convergence stays low and
        // the debate ends unresolved.
        assert!(!outcome.consensus_reached);
        assert!(outcome.resolution_summary.contains("Requires adjudication"));
    }

    #[tokio::test]
    async fn run_all_preserves_input_order() {
        let provider = Arc::new(ScriptedDebater {
            consensus_on_round: Some(1),
            sleep: None,
            identical_positions: false,
            calls: Default::default(),
        });
        let engine = engine_with(provider, DebateConfig::default());
        let first = disagreement();
        let second = disagreement();
        let expected: Vec<String> = vec![first.id.clone(), second.id.clone()];
        let result = engine.run_all(&[first, second], "context").await;
        assert_eq!(result.outcomes.len(), 2);
        let got: Vec<String> = result
            .outcomes
            .iter()
            .map(|o| o.disagreement.id.clone())
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn identical_positions_have_similarity_one() {
        let mut a = BTreeMap::new();
        a.insert("r".to_string(), "Exactly the same text".to_string());
        assert!((position_similarity(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_positions_have_low_similarity() {
        let mut a = BTreeMap::new();
        a.insert("r".to_string(), "alpha beta gamma".to_string());
        let mut b = BTreeMap::new();
        b.insert("r".to_string(), "zzz qqq xxx".to_string());
        assert!(position_similarity(&a, &b) < 0.5);
    }

    #[test]
    fn convergence_is_token_jaccard() {
        let mut initial = BTreeMap::new();
        initial.insert("r".to_string(), "use async queue".to_string());
        let mut fin = BTreeMap::new();
        fin.insert("r".to_string(), "use async queue".to_string());
        assert!((convergence(&initial, &fin) - 1.0).abs() < 1e-9);

        let mut fin2 = BTreeMap::new();
        fin2.insert("r".to_string(), "completely different words".to_string());
        assert!(convergence(&initial, &fin2).abs() < 1e-9);
    }
}
