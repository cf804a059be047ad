//! Intent classification.
//!
//! A multinomial naive Bayes model trained on a small fixed phrase set gives
//! a label and a normalized posterior. Low-confidence results are offered to
//! a [`RemoteClassifier`] under a timeout; any remote failure keeps the local
//! answer.

use crate::extractor::extract;
use crate::remote::RemoteClassifier;
use aura_core::{Action, ClassifierError, CommandIntent};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Bumped whenever [`TRAINING_SET`] changes.
pub const TRAINING_SET_VERSION: u32 = 1;

/// Phrase to action label.
pub const TRAINING_SET: &[(&str, &str)] = &[
    ("deploy organism", "deploy_organism"),
    ("upload organism file", "deploy_organism"),
    ("run organism", "deploy_organism"),
    ("execute organism", "deploy_organism"),
    ("spawn agent", "spawn_agent"),
    ("create agent", "spawn_agent"),
    ("add agent", "spawn_agent"),
    ("list agents", "list_agents"),
    ("show agents", "list_agents"),
    ("get agents", "list_agents"),
    ("optimize quantum circuit", "optimize_circuit"),
    ("reduce decoherence", "optimize_circuit"),
    ("improve coherence", "optimize_circuit"),
    ("run quantum job", "run_quantum_job"),
    ("execute quantum circuit", "run_quantum_job"),
    ("generate code", "generate_code"),
    ("create component", "generate_code"),
    ("write function", "generate_code"),
    ("check status", "get_status"),
    ("show metrics", "get_status"),
    ("system status", "get_status"),
    ("commit mutation", "commit_mutation"),
    ("save changes", "commit_mutation"),
    ("deploy changes", "commit_mutation"),
];

/// Local results at or above this confidence skip the remote call.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Label returned when no token of the command was ever seen in training.
pub const UNKNOWN_LABEL: &str = "unknown";

const SMOOTHING: f64 = 0.1;

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

// ============================================================================
// NAIVE BAYES MODEL
// ============================================================================

#[derive(Debug, Clone)]
struct LabelStats {
    label: String,
    documents: usize,
    tokens: usize,
    counts: HashMap<String, usize>,
}

/// Multinomial naive Bayes with Lidstone smoothing.
#[derive(Debug, Clone)]
pub struct NaiveBayes {
    labels: Vec<LabelStats>,
    vocabulary: HashSet<String>,
    documents: usize,
}

impl NaiveBayes {
    /// Train on `(phrase, label)` pairs. Labels keep first-seen order.
    pub fn train(examples: &[(&str, &str)]) -> Self {
        let mut labels: Vec<LabelStats> = Vec::new();
        let mut vocabulary = HashSet::new();
        for (phrase, label) in examples {
            let index = match labels.iter().position(|s| s.label == *label) {
                Some(i) => i,
                None => {
                    labels.push(LabelStats {
                        label: label.to_string(),
                        documents: 0,
                        tokens: 0,
                        counts: HashMap::new(),
                    });
                    labels.len() - 1
                }
            };
            let stats = &mut labels[index];
            stats.documents += 1;
            for token in tokenize(phrase) {
                stats.tokens += 1;
                *stats.counts.entry(token.clone()).or_insert(0) += 1;
                vocabulary.insert(token);
            }
        }
        Self {
            labels,
            vocabulary,
            documents: examples.len(),
        }
    }

    /// Posterior per label, summing to 1. `None` when no token of `text` is
    /// in the vocabulary.
    pub fn posteriors(&self, text: &str) -> Option<BTreeMap<String, f64>> {
        let tokens: Vec<String> = tokenize(text)
            .filter(|t| self.vocabulary.contains(t))
            .collect();
        if tokens.is_empty() || self.labels.is_empty() {
            return None;
        }

        let vocab = self.vocabulary.len() as f64;
        let log_scores: Vec<f64> = self
            .labels
            .iter()
            .map(|stats| {
                let prior = (stats.documents as f64 / self.documents as f64).ln();
                let denom = stats.tokens as f64 + SMOOTHING * vocab;
                tokens.iter().fold(prior, |acc, token| {
                    let count = stats.counts.get(token).copied().unwrap_or(0) as f64;
                    acc + ((count + SMOOTHING) / denom).ln()
                })
            })
            .collect();

        // Log-sum-exp normalization.
        let max = log_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let total: f64 = log_scores.iter().map(|s| (s - max).exp()).sum();
        Some(
            self.labels
                .iter()
                .zip(log_scores)
                .map(|(stats, score)| (stats.label.clone(), (score - max).exp() / total))
                .collect(),
        )
    }

    /// Best label and its posterior. Earlier-trained labels win exact ties.
    pub fn predict(&self, text: &str) -> Option<(String, f64)> {
        let posteriors = self.posteriors(text)?;
        let mut best: Option<(String, f64)> = None;
        for stats in &self.labels {
            let p = posteriors.get(&stats.label).copied().unwrap_or(0.0);
            if best.as_ref().map_or(true, |(_, b)| p > *b) {
                best = Some((stats.label.clone(), p));
            }
        }
        best
    }
}

impl Default for NaiveBayes {
    fn default() -> Self {
        Self::train(TRAINING_SET)
    }
}

// ============================================================================
// INTENT CLASSIFIER
// ============================================================================

/// Turns raw command text into a [`CommandIntent`].
#[derive(Clone)]
pub struct IntentClassifier {
    model: NaiveBayes,
    remote: Option<Arc<dyn RemoteClassifier>>,
    threshold: f64,
    remote_timeout: Duration,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier {
    /// Local-only classifier on the built-in training set.
    pub fn new() -> Self {
        Self {
            model: NaiveBayes::default(),
            remote: None,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteClassifier>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify with the local model only.
    pub fn classify_local(&self, text: &str) -> Result<CommandIntent, ClassifierError> {
        let command = text.trim();
        if command.is_empty() {
            return Err(ClassifierError::EmptyCommand);
        }
        let (action, confidence) = match self.model.predict(command) {
            Some((label, confidence)) => (Action::from_label(&label), confidence),
            None => (Action::Other(UNKNOWN_LABEL.to_string()), 0.0),
        };
        Ok(CommandIntent::new(action, extract(command), confidence, command))
    }

    /// Classify, consulting the remote classifier when local confidence is
    /// below the threshold.
    ///
    /// Fails only for empty input.
    pub async fn classify(&self, text: &str) -> Result<CommandIntent, ClassifierError> {
        let local = self.classify_local(text)?;
        if local.confidence >= self.threshold {
            return Ok(local);
        }
        let Some(remote) = self.remote.as_ref() else {
            return Ok(local);
        };

        tracing::debug!(
            confidence = local.confidence,
            threshold = self.threshold,
            "Local intent confidence low, trying remote classifier"
        );
        let outcome = tokio::time::timeout(self.remote_timeout, remote.classify(&local.raw_command))
            .await
            .unwrap_or_else(|_| {
                Err(ClassifierError::Timeout {
                    timeout_ms: self.remote_timeout.as_millis() as u64,
                })
            });

        match outcome {
            Ok(answer) => {
                let mut entities = local.entities;
                entities.merge(answer.entities);
                Ok(CommandIntent::new(
                    Action::from_label(&answer.action),
                    entities,
                    answer.confidence,
                    local.raw_command,
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote classifier failed, keeping local intent");
                Ok(local)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteIntent;
    use async_trait::async_trait;
    use aura_core::Entities;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeRemote {
        answer: Mutex<Option<Result<RemoteIntent, ClassifierError>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeRemote {
        fn new(answer: Result<RemoteIntent, ClassifierError>) -> Self {
            Self {
                answer: Mutex::new(Some(answer)),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn answering(action: &str, confidence: f64) -> Self {
            Self::new(Ok(RemoteIntent {
                action: action.to_string(),
                confidence,
                entities: Entities::new(),
            }))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteClassifier for FakeRemote {
        async fn classify(&self, _command: &str) -> Result<RemoteIntent, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(ClassifierError::MalformedResponse {
                    reason: "no scripted answer".to_string(),
                }))
        }
    }

    #[test]
    fn test_training_phrases_classify_to_their_labels() {
        let classifier = IntentClassifier::new();
        for (phrase, label) in TRAINING_SET {
            let intent = classifier.classify_local(phrase).unwrap();
            assert_eq!(intent.action.as_label(), *label, "phrase: {}", phrase);
        }
    }

    #[test]
    fn test_common_commands_clear_threshold() {
        let classifier = IntentClassifier::new();
        for (command, action) in [
            ("list agents", Action::ListAgents),
            ("deploy organism MyOrganism.dna", Action::DeployOrganism),
            ("spawn quantum optimizer agent", Action::SpawnAgent),
            ("run quantum job on ibm_fez with 2048 shots", Action::RunQuantumJob),
            ("check system status", Action::GetStatus),
        ] {
            let intent = classifier.classify_local(command).unwrap();
            assert_eq!(intent.action, action, "command: {}", command);
            assert!(intent.confidence >= DEFAULT_CONFIDENCE_THRESHOLD, "command: {}", command);
        }
    }

    #[test]
    fn test_entities_ride_along() {
        let intent = IntentClassifier::new()
            .classify_local("deploy organism MyOrganism.dna")
            .unwrap();
        assert_eq!(intent.entities.text("file"), Some("MyOrganism.dna"));
        assert_eq!(intent.raw_command, "deploy organism MyOrganism.dna");
    }

    #[test]
    fn test_unrecognized_phrase_still_returns_intent() {
        let intent = IntentClassifier::new()
            .classify_local("xyzzy plugh frobnicate")
            .unwrap();
        assert_eq!(intent.action, Action::Other(UNKNOWN_LABEL.to_string()));
        assert_eq!(intent.confidence, 0.0);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        assert_eq!(
            IntentClassifier::new().classify_local("   "),
            Err(ClassifierError::EmptyCommand)
        );
    }

    #[test]
    fn test_posteriors_sum_to_one() {
        let model = NaiveBayes::default();
        let posteriors = model.posteriors("show quantum status").unwrap();
        let total: f64 = posteriors.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_confident_local_result_skips_remote() {
        let remote = Arc::new(FakeRemote::answering("get_status", 0.99));
        let classifier = IntentClassifier::new().with_remote(remote.clone());
        let intent = classifier.classify("list agents").await.unwrap();
        assert_eq!(intent.action, Action::ListAgents);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_supersedes_low_confidence_local() {
        let mut entities = Entities::new();
        entities.set("backend", "ibm_osaka");
        let remote = Arc::new(FakeRemote::new(Ok(RemoteIntent {
            action: "run_quantum_job".to_string(),
            confidence: 0.91,
            entities,
        })));
        let classifier = IntentClassifier::new().with_remote(remote.clone());
        let intent = classifier.classify("blorp 512 shots").await.unwrap();
        assert_eq!(intent.action, Action::RunQuantumJob);
        assert_eq!(intent.confidence, 0.91);
        assert_eq!(intent.entities.text("backend"), Some("ibm_osaka"));
        assert_eq!(intent.entities.number("shot"), Some(512));
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_local() {
        let remote = Arc::new(FakeRemote::new(Err(ClassifierError::RequestFailed {
            status: 502,
            message: "bad gateway".to_string(),
        })));
        let classifier = IntentClassifier::new().with_remote(remote);
        let intent = classifier.classify("xyzzy").await.unwrap();
        assert_eq!(intent.action, Action::Other(UNKNOWN_LABEL.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_remote_times_out_to_local() {
        let mut remote = FakeRemote::answering("get_status", 0.99);
        remote.delay = Duration::from_secs(60);
        let remote = Arc::new(remote);
        let classifier = IntentClassifier::new()
            .with_remote(remote)
            .with_remote_timeout(Duration::from_secs(5));
        let intent = classifier.classify("xyzzy").await.unwrap();
        assert_eq!(intent.confidence, 0.0);
    }
}
