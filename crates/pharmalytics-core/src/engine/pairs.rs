//! Pair enumeration and bounded parallel pair inference.

use pharmalytics_llm::{
    parse_interaction_response, DrugRef, Inference, InferenceRequest, InteractionAnalysis,
    PatientContext,
};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::models::Medication;

/// Index pair of two submitted medications, `first < second`.
pub type PairIndex = (usize, usize);

/// Every unordered pair of `n` positions in canonical order:
/// (0,1), (0,2), ..., (1,2), ...
pub fn unordered_pairs(n: usize) -> Vec<PairIndex> {
    (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect()
}

/// Display label for a pair, e.g. "Warfarin + Aspirin".
pub fn pair_label(medications: &[Medication], (i, j): PairIndex) -> String {
    format!("{} + {}", medications[i].name.trim(), medications[j].name.trim())
}

/// Run interaction inference for every pair on a pool of at most
/// `max_workers` threads.
///
/// The result is indexed like `pairs`. Failed or empty calls are `None`.
pub fn analyze_pairs(
    inference: &Inference,
    medications: &[Medication],
    pairs: &[PairIndex],
    patient_age: Option<u32>,
    patient: Option<&PatientContext>,
    max_workers: usize,
) -> Vec<Option<InteractionAnalysis>> {
    if pairs.is_empty() {
        return Vec::new();
    }

    let analyze = |pair: &PairIndex| -> Option<InteractionAnalysis> {
        let (i, j) = *pair;
        let request = InferenceRequest::Interaction {
            drug1: DrugRef::new(&medications[i].name, &medications[i].dosage),
            drug2: DrugRef::new(&medications[j].name, &medications[j].dosage),
            patient_age,
            patient,
        };
        let analysis = inference
            .infer(&request)
            .map(|text| parse_interaction_response(&text))
            .filter(|analysis| !analysis.is_empty());
        tracing::debug!(
            pair = %pair_label(medications, *pair),
            augmented = analysis.is_some(),
            "Pair inference finished"
        );
        analysis
    };

    let workers = max_workers.clamp(1, pairs.len());
    match ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| pairs.par_iter().map(&analyze).collect()),
        Err(e) => {
            tracing::warn!(error = %e, "Inference pool unavailable, analyzing pairs sequentially");
            pairs.iter().map(&analyze).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmalytics_llm::{
        InferenceClient, InferenceError, InferenceResult, MockInferenceClient, RetryPolicy,
        TaskKind,
    };
    use std::sync::Arc;

    fn meds(names: &[&str]) -> Vec<Medication> {
        names.iter().map(|n| Medication::new(*n, "10mg")).collect()
    }

    /// Answers with monitoring text naming the pair it was asked about.
    struct EchoPairClient;

    impl InferenceClient for EchoPairClient {
        fn generate(&self, _task: TaskKind, prompt: &str) -> InferenceResult<String> {
            let drug = |label: &str| {
                prompt
                    .lines()
                    .find_map(|l| l.strip_prefix(label))
                    .map(|rest| rest.trim_end_matches(" (10mg)").to_string())
                    .unwrap_or_default()
            };
            Ok(format!("Monitoring: {}-{}", drug("Drug 1: "), drug("Drug 2: ")))
        }

        fn model_for(&self, _task: TaskKind) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_three_medications_three_pairs() {
        assert_eq!(unordered_pairs(3), vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn test_pair_counts() {
        assert!(unordered_pairs(0).is_empty());
        assert!(unordered_pairs(1).is_empty());
        for n in 2..10 {
            assert_eq!(unordered_pairs(n).len(), n * (n - 1) / 2);
        }
    }

    #[test]
    fn test_pair_label() {
        let medications = meds(&[" Warfarin", "Aspirin "]);
        assert_eq!(pair_label(&medications, (0, 1)), "Warfarin + Aspirin");
    }

    #[test]
    fn test_results_in_pair_order() {
        let client = Arc::new(MockInferenceClient::new("Severity: moderate\nMonitoring: INR"));
        let inference = Inference::new(client.clone(), RetryPolicy::none());
        let medications = meds(&["a", "b", "c", "d", "e"]);
        let pairs = unordered_pairs(medications.len());

        let results = analyze_pairs(&inference, &medications, &pairs, None, None, 3);
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(|r| r.as_ref().and_then(|a| a.monitoring.as_deref()) == Some("INR")));
        assert_eq!(client.call_count(), 10);
    }

    #[test]
    fn test_each_result_belongs_to_its_pair() {
        let inference = Inference::new(Arc::new(EchoPairClient), RetryPolicy::none());
        let medications = meds(&["a", "b", "c", "d", "e", "f"]);
        let pairs = unordered_pairs(medications.len());

        for workers in [1, 2, 4, 16] {
            let results = analyze_pairs(&inference, &medications, &pairs, None, None, workers);
            let got: Vec<String> = results
                .into_iter()
                .map(|r| r.and_then(|a| a.monitoring).unwrap_or_default())
                .collect();
            let expected: Vec<String> = pairs
                .iter()
                .map(|&(i, j)| format!("{}-{}", medications[i].name, medications[j].name))
                .collect();
            assert_eq!(got, expected, "workers {}", workers);
        }
    }

    #[test]
    fn test_failures_are_none() {
        let client = Arc::new(MockInferenceClient::failing(InferenceError::Timeout(30)));
        let inference = Inference::new(client, RetryPolicy::none());
        let medications = meds(&["a", "b", "c"]);
        let pairs = unordered_pairs(3);

        let results = analyze_pairs(&inference, &medications, &pairs, Some(40), None, 8);
        assert_eq!(results, vec![None, None, None]);
    }

    #[test]
    fn test_unmarked_text_is_none() {
        let client = Arc::new(MockInferenceClient::new("No notable interaction."));
        let inference = Inference::new(client, RetryPolicy::none());
        let medications = meds(&["a", "b"]);

        let results = analyze_pairs(&inference, &medications, &[(0, 1)], None, None, 1);
        assert_eq!(results, vec![None]);
    }

    #[test]
    fn test_no_pairs() {
        let inference = Inference::new(Arc::new(EchoPairClient), RetryPolicy::none());
        assert!(analyze_pairs(&inference, &meds(&["a"]), &[], None, None, 4).is_empty());
    }
}
