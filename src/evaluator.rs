//! Latency evaluation of a single model.
//!
//! An [`Evaluator`] turns `sample_size` provider calls into one averaged
//! latency. The sampling strategy follows from the pool and sample sizes:
//!
//! - **Unique** when the pool holds exactly `sample_size` prompts. Each prompt
//!   is sent once, in pool order, which keeps vendor-side prompt caching out
//!   of the measurement. This is the default.
//! - **Random** otherwise. Each of the `sample_size` calls draws a prompt
//!   uniformly, with replacement. Repeated prompts may hit a provider cache.
//!
//! Calls always run one after another, and the first failing call aborts the
//! whole run.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::EvalError;
use crate::prompt::Prompt;
use crate::provider::{Model, ProviderClient, Sample};
use crate::stats::{self, LatencyStats};

/// How prompts are picked for each call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    Unique,
    Random,
}

/// Aggregated result of one evaluator run
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub model_name: String,
    pub provider_name: String,
    /// Completion texts in call order
    pub responses: Vec<String>,
    /// Mean of `samples`
    pub latency: Duration,
    /// Per-call latencies in call order
    pub samples: Vec<Duration>,
}

impl Evaluation {
    pub fn stats(&self) -> Option<LatencyStats> {
        LatencyStats::from_samples(&self.samples)
    }
}

/// Measures one model against a prompt pool
#[derive(Clone, Default)]
pub struct Evaluator {
    provider: Option<Arc<dyn ProviderClient>>,
    model: Option<Model>,
    prompts: Option<Arc<[Prompt]>>,
    sample_size: usize,
    seed: Option<u64>,
}

impl Evaluator {
    /// Evaluator with one sample per prompt
    pub fn new(provider: Arc<dyn ProviderClient>, model: Model, prompts: Arc<[Prompt]>) -> Self {
        Self {
            sample_size: prompts.len(),
            provider: Some(provider),
            model: Some(model),
            prompts: Some(prompts),
            seed: None,
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_prompts(mut self, prompts: Arc<[Prompt]>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Override the number of calls; a size different from the pool size
    /// switches to random sampling
    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    /// Seed the random prompt picker
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn sampling_mode(&self) -> SamplingMode {
        let pool = self.prompts.as_ref().map_or(0, |p| p.len());
        if pool == self.sample_size {
            SamplingMode::Unique
        } else {
            SamplingMode::Random
        }
    }

    fn validate(&self) -> Result<(&Arc<dyn ProviderClient>, &Model, &[Prompt]), EvalError> {
        let provider = self.provider.as_ref().ok_or(EvalError::NoProvider)?;
        let model = self.model.as_ref().ok_or(EvalError::NoModel)?;

        if self.sample_size == 0 {
            return Err(EvalError::SampleSize);
        }

        let prompts = match self.prompts.as_deref() {
            Some(prompts) if !prompts.is_empty() => prompts,
            _ => return Err(EvalError::NoPrompt),
        };

        Ok((provider, model, prompts))
    }

    /// Prompt index for each call, in call order
    fn plan(&self, pool: usize) -> Vec<usize> {
        match self.sampling_mode() {
            SamplingMode::Unique => (0..pool).collect(),
            SamplingMode::Random => {
                let mut rng = match self.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                (0..self.sample_size)
                    .map(|_| rng.gen_range(0..pool))
                    .collect()
            }
        }
    }

    /// Run the sampling plan and aggregate the results.
    ///
    /// Preconditions are checked before any provider call. The first
    /// provider error aborts the run and is returned as-is.
    pub async fn evaluate(&self) -> Result<Evaluation, EvalError> {
        let (provider, model, prompts) = self.validate().map_err(|e| {
            tracing::debug!(error = %e, "Failed to run evaluator");
            e
        })?;

        let plan = self.plan(prompts.len());
        tracing::debug!(
            model = %model.id,
            mode = ?self.sampling_mode(),
            calls = plan.len(),
            "Running evaluation"
        );

        let mut results: Vec<Sample> = Vec::with_capacity(plan.len());
        for (call, index) in plan.into_iter().enumerate() {
            let sample = provider.measure(model, &prompts[index]).await.map_err(|e| {
                tracing::debug!(model = %model.id, call, error = %e, "Sample failed");
                EvalError::Transport(e)
            })?;
            results.push(sample);
        }

        let samples: Vec<Duration> = results.iter().map(|s| s.latency).collect();
        let responses = results.into_iter().map(|s| s.response.completion).collect();

        Ok(Evaluation {
            model_name: model.name.clone(),
            provider_name: model.provider.to_string(),
            responses,
            latency: stats::mean(&samples),
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::prompt::PromptKind;
    use crate::provider::{ModelFamily, ModelVendor, ProviderKind, Response};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::Mutex;

    /// Provider that records every prompt it is sent and replays scripted latencies
    struct ScriptedProvider {
        latencies: Vec<Duration>,
        fail_on_call: Option<usize>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(latencies: Vec<Duration>) -> Self {
            Self {
                latencies,
                fail_on_call: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, call: usize) -> Self {
            self.fail_on_call = Some(call);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProviderClient for ScriptedProvider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }

        fn list_models(&self, _filter: &str) -> Vec<Model> {
            vec![test_model()]
        }

        async fn send(&self, message: &str, _model: &Model) -> Result<Response, ProviderError> {
            Ok(Response {
                completion: format!("re: {}", message),
            })
        }

        async fn measure(&self, model: &Model, prompt: &Prompt) -> Result<Sample, ProviderError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(prompt.content.clone());
                calls.len() - 1
            };

            if self.fail_on_call == Some(call) {
                return Err(ProviderError::Http {
                    status: 500,
                    message: "boom".to_string(),
                });
            }

            let response = self.send(&prompt.content, model).await?;
            let latency = self
                .latencies
                .get(call)
                .copied()
                .unwrap_or(Duration::from_millis(10));
            Ok(Sample { latency, response })
        }

        async fn verify_access(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn test_model() -> Model {
        Model::new(
            "test-model",
            "Test Model",
            ProviderKind::OpenAi,
            ModelVendor::OpenAi,
            ModelFamily::Gpt,
        )
    }

    fn pool(n: usize) -> Arc<[Prompt]> {
        (0..n)
            .map(|i| Prompt::new(PromptKind::Default, &format!("p{}", i), &format!("prompt {}", i)))
            .collect::<Vec<_>>()
            .into()
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[tokio::test]
    async fn test_unique_sampling_scenario() {
        let provider = Arc::new(ScriptedProvider::new(vec![ms(100), ms(150), ms(200)]));
        let evaluator = Evaluator::new(provider.clone(), test_model(), pool(3));
        assert_eq!(evaluator.sampling_mode(), SamplingMode::Unique);

        let evaluation = evaluator.evaluate().await.unwrap();

        assert_eq!(evaluation.latency, ms(150));
        assert_eq!(evaluation.responses.len(), 3);
        assert_eq!(
            provider.calls(),
            vec!["prompt 0", "prompt 1", "prompt 2"]
        );
        assert_eq!(
            evaluation.responses,
            vec!["re: prompt 0", "re: prompt 1", "re: prompt 2"]
        );
        assert_eq!(evaluation.samples, vec![ms(100), ms(150), ms(200)]);
        assert_eq!(evaluation.model_name, "Test Model");
        assert_eq!(evaluation.provider_name, "Open AI");
    }

    #[tokio::test]
    async fn test_random_sampling_scenario() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let evaluator = Evaluator::new(provider.clone(), test_model(), pool(2)).with_sample_size(5);
        assert_eq!(evaluator.sampling_mode(), SamplingMode::Random);

        let evaluation = evaluator.evaluate().await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls.len(), 5);
        assert!(calls.iter().all(|c| c == "prompt 0" || c == "prompt 1"));
        assert_eq!(evaluation.responses.len(), 5);
    }

    #[tokio::test]
    async fn test_seeded_random_sampling_is_reproducible() {
        let first = Arc::new(ScriptedProvider::new(vec![]));
        let second = Arc::new(ScriptedProvider::new(vec![]));

        Evaluator::new(first.clone(), test_model(), pool(4))
            .with_sample_size(8)
            .with_seed(7)
            .evaluate()
            .await
            .unwrap();
        Evaluator::new(second.clone(), test_model(), pool(4))
            .with_sample_size(8)
            .with_seed(7)
            .evaluate()
            .await
            .unwrap();

        assert_eq!(first.calls(), second.calls());
    }

    #[tokio::test]
    async fn test_zero_sample_size() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let err = Evaluator::new(provider.clone(), test_model(), pool(3))
            .with_sample_size(0)
            .evaluate()
            .await
            .unwrap_err();

        assert_eq!(err, EvalError::SampleSize);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_prompt_pool() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let err = Evaluator::new(provider.clone(), test_model(), pool(0))
            .with_sample_size(3)
            .evaluate()
            .await
            .unwrap_err();

        assert_eq!(err, EvalError::NoPrompt);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_provider_and_model() {
        let err = Evaluator::default()
            .with_model(test_model())
            .with_prompts(pool(1))
            .with_sample_size(1)
            .evaluate()
            .await
            .unwrap_err();
        assert_eq!(err, EvalError::NoProvider);

        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let err = Evaluator::default()
            .with_provider(provider.clone())
            .with_prompts(pool(1))
            .with_sample_size(1)
            .evaluate()
            .await
            .unwrap_err();
        assert_eq!(err, EvalError::NoModel);
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_prompts() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let err = Evaluator::default()
            .with_provider(provider)
            .with_model(test_model())
            .with_sample_size(2)
            .evaluate()
            .await
            .unwrap_err();
        assert_eq!(err, EvalError::NoPrompt);
    }

    #[tokio::test]
    async fn test_fail_fast_on_first_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![]).failing_on(1));
        let err = Evaluator::new(provider.clone(), test_model(), pool(4))
            .evaluate()
            .await
            .unwrap_err();

        assert_eq!(
            err,
            EvalError::Transport(ProviderError::Http {
                status: 500,
                message: "boom".to_string(),
            })
        );
        // Call 0 succeeded, call 1 failed, calls 2 and 3 never happened
        assert_eq!(provider.calls(), vec!["prompt 0", "prompt 1"]);
    }

    #[tokio::test]
    async fn test_stats_from_evaluation() {
        let provider = Arc::new(ScriptedProvider::new(vec![ms(100), ms(300)]));
        let evaluation = Evaluator::new(provider, test_model(), pool(2))
            .evaluate()
            .await
            .unwrap();

        let stats = evaluation.stats().unwrap();
        assert_eq!(stats.min, ms(100));
        assert_eq!(stats.max, ms(300));
        assert_eq!(stats.mean, evaluation.latency);
        assert_eq!(stats.jitter, ms(200));
    }

    proptest! {
        #[test]
        fn prop_call_count_matches_sample_size(pool_size in 1usize..6, sample_size in 1usize..12) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let provider = Arc::new(ScriptedProvider::new(vec![]));
            let prompts = pool(pool_size);
            let evaluation = rt
                .block_on(
                    Evaluator::new(provider.clone(), test_model(), prompts.clone())
                        .with_sample_size(sample_size)
                        .evaluate(),
                )
                .unwrap();

            let calls = provider.calls();
            prop_assert_eq!(calls.len(), sample_size);
            prop_assert_eq!(evaluation.responses.len(), sample_size);
            prop_assert!(calls
                .iter()
                .all(|c| prompts.iter().any(|p| &p.content == c)));

            if pool_size == sample_size {
                let expected: Vec<String> = prompts.iter().map(|p| p.content.clone()).collect();
                prop_assert_eq!(calls, expected);
            }
        }

        #[test]
        fn prop_latency_is_arithmetic_mean(latencies in proptest::collection::vec(1u64..10_000, 1..10)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let scripted: Vec<Duration> = latencies.iter().copied().map(Duration::from_millis).collect();
            let provider = Arc::new(ScriptedProvider::new(scripted.clone()));
            let evaluation = rt
                .block_on(Evaluator::new(provider, test_model(), pool(latencies.len())).evaluate())
                .unwrap();

            let total: u64 = latencies.iter().sum();
            let expected = Duration::from_nanos(total * 1_000_000 / latencies.len() as u64);
            prop_assert_eq!(evaluation.latency, expected);
        }
    }
}
