//! Prometheus metrics

use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record one finished describe-image request
pub fn record_request(outcome: &'static str, elapsed: Duration) {
    metrics::counter!("describe_image_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("describe_image_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_cleanup_failure() {
    metrics::counter!("describe_image_cleanup_failures_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_classifier::{
        ClassifierError, ImageClassifier, LoadPolicy, ModelHandle, Prediction, SharedClassifier,
    };
    use pixel_tensor::RgbTensor;
    use std::sync::Arc;

    struct Nothing;

    impl ImageClassifier for Nothing {
        fn classify(&self, _image: &RgbTensor) -> Result<Vec<Prediction>, ClassifierError> {
            Ok(Vec::new())
        }
    }

    fn load_twice(policy: LoadPolicy) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let model = ModelHandle::new(policy, || Ok(Arc::new(Nothing) as SharedClassifier));
                model.get().await.unwrap();
                model.get().await.unwrap();
            });
        });
        handle.render()
    }

    #[test]
    fn test_model_loads_counted_at_load_time() {
        let rendered = load_twice(LoadPolicy::Shared);
        assert!(rendered.contains("# TYPE model_loads_total counter"), "{}", rendered);
        assert!(rendered.contains(r#"model_loads_total{policy="shared"} 1"#), "{}", rendered);
    }

    #[test]
    fn test_per_request_loads_counted() {
        let rendered = load_twice(LoadPolicy::PerRequest);
        assert!(rendered.contains(r#"model_loads_total{policy="per_request"} 2"#), "{}", rendered);
    }
}
