use local_llm_bench::config::OutputFormat;
use local_llm_bench::{
    BenchmarkRecord, BenchmarkRunner, Config, FailureKind, PromptClass, RunConfig, SelectionError,
};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.endpoint.base_url = server.uri();
    config.output.quiet = true;
    config
}

fn runner_for(server: &MockServer) -> BenchmarkRunner {
    BenchmarkRunner::new(config_for(server)).unwrap()
}

async fn mount_tags(server: &MockServer, models: &[&str]) {
    let models: Vec<Value> = models.iter().map(|m| json!({ "name": m })).collect();
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": models })))
        .mount(server)
        .await;
}

fn generation(eval_count: u64, eval_duration: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "model": "qwen2.5-coder:7b",
        "response": "def is_prime(n): ...",
        "done": true,
        "eval_count": eval_count,
        "eval_duration": eval_duration,
        "prompt_eval_duration": 250_000_000u64,
    }))
}

async fn mount_generate(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(template)
        .mount(server)
        .await;
}

/// (model, prompt) pairs of generation requests in the order the server saw them.
async fn generate_calls(server: &MockServer) -> Vec<(String, String)> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/api/generate")
        .map(|r| {
            let body: Value = r.body_json().unwrap();
            (
                body["model"].as_str().unwrap().to_string(),
                body["prompt"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_probe_lists_models() {
    let server = MockServer::start().await;
    mount_tags(&server, &["qwen2.5-coder:7b", "llama3.1:8b"]).await;

    let runner = runner_for(&server);
    assert!(runner.client().is_reachable().await);
    assert_eq!(
        runner.client().list_models().await,
        vec!["qwen2.5-coder:7b", "llama3.1:8b"]
    );
}

#[tokio::test]
async fn test_probe_unreachable_backend() {
    let mut config = Config::default();
    config.endpoint.base_url = "http://127.0.0.1:1".to_string();
    config.endpoint.probe_timeout = 2;
    let runner = BenchmarkRunner::new(config).unwrap();

    assert!(!runner.client().is_reachable().await);
    assert!(runner.client().list_models().await.is_empty());

    let err = runner.prepare(&RunConfig::default()).await.unwrap_err();
    assert!(matches!(err, SelectionError::BackendUnreachable { .. }));
}

#[tokio::test]
async fn test_probe_bad_status_and_garbage_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let runner = runner_for(&server);
    assert!(runner.client().is_reachable().await);
    assert!(runner.client().list_models().await.is_empty());
    assert_eq!(
        runner.prepare(&RunConfig::default()).await.unwrap_err(),
        SelectionError::NoModels
    );

    let failing = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&failing)
        .await;
    assert!(!runner_for(&failing).client().is_reachable().await);
}

#[tokio::test]
async fn test_default_run_tests_first_model_only() {
    let server = MockServer::start().await;
    mount_tags(&server, &["qwen2.5-coder:7b", "llama3.1:8b"]).await;
    mount_generate(&server, generation(100, 2_000_000_000)).await;

    let runner = runner_for(&server);
    let run = RunConfig::default();
    let selection = runner.prepare(&run).await.unwrap();
    assert!(selection.defaulted);
    assert_eq!(selection.available, 2);

    let result = runner
        .run_sweep(&selection.models, &run.prompt_classes)
        .await;

    assert_eq!(result.results.len(), 3);
    let classes: Vec<PromptClass> = result.results.iter().map(|r| r.prompt_type()).collect();
    assert_eq!(classes, PromptClass::ALL.to_vec());

    for record in &result.results {
        let metrics = record.metrics().unwrap();
        assert_eq!(metrics.model, "qwen2.5-coder:7b");
        assert_eq!(metrics.tokens_generated, 100);
        assert_eq!(metrics.tokens_per_second, 50.0);
        assert!((metrics.ttft - 0.25).abs() < 1e-12);
        assert_eq!(metrics.output_length, "def is_prime(n): ...".chars().count());
    }
}

#[tokio::test]
async fn test_sweep_order_models_outer_classes_inner() {
    let server = MockServer::start().await;
    mount_generate(&server, generation(10, 1_000_000_000)).await;

    let runner = runner_for(&server);
    let models = vec!["A".to_string(), "B".to_string()];
    let result = runner.run_sweep(&models, &PromptClass::ALL).await;

    let order: Vec<(String, PromptClass)> = result
        .results
        .iter()
        .map(|r| (r.model().to_string(), r.prompt_type()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("A".to_string(), PromptClass::Simple),
            ("A".to_string(), PromptClass::Medium),
            ("A".to_string(), PromptClass::Complex),
            ("B".to_string(), PromptClass::Simple),
            ("B".to_string(), PromptClass::Medium),
            ("B".to_string(), PromptClass::Complex),
        ]
    );

    // Requests reached the backend in the same order with the catalog prompts
    let calls = generate_calls(&server).await;
    assert_eq!(calls.len(), 6);
    assert_eq!(calls[0], ("A".to_string(), PromptClass::Simple.prompt().to_string()));
    assert_eq!(calls[5], ("B".to_string(), PromptClass::Complex.prompt().to_string()));
}

#[tokio::test]
async fn test_failure_is_isolated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "prompt": PromptClass::Medium.prompt() })))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;
    mount_generate(&server, generation(40, 1_000_000_000)).await;

    let runner = runner_for(&server);
    let result = runner
        .run_sweep(&["qwen2.5-coder:7b".to_string()], &PromptClass::ALL)
        .await;

    assert_eq!(result.results.len(), 3);
    assert!(result.results[0].is_success());
    assert!(result.results[2].is_success());

    let failure = result.results[1].failure().unwrap();
    assert_eq!(failure.prompt_type, PromptClass::Medium);
    assert_eq!(failure.kind, FailureKind::HttpStatus);
    assert_eq!(failure.error, "HTTP 500");

    assert_eq!(result.successes().count(), 2);
    assert_eq!(result.failures().count(), 1);
}

#[tokio::test]
async fn test_every_pair_failing_still_yields_full_sweep() {
    let server = MockServer::start().await;
    mount_generate(&server, ResponseTemplate::new(404)).await;

    let runner = runner_for(&server);
    let models = vec!["a".to_string(), "b".to_string()];
    let result = runner.run_sweep(&models, &PromptClass::ALL).await;

    assert_eq!(result.results.len(), 6);
    assert!(result.results.iter().all(|r| !r.is_success()));
    assert_eq!(local_llm_bench::summarize(&result).mean_tokens_per_second, None);
}

#[tokio::test]
async fn test_slow_generation_times_out() {
    let server = MockServer::start().await;
    mount_generate(
        &server,
        generation(10, 1_000_000_000).set_delay(Duration::from_secs(3)),
    )
    .await;

    let mut config = config_for(&server);
    config.endpoint.timeout = 1;
    let runner = BenchmarkRunner::new(config).unwrap();

    let record = runner.execute("qwen2.5-coder:7b", PromptClass::Simple).await;
    match record {
        BenchmarkRecord::Failure(failure) => {
            assert_eq!(failure.kind, FailureKind::Timeout);
            assert_eq!(failure.error, "timed out");
        }
        BenchmarkRecord::Success(_) => panic!("expected a timeout failure"),
    }
}

#[tokio::test]
async fn test_zero_eval_duration_gives_zero_throughput() {
    let server = MockServer::start().await;
    mount_generate(&server, generation(128, 0)).await;

    let runner = runner_for(&server);
    let record = runner.execute("m", PromptClass::Complex).await;
    let metrics = record.metrics().unwrap();
    assert_eq!(metrics.tokens_generated, 128);
    assert_eq!(metrics.tokens_per_second, 0.0);
}

#[tokio::test]
async fn test_unparseable_generation_is_transport_failure() {
    let server = MockServer::start().await;
    mount_generate(&server, ResponseTemplate::new(200).set_body_string("<html>")).await;

    let runner = runner_for(&server);
    let failure = runner
        .execute("m", PromptClass::Simple)
        .await
        .failure()
        .cloned()
        .unwrap();
    assert_eq!(failure.kind, FailureKind::Transport);
}

#[tokio::test]
async fn test_missing_model_stops_before_generation() {
    let server = MockServer::start().await;
    mount_tags(&server, &["qwen2.5-coder:7b"]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(generation(1, 1))
        .expect(0)
        .mount(&server)
        .await;

    let runner = runner_for(&server);
    let run = RunConfig {
        model: Some("llama3.1:70b".to_string()),
        ..RunConfig::default()
    };

    let err = runner.run(&run).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("llama3.1:70b"));
    assert!(message.contains("qwen2.5-coder:7b"));
}

#[tokio::test]
async fn test_run_saves_results() {
    let server = MockServer::start().await;
    mount_tags(&server, &["a", "b"]).await;
    mount_generate(&server, generation(60, 1_000_000_000)).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&server);
    config.output.directory = dir.path().to_path_buf();
    let runner = BenchmarkRunner::new(config).unwrap();

    let run = RunConfig {
        all: true,
        save: true,
        prompt_classes: vec![PromptClass::Simple],
        ..RunConfig::default()
    };
    runner.run(&run).await.unwrap();

    let saved: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(saved.len(), 1);

    let document: Value =
        serde_json::from_str(&std::fs::read_to_string(&saved[0]).unwrap()).unwrap();
    assert!(document["timestamp"].is_string());
    assert!(document["system"]["os"].is_string());

    let results = document["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["model"], "a");
    assert_eq!(results[1]["model"], "b");
    assert_eq!(results[0]["tokens_per_second"], 60.0);
}

#[tokio::test]
async fn test_quiet_console_run_still_reports() {
    colored::control::set_override(false);

    let server = MockServer::start().await;
    mount_tags(&server, &["qwen2.5-coder:7b", "llama3.1:8b"]).await;
    mount_generate(&server, generation(50, 1_000_000_000)).await;

    let runner = runner_for(&server);
    let mut out = Vec::new();
    runner
        .run_with_output(&RunConfig::default(), &mut out)
        .await
        .unwrap();

    let report = String::from_utf8(out).unwrap();
    assert!(report.contains("Benchmark Results"));
    assert!(report.contains("qwen2.5-coder:7b  simple"));
    assert!(report.contains("Average Tokens/sec: 50.00"));
    assert!(report.contains("Excellent performance! Your setup is production-ready."));

    // Progress lines and the default-model notice are muted
    assert!(!report.contains("Testing "));
    assert!(!report.contains("Use --all"));
}

#[tokio::test]
async fn test_console_run_shows_progress_and_notice() {
    colored::control::set_override(false);

    let server = MockServer::start().await;
    mount_tags(&server, &["qwen2.5-coder:7b", "llama3.1:8b"]).await;
    mount_generate(&server, generation(10, 1_000_000_000)).await;

    let mut config = config_for(&server);
    config.output.quiet = false;
    let runner = BenchmarkRunner::new(config).unwrap();

    let mut out = Vec::new();
    runner
        .run_with_output(&RunConfig::default(), &mut out)
        .await
        .unwrap();

    let report = String::from_utf8(out).unwrap();
    assert!(report.starts_with("Testing model: qwen2.5-coder:7b\nUse --all to test all 2 available models"));
    assert!(report.contains("Testing qwen2.5-coder:7b (simple)..."));
    assert!(report.contains("Testing qwen2.5-coder:7b (complex)..."));
    assert!(report.contains("Slow performance."));
}

#[tokio::test]
async fn test_json_run_keeps_stdout_machine_readable() {
    let server = MockServer::start().await;
    mount_tags(&server, &["qwen2.5-coder:7b", "llama3.1:8b"]).await;
    mount_generate(&server, generation(30, 1_000_000_000)).await;

    let mut config = config_for(&server);
    config.output.quiet = false;
    config.output.format = OutputFormat::Json;
    let runner = BenchmarkRunner::new(config).unwrap();

    let mut out = Vec::new();
    runner
        .run_with_output(&RunConfig::default(), &mut out)
        .await
        .unwrap();

    // The default-model notice goes to stderr, so the sink holds only JSON
    let document: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(document["results"].as_array().unwrap().len(), 3);
    assert_eq!(document["results"][0]["model"], "qwen2.5-coder:7b");
}

#[tokio::test]
async fn test_slow_tags_endpoint_is_unreachable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "models": [{ "name": "qwen2.5-coder:7b" }] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.endpoint.probe_timeout = 1;
    let runner = BenchmarkRunner::new(config).unwrap();

    let start = std::time::Instant::now();
    assert!(!runner.client().is_reachable().await);
    assert!(runner.client().list_models().await.is_empty());
    assert!(start.elapsed() < Duration::from_secs(3));
}
