use perms_core::InMemoryBackend;
use perms_test_utils::conformance;

#[tokio::test]
async fn test_memory_backend_conformance() {
    let backend = InMemoryBackend::new();
    conformance::run_suite(&backend).await;
}

#[tokio::test]
async fn test_memory_backend_scenario_on_fresh_instance() {
    conformance::scenario(&InMemoryBackend::new()).await;
}
