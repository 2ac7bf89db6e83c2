use std::sync::Arc;

use crate::assessment_client::AssessmentClient;
use crate::config::Config;
use crate::directory_client::DirectoryClient;
use crate::exam::registry::ExamRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub assessment: AssessmentClient,
    pub directory: DirectoryClient,
    /// Exam flows currently being taken, keyed by flow id.
    pub exams: Arc<ExamRegistry>,
}

#[cfg(test)]
impl AppState {
    /// State whose clients point at unroutable hosts; handlers under test
    /// must not reach them.
    pub fn for_tests() -> Self {
        use std::time::Duration;

        let config = Config {
            assessment_service_url: "http://assessment.invalid".to_string(),
            directory_service_url: "http://directory.invalid".to_string(),
            port: 0,
            rust_log: "debug".to_string(),
            http_timeout: Duration::from_secs(1),
            notice_ttl: Duration::from_secs(5),
            default_page_size: 10,
            feedback_path: "/feedback".to_string(),
            flow_idle_ttl: Duration::from_secs(3600),
            flow_sweep_interval: Duration::from_secs(60),
        };

        Self {
            assessment: AssessmentClient::new(&config.assessment_service_url, config.http_timeout)
                .unwrap(),
            directory: DirectoryClient::new(&config.directory_service_url, config.http_timeout)
                .unwrap(),
            exams: Arc::new(ExamRegistry::default()),
            config,
        }
    }
}
