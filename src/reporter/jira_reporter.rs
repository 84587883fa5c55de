use std::path::Path;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use snafu::ResultExt;
use tracing::{debug, info};

use crate::config::JiraConfig;
use crate::reporter::reporter::RequestSnafu;
use crate::reporter::{ReportError, ReporterTrait};
use crate::snapshot::ChangeKind;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CREATED: u16 = 201;

/// Opens one Jira issue per detected change.
pub struct JiraReporter {
    agent: ureq::Agent,
    endpoint: String,
    authorization: String,
    project_key: String,
    issue_type: String,
}

impl JiraReporter {
    pub fn new(config: &JiraConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        let credentials = format!("{}:{}", config.email, config.api_token);

        Self {
            agent,
            endpoint: format!("{}/rest/api/2/issue", config.url.trim_end_matches('/')),
            authorization: format!("Basic {}", STANDARD.encode(credentials)),
            project_key: config.project_key.clone(),
            issue_type: config.issue_type.clone(),
        }
    }

    pub(crate) fn issue_payload(&self, path: &str, kind: ChangeKind) -> Value {
        let file_name = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_owned());

        json!({
            "fields": {
                "project": { "key": self.project_key },
                "summary": format!("File Integrity Issue: {} - {}", kind.description(), file_name),
                "description": format!(
                    "A {} was detected for the file: {}. Please investigate.",
                    kind.description(),
                    path
                ),
                "issuetype": { "name": self.issue_type },
            }
        })
    }
}

impl ReporterTrait for JiraReporter {
    /// The request itself blocks, so it runs on the runtime's blocking pool.
    async fn report(&self, path: &str, kind: ChangeKind) -> Result<(), ReportError> {
        debug!("Creating Jira issue for {} {}", kind, path);
        let request = self
            .agent
            .post(&self.endpoint)
            .set("Authorization", &self.authorization)
            .set("Content-Type", "application/json");
        let payload = self.issue_payload(path, kind);
        let owned_path = path.to_owned();

        compio::runtime::spawn_blocking(move || send_issue(request, payload, owned_path))
            .await
            .map_err(|_| ReportError::WorkerPanickedError {
                path: path.to_owned(),
            })??;

        info!("Jira ticket created for {} - {}", kind.description(), path);
        Ok(())
    }
}

fn send_issue(request: ureq::Request, payload: Value, path: String) -> Result<(), ReportError> {
    match request.send_json(payload) {
        Ok(response) if response.status() == CREATED => Ok(()),
        Ok(response) => Err(ReportError::RejectedError {
            status: response.status(),
            body: response.into_string().unwrap_or_default(),
            path,
        }),
        Err(ureq::Error::Status(status, response)) => Err(ReportError::RejectedError {
            status,
            body: response.into_string().unwrap_or_default(),
            path,
        }),
        Err(error) => Err(error).context(RequestSnafu { path }),
    }
}

impl std::fmt::Debug for JiraReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraReporter")
            .field("endpoint", &self.endpoint)
            .field("project_key", &self.project_key)
            .field("issue_type", &self.issue_type)
            .finish_non_exhaustive()
    }
}
