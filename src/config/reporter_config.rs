use std::fmt;

/// Where detected changes are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReporterConfig {
    #[default]
    Log,
    Console,
    Jira(JiraConfig),
}

#[derive(Clone, PartialEq, Eq)]
pub struct JiraConfig {
    pub url: String,
    pub project_key: String,
    pub issue_type: String,
    pub email: String,
    pub api_token: String,
}

impl fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraConfig")
            .field("url", &self.url)
            .field("project_key", &self.project_key)
            .field("issue_type", &self.issue_type)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}
