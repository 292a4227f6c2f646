//! Jira Cloud REST v3 client (basic auth with email + API token).

use std::collections::BTreeMap;

use async_trait::async_trait;
use resultsync_core::description::Document;
use resultsync_core::model::{CreatedIssue, ExternalIssue, IssueRef, TestCaseKey};
use resultsync_core::{JiraSettings, Secret, TransitionTable};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::http::{decode, ensure_success, transport};
use crate::services::{IssueTracker, NewIssue};

const SERVICE: &str = "jira";

/// Picker section holding the current-search results.
const CURRENT_SEARCH: &str = "cs";

/// [`IssueTracker`] backed by Jira Cloud.
pub struct JiraClient {
    http: reqwest::Client,
    api_base: String,
    email: String,
    token: Secret,
    project_key: String,
    issue_type_id: String,
    reporter_id: Option<String>,
    test_case_field: String,
    test_case_jql_field: String,
    transitions: TransitionTable,
}

/// Body of `POST /issue`.
#[derive(Debug, Serialize)]
pub struct CreateIssuePayload<'a> {
    fields: IssueFields<'a>,
}

#[derive(Debug, Serialize)]
struct IssueFields<'a> {
    summary: &'a str,
    issuetype: IdRef<'a>,
    project: KeyRef<'a>,
    description: &'a Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    reporter: Option<IdRef<'a>>,
    #[serde(flatten)]
    custom: BTreeMap<&'a str, &'a str>,
}

#[derive(Debug, Serialize)]
struct IdRef<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct KeyRef<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct TransitionRequest<'a> {
    transition: IdRef<'a>,
}

#[derive(Debug, Default, Deserialize)]
struct PickerResponse {
    #[serde(default)]
    sections: Vec<PickerSection>,
}

#[derive(Debug, Deserialize)]
struct PickerSection {
    #[serde(default)]
    id: String,
    #[serde(default)]
    issues: Vec<PickerIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PickerIssue {
    key: String,
    #[serde(default)]
    summary_text: String,
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    key: String,
    fields: IssueResponseFields,
}

#[derive(Debug, Deserialize)]
struct IssueResponseFields {
    status: StatusField,
}

#[derive(Debug, Deserialize)]
struct StatusField {
    name: String,
}

/// Issues of the current-search section, keeping the first occurrence of each
/// key. History and other sections are not matches.
fn distinct_issues(resp: PickerResponse) -> Vec<IssueRef> {
    let mut seen = std::collections::BTreeSet::new();
    resp.sections
        .into_iter()
        .filter(|s| s.id == CURRENT_SEARCH)
        .flat_map(|s| s.issues)
        .filter(|i| seen.insert(i.key.clone()))
        .map(|i| IssueRef {
            key: i.key,
            summary: i.summary_text,
        })
        .collect()
}

impl JiraClient {
    /// Client for `settings`; no request is made until a trait method runs.
    pub fn new(settings: &JiraSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: format!("{}/rest/api/3", settings.base_url),
            email: settings.email.clone(),
            token: settings.access_token.clone(),
            project_key: settings.project_key.clone(),
            issue_type_id: settings.issue_type_id.clone(),
            reporter_id: settings.reporter_id.clone(),
            test_case_field: settings.test_case_field.clone(),
            test_case_jql_field: settings.test_case_jql_field.clone(),
            transitions: settings.transitions.clone(),
        }
    }

    /// Create body for `issue`, tagged with its test case in the custom field.
    pub fn create_payload<'a>(&'a self, issue: &'a NewIssue) -> CreateIssuePayload<'a> {
        let mut custom = BTreeMap::new();
        custom.insert(self.test_case_field.as_str(), issue.test_case_key.as_str());
        CreateIssuePayload {
            fields: IssueFields {
                summary: &issue.summary,
                issuetype: IdRef {
                    id: &self.issue_type_id,
                },
                project: KeyRef {
                    key: &self.project_key,
                },
                description: &issue.description,
                reporter: self.reporter_id.as_deref().map(|id| IdRef { id }),
                custom,
            },
        }
    }

    fn get(&self, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .basic_auth(&self.email, Some(self.token.expose()))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn post(&self, url: String) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .basic_auth(&self.email, Some(self.token.expose()))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Url, ServiceError> {
        let raw = format!("{}{path}", self.api_base);
        let parsed = if params.is_empty() {
            reqwest::Url::parse(&raw)
        } else {
            reqwest::Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|e| ServiceError::Url {
            service: SERVICE,
            message: e.to_string(),
        })
    }

    fn search_jql(&self, test_case_key: &TestCaseKey) -> String {
        format!("{}={test_case_key}", self.test_case_jql_field)
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn search_issues(
        &self,
        test_case_key: &TestCaseKey,
    ) -> Result<Vec<IssueRef>, ServiceError> {
        let url = self.url(
            "/issue/picker",
            &[("currentJQL", self.search_jql(test_case_key))],
        )?;
        let resp = self.get(url).send().await.map_err(transport(SERVICE))?;
        let resp = ensure_success(SERVICE, resp).await?;
        let picker: PickerResponse = decode(SERVICE, resp).await?;
        Ok(distinct_issues(picker))
    }

    async fn get_issue(&self, issue_key: &str) -> Result<ExternalIssue, ServiceError> {
        let url = self.url(&format!("/issue/{issue_key}"), &[])?;
        let resp = self.get(url).send().await.map_err(transport(SERVICE))?;
        let resp = ensure_success(SERVICE, resp).await?;
        let issue: IssueResponse = decode(SERVICE, resp).await?;
        Ok(ExternalIssue {
            key: issue.key,
            status_name: issue.fields.status.name,
        })
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<CreatedIssue, ServiceError> {
        let resp = self
            .post(format!("{}/issue", self.api_base))
            .json(&self.create_payload(issue))
            .send()
            .await
            .map_err(transport(SERVICE))?;
        let resp = ensure_success(SERVICE, resp).await?;
        decode(SERVICE, resp).await
    }

    async fn transition_issue(
        &self,
        issue_key: &str,
        transition_id: &str,
    ) -> Result<(), ServiceError> {
        let name = self
            .transitions
            .transition(transition_id)
            .map_or("unmapped", |t| t.name());
        tracing::debug!(issue = issue_key, transition = name, transition_id, "requesting transition");
        let resp = self
            .post(format!("{}/issue/{issue_key}/transitions", self.api_base))
            .json(&TransitionRequest {
                transition: IdRef { id: transition_id },
            })
            .send()
            .await
            .map_err(transport(SERVICE))?;
        ensure_success(SERVICE, resp).await?;
        Ok(())
    }
}
