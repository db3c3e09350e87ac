use std::collections::HashSet;

use log::{debug, info};
use reqwest::header::HeaderMap;

use super::core::{AzureDevOpsClient, API_VERSION, PAGE_SIZE};
use crate::error::{DoraLensError, Result};
use crate::providers::azure::types::{
    Build, ListResponse, PipelineDefinition, TimelineRecord, TimelineResponse,
};
use crate::providers::pagination::{collect_pages, Page};
use crate::time::TimeWindow;

const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// Reads the next-page cursor, preferring the response header over the body.
fn continuation_token(headers: &HeaderMap, body_token: Option<String>) -> Option<String> {
    headers
        .get(CONTINUATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or(body_token)
        .filter(|token| !token.trim().is_empty())
}

/// Query parameters for the build listing, without the continuation cursor.
pub(super) fn build_query(
    definition_ids: &[u64],
    window: &TimeWindow,
    branch: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("api-version", API_VERSION.to_string()),
        ("$top", PAGE_SIZE.to_string()),
        ("minTime", window.since.to_rfc3339()),
        ("maxTime", window.until.to_rfc3339()),
        ("queryOrder", "finishTimeDescending".to_string()),
        (
            "definitions",
            definition_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
    ];

    if let Some(branch) = branch.map(str::trim).filter(|b| !b.is_empty()) {
        query.push(("branchName", branch.to_string()));
    }

    query
}

impl AzureDevOpsClient {
    pub async fn list_definitions(&self, name_filter: Option<&str>) -> Result<Vec<PipelineDefinition>> {
        let mut query = vec![("api-version", API_VERSION.to_string())];
        if let Some(name) = name_filter.map(str::trim).filter(|n| !n.is_empty()) {
            query.push(("name", name.to_string()));
        }

        let (response, _): (ListResponse<PipelineDefinition>, _) =
            self.get_json("_apis/build/definitions", &query).await?;

        debug!("Fetched {} pipeline definitions", response.value.len());

        Ok(response.value)
    }

    pub async fn get_definition(&self, definition_id: u64) -> Result<PipelineDefinition> {
        let (definition, _) = self
            .get_json(
                &format!("_apis/build/definitions/{definition_id}"),
                &[("api-version", API_VERSION.to_string())],
            )
            .await?;

        Ok(definition)
    }

    /// Lists every build of `definition_ids` inside `window`, following all
    /// continuation pages. Builds appearing on more than one page are kept once.
    pub async fn list_builds(
        &self,
        definition_ids: &[u64],
        window: &TimeWindow,
        branch: Option<&str>,
    ) -> Result<Vec<Build>> {
        let base_query = build_query(definition_ids, window, branch);

        info!(
            "Listing builds for definitions {:?} between {} and {}",
            definition_ids, window.since, window.until
        );

        let builds = collect_pages(|cursor| {
            let mut query = base_query.clone();
            if let Some(cursor) = cursor {
                query.push(("continuationToken", cursor));
            }
            async move {
                let (response, headers): (ListResponse<Build>, HeaderMap) =
                    self.get_json("_apis/build/builds", &query).await?;
                let continuation = continuation_token(&headers, response.continuation_token);
                Ok::<_, DoraLensError>(Page {
                    items: response.value,
                    continuation,
                })
            }
        })
        .await?;

        let mut seen = HashSet::new();
        let builds: Vec<Build> = builds.into_iter().filter(|b| seen.insert(b.id)).collect();

        info!("Fetched {} builds", builds.len());

        Ok(builds)
    }

    pub async fn get_timeline(&self, build_id: u64) -> Result<Vec<TimelineRecord>> {
        let (timeline, _): (TimelineResponse, _) = self
            .get_json(
                &format!("_apis/build/builds/{build_id}/timeline"),
                &[("api-version", API_VERSION.to_string())],
            )
            .await?;

        Ok(timeline.records.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AzureCredentials, Token};
    use crate::providers::azure::client::HttpSettings;
    use crate::providers::azure::types::{RecordKind, RecordResult};
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use reqwest::header::HeaderValue;
    use std::time::Duration;

    fn client_for(server: &mockito::Server) -> AzureDevOpsClient {
        AzureDevOpsClient::new(
            &server.url(),
            "contoso",
            "web",
            AzureCredentials::PersonalAccessToken(Token::from("pat")),
            HttpSettings {
                timeout: Duration::from_secs(5),
                max_retries: 0,
                retry_delay: Duration::from_millis(0),
            },
        )
        .unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow {
            since: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            until: Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_continuation_token_prefers_header() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTINUATION_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(
            continuation_token(&headers, Some("from-body".to_string())),
            Some("from-header".to_string())
        );
        assert_eq!(
            continuation_token(&HeaderMap::new(), Some("from-body".to_string())),
            Some("from-body".to_string())
        );
        assert_eq!(continuation_token(&HeaderMap::new(), Some(String::new())), None);
        assert_eq!(continuation_token(&HeaderMap::new(), None), None);
    }

    #[test]
    fn test_build_query_parameters() {
        let query = build_query(&[12, 7], &window(), Some("  refs/heads/main "));
        let lookup = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(lookup("api-version").as_deref(), Some("7.1"));
        assert_eq!(lookup("$top").as_deref(), Some("200"));
        assert_eq!(lookup("definitions").as_deref(), Some("12,7"));
        assert_eq!(lookup("queryOrder").as_deref(), Some("finishTimeDescending"));
        assert_eq!(lookup("branchName").as_deref(), Some("refs/heads/main"));
        assert_eq!(lookup("minTime").as_deref(), Some("2024-01-01T00:00:00+00:00"));
    }

    #[test]
    fn test_build_query_skips_blank_branch() {
        let query = build_query(&[1], &window(), Some("   "));
        assert!(query.iter().all(|(k, _)| *k != "branchName"));
        let query = build_query(&[1], &window(), None);
        assert!(query.iter().all(|(k, _)| *k != "branchName"));
    }

    #[tokio::test]
    async fn test_list_builds_single_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/contoso/web/_apis/build/builds")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("definitions".into(), "12".into()),
                Matcher::UrlEncoded("branchName".into(), "refs/heads/main".into()),
            ]))
            .match_header("authorization", Matcher::Regex("^Basic ".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"count":2,"value":[
                    {"id":101,"sourceVersion":"aaa","repository":{"id":"r1","type":"TfsGit"}},
                    {"id":102,"sourceVersion":"bbb","repository":{"id":"r1","type":"TfsGit"}}
                ]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let builds = client
            .list_builds(&[12], &window(), Some("refs/heads/main"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(builds.iter().map(|b| b.id).collect::<Vec<_>>(), vec![101, 102]);
    }

    #[tokio::test]
    async fn test_list_builds_follows_continuation_pages() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/contoso/web/_apis/build/builds")
            .match_query(Matcher::Regex("definitions=12$".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_header(CONTINUATION_HEADER, "page-2")
            .with_body(r#"{"count":2,"value":[{"id":1},{"id":2}]}"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/contoso/web/_apis/build/builds")
            .match_query(Matcher::Regex("continuationToken=page-2$".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"count":2,"value":[{"id":3},{"id":2}],"continuationToken":"page-3"}"#)
            .create_async()
            .await;
        let third = server
            .mock("GET", "/contoso/web/_apis/build/builds")
            .match_query(Matcher::Regex("continuationToken=page-3$".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"count":1,"value":[{"id":4,"repository":null}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let builds = client.list_builds(&[12], &window(), None).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
        assert_eq!(builds.iter().map(|b| b.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_list_builds_http_error_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/contoso/web/_apis/build/builds")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.list_builds(&[12], &window(), None).await.unwrap_err();

        assert!(matches!(err, DoraLensError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_list_definitions_with_name_filter() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/contoso/web/_apis/build/definitions")
            .match_query(Matcher::UrlEncoded("name".into(), "app-cd".into()))
            .with_status(200)
            .with_body(r#"{"count":1,"value":[{"id":12,"name":"app-cd"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let definitions = client.list_definitions(Some("app-cd")).await.unwrap();

        assert_eq!(
            definitions,
            vec![PipelineDefinition {
                id: 12,
                name: "app-cd".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_get_definition() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/contoso/web/_apis/build/definitions/12")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"id":12,"name":"app-cd","revision":4}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let definition = client.get_definition(12).await.unwrap();

        assert_eq!(definition.name, "app-cd");
    }

    #[tokio::test]
    async fn test_get_timeline() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/contoso/web/_apis/build/builds/101/timeline")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"records":[
                    {"type":"Stage","name":"DeployLive","result":"succeeded"},
                    {"type":"Job","name":"Swap Slots","result":"succeeded","finishTime":"2024-01-01T10:00:00Z"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let records = client.get_timeline(101).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind, RecordKind::Job);
        assert_eq!(records[1].result, Some(RecordResult::Succeeded));
    }

    #[tokio::test]
    async fn test_get_timeline_without_records() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/contoso/web/_apis/build/builds/5/timeline")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"records":null}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.get_timeline(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_after_retries() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/contoso/web/_apis/build/builds/9/timeline")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.get_timeline(9).await.unwrap_err();

        assert!(matches!(
            err,
            DoraLensError::ApiErrorAfterRetries {
                status: 503,
                retries: 0
            }
        ));
    }
}
