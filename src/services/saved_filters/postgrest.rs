use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{validate_filters, validate_name, SavedFilterError, SavedFilterRepository};
use crate::models::saved_filter::{NewSavedFilterSet, SavedFilterSet};

const TABLE: &str = "saved_filter_sets";

/// Talks to the hosted Postgres through its PostgREST interface.
pub struct PostgrestSavedFilterRepository {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
    hint: Option<String>,
}

impl PostgrestSavedFilterRepository {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            access_token,
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), TABLE)
    }

    fn request(&self, method: Method, query: &str) -> RequestBuilder {
        let url = if query.is_empty() {
            self.table_url()
        } else {
            format!("{}?{}", self.table_url(), query)
        };
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn returning(&self, method: Method, query: &str) -> RequestBuilder {
        self.request(method, query)
            .header("Prefer", "return=representation")
    }
}

fn id_filter(id: Uuid) -> String {
    format!("id=eq.{}", urlencoding::encode(&id.to_string()))
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, SavedFilterError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let parsed = serde_json::from_str::<PostgrestErrorBody>(&body).ok();
        let message = parsed
            .and_then(|err| err.message.or(err.hint))
            .filter(|msg| !msg.trim().is_empty())
            .unwrap_or_else(|| format!("remote store request failed with {}", status.as_u16()));
        return Err(SavedFilterError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str::<T>(&body).map_err(|err| SavedFilterError::InvalidResponse(err.to_string()))
}

fn single(rows: Vec<SavedFilterSet>, id: Option<Uuid>) -> Result<SavedFilterSet, SavedFilterError> {
    match (rows.into_iter().next(), id) {
        (Some(row), _) => Ok(row),
        (None, Some(id)) => Err(SavedFilterError::NotFound(id)),
        (None, None) => Err(SavedFilterError::InvalidResponse(
            "remote store returned no rows".into(),
        )),
    }
}

#[async_trait]
impl SavedFilterRepository for PostgrestSavedFilterRepository {
    async fn list(&self, user_id: &str) -> Result<Vec<SavedFilterSet>, SavedFilterError> {
        let query = format!(
            "select=*&user_id=eq.{}&order=created_at.desc",
            urlencoding::encode(user_id)
        );
        send(self.request(Method::GET, &query)).await
    }

    async fn create(
        &self,
        user_id: &str,
        name: &str,
        filters: Value,
    ) -> Result<SavedFilterSet, SavedFilterError> {
        let row = NewSavedFilterSet {
            user_id: user_id.to_string(),
            name: validate_name(name)?,
            filters,
        };
        validate_filters(&row.filters)?;

        let rows = send(self.returning(Method::POST, "").json(&row)).await?;
        single(rows, None)
    }

    async fn rename(&self, id: Uuid, name: &str) -> Result<SavedFilterSet, SavedFilterError> {
        let name = validate_name(name)?;
        let patch = json!({ "name": name, "updated_at": Utc::now() });
        let rows = send(self.returning(Method::PATCH, &id_filter(id)).json(&patch)).await?;
        single(rows, Some(id))
    }

    async fn update_filters(
        &self,
        id: Uuid,
        filters: Value,
    ) -> Result<SavedFilterSet, SavedFilterError> {
        validate_filters(&filters)?;
        let patch = json!({ "filters": filters, "updated_at": Utc::now() });
        let rows = send(self.returning(Method::PATCH, &id_filter(id)).json(&patch)).await?;
        single(rows, Some(id))
    }

    async fn delete(&self, id: Uuid) -> Result<(), SavedFilterError> {
        let rows: Vec<SavedFilterSet> =
            send(self.returning(Method::DELETE, &id_filter(id))).await?;
        single(rows, Some(id)).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(server: &httpmock::MockServer, token: Option<&str>) -> PostgrestSavedFilterRepository {
        PostgrestSavedFilterRepository::new(
            Client::new(),
            server.base_url(),
            "anon-key",
            token.map(str::to_string),
        )
    }

    fn row(id: Uuid, name: &str) -> Value {
        json!({
            "id": id,
            "user_id": "user-1",
            "name": name,
            "filters": { "location": "Prague" },
            "created_at": "2026-10-01T08:00:00Z",
            "updated_at": null
        })
    }

    #[tokio::test]
    async fn list_filters_by_user_newest_first() {
        let server = httpmock::MockServer::start();
        let id = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET)
                .path("/rest/v1/saved_filter_sets")
                .query_param("user_id", "eq.user-1")
                .query_param("order", "created_at.desc")
                .header("apikey", "anon-key")
                .header("authorization", "Bearer session-token");
            then.status(200).json_body(json!([row(id, "Prague")]));
        });

        let rows = repo(&server, Some("session-token"))
            .list("user-1")
            .await
            .expect("list");

        mock.assert();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].filters["location"], "Prague");
    }

    #[tokio::test]
    async fn create_posts_trimmed_row_and_returns_representation() {
        let server = httpmock::MockServer::start();
        let id = Uuid::new_v4();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/rest/v1/saved_filter_sets")
                .header("Prefer", "return=representation")
                .header("authorization", "Bearer anon-key")
                .json_body(json!({
                    "user_id": "user-1",
                    "name": "Prague",
                    "filters": { "location": "Prague" }
                }));
            then.status(201).json_body(json!([row(id, "Prague")]));
        });

        let created = repo(&server, None)
            .create("user-1", "  Prague ", json!({ "location": "Prague" }))
            .await
            .expect("create");

        mock.assert();
        assert_eq!(created.id, id);
    }

    #[tokio::test]
    async fn rename_of_missing_row_is_not_found() {
        let server = httpmock::MockServer::start();
        let id = Uuid::new_v4();
        server.mock(|when, then| {
            when.method(httpmock::Method::PATCH)
                .path("/rest/v1/saved_filter_sets")
                .query_param("id", format!("eq.{}", id));
            then.status(200).json_body(json!([]));
        });

        let err = repo(&server, None)
            .rename(id, "Renamed")
            .await
            .expect_err("no rows");

        assert!(matches!(err, SavedFilterError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn api_errors_surface_postgrest_message() {
        let server = httpmock::MockServer::start();
        server.mock(|when, then| {
            when.method(httpmock::Method::DELETE);
            then.status(401)
                .json_body(json!({ "message": "JWT expired", "code": "PGRST301" }));
        });

        let err = repo(&server, Some("old"))
            .delete(Uuid::new_v4())
            .await
            .expect_err("unauthorized");

        match err {
            SavedFilterError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "JWT expired");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn validation_happens_before_any_request() {
        let server = httpmock::MockServer::start();
        let mock = server.mock(|_when, then| {
            then.status(500);
        });

        let err = repo(&server, None)
            .update_filters(Uuid::new_v4(), json!("not an object"))
            .await
            .expect_err("invalid filters");

        assert!(matches!(err, SavedFilterError::Validation(_)));
        mock.assert_hits(0);
    }

    #[tokio::test]
    async fn body_cut_short_is_an_http_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            // promises 64 bytes, sends a few, then hangs up
            let _ = socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\n\
                      content-type: application/json\r\n\
                      content-length: 64\r\n\r\n{\"message\":",
                )
                .await;
        });

        let repo = PostgrestSavedFilterRepository::new(
            Client::new(),
            format!("http://{addr}"),
            "anon-key",
            None,
        );
        let err = repo.list("user-1").await.expect_err("truncated body");

        assert!(matches!(err, SavedFilterError::Http(_)), "unexpected error {err:?}");
    }
}
