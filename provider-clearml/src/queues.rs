//! ClearML queue operations

use async_trait::async_trait;
use core_auth::Session;
use core_transport::ApiRequest;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{ProviderError, Result};
use crate::types::{
    CreateQueueRequest, CreateQueueResponse, GetQueueResponse, QueueIdRequest, QueueRecord,
    UpdateQueueRequest,
};

const CREATE_PATH: &str = "/queues.create";
const GET_BY_ID_PATH: &str = "/queues.get_by_id";
const UPDATE_PATH: &str = "/queues.update";
const DELETE_PATH: &str = "/queues.delete";

/// Remote queue operations.
///
/// Each method is exactly one remote call (plus transport-level retries).
/// Failures naming an unknown queue come back as
/// [`ProviderError::NotFound`].
#[async_trait]
pub trait QueueApi: Send + Sync {
    /// Create a queue and return its server-assigned identifier
    async fn create_queue(
        &self,
        name: &str,
        tags: &[String],
        cancel: &CancellationToken,
    ) -> Result<String>;

    async fn get_queue(&self, id: &str, cancel: &CancellationToken) -> Result<QueueRecord>;

    /// Replace name and tags; nothing is merged
    async fn update_queue(
        &self,
        id: &str,
        name: &str,
        tags: &[String],
        cancel: &CancellationToken,
    ) -> Result<()>;

    async fn delete_queue(&self, id: &str, cancel: &CancellationToken) -> Result<()>;
}

/// [`QueueApi`] over the ClearML REST API
///
/// # Example
///
/// ```ignore
/// use provider_clearml::{ClearmlQueues, QueueApi};
///
/// let queues = ClearmlQueues::new(session);
/// let id = queues.create_queue("gpu-a100", &["team:ml".into()], &cancel).await?;
/// let queue = queues.get_queue(&id, &cancel).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ClearmlQueues {
    session: Session,
}

impl ClearmlQueues {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn call<T: Serialize>(
        &self,
        path: &str,
        body: &T,
        id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<core_transport::ApiResponse> {
        let request = ApiRequest::post(path)
            .json(body)
            .map_err(|e| ProviderError::from_transport(e, id))?;

        self.session
            .send(request, cancel)
            .await
            .map_err(|e| ProviderError::from_transport(e, id))
    }
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ProviderError::EmptyId);
    }
    Ok(())
}

#[async_trait]
impl QueueApi for ClearmlQueues {
    #[instrument(skip(self, tags, cancel), fields(tag_count = tags.len()))]
    async fn create_queue(
        &self,
        name: &str,
        tags: &[String],
        cancel: &CancellationToken,
    ) -> Result<String> {
        let response = self
            .call(CREATE_PATH, &CreateQueueRequest { name, tags }, None, cancel)
            .await?;

        let created: CreateQueueResponse = response
            .decode()
            .map_err(|e| ProviderError::from_transport(e, None))?;

        if created.data.id.trim().is_empty() {
            return Err(ProviderError::Decode {
                endpoint: CREATE_PATH.to_string(),
                message: "response carried an empty data.id".to_string(),
            });
        }

        info!(id = %created.data.id, "Created queue");
        Ok(created.data.id)
    }

    #[instrument(skip(self, cancel))]
    async fn get_queue(&self, id: &str, cancel: &CancellationToken) -> Result<QueueRecord> {
        require_id(id)?;

        let response = self
            .call(GET_BY_ID_PATH, &QueueIdRequest { queue: id }, Some(id), cancel)
            .await?;

        let found: GetQueueResponse = response
            .decode()
            .map_err(|e| ProviderError::from_transport(e, Some(id)))?;

        debug!(name = %found.data.queue.name, tags = ?found.data.queue.tags, "Fetched queue");
        Ok(found.data.queue)
    }

    #[instrument(skip(self, tags, cancel), fields(tag_count = tags.len()))]
    async fn update_queue(
        &self,
        id: &str,
        name: &str,
        tags: &[String],
        cancel: &CancellationToken,
    ) -> Result<()> {
        require_id(id)?;

        self.call(
            UPDATE_PATH,
            &UpdateQueueRequest {
                queue: id,
                name,
                tags,
            },
            Some(id),
            cancel,
        )
        .await?;

        info!("Updated queue");
        Ok(())
    }

    #[instrument(skip(self, cancel))]
    async fn delete_queue(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        require_id(id)?;

        self.call(DELETE_PATH, &QueueIdRequest { queue: id }, Some(id), cancel)
            .await?;

        info!("Deleted queue");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
    use bytes::Bytes;
    use core_auth::Credentials;
    use core_transport::{ApiTransport, TransportError};
    use mockall::{mock, Sequence};
    use std::collections::HashMap;
    use std::sync::Arc;
    use url::Url;

    mock! {
        HttpClientImpl {}

        #[async_trait]
        impl HttpClient for HttpClientImpl {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        HttpResponse {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    fn body_json(request: &HttpRequest) -> serde_json::Value {
        serde_json::from_slice(request.body.as_deref().unwrap_or(b"null")).unwrap()
    }

    /// Mock whose first call answers the login, then `expect` sets up the rest
    async fn queues_with<F>(expect: F) -> ClearmlQueues
    where
        F: FnOnce(&mut MockHttpClientImpl, &mut Sequence),
    {
        let mut mock = MockHttpClientImpl::new();
        let mut seq = Sequence::new();
        mock.expect_execute()
            .withf(|req| req.url.ends_with("/auth.login"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(200, r#"{"data":{"token":"tok"}}"#)));
        expect(&mut mock, &mut seq);

        let transport = ApiTransport::new(
            Arc::new(mock),
            Url::parse("https://api.clear.ml/").unwrap(),
        )
        .with_retry_policy(RetryPolicy::no_retry());
        let session = Session::login(
            transport,
            &Credentials::new("AK", "SK").unwrap(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        ClearmlQueues::new(session)
    }

    #[tokio::test]
    async fn test_create_queue() {
        let queues = queues_with(|mock, seq| {
            mock.expect_execute()
                .withf(|req| {
                    req.url == "https://api.clear.ml/queues.create"
                        && req.header_value("Authorization") == Some("Bearer tok")
                        && body_json(req)
                            == serde_json::json!({ "name": "terraform-test-abc123", "tags": ["env:test"] })
                })
                .times(1)
                .in_sequence(seq)
                .returning(|_| Ok(response(200, r#"{"meta":{},"data":{"id":"q-1"}}"#)));
        })
        .await;

        let id = queues
            .create_queue(
                "terraform-test-abc123",
                &["env:test".to_string()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(id, "q-1");
    }

    #[tokio::test]
    async fn test_create_queue_requires_id_in_response() {
        let queues = queues_with(|mock, seq| {
            mock.expect_execute()
                .times(1)
                .in_sequence(seq)
                .returning(|_| Ok(response(200, r#"{"data":{"id":""}}"#)));
        })
        .await;

        let result = queues
            .create_queue("q", &[], &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ProviderError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_create_duplicate_name_is_rejection() {
        let queues = queues_with(|mock, seq| {
            mock.expect_execute()
                .times(1)
                .in_sequence(seq)
                .returning(|_| {
                    Ok(response(
                        400,
                        r#"{"meta":{"result_code":400,"result_subcode":702,"result_msg":"Queue with this name already exists"}}"#,
                    ))
                });
        })
        .await;

        let err = queues
            .create_queue("dup", &[], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProviderError::Transport(TransportError::Rejected(ref r)) if r.status == 400
        ));
    }

    #[tokio::test]
    async fn test_get_queue_decodes_record() {
        let queues = queues_with(|mock, seq| {
            mock.expect_execute()
                .withf(|req| {
                    req.url == "https://api.clear.ml/queues.get_by_id"
                        && body_json(req) == serde_json::json!({ "queue": "q-1" })
                })
                .times(1)
                .in_sequence(seq)
                .returning(|_| {
                    Ok(response(
                        200,
                        r#"{"data":{"queue":{"id":"q-1","name":"n","tags":["b","a"],"system_tags":["default"],"entries":[]}}}"#,
                    ))
                });
        })
        .await;

        let record = queues
            .get_queue("q-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(record.name, "n");
        assert_eq!(record.tags, vec!["b", "a"]);
        assert_eq!(record.system_tags, vec!["default"]);
    }

    #[tokio::test]
    async fn test_get_unknown_queue_is_not_found() {
        let queues = queues_with(|mock, seq| {
            mock.expect_execute()
                .times(1)
                .in_sequence(seq)
                .returning(|_| {
                    Ok(response(
                        400,
                        r#"{"meta":{"result_code":400,"result_subcode":701,"result_msg":"Invalid queue id"}}"#,
                    ))
                });
        })
        .await;

        let err = queues
            .get_queue("q-missing", &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::NotFound { ref id, .. } if id == "q-missing"));
    }

    #[tokio::test]
    async fn test_get_queue_with_wrong_shape_is_decode_error() {
        let queues = queues_with(|mock, seq| {
            mock.expect_execute()
                .times(1)
                .in_sequence(seq)
                .returning(|_| Ok(response(200, r#"{"data":{"queue":{"name":"no id"}}}"#)));
        })
        .await;

        let result = queues.get_queue("q-1", &CancellationToken::new()).await;
        assert!(matches!(result, Err(ProviderError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_update_sends_full_replacement() {
        let queues = queues_with(|mock, seq| {
            mock.expect_execute()
                .withf(|req| {
                    req.url == "https://api.clear.ml/queues.update"
                        && body_json(req)
                            == serde_json::json!({
                                "queue": "q-1",
                                "name": "renamed",
                                "tags": ["env:test", "team:ml"]
                            })
                })
                .times(1)
                .in_sequence(seq)
                .returning(|_| Ok(response(200, r#"{"data":{"updated":1}}"#)));
        })
        .await;

        queues
            .update_queue(
                "q-1",
                "renamed",
                &["env:test".to_string(), "team:ml".to_string()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let queues = queues_with(|mock, seq| {
            mock.expect_execute()
                .withf(|req| {
                    req.url == "https://api.clear.ml/queues.delete"
                        && body_json(req) == serde_json::json!({ "queue": "q-1" })
                })
                .times(1)
                .in_sequence(seq)
                .returning(|_| Ok(response(200, "")));
        })
        .await;

        queues
            .delete_queue("q-1", &CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_id_never_reaches_the_server() {
        let queues = queues_with(|_, _| {}).await;
        let cancel = CancellationToken::new();

        assert!(matches!(
            queues.get_queue("", &cancel).await,
            Err(ProviderError::EmptyId)
        ));
        assert!(matches!(
            queues.update_queue(" ", "n", &[], &cancel).await,
            Err(ProviderError::EmptyId)
        ));
        assert!(matches!(
            queues.delete_queue("", &cancel).await,
            Err(ProviderError::EmptyId)
        ));
    }
}
