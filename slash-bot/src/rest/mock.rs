//! モックRESTクライアント（テスト用）

use super::{DiscordRest, RestError, RestRequest};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::sync::Mutex;

/// テスト用モックRESTクライアント
///
/// 送られたリクエストを記録し、固定のレスポンス（または固定のエラー）を返す
pub struct MockRestClient {
    requests: Mutex<Vec<RestRequest>>,
    response: JsonValue,
    /// 設定されていればこのステータスで失敗する
    fail_status: Option<u16>,
}

impl MockRestClient {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            response: JsonValue::Null,
            fail_status: None,
        }
    }

    /// 固定レスポンスで作成
    pub fn with_response(response: JsonValue) -> Self {
        Self {
            response,
            ..Self::new()
        }
    }

    /// 常に失敗するクライアントを作成
    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::new()
        }
    }

    /// 記録されたリクエスト
    pub fn requests(&self) -> Vec<RestRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// 最後のリクエスト
    pub fn last_request(&self) -> Option<RestRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockRestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiscordRest for MockRestClient {
    async fn send(&self, request: RestRequest) -> Result<JsonValue, RestError> {
        let path = request.path.clone();
        self.requests.lock().unwrap().push(request);

        match self.fail_status {
            Some(status) => Err(RestError::ApiError {
                status,
                path,
                body: "mock failure".to_string(),
            }),
            None => Ok(self.response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mock_records_requests() {
        let client = MockRestClient::with_response(json!({ "id": "1" }));
        let result = client
            .send(RestRequest::post("/applications/1/commands", json!({ "name": "ping" })))
            .await
            .unwrap();

        assert_eq!(result["id"], "1");
        assert_eq!(client.request_count(), 1);
        assert_eq!(client.last_request().unwrap().path, "/applications/1/commands");
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let client = MockRestClient::failing(500);
        let result = client.send(RestRequest::get("/x")).await;

        assert!(matches!(result, Err(RestError::ApiError { status: 500, .. })));
        // 失敗しても記録される
        assert_eq!(client.request_count(), 1);
    }

    #[test]
    fn test_mock_trait_object() {
        let _client: Arc<dyn DiscordRest> = Arc::new(MockRestClient::new());
    }
}
