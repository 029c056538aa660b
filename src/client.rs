//! ICObench client - builds, signs, dispatches and normalizes every call

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::{
    Config, Credentials, Error, IcoBenchApi, Payload, RequestBody, ResponseEnvelope, Result,
    SignedRequest, Transport, TransportOptions,
};
use crate::signer::{HmacSigner, Signer};
use crate::transport::HttpTransport;

/// Signed ICObench API client.
///
/// Cheap to clone; clones share the signer and the transport.
#[derive(Clone)]
pub struct IcoBenchClient {
    signer: Arc<HmacSigner>,
    transport: Arc<dyn Transport>,
}

impl IcoBenchClient {
    /// Client over the bundled HTTP transport
    pub fn new(
        private_key: impl Into<String>,
        public_key: impl Into<String>,
        options: TransportOptions,
    ) -> Result<Self> {
        let credentials = Credentials::new(private_key, public_key)?;
        let transport = HttpTransport::new(&options)?;
        Ok(Self::with_transport(credentials, Arc::new(transport)))
    }

    /// Client over any transport
    pub fn with_transport(credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            signer: Arc::new(HmacSigner::new(credentials)),
            transport,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = config.credentials()?;
        let transport = HttpTransport::new(&config.transport)?;
        Ok(Self::with_transport(credentials, Arc::new(transport)))
    }

    pub fn public_key(&self) -> &str {
        self.signer.key_id()
    }

    /// Serialize once, sign those exact bytes, attach the auth headers.
    pub fn prepare(&self, action: &str, data: &RequestBody) -> Result<SignedRequest> {
        let body = serde_json::to_vec(data)?;
        let headers = self.signer.signed_headers(&body);
        Ok(SignedRequest {
            path: action.to_string(),
            body,
            headers,
        })
    }

    /// Run one call to completion: sign, send, normalize.
    ///
    /// `action` is resolved against the base URI like a relative URL, so an
    /// absolute URL or a `../` path leaves the API root and the signed headers
    /// go wherever it points. Pass only trusted action paths.
    pub async fn execute(&self, action: &str, data: &RequestBody) -> Result<Payload> {
        let request = self.prepare(action, data)?;
        send(self.transport.as_ref(), request).await
    }

    /// Sign now and send on the current Tokio runtime.
    ///
    /// Returns as soon as the request is handed to the runtime. The handle
    /// resolves with the normalized result; dropping it leaves the request
    /// running.
    pub fn dispatch(&self, action: &str, data: &RequestBody) -> Result<PendingResponse> {
        let request = self.prepare(action, data)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::InvalidState(format!("dispatch needs a Tokio runtime: {}", e)))?;
        let transport = Arc::clone(&self.transport);

        let handle = runtime.spawn(async move { send(transport.as_ref(), request).await });
        Ok(PendingResponse { handle })
    }
}

async fn send(transport: &dyn Transport, request: SignedRequest) -> Result<Payload> {
    debug!(path = %request.path, body_len = request.body.len(), "dispatching");
    let envelope = transport.post(&request).await?;
    debug!(path = %request.path, status = envelope.status, "settled");
    normalize(envelope)
}

/// Interpret the service envelope.
///
/// Non-200 fails whatever the body says. A non-null `error` field fails with
/// its text; otherwise a non-null `message` field is the result; otherwise the
/// whole decoded body is. Non-object bodies pass through untouched.
pub fn normalize(envelope: ResponseEnvelope) -> Result<Payload> {
    if envelope.status != 200 {
        return Err(Error::UpstreamStatus(envelope.status));
    }

    let decoded: Value = serde_json::from_slice(&envelope.body).map_err(Error::UpstreamFormat)?;

    let mut map = match decoded {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    if let Some(error) = take_set(&mut map, "error") {
        let message = match error {
            Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(Error::UpstreamApi(message));
    }

    if let Some(message) = take_set(&mut map, "message") {
        return Ok(message);
    }

    Ok(Value::Object(map))
}

/// Remove `key` if present with a non-null value
fn take_set(map: &mut serde_json::Map<String, Value>, key: &str) -> Option<Value> {
    match map.get(key) {
        Some(v) if !v.is_null() => map.remove(key),
        _ => None,
    }
}

/// In-flight request started by [`IcoBenchClient::dispatch`]
pub struct PendingResponse {
    handle: JoinHandle<Result<Payload>>,
}

impl PendingResponse {
    /// Cancel the request if it has not settled yet
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for PendingResponse {
    type Output = Result<Payload>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let joined = ready!(self.handle.poll_unpin(cx));
        Poll::Ready(match joined {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::InvalidState("request aborted".to_string())),
            Err(e) => Err(Error::InvalidState(format!("request task failed: {}", e))),
        })
    }
}

#[async_trait]
impl IcoBenchApi for IcoBenchClient {
    async fn get_icos(&self, kind: &str, data: RequestBody) -> Result<Payload> {
        self.execute(&format!("icos/{}", kind), &data).await
    }

    async fn get_ico(&self, id: &str, data: RequestBody) -> Result<Payload> {
        self.execute(&format!("ico/{}", id), &data).await
    }

    async fn get_other(&self, kind: &str) -> Result<Payload> {
        self.execute(&format!("other/{}", kind), &RequestBody::new()).await
    }

    async fn get_people(&self, kind: &str, data: RequestBody) -> Result<Payload> {
        self.execute(&format!("people/{}", kind), &data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::sign;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every request and answers with a fixed envelope
    struct RecordingTransport {
        reply: ResponseEnvelope,
        delay: Option<Duration>,
        seen: Mutex<Vec<SignedRequest>>,
    }

    impl RecordingTransport {
        fn replying(status: u16, body: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: ResponseEnvelope::new(status, body),
                delay: None,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn slow(status: u16, body: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: ResponseEnvelope::new(status, body),
                delay: Some(delay),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<SignedRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn post(&self, request: &SignedRequest) -> Result<ResponseEnvelope> {
            self.seen.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.reply.clone())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn post(&self, _request: &SignedRequest) -> Result<ResponseEnvelope> {
            Err(Error::Transport("connection refused".to_string()))
        }
    }

    fn client(transport: Arc<dyn Transport>) -> IcoBenchClient {
        let creds = Credentials::new("secret", "pub-key").unwrap();
        IcoBenchClient::with_transport(creds, transport)
    }

    fn body(value: Value) -> RequestBody {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_normalize_message_string() {
        let out = normalize(ResponseEnvelope::new(200, r#"{"message":"hello"}"#)).unwrap();
        assert_eq!(out, json!("hello"));
    }

    #[test]
    fn test_normalize_message_any_json() {
        for value in [json!(42), json!({"a": [1, 2]}), json!([1, "two"]), json!(true)] {
            let raw = json!({ "message": value.clone() }).to_string();
            let out = normalize(ResponseEnvelope::new(200, raw)).unwrap();
            assert_eq!(out, value);
        }
    }

    #[test]
    fn test_normalize_error_field() {
        let err = normalize(ResponseEnvelope::new(200, r#"{"error":"boom"}"#)).unwrap_err();
        match err {
            Error::UpstreamApi(msg) => assert_eq!(msg, "boom"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_wins_over_message() {
        let err = normalize(ResponseEnvelope::new(200, r#"{"message":"ok","error":"no"}"#));
        assert!(matches!(err, Err(Error::UpstreamApi(m)) if m == "no"));
    }

    #[test]
    fn test_non_string_error_is_rendered() {
        let err = normalize(ResponseEnvelope::new(200, r#"{"error":{"code":7}}"#));
        assert!(matches!(err, Err(Error::UpstreamApi(m)) if m == r#"{"code":7}"#));
    }

    #[test]
    fn test_non_200_ignores_body() {
        let err = normalize(ResponseEnvelope::new(404, r#"{"message":"fine"}"#)).unwrap_err();
        assert!(matches!(err, Error::UpstreamStatus(404)));

        let err = normalize(ResponseEnvelope::new(201, "{}")).unwrap_err();
        assert!(matches!(err, Error::UpstreamStatus(201)));
    }

    #[test]
    fn test_plain_object_passes_through() {
        let out = normalize(ResponseEnvelope::new(200, r#"{"ids":[1,2,3]}"#)).unwrap();
        assert_eq!(out, json!({"ids": [1, 2, 3]}));
    }

    #[test]
    fn test_null_fields_count_as_absent() {
        let out = normalize(ResponseEnvelope::new(200, r#"{"error":null,"message":null,"n":1}"#))
            .unwrap();
        assert_eq!(out, json!({"error": null, "message": null, "n": 1}));
    }

    #[test]
    fn test_non_object_bodies_pass_through() {
        let out = normalize(ResponseEnvelope::new(200, "[1,2]")).unwrap();
        assert_eq!(out, json!([1, 2]));
        let out = normalize(ResponseEnvelope::new(200, "\"error\"")).unwrap();
        assert_eq!(out, json!("error"));
    }

    #[test]
    fn test_malformed_json() {
        let err = normalize(ResponseEnvelope::new(200, "<html>oops</html>")).unwrap_err();
        assert!(matches!(err, Error::UpstreamFormat(_)));
        let err = normalize(ResponseEnvelope::new(200, "")).unwrap_err();
        assert!(matches!(err, Error::UpstreamFormat(_)));
    }

    #[test]
    fn test_prepare_signs_transmitted_bytes() {
        let c = client(RecordingTransport::replying(200, "{}"));
        let req = c.prepare("icos/filters", &body(json!({"page": 2}))).unwrap();

        assert_eq!(req.path, "icos/filters");
        assert_eq!(req.body, br#"{"page":2}"#);
        assert_eq!(req.headers.key, "pub-key");
        assert_eq!(req.headers.signature, sign(&req.body, "secret"));
    }

    #[tokio::test]
    async fn test_get_ico_path_and_empty_body() {
        let transport = RecordingTransport::replying(200, r#"{"id":42}"#);
        let c = client(transport.clone());

        let out = c.get_ico("42", RequestBody::new()).await.unwrap();
        assert_eq!(out, json!({"id": 42}));

        let seen = transport.requests();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, "ico/42");
        assert_eq!(seen[0].headers.key, c.public_key());
        assert_eq!(seen[0].body, b"{}");
        assert_eq!(seen[0].headers.signature, sign(b"{}", "secret"));
    }

    #[tokio::test]
    async fn test_caller_paths() {
        let transport = RecordingTransport::replying(200, r#"{"message":"ok"}"#);
        let c = client(transport.clone());

        c.all_icos().await.unwrap();
        c.get_icos("trending", body(json!({"page": 1}))).await.unwrap();
        c.get_other("stats").await.unwrap();
        c.registered_people().await.unwrap();
        c.get_people("expert", RequestBody::new()).await.unwrap();

        let paths: Vec<String> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec!["icos/all", "icos/trending", "other/stats", "people/registered", "people/expert"]
        );
    }

    #[tokio::test]
    async fn test_upstream_errors_reach_caller() {
        let c = client(RecordingTransport::replying(200, r#"{"error":"Invalid key"}"#));
        let err = c.all_icos().await.unwrap_err();
        assert!(matches!(err, Error::UpstreamApi(m) if m == "Invalid key"));

        let c = client(RecordingTransport::replying(500, "Internal Server Error"));
        let err = c.get_other("stats").await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_transport_errors_propagate_unchanged() {
        let c = client(Arc::new(FailingTransport));
        let err = c.all_icos().await.unwrap_err();
        assert!(matches!(err, Error::Transport(m) if m == "connection refused"));
    }

    #[tokio::test]
    async fn test_concurrent_calls_keep_their_own_signature() {
        let transport = RecordingTransport::slow(200, "{}", Duration::from_millis(20));
        let c = client(transport.clone());

        let first = body(json!({"page": 1}));
        let second = body(json!({"page": 2, "orderDesc": "rating"}));
        let (a, b) = futures::future::join(
            c.get_icos("all", first),
            c.get_icos("all", second),
        )
        .await;
        a.unwrap();
        b.unwrap();

        let seen = transport.requests();
        assert_eq!(seen.len(), 2);
        for req in &seen {
            assert_eq!(req.headers.signature, sign(&req.body, "secret"));
        }
        assert_ne!(seen[0].headers.signature, seen[1].headers.signature);
    }

    #[tokio::test]
    async fn test_dispatch_returns_before_settling() {
        let transport = RecordingTransport::slow(200, r#"{"message":[1]}"#, Duration::from_millis(50));
        let c = client(transport.clone());

        let pending = c.dispatch("icos/all", &RequestBody::new()).unwrap();
        assert!(!pending.is_finished());

        let out = pending.await.unwrap();
        assert_eq!(out, json!([1]));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_abort() {
        let transport = RecordingTransport::slow(200, "{}", Duration::from_secs(5));
        let c = client(transport);

        let pending = c.dispatch("icos/all", &RequestBody::new()).unwrap();
        pending.abort();
        assert!(matches!(pending.await, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_dispatch_without_runtime() {
        let c = client(RecordingTransport::replying(200, "{}"));
        let result = c.dispatch("icos/all", &RequestBody::new());
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }
}
