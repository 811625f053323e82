//! `RestApi` over HTTP against a local stub site.
//!
//! The stub accepts one request per connection, records it and answers with
//! whatever the test's handler returns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use vcdclient::backends::rest::RestApi;
use vcdclient::{AuthConfig, BearerToken, Org, TokenKind, VcdApi, VcdError};

#[derive(Debug, Clone)]
struct Request {
    method: String,
    target: String,
    headers: HashMap<String, String>,
    body: String,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or_default()
    }

    fn query(&self, key: &str) -> Option<String> {
        let url = url::Url::parse(&format!("http://stub{}", self.target)).unwrap();
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: String,
    /// Overrides the advertised `Content-Length`.
    declared_length: Option<usize>,
}

impl Reply {
    fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "application/json".to_string())],
            body: body.to_string(),
            declared_length: None,
        }
    }

    fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    fn render(&self) -> String {
        let mut out = format!("HTTP/1.1 {} Stub\r\n", self.status);
        for (name, value) in &self.headers {
            out.push_str(&format!("{}: {}\r\n", name, value));
        }
        let length = self.declared_length.unwrap_or(self.body.len());
        out.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", length));
        out.push_str(&self.body);
        out
    }
}

struct Stub {
    host: String,
    seen: Arc<Mutex<Vec<Request>>>,
}

impl Stub {
    async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = format!("http://{}", listener.local_addr().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);

        let log = seen.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    if let Some(request) = read_request(&mut stream).await {
                        let reply = handler(&request);
                        log.lock().unwrap().push(request);
                        let _ = stream.write_all(reply.render().as_bytes()).await;
                        let _ = stream.shutdown().await;
                    }
                });
            }
        });

        Self { host, seen }
    }

    fn auth(&self, user_org: &str) -> AuthConfig {
        AuthConfig::new(&self.host, "csi-user", "s3cret", "", user_org, false)
            .with_session_ttl(Duration::from_secs(600))
    }

    fn api(&self, user_org: &str) -> RestApi {
        RestApi::new(&self.auth(user_org)).unwrap()
    }

    fn requests(&self) -> Vec<Request> {
        self.seen.lock().unwrap().clone()
    }

    fn last(&self) -> Request {
        self.requests().pop().expect("no request reached the stub")
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(header_end + length);
    let body = String::from_utf8_lossy(&buf[header_end..end]).into_owned();

    Some(Request {
        method,
        target,
        headers,
        body,
    })
}

fn token() -> BearerToken {
    BearerToken::non_expiring("bearer-abc", TokenKind::Session)
}

fn org() -> Org {
    Org::new("urn:vcloud:org:1111", "tenant1")
}

const ORG_PAGE: &str = r#"{"resultTotal": 1, "values": [
    {"id": "urn:vcloud:org:1111", "name": "tenant1", "displayName": "Tenant One", "isEnabled": true}
]}"#;

const VDC_PAGE: &str = r#"{"resultTotal": 1, "values": [
    {"id": "urn:vcloud:vdc:2222", "name": "ovdc1", "org": {"id": "urn:vcloud:org:1111", "name": "tenant1"}}
]}"#;

#[tokio::test]
async fn test_refresh_token_exchanged_at_tenant_endpoint() {
    let stub = Stub::start(|_| {
        Reply::json(
            200,
            r#"{"access_token":"tenant-bearer","token_type":"API Token","expires_in":3600}"#,
        )
    })
    .await;

    let before = Utc::now();
    let token = stub
        .api("tenant1")
        .login_with_refresh_token("tenant1", "rt-123")
        .await
        .unwrap();

    assert_eq!(token.token(), "tenant-bearer");
    assert_eq!(token.kind(), TokenKind::ApiToken);
    let expires_at = token.expires_at().unwrap();
    assert!(expires_at >= before + chrono::Duration::seconds(3600));
    assert!(expires_at <= Utc::now() + chrono::Duration::seconds(3600));

    let request = stub.last();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path(), "/oauth/tenant/tenant1/token");
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    let form: HashMap<String, String> = url::form_urlencoded::parse(request.body.as_bytes())
        .into_owned()
        .collect();
    assert_eq!(form.get("grant_type").map(String::as_str), Some("refresh_token"));
    assert_eq!(form.get("refresh_token").map(String::as_str), Some("rt-123"));
}

#[tokio::test]
async fn test_sysadmin_refresh_token_uses_provider_endpoint() {
    let stub = Stub::start(|_| Reply::json(200, r#"{"access_token":"provider-bearer"}"#)).await;

    let token = stub
        .api("System")
        .login_with_refresh_token("System", "rt-provider")
        .await
        .unwrap();

    assert_eq!(stub.last().path(), "/oauth/provider/token");
    // No expires_in: the token carries no known expiry.
    assert!(token.expires_at().is_none());
}

#[tokio::test]
async fn test_rejected_refresh_token_is_api_error() {
    let stub = Stub::start(|_| Reply::json(400, r#"{"error":"invalid_grant"}"#)).await;

    let err = stub
        .api("tenant1")
        .login_with_refresh_token("tenant1", "revoked")
        .await
        .unwrap_err();

    match err {
        VcdError::Api { status, body, url } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
            assert!(url.ends_with("/oauth/tenant/tenant1/token"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_password_login_reads_access_token_header() {
    let stub = Stub::start(|_| {
        Reply::json(200, r#"{"id":"session-1"}"#)
            .header("X-VMWARE-VCLOUD-ACCESS-TOKEN", "session-bearer")
    })
    .await;

    let before = Utc::now();
    let token = stub
        .api("tenant1")
        .login_with_password("csi-user", "s3cret", "tenant1")
        .await
        .unwrap();

    assert_eq!(token.token(), "session-bearer");
    assert_eq!(token.kind(), TokenKind::Session);
    let expires_at = token.expires_at().unwrap();
    assert!(expires_at >= before + chrono::Duration::seconds(600));
    assert!(expires_at <= Utc::now() + chrono::Duration::seconds(600));

    let request = stub.last();
    assert_eq!(request.method, "POST");
    assert_eq!(request.path(), "/cloudapi/1.0.0/sessions");
    let expected = base64::engine::general_purpose::STANDARD.encode("csi-user@tenant1:s3cret");
    assert_eq!(
        request.header("authorization"),
        Some(format!("Basic {}", expected).as_str())
    );
}

#[tokio::test]
async fn test_sysadmin_password_login_uses_provider_sessions() {
    let stub = Stub::start(|_| {
        Reply::json(200, "{}").header("X-VMWARE-VCLOUD-ACCESS-TOKEN", "provider-session")
    })
    .await;

    stub.api("system")
        .login_with_password("administrator", "pw", "system")
        .await
        .unwrap();

    assert_eq!(stub.last().path(), "/cloudapi/1.0.0/sessions/provider");
}

#[tokio::test]
async fn test_password_login_without_access_token_header() {
    let stub = Stub::start(|_| Reply::json(200, "{}")).await;

    let err = stub
        .api("tenant1")
        .login_with_password("csi-user", "s3cret", "tenant1")
        .await
        .unwrap_err();

    assert!(matches!(err, VcdError::Other(_)));
    assert!(err.to_string().contains("X-VMWARE-VCLOUD-ACCESS-TOKEN"));
}

#[tokio::test]
async fn test_org_by_name_filter() {
    let stub = Stub::start(|_| Reply::json(200, ORG_PAGE)).await;

    let org = stub.api("tenant1").org_by_name("tenant1", &token()).await.unwrap();
    assert_eq!(org.id, "urn:vcloud:org:1111");
    assert_eq!(org.display_name, "Tenant One");

    let request = stub.last();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path(), "/cloudapi/1.0.0/orgs");
    assert_eq!(request.query("filter").as_deref(), Some("name==tenant1"));
    assert_eq!(request.header("authorization"), Some("Bearer bearer-abc"));
}

#[tokio::test]
async fn test_vdc_by_name_filter() {
    let stub = Stub::start(|_| Reply::json(200, VDC_PAGE)).await;

    let vdc = stub
        .api("tenant1")
        .vdc_by_name(&org(), "ovdc1", &token())
        .await
        .unwrap();
    assert_eq!(vdc.id, "urn:vcloud:vdc:2222");
    assert_eq!(vdc.org.name, "tenant1");

    let request = stub.last();
    assert_eq!(request.path(), "/cloudapi/1.0.0/vdcs");
    assert_eq!(
        request.query("filter").as_deref(),
        Some("name==ovdc1;org.id==urn:vcloud:org:1111")
    );
}

#[tokio::test]
async fn test_empty_page_is_not_found() {
    let stub = Stub::start(|_| Reply::json(200, r#"{"resultTotal": 0, "values": []}"#)).await;
    let api = stub.api("tenant1");

    let err = api.org_by_name("ghost", &token()).await.unwrap_err();
    assert!(matches!(err, VcdError::NotFound(_)));

    let err = api.vdc_by_name(&org(), "missing", &token()).await.unwrap_err();
    assert!(matches!(err, VcdError::NotFound(_)));
    assert!(err.to_string().contains("missing"));
}

#[tokio::test]
async fn test_org_by_urn() {
    let stub = Stub::start(|request| {
        if request.path() == "/cloudapi/1.0.0/orgs/urn:vcloud:org:1111" {
            Reply::json(200, r#"{"id": "urn:vcloud:org:1111", "name": "tenant1"}"#)
        } else {
            Reply::json(404, r#"{"message": "not found"}"#)
        }
    })
    .await;
    let api = stub.api("tenant1");

    let org = api
        .org_by_name_or_id("urn:vcloud:org:1111", &token())
        .await
        .unwrap();
    assert_eq!(org.name, "tenant1");

    let err = api
        .org_by_name_or_id("urn:vcloud:org:9999", &token())
        .await
        .unwrap_err();
    assert!(matches!(err, VcdError::NotFound(_)));
}

#[tokio::test]
async fn test_org_by_name_or_id_with_plain_name_queries() {
    let stub = Stub::start(|_| Reply::json(200, ORG_PAGE)).await;

    stub.api("tenant1")
        .org_by_name_or_id("tenant1", &token())
        .await
        .unwrap();

    assert_eq!(stub.last().query("filter").as_deref(), Some("name==tenant1"));
}

#[tokio::test]
async fn test_every_request_pins_version_and_request_id() {
    let stub = Stub::start(|request| {
        if request.path().starts_with("/oauth") {
            Reply::json(200, r#"{"access_token":"t","expires_in":60}"#)
        } else if request.method == "POST" {
            Reply::json(200, "{}").header("X-VMWARE-VCLOUD-ACCESS-TOKEN", "s")
        } else if request.path().ends_with("/vdcs") {
            Reply::json(200, VDC_PAGE)
        } else {
            Reply::json(200, ORG_PAGE)
        }
    })
    .await;
    let api = stub.api("tenant1");

    api.login_with_refresh_token("tenant1", "rt").await.unwrap();
    api.login_with_password("csi-user", "s3cret", "tenant1").await.unwrap();
    api.org_by_name("tenant1", &token()).await.unwrap();
    api.vdc_by_name(&org(), "ovdc1", &token()).await.unwrap();

    let requests = stub.requests();
    assert_eq!(requests.len(), 4);

    let mut ids = Vec::new();
    for request in &requests {
        assert_eq!(
            request.header("accept"),
            Some("application/json;version=36.0"),
            "{} {}",
            request.method,
            request.target
        );
        let id = request
            .header("x-vmware-vcloud-client-request-id")
            .expect("missing request id");
        ids.push(uuid::Uuid::parse_str(id).unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_unauthorized_lookup() {
    let stub = Stub::start(|_| Reply::json(401, r#"{"message": "expired"}"#)).await;

    let err = stub
        .api("tenant1")
        .org_by_name("tenant1", &token())
        .await
        .unwrap_err();

    assert!(matches!(err, VcdError::Api { status: 401, .. }));
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn test_malformed_body_is_json_error() {
    let stub = Stub::start(|_| Reply::json(200, "<html>maintenance</html>")).await;

    let err = stub
        .api("tenant1")
        .org_by_name("tenant1", &token())
        .await
        .unwrap_err();

    assert!(matches!(err, VcdError::Json(_)));
}

#[tokio::test]
async fn test_unreadable_error_body() {
    let stub = Stub::start(|_| Reply {
        declared_length: Some(4096),
        ..Reply::json(500, "partial")
    })
    .await;

    let err = stub
        .api("tenant1")
        .org_by_name("tenant1", &token())
        .await
        .unwrap_err();

    match err {
        VcdError::Api { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "<unreadable body>");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
