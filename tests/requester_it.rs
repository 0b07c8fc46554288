mod common;

// std
use std::{collections::HashMap, future::Future, io, pin::Pin, sync::Arc};
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		HeaderName, HeaderValue, Method,
		header::{AUTHORIZATION, CONTENT_TYPE},
	},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
// self
use common::*;
use signup_broker::{
	clock::ManualClock,
	error::Error,
	flows::{TokenClient, TokenClientSettings},
	http::{HttpTransport, ResponseMetadata, ResponseMetadataSlot},
	requester::{AuthenticatedRequester, RequestOptions},
	store::MemoryStore,
};

const AUTH_URL: &str = "https://auth.test/oauth2/token";
const API_BASE: &str = "https://api.test";

#[derive(Clone, Debug)]
struct Recorded {
	method: Method,
	uri: String,
	authorization: Option<String>,
	content_type: Option<String>,
	body: Vec<u8>,
}

/// In-process transport answering by request path and recording everything it sees.
#[derive(Clone, Default)]
struct RecordingTransport {
	routes: Arc<Mutex<HashMap<String, (u16, Value)>>>,
	requests: Arc<Mutex<Vec<Recorded>>>,
}
impl RecordingTransport {
	fn route(self, path: &str, status: u16, body: Value) -> Self {
		self.routes.lock().insert(path.into(), (status, body));

		self
	}

	fn requests_to(&self, path: &str) -> Vec<Recorded> {
		self.requests.lock().iter().filter(|r| r.uri.ends_with(path)).cloned().collect()
	}
}
impl HttpTransport for RecordingTransport {
	type Handle = RecordingHandle;
	type TransportError = io::Error;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		RecordingHandle { transport: self.clone(), slot }
	}
}

struct RecordingHandle {
	transport: RecordingTransport,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for RecordingHandle {
	type Error = HttpClientError<io::Error>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let recorded = Recorded {
				method: request.method().clone(),
				uri: request.uri().to_string(),
				authorization: header_value(&request, AUTHORIZATION),
				content_type: header_value(&request, CONTENT_TYPE),
				body: request.body().clone(),
			};
			let path = request.uri().path().to_owned();

			self.transport.requests.lock().push(recorded);

			let (status, body) = self
				.transport
				.routes
				.lock()
				.get(&path)
				.cloned()
				.unwrap_or((404, json!({ "detail": "Not Found" })));

			self.slot.store(ResponseMetadata { status: Some(status) });

			let response = oauth2::http::Response::builder()
				.status(status)
				.header(CONTENT_TYPE, "application/json")
				.body(serde_json::to_vec(&body).expect("Route body should serialize."))
				.expect("Fake response should build.");

			Ok(response)
		})
	}
}

fn header_value(request: &HttpRequest, name: HeaderName) -> Option<String> {
	request.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
}

fn token_client(transport: &RecordingTransport) -> Arc<TokenClient<RecordingTransport>> {
	let settings = TokenClientSettings::new(
		url(AUTH_URL),
		CLIENT_ID,
		CLIENT_SECRET,
		url(&format!("{API_BASE}{REFRESH_PATH}")),
	)
	.scope(SCOPE)
	.redirect_uri(url(REDIRECT_URI));
	let client = TokenClient::<RecordingTransport>::with_http_client(
		Arc::new(MemoryStore::default()),
		settings,
		transport.clone(),
	)
	.with_clock(Arc::new(ManualClock::at_unix(0)));

	Arc::new(client)
}

#[tokio::test]
async fn bearer_replaces_caller_authorization_header() {
	let issued = jwt_with_exp(3_600);
	let transport = RecordingTransport::default()
		.route("/oauth2/token", 200, token_grant(&issued, 3_600))
		.route("/api/items", 200, json!({ "items": [1, 2] }));
	let client = token_client(&transport);
	let requester = AuthenticatedRequester::new(client.clone());
	let options = RequestOptions::get()
		.header(AUTHORIZATION, HeaderValue::from_static("Bearer stale-token"));
	let body: Value = requester
		.request(&url(&format!("{API_BASE}/api/items")), options)
		.await
		.expect("Authenticated GET should succeed.");

	assert_eq!(body, json!({ "items": [1, 2] }));

	let calls = transport.requests_to("/api/items");

	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].method, Method::GET);
	assert_eq!(calls[0].authorization.as_deref(), Some(format!("Bearer {issued}").as_str()));
	assert_eq!(
		client.get_valid_token().await.expect("Cached token should be returned.").expose(),
		issued
	);
	assert_eq!(transport.requests_to("/oauth2/token").len(), 1);
}

#[tokio::test]
async fn acquisition_posts_client_credentials_form() {
	let transport = RecordingTransport::default().route(
		"/oauth2/token",
		200,
		token_grant(&jwt_with_exp(3_600), 3_600),
	);
	let client = token_client(&transport);

	client.get_valid_token().await.expect("Acquisition should succeed.");

	let calls = transport.requests_to("/oauth2/token");

	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].method, Method::POST);
	assert_eq!(calls[0].content_type.as_deref(), Some("application/x-www-form-urlencoded"));

	let form: HashMap<String, String> =
		url::form_urlencoded::parse(&calls[0].body).into_owned().collect();

	assert_eq!(form.get("grant_type").map(String::as_str), Some("client_credentials"));
	assert_eq!(form.get("client_id").map(String::as_str), Some(CLIENT_ID));
	assert_eq!(form.get("client_secret").map(String::as_str), Some(CLIENT_SECRET));
	assert_eq!(form.get("scope").map(String::as_str), Some(SCOPE));
	assert_eq!(form.get("redirect_uri").map(String::as_str), Some(REDIRECT_URI));
}

#[tokio::test]
async fn non_success_response_is_returned_without_retry() {
	let transport = RecordingTransport::default()
		.route("/oauth2/token", 200, token_grant(&jwt_with_exp(3_600), 3_600))
		.route("/api/flaky", 503, json!({ "detail": "Service Unavailable" }));
	let requester = AuthenticatedRequester::new(token_client(&transport));
	let err = requester
		.request::<Value>(&url(&format!("{API_BASE}/api/flaky")), RequestOptions::get())
		.await
		.expect_err("503 should surface as an error.");

	match err {
		Error::Http(e) => {
			assert_eq!(e.status, 503);
			assert_eq!(e.message(), "Service Unavailable");
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	assert_eq!(transport.requests_to("/api/flaky").len(), 1);
}

#[tokio::test]
async fn json_body_is_sent_with_content_type() {
	let transport = RecordingTransport::default()
		.route("/oauth2/token", 200, token_grant(&jwt_with_exp(3_600), 3_600))
		.route("/api/notes", 201, json!({ "id": 7 }));
	let requester = AuthenticatedRequester::new(token_client(&transport));
	let options =
		RequestOptions::post(&json!({ "text": "hello" })).expect("Body should serialize.");
	let created: Value = requester
		.request(&url(&format!("{API_BASE}/api/notes")), options)
		.await
		.expect("Authenticated POST should succeed.");

	assert_eq!(created["id"], 7);

	let calls = transport.requests_to("/api/notes");

	assert_eq!(calls[0].method, Method::POST);
	assert_eq!(calls[0].content_type.as_deref(), Some("application/json"));
	assert_eq!(
		serde_json::from_slice::<Value>(&calls[0].body).expect("Body should be JSON."),
		json!({ "text": "hello" })
	);
}
