use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use quoteform_core::config::EmailConfig;
use quoteform_core::errors::{DispatchError, SessionError};
use quoteform_core::{Catalog, CatalogKind, QuotationBuilder, QuoteSession, SessionState};
use quoteform_email::{EmailJsDispatcher, SEND_PATH};
use serde_json::Value;

#[derive(Clone)]
struct StubState {
    received: Arc<Mutex<Vec<Value>>>,
    status: StatusCode,
    body: &'static str,
}

async fn accept(
    State(state): State<StubState>,
    Json(payload): Json<Value>,
) -> (StatusCode, &'static str) {
    state.received.lock().expect("received lock").push(payload);
    (state.status, state.body)
}

async fn spawn_stub(status: StatusCode, body: &'static str) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(SEND_PATH, post(accept))
        .with_state(StubState { received: received.clone(), status, body });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let address = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });

    (format!("http://{address}"), received)
}

fn email_config(endpoint: &str, private_key: Option<&str>) -> EmailConfig {
    EmailConfig {
        service_id: "service_quote".to_string(),
        template_id: "template_quote".to_string(),
        public_key: "pk-test".to_string().into(),
        private_key: private_key.map(|key| key.to_string().into()),
        endpoint: endpoint.to_string(),
    }
}

fn generated_session() -> QuoteSession {
    let builder = QuotationBuilder::new(Catalog::builtin(CatalogKind::Categorized));
    let mut session = QuoteSession::new(builder, "£");
    session.set_customer_name("Jane Doe").expect("name");
    session.set_customer_email("jane@x.com").expect("email");
    session.select_category(0, Some("electrical".into())).expect("category");
    session.select_product(0, Some("product_electric_b".into())).expect("product");
    session.set_quantity(0, 2).expect("quantity");
    session.generate().expect("generate");
    session
}

#[tokio::test]
async fn successful_send_posts_template_params_and_resets_session() {
    let (endpoint, received) = spawn_stub(StatusCode::OK, "OK").await;
    let dispatcher = EmailJsDispatcher::new(&email_config(&endpoint, None)).expect("dispatcher");
    let mut session = generated_session();

    session.send(&dispatcher).await.expect("send succeeds");
    assert_eq!(session.state(), SessionState::Empty);

    let payloads = received.lock().expect("received lock").clone();
    assert_eq!(payloads.len(), 1);
    let payload = &payloads[0];
    assert_eq!(payload["service_id"], "service_quote");
    assert_eq!(payload["template_id"], "template_quote");
    assert_eq!(payload["user_id"], "pk-test");
    assert!(payload.get("accessToken").is_none());
    assert_eq!(payload["template_params"]["customer_name"], "Jane Doe");
    assert_eq!(payload["template_params"]["total_price"], "£500.00");
    assert_eq!(
        payload["template_params"]["products"],
        "Product: Premium Gizmo (Category: electrical), Quantity: 2, Unit Price: £250.00, Total Price: £500.00"
    );
    assert_eq!(payload["template_params"]["notes"], "No additional notes.");
}

#[tokio::test]
async fn private_key_is_sent_as_access_token() {
    let (endpoint, received) = spawn_stub(StatusCode::OK, "OK").await;
    let dispatcher =
        EmailJsDispatcher::new(&email_config(&endpoint, Some("sk-test"))).expect("dispatcher");
    let mut session = generated_session();

    session.send(&dispatcher).await.expect("send succeeds");

    let payloads = received.lock().expect("received lock").clone();
    assert_eq!(payloads[0]["accessToken"], "sk-test");
}

#[tokio::test]
async fn provider_rejection_keeps_quotation_for_retry() {
    let (rejecting, _) = spawn_stub(StatusCode::PAYMENT_REQUIRED, "insufficient credits").await;
    let (accepting, received) = spawn_stub(StatusCode::OK, "OK").await;
    let mut session = generated_session();
    let quotation = session.quotation().cloned().expect("quotation");

    let failing =
        EmailJsDispatcher::new(&email_config(&rejecting, None)).expect("failing dispatcher");
    let error = session.send(&failing).await.expect_err("provider rejects");

    assert_eq!(
        error,
        SessionError::Dispatch(DispatchError::Rejected {
            status: 402,
            message: "insufficient credits".to_string(),
        })
    );
    assert_eq!(session.state(), SessionState::SendFailed);
    assert_eq!(session.quotation(), Some(&quotation));
    assert_eq!(
        session.notice().map(|notice| notice.message.as_str()),
        Some("Failed to send email: insufficient credits")
    );

    let working =
        EmailJsDispatcher::new(&email_config(&accepting, None)).expect("working dispatcher");
    session.send(&working).await.expect("retry succeeds");
    assert_eq!(received.lock().expect("received lock").len(), 1);
    assert!(session.quotation().is_none());
}

#[tokio::test]
async fn empty_rejection_body_falls_back_to_generic_message() {
    let (endpoint, _) = spawn_stub(StatusCode::BAD_REQUEST, "").await;
    let dispatcher = EmailJsDispatcher::new(&email_config(&endpoint, None)).expect("dispatcher");
    let mut session = generated_session();

    let error = session.send(&dispatcher).await.expect_err("provider rejects");
    assert_eq!(error.notice().message, "Failed to send email: An unknown error occurred.");
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("address");
    drop(listener);

    let dispatcher = EmailJsDispatcher::new(&email_config(&format!("http://{address}"), None))
        .expect("dispatcher");
    let mut session = generated_session();

    let error = session.send(&dispatcher).await.expect_err("connection refused");
    assert!(matches!(error, SessionError::Dispatch(DispatchError::Transport(_))));
    assert_eq!(session.state(), SessionState::SendFailed);
}
