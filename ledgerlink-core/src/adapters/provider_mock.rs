//! Mock provider API server for testing
//!
//! A minimal HTTP server that simulates the Stripe and Xero endpoints the
//! adapters talk to, allowing protocol tests (token exchange, refresh
//! rotation, pagination, auth-failure-then-refresh) without real provider
//! accounts.
//!
//! Served surface:
//! - POST /oauth/token and POST /connect/token - token grant/rotation
//! - GET  /connections - Xero tenant discovery
//! - GET  /v1/balance_transactions - Stripe-style last-id pagination
//! - GET  /api.xro/2.0/BankTransactions - Xero-style page-number pagination
//! - GET  /v1/customers, /v1/subscriptions, /v1/products - aggregation inputs
//! - GET  /v1/charges, /v1/refunds - sales listings

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

use serde_json::{json, Value as JsonValue};

/// Configuration for mock data generation and failure injection
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Total balance transactions served by the payment ledger
    pub num_transactions: usize,
    /// Page size for the payment ledger
    pub page_limit: usize,
    /// Total bank transactions served by the accounting ledger
    pub num_bank_transactions: usize,
    /// Fail this many ledger fetches with 401 before succeeding
    pub fail_auth_times: u32,
    /// Reject all refresh attempts with invalid_grant
    pub fail_refresh: bool,
    /// Serve an empty Xero connections list
    pub no_connections: bool,
    /// Subscriptions as (customer id, product id, created unix ts)
    pub subscriptions: Vec<(String, String, i64)>,
    /// Products as (id, name)
    pub products: Vec<(String, String)>,
    /// Customer ids for the directory listing
    pub customers: Vec<String>,
    /// Charges served by /v1/charges
    pub num_charges: usize,
    /// Refunds served by /v1/refunds
    pub num_refunds: usize,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            num_transactions: 5,
            page_limit: 100,
            num_bank_transactions: 5,
            fail_auth_times: 0,
            fail_refresh: false,
            no_connections: false,
            subscriptions: Vec::new(),
            products: Vec::new(),
            customers: Vec::new(),
            num_charges: 2,
            num_refunds: 1,
        }
    }
}

/// Shared request counters, readable from tests
#[derive(Debug, Default)]
pub struct MockCounters {
    pub exchange_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    pub ledger_calls: AtomicU32,
}

struct MockState {
    config: MockConfig,
    counters: Arc<MockCounters>,
    auth_failures_remaining: AtomicU32,
    token_generation: AtomicU32,
}

/// Mock provider server for testing
pub struct MockProviderServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
    counters: Arc<MockCounters>,
}

impl MockProviderServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let counters = Arc::new(MockCounters::default());
        let state = Arc::new(MockState {
            auth_failures_remaining: AtomicU32::new(config.fail_auth_times),
            counters: counters.clone(),
            token_generation: AtomicU32::new(0),
            config,
        });

        // Non-blocking accept for graceful shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state.clone();
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
            counters,
        })
    }

    /// Base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Request counters for assertions
    pub fn counters(&self) -> &MockCounters {
        &self.counters
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockProviderServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Read one HTTP request; headers and body may arrive in separate segments
fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&raw);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);

            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }

        if raw.len() > 64 * 1024 {
            break;
        }
    }

    Some(String::from_utf8_lossy(&raw).to_string())
}

fn handle_connection(mut stream: TcpStream, state: &MockState) {
    let request = match read_request(&mut stream) {
        Some(request) if !request.is_empty() => request,
        _ => return,
    };

    let first_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", r#"{"error": "Invalid request"}"#);
        return;
    }

    let method = parts[0];
    let path = parts[1];
    let path_only = path.split('?').next().unwrap_or(path);
    let query = path.split('?').nth(1).unwrap_or("");
    let body = request.split("\r\n\r\n").nth(1).unwrap_or("");

    match (method, path_only) {
        ("POST", "/oauth/token") | ("POST", "/connect/token") => {
            handle_token(&mut stream, state, body)
        }
        ("GET", "/connections") => {
            if state.config.no_connections {
                send_json(&mut stream, 200, &json!([]));
            } else {
                send_json(&mut stream, 200, &json!([{ "tenantId": "tenant_mock" }]));
            }
        }
        ("GET", "/v1/balance_transactions") => handle_balance_transactions(&mut stream, state, query),
        ("GET", "/api.xro/2.0/BankTransactions") => handle_bank_transactions(&mut stream, state, query),
        ("GET", "/v1/customers") => {
            let data: Vec<JsonValue> = state
                .config
                .customers
                .iter()
                .map(|id| json!({ "id": id, "email": format!("{}@example.com", id) }))
                .collect();
            send_json(&mut stream, 200, &json!({ "object": "list", "data": data, "has_more": false }));
        }
        ("GET", "/v1/subscriptions") => {
            let data: Vec<JsonValue> = state
                .config
                .subscriptions
                .iter()
                .enumerate()
                .map(|(i, (customer, product, created))| {
                    json!({
                        "id": format!("sub_{}", i),
                        "customer": customer,
                        "created": created,
                        "items": { "data": [ { "price": { "product": product } } ] }
                    })
                })
                .collect();
            send_json(&mut stream, 200, &json!({ "object": "list", "data": data, "has_more": false }));
        }
        ("GET", "/v1/products") => {
            let data: Vec<JsonValue> = state
                .config
                .products
                .iter()
                .map(|(id, name)| json!({ "id": id, "name": name }))
                .collect();
            send_json(&mut stream, 200, &json!({ "object": "list", "data": data, "has_more": false }));
        }
        ("GET", "/v1/charges") => {
            let data: Vec<JsonValue> = (0..state.config.num_charges)
                .map(|i| {
                    json!({
                        "id": format!("ch_{}", i),
                        "amount": 2000 + i as i64,
                        "currency": "usd",
                        "status": "succeeded",
                        "description": format!("Order #{}", i),
                        "created": 1_700_000_000 + i as i64,
                        "customer": "cus_1",
                        "billing_details": { "email": "buyer@example.com" },
                        "payment_method_details": {
                            "type": "card",
                            "card": { "brand": "visa", "last4": "4242" }
                        }
                    })
                })
                .collect();
            send_json(&mut stream, 200, &json!({ "object": "list", "data": data, "has_more": false }));
        }
        ("GET", "/v1/refunds") => {
            let data: Vec<JsonValue> = (0..state.config.num_refunds)
                .map(|i| {
                    json!({
                        "id": format!("re_{}", i),
                        "amount": 500,
                        "currency": "usd",
                        "status": "succeeded",
                        "reason": "requested_by_customer",
                        "created": 1_700_000_000 + i as i64,
                        "payment_intent": format!("pi_{}", i)
                    })
                })
                .collect();
            send_json(&mut stream, 200, &json!({ "object": "list", "data": data, "has_more": false }));
        }
        _ => send_response(&mut stream, 404, "Not Found", r#"{"error": "Endpoint not found"}"#),
    }
}

fn handle_token(stream: &mut TcpStream, state: &MockState, body: &str) {
    let grant_type = form_value(body, "grant_type").unwrap_or_default();

    match grant_type.as_str() {
        "authorization_code" => {
            state.counters.exchange_calls.fetch_add(1, Ordering::SeqCst);
            if form_value(body, "code").as_deref() == Some("bad_code") {
                send_json(
                    stream,
                    400,
                    &json!({
                        "error": "invalid_grant",
                        "error_description": "Authorization code expired"
                    }),
                );
                return;
            }
            let generation = state.token_generation.load(Ordering::SeqCst);
            send_json(
                stream,
                200,
                &json!({
                    "access_token": format!("access_{}", generation),
                    "refresh_token": format!("refresh_{}", generation),
                    "stripe_user_id": "acct_mock"
                }),
            );
        }
        "refresh_token" => {
            state.counters.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if state.config.fail_refresh {
                send_json(
                    stream,
                    400,
                    &json!({
                        "error": "invalid_grant",
                        "error_description": "Refresh token revoked"
                    }),
                );
                return;
            }
            let generation = state.token_generation.fetch_add(1, Ordering::SeqCst) + 1;
            send_json(
                stream,
                200,
                &json!({
                    "access_token": format!("access_{}", generation),
                    "refresh_token": format!("refresh_{}", generation)
                }),
            );
        }
        _ => send_json(stream, 400, &json!({ "error": "unsupported_grant_type" })),
    }
}

fn handle_balance_transactions(stream: &mut TcpStream, state: &MockState, query: &str) {
    state.counters.ledger_calls.fetch_add(1, Ordering::SeqCst);

    if state.auth_failures_remaining.load(Ordering::SeqCst) > 0 {
        state.auth_failures_remaining.fetch_sub(1, Ordering::SeqCst);
        send_json(stream, 401, &json!({ "error": { "message": "Expired access token" } }));
        return;
    }

    let ids: Vec<String> = (0..state.config.num_transactions)
        .map(|i| format!("txn_{:03}", i))
        .collect();

    // Stripe cursor: records strictly after the given id
    let start = match query_value(query, "starting_after") {
        Some(cursor) => ids.iter().position(|id| *id == cursor).map(|p| p + 1).unwrap_or(0),
        None => 0,
    };
    let end = (start + state.config.page_limit).min(ids.len());

    let data: Vec<JsonValue> = ids[start..end]
        .iter()
        .enumerate()
        .map(|(offset, id)| {
            let index = start + offset;
            json!({
                "id": id,
                "amount": 1000 + index as i64,
                "currency": "usd",
                "created": 1_700_000_000 + index as i64,
                "description": format!("Payment {}", index),
                "status": "available",
                "type": "charge"
            })
        })
        .collect();

    send_json(
        stream,
        200,
        &json!({ "object": "list", "data": data, "has_more": end < ids.len() }),
    );
}

fn handle_bank_transactions(stream: &mut TcpStream, state: &MockState, query: &str) {
    state.counters.ledger_calls.fetch_add(1, Ordering::SeqCst);

    if state.auth_failures_remaining.load(Ordering::SeqCst) > 0 {
        state.auth_failures_remaining.fetch_sub(1, Ordering::SeqCst);
        send_json(stream, 401, &json!({ "Title": "Unauthorized" }));
        return;
    }

    let page: usize = query_value(query, "page")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let page_size = 100;
    let start = (page - 1) * page_size;
    let end = (start + page_size).min(state.config.num_bank_transactions);

    let data: Vec<JsonValue> = (start..end)
        .map(|i| {
            // Every tenth record is DELETED so filter behavior is observable
            let status = if i % 10 == 9 { "DELETED" } else { "AUTHORISED" };
            json!({
                "BankTransactionID": format!("bt_{:03}", i),
                "Type": if i % 2 == 0 { "RECEIVE" } else { "SPEND" },
                "Total": 50.0 + i as f64,
                "CurrencyCode": "NZD",
                "Status": status,
                "DateString": "2024-02-03T00:00:00",
                "Contact": { "Name": format!("Contact {}", i) }
            })
        })
        .collect();

    send_json(stream, 200, &json!({ "BankTransactions": data }));
}

fn form_value(body: &str, key: &str) -> Option<String> {
    body.split('&').find_map(|pair| {
        let mut split = pair.splitn(2, '=');
        if split.next() == Some(key) {
            split.next().map(|v| v.replace('+', " "))
        } else {
            None
        }
    })
}

fn query_value(query: &str, key: &str) -> Option<String> {
    form_value(query, key)
}

fn send_json(stream: &mut TcpStream, status: u16, body: &JsonValue) {
    let status_text = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        _ => "Error",
    };
    send_response(stream, status, status_text, &body.to_string());
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stripe::StripeAdapter;
    use crate::adapters::xero::XeroAdapter;
    use crate::config::{StripeConfig, XeroConfig};
    use crate::domain::result::Error;
    use crate::domain::{CredentialRecord, ProviderKind};
    use crate::ports::ProviderAdapter;

    fn stripe_for(server: &MockProviderServer) -> StripeAdapter {
        StripeAdapter::new(&StripeConfig {
            client_id: "ca_mock".to_string(),
            secret_key: "sk_mock".to_string(),
            redirect_uri: "http://localhost/cb".to_string(),
            connect_base_url: server.base_url(),
            api_base_url: server.base_url(),
        })
        .unwrap()
    }

    fn xero_for(server: &MockProviderServer) -> XeroAdapter {
        XeroAdapter::new(&XeroConfig {
            client_id: "xc_mock".to_string(),
            client_secret: "xs_mock".to_string(),
            redirect_uri: "http://localhost/xcb".to_string(),
            identity_base_url: server.base_url(),
            login_base_url: server.base_url(),
            api_base_url: server.base_url(),
        })
        .unwrap()
    }

    fn payment_creds() -> CredentialRecord {
        CredentialRecord::new(
            ProviderKind::Payment,
            "acct_mock".to_string(),
            "access_0".to_string(),
            "refresh_0".to_string(),
        )
    }

    fn accounting_creds() -> CredentialRecord {
        CredentialRecord::new(
            ProviderKind::Accounting,
            "tenant_mock".to_string(),
            "access_0".to_string(),
            "refresh_0".to_string(),
        )
    }

    #[tokio::test]
    async fn test_stripe_exchange_code() {
        let server = MockProviderServer::start(MockConfig::default()).unwrap();
        let adapter = stripe_for(&server);

        let grant = adapter.exchange_code("ac_valid").await.unwrap();

        assert_eq!(grant.access_token, "access_0");
        assert_eq!(grant.refresh_token, "refresh_0");
        assert_eq!(grant.account_id, "acct_mock");
        assert_eq!(server.counters().exchange_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stripe_exchange_carries_provider_description() {
        let server = MockProviderServer::start(MockConfig::default()).unwrap();
        let adapter = stripe_for(&server);

        let err = adapter.exchange_code("bad_code").await.unwrap_err();

        match err {
            Error::OAuthExchange(msg) => assert!(msg.contains("Authorization code expired")),
            other => panic!("expected OAuthExchange, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stripe_refresh_rotates_tokens() {
        let server = MockProviderServer::start(MockConfig::default()).unwrap();
        let adapter = stripe_for(&server);

        let pair = adapter.refresh_tokens("refresh_0").await.unwrap();
        assert_eq!(pair.access_token, "access_1");
        assert_eq!(pair.refresh_token, "refresh_1");

        let pair = adapter.refresh_tokens(&pair.refresh_token).await.unwrap();
        assert_eq!(pair.refresh_token, "refresh_2");
        assert_eq!(server.counters().refresh_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stripe_refresh_failure_is_terminal_error() {
        let server = MockProviderServer::start(MockConfig {
            fail_refresh: true,
            ..Default::default()
        })
        .unwrap();
        let adapter = stripe_for(&server);

        let err = adapter.refresh_tokens("refresh_0").await.unwrap_err();
        match err {
            Error::OAuthRefresh(msg) => assert!(msg.contains("Refresh token revoked")),
            other => panic!("expected OAuthRefresh, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stripe_ledger_pagination_walk() {
        let server = MockProviderServer::start(MockConfig {
            num_transactions: 250,
            page_limit: 100,
            ..Default::default()
        })
        .unwrap();
        let adapter = stripe_for(&server);
        let creds = payment_creds();

        let mut cursor: Option<String> = None;
        let mut all = Vec::new();
        let mut pages = 0;
        loop {
            let page = adapter
                .fetch_ledger_page(&creds, cursor.as_deref())
                .await
                .unwrap();
            pages += 1;
            all.extend(page.records);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(all.len(), 250);
        assert_eq!(all[0]["id"], "txn_000");
        assert_eq!(all[249]["id"], "txn_249");
        assert_eq!(server.counters().ledger_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stripe_ledger_auth_failure_surfaces_status() {
        let server = MockProviderServer::start(MockConfig {
            fail_auth_times: 1,
            ..Default::default()
        })
        .unwrap();
        let adapter = stripe_for(&server);

        let err = adapter
            .fetch_ledger_page(&payment_creds(), None)
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());

        // Next attempt succeeds once the failure budget is spent
        let page = adapter
            .fetch_ledger_page(&payment_creds(), None)
            .await
            .unwrap();
        assert_eq!(page.records.len(), 5);
    }

    #[tokio::test]
    async fn test_stripe_directory_listings() {
        let server = MockProviderServer::start(MockConfig {
            customers: vec!["cus_1".to_string(), "cus_2".to_string()],
            products: vec![("prod_1".to_string(), "Starter".to_string())],
            subscriptions: vec![("cus_1".to_string(), "prod_1".to_string(), 1_700_000_000)],
            ..Default::default()
        })
        .unwrap();
        let adapter = stripe_for(&server);
        let creds = payment_creds();

        let customers = adapter.list_customers(&creds).await.unwrap();
        assert_eq!(customers.len(), 2);

        let products = adapter.list_products(&creds).await.unwrap();
        assert_eq!(products[0].name, "Starter");

        let subscriptions = adapter.list_subscriptions(&creds).await.unwrap();
        assert_eq!(subscriptions[0].customer, "cus_1");
        assert_eq!(
            subscriptions[0].items.data[0]
                .price
                .as_ref()
                .unwrap()
                .product
                .as_deref(),
            Some("prod_1")
        );
    }

    #[tokio::test]
    async fn test_stripe_sales_listings() {
        let server = MockProviderServer::start(MockConfig {
            num_charges: 3,
            num_refunds: 2,
            ..Default::default()
        })
        .unwrap();
        let adapter = stripe_for(&server);

        let charges = adapter.list_charges(None).await.unwrap();
        assert_eq!(charges.len(), 3);
        assert_eq!(
            charges[0]
                .payment_method_details
                .as_ref()
                .unwrap()
                .card
                .as_ref()
                .unwrap()
                .brand,
            "visa"
        );

        let refunds = adapter.list_refunds().await.unwrap();
        assert_eq!(refunds.len(), 2);
        assert_eq!(refunds[0].reason.as_deref(), Some("requested_by_customer"));
    }

    #[tokio::test]
    async fn test_xero_exchange_resolves_tenant() {
        let server = MockProviderServer::start(MockConfig::default()).unwrap();
        let adapter = xero_for(&server);

        let grant = adapter.exchange_code("ac_valid").await.unwrap();

        assert_eq!(grant.account_id, "tenant_mock");
        assert_eq!(grant.access_token, "access_0");
    }

    #[tokio::test]
    async fn test_xero_exchange_fails_without_connections() {
        let server = MockProviderServer::start(MockConfig {
            no_connections: true,
            ..Default::default()
        })
        .unwrap();
        let adapter = xero_for(&server);

        let err = adapter.exchange_code("ac_valid").await.unwrap_err();
        match err {
            Error::OAuthExchange(msg) => assert!(msg.contains("No Xero organization connected")),
            other => panic!("expected OAuthExchange, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_xero_ledger_pagination_and_deleted_filter() {
        let server = MockProviderServer::start(MockConfig {
            num_bank_transactions: 150,
            ..Default::default()
        })
        .unwrap();
        let adapter = xero_for(&server);
        let creds = accounting_creds();

        let first = adapter.fetch_ledger_page(&creds, None).await.unwrap();
        // Full page of 100 raw records, 10 of them DELETED and filtered out
        assert_eq!(first.records.len(), 90);
        assert_eq!(first.next_cursor.as_deref(), Some("2"));

        let second = adapter
            .fetch_ledger_page(&creds, first.next_cursor.as_deref())
            .await
            .unwrap();
        // Short page ends the walk
        assert_eq!(second.records.len(), 45);
        assert!(second.next_cursor.is_none());

        assert!(first
            .records
            .iter()
            .chain(second.records.iter())
            .all(|r| r["Status"] != "DELETED"));
    }
}
