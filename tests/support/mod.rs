#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use statement_mailer::config::MailConfig;
use statement_mailer::error::{Error, Result};
use statement_mailer::notify::{MailTransport, Notifier, OutboundMessage};
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_PATH: &str = "/service/rest/v7/login";
pub const LOGOUT_PATH: &str = "/service/rest/v7/logout";

pub const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html><head><script>
  window.qander = {
      'login': '/service/rest/v7/login',
      logout : '/service/rest/v7/logout',
      urlDone: '/service/secure/overview.jsp',
      recaptchaSitekey: '6LcTestKey'
  };
</script></head><body><form id="login"></form></body></html>
"#;

/// Statements page listing `20230101/abc` and `20230201/def`.
pub const TWO_STATEMENTS_PAGE: &str = r#"<table>
<tr><td>januari 2023</td><td><a href="/service/rest/statements/20230101/abc/downloadPdf">PDF</a></td></tr>
<tr><td>februari 2023</td><td><a href="/service/rest/statements/20230201/def/downloadPdf">PDF</a></td></tr>
</table>"#;

pub fn download_path(date: &str, hash: &str) -> String {
    format!("/service/rest/statements/{date}/{hash}/downloadPdf")
}

pub fn pdf_bytes(tag: &str) -> Vec<u8> {
    format!("%PDF-1.4 {tag}").into_bytes()
}

/// Mail transport that keeps every message it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Mail transport whose every send fails.
pub struct FailingTransport;

#[async_trait]
impl MailTransport for FailingTransport {
    async fn send(&self, _message: &OutboundMessage) -> Result<()> {
        Err(Error::NoRecipients)
    }
}

pub fn notifier(transport: impl MailTransport + 'static) -> Notifier {
    Notifier::new(
        MailConfig::default(),
        vec!["owner@example.com".to_string()],
        Box::new(transport),
    )
}

/// Login page that hands out a pre-login cookie.
pub async fn mount_login_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/service/login.jsp"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "JSESSIONID=pre; Path=/")
                .set_body_raw(LOGIN_PAGE, "text/html"),
        )
        .mount(server)
        .await;
}

/// Login endpoint that requires the pre-login cookie and grants an auth cookie.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(header_regex("cookie", "JSESSIONID=pre"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "QAUTH=granted; Path=/; HttpOnly")
                .set_body_raw(r#"{"status":"OK"}"#, "application/json"),
        )
        .expect(1)
        .mount(server)
        .await;
}

pub async fn mount_statements_page(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/service/secure/statements.jsp"))
        .and(header_regex("cookie", "QAUTH=granted"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

pub async fn mount_download(server: &MockServer, date: &str, hash: &str, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(download_path(date, hash)))
        .and(header_regex("cookie", "QAUTH=granted"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(pdf_bytes(hash), "application/pdf"),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_logout(server: &MockServer, status: u16, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .respond_with(ResponseTemplate::new(status))
        .expect(expected_calls)
        .mount(server)
        .await;
}
