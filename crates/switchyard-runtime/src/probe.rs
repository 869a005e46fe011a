//! HTTP connectivity probes.
//!
//! Each supported service gets one cheap authenticated call, usually its
//! "who am I" endpoint. Building the request ([`ProbePlan::build`]) and
//! reading the reply ([`ProbePlan::interpret`]) are pure; only
//! [`HttpConnectivityProbe`] touches the network.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Method};
use serde_json::Value;

use switchyard_core::{ConnectivityProbe, ProbeCredentials, ProbeOutcome};

/// Per-request timeout applied by the HTTP client.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const NOTION_VERSION: &str = "2022-06-28";

/// Base URLs of the probed services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEndpoints {
    pub stripe: String,
    pub github: String,
    pub slack: String,
    pub twilio: String,
    pub notion: String,
    /// Used when the credential set has no `SENTRY_BASE_URL`.
    pub sentry: String,
}

impl Default for ProbeEndpoints {
    fn default() -> Self {
        Self {
            stripe: "https://api.stripe.com".to_string(),
            github: "https://api.github.com".to_string(),
            slack: "https://slack.com".to_string(),
            twilio: "https://api.twilio.com".to_string(),
            notion: "https://api.notion.com".to_string(),
            sentry: "https://sentry.io".to_string(),
        }
    }
}

impl ProbeEndpoints {
    /// Every service at one base URL. Handy for local test servers.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            stripe: base.clone(),
            github: base.clone(),
            slack: base.clone(),
            twilio: base.clone(),
            notion: base.clone(),
            sentry: base,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reply {
    Supabase,
    Stripe,
    GithubUser,
    SlackAuth,
    TwilioAccount,
    NotionUser,
    SentryOrg,
}

/// A fully resolved probe request.
#[derive(Clone, PartialEq, Eq)]
pub struct ProbePlan {
    pub method: Method,
    pub url: String,
    headers: Vec<(&'static str, String)>,
    reply: Reply,
    /// Name reported when the service's reply omits one.
    fallback_name: String,
}

impl fmt::Debug for ProbePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(name, _)| *name).collect();
        f.debug_struct("ProbePlan")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &names)
            .field("reply", &self.reply)
            .finish_non_exhaustive()
    }
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

fn basic(user: &str, password: &str) -> (&'static str, String) {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
    ("Authorization", format!("Basic {encoded}"))
}

fn base(url: &str) -> &str {
    url.trim_end_matches('/')
}

impl ProbePlan {
    /// Plan the probe for `server_id`.
    ///
    /// `None` when the server has no probe. `Some(Err(_))` carries a failed
    /// outcome when fields the handshake needs are missing.
    pub fn build(
        server_id: &str,
        creds: &ProbeCredentials,
        endpoints: &ProbeEndpoints,
    ) -> Option<Result<Self, ProbeOutcome>> {
        let plan = match server_id {
            "supabase" => {
                let (Some(url), Some(key)) = (creds.get("SUPABASE_URL"), creds.get("SUPABASE_ANON_KEY"))
                else {
                    return Some(Err(missing_fields("SUPABASE_URL and SUPABASE_ANON_KEY")));
                };
                Self::get(format!("{}/rest/v1/", base(url)), Reply::Supabase)
                    .header(("apikey", key.to_string()))
            }
            "stripe" => {
                let Some(key) = creds.get("STRIPE_SECRET_KEY") else {
                    return Some(Err(missing_field("STRIPE_SECRET_KEY")));
                };
                Self::get(format!("{}/v1/balance", base(&endpoints.stripe)), Reply::Stripe)
                    .header(basic(key, ""))
            }
            "github" => {
                let Some(token) = creds.get("GITHUB_PERSONAL_ACCESS_TOKEN") else {
                    return Some(Err(missing_field("GITHUB_PERSONAL_ACCESS_TOKEN")));
                };
                Self::get(format!("{}/user", base(&endpoints.github)), Reply::GithubUser)
                    .header(bearer(token))
            }
            "slack" => {
                let Some(token) = creds.get("SLACK_BOT_TOKEN") else {
                    return Some(Err(missing_field("SLACK_BOT_TOKEN")));
                };
                Self {
                    method: Method::POST,
                    ..Self::get(format!("{}/api/auth.test", base(&endpoints.slack)), Reply::SlackAuth)
                }
                .header(bearer(token))
            }
            "twilio" => {
                let (Some(sid), Some(key), Some(secret)) = (
                    creds.get("TWILIO_ACCOUNT_SID"),
                    creds.get("TWILIO_API_KEY"),
                    creds.get("TWILIO_API_SECRET"),
                ) else {
                    return Some(Err(missing_fields(
                        "TWILIO_ACCOUNT_SID, TWILIO_API_KEY, TWILIO_API_SECRET",
                    )));
                };
                Self::get(
                    format!("{}/2010-04-01/Accounts/{sid}.json", base(&endpoints.twilio)),
                    Reply::TwilioAccount,
                )
                .header(basic(key, secret))
            }
            "notion" => {
                let Some(key) = creds.get("NOTION_API_KEY") else {
                    return Some(Err(missing_field("NOTION_API_KEY")));
                };
                Self::get(format!("{}/v1/users/me", base(&endpoints.notion)), Reply::NotionUser)
                    .header(bearer(key))
                    .header(("Notion-Version", NOTION_VERSION.to_string()))
            }
            "sentry" => {
                let (Some(token), Some(org)) = (creds.get("SENTRY_AUTH_TOKEN"), creds.get("SENTRY_ORG"))
                else {
                    return Some(Err(missing_fields("SENTRY_AUTH_TOKEN and SENTRY_ORG")));
                };
                let root = creds.get("SENTRY_BASE_URL").unwrap_or(endpoints.sentry.as_str());
                let mut plan = Self::get(
                    format!("{}/api/0/organizations/{org}/", base(root)),
                    Reply::SentryOrg,
                )
                .header(bearer(token));
                plan.fallback_name = org.to_string();
                plan
            }
            _ => return None,
        };
        Some(Ok(plan))
    }

    fn get(url: String, reply: Reply) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: Vec::new(),
            reply,
            fallback_name: "unknown".to_string(),
        }
    }

    fn header(mut self, header: (&'static str, String)) -> Self {
        self.headers.push(header);
        self
    }

    /// Header names, in the order they are sent.
    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().map(|(name, _)| *name)
    }

    /// Turn the service's reply into an outcome.
    pub fn interpret(&self, status: u16, body: Option<&Value>) -> ProbeOutcome {
        let field = |name: &str| body.and_then(|b| b.get(name)).and_then(Value::as_str);
        let name_or_fallback = |name: &str| field(name).unwrap_or(self.fallback_name.as_str()).to_string();
        let ok = status == 200;

        match self.reply {
            Reply::Supabase if ok => ProbeOutcome::ok("Successfully connected to Supabase"),
            Reply::Supabase => status_failure("Supabase", status),
            Reply::Stripe if ok => ProbeOutcome::ok("Successfully authenticated with Stripe"),
            Reply::Stripe => status_failure("Stripe", status),
            Reply::GithubUser if ok => {
                let login = name_or_fallback("login");
                ProbeOutcome::ok(format!("Authenticated as {login}")).with_detail("username", login)
            }
            Reply::GithubUser => status_failure("GitHub", status),
            Reply::SlackAuth => {
                if body.and_then(|b| b.get("ok")).and_then(Value::as_bool) == Some(true) {
                    let team = name_or_fallback("team");
                    let mut outcome = ProbeOutcome::ok(format!("Connected to workspace: {team}"))
                        .with_detail("team", team);
                    if let Some(user) = field("user") {
                        outcome = outcome.with_detail("user", user);
                    }
                    outcome
                } else {
                    let error = field("error").unwrap_or("unknown");
                    ProbeOutcome::failed(format!("Slack API error: {error}"))
                }
            }
            Reply::TwilioAccount if ok => {
                let name = name_or_fallback("friendly_name");
                ProbeOutcome::ok(format!("Connected to Twilio account: {name}"))
                    .with_detail("account_name", name)
            }
            Reply::TwilioAccount => status_failure("Twilio", status),
            Reply::NotionUser if ok => {
                let name = name_or_fallback("name");
                ProbeOutcome::ok(format!("Authenticated as {name}")).with_detail("user_name", name)
            }
            Reply::NotionUser => status_failure("Notion", status),
            Reply::SentryOrg if ok => {
                let name = name_or_fallback("name");
                ProbeOutcome::ok(format!("Connected to organization: {name}"))
                    .with_detail("org_name", name)
            }
            Reply::SentryOrg => status_failure("Sentry", status),
        }
    }
}

fn missing_field(key: &str) -> ProbeOutcome {
    ProbeOutcome::failed(format!("Missing {key}"))
}

fn missing_fields(keys: &str) -> ProbeOutcome {
    ProbeOutcome::failed(format!("Missing required fields: {keys}"))
}

fn status_failure(service: &str, status: u16) -> ProbeOutcome {
    ProbeOutcome::failed(format!("{service} API returned status {status}"))
}

/// Probe backed by reqwest.
pub struct HttpConnectivityProbe {
    client: Client,
    endpoints: ProbeEndpoints,
}

impl HttpConnectivityProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_endpoints(timeout, ProbeEndpoints::default())
    }

    pub fn with_endpoints(timeout: Duration, endpoints: ProbeEndpoints) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("switchyard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, endpoints })
    }

    async fn execute(&self, plan: &ProbePlan) -> ProbeOutcome {
        let mut request = self.client.request(plan.method.clone(), &plan.url);
        for (name, value) in &plan.headers {
            request = request.header(*name, value);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.json::<Value>().await.ok();
                plan.interpret(status, body.as_ref())
            }
            Err(e) => ProbeOutcome::failed(format!("Connection failed: {e}")),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn probe(&self, server_id: &str, credentials: &ProbeCredentials) -> ProbeOutcome {
        match ProbePlan::build(server_id, credentials, &self.endpoints) {
            None => ProbeOutcome::skipped(server_id),
            Some(Err(outcome)) => outcome,
            Some(Ok(plan)) => {
                tracing::debug!(server_id = %server_id, url = %plan.url, "Running connectivity check");
                self.execute(&plan).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use serde_json::json;
    use switchyard_core::SecretValue;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn creds(pairs: &[(&str, &str)]) -> ProbeCredentials {
        ProbeCredentials::new(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), SecretValue::new(*v)))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn plan(server_id: &str, pairs: &[(&str, &str)]) -> ProbePlan {
        ProbePlan::build(server_id, &creds(pairs), &ProbeEndpoints::default())
            .unwrap()
            .unwrap()
    }

    fn header<'a>(plan: &'a ProbePlan, name: &str) -> Option<&'a str> {
        plan.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_unknown_server_has_no_plan() {
        assert!(ProbePlan::build("tavily", &creds(&[]), &ProbeEndpoints::default()).is_none());
    }

    #[test]
    fn test_missing_fields_fail_before_any_request() {
        let outcome = ProbePlan::build("twilio", &creds(&[("TWILIO_ACCOUNT_SID", "AC1")]), &ProbeEndpoints::default())
            .unwrap()
            .unwrap_err();
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Missing required fields"));

        let outcome = ProbePlan::build("github", &creds(&[("GITHUB_PERSONAL_ACCESS_TOKEN", "")]), &ProbeEndpoints::default())
            .unwrap()
            .unwrap_err();
        assert_eq!(outcome.message, "Missing GITHUB_PERSONAL_ACCESS_TOKEN");
    }

    #[test]
    fn test_github_uses_bearer_token() {
        let p = plan("github", &[("GITHUB_PERSONAL_ACCESS_TOKEN", "ghp_x")]);
        assert_eq!(p.method, Method::GET);
        assert_eq!(p.url, "https://api.github.com/user");
        assert_eq!(header(&p, "Authorization"), Some("Bearer ghp_x"));
    }

    #[test]
    fn test_stripe_uses_basic_auth_with_empty_password() {
        let p = plan("stripe", &[("STRIPE_SECRET_KEY", "sk_test_1")]);
        assert_eq!(p.url, "https://api.stripe.com/v1/balance");
        // base64("sk_test_1:")
        assert_eq!(header(&p, "Authorization"), Some("Basic c2tfdGVzdF8xOg=="));
    }

    #[test]
    fn test_supabase_trims_trailing_slash() {
        let p = plan(
            "supabase",
            &[("SUPABASE_URL", "https://abc.supabase.co/"), ("SUPABASE_ANON_KEY", "eyJ")],
        );
        assert_eq!(p.url, "https://abc.supabase.co/rest/v1/");
        assert_eq!(header(&p, "apikey"), Some("eyJ"));
    }

    #[test]
    fn test_slack_posts() {
        let p = plan("slack", &[("SLACK_BOT_TOKEN", "xoxb-1")]);
        assert_eq!(p.method, Method::POST);
        assert_eq!(p.url, "https://slack.com/api/auth.test");
    }

    #[test]
    fn test_notion_sends_version_header() {
        let p = plan("notion", &[("NOTION_API_KEY", "secret_x")]);
        assert_eq!(p.header_names().collect::<Vec<_>>(), vec!["Authorization", "Notion-Version"]);
        assert_eq!(header(&p, "Notion-Version"), Some(NOTION_VERSION));
    }

    #[test]
    fn test_sentry_honours_self_hosted_base_url() {
        let p = plan(
            "sentry",
            &[
                ("SENTRY_AUTH_TOKEN", "sntrys_x"),
                ("SENTRY_ORG", "acme"),
                ("SENTRY_BASE_URL", "https://sentry.internal"),
            ],
        );
        assert_eq!(p.url, "https://sentry.internal/api/0/organizations/acme/");

        let outcome = p.interpret(200, Some(&json!({})));
        assert_eq!(outcome.message, "Connected to organization: acme");
    }

    #[test]
    fn test_debug_omits_header_values() {
        let p = plan("github", &[("GITHUB_PERSONAL_ACCESS_TOKEN", "ghp_secret")]);
        assert!(!format!("{p:?}").contains("ghp_secret"));
    }

    #[test]
    fn test_interpret_replies() {
        let github = plan("github", &[("GITHUB_PERSONAL_ACCESS_TOKEN", "t")]);
        let ok = github.interpret(200, Some(&json!({"login": "octocat"})));
        assert!(ok.success);
        assert_eq!(ok.message, "Authenticated as octocat");
        assert_eq!(ok.details["username"], "octocat");

        let denied = github.interpret(401, None);
        assert!(!denied.success);
        assert_eq!(denied.message, "GitHub API returned status 401");

        let slack = plan("slack", &[("SLACK_BOT_TOKEN", "t")]);
        let ok = slack.interpret(200, Some(&json!({"ok": true, "team": "Acme", "user": "bot"})));
        assert_eq!(ok.message, "Connected to workspace: Acme");
        assert_eq!(ok.details["user"], "bot");
        let err = slack.interpret(200, Some(&json!({"ok": false, "error": "invalid_auth"})));
        assert_eq!(err.message, "Slack API error: invalid_auth");
    }

    /// One-shot HTTP server answering with `body`; yields the raw request.
    async fn serve_once(body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let mut request = Vec::new();
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    #[tokio::test]
    async fn test_probe_round_trip_against_local_server() {
        let (base, server) = serve_once(r#"{"login":"octocat"}"#).await;
        let probe =
            HttpConnectivityProbe::with_endpoints(Duration::from_secs(5), ProbeEndpoints::all_at(&base))
                .unwrap();

        let outcome = probe
            .probe("github", &creds(&[("GITHUB_PERSONAL_ACCESS_TOKEN", "ghp_local")]))
            .await;
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.message, "Authenticated as octocat");

        let request = server.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /user "));
        assert!(request.contains("authorization: bearer ghp_local"));
    }

    #[tokio::test]
    async fn test_unreachable_service_fails() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = HttpConnectivityProbe::with_endpoints(
            Duration::from_secs(5),
            ProbeEndpoints::all_at(&format!("http://127.0.0.1:{port}")),
        )
        .unwrap();

        let outcome = probe
            .probe("stripe", &creds(&[("STRIPE_SECRET_KEY", "sk_test_1")]))
            .await;
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Connection failed"));
    }

    #[tokio::test]
    async fn test_servers_without_probe_are_skipped() {
        let probe = HttpConnectivityProbe::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let outcome = probe.probe("tavily", &creds(&[("TAVILY_API_KEY", "tvly-x")])).await;
        assert!(outcome.success);
        assert_eq!(outcome.message, ProbeOutcome::skipped("tavily").message);
    }
}
