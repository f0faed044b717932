//! Ambient runtime state captured once per event and handed to the field
//! builder. The layer fills it from the enclosing spans; nothing here reads
//! global request or user state.

/// Span fields recognised as request and user attributes.
pub mod keys {
    pub const URL: &str = "http.url";
    pub const METHOD: &str = "http.method";
    pub const CLIENT_ADDRESS: &str = "client.address";
    pub const USER_AGENT: &str = "http.user_agent";
    pub const REFERER: &str = "http.referer";
    pub const USER_ID: &str = "user.id";
    pub const USER_EMAIL: &str = "user.email";

    pub const ALL: [&str; 7] = [URL, METHOD, CLIENT_ADDRESS, USER_AGENT, REFERER, USER_ID, USER_EMAIL];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    pub url: String,
    pub method: String,
    pub client_address: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
}

/// Read-only snapshot of the environment an event was emitted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    pub environment: String,
    /// `true` when not serving a request (console, background job).
    pub interactive: bool,
    pub request: Option<RequestInfo>,
    pub user: Option<AuthenticatedUser>,
    pub memory_usage: u64,
}

impl RuntimeContext {
    pub fn new(environment: impl Into<String>) -> Self {
        RuntimeContext {
            environment: environment.into(),
            interactive: true,
            request: None,
            user: None,
            memory_usage: 0,
        }
    }

    /// Attach a request; the context stops being interactive.
    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = Some(request);
        self.interactive = false;
        self
    }

    pub fn with_user(mut self, user: AuthenticatedUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_memory_usage(mut self, bytes: u64) -> Self {
        self.memory_usage = bytes;
        self
    }

    /// Build request/user attributes from span fields, keyed by [`keys`].
    pub fn from_span_fields<'a>(
        environment: impl Into<String>,
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> Self {
        let mut ctx = RuntimeContext::new(environment);

        let url = lookup(keys::URL);
        let method = lookup(keys::METHOD);
        if url.is_some() || method.is_some() {
            ctx = ctx.with_request(RequestInfo {
                url: url.unwrap_or_default().to_string(),
                method: method.unwrap_or_default().to_string(),
                client_address: lookup(keys::CLIENT_ADDRESS).map(str::to_string),
                user_agent: lookup(keys::USER_AGENT).map(str::to_string),
                referer: lookup(keys::REFERER).map(str::to_string),
            });
        }

        if let Some(id) = lookup(keys::USER_ID) {
            ctx = ctx.with_user(AuthenticatedUser {
                id: id.to_string(),
                email: lookup(keys::USER_EMAIL).map(str::to_string),
            });
        }

        ctx
    }
}

#[cfg(target_os = "linux")]
const PROC_STATUS_PATH: &str = "/proc/self/status";

/// Resident memory of the current process in bytes, or 0 when unknown.
#[cfg(target_os = "linux")]
pub fn process_memory_usage() -> u64 {
    std::fs::read_to_string(PROC_STATUS_PATH)
        .ok()
        .and_then(|status| parse_vm_rss(&status))
        .unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
pub fn process_memory_usage() -> u64 {
    0
}

// Line format: "VmRSS:	   12345 kB"
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb = line
        .trim_start_matches("VmRSS:")
        .split_whitespace()
        .next()?
        .parse::<u64>()
        .ok()?;
    Some(kb * 1024)
}
