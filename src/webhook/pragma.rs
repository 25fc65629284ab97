/// Rotating shared secret Ring echoes back in the `Pragma` header of every
/// webhook delivery. Only the most recently issued value is accepted.
#[derive(Debug, Default)]
pub struct WebhookAuthenticator {
    current: Option<String>,
}

impl WebhookAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new pragma, invalidating the previous one.
    pub fn issue_pragma(&mut self) -> String {
        let now = chrono::Utc::now();
        let pragma = format!(
            "{}.{:06}-{}",
            now.timestamp(),
            now.timestamp_subsec_micros(),
            uuid::Uuid::new_v4().simple()
        );
        tracing::info!("Pragma is set to {pragma}");
        self.current.insert(pragma).clone()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn validate(&self, received: &str) -> bool {
        self.current.as_deref() == Some(received)
    }
}
