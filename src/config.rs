use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_verify_token")]
    pub verify_token: String,
    /// Page access token for outbound sends. Empty means sends will fail;
    /// the process still starts so the webhook can be verified.
    #[serde(default)]
    pub page_access_token: String,
    /// App secret for inbound signature checks. None disables verification.
    #[serde(default)]
    pub app_secret: Option<String>,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_graph_api_url")]
    pub graph_api_url: String,
}

fn default_port() -> u16 {
    3000
}
fn default_verify_token() -> String {
    "duet_verify_token_123".into()
}
fn default_database_url() -> String {
    "duet.db".into()
}
fn default_graph_api_url() -> String {
    "https://graph.facebook.com/v18.0".into()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("DUET"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            verify_token: default_verify_token(),
            page_access_token: String::new(),
            app_secret: None,
            database_url: ":memory:".into(),
            graph_api_url: default_graph_api_url(),
        }
    }
}
