use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Where the storefront pages live; checkout redirects land here.
    pub public_url: String,
    pub admin_email: Option<String>,
    pub auth_jwt_secret: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub shipping_countries: Vec<String>,
    pub nats_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port = match optional("PORT") {
            Some(p) => p.parse().map_err(|_| ConfigError::Invalid { name: "PORT", value: p })?,
            None => 8083,
        };

        Ok(Self {
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: required("DATABASE_URL")?,
            public_url: optional("PUBLIC_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            admin_email: optional("ADMIN_EMAIL"),
            auth_jwt_secret: required("AUTH_JWT_SECRET")?,
            stripe_secret_key: optional("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            resend_api_key: optional("RESEND_API_KEY"),
            email_from: optional("EMAIL_FROM")
                .unwrap_or_else(|| "CasePython <support@kraito.com>".to_string()),
            shipping_countries: parse_countries(optional("SHIPPING_COUNTRIES").as_deref().unwrap_or("DE,US")),
            nats_url: optional("NATS_URL"),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Case-insensitive match against the configured administrator address.
    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}

impl Default for Config {
    /// Local development settings; secrets are left empty.
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8083,
            database_url: String::new(),
            public_url: "http://localhost:3000".to_string(),
            admin_email: None,
            auth_jwt_secret: String::new(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            resend_api_key: None,
            email_from: "CasePython <support@kraito.com>".to_string(),
            shipping_countries: vec!["DE".to_string(), "US".to_string()],
            nats_url: None,
        }
    }
}

fn parse_countries(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .collect()
}
