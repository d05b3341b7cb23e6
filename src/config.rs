//! Runtime configuration loaded from the environment.
//!
//! The two store secrets are mandatory; everything else falls back to a
//! default so a local `.env` with just `SUPABASE_URL` and `SUPABASE_ANON_KEY`
//! is enough to boot.

use std::env;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Origin used to build the canonical verification links.
pub const DEFAULT_BASE_URL: &str = "https://certificados.example.cl";
pub const DEFAULT_TABLE: &str = "certificates";
pub const DEFAULT_SEDE: &str = "SEDE CENTRAL";
pub const DEFAULT_INSTITUTION_NAME: &str = "INSTITUCIÓN EMISORA";
pub const DEFAULT_CERTIFICATE_TITLE: &str = "CERTIFICADO";
pub const DEFAULT_CITY: &str = "Santiago (Chile)";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Institution identity printed on every document.
#[derive(Debug, Clone)]
pub struct Branding {
    pub institution_name: String,
    pub header_lines: Vec<String>,
    pub title: String,
    pub city: String,
    pub default_sede: String,
    pub logo_path: Option<PathBuf>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            institution_name: DEFAULT_INSTITUTION_NAME.to_string(),
            header_lines: Vec::new(),
            title: DEFAULT_CERTIFICATE_TITLE.to_string(),
            city: DEFAULT_CITY.to_string(),
            default_sede: DEFAULT_SEDE.to_string(),
            logo_path: None,
        }
    }
}

/// Settings for the Typst document pipeline.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub template_path: PathBuf,
    pub typst_bin: String,
    pub font_dir: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/",
                "static/certificado.typ"
            )),
            typst_bin: "typst".to_string(),
            font_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_key: String,
    pub table: String,
    pub base_url: String,
    pub bind_address: String,
    pub port: u16,
    pub branding: Branding,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Config with every optional setting at its default.
    pub fn new(supabase_url: impl Into<String>, supabase_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            supabase_key: supabase_key.into(),
            table: DEFAULT_TABLE.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            branding: Branding::default(),
            render: RenderConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let supabase_url = required("SUPABASE_URL")?;
        let supabase_key = required("SUPABASE_ANON_KEY")?;
        let mut config = Self::new(supabase_url, supabase_key);

        if let Some(base_url) = optional("CERTIFICATE_BASE_URL") {
            config.base_url = parse_base_url(&base_url)?;
        }
        if let Some(table) = optional("CERTIFICATE_TABLE") {
            config.table = table;
        }
        if let Some(address) = optional("BIND_ADDRESS") {
            config.bind_address = address;
        }
        if let Some(port) = optional("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: port.clone(),
            })?;
        }

        let branding = &mut config.branding;
        if let Some(name) = optional("INSTITUTION_NAME") {
            branding.institution_name = name;
        }
        if let Some(header) = optional("INSTITUTION_HEADER") {
            branding.header_lines = split_header(&header);
        }
        if let Some(title) = optional("CERTIFICATE_TITLE") {
            branding.title = title;
        }
        if let Some(city) = optional("CERTIFICATE_CITY") {
            branding.city = city;
        }
        if let Some(sede) = optional("DEFAULT_SEDE") {
            branding.default_sede = sede;
        }
        branding.logo_path = optional("CERTIFICATE_LOGO").map(PathBuf::from);

        let render = &mut config.render;
        if let Some(template) = optional("CERTIFICATE_TEMPLATE") {
            render.template_path = PathBuf::from(template);
        }
        if let Some(bin) = optional("TYPST_BIN") {
            render.typst_bin = bin;
        }
        render.font_dir = optional("TYPST_FONT_DIR").map(PathBuf::from);

        Ok(config)
    }

    /// Browser origin of `base_url` (scheme, host and port), the form CORS
    /// compares against. `None` when `base_url` is not an http(s) URL.
    pub fn cors_origin(&self) -> Option<String> {
        let url = Url::parse(&self.base_url).ok()?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return None;
        }
        Some(url.origin().ascii_serialization())
    }

    /// PostgREST endpoint of the hosted store.
    pub fn rest_endpoint(&self) -> String {
        format!("{}/rest/v1", self.supabase_url.trim_end_matches('/'))
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts an absolute `http` or `https` URL with a host and no query or
/// fragment. Trailing slashes are dropped so paths can be appended.
pub fn parse_base_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::Invalid {
        name: "CERTIFICATE_BASE_URL",
        value: raw.to_string(),
    };

    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|_| invalid())?;
    let has_host = url.host_str().is_some_and(|host| !host.is_empty());
    if !matches!(url.scheme(), "http" | "https")
        || !has_host
        || url.query().is_some()
        || url.fragment().is_some()
    {
        return Err(invalid());
    }

    Ok(trimmed.to_string())
}

/// Header lines are configured as one `|`-separated value.
pub fn split_header(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
