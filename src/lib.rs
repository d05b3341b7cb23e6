use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod certificate;
pub mod config;
pub mod db;
pub mod flow;
pub mod render;

pub use crate::config::AppConfig;
pub use crate::db::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        certificate::routes::validate_certificates,
        certificate::routes::certificate_page,
        certificate::routes::verification_page,
        certificate::routes::search_certificates,
        certificate::routes::create_certificate,
        certificate::routes::get_certificate,
        certificate::routes::get_verification_code,
        certificate::routes::download_certificate,
        certificate::routes::list_certificates,
        certificate::routes::admin_create_certificate,
    ),
    components(
        schemas(
            certificate::Certificate,
            certificate::Estado,
            certificate::CertificateLinks,
            certificate::CreateCertificateRequest,
            certificate::routes::CertificateViewResponse,
            certificate::routes::LookupEntryResponse,
            render::VerificationCode,
            render::PageLayout,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Certificate Pages", description = "Lookup and verification entry points."),
        (name = "Certificate Service", description = "Certificate creation, display and export."),
        (name = "Certificate Admin", description = "Administrative listing and creation.")
    )
)]
pub struct ApiDoc;

pub async fn run() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    let bind = (config.bind_address.clone(), config.port);

    let app_state = match AppState::new_with_config(config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!(
                "Failed to initialize application state. Check the certificate template and asset settings. Error: {}",
                e
            );
            std::process::exit(1);
        }
    };

    let prometheus = match PrometheusMetricsBuilder::new("certificados_server")
        .endpoint("/metrics")
        .build()
    {
        Ok(prometheus) => prometheus,
        Err(e) => {
            log::error!("Failed to create Prometheus metrics middleware: {}", e);
            std::process::exit(1);
        }
    };

    let base_origin = app_state.config.cors_origin();
    if base_origin.is_none() {
        log::warn!(
            "Base URL '{}' has no browser origin; CORS allows only the local origins",
            app_state.config.base_url
        );
    }
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let mut cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .expose_headers(vec![header::CONTENT_DISPOSITION])
            .max_age(3600);
        if let Some(origin) = &base_origin {
            cors = cors.allowed_origin(origin);
        }

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .service(web::scope("/api").configure(certificate::routes::config))
            .configure(certificate::routes::pages_config)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(bind)?
    .run()
    .await
}
