use actix_web::http::header;
use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::certificate::{Certificate, CertificateLinks, CreateCertificateRequest, IdPolicy};
use crate::flow::{CertificateView, CreationFlow, DisplayFlow, FlowError, LookupFlow};
use crate::render::qr::{DEFAULT_CODE_SIZE_PX, MAX_CODE_SIZE_PX};
use crate::render::{render_standalone_code, PageLayout, VerificationCode};
use crate::{AppState, ErrorResponse};

pub const LOOKUP_PATH: &str = "/ValidacionCertificados";
pub const LOOKUP_PROMPT: &str = "Ingrese su RUN para buscar sus certificados";

#[derive(Debug, Deserialize)]
pub struct RutQuery {
    pub rut: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CodeQuery {
    pub size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentQuery {
    pub layout: Option<PageLayout>,
}

/// What the certificate page shows.
#[derive(Debug, Serialize, ToSchema)]
pub struct CertificateViewResponse {
    pub certificate: Certificate,
    /// Sede printed on the document, with the configured default applied.
    pub sede: String,
    #[schema(example = "16-03-2024")]
    pub issued_on: String,
    #[schema(example = "16/3/2024")]
    pub issued_on_short: String,
    pub verification_code: VerificationCode,
    /// The verification code as a `data:image/png;base64,` URL.
    pub qr_data_url: String,
}

impl CertificateViewResponse {
    fn new(view: CertificateView, default_sede: &str) -> Self {
        Self {
            sede: view.certificate.sede_or(default_sede).to_string(),
            qr_data_url: view.code.data_url(),
            certificate: view.certificate,
            issued_on: view.issued_on,
            issued_on_short: view.issued_on_short,
            verification_code: view.code,
        }
    }
}

/// What the lookup page shows before a RUN is submitted.
#[derive(Debug, Serialize, ToSchema)]
pub struct LookupEntryResponse {
    #[schema(example = "Ingrese su RUN para buscar sus certificados")]
    pub message: String,
    /// Page search, append the RUN.
    #[schema(example = "/ValidacionCertificados?rut=")]
    pub lookup_page: String,
    /// JSON search, append the RUN.
    #[schema(example = "/api/certificates?rut=")]
    pub lookup_api: String,
    /// `POST` target for new certificates.
    #[schema(example = "/api/certificates")]
    pub create: String,
}

impl Default for LookupEntryResponse {
    fn default() -> Self {
        Self {
            message: LOOKUP_PROMPT.to_string(),
            lookup_page: format!("{}?rut=", LOOKUP_PATH),
            lookup_api: "/api/certificates?rut=".to_string(),
            create: "/api/certificates".to_string(),
        }
    }
}

pub fn flow_error_response(err: FlowError) -> HttpResponse {
    let body = ErrorResponse::new(err.kind(), &err.to_string());
    match err {
        FlowError::Validation(_) => HttpResponse::BadRequest().json(body),
        FlowError::NotFound(_) => HttpResponse::NotFound().json(body),
        FlowError::NotReady => HttpResponse::Conflict().json(body),
        FlowError::Creation(_) | FlowError::Fetch(_) | FlowError::Render(_) => {
            HttpResponse::InternalServerError().json(body)
        }
    }
}

async fn display(state: &AppState, raw_id: &str) -> HttpResponse {
    let mut flow = DisplayFlow::new(state.repository.clone());
    match flow.load(raw_id).await {
        Ok(view) => HttpResponse::Ok().json(CertificateViewResponse::new(
            view,
            state.repository.default_sede(),
        )),
        Err(e) => flow_error_response(e),
    }
}

/// An absent `rut` is the idle page. Only a submitted value is validated,
/// so `?rut=` with nothing after it is still a 400.
async fn search(state: &AppState, rut: Option<&str>) -> HttpResponse {
    let Some(rut) = rut else {
        return HttpResponse::Ok().json(LookupEntryResponse::default());
    };

    let mut flow = LookupFlow::new(state.repository.clone());
    match flow.submit(rut).await {
        Ok(certificates) => HttpResponse::Ok().json(certificates),
        Err(e) => flow_error_response(e),
    }
}

async fn create(
    state: &AppState,
    request: &CreateCertificateRequest,
    policy: IdPolicy,
) -> HttpResponse {
    let mut flow = CreationFlow::new(state.repository.clone(), policy);
    match flow.submit(request).await {
        Ok(links) => HttpResponse::Created().json(links),
        Err(e) => flow_error_response(e),
    }
}

pub async fn redirect_to_lookup() -> impl Responder {
    HttpResponse::Found()
        .insert_header((header::LOCATION, LOOKUP_PATH))
        .finish()
}

#[utoipa::path(
    get,
    path = "/ValidacionCertificados",
    tag = "Certificate Pages",
    params(
        ("rut" = Option<String>, Query, description = "RUN to search, with or without dots and hyphen")
    ),
    responses(
        (status = 200, description = "Certificates issued to the RUN. Without `rut`, a `LookupEntryResponse` describing the search", body = Vec<Certificate>),
        (status = 400, description = "Empty or malformed RUN", body = ErrorResponse),
        (status = 404, description = "No certificates for the RUN", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    )
)]
pub async fn validate_certificates(
    state: web::Data<AppState>,
    query: web::Query<RutQuery>,
) -> impl Responder {
    search(&state, query.rut.as_deref()).await
}

#[utoipa::path(
    get,
    path = "/certificado/{id}",
    tag = "Certificate Pages",
    params(
        ("id" = String, Path, description = "Certificate id")
    ),
    responses(
        (status = 200, description = "Certificate found", body = CertificateViewResponse),
        (status = 404, description = "Certificate not found", body = ErrorResponse)
    )
)]
pub async fn certificate_page(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    display(&state, &path.into_inner()).await
}

#[utoipa::path(
    get,
    path = "/ValidacionQr",
    tag = "Certificate Pages",
    params(
        ("id" = Option<String>, Query, description = "Certificate id encoded in the verification code")
    ),
    responses(
        (status = 200, description = "Certificate found", body = CertificateViewResponse),
        (status = 404, description = "Certificate not found", body = ErrorResponse)
    )
)]
pub async fn verification_page(
    state: web::Data<AppState>,
    query: web::Query<IdQuery>,
) -> impl Responder {
    display(&state, query.id.as_deref().unwrap_or_default()).await
}

#[utoipa::path(
    get,
    path = "/api/certificates",
    tag = "Certificate Service",
    params(
        ("rut" = Option<String>, Query, description = "RUN to search")
    ),
    responses(
        (status = 200, description = "Certificates issued to the RUN. Without `rut`, a `LookupEntryResponse` describing the search", body = Vec<Certificate>),
        (status = 400, description = "Empty or malformed RUN", body = ErrorResponse),
        (status = 404, description = "No certificates for the RUN", body = ErrorResponse)
    )
)]
pub async fn search_certificates(
    state: web::Data<AppState>,
    query: web::Query<RutQuery>,
) -> impl Responder {
    search(&state, query.rut.as_deref()).await
}

#[utoipa::path(
    post,
    path = "/api/certificates",
    tag = "Certificate Service",
    request_body = CreateCertificateRequest,
    responses(
        (status = 201, description = "Certificate created", body = CertificateLinks),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Store rejected the insert", body = ErrorResponse)
    )
)]
pub async fn create_certificate(
    state: web::Data<AppState>,
    item: web::Json<CreateCertificateRequest>,
) -> impl Responder {
    create(&state, &item, IdPolicy::Random).await
}

#[utoipa::path(
    get,
    path = "/api/certificates/{id}",
    tag = "Certificate Service",
    params(
        ("id" = String, Path, description = "Certificate id")
    ),
    responses(
        (status = 200, description = "Certificate found", body = CertificateViewResponse),
        (status = 404, description = "Certificate not found", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    )
)]
pub async fn get_certificate(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    display(&state, &path.into_inner()).await
}

#[utoipa::path(
    get,
    path = "/api/certificates/{id}/qr.png",
    tag = "Certificate Service",
    params(
        ("id" = String, Path, description = "Certificate id"),
        ("size" = Option<u32>, Query, description = "Minimum width in pixels including the quiet zone, 120 by default")
    ),
    responses(
        (status = 200, description = "Verification code as image/png"),
        (status = 404, description = "Certificate not found", body = ErrorResponse)
    )
)]
pub async fn get_verification_code(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CodeQuery>,
) -> impl Responder {
    let mut flow = DisplayFlow::new(state.repository.clone());
    let view = match flow.load(&path.into_inner()).await {
        Ok(view) => view,
        Err(e) => return flow_error_response(e),
    };

    let size = query
        .size
        .unwrap_or(DEFAULT_CODE_SIZE_PX)
        .min(MAX_CODE_SIZE_PX);

    match render_standalone_code(&view.code.url, size) {
        Ok(code) => HttpResponse::Ok().content_type("image/png").body(code.png),
        Err(e) => flow_error_response(e.into()),
    }
}

#[utoipa::path(
    get,
    path = "/api/certificates/{id}/pdf",
    tag = "Certificate Service",
    params(
        ("id" = String, Path, description = "Certificate id"),
        ("layout" = Option<PageLayout>, Query, description = "`standard` (default) or `compact`")
    ),
    responses(
        (status = 200, description = "Certificate document as application/pdf attachment"),
        (status = 404, description = "Certificate not found", body = ErrorResponse),
        (status = 500, description = "Export failed", body = ErrorResponse)
    )
)]
pub async fn download_certificate(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<DocumentQuery>,
) -> impl Responder {
    let mut flow = DisplayFlow::new(state.repository.clone());
    if let Err(e) = flow.load(&path.into_inner()).await {
        return flow_error_response(e);
    }

    let layout = query.layout.unwrap_or_default();
    match flow.download(&state.renderer, layout).await {
        Ok(document) => HttpResponse::Ok()
            .content_type("application/pdf")
            .insert_header((
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ))
            .body(document.pdf),
        Err(e) => flow_error_response(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/certificates",
    tag = "Certificate Admin",
    responses(
        (status = 200, description = "Every certificate, newest first", body = Vec<Certificate>),
        (status = 500, description = "Store error", body = ErrorResponse)
    )
)]
pub async fn list_certificates(state: web::Data<AppState>) -> impl Responder {
    match state.repository.list_all().await {
        Ok(certificates) => HttpResponse::Ok().json(certificates),
        Err(e) => flow_error_response(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/api/admin/certificates",
    tag = "Certificate Admin",
    request_body = CreateCertificateRequest,
    responses(
        (status = 201, description = "Certificate created with a store-assigned id", body = CertificateLinks),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Store rejected the insert", body = ErrorResponse)
    )
)]
pub async fn admin_create_certificate(
    state: web::Data<AppState>,
    item: web::Json<CreateCertificateRequest>,
) -> impl Responder {
    create(&state, &item, IdPolicy::Sequential).await
}

/// Page routes at the root of the app.
pub fn pages_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(redirect_to_lookup)))
        .service(web::resource(LOOKUP_PATH).route(web::get().to(validate_certificates)))
        .service(web::resource("/certificado/{id}").route(web::get().to(certificate_page)))
        .service(web::resource("/ValidacionQr").route(web::get().to(verification_page)));
}

/// JSON API routes, mounted under `/api`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/certificates")
            .route(web::get().to(search_certificates))
            .route(web::post().to(create_certificate)),
    )
    .service(web::resource("/certificates/{id}").route(web::get().to(get_certificate)))
    .service(
        web::resource("/certificates/{id}/qr.png").route(web::get().to(get_verification_code)),
    )
    .service(web::resource("/certificates/{id}/pdf").route(web::get().to(download_certificate)))
    .service(
        web::resource("/admin/certificates")
            .route(web::get().to(list_certificates))
            .route(web::post().to(admin_create_certificate)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::validation::ValidationErrors;

    #[test]
    fn test_flow_errors_map_to_status_codes() {
        use actix_web::http::StatusCode;

        let cases = [
            (FlowError::Validation(ValidationErrors::new()), StatusCode::BAD_REQUEST),
            (FlowError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (FlowError::Creation("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (FlowError::Fetch("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (FlowError::Render("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (FlowError::NotReady, StatusCode::CONFLICT),
        ];

        for (err, status) in cases {
            assert_eq!(flow_error_response(err).status(), status);
        }
    }
}
