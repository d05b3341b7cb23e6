//! Certificate records: model, validation, id policies, persistence and HTTP
//! routes.

pub mod background;
pub mod id;
pub mod model;
pub mod repository;
pub mod routes;
pub mod validation;

pub use id::IdPolicy;
pub use model::{Certificate, CertificateLinks, CertificateUrls, CreateCertificateRequest, Estado};
pub use repository::{canonical_urls, CertificateRepository, RepositoryError};
