//! Display flow: load one certificate with its verification code, then
//! export it on request.

use super::{BusyFlag, FlowError};
use crate::certificate::{Certificate, CertificateRepository};
use crate::render::common::{format_issue_date, format_issue_date_short};
use crate::render::qr::DEFAULT_CODE_SIZE_PX;
use crate::render::{
    render_code, CertificateDocumentRenderer, GeneratedDocument, PageLayout, VerificationCode,
};

pub const NOT_FOUND_MESSAGE: &str = "No se encontró el certificado solicitado";

/// A loaded certificate and everything the page shows next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateView {
    pub certificate: Certificate,
    pub code: VerificationCode,
    /// `dd-mm-yyyy`, as printed on the document.
    pub issued_on: String,
    /// `d/m/yyyy`, as shown on the summary card.
    pub issued_on_short: String,
}

impl CertificateView {
    pub fn new(certificate: Certificate, code: VerificationCode) -> Self {
        Self {
            issued_on: format_issue_date(certificate.fecha_certificado),
            issued_on_short: format_issue_date_short(certificate.fecha_certificado),
            certificate,
            code,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayState {
    Idle,
    Fetching,
    Ready(Box<CertificateView>),
    Rendering,
    Failed(String),
}

pub struct DisplayFlow {
    repository: CertificateRepository,
    state: DisplayState,
    busy: BusyFlag,
}

impl DisplayFlow {
    pub fn new(repository: CertificateRepository) -> Self {
        Self {
            repository,
            state: DisplayState::Idle,
            busy: BusyFlag::default(),
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn busy(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn view(&self) -> Option<&CertificateView> {
        match &self.state {
            DisplayState::Ready(view) => Some(&**view),
            _ => None,
        }
    }

    fn transition(&mut self, next: DisplayState) {
        log::debug!(
            "display flow: {} -> {}",
            state_name(&self.state),
            state_name(&next)
        );
        self.state = next;
    }

    /// Fetches by raw id. Stored links are reconciled as part of the fetch.
    pub async fn load(&mut self, raw_id: &str) -> Result<CertificateView, FlowError> {
        let _busy = self.busy.enter();
        self.transition(DisplayState::Fetching);

        let certificate = match self.repository.get_by_id(raw_id).await {
            Ok(Some(certificate)) => certificate,
            Ok(None) => {
                self.transition(DisplayState::Failed(NOT_FOUND_MESSAGE.to_string()));
                return Err(FlowError::NotFound(NOT_FOUND_MESSAGE.to_string()));
            }
            Err(err) => {
                let err = FlowError::from(err);
                self.transition(DisplayState::Failed(err.to_string()));
                return Err(err);
            }
        };

        let view_url = self.repository.urls_for(certificate.id).view_url;
        let code = match render_code(&view_url, DEFAULT_CODE_SIZE_PX) {
            Ok(code) => code,
            Err(err) => {
                let err = FlowError::from(err);
                self.transition(DisplayState::Failed(err.to_string()));
                return Err(err);
            }
        };

        let view = CertificateView::new(certificate, code);
        self.transition(DisplayState::Ready(Box::new(view.clone())));
        Ok(view)
    }

    /// Marks the certificate paid in the background and exports it. The flow
    /// is back in `Ready` afterwards whether or not the export succeeded.
    pub async fn download(
        &mut self,
        renderer: &CertificateDocumentRenderer,
        layout: PageLayout,
    ) -> Result<GeneratedDocument, FlowError> {
        let view = match std::mem::replace(&mut self.state, DisplayState::Rendering) {
            DisplayState::Ready(view) => view,
            other => {
                self.state = other;
                return Err(FlowError::NotReady);
            }
        };
        let _busy = self.busy.enter();

        self.repository.mark_paid(view.certificate.id);

        let result = renderer
            .render_document(&view.certificate, &view.code, layout)
            .await;
        if let Err(err) = &result {
            log::error!(
                "Export of certificate {} failed: {}",
                view.certificate.id,
                err
            );
        }

        self.transition(DisplayState::Ready(view));
        result.map_err(FlowError::from)
    }

    pub fn acknowledge(&mut self) -> DisplayState {
        std::mem::replace(&mut self.state, DisplayState::Idle)
    }
}

fn state_name(state: &DisplayState) -> &'static str {
    match state {
        DisplayState::Idle => "Idle",
        DisplayState::Fetching => "Fetching",
        DisplayState::Ready(_) => "Ready",
        DisplayState::Rendering => "Rendering",
        DisplayState::Failed(_) => "Failed",
    }
}
