//! Creation flow: validate, insert, then attach links in the background.

use super::{BusyFlag, FlowError};
use crate::certificate::{
    CertificateLinks, CertificateRepository, CreateCertificateRequest, IdPolicy,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CreationState {
    Idle,
    Validating,
    Submitting,
    Success(CertificateLinks),
    Failed(String),
}

pub struct CreationFlow {
    repository: CertificateRepository,
    policy: IdPolicy,
    state: CreationState,
    busy: BusyFlag,
}

impl CreationFlow {
    pub fn new(repository: CertificateRepository, policy: IdPolicy) -> Self {
        Self {
            repository,
            policy,
            state: CreationState::Idle,
            busy: BusyFlag::default(),
        }
    }

    pub fn state(&self) -> &CreationState {
        &self.state
    }

    pub fn busy(&self) -> BusyFlag {
        self.busy.clone()
    }

    fn transition(&mut self, next: CreationState) {
        log::debug!("creation flow: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Runs one submission. Invalid input fails before any store call; a
    /// failed URL attachment does not affect the outcome.
    pub async fn submit(
        &mut self,
        request: &CreateCertificateRequest,
    ) -> Result<CertificateLinks, FlowError> {
        let _busy = self.busy.enter();

        self.transition(CreationState::Validating);
        if let Err(errors) = request.validate() {
            self.transition(CreationState::Failed(errors.to_string()));
            return Err(FlowError::Validation(errors));
        }

        self.transition(CreationState::Submitting);
        let created = match self.repository.create(request, self.policy).await {
            Ok(created) => created,
            Err(err) => {
                let err = FlowError::from(err);
                self.transition(CreationState::Failed(err.to_string()));
                return Err(err);
            }
        };

        self.repository.attach_urls(created.id);

        let urls = self.repository.urls_for(created.id);
        let links = CertificateLinks {
            certificate_id: created.id,
            qr_url: urls.qr_url,
            view_url: urls.view_url,
        };
        self.transition(CreationState::Success(links.clone()));
        Ok(links)
    }

    /// Hands back the terminal state and returns to `Idle`.
    pub fn acknowledge(&mut self) -> CreationState {
        let shown = std::mem::replace(&mut self.state, CreationState::Idle);
        log::debug!("creation flow: {:?} acknowledged", shown);
        shown
    }
}
