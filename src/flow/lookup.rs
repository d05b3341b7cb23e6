//! Lookup flow: normalize the RUT, check its format, search.

use super::{BusyFlag, FlowError};
use crate::certificate::validation::{format_rut_input, is_valid_rut, ValidationError, ValidationErrors};
use crate::certificate::{Certificate, CertificateRepository};

pub const EMPTY_RUT_MESSAGE: &str = "Por favor ingrese un RUN";
pub const NOT_FOUND_MESSAGE: &str = "No se encontraron certificados asociados al RUN ingresado";

#[derive(Debug, Clone, PartialEq)]
pub enum LookupState {
    Idle,
    Validating,
    Fetching,
    ResultsShown(Vec<Certificate>),
    NotFoundShown,
    Failed(String),
}

pub struct LookupFlow {
    repository: CertificateRepository,
    state: LookupState,
    busy: BusyFlag,
}

impl LookupFlow {
    pub fn new(repository: CertificateRepository) -> Self {
        Self {
            repository,
            state: LookupState::Idle,
            busy: BusyFlag::default(),
        }
    }

    pub fn state(&self) -> &LookupState {
        &self.state
    }

    pub fn busy(&self) -> BusyFlag {
        self.busy.clone()
    }

    fn transition(&mut self, next: LookupState) {
        log::debug!("lookup flow: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Searches by RUT. The raw input goes through the same normalization as
    /// the entry field, so `17.616.251-1` and `176162511` both match
    /// `17616251-1`. An empty result is `NotFound`.
    pub async fn submit(&mut self, raw_rut: &str) -> Result<Vec<Certificate>, FlowError> {
        self.transition(LookupState::Validating);

        let rut = format_rut_input(raw_rut);
        if let Err(errors) = check_rut(&rut) {
            self.transition(LookupState::Failed(errors.to_string()));
            return Err(FlowError::Validation(errors));
        }

        let _busy = self.busy.enter();
        self.transition(LookupState::Fetching);

        match self.repository.find_by_rut(&rut).await {
            Ok(rows) if rows.is_empty() => {
                log::info!("No certificates found for RUT {}", rut);
                self.transition(LookupState::NotFoundShown);
                Err(FlowError::NotFound(NOT_FOUND_MESSAGE.to_string()))
            }
            Ok(rows) => {
                self.transition(LookupState::ResultsShown(rows.clone()));
                Ok(rows)
            }
            Err(err) => {
                let err = FlowError::from(err);
                self.transition(LookupState::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    pub fn acknowledge(&mut self) -> LookupState {
        std::mem::replace(&mut self.state, LookupState::Idle)
    }
}

fn check_rut(rut: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if rut.is_empty() {
        errors.add(ValidationError::new("rut", EMPTY_RUT_MESSAGE));
    } else if !is_valid_rut(rut) {
        errors.add(ValidationError::invalid_rut("rut"));
    }
    errors.into_result()
}
