//! Protocol registry records
//!
//! A protocol is a named, versioned message-schema contract looked up by
//! id. Nothing enforces it automatically: validation happens only when a
//! caller invokes `validate` explicitly.

use std::fmt;
use std::sync::Arc;

use rondo_core::{ProtocolId, RondoResult, StateValue};

/// Validator invoked by callers against a candidate message.
pub type ValidatorFn = Arc<dyn Fn(&StateValue) -> RondoResult<()> + Send + Sync>;

/// Named, versioned message-schema contract.
#[derive(Clone)]
pub struct ProtocolSpec {
    pub id: ProtocolId,
    pub name: String,
    pub version: String,
    pub schema: StateValue,
    pub validator: Option<ValidatorFn>,
}

impl ProtocolSpec {
    pub fn new(
        id: impl Into<ProtocolId>,
        name: impl Into<String>,
        version: impl Into<String>,
        schema: StateValue,
    ) -> Self {
        ProtocolSpec {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            schema,
            validator: None,
        }
    }

    pub fn with_validator(
        mut self,
        validator: impl Fn(&StateValue) -> RondoResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Run the validator against a message. A protocol without a
    /// validator accepts everything.
    pub fn validate(&self, message: &StateValue) -> RondoResult<()> {
        match &self.validator {
            Some(validator) => validator(message),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ProtocolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}
