// ── Config flow ──
//
// Interactive setup of a config entry. One `user` step: show the form,
// validate what the user typed with a single authentication round trip,
// then either create the entry or show the form again with an error key.

use std::collections::BTreeMap;

use strum::{EnumString, IntoStaticStr};
use tracing::{debug, error};

use crate::config::EntryData;
use crate::source::PermitSource;

/// Why validation failed. Rendered to the form as a snake_case key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, IntoStaticStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FlowError {
    #[error("cannot connect to the portal")]
    CannotConnect,
    #[error("invalid identifier or password")]
    InvalidAuth,
    #[error("unexpected error")]
    Unknown,
}

impl FlowError {
    /// Form error key (`cannot_connect`, `invalid_auth`, `unknown`).
    pub fn key(self) -> &'static str {
        self.into()
    }

    /// Classify a client error.
    pub fn from_api(err: &dvsportal_api::Error) -> Self {
        if err.is_auth() {
            Self::InvalidAuth
        } else if err.is_connection()
            || matches!(
                err,
                dvsportal_api::Error::InvalidHost(_) | dvsportal_api::Error::InvalidUrl(_)
            )
        {
            Self::CannotConnect
        } else {
            Self::Unknown
        }
    }
}

/// Result of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedInput {
    pub title: String,
}

/// Authenticate once with the given source. The title of the resulting
/// entry is the account identifier.
pub async fn validate_input<S: PermitSource>(
    source: &S,
    data: &EntryData,
) -> Result<ValidatedInput, FlowError> {
    match source.authenticate().await {
        Ok(_token) => Ok(ValidatedInput {
            title: data.identifier.clone(),
        }),
        Err(e) => {
            let kind = FlowError::from_api(&e);
            if kind == FlowError::Unknown {
                error!(error = %e, "unexpected exception while validating DVSPortal credentials");
            } else {
                debug!(error = %e, key = kind.key(), "credential validation failed");
            }
            Err(kind)
        }
    }
}

// ── Form schema ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Fields of the `user` step, in display order.
pub const DATA_SCHEMA: &[FormField] = &[
    FormField {
        key: "api_host",
        label: "API host",
        kind: FieldKind::Text,
        required: true,
    },
    FormField {
        key: "identifier",
        label: "Identifier",
        kind: FieldKind::Text,
        required: true,
    },
    FormField {
        key: "password",
        label: "Password",
        kind: FieldKind::Password,
        required: true,
    },
];

// ── Flow ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionClass {
    CloudPoll,
}

/// What the host should do after a step.
#[derive(Debug, Clone)]
pub enum FlowResult {
    ShowForm {
        step_id: &'static str,
        schema: &'static [FormField],
        /// `"base"` → error key, empty on first display.
        errors: BTreeMap<&'static str, &'static str>,
    },
    CreateEntry {
        title: String,
        data: EntryData,
    },
}

pub struct ConfigFlow;

impl ConfigFlow {
    pub const VERSION: u32 = 1;
    pub const CONNECTION_CLASS: ConnectionClass = ConnectionClass::CloudPoll;
    pub const STEP_USER: &'static str = "user";

    /// Handle the `user` step.
    ///
    /// `connect` builds a source for the submitted data; building can fail
    /// (e.g. an unusable host), which is reported like any other
    /// validation failure.
    pub async fn step_user<S, F>(input: Option<EntryData>, connect: F) -> FlowResult
    where
        S: PermitSource,
        F: FnOnce(&EntryData) -> Result<S, dvsportal_api::Error>,
    {
        let Some(data) = input else {
            return Self::form(None);
        };

        let validated = match connect(&data) {
            Ok(source) => validate_input(&source, &data).await,
            Err(e) => {
                let kind = FlowError::from_api(&e);
                debug!(error = %e, key = kind.key(), "could not build portal client");
                Err(kind)
            }
        };

        match validated {
            Ok(ValidatedInput { title }) => FlowResult::CreateEntry { title, data },
            Err(kind) => Self::form(Some(kind)),
        }
    }

    fn form(error: Option<FlowError>) -> FlowResult {
        let errors = error
            .map(|e| BTreeMap::from([("base", e.key())]))
            .unwrap_or_default();
        FlowResult::ShowForm {
            step_id: Self::STEP_USER,
            schema: DATA_SCHEMA,
            errors,
        }
    }
}
