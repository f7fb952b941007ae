//! Typed procedures served to the catalog front end.
//!
//! Requests and responses are tagged JSON objects, e.g.
//! `{"procedure":"getTranslations","language":"fr"}`.

mod auth;

pub use auth::{
    bearer_token, decode_access_token, AccessTokenClaims, AccessTokenVerifier, UnauthorizedError,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::i18n::{Language, TranslationCatalog, TranslationTree};
use crate::upstream::ExternalDataOrigin;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "procedure", rename_all = "camelCase")]
pub enum Procedure {
    GetTranslations {
        language: Language,
    },
    DecodeAccessToken {
        #[serde(default)]
        authorization: Option<String>,
    },
    GetApiVersion,
    GetExternalDataOrigin,
}

impl Procedure {
    pub fn name(&self) -> &'static str {
        match self {
            Procedure::GetTranslations { .. } => "getTranslations",
            Procedure::DecodeAccessToken { .. } => "decodeAccessToken",
            Procedure::GetApiVersion => "getApiVersion",
            Procedure::GetExternalDataOrigin => "getExternalDataOrigin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "procedure", content = "result", rename_all = "camelCase")]
pub enum Response {
    GetTranslations(TranslationTree),
    DecodeAccessToken(AccessTokenClaims),
    GetApiVersion(String),
    GetExternalDataOrigin(ExternalDataOrigin),
}

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Unauthorized(#[from] UnauthorizedError),
    #[error("invalid request: {0}")]
    InvalidRequest(#[source] serde_json::Error),
    #[error("unexpected response to {procedure}")]
    UnexpectedResponse { procedure: &'static str },
}

/// Anything that can answer a procedure call: the in-process `Router`, or a
/// transport that forwards to one.
pub trait RpcClient {
    fn call(&self, procedure: Procedure) -> Result<Response, RpcError>;
}

pub struct Router<V> {
    translations: TranslationCatalog,
    verifier: V,
    external_data_origin: ExternalDataOrigin,
}

impl<V: AccessTokenVerifier> Router<V> {
    pub fn new(
        translations: TranslationCatalog,
        verifier: V,
        external_data_origin: ExternalDataOrigin,
    ) -> Self {
        Self {
            translations,
            verifier,
            external_data_origin,
        }
    }

    pub fn dispatch(&self, procedure: Procedure) -> Result<Response, RpcError> {
        debug!(procedure = procedure.name(), "dispatching");

        match procedure {
            Procedure::GetTranslations { language } => Ok(Response::GetTranslations(
                self.translations.translations(language),
            )),
            Procedure::DecodeAccessToken { authorization } => {
                decode_access_token(&self.verifier, authorization.as_deref(), Utc::now())
                    .map(Response::DecodeAccessToken)
                    .map_err(|err| {
                        warn!(error = %err, "rejected access token");
                        RpcError::Unauthorized(err)
                    })
            }
            Procedure::GetApiVersion => Ok(Response::GetApiVersion(API_VERSION.to_string())),
            Procedure::GetExternalDataOrigin => {
                Ok(Response::GetExternalDataOrigin(self.external_data_origin))
            }
        }
    }

    /// Decodes a JSON request, dispatches it, and encodes the response.
    pub fn handle_json(&self, request: &str) -> Result<String, RpcError> {
        let procedure: Procedure =
            serde_json::from_str(request).map_err(RpcError::InvalidRequest)?;
        let response = self.dispatch(procedure)?;
        serde_json::to_string(&response).map_err(RpcError::InvalidRequest)
    }
}

impl<V: AccessTokenVerifier> RpcClient for Router<V> {
    fn call(&self, procedure: Procedure) -> Result<Response, RpcError> {
        self.dispatch(procedure)
    }
}
