use tracing::debug;

use crate::client::{ClientError, NotInitializedError, SessionContext, Slice};
use crate::rpc::{Procedure, Response, RpcClient, RpcError};
use crate::upstream::ExternalDataOrigin;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiInfo {
    pub api_version: String,
    pub external_data_origin: ExternalDataOrigin,
}

#[derive(Debug, Clone)]
pub struct ApiInfoSlice {
    state: Slice<ApiInfo>,
}

impl Default for ApiInfoSlice {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiInfoSlice {
    pub const NAME: &'static str = "apiInfo";

    pub fn new() -> Self {
        Self {
            state: Slice::new(Self::NAME),
        }
    }

    /// Fetches the API version and external-data origin, and stashes both
    /// in `context` for the caller.
    pub fn initialize(
        &mut self,
        rpc: &dyn RpcClient,
        context: &mut SessionContext,
    ) -> Result<(), ClientError> {
        let api_version = match rpc.call(Procedure::GetApiVersion)? {
            Response::GetApiVersion(version) => version,
            _ => {
                return Err(RpcError::UnexpectedResponse {
                    procedure: "getApiVersion",
                }
                .into())
            }
        };

        let external_data_origin = match rpc.call(Procedure::GetExternalDataOrigin)? {
            Response::GetExternalDataOrigin(origin) => origin,
            _ => {
                return Err(RpcError::UnexpectedResponse {
                    procedure: "getExternalDataOrigin",
                }
                .into())
            }
        };

        debug!(%api_version, %external_data_origin, "api info loaded");
        context.api_version = Some(api_version.clone());
        context.external_data_origin = Some(external_data_origin);
        self.state.set(ApiInfo {
            api_version,
            external_data_origin,
        });
        Ok(())
    }

    pub fn api_version(&self) -> Result<&str, NotInitializedError> {
        Ok(&self.state.get()?.api_version)
    }

    pub fn external_data_origin(&self) -> Result<ExternalDataOrigin, NotInitializedError> {
        Ok(self.state.get()?.external_data_origin)
    }
}
