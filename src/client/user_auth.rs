use tracing::debug;

use crate::client::{ClientError, NotInitializedError, Slice};
use crate::rpc::{AccessTokenClaims, Procedure, Response, RpcClient, RpcError};

#[derive(Debug, Clone)]
pub struct UserAuthSlice {
    state: Slice<Option<AccessTokenClaims>>,
}

impl Default for UserAuthSlice {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAuthSlice {
    pub const NAME: &'static str = "userAuthentication";

    pub fn new() -> Self {
        Self {
            state: Slice::new(Self::NAME),
        }
    }

    /// Decodes the session's access token. A missing or rejected token
    /// leaves the user logged out; transport failures are returned.
    pub fn initialize(
        &mut self,
        rpc: &dyn RpcClient,
        authorization: Option<&str>,
    ) -> Result<(), ClientError> {
        if authorization.is_none() {
            self.state.set(None);
            return Ok(());
        }

        let procedure = Procedure::DecodeAccessToken {
            authorization: authorization.map(str::to_string),
        };

        let claims = match rpc.call(procedure) {
            Ok(Response::DecodeAccessToken(claims)) => Some(claims),
            Ok(_) => {
                return Err(RpcError::UnexpectedResponse {
                    procedure: "decodeAccessToken",
                }
                .into())
            }
            Err(RpcError::Unauthorized(reason)) => {
                debug!(%reason, "not logged in");
                None
            }
            Err(err) => return Err(err.into()),
        };

        debug!(logged_in = claims.is_some(), "user authentication initialized");
        self.state.set(claims);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), NotInitializedError> {
        *self.state.get_mut()? = None;
        Ok(())
    }

    pub fn is_logged_in(&self) -> Result<bool, NotInitializedError> {
        Ok(self.state.get()?.is_some())
    }

    pub fn email(&self) -> Result<Option<&str>, NotInitializedError> {
        Ok(self.state.get()?.as_ref().map(|claims| claims.email.as_str()))
    }

    pub fn organization(&self) -> Result<Option<&str>, NotInitializedError> {
        Ok(self
            .state
            .get()?
            .as_ref()
            .and_then(|claims| claims.organization.as_deref()))
    }
}
