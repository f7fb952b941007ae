//! Client-side state for the catalog front end.
//!
//! Each feature owns a `Slice` that is empty until its `initialize` call
//! has fetched what it needs over RPC. Values shared between features live
//! in a `SessionContext` that the caller owns and hands to the initializers
//! that write it.

mod api_info;
mod translations;
mod user_auth;

pub use api_info::{ApiInfo, ApiInfoSlice};
pub use translations::TranslationsSlice;
pub use user_auth::UserAuthSlice;

use thiserror::Error;

use crate::rpc::RpcError;
use crate::upstream::ExternalDataOrigin;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{slice} state read before initialization")]
pub struct NotInitializedError {
    pub slice: &'static str,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    NotInitialized(#[from] NotInitializedError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SliceState<T> {
    Uninitialized,
    Ready(T),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slice<T> {
    name: &'static str,
    state: SliceState<T>,
}

impl<T> Slice<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: SliceState::Uninitialized,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> &SliceState<T> {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SliceState::Ready(_))
    }

    pub fn get(&self) -> Result<&T, NotInitializedError> {
        match self.state {
            SliceState::Ready(ref value) => Ok(value),
            SliceState::Uninitialized => Err(NotInitializedError { slice: self.name }),
        }
    }

    pub fn get_mut(&mut self) -> Result<&mut T, NotInitializedError> {
        match self.state {
            SliceState::Ready(ref mut value) => Ok(value),
            SliceState::Uninitialized => Err(NotInitializedError { slice: self.name }),
        }
    }

    pub fn set(&mut self, value: T) {
        self.state = SliceState::Ready(value);
    }
}

/// Per-session values filled in by `ApiInfoSlice::initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub api_version: Option<String>,
    pub external_data_origin: Option<ExternalDataOrigin>,
}
