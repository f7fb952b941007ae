use crate::client::{ClientError, NotInitializedError, Slice};
use crate::i18n::{Language, TranslationTree};
use crate::rpc::{Procedure, Response, RpcClient, RpcError};

#[derive(Debug, Clone)]
struct Loaded {
    language: Language,
    tree: TranslationTree,
}

#[derive(Debug, Clone)]
pub struct TranslationsSlice {
    state: Slice<Loaded>,
}

impl Default for TranslationsSlice {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationsSlice {
    pub const NAME: &'static str = "translations";

    pub fn new() -> Self {
        Self {
            state: Slice::new(Self::NAME),
        }
    }

    pub fn initialize(&mut self, rpc: &dyn RpcClient, language: Language) -> Result<(), ClientError> {
        let tree = match rpc.call(Procedure::GetTranslations { language })? {
            Response::GetTranslations(tree) => tree,
            _ => {
                return Err(RpcError::UnexpectedResponse {
                    procedure: "getTranslations",
                }
                .into())
            }
        };
        self.state.set(Loaded { language, tree });
        Ok(())
    }

    /// Reloads the strings when `language` differs from the current one.
    pub fn change_language(
        &mut self,
        rpc: &dyn RpcClient,
        language: Language,
    ) -> Result<(), ClientError> {
        if self.language()? == language {
            return Ok(());
        }
        self.initialize(rpc, language)
    }

    pub fn language(&self) -> Result<Language, NotInitializedError> {
        Ok(self.state.get()?.language)
    }

    /// The string at a dotted key path, or the path itself when missing.
    pub fn translate<'a>(&'a self, key: &'a str) -> Result<&'a str, NotInitializedError> {
        Ok(self.state.get()?.tree.lookup(key).unwrap_or(key))
    }
}
