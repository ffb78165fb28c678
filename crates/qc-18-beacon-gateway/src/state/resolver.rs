use crate::domain::types::{decode_hex, is_hex, Root, Slot};
use crate::ports::{ChainStateProvider, ProviderError, StateSnapshot};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Why a state identifier could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateFetchError {
    #[error("invalid state ID: {0}")]
    InvalidId(String),
    #[error("state root not found in the last {window} state roots")]
    RootNotFound { window: usize },
    #[error("slot cannot be in the future: requested {requested}, head is at {head}")]
    FutureSlot { requested: Slot, head: Slot },
    #[error("could not get state: {0}")]
    Provider(#[from] ProviderError),
}

/// Client-facing state identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateId {
    Head,
    Genesis,
    Finalized,
    Justified,
    Root(Root),
    Slot(Slot),
}

impl FromStr for StateId {
    type Err = StateFetchError;

    /// Keywords first (case-insensitive), then a `0x` 32-byte root, then a
    /// decimal slot.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KEYWORDS: [(&str, StateId); 4] = [
            ("head", StateId::Head),
            ("genesis", StateId::Genesis),
            ("finalized", StateId::Finalized),
            ("justified", StateId::Justified),
        ];
        if let Some((_, id)) = KEYWORDS.iter().find(|(k, _)| k.eq_ignore_ascii_case(s)) {
            return Ok(*id);
        }

        if is_hex(s) {
            if let Some(root) = decode_hex(s).ok().and_then(|b| Root::try_from(b).ok()) {
                return Ok(StateId::Root(root));
            }
        }

        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StateFetchError::InvalidId(s.to_string()));
        }
        s.parse::<Slot>()
            .map(StateId::Slot)
            .map_err(|_| StateFetchError::InvalidId(s.to_string()))
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateId::Head => f.write_str("head"),
            StateId::Genesis => f.write_str("genesis"),
            StateId::Finalized => f.write_str("finalized"),
            StateId::Justified => f.write_str("justified"),
            StateId::Root(root) => write!(f, "0x{}", hex::encode(root)),
            StateId::Slot(slot) => write!(f, "{}", slot),
        }
    }
}

/// Maps state identifiers to snapshots.
///
/// Stateless and retry-free: every provider failure is returned as is.
#[derive(Clone)]
pub struct StateResolver {
    provider: Arc<dyn ChainStateProvider>,
    history_window: Option<usize>,
}

impl StateResolver {
    pub fn new(provider: Arc<dyn ChainStateProvider>) -> Self {
        Self {
            provider,
            history_window: None,
        }
    }

    /// Require the head state's root history to hold exactly `window`
    /// entries (`slots_per_historical_root`).
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = Some(window);
        self
    }

    /// Resolve a raw identifier from a path or query parameter.
    pub async fn resolve(&self, id: &str) -> Result<Arc<dyn StateSnapshot>, StateFetchError> {
        let id: StateId = id.parse()?;
        self.resolve_id(id).await
    }

    pub async fn resolve_id(&self, id: StateId) -> Result<Arc<dyn StateSnapshot>, StateFetchError> {
        debug!(state_id = %id, "Resolving state");
        let state = match id {
            StateId::Head => self.provider.head_state().await?,
            StateId::Genesis => self.provider.genesis_state().await?,
            StateId::Finalized => self.provider.finalized_state().await?,
            StateId::Justified => self.provider.justified_state().await?,
            StateId::Root(root) => {
                let block_root = self.block_root_for_state_root(root).await?;
                self.provider.state_by_block_root(block_root).await?
            }
            StateId::Slot(slot) => {
                let head = self.provider.head_state().await?;
                if slot > head.slot() {
                    return Err(StateFetchError::FutureSlot {
                        requested: slot,
                        head: head.slot(),
                    });
                }
                self.provider.state_at_slot(slot).await?
            }
        };
        Ok(state)
    }

    /// State root for an identifier. A root identifier found in the head's
    /// history is returned without loading the state.
    pub async fn state_root(&self, id: &str) -> Result<Root, StateFetchError> {
        match id.parse::<StateId>()? {
            StateId::Root(root) => {
                self.block_root_for_state_root(root).await?;
                Ok(root)
            }
            other => Ok(self.resolve_id(other).await?.state_root()),
        }
    }

    /// Scan the head state's bounded root history.
    async fn block_root_for_state_root(&self, root: Root) -> Result<Root, StateFetchError> {
        let head = self.provider.head_state().await?;
        let state_roots = head.state_roots();
        if let Some(window) = self.history_window {
            if state_roots.len() != window {
                return Err(StateFetchError::Provider(ProviderError(format!(
                    "state root history has {} entries, expected {}",
                    state_roots.len(),
                    window
                ))));
            }
        }
        let index = state_roots
            .iter()
            .position(|r| *r == root)
            .ok_or(StateFetchError::RootNotFound {
                window: state_roots.len(),
            })?;
        head.block_roots()
            .get(index)
            .copied()
            .ok_or_else(|| {
                StateFetchError::Provider(ProviderError(format!(
                    "block root history shorter than state root history at index {}",
                    index
                )))
            })
    }
}
