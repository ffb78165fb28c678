//! Response hooks: reshape upstream bodies into the client-facing schema.

use super::{ResponseHook, RunDefault};
use crate::dispatch::{
    collapse_block, collapse_produced_blinded_block, collapse_produced_block, collapse_state,
    VersionError,
};
use crate::domain::error::ApiError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn collapse_hook(name: &'static str, collapse: fn(&[u8]) -> Result<Vec<u8>, VersionError>) -> ResponseHook {
    ResponseHook::new(name, move |_, body| {
        *body = Bytes::from(collapse(&body[..])?);
        Ok(RunDefault::NO)
    })
}

/// `GET /eth/v2/beacon/blocks/{block_id}`
pub fn collapse_block_response() -> ResponseHook {
    collapse_hook("collapse_block_response", collapse_block)
}

/// `GET /eth/v2/debug/beacon/states/{state_id}`
pub fn collapse_state_response() -> ResponseHook {
    collapse_hook("collapse_state_response", collapse_state)
}

/// `GET /eth/v2/validator/blocks/{slot}`
pub fn collapse_produced_block_response() -> ResponseHook {
    collapse_hook("collapse_produced_block_response", collapse_produced_block)
}

/// `GET /eth/v1/validator/blinded_blocks/{slot}`
pub fn collapse_produced_blinded_block_response() -> ResponseHook {
    collapse_hook(
        "collapse_produced_blinded_block_response",
        collapse_produced_blinded_block,
    )
}

#[derive(Deserialize)]
struct NestedAggregates {
    data: NestedSyncCommittee,
}

#[derive(Deserialize)]
struct NestedSyncCommittee {
    #[serde(default)]
    validators: Vec<String>,
    #[serde(default)]
    validator_aggregates: Vec<Subcommittee>,
}

#[derive(Deserialize)]
struct Subcommittee {
    #[serde(default)]
    validators: Vec<String>,
}

#[derive(Serialize)]
struct FlatAggregates {
    data: FlatSyncCommittee,
}

#[derive(Serialize)]
struct FlatSyncCommittee {
    validators: Vec<String>,
    validator_aggregates: Vec<Vec<String>>,
}

/// `GET /eth/v1/beacon/states/{state_id}/sync_committees`
///
/// The internal gateway nests each subcommittee as `{"validators": [...]}`;
/// clients expect a plain list of lists in the same order.
pub fn flatten_validator_aggregates() -> ResponseHook {
    ResponseHook::new("flatten_validator_aggregates", |_, body| {
        let nested: NestedAggregates = serde_json::from_slice(body).map_err(|e| {
            ApiError::internal_with_context("could not unmarshal response into temp container", e)
        })?;
        let flat = FlatAggregates {
            data: FlatSyncCommittee {
                validators: nested.data.validators,
                validator_aggregates: nested
                    .data
                    .validator_aggregates
                    .into_iter()
                    .map(|s| s.validators)
                    .collect(),
            },
        };
        *body = Bytes::from(serde_json::to_vec(&flat)?);
        Ok(RunDefault::NO)
    })
}

#[derive(Debug, Default)]
struct AttestationFilter {
    slot: Option<String>,
    committee_index: Option<String>,
}

impl AttestationFilter {
    fn from_query(query: Option<&str>) -> Self {
        let mut filter = Self::default();
        let Some(query) = query else {
            return filter;
        };
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "slot" => filter.slot = Some(value.into_owned()),
                "committee_index" => filter.committee_index = Some(value.into_owned()),
                _ => {}
            }
        }
        filter
    }

    fn is_empty(&self) -> bool {
        self.slot.is_none() && self.committee_index.is_none()
    }

    /// OR of the filters that are set.
    fn matches(&self, attestation: &Value) -> bool {
        let data = &attestation["data"];
        let equal = |want: &Option<String>, field: &str| {
            want.as_deref()
                .is_some_and(|w| data[field].as_str() == Some(w))
        };
        equal(&self.slot, "slot") || equal(&self.committee_index, "index")
    }
}

/// `GET /eth/v1/beacon/pool/attestations?slot=&committee_index=`
pub fn filter_pool_attestations() -> ResponseHook {
    ResponseHook::new("filter_pool_attestations", |ctx, body| {
        let filter = AttestationFilter::from_query(ctx.query);
        if filter.is_empty() {
            return Ok(RunDefault::YES);
        }
        let mut response: serde_json::Map<String, Value> = serde_json::from_slice(body)
            .map_err(|e| ApiError::internal_with_context("could not unmarshal response", e))?;
        if let Some(Value::Array(attestations)) = response.get_mut("data") {
            attestations.retain(|a| filter.matches(a));
        }
        *body = Bytes::from(serde_json::to_vec(&response)?);
        Ok(RunDefault::NO)
    })
}
