//! The Beacon API routes served by the gateway.

use super::{CustomHandler, Endpoint, ErrorSchema};
use crate::codec::{
    BEACON_BLOCK_FILE, BEACON_STATE_FILE, PRODUCE_BLINDED_BLOCK_FILE, PRODUCE_BLOCK_FILE,
};
use crate::hooks::{self, publish_block, relocate_version_header, wrap_and_relocate};
use axum::http::Method;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable set of endpoint descriptors, built once at start-up.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<Arc<Endpoint>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor. A later registration for the same method and path
    /// replaces the earlier one.
    pub fn register(&mut self, endpoint: Endpoint) {
        self.endpoints
            .retain(|e| !(e.method == endpoint.method && e.path == endpoint.path));
        self.endpoints.push(Arc::new(endpoint));
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<&Arc<Endpoint>> {
        self.endpoints
            .iter()
            .find(|e| e.method == *method && e.path == path)
    }

    /// Descriptors grouped by path pattern, for router construction.
    pub fn by_path(&self) -> BTreeMap<&'static str, Vec<Arc<Endpoint>>> {
        let mut grouped: BTreeMap<&'static str, Vec<Arc<Endpoint>>> = BTreeMap::new();
        for endpoint in &self.endpoints {
            grouped
                .entry(endpoint.path)
                .or_default()
                .push(Arc::clone(endpoint));
        }
        grouped
    }

    /// Standard Beacon node API.
    pub fn beacon() -> Self {
        let mut r = Self::new();
        let ssz = |file_name: &'static str| CustomHandler::SszGet { file_name };

        // beacon
        r.register(Endpoint::get("/eth/v1/beacon/genesis"));
        r.register(
            Endpoint::get("/eth/v1/beacon/states/:state_id/root")
                .with_custom_handler(CustomHandler::StateRoot),
        );
        r.register(Endpoint::get("/eth/v1/beacon/states/:state_id/fork"));
        r.register(Endpoint::get("/eth/v1/beacon/states/:state_id/finality_checkpoints"));
        r.register(Endpoint::get("/eth/v1/beacon/states/:state_id/validators"));
        r.register(Endpoint::get(
            "/eth/v1/beacon/states/:state_id/validators/:validator_id",
        ));
        r.register(Endpoint::get("/eth/v1/beacon/states/:state_id/validator_balances"));
        r.register(Endpoint::get("/eth/v1/beacon/states/:state_id/committees"));
        r.register(
            Endpoint::get("/eth/v1/beacon/states/:state_id/sync_committees")
                .with_response_hook(hooks::flatten_validator_aggregates()),
        );
        r.register(Endpoint::get("/eth/v1/beacon/headers"));
        r.register(Endpoint::get("/eth/v1/beacon/headers/:block_id"));
        r.register(
            Endpoint::post("/eth/v1/beacon/blocks")
                .with_custom_handler(CustomHandler::SszPost)
                .with_request_hook(publish_block()),
        );
        r.register(
            Endpoint::post("/eth/v1/beacon/blinded_blocks")
                .with_custom_handler(CustomHandler::SszPost)
                .with_request_hook(publish_block()),
        );
        r.register(
            Endpoint::get("/eth/v1/beacon/blocks/:block_id")
                .with_custom_handler(ssz(BEACON_BLOCK_FILE)),
        );
        r.register(
            Endpoint::get("/eth/v2/beacon/blocks/:block_id")
                .with_custom_handler(ssz(BEACON_BLOCK_FILE))
                .with_response_hook(hooks::collapse_block_response()),
        );
        r.register(
            Endpoint::get("/eth/v1/beacon/blinded_blocks/:block_id")
                .with_custom_handler(ssz(BEACON_BLOCK_FILE)),
        );
        r.register(Endpoint::get("/eth/v1/beacon/blocks/:block_id/root"));
        r.register(Endpoint::get("/eth/v1/beacon/blocks/:block_id/attestations"));

        // pool
        r.register(
            Endpoint::get("/eth/v1/beacon/pool/attestations")
                .with_response_hook(hooks::filter_pool_attestations()),
        );
        r.register(
            Endpoint::post("/eth/v1/beacon/pool/attestations")
                .with_error_schema(ErrorSchema::IndexedFailures)
                .with_request_hook(hooks::wrap_attestations_array()),
        );
        r.register(Endpoint::get("/eth/v1/beacon/pool/attester_slashings"));
        r.register(Endpoint::post("/eth/v1/beacon/pool/attester_slashings"));
        r.register(Endpoint::get("/eth/v1/beacon/pool/proposer_slashings"));
        r.register(Endpoint::post("/eth/v1/beacon/pool/proposer_slashings"));
        r.register(Endpoint::get("/eth/v1/beacon/pool/voluntary_exits"));
        r.register(Endpoint::post("/eth/v1/beacon/pool/voluntary_exits"));
        r.register(
            Endpoint::post("/eth/v1/beacon/pool/sync_committees")
                .with_error_schema(ErrorSchema::IndexedFailures)
                .with_request_hook(hooks::wrap_sync_committee_signatures_array()),
        );
        r.register(Endpoint::get("/eth/v1/beacon/pool/bls_to_execution_changes"));
        r.register(
            Endpoint::post("/eth/v1/beacon/pool/bls_to_execution_changes")
                .with_error_schema(ErrorSchema::IndexedFailures)
                .with_request_hook(hooks::wrap_bls_changes_array()),
        );

        // node
        for path in [
            "/eth/v1/node/identity",
            "/eth/v1/node/peers",
            "/eth/v1/node/peers/:peer_id",
            "/eth/v1/node/peer_count",
            "/eth/v1/node/version",
            "/eth/v1/node/syncing",
            "/eth/v1/node/health",
        ] {
            r.register(Endpoint::get(path));
        }

        // config
        r.register(Endpoint::get("/eth/v1/config/fork_schedule"));
        r.register(Endpoint::get("/eth/v1/config/spec"));
        r.register(Endpoint::get("/eth/v1/config/deposit_contract"));

        // debug
        r.register(
            Endpoint::get("/eth/v1/debug/beacon/states/:state_id")
                .with_custom_handler(ssz(BEACON_STATE_FILE)),
        );
        r.register(
            Endpoint::get("/eth/v2/debug/beacon/states/:state_id")
                .with_custom_handler(ssz(BEACON_STATE_FILE))
                .with_response_hook(hooks::collapse_state_response()),
        );
        r.register(Endpoint::get("/eth/v2/debug/beacon/heads"));

        // validator
        r.register(
            Endpoint::post("/eth/v1/validator/duties/attester/:epoch")
                .with_request_hook(hooks::wrap_validator_indices_array()),
        );
        r.register(Endpoint::get("/eth/v1/validator/duties/proposer/:epoch"));
        r.register(
            Endpoint::post("/eth/v1/validator/duties/sync/:epoch")
                .with_request_hook(hooks::wrap_validator_indices_array()),
        );
        r.register(
            Endpoint::get("/eth/v2/validator/blocks/:slot")
                .with_custom_handler(ssz(PRODUCE_BLOCK_FILE))
                .with_response_hook(hooks::collapse_produced_block_response()),
        );
        r.register(
            Endpoint::get("/eth/v1/validator/blinded_blocks/:slot")
                .with_custom_handler(ssz(PRODUCE_BLINDED_BLOCK_FILE))
                .with_response_hook(hooks::collapse_produced_blinded_block_response()),
        );
        r.register(Endpoint::get("/eth/v1/validator/attestation_data"));
        r.register(Endpoint::get("/eth/v1/validator/aggregate_attestation"));
        r.register(
            Endpoint::post("/eth/v1/validator/aggregate_and_proofs")
                .with_request_hook(hooks::wrap_aggregate_and_proofs_array()),
        );
        r.register(
            Endpoint::post("/eth/v1/validator/beacon_committee_subscriptions")
                .with_request_hook(hooks::wrap_beacon_committee_subscriptions_array()),
        );
        r.register(
            Endpoint::post("/eth/v1/validator/sync_committee_subscriptions")
                .with_request_hook(hooks::wrap_sync_committee_subscriptions_array()),
        );
        r.register(Endpoint::get("/eth/v1/validator/sync_committee_contribution"));
        r.register(
            Endpoint::post("/eth/v1/validator/contribution_and_proofs")
                .with_request_hook(hooks::wrap_contribution_and_proofs_array()),
        );
        r.register(
            Endpoint::post("/eth/v1/validator/prepare_beacon_proposer")
                .with_request_hook(hooks::wrap_fee_recipients_array()),
        );
        r.register(
            Endpoint::post("/eth/v1/validator/register_validator")
                .with_request_hook(hooks::wrap_validator_registrations_array()),
        );
        r.register(
            Endpoint::post("/eth/v1/validator/liveness/:epoch")
                .with_request_hook(hooks::wrap_validator_indices_array()),
        );

        // fork-tagged batch submissions
        r.register(
            Endpoint::post("/eth/v2/beacon/pool/attestations")
                .with_error_schema(ErrorSchema::IndexedFailures)
                .with_request_hooks(wrap_and_relocate("wrap_attestations_array", "data")),
        );
        r.register(
            Endpoint::post("/eth/v2/beacon/blocks")
                .with_custom_handler(CustomHandler::SszPost)
                .with_request_hook(publish_block())
                .with_request_hook(relocate_version_header()),
        );

        // events
        r.register(Endpoint::get("/eth/v1/events").with_custom_handler(CustomHandler::Events));

        r
    }
}

impl<'a> IntoIterator for &'a EndpointRegistry {
    type Item = &'a Arc<Endpoint>;
    type IntoIter = std::slice::Iter<'a, Arc<Endpoint>>;

    fn into_iter(self) -> Self::IntoIter {
        self.endpoints.iter()
    }
}
