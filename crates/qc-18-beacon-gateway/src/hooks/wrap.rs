//! Bare-array wrapping.
//!
//! Several Beacon API POST endpoints take a top-level JSON array, while the
//! internal gateway expects an object with the array under one field.

use super::{RequestHook, RunDefault};
use crate::domain::error::ApiError;
use bytes::Bytes;
use serde_json::{Map, Value};

/// Wrap a top-level array body as `{ field: [...] }`.
pub fn wrap_array(name: &'static str, field: &'static str) -> RequestHook {
    RequestHook::new(name, move |_, req| {
        let items: Vec<Value> = serde_json::from_slice(&req.body)
            .map_err(|e| ApiError::internal_with_context("could not decode body", e))?;
        let mut wrapped = Map::with_capacity(1);
        wrapped.insert(field.to_string(), Value::Array(items));
        let encoded = serde_json::to_vec(&wrapped)
            .map_err(|e| ApiError::internal_with_context("could not marshal wrapped body", e))?;
        req.body = Bytes::from(encoded);
        Ok(RunDefault::YES)
    })
}

/// `POST /eth/v1/beacon/pool/attestations`
pub fn wrap_attestations_array() -> RequestHook {
    wrap_array("wrap_attestations_array", "data")
}

/// Duty endpoints posting validator indices.
pub fn wrap_validator_indices_array() -> RequestHook {
    wrap_array("wrap_validator_indices_array", "index")
}

/// `POST /eth/v1/validator/aggregate_and_proofs`
pub fn wrap_aggregate_and_proofs_array() -> RequestHook {
    wrap_array("wrap_aggregate_and_proofs_array", "data")
}

/// `POST /eth/v1/validator/beacon_committee_subscriptions`
pub fn wrap_beacon_committee_subscriptions_array() -> RequestHook {
    wrap_array("wrap_beacon_committee_subscriptions_array", "data")
}

/// `POST /eth/v1/validator/sync_committee_subscriptions`
pub fn wrap_sync_committee_subscriptions_array() -> RequestHook {
    wrap_array("wrap_sync_committee_subscriptions_array", "data")
}

/// `POST /eth/v1/beacon/pool/sync_committees`
pub fn wrap_sync_committee_signatures_array() -> RequestHook {
    wrap_array("wrap_sync_committee_signatures_array", "data")
}

/// `POST /eth/v1/validator/contribution_and_proofs`
pub fn wrap_contribution_and_proofs_array() -> RequestHook {
    wrap_array("wrap_contribution_and_proofs_array", "data")
}

/// `POST /eth/v1/validator/prepare_beacon_proposer`
pub fn wrap_fee_recipients_array() -> RequestHook {
    wrap_array("wrap_fee_recipients_array", "recipients")
}

/// `POST /eth/v1/validator/register_validator`
pub fn wrap_validator_registrations_array() -> RequestHook {
    wrap_array("wrap_validator_registrations_array", "registrations")
}

/// `POST /eth/v1/beacon/pool/bls_to_execution_changes`
pub fn wrap_bls_changes_array() -> RequestHook {
    wrap_array("wrap_bls_changes_array", "changes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::test_support::dispatcher;
    use crate::hooks::{HookContext, HookRequest};
    use serde_json::json;

    fn run(hook: &RequestHook, body: &'static [u8]) -> Result<Value, ApiError> {
        let d = dispatcher();
        let ctx = HookContext {
            dispatcher: &d,
            query: None,
        };
        let mut req = HookRequest {
            body: Bytes::from_static(body),
            ..Default::default()
        };
        assert_eq!(hook.call(&ctx, &mut req)?, RunDefault::YES);
        Ok(serde_json::from_slice(&req.body).unwrap())
    }

    #[test]
    fn test_wraps_under_field() {
        let out = run(&wrap_validator_indices_array(), br#"["1","2","3"]"#).unwrap();
        assert_eq!(out, json!({"index": ["1", "2", "3"]}));

        let out = run(&wrap_fee_recipients_array(), br#"[{"validator_index":"1"}]"#).unwrap();
        assert_eq!(out["recipients"][0]["validator_index"], "1");

        let out = run(&wrap_validator_registrations_array(), b"[]").unwrap();
        assert_eq!(out, json!({"registrations": []}));

        let out = run(&wrap_bls_changes_array(), b"[{}]").unwrap();
        assert_eq!(out, json!({"changes": [{}]}));
    }

    #[test]
    fn test_data_wrappers() {
        for hook in [
            wrap_attestations_array(),
            wrap_aggregate_and_proofs_array(),
            wrap_beacon_committee_subscriptions_array(),
            wrap_sync_committee_subscriptions_array(),
            wrap_sync_committee_signatures_array(),
            wrap_contribution_and_proofs_array(),
        ] {
            let out = run(&hook, br#"[{"a":1},{"b":2}]"#).unwrap();
            assert_eq!(out, json!({"data": [{"a": 1}, {"b": 2}]}), "{}", hook.name());
        }
    }

    #[test]
    fn test_non_array_body_fails() {
        let err = run(&wrap_attestations_array(), br#"{"data":[]}"#).unwrap_err();
        assert_eq!(err.code, 500);
        assert!(err.message.starts_with("could not decode body"));
    }
}
