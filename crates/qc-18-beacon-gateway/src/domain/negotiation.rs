//! Content negotiation between the JSON and SSZ (octet-stream) representations.
//!
//! Only two media types matter to the gateway. Everything else in an
//! `Accept` header is ignored.

use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::HeaderMap;
use regex::Regex;
use std::sync::LazyLock;

/// Structured JSON media type.
pub const JSON_MEDIA_TYPE: &str = "application/json";
/// Compact binary (SSZ) media type.
pub const OCTET_STREAM_MEDIA_TYPE: &str = "application/octet-stream";
/// Header carrying the fork version of a binary payload.
pub const VERSION_HEADER: &str = "Eth-Consensus-Version";

/// Matches a quality weight with optional decimals.
static Q_WEIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"q=(\d+(?:\.\d+)?)").expect("static q-weight pattern"));

/// The two representations the gateway can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Json,
    OctetStream,
}

impl MediaType {
    fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case(JSON_MEDIA_TYPE) {
            Some(Self::Json)
        } else if name.eq_ignore_ascii_case(OCTET_STREAM_MEDIA_TYPE) {
            Some(Self::OctetStream)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => JSON_MEDIA_TYPE,
            Self::OctetStream => OCTET_STREAM_MEDIA_TYPE,
        }
    }
}

/// Pick the preferred representation from one weighted `Accept` value.
///
/// Binary wins only with a strictly higher weight than JSON. Entries whose
/// parameters carry no parseable `q=` weight are skipped.
pub fn preferred_media_type(accept: &str) -> MediaType {
    let mut json_weight: Option<f32> = None;
    let mut binary_weight: Option<f32> = None;

    for entry in accept.split(',') {
        let mut parts = entry.splitn(2, ';');
        let Some(media) = parts.next().and_then(MediaType::from_name) else {
            continue;
        };

        let weight = match parts.next() {
            None => 1.0,
            Some(params) => match parse_weight(params) {
                Some(w) => w,
                None => continue,
            },
        };

        let slot = match media {
            MediaType::Json => &mut json_weight,
            MediaType::OctetStream => &mut binary_weight,
        };
        *slot = Some(slot.map_or(weight, |current| current.max(weight)));
    }

    match (binary_weight, json_weight) {
        (Some(b), Some(j)) if b > j => MediaType::OctetStream,
        (Some(b), None) if b > 0.0 => MediaType::OctetStream,
        _ => MediaType::Json,
    }
}

fn parse_weight(params: &str) -> Option<f32> {
    Q_WEIGHT
        .captures(params)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f32>().ok())
}

/// Whether the client asked for an SSZ response.
///
/// A repeated `Accept` header is the legacy multi-value form: any line that
/// is exactly the octet-stream type selects binary. Otherwise all lines are
/// read as one weighted list.
pub fn ssz_requested(headers: &HeaderMap) -> bool {
    let lines: Vec<&str> = headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    match lines.as_slice() {
        [] => false,
        [single] => preferred_media_type(single) == MediaType::OctetStream,
        many => {
            if many
                .iter()
                .any(|line| line.trim().eq_ignore_ascii_case(OCTET_STREAM_MEDIA_TYPE))
            {
                return true;
            }
            preferred_media_type(&many.join(",")) == MediaType::OctetStream
        }
    }
}

/// Whether the request body is SSZ. Requires exactly one `Content-Type`.
pub fn ssz_posted(headers: &HeaderMap) -> bool {
    let mut values = headers.get_all(CONTENT_TYPE).iter();
    match (values.next(), values.next()) {
        (Some(ct), None) => ct.as_bytes() == OCTET_STREAM_MEDIA_TYPE.as_bytes(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    fn accept(values: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for v in values {
            headers.append(ACCEPT, HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    #[test]
    fn test_no_accept_header_is_json() {
        assert!(!ssz_requested(&HeaderMap::new()));
    }

    #[test]
    fn test_single_octet_stream() {
        assert!(ssz_requested(&accept(&["application/octet-stream"])));
    }

    #[test]
    fn test_legacy_multi_value_selects_binary() {
        assert!(ssz_requested(&accept(&[
            "application/json",
            "application/octet-stream"
        ])));
    }

    #[test]
    fn test_higher_weight_wins() {
        assert!(ssz_requested(&accept(&[
            "application/json;q=0.9, application/octet-stream;q=1.0"
        ])));
        assert!(!ssz_requested(&accept(&[
            "application/json;q=1.0, application/octet-stream;q=0.9"
        ])));
    }

    #[test]
    fn test_tie_resolves_to_json() {
        assert!(!ssz_requested(&accept(&[
            "application/octet-stream, application/json"
        ])));
        assert!(!ssz_requested(&accept(&[
            "application/octet-stream;q=0.5,application/json;q=0.5"
        ])));
    }

    #[test]
    fn test_malformed_weight_skips_entry() {
        // The malformed JSON entry is dropped, so binary is the only candidate.
        assert!(ssz_requested(&accept(&[
            "application/json;q=abc, application/octet-stream;q=0.3"
        ])));
        // The malformed binary entry is dropped, JSON stays.
        assert!(!ssz_requested(&accept(&[
            "application/octet-stream;level=1, application/json;q=0.1"
        ])));
    }

    #[test]
    fn test_unrelated_types_ignored() {
        assert!(!ssz_requested(&accept(&["text/html, */*;q=0.8"])));
        assert!(ssz_requested(&accept(&[
            "text/html;q=1.0, application/octet-stream;q=0.2"
        ])));
    }

    #[test]
    fn test_zero_weight_binary_alone_is_json() {
        assert!(!ssz_requested(&accept(&["application/octet-stream;q=0"])));
    }

    #[test]
    fn test_ssz_posted() {
        let mut headers = HeaderMap::new();
        assert!(!ssz_posted(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM_MEDIA_TYPE));
        assert!(ssz_posted(&headers));

        headers.append(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
        assert!(!ssz_posted(&headers));

        let mut json = HeaderMap::new();
        json.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE));
        assert!(!ssz_posted(&json));
    }

    proptest! {
        #[test]
        fn prop_higher_weight_selected(j in 1u32..=1000, b in 1u32..=1000, binary_first in any::<bool>()) {
            prop_assume!(j != b);
            let json = format!("application/json;q={}.{:03}", j / 1000, j % 1000);
            let bin = format!("application/octet-stream;q={}.{:03}", b / 1000, b % 1000);
            let header = if binary_first { format!("{bin}, {json}") } else { format!("{json}, {bin}") };
            let expected = if b > j { MediaType::OctetStream } else { MediaType::Json };
            prop_assert_eq!(preferred_media_type(&header), expected);
        }

        #[test]
        fn prop_equal_weight_is_json(w in 1u32..=1000, binary_first in any::<bool>()) {
            let q = format!("{}.{:03}", w / 1000, w % 1000);
            let header = if binary_first {
                format!("application/octet-stream;q={q}, application/json;q={q}")
            } else {
                format!("application/json;q={q}, application/octet-stream;q={q}")
            };
            prop_assert_eq!(preferred_media_type(&header), MediaType::Json);
        }
    }
}
