//! Coordinate reference system identifiers.
//!
//! Identifiers are carried as `AUTHORITY:CODE` strings (e.g. `EPSG:25833`).
//! `GeoJSON` files declare them through the legacy named `crs` member, which
//! uses OGC URNs.

const OGC_URN_PREFIX: &str = "urn:ogc:def:crs:";

/// Normalizes an OGC URN or `authority:code` string to `AUTHORITY:CODE`.
#[must_use]
pub fn normalize_crs_name(name: &str) -> String {
    let name = name.trim();

    if let Some(rest) = name.strip_prefix(OGC_URN_PREFIX) {
        let parts: Vec<&str> = rest.split(':').collect();
        return match (parts.first(), parts.last()) {
            (Some(authority), Some(code)) if parts.len() > 1 => {
                format!("{}:{code}", authority.to_uppercase())
            }
            _ => rest.to_string(),
        };
    }

    match name.split_once(':') {
        Some((authority, code)) => format!("{}:{code}", authority.to_uppercase()),
        None => name.to_string(),
    }
}

/// Builds the OGC URN for an `AUTHORITY:CODE` identifier.
#[must_use]
pub fn crs_urn(crs: &str) -> String {
    let normalized = normalize_crs_name(crs);
    match normalized.split_once(':') {
        Some(("OGC", code)) => format!("{OGC_URN_PREFIX}OGC:1.3:{code}"),
        Some((authority, code)) => format!("{OGC_URN_PREFIX}{authority}::{code}"),
        None => normalized,
    }
}

/// Whether two identifiers name the same CRS.
#[must_use]
pub fn same_crs(a: &str, b: &str) -> bool {
    normalize_crs_name(a) == normalize_crs_name(b)
}

/// Extracts the CRS name from a `GeoJSON` `crs` member.
#[must_use]
pub fn crs_from_member(member: &serde_json::Value) -> Option<String> {
    member
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(serde_json::Value::as_str)
        .map(normalize_crs_name)
}

/// Builds a named `crs` member for `crs`.
#[must_use]
pub fn crs_member(crs: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "name",
        "properties": { "name": crs_urn(crs) },
    })
}
