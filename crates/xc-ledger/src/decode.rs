//! Decoding adapter for a known upstream quirk.
//!
//! The ledger's `/sql` endpoint returns rows whose JSON keys carry the SQL
//! column path verbatim, dot included (`"accounts.id": 10`). Serde field
//! renames cannot express a dot cleanly across the rest of the pipeline, so
//! the raw body is normalized once, here, before any structured decoding:
//! every `.` becomes `-`, giving `"accounts-id"`.
//!
//! This is only safe because the affected responses contain identifier keys
//! and integer values — no decimal literals. Keep this function away from
//! any endpoint that returns decimal strings.

/// Replace every `.` in the raw response body with `-`.
pub(crate) fn normalize_dotted_keys(body: String) -> String {
    body.replace('.', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_in_keys_become_dashes() {
        let raw = r#"[{"accounts.id": 10}, {"accounts.id": 20}]"#.to_string();
        let fixed = normalize_dotted_keys(raw);
        assert_eq!(fixed, r#"[{"accounts-id": 10}, {"accounts-id": 20}]"#);
    }

    #[test]
    fn empty_body_passes_through() {
        assert_eq!(normalize_dotted_keys("[]".to_string()), "[]");
    }
}
