// Record data in canonical presentation form.
//
// Providers disagree on trailing dots, case, and TXT quoting. Both the
// snapshot adapters and the write paths compare values through these
// helpers so a record is matched on what it says, not how it is spelled.

/// Types whose value is (or ends in) a host name.
pub fn is_host_valued(record_type: &str) -> bool {
    matches!(record_type, "CNAME" | "NS" | "MX" | "PTR" | "SRV" | "DNAME")
}

/// Canonical value text for `record_type`.
///
/// Host-valued types are lower-cased and lose the trailing dot; TXT loses
/// its presentation quotes (multi-string TXT is concatenated).
pub fn normalize_value(record_type: &str, value: &str) -> String {
    let value = value.trim();
    if record_type == "TXT" {
        return unquote_txt(value);
    }
    if is_host_valued(record_type) {
        return value.trim_end_matches('.').to_ascii_lowercase();
    }
    value.to_owned()
}

/// `"v=spf1 " "-all"` → `v=spf1 -all`. Unquoted input is returned as-is.
pub fn unquote_txt(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return value.to_owned();
    };
    inner.split("\" \"").collect::<String>().replace("\\\"", "\"")
}

/// Whether two values of `record_type` denote the same data.
pub fn same_value(record_type: &str, a: &str, b: &str) -> bool {
    let rtype = record_type.to_ascii_uppercase();
    normalize_value(&rtype, a) == normalize_value(&rtype, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_values_are_canonical() {
        assert_eq!(normalize_value("CNAME", "Target.Example.com."), "target.example.com");
        assert_eq!(normalize_value("A", "1.1.1.1"), "1.1.1.1");
    }

    #[test]
    fn txt_quotes_are_stripped() {
        assert_eq!(unquote_txt(r#""v=spf1 include:_spf.google.com ~all""#), "v=spf1 include:_spf.google.com ~all");
        assert_eq!(unquote_txt(r#""part one " "part two""#), "part one part two");
        assert_eq!(unquote_txt("bare"), "bare");
    }

    #[test]
    fn same_value_ignores_spelling_only() {
        assert!(same_value("txt", r#""v=spf1 -all""#, "v=spf1 -all"));
        assert!(same_value("MX", "Mail.Example.com.", "mail.example.com"));
        assert!(!same_value("TXT", "v=spf1 -all", "google-site-verification=abc"));
        assert!(!same_value("TXT", "Token", "token"));
    }
}
