use axum::http::HeaderMap;
use regex::Regex;

/// Normalize a submitted coin name or slug to the canonical slug form:
/// lowercase, alphanumeric and hyphens only, runs collapsed to one
/// hyphen. Empty output means the submission was garbage.
pub fn slugify(input: &str) -> String {
    let replace = Regex::new(r"[_\s]+").unwrap();
    let mut s = replace.replace_all(input, "-").into_owned();

    let clean = Regex::new(r"[^A-Za-z0-9-]").unwrap();
    s = clean.replace_all(&s, "").into_owned();

    let collapse = Regex::new(r"-+").unwrap();
    s = collapse.replace_all(&s, "-").into_owned();

    s.trim_matches('-').to_lowercase()
}

/// Voter fingerprint: first hop of X-Forwarded-For, set by the reverse
/// proxy in front of us. Absent header means a direct local request.
pub fn voter_fingerprint(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "direct".to_string())
}

#[cfg(test)]
mod tests {
    use super::{slugify, voter_fingerprint};
    use axum::http::HeaderMap;

    #[test]
    fn test_basic() {
        assert_eq!(slugify("Shiba Inu"), "shiba-inu");
        assert_eq!(slugify("pepe_2-0"), "pepe-2-0");
        assert_eq!(slugify("BitCoin"), "bitcoin");
    }

    #[test]
    fn test_collapses_separators() {
        assert_eq!(slugify("  doge   killer  "), "doge-killer");
        assert_eq!(slugify("a---b___c"), "a-b-c");
    }

    #[test]
    fn test_strips_special_characters() {
        assert_eq!(slugify("moon!@#coin"), "mooncoin");
        assert_eq!(slugify("!@#$%^&*()"), "");
    }

    #[test]
    fn test_trims_edge_hyphens() {
        assert_eq!(slugify("-edge-case-"), "edge-case");
        assert_eq!(slugify("___"), "");
    }

    #[test]
    fn fingerprint_takes_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        assert_eq!(voter_fingerprint(&headers), "203.0.113.9");
    }

    #[test]
    fn fingerprint_falls_back_without_header() {
        assert_eq!(voter_fingerprint(&HeaderMap::new()), "direct");
    }
}
