use mediaflow_relay::models::RelayQuery;
use mediaflow_relay::proxy::target::{validate_target, TargetError};

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_missing_url() {
    assert_eq!(validate_target(&[]), Err(TargetError::MissingParameter));
    assert_eq!(
        validate_target(&["".to_string()]),
        Err(TargetError::MissingParameter)
    );
}

#[test]
fn test_multiple_urls() {
    let values = vec![
        "https://a.example/one.m3u8".to_string(),
        "https://b.example/two.m3u8".to_string(),
    ];
    assert_eq!(validate_target(&values), Err(TargetError::MultipleValues));
}

#[test]
fn test_relative_url_is_rejected() {
    let err = validate_target(&["/relative/path".to_string()]).unwrap_err();
    assert_eq!(err, TargetError::InvalidUrl("/relative/path".to_string()));
    assert_eq!(err.to_string(), "The URL (/relative/path) is invalid");
}

#[test]
fn test_url_without_authority_is_rejected() {
    assert!(matches!(
        validate_target(&["mailto:someone@example.com".to_string()]),
        Err(TargetError::InvalidUrl(_))
    ));
}

#[test]
fn test_valid_url_is_returned_parsed() {
    let url = validate_target(&["https://cdn.example:8443/live/master.m3u8?token=x".to_string()])
        .unwrap();
    assert_eq!(url.host_str(), Some("cdn.example"));
    assert_eq!(url.port(), Some(8443));
    assert_eq!(url.path(), "/live/master.m3u8");
    assert_eq!(url.query(), Some("token=x"));
}

#[test]
fn test_query_collects_every_url_and_first_code() {
    let query = RelayQuery::from_pairs(pairs(&[
        ("url", "https://a.example/"),
        ("code", "abc123"),
        ("other", "ignored"),
        ("url", "https://b.example/"),
        ("code", "second"),
    ]));

    assert_eq!(query.urls.len(), 2);
    assert_eq!(query.access_code(), Some("abc123"));
}

#[test]
fn test_empty_code_is_not_forwarded() {
    let query = RelayQuery::from_pairs(pairs(&[("url", "https://a.example/"), ("code", "")]));
    assert_eq!(query.access_code(), None);
}
