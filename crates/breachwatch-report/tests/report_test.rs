//! Integration tests for consolidated report building.

use breachwatch_core::{Finding, ProviderResult, SearchRequest, SearchResponse};
use breachwatch_report::{build_report, ReportBuilder};
use serde_json::{json, Value};

fn response_of(results: Vec<ProviderResult>) -> SearchResponse {
    results.into_iter().collect()
}

fn report_value(request: &SearchRequest, response: &SearchResponse) -> Value {
    ReportBuilder::new()
        .with_generated_at("2026-02-21T00:00:00Z")
        .build(request, response)
        .to_value()
        .unwrap()
}

fn combined_fixture() -> (SearchRequest, SearchResponse) {
    let request =
        SearchRequest::for_email("user@example.com").with_providers(["dehashed", "haveibeenpwned"]);
    let response = response_of(vec![
        ProviderResult::success(
            "dehashed",
            vec![Finding::new(
                "dehashed",
                "leak_record",
                "user@example.com",
                json!({
                    "id": "abc123",
                    "email": ["user@example.com"],
                    "username": "example_user",
                    "password": "secret",
                    "database_name": "combo_db",
                    "ip_address": "1.2.3.4",
                    "empty_field": ""
                }),
            )],
        ),
        ProviderResult::success(
            "haveibeenpwned",
            vec![Finding::new(
                "haveibeenpwned",
                "breach",
                "LinkedIn",
                json!({
                    "Name": "LinkedIn",
                    "Title": "LinkedIn",
                    "Domain": "linkedin.com",
                    "BreachDate": "2012-05-05",
                    "PwnCount": 12345,
                    "DataClasses": ["Email addresses", "Passwords"],
                    "Description": "Example leak",
                    "LogoPath": "https://example.com/logo.png",
                    "IsVerified": true
                }),
            )],
        ),
    ]);
    (request, response)
}

#[test]
fn test_report_combines_provider_data() {
    let (request, response) = combined_fixture();
    let report = report_value(&request, &response);

    assert_eq!(report["schema_version"], "1.0.0");
    assert_eq!(report["generated_at"], "2026-02-21T00:00:00Z");
    assert_eq!(report["target_email"], "user@example.com");
    assert_eq!(report["providers_requested"], json!(["dehashed", "haveibeenpwned"]));

    let scope = &report["scope"];
    assert_eq!(scope["total_findings"], 2);
    assert_eq!(scope["accounts_with_hits"], 1);
    assert_eq!(scope["provider_hit_counts"], json!({"dehashed": 1, "haveibeenpwned": 1}));
    assert_eq!(scope["unique_hibp_breaches"], json!(["LinkedIn"]));
    assert_eq!(
        scope["hibp_leaked_data_classes"],
        json!(["Email addresses", "Passwords"])
    );
    assert_eq!(
        scope["dehashed_leaked_fields"],
        json!(["database_name", "email", "id", "ip_address", "password", "username"])
    );

    let account_hit = &report["account_hits"][0];
    assert_eq!(account_hit["account"], "user@example.com");
    assert_eq!(account_hit["total_hits"], 2);
    assert_eq!(account_hit["providers"]["dehashed"]["hit_count"], 1);
    assert_eq!(account_hit["providers"]["haveibeenpwned"]["hit_count"], 1);

    let dehashed = &account_hit["providers"]["dehashed"]["findings"][0];
    assert_eq!(dehashed["record_id"], "abc123");
    assert_eq!(dehashed["scope"]["source"], "combo_db");
    assert_eq!(dehashed["scope"]["domain"], Value::Null);
    assert_eq!(dehashed["leaked_data"]["password"], "secret");
    assert!(dehashed["leaked_data"].get("id").is_none());
    assert!(dehashed["leaked_data"].get("database_name").is_none());
    assert!(!dehashed["leaked_fields"]
        .as_array()
        .unwrap()
        .contains(&json!("empty_field")));

    let hibp = &account_hit["providers"]["haveibeenpwned"]["findings"][0];
    assert_eq!(hibp["scope"]["breach_name"], "LinkedIn");
    assert_eq!(hibp["scope"]["pwn_count"], 12345);
    assert_eq!(hibp["scope"]["is_verified"], true);
    assert_eq!(hibp["scope"]["is_sensitive"], Value::Null);
    assert_eq!(hibp["leaked_data"]["description"], "Example leak");
    assert_eq!(hibp["source"]["logo_path"], "https://example.com/logo.png");
}

#[test]
fn test_report_is_deterministic() {
    let (request, response) = combined_fixture();
    let first = build_report(&request, &response, Some("2026-02-21T00:00:00Z".to_string()));
    let second = build_report(&request, &response, Some("2026-02-21T00:00:00Z".to_string()));

    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert!(first.to_json_pretty().unwrap().contains("\n  \"schema_version\""));
}

#[test]
fn test_dehashed_uses_target_email_fallback() {
    let request = SearchRequest::for_email("target@example.com").with_provider("dehashed");
    let response = response_of(vec![ProviderResult::success(
        "dehashed",
        vec![Finding::new(
            "dehashed",
            "leak_record",
            "row-1",
            json!({"id": "abc", "password": "pw"}),
        )],
    )]);

    let report = report_value(&request, &response);

    assert_eq!(report["account_hits"][0]["account"], "target@example.com");
    assert_eq!(report["account_hits"][0]["providers"]["dehashed"]["hit_count"], 1);
}

#[test]
fn test_generic_provider_uses_unknown_account() {
    let request = SearchRequest::new().with_provider("custom");
    let response = response_of(vec![ProviderResult::success(
        "custom",
        vec![Finding::new("custom", "custom_hit", "record-1", json!({"field": "value"}))],
    )]);

    let report = ReportBuilder::new()
        .with_generated_at("2026-02-21T10:00:00+00:00")
        .build(&request, &response);

    assert_eq!(report.generated_at, "2026-02-21T10:00:00+00:00");
    assert_eq!(report.account_hits[0].account, "<unknown>");
    assert_eq!(report.account_hits[0].providers["custom"].hit_count, 1);
    assert_eq!(report.scope.total_findings, 1);
    assert_eq!(report.target_email, None);
}

#[test]
fn test_generic_provider_uses_target_email() {
    let request = SearchRequest::for_email("target@example.com").with_provider("custom");
    let response = response_of(vec![ProviderResult::success(
        "custom",
        vec![Finding::new("custom", "custom_hit", "record-1", json!({"field": "value"}))],
    )]);

    let report = report_value(&request, &response);

    assert_eq!(report["account_hits"][0]["account"], "target@example.com");
    assert_eq!(report["account_hits"][0]["providers"]["custom"]["findings"][0]["scope"], json!({}));
}

#[test]
fn test_hibp_edge_values() {
    let request = SearchRequest::new().with_provider("haveibeenpwned");
    let response = response_of(vec![ProviderResult::success(
        "haveibeenpwned",
        vec![
            Finding::new("haveibeenpwned", "breach", "", json!({"DataClasses": "Passwords"})),
            Finding::new("haveibeenpwned", "breach", "Example", json!({"DataClasses": [null, 123]})),
        ],
    )]);

    let report = ReportBuilder::new().build(&request, &response);

    assert_eq!(report.account_hits.len(), 1);
    assert_eq!(report.account_hits[0].account, "<unknown>");
    assert_eq!(report.account_hits[0].total_hits, 2);
    assert_eq!(report.scope.hibp_leaked_data_classes, vec!["123"]);
    assert_eq!(report.scope.unique_hibp_breaches, vec!["Example"]);
}

#[test]
fn test_non_object_attributes_yield_no_fields() {
    let request = SearchRequest::for_email("user@example.com").with_provider("dehashed");
    let response = response_of(vec![ProviderResult::success(
        "dehashed",
        vec![Finding::new(
            "dehashed",
            "leak_record",
            "record-xyz",
            json!("raw-string other@example.com"),
        )],
    )]);

    let report = report_value(&request, &response);

    let dehashed = &report["account_hits"][0]["providers"]["dehashed"]["findings"][0];
    assert_eq!(dehashed["leaked_fields"], json!([]));
    assert_eq!(dehashed["leaked_data"], json!({}));
    // Emails inside a plain-string payload are not scanned.
    assert_eq!(report["account_hits"][0]["account"], "user@example.com");
}

#[test]
fn test_provider_errors_are_reported() {
    let request = SearchRequest::for_email("user@example.com").with_provider("haveibeenpwned");
    let response = response_of(vec![ProviderResult::failure("haveibeenpwned", "rate limited")
        .with_status_code(Some(429))]);

    let report = report_value(&request, &response);

    let summary = &report["provider_results"]["haveibeenpwned"];
    assert_eq!(summary["ok"], false);
    assert_eq!(summary["status_code"], 429);
    assert_eq!(summary["error"], "rate limited");
    assert_eq!(summary["finding_count"], 0);
    assert_eq!(report["scope"]["total_findings"], 0);
    assert_eq!(report["account_hits"], json!([]));
}

#[test]
fn test_accounts_and_findings_are_ordered() {
    let request = SearchRequest::new().with_providers(["custom", "dehashed"]);
    let response = response_of(vec![
        ProviderResult::success(
            "dehashed",
            vec![
                Finding::new("dehashed", "leak_record", "b", json!({"email": "Zed@Example.com"})),
                Finding::new("dehashed", "leak_record", "a", json!({"email": "amy@example.com"})),
            ],
        ),
        ProviderResult::success(
            "custom",
            vec![
                Finding::new("custom", "hit", "first", json!({"owner": "amy@example.com"})),
                Finding::new("custom", "hit", "second", json!({"owner": "AMY@example.com"})),
            ],
        ),
    ]);

    let report = ReportBuilder::new().build(&request, &response);

    let accounts: Vec<&str> = report.account_hits.iter().map(|a| a.account.as_str()).collect();
    assert_eq!(accounts, vec!["amy@example.com", "zed@example.com"]);

    let amy = &report.account_hits[0];
    assert_eq!(amy.total_hits, 3);
    let providers: Vec<&String> = amy.providers.keys().collect();
    assert_eq!(providers, vec!["custom", "dehashed"]);
    let custom: Vec<&str> = amy.providers["custom"]
        .findings
        .iter()
        .map(|f| f.identifier.as_str())
        .collect();
    assert_eq!(custom, vec!["first", "second"]);
}

#[test]
fn test_finding_with_several_emails_counts_for_each() {
    let request = SearchRequest::new().with_provider("dehashed");
    let response = response_of(vec![ProviderResult::success(
        "dehashed",
        vec![Finding::new(
            "dehashed",
            "leak_record",
            "x",
            json!({"email": ["one@example.com", "two@example.com"]}),
        )],
    )]);

    let report = ReportBuilder::new().build(&request, &response);

    assert_eq!(report.scope.accounts_with_hits, 2);
    assert_eq!(report.scope.total_findings, 1);
    assert!(report.account_hits.iter().all(|a| a.total_hits == 1));
}
