//! Per-finding normalization into the report's record shapes.
//!
//! Every finding is mapped to the accounts it belongs to and a
//! [`NormalizedFinding`] whose detail depends on the producing provider.
//! Nothing here fails: malformed attributes degrade to empty values.

use breachwatch_core::{is_truthy, Finding};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Account label used when a finding cannot be tied to any email.
pub const UNKNOWN_ACCOUNT: &str = "<unknown>";

/// Name of the paced breach provider.
pub const HIBP_PROVIDER: &str = "haveibeenpwned";

/// Name of the query provider.
pub const DEHASHED_PROVIDER: &str = "dehashed";

/// Fields describing where a dehashed record came from rather than what leaked.
const DEHASHED_BOOKKEEPING_FIELDS: [&str; 4] = ["id", "database_name", "source", "breach"];

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[A-Z0-9._%+\-]+@[A-Z0-9.\-]+\.[A-Z]{2,}").expect("valid email regex")
});

/// A finding as it appears in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedFinding {
    /// Provider that produced the finding
    pub provider: String,
    /// Finding category
    pub category: String,
    /// Provider-chosen label
    pub identifier: String,
    /// Provider-specific view of the record
    #[serde(flatten)]
    pub detail: FindingDetail,
}

/// Provider-specific part of a [`NormalizedFinding`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FindingDetail {
    /// A breach, paste or data class from the paced provider
    Breach(BreachDetail),
    /// A leaked record from the query provider
    LeakRecord(LeakRecordDetail),
    /// Anything from any other provider
    Generic(GenericDetail),
}

/// Breach view of a paced-provider finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreachDetail {
    /// What and when
    pub scope: BreachScope,
    /// What leaked
    pub leaked_data: BreachLeakedData,
    /// Presentation data
    pub source: BreachSource,
}

/// What and when a breach covered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[allow(missing_docs)]
pub struct BreachScope {
    /// `Name` when present, else the finding identifier
    pub breach_name: Value,
    pub title: Option<Value>,
    pub domain: Option<Value>,
    pub breach_date: Option<Value>,
    pub added_date: Option<Value>,
    pub modified_date: Option<Value>,
    pub pwn_count: Option<Value>,
    pub is_verified: Option<Value>,
    pub is_sensitive: Option<Value>,
    pub is_retired: Option<Value>,
    pub is_spam_list: Option<Value>,
    pub is_malware: Option<Value>,
    pub is_fabricated: Option<Value>,
    pub is_stealer_log: Option<Value>,
}

/// Data leaked in a breach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreachLeakedData {
    /// `DataClasses` when it is a list, else empty
    pub data_classes: Vec<Value>,
    /// Free-text description
    pub description: Option<Value>,
}

/// Presentation data for a breach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreachSource {
    /// Logo URL or path
    pub logo_path: Option<Value>,
}

/// Record view of a query-provider finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakRecordDetail {
    /// Provider record id
    pub record_id: Option<Value>,
    /// Where the record came from
    pub scope: LeakRecordScope,
    /// Non-empty fields, minus bookkeeping fields
    pub leaked_data: Map<String, Value>,
    /// Names of every non-empty field, sorted
    pub leaked_fields: Vec<String>,
}

/// Origin of a leaked record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeakRecordScope {
    /// First of `database_name`, `source`, `breach` carrying a value
    pub source: Option<Value>,
    /// Leaked username
    pub username: Option<Value>,
    /// Leaked domain
    pub domain: Option<Value>,
    /// Leaked IP address
    pub ip_address: Option<Value>,
}

/// Untyped view of a finding from any other provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericDetail {
    /// Always an empty object
    pub scope: Map<String, Value>,
    /// The attributes, when they are an object
    pub leaked_data: Map<String, Value>,
    /// Names of every non-empty attribute, sorted
    pub leaked_fields: Vec<String>,
}

impl FindingDetail {
    /// Names of leaked fields, if this shape records them.
    #[must_use]
    pub fn leaked_fields(&self) -> &[String] {
        match self {
            Self::Breach(_) => &[],
            Self::LeakRecord(detail) => &detail.leaked_fields,
            Self::Generic(detail) => &detail.leaked_fields,
        }
    }
}

/// Whether a value counts as present: not null, non-blank strings,
/// non-empty arrays and objects. Numbers and booleans always count.
#[must_use]
pub fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Every email found in the strings of `value`, lower-cased, sorted, distinct.
#[must_use]
pub fn extract_emails(value: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    collect_emails(value, &mut found);
    found
}

fn collect_emails(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::String(text) => {
            found.extend(emails_in(text));
        }
        Value::Array(items) => {
            for item in items {
                collect_emails(item, found);
            }
        }
        Value::Object(map) => {
            for nested in map.values() {
                collect_emails(nested, found);
            }
        }
        _ => {}
    }
}

fn object_emails(attributes: &Map<String, Value>) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for value in attributes.values() {
        collect_emails(value, &mut found);
    }
    found
}

fn emails_in(text: &str) -> impl Iterator<Item = String> + '_ {
    EMAIL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
}

/// Sorted names of the non-empty fields of an object; empty for non-objects.
#[must_use]
pub fn non_empty_keys(value: &Value) -> Vec<String> {
    value.as_object().map_or_else(Vec::new, object_non_empty_keys)
}

fn object_non_empty_keys(object: &Map<String, Value>) -> Vec<String> {
    let mut keys: Vec<String> = object
        .iter()
        .filter(|(_, value)| is_non_empty(value))
        .map(|(key, _)| key.clone())
        .collect();
    keys.sort_unstable();
    keys
}

/// Normalize one finding, returning the accounts it belongs to (sorted,
/// distinct, never empty) and its report record.
///
/// The shape is picked by the finding's own provider name.
#[must_use]
pub fn normalize_finding(
    finding: &Finding,
    target_email: Option<&str>,
) -> (Vec<String>, NormalizedFinding) {
    let empty = Map::new();
    let attributes = finding.attributes.as_object().unwrap_or(&empty);
    let target = target_email.map(str::to_lowercase);

    let (accounts, detail) = match finding.provider.trim().to_lowercase().as_str() {
        HIBP_PROVIDER => {
            let mut accounts = object_emails(attributes);
            accounts.extend(target);
            (accounts, FindingDetail::Breach(breach_detail(finding, attributes)))
        }
        DEHASHED_PROVIDER => (
            record_accounts(finding, attributes, target),
            FindingDetail::LeakRecord(leak_record_detail(attributes)),
        ),
        _ => (
            record_accounts(finding, attributes, target),
            FindingDetail::Generic(GenericDetail {
                scope: Map::new(),
                leaked_data: attributes.clone(),
                leaked_fields: object_non_empty_keys(attributes),
            }),
        ),
    };

    let mut accounts: Vec<String> = accounts.into_iter().collect();
    if accounts.is_empty() {
        accounts.push(UNKNOWN_ACCOUNT.to_string());
    }

    let normalized = NormalizedFinding {
        provider: finding.provider.clone(),
        category: finding.category.clone(),
        identifier: finding.identifier.clone(),
        detail,
    };
    (accounts, normalized)
}

/// Accounts for a record-style finding: emails in the attributes, else
/// emails in the identifier, else the target.
fn record_accounts(
    finding: &Finding,
    attributes: &Map<String, Value>,
    target: Option<String>,
) -> BTreeSet<String> {
    let mut accounts = object_emails(attributes);
    if accounts.is_empty() {
        accounts.extend(emails_in(&finding.identifier));
    }
    if accounts.is_empty() {
        accounts.extend(target);
    }
    accounts
}

fn breach_detail(finding: &Finding, attributes: &Map<String, Value>) -> BreachDetail {
    let field = |key: &str| attributes.get(key).cloned();

    let breach_name = attributes
        .get("Name")
        .filter(|name| is_truthy(name))
        .cloned()
        .unwrap_or_else(|| Value::String(finding.identifier.clone()));

    let data_classes = match attributes.get("DataClasses") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    BreachDetail {
        scope: BreachScope {
            breach_name,
            title: field("Title"),
            domain: field("Domain"),
            breach_date: field("BreachDate"),
            added_date: field("AddedDate"),
            modified_date: field("ModifiedDate"),
            pwn_count: field("PwnCount"),
            is_verified: field("IsVerified"),
            is_sensitive: field("IsSensitive"),
            is_retired: field("IsRetired"),
            is_spam_list: field("IsSpamList"),
            is_malware: field("IsMalware"),
            is_fabricated: field("IsFabricated"),
            is_stealer_log: field("IsStealerLog"),
        },
        leaked_data: BreachLeakedData {
            data_classes,
            description: field("Description"),
        },
        source: BreachSource {
            logo_path: field("LogoPath"),
        },
    }
}

fn leak_record_detail(attributes: &Map<String, Value>) -> LeakRecordDetail {
    let field = |key: &str| attributes.get(key).cloned();

    let leaked_data = attributes
        .iter()
        .filter(|(key, value)| {
            is_non_empty(value) && !DEHASHED_BOOKKEEPING_FIELDS.contains(&key.as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let leaked_fields = object_non_empty_keys(attributes);

    LeakRecordDetail {
        record_id: field("id"),
        scope: LeakRecordScope {
            source: ["database_name", "source", "breach"]
                .iter()
                .find_map(|key| attributes.get(*key).filter(|value| is_truthy(value)))
                .cloned(),
            username: field("username"),
            domain: field("domain"),
            ip_address: field("ip_address"),
        },
        leaked_data,
        leaked_fields,
    }
}
