//! Korean spreadsheet headers to snake_case field names.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

/// Known headers and their field names.
const DIRECT_MAPPING: &[(&str, &str)] = &[
    ("고객명", "customer_name"),
    ("연락처", "phone"),
    ("전화번호", "phone"),
    ("휴대폰", "phone"),
    ("핸드폰", "phone"),
    ("주소", "address"),
    ("이메일", "email"),
    ("E-mail", "email"),
    ("Email", "email"),
    ("생년월일", "birth_date"),
    ("성별", "gender"),
    ("직업", "occupation"),
    ("회사", "company"),
    ("직장", "company"),
    ("구매 작가명", "purchased_artist"),
    ("관심 작가", "interested_artist"),
    ("선호 작가", "preferred_artist"),
    ("작품 캡션 정보", "artwork_caption"),
    ("(원) 작품가", "original_price"),
    ("원작품가", "original_price"),
    ("작품가", "artwork_price"),
    ("(실재) 입금가", "actual_payment"),
    ("실제입금가", "actual_payment"),
    ("입금가", "payment_amount"),
    ("결제 방식", "payment_method"),
    ("결제방법", "payment_method"),
    ("특이사항", "notes"),
    ("메모", "notes"),
    ("비고", "notes"),
    ("등록일", "registration_date"),
    ("가입일", "registration_date"),
    ("판매 루트", "sales_route"),
    ("판매루트", "sales_route"),
    ("날짜", "date"),
];

#[allow(clippy::unwrap_used)]
static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w가-힣\s]").unwrap());

#[allow(clippy::unwrap_used)]
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

fn direct_field(header: &str) -> Option<&'static str> {
    DIRECT_MAPPING
        .iter()
        .find(|(ko, _)| *ko == header)
        .map(|(_, en)| *en)
}

/// Field name for a header outside the dictionary: punctuation dropped,
/// lowercased, whitespace runs joined with `_`.
#[must_use]
pub fn fallback_normalize(header: &str) -> String {
    let cleaned = STRIP_RE.replace_all(header, "");
    let normalized = WHITESPACE_RE
        .replace_all(&cleaned.to_lowercase(), "_")
        .into_owned();
    if normalized.is_empty() {
        "unknown_field".to_string()
    } else {
        normalized
    }
}

/// Map each header to a field name.
///
/// Blank headers and spreadsheet placeholders (`column…`) become
/// `unknown_field_{n}`, where `n` is one past the number of headers mapped so
/// far.
#[must_use]
pub fn analyze_headers(headers: &[String]) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    let mut pending = Vec::new();

    for header in headers {
        let clean = header.trim();
        if clean.is_empty() || clean.starts_with("column") {
            let field = format!("unknown_field_{}", result.len() + 1);
            result.insert(header.clone(), field);
            continue;
        }
        match direct_field(clean) {
            Some(field) => {
                result.insert(clean.to_string(), field.to_string());
            }
            None => pending.push(clean.to_string()),
        }
    }

    for header in pending {
        let field = fallback_normalize(&header);
        result.insert(header, field);
    }
    result
}

/// Rename row keys with the mapping derived from the first row's keys.
/// Returns the renamed rows and the mapping used.
#[must_use]
pub fn process_data(rows: &[Map<String, Value>]) -> (Vec<Map<String, Value>>, BTreeMap<String, String>) {
    let Some(first) = rows.first() else {
        return (vec![], BTreeMap::new());
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let mapping = analyze_headers(&headers);

    let mapped = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|(key, value)| {
                    let field = mapping.get(key).cloned().unwrap_or_else(|| key.clone());
                    (field, value.clone())
                })
                .collect()
        })
        .collect();
    (mapped, mapping)
}
