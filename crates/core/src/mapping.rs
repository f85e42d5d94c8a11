//! Field-mapping suggestion and application (PRD-31).
//!
//! Source headers from legacy exports rarely match our target field names
//! exactly, so [`suggest`] scores every (header, target field) pair:
//!
//! - exact normalized match → confidence 1.0
//! - both forms in one static synonym group → 0.9
//! - token-set Jaccard similarity otherwise, floored at 0.3
//!
//! Ties break by shorter Levenshtein distance, then by the source
//! column's left-to-right position. The whole thing is a pure function of
//! (headers, schema, synonym table): identical inputs always produce the
//! identical ranked output.
//!
//! The second half of the module is the confirmed mapping itself:
//! [`FieldMapping`] pairs with an optional [`Transform`], validated
//! against the schema and applied row by row during validation.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::TargetSchema;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Confidence for an exact normalized match.
pub const CONFIDENCE_EXACT: f64 = 1.0;

/// Confidence for a synonym-table match.
pub const CONFIDENCE_SYNONYM: f64 = 0.9;

/// Jaccard similarity below this is not suggested at all.
pub const MIN_SUGGESTION_CONFIDENCE: f64 = 0.3;

/// Column names that recur in ERP/CRM exports, grouped by meaning. All
/// entries are in normalized form. Turkish spellings appear because the
/// bulk of legacy sources we ingest are Turkish ERP exports.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["email", "e mail", "mail", "email address", "e posta", "eposta"],
    &["phone", "telephone", "phone number", "tel", "gsm", "mobile", "telefon"],
    &["name", "full name", "title", "company name", "unvan", "ad", "ad soyad"],
    &["code", "sku", "item code", "product code", "stock code", "kod", "stok kodu"],
    &["address", "street address", "adres"],
    &["city", "town", "sehir", "il"],
    &["tax number", "vat number", "tax id", "tax no", "vergi no", "vergi numarasi"],
    &["tax office", "vergi dairesi"],
    &["price", "unit price", "amount", "fiyat", "birim fiyat", "tutar"],
    &["quantity", "qty", "count", "miktar", "adet"],
    &["unit", "uom", "unit of measure", "birim"],
    &["currency", "currency code", "doviz", "para birimi"],
    &["description", "desc", "notes", "note", "memo", "aciklama"],
    &["balance", "opening balance", "bakiye", "acilis bakiyesi"],
    &["date", "transaction date", "tarih"],
    &["barcode", "ean", "barkod"],
];

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Fold the Latin-1 and Turkish diacritics seen in real exports.
fn fold_diacritic(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ğ' => 'g',
        'ì' | 'í' | 'î' | 'ï' | 'ı' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
        'ş' => 's',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        _ => c,
    }
}

fn push_normalized(out: &mut String, c: char) {
    if c.is_alphanumeric() {
        out.push(c);
    } else if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

/// Lower-case, strip diacritics, and collapse every punctuation/space run
/// into a single space: `"E-Mail Adresi "` becomes `"e mail adresi"`.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        // Both Turkish capital I forms fold to a plain `i`; going through
        // to_lowercase() would leave a combining dot behind.
        if c == 'İ' || c == 'I' {
            push_normalized(&mut out, 'i');
            continue;
        }
        for lc in c.to_lowercase() {
            push_normalized(&mut out, fold_diacritic(lc));
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

fn token_set(normalized: &str) -> BTreeSet<&str> {
    normalized.split_whitespace().collect()
}

// ---------------------------------------------------------------------------
// Similarity
// ---------------------------------------------------------------------------

/// Jaccard similarity of two token sets. Empty-vs-anything is 0.
pub fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Classic two-row Levenshtein distance over characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn in_same_synonym_group(a: &str, b: &str) -> bool {
    SYNONYM_GROUPS
        .iter()
        .any(|group| group.contains(&a) && group.contains(&b))
}

// ---------------------------------------------------------------------------
// Suggestion
// ---------------------------------------------------------------------------

/// One candidate source column for a target field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionCandidate {
    /// Original (un-normalized) source header.
    pub source_field: String,

    pub confidence: f64,

    /// Left-to-right position of the header in the upload.
    pub source_position: usize,
}

/// Ranked candidates for one target field, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSuggestion {
    pub target_field: String,
    pub label: String,
    pub required: bool,
    pub candidates: Vec<SuggestionCandidate>,
}

/// Full suggestion result for an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestions {
    pub entity_type: String,

    /// One entry per schema field, in schema order.
    pub fields: Vec<FieldSuggestion>,

    /// Required target fields with no candidate at all.
    pub unmatched_required: Vec<String>,

    /// Fraction of required fields with at least one candidate.
    /// 1.0 when the schema has no required fields.
    pub required_coverage: f64,
}

/// Score every source header against every target field and return the
/// ranked suggestions. Pure and deterministic.
pub fn suggest(headers: &[String], schema: &TargetSchema) -> MappingSuggestions {
    let normalized: Vec<(usize, &String, String)> = headers
        .iter()
        .enumerate()
        .map(|(pos, raw)| (pos, raw, normalize(raw)))
        .collect();

    let mut fields = Vec::with_capacity(schema.fields.len());
    let mut unmatched_required = Vec::new();
    let mut required_total = 0usize;
    let mut required_matched = 0usize;

    for target in &schema.fields {
        let target_norm = normalize(&target.name);
        let target_tokens = token_set(&target_norm);

        // (candidate, levenshtein) pairs; the distance is only a sort key.
        let mut scored: Vec<(SuggestionCandidate, usize)> = Vec::new();
        for (pos, raw, norm) in &normalized {
            if norm.is_empty() {
                continue;
            }
            let confidence = if *norm == target_norm {
                CONFIDENCE_EXACT
            } else if in_same_synonym_group(norm, &target_norm) {
                CONFIDENCE_SYNONYM
            } else {
                let j = jaccard(&token_set(norm), &target_tokens);
                if j < MIN_SUGGESTION_CONFIDENCE {
                    continue;
                }
                j
            };
            scored.push((
                SuggestionCandidate {
                    source_field: (*raw).clone(),
                    confidence,
                    source_position: *pos,
                },
                levenshtein(norm, &target_norm),
            ));
        }

        scored.sort_by(|(a, a_lev), (b, b_lev)| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a_lev.cmp(b_lev))
                .then_with(|| a.source_position.cmp(&b.source_position))
        });
        let candidates: Vec<SuggestionCandidate> = scored.into_iter().map(|(c, _)| c).collect();

        if target.required {
            required_total += 1;
            if candidates.is_empty() {
                unmatched_required.push(target.name.clone());
            } else {
                required_matched += 1;
            }
        }

        fields.push(FieldSuggestion {
            target_field: target.name.clone(),
            label: target.label.clone(),
            required: target.required,
            candidates,
        });
    }

    let required_coverage = if required_total == 0 {
        1.0
    } else {
        required_matched as f64 / required_total as f64
    };

    MappingSuggestions {
        entity_type: schema.entity_type.clone(),
        fields,
        unmatched_required,
        required_coverage,
    }
}

// ---------------------------------------------------------------------------
// Confirmed mapping
// ---------------------------------------------------------------------------

/// Optional per-field transform applied while mapping a raw row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    Trim,
    Uppercase,
    Lowercase,
    /// Comma/dot tolerant decimal cleanup, e.g. `"1.234,56"` → `"1234.56"`.
    NormalizeDecimal,
    /// Rewrite `31.12.2024`-style dates to ISO `2024-12-31`.
    NormalizeDate,
}

impl Transform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::NormalizeDecimal => "normalize_decimal",
            Self::NormalizeDate => "normalize_date",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "trim" => Some(Self::Trim),
            "uppercase" => Some(Self::Uppercase),
            "lowercase" => Some(Self::Lowercase),
            "normalize_decimal" => Some(Self::NormalizeDecimal),
            "normalize_date" => Some(Self::NormalizeDate),
            _ => None,
        }
    }
}

/// One confirmed source→target pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_field: String,
    pub target_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

/// Check a user-confirmed mapping against the target schema.
pub fn validate_mapping(mapping: &[FieldMapping], schema: &TargetSchema) -> Result<(), String> {
    if mapping.is_empty() {
        return Err("mapping must contain at least one field pair".to_string());
    }
    let mut seen_targets = BTreeSet::new();
    for pair in mapping {
        if pair.source_field.trim().is_empty() {
            return Err(format!(
                "empty source field mapped to '{}'",
                pair.target_field
            ));
        }
        if schema.field(&pair.target_field).is_none() {
            return Err(format!(
                "unknown target field '{}' for entity type '{}'",
                pair.target_field, schema.entity_type
            ));
        }
        if !seen_targets.insert(pair.target_field.as_str()) {
            return Err(format!(
                "target field '{}' is mapped more than once",
                pair.target_field
            ));
        }
    }
    Ok(())
}

/// Apply a confirmed mapping to one raw row. Source fields absent from
/// the row are skipped; the required-field check catches them later.
/// Output key order follows the mapping order.
pub fn apply_mapping(row: &Map<String, Value>, mapping: &[FieldMapping]) -> Map<String, Value> {
    let mut mapped = Map::new();
    for pair in mapping {
        if let Some(value) = row.get(&pair.source_field) {
            let value = match pair.transform {
                Some(t) => apply_transform(value, t),
                None => value.clone(),
            };
            mapped.insert(pair.target_field.clone(), value);
        }
    }
    mapped
}

fn apply_transform(value: &Value, transform: Transform) -> Value {
    let Some(s) = value.as_str() else {
        // Numbers, booleans, etc. pass through untouched.
        return value.clone();
    };
    let out = match transform {
        Transform::Trim => s.trim().to_string(),
        Transform::Uppercase => s.to_uppercase(),
        Transform::Lowercase => s.to_lowercase(),
        Transform::NormalizeDecimal => normalize_decimal_str(s),
        Transform::NormalizeDate => match parse_flexible_date(s) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => s.to_string(),
        },
    };
    Value::String(out)
}

/// Clean up a decimal string from either locale convention. Whichever of
/// `.`/`,` appears last is taken as the decimal mark; the other is
/// treated as a thousands separator and removed.
pub fn normalize_decimal_str(s: &str) -> String {
    let t = s.trim();
    match (t.rfind('.'), t.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => t.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => t.replace(',', ""),
        (None, Some(_)) => t.replace(',', "."),
        _ => t.to_string(),
    }
}

/// Accepted date spellings, most specific first.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

/// Parse a date under any accepted spelling, including RFC 3339.
pub fn parse_flexible_date(s: &str) -> Option<NaiveDate> {
    let t = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(t, fmt) {
            return Some(date);
        }
    }
    chrono::DateTime::parse_from_rfc3339(t)
        .ok()
        .map(|dt| dt.date_naive())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
