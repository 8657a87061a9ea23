//! Company lookup in the Slovak registry of legal entities by IČO.
//!
//! The HTTP transport stays outside this crate behind [`CompanyRegistry`].
//! Responses come in several shapes, so each [`Company`] field is read with
//! an ordered list of extractors and the first non-empty match wins.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;

/// How long a looked-up company stays cached by default.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Cache type shared between [`CompanyLookup`] instances.
pub type CompanyCache = TtlCache<String, Company>;

/// Source of raw registry records.
pub trait CompanyRegistry {
    /// Fetches the record for a normalized 8-digit IČO, `None` if the
    /// registry does not know it.
    fn fetch(&self, ico: &str) -> Result<Option<Value>>;

    /// Runs a free-text search. The response is either a list of records or
    /// an object holding them under `results` or `items`.
    fn search(&self, query: &str, limit: usize) -> Result<Value>;
}

impl<T: CompanyRegistry + ?Sized> CompanyRegistry for &T {
    fn fetch(&self, ico: &str) -> Result<Option<Value>> {
        (**self).fetch(ico)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Value> {
        (**self).search(query, limit)
    }
}

/// A company as shown on an invoice.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    pub name: String,
    pub ico: String,
    pub dic: String,
    pub ic_dph: String,
    pub legal_form: String,
    pub street: String,
    pub city: String,
    pub zip_code: String,
    pub established_on: String,
    pub terminated_on: String,
}

/// One way of reading a text value out of a registry record.
#[derive(Clone, Copy, Debug)]
enum Extract {
    /// A string or number stored under the key.
    Key(&'static str),
    /// A string or number stored under `outer.inner`.
    Nested(&'static str, &'static str),
}

use Extract::{Key, Nested};

const NAME: &[Extract] = &[
    Key("name"),
    Key("formatted_name"),
    Key("full_name"),
    Key("nazov"),
    Key("obchodne_meno"),
];
const ICO: &[Extract] = &[Key("cin"), Key("ico"), Key("id")];
const DIC: &[Extract] = &[Key("tin"), Key("dic"), Key("tax_id")];
const IC_DPH: &[Extract] = &[Key("vatin"), Key("ic_dph"), Key("vat_id")];
const LEGAL_FORM: &[Extract] = &[
    Nested("legal_form", "name"),
    Nested("legal_form", "value"),
    Key("legal_form"),
    Nested("pravna_forma", "name"),
    Nested("pravna_forma", "value"),
    Key("pravna_forma"),
];
const ADDRESS: &[&str] = &["formatted_address", "address", "sidlo"];
const STREET: &[Extract] = &[Key("street"), Key("ulica"), Key("street_name")];
const REG_NUMBER: &[Extract] = &[Key("reg_number"), Key("cislo_registra")];
const BUILDING_NUMBER: &[Extract] = &[
    Key("building_number"),
    Key("orientacne_cislo"),
    Key("cislo_domu"),
];
const CITY: &[Extract] = &[Key("municipality"), Key("city"), Key("obec")];
const ZIP: &[Extract] = &[Key("postal_code"), Key("zip"), Key("psc")];
const ESTABLISHED_ON: &[Extract] = &[Key("established_on"), Key("datum_vzniku")];
const TERMINATED_ON: &[Extract] = &[Key("terminated_on"), Key("datum_zaniku")];

impl Extract {
    fn apply(self, record: &Value) -> Option<String> {
        let value = match self {
            Key(key) => record.get(key)?,
            Nested(outer, inner) => record.get(outer)?.get(inner)?,
        };
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

fn first_match(record: &Value, extractors: &[Extract]) -> Option<String> {
    extractors.iter().find_map(|e| e.apply(record))
}

fn text(record: &Value, extractors: &[Extract]) -> String {
    first_match(record, extractors).unwrap_or_default()
}

impl Company {
    /// Reads a registry record. Missing fields stay empty.
    pub fn from_record(record: &Value) -> Self {
        let mut company = Company {
            name: text(record, NAME),
            ico: first_match(record, ICO)
                .map(|ico| format!("{ico:0>8}"))
                .unwrap_or_default(),
            dic: text(record, DIC),
            ic_dph: text(record, IC_DPH),
            legal_form: text(record, LEGAL_FORM),
            established_on: text(record, ESTABLISHED_ON),
            terminated_on: text(record, TERMINATED_ON),
            ..Company::default()
        };

        match ADDRESS.iter().find_map(|key| record.get(*key)) {
            Some(Value::String(address)) => {
                let parsed = parse_address(address);
                company.street = parsed.street;
                company.city = parsed.city;
                company.zip_code = parsed.zip_code;
            }
            Some(address) if address.is_object() => {
                company.street = street_from_parts(address);
                company.city = text(address, CITY);
                company.zip_code = text(address, ZIP).replace(' ', "");
            }
            _ => {}
        }
        if company.street.is_empty() {
            company.street = text(record, STREET);
        }
        company
    }
}

fn street_from_parts(address: &Value) -> String {
    let mut parts = Vec::new();
    if let Some(street) = first_match(address, STREET) {
        parts.push(street);
    }
    match (
        first_match(address, REG_NUMBER),
        first_match(address, BUILDING_NUMBER),
    ) {
        (Some(reg), Some(building)) => parts.push(format!("{reg}/{building}")),
        (Some(number), None) | (None, Some(number)) => parts.push(number),
        (None, None) => {}
    }
    parts.join(" ")
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ParsedAddress {
    street: String,
    city: String,
    zip_code: String,
}

/// Splits `"Street 1, 811 01 City"` style text into its parts.
fn parse_address(address: &str) -> ParsedAddress {
    let mut parsed = ParsedAddress::default();
    let mut rest = address.to_string();
    if let Some((start, end)) = find_zip(address) {
        parsed.zip_code = address[start..end].chars().filter(|c| !c.is_whitespace()).collect();
        rest = format!("{}{}", &address[..start], &address[end..]);
    }
    let parts: Vec<&str> = rest.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [] => {}
        [only] => parsed.street = only.to_string(),
        [first, .., last] => {
            parsed.street = first.to_string();
            parsed.city = last.to_string();
        }
    }
    parsed
}

/// Byte range of the first `ddd dd` or `ddddd` group.
fn find_zip(text: &str) -> Option<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let digit = |i: usize| chars.get(i).is_some_and(|(_, c)| c.is_ascii_digit());
    let end_of = |i: usize| chars.get(i).map_or(text.len(), |(at, _)| *at);
    for i in 0..chars.len() {
        if !(digit(i) && digit(i + 1) && digit(i + 2)) {
            continue;
        }
        let spaced = chars.get(i + 3).is_some_and(|(_, c)| c.is_whitespace());
        if spaced && digit(i + 4) && digit(i + 5) {
            return Some((chars[i].0, end_of(i + 6)));
        }
        if digit(i + 3) && digit(i + 4) {
            return Some((chars[i].0, end_of(i + 5)));
        }
    }
    None
}

/// Reduces an IČO to digits and pads it to 8. Returns `None` unless 6 to 8
/// digits remain.
pub fn normalize_ico(ico: &str) -> Option<String> {
    let digits: String = ico.chars().filter(char::is_ascii_digit).collect();
    (6..=8)
        .contains(&digits.len())
        .then(|| format!("{digits:0>8}"))
}

/// Records of a search response: the response itself if it is a list,
/// otherwise its `results` or `items` member.
pub fn search_items(response: &Value) -> Vec<Value> {
    let items = match response {
        Value::Array(_) => Some(response),
        _ => response.get("results").or_else(|| response.get("items")),
    };
    match items {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory cache whose entries expire a fixed time after insertion.
pub struct TtlCache<K, V> {
    entries: HashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    /// Creates an empty cache with the given time to live.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Returns the configured time to live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a live entry, dropping it if it has expired.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = Instant::now() >= self.entries.get(key)?.expires_at;
        if expired {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Stores a value with the default time to live.
    pub fn insert(&mut self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    /// Stores a value with its own time to live.
    pub fn insert_with_ttl(&mut self, key: K, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries.insert(key, Entry { value, expires_at });
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops every expired entry and returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| now < e.expires_at);
        before - self.entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Looks companies up in a registry, with a shared cache and an optional
/// local directory used when the registry fails or has no match.
pub struct CompanyLookup<'c, R> {
    registry: R,
    cache: &'c Mutex<CompanyCache>,
    directory: Vec<Company>,
}

impl<'c, R: CompanyRegistry> CompanyLookup<'c, R> {
    pub fn new(registry: R, cache: &'c Mutex<CompanyCache>) -> Self {
        Self {
            registry,
            cache,
            directory: Vec::new(),
        }
    }

    /// Adds offline records consulted after the registry.
    pub fn with_directory(mut self, directory: Vec<Company>) -> Self {
        self.directory = directory;
        self
    }

    /// Finds a company by IČO. Invalid numbers yield `None` without a request.
    pub fn lookup(&self, ico: &str) -> Option<Company> {
        let ico = normalize_ico(ico)?;
        if let Some(hit) = self.lock_cache().get(ico.as_str()) {
            debug!(%ico, "company cache hit");
            return Some(hit);
        }

        let found = match self.lookup_registry(&ico) {
            Ok(found) => found,
            Err(e) => {
                warn!(%ico, error = %e, "company registry lookup failed");
                None
            }
        }
        .or_else(|| self.directory.iter().find(|c| c.ico == ico).cloned())?;

        self.lock_cache().insert(ico, found.clone());
        Some(found)
    }

    fn lookup_registry(&self, ico: &str) -> Result<Option<Company>> {
        if let Some(record) = self.registry.fetch(ico)? {
            return Ok(Some(Company::from_record(&record)));
        }
        let items = search_items(&self.registry.search(ico, 10)?);
        let exact = items
            .iter()
            .find(|item| first_match(item, ICO).is_some_and(|i| format!("{i:0>8}") == ico));
        Ok(exact.or(items.first()).map(Company::from_record))
    }

    /// Searches by name or IČO. Queries shorter than two characters return
    /// nothing; registry failures fall back to the local directory.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Company> {
        if query.chars().count() < 2 {
            return Vec::new();
        }
        match self.registry.search(query, limit) {
            Ok(response) => search_items(&response)
                .iter()
                .take(limit)
                .map(Company::from_record)
                .filter(|c| !c.name.is_empty())
                .collect(),
            Err(e) => {
                warn!(query, error = %e, "company registry search failed");
                let needle = query.to_lowercase();
                self.directory
                    .iter()
                    .filter(|c| c.name.to_lowercase().contains(&needle) || c.ico.contains(&needle))
                    .take(limit)
                    .cloned()
                    .collect()
            }
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, CompanyCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
