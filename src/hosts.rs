//! Static hostname to IPv4 table.
//!
//! The table is read once from a flat JSON object before the DNS socket is opened:
//!
//! ```json
//! { "app1.mydomain.com": "1.2.3.4", "Printer.LAN.": "192.168.1.20" }
//! ```
//!
//! Keys are [normalized][normalize] at load time. Values are kept verbatim and only parsed when
//! a query hits them, so a bad value fails that query with SERVFAIL instead of failing startup.
//! There is no reload path: once built the table is shared read-only behind an [`Arc`].

use crate::error::Error;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

pub type SharedHostTable = Arc<HostTable>;

#[derive(Deserialize)]
#[serde(transparent)]
struct HostsFile(BTreeMap<String, String>);

#[derive(Default, Debug, Clone)]
pub struct HostTable {
    records: HashMap<String, String>,
}

/// Normalize a hostname for table lookups: strip exactly one trailing `.` and lowercase.
#[must_use]
pub fn normalize(host: &str) -> String {
    host.strip_suffix('.').unwrap_or(host).to_lowercase()
}

impl HostTable {
    /// Load a [`HostTable`] from the JSON object at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostsUnreadable`] if the path can't be opened or read.
    ///
    /// Returns [`Error::HostsInvalid`] if the content isn't a JSON object of strings.
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let path = p.as_ref();
        let f = File::open(path).map_err(|source| Error::HostsUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: HostsFile =
            serde_json::from_reader(BufReader::new(f)).map_err(|source| {
                // serde_json reports read failures as its own io category.
                if source.is_io() {
                    Error::HostsUnreadable {
                        path: path.to_path_buf(),
                        source: source.into(),
                    }
                } else {
                    Error::HostsInvalid {
                        path: path.to_path_buf(),
                        source,
                    }
                }
            })?;
        Ok(Self::from_records(raw.0))
    }

    /// Parse a [`HostTable`] from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HostsInvalid`] if the content isn't a JSON object of strings.
    pub fn from_json_slice(json: &[u8]) -> Result<Self, Error> {
        let raw: HostsFile = serde_json::from_slice(json).map_err(|source| Error::HostsInvalid {
            path: "<memory>".into(),
            source,
        })?;
        Ok(Self::from_records(raw.0))
    }

    /// Build a table from `(hostname, ip)` pairs. When two names normalize to the same key the
    /// later pair wins.
    pub fn from_records<I, K, V>(records: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut table = HashMap::new();
        for (host, ip) in records {
            let key = normalize(host.as_ref());
            if let Some(previous) = table.insert(key, ip.into()) {
                tracing::warn!(
                    "hosts entry \"{}\" shadows an earlier entry ({previous})",
                    host.as_ref()
                );
            }
        }
        HostTable { records: table }
    }

    /// Exact match on an already [normalized][normalize] hostname.
    #[must_use]
    pub fn lookup(&self, host: &str) -> Option<&str> {
        self.records.get(host).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn normalize_strips_one_dot_and_lowercases() {
        assert_eq!(normalize("App1.MyDomain.com."), "app1.mydomain.com");
        assert_eq!(normalize("app1.mydomain.com"), "app1.mydomain.com");
        assert_eq!(normalize("double.."), "double.");
        assert_eq!(normalize("."), "");
    }

    #[test]
    fn keys_are_normalized_on_load() {
        let table =
            HostTable::from_json_slice(br#"{"App1.MyDomain.com.": "1.2.3.4"}"#).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("app1.mydomain.com"), Some("1.2.3.4"));
        assert_eq!(table.lookup("App1.MyDomain.com."), None);
    }

    #[test]
    fn values_are_kept_verbatim() {
        let table = HostTable::from_json_slice(br#"{"bad.host": "not-an-ip"}"#).unwrap();
        assert_eq!(table.lookup("bad.host"), Some("not-an-ip"));
    }

    #[test]
    fn colliding_keys_keep_last_in_sorted_order() {
        let table =
            HostTable::from_json_slice(br#"{"host.lan": "10.0.0.2", "HOST.lan.": "10.0.0.1"}"#)
                .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("host.lan"), Some("10.0.0.2"));
    }

    #[test]
    fn empty_object_is_an_empty_table() {
        let table = HostTable::from_json_slice(b"{}").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn rejects_non_object_json() {
        for bad in [&b"[]"[..], b"{\"a\": 1}", b"not json", b""] {
            assert!(matches!(
                HostTable::from_json_slice(bad),
                Err(Error::HostsInvalid { .. })
            ));
        }
    }

    #[test]
    fn missing_file_is_unreadable() {
        let res = HostTable::try_from_file("/nonexistent/hostcrab/hosts.json");
        assert!(matches!(res, Err(Error::HostsUnreadable { .. })));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("hostcrab-hosts-{}.json", std::process::id()));
        let mut f = File::create(&path).unwrap();
        f.write_all(br#"{"app1.mydomain.com": "1.2.3.4"}"#).unwrap();
        drop(f);

        let table = HostTable::try_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(table.lookup("app1.mydomain.com"), Some("1.2.3.4"));
    }

    #[test]
    fn invalid_file_is_invalid_json() {
        let path =
            std::env::temp_dir().join(format!("hostcrab-bad-hosts-{}.json", std::process::id()));
        std::fs::write(&path, b"{ nope").unwrap();

        let res = HostTable::try_from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(res, Err(Error::HostsInvalid { .. })));
    }
}
