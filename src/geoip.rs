use std::collections::BTreeMap;
use std::net::IpAddr;

use camino::Utf8PathBuf;
use maxminddb::geoip2;
use maxminddb::Mmap;
use tracing::warn;

/// Language preference order for multi-language name maps.
const LANG_PREFERENCE: [&str; 4] = ["en", "es", "fr", "de"];

/// Handle to the GeoLite2-City database, or a permanently degraded stand-in
/// when the database could not be opened at startup.
pub enum Locator {
    Db(maxminddb::Reader<Mmap>),
    /// Remembers why the open failed; every lookup reports that reason.
    Degraded(String),
}

impl Locator {
    /// Open the City database at `path`. Failure is non-fatal: the
    /// process keeps running with geolocation disabled and the open
    /// error becomes the body of every emission.
    pub fn open(path: Utf8PathBuf) -> Self {
        match maxminddb::Reader::open_mmap(&path) {
            Ok(reader) => Locator::Db(reader),
            Err(err) => {
                let reason = format!("could not open {path}: {err}");
                warn!("{reason}; continuing without geolocation");
                Locator::Degraded(reason)
            }
        }
    }

    /// Produce the geolocation body for one address. Never fails: lookup
    /// problems are surfaced as the returned text.
    pub fn describe(&self, addr: &str) -> String {
        let reader = match self {
            Locator::Db(reader) => reader,
            Locator::Degraded(reason) => return reason.clone(),
        };

        let ip: IpAddr = match addr.parse() {
            Ok(ip) => ip,
            Err(err) => return err.to_string(),
        };

        match reader.lookup::<geoip2::City>(ip) {
            Ok(record) => body_for(&record),
            Err(err) => err.to_string(),
        }
    }
}

/// Select the emission body for a resolved City record. Pure formatting
/// over the record's fields, independent of any tracking state.
fn body_for(record: &geoip2::City) -> String {
    if record
        .traits
        .as_ref()
        .and_then(|t| t.is_anonymous_proxy)
        .unwrap_or(false)
    {
        return "Anonymous Proxy".to_string();
    }

    let iso = record.country.as_ref().and_then(|c| c.iso_code).unwrap_or("");
    if iso.is_empty() {
        return "Countryless".to_string();
    }

    // Records frequently carry no subdivision at all
    let subdivision = match record.subdivisions.as_deref() {
        None | Some([]) => "No Subdivision (State)".to_string(),
        Some(subdivisions) => subdivisions
            .iter()
            .map(|s| preferred_name(s.names.as_ref()))
            .collect::<String>(),
    };

    let country = preferred_name(record.country.as_ref().and_then(|c| c.names.as_ref()));
    let city = preferred_name(record.city.as_ref().and_then(|c| c.names.as_ref()));

    format!("{iso}, {country}, {subdivision}, {city}")
}

/// Pick a display name from a multi-language map: "en" first, then the
/// short fallback list. With no preferred language present, show all
/// available language keys pipe-joined in brackets followed by the
/// longest name on offer. An empty or absent map yields "Missing".
fn preferred_name(names: Option<&BTreeMap<&str, &str>>) -> String {
    let Some(names) = names else {
        return "Missing".to_string();
    };
    for lang in LANG_PREFERENCE {
        if let Some(name) = names.get(lang) {
            return (*name).to_string();
        }
    }
    if names.is_empty() {
        return "Missing".to_string();
    }
    let keys: Vec<&str> = names.keys().copied().collect();
    let longest = names
        .values()
        .copied()
        .max_by_key(|name| name.len())
        .unwrap_or("");
    format!("[{}]{}", keys.join("|"), longest)
}
