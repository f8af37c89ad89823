//! The chattyhosts library: spotting noisy hosts in packet-capture logs.
//!
//! The pipeline is strictly sequential: each input line is scanned for
//! IPv4-looking substrings, candidates matching an ignore pattern are
//! dropped, and the survivors feed a per-address frequency tracker. When
//! an address is seen often enough within an idle window, a one-line
//! geolocation summary is emitted.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::time::{Duration, Instant};
//! use chattyhosts::{AddrExtractor, Emitter, IgnoreList, Locator, Tracker};
//!
//! let extractor = AddrExtractor::new().unwrap();
//! let ignore = IgnoreList::parse(r"10\..*,192.168.*").unwrap();
//! let mut tracker = Tracker::new(32, Duration::from_secs(2));
//! let mut emitter = Emitter::new(Locator::open("GeoLite2-City.mmdb".into()));
//!
//! let line = b"12:00:01 IP 8.8.8.8.443 > 10.0.0.5.53: UDP";
//! let mut out = std::io::stdout();
//! for addr in extractor.candidates(line) {
//!     if ignore.is_ignored(addr) {
//!         continue;
//!     }
//!     if tracker.observe(addr, Instant::now()) {
//!         emitter.emit(addr, &mut out).unwrap();
//!     }
//! }
//! ```

pub mod error;
pub mod extractor;
pub mod geoip;
pub mod input;
pub mod tracker;

pub use crate::error::Error;
pub use crate::extractor::{AddrExtractor, IgnoreList};
pub use crate::geoip::Locator;
pub use crate::tracker::{Emitter, Tracker};
