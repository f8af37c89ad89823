use regex_automata::meta::Regex;

use crate::error::{Error, Result};

/// Candidate pattern: four 1-3 digit groups separated by dots. No range
/// validation on purpose; the geolocation lookup rejects nonsense quads
/// itself, so "999.999.999.999" is still a candidate here. Explicit
/// `[0-9]` classes: the regex engine is built without Unicode tables,
/// which rules out `\d`.
const ADDR_PATTERN: &str = r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}";

/// Finds IPv4-looking substrings anywhere in a line of text.
#[derive(Clone, Debug)]
pub struct AddrExtractor {
    regex: Regex,
}

impl AddrExtractor {
    pub fn new() -> Result<Self> {
        let regex = Regex::new(ADDR_PATTERN)?;
        Ok(Self { regex })
    }

    /// Return every candidate address in `line`, in match order, with
    /// duplicates preserved. Matches are ASCII by construction, so the
    /// str conversion cannot fail.
    #[inline]
    pub fn candidates<'a>(&'a self, line: &'a [u8]) -> impl Iterator<Item = &'a str> + 'a {
        self.regex
            .find_iter(line)
            .filter_map(move |m| std::str::from_utf8(&line[m.range()]).ok())
    }
}

/// Whole-string-anchored patterns excluding addresses from tracking.
#[derive(Clone, Debug, Default)]
pub struct IgnoreList {
    patterns: Vec<Regex>,
}

impl IgnoreList {
    /// Compile a comma-separated list of regular expressions. Each entry
    /// is surrounded with `^` and `$` so a partial match cannot
    /// accidentally exclude an address. Any compile failure is fatal.
    pub fn parse(csv: &str) -> Result<Self> {
        let mut patterns = Vec::new();
        for entry in csv.split(',') {
            let anchored = format!("^{entry}$");
            let regex = Regex::new(&anchored).map_err(|source| Error::IgnorePattern {
                pattern: entry.to_string(),
                source,
            })?;
            patterns.push(regex);
        }
        Ok(Self { patterns })
    }

    /// True if any configured pattern matches the entire address.
    #[inline]
    pub fn is_ignored(&self, addr: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<'a>(ex: &'a AddrExtractor, line: &'a [u8]) -> Vec<&'a str> {
        ex.candidates(line).collect()
    }

    #[test]
    fn candidate_pattern_compiles_without_unicode_tables() {
        // the engine has no Unicode tables, so the pattern must stick
        // to explicit byte classes
        AddrExtractor::new().expect("candidate pattern must compile");
    }

    #[test]
    fn finds_addresses_anywhere_in_line() {
        let ex = AddrExtractor::new().unwrap();
        let line = b"12:00:01.000 IP 10.0.0.5.443 > 8.8.8.8.53: UDP, length 48";
        assert_eq!(collect(&ex, line), vec!["10.0.0.5", "8.8.8.8"]);
    }

    #[test]
    fn preserves_order_and_duplicates() {
        let ex = AddrExtractor::new().unwrap();
        let line = b"1.2.3.4 then 5.6.7.8 then 1.2.3.4 again";
        assert_eq!(collect(&ex, line), vec!["1.2.3.4", "5.6.7.8", "1.2.3.4"]);
    }

    #[test]
    fn no_range_validation() {
        let ex = AddrExtractor::new().unwrap();
        let line = b"bogus 999.999.999.999 quad";
        assert_eq!(collect(&ex, line), vec!["999.999.999.999"]);
    }

    #[test]
    fn no_addresses_yields_nothing() {
        let ex = AddrExtractor::new().unwrap();
        assert!(collect(&ex, b"arp who-has host tell gateway").is_empty());
    }

    #[test]
    fn ignore_list_matches_whole_string_only() {
        let ignore = IgnoreList::parse("10.0").unwrap();
        // "10.0" alone would partial-match without the anchors
        assert!(!ignore.is_ignored("10.0.0.5"));
        assert!(ignore.is_ignored("10.0"));
    }

    #[test]
    fn ignore_list_default_style_patterns() {
        let ignore = IgnoreList::parse(r"127.*,255.255.255.0,192.168.*,10\..*").unwrap();
        assert!(ignore.is_ignored("127.0.0.1"));
        assert!(ignore.is_ignored("192.168.1.20"));
        assert!(ignore.is_ignored("10.0.0.5"));
        assert!(ignore.is_ignored("255.255.255.0"));
        assert!(!ignore.is_ignored("8.8.8.8"));
        // 100.x must not be caught by the anchored 10\..* pattern
        assert!(!ignore.is_ignored("100.64.0.1"));
    }

    #[test]
    fn malformed_ignore_pattern_is_an_error() {
        let err = IgnoreList::parse(r"8\.8\..*,(").unwrap_err();
        match err {
            Error::IgnorePattern { pattern, .. } => assert_eq!(pattern, "("),
            other => panic!("unexpected error: {other}"),
        }
    }
}
