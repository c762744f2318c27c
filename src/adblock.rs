//! Ad host block list.
//!
//! Hosts files and filter lists are parsed line by line into bare host names,
//! persisted in the `AdHost` table, and cached in memory for lookups while
//! pages load.

use std::collections::HashSet;
use std::io::BufRead;

use crate::db::Db;
use crate::error::Result;
use crate::models::AdHost;
use crate::url_utils::{lookup_host, strip_host_prefix};

/// Addresses hosts files point blocked names at.
const SINK_ADDRESSES: [&str; 4] = ["0.0.0.0", "127.0.0.1", "255.255.255.255", "localhost"];

const INSERT_BATCH: usize = 1000;

/// Extracts the blocked host from one block-list line.
///
/// Accepts hosts-file lines (`0.0.0.0 ads.example.com`), filter-list rules
/// (`||ads.example.com^$third-party`) and bare host names. Comments, sink
/// addresses and values that are not a dotted host name yield `None`.
pub fn parse_ads_line(line: &str) -> Option<String> {
    let line = line.split('#').next()?.trim();
    if line.is_empty() || line.starts_with('!') {
        return None;
    }

    let token = line
        .split_whitespace()
        .map(strip_sink)
        .find(|t| !t.is_empty() && !t.chars().all(|c| c.is_ascii_digit()))?;
    let token = token.trim_start_matches("||");
    let token = token.split(['^', '$']).next()?.trim();

    let host = token.to_ascii_lowercase();
    let host = strip_host_prefix(&host);

    if host.starts_with("ip6-") || host.contains('/') {
        return None;
    }
    if !host.contains('.') || host.split('.').any(|label| label.is_empty()) {
        return None;
    }
    Some(host.to_string())
}

/// Drops leading sink addresses and colons (`0.0.0.0:host`, `::1`) and any
/// trailing `:port`.
fn strip_sink(token: &str) -> &str {
    let mut token = token;
    loop {
        let before = token;
        token = token.trim_start_matches(':');
        for sink in SINK_ADDRESSES {
            if let Some(rest) = token.strip_prefix(sink) {
                token = rest;
            }
        }
        if token == before {
            break;
        }
    }
    token.split(':').next().unwrap_or_default()
}

/// In-memory view of the block list.
#[derive(Debug, Default)]
pub struct AdBlocker {
    hosts: HashSet<String>,
}

impl AdBlocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cache with the hosts stored in `db`.
    pub fn load(&mut self, db: &Db) -> Result<usize> {
        self.hosts = db.ad_hosts().all()?.into_iter().map(|h| h.host).collect();
        log::debug!("ad blocker cached {} hosts", self.hosts.len());
        Ok(self.hosts.len())
    }

    /// Imports one block list into `db` and returns the number of distinct
    /// hosts found.
    ///
    /// The populated flag is set once at least `threshold` hosts came in.
    pub fn seed_from_reader<R: BufRead>(db: &Db, reader: R, threshold: usize) -> Result<usize> {
        let count = import(db, reader)?;
        if count >= threshold {
            db.settings().set_ad_hosts_populated(true)?;
        }
        Ok(count)
    }

    /// Loads the block list, importing `sources` first unless a full list
    /// was already imported on an earlier run.
    ///
    /// Returns whether any host is now blocked.
    pub fn initialize<I, R>(&mut self, db: &Db, sources: I, threshold: usize) -> Result<bool>
    where
        I: IntoIterator<Item = R>,
        R: BufRead,
    {
        if !db.settings().ad_hosts_populated()? {
            let mut total = 0;
            for source in sources {
                total += import(db, source)?;
            }
            if total >= threshold {
                db.settings().set_ad_hosts_populated(true)?;
            }
            log::info!("imported {} ad hosts", total);
        }

        Ok(self.load(db)? > 0)
    }

    /// Blocks one more host, persisting it in normalised form.
    ///
    /// Returns `false` when `host` is not a usable host name.
    pub fn add_host(&mut self, db: &Db, host: &str) -> Result<bool> {
        let Some(host) = parse_ads_line(host) else {
            log::warn!("not blocking unusable host {:?}", host);
            return Ok(false);
        };
        db.ad_hosts().insert_all(&[AdHost::new(host.as_str())])?;
        self.hosts.insert(host);
        Ok(true)
    }

    /// Unblocks a host. Returns whether it was blocked.
    pub fn remove_host(&mut self, db: &Db, host: &str) -> Result<bool> {
        let Some(host) = parse_ads_line(host) else {
            return Ok(false);
        };
        let removed = db.ad_hosts().delete(&AdHost::new(host.as_str()))?;
        let cached = self.hosts.remove(&host);
        Ok(removed > 0 || cached)
    }

    /// Whether the host of `url` is blocked.
    pub fn is_ads(&self, url: &str) -> bool {
        match lookup_host(url) {
            Some(host) => self.hosts.contains(&host),
            None => false,
        }
    }

    pub fn cached_count(&self) -> usize {
        self.hosts.len()
    }
}

fn import<R: BufRead>(db: &Db, reader: R) -> Result<usize> {
    let mut seen = HashSet::new();
    let mut batch = Vec::with_capacity(INSERT_BATCH);

    for line in reader.lines() {
        let Some(host) = parse_ads_line(&line?) else {
            continue;
        };
        if seen.insert(host.clone()) {
            batch.push(AdHost::new(host));
        }
        if batch.len() >= INSERT_BATCH {
            db.ad_hosts().insert_all(&batch)?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        db.ad_hosts().insert_all(&batch)?;
    }

    Ok(seen.len())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const HOSTS_FILE: &str = "\
# comment line
127.0.0.1 localhost
::1 ip6-localhost
0.0.0.0 0.0.0.0
0.0.0.0 Ads.Example.com
127.0.0.1 www.tracker.example.net # inline
||m.pixel.example.org^$third-party
plain.example.io
0.0.0.0 ads.example.com
";

    #[test]
    fn parses_hosts_and_filter_lines() {
        assert_eq!(
            parse_ads_line("0.0.0.0 Ads.Example.com"),
            Some("ads.example.com".to_string())
        );
        assert_eq!(
            parse_ads_line("||m.pixel.example.org^$third-party"),
            Some("pixel.example.org".to_string())
        );
        assert_eq!(
            parse_ads_line("127.0.0.1   www.tracker.example.net"),
            Some("tracker.example.net".to_string())
        );
        assert_eq!(parse_ads_line("plain.example.io"), Some("plain.example.io".to_string()));
    }

    #[test]
    fn strips_sink_joined_by_colon() {
        assert_eq!(
            parse_ads_line("0.0.0.0:ads.example.com"),
            Some("ads.example.com".to_string())
        );
        assert_eq!(
            parse_ads_line("127.0.0.1 tracker.example.net:443"),
            Some("tracker.example.net".to_string())
        );
        assert_eq!(parse_ads_line("0.0.0.0:"), None);
    }

    #[test]
    fn rejects_noise() {
        assert_eq!(parse_ads_line("# 0.0.0.0 ads.example.com"), None);
        assert_eq!(parse_ads_line("! filter list title"), None);
        assert_eq!(parse_ads_line("127.0.0.1 localhost"), None);
        assert_eq!(parse_ads_line("::1 ip6-localhost"), None);
        assert_eq!(parse_ads_line("0.0.0.0 .example.com"), None);
        assert_eq!(parse_ads_line("0.0.0.0 intranet"), None);
        assert_eq!(parse_ads_line(""), None);
    }

    #[test]
    fn seed_imports_distinct_hosts() {
        let db = Db::open_in_memory().unwrap();

        let count = AdBlocker::seed_from_reader(&db, Cursor::new(HOSTS_FILE), 10).unwrap();
        assert_eq!(count, 4);
        assert_eq!(db.ad_hosts().count().unwrap(), 4);
        assert!(!db.settings().ad_hosts_populated().unwrap());

        AdBlocker::seed_from_reader(&db, Cursor::new(HOSTS_FILE), 4).unwrap();
        assert!(db.settings().ad_hosts_populated().unwrap());
        assert_eq!(db.ad_hosts().count().unwrap(), 4);
    }

    #[test]
    fn initialize_skips_import_once_populated() {
        let db = Db::open_in_memory().unwrap();
        let mut blocker = AdBlocker::new();

        assert!(blocker
            .initialize(&db, [Cursor::new(HOSTS_FILE)], 3)
            .unwrap());
        assert_eq!(blocker.cached_count(), 4);

        db.ad_hosts().delete_all().unwrap();
        let mut again = AdBlocker::new();
        assert!(!again
            .initialize(&db, [Cursor::new(HOSTS_FILE)], 3)
            .unwrap());
        assert_eq!(again.cached_count(), 0);
    }

    #[test]
    fn is_ads_matches_normalised_host() {
        let db = Db::open_in_memory().unwrap();
        let mut blocker = AdBlocker::new();
        blocker.initialize(&db, [Cursor::new(HOSTS_FILE)], 100).unwrap();

        assert!(blocker.is_ads("https://www.ads.example.com/banner.js"));
        assert!(blocker.is_ads("http://m.tracker.example.net/p.gif"));
        assert!(!blocker.is_ads("https://example.com/"));
        assert!(!blocker.is_ads("not a url"));
    }

    #[test]
    fn add_and_remove_host() {
        let db = Db::open_in_memory().unwrap();
        let mut blocker = AdBlocker::new();

        assert!(blocker.add_host(&db, "cdn.ads.example.com").unwrap());
        assert!(blocker.is_ads("https://cdn.ads.example.com/x"));
        assert!(db.ad_hosts().contains("cdn.ads.example.com").unwrap());

        assert!(blocker.remove_host(&db, "cdn.ads.example.com").unwrap());
        assert!(!blocker.is_ads("https://cdn.ads.example.com/x"));
        assert!(!blocker.remove_host(&db, "cdn.ads.example.com").unwrap());
        assert_eq!(blocker.load(&db).unwrap(), 0);
    }

    #[test]
    fn added_host_is_normalised() {
        let db = Db::open_in_memory().unwrap();
        let mut blocker = AdBlocker::new();

        assert!(blocker.add_host(&db, "WWW.Ads.Example.com").unwrap());
        assert!(db.ad_hosts().contains("ads.example.com").unwrap());
        assert!(blocker.is_ads("https://m.ads.example.com/banner.js"));

        assert!(!blocker.add_host(&db, "intranet").unwrap());
        assert!(!blocker.add_host(&db, "# comment").unwrap());
        assert_eq!(db.ad_hosts().count().unwrap(), 1);

        assert!(blocker.remove_host(&db, "www.ads.example.com").unwrap());
        assert_eq!(db.ad_hosts().count().unwrap(), 0);
    }
}
