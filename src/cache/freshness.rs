//! Cache freshness policy
//!
//! Pure decision logic: given the cache file mtimes, the stored metadata
//! header, and the TTL/offline settings, decide whether the caches are
//! usable without any network access. All inputs are passed explicitly so
//! the policy is deterministic under test.

use crate::cache::header::CacheHeader;
use crate::config::CacheSettings;
use regex::Regex;
use std::sync::LazyLock;
use std::time::SystemTime;

static MAX_AGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"max-age=(\d+)").expect("max-age regex"));

/// Outcome of evaluating cache freshness for one subdir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The primary cache is usable without a network round trip.
    /// `solv_valid` says whether the derived binary cache may be used too.
    Fresh { solv_valid: bool },
    /// Cache absent, expired, or unreadable: a fetch is required.
    Stale,
    /// Offline with nothing usable on disk: skip the fetch and leave the
    /// entry unloaded.
    OfflineMiss,
}

/// Decide whether the caches for one subdir are still usable.
///
/// `forbid_cache` is set for local filesystem sources (`file://`), which are
/// always read fresh. The TTL settings follow the usual convention:
/// `-1`/`0` means the server is authoritative (always revalidate), `1` means
/// honor the stored `Cache-Control` max-age, and anything larger overrides
/// the freshness window in seconds.
pub fn evaluate(
    now: SystemTime,
    json_mtime: Option<SystemTime>,
    solv_mtime: Option<SystemTime>,
    header: Option<&CacheHeader>,
    settings: &CacheSettings,
    forbid_cache: bool,
) -> Freshness {
    let Some(json_mtime) = json_mtime else {
        if settings.offline && !forbid_cache {
            return Freshness::OfflineMiss;
        }
        return Freshness::Stale;
    };

    if forbid_cache {
        return Freshness::Stale;
    }

    // An unreadable header means the file is not a recognized cache;
    // treat it like an absent one.
    let Some(header) = header else {
        if settings.offline {
            return Freshness::OfflineMiss;
        }
        return Freshness::Stale;
    };

    let age = age_seconds(now, json_mtime);
    let max_age = match settings.local_repodata_ttl {
        ttl if ttl > 1 => ttl as u64,
        1 => cache_control_max_age(&header.cache_control),
        _ => 0,
    };

    // Strict comparison: an exactly-expired cache triggers a refresh.
    if max_age > age || settings.offline {
        let solv_valid = matches!(solv_mtime, Some(m) if age_seconds(now, m) <= age);
        Freshness::Fresh { solv_valid }
    } else {
        Freshness::Stale
    }
}

/// Parse `max-age=N` out of a Cache-Control value, defaulting to 0.
pub fn cache_control_max_age(cache_control: &str) -> u64 {
    MAX_AGE_RE
        .captures(cache_control)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

fn age_seconds(now: SystemTime, mtime: SystemTime) -> u64 {
    now.duration_since(mtime).unwrap_or_default().as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn header(cache_control: &str) -> CacheHeader {
        CacheHeader {
            url: "https://example.org/noarch/repodata.json".to_string(),
            etag: "\"abc\"".to_string(),
            last_modified: "Mon, 01 Jan 2024 00:00:00 GMT".to_string(),
            cache_control: cache_control.to_string(),
        }
    }

    fn settings(ttl: i64, offline: bool) -> CacheSettings {
        CacheSettings {
            local_repodata_ttl: ttl,
            offline,
            dir: None,
        }
    }

    fn ago(now: SystemTime, secs: u64) -> Option<SystemTime> {
        Some(now - Duration::from_secs(secs))
    }

    #[test]
    fn fresh_within_server_max_age() {
        let now = SystemTime::now();
        let h = header("public, max-age=1200");
        let result = evaluate(now, ago(now, 500), None, Some(&h), &settings(1, false), false);
        assert_eq!(result, Freshness::Fresh { solv_valid: false });
    }

    #[test]
    fn exact_expiry_boundary_is_stale() {
        let now = SystemTime::now();
        let h = header("max-age=1200");
        let s = settings(1, false);

        let at_boundary = evaluate(now, ago(now, 1200), None, Some(&h), &s, false);
        assert_eq!(at_boundary, Freshness::Stale);

        let just_inside = evaluate(now, ago(now, 1199), None, Some(&h), &s, false);
        assert_eq!(just_inside, Freshness::Fresh { solv_valid: false });
    }

    #[test]
    fn ttl_override_beats_cache_control() {
        let now = SystemTime::now();
        let h = header("max-age=1");
        let result = evaluate(now, ago(now, 500), None, Some(&h), &settings(3600, false), false);
        assert_eq!(result, Freshness::Fresh { solv_valid: false });
    }

    #[test]
    fn server_authoritative_ttl_always_revalidates() {
        let now = SystemTime::now();
        let h = header("max-age=999999");
        for ttl in [0, -1] {
            let result = evaluate(now, ago(now, 1), None, Some(&h), &settings(ttl, false), false);
            assert_eq!(result, Freshness::Stale);
        }
    }

    #[test]
    fn offline_accepts_any_age() {
        let now = SystemTime::now();
        let h = header("max-age=10");
        let result = evaluate(
            now,
            ago(now, 1_000_000),
            None,
            Some(&h),
            &settings(1, true),
            false,
        );
        assert_eq!(result, Freshness::Fresh { solv_valid: false });
    }

    #[test]
    fn offline_without_cache_skips_fetch() {
        let now = SystemTime::now();
        let result = evaluate(now, None, None, None, &settings(1, true), false);
        assert_eq!(result, Freshness::OfflineMiss);
    }

    #[test]
    fn offline_with_forbidden_cache_still_fetches() {
        let now = SystemTime::now();
        let result = evaluate(now, None, None, None, &settings(1, true), true);
        assert_eq!(result, Freshness::Stale);
    }

    #[test]
    fn absent_cache_is_stale() {
        let now = SystemTime::now();
        let result = evaluate(now, None, None, None, &settings(1, false), false);
        assert_eq!(result, Freshness::Stale);
    }

    #[test]
    fn forbidden_cache_is_stale_even_when_young() {
        let now = SystemTime::now();
        let h = header("max-age=1200");
        let result = evaluate(now, ago(now, 1), None, Some(&h), &settings(1, false), true);
        assert_eq!(result, Freshness::Stale);
    }

    #[test]
    fn unreadable_header_is_stale() {
        let now = SystemTime::now();
        let result = evaluate(now, ago(now, 1), None, None, &settings(3600, false), false);
        assert_eq!(result, Freshness::Stale);
    }

    #[test]
    fn unreadable_header_offline_is_a_miss() {
        let now = SystemTime::now();
        let result = evaluate(now, ago(now, 1), None, None, &settings(1, true), false);
        assert_eq!(result, Freshness::OfflineMiss);
    }

    #[test]
    fn solv_valid_only_when_at_least_as_recent() {
        let now = SystemTime::now();
        let h = header("max-age=1200");
        let s = settings(1, false);

        // Newer and equal solv caches are trusted.
        for solv_age in [100u64, 500] {
            let result = evaluate(now, ago(now, 500), ago(now, solv_age), Some(&h), &s, false);
            assert_eq!(result, Freshness::Fresh { solv_valid: true });
        }

        // An older solv cache predates the current json and is distrusted.
        let result = evaluate(now, ago(now, 500), ago(now, 501), Some(&h), &s, false);
        assert_eq!(result, Freshness::Fresh { solv_valid: false });

        // Absent solv cache.
        let result = evaluate(now, ago(now, 500), None, Some(&h), &s, false);
        assert_eq!(result, Freshness::Fresh { solv_valid: false });
    }

    #[test]
    fn max_age_parsing() {
        assert_eq!(cache_control_max_age("public, max-age=1200"), 1200);
        assert_eq!(cache_control_max_age("max-age=0"), 0);
        assert_eq!(cache_control_max_age("no-cache"), 0);
        assert_eq!(cache_control_max_age(""), 0);
        assert_eq!(cache_control_max_age("max-age=abc"), 0);
    }
}
