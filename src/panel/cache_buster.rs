use time::OffsetDateTime;

/// Millisecond timestamps for query strings that force the stream to be refetched.
///
/// Values are strictly increasing even when two are requested within the same
/// millisecond, so every attach produces a URL the client has not seen.
#[derive(Debug, Default)]
pub struct CacheBuster {
    last: u64,
}

impl CacheBuster {
    pub fn next(&mut self) -> u64 {
        let now = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64;
        self.last = now.max(self.last + 1);
        self.last
    }

    pub fn bust(&mut self, path: &str) -> String {
        format!("{}?{}", path, self.next())
    }
}
