use url::Url;

use crate::{Error, Result};

/// A run of time-stepped feed URLs plus the cursor to resume from afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub next_cursor: i64,
    /// Chronological step order.
    pub urls: Vec<String>,
}

/// Builds one URL per step from `starting_time` up to (exclusive)
/// `starting_time + interval * count`, each with the step as its `until` cursor.
///
/// A window with `count == 0` or `interval == 0` is empty and resumes from `starting_time`.
/// A negative count, a negative interval with a nonzero count, or an ending time that
/// overflows is rejected with [`Error::InvalidWindow`].
pub fn build_window(feed_url: &Url, starting_time: i64, interval: i64, count: i64) -> Result<Window> {
    let invalid = || Error::InvalidWindow { interval, count };
    if count < 0 || (interval < 0 && count != 0) {
        return Err(invalid());
    }

    let ending_time = interval
        .checked_mul(count)
        .and_then(|span| starting_time.checked_add(span))
        .ok_or_else(invalid)?;

    let capacity = if interval > 0 { count.min(1024) as usize } else { 0 };
    let mut urls = Vec::with_capacity(capacity);
    let mut current_time = starting_time;
    while current_time < ending_time {
        urls.push(page_url(feed_url, current_time));
        current_time += interval;
    }

    Ok(Window {
        next_cursor: current_time,
        urls,
    })
}

/// Feed URL for the page ending at `until`.
pub fn page_url(feed_url: &Url, until: i64) -> String {
    let mut url = feed_url.clone();
    url.query_pairs_mut().append_pair("until", &until.to_string());
    url.into()
}
