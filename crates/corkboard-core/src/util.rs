//! Small helpers shared by the sync modules.

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_millis_now_is_after_2020() {
        assert!(unix_millis_now() > 1_577_836_800_000);
    }
}
