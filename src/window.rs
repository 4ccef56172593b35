//! Display span of a session

use crate::hour::Hour;

/// Hours from `start` up to, not including, `pickup`, wrapping past midnight.
///
/// `start == pickup` is a full-day session: all 24 hours beginning at `start`.
pub fn build_window(start: Hour, pickup: Hour) -> Vec<Hour> {
    let mut hours = vec![start];
    let mut h = start.next();
    while h != pickup {
        hours.push(h);
        h = h.next();
    }
    hours
}

/// Boundary hour rendered after the last window hour (`last + 1`)
pub fn window_end(window: &[Hour]) -> Option<Hour> {
    window.last().map(|h| h.next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(v: u8) -> Hour {
        Hour::new(v).unwrap()
    }

    fn values(window: &[Hour]) -> Vec<u8> {
        window.iter().map(|h| h.value()).collect()
    }

    #[test]
    fn test_wraps_midnight() {
        assert_eq!(
            values(&build_window(h(22), h(6))),
            vec![22, 23, 0, 1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_same_day() {
        assert_eq!(values(&build_window(h(4), h(6))), vec![4, 5]);
        assert_eq!(values(&build_window(h(23), h(0))), vec![23]);
    }

    #[test]
    fn test_equal_hours_is_full_day() {
        let w = build_window(h(6), h(6));
        assert_eq!(w.len(), 24);
        let expected: Vec<u8> = (6..24).chain(0..6).collect();
        assert_eq!(values(&w), expected);
    }

    #[test]
    fn test_window_end_is_pickup() {
        let w = build_window(h(22), h(6));
        assert_eq!(window_end(&w), Some(h(6)));
        assert_eq!(window_end(&[]), None);
    }
}
