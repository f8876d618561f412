//! Преобразование времени событий провайдера в метки SRT

use std::time::Duration;
use crate::provider::TICKS_PER_SECOND;

const TICKS_PER_MILLISECOND: u64 = TICKS_PER_SECOND / 1000;

/// Дробная часть длиннее наносекунд считается ошибкой
const MAX_FRACTION_DIGITS: usize = 9;

/// Тики провайдера в целые миллисекунды, с округлением до ближайшей
pub fn ticks_to_millis(ticks: u64) -> u64 {
    ticks.saturating_add(TICKS_PER_MILLISECOND / 2) / TICKS_PER_MILLISECOND
}

/// Тики в метку вида `HH:MM:SS,mmm`
pub fn ticks_to_timestamp(ticks: u64) -> String {
    format_millis(ticks_to_millis(ticks))
}

pub fn format_millis(total_ms: u64) -> String {
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Парсинг метки `HH:MM:SS,mmm` (или `MM:SS.mmm`)
pub fn parse_timestamp(time_str: &str) -> Option<Duration> {
    let parts: Vec<&str> = time_str.trim().split(':').collect();
    let (hours, minutes, seconds_part) = match parts.as_slice() {
        [h, m, s] => (h.parse::<u64>().ok()?, m.parse::<u64>().ok()?, *s),
        [m, s] => (0, m.parse::<u64>().ok()?, *s),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }

    let mut seconds_parts = seconds_part.splitn(2, |c| c == ',' || c == '.');
    let seconds = seconds_parts.next()?.parse::<u64>().ok()?;
    if seconds >= 60 {
        return None;
    }
    let milliseconds = match seconds_parts.next() {
        Some(fraction) => parse_fraction_millis(fraction)?,
        None => 0,
    };

    let total_secs = hours
        .checked_mul(3600)?
        .checked_add(minutes * 60 + seconds)?;
    Some(Duration::from_millis(total_secs.checked_mul(1000)?.checked_add(milliseconds)?))
}

/// Первые три цифры дробной части; остальные отбрасываются
fn parse_fraction_millis(fraction: &str) -> Option<u64> {
    if fraction.is_empty()
        || fraction.len() > MAX_FRACTION_DIGITS
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some(
        fraction
            .bytes()
            .chain(std::iter::repeat(b'0'))
            .take(3)
            .fold(0, |ms, digit| ms * 10 + u64::from(digit - b'0')),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_offsets() {
        assert_eq!(ticks_to_timestamp(27_500_000), "00:00:02,750");
        assert_eq!(ticks_to_timestamp(27_500_000 + 20_000_000), "00:00:04,750");
        assert_eq!(ticks_to_timestamp(0), "00:00:00,000");
        assert_eq!(ticks_to_timestamp(36_610_010_000), "01:01:01,001");
    }

    #[test]
    fn test_rounds_to_nearest_millisecond() {
        assert_eq!(ticks_to_timestamp(4_999), "00:00:00,000");
        assert_eq!(ticks_to_timestamp(5_000), "00:00:00,001");
        assert_eq!(ticks_to_timestamp(9_999_999), "00:00:01,000");
    }

    #[test]
    fn test_round_trip_within_a_millisecond() {
        for ticks in [0u64, 1, 12_345, 27_500_000, 123_456_789, 98_765_432_101] {
            let parsed = parse_timestamp(&ticks_to_timestamp(ticks)).unwrap();
            let original_ms = ticks as f64 / TICKS_PER_MILLISECOND as f64;
            assert!((parsed.as_secs_f64() * 1000.0 - original_ms).abs() <= 1.0);
        }
    }

    #[test]
    fn test_parse_accepts_both_separators() {
        assert_eq!(parse_timestamp("00:00:02,750"), Some(Duration::from_millis(2750)));
        assert_eq!(parse_timestamp("00:02.5"), Some(Duration::from_millis(2500)));
        assert_eq!(parse_timestamp("1:00:00"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_timestamp("00:00:01,123456"), Some(Duration::from_millis(1123)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp("abc"), None);
        assert_eq!(parse_timestamp("00:61:00,000"), None);
        assert_eq!(parse_timestamp("00:00:02,"), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
        assert_eq!(parse_timestamp("00:00:01,+50"), None);
        assert_eq!(parse_timestamp("00:00:01,000000000000000000000000"), None);
        assert_eq!(parse_timestamp("99999999999999999:00:00,000"), None);
    }
}
