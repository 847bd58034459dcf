//! Display formatting for prices, countdowns and addresses

use crate::types::{Address, Amount, ParseError};

/// Wei per ether
pub const WEI_PER_ETH: Amount = 1_000_000_000_000_000_000;

const ETH_DECIMALS: usize = 18;
const DISPLAY_DECIMALS: u32 = 4;

const SECOND_MS: u64 = 1_000;
const MINUTE_MS: u64 = 60 * SECOND_MS;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Wei to ether with four decimals, rounded half up (`1.2346`)
pub fn format_price_in_eth(wei: Amount) -> String {
    let unit = WEI_PER_ETH / 10u128.pow(DISPLAY_DECIMALS);
    let scaled = wei.saturating_add(unit / 2) / unit;
    let divisor = 10u128.pow(DISPLAY_DECIMALS);
    format!("{}.{:04}", scaled / divisor, scaled % divisor)
}

/// Decimal ether string to wei. Digits past the 18th decimal are dropped;
/// an empty string is zero.
pub fn parse_price_in_wei(eth: &str) -> Result<Amount, ParseError> {
    let eth = eth.trim();
    if eth.is_empty() {
        return Ok(0);
    }

    let invalid = || ParseError::InvalidAmount(eth.to_string());
    let (whole, frac) = eth.split_once('.').unwrap_or((eth, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole: Amount = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let frac = &frac[..frac.len().min(ETH_DECIMALS)];
    let frac_wei: Amount = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = ETH_DECIMALS);
        padded.parse().map_err(|_| invalid())?
    };

    whole.checked_mul(WEI_PER_ETH).and_then(|w| w.checked_add(frac_wei)).ok_or_else(invalid)
}

/// Countdown until `end_time` (unix seconds), given the current time in
/// milliseconds. Returns `Ended` once less than a second remains.
pub fn format_time_difference(end_time: u64, now_ms: u64) -> String {
    let end_ms = end_time.saturating_mul(SECOND_MS);
    let difference = end_ms.saturating_sub(now_ms);

    let days = difference / DAY_MS;
    let hours = (difference % DAY_MS) / HOUR_MS;
    let minutes = (difference % HOUR_MS) / MINUTE_MS;
    let seconds = (difference % MINUTE_MS) / SECOND_MS;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes >= 5 {
        format!("{minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{seconds}s")
    } else {
        "Ended".to_string()
    }
}

/// Shortened address for display (`0x1234...abcd`)
pub fn format_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price_in_eth() {
        assert_eq!(format_price_in_eth(0), "0.0000");
        assert_eq!(format_price_in_eth(WEI_PER_ETH), "1.0000");
        assert_eq!(format_price_in_eth(1_234_560_000_000_000_000), "1.2346");
        assert_eq!(format_price_in_eth(49_999_999_999_999), "0.0000");
        assert_eq!(format_price_in_eth(50_000_000_000_000), "0.0001");
    }

    #[test]
    fn test_parse_price_in_wei() {
        assert_eq!(parse_price_in_wei("").unwrap(), 0);
        assert_eq!(parse_price_in_wei("1").unwrap(), WEI_PER_ETH);
        assert_eq!(parse_price_in_wei("0.5").unwrap(), WEI_PER_ETH / 2);
        assert_eq!(parse_price_in_wei(".25").unwrap(), WEI_PER_ETH / 4);
        assert_eq!(parse_price_in_wei("0.0000000000000000019").unwrap(), 1);
        assert!(parse_price_in_wei("abc").is_err());
        assert!(parse_price_in_wei("-1").is_err());
        assert!(parse_price_in_wei(".").is_err());
    }

    #[test]
    fn test_price_round_trip() {
        let wei = parse_price_in_wei("2.5").unwrap();
        assert_eq!(format_price_in_eth(wei), "2.5000");
    }

    #[test]
    fn test_format_time_difference() {
        let now_ms = 1_700_000_000_000;
        let now = now_ms / 1000;
        assert_eq!(format_time_difference(now + 2 * 86_400 + 3 * 3_600 + 4 * 60, now_ms), "2d 3h 4m");
        assert_eq!(format_time_difference(now + 3 * 3_600 + 10 * 60, now_ms), "3h 10m");
        assert_eq!(format_time_difference(now + 7 * 60 + 30, now_ms), "7m");
        assert_eq!(format_time_difference(now + 2 * 60 + 9, now_ms), "2m 9s");
        assert_eq!(format_time_difference(now + 42, now_ms), "42s");
        assert_eq!(format_time_difference(now, now_ms), "Ended");
        assert_eq!(format_time_difference(now - 100, now_ms), "Ended");
    }

    #[test]
    fn test_format_address() {
        let addr: Address = "0x1234567890abcdef1234567890abcdef12345678".parse().unwrap();
        assert_eq!(format_address(&addr), "0x1234...5678");
    }
}
