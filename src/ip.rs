//! Textual IP address parsing.
//!
//! Lookups take address strings, so the dotted-quad and colon-hex
//! grammars are parsed here into the fixed-width network-order byte
//! arrays the search tree walks.

use crate::error::MmdbError;

/// An address parsed to network-order bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IpBytes {
    V4([u8; 4]),
    V6([u8; 16]),
}

/// Parses an address string; a `:` anywhere selects the IPv6 grammar.
pub(crate) fn parse_address(s: &str) -> Result<IpBytes, MmdbError> {
    if s.contains(':') {
        parse_ipv6(s).map(IpBytes::V6)
    } else {
        parse_ipv4(s).map(IpBytes::V4)
    }
}

/// Parses a dotted quad: exactly four decimal components of 1-3 digits,
/// each at most 255.
pub(crate) fn parse_ipv4(s: &str) -> Result<[u8; 4], MmdbError> {
    let syntax = || MmdbError::AddressSyntax(s.to_owned());

    let mut octets = [0_u8; 4];
    let mut count = 0;
    for part in s.split('.') {
        if count == 4 {
            return Err(syntax());
        }
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(syntax());
        }
        let n: u16 = part.parse().map_err(|_| syntax())?;
        octets[count] = u8::try_from(n).map_err(|_| syntax())?;
        count += 1;
    }
    if count != 4 {
        return Err(syntax());
    }
    Ok(octets)
}

/// Parses colon-hex IPv6, including a single `::` expansion and the
/// mixed trailing dotted-quad notation.
pub(crate) fn parse_ipv6(s: &str) -> Result<[u8; 16], MmdbError> {
    let syntax = || MmdbError::AddressSyntax(s.to_owned());

    if s.contains(":::") {
        return Err(MmdbError::TooManyColons);
    }

    // Mixed notation pre-pass: rewrite a trailing dotted quad into the
    // final two groups before group parsing.
    let rewritten;
    let s_hex = if s.contains('.') {
        let idx = s.rfind(':').ok_or_else(syntax)?;
        let quad = parse_ipv4(&s[idx + 1..]).map_err(|_| syntax())?;
        rewritten = format!(
            "{}{:x}:{:x}",
            &s[..=idx],
            u16::from_be_bytes([quad[0], quad[1]]),
            u16::from_be_bytes([quad[2], quad[3]]),
        );
        rewritten.as_str()
    } else {
        s
    };

    let (head, tail) = match s_hex.find("::") {
        Some(i) => {
            let tail = &s_hex[i + 2..];
            if tail.contains("::") {
                return Err(syntax());
            }
            (&s_hex[..i], Some(tail))
        }
        None => (s_hex, None),
    };

    let head_groups = parse_groups(head, &syntax)?;
    let mut groups = [0_u16; 8];

    match tail {
        None => {
            if head_groups.len() != 8 {
                return Err(syntax());
            }
            groups.copy_from_slice(&head_groups);
        }
        Some(tail) => {
            let tail_groups = parse_groups(tail, &syntax)?;
            // The ellipsis stands for at least one zero group.
            if head_groups.len() + tail_groups.len() > 7 {
                return Err(syntax());
            }
            groups[..head_groups.len()].copy_from_slice(&head_groups);
            groups[8 - tail_groups.len()..].copy_from_slice(&tail_groups);
        }
    }

    let mut bytes = [0_u8; 16];
    for (i, group) in groups.iter().enumerate() {
        bytes[i * 2..i * 2 + 2].copy_from_slice(&group.to_be_bytes());
    }
    Ok(bytes)
}

fn parse_groups(
    side: &str,
    syntax: &impl Fn() -> MmdbError,
) -> Result<Vec<u16>, MmdbError> {
    if side.is_empty() {
        return Ok(Vec::new());
    }
    side.split(':')
        .map(|group| {
            if group.is_empty() || group.len() > 4 {
                return Err(syntax());
            }
            u16::from_str_radix(group, 16).map_err(|_| syntax())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_valid() {
        assert_eq!(parse_ipv4("1.2.3.4").unwrap(), [1, 2, 3, 4]);
        assert_eq!(parse_ipv4("0.0.0.0").unwrap(), [0, 0, 0, 0]);
        assert_eq!(
            parse_ipv4("255.255.255.255").unwrap(),
            [255, 255, 255, 255]
        );
        // Leading zeros are accepted within the three-digit limit.
        assert_eq!(parse_ipv4("001.002.003.004").unwrap(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_ipv4_invalid() {
        for bad in [
            "1.2.3",
            "1.2.3.4.5",
            "1.2.3.256",
            "1.2.3.",
            ".1.2.3",
            "1..2.3",
            "a.b.c.d",
            "1.2.3.0004",
            "-1.2.3.4",
            "",
        ] {
            assert!(
                matches!(parse_ipv4(bad), Err(MmdbError::AddressSyntax(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_ipv6_full_form() {
        let bytes = parse_ipv6("1:2:3:4:5:6:7:8").unwrap();
        assert_eq!(
            bytes,
            [0, 1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0, 7, 0, 8]
        );
    }

    #[test]
    fn test_ipv6_case_insensitive() {
        assert_eq!(
            parse_ipv6("ABCD::ef01").unwrap(),
            parse_ipv6("abcd::EF01").unwrap()
        );
    }

    #[test]
    fn test_ipv6_compression() {
        assert_eq!(parse_ipv6("::").unwrap(), [0; 16]);

        let mut loopback = [0_u8; 16];
        loopback[15] = 1;
        assert_eq!(parse_ipv6("::1").unwrap(), loopback);

        let mut fe80 = [0_u8; 16];
        fe80[0] = 0xFE;
        fe80[1] = 0x80;
        fe80[15] = 1;
        assert_eq!(parse_ipv6("fe80::1").unwrap(), fe80);

        let bytes = parse_ipv6("1:2:3:4:5:6:7::").unwrap();
        assert_eq!(bytes[..14], [0, 1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0, 7]);
        assert_eq!(bytes[14..], [0, 0]);
    }

    #[test]
    fn test_ipv6_invalid() {
        for bad in [
            "1:2:3:4:5:6:7",
            "1:2:3:4:5:6:7:8:9",
            "1:2:3:4:5:6:7:8::",
            "::1:2:3:4:5:6:7:8",
            "1::2::3",
            "12345::",
            ":1:2:3:4:5:6:7",
            "1:2:3:4:5:6:7:",
            "g::1",
            ":",
        ] {
            assert!(
                matches!(parse_ipv6(bad), Err(MmdbError::AddressSyntax(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_too_many_colons() {
        assert!(matches!(parse_ipv6(":::"), Err(MmdbError::TooManyColons)));
        assert!(matches!(
            parse_ipv6("1:::2"),
            Err(MmdbError::TooManyColons)
        ));
    }

    #[test]
    fn test_mixed_notation() {
        let mut expected = [0_u8; 16];
        expected[10] = 0xFF;
        expected[11] = 0xFF;
        expected[12..].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(parse_ipv6("::ffff:1.2.3.4").unwrap(), expected);

        let mut compat = [0_u8; 16];
        compat[12..].copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(parse_ipv6("::1.2.3.4").unwrap(), compat);

        assert!(parse_ipv6("::ffff:1.2.3.256").is_err());
    }

    #[test]
    fn test_roundtrip_through_canonical_formatter() {
        let samples: [[u8; 16]; 4] = [
            [0; 16],
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
            [
                0x20, 0x01, 0x0D, 0xB8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x12, 0x34,
            ],
            [
                0xFE, 0x80, 0, 0, 0, 0, 0, 0, 0x02, 0x11, 0x22, 0xFF, 0xFE, 0x33, 0x44, 0x55,
            ],
        ];
        for bytes in samples {
            let formatted = std::net::Ipv6Addr::from(bytes).to_string();
            assert_eq!(parse_ipv6(&formatted).unwrap(), bytes, "{formatted}");
        }
    }

    #[test]
    fn test_parse_address_dispatch() {
        assert_eq!(
            parse_address("1.2.3.4").unwrap(),
            IpBytes::V4([1, 2, 3, 4])
        );
        assert!(matches!(parse_address("::1").unwrap(), IpBytes::V6(_)));
        assert!(parse_address("nonsense").is_err());
    }
}
