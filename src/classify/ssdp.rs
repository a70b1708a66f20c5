// SPDX-License-Identifier: MIT

/// SSDP port for multicast queries and advertisements.
pub const SSDP_PORT: u16 = 1900;

/// Upper bound of the M-SEARCH `MX` header (Cai SSDP draft); larger
/// values are clamped, smaller ones invalidate the query.
pub const MX_MAX: u64 = 120;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub(crate) enum SsdpRequest {
    /// An M-SEARCH with its clamped max wait time in seconds.
    Query { max_wait: u64 },
    /// A NOTIFY carrying ssdp:alive or ssdp:byebye.
    Advertisement,
}

/// Classifies an HTTP-over-UDP request sent to the SSDP port.
pub(crate) fn classify_request(payload: &[u8]) -> Option<SsdpRequest> {
    let text = std::str::from_utf8(payload).ok()?;
    let mut lines = text.split("\r\n");
    match lines.next()? {
        "M-SEARCH * HTTP/1.1" => {
            if !header_value(text, "MAN")
                .is_some_and(|man| man == "\"ssdp:discover\"")
            {
                return None;
            }
            let mx: u64 = header_value(text, "MX")?.parse().ok()?;
            if mx < 1 {
                return None;
            }
            Some(SsdpRequest::Query {
                max_wait: mx.min(MX_MAX),
            })
        }
        "NOTIFY * HTTP/1.1" => {
            if header_value(text, "NT").is_none() {
                return None;
            }
            match header_value(text, "NTS")? {
                "ssdp:alive" | "ssdp:byebye" => Some(SsdpRequest::Advertisement),
                _ => None,
            }
        }
        _ => None,
    }
}

const RESPONSE_HEADERS: [&str; 4] = ["CACHE-CONTROL", "LOCATION", "ST", "USN"];

/// True when the payload is an HTTP response carrying every header an
/// M-SEARCH response must have.
pub(crate) fn is_search_response(payload: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(payload) else {
        return false;
    };
    let Some(status_line) = text.split("\r\n").next() else {
        return false;
    };
    if !status_line.starts_with("HTTP/1.") {
        return false;
    }
    RESPONSE_HEADERS
        .iter()
        .all(|name| header_value(text, name).is_some())
}

/// Returns the trimmed value of the first header matching `name`
/// (ASCII case-insensitive), stopping at the blank line.
fn header_value<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    for line in text.split("\r\n").skip(1) {
        if line.is_empty() {
            return None;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        if field.trim().eq_ignore_ascii_case(name) {
            return Some(value.trim());
        }
    }
    None
}
