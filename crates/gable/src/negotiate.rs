// Copyright 2024-2026 Gable contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Accept-header negotiation.
//!
//! Selects the best-matching value from a supported set given a
//! client-declared preference header (`Accept`, `Accept-Encoding`,
//! `Accept-Language`). Quality values are honored: candidates are
//! considered in descending q order, ties broken by header position,
//! and `q=0` entries are treated as unacceptable.
//!
//! The quality-value grammar lives entirely in this module; callers
//! consume it through the three entry points below.

/// One parsed segment of an accept header.
#[derive(Debug, Clone)]
struct Preference {
    value: String,
    quality: f32,
}

/// Negotiates a media type from an `Accept` header.
///
/// With `strict`, returns an empty string when nothing matches instead
/// of falling back to the first supported value.
pub fn content(accepted: &str, supported: &[String], strict: bool) -> String {
    negotiate_with(accepted, supported, strict, media_type_matches)
}

/// Negotiates a content coding from an `Accept-Encoding` header.
pub fn encoding(accepted: &str, supported: &[String]) -> String {
    negotiate_with(accepted, supported, false, token_matches)
}

/// Negotiates a language tag from an `Accept-Language` header.
pub fn language(accepted: &str, supported: &[String]) -> String {
    negotiate_with(accepted, supported, false, language_matches)
}

fn negotiate_with(
    accepted: &str,
    supported: &[String],
    strict: bool,
    matches: fn(&str, &str) -> bool,
) -> String {
    let preferences = parse_header(accepted);

    for preference in &preferences {
        if preference.quality <= 0.0 {
            continue;
        }
        for candidate in supported {
            if matches(&preference.value, candidate) {
                return candidate.clone();
            }
        }
    }

    if strict {
        return String::new();
    }

    supported.first().cloned().unwrap_or_default()
}

/// Parses an accept header into preferences sorted by descending q,
/// ties broken by header position.
fn parse_header(accepted: &str) -> Vec<Preference> {
    let mut preferences: Vec<Preference> = accepted
        .split(',')
        .filter_map(|segment| {
            let segment = segment.trim();
            if segment.is_empty() {
                return None;
            }

            let mut parts = segment.split(';');
            let value = parts.next()?.trim().to_string();
            let quality = parts
                .filter_map(|param| {
                    let (key, q) = param.split_once('=')?;
                    if key.trim().eq_ignore_ascii_case("q") {
                        q.trim().parse::<f32>().ok()
                    } else {
                        None
                    }
                })
                .next()
                .unwrap_or(1.0);

            Some(Preference { value, quality })
        })
        .collect();

    preferences.sort_by(|a, b| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    preferences
}

fn token_matches(accepted: &str, candidate: &str) -> bool {
    accepted == "*" || accepted.eq_ignore_ascii_case(candidate)
}

fn media_type_matches(accepted: &str, candidate: &str) -> bool {
    let accepted = accepted.split(';').next().unwrap_or("").trim();
    let candidate = candidate.split(';').next().unwrap_or("").trim();

    if accepted == "*/*" || accepted.eq_ignore_ascii_case(candidate) {
        return true;
    }

    match (accepted.split_once('/'), candidate.split_once('/')) {
        (Some((atype, "*")), Some((ctype, _))) => atype.eq_ignore_ascii_case(ctype),
        _ => false,
    }
}

fn language_matches(accepted: &str, candidate: &str) -> bool {
    if accepted == "*" || accepted.eq_ignore_ascii_case(candidate) {
        return true;
    }

    // A bare primary tag accepts any regional variant of it.
    let primary = accepted.split('-').next().unwrap_or(accepted);
    candidate
        .split('-')
        .next()
        .map(|c| accepted == primary && c.eq_ignore_ascii_case(primary))
        .unwrap_or(false)
}
