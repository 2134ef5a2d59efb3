//! Legacy-path redirection. English and pre-rename URLs map onto the current
//! French routes, forwarding only the query parameters each target understands.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::collections::HashMap;

/// LegacyRoute
///
/// `pattern` and `target` are `/`-separated; segments starting with `:` are
/// parameters. Patterns match whole paths (same segment count), never prefixes.
#[derive(Debug, Clone, Copy)]
pub struct LegacyRoute {
    pub pattern: &'static str,
    pub target: &'static str,
    pub forwarded: &'static [&'static str],
}

pub const LEGACY_ROUTES: &[LegacyRoute] = &[
    LegacyRoute {
        pattern: "/dashboard",
        target: "/tableau-de-bord",
        forwarded: &[],
    },
    LegacyRoute {
        pattern: "/dashboard/admin",
        target: "/tableau-de-bord/admin",
        forwarded: &["tab"],
    },
    LegacyRoute {
        pattern: "/dashboard/payments",
        target: "/tableau-de-bord/paiements",
        forwarded: &[],
    },
    LegacyRoute {
        pattern: "/dashboard/profile",
        target: "/tableau-de-bord/profil",
        forwarded: &[],
    },
    LegacyRoute {
        pattern: "/dashboard/student",
        target: "/tableau-de-bord/etudiant",
        forwarded: &[],
    },
    LegacyRoute {
        pattern: "/checkout",
        target: "/paiement",
        forwarded: &[],
    },
    LegacyRoute {
        pattern: "/courses",
        target: "/formations",
        forwarded: &[],
    },
    LegacyRoute {
        pattern: "/courses/:id",
        target: "/formations/:id",
        forwarded: &[],
    },
    LegacyRoute {
        pattern: "/cohorts/:slug",
        target: "/cohorte/:slug/apprendre",
        forwarded: &["contentItemId"],
    },
    LegacyRoute {
        pattern: "/cohorte",
        target: "/formations#cohortes",
        forwarded: &[],
    },
];

// Characters that cannot appear raw inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encodes a decoded value for use as one path segment.
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Query parameters `/learn/:courseId` carries over to the learning interface.
pub const LEARN_FORWARDED: &[&str] = &["contentItemId", "module", "tab"];

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Binds the pattern's parameters against `path`, or `None` when it does not match.
fn bind<'a>(pattern: &'static str, path: &'a str) -> Option<Vec<(&'static str, &'a str)>> {
    let expected = segments(pattern);
    let actual = segments(path);
    if expected.len() != actual.len() {
        return None;
    }

    let mut params = Vec::new();
    for (want, got) in expected.into_iter().zip(actual) {
        match want.strip_prefix(':') {
            Some(name) => params.push((name, got)),
            None if want == got => {}
            None => return None,
        }
    }
    Some(params)
}

/// with_query
///
/// Appends the `forwarded` parameters present in `query` to `target`, in
/// `forwarded` order. The query goes before any `#fragment`.
pub fn with_query(target: &str, query: &HashMap<String, String>, forwarded: &[&str]) -> String {
    let pairs: Vec<(&str, &str)> = forwarded
        .iter()
        .filter_map(|name| {
            query
                .get(*name)
                .filter(|value| !value.is_empty())
                .map(|value| (*name, value.as_str()))
        })
        .collect();

    if pairs.is_empty() {
        return target.to_string();
    }

    let Ok(encoded) = serde_urlencoded::to_string(&pairs) else {
        return target.to_string();
    };

    match target.split_once('#') {
        Some((path, fragment)) => format!("{path}?{encoded}#{fragment}"),
        None => format!("{target}?{encoded}"),
    }
}

/// canonical_target
///
/// Destination for a legacy `path`, or `None` when the path is already canonical.
pub fn canonical_target(path: &str, query: &HashMap<String, String>) -> Option<String> {
    LEGACY_ROUTES.iter().find_map(|route| {
        let params = bind(route.pattern, path)?;
        let mut target = route.target.to_string();
        for (name, value) in params {
            target = target.replace(&format!(":{name}"), value);
        }
        Some(with_query(&target, query, route.forwarded))
    })
}

/// legacy_redirect
///
/// Canonical path for `old_path`. Already-canonical paths come back unchanged.
pub fn legacy_redirect(old_path: &str, query: &HashMap<String, String>) -> String {
    canonical_target(old_path, query).unwrap_or_else(|| old_path.to_string())
}
