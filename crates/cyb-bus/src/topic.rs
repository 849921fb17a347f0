//! AMQP-style topic pattern matching for routing keys (spec §6:
//! `vsm.s<n>.<op>`). `*` matches exactly one dot-delimited segment, `#`
//! matches zero or more segments.

/// Whether `routing_key` matches `pattern`.
#[must_use]
pub fn matches(pattern: &str, routing_key: &str) -> bool {
    let pattern_segs: Vec<&str> = pattern.split('.').collect();
    let key_segs: Vec<&str> = routing_key.split('.').collect();
    match_segments(&pattern_segs, &key_segs)
}

fn match_segments(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => {
            if rest.is_empty() {
                return true;
            }
            (0..=key.len()).any(|split| match_segments(rest, &key[split..]))
        }
        Some((&"*", rest)) => !key.is_empty() && match_segments(rest, &key[1..]),
        Some((seg, rest)) => key.first() == Some(seg) && match_segments(rest, &key[1..]),
    }
}

/// Whether any pattern in `patterns` matches `routing_key`.
#[must_use]
pub fn matches_any(patterns: &[String], routing_key: &str) -> bool {
    patterns.iter().any(|p| matches(p, routing_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(matches("vsm.s4.analyze", "vsm.s4.analyze"));
        assert!(!matches("vsm.s4.analyze", "vsm.s4.explanation"));
    }

    #[test]
    fn star_matches_one_segment() {
        assert!(matches("vsm.s4.*", "vsm.s4.analyze"));
        assert!(!matches("vsm.s4.*", "vsm.s4.analyze.extra"));
        assert!(!matches("vsm.s4.*", "vsm.s4"));
    }

    #[test]
    fn hash_matches_zero_or_more_segments() {
        assert!(matches("vsm.#", "vsm.s4.analyze"));
        assert!(matches("vsm.#", "vsm"));
        assert!(matches("vsm.s4.#", "vsm.s4"));
    }

    #[test]
    fn matches_any_checks_every_binding() {
        let patterns = vec!["vsm.s1.*".to_string(), "vsm.s2.*".to_string()];
        assert!(matches_any(&patterns, "vsm.s2.coordinate"));
        assert!(!matches_any(&patterns, "vsm.s3.status_request"));
    }
}
