//! Parser for brace-delimited corosync sections
//!
//! Reads one named section (`totem { ... }`, `quorum { ... }`) out of a larger
//! corosync.conf dump and flattens its `key: value` lines. Nested sections such
//! as `interface { ... }` are skipped as a unit.

use crate::error::MalformedBlockError;
use std::collections::BTreeMap;

/// Flat `name -> value` mapping of one section
pub type BlockMap = BTreeMap<String, String>;

const OPEN: char = '{';
const CLOSE: char = '}';

/// Parse the first section introduced by `marker`
pub fn parse_block(text: &str, marker: &str) -> Result<BlockMap, MalformedBlockError> {
    let mut lines = text.lines().enumerate();

    let mut found = false;
    for (_, raw) in lines.by_ref() {
        if opens_section(strip_comment(raw), marker) {
            found = true;
            break;
        }
    }
    if !found {
        return Err(MalformedBlockError::MarkerNotFound {
            marker: marker.to_string(),
        });
    }

    let mut values = BlockMap::new();
    let mut nested = 0usize;

    for (idx, raw) in lines {
        let line = strip_comment(raw);
        if line.is_empty() {
            continue;
        }

        if nested > 0 {
            nested = (nested + line.matches(OPEN).count()).saturating_sub(line.matches(CLOSE).count());
            continue;
        }

        if line.contains(OPEN) {
            nested = line
                .matches(OPEN)
                .count()
                .saturating_sub(line.matches(CLOSE).count());
            continue;
        }

        if line == "}" {
            return Ok(values);
        }

        let (line, closes) = match line.strip_suffix(CLOSE) {
            Some(rest) => (rest.trim_end(), true),
            None => (line, false),
        };

        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| MalformedBlockError::MissingSeparator {
                marker: marker.to_string(),
                line: idx + 1,
                content: line.to_string(),
            })?;
        values.insert(key.trim().to_string(), value.trim().to_string());

        if closes {
            return Ok(values);
        }
    }

    // Truncated dumps end inside the section
    log::debug!("section '{}' not closed before end of input", marker);
    Ok(values)
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or("").trim()
}

fn opens_section(line: &str, marker: &str) -> bool {
    line.strip_prefix(marker)
        .map(|rest| rest.trim_start().starts_with(OPEN))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COROSYNC: &str = "\
# Please read the corosync.conf.5 manual page
totem {
\tversion: 2
\tsecauth: on
\tcrypto_hash: sha1
\tcrypto_cipher: aes256
\tcluster_name: hacluster
\tclear_node_high_bit: yes
\ttoken: 30000
\ttoken_retransmits_before_loss_const: 10
\tjoin: 60
\tconsensus: 36000
\tmax_messages: 20
\tinterface {
\t\tringnumber: 0
\t\tmcastport: 5405
\t\tttl: 1
\t}
\ttransport: udpu
}
logging {
\tfileline: off
\tto_stderr: no
}
quorum {
\t# Enable and configure quorum subsystem (default: off)
\t# see also corosync.conf.5 and votequorum.5
\tprovider: corosync_votequorum
\texpected_votes: 2
\ttwo_node: 1
}
";

    #[test]
    fn test_totem_section() {
        let map = parse_block(COROSYNC, "totem").unwrap();

        assert_eq!(map.get("token").map(String::as_str), Some("30000"));
        assert_eq!(map.get("transport").map(String::as_str), Some("udpu"));
        assert_eq!(map.get("consensus").map(String::as_str), Some("36000"));
        // interface block skipped
        assert!(!map.contains_key("ringnumber"));
        assert!(!map.contains_key("mcastport"));
        // logging belongs to another section
        assert!(!map.contains_key("fileline"));
    }

    #[test]
    fn test_quorum_section_with_comments() {
        let map = parse_block(COROSYNC, "quorum").unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map["provider"], "corosync_votequorum");
        assert_eq!(map["expected_votes"], "2");
        assert_eq!(map["two_node"], "1");
    }

    #[test]
    fn test_marker_not_found() {
        let err = parse_block("logging {\n\tto_stderr: no\n}\n", "totem").unwrap_err();
        assert_eq!(
            err,
            MalformedBlockError::MarkerNotFound {
                marker: "totem".to_string()
            }
        );
    }

    #[test]
    fn test_commented_out_marker_is_not_a_section() {
        let err = parse_block("# totem {\n", "totem").unwrap_err();
        assert!(matches!(err, MalformedBlockError::MarkerNotFound { .. }));
    }

    #[test]
    fn test_missing_separator() {
        let text = "quorum {\n\tprovider corosync_votequorum\n}\n";
        let err = parse_block(text, "quorum").unwrap_err();
        assert_eq!(
            err,
            MalformedBlockError::MissingSeparator {
                marker: "quorum".to_string(),
                line: 2,
                content: "provider corosync_votequorum".to_string(),
            }
        );
    }

    #[test]
    fn test_trailing_comment_and_glued_brace() {
        let text = "quorum {\n provider: corosync_votequorum # votequorum\n two_node: 1}\n expected_votes: 9\n";
        let map = parse_block(text, "quorum").unwrap();

        assert_eq!(map["provider"], "corosync_votequorum");
        assert_eq!(map["two_node"], "1");
        assert!(!map.contains_key("expected_votes"));
    }

    #[test]
    fn test_truncated_section() {
        let text = "totem {\n\ttoken: 30000\n\tjoin: 60\n";
        let map = parse_block(text, "totem").unwrap();
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_single_line_nested_section() {
        let text = "totem {\n\tinterface { ringnumber: 0 }\n\ttoken: 5000\n}\n";
        let map = parse_block(text, "totem").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["token"], "5000");
    }
}
