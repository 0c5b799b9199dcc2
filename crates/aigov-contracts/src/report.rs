//! Report header type.
//!
//! A report begins (after an optional Markdown title) with `key=value` lines
//! that must literally equal the corresponding audit record fields:
//!
//! ```text
//! # Audit report for run `r1`
//!
//! run_id=r1
//! bundle_sha256=3f1c...
//! policy_version=v0.4_human_approval
//! aigov_mode=ci
//!
//! ## Summary
//! ```

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{AigovError, AigovResult};

pub const HEADER_RUN_ID: &str = "run_id";
pub const HEADER_BUNDLE_SHA256: &str = "bundle_sha256";
pub const HEADER_POLICY_VERSION: &str = "policy_version";

/// The three binding lines at the top of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHeader {
    pub run_id: String,
    pub bundle_sha256: String,
    pub policy_version: String,
}

impl ReportHeader {
    /// Header lines in canonical order, without trailing newline.
    pub fn lines(&self) -> [String; 3] {
        [
            format!("{HEADER_RUN_ID}={}", self.run_id),
            format!("{HEADER_BUNDLE_SHA256}={}", self.bundle_sha256),
            format!("{HEADER_POLICY_VERSION}={}", self.policy_version),
        ]
    }

    /// Pairs in canonical order.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (HEADER_RUN_ID, &self.run_id),
            (HEADER_BUNDLE_SHA256, &self.bundle_sha256),
            (HEADER_POLICY_VERSION, &self.policy_version),
        ]
    }

    /// Parse the header block of a report.
    ///
    /// Extra keys are allowed. A repeated key or a missing binding key is
    /// `MalformedInput`: the header must be unambiguous.
    pub fn parse(text: &str) -> AigovResult<Self> {
        let lines: Vec<&str> = text.lines().collect();
        let block = header_block(&lines)
            .ok_or_else(|| AigovError::malformed("report header", "no key=value header block"))?;

        let mut fields: BTreeMap<&str, &str> = BTreeMap::new();
        for line in &lines[block] {
            let Some((key, value)) = split_header_line(line) else {
                continue;
            };
            if fields.insert(key, value).is_some() {
                return Err(AigovError::malformed(
                    "report header",
                    format!("duplicate key '{key}'"),
                ));
            }
        }

        let missing: Vec<&str> = [HEADER_RUN_ID, HEADER_BUNDLE_SHA256, HEADER_POLICY_VERSION]
            .into_iter()
            .filter(|k| !fields.contains_key(k))
            .collect();
        if !missing.is_empty() {
            return Err(AigovError::malformed(
                "report header",
                format!("missing key(s): {}", missing.join(", ")),
            ));
        }

        let get = |k: &str| fields.get(k).map(|v| v.to_string()).unwrap_or_default();
        Ok(Self {
            run_id: get(HEADER_RUN_ID),
            bundle_sha256: get(HEADER_BUNDLE_SHA256),
            policy_version: get(HEADER_POLICY_VERSION),
        })
    }
}

/// Split `key=value` when `key` is a lowercase identifier. The value is
/// kept verbatim apart from a trailing carriage return.
pub fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let is_ident = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    is_ident.then(|| (key, value.trim_end_matches('\r')))
}

/// Line range of the header block: the first run of `key=value` lines,
/// preceded only by blank lines and `#` title lines.
pub fn header_block(lines: &[&str]) -> Option<Range<usize>> {
    let start = lines.iter().position(|l| {
        let t = l.trim();
        !(t.is_empty() || t.starts_with('#'))
    })?;
    split_header_line(lines[start])?;
    let len = lines[start..]
        .iter()
        .take_while(|l| split_header_line(l).is_some())
        .count();
    Some(start..start + len)
}
