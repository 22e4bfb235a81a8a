// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Data-series extraction for the chart tool.
//!
//! The model hands the chart tool loosely formatted text like
//! `"Product A 120, Product B 85"`; this module recovers an ordered series of
//! labelled numeric points from it.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

static POINT: LazyLock<Regex> = LazyLock::new(|| {
    // Label up to a trailing number; ':' or '=' may separate them.
    Regex::new(r"^(?P<label>.*?)\s*[:=]?\s*(?P<value>-?\d+(?:\.\d+)?)\s*$").expect("point pattern")
});

/// Parse a delimited series of `label value` pairs, preserving input order.
///
/// Segments are split on commas, semicolons, and newlines.  Segments without
/// a trailing number are skipped.
pub fn parse_series(input: &str) -> Vec<DataPoint> {
    input
        .split(|c| c == ',' || c == ';' || c == '\n')
        .filter_map(|segment| {
            let segment = segment.trim();
            if segment.is_empty() {
                return None;
            }
            let caps = POINT.captures(segment)?;
            let label = caps["label"].trim().trim_end_matches([':', '=']).trim().to_string();
            let value: f64 = caps["value"].parse().ok()?;
            if label.is_empty() {
                return None;
            }
            Some(DataPoint { label, value })
        })
        .collect()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
