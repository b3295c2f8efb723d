//! Exposition-format parsing
//!
//! Turns the text served by a `/metrics` endpoint into a flat [`MetricTable`].
//! Exporters do not agree on a label schema, so every labeled sample is stored
//! under several keys at once:
//!
//! - `<name>`: first sample seen for the metric (never overwritten)
//! - `<name>_total`: running sum of every labeled sample of the metric
//! - `<name>_<v1>_<v2>...`: the exact label combination, values in encounter order
//! - `<name>_<v>`: one entry per individual label value (last write wins)
//!
//! Comments, blank lines and lines that do not look like `name{labels} value`
//! are dropped without error.

use serde::Serialize;
use std::collections::HashMap;

/// Flat metric key -> value mapping, rebuilt on every scrape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetricTable {
    samples: HashMap<String, f64>,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw exposition body.
    pub fn parse(text: &str) -> Self {
        let mut table = Self::new();

        for line in text.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let Some(sample) = parse_line(line) else {
                continue;
            };
            table.record(&sample);
        }

        table
    }

    /// Raw lookup, `NaN` included.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.samples.get(key).copied()
    }

    /// Lookup with fallback.
    ///
    /// The fallback is returned when the key is absent, and also when the
    /// stored value is `0` or `NaN`. Every normalized field goes through this
    /// accessor, so a malformed sample never leaks `NaN` into the snapshot and
    /// a field with a non-zero fallback (tps, max players, max fds) never
    /// reports 0.
    pub fn get_or(&self, key: &str, fallback: f64) -> f64 {
        match self.samples.get(key) {
            Some(value) if *value != 0.0 && !value.is_nan() => *value,
            _ => fallback,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.samples.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.samples.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Store one sample under every key it feeds.
    ///
    /// `<name>_total` is a plain float sum: once a NaN sample is added the
    /// total stays NaN for the rest of the scrape, and `get_or` then serves
    /// the fallback. A NaN does not restart the sum from the next sample.
    fn record(&mut self, sample: &Sample<'_>) {
        let Sample { name, labels, value } = *sample;

        // first occurrence wins for the bare name
        self.samples.entry(name.to_string()).or_insert(value);

        let Some(raw_labels) = labels else {
            return;
        };

        *self.samples.entry(format!("{name}_total")).or_insert(0.0) += value;

        let pairs = parse_labels(raw_labels);
        if pairs.is_empty() {
            return;
        }

        let combined: String = pairs.iter().map(|(_, v)| format!("_{v}")).collect();
        self.samples.insert(format!("{name}{combined}"), value);

        for (_, label_value) in &pairs {
            self.samples.insert(format!("{name}_{label_value}"), value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample<'a> {
    name: &'a str,
    /// Brace content, only when non-empty.
    labels: Option<&'a str>,
    value: f64,
}

fn parse_line(line: &str) -> Option<Sample<'_>> {
    let name_len = identifier_len(line)?;
    let (name, rest) = line.split_at(name_len);

    let (labels, rest) = match rest.strip_prefix('{') {
        Some(inner) => {
            let close = inner.find('}')?;
            (Some(&inner[..close]), &inner[close + 1..])
        }
        None => (None, rest),
    };

    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    // anything after the value (an optional timestamp) is ignored
    let token = rest.split_whitespace().next()?;

    Some(Sample {
        name,
        labels: labels.filter(|l| !l.is_empty()),
        value: parse_value(token),
    })
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b':'
}

fn identifier_len(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' || *b == b':' => {}
        _ => return None,
    }
    Some(bytes.iter().take_while(|b| is_identifier_byte(**b)).count())
}

/// Lenient float parse: the longest numeric prefix of the token is used, so
/// `"12abc"` reads as 12. A token with no numeric prefix becomes `NaN`.
fn parse_value(token: &str) -> f64 {
    match token {
        "+Inf" | "Inf" | "+Infinity" | "Infinity" => return f64::INFINITY,
        "-Inf" | "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    numeric_prefix(token).parse::<f64>().unwrap_or(f64::NAN)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

fn numeric_prefix(token: &str) -> &str {
    let bytes = token.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    &token[..end]
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Extract `key="value"` pairs from brace content.
///
/// Keys are word characters, values are any non-empty run without a quote.
/// A repeated key keeps its first position and takes the later value.
fn parse_labels(raw: &str) -> Vec<(&str, &str)> {
    let bytes = raw.as_bytes();
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = raw[cursor..].find("=\"") {
        let eq = cursor + offset;
        let value_start = eq + 2;

        let key_start = bytes[cursor..eq]
            .iter()
            .rposition(|b| !is_word_byte(*b))
            .map_or(cursor, |i| cursor + i + 1);
        let key = &raw[key_start..eq];

        let Some(value_len) = raw[value_start..].find('"') else {
            break;
        };
        let value = &raw[value_start..value_start + value_len];

        if key.is_empty() || value.is_empty() {
            cursor = value_start;
            continue;
        }

        match pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => pairs.push((key, value)),
        }
        cursor = value_start + value_len + 1;
    }

    pairs
}
