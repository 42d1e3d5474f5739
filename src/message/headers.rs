//! Case-insensitive, multi-valued header storage.
//!
//! A [`HeaderBag`] maps a header name to an ordered list of values. Lookups
//! ignore ASCII case, while the name used by the most recent `set`/`add`
//! call is kept for display (e.g. when the headers are written to the wire).
//!
//! Header blocks can be built from:
//! - a raw block as produced by a transport (`"HTTP/1.1 200 OK\r\nA: b\r\n..."`),
//! - a list of `"Name: value"` lines,
//! - name/value pairs, or name/list-of-values pairs.
//!
//! When a raw block contains several status lines (a transport that follows
//! redirects concatenates one block per hop) only the block after the last
//! status line is kept.
use crate::message::status::StatusLine;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

/// Ordered, case-insensitive header map with multiple values per name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBag {
    entries: Vec<HeaderEntry>,
    /// Last status line seen while parsing a raw block, if any.
    status_line: Option<String>,
}

impl HeaderBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw header block. Lines may be terminated by `\r\n` or `\n`.
    ///
    /// Empty input yields an empty bag.
    pub fn parse(raw: &str) -> Self {
        Self::from_lines(raw.split('\n'))
    }

    /// Builds a bag out of `"Name: value"` lines.
    ///
    /// Status lines reset the bag so that only the headers following the last
    /// status line survive. Lines without a colon are skipped.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut bag = HeaderBag::new();

        for line in lines {
            let line = line.as_ref().trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            if StatusLine::is_status_line(line) {
                // A new response block starts, drop everything before it
                bag.entries.clear();
                bag.status_line = Some(line.trim().to_string());
                continue;
            }

            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim();
                if !name.is_empty() {
                    bag.add(name, value.trim());
                }
            }
        }

        bag
    }

    /// Builds a bag from name/list-of-values pairs.
    pub fn from_multi<I, K, L, V>(headers: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let mut bag = HeaderBag::new();
        for (name, values) in headers {
            let name = name.into();
            for value in values {
                bag.add(name.clone(), value);
            }
        }
        bag
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Appends a value, keeping any values already present for `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                entry.name = name;
                entry.values.push(value.into());
            }
            None => self.entries.push(HeaderEntry {
                name,
                values: vec![value.into()],
            }),
        }
    }

    /// Replaces all values of `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set_lines(name, [value.into()]);
    }

    /// Replaces all values of `name`. An empty list removes the header.
    pub fn set_lines<I, V>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let name = name.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();

        if values.is_empty() {
            self.remove(&name);
            return;
        }

        match self.position(&name) {
            Some(idx) => self.entries[idx] = HeaderEntry { name, values },
            None => self.entries.push(HeaderEntry { name, values }),
        }
    }

    /// Removes `name` and returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// All values of `name` joined with `,`. Empty when the header is absent.
    pub fn get(&self, name: &str) -> String {
        self.get_lines(name).join(",")
    }

    pub fn get_lines(&self, name: &str) -> &[String] {
        self.position(name)
            .map(|idx| self.entries[idx].values.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Overlays `other` on top of this bag. Every name present in `other`
    /// replaces the values stored here.
    pub fn replace_from(&mut self, other: &HeaderBag) {
        for entry in &other.entries {
            self.set_lines(entry.name.clone(), entry.values.iter().cloned());
        }
    }

    /// Iterates over `(display name, values)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }
}

impl From<&str> for HeaderBag {
    fn from(raw: &str) -> Self {
        HeaderBag::parse(raw)
    }
}

impl From<String> for HeaderBag {
    fn from(raw: String) -> Self {
        HeaderBag::parse(&raw)
    }
}

impl From<Vec<String>> for HeaderBag {
    fn from(lines: Vec<String>) -> Self {
        HeaderBag::from_lines(lines)
    }
}

impl From<Vec<&str>> for HeaderBag {
    fn from(lines: Vec<&str>) -> Self {
        HeaderBag::from_lines(lines)
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for HeaderBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for HeaderBag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut bag = HeaderBag::new();
        for (name, value) in iter {
            bag.add(name, value);
        }
        bag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_case() {
        let mut bag = HeaderBag::new();
        bag.set("foo", "bar");

        assert_eq!(bag.get("foo"), "bar");
        assert_eq!(bag.get("FOO"), "bar");
        assert_eq!(bag.get("fOO"), "bar");
        assert!(bag.contains("Foo"));
    }

    #[test]
    fn add_appends_and_joins_with_comma() {
        let mut bag = HeaderBag::new();
        bag.set("X", "a");
        bag.add("x", "b");

        assert_eq!(bag.get("X"), "a,b");
        assert_eq!(bag.get_lines("X"), ["a", "b"]);
        assert_eq!(bag.len(), 1);
    }

    #[test]
    fn last_writer_wins_for_display_case() {
        let mut bag = HeaderBag::new();
        bag.set("content-type", "text/plain");
        bag.add("Content-Type", "charset=utf-8");

        let names: Vec<&str> = bag.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Content-Type"]);
    }

    #[test]
    fn empty_set_removes_header() {
        let mut bag = HeaderBag::new();
        bag.set("X-Gone", "1");
        bag.set_lines("x-gone", Vec::<String>::new());

        assert!(!bag.contains("X-Gone"));
        assert_eq!(bag.get("X-Gone"), "");
        assert!(bag.get_lines("X-Gone").is_empty());
    }

    #[test]
    fn parse_skips_status_line() {
        let bag = HeaderBag::parse("HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nX-A: 1\r\n\r\n");

        assert_eq!(bag.status_line(), Some("HTTP/1.1 200 OK"));
        assert_eq!(bag.get("content-type"), "application/json");
        assert_eq!(bag.get("x-a"), "1");
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn parse_keeps_only_last_redirect_block() {
        let raw = "HTTP/1.1 301 Moved Permanently\r\n\
                   Location: /new\r\n\
                   X-Hop: first\r\n\
                   \r\n\
                   HTTP/1.1 201 Created\r\n\
                   X-Hop: second\r\n\
                   \r\n";
        let bag = HeaderBag::parse(raw);

        assert_eq!(bag.status_line(), Some("HTTP/1.1 201 Created"));
        assert_eq!(bag.get("X-Hop"), "second");
        assert!(!bag.contains("Location"));
    }

    #[test]
    fn empty_or_blank_input_is_empty_bag() {
        assert!(HeaderBag::parse("").is_empty());
        assert!(HeaderBag::parse("\r\n\r\n").is_empty());
        assert_eq!(HeaderBag::parse("\r\n").status_line(), None);
    }

    #[test]
    fn all_source_forms_normalize() {
        let from_pairs = HeaderBag::from([("Accept", "a"), ("accept", "b")]);
        let from_lines = HeaderBag::from(vec!["Accept: a", "Accept: b"]);
        let from_multi = HeaderBag::from_multi([("Accept", vec!["a", "b"])]);

        assert_eq!(from_pairs.get_lines("accept"), ["a", "b"]);
        assert_eq!(from_lines.get_lines("accept"), ["a", "b"]);
        assert_eq!(from_multi.get_lines("accept"), ["a", "b"]);
    }

    #[test]
    fn lines_without_colon_are_ignored() {
        let bag = HeaderBag::from(vec!["garbage", "Good: yes"]);
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.get("good"), "yes");
    }

    #[test]
    fn replace_from_overrides_per_name() {
        let mut defaults = HeaderBag::from([("Accept", "text/html"), ("X-Keep", "1")]);
        let overrides = HeaderBag::from([("accept", "application/json")]);
        defaults.replace_from(&overrides);

        assert_eq!(defaults.get("Accept"), "application/json");
        assert_eq!(defaults.get("X-Keep"), "1");
    }
}
