//! Dotted numeric versions as reported by tools like `docker version`

use std::cmp::Ordering;
use std::fmt;

/// A version made of dot separated numbers
///
/// Only the leading numeric part is read, so build metadata and pre-release
/// suffixes (`20.10.17+dfsg1`, `25.0.0-rc.1`) are ignored. Missing trailing
/// components compare as zero, so `18.09` equals `18.9.0`.
#[derive(Debug, Clone)]
pub struct Version {
    parts: Vec<u64>,
}

impl Version {
    /// Parse the leading `N(.N)*` of a version string
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let input = input.strip_prefix('v').unwrap_or(input);
        let end = input
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(input.len());
        let numeric = input[..end].trim_end_matches('.');
        if numeric.is_empty() {
            return None;
        }

        let parts = numeric
            .split('.')
            .map(|p| p.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self { parts })
    }

    fn part(&self, i: usize) -> u64 {
        self.parts.get(i).copied().unwrap_or(0)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.part(i).cmp(&other.part(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.parts.iter().map(u64::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_leading_zeros_and_padding() {
        assert_eq!(v("18.09.00"), v("18.9"));
        assert_eq!(v("18.09.00").to_string(), "18.9.0");
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(v("24.0.7") > v("18.09.00"));
        assert!(v("18.10") > v("18.9.9"));
        assert!(v("17.12.1") < v("18.09"));
        assert!(v("1.10") > v("1.9"));
    }

    #[test]
    fn test_suffixes_ignored() {
        assert_eq!(v("20.10.17+dfsg1"), v("20.10.17"));
        assert_eq!(v("25.0.0-rc.1"), v("25.0.0"));
        assert_eq!(v("v1.2"), v("1.2.0"));
    }

    #[test]
    fn test_unparseable() {
        assert!(Version::parse("").is_none());
        assert!(Version::parse("dev").is_none());
        assert!(Version::parse("1..2").is_none());
    }
}
