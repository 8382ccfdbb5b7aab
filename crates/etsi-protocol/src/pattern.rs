//! Hierarchical command patterns
//!
//! Patterns use the usual instrument notation: `:`-separated keywords whose
//! upper-case prefix is the accepted short form, an optional `#` marking a
//! numeric suffix and a trailing `?` for queries.
//!
//! ```text
//! PHY#:CAPabilities:FREQLow?
//! ^^^  ^^^^^^^^^^^^ ^^^^^^^
//! |    |            short form FREQL, long form FREQLOW
//! |    short form CAP, long form CAPABILITIES
//! keyword PHY with a suffix slot (PHY0, PHY1, ... or PHY meaning PHY0)
//! ```

use crate::error::ParseError;

/// One keyword of a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    short: String,
    long: String,
    suffix: bool,
}

impl Keyword {
    fn parse(pattern: &str, text: &str) -> Result<Self, ParseError> {
        let invalid = |reason| ParseError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        };

        let (name, suffix) = match text.strip_suffix('#') {
            Some(name) => (name, true),
            None => (text, false),
        };
        if name.is_empty() {
            return Err(invalid("empty keyword"));
        }
        if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'*') {
            return Err(invalid("keyword contains invalid characters"));
        }
        if name.bytes().last().is_some_and(|b| b.is_ascii_digit()) {
            return Err(invalid("keyword ends in a digit"));
        }

        let short: String = name
            .chars()
            .take_while(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '*')
            .collect();
        if short.is_empty() {
            return Err(invalid("keyword has no short form"));
        }

        Ok(Self {
            short,
            long: name.to_ascii_uppercase(),
            suffix,
        })
    }

    /// Short (abbreviated) form, upper case
    pub fn short_form(&self) -> &str {
        &self.short
    }

    /// Long form, upper case
    pub fn long_form(&self) -> &str {
        &self.long
    }

    /// Keyword carries a numeric suffix slot
    pub fn has_suffix(&self) -> bool {
        self.suffix
    }

    fn accepts(&self, segment: &Segment) -> bool {
        if segment.suffix.is_some() && !self.suffix {
            return false;
        }
        segment.keyword.eq_ignore_ascii_case(&self.short)
            || segment.keyword.eq_ignore_ascii_case(&self.long)
    }
}

/// A compiled command pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    text: String,
    keywords: Vec<Keyword>,
    query: bool,
}

impl Pattern {
    /// Compile a pattern such as `PHY#:CHANnel#?`
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let (body, query) = match text.strip_suffix('?') {
            Some(body) => (body, true),
            None => (text, false),
        };
        let body = body.strip_prefix(':').unwrap_or(body);

        let keywords = body
            .split(':')
            .map(|keyword| Keyword::parse(text, keyword))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            text: text.to_string(),
            keywords,
            query,
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Compiled keywords in order
    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    /// Number of keywords
    pub fn depth(&self) -> usize {
        self.keywords.len()
    }

    /// Pattern ends in `?`
    pub fn is_query(&self) -> bool {
        self.query
    }

    /// Number of keywords without a suffix slot
    ///
    /// Used to prefer fixed keywords over suffixed ones when several
    /// patterns accept the same header.
    pub fn specificity(&self) -> usize {
        self.keywords.iter().filter(|k| !k.suffix).count()
    }

    /// Match a header, returning the value of every suffix slot
    ///
    /// Absent suffixes read as 0.
    pub fn matches(&self, header: &Header) -> Option<Vec<u32>> {
        if header.query != self.query || header.segments.len() != self.keywords.len() {
            return None;
        }

        let mut suffixes = Vec::new();
        for (keyword, segment) in self.keywords.iter().zip(&header.segments) {
            if !keyword.accepts(segment) {
                return None;
            }
            if keyword.suffix {
                suffixes.push(segment.suffix.unwrap_or(0));
            }
        }
        Some(suffixes)
    }
}

/// One `:`-separated part of an input header
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    keyword: String,
    suffix: Option<u32>,
}

/// A parsed input header, e.g. `phy1:cap:freql?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    segments: Vec<Segment>,
    query: bool,
}

impl Header {
    /// Parse a command header (the part of the line before any parameters)
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        if text.is_empty() {
            return Err(ParseError::Empty);
        }
        let invalid = || ParseError::InvalidHeader(text.to_string());

        let (body, query) = match text.strip_suffix('?') {
            Some(body) => (body, true),
            None => (text, false),
        };
        let body = body.strip_prefix(':').unwrap_or(body);

        let mut segments = Vec::new();
        for part in body.split(':') {
            let split = part
                .find(|c: char| c.is_ascii_digit())
                .unwrap_or(part.len());
            let (keyword, digits) = part.split_at(split);

            if keyword.is_empty()
                || !keyword.bytes().all(|b| b.is_ascii_alphabetic() || b == b'*')
            {
                return Err(invalid());
            }
            let suffix = if digits.is_empty() {
                None
            } else {
                if !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                Some(digits.parse::<u32>().map_err(|_| invalid())?)
            };

            segments.push(Segment {
                keyword: keyword.to_string(),
                suffix,
            });
        }

        Ok(Self { segments, query })
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Header ends in `?`
    pub fn is_query(&self) -> bool {
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(text: &str) -> Header {
        Header::parse(text).unwrap()
    }

    #[test]
    fn test_keyword_forms() {
        let pattern = Pattern::parse("PHY#:CAPabilities:FREQLow?").unwrap();
        let forms: Vec<_> = pattern
            .keywords()
            .iter()
            .map(|k| (k.short_form(), k.long_form(), k.has_suffix()))
            .collect();
        assert_eq!(
            forms,
            vec![
                ("PHY", "PHY", true),
                ("CAP", "CAPABILITIES", false),
                ("FREQL", "FREQLOW", false),
            ]
        );
        assert!(pattern.is_query());
        assert_eq!(pattern.specificity(), 2);
    }

    #[test]
    fn test_common_command_keyword() {
        let pattern = Pattern::parse("*IDN?").unwrap();
        assert_eq!(pattern.keywords()[0].short_form(), "*IDN");
        assert!(pattern.matches(&header("*idn?")).is_some());
    }

    #[test]
    fn test_short_and_long_forms_match() {
        let pattern = Pattern::parse("PHY#:CAPabilities?").unwrap();
        assert_eq!(pattern.matches(&header("PHY:CAP?")), Some(vec![0]));
        assert_eq!(pattern.matches(&header("phy2:capabilities?")), Some(vec![2]));
        assert_eq!(pattern.matches(&header(":PHY1:Cap?")), Some(vec![1]));
        assert_eq!(pattern.matches(&header("PHY:CAPA?")), None);
        assert_eq!(pattern.matches(&header("PHY:CAP")), None);
    }

    #[test]
    fn test_suffix_only_on_slots() {
        let pattern = Pattern::parse("SETtings:CHANnel").unwrap();
        assert_eq!(pattern.matches(&header("SET:CHAN")), Some(vec![]));
        assert_eq!(pattern.matches(&header("SET:CHAN2")), None);
    }

    #[test]
    fn test_two_suffix_slots() {
        let pattern = Pattern::parse("PHY#:CHANnel#?").unwrap();
        assert_eq!(pattern.matches(&header("PHY1:CHAN2?")), Some(vec![1, 2]));
        assert_eq!(pattern.matches(&header("PHY:CHANNEL?")), Some(vec![0, 0]));
        assert_eq!(pattern.matches(&header("PHY:CHANL?")), None);
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(Pattern::parse("PHY::CAP?").is_err());
        assert!(Pattern::parse("phy?").is_err());
        assert!(Pattern::parse("PHY1?").is_err());
        assert!(Pattern::parse("PHY-X").is_err());
    }

    #[test]
    fn test_invalid_headers() {
        assert_eq!(Header::parse(""), Err(ParseError::Empty));
        assert!(Header::parse("PHY1X?").is_err());
        assert!(Header::parse("PHY:?").is_err());
        assert!(Header::parse("12?").is_err());
        assert!(Header::parse("PHY99999999999?").is_err());
    }
}
