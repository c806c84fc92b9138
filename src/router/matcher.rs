//! Route patterns and path matching.
//!
//! A pattern is split on `/` into literal segments and `:name` parameter
//! segments. Matching is purely segment-wise: same segment count, literals
//! compared byte-for-byte, parameters capture the path segment verbatim.
//! Nothing is normalized, so trailing slashes and empty segments count.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn parse(raw: &str) -> Pattern {
        let segments = raw
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(segment.to_string()),
            })
            .collect();
        Pattern {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when at least one segment is a `:name` parameter.
    pub fn is_dynamic(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Param(_)))
    }

    /// Matches `path` against the pattern, returning the captured parameters.
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
                Segment::Literal(literal) if literal != part => return None,
                Segment::Literal(_) => {}
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_and_param_segments() {
        let pattern = Pattern::parse("/streamers/:id");
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal(String::new()),
                Segment::Literal("streamers".to_string()),
                Segment::Param("id".to_string()),
            ]
        );
        assert!(pattern.is_dynamic());
        assert!(!Pattern::parse("/streamers").is_dynamic());
    }

    #[test]
    fn captures_segments_verbatim() {
        let pattern = Pattern::parse("/streamers/:id");
        let params = pattern.matches("/streamers/42").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));

        let params = pattern.matches("/streamers/a%20b").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("a%20b"));
    }

    #[test]
    fn multiple_params() {
        let pattern = Pattern::parse("/viewers/:id/follows/:streamer");
        let params = pattern.matches("/viewers/101/follows/xqc").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["id"], "101");
        assert_eq!(params["streamer"], "xqc");
    }

    #[test]
    fn segment_count_must_agree() {
        let pattern = Pattern::parse("/streamers/:id");
        assert!(pattern.matches("/streamers").is_none());
        assert!(pattern.matches("/streamers/1/extra").is_none());
    }

    #[test]
    fn literals_compare_exactly() {
        let pattern = Pattern::parse("/streamers/:id");
        assert!(pattern.matches("/Streamers/1").is_none());
        assert!(pattern.matches("/viewers/1").is_none());
    }

    #[test]
    fn trailing_slash_is_significant() {
        let pattern = Pattern::parse("/streamers/:id");
        assert!(pattern.matches("/streamers/1/").is_none());

        let with_slash = Pattern::parse("/streamers/:id/");
        assert!(with_slash.matches("/streamers/1/").is_some());
    }

    #[test]
    fn empty_segments_are_preserved() {
        let pattern = Pattern::parse("/streamers/:id");
        // "//1" splits into ["", "", "1"]: the literal "streamers" cannot match ""
        assert!(pattern.matches("//1").is_none());

        let params = pattern.matches("/streamers/").unwrap();
        assert_eq!(params["id"], "");

        let double = Pattern::parse("/a//:b");
        assert!(double.matches("/a//x").is_some());
        assert!(double.matches("/a/x").is_none());
    }
}
