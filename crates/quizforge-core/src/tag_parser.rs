//! Inline tag scanning, substitution, and validation.
//!
//! Tags have the form `<Name attrs>inner</Name>`. The scan is a single
//! left-to-right pass: each opening tag is paired with the first matching
//! closing tag after it, so nested tags of the same name are not supported.
//!
//! Names are ASCII `[A-Za-z0-9_]+` and are read in full: the opening name
//! must equal the closing name exactly, so `<QParamX>a</QParam>` is plain
//! text rather than a `QParam` span with attributes `X`.

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::ValidationError;
use crate::model::{ParameterMap, QuestionParameter};
use crate::tags::TagRegistry;

static OPEN_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z0-9_]+)([^>]*)>").expect("open tag pattern is valid"));

/// One well-formed tag occurrence in a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpan<'a> {
    /// Tag name, case-sensitive.
    pub name: &'a str,
    /// Raw attribute text between the name and `>` (not interpreted here).
    pub attrs: &'a str,
    /// Content between the opening and closing tag.
    pub inner: &'a str,
    /// Byte range of the whole span, tags included.
    pub range: Range<usize>,
}

/// Find every well-formed tag span in `text`, in order.
pub fn scan_spans(text: &str) -> Vec<TagSpan<'_>> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let Some(caps) = OPEN_TAG.captures_at(text, pos) else {
            break;
        };
        let (Some(open), Some(name), Some(attrs)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            break;
        };

        let close = format!("</{}>", name.as_str());
        match text[open.end()..].find(&close) {
            Some(offset) => {
                let inner_end = open.end() + offset;
                let end = inner_end + close.len();
                spans.push(TagSpan {
                    name: name.as_str(),
                    attrs: attrs.as_str(),
                    inner: &text[open.end()..inner_end],
                    range: open.start()..end,
                });
                pos = end;
            }
            // Unclosed: retry from the next character, like a regex engine would.
            None => pos = open.start() + 1,
        }
    }

    spans
}

/// Resolves tags in question text against a fixed [`TagRegistry`].
#[derive(Debug, Clone)]
pub struct TagParser {
    registry: Arc<TagRegistry>,
}

impl TagParser {
    pub fn new(registry: Arc<TagRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    /// Every well-formed span in `text`, registered or not.
    pub fn spans<'a>(&self, text: &'a str) -> Vec<TagSpan<'a>> {
        scan_spans(text)
    }

    /// Replace every span with its processed value.
    ///
    /// Registered tags are replaced by `processor.process(inner, context)`.
    /// Unregistered tags are replaced by their inner content. Never fails.
    pub fn process_text(&self, text: &str, context: &ParameterMap) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for span in scan_spans(text) {
            out.push_str(&text[last..span.range.start]);
            match self.registry.get(span.name) {
                Some(processor) => out.push_str(&processor.process(span.inner, context)),
                None => {
                    tracing::debug!(tag = span.name, "stripping unregistered tag");
                    out.push_str(span.inner);
                }
            }
            last = span.range.end;
        }

        out.push_str(&text[last..]);
        out
    }

    /// True if any registered processor finds its tag in `text`.
    pub fn is_any_valid_tag_present(&self, text: &str) -> bool {
        self.registry
            .iter()
            .any(|processor| !processor.extract(text).is_empty())
    }

    /// Validate every registered span in `text` against the declared
    /// parameters. Unregistered tags are plain text and are skipped.
    pub fn validate_tags(
        &self,
        text: &str,
        parameters: &[QuestionParameter],
    ) -> Result<(), ValidationError> {
        for span in scan_spans(text) {
            if let Some(processor) = self.registry.get(span.name) {
                processor.validate(span.inner, parameters)?;
            }
        }
        Ok(())
    }
}

impl Default for TagParser {
    fn default() -> Self {
        Self::new(Arc::new(TagRegistry::standard()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParameterType, ParameterValue};

    fn ctx(pairs: &[(&str, ParameterValue)]) -> ParameterMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn param(name: &str, kind: ParameterType) -> QuestionParameter {
        QuestionParameter {
            name: name.into(),
            possible_values: vec![],
            kind,
        }
    }

    #[test]
    fn scan_finds_spans_with_attributes() {
        let text = r#"a <QParam name="x">x</QParam> b <NumExpr>1+2</NumExpr>"#;
        let spans = scan_spans(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "QParam");
        assert_eq!(spans[0].attrs, r#" name="x""#);
        assert_eq!(spans[0].inner, "x");
        assert_eq!(&text[spans[0].range.clone()], r#"<QParam name="x">x</QParam>"#);
        assert_eq!(spans[1].inner, "1+2");
    }

    #[test]
    fn scan_is_non_greedy_and_multiline() {
        let spans = scan_spans("<b>one</b> and <b>two\nlines</b>");
        let inner: Vec<&str> = spans.iter().map(|s| s.inner).collect();
        assert_eq!(inner, vec!["one", "two\nlines"]);
    }

    #[test]
    fn scan_skips_unclosed_and_mismatched() {
        assert!(scan_spans("<a>never closed").is_empty());
        assert!(scan_spans("<A>case</a>").is_empty());
        let spans = scan_spans("<a <b>x</b>");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].name, "b");
    }

    #[test]
    fn name_is_not_shortened_to_fit_a_close_tag() {
        assert!(scan_spans("<QParamX>a</QParam>").is_empty());
        assert!(scan_spans("<Ñame>a</Ñame>").is_empty());
        let spans = scan_spans("<QParamX>a</QParamX>");
        assert_eq!(spans[0].name, "QParamX");
    }

    #[test]
    fn nested_same_name_pairs_with_first_close() {
        let spans = scan_spans("<b>x<b>y</b>z</b>");
        assert_eq!(spans[0].inner, "x<b>y");
    }

    #[test]
    fn qparam_round_trip_substitution() {
        let parser = TagParser::default();
        let context = ctx(&[("animal", ParameterValue::from("Dog"))]);
        let out = parser.process_text("Pick the <QParam>animal</QParam>!", &context);
        assert_eq!(out, "Pick the Dog!");
        assert!(!out.contains("<QParam>"));
    }

    #[test]
    fn unknown_tag_is_stripped() {
        let parser = TagParser::default();
        assert_eq!(parser.process_text("<Foo>bar</Foo>", &ParameterMap::new()), "bar");
    }

    #[test]
    fn processing_is_idempotent_once_tags_are_gone() {
        let parser = TagParser::default();
        let context = ctx(&[("a", ParameterValue::Number(2.0))]);
        let once = parser.process_text("x <Foo>y</Foo> <NumExpr>a*3</NumExpr>", &context);
        let twice = parser.process_text(&once, &context);
        assert_eq!(once, "x y 6");
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_parameter_is_fail_soft() {
        let parser = TagParser::default();
        let out = parser.process_text(
            "<QParam>name</QParam> has <NumExpr>a + 1</NumExpr>",
            &ParameterMap::new(),
        );
        assert_eq!(out, "name has a + 1");
    }

    #[test]
    fn deeply_nested_expression_is_left_as_written() {
        let parser = TagParser::default();
        let inner = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        let text = format!("<NumExpr>{inner}</NumExpr> and <NumExprTex>{inner}</NumExprTex>");
        let out = parser.process_text(&text, &ParameterMap::new());
        assert_eq!(out, format!("{inner} and {inner}"));

        assert!(matches!(
            parser.validate_tags(&text, &[]),
            Err(ValidationError::MalformedExpression { .. })
        ));
    }

    #[test]
    fn detects_registered_tags_only() {
        let parser = TagParser::default();
        assert!(parser.is_any_valid_tag_present("<QParam>x</QParam>"));
        assert!(parser.is_any_valid_tag_present("<NumExprTex>a^2</NumExprTex>"));
        assert!(!parser.is_any_valid_tag_present("<Foo>x</Foo>"));
        assert!(!parser.is_any_valid_tag_present("plain text"));
    }

    #[test]
    fn validate_tags_checks_registered_spans() {
        let parser = TagParser::default();
        let params = vec![
            param("a", ParameterType::Number),
            param("name", ParameterType::String),
        ];
        assert!(parser
            .validate_tags("<QParam>name</QParam> <NumExpr>a*2</NumExpr> <Foo>zzz</Foo>", &params)
            .is_ok());
        assert_eq!(
            parser.validate_tags("<QParam>missing</QParam>", &params),
            Err(ValidationError::UnknownParameter("missing".into()))
        );
        assert!(matches!(
            parser.validate_tags("<NumExpr>name + 1</NumExpr>", &params),
            Err(ValidationError::NonNumericParameter { .. })
        ));
    }
}
