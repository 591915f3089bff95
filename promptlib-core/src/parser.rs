//! Placeholder syntax parser for the variable-fill feature.
//!
//! Grammar: `{{name}}` is a variable, `{{snippet:name}}` splices another
//! prompt's content by name, and `{{{{text}}}}` escapes literal braces.

use crate::template::{PromptTemplate, TemplatePart};
use nom::IResult;
use nom::Parser;
use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while_m_n};
use nom::combinator::{all_consuming, map, rest, verify};
use nom::multi::many0;
use nom::sequence::delimited;

pub fn parse_template(input: &str) -> IResult<&str, PromptTemplate> {
    all_consuming(map(many0(parse_element), |parts| PromptTemplate { parts })).parse(input)
}

pub fn parse_element(input: &str) -> IResult<&str, TemplatePart> {
    alt((
        map(parse_escaped_literal, |text| {
            TemplatePart::Literal(text.to_string())
        }),
        map(parse_snippet_ref, |name| {
            TemplatePart::SnippetRef(name.to_string())
        }),
        map(parse_variable, |name| {
            TemplatePart::Variable(name.to_string())
        }),
        map(parse_literal_text, |text| {
            TemplatePart::Literal(text.to_string())
        }),
    ))
    .parse(input)
}

pub fn parse_literal_text(input: &str) -> IResult<&str, &str> {
    verify(alt((take_until("{{"), rest)), |s: &&str| !s.is_empty()).parse(input)
}

pub fn parse_variable(input: &str) -> IResult<&str, &str> {
    delimited(tag("{{"), identifier, tag("}}")).parse(input)
}

pub fn parse_snippet_ref(input: &str) -> IResult<&str, &str> {
    delimited(tag("{{snippet:"), identifier, tag("}}")).parse(input)
}

pub fn parse_escaped_literal(input: &str) -> IResult<&str, &str> {
    delimited(tag("{{{{"), take_until("}}}}"), tag("}}}}")).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    // 1-64 characters, alphanumeric plus dash and underscore
    take_while_m_n(1, 64, |c: char| c.is_alphanumeric() || c == '-' || c == '_').parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let result = parse_literal_text("");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_literal_text() {
        let result = parse_literal_text("Hello!");
        assert_eq!(result, Ok(("", "Hello!")));
    }

    #[test]
    fn test_parse_variable() {
        let result = parse_variable("{{topic}} is the subject");
        assert_eq!(result, Ok((" is the subject", "topic")));
    }

    #[test]
    fn test_parse_snippet_ref() {
        let result = parse_snippet_ref("{{snippet:greeting}} and more");
        assert_eq!(result, Ok((" and more", "greeting")));
    }

    #[test]
    fn test_parse_consecutive_placeholders() {
        let (remaining, template) = parse_template("{{a}}{{b}}{{snippet:c}}").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(template.parts.len(), 3);
    }

    #[test]
    fn test_parse_placeholders_at_boundaries() {
        let (remaining, template) = parse_template("{{start}}middle{{end}}").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(template.parts.len(), 3);
    }

    #[test]
    fn test_parse_incomplete_placeholders() {
        assert!(parse_template("Hello {{name").is_err());
        assert!(parse_template("{{snippet:test").is_err());
        assert!(parse_template("{{{{hello").is_err());
    }

    #[test]
    fn test_parse_no_whitespace_in_identifiers() {
        assert!(parse_variable("{{ name }}").is_err());
        assert!(parse_snippet_ref("{{snippet: test }}").is_err());
    }

    #[test]
    fn test_parse_plain_braces_are_literal() {
        let result = parse_template("Hello {name} with single braces");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_invalid_identifier() {
        assert!(parse_variable("{{to/pic}}").is_err());
        assert!(parse_template("Hello {{n@me}}!").is_err());
    }

    #[test]
    fn test_parse_empty_identifier() {
        assert!(parse_variable("{{}}").is_err());
        assert!(parse_snippet_ref("{{snippet:}}").is_err());
    }

    #[test]
    fn test_parse_escaped_literal() {
        let result = parse_escaped_literal("{{{{he{llo wo}rld}}}} more text");
        assert_eq!(result, Ok((" more text", "he{llo wo}rld")));
    }

    #[test]
    fn test_parse_element_variants() {
        assert_eq!(
            parse_element("{{username}}"),
            Ok(("", TemplatePart::Variable(String::from("username"))))
        );
        assert_eq!(
            parse_element("{{snippet:username}}"),
            Ok(("", TemplatePart::SnippetRef(String::from("username"))))
        );
        assert_eq!(
            parse_element("username"),
            Ok(("", TemplatePart::Literal(String::from("username"))))
        );
        assert_eq!(
            parse_element("{{{{hello{{x}}bye}}}}"),
            Ok(("", TemplatePart::Literal(String::from("hello{{x}}bye"))))
        );
    }

    #[test]
    fn test_parse_mixed_template() {
        let (remaining, template) =
            parse_template("Hello {{name}}, see {{snippet:greeting}}!").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(template.parts.len(), 5);
    }

    #[test]
    fn test_parse_template_with_escaped_literals() {
        let (remaining, template) =
            parse_template("{{{{name}}}} is literal, {{real_name}} is not").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(template.parts.len(), 4);
        assert!(matches!(template.parts[0], TemplatePart::Literal(_)));
        assert!(matches!(template.parts[2], TemplatePart::Variable(_)));
    }

    #[test]
    fn test_identifier_length_bounds() {
        for length in [1, 2, 63, 64] {
            let id = "a".repeat(length);
            let input = format!("{{{{{}}}}}", id);
            assert!(
                parse_variable(&input).is_ok(),
                "{length} character identifier should work"
            );
        }
        for length in [65, 100] {
            let id = "a".repeat(length);
            let input = format!("{{{{{}}}}}", id);
            assert!(
                parse_variable(&input).is_err(),
                "{length} character identifier should fail"
            );
        }
    }
}
