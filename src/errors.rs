//! Error types.
//!
//! Errors fall in two families, both fatal.
//!
//! - configuration errors: broken parameter, header, template, constraint or
//!   rule files, corpus lines with the wrong number of columns...
//! - integrity errors: [`ErrorKind::GroupOverrun`][overrun] and
//!   [`ErrorKind::RepeatedBestRule`][repeat], raised when the learner's
//!   bookkeeping is inconsistent.
//!
//! Misses (word not in the vocabulary, index entry absent, constraint with no
//! opinion) are never errors, they go through `Option`s and `bool`s.
//!
//! [overrun]: enum.ErrorKind.html#variant.GroupOverrun
//! (GroupOverrun variant of the ErrorKind enum)
//! [repeat]: enum.ErrorKind.html#variant.RepeatedBestRule
//! (RepeatedBestRule variant of the ErrorKind enum)

use crate::common::*;

/// Parse error data.
#[derive(Debug)]
pub struct ParseErrorData {
    /// Error message.
    pub msg: String,
    /// Portion of the line *before* the error token.
    pub pref: String,
    /// Token that caused the error.
    pub token: String,
    /// Portion of the line *after* the error token.
    pub suff: String,
    /// Line of the error, if known.
    pub line: Option<usize>,
}
impl ParseErrorData {
    /// Builds the data for a token appearing in some line.
    ///
    /// If `token` does not appear in `text`, the whole line is the prefix.
    pub fn new<S: Into<String>>(msg: S, text: &str, token: &str, line: Option<usize>) -> Self {
        let (pref, token, suff) = match text.find(token) {
            Some(start) if !token.is_empty() => (
                text[..start].to_string(),
                token.to_string(),
                text[start + token.len()..].to_string(),
            ),
            _ => (text.to_string(), String::new(), String::new()),
        };
        ParseErrorData {
            msg: msg.into(),
            pref,
            token,
            suff,
            line,
        }
    }
}
impl_fmt! {
    ParseErrorData(self, fmt) {
        let line_str = if let Some(line) = self.line {
            format!("{} ", line)
        } else {
            "".into()
        };
        write!(fmt, "{}", self.msg)?;
        if let Some(line) = self.line {
            writeln!(
                fmt,
                " at [{}]:",
                colors.emph(&format!("{}:{}", line, self.pref.len() + 1))
            )?
        } else {
            writeln!(fmt, ":")?
        }
        writeln!(fmt, "{0: ^1$}|", "", line_str.len())?;
        writeln!(
            fmt,
            "{}| {}{}{}",
            &line_str,
            colors.emph(&self.pref),
            colors.bad(&self.token),
            colors.emph(&self.suff)
        )?;
        writeln!(
            fmt,
            "{0: ^1$}| {0: ^2$}{3}",
            "",
            line_str.len(),
            self.pref.len(),
            colors.bad(&format!("{0:^>1$}", "", self.token.len()))
        )
    }
}

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Res;
    }

    foreign_links {
        Io(::std::io::Error) #[doc = "IO error."];
    }

    errors {
        #[doc = "Parse error."]
        ParseError(data: ParseErrorData) {
            description("parse error")
            display("{}", data)
        }
        #[doc = "A template or constraint mentions a feature absent from the header."]
        UnknownFeature(name: String) {
            description("unknown feature")
            display("feature `{}` is not declared in the file template", name)
        }
        #[doc = "Unrecognized template syntax."]
        TemplateSyntax(template: String) {
            description("illegal template")
            display("cannot make sense of template `{}`", template)
        }
        #[doc = "A rule refers to a template that was never registered."]
        UnknownTemplate(name: String) {
            description("unknown template")
            display("`{}` does not match any registered template", name)
        }
        #[doc = "Undefined variable in a template or parameter file."]
        UndefinedVariable(name: String) {
            description("undefined variable")
            display("variable `{}` is not defined", name)
        }
        #[doc = "Corpus line with the wrong number of columns."]
        ColumnCount(line: usize, expected: usize, got: usize) {
            description("wrong column count")
            display(
                "line {} has {} column(s), expected {}", line, got, expected
            )
        }
        #[doc = "Feature domain overflow."]
        TooManyFeatures(count: usize) {
            description("too many features")
            display(
                "the file template declares {} features, at most {} are supported",
                count, crate::common::consts::max_features
            )
        }
        #[doc = "Grouped rule iteration went past the end of its group."]
        GroupOverrun {
            description("grouped rule iteration overrun")
            display("[bug] iterated past the last rule of a predicate group")
        }
        #[doc = "The same best rule came back too many times in a row."]
        RepeatedBestRule(rule: String) {
            description("repeated best rule")
            display(
                "[bug] rule `{}` was selected repeatedly, scores are inconsistent",
                rule
            )
        }
        #[doc = "Incremental and from-scratch scores disagree."]
        ScoreMismatch(rule: String, incr: (i64, i64), scratch: (i64, i64)) {
            description("score mismatch")
            display(
                "[bug] rule `{}` has good/bad {}/{} but rescanning gives {}/{}",
                rule, incr.0, incr.1, scratch.0, scratch.1
            )
        }
    }
}

impl Error {
    /// True if the error signals a bug rather than bad input.
    pub fn is_integrity(&self) -> bool {
        match *self.kind() {
            ErrorKind::GroupOverrun
            | ErrorKind::RepeatedBestRule(_)
            | ErrorKind::ScoreMismatch(_, _, _) => true,
            _ => false,
        }
    }

    /// True if the error is a parse error.
    pub fn is_parse_error(&self) -> bool {
        match *self.kind() {
            ErrorKind::ParseError(_) => true,
            _ => false,
        }
    }
}

/// Builds a parse error.
pub fn parse_error<S: Into<String>>(msg: S, text: &str, token: &str, line: Option<usize>) -> Error {
    ErrorKind::ParseError(ParseErrorData::new(msg, text, token, line)).into()
}

/// Prints an error.
pub fn print_err(errs: &Error) {
    println!("({} \"", colors.bad("error"));
    for err in errs.iter() {
        for line in format!("{}", err).lines() {
            println!("  {}", line)
        }
    }
    println!("\")")
}
