//! Group-by expression parser
//!
//! Group-by clauses are entered as `name(argument)`, for example `time(1m)`,
//! `tag(host)` or `fill(null)`. The argument may be empty and may contain
//! anything up to the final closing parenthesis.

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{map, rest, verify},
    sequence::terminated,
    IResult, Parser,
};

use crate::error::{Error, Result};

/// Parsed `name(argument)` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupByExpr {
    /// Function name
    pub name: String,
    /// Raw argument text between the parentheses
    pub arg: String,
}

impl GroupByExpr {
    /// Argument as a parameter list
    ///
    /// An empty argument yields `None` so the part takes its definition defaults.
    pub fn params(&self) -> Option<Vec<String>> {
        if self.arg.is_empty() {
            None
        } else {
            Some(vec![self.arg.clone()])
        }
    }
}

/// Parse a group-by expression
pub fn parse_group_by(input: &str) -> Result<GroupByExpr> {
    match parse_expr(input) {
        Ok((_, (name, arg))) => Ok(GroupByExpr {
            name: name.to_string(),
            arg: arg.to_string(),
        }),
        Err(_) => Err(Error::Parse(format!(
            "'{}' is not a group-by expression, expecting name(argument)",
            input
        ))),
    }
}

fn parse_expr(input: &str) -> IResult<&str, (&str, &str)> {
    (terminated(identifier, char('(')), argument).parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_').parse(input)
}

/// Everything up to the final `)`, on a single line
fn argument(input: &str) -> IResult<&str, &str> {
    map(
        verify(rest, |s: &str| s.ends_with(')') && !s.contains(['\n', '\r'])),
        strip_close,
    )
    .parse(input)
}

fn strip_close(s: &str) -> &str {
    &s[..s.len() - 1]
}
