//! Filter expressions over flows
//!
//! A filter is a small boolean language compiled into a [`Filter`]:
//!
//! | expression   | matches                                          |
//! |--------------|--------------------------------------------------|
//! | `~all`       | every flow                                       |
//! | `~q`         | requests that have no response yet               |
//! | `~s`         | flows with a response                            |
//! | `~e`         | flows with an error                              |
//! | `~marked`    | marked flows                                     |
//! | `~m regex`   | request method                                   |
//! | `~u regex`   | request url                                      |
//! | `~d regex`   | request host                                     |
//! | `~c code`    | response status code                             |
//! | `~h regex`   | any header line (`~hq` request, `~hs` response)  |
//! | `~b regex`   | body text (`~bq` request, `~bs` response)        |
//! | `~t regex`   | content type (`~tq` request, `~ts` response)     |
//! | `word`       | shorthand for `~u word`                          |
//!
//! Expressions combine with `!`, `&` (or plain whitespace) and `|`, in that
//! order of precedence, and group with parentheses. Arguments may be quoted
//! with `"` or `'`. Regexes are case-insensitive.
//!
//! ```
//! use flowview::{Filter, Flow, Matcher, Request};
//!
//! let filter = Filter::parse("~m get & !~u \\.png$").unwrap();
//! let flow = Flow::new(Request::builder().uri("http://example.com/").body(()).unwrap().into());
//! assert!(filter.matches(&flow));
//! ```
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http::HeaderMap;
use nom::{
  branch::alt,
  bytes::complete::take_while1,
  character::complete::{char, multispace0, multispace1},
  combinator::{cut, map, value},
  error::{Error as NomError, ErrorKind},
  multi::fold_many0,
  sequence::{delimited, preceded, terminated},
  IResult, Parser,
};
use regex::{Regex, RegexBuilder};

use crate::errors::{invalid_filter, Error, Result};
use crate::{Flow, Request, Response};

/// A predicate over flows.
///
/// The view only ever asks whether a flow matches; it never looks inside a
/// matcher. Any `Fn(&Flow) -> bool` closure is a matcher.
pub trait Matcher: Send + Sync {
  /// Whether `flow` belongs to the set this matcher describes.
  fn matches(&self, flow: &Flow) -> bool;
}

impl<F> Matcher for F
where
  F: Fn(&Flow) -> bool + Send + Sync,
{
  fn matches(&self, flow: &Flow) -> bool {
    self(flow)
  }
}

/// A compiled filter expression.
#[derive(Clone)]
pub struct Filter {
  expr: String,
  root: Arc<Node>,
}

impl Filter {
  /// Compile `expr`.
  ///
  /// Fails with `Error::InvalidFilter` on syntax errors, unknown operators,
  /// missing arguments, bad regexes and bad status codes.
  pub fn parse(expr: &str) -> Result<Filter> {
    let ast = parse_expression(expr)?;
    let root = Node::compile(expr, ast)?;
    tracing::trace!("compiled filter {:?}", expr);
    Ok(Filter {
      expr: expr.to_string(),
      root: Arc::new(root),
    })
  }
  /// The source expression.
  pub fn expression(&self) -> &str {
    &self.expr
  }
}

impl Matcher for Filter {
  fn matches(&self, flow: &Flow) -> bool {
    self.root.matches(flow)
  }
}

impl FromStr for Filter {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Filter::parse(s)
  }
}

impl fmt::Debug for Filter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("Filter").field(&self.expr).finish()
  }
}

impl fmt::Display for Filter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.expr)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
  All,
  Pending,
  Answered,
  Failed,
  Marked,
  Method,
  Url,
  Domain,
  Code,
  Header(Side),
  Body(Side),
  ContentType(Side),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
  Either,
  Request,
  Response,
}

impl Op {
  fn from_name(name: &str) -> Option<Op> {
    let op = match name {
      "all" => Op::All,
      "q" => Op::Pending,
      "s" => Op::Answered,
      "e" => Op::Failed,
      "marked" => Op::Marked,
      "m" => Op::Method,
      "u" => Op::Url,
      "d" => Op::Domain,
      "c" => Op::Code,
      "h" => Op::Header(Side::Either),
      "hq" => Op::Header(Side::Request),
      "hs" => Op::Header(Side::Response),
      "b" => Op::Body(Side::Either),
      "bq" => Op::Body(Side::Request),
      "bs" => Op::Body(Side::Response),
      "t" => Op::ContentType(Side::Either),
      "tq" => Op::ContentType(Side::Request),
      "ts" => Op::ContentType(Side::Response),
      _ => return None,
    };
    Some(op)
  }

  fn takes_arg(&self) -> bool {
    !matches!(
      self,
      Op::All | Op::Pending | Op::Answered | Op::Failed | Op::Marked
    )
  }
}

#[derive(Clone, Debug, PartialEq)]
enum Expr {
  Op(Op, Option<String>),
  Not(Box<Expr>),
  And(Vec<Expr>),
  Or(Vec<Expr>),
}

fn parse_expression(input: &str) -> Result<Expr> {
  match delimited(multispace0, expression, multispace0).parse(input) {
    Ok((remaining, expr)) => {
      if remaining.is_empty() {
        Ok(expr)
      } else {
        Err(invalid_filter(
          input,
          format!("unexpected input: {:?}", remaining),
        ))
      }
    }
    Err(e) => Err(invalid_filter(input, format!("parse error: {:?}", e))),
  }
}

fn expression(input: &str) -> IResult<&str, Expr> {
  or_expression(input)
}

fn or_expression(input: &str) -> IResult<&str, Expr> {
  let (input, first) = and_expression(input)?;

  fold_many0(
    preceded(
      delimited(multispace0, char('|'), multispace0),
      and_expression,
    ),
    move || first.clone(),
    |acc, next| match acc {
      Expr::Or(mut alternatives) => {
        alternatives.push(next);
        Expr::Or(alternatives)
      }
      _ => Expr::Or(vec![acc, next]),
    },
  )
  .parse(input)
}

fn and_expression(input: &str) -> IResult<&str, Expr> {
  let (input, first) = not_expression(input)?;

  fold_many0(
    preceded(
      alt((
        value((), delimited(multispace0, char('&'), multispace0)),
        value((), multispace1),
      )),
      not_expression,
    ),
    move || first.clone(),
    |acc, next| match acc {
      Expr::And(mut terms) => {
        terms.push(next);
        Expr::And(terms)
      }
      _ => Expr::And(vec![acc, next]),
    },
  )
  .parse(input)
}

fn not_expression(input: &str) -> IResult<&str, Expr> {
  alt((
    map(
      preceded(terminated(char('!'), multispace0), not_expression),
      |expr| Expr::Not(Box::new(expr)),
    ),
    primary_expression,
  ))
  .parse(input)
}

fn primary_expression(input: &str) -> IResult<&str, Expr> {
  alt((parenthesized_expression, operator, url_shorthand)).parse(input)
}

fn parenthesized_expression(input: &str) -> IResult<&str, Expr> {
  delimited(
    char('('),
    preceded(multispace0, expression),
    preceded(multispace0, char(')')),
  )
  .parse(input)
}

fn operator(input: &str) -> IResult<&str, Expr> {
  let (rest, name) =
    preceded(char('~'), take_while1(|c: char| c.is_ascii_alphabetic())).parse(input)?;
  let op = match Op::from_name(name) {
    Some(op) => op,
    None => return Err(nom::Err::Failure(NomError::new(input, ErrorKind::Tag))),
  };
  if !op.takes_arg() {
    return Ok((rest, Expr::Op(op, None)));
  }
  let (rest, arg) = cut(preceded(multispace1, argument)).parse(rest)?;
  Ok((rest, Expr::Op(op, Some(arg))))
}

fn url_shorthand(input: &str) -> IResult<&str, Expr> {
  if input.starts_with(|c: char| c == '~' || c == '!') {
    return Err(nom::Err::Error(NomError::new(input, ErrorKind::Char)));
  }
  map(argument, |arg| Expr::Op(Op::Url, Some(arg))).parse(input)
}

fn argument(input: &str) -> IResult<&str, String> {
  alt((
    quoted_string('"'),
    quoted_string('\''),
    map(take_while1(is_unquoted_char), |s: &str| s.to_string()),
  ))
  .parse(input)
}

// Only the quote character itself is unescaped; other escapes are kept for
// the regex engine.
fn quoted_string(quote: char) -> impl Fn(&str) -> IResult<&str, String> {
  move |input: &str| {
    let (rest, _) = char(quote).parse(input)?;
    let mut result = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, ch)) = chars.next() {
      if ch == quote {
        return Ok((&rest[i + ch.len_utf8()..], result));
      }
      if ch == '\\' {
        match chars.next() {
          Some((_, next)) if next == quote => result.push(next),
          Some((_, next)) => {
            result.push('\\');
            result.push(next);
          }
          None => break,
        }
      } else {
        result.push(ch);
      }
    }
    Err(nom::Err::Failure(NomError::new(input, ErrorKind::Char)))
  }
}

fn is_unquoted_char(c: char) -> bool {
  !(c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\'' | '|' | '&'))
}

enum Node {
  All,
  Pending,
  Answered,
  Failed,
  Marked,
  Method(Regex),
  Url(Regex),
  Domain(Regex),
  Code(u16),
  Header(Side, Regex),
  Body(Side, Regex),
  ContentType(Side, Regex),
  Not(Box<Node>),
  And(Vec<Node>),
  Or(Vec<Node>),
}

impl Node {
  fn compile(source: &str, expr: Expr) -> Result<Node> {
    let node = match expr {
      Expr::Not(inner) => Node::Not(Box::new(Node::compile(source, *inner)?)),
      Expr::And(terms) => Node::And(
        terms
          .into_iter()
          .map(|t| Node::compile(source, t))
          .collect::<Result<_>>()?,
      ),
      Expr::Or(alternatives) => Node::Or(
        alternatives
          .into_iter()
          .map(|t| Node::compile(source, t))
          .collect::<Result<_>>()?,
      ),
      Expr::Op(op, arg) => {
        let arg = arg.unwrap_or_default();
        let regex = || {
          RegexBuilder::new(&arg)
            .case_insensitive(true)
            .build()
            .map_err(|err| invalid_filter(source, err.to_string()))
        };
        match op {
          Op::All => Node::All,
          Op::Pending => Node::Pending,
          Op::Answered => Node::Answered,
          Op::Failed => Node::Failed,
          Op::Marked => Node::Marked,
          Op::Method => Node::Method(regex()?),
          Op::Url => Node::Url(regex()?),
          Op::Domain => Node::Domain(regex()?),
          Op::Code => Node::Code(
            arg
              .parse()
              .map_err(|_| invalid_filter(source, format!("bad status code {:?}", arg)))?,
          ),
          Op::Header(side) => Node::Header(side, regex()?),
          Op::Body(side) => Node::Body(side, regex()?),
          Op::ContentType(side) => Node::ContentType(side, regex()?),
        }
      }
    };
    Ok(node)
  }

  fn matches(&self, flow: &Flow) -> bool {
    match self {
      Node::All => true,
      Node::Pending => flow.response.is_none(),
      Node::Answered => flow.response.is_some(),
      Node::Failed => flow.error.is_some(),
      Node::Marked => flow.marked,
      Node::Method(re) => re.is_match(flow.request.method().as_str()),
      Node::Url(re) => re.is_match(&flow.request.pretty_url()),
      Node::Domain(re) => flow.request.host().is_some_and(|h| re.is_match(h)),
      Node::Code(code) => flow
        .response
        .as_ref()
        .is_some_and(|r| r.status_code().as_u16() == *code),
      Node::Header(side, re) => on_side(
        flow,
        *side,
        |req| headers_match(req.headers(), re),
        |resp| headers_match(resp.headers(), re),
      ),
      Node::Body(side, re) => on_side(
        flow,
        *side,
        |req| req.body().is_some() && re.is_match(&req.text()),
        |resp| resp.body().is_some() && re.is_match(&resp.text()),
      ),
      Node::ContentType(side, re) => on_side(
        flow,
        *side,
        |req| content_type_match(req.headers(), re),
        |resp| content_type_match(resp.headers(), re),
      ),
      Node::Not(inner) => !inner.matches(flow),
      Node::And(terms) => terms.iter().all(|t| t.matches(flow)),
      Node::Or(alternatives) => alternatives.iter().any(|t| t.matches(flow)),
    }
  }
}

fn on_side(
  flow: &Flow,
  side: Side,
  request: impl Fn(&Request) -> bool,
  response: impl Fn(&Response) -> bool,
) -> bool {
  let in_request = || request(&flow.request);
  let in_response = || flow.response.as_ref().is_some_and(&response);
  match side {
    Side::Request => in_request(),
    Side::Response => in_response(),
    Side::Either => in_request() || in_response(),
  }
}

fn headers_match(headers: &HeaderMap, re: &Regex) -> bool {
  headers.iter().any(|(name, value)| {
    re.is_match(&format!(
      "{}: {}",
      name.as_str(),
      String::from_utf8_lossy(value.as_bytes())
    ))
  })
}

fn content_type_match(headers: &HeaderMap, re: &Regex) -> bool {
  headers
    .get(http::header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| re.is_match(v))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn op(op: Op, arg: &str) -> Expr {
    Expr::Op(op, Some(arg.to_string()))
  }

  #[test]
  fn precedence() {
    let expr = parse_expression("~m get | ~q ~u foo").unwrap();
    assert_eq!(
      expr,
      Expr::Or(vec![
        op(Op::Method, "get"),
        Expr::And(vec![Expr::Op(Op::Pending, None), op(Op::Url, "foo")]),
      ])
    );
  }

  #[test]
  fn negation_and_groups() {
    let expr = parse_expression("!(~m get | ~m put) & example").unwrap();
    assert_eq!(
      expr,
      Expr::And(vec![
        Expr::Not(Box::new(Expr::Or(vec![
          op(Op::Method, "get"),
          op(Op::Method, "put"),
        ]))),
        op(Op::Url, "example"),
      ])
    );
  }

  #[test]
  fn quoted_arguments() {
    let expr = parse_expression(r#"~h "x-token: a b" | ~b 'it\'s'"#).unwrap();
    assert_eq!(
      expr,
      Expr::Or(vec![
        op(Op::Header(Side::Either), "x-token: a b"),
        op(Op::Body(Side::Either), "it's"),
      ])
    );
  }

  #[test]
  fn rejected_expressions() {
    for bad in ["~~", "", "~m", "~nope", "(~q", "~q )", "~c abc", "~u [", "\"open"] {
      assert!(
        matches!(Filter::parse(bad), Err(Error::InvalidFilter { .. })),
        "{bad:?} should be rejected"
      );
    }
  }
}
