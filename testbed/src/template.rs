//! Route templates: `/users/:user/comments/:id` compiled into concrete
//! paths.
//!
//! ```
//! use testbed::params::ParamBag;
//! use testbed::template::RouteTemplate;
//!
//! let template = RouteTemplate::parse("/users/:user/comments/:id?").unwrap();
//!
//! let mut params = ParamBag::new();
//! params.insert("user".into(), "7".into());
//! assert_eq!(template.render(&params).unwrap(), "/users/7/comments");
//!
//! params.insert("id".into(), "a b".into());
//! assert_eq!(template.render(&params).unwrap(), "/users/7/comments/a%20b");
//! ```

use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::params::ParamBag;

/// Characters escaped in parameter values; everything except the
/// unreserved set of `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("expected a parameter name after ':' at offset {offset} in `{template}`")]
    MissingParameterName { template: String, offset: usize },
    #[error("missing value for route parameter `{name}` in `{template}`")]
    MissingParameter { template: String, name: String },
    #[error("no `{purpose}` template: the resource has neither a name nor an explicit `{purpose}` path")]
    Unresolved { purpose: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Param {
        name: String,
        prefix: Option<char>,
        optional: bool,
    },
}

/// A parsed route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate {
    source: String,
    tokens: Vec<Token>,
}

impl RouteTemplate {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            if c != ':' {
                literal.push(c);
                continue;
            }

            let mut name = String::new();
            while let Some(&(_, n)) = chars.peek() {
                if n.is_ascii_alphanumeric() || n == '_' {
                    name.push(n);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                return Err(TemplateError::MissingParameterName {
                    template: source.to_string(),
                    offset,
                });
            }

            let optional = chars.next_if(|&(_, n)| n == '?').is_some();

            // A leading '/' belongs to the parameter so an absent optional
            // parameter leaves no empty segment behind.
            let prefix = if literal.ends_with('/') {
                literal.pop();
                Some('/')
            } else {
                None
            };
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(Token::Param {
                name,
                prefix,
                optional,
            });
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            tokens,
        })
    }

    /// Parses `template` under `/{version}` when a version is given.
    pub fn prefixed(version: Option<&str>, template: &str) -> Result<Self, TemplateError> {
        match version {
            Some(version) => Self::parse(&format!("/{version}{template}")),
            None => Self::parse(template),
        }
    }

    /// Builds a concrete path. Parameters not named by the template are
    /// ignored; a missing or empty required parameter is an error.
    pub fn render(&self, params: &ParamBag) -> Result<String, TemplateError> {
        let mut path = String::with_capacity(self.source.len());

        for token in &self.tokens {
            match token {
                Token::Literal(text) => path.push_str(text),
                Token::Param {
                    name,
                    prefix,
                    optional,
                } => match params.get(name).filter(|v| !v.is_empty()) {
                    Some(value) => {
                        if let Some(prefix) = prefix {
                            path.push(*prefix);
                        }
                        path.extend(utf8_percent_encode(value, COMPONENT));
                    }
                    None if *optional => {}
                    None => {
                        return Err(TemplateError::MissingParameter {
                            template: self.source.clone(),
                            name: name.clone(),
                        });
                    }
                },
            }
        }

        Ok(path)
    }

    /// Names of the parameters in template order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Param { name, .. } => Some(name.as_str()),
            Token::Literal(_) => None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for RouteTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
