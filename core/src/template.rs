//! URI template expansion (RFC 6570, level 3 plus explode).
//!
//! # Design
//! Expansion is a pure string function so the traversal can swap in another
//! implementation through [`TemplateExpander`]. Variables carry lists of
//! values because template parameters on a traversal are additive; a single
//! value behaves as a scalar and an empty list as an undefined variable.

use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Template parameters by variable name.
pub type TemplateParams = BTreeMap<String, Vec<String>>;

/// Everything except ALPHA / DIGIT / "-" / "." / "_" / "~".
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Unreserved plus the RFC 3986 reserved characters.
const UNRESERVED_AND_RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b'%');

/// Expands a URL pattern with template parameters.
pub trait TemplateExpander {
    fn expand(&self, pattern: &str, params: &TemplateParams) -> String;
}

/// The default RFC 6570 expander.
#[derive(Debug, Clone, Copy, Default)]
pub struct UriTemplate;

impl TemplateExpander for UriTemplate {
    fn expand(&self, pattern: &str, params: &TemplateParams) -> String {
        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    expand_expression(&after[..close], params, &mut out);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Per-operator expansion rules, RFC 6570 appendix A.
struct Operator {
    first: &'static str,
    separator: &'static str,
    named: bool,
    if_empty: &'static str,
    allow: &'static AsciiSet,
}

impl Operator {
    fn split(expression: &str) -> (Operator, &str) {
        let simple = Operator {
            first: "",
            separator: ",",
            named: false,
            if_empty: "",
            allow: UNRESERVED,
        };
        let Some(op) = expression.chars().next() else {
            return (simple, expression);
        };
        let operator = match op {
            '+' => Operator {
                allow: UNRESERVED_AND_RESERVED,
                ..simple
            },
            '#' => Operator {
                first: "#",
                allow: UNRESERVED_AND_RESERVED,
                ..simple
            },
            '.' => Operator {
                first: ".",
                separator: ".",
                ..simple
            },
            '/' => Operator {
                first: "/",
                separator: "/",
                ..simple
            },
            ';' => Operator {
                first: ";",
                separator: ";",
                named: true,
                ..simple
            },
            '?' => Operator {
                first: "?",
                separator: "&",
                named: true,
                if_empty: "=",
                ..simple
            },
            '&' => Operator {
                first: "&",
                separator: "&",
                named: true,
                if_empty: "=",
                ..simple
            },
            _ => return (simple, expression),
        };
        (operator, &expression[op.len_utf8()..])
    }

    fn encode(&self, value: &str) -> String {
        utf8_percent_encode(value, self.allow).to_string()
    }
}

struct VarSpec<'a> {
    name: &'a str,
    explode: bool,
    prefix: Option<usize>,
}

impl<'a> VarSpec<'a> {
    fn parse(spec: &'a str) -> Self {
        if let Some(name) = spec.strip_suffix('*') {
            return VarSpec {
                name,
                explode: true,
                prefix: None,
            };
        }
        match spec.split_once(':') {
            Some((name, max)) => VarSpec {
                name,
                explode: false,
                prefix: max.parse().ok(),
            },
            None => VarSpec {
                name: spec,
                explode: false,
                prefix: None,
            },
        }
    }
}

fn expand_expression(expression: &str, params: &TemplateParams, out: &mut String) {
    let (operator, variables) = Operator::split(expression);
    let mut first = true;

    for spec in variables.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let var = VarSpec::parse(spec);
        let values = match params.get(var.name) {
            Some(values) if !values.is_empty() => values,
            _ => continue,
        };

        out.push_str(if first { operator.first } else { operator.separator });
        first = false;

        if values.len() == 1 {
            let value = match var.prefix {
                Some(max) => values[0].chars().take(max).collect::<String>(),
                None => values[0].clone(),
            };
            push_named(&operator, var.name, &value, out);
        } else if var.explode {
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push_str(operator.separator);
                }
                push_named(&operator, var.name, value, out);
            }
        } else {
            if operator.named {
                out.push_str(var.name);
                out.push('=');
            }
            let joined: Vec<String> = values.iter().map(|v| operator.encode(v)).collect();
            out.push_str(&joined.join(","));
        }
    }
}

fn push_named(operator: &Operator, name: &str, value: &str, out: &mut String) {
    if operator.named {
        out.push_str(name);
        if value.is_empty() {
            out.push_str(operator.if_empty);
            return;
        }
        out.push('=');
    }
    out.push_str(&operator.encode(value));
}
