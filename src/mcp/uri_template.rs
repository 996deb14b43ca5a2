//! RFC 6570 URI templates for resource routing.
//!
//! Supports levels 1–3 of the RFC plus the explode (`*`) and prefix (`:N`)
//! modifiers:
//!
//! | Operator | Example       | Expansion of `x = "a b"` |
//! |----------|---------------|--------------------------|
//! | (none)   | `{x}`         | `a%20b`                  |
//! | `+`      | `{+x}`        | `a%20b` (reserved kept)  |
//! | `#`      | `{#x}`        | `#a%20b`                 |
//! | `.`      | `{.x}`        | `.a%20b`                 |
//! | `/`      | `{/x}`        | `/a%20b`                 |
//! | `?`      | `{?x}`        | `?x=a%20b`               |
//! | `&`      | `{&x}`        | `&x=a%20b`               |
//!
//! A template is parsed and its matcher compiled once; the resulting
//! [`UriTemplate`] is immutable and cheap to share.
//!
//! # Limits
//!
//! Templates longer than [`MAX_TEMPLATE_LENGTH`] characters or with more
//! than [`MAX_TEMPLATE_EXPRESSIONS`] expressions are rejected at
//! construction. Matching uses the `regex` crate, whose automata run in
//! time linear in the input, and every capture is anchored.

use std::fmt::Write as _;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::InvalidArgument;

/// Maximum template length in characters.
pub const MAX_TEMPLATE_LENGTH: usize = 1_000_000;

/// Maximum number of `{...}` expressions in one template.
pub const MAX_TEMPLATE_EXPRESSIONS: usize = 10_000;

/// Maximum length of a single variable value during expansion.
pub const MAX_VARIABLE_LENGTH: usize = 1_000_000;

/// Compiled regex size budget for small templates.
const MIN_REGEX_SIZE: usize = 10 * (1 << 20);

/// Compiled regex size budget per captured variable. A Unicode capture class
/// costs a few KiB once compiled.
const REGEX_SIZE_PER_VARIABLE: usize = 16 * (1 << 10);

/// Upper bound on the matcher budget, reached at
/// [`MAX_TEMPLATE_EXPRESSIONS`] single-variable expressions.
const MAX_REGEX_SIZE: usize = MAX_TEMPLATE_EXPRESSIONS * REGEX_SIZE_PER_VARIABLE;

/// Value bound to a template variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateValue {
    /// A single string.
    String(String),
    /// A list of strings.
    List(Vec<String>),
}

impl TemplateValue {
    /// Returns the value as a string, joining lists with commas.
    #[must_use]
    pub fn to_joined(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::List(items) => items.join(","),
        }
    }

    /// Converts the value to JSON.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => items.clone().into(),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<String>> for TemplateValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for TemplateValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

/// Variables in template-declared order.
pub type Variables = IndexMap<String, TemplateValue>;

/// Expression operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `{var}`
    Simple,
    /// `{+var}`
    Reserved,
    /// `{#var}`
    Fragment,
    /// `{.var}`
    Label,
    /// `{/var}`
    Path,
    /// `{?var}`
    Query,
    /// `{&var}`
    QueryContinuation,
}

impl Operator {
    const fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Reserved),
            '#' => Some(Self::Fragment),
            '.' => Some(Self::Label),
            '/' => Some(Self::Path),
            '?' => Some(Self::Query),
            '&' => Some(Self::QueryContinuation),
            _ => None,
        }
    }

    /// String emitted before the first defined value.
    const fn first(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved => "",
            Self::Fragment => "#",
            Self::Label => ".",
            Self::Path => "/",
            Self::Query => "?",
            Self::QueryContinuation => "&",
        }
    }

    /// String placed between values.
    const fn separator(self) -> &'static str {
        match self {
            Self::Simple | Self::Reserved | Self::Fragment => ",",
            Self::Label => ".",
            Self::Path => "/",
            Self::Query | Self::QueryContinuation => "&",
        }
    }

    const fn allows_reserved(self) -> bool {
        matches!(self, Self::Reserved | Self::Fragment)
    }

    const fn is_named(self) -> bool {
        matches!(self, Self::Query | Self::QueryContinuation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VarSpec {
    name: String,
    explode: bool,
    prefix: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression {
        operator: Operator,
        vars: Vec<VarSpec>,
    },
}

/// One capture group of the compiled matcher.
#[derive(Debug, Clone)]
struct Capture {
    name: String,
    operator: Operator,
    explode: bool,
}

/// A parsed and compiled URI template.
#[derive(Debug, Clone)]
pub struct UriTemplate {
    template: String,
    parts: Vec<Part>,
    variable_names: Vec<String>,
    matcher: Regex,
    captures: Vec<Capture>,
}

impl UriTemplate {
    /// Parses `template` and compiles its matcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the template exceeds the size limits, contains an
    /// unbalanced brace, an empty expression, an unsupported operator, or an
    /// invalid variable name.
    pub fn new(template: impl Into<String>) -> Result<Self, InvalidArgument> {
        let template = template.into();

        if template.chars().count() > MAX_TEMPLATE_LENGTH {
            return Err(InvalidArgument::new(format!(
                "URI template exceeds {MAX_TEMPLATE_LENGTH} characters"
            )));
        }

        let parts = parse(&template)?;

        let mut variable_names: Vec<String> = Vec::new();
        for part in &parts {
            if let Part::Expression { vars, .. } = part {
                for var in vars {
                    if !variable_names.contains(&var.name) {
                        variable_names.push(var.name.clone());
                    }
                }
            }
        }

        let (matcher, captures) = compile(&parts)?;

        Ok(Self {
            template,
            parts,
            variable_names,
            matcher,
            captures,
        })
    }

    /// Returns `true` if `uri` contains at least one template variable.
    #[must_use]
    pub fn is_template(uri: &str) -> bool {
        Self::new(uri).is_ok_and(|t| !t.variable_names.is_empty())
    }

    /// Returns the raw template string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Returns the variable names in declaration order.
    #[must_use]
    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    /// Returns `true` if the template declares no variables.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.variable_names.is_empty()
    }

    /// Expands the template with `variables`.
    ///
    /// Undefined variables contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a value exceeds [`MAX_VARIABLE_LENGTH`].
    pub fn expand(&self, variables: &Variables) -> Result<String, InvalidArgument> {
        let mut out = String::with_capacity(self.template.len());
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expression { operator, vars } => {
                    out.push_str(&expand_expression(*operator, vars, variables)?);
                }
            }
        }
        Ok(out)
    }

    /// Matches `uri` against the template and extracts its variables.
    ///
    /// Returns `None` if the URI does not match as a whole. Query variables
    /// that are absent from the URI are returned as empty strings. Values
    /// are percent-decoded.
    ///
    /// Query expressions (`{?var}`, `{&var}`) capture only the first
    /// `name=value` pair for each variable and always yield a string, so an
    /// exploded list such as `?list=red&list=green` does not round-trip.
    #[must_use]
    pub fn match_uri(&self, uri: &str) -> Option<Variables> {
        if uri.len() > MAX_TEMPLATE_LENGTH {
            return None;
        }

        let caps = self.matcher.captures(uri)?;
        let mut variables = Variables::new();

        for (index, capture) in self.captures.iter().enumerate() {
            let raw = caps.get(index + 1).map_or("", |m| m.as_str());
            let value = if capture.explode {
                let separator = match capture.operator {
                    Operator::Label => '.',
                    Operator::Path => '/',
                    _ => ',',
                };
                TemplateValue::List(raw.split(separator).map(percent_decode).collect())
            } else {
                TemplateValue::String(percent_decode(raw))
            };
            variables.entry(capture.name.clone()).or_insert(value);
        }

        Some(variables)
    }

    /// Returns `true` if `uri` matches the template.
    #[must_use]
    pub fn matches(&self, uri: &str) -> bool {
        uri.len() <= MAX_TEMPLATE_LENGTH && self.matcher.is_match(uri)
    }
}

impl std::fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.template)
    }
}

impl PartialEq for UriTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
    }
}

impl Eq for UriTemplate {}

impl std::str::FromStr for UriTemplate {
    type Err = InvalidArgument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn parse(template: &str) -> Result<Vec<Part>, InvalidArgument> {
    let mut parts = Vec::new();
    let mut expressions = 0usize;
    let mut rest = template;

    while !rest.is_empty() {
        let Some(open) = rest.find('{') else {
            if rest.contains('}') {
                return Err(InvalidArgument::new("unmatched '}' in URI template"));
            }
            parts.push(Part::Literal(rest.to_string()));
            break;
        };

        if open > 0 {
            let literal = &rest[..open];
            if literal.contains('}') {
                return Err(InvalidArgument::new("unmatched '}' in URI template"));
            }
            parts.push(Part::Literal(literal.to_string()));
        }

        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| InvalidArgument::new("unclosed expression in URI template"))?;
        let body = &after[..close];
        if body.contains('{') {
            return Err(InvalidArgument::new("nested '{' in URI template"));
        }

        expressions += 1;
        if expressions > MAX_TEMPLATE_EXPRESSIONS {
            return Err(InvalidArgument::new(format!(
                "URI template exceeds {MAX_TEMPLATE_EXPRESSIONS} expressions"
            )));
        }

        parts.push(parse_expression(body)?);
        rest = &after[close + 1..];
    }

    Ok(parts)
}

fn parse_expression(body: &str) -> Result<Part, InvalidArgument> {
    let mut chars = body.chars();
    let first = chars
        .next()
        .ok_or_else(|| InvalidArgument::new("empty expression in URI template"))?;

    let (operator, list) = match Operator::from_char(first) {
        Some(op) => (op, chars.as_str()),
        None if matches!(first, '=' | ',' | '!' | '@' | '|' | ';') => {
            return Err(InvalidArgument::new(format!(
                "unsupported URI template operator '{first}'"
            )));
        }
        None => (Operator::Simple, body),
    };

    let vars = list
        .split(',')
        .map(parse_varspec)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Part::Expression { operator, vars })
}

fn parse_varspec(spec: &str) -> Result<VarSpec, InvalidArgument> {
    let (name, explode, prefix) = if let Some(name) = spec.strip_suffix('*') {
        (name, true, None)
    } else if let Some((name, len)) = spec.split_once(':') {
        let len: usize = len
            .parse()
            .ok()
            .filter(|n| (1..10_000).contains(n))
            .ok_or_else(|| InvalidArgument::new(format!("invalid prefix modifier in '{spec}'")))?;
        (name, false, Some(len))
    } else {
        (spec, false, None)
    };

    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '%'));
    if !valid {
        return Err(InvalidArgument::new(format!(
            "invalid variable name '{name}' in URI template"
        )));
    }

    Ok(VarSpec {
        name: name.to_string(),
        explode,
        prefix,
    })
}

fn compile(parts: &[Part]) -> Result<(Regex, Vec<Capture>), InvalidArgument> {
    let mut pattern = String::from("^");
    let mut captures = Vec::new();

    for part in parts {
        match part {
            Part::Literal(text) => pattern.push_str(&regex::escape(text)),
            Part::Expression { operator, vars } => {
                push_expression_pattern(&mut pattern, *operator, vars, captures.len());
                captures.extend(vars.iter().map(|var| Capture {
                    name: var.name.clone(),
                    operator: *operator,
                    explode: var.explode,
                }));
            }
        }
    }
    pattern.push('$');

    let size_limit = captures
        .len()
        .saturating_mul(REGEX_SIZE_PER_VARIABLE)
        .clamp(MIN_REGEX_SIZE, MAX_REGEX_SIZE);

    let matcher = regex::RegexBuilder::new(&pattern)
        .size_limit(size_limit)
        .build()
        .map_err(|e| InvalidArgument::new(format!("URI template cannot be compiled: {e}")))?;

    Ok((matcher, captures))
}

fn push_expression_pattern(pattern: &mut String, operator: Operator, vars: &[VarSpec], base: usize) {
    let single = vars.len() == 1;

    for (offset, var) in vars.iter().enumerate() {
        let group = format!("v{}", base + offset);
        let first = offset == 0;

        // Writing to a String is infallible.
        let _ = match operator {
            Operator::Query | Operator::QueryContinuation => {
                let lead = if operator == Operator::Query { "[?&]" } else { "&" };
                write!(
                    pattern,
                    "(?:{lead}{}=(?P<{group}>[^&/#]*))?",
                    regex::escape(&var.name)
                )
            }
            Operator::Simple => {
                let sep = if first { "" } else { "," };
                let class = if single || var.explode { "[^/]+" } else { "[^/,]+" };
                write!(pattern, "{sep}(?P<{group}>{class})")
            }
            Operator::Reserved | Operator::Fragment => {
                let sep = match (first, operator) {
                    (true, Operator::Fragment) => "#",
                    (true, _) => "",
                    (false, _) => ",",
                };
                let class = if single { ".+" } else { "[^,]+" };
                write!(pattern, "{sep}(?P<{group}>{class})")
            }
            Operator::Label => {
                let class = if var.explode { "[^/]+" } else { "[^/.]+" };
                write!(pattern, "\\.(?P<{group}>{class})")
            }
            Operator::Path => {
                let class = if var.explode {
                    "[^/?#]+(?:/[^/?#]+)*"
                } else {
                    "[^/?#]+"
                };
                write!(pattern, "/(?P<{group}>{class})")
            }
        };
    }
}

fn expand_expression(
    operator: Operator,
    vars: &[VarSpec],
    variables: &Variables,
) -> Result<String, InvalidArgument> {
    let mut items: Vec<String> = Vec::new();

    for var in vars {
        let Some(value) = variables.get(&var.name) else {
            continue;
        };

        match value {
            TemplateValue::String(raw) => {
                if raw.chars().count() > MAX_VARIABLE_LENGTH {
                    return Err(InvalidArgument::new(format!(
                        "value of '{}' exceeds {MAX_VARIABLE_LENGTH} characters",
                        var.name
                    )));
                }
                let truncated: String = match var.prefix {
                    Some(len) => raw.chars().take(len).collect(),
                    None => raw.clone(),
                };
                let encoded = encode(&truncated, operator.allows_reserved());
                if operator.is_named() {
                    if encoded.is_empty() {
                        continue;
                    }
                    items.push(format!("{}={encoded}", var.name));
                } else {
                    items.push(encoded);
                }
            }
            TemplateValue::List(list) => {
                if list.is_empty() {
                    continue;
                }
                let encoded: Vec<String> = list
                    .iter()
                    .map(|v| encode(v, operator.allows_reserved()))
                    .collect();
                match (var.explode, operator.is_named()) {
                    (true, true) => {
                        items.extend(encoded.iter().map(|v| format!("{}={v}", var.name)));
                    }
                    (true, false) => items.extend(encoded),
                    (false, true) => items.push(format!("{}={}", var.name, encoded.join(","))),
                    (false, false) => items.push(encoded.join(",")),
                }
            }
        }
    }

    if items.is_empty() {
        return Ok(String::new());
    }

    Ok(format!(
        "{}{}",
        operator.first(),
        items.join(operator.separator())
    ))
}

const fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

const fn is_reserved(byte: u8) -> bool {
    matches!(
        byte,
        b':' | b'/'
            | b'?'
            | b'#'
            | b'['
            | b']'
            | b'@'
            | b'!'
            | b'$'
            | b'&'
            | b'\''
            | b'('
            | b')'
            | b'*'
            | b'+'
            | b','
            | b';'
            | b'='
    )
}

/// Percent-encodes `value` per RFC 6570 §3.2.1.
///
/// With `allow_reserved`, reserved characters and existing `%XX` triplets
/// pass through unchanged.
fn encode(value: &str, allow_reserved: bool) -> String {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let byte = bytes[i];
        let keep = is_unreserved(byte)
            || (allow_reserved
                && (is_reserved(byte)
                    || (byte == b'%'
                        && i + 2 < bytes.len()
                        && bytes[i + 1].is_ascii_hexdigit()
                        && bytes[i + 2].is_ascii_hexdigit())));
        if keep {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
        i += 1;
    }

    out
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decodes `%XX` sequences; invalid sequences and non-UTF-8 results are
/// returned unchanged.
fn percent_decode(value: &str) -> String {
    if !value.contains('%') {
        return value.to_string();
    }

    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((high << 4) | low);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| value.to_string())
}
