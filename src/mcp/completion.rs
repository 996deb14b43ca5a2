//! Argument completion for prompts and resource templates.
//!
//! A [`Completion`] is one of four strategies resolving a partially typed
//! value into at most [`MAX_COMPLETION_VALUES`] suggestions:
//!
//! - [`Completion::Direct`]: a prebuilt [`CompletionResponse`], returned as is
//! - [`Completion::List`]: case-insensitive prefix filter over fixed values
//! - [`Completion::Enum`]: the same filter over an enumeration's values
//! - [`Completion::Callback`]: a user function, its output normalised

use serde::Serialize;

use crate::error::InvalidArgument;

/// Upper bound on the number of values in one completion response.
pub const MAX_COMPLETION_VALUES: usize = 100;

/// The `completion` object of a `completion/complete` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total: Option<usize>,
    has_more: bool,
}

impl CompletionResponse {
    /// Builds a response from caller-supplied values.
    ///
    /// # Errors
    ///
    /// Returns an error if more than [`MAX_COMPLETION_VALUES`] values are given.
    pub fn new(values: Vec<String>) -> Result<Self, InvalidArgument> {
        if values.len() > MAX_COMPLETION_VALUES {
            return Err(InvalidArgument::new(format!(
                "completion values may not exceed {MAX_COMPLETION_VALUES}, got {}",
                values.len()
            )));
        }
        Ok(Self {
            values,
            total: None,
            has_more: false,
        })
    }

    /// Builds a response with explicit pagination hints.
    ///
    /// # Errors
    ///
    /// Returns an error if more than [`MAX_COMPLETION_VALUES`] values are given.
    pub fn with_total(
        values: Vec<String>,
        total: usize,
        has_more: bool,
    ) -> Result<Self, InvalidArgument> {
        let mut response = Self::new(values)?;
        response.total = Some(total);
        response.has_more = has_more;
        Ok(response)
    }

    /// An empty response.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            values: Vec::new(),
            total: None,
            has_more: false,
        }
    }

    /// Builds a response from derived values, truncating silently.
    ///
    /// When truncation happens, `total` records the original count and
    /// `has_more` is set.
    #[must_use]
    pub fn truncated(mut values: Vec<String>) -> Self {
        let total = values.len();
        if total > MAX_COMPLETION_VALUES {
            values.truncate(MAX_COMPLETION_VALUES);
            return Self {
                values,
                total: Some(total),
                has_more: true,
            };
        }
        Self {
            values,
            total: None,
            has_more: false,
        }
    }

    /// Returns the suggested values.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Returns the total number of matches, if known.
    #[must_use]
    pub const fn total(&self) -> Option<usize> {
        self.total
    }

    /// Returns `true` if more matches exist than were returned.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }
}

/// An enumeration usable as a completion source.
///
/// Values are the backing values when present, otherwise the case names.
pub trait CompletionEnum: Sized + 'static {
    /// Every case, in declaration order.
    fn cases() -> &'static [Self];

    /// The case name.
    fn case_name(&self) -> &'static str;

    /// The backing value, for enumerations that carry one.
    fn backing_value(&self) -> Option<String> {
        None
    }
}

/// What a completion callback may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutput {
    /// A single suggestion.
    One(String),
    /// Several suggestions.
    Many(Vec<String>),
    /// A fully formed response.
    Response(CompletionResponse),
}

impl From<String> for CallbackOutput {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<&str> for CallbackOutput {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<Vec<String>> for CallbackOutput {
    fn from(value: Vec<String>) -> Self {
        Self::Many(value)
    }
}

impl From<CompletionResponse> for CallbackOutput {
    fn from(value: CompletionResponse) -> Self {
        Self::Response(value)
    }
}

type CompletionCallback = dyn Fn(&str) -> CallbackOutput + Send + Sync;

/// A completion strategy for one argument.
pub enum Completion {
    /// A fixed response, returned regardless of the partial value.
    Direct(CompletionResponse),
    /// Prefix filter over fixed values.
    List(Vec<String>),
    /// Prefix filter over enumeration values.
    Enum(Vec<String>),
    /// A user function of the partial value.
    Callback(Box<CompletionCallback>),
}

impl Completion {
    /// A list strategy.
    #[must_use]
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    /// An enum strategy over `E`.
    #[must_use]
    pub fn enumeration<E: CompletionEnum>() -> Self {
        Self::Enum(
            E::cases()
                .iter()
                .map(|case| {
                    case.backing_value()
                        .unwrap_or_else(|| case.case_name().to_string())
                })
                .collect(),
        )
    }

    /// A callback strategy.
    #[must_use]
    pub fn callback<F, O>(callback: F) -> Self
    where
        F: Fn(&str) -> O + Send + Sync + 'static,
        O: Into<CallbackOutput>,
    {
        Self::Callback(Box::new(move |value| callback(value).into()))
    }

    /// Resolves suggestions for `partial`.
    #[must_use]
    pub fn resolve(&self, partial: &str) -> CompletionResponse {
        match self {
            Self::Direct(response) => response.clone(),
            Self::List(values) | Self::Enum(values) => {
                CompletionResponse::truncated(filter_prefix(values, partial))
            }
            Self::Callback(callback) => match callback(partial) {
                CallbackOutput::One(value) => CompletionResponse::truncated(vec![value]),
                CallbackOutput::Many(values) => CompletionResponse::truncated(values),
                CallbackOutput::Response(response) => response,
            },
        }
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct(response) => f.debug_tuple("Direct").field(response).finish(),
            Self::List(values) => f.debug_tuple("List").field(values).finish(),
            Self::Enum(values) => f.debug_tuple("Enum").field(values).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Case-insensitive prefix filter; an empty prefix keeps everything.
fn filter_prefix(values: &[String], partial: &str) -> Vec<String> {
    if partial.is_empty() {
        return values.to_vec();
    }
    let needle = partial.to_lowercase();
    values
        .iter()
        .filter(|value| value.to_lowercase().starts_with(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    enum Lang {
        Php,
        Python,
        Rust,
    }

    impl CompletionEnum for Lang {
        fn cases() -> &'static [Self] {
            &[Self::Php, Self::Python, Self::Rust]
        }

        fn case_name(&self) -> &'static str {
            match self {
                Self::Php => "PHP",
                Self::Python => "Python",
                Self::Rust => "Rust",
            }
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Size {
        Small,
        Large,
    }

    impl CompletionEnum for Size {
        fn cases() -> &'static [Self] {
            &[Self::Small, Self::Large]
        }

        fn case_name(&self) -> &'static str {
            match self {
                Self::Small => "Small",
                Self::Large => "Large",
            }
        }

        fn backing_value(&self) -> Option<String> {
            Some(match self {
                Self::Small => "sm".to_string(),
                Self::Large => "lg".to_string(),
            })
        }
    }

    #[test]
    fn list_filter_is_case_insensitive() {
        let completion = Completion::list(["PHP", "Python"]);
        assert_eq!(completion.resolve("py").values(), ["Python"]);
        assert_eq!(completion.resolve("PY").values(), ["Python"]);
        assert_eq!(completion.resolve("").values(), ["PHP", "Python"]);
        assert!(completion.resolve("go").values().is_empty());
    }

    #[test]
    fn enum_uses_case_names_without_backing_values() {
        let completion = Completion::enumeration::<Lang>();
        assert_eq!(completion.resolve("p").values(), ["PHP", "Python"]);
    }

    #[test]
    fn enum_prefers_backing_values() {
        let completion = Completion::enumeration::<Size>();
        assert_eq!(completion.resolve("").values(), ["sm", "lg"]);
        assert_eq!(completion.resolve("L").values(), ["lg"]);
    }

    #[test]
    fn callback_output_is_normalised() {
        let one = Completion::callback(|value: &str| format!("{value}-1"));
        assert_eq!(one.resolve("a").values(), ["a-1"]);

        let many = Completion::callback(|_: &str| vec!["x".to_string(), "y".to_string()]);
        assert_eq!(many.resolve("").values(), ["x", "y"]);

        let nested = Completion::callback(|_: &str| {
            CompletionResponse::with_total(vec!["z".to_string()], 5, true).unwrap()
        });
        let response = nested.resolve("");
        assert_eq!(response.total(), Some(5));
        assert!(response.has_more());
    }

    #[test]
    fn direct_response_rejects_oversized_lists() {
        let values: Vec<String> = (0..=MAX_COMPLETION_VALUES).map(|i| i.to_string()).collect();
        assert!(CompletionResponse::new(values).is_err());
        let values: Vec<String> = (0..MAX_COMPLETION_VALUES).map(|i| i.to_string()).collect();
        assert!(CompletionResponse::new(values).is_ok());
    }

    #[test]
    fn every_strategy_stays_within_the_limit() {
        let many: Vec<String> = (0..250).map(|i| format!("item{i}")).collect();

        let list = Completion::List(many.clone()).resolve("item");
        assert_eq!(list.values().len(), MAX_COMPLETION_VALUES);
        assert_eq!(list.total(), Some(250));
        assert!(list.has_more());

        let callback = Completion::callback(move |_: &str| many.clone()).resolve("");
        assert_eq!(callback.values().len(), MAX_COMPLETION_VALUES);
    }

    #[test]
    fn serialises_with_camel_case_keys() {
        let response = CompletionResponse::new(vec!["a".into()]).unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({"values": ["a"], "hasMore": false})
        );
    }
}
