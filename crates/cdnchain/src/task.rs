//! Task-chain model and its wire rendering.
//!
//! Grammar understood by the CDN:
//!
//! ```text
//! chain  := task ("/" task)*
//! task   := name ["=" option ("," option)*]
//! option := key ":" value
//! ```

use crate::config::Security;
use crate::error::{TransformError, TransformResult};
use crate::storage::StorageOptions;
use std::fmt;
use std::str::FromStr;

pub const SECURITY_TASK: &str = "security";

/// Conversion of an option value into its wire form.
///
/// Scalars use their `Display` form. Sequences render as `[a,b,c]` with every space
/// removed, so `["red", "blue"]` becomes `[red,blue]`.
pub trait OptionValue {
    fn render_value(&self) -> String;
}

macro_rules! display_option_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl OptionValue for $ty {
                fn render_value(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_option_value!(
    str, String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
    f32, f64,
);

impl<T: OptionValue + ?Sized> OptionValue for &T {
    fn render_value(&self) -> String {
        (**self).render_value()
    }
}

impl<T: OptionValue> OptionValue for [T] {
    fn render_value(&self) -> String {
        let items = self
            .iter()
            .map(OptionValue::render_value)
            .collect::<Vec<_>>()
            .join(",");
        format!("[{items}]").replace(' ', "")
    }
}

impl<T: OptionValue> OptionValue for Vec<T> {
    fn render_value(&self) -> String {
        self.as_slice().render_value()
    }
}

impl<T: OptionValue, const N: usize> OptionValue for [T; N] {
    fn render_value(&self) -> String {
        self.as_slice().render_value()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskOption {
    pub key: String,
    pub value: String,
}

impl TaskOption {
    pub fn new(key: impl Into<String>, value: impl OptionValue) -> Self {
        Self {
            key: key.into(),
            value: value.render_value(),
        }
    }
}

impl fmt::Display for TaskOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

/// One named step of a chain. Options keep insertion order and duplicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    name: String,
    options: Vec<TaskOption>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
        }
    }

    pub fn security(security: &Security) -> Self {
        Self::new(SECURITY_TASK)
            .option("policy", security.policy())
            .option("signature", security.signature())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &[TaskOption] {
        &self.options
    }

    pub fn add_option(&mut self, key: impl Into<String>, value: impl OptionValue) -> &mut Self {
        self.options.push(TaskOption::new(key, value));
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl OptionValue) -> Self {
        self.add_option(key, value);
        self
    }

    /// Checks the invariants a chain relies on: a non-empty name and non-empty keys.
    pub fn validate(&self) -> TransformResult<()> {
        if self.name.trim().is_empty() {
            return Err(TransformError::InvalidArgument(
                "task name must not be empty".to_string(),
            ));
        }
        if let Some(index) = self.options.iter().position(|option| option.key.is_empty()) {
            return Err(TransformError::InvalidArgument(format!(
                "task '{}' option #{index} has an empty key",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (index, option) in self.options.iter().enumerate() {
            f.write_str(if index == 0 { "=" } else { "," })?;
            write!(f, "{option}")?;
        }
        Ok(())
    }
}

impl FromStr for Task {
    type Err = TransformError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let (name, raw_options) = match input.split_once('=') {
            Some((name, rest)) => (name, Some(rest)),
            None => (input, None),
        };

        let mut task = Task::new(name);
        if let Some(raw_options) = raw_options {
            for raw in split_top_level(raw_options) {
                let (key, value) = raw.split_once(':').ok_or_else(|| {
                    TransformError::InvalidArgument(format!(
                        "option '{raw}' of task '{name}' is missing ':'"
                    ))
                })?;
                task.add_option(key, value);
            }
        }

        task.validate()?;
        Ok(task)
    }
}

/// Splits on commas that are not nested inside `[...]`.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0_usize;
    let mut start = 0;
    for (index, ch) in input.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Append-only sequence of tasks for a single transformation request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskChain {
    tasks: Vec<Task>,
}

impl TaskChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a chain whose first task is the access-control task when `security` is set.
    pub fn seeded(security: Option<&Security>) -> Self {
        let mut chain = Self::new();
        if let Some(security) = security {
            chain.tasks.push(Task::security(security));
        }
        chain
    }

    pub fn push(&mut self, task: Task) -> TransformResult<()> {
        task.validate()?;
        self.tasks.push(task);
        Ok(())
    }

    /// Appends the `store` task derived from `options`.
    ///
    /// This is the state transition `store` performs before it submits the chain. The
    /// task stays in the chain whatever the outcome of the backend call.
    pub fn push_store_task(&mut self, options: &StorageOptions) {
        self.tasks.push(options.as_task());
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn render(&self) -> TransformResult<String> {
        if self.tasks.is_empty() {
            return Err(TransformError::InvalidArgument(
                "cannot render an empty task chain".to_string(),
            ));
        }
        Ok(self
            .tasks
            .iter()
            .map(Task::to_string)
            .collect::<Vec<_>>()
            .join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_renders_options_in_insertion_order() {
        let task = Task::new("resize").option("w", 100).option("h", 200);
        assert_eq!(task.to_string(), "resize=w:100,h:200");
    }

    #[test]
    fn sequence_values_flatten_without_spaces() {
        let task = Task::new("partial_blur").option("colors", vec!["red", "blue"]);
        assert_eq!(task.to_string(), "partial_blur=colors:[red,blue]");

        let task = Task::new("crop").option("dim", [10, 20, 300, 400]);
        assert_eq!(task.to_string(), "crop=dim:[10,20,300,400]");

        let spaced = ["dark red", "blue"];
        let task = Task::new("tint").option("colors", &spaced[..]);
        assert_eq!(task.to_string(), "tint=colors:[darkred,blue]");
    }

    #[test]
    fn duplicate_keys_are_kept() {
        let task = Task::new("resize").option("w", 10).option("w", 20);
        assert_eq!(task.options().len(), 2);
        assert_eq!(task.to_string(), "resize=w:10,w:20");
    }

    #[test]
    fn empty_values_are_allowed() {
        let task = Task::new("output").option("format", "");
        assert_eq!(task.to_string(), "output=format:");
        assert!(task.validate().is_ok());
    }

    #[test]
    fn task_without_options_renders_bare_name() {
        assert_eq!(Task::new("monochrome").to_string(), "monochrome");
    }

    #[test]
    fn chain_joins_tasks_in_append_order() {
        let mut chain = TaskChain::new();
        chain.push(Task::new("resize").option("w", 100)).unwrap();
        chain.push(Task::new("rotate").option("deg", 90)).unwrap();
        chain.push(Task::new("monochrome")).unwrap();

        let rendered = chain.render().unwrap();
        assert_eq!(rendered, "resize=w:100/rotate=deg:90/monochrome");
        assert!(!rendered.starts_with('/'));
        assert!(!rendered.ends_with('/'));
        assert_eq!(chain.render().unwrap(), rendered);
    }

    #[test]
    fn empty_chain_cannot_render() {
        let error = TaskChain::new().render().unwrap_err();
        assert!(matches!(error, TransformError::InvalidArgument(_)));
    }

    #[test]
    fn security_task_is_seeded_first() {
        let security = Security::new("eyJwb2xpY3kiOjF9", "abc123");
        let mut chain = TaskChain::seeded(Some(&security));
        chain.push(Task::new("resize").option("w", 100)).unwrap();
        chain.push(Task::new("flip")).unwrap();

        let rendered = chain.render().unwrap();
        assert_eq!(
            rendered,
            "security=policy:eyJwb2xpY3kiOjF9,signature:abc123/resize=w:100/flip"
        );
        assert_eq!(chain.tasks()[0].name(), SECURITY_TASK);
    }

    #[test]
    fn push_rejects_invalid_tasks() {
        let mut chain = TaskChain::new();
        let error = chain.push(Task::new("")).unwrap_err();
        assert!(matches!(error, TransformError::InvalidArgument(_)));

        let error = chain.push(Task::new("resize").option("", 1)).unwrap_err();
        assert!(matches!(error, TransformError::InvalidArgument(_)));
        assert!(chain.is_empty());
    }

    #[test]
    fn push_store_task_appends_store_configuration() {
        let mut chain = TaskChain::new();
        chain.push(Task::new("resize").option("w", 100)).unwrap();
        chain.push_store_task(&StorageOptions::default());

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.render().unwrap(), "resize=w:100/store");
    }

    #[test]
    fn parses_task_text() {
        let task: Task = "resize=w:100,h:200".parse().unwrap();
        assert_eq!(task.name(), "resize");
        assert_eq!(
            task.options(),
            &[TaskOption::new("w", "100"), TaskOption::new("h", "200")]
        );

        let task: Task = "partial_pixelate=objects:[[10,20,200,250],[275,91,500,557]],amount:10"
            .parse()
            .unwrap();
        assert_eq!(task.options().len(), 2);
        assert_eq!(task.options()[0].value, "[[10,20,200,250],[275,91,500,557]]");
        assert_eq!(
            task.to_string(),
            "partial_pixelate=objects:[[10,20,200,250],[275,91,500,557]],amount:10"
        );

        let task: Task = "flip".parse().unwrap();
        assert!(task.options().is_empty());
    }

    #[test]
    fn rejects_malformed_task_text() {
        assert!("resize=w100".parse::<Task>().is_err());
        assert!("=w:100".parse::<Task>().is_err());
        assert!("resize=:100".parse::<Task>().is_err());
    }
}
