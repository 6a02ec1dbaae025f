//! Field schemas and the per-form registry that holds them.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::availability::AvailabilityCheck;
use super::messages::{render, ValidationMessages};

pub const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
pub const NICKNAME_PATTERN: &str = r"^[A-Za-z0-9_.-]+$";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"));
static NICKNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NICKNAME_PATTERN).expect("nickname pattern is valid"));

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone)]
enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Pattern(Regex),
    Predicate(Predicate),
}

impl Rule {
    fn passes(&self, value: &str) -> bool {
        match self {
            Rule::Required => !value.trim().is_empty(),
            Rule::MinLength(min) => value.chars().count() >= *min,
            Rule::MaxLength(max) => value.chars().count() <= *max,
            Rule::Pattern(re) => re.is_match(value),
            Rule::Predicate(f) => f(value),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => write!(f, "Required"),
            Rule::MinLength(n) => write!(f, "MinLength({n})"),
            Rule::MaxLength(n) => write!(f, "MaxLength({n})"),
            Rule::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
            Rule::Predicate(_) => write!(f, "Predicate"),
        }
    }
}

#[derive(Debug, Clone)]
struct RuleCheck {
    rule: Rule,
    message: String,
}

/// Ordered rules for one field; the first failing rule's message wins.
///
/// An empty value only fails when the schema is `required`; otherwise the
/// remaining rules are skipped for it.
#[derive(Debug, Clone, Default)]
pub struct FieldSchema {
    checks: Vec<RuleCheck>,
    availability: Option<AvailabilityCheck>,
}

impl FieldSchema {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, rule: Rule, message: impl Into<String>) -> Self {
        self.checks.push(RuleCheck {
            rule,
            message: message.into(),
        });
        self
    }

    pub fn required(self, message: impl Into<String>) -> Self {
        self.push(Rule::Required, message)
    }

    /// `template` may contain `{min}`
    pub fn min_len(self, min: usize, template: &str) -> Self {
        let message = render(template, &[("min", min.to_string())]);
        self.push(Rule::MinLength(min), message)
    }

    /// `template` may contain `{max}`
    pub fn max_len(self, max: usize, template: &str) -> Self {
        let message = render(template, &[("max", max.to_string())]);
        self.push(Rule::MaxLength(max), message)
    }

    pub fn pattern(self, pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        let re = Regex::new(pattern)?;
        Ok(self.push(Rule::Pattern(re), message))
    }

    fn regex(self, re: &Regex, message: impl Into<String>) -> Self {
        self.push(Rule::Pattern(re.clone()), message)
    }

    pub fn predicate<F>(self, f: F, message: impl Into<String>) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.push(Rule::Predicate(Arc::new(f)), message)
    }

    /// Attach a remote uniqueness probe that runs after the local rules pass.
    pub fn with_availability(mut self, check: AvailabilityCheck) -> Self {
        self.availability = Some(check);
        self
    }

    pub fn availability(&self) -> Option<&AvailabilityCheck> {
        self.availability.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.checks.iter().any(|c| matches!(c.rule, Rule::Required))
    }

    /// Run the local rules. `Err` carries the message of the first failure.
    pub fn check(&self, value: &str) -> Result<(), String> {
        if value.trim().is_empty() && !self.is_required() {
            return Ok(());
        }
        match self.checks.iter().find(|c| !c.rule.passes(value)) {
            Some(failed) => Err(failed.message.clone()),
            None => Ok(()),
        }
    }

    // ========================
    // Common Fields
    // ========================

    pub fn email(messages: &ValidationMessages) -> Self {
        Self::new()
            .required(messages.required)
            .max_len(254, messages.too_long)
            .regex(&EMAIL_RE, messages.invalid_email)
    }

    pub fn nickname(messages: &ValidationMessages) -> Self {
        Self::new()
            .required(messages.required)
            .min_len(3, messages.too_short)
            .max_len(30, messages.too_long)
            .regex(&NICKNAME_RE, messages.invalid_nickname)
    }

    pub fn password(messages: &ValidationMessages) -> Self {
        Self::new()
            .required(messages.required)
            .min_len(8, messages.too_short)
            .max_len(128, messages.too_long)
            .predicate(
                |v| v.chars().any(char::is_alphabetic) && v.chars().any(|c| c.is_ascii_digit()),
                messages.weak_password,
            )
    }
}

/// Schemas for one form instance, keyed by field name.
///
/// Populated before the validator is built and read-only afterwards, so two
/// forms never share or clobber each other's rules.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, FieldSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_field_schema(&mut self, name: impl Into<String>, schema: FieldSchema) -> &mut Self {
        self.schemas.insert(name.into(), schema);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.register_field_schema(name, schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn en() -> ValidationMessages {
        ValidationMessages::default()
    }

    #[test]
    fn test_email_schema() {
        let schema = FieldSchema::email(&en());
        assert_eq!(schema.check(""), Err(en().required.to_string()));
        assert_eq!(schema.check("nope"), Err(en().invalid_email.to_string()));
        assert!(schema.check("hero@quest.io").is_ok());
    }

    #[test]
    fn test_nickname_schema_reports_first_failure() {
        let schema = FieldSchema::nickname(&en());
        assert_eq!(schema.check("ab"), Err("Must be at least 3 characters".to_string()));
        assert_eq!(schema.check("bad name"), Err(en().invalid_nickname.to_string()));
        assert!(schema.check("dragon_slayer").is_ok());
    }

    #[test]
    fn test_password_needs_letter_and_digit() {
        let schema = FieldSchema::password(&en());
        assert_eq!(schema.check("abcdefgh"), Err(en().weak_password.to_string()));
        assert!(schema.check("abcdefg1").is_ok());
    }

    #[test]
    fn test_optional_field_skips_rules_when_empty() {
        let schema = FieldSchema::new().min_len(5, "{min}+");
        assert!(schema.check("").is_ok());
        assert_eq!(schema.check("abc"), Err("5+".to_string()));
    }

    #[test]
    fn test_min_len_counts_chars_not_bytes() {
        let schema = FieldSchema::new().min_len(3, "short");
        assert!(schema.check("éèê").is_ok());
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(FieldSchema::new().pattern("(", "x").is_err());
        let schema = FieldSchema::new().pattern("^[0-9]+$", "digits").unwrap();
        assert_eq!(schema.check("12a"), Err("digits".to_string()));
    }

    #[test]
    fn test_registry_is_per_instance() {
        let mut signup = SchemaRegistry::new();
        signup.register_field_schema("email", FieldSchema::email(&en()));
        let login = SchemaRegistry::new().with_field("password", FieldSchema::password(&en()));

        assert!(signup.contains("email"));
        assert!(!login.contains("email"));
        assert_eq!(signup.len(), 1);
        assert_eq!(login.field_names().collect::<Vec<_>>(), vec!["password"]);
    }
}
