use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::validation::ValidationError;

#[inline]
fn err(code: &'static str, msg: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code, msg)
}

/// ---------- strings ----------

/// Rejects empty and whitespace-only strings.
pub fn non_empty(s: &str) -> Result<(), ValidationError> {
    if s.trim().is_empty() {
        Err(err("required", "This field is required"))
    } else {
        Ok(())
    }
}

/// Character-count minimum; `label` names the thing in the message
/// ("Table name must be at least 3 characters").
pub fn min_chars(label: &'static str, n: usize) -> impl Fn(&str) -> Result<(), ValidationError> {
    move |s| {
        if s.chars().count() < n {
            Err(err("min_chars", format!("{label} must be at least {n} characters")))
        } else {
            Ok(())
        }
    }
}

pub fn email(s: &str) -> Result<(), ValidationError> {
    static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9-]+(\.[a-z0-9-]+)+$")
            .expect("valid email regex")
    });

    if EMAIL_RE.is_match(s) {
        Ok(())
    } else {
        Err(err("email", "Invalid email address"))
    }
}

/// Absolute URL with any scheme, parsed rather than pattern-matched.
pub fn url(s: &str) -> Result<(), ValidationError> {
    match url::Url::parse(s) {
        Ok(_) => Ok(()),
        Err(_) => Err(err("url", "Invalid URL")),
    }
}

pub fn matches(re: &Regex) -> impl Fn(&str) -> Result<(), ValidationError> + '_ {
    move |s| {
        if re.is_match(s) {
            Ok(())
        } else {
            Err(err("pattern", format!("Value does not match pattern {}", re.as_str())))
        }
    }
}

/// ---------- numbers ----------

pub fn min<T>(min: T) -> impl Fn(&T) -> Result<(), ValidationError>
where
    T: PartialOrd + std::fmt::Display,
{
    move |v| {
        if *v < min {
            Err(err("min_value", format!("Must be greater than or equal to {min}")))
        } else {
            Ok(())
        }
    }
}

pub fn max<T>(max: T) -> impl Fn(&T) -> Result<(), ValidationError>
where
    T: PartialOrd + std::fmt::Display,
{
    move |v| {
        if *v > max {
            Err(err("max_value", format!("Must be less than or equal to {max}")))
        } else {
            Ok(())
        }
    }
}

pub fn range<T>(min: T, max: T) -> impl Fn(&T) -> Result<(), ValidationError>
where
    T: PartialOrd + std::fmt::Display,
{
    move |v| {
        if *v < min || *v > max {
            Err(err("value_range", format!("Must be between {min} and {max}")))
        } else {
            Ok(())
        }
    }
}

/// ---------- collections ----------

pub fn min_items<T>(label: &'static str, n: usize) -> impl Fn(&[T]) -> Result<(), ValidationError> {
    move |v: &[T]| {
        if v.len() < n {
            let noun = if n == 1 { "item is" } else { "items are" };
            Err(err("min_items", format!("At least {n} {label} {noun} required")))
        } else {
            Ok(())
        }
    }
}

/// ---------- choices ----------

pub fn one_of<'a, S: AsRef<str>>(allowed: &'a [S]) -> impl Fn(&str) -> Result<(), ValidationError> + 'a {
    move |v| {
        if allowed.iter().any(|a| a.as_ref() == v) {
            Ok(())
        } else {
            Err(err("invalid_choice", "Please select a valid option"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert!(non_empty("a").is_ok());
        assert!(non_empty("").is_err());
        assert!(non_empty("   ").is_err());
    }

    #[test]
    fn test_min_chars() {
        let min3 = min_chars("Name", 3);
        assert!(min3("世界").is_err());
        assert!(min3("世界!").is_ok());
        assert_eq!(
            min3("ab").unwrap_err().message,
            "Name must be at least 3 characters"
        );
    }

    #[test]
    fn test_email() {
        assert!(email("user@example.com").is_ok());
        assert!(email("test.email@domain.co.uk").is_ok());
        assert!(email("not-an-email").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("user@example").is_err());
    }

    #[test]
    fn test_url() {
        assert!(url("https://example.com").is_ok());
        assert!(url("http://example.com:8080/path?q=1").is_ok());
        assert!(url("ftp://files.example.com").is_ok());
        assert!(url("example.com").is_err());
        assert!(url("not a url").is_err());
        assert!(url("").is_err());
    }

    #[test]
    fn test_matches() {
        let re = Regex::new(r"^[A-Z]{3,5}$").expect("regex");
        let check = matches(&re);
        assert!(check("ACME").is_ok());
        assert!(check("acme").is_err());
    }

    #[test]
    fn test_numeric() {
        assert!(min(5)(&3).is_err());
        assert!(min(5)(&5).is_ok());
        assert!(max(10.0)(&10.5).is_err());
        let rating = range(1, 5);
        assert!(rating(&0).is_err());
        assert!(rating(&3).is_ok());
        assert!(rating(&6).is_err());
    }

    #[test]
    fn test_min_items_and_one_of() {
        let at_least_one = min_items::<i32>("column", 1);
        assert!(at_least_one(&[]).is_err());
        assert!(at_least_one(&[1]).is_ok());

        let options = vec!["Yes".to_string(), "No".to_string()];
        let choice = one_of(&options);
        assert!(choice("Yes").is_ok());
        assert!(choice("Maybe").is_err());
    }
}
