//! Validation predicates
//!
//! Pure functions shared by the keyword validator operators
//! (`ssn is_ssn`, `dob age_at_least 18`) and the `is_valid_*` builtins.

use crate::value::Value;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::OnceLock;

fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("static pattern")
    })
}

pub fn is_email(v: &Value) -> bool {
    match v {
        Value::Text(s) => email_pattern().is_match(s.trim()),
        _ => false,
    }
}

/// FICO-style range check: an integer between 300 and 850.
pub fn is_valid_credit_score(v: &Value) -> bool {
    match v.try_decimal() {
        Some(d) => {
            d.normalize().scale() == 0 && d >= Decimal::from(300) && d <= Decimal::from(850)
        }
        None => false,
    }
}

/// SSN with or without dashes. Area 000/666/9xx, group 00 and serial 0000
/// are never issued.
pub fn is_valid_ssn(v: &Value) -> bool {
    let Value::Text(raw) = v else { return false };
    let digits: String = raw.chars().filter(|c| *c != '-').collect();
    if digits.len() != 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let area: u32 = digits[0..3].parse().expect("digits checked");
    let group: u32 = digits[3..5].parse().expect("digits checked");
    let serial: u32 = digits[5..9].parse().expect("digits checked");
    area != 0 && area != 666 && area < 900 && group != 0 && serial != 0
}

/// Account numbers are 4 to 17 digits.
pub fn is_valid_account(v: &Value) -> bool {
    let text = match v {
        Value::Text(s) => s.trim().to_string(),
        Value::Number(n) => n.normalize().to_string(),
        _ => return false,
    };
    (4..=17).contains(&text.len()) && text.chars().all(|c| c.is_ascii_digit())
}

/// Nine digits passing the ABA 3-7-1 checksum. Routing numbers keep their
/// leading zeros, so only text is accepted.
pub fn is_valid_routing(v: &Value) -> bool {
    let Value::Text(raw) = v else { return false };
    let text = raw.trim();
    if text.len() != 9 || !text.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let d: Vec<u32> = text.chars().map(|c| c.to_digit(10).expect("digits checked")).collect();
    let checksum = 3 * (d[0] + d[3] + d[6]) + 7 * (d[1] + d[4] + d[7]) + (d[2] + d[5] + d[8]);
    checksum % 10 == 0
}

/// Present and non-blank.
pub fn is_valid(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Text(s) => !s.trim().is_empty(),
        _ => true,
    }
}

pub fn is_business_day(v: &Value) -> bool {
    match v.as_date() {
        Some(date) => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        None => false,
    }
}

/// age_meets_requirement(dob, years): completed years of age, birthday not
/// yet reached this year counts one less.
pub fn age_meets_requirement(dob: &Value, years: &Value, now: DateTime<Utc>) -> bool {
    let (Some(dob), Some(required)) = (
        dob.as_date(),
        years.try_decimal().and_then(|d| d.to_i64()),
    ) else {
        return false;
    };
    age_in_years(dob, now.date_naive()) >= required
}

pub fn age_in_years(dob: NaiveDate, today: NaiveDate) -> i64 {
    let mut age = today.year() as i64 - dob.year() as i64;
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn num(s: &str) -> Value {
        Value::Number(rust_decimal::Decimal::from_str(s).unwrap())
    }

    #[test]
    fn test_credit_score_range() {
        assert!(is_valid_credit_score(&num("300")));
        assert!(is_valid_credit_score(&num("850")));
        assert!(is_valid_credit_score(&Value::text("720")));
        assert!(!is_valid_credit_score(&num("299")));
        assert!(!is_valid_credit_score(&num("851")));
        assert!(!is_valid_credit_score(&num("700.5")));
        assert!(!is_valid_credit_score(&Value::Null));
    }

    #[test]
    fn test_ssn() {
        assert!(is_valid_ssn(&Value::text("123-45-6789")));
        assert!(is_valid_ssn(&Value::text("123456789")));
        assert!(!is_valid_ssn(&Value::text("000-45-6789")));
        assert!(!is_valid_ssn(&Value::text("666-45-6789")));
        assert!(!is_valid_ssn(&Value::text("900-45-6789")));
        assert!(!is_valid_ssn(&Value::text("123-00-6789")));
        assert!(!is_valid_ssn(&Value::text("123-45-0000")));
        assert!(!is_valid_ssn(&Value::text("123-45-678")));
    }

    #[test]
    fn test_routing_number() {
        // Federal Reserve routing numbers with a valid checksum.
        assert!(is_valid_routing(&Value::text("021000021")));
        assert!(is_valid_routing(&Value::text("011401533")));
        assert!(!is_valid_routing(&Value::text("021000022")));
        assert!(!is_valid_routing(&Value::text("12345678")));
    }

    #[test]
    fn test_account_number() {
        assert!(is_valid_account(&Value::text("1234")));
        assert!(is_valid_account(&Value::text("12345678901234567")));
        assert!(!is_valid_account(&Value::text("123")));
        assert!(!is_valid_account(&Value::text("123456789012345678")));
        assert!(!is_valid_account(&Value::text("12a4")));
    }

    #[test]
    fn test_email() {
        assert!(is_email(&Value::text("ops@example.com")));
        assert!(is_email(&Value::text("first.last+tag@sub.example.co")));
        assert!(!is_email(&Value::text("nope@")));
        assert!(!is_email(&Value::text("nope")));
    }

    #[test]
    fn test_business_day() {
        // 2024-06-03 is a Monday, 2024-06-01 a Saturday.
        assert!(is_business_day(&Value::text("2024-06-03")));
        assert!(!is_business_day(&Value::text("2024-06-01")));
        assert!(!is_business_day(&Value::text("garbage")));
    }

    #[test]
    fn test_age() {
        let now = DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(age_meets_requirement(
            &Value::text("2006-06-01"),
            &num("18"),
            now
        ));
        assert!(!age_meets_requirement(
            &Value::text("2006-06-02"),
            &num("18"),
            now
        ));
        assert!(!age_meets_requirement(&Value::text("bad"), &num("18"), now));
    }
}
