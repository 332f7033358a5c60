//! Semantic validation of decoded orders.
//!
//! Every field is checked against its rule list in order and reports the
//! first rule it breaks. All failing fields are collected into a single
//! [`ValidationError`] so a rejected message can be logged with a complete
//! diagnostic.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::order::{Delivery, Item, Order, Payment};

static E164: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]?[0-9]{7,14}$").expect("valid E.164 regex"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("valid email regex")
});

/// A single rule a field can break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    /// Unicode letters and digits only.
    AlphaNumUnicode,
    /// Printable ASCII (0x20..=0x7E) only.
    PrintAscii,
    /// ASCII letters only.
    Alpha,
    /// ASCII uppercase letters only.
    UppercaseAlpha,
    /// ASCII digits only.
    Numeric,
    /// Exact length in characters.
    Len(usize),
    /// Maximum length in characters.
    Max(usize),
    Gt(i64),
    Gte(i64),
    E164,
    Email,
    /// Minimum number of elements in a sequence.
    MinItems(usize),
}

/// A field that failed validation together with the rule it broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Dotted JSON path, e.g. `delivery.phone` or `items[0].price`.
    pub field: String,
    pub rule: Rule,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = &self.field;
        match self.rule {
            Rule::Required => write!(f, "{field} is required"),
            Rule::AlphaNumUnicode => write!(f, "{field} must contain letters or numbers only"),
            Rule::PrintAscii => write!(f, "{field} must contain printable ASCII characters only"),
            Rule::Alpha => write!(f, "{field} must contain alphabetic characters only"),
            Rule::UppercaseAlpha => write!(f, "{field} must contain uppercase letters only"),
            Rule::Numeric => write!(f, "{field} must contain digits only"),
            Rule::Len(n) => write!(f, "{field} must be {n} characters"),
            Rule::Max(n) => write!(f, "{field} must be at most {n} characters"),
            Rule::Gt(n) => write!(f, "{field} must be greater than {n}"),
            Rule::Gte(n) => write!(f, "{field} must be greater than or equal to {n}"),
            Rule::E164 => write!(f, "{field} must be a valid phone in E.164 format"),
            Rule::Email => write!(f, "{field} must be a valid email"),
            Rule::MinItems(n) => write!(f, "{field} must have at least {n} items"),
        }
    }
}

/// Aggregated validation failure for one order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("order validation failed: {}", join_violations(.violations))]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Returns `true` if `field` failed with any rule.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// Returns the rule `field` failed with, if any.
    pub fn rule_for(&self, field: &str) -> Option<Rule> {
        self.violations
            .iter()
            .find(|v| v.field == field)
            .map(|v| v.rule)
    }
}

/// Character classes a text field may be restricted to.
#[derive(Debug, Clone, Copy)]
enum Charset {
    PrintAscii,
    AlphaNumUnicode,
    Alpha,
    UppercaseAlpha,
    Numeric,
}

impl Charset {
    fn accepts(self, value: &str) -> bool {
        match self {
            Self::PrintAscii => value.chars().all(|c| (' '..='~').contains(&c)),
            Self::AlphaNumUnicode => value.chars().all(char::is_alphanumeric),
            Self::Alpha => value.chars().all(|c| c.is_ascii_alphabetic()),
            Self::UppercaseAlpha => value.chars().all(|c| c.is_ascii_uppercase()),
            Self::Numeric => value.chars().all(|c| c.is_ascii_digit()),
        }
    }

    fn rule(self) -> Rule {
        match self {
            Self::PrintAscii => Rule::PrintAscii,
            Self::AlphaNumUnicode => Rule::AlphaNumUnicode,
            Self::Alpha => Rule::Alpha,
            Self::UppercaseAlpha => Rule::UppercaseAlpha,
            Self::Numeric => Rule::Numeric,
        }
    }
}

/// Pure semantic validator for decoded orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderValidator;

impl OrderValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates an order, aggregating every failing field.
    pub fn validate_order(&self, order: &Order) -> Result<(), ValidationError> {
        let mut checker = Checker::default();

        checker.text("order_uid", &order.order_uid, Charset::AlphaNumUnicode, 64);
        checker.text("track_number", &order.track_number, Charset::PrintAscii, 64);
        checker.text("entry", &order.entry, Charset::PrintAscii, 32);
        checker.scoped("delivery", |c| c.delivery(&order.delivery));
        checker.scoped("payment", |c| c.payment(&order.payment));

        if order.items.is_empty() {
            checker.fail("items", Rule::MinItems(1));
        }
        for (idx, item) in order.items.iter().enumerate() {
            checker.scoped(&format!("items[{idx}]"), |c| c.item(item));
        }

        checker.exact("locale", &order.locale, Charset::Alpha, 2);
        checker.optional_text(
            "internal_signature",
            &order.internal_signature,
            Charset::PrintAscii,
            128,
        );
        checker.text("customer_id", &order.customer_id, Charset::PrintAscii, 64);
        checker.text(
            "delivery_service",
            &order.delivery_service,
            Charset::PrintAscii,
            64,
        );
        checker.digits("shardkey", &order.shardkey);
        checker.gte("sm_id", order.sm_id, 0);
        if order.date_created.is_none() {
            checker.fail("date_created", Rule::Required);
        }
        checker.digits("oof_shard", &order.oof_shard);

        checker.finish()
    }
}

#[derive(Default)]
struct Checker {
    prefix: String,
    violations: Vec<FieldViolation>,
}

impl Checker {
    fn path(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.prefix)
        }
    }

    fn fail(&mut self, name: &str, rule: Rule) {
        let field = self.path(name);
        self.violations.push(FieldViolation { field, rule });
    }

    fn scoped(&mut self, name: &str, f: impl FnOnce(&mut Self)) {
        let outer = std::mem::take(&mut self.prefix);
        self.prefix = if outer.is_empty() {
            name.to_string()
        } else {
            format!("{outer}.{name}")
        };
        f(self);
        self.prefix = outer;
    }

    /// Required text restricted to `charset` and at most `max` characters.
    fn text(&mut self, name: &str, value: &str, charset: Charset, max: usize) {
        if value.is_empty() {
            self.fail(name, Rule::Required);
        } else {
            self.shape(name, value, charset, max);
        }
    }

    /// Like [`Checker::text`] but an empty value is accepted.
    fn optional_text(&mut self, name: &str, value: &str, charset: Charset, max: usize) {
        if !value.is_empty() {
            self.shape(name, value, charset, max);
        }
    }

    fn shape(&mut self, name: &str, value: &str, charset: Charset, max: usize) {
        if !charset.accepts(value) {
            self.fail(name, charset.rule());
        } else if value.chars().count() > max {
            self.fail(name, Rule::Max(max));
        }
    }

    /// Required text of exactly `len` characters.
    fn exact(&mut self, name: &str, value: &str, charset: Charset, len: usize) {
        if value.is_empty() {
            self.fail(name, Rule::Required);
        } else if !charset.accepts(value) {
            self.fail(name, charset.rule());
        } else if value.chars().count() != len {
            self.fail(name, Rule::Len(len));
        }
    }

    fn digits(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.fail(name, Rule::Required);
        } else if !Charset::Numeric.accepts(value) {
            self.fail(name, Rule::Numeric);
        }
    }

    fn matching(&mut self, name: &str, value: &str, pattern: &Regex, rule: Rule) {
        if value.is_empty() {
            self.fail(name, Rule::Required);
        } else if !pattern.is_match(value) {
            self.fail(name, rule);
        }
    }

    fn gt(&mut self, name: &str, value: i64, bound: i64) {
        if value <= bound {
            self.fail(name, Rule::Gt(bound));
        }
    }

    fn gte(&mut self, name: &str, value: i64, bound: i64) {
        if value < bound {
            self.fail(name, Rule::Gte(bound));
        }
    }

    fn delivery(&mut self, d: &Delivery) {
        self.text("name", &d.name, Charset::PrintAscii, 128);
        self.matching("phone", &d.phone, &E164, Rule::E164);
        self.digits("zip", &d.zip);
        self.text("city", &d.city, Charset::PrintAscii, 128);
        self.text("address", &d.address, Charset::PrintAscii, 256);
        self.text("region", &d.region, Charset::PrintAscii, 128);
        self.matching("email", &d.email, &EMAIL, Rule::Email);
    }

    fn payment(&mut self, p: &Payment) {
        self.text("transaction", &p.transaction, Charset::AlphaNumUnicode, 64);
        self.optional_text("request_id", &p.request_id, Charset::PrintAscii, 64);
        self.exact("currency", &p.currency, Charset::UppercaseAlpha, 3);
        self.text("provider", &p.provider, Charset::PrintAscii, 64);
        self.gt("amount", p.amount, 0);
        self.gt("payment_dt", p.payment_dt, 0);
        self.text("bank", &p.bank, Charset::PrintAscii, 64);
        self.gte("delivery_cost", p.delivery_cost, 0);
        self.gte("goods_total", p.goods_total, 0);
        self.gte("custom_fee", p.custom_fee, 0);
    }

    fn item(&mut self, it: &Item) {
        self.gt("chrt_id", it.chrt_id, 0);
        self.text("track_number", &it.track_number, Charset::PrintAscii, 64);
        self.gte("price", it.price, 0);
        self.text("rid", &it.rid, Charset::PrintAscii, 64);
        self.text("name", &it.name, Charset::PrintAscii, 128);
        self.gte("sale", it.sale, 0);
        self.text("size", &it.size, Charset::PrintAscii, 32);
        self.gte("total_price", it.total_price, 0);
        self.gt("nm_id", it.nm_id, 0);
        self.text("brand", &it.brand, Charset::PrintAscii, 128);
        self.gte("status", it.status, 0);
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                violations: self.violations,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::sample_order;

    fn validate(order: &Order) -> Result<(), ValidationError> {
        OrderValidator::new().validate_order(order)
    }

    #[test]
    fn test_sample_order_is_valid() {
        assert!(validate(&sample_order("ORDER1")).is_ok());
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut order = sample_order("ORDER1");
        order.items.clear();

        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("items"), Some(Rule::MinItems(1)));
        assert_eq!(err.violations().len(), 1);
    }

    #[test]
    fn test_violations_are_aggregated() {
        let mut order = sample_order("ORDER1");
        order.delivery.name.clear();
        order.payment.transaction.clear();
        order.payment.amount = 0;
        order.items[0].price = -1;

        let err = validate(&order).unwrap_err();
        assert_eq!(err.violations().len(), 4);
        assert_eq!(err.rule_for("delivery.name"), Some(Rule::Required));
        assert_eq!(err.rule_for("payment.transaction"), Some(Rule::Required));
        assert_eq!(err.rule_for("payment.amount"), Some(Rule::Gt(0)));
        assert_eq!(err.rule_for("items[0].price"), Some(Rule::Gte(0)));

        let msg = err.to_string();
        assert!(msg.starts_with("order validation failed: "));
        assert!(msg.contains("delivery.name is required; "));
        assert!(msg.contains("items[0].price must be greater than or equal to 0"));
    }

    #[test]
    fn test_default_order_reports_every_required_field() {
        let err = validate(&Order::default()).unwrap_err();
        for field in [
            "order_uid",
            "track_number",
            "delivery.phone",
            "delivery.email",
            "payment.currency",
            "payment.payment_dt",
            "items",
            "locale",
            "date_created",
            "oof_shard",
        ] {
            assert!(err.has_field(field), "missing violation for {field}");
        }
        assert!(!err.has_field("internal_signature"));
        assert!(!err.has_field("payment.request_id"));
    }

    #[test]
    fn test_currency_format() {
        let mut order = sample_order("ORDER1");
        order.payment.currency = "usd".into();
        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("payment.currency"), Some(Rule::UppercaseAlpha));

        order.payment.currency = "USDT".into();
        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("payment.currency"), Some(Rule::Len(3)));

        order.payment.currency = "U1D".into();
        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("payment.currency"), Some(Rule::UppercaseAlpha));
    }

    #[test]
    fn test_phone_must_be_e164() {
        let mut order = sample_order("ORDER1");
        for bad in [
            "89001234567",
            "+12",
            "+123456",
            "+1234567890123456",
            "+1 900 123 45 67",
        ] {
            order.delivery.phone = bad.into();
            let err = validate(&order).unwrap_err();
            assert_eq!(err.rule_for("delivery.phone"), Some(Rule::E164), "{bad}");
        }
        for good in ["+9720000000", "+1234567", "+0123456789"] {
            order.delivery.phone = good.into();
            assert!(validate(&order).is_ok(), "{good}");
        }
    }

    #[test]
    fn test_null_required_field_reported_as_required() {
        let mut value = serde_json::to_value(sample_order("ORDER1")).unwrap();
        value["order_uid"] = serde_json::Value::Null;
        value["payment"]["request_id"] = serde_json::Value::Null;
        let order = Order::decode(&serde_json::to_vec(&value).unwrap()).unwrap();

        let err = validate(&order).unwrap_err();
        assert_eq!(err.violations().len(), 1);
        assert_eq!(err.rule_for("order_uid"), Some(Rule::Required));
    }

    #[test]
    fn test_email_format() {
        let mut order = sample_order("ORDER1");
        for bad in ["john", "john@", "@example.com", "john@example"] {
            order.delivery.email = bad.into();
            let err = validate(&order).unwrap_err();
            assert_eq!(err.rule_for("delivery.email"), Some(Rule::Email), "{bad}");
        }
    }

    #[test]
    fn test_max_length_counts_characters() {
        let mut order = sample_order("ORDER1");
        order.delivery.name = "a".repeat(128);
        assert!(validate(&order).is_ok());

        order.delivery.name = "a".repeat(129);
        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("delivery.name"), Some(Rule::Max(128)));
    }

    #[test]
    fn test_charset_checked_before_length() {
        let mut order = sample_order("ORDER1");
        order.track_number = "Ж".repeat(100);
        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("track_number"), Some(Rule::PrintAscii));
    }

    #[test]
    fn test_optional_fields_still_checked_when_present() {
        let mut order = sample_order("ORDER1");
        order.internal_signature = "sig\u{7}".into();
        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("internal_signature"), Some(Rule::PrintAscii));
    }

    #[test]
    fn test_order_uid_accepts_unicode_letters() {
        let mut order = sample_order("ORDER1");
        order.order_uid = "заказ42".into();
        assert!(validate(&order).is_ok());

        order.order_uid = "order-42".into();
        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("order_uid"), Some(Rule::AlphaNumUnicode));
    }

    #[test]
    fn test_item_paths_are_indexed() {
        let mut order = sample_order("ORDER1");
        let mut second = order.items[0].clone();
        second.nm_id = 0;
        second.size.clear();
        order.items.push(second);

        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("items[1].nm_id"), Some(Rule::Gt(0)));
        assert_eq!(err.rule_for("items[1].size"), Some(Rule::Required));
        assert!(!err.has_field("items[0].nm_id"));
    }

    #[test]
    fn test_shardkey_digits_only() {
        let mut order = sample_order("ORDER1");
        order.shardkey = "9a".into();
        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("shardkey"), Some(Rule::Numeric));
    }

    #[test]
    fn test_locale_exact_length() {
        let mut order = sample_order("ORDER1");
        order.locale = "eng".into();
        let err = validate(&order).unwrap_err();
        assert_eq!(err.rule_for("locale"), Some(Rule::Len(2)));
    }
}
