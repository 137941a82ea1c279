//! The advanced search query builder.
//!
//! A [`Search`] is an ordered set of named predicates. Adding a predicate under a name that is already
//! present replaces it without moving it, so the serialized order is always the order names were first
//! added in.

use chrono::{DateTime, TimeZone, Utc};
use indexmap::{map::Entry, IndexMap};
use quick_xml::escape::escape;
use std::sync::Arc;

use crate::decimal::Decimal;

/// The wire format of timestamps inside a search.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Matches a text attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextPredicate {
    /// The exact value.
    pub is: Option<String>,

    /// A value to exclude.
    pub is_not: Option<String>,

    /// A required prefix.
    pub starts_with: Option<String>,

    /// A required suffix.
    pub ends_with: Option<String>,

    /// A required substring.
    pub contains: Option<String>,
}

impl TextPredicate {
    /// Matches the value exactly.
    pub fn is(&mut self, value: impl Into<String>) -> &mut Self {
        self.is = Some(value.into());
        self
    }

    /// Excludes the value.
    pub fn is_not(&mut self, value: impl Into<String>) -> &mut Self {
        self.is_not = Some(value.into());
        self
    }

    /// Requires a prefix.
    pub fn starts_with(&mut self, value: impl Into<String>) -> &mut Self {
        self.starts_with = Some(value.into());
        self
    }

    /// Requires a suffix.
    pub fn ends_with(&mut self, value: impl Into<String>) -> &mut Self {
        self.ends_with = Some(value.into());
        self
    }

    /// Requires a substring.
    pub fn contains(&mut self, value: impl Into<String>) -> &mut Self {
        self.contains = Some(value.into());
        self
    }
}

/// Matches a numeric attribute such as an amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RangePredicate {
    /// The exact value.
    pub is: Option<Decimal>,

    /// The inclusive lower bound.
    pub min: Option<Decimal>,

    /// The inclusive upper bound.
    pub max: Option<Decimal>,
}

impl RangePredicate {
    /// Matches the value exactly.
    pub fn is(&mut self, value: Decimal) -> &mut Self {
        self.is = Some(value);
        self
    }

    pub fn min(&mut self, value: Decimal) -> &mut Self {
        self.min = Some(value);
        self
    }

    pub fn max(&mut self, value: Decimal) -> &mut Self {
        self.max = Some(value);
        self
    }
}

/// Matches a timestamp attribute. Bounds are stored in UTC, whatever zone they were given in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimePredicate {
    /// The exact instant.
    pub is: Option<DateTime<Utc>>,

    /// The inclusive lower bound.
    pub min: Option<DateTime<Utc>>,

    /// The inclusive upper bound.
    pub max: Option<DateTime<Utc>>,
}

impl TimePredicate {
    /// Matches the instant exactly.
    pub fn is<Tz: TimeZone>(&mut self, value: DateTime<Tz>) -> &mut Self {
        self.is = Some(value.with_timezone(&Utc));
        self
    }

    pub fn min<Tz: TimeZone>(&mut self, value: DateTime<Tz>) -> &mut Self {
        self.min = Some(value.with_timezone(&Utc));
        self
    }

    pub fn max<Tz: TimeZone>(&mut self, value: DateTime<Tz>) -> &mut Self {
        self.max = Some(value.with_timezone(&Utc));
        self
    }
}

/// Matches an attribute against any of a list of values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultiPredicate {
    /// The accepted values, in the order they are sent.
    pub items: Vec<String>,
}

impl MultiPredicate {
    /// Replaces the accepted values.
    pub fn items<I, S>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self
    }
}

/// A single search condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    Text(TextPredicate),
    Range(RangePredicate),
    Time(TimePredicate),
    Multi(MultiPredicate),
}

/// An advanced search query.
///
/// Cloning is shallow: the clone shares every predicate with the original until either side modifies it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Search {
    predicates: IndexMap<String, Arc<Predicate>>,
}

impl Search {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a text predicate, replacing any predicate with the same name.
    pub fn add_text(&mut self, name: &str) -> &mut TextPredicate {
        match self.install(name, Predicate::Text(TextPredicate::default())) {
            Predicate::Text(predicate) => predicate,
            _ => unreachable!("a text predicate was just installed"),
        }
    }

    /// Adds a range predicate, replacing any predicate with the same name.
    pub fn add_range(&mut self, name: &str) -> &mut RangePredicate {
        match self.install(name, Predicate::Range(RangePredicate::default())) {
            Predicate::Range(predicate) => predicate,
            _ => unreachable!("a range predicate was just installed"),
        }
    }

    /// Adds a time predicate, replacing any predicate with the same name.
    pub fn add_time(&mut self, name: &str) -> &mut TimePredicate {
        match self.install(name, Predicate::Time(TimePredicate::default())) {
            Predicate::Time(predicate) => predicate,
            _ => unreachable!("a time predicate was just installed"),
        }
    }

    /// Adds a multi-value predicate, replacing any predicate with the same name.
    pub fn add_multi(&mut self, name: &str) -> &mut MultiPredicate {
        match self.install(name, Predicate::Multi(MultiPredicate::default())) {
            Predicate::Multi(predicate) => predicate,
            _ => unreachable!("a multi predicate was just installed"),
        }
    }

    /// A copy of this query that shares its predicates.
    pub fn shallow_copy(&self) -> Self {
        self.clone()
    }

    /// The number of predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// The predicate with the given name.
    pub fn get(&self, name: &str) -> Option<&Predicate> {
        self.predicates.get(name).map(Arc::as_ref)
    }

    /// The predicate with the given name, unshared from any copies first.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Predicate> {
        self.predicates.get_mut(name).map(Arc::make_mut)
    }

    /// The predicate names in serialization order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    /// Serializes the query as a `<search>` document.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<search>");
        for (name, predicate) in &self.predicates {
            match predicate.as_ref() {
                Predicate::Text(text) => {
                    open(&mut out, name, None);
                    let fields = [
                        ("is", &text.is),
                        ("is-not", &text.is_not),
                        ("starts-with", &text.starts_with),
                        ("ends-with", &text.ends_with),
                        ("contains", &text.contains),
                    ];
                    for (field, value) in fields {
                        if let Some(value) = value {
                            leaf(&mut out, field, None, value);
                        }
                    }
                }
                Predicate::Range(range) => {
                    open(&mut out, name, None);
                    for (field, value) in [("is", range.is), ("min", range.min), ("max", range.max)] {
                        if let Some(value) = value {
                            leaf(&mut out, field, None, &value.to_string());
                        }
                    }
                }
                Predicate::Time(time) => {
                    open(&mut out, name, None);
                    for (field, value) in [("is", time.is), ("min", time.min), ("max", time.max)] {
                        if let Some(value) = value {
                            leaf(&mut out, field, Some("datetime"), &value.format(TIME_FORMAT).to_string());
                        }
                    }
                }
                Predicate::Multi(multi) => {
                    open(&mut out, name, Some("array"));
                    for item in &multi.items {
                        leaf(&mut out, "item", None, item);
                    }
                }
            }
            close(&mut out, name);
        }
        out.push_str("</search>");
        out
    }

    fn install(&mut self, name: &str, predicate: Predicate) -> &mut Predicate {
        let slot = match self.predicates.entry(name.to_string()) {
            // Replacing keeps the original position.
            Entry::Occupied(mut entry) => {
                entry.insert(Arc::new(predicate));
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(Arc::new(predicate)),
        };
        Arc::make_mut(slot)
    }
}

fn open(out: &mut String, name: &str, kind: Option<&str>) {
    out.push('<');
    out.push_str(name);
    if let Some(kind) = kind {
        out.push_str(" type=\"");
        out.push_str(kind);
        out.push('"');
    }
    out.push('>');
}

fn close(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn leaf(out: &mut String, name: &str, kind: Option<&str>, text: &str) {
    open(out, name, kind);
    out.push_str(&escape(text));
    close(out, name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn serializes_every_predicate_kind() {
        let mut search = Search::new();
        search.add_text("customer-first-name").is("A").is_not("B").starts_with("C").ends_with("D").contains("E");
        search.add_range("amount").is(Decimal::new(1501, 2)).min(Decimal::new(1001, 2)).max(Decimal::new(2001, 2));

        let start = Utc.with_ymd_and_hms(2016, 9, 11, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2016, 9, 11, 23, 59, 59).unwrap();
        search.add_time("settled-at").min(start).max(end);
        search.add_time("created-at").min(start);
        search.add_multi("status").items(["authorized", "submitted_for_settlement", "settled"]);

        let expected = concat!(
            "<search>",
            "<customer-first-name>",
            "<is>A</is><is-not>B</is-not><starts-with>C</starts-with><ends-with>D</ends-with><contains>E</contains>",
            "</customer-first-name>",
            "<amount><is>15.01</is><min>10.01</min><max>20.01</max></amount>",
            "<settled-at>",
            r#"<min type="datetime">2016-09-11T00:00:00Z</min><max type="datetime">2016-09-11T23:59:59Z</max>"#,
            "</settled-at>",
            r#"<created-at><min type="datetime">2016-09-11T00:00:00Z</min></created-at>"#,
            r#"<status type="array"><item>authorized</item><item>submitted_for_settlement</item><item>settled</item></status>"#,
            "</search>",
        );
        assert_eq!(search.to_xml(), expected);
    }

    #[test]
    fn omits_unset_fields() {
        let mut search = Search::new();
        search.add_text("id");
        search.add_range("amount").max(Decimal::ZERO);
        search.add_multi("ids");
        assert_eq!(search.to_xml(), r#"<search><id></id><amount><max>0</max></amount><ids type="array"></ids></search>"#);
        assert_eq!(Search::new().to_xml(), "<search></search>");
    }

    #[test]
    fn converts_times_to_utc() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        let mut search = Search::new();
        search.add_time("created-at").is(zone.with_ymd_and_hms(2016, 9, 11, 1, 30, 0).unwrap());
        assert_eq!(
            search.to_xml(),
            r#"<search><created-at><is type="datetime">2016-09-10T23:30:00Z</is></created-at></search>"#
        );
    }

    #[test]
    fn escapes_text() {
        let mut search = Search::new();
        search.add_text("order-id").is("fish & <chips>");
        search.add_multi("ids").items(["a\"b"]);
        assert_eq!(
            search.to_xml(),
            r#"<search><order-id><is>fish &amp; &lt;chips&gt;</is></order-id><ids type="array"><item>a&quot;b</item></ids></search>"#
        );
    }

    #[test]
    fn replaces_in_place() {
        let mut search = Search::new();
        search.add_text("x").is("first");
        search.add_text("y").is("second");
        search.add_range("x").min(Decimal::new(1, 0));

        assert_eq!(search.names().collect::<Vec<_>>(), ["x", "y"]);
        assert_eq!(search.len(), 2);
        assert!(matches!(search.get("x"), Some(Predicate::Range(range)) if range.min == Some(Decimal::new(1, 0))));
        assert_eq!(search.to_xml(), "<search><x><min>1</min></x><y><is>second</is></y></search>");
    }

    #[test]
    fn shallow_copies_do_not_affect_the_original() {
        let mut original = Search::new();
        original.add_text("customer-id").is("c1");
        original.add_range("amount").min(Decimal::new(5, 0));

        let mut copy = original.shallow_copy();
        copy.add_multi("ids").items(["1", "2"]);
        if let Some(Predicate::Range(range)) = copy.get_mut("amount") {
            range.min(Decimal::new(7, 0));
        }

        assert!(Arc::ptr_eq(&original.predicates["customer-id"], &copy.predicates["customer-id"]));
        assert!(!Arc::ptr_eq(&original.predicates["amount"], &copy.predicates["amount"]));
        assert_eq!(original.names().collect::<Vec<_>>(), ["customer-id", "amount"]);
        assert_eq!(copy.names().collect::<Vec<_>>(), ["customer-id", "amount", "ids"]);
        assert_eq!(original.to_xml(), "<search><customer-id><is>c1</is></customer-id><amount><min>5</min></amount></search>");
        assert!(copy.to_xml().contains("<amount><min>7</min></amount>"));
    }

    #[test]
    fn searches_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Search>();
    }
}
