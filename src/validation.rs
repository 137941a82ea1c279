//! The validation error tree carried by the gateway's error envelope.
//!
//! Errors nest the same way the failed request did: every object level holds its own list of errors plus
//! one child per nested object. Array elements appear as `index-N` children.

use indexmap::IndexMap;
use serde::{
    de::{self, IgnoredAny, MapAccess, Visitor},
    Deserialize, Deserializer,
};
use std::{fmt, sync::OnceLock};

/// The child element that holds the error list of an object.
const ERROR_LIST: &str = "errors";

/// A single validation failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawValidationError")]
pub struct ValidationError {
    /// The gateway's numeric error code, e.g. `81502`.
    pub code: String,

    /// The offending attribute, PascalCased, e.g. `MerchantAccountId`.
    pub attribute: String,

    /// A human readable description.
    pub message: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawValidationError {
    code: String,
    attribute: String,
    message: String,
}

impl From<RawValidationError> for ValidationError {
    fn from(raw: RawValidationError) -> Self {
        Self { code: raw.code, attribute: pascal_case(&raw.attribute), message: raw.message }
    }
}

#[derive(Default, Deserialize)]
struct ErrorList {
    #[serde(rename = "error", default)]
    errors: Vec<ValidationError>,
}

/// The validation errors reported for one object and, recursively, for the objects nested in it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    /// The PascalCased name of the object, e.g. `CreditCard`.
    pub object: String,

    /// The errors reported directly on this object.
    pub errors: Vec<ValidationError>,

    /// The nested objects, keyed by PascalCased name, in document order.
    pub children: IndexMap<String, ValidationErrors>,
}

impl ValidationErrors {
    /// The errors on this object only.
    pub fn all(&self) -> &[ValidationError] {
        &self.errors
    }

    /// The errors on this object followed by those of every nested object.
    pub fn all_deep(&self) -> Vec<ValidationError> {
        let mut errors = self.errors.clone();
        for child in self.children.values() {
            errors.extend(child.all_deep());
        }
        errors
    }

    /// The nested object with the given PascalCased name, or an empty node if there is none.
    pub fn for_object(&self, name: &str) -> &ValidationErrors {
        self.children.get(name).unwrap_or_else(|| empty())
    }

    /// The nested array element at index `i`.
    pub fn for_index(&self, i: usize) -> &ValidationErrors {
        self.for_object(&format!("Index{i}"))
    }

    /// The errors on this object for the given PascalCased attribute.
    pub fn on(&self, attribute: &str) -> Vec<ValidationError> {
        self.errors.iter().filter(|e| e.attribute == attribute).cloned().collect()
    }

    /// Whether neither this object nor any nested object has errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.children.values().all(ValidationErrors::is_empty)
    }

    pub(crate) fn named(mut self, object: impl Into<String>) -> Self {
        self.object = object.into();
        self
    }
}

fn empty() -> &'static ValidationErrors {
    static EMPTY: OnceLock<ValidationErrors> = OnceLock::new();
    EMPTY.get_or_init(ValidationErrors::default)
}

impl<'de> Deserialize<'de> for ValidationErrors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ValidationErrorsVisitor)
    }
}

struct ValidationErrorsVisitor;

impl<'de> Visitor<'de> for ValidationErrorsVisitor {
    type Value = ValidationErrors;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a validation errors element")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut node = ValidationErrors::default();
        while let Some(key) = map.next_key::<String>()? {
            if key.starts_with(['@', '$']) {
                // Attributes such as `type="array"` and stray text carry nothing.
                map.next_value::<IgnoredAny>()?;
            } else if key == ERROR_LIST {
                node.errors.extend(map.next_value::<ErrorList>()?.errors);
            } else {
                let name = pascal_case(&key);
                let child = map.next_value::<ValidationErrors>()?.named(name.clone());
                node.children.insert(name, child);
            }
        }
        Ok(node)
    }

    // An element with no children at all arrives as text.
    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(ValidationErrors::default())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(ValidationErrors::default())
    }
}

/// Converts a kebab-case or snake_case identifier to PascalCase, e.g. `line-items` to `LineItems`.
pub fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut capitalize_next = true;
    for c in name.chars() {
        if c == '-' || c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApiErrorResponse;
    use rstest::rstest;

    const ERROR_ENVELOPE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<api-error-response>
  <errors>
    <errors type="array"/>
    <transaction>
      <errors type="array">
        <error>
          <code>91560</code>
          <attribute type="symbol">base</attribute>
          <message>Transaction could not be held in escrow.</message>
        </error>
        <error>
          <code>81502</code>
          <attribute type="symbol">amount</attribute>
          <message>Amount is required.</message>
        </error>
        <error>
          <code>91526</code>
          <attribute type="symbol">custom_fields</attribute>
          <message>Custom field is invalid: store_me.</message>
        </error>
        <error>
          <code>91513</code>
          <attribute type="symbol">merchant_account_id</attribute>
          <message>Merchant account ID is invalid.</message>
        </error>
        <error>
          <code>915157</code>
          <attribute type="symbol">line_items</attribute>
          <message>Too many line items.</message>
        </error>
      </errors>
      <credit-card>
        <errors type="array">
          <error>
            <code>91708</code>
            <attribute type="symbol">base</attribute>
            <message>Cannot provide expiration_date if you are also providing expiration_month and expiration_year.</message>
          </error>
          <error>
            <code>81714</code>
            <attribute type="symbol">number</attribute>
            <message>Credit card number is required.</message>
          </error>
          <error>
            <code>81725</code>
            <attribute type="symbol">base</attribute>
            <message>Credit card must include either number or venmo_sdk_payment_method_code.</message>
          </error>
          <error>
            <code>81703</code>
            <attribute type="symbol">number</attribute>
            <message>Credit card type is not accepted by this merchant account.</message>
          </error>
        </errors>
      </credit-card>
      <customer>
        <errors type="array">
          <error>
            <code>81606</code>
            <attribute type="symbol">email</attribute>
            <message>Email is an invalid format.</message>
          </error>
        </errors>
      </customer>
      <line-items>
        <index-1>
          <errors type="array">
            <error>
              <code>95801</code>
              <attribute type="symbol">commodity_code</attribute>
              <message>Commodity code is too long.</message>
            </error>
          </errors>
        </index-1>
        <index-3>
          <errors type="array">
            <error>
              <code>95803</code>
              <attribute type="symbol">description</attribute>
              <message>Description is too long.</message>
            </error>
            <error>
              <code>95809</code>
              <attribute type="symbol">product_code</attribute>
              <message>Product code is too long.</message>
            </error>
          </errors>
        </index-3>
      </line-items>
    </transaction>
  </errors>
  <message>Everything is broken!</message>
</api-error-response>"#;

    fn envelope() -> ApiErrorResponse {
        quick_xml::de::from_str(ERROR_ENVELOPE).expect("valid envelope")
    }

    #[test]
    fn decodes_every_error() {
        let envelope = envelope();
        assert_eq!(envelope.message, "Everything is broken!");
        assert_eq!(envelope.errors.all_deep().len(), 13);
        assert!(envelope.errors.all().is_empty());
    }

    #[test]
    fn looks_up_nested_objects() {
        let errors = envelope().errors;
        let transaction = errors.for_object("Transaction");

        let credit_card = transaction.for_object("CreditCard");
        assert_eq!(credit_card.object, "CreditCard");
        assert_eq!(credit_card.all().len(), 4);
        assert_eq!(credit_card.on("Number").len(), 2);

        assert_eq!(transaction.for_object("Customer").all().len(), 1);
        assert_eq!(transaction.all().len(), 5);
        assert_eq!(transaction.on("Base").len(), 1);
        assert_eq!(transaction.on("LineItems").len(), 1);

        let commodity = transaction.for_object("LineItems").for_index(1).on("CommodityCode");
        assert_eq!(commodity.len(), 1);
        assert_eq!(commodity[0].code, "95801");
        assert_eq!(commodity[0].attribute, "CommodityCode");
        assert_eq!(commodity[0].message, "Commodity code is too long.");

        assert_eq!(transaction.for_object("LineItems").for_index(3).on("Description").len(), 1);
    }

    #[test]
    fn keeps_children_in_document_order() {
        let errors = envelope().errors;
        let names: Vec<_> = errors.for_object("Transaction").children.keys().cloned().collect();
        assert_eq!(names, ["CreditCard", "Customer", "LineItems"]);

        let codes: Vec<_> = errors.all_deep().into_iter().map(|e| e.code).collect();
        assert_eq!(codes[..6], ["91560", "81502", "91526", "91513", "915157", "91708"]);
    }

    #[test]
    fn missing_objects_are_empty() {
        let errors = envelope().errors;
        let missing = errors.for_object("Transaction").for_object("Nope").for_index(7);
        assert!(missing.all().is_empty());
        assert!(missing.all_deep().is_empty());
        assert!(missing.on("Base").is_empty());
        assert!(missing.is_empty());
        assert!(!errors.is_empty());
    }

    #[rstest]
    #[case("amount", "Amount")]
    #[case("index_1", "Index1")]
    #[case("index_123", "Index123")]
    #[case("commodity_code", "CommodityCode")]
    #[case("line-items", "LineItems")]
    #[case("index-1", "Index1")]
    #[case("commodity-code", "CommodityCode")]
    #[case("", "")]
    fn converts_to_pascal_case(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(pascal_case(name), expected);
    }
}
