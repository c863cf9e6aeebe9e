//! Datatype inference for columns, XSD simple types and concept hints.
//!
//! Every function here is total: input that cannot be mapped resolves to
//! [`Datatype::String`].

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::types::Datatype;

/// Number of non-empty values sampled per CSV column.
pub const CSV_SAMPLE_SIZE: usize = 100;

/// An explicit constraint datatype wins over anything inferred.
pub fn resolve(explicit: Option<Datatype>, inferred: Datatype) -> Datatype {
    explicit.unwrap_or(inferred)
}

/// Infer the datatype of a column from its values.
///
/// The first [`CSV_SAMPLE_SIZE`] non-empty values are sampled. If all parse as
/// integer the result is `integer`, else if all parse as decimal `decimal`,
/// else if all are ISO-8601 dates `date`, else `string`. A column without any
/// value is `string`.
pub fn infer_column<'a, I>(values: I) -> Datatype
where
    I: IntoIterator<Item = &'a str>,
{
    let sample: Vec<&str> = values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .take(CSV_SAMPLE_SIZE)
        .collect();

    if sample.is_empty() {
        Datatype::String
    } else if sample.iter().all(|v| is_integer(v)) {
        Datatype::Integer
    } else if sample.iter().all(|v| is_decimal(v)) {
        Datatype::Decimal
    } else if sample.iter().all(|v| is_iso_date(v)) {
        Datatype::Date
    } else {
        Datatype::String
    }
}

pub fn is_integer(value: &str) -> bool {
    INTEGER_RE.is_match(value)
}

/// Plain decimal notation with `.` as separator; exponents are not accepted.
pub fn is_decimal(value: &str) -> bool {
    DECIMAL_RE.is_match(value)
}

/// A calendar-valid `YYYY-MM-DD` date.
pub fn is_iso_date(value: &str) -> bool {
    ISO_DATE_RE.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

/// Map a built-in XSD type (local name, without prefix) to its nearest
/// canonical datatype. Returns `None` for names that are not XSD built-ins.
pub fn xsd_builtin(local_name: &str) -> Option<Datatype> {
    let dt = match local_name {
        "string" | "normalizedString" | "token" | "language" | "Name" | "NCName"
        | "NMTOKEN" | "NMTOKENS" | "ID" | "IDREF" | "IDREFS" | "ENTITY" | "ENTITIES"
        | "QName" | "NOTATION" | "hexBinary" | "base64Binary" | "duration"
        | "gMonth" | "gDay" | "gMonthDay" | "gYearMonth" | "anySimpleType" => {
            Datatype::String
        }
        "boolean" => Datatype::Boolean,
        "integer" | "int" | "long" | "short" | "byte" | "nonNegativeInteger"
        | "positiveInteger" | "nonPositiveInteger" | "negativeInteger" | "unsignedLong"
        | "unsignedInt" | "unsignedShort" | "unsignedByte" => Datatype::Integer,
        "decimal" => Datatype::Decimal,
        "float" | "double" => Datatype::Double,
        "date" => Datatype::Date,
        "dateTime" | "dateTimeStamp" => Datatype::DateTime,
        "time" => Datatype::Time,
        "gYear" => Datatype::GYear,
        "anyURI" => Datatype::AnyUri,
        _ => return None,
    };
    Some(dt)
}

/// Map the value type of an I14Y concept (`String`, `Numeric`, `Date`,
/// `CodeList`, …) to a datatype.
pub fn from_concept_value_type(value_type: &str) -> Datatype {
    match value_type.to_ascii_lowercase().as_str() {
        "numeric" | "decimal" => Datatype::Decimal,
        "integer" => Datatype::Integer,
        "date" => Datatype::Date,
        "datetime" => Datatype::DateTime,
        "boolean" => Datatype::Boolean,
        _ => Datatype::String,
    }
}

static INTEGER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("invalid integer regex"));

static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").expect("invalid decimal regex")
});

static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("invalid date regex"));

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_wins() {
        assert_eq!(resolve(Some(Datatype::AnyUri), Datatype::Integer), Datatype::AnyUri);
        assert_eq!(resolve(None, Datatype::Integer), Datatype::Integer);
    }

    #[test]
    fn column_policy() {
        assert_eq!(infer_column(["34", "-29", "+1"]), Datatype::Integer);
        assert_eq!(infer_column(["3", "2.5", ".5"]), Datatype::Decimal);
        assert_eq!(infer_column(["1990-01-01", "1995-06-12"]), Datatype::Date);
        assert_eq!(infer_column(["Ann", "34"]), Datatype::String);
        assert_eq!(infer_column(["1990-02-30"]), Datatype::String);
        assert_eq!(infer_column(["NaN", "inf"]), Datatype::String);
        assert_eq!(infer_column(["1e5"]), Datatype::String);
    }

    #[test]
    fn empty_values_are_ignored() {
        assert_eq!(infer_column(["", "  ", "12"]), Datatype::Integer);
        assert_eq!(infer_column(["", " "]), Datatype::String);
        assert_eq!(infer_column(std::iter::empty::<&str>()), Datatype::String);
    }

    #[test]
    fn only_the_sample_is_inspected() {
        let mut values: Vec<&str> = vec!["7"; CSV_SAMPLE_SIZE];
        values.push("not a number");
        assert_eq!(infer_column(values), Datatype::Integer);
    }

    #[test]
    fn xsd_table() {
        assert_eq!(xsd_builtin("int"), Some(Datatype::Integer));
        assert_eq!(xsd_builtin("token"), Some(Datatype::String));
        assert_eq!(xsd_builtin("float"), Some(Datatype::Double));
        assert_eq!(xsd_builtin("dateTime"), Some(Datatype::DateTime));
        assert_eq!(xsd_builtin("anyURI"), Some(Datatype::AnyUri));
        assert_eq!(xsd_builtin("PostalCode"), None);
    }

    #[test]
    fn concept_value_types() {
        assert_eq!(from_concept_value_type("Numeric"), Datatype::Decimal);
        assert_eq!(from_concept_value_type("Date"), Datatype::Date);
        assert_eq!(from_concept_value_type("CodeList"), Datatype::String);
        assert_eq!(from_concept_value_type(""), Datatype::String);
    }
}
