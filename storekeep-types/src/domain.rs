use crate::errors::{Field, ValidationError};
use crate::validation::no_control_characters;
use nutype::nutype;

/// Store identifier domain type.
///
/// Store identifiers are assigned by the relational store on insert, so no
/// validation is applied beyond the integer type itself.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    Serialize,
    Deserialize
))]
pub struct StoreId(i32);

/// Manager identifier domain type.
///
/// Manager identifiers are supplied by the administrator when a manager is
/// registered and act as the document key in the manager collection. They are
/// also the foreign reference held by `store.mgrid`, which is why both
/// datastores must agree on the exact same normalized form:
/// - Sanitized (leading/trailing whitespace removed)
/// - Non-empty and at most 64 characters
/// - Free of control characters
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 64, predicate = no_control_characters),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ManagerId(String);

/// Product identifier domain type.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 32, predicate = no_control_characters),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ProductId(String);

/// Store location as entered on the store forms.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255, predicate = no_control_characters),
    derive(Debug, Clone, PartialEq, Eq, AsRef, Deref, Display)
)]
pub struct Location(String);

/// Manager display name.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 255, predicate = no_control_characters),
    derive(Debug, Clone, PartialEq, Eq, AsRef, Deref, Display)
)]
pub struct ManagerName(String);

/// Manager salary.
///
/// Salaries are stored as numbers in the manager collection. They must be
/// finite and non-negative; there is no sentinel value for "unknown".
#[nutype(
    validate(finite, greater_or_equal = 0.0),
    derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display, Serialize, Deserialize)
)]
pub struct Salary(f64);

impl Salary {
    /// Parse a salary from raw form input.
    ///
    /// Non-numeric input is rejected rather than coerced.
    ///
    /// # Example
    ///
    /// ```ignore
    /// assert!(Salary::parse("52000").is_ok());
    /// assert!(Salary::parse("lots").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let value: f64 = trimmed.parse().map_err(|_| ValidationError::InvalidField {
            field: Field::Salary,
            reason: format!("'{trimmed}' is not a number"),
        })?;

        Self::try_new(value).map_err(|error| ValidationError::InvalidField {
            field: Field::Salary,
            reason: error.to_string(),
        })
    }
}

/// A row of the `store` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    /// Primary key.
    pub id: StoreId,
    /// Free-text location.
    pub location: String,
    /// Assigned manager, if any.
    pub manager_id: Option<ManagerId>,
}

/// One line of the product listing: a product joined with a store that
/// sells it. Products sold nowhere appear once with the store columns empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductListing {
    /// Product key.
    pub product_id: ProductId,
    /// Product description.
    pub description: String,
    /// Store selling the product.
    pub store_id: Option<StoreId>,
    /// Location of that store.
    pub location: Option<String>,
    /// Price the store sells the product at.
    pub price: Option<f64>,
}

/// A document of the manager collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Manager {
    /// Document key.
    pub id: ManagerId,
    /// Display name.
    pub name: String,
    /// Salary.
    pub salary: Salary,
}

/// Proposed values for creating or editing a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreProposal {
    /// New location.
    pub location: Location,
    /// New manager; `None` leaves the store without a manager.
    pub manager_id: Option<ManagerId>,
}

impl StoreProposal {
    /// Build a proposal from the raw `location` and `mgrid` form fields.
    ///
    /// A blank `mgrid` means "no manager".
    pub fn parse(location: &str, manager_id: &str) -> Result<Self, ValidationError> {
        let location = Location::try_new(location).map_err(|error| {
            ValidationError::InvalidField {
                field: Field::Location,
                reason: error.to_string(),
            }
        })?;

        let manager_id = if manager_id.trim().is_empty() {
            None
        } else {
            Some(parse_manager_id(manager_id)?)
        };

        Ok(Self {
            location,
            manager_id,
        })
    }
}

/// A manager to be registered in the manager collection.
#[derive(Debug, Clone, PartialEq)]
pub struct NewManager {
    /// Requested document key.
    pub id: ManagerId,
    /// Display name.
    pub name: ManagerName,
    /// Salary.
    pub salary: Salary,
}

impl NewManager {
    /// Build a manager from the raw `managerId`, `name` and `salary` form fields.
    pub fn parse(id: &str, name: &str, salary: &str) -> Result<Self, ValidationError> {
        let id = parse_manager_id(id)?;
        let name = ManagerName::try_new(name).map_err(|error| ValidationError::InvalidField {
            field: Field::ManagerName,
            reason: error.to_string(),
        })?;
        let salary = Salary::parse(salary)?;

        Ok(Self { id, name, salary })
    }
}

fn parse_manager_id(raw: &str) -> Result<ManagerId, ValidationError> {
    ManagerId::try_new(raw).map_err(|error| ValidationError::InvalidField {
        field: Field::ManagerId,
        reason: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn manager_id_is_trimmed() {
        let id = ManagerId::try_new("  M001 ").expect("valid manager id");

        assert_eq!(id.as_ref(), "M001");
    }

    #[test]
    fn manager_id_rejects_blank_input() {
        assert!(ManagerId::try_new("   ").is_err());
    }

    #[test]
    fn proposal_with_blank_manager_has_no_manager() {
        let proposal = StoreProposal::parse("Galway", "  ").expect("valid proposal");

        assert_eq!(proposal.location.as_ref(), "Galway");
        assert_eq!(proposal.manager_id, None);
    }

    #[test]
    fn proposal_rejects_blank_location() {
        let error = StoreProposal::parse(" ", "M001").expect_err("blank location rejected");

        assert!(matches!(
            error,
            ValidationError::InvalidField {
                field: Field::Location,
                ..
            }
        ));
    }

    #[test]
    fn proposal_rejects_overlong_manager_id() {
        let error = StoreProposal::parse("Cork", &"M".repeat(65)).expect_err("too long");

        assert!(matches!(
            error,
            ValidationError::InvalidField {
                field: Field::ManagerId,
                ..
            }
        ));
    }

    #[test]
    fn salary_parses_integers_and_decimals() {
        assert_eq!(
            Salary::parse("52000").expect("integer salary").into_inner(),
            52000.0
        );
        assert_eq!(
            Salary::parse(" 41000.50 ")
                .expect("decimal salary")
                .into_inner(),
            41000.5
        );
    }

    #[test]
    fn salary_rejects_non_numeric_input() {
        let error = Salary::parse("lots").expect_err("non-numeric salary rejected");

        assert_eq!(
            error,
            ValidationError::InvalidField {
                field: Field::Salary,
                reason: "'lots' is not a number".to_string(),
            }
        );
    }

    #[test]
    fn salary_rejects_negative_and_non_finite_values() {
        assert!(Salary::parse("-1").is_err());
        assert!(Salary::parse("NaN").is_err());
        assert!(Salary::parse("inf").is_err());
    }

    #[test]
    fn new_manager_reports_first_invalid_field() {
        let error = NewManager::parse("M001", "", "abc").expect_err("blank name rejected");

        assert!(matches!(
            error,
            ValidationError::InvalidField {
                field: Field::ManagerName,
                ..
            }
        ));
    }

    #[test]
    fn identifiers_serialize_as_bare_values() {
        let manager_id = ManagerId::try_new("M001").expect("valid manager id");

        assert_eq!(
            serde_json::to_string(&manager_id).expect("serializes"),
            "\"M001\""
        );
        assert_eq!(
            serde_json::from_str::<StoreId>("12").expect("deserializes"),
            StoreId::new(12)
        );
    }

    #[test]
    fn deserialization_applies_manager_id_validation() {
        assert!(serde_json::from_str::<ManagerId>("\"  \"").is_err());
    }

    proptest! {
        #[test]
        fn any_non_negative_integer_salary_parses(value in 0u32..10_000_000) {
            let salary = Salary::parse(&value.to_string()).expect("integer salary parses");
            prop_assert_eq!(salary.into_inner(), f64::from(value));
        }
    }
}
