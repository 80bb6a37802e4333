//! # Attribute Resolution
//!
//! Turns a condition's field reference into a typed value read off an
//! [`AttributeSource`]. Built-in fields are read directly from the source;
//! anything else is treated as a custom attribute reference and, when a
//! [`Catalog`] is supplied, resolved by definition id or name and checked
//! against the declared type.
//!
//! Resolution never fails. An unknown name, a missing value, or a field the
//! source does not carry all come back as absent.

use lpe_core::{AttributeType, AttributeValue, Catalog, LicenseRecord};

// ─── Built-in Fields ─────────────────────────────────────────────────

/// Fields every license carries, addressable from rules by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinField {
    /// `id`
    Id,
    /// `key`
    Key,
    /// `name`
    Name,
    /// `type`
    Type,
    /// `state`, also accepted as `status`.
    State,
    /// `expiration_date`
    ExpirationDate,
    /// `max_uses`
    MaxUses,
    /// `current_uses`
    CurrentUses,
    /// `remaining_uses`, derived from the two counters.
    RemainingUses,
    /// `capacity`
    Capacity,
    /// `tokens`
    Tokens,
    /// `features`, a set.
    Features,
    /// `organization_id`
    OrganizationId,
}

impl BuiltinField {
    /// Every built-in field, in declaration order.
    pub const ALL: [BuiltinField; 13] = [
        Self::Id,
        Self::Key,
        Self::Name,
        Self::Type,
        Self::State,
        Self::ExpirationDate,
        Self::MaxUses,
        Self::CurrentUses,
        Self::RemainingUses,
        Self::Capacity,
        Self::Tokens,
        Self::Features,
        Self::OrganizationId,
    ];

    /// Look a built-in field up by its rule-facing name.
    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "id" => Self::Id,
            "key" => Self::Key,
            "name" => Self::Name,
            "type" => Self::Type,
            "state" | "status" => Self::State,
            "expiration_date" => Self::ExpirationDate,
            "max_uses" => Self::MaxUses,
            "current_uses" => Self::CurrentUses,
            "remaining_uses" => Self::RemainingUses,
            "capacity" => Self::Capacity,
            "tokens" => Self::Tokens,
            "features" => Self::Features,
            "organization_id" => Self::OrganizationId,
            _ => return None,
        };
        Some(field)
    }

    /// Canonical rule-facing name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Key => "key",
            Self::Name => "name",
            Self::Type => "type",
            Self::State => "state",
            Self::ExpirationDate => "expiration_date",
            Self::MaxUses => "max_uses",
            Self::CurrentUses => "current_uses",
            Self::RemainingUses => "remaining_uses",
            Self::Capacity => "capacity",
            Self::Tokens => "tokens",
            Self::Features => "features",
            Self::OrganizationId => "organization_id",
        }
    }
}

impl std::fmt::Display for BuiltinField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed field reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    /// One of the built-in fields.
    Builtin(BuiltinField),
    /// A custom attribute, by id or name.
    Custom(String),
}

impl FieldRef {
    /// Prefix that forces a custom attribute lookup, for attributes whose
    /// name collides with a built-in field (`attr:type`).
    pub const CUSTOM_PREFIX: &'static str = "attr:";

    /// Parse a field reference as written in a condition.
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        if let Some(custom) = reference.strip_prefix(Self::CUSTOM_PREFIX) {
            return Self::Custom(custom.trim().to_string());
        }
        match BuiltinField::from_name(reference) {
            Some(field) => Self::Builtin(field),
            None => Self::Custom(reference.to_string()),
        }
    }
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin(field) => write!(f, "{field}"),
            Self::Custom(name) => write!(f, "{}{name}", Self::CUSTOM_PREFIX),
        }
    }
}

// ─── Sources ─────────────────────────────────────────────────────────

/// Anything rules can be evaluated against.
pub trait AttributeSource {
    /// Value of a built-in field, or `None` when the source does not carry it.
    fn builtin(&self, field: BuiltinField) -> Option<AttributeValue>;

    /// Stored value of a custom attribute, keyed by attribute id.
    fn custom(&self, id: &str) -> Option<&AttributeValue>;
}

impl AttributeSource for LicenseRecord {
    fn builtin(&self, field: BuiltinField) -> Option<AttributeValue> {
        match field {
            BuiltinField::Id => Some(AttributeValue::text(self.id.to_string())),
            BuiltinField::Key => Some(AttributeValue::text(self.key.as_str())),
            BuiltinField::Name => {
                (!self.name.is_empty()).then(|| AttributeValue::text(self.name.as_str()))
            }
            BuiltinField::Type => Some(AttributeValue::text(self.license_type.as_str())),
            BuiltinField::State => Some(AttributeValue::text(self.state.as_str())),
            BuiltinField::ExpirationDate => self.expiration_date.map(AttributeValue::Date),
            BuiltinField::MaxUses => self.max_uses.map(AttributeValue::count),
            BuiltinField::CurrentUses => Some(AttributeValue::count(self.current_uses)),
            BuiltinField::RemainingUses => self.remaining_uses().map(AttributeValue::count),
            BuiltinField::Capacity => Some(AttributeValue::count(self.capacity)),
            BuiltinField::Tokens => Some(AttributeValue::count(self.tokens)),
            BuiltinField::Features => Some(AttributeValue::set(
                self.features.iter().map(|f| f.as_str().to_string()),
            )),
            BuiltinField::OrganizationId => self
                .organization_id
                .map(|org| AttributeValue::text(org.to_string())),
        }
    }

    fn custom(&self, id: &str) -> Option<&AttributeValue> {
        self.custom_attributes.get(id)
    }
}

// ─── Resolver ────────────────────────────────────────────────────────

/// The result of looking a field up.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A well-typed value.
    Present(AttributeValue),
    /// No value: unknown name, or the source carries nothing for it.
    Absent,
    /// A custom value whose kind differs from the catalog's declared type.
    Mistyped {
        /// The stored value.
        value: AttributeValue,
        /// The type the catalog declares.
        declared: AttributeType,
    },
}

impl Resolution {
    /// The stored value, well-typed or not.
    pub fn into_value(self) -> Option<AttributeValue> {
        match self {
            Self::Present(value) | Self::Mistyped { value, .. } => Some(value),
            Self::Absent => None,
        }
    }
}

/// Resolves field references, optionally through a catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeResolver<'c> {
    catalog: Option<&'c Catalog>,
}

impl<'c> AttributeResolver<'c> {
    /// A resolver without a catalog: custom references are attribute ids
    /// and values are not type-checked.
    pub fn new() -> Self {
        Self { catalog: None }
    }

    /// A resolver that resolves custom references through `catalog`.
    pub fn with_catalog(catalog: &'c Catalog) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    /// Resolve a field to its value, or `None` when absent.
    pub fn resolve<S: AttributeSource + ?Sized>(
        &self,
        source: &S,
        field: &FieldRef,
    ) -> Option<AttributeValue> {
        self.lookup(source, field).into_value()
    }

    /// Resolve a field, distinguishing mistyped custom values.
    pub fn lookup<S: AttributeSource + ?Sized>(&self, source: &S, field: &FieldRef) -> Resolution {
        match field {
            FieldRef::Builtin(builtin) => match source.builtin(*builtin) {
                Some(value) => Resolution::Present(value),
                None => Resolution::Absent,
            },
            FieldRef::Custom(reference) => self.lookup_custom(source, reference),
        }
    }

    fn lookup_custom<S: AttributeSource + ?Sized>(&self, source: &S, reference: &str) -> Resolution {
        let Some(catalog) = self.catalog else {
            return match source.custom(reference) {
                Some(value) => Resolution::Present(value.clone()),
                None => Resolution::Absent,
            };
        };
        let Some(definition) = catalog.attribute(reference) else {
            return Resolution::Absent;
        };
        match source.custom(definition.id.as_str()) {
            None => Resolution::Absent,
            Some(value) if definition.accepts(value) => Resolution::Present(value.clone()),
            Some(value) => Resolution::Mistyped {
                value: value.clone(),
                declared: definition.declared_type,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lpe_core::{CustomAttributeDefinition, AttributeId, Timestamp};

    fn record() -> LicenseRecord {
        LicenseRecord::new("KEY-1", "trial")
            .with_uses(10, Some(10))
            .with_quota(5, 200)
            .with_features(["sso", "audit"])
            .with_offline_key("OFFLINE-1")
            .with_attribute("attr-1", AttributeValue::text("eu"))
            .with_attribute("attr-2", AttributeValue::text("not a number"))
    }

    fn catalog() -> Catalog {
        Catalog::new(
            [
                CustomAttributeDefinition {
                    id: AttributeId::new("attr-1"),
                    name: "region".into(),
                    declared_type: AttributeType::Text,
                },
                CustomAttributeDefinition {
                    id: AttributeId::new("attr-2"),
                    name: "seats".into(),
                    declared_type: AttributeType::Number,
                },
            ],
            [],
        )
    }

    #[test]
    fn builtin_names_round_trip() {
        for field in BuiltinField::ALL {
            assert_eq!(BuiltinField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(BuiltinField::from_name("status"), Some(BuiltinField::State));
        assert_eq!(BuiltinField::from_name("offline_key"), None);
    }

    #[test]
    fn parse_field_refs() {
        assert_eq!(FieldRef::parse(" type "), FieldRef::Builtin(BuiltinField::Type));
        assert_eq!(FieldRef::parse("region"), FieldRef::Custom("region".into()));
        assert_eq!(FieldRef::parse("attr:type"), FieldRef::Custom("type".into()));
    }

    #[test]
    fn resolves_builtins() {
        let rec = record();
        let r = AttributeResolver::new();
        assert_eq!(
            r.resolve(&rec, &FieldRef::parse("type")),
            Some(AttributeValue::text("trial"))
        );
        assert_eq!(
            r.resolve(&rec, &FieldRef::parse("current_uses")),
            Some(AttributeValue::Number(10.0))
        );
        assert_eq!(
            r.resolve(&rec, &FieldRef::parse("remaining_uses")),
            Some(AttributeValue::Number(0.0))
        );
        assert_eq!(
            r.resolve(&rec, &FieldRef::parse("features")),
            Some(AttributeValue::set(["audit", "sso"]))
        );
        assert_eq!(
            r.resolve(&rec, &FieldRef::parse("state")),
            Some(AttributeValue::text("inactive"))
        );
    }

    #[test]
    fn unset_optional_builtins_are_absent() {
        let rec = LicenseRecord::new("KEY-2", "perpetual");
        let r = AttributeResolver::new();
        for name in ["expiration_date", "max_uses", "remaining_uses", "organization_id", "name"] {
            assert_eq!(r.resolve(&rec, &FieldRef::parse(name)), None, "{name}");
        }
        let dated = rec.with_expiration(Timestamp::parse_flexible("2030-01-01").unwrap());
        assert!(matches!(
            r.resolve(&dated, &FieldRef::parse("expiration_date")),
            Some(AttributeValue::Date(_))
        ));
    }

    #[test]
    fn offline_key_is_never_resolvable() {
        let rec = record();
        let r = AttributeResolver::new();
        assert_eq!(r.resolve(&rec, &FieldRef::parse("offline_key")), None);
        let cat = catalog();
        assert_eq!(
            AttributeResolver::with_catalog(&cat).resolve(&rec, &FieldRef::parse("offline_key")),
            None
        );
    }

    #[test]
    fn custom_without_catalog_is_by_id() {
        let rec = record();
        let r = AttributeResolver::new();
        assert_eq!(
            r.resolve(&rec, &FieldRef::parse("attr-1")),
            Some(AttributeValue::text("eu"))
        );
        assert_eq!(r.resolve(&rec, &FieldRef::parse("region")), None);
    }

    #[test]
    fn custom_with_catalog_by_name_and_type_checked() {
        let rec = record();
        let cat = catalog();
        let r = AttributeResolver::with_catalog(&cat);
        assert_eq!(
            r.lookup(&rec, &FieldRef::parse("region")),
            Resolution::Present(AttributeValue::text("eu"))
        );
        assert_eq!(
            r.lookup(&rec, &FieldRef::parse("seats")),
            Resolution::Mistyped {
                value: AttributeValue::text("not a number"),
                declared: AttributeType::Number,
            }
        );
        assert_eq!(r.lookup(&rec, &FieldRef::parse("unknown")), Resolution::Absent);
    }
}
