//! Per-kind field-policy tables
//!
//! A [`KindSchema`] is plain static data. The engine walks it to build,
//! flatten, validate and classify instances of the kind; nothing about a
//! particular resource kind lives in engine code.

/// Key of the tag map, present on every kind
pub const TAGS_KEY: &str = "tags";
/// Key of the resource name, present on every kind
pub const NAME_KEY: &str = "name";
/// Key of the description, present on every kind
pub const DESCRIPTION_KEY: &str = "description";

/// Fields of the base envelope shared by all kinds
pub static BASE_FIELDS: [FieldSpec; 3] = [
    FieldSpec::new(NAME_KEY, "name", FieldType::String)
        .required()
        .replace()
        .rules(&[Rule::Name]),
    FieldSpec::new(DESCRIPTION_KEY, "description", FieldType::String)
        .optional_computed()
        .rules(&[Rule::Description]),
    FieldSpec::new(TAGS_KEY, "tags", FieldType::Tags),
];

/// Whether an attribute must, may, or may be filled in by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// The server supplies a default; unset in config means "leave as is"
    OptionalComputed,
}

/// What a change to a top-level field costs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Can be patched in place
    Mutable,
    /// Forces delete and re-create
    Replace,
}

/// Kind and scope a short link name resolves against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTarget {
    pub kind: &'static str,
    /// Whether the target lives in the same scope as the referring instance
    pub scoped: bool,
}

impl LinkTarget {
    pub const fn org(kind: &'static str) -> Self {
        Self {
            kind,
            scoped: false,
        }
    }

    pub const fn scoped(kind: &'static str) -> Self {
        Self { kind, scoped: true }
    }
}

/// Shape of a declared attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    StringMap,
    StringSet,
    StringList,
    /// String map subject to tag normalization
    Tags,
    /// A single link, declared as a short name or a full link
    Link(LinkTarget),
    /// An unordered set of links
    LinkSet(LinkTarget),
    /// Nested blocks; `max_items == Some(1)` builds a single object
    Block {
        fields: &'static [FieldSpec],
        max_items: Option<usize>,
        ordered: bool,
    },
}

impl FieldType {
    /// A singleton block
    pub const fn single(fields: &'static [FieldSpec]) -> Self {
        Self::Block {
            fields,
            max_items: Some(1),
            ordered: true,
        }
    }

    /// A repeated block whose order carries no meaning
    pub const fn unordered(fields: &'static [FieldSpec]) -> Self {
        Self::Block {
            fields,
            max_items: None,
            ordered: false,
        }
    }

    /// A repeated block whose order is significant
    pub const fn ordered(fields: &'static [FieldSpec]) -> Self {
        Self::Block {
            fields,
            max_items: None,
            ordered: true,
        }
    }

    /// True for singleton blocks
    pub fn is_single(&self) -> bool {
        matches!(
            self,
            Self::Block {
                max_items: Some(1),
                ..
            }
        )
    }
}

/// A validation rule applied during build
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Resource name: lowercase, dashes, at most 63 characters
    Name,
    /// No surrounding whitespace, at most 250 characters
    Description,
    Regex(&'static str),
    Length { min: usize, max: usize },
    Range { min: i64, max: i64 },
    OneOfValues(&'static [&'static str]),
    /// Must already be a full link
    Link,
}

/// One declared attribute and where it lives in the API object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub key: &'static str,
    /// Dotted JSON path relative to the enclosing object
    pub api_path: &'static str,
    pub ty: FieldType,
    pub presence: Presence,
    pub policy: UpdatePolicy,
    pub rules: &'static [Rule],
}

impl FieldSpec {
    pub const fn new(key: &'static str, api_path: &'static str, ty: FieldType) -> Self {
        Self {
            key,
            api_path,
            ty,
            presence: Presence::Optional,
            policy: UpdatePolicy::Mutable,
            rules: &[],
        }
    }

    pub const fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub const fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub const fn replace(mut self) -> Self {
        self.policy = UpdatePolicy::Replace;
        self
    }

    pub const fn rules(mut self, rules: &'static [Rule]) -> Self {
        self.rules = rules;
        self
    }
}

/// Payload carried by the selected variant of a one-of group
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payload {
    /// An object built from nested fields; declared as a singleton block
    Fields(&'static [FieldSpec]),
    /// A bare string
    Scalar(&'static [Rule]),
    /// A string map
    Map,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variant {
    /// Declared key selecting this variant
    pub key: &'static str,
    /// Value written at the discriminant path
    pub discriminant: &'static str,
    pub payload: Payload,
}

impl Variant {
    pub const fn fields(
        key: &'static str,
        discriminant: &'static str,
        fields: &'static [FieldSpec],
    ) -> Self {
        Self {
            key,
            discriminant,
            payload: Payload::Fields(fields),
        }
    }

    pub const fn scalar(key: &'static str, discriminant: &'static str) -> Self {
        Self {
            key,
            discriminant,
            payload: Payload::Scalar(&[]),
        }
    }

    pub const fn map(key: &'static str, discriminant: &'static str) -> Self {
        Self {
            key,
            discriminant,
            payload: Payload::Map,
        }
    }

    /// The declared shape of this variant's key
    pub fn field_type(&self) -> FieldType {
        match self.payload {
            Payload::Fields(fields) => FieldType::single(fields),
            Payload::Scalar(_) => FieldType::String,
            Payload::Map => FieldType::StringMap,
        }
    }

    /// Rules applied to the declared value
    pub fn rules(&self) -> &'static [Rule] {
        match self.payload {
            Payload::Scalar(rules) => rules,
            Payload::Fields(_) | Payload::Map => &[],
        }
    }
}

/// A group of mutually exclusive variants; exactly one must be declared
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneOfSpec {
    pub group: &'static str,
    pub discriminant_path: &'static str,
    pub payload_path: &'static str,
    pub variants: &'static [Variant],
    /// Policy for payload changes within the same variant
    pub policy: UpdatePolicy,
}

impl OneOfSpec {
    pub fn variant(&self, key: &str) -> Option<&'static Variant> {
        self.variants.iter().find(|v| v.key == key)
    }

    pub fn by_discriminant(&self, discriminant: &str) -> Option<&'static Variant> {
        self.variants.iter().find(|v| v.discriminant == discriminant)
    }
}

/// Where instances of a kind live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Directly under the org
    Org,
    /// Under a parent instance named by the declared `key`
    Grouped {
        key: &'static str,
        parent_kind: &'static str,
    },
}

/// Field-policy table for one resource kind
#[derive(Debug)]
pub struct KindSchema {
    pub kind: &'static str,
    pub description: &'static str,
    pub scope: Scope,
    pub fields: &'static [FieldSpec],
    pub one_of: &'static [OneOfSpec],
    /// Server-populated attributes surfaced as computed values (key, api path)
    pub computed: &'static [(&'static str, &'static str)],
}

impl KindSchema {
    /// Base fields followed by the kind's own fields
    pub fn all_fields(&self) -> impl Iterator<Item = &'static FieldSpec> + use<> {
        BASE_FIELDS.iter().chain(self.fields.iter())
    }

    pub fn field(&self, key: &str) -> Option<&'static FieldSpec> {
        self.all_fields().find(|f| f.key == key)
    }

    pub fn scope_key(&self) -> Option<&'static str> {
        match self.scope {
            Scope::Org => None,
            Scope::Grouped { key, .. } => Some(key),
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self.scope, Scope::Grouped { .. })
    }

    /// The one-of group and variant a declared key selects, if any
    pub fn variant_for(&self, key: &str) -> Option<(&'static OneOfSpec, &'static Variant)> {
        self.one_of
            .iter()
            .find_map(|group| group.variant(key).map(|v| (group, v)))
    }

    /// Declared shape of any top-level key, including scope and variant keys
    pub fn shape_of(&self, key: &str) -> Option<FieldType> {
        if self.scope_key() == Some(key) {
            return Some(FieldType::String);
        }
        if let Some(spec) = self.field(key) {
            return Some(spec.ty);
        }
        self.variant_for(key).map(|(_, v)| v.field_type())
    }

    /// Every declared key the kind accepts
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self.all_fields().map(|f| f.key).collect();
        keys.extend(self.scope_key());
        for group in self.one_of {
            keys.extend(group.variants.iter().map(|v| v.key));
        }
        keys
    }
}
