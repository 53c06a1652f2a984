//! Node components
//!
//! A component is one fact about a query node: which command it is, which
//! collection it targets, which field and value a predicate compares, and
//! so on. Components are a closed set; `Component<S>` is the tagged union
//! stored on a node and `ComponentKind` is its discriminant.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bson_type::BsonType;
use super::namespace::Namespace;
use super::node::Node;
use super::schema::CollectionSchema;

// =============================================================================
// Commands
// =============================================================================

/// Kind of command a query executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandType {
    Aggregate,
    CountDocuments,
    DeleteMany,
    DeleteOne,
    Distinct,
    EstimatedDocumentCount,
    Find,
    FindOne,
    FindOneAndDelete,
    FindOneAndReplace,
    FindOneAndUpdate,
    InsertMany,
    InsertOne,
    ReplaceOne,
    RunCommand,
    UpdateMany,
    UpdateOne,
    Upsert,
    Unknown,
}

impl CommandType {
    const ALL: [CommandType; 19] = [
        CommandType::Aggregate,
        CommandType::CountDocuments,
        CommandType::DeleteMany,
        CommandType::DeleteOne,
        CommandType::Distinct,
        CommandType::EstimatedDocumentCount,
        CommandType::Find,
        CommandType::FindOne,
        CommandType::FindOneAndDelete,
        CommandType::FindOneAndReplace,
        CommandType::FindOneAndUpdate,
        CommandType::InsertMany,
        CommandType::InsertOne,
        CommandType::ReplaceOne,
        CommandType::RunCommand,
        CommandType::UpdateMany,
        CommandType::UpdateOne,
        CommandType::Upsert,
        CommandType::Unknown,
    ];

    /// Driver-level method name
    pub fn canonical(&self) -> &'static str {
        match self {
            CommandType::Aggregate => "aggregate",
            CommandType::CountDocuments => "countDocuments",
            CommandType::DeleteMany => "deleteMany",
            CommandType::DeleteOne => "deleteOne",
            CommandType::Distinct => "distinct",
            CommandType::EstimatedDocumentCount => "estimatedDocumentCount",
            CommandType::Find => "find",
            CommandType::FindOne => "findOne",
            CommandType::FindOneAndDelete => "findOneAndDelete",
            CommandType::FindOneAndReplace => "findOneAndReplace",
            CommandType::FindOneAndUpdate => "findOneAndUpdate",
            CommandType::InsertMany => "insertMany",
            CommandType::InsertOne => "insertOne",
            CommandType::ReplaceOne => "replaceOne",
            CommandType::RunCommand => "runCommand",
            CommandType::UpdateMany => "updateMany",
            CommandType::UpdateOne => "updateOne",
            CommandType::Upsert => "upsert",
            CommandType::Unknown => "<unknown>",
        }
    }

    /// Whether the server consults indexes to execute this command
    pub fn uses_indexes(&self) -> bool {
        !matches!(
            self,
            CommandType::InsertMany
                | CommandType::InsertOne
                | CommandType::ReplaceOne
                | CommandType::RunCommand
                | CommandType::Unknown
        )
    }

    /// Looks up a command by its canonical name
    pub fn from_canonical(name: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|command| command.canonical() == name)
            .unwrap_or(CommandType::Unknown)
    }
}

/// The command this node executes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsCommand(pub CommandType);

// =============================================================================
// References
// =============================================================================

/// Reference to the collection a query targets
#[derive(Debug, Clone, PartialEq)]
pub enum HasCollectionReference<S> {
    /// Fully resolved namespace
    Known {
        database_source: Option<S>,
        collection_source: S,
        namespace: Namespace,
        schema: Option<CollectionSchema>,
    },
    /// Collection name resolved, database not inferred
    OnlyCollection { collection_source: S, collection: String },
    /// Nothing could be resolved
    Unknown,
}

impl<S> HasCollectionReference<S> {
    /// Resolved namespace, if any
    pub fn namespace(&self) -> Option<&Namespace> {
        match self {
            HasCollectionReference::Known { namespace, .. } => Some(namespace),
            _ => None,
        }
    }

    /// Schema attached to a known reference
    pub fn schema(&self) -> Option<&CollectionSchema> {
        match self {
            HasCollectionReference::Known { schema, .. } => schema.as_ref(),
            _ => None,
        }
    }

    /// Upgrades a collection-only reference once its database is known
    pub fn with_database(self, database_source: S, database: impl Into<String>) -> Self {
        match self {
            HasCollectionReference::OnlyCollection {
                collection_source,
                collection,
            } => HasCollectionReference::Known {
                database_source: Some(database_source),
                collection_source,
                namespace: Namespace::new(database, collection),
                schema: None,
            },
            HasCollectionReference::Known {
                collection_source,
                namespace,
                schema,
                ..
            } => HasCollectionReference::Known {
                database_source: Some(database_source),
                collection_source,
                namespace: Namespace::new(database, namespace.collection),
                schema,
            },
            HasCollectionReference::Unknown => HasCollectionReference::Unknown,
        }
    }

    /// Attaches a sampled schema to a known reference
    pub fn with_schema(self, schema: CollectionSchema) -> Self {
        match self {
            HasCollectionReference::Known {
                database_source,
                collection_source,
                namespace,
                ..
            } => HasCollectionReference::Known {
                database_source,
                collection_source,
                namespace,
                schema: Some(schema),
            },
            other => other,
        }
    }

    fn map_source<T, F: Fn(&S) -> T>(&self, f: &F) -> HasCollectionReference<T> {
        match self {
            HasCollectionReference::Known {
                database_source,
                collection_source,
                namespace,
                schema,
            } => HasCollectionReference::Known {
                database_source: database_source.as_ref().map(f),
                collection_source: f(collection_source),
                namespace: namespace.clone(),
                schema: schema.clone(),
            },
            HasCollectionReference::OnlyCollection {
                collection_source,
                collection,
            } => HasCollectionReference::OnlyCollection {
                collection_source: f(collection_source),
                collection: collection.clone(),
            },
            HasCollectionReference::Unknown => HasCollectionReference::Unknown,
        }
    }
}

/// Reference to a document field
#[derive(Debug, Clone, PartialEq)]
pub enum HasFieldReference<S> {
    /// Field name taken from the collection schema
    FromSchema {
        source: S,
        field_name: String,
        display_name: String,
    },
    /// Field name inferred from surrounding code
    Inferred {
        source: S,
        field_name: String,
        display_name: String,
    },
    /// Field computed inside a pipeline
    Computed {
        source: S,
        field_name: String,
        display_name: String,
    },
    Unknown,
}

impl<S> HasFieldReference<S> {
    /// Schema-rooted field reference with identical display name
    pub fn from_schema(source: S, field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        HasFieldReference::FromSchema {
            source,
            display_name: field_name.clone(),
            field_name,
        }
    }

    pub fn field_name(&self) -> Option<&str> {
        match self {
            HasFieldReference::FromSchema { field_name, .. }
            | HasFieldReference::Inferred { field_name, .. }
            | HasFieldReference::Computed { field_name, .. } => Some(field_name),
            HasFieldReference::Unknown => None,
        }
    }

    pub fn source(&self) -> Option<&S> {
        match self {
            HasFieldReference::FromSchema { source, .. }
            | HasFieldReference::Inferred { source, .. }
            | HasFieldReference::Computed { source, .. } => Some(source),
            HasFieldReference::Unknown => None,
        }
    }

    fn map_source<T, F: Fn(&S) -> T>(&self, f: &F) -> HasFieldReference<T> {
        match self {
            HasFieldReference::FromSchema {
                source,
                field_name,
                display_name,
            } => HasFieldReference::FromSchema {
                source: f(source),
                field_name: field_name.clone(),
                display_name: display_name.clone(),
            },
            HasFieldReference::Inferred {
                source,
                field_name,
                display_name,
            } => HasFieldReference::Inferred {
                source: f(source),
                field_name: field_name.clone(),
                display_name: display_name.clone(),
            },
            HasFieldReference::Computed {
                source,
                field_name,
                display_name,
            } => HasFieldReference::Computed {
                source: f(source),
                field_name: field_name.clone(),
                display_name: display_name.clone(),
            },
            HasFieldReference::Unknown => HasFieldReference::Unknown,
        }
    }
}

/// Reference to the value a predicate compares against
#[derive(Debug, Clone, PartialEq)]
pub enum HasValueReference<S> {
    /// Literal written in the query
    Constant {
        source: S,
        value: Value,
        bson_type: BsonType,
    },
    /// Value resolved from surrounding code
    Inferred {
        source: S,
        value: Value,
        bson_type: BsonType,
    },
    /// Only known at runtime; type is a best effort
    Runtime { source: S, bson_type: BsonType },
}

impl<S> HasValueReference<S> {
    /// Constant literal typed from its JSON shape
    pub fn constant(source: S, value: Value) -> Self {
        let bson_type = super::ejson::bson_type_of(&value);
        HasValueReference::Constant {
            source,
            value,
            bson_type,
        }
    }

    pub fn bson_type(&self) -> &BsonType {
        match self {
            HasValueReference::Constant { bson_type, .. }
            | HasValueReference::Inferred { bson_type, .. }
            | HasValueReference::Runtime { bson_type, .. } => bson_type,
        }
    }

    /// Concrete value, if it is known statically
    pub fn value(&self) -> Option<&Value> {
        match self {
            HasValueReference::Constant { value, .. } | HasValueReference::Inferred { value, .. } => {
                Some(value)
            }
            HasValueReference::Runtime { .. } => None,
        }
    }

    pub fn source(&self) -> &S {
        match self {
            HasValueReference::Constant { source, .. }
            | HasValueReference::Inferred { source, .. }
            | HasValueReference::Runtime { source, .. } => source,
        }
    }

    fn map_source<T, F: Fn(&S) -> T>(&self, f: &F) -> HasValueReference<T> {
        match self {
            HasValueReference::Constant {
                source,
                value,
                bson_type,
            } => HasValueReference::Constant {
                source: f(source),
                value: value.clone(),
                bson_type: bson_type.clone(),
            },
            HasValueReference::Inferred {
                source,
                value,
                bson_type,
            } => HasValueReference::Inferred {
                source: f(source),
                value: value.clone(),
                bson_type: bson_type.clone(),
            },
            HasValueReference::Runtime { source, bson_type } => HasValueReference::Runtime {
                source: f(source),
                bson_type: bson_type.clone(),
            },
        }
    }
}

// =============================================================================
// Operators
// =============================================================================

/// Role an operator plays when choosing index fields.
///
/// Declaration order is the ESR priority: lower ordinal is preferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryRole {
    Equality,
    Sort,
    Range,
    Union,
    Irrelevant,
}

/// Canonical operator names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Name {
    All,
    And,
    BitsAllClear,
    BitsAllSet,
    BitsAnyClear,
    BitsAnySet,
    Combine,
    ElemMatch,
    Eq,
    Exists,
    GeoIntersects,
    GeoWithin,
    GeoWithinBox,
    GeoWithinCenter,
    GeoWithinCenterSphere,
    GeoWithinPolygon,
    Gt,
    Gte,
    In,
    Inc,
    Lt,
    Lte,
    Ne,
    Near,
    NearSphere,
    Nin,
    Nor,
    Not,
    Or,
    Regex,
    Set,
    SetOnInsert,
    Size,
    Text,
    Type,
    Unset,
    Match,
    Project,
    Include,
    Exclude,
    Group,
    Sum,
    Avg,
    First,
    Last,
    Top,
    TopN,
    Bottom,
    BottomN,
    Max,
    Min,
    Push,
    Pull,
    PullAll,
    Pop,
    AddToSet,
    Sort,
    Ascending,
    Descending,
    AddFields,
    Unwind,
    Unknown,
}

impl Name {
    const ALL: [Name; 62] = [
        Name::All,
        Name::And,
        Name::BitsAllClear,
        Name::BitsAllSet,
        Name::BitsAnyClear,
        Name::BitsAnySet,
        Name::Combine,
        Name::ElemMatch,
        Name::Eq,
        Name::Exists,
        Name::GeoIntersects,
        Name::GeoWithin,
        Name::GeoWithinBox,
        Name::GeoWithinCenter,
        Name::GeoWithinCenterSphere,
        Name::GeoWithinPolygon,
        Name::Gt,
        Name::Gte,
        Name::In,
        Name::Inc,
        Name::Lt,
        Name::Lte,
        Name::Ne,
        Name::Near,
        Name::NearSphere,
        Name::Nin,
        Name::Nor,
        Name::Not,
        Name::Or,
        Name::Regex,
        Name::Set,
        Name::SetOnInsert,
        Name::Size,
        Name::Text,
        Name::Type,
        Name::Unset,
        Name::Match,
        Name::Project,
        Name::Include,
        Name::Exclude,
        Name::Group,
        Name::Sum,
        Name::Avg,
        Name::First,
        Name::Last,
        Name::Top,
        Name::TopN,
        Name::Bottom,
        Name::BottomN,
        Name::Max,
        Name::Min,
        Name::Push,
        Name::Pull,
        Name::PullAll,
        Name::Pop,
        Name::AddToSet,
        Name::Sort,
        Name::Ascending,
        Name::Descending,
        Name::AddFields,
        Name::Unwind,
        Name::Unknown,
    ];

    /// Operator name without the `$` prefix
    pub fn canonical(&self) -> &'static str {
        match self {
            Name::All => "all",
            Name::And => "and",
            Name::BitsAllClear => "bitsAllClear",
            Name::BitsAllSet => "bitsAllSet",
            Name::BitsAnyClear => "bitsAnyClear",
            Name::BitsAnySet => "bitsAnySet",
            Name::Combine => "combine",
            Name::ElemMatch => "elemMatch",
            Name::Eq => "eq",
            Name::Exists => "exists",
            Name::GeoIntersects => "geoIntersects",
            Name::GeoWithin => "geoWithin",
            Name::GeoWithinBox => "geoWithinBox",
            Name::GeoWithinCenter => "geoWithinCenter",
            Name::GeoWithinCenterSphere => "geoWithinCenterSphere",
            Name::GeoWithinPolygon => "geoWithinPolygon",
            Name::Gt => "gt",
            Name::Gte => "gte",
            Name::In => "in",
            Name::Inc => "inc",
            Name::Lt => "lt",
            Name::Lte => "lte",
            Name::Ne => "ne",
            Name::Near => "near",
            Name::NearSphere => "nearSphere",
            Name::Nin => "nin",
            Name::Nor => "nor",
            Name::Not => "not",
            Name::Or => "or",
            Name::Regex => "regex",
            Name::Set => "set",
            Name::SetOnInsert => "setOnInsert",
            Name::Size => "size",
            Name::Text => "text",
            Name::Type => "type",
            Name::Unset => "unset",
            Name::Match => "match",
            Name::Project => "project",
            Name::Include => "include",
            Name::Exclude => "exclude",
            Name::Group => "group",
            Name::Sum => "sum",
            Name::Avg => "avg",
            Name::First => "first",
            Name::Last => "last",
            Name::Top => "top",
            Name::TopN => "topN",
            Name::Bottom => "bottom",
            Name::BottomN => "bottomN",
            Name::Max => "max",
            Name::Min => "min",
            Name::Push => "push",
            Name::Pull => "pull",
            Name::PullAll => "pullAll",
            Name::Pop => "pop",
            Name::AddToSet => "addToSet",
            Name::Sort => "sort",
            Name::Ascending => "ascending",
            Name::Descending => "descending",
            Name::AddFields => "addFields",
            Name::Unwind => "unwind",
            Name::Unknown => "<unknown operator>",
        }
    }

    /// Index-selection role of this operator
    pub fn query_role(&self) -> QueryRole {
        match self {
            Name::Eq => QueryRole::Equality,
            Name::Sort | Name::Ascending | Name::Descending | Name::Min | Name::Max => {
                QueryRole::Sort
            }
            Name::Gt
            | Name::Gte
            | Name::Lt
            | Name::Lte
            | Name::In
            | Name::Nin
            | Name::Ne
            | Name::Regex
            | Name::Text
            | Name::Near
            | Name::NearSphere
            | Name::GeoIntersects
            | Name::GeoWithin
            | Name::GeoWithinBox
            | Name::GeoWithinCenter
            | Name::GeoWithinCenterSphere
            | Name::GeoWithinPolygon => QueryRole::Range,
            Name::Or | Name::Nor => QueryRole::Union,
            _ => QueryRole::Irrelevant,
        }
    }

    /// Looks up an operator by canonical name, with or without `$`
    pub fn from_canonical(name: &str) -> Self {
        let name = name.strip_prefix('$').unwrap_or(name);
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.canonical() == name)
            .unwrap_or(Name::Unknown)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Operator identity of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Named(pub Name);

impl Named {
    pub fn query_role(&self) -> QueryRole {
        self.0.query_role()
    }
}

// =============================================================================
// Child-bearing components
// =============================================================================

/// Filter predicates, in source order
#[derive(Debug, Clone, PartialEq)]
pub struct HasFilter<S> {
    pub children: Vec<Node<S>>,
}

/// Sort keys, in precedence order
#[derive(Debug, Clone, PartialEq)]
pub struct HasSorts<S> {
    pub children: Vec<Node<S>>,
}

/// Aggregation pipeline stages, in execution order
#[derive(Debug, Clone, PartialEq)]
pub struct HasAggregation<S> {
    pub children: Vec<Node<S>>,
}

/// Update operations
#[derive(Debug, Clone, PartialEq)]
pub struct HasUpdates<S> {
    pub children: Vec<Node<S>>,
}

/// Projected fields
#[derive(Debug, Clone, PartialEq)]
pub struct HasProjections<S> {
    pub children: Vec<Node<S>>,
}

/// Fields accumulated by a `$group` stage
#[derive(Debug, Clone, PartialEq)]
pub struct HasAccumulatedFields<S> {
    pub children: Vec<Node<S>>,
}

macro_rules! child_component {
    ($name:ident) => {
        impl<S> $name<S> {
            pub fn new(children: Vec<Node<S>>) -> Self {
                Self { children }
            }
        }
    };
}

child_component!(HasFilter);
child_component!(HasSorts);
child_component!(HasAggregation);
child_component!(HasUpdates);
child_component!(HasProjections);
child_component!(HasAccumulatedFields);

// =============================================================================
// Execution options
// =============================================================================

/// Maximum number of returned documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasLimit(pub u64);

/// How much detail an explain plan request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplainPlanType {
    None,
    /// `queryPlanner` verbosity; does not execute the query
    #[default]
    Safe,
    /// `executionStats` verbosity; executes the query
    Full,
}

impl ExplainPlanType {
    /// Server-side verbosity name, `None` when no explain is requested
    pub fn verbosity(&self) -> Option<&'static str> {
        match self {
            ExplainPlanType::None => None,
            ExplainPlanType::Safe => Some("queryPlanner"),
            ExplainPlanType::Full => Some("executionStats"),
        }
    }
}

/// Run the query as an explain with the given verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasExplain(pub ExplainPlanType);

/// Raw database command
#[derive(Debug, Clone, PartialEq)]
pub struct HasRunCommand {
    pub database: String,
    pub command_name: String,
    pub additional_arguments: Vec<(String, Value)>,
}

impl HasRunCommand {
    pub fn new(database: impl Into<String>, command_name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            command_name: command_name.into(),
            additional_arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.additional_arguments.push((name.into(), value));
        self
    }

    /// Command document as sent to the server
    pub fn to_document(&self) -> Value {
        let mut document = serde_json::Map::new();
        document.insert(self.command_name.clone(), Value::from(1));
        for (name, value) in &self.additional_arguments {
            document.insert(name.clone(), value.clone());
        }
        Value::Object(document)
    }
}

// =============================================================================
// Component union
// =============================================================================

/// Number of distinct component kinds
pub const COMPONENT_KINDS: usize = 14;

/// Discriminant of `Component`, also the slot index inside a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComponentKind {
    IsCommand = 0,
    HasCollectionReference = 1,
    HasFieldReference = 2,
    HasValueReference = 3,
    Named = 4,
    HasFilter = 5,
    HasSorts = 6,
    HasAggregation = 7,
    HasUpdates = 8,
    HasProjections = 9,
    HasAccumulatedFields = 10,
    HasLimit = 11,
    HasExplain = 12,
    HasRunCommand = 13,
}

impl ComponentKind {
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::IsCommand => "IsCommand",
            ComponentKind::HasCollectionReference => "HasCollectionReference",
            ComponentKind::HasFieldReference => "HasFieldReference",
            ComponentKind::HasValueReference => "HasValueReference",
            ComponentKind::Named => "Named",
            ComponentKind::HasFilter => "HasFilter",
            ComponentKind::HasSorts => "HasSorts",
            ComponentKind::HasAggregation => "HasAggregation",
            ComponentKind::HasUpdates => "HasUpdates",
            ComponentKind::HasProjections => "HasProjections",
            ComponentKind::HasAccumulatedFields => "HasAccumulatedFields",
            ComponentKind::HasLimit => "HasLimit",
            ComponentKind::HasExplain => "HasExplain",
            ComponentKind::HasRunCommand => "HasRunCommand",
        }
    }
}

/// One component stored on a node
#[derive(Debug, Clone, PartialEq)]
pub enum Component<S> {
    IsCommand(IsCommand),
    HasCollectionReference(HasCollectionReference<S>),
    HasFieldReference(HasFieldReference<S>),
    HasValueReference(HasValueReference<S>),
    Named(Named),
    HasFilter(HasFilter<S>),
    HasSorts(HasSorts<S>),
    HasAggregation(HasAggregation<S>),
    HasUpdates(HasUpdates<S>),
    HasProjections(HasProjections<S>),
    HasAccumulatedFields(HasAccumulatedFields<S>),
    HasLimit(HasLimit),
    HasExplain(HasExplain),
    HasRunCommand(HasRunCommand),
}

impl<S> Component<S> {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::IsCommand(_) => ComponentKind::IsCommand,
            Component::HasCollectionReference(_) => ComponentKind::HasCollectionReference,
            Component::HasFieldReference(_) => ComponentKind::HasFieldReference,
            Component::HasValueReference(_) => ComponentKind::HasValueReference,
            Component::Named(_) => ComponentKind::Named,
            Component::HasFilter(_) => ComponentKind::HasFilter,
            Component::HasSorts(_) => ComponentKind::HasSorts,
            Component::HasAggregation(_) => ComponentKind::HasAggregation,
            Component::HasUpdates(_) => ComponentKind::HasUpdates,
            Component::HasProjections(_) => ComponentKind::HasProjections,
            Component::HasAccumulatedFields(_) => ComponentKind::HasAccumulatedFields,
            Component::HasLimit(_) => ComponentKind::HasLimit,
            Component::HasExplain(_) => ComponentKind::HasExplain,
            Component::HasRunCommand(_) => ComponentKind::HasRunCommand,
        }
    }

    /// Child nodes, for components that carry them
    pub fn children(&self) -> &[Node<S>] {
        match self {
            Component::HasFilter(c) => &c.children,
            Component::HasSorts(c) => &c.children,
            Component::HasAggregation(c) => &c.children,
            Component::HasUpdates(c) => &c.children,
            Component::HasProjections(c) => &c.children,
            Component::HasAccumulatedFields(c) => &c.children,
            _ => &[],
        }
    }

    pub(crate) fn map_source<T, F: Fn(&S) -> T>(&self, f: &F) -> Component<T> {
        fn map_children<S, T, F: Fn(&S) -> T>(children: &[Node<S>], f: &F) -> Vec<Node<T>> {
            children.iter().map(|child| child.map_source(f)).collect()
        }

        match self {
            Component::IsCommand(c) => Component::IsCommand(*c),
            Component::HasCollectionReference(c) => Component::HasCollectionReference(c.map_source(f)),
            Component::HasFieldReference(c) => Component::HasFieldReference(c.map_source(f)),
            Component::HasValueReference(c) => Component::HasValueReference(c.map_source(f)),
            Component::Named(c) => Component::Named(*c),
            Component::HasFilter(c) => Component::HasFilter(HasFilter::new(map_children(&c.children, f))),
            Component::HasSorts(c) => Component::HasSorts(HasSorts::new(map_children(&c.children, f))),
            Component::HasAggregation(c) => {
                Component::HasAggregation(HasAggregation::new(map_children(&c.children, f)))
            }
            Component::HasUpdates(c) => Component::HasUpdates(HasUpdates::new(map_children(&c.children, f))),
            Component::HasProjections(c) => {
                Component::HasProjections(HasProjections::new(map_children(&c.children, f)))
            }
            Component::HasAccumulatedFields(c) => {
                Component::HasAccumulatedFields(HasAccumulatedFields::new(map_children(&c.children, f)))
            }
            Component::HasLimit(c) => Component::HasLimit(*c),
            Component::HasExplain(c) => Component::HasExplain(*c),
            Component::HasRunCommand(c) => Component::HasRunCommand(c.clone()),
        }
    }
}

/// A concrete component type that can be looked up on a node
pub trait NodeComponent<S>: Sized {
    const KIND: ComponentKind;

    fn from_component(component: &Component<S>) -> Option<&Self>;

    fn into_component(self) -> Component<S>;
}

macro_rules! node_component {
    ($variant:ident, $ty:ty) => {
        impl<S> NodeComponent<S> for $ty {
            const KIND: ComponentKind = ComponentKind::$variant;

            fn from_component(component: &Component<S>) -> Option<&Self> {
                match component {
                    Component::$variant(c) => Some(c),
                    _ => None,
                }
            }

            fn into_component(self) -> Component<S> {
                Component::$variant(self)
            }
        }

        impl<S> From<$ty> for Component<S> {
            fn from(component: $ty) -> Self {
                Component::$variant(component)
            }
        }
    };
}

node_component!(IsCommand, IsCommand);
node_component!(HasCollectionReference, HasCollectionReference<S>);
node_component!(HasFieldReference, HasFieldReference<S>);
node_component!(HasValueReference, HasValueReference<S>);
node_component!(Named, Named);
node_component!(HasFilter, HasFilter<S>);
node_component!(HasSorts, HasSorts<S>);
node_component!(HasAggregation, HasAggregation<S>);
node_component!(HasUpdates, HasUpdates<S>);
node_component!(HasProjections, HasProjections<S>);
node_component!(HasAccumulatedFields, HasAccumulatedFields<S>);
node_component!(HasLimit, HasLimit);
node_component!(HasExplain, HasExplain);
node_component!(HasRunCommand, HasRunCommand);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_roles() {
        assert_eq!(Name::Eq.query_role(), QueryRole::Equality);
        assert_eq!(Name::Gt.query_role(), QueryRole::Range);
        assert_eq!(Name::In.query_role(), QueryRole::Range);
        assert_eq!(Name::Ascending.query_role(), QueryRole::Sort);
        assert_eq!(Name::Min.query_role(), QueryRole::Sort);
        assert_eq!(Name::Or.query_role(), QueryRole::Union);
        assert_eq!(Name::Set.query_role(), QueryRole::Irrelevant);
        assert_eq!(Name::And.query_role(), QueryRole::Irrelevant);
    }

    #[test]
    fn test_role_priority_is_esr() {
        assert!(QueryRole::Equality < QueryRole::Sort);
        assert!(QueryRole::Sort < QueryRole::Range);
    }

    #[test]
    fn test_name_lookup_falls_back_to_unknown() {
        assert_eq!(Name::from_canonical("$gte"), Name::Gte);
        assert_eq!(Name::from_canonical("nearSphere"), Name::NearSphere);
        assert_eq!(Name::from_canonical("$whatever"), Name::Unknown);
    }

    #[test]
    fn test_every_name_round_trips() {
        for name in Name::ALL {
            assert_eq!(Name::from_canonical(name.canonical()), name);
        }
    }

    #[test]
    fn test_command_uses_indexes() {
        assert!(CommandType::Find.uses_indexes());
        assert!(CommandType::Aggregate.uses_indexes());
        assert!(!CommandType::InsertOne.uses_indexes());
        assert!(!CommandType::RunCommand.uses_indexes());
        assert_eq!(CommandType::from_canonical("updateMany"), CommandType::UpdateMany);
        assert_eq!(CommandType::from_canonical("nope"), CommandType::Unknown);
    }

    #[test]
    fn test_collection_reference_with_database() {
        let reference: HasCollectionReference<u32> = HasCollectionReference::OnlyCollection {
            collection_source: 1,
            collection: "books".into(),
        };

        let known = reference.with_database(2, "library");
        assert_eq!(
            known.namespace(),
            Some(&Namespace::new("library", "books"))
        );
    }

    #[test]
    fn test_run_command_document() {
        let command = HasRunCommand::new("admin", "listCollections")
            .with_argument("authorizedCollections", Value::Bool(true));
        let document = command.to_document();
        assert_eq!(document["listCollections"], 1);
        assert_eq!(document["authorizedCollections"], true);
    }

    #[test]
    fn test_explain_verbosity() {
        assert_eq!(ExplainPlanType::None.verbosity(), None);
        assert_eq!(ExplainPlanType::Safe.verbosity(), Some("queryPlanner"));
        assert_eq!(ExplainPlanType::Full.verbosity(), Some("executionStats"));
    }
}
