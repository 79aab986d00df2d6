//! Explicit provider declarations implemented by extensions.
//!
//! # Responsibility
//! - Define the `DataExtension` capability extensions implement.
//! - Let extensions enumerate their operations, markers and bound calls.
//!
//! # Invariants
//! - Declarations are raw input; nothing here is validated. Validation lives
//!   in the extractor.
//! - Bound calls are `Send + Sync` so passes may run on any thread.

use crate::model::provider::{
    Conditional, ElementOrder, FormatType, Icon, ParamType, PluginInfo, ValueKind,
};
use crate::model::subject::Subject;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Capability implemented by every data extension.
///
/// Implementations must be cheap to query: the extractor calls these methods
/// once at registration and never invokes a provider while doing so.
pub trait DataExtension: Send + Sync {
    /// Identity marker. `None` means the extension is rejected.
    fn plugin_info(&self) -> Option<PluginInfo>;

    /// Implementation type name, used in diagnostics when `plugin_info` is
    /// missing.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Every exposed operation, in declaration order.
    fn providers(&self) -> Vec<ProviderDeclaration>;

    /// Optional structure information for tabs.
    fn tabs(&self) -> Vec<TabInfo> {
        Vec::new()
    }

    /// Optional preferred tab order, by tab name.
    fn tab_order(&self) -> Option<Vec<String>> {
        None
    }
}

/// Failure reported by a provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// A runtime dependency of the provider (backing plugin, API) is absent.
    DependencyMissing(String),
    /// The provider could not produce its value.
    Failed(String),
}

impl ProviderError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn dependency_missing(message: impl Into<String>) -> Self {
        Self::DependencyMissing(message.into())
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DependencyMissing(message) => write!(f, "dependency missing: {message}"),
            Self::Failed(message) => write!(f, "provider failed: {message}"),
        }
    }
}

impl Error for ProviderError {}

pub type ProviderResult<T> = Result<T, ProviderError>;

type CallFn<T> = Arc<dyn Fn(&Subject) -> ProviderResult<T> + Send + Sync>;

/// Declared return shape of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    Boolean,
    Number,
    Double,
    Text,
    NullableBoolean,
    NullableNumber,
    NullableDouble,
}

impl ReturnShape {
    pub fn is_nullable(self) -> bool {
        matches!(
            self,
            Self::NullableBoolean | Self::NullableNumber | Self::NullableDouble
        )
    }

    /// Whether this shape (ignoring nullability) can carry `kind` values.
    pub fn carries(self, kind: ValueKind) -> bool {
        match kind {
            ValueKind::Boolean => matches!(self, Self::Boolean | Self::NullableBoolean),
            ValueKind::Number => matches!(self, Self::Number | Self::NullableNumber),
            ValueKind::Double | ValueKind::Percentage => {
                matches!(self, Self::Double | Self::NullableDouble)
            }
            ValueKind::String => matches!(self, Self::Text),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "bool",
            Self::Number => "i64",
            Self::Double => "f64",
            Self::Text => "String",
            Self::NullableBoolean => "Option<bool>",
            Self::NullableNumber => "Option<i64>",
            Self::NullableDouble => "Option<f64>",
        }
    }
}

/// Raw value returned by a bound call, before kind conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Boolean(bool),
    Number(i64),
    Double(f64),
    Text(String),
}

/// Operation bound to a declaration.
#[derive(Clone)]
pub enum ProviderCall {
    Boolean(CallFn<bool>),
    Number(CallFn<i64>),
    Double(CallFn<f64>),
    Text(CallFn<String>),
    NullableBoolean(CallFn<Option<bool>>),
    NullableNumber(CallFn<Option<i64>>),
    NullableDouble(CallFn<Option<f64>>),
}

impl ProviderCall {
    pub fn boolean(
        call: impl Fn(&Subject) -> ProviderResult<bool> + Send + Sync + 'static,
    ) -> Self {
        Self::Boolean(Arc::new(call))
    }

    pub fn number(call: impl Fn(&Subject) -> ProviderResult<i64> + Send + Sync + 'static) -> Self {
        Self::Number(Arc::new(call))
    }

    pub fn double(call: impl Fn(&Subject) -> ProviderResult<f64> + Send + Sync + 'static) -> Self {
        Self::Double(Arc::new(call))
    }

    pub fn text(
        call: impl Fn(&Subject) -> ProviderResult<String> + Send + Sync + 'static,
    ) -> Self {
        Self::Text(Arc::new(call))
    }

    pub fn nullable_boolean(
        call: impl Fn(&Subject) -> ProviderResult<Option<bool>> + Send + Sync + 'static,
    ) -> Self {
        Self::NullableBoolean(Arc::new(call))
    }

    pub fn nullable_number(
        call: impl Fn(&Subject) -> ProviderResult<Option<i64>> + Send + Sync + 'static,
    ) -> Self {
        Self::NullableNumber(Arc::new(call))
    }

    pub fn nullable_double(
        call: impl Fn(&Subject) -> ProviderResult<Option<f64>> + Send + Sync + 'static,
    ) -> Self {
        Self::NullableDouble(Arc::new(call))
    }

    pub fn return_shape(&self) -> ReturnShape {
        match self {
            Self::Boolean(_) => ReturnShape::Boolean,
            Self::Number(_) => ReturnShape::Number,
            Self::Double(_) => ReturnShape::Double,
            Self::Text(_) => ReturnShape::Text,
            Self::NullableBoolean(_) => ReturnShape::NullableBoolean,
            Self::NullableNumber(_) => ReturnShape::NullableNumber,
            Self::NullableDouble(_) => ReturnShape::NullableDouble,
        }
    }

    /// Invokes the bound operation. `None` from a nullable call is a failure.
    pub fn invoke(&self, subject: &Subject) -> ProviderResult<RawValue> {
        let null = || ProviderError::failed("provider returned no value");
        match self {
            Self::Boolean(call) => call(subject).map(RawValue::Boolean),
            Self::Number(call) => call(subject).map(RawValue::Number),
            Self::Double(call) => call(subject).map(RawValue::Double),
            Self::Text(call) => call(subject).map(RawValue::Text),
            Self::NullableBoolean(call) => call(subject)?.map(RawValue::Boolean).ok_or_else(null),
            Self::NullableNumber(call) => call(subject)?.map(RawValue::Number).ok_or_else(null),
            Self::NullableDouble(call) => call(subject)?.map(RawValue::Double).ok_or_else(null),
        }
    }
}

impl Debug for ProviderCall {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProviderCall({})", self.return_shape().as_str())
    }
}

/// Whether the engine may invoke a declared operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// One exposed operation together with its provider marker.
#[derive(Debug, Clone)]
pub struct ProviderDeclaration {
    pub method_name: String,
    pub visibility: Visibility,
    pub params: Vec<ParamType>,
    pub kind: ValueKind,
    /// Display label; the method name when unset.
    pub text: Option<String>,
    pub description: Option<String>,
    pub priority: i32,
    pub icon: Icon,
    pub show_in_players_table: bool,
    pub hidden: bool,
    pub provided_condition: Option<String>,
    pub conditional: Option<Conditional>,
    pub tab: Option<String>,
    pub format: FormatType,
    pub call: ProviderCall,
}

impl ProviderDeclaration {
    /// Declares a server-scoped, public operation.
    pub fn new(method_name: impl Into<String>, kind: ValueKind, call: ProviderCall) -> Self {
        Self {
            method_name: method_name.into(),
            text: None,
            visibility: Visibility::Public,
            params: Vec::new(),
            kind,
            description: None,
            priority: 0,
            icon: Icon::default(),
            show_in_players_table: false,
            hidden: false,
            provided_condition: None,
            conditional: None,
            tab: None,
            format: FormatType::None,
            call,
        }
    }

    pub fn boolean(
        method_name: impl Into<String>,
        call: impl Fn(&Subject) -> ProviderResult<bool> + Send + Sync + 'static,
    ) -> Self {
        Self::new(method_name, ValueKind::Boolean, ProviderCall::boolean(call))
    }

    pub fn number(
        method_name: impl Into<String>,
        call: impl Fn(&Subject) -> ProviderResult<i64> + Send + Sync + 'static,
    ) -> Self {
        Self::new(method_name, ValueKind::Number, ProviderCall::number(call))
    }

    pub fn double(
        method_name: impl Into<String>,
        call: impl Fn(&Subject) -> ProviderResult<f64> + Send + Sync + 'static,
    ) -> Self {
        Self::new(method_name, ValueKind::Double, ProviderCall::double(call))
    }

    pub fn percentage(
        method_name: impl Into<String>,
        call: impl Fn(&Subject) -> ProviderResult<f64> + Send + Sync + 'static,
    ) -> Self {
        Self::new(method_name, ValueKind::Percentage, ProviderCall::double(call))
    }

    pub fn string(
        method_name: impl Into<String>,
        call: impl Fn(&Subject) -> ProviderResult<String> + Send + Sync + 'static,
    ) -> Self {
        Self::new(method_name, ValueKind::String, ProviderCall::text(call))
    }

    /// Takes `(uuid, name)` of a player.
    pub fn for_player(self) -> Self {
        self.params(vec![ParamType::PlayerUuid, ParamType::PlayerName])
    }

    pub fn for_group(self) -> Self {
        self.params(vec![ParamType::Group])
    }

    pub fn params(mut self, params: Vec<ParamType>) -> Self {
        self.params = params;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn icon(mut self, icon: Icon) -> Self {
        self.icon = icon;
        self
    }

    pub fn show_in_players_table(mut self) -> Self {
        self.show_in_players_table = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Publishes this provider's boolean result under `condition`.
    pub fn provides_condition(mut self, condition: impl Into<String>) -> Self {
        self.provided_condition = Some(condition.into());
        self
    }

    /// Runs only while `condition` is `true`.
    pub fn requires(mut self, condition: impl Into<String>) -> Self {
        self.conditional = Some(Conditional::new(condition));
        self
    }

    /// Runs only while `condition` is `false`.
    pub fn requires_not(mut self, condition: impl Into<String>) -> Self {
        self.conditional = Some(Conditional::negated(condition));
        self
    }

    pub fn tab(mut self, tab: impl Into<String>) -> Self {
        self.tab = Some(tab.into());
        self
    }

    pub fn format(mut self, format: FormatType) -> Self {
        self.format = format;
        self
    }
}

/// Structure information for one tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub name: String,
    pub icon: Icon,
    pub element_order: Vec<ElementOrder>,
}

impl TabInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: Icon::default(),
            element_order: ElementOrder::default_order(),
        }
    }

    pub fn icon(mut self, icon: Icon) -> Self {
        self.icon = icon;
        self
    }

    pub fn element_order(mut self, order: Vec<ElementOrder>) -> Self {
        self.element_order = order;
        self
    }
}
