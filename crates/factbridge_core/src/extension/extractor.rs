//! Declaration extraction and validation.
//!
//! # Responsibility
//! - Turn one `DataExtension`'s declarations into validated provider/tab
//!   metadata ordered for gathering.
//! - Collect implementation mistakes as typed warnings instead of failing,
//!   unless the mistake leaves nothing usable.
//!
//! # Invariants
//! - Extraction never invokes a provider call.
//! - Every accepted provider gated on a condition runs after every accepted
//!   boolean provider publishing that condition.
//! - Each distinct truncated value produces exactly one warning.

use crate::extension::declaration::{
    DataExtension, ProviderCall, ProviderDeclaration, ReturnShape, TabInfo, Visibility,
};
use crate::model::provider::{
    subject_shape_of, truncate_chars, Conditional, ElementOrder, ExtensionMetadata, FormatType,
    Icon, PluginInfo, ProviderDescriptor, SubjectShape, TabDescriptor, ValueKind,
    MAX_DESCRIPTION_CHARS, MAX_IDENTIFIER_CHARS,
};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Implementation mistake that excluded or altered one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// Operation is not invokable; excluded.
    NotPublic { method: String },
    /// Nullable return where a primitive is required; excluded.
    NullableReturn { method: String, shape: ReturnShape },
    /// Bound call cannot carry the declared kind; excluded.
    ReturnKindMismatch {
        method: String,
        kind: ValueKind,
        shape: ReturnShape,
    },
    /// Parameters match no subject shape; excluded.
    InvalidParameterShape { method: String, params: String },
    /// Boolean provider gated on the condition it publishes; excluded.
    SelfConditional { method: String, condition: String },
    /// Only boolean providers may publish conditions; condition dropped.
    ConditionOnNonBoolean { method: String, condition: String },
    /// Blank condition name; condition or gate dropped.
    EmptyCondition { method: String },
    /// Gate references a condition nothing publishes; gate removed.
    DanglingCondition { method: String, condition: String },
    /// Gate references a condition whose publishers were all excluded; gate
    /// kept, provider never runs.
    UnpublishedCondition { method: String, condition: String },
    /// Gate can only open through a provider that is itself waiting on this
    /// one; excluded.
    ConditionalCycle { method: String, condition: String },
    /// Value exceeded its limit and was cut to the first `max_chars`.
    Truncated {
        field: &'static str,
        original: String,
        max_chars: usize,
    },
}

impl Display for ExtractionWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPublic { method } => write!(f, "method `{method}` is not public"),
            Self::NullableReturn { method, shape } => write!(
                f,
                "method `{method}` returns `{}`, a primitive return type is required",
                shape.as_str()
            ),
            Self::ReturnKindMismatch {
                method,
                kind,
                shape,
            } => write!(
                f,
                "method `{method}` returns `{}` which cannot carry {} values",
                shape.as_str(),
                kind.as_str()
            ),
            Self::InvalidParameterShape { method, params } => write!(
                f,
                "method `{method}` has parameters ({params}); expected none, player uuid/name or a group"
            ),
            Self::SelfConditional { method, condition } => write!(
                f,
                "method `{method}` requires the condition `{condition}` it provides itself"
            ),
            Self::ConditionOnNonBoolean { method, condition } => write!(
                f,
                "method `{method}` provides condition `{condition}` but is not a boolean provider"
            ),
            Self::EmptyCondition { method } => {
                write!(f, "method `{method}` uses a blank condition name")
            }
            Self::DanglingCondition { method, condition } => write!(
                f,
                "method `{method}` requires condition `{condition}` but no boolean provider provides it; gate ignored"
            ),
            Self::UnpublishedCondition { method, condition } => write!(
                f,
                "method `{method}` requires condition `{condition}` but every provider of it was excluded; method never runs"
            ),
            Self::ConditionalCycle { method, condition } => write!(
                f,
                "method `{method}` requires condition `{condition}` which can never be provided before it (cycle)"
            ),
            Self::Truncated {
                field,
                original,
                max_chars,
            } => write!(
                f,
                "{field} `{original}` is over {max_chars} characters and was truncated"
            ),
        }
    }
}

/// Failures that reject a whole extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    MissingPluginInfo { type_name: &'static str },
    NoProviders { extension: String },
    DuplicateIdentifier { extension: String, name: String },
    InvalidParameterShape { extension: String, method: String },
    /// Strict validation only: any soft warning.
    Violation {
        extension: String,
        warning: ExtractionWarning,
    },
}

impl Display for ExtractionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingPluginInfo { type_name } => {
                write!(f, "extension `{type_name}` has no plugin info")
            }
            Self::NoProviders { extension } => {
                write!(f, "extension `{extension}` exposes no usable providers")
            }
            Self::DuplicateIdentifier { extension, name } => write!(
                f,
                "extension `{extension}` declares provider `{name}` more than once"
            ),
            Self::InvalidParameterShape { extension, method } => write!(
                f,
                "extension `{extension}` method `{method}` has an invalid parameter shape"
            ),
            Self::Violation { extension, warning } => {
                write!(f, "extension `{extension}`: {warning}")
            }
        }
    }
}

impl Error for ExtractionError {}

/// One accepted provider: validated metadata plus its bound call.
#[derive(Debug, Clone)]
pub struct ExtractedProvider {
    pub descriptor: ProviderDescriptor,
    pub call: ProviderCall,
}

/// Validated metadata graph of one extension.
#[derive(Debug, Clone)]
pub struct ExtractedExtension {
    pub plugin_info: PluginInfo,
    /// Gathering order: condition publishers before their dependents.
    pub providers: Vec<ExtractedProvider>,
    pub tabs: Vec<TabDescriptor>,
    pub warnings: Vec<ExtractionWarning>,
}

impl ExtractedExtension {
    pub fn name(&self) -> &str {
        &self.plugin_info.name
    }

    pub fn providers_for(&self, shape: SubjectShape) -> impl Iterator<Item = &ExtractedProvider> {
        self.providers
            .iter()
            .filter(move |provider| provider.descriptor.subject == shape)
    }

    pub fn metadata(&self) -> ExtensionMetadata {
        ExtensionMetadata {
            plugin: self.plugin_info.clone(),
            providers: self
                .providers
                .iter()
                .map(|provider| provider.descriptor.clone())
                .collect(),
            tabs: self.tabs.clone(),
        }
    }
}

/// Metadata-only pass over one extension.
pub struct ExtensionExtractor<'ext> {
    extension: &'ext dyn DataExtension,
    warnings: Vec<ExtractionWarning>,
    truncated: BTreeSet<String>,
}

impl<'ext> ExtensionExtractor<'ext> {
    pub fn new(extension: &'ext dyn DataExtension) -> Self {
        Self {
            extension,
            warnings: Vec::new(),
            truncated: BTreeSet::new(),
        }
    }

    /// Extracts `extension`, keeping soft mistakes as warnings.
    pub fn extract(extension: &dyn DataExtension) -> Result<ExtractedExtension, ExtractionError> {
        ExtensionExtractor::new(extension).run()
    }

    /// Strict mode for extension authors' tests: every warning is an error.
    pub fn validate(extension: &dyn DataExtension) -> Result<ExtractedExtension, ExtractionError> {
        let extracted = Self::extract(extension)?;
        match extracted.warnings.first() {
            None => Ok(extracted),
            Some(ExtractionWarning::InvalidParameterShape { method, .. }) => {
                Err(ExtractionError::InvalidParameterShape {
                    extension: extracted.plugin_info.name.clone(),
                    method: method.clone(),
                })
            }
            Some(warning) => Err(ExtractionError::Violation {
                extension: extracted.plugin_info.name.clone(),
                warning: warning.clone(),
            }),
        }
    }

    fn run(mut self) -> Result<ExtractedExtension, ExtractionError> {
        let Some(raw_info) = self.extension.plugin_info() else {
            return Err(ExtractionError::MissingPluginInfo {
                type_name: self.extension.type_name(),
            });
        };
        let plugin_info = PluginInfo {
            name: self.identifier("plugin name", &raw_info.name),
            icon: self.icon(raw_info.icon),
        };
        let extension_name = plugin_info.name.clone();

        let declarations = self.extension.providers();
        if declarations.is_empty() {
            return Err(ExtractionError::NoProviders {
                extension: extension_name,
            });
        }

        let declared_conditions: BTreeSet<String> = declarations
            .iter()
            .filter_map(|declaration| declaration.provided_condition.as_deref())
            .filter(|condition| !condition.trim().is_empty())
            .map(|condition| truncate_chars(condition, MAX_IDENTIFIER_CHARS).0)
            .collect();

        let mut candidates = Vec::with_capacity(declarations.len());
        for declaration in declarations {
            if let Some(candidate) = self.provider(declaration) {
                candidates.push(candidate);
            }
        }

        let mut seen = BTreeSet::new();
        for candidate in &candidates {
            let key = (candidate.descriptor.subject, candidate.descriptor.name.clone());
            if !seen.insert(key) {
                return Err(ExtractionError::DuplicateIdentifier {
                    extension: extension_name,
                    name: candidate.descriptor.name.clone(),
                });
            }
        }

        self.drop_dangling_gates(&mut candidates, &declared_conditions);
        let providers = self.order_by_conditions(candidates);
        if providers.is_empty() {
            return Err(ExtractionError::NoProviders {
                extension: extension_name,
            });
        }

        let tabs = self.tabs(&providers);
        Ok(ExtractedExtension {
            plugin_info,
            providers,
            tabs,
            warnings: self.warnings,
        })
    }

    fn provider(&mut self, declaration: ProviderDeclaration) -> Option<ExtractedProvider> {
        let method = declaration.method_name.clone();

        if declaration.visibility == Visibility::Private {
            self.warn(ExtractionWarning::NotPublic { method });
            return None;
        }

        let shape = declaration.call.return_shape();
        if !shape.carries(declaration.kind) {
            self.warn(ExtractionWarning::ReturnKindMismatch {
                method,
                kind: declaration.kind,
                shape,
            });
            return None;
        }
        if shape.is_nullable() {
            self.warn(ExtractionWarning::NullableReturn { method, shape });
            return None;
        }

        let Some(subject) = subject_shape_of(&declaration.params) else {
            let params = declaration
                .params
                .iter()
                .map(|param| format!("{param:?}"))
                .collect::<Vec<_>>()
                .join(", ");
            self.warn(ExtractionWarning::InvalidParameterShape { method, params });
            return None;
        };

        let is_boolean = declaration.kind == ValueKind::Boolean;
        let provided_condition = match declaration.provided_condition {
            Some(condition) if !is_boolean => {
                self.warn(ExtractionWarning::ConditionOnNonBoolean {
                    method: method.clone(),
                    condition,
                });
                None
            }
            Some(condition) => self.condition_name(&method, &condition),
            None => None,
        };
        let required_condition = match declaration.conditional {
            Some(conditional) => self
                .condition_name(&method, &conditional.name)
                .map(|name| Conditional {
                    name,
                    negated: conditional.negated,
                }),
            None => None,
        };

        if let (Some(provided), Some(required)) = (&provided_condition, &required_condition) {
            if provided == &required.name {
                self.warn(ExtractionWarning::SelfConditional {
                    method,
                    condition: provided.clone(),
                });
                return None;
            }
        }

        let name = self.identifier("method name", &method);
        let text = match &declaration.text {
            Some(text) => self.identifier("provider text", text),
            None => name.clone(),
        };
        let description = declaration
            .description
            .as_deref()
            .map(|description| self.truncate("description", description, MAX_DESCRIPTION_CHARS));
        let tab = declaration
            .tab
            .as_deref()
            .map(|tab| self.identifier("tab name", tab));

        Some(ExtractedProvider {
            descriptor: ProviderDescriptor {
                name,
                kind: declaration.kind,
                subject,
                text,
                description,
                priority: declaration.priority,
                icon: self.icon(declaration.icon),
                show_in_players_table: declaration.show_in_players_table,
                hidden: is_boolean && declaration.hidden,
                provided_condition,
                required_condition,
                tab,
                format: if declaration.kind == ValueKind::Number {
                    declaration.format
                } else {
                    FormatType::None
                },
            },
            call: declaration.call,
        })
    }

    /// Removes gates on conditions no declaration publishes. Gates on
    /// conditions whose only publishers were excluded stay, so the provider
    /// never runs.
    fn drop_dangling_gates(
        &mut self,
        candidates: &mut [ExtractedProvider],
        declared: &BTreeSet<String>,
    ) {
        let published: BTreeSet<String> = candidates
            .iter()
            .filter_map(|candidate| candidate.descriptor.provided_condition.clone())
            .collect();

        for candidate in candidates.iter_mut() {
            let Some(required) = &candidate.descriptor.required_condition else {
                continue;
            };
            if published.contains(&required.name) {
                continue;
            }
            let method = candidate.descriptor.name.clone();
            let condition = required.name.clone();
            if declared.contains(&condition) {
                self.warn(ExtractionWarning::UnpublishedCondition { method, condition });
            } else {
                candidate.descriptor.required_condition = None;
                self.warn(ExtractionWarning::DanglingCondition { method, condition });
            }
        }
    }

    /// Stable topological order: repeatedly takes the earliest declared
    /// provider whose condition publishers are all placed.
    fn order_by_conditions(
        &mut self,
        candidates: Vec<ExtractedProvider>,
    ) -> Vec<ExtractedProvider> {
        let count = candidates.len();
        let mut placed = vec![false; count];
        let mut order = Vec::with_capacity(count);

        loop {
            let next = (0..count).find(|&index| {
                if placed[index] {
                    return false;
                }
                let Some(required) = &candidates[index].descriptor.required_condition else {
                    return true;
                };
                candidates.iter().enumerate().all(|(other, publisher)| {
                    other == index
                        || placed[other]
                        || publisher.descriptor.provided_condition.as_deref()
                            != Some(required.name.as_str())
                })
            });
            match next {
                Some(index) => {
                    placed[index] = true;
                    order.push(index);
                }
                None => break,
            }
        }

        let mut slots: Vec<Option<ExtractedProvider>> = candidates.into_iter().map(Some).collect();
        for (index, slot) in slots.iter_mut().enumerate() {
            if placed[index] {
                continue;
            }
            if let Some(candidate) = slot.take() {
                let condition = candidate
                    .descriptor
                    .required_condition
                    .as_ref()
                    .map(|required| required.name.clone())
                    .unwrap_or_default();
                self.warn(ExtractionWarning::ConditionalCycle {
                    method: candidate.descriptor.name,
                    condition,
                });
            }
        }

        order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect()
    }

    fn tabs(&mut self, providers: &[ExtractedProvider]) -> Vec<TabDescriptor> {
        let mut infos: Vec<TabInfo> = Vec::new();
        for info in self.extension.tabs() {
            let name = self.identifier("tab name", &info.name);
            if infos.iter().any(|existing| existing.name == name) {
                continue;
            }
            infos.push(TabInfo {
                name,
                icon: self.icon(info.icon),
                element_order: dedup_order(info.element_order),
            });
        }
        for provider in providers {
            if let Some(tab) = &provider.descriptor.tab {
                if !infos.iter().any(|existing| &existing.name == tab) {
                    infos.push(TabInfo::new(tab.clone()));
                }
            }
        }

        let preferred: Vec<String> = self
            .extension
            .tab_order()
            .unwrap_or_default()
            .iter()
            .map(|name| truncate_chars(name, MAX_IDENTIFIER_CHARS).0)
            .collect();
        let mut ranked: Vec<(usize, usize, TabInfo)> = infos
            .into_iter()
            .enumerate()
            .map(|(seen_at, info)| {
                let rank = preferred
                    .iter()
                    .position(|name| name == &info.name)
                    .unwrap_or(preferred.len());
                (rank, seen_at, info)
            })
            .collect();
        ranked.sort_by_key(|(rank, seen_at, _)| (*rank, *seen_at));

        ranked
            .into_iter()
            .enumerate()
            .map(|(priority, (_, _, info))| TabDescriptor {
                name: info.name,
                icon: info.icon,
                element_order: info.element_order,
                tab_priority: i32::try_from(priority).unwrap_or(i32::MAX),
            })
            .collect()
    }

    fn condition_name(&mut self, method: &str, condition: &str) -> Option<String> {
        if condition.trim().is_empty() {
            self.warn(ExtractionWarning::EmptyCondition {
                method: method.to_string(),
            });
            return None;
        }
        Some(self.identifier("condition name", condition))
    }

    fn icon(&mut self, icon: Icon) -> Icon {
        Icon {
            name: self.identifier("icon name", &icon.name),
            family: icon.family,
            color: icon.color,
        }
    }

    fn identifier(&mut self, field: &'static str, value: &str) -> String {
        self.truncate(field, value, MAX_IDENTIFIER_CHARS)
    }

    fn truncate(&mut self, field: &'static str, value: &str, max_chars: usize) -> String {
        let (result, truncated) = truncate_chars(value, max_chars);
        if truncated && self.truncated.insert(value.to_string()) {
            self.warn(ExtractionWarning::Truncated {
                field,
                original: value.to_string(),
                max_chars,
            });
        }
        result
    }

    fn warn(&mut self, warning: ExtractionWarning) {
        self.warnings.push(warning);
    }
}

fn dedup_order(order: Vec<ElementOrder>) -> Vec<ElementOrder> {
    let mut result: Vec<ElementOrder> = Vec::with_capacity(order.len());
    for element in order {
        if !result.contains(&element) {
            result.push(element);
        }
    }
    if result.is_empty() {
        return ElementOrder::default_order();
    }
    result
}
