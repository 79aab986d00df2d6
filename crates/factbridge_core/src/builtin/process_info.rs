//! Server-shaped facts about the host process.

use crate::extension::declaration::{DataExtension, ProviderDeclaration, ProviderError, TabInfo};
use crate::model::provider::{Color, Family, FormatType, Icon, PluginInfo};
use std::sync::Arc;
use std::time::Instant;

const TAB: &str = "Process";

/// Reports uptime, parallelism and OS of the process hosting the engine.
pub struct ProcessInfoExtension {
    started_at: Instant,
}

impl ProcessInfoExtension {
    pub const NAME: &'static str = "Host Process";

    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

impl Default for ProcessInfoExtension {
    fn default() -> Self {
        Self::new()
    }
}

impl DataExtension for ProcessInfoExtension {
    fn plugin_info(&self) -> Option<PluginInfo> {
        Some(PluginInfo::new(Self::NAME).with_icon(Icon::new(
            "server",
            Family::Solid,
            Color::BlueGrey,
        )))
    }

    fn providers(&self) -> Vec<ProviderDeclaration> {
        let started_at = self.started_at;
        vec![
            ProviderDeclaration::number("uptime", move |_| {
                i64::try_from(started_at.elapsed().as_millis())
                    .map_err(|_| ProviderError::failed("uptime overflows i64 milliseconds"))
            })
            .text("Uptime")
            .description("Time since the engine started")
            .priority(100)
            .icon(Icon::new("clock", Family::Regular, Color::Green))
            .format(FormatType::TimeMillis)
            .tab(TAB),
            ProviderDeclaration::number("availableParallelism", |_| {
                std::thread::available_parallelism()
                    .map(|count| i64::try_from(count.get()).unwrap_or(i64::MAX))
                    .map_err(|err| ProviderError::failed(err.to_string()))
            })
            .text("Available Parallelism")
            .description("Threads the host can run in parallel")
            .priority(90)
            .icon(Icon::new("microchip", Family::Solid, Color::Indigo))
            .tab(TAB),
            ProviderDeclaration::string("operatingSystem", |_| {
                Ok(std::env::consts::OS.to_string())
            })
            .text("Operating System")
            .priority(80)
            .icon(Icon::new("desktop", Family::Solid, Color::Grey))
            .tab(TAB),
        ]
    }

    fn tabs(&self) -> Vec<TabInfo> {
        vec![TabInfo::new(TAB).icon(Icon::new("server", Family::Solid, Color::None))]
    }
}

/// Built-in factory; the process is always present.
pub fn factory() -> Result<Arc<dyn DataExtension>, ProviderError> {
    Ok(Arc::new(ProcessInfoExtension::new()))
}

#[cfg(test)]
mod tests {
    use super::ProcessInfoExtension;
    use crate::extension::declaration::RawValue;
    use crate::extension::extractor::ExtensionExtractor;
    use crate::model::provider::SubjectShape;
    use crate::model::subject::Subject;

    #[test]
    fn declarations_pass_strict_validation() {
        let extension = ProcessInfoExtension::new();
        let extracted = ExtensionExtractor::validate(&extension).expect("valid built-in");
        assert_eq!(extracted.name(), ProcessInfoExtension::NAME);
        assert_eq!(extracted.providers_for(SubjectShape::Server).count(), 3);
        assert_eq!(extracted.providers_for(SubjectShape::Player).count(), 0);
    }

    #[test]
    fn operating_system_matches_target() {
        let extension = ProcessInfoExtension::new();
        let extracted = ExtensionExtractor::extract(&extension).expect("valid built-in");
        let os = extracted
            .providers
            .iter()
            .find(|provider| provider.descriptor.name == "operatingSystem")
            .expect("os provider");
        assert_eq!(
            os.call.invoke(&Subject::Server),
            Ok(RawValue::Text(std::env::consts::OS.to_string()))
        );
    }
}
