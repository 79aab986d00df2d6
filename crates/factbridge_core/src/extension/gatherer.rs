//! Per-extension value gathering.
//!
//! # Responsibility
//! - Invoke the providers of one extension for one subject, in extracted
//!   order, honoring condition gates.
//! - Isolate provider failures (errors, panics, timeouts) to the provider.
//! - Convert raw results to `ProviderValue` and persist them.
//!
//! # Invariants
//! - `run` never fails and never panics because of a provider.
//! - Condition state is owned by one `run` call and dropped with it.
//! - A failed condition publisher records nothing; its dependents are
//!   skipped for the pass.
//! - A store failure for one value does not stop the pass.
//! - While an abandoned call of a provider is still running, later passes
//!   report that provider as `still_running` and start no new thread for it.

use crate::extension::condition::ConditionResolver;
use crate::extension::declaration::{ProviderCall, ProviderError, RawValue};
use crate::extension::extractor::{ExtractedExtension, ExtractedProvider};
use crate::logging::panic_payload_summary;
use crate::model::provider::{truncate_chars, ValueKind, MAX_IDENTIFIER_CHARS};
use crate::model::subject::Subject;
use crate::model::value::ProviderValue;
use crate::repo::extension_repo::{ExtensionStore, StoreResult};
use log::{debug, error, warn};
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

/// Tunables applied to every pass of one gatherer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatherSettings {
    /// Upper bound for one provider call. `None` runs calls inline.
    ///
    /// With a timeout, calls run on a helper thread; a call that overruns is
    /// abandoned and its thread left to finish on its own. The provider is
    /// not called again until that thread returns.
    pub provider_timeout: Option<Duration>,
}

impl GatherSettings {
    pub fn with_provider_timeout(timeout: Duration) -> Self {
        Self {
            provider_timeout: Some(timeout),
        }
    }
}

/// Outcome counts of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatherReport {
    /// Values converted and written.
    pub stored: usize,
    /// Providers not invoked because their gate was closed.
    pub skipped: usize,
    /// Providers whose invocation, conversion or write failed.
    pub failed: usize,
}

/// Why one provider produced no value in a pass.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationFailure {
    Provider(ProviderError),
    Panicked(String),
    TimedOut(Duration),
    /// An earlier timed-out call of this provider has not returned yet.
    StillRunning,
    /// Returned value cannot be stored as the declared kind.
    Conversion { kind: ValueKind, value: RawValue },
}

impl InvocationFailure {
    /// Stable short id used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Provider(ProviderError::DependencyMissing(_)) => "dependency_missing",
            Self::Provider(ProviderError::Failed(_)) => "provider_error",
            Self::Panicked(_) => "panic",
            Self::TimedOut(_) => "timeout",
            Self::StillRunning => "still_running",
            Self::Conversion { .. } => "conversion",
        }
    }
}

impl Display for InvocationFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider(err) => write!(f, "{err}"),
            Self::Panicked(payload) => write!(f, "provider panicked: {payload}"),
            Self::TimedOut(timeout) => {
                write!(f, "provider did not return within {}ms", timeout.as_millis())
            }
            Self::StillRunning => write!(f, "previous call has not returned yet"),
            Self::Conversion { kind, value } => {
                write!(f, "value {value:?} cannot be stored as {}", kind.as_str())
            }
        }
    }
}

impl std::error::Error for InvocationFailure {}

/// Gathers and stores the values of one registered extension.
pub struct ProviderValueGatherer {
    extension: ExtractedExtension,
    store: Arc<dyn ExtensionStore>,
    settings: GatherSettings,
    /// Completion flags of abandoned calls, by provider name.
    abandoned: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl ProviderValueGatherer {
    pub fn new(
        extension: ExtractedExtension,
        store: Arc<dyn ExtensionStore>,
        settings: GatherSettings,
    ) -> Self {
        Self {
            extension,
            store,
            settings,
            abandoned: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        self.extension.name()
    }

    pub fn extension(&self) -> &ExtractedExtension {
        &self.extension
    }

    /// Writes plugin, tab and provider metadata, replacing earlier writes.
    pub fn store_extension_information(&self) -> StoreResult<()> {
        self.store
            .write_extension_metadata(&self.extension.metadata())
    }

    /// Runs one gathering pass for `subject`.
    pub fn run(&self, subject: &Subject) -> GatherReport {
        let started_at = Instant::now();
        let mut conditions = ConditionResolver::new();
        let mut report = GatherReport::default();

        for provider in self.extension.providers_for(subject.shape()) {
            let descriptor = &provider.descriptor;
            if !conditions.is_satisfied(descriptor.required_condition.as_ref()) {
                report.skipped += 1;
                continue;
            }

            let value = match self.invoke(provider, subject) {
                Ok(value) => value,
                Err(failure) => {
                    warn!(
                        "event=provider_failed module=extension status=error extension={} provider={} error_kind={} subject={} error={}",
                        self.name(),
                        descriptor.name,
                        failure.kind(),
                        subject,
                        failure
                    );
                    report.failed += 1;
                    continue;
                }
            };

            if let (Some(condition), Some(flag)) =
                (descriptor.provided_condition.as_ref(), value.as_bool())
            {
                conditions.record(condition.clone(), flag);
            }

            match self
                .store
                .write_value(self.name(), &descriptor.name, &subject.key(), &value)
            {
                Ok(()) => report.stored += 1,
                Err(err) => {
                    error!(
                        "event=value_write module=extension status=error extension={} provider={} subject={} error={}",
                        self.name(),
                        descriptor.name,
                        subject,
                        err
                    );
                    report.failed += 1;
                }
            }
        }

        debug!(
            "event=gather_pass module=extension status=ok extension={} subject={} stored={} skipped={} failed={} duration_ms={}",
            self.name(),
            subject,
            report.stored,
            report.skipped,
            report.failed,
            started_at.elapsed().as_millis()
        );
        report
    }

    fn invoke(
        &self,
        provider: &ExtractedProvider,
        subject: &Subject,
    ) -> Result<ProviderValue, InvocationFailure> {
        let raw = match self.settings.provider_timeout {
            None => invoke_isolated(&provider.call, subject),
            Some(timeout) => self.invoke_with_timeout(provider, subject, timeout),
        }?;
        convert(provider.descriptor.kind, raw)
    }

    fn invoke_with_timeout(
        &self,
        provider: &ExtractedProvider,
        subject: &Subject,
        timeout: Duration,
    ) -> Result<RawValue, InvocationFailure> {
        let name = &provider.descriptor.name;
        {
            let mut abandoned = self.lock_abandoned();
            if let Some(returned) = abandoned.get(name) {
                if !returned.load(Ordering::Acquire) {
                    return Err(InvocationFailure::StillRunning);
                }
                abandoned.remove(name);
            }
        }

        let returned = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel();
        let call = provider.call.clone();
        let owned_subject = subject.clone();
        let returned_flag = Arc::clone(&returned);
        let spawned = thread::Builder::new()
            .name("factbridge-provider".to_string())
            .spawn(move || {
                // Receiver may be gone after a timeout.
                let _ = sender.send(invoke_isolated(&call, &owned_subject));
                returned_flag.store(true, Ordering::Release);
            });
        if let Err(err) = spawned {
            return Err(InvocationFailure::Provider(ProviderError::failed(format!(
                "failed to spawn provider thread: {err}"
            ))));
        }

        match receiver.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.lock_abandoned().insert(name.clone(), returned);
                Err(InvocationFailure::TimedOut(timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(InvocationFailure::Panicked(
                "provider thread exited without a result".to_string(),
            )),
        }
    }

    fn lock_abandoned(&self) -> MutexGuard<'_, HashMap<String, Arc<AtomicBool>>> {
        self.abandoned.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn invoke_isolated(call: &ProviderCall, subject: &Subject) -> Result<RawValue, InvocationFailure> {
    match catch_unwind(AssertUnwindSafe(|| call.invoke(subject))) {
        Ok(result) => result.map_err(InvocationFailure::Provider),
        Err(payload) => Err(InvocationFailure::Panicked(panic_payload_summary(
            payload.as_ref(),
        ))),
    }
}

fn convert(kind: ValueKind, raw: RawValue) -> Result<ProviderValue, InvocationFailure> {
    match (kind, raw) {
        (ValueKind::Boolean, RawValue::Boolean(value)) => Ok(ProviderValue::Boolean(value)),
        (ValueKind::Number, RawValue::Number(value)) => Ok(ProviderValue::Number(value)),
        (ValueKind::Double, RawValue::Double(value)) => Ok(ProviderValue::Double(value)),
        (ValueKind::Percentage, RawValue::Double(value)) => Ok(ProviderValue::Percentage(value)),
        (ValueKind::String, RawValue::Text(value)) => {
            let (value, _) = truncate_chars(&value, MAX_IDENTIFIER_CHARS);
            Ok(ProviderValue::Text(value))
        }
        (kind, value) => Err(InvocationFailure::Conversion { kind, value }),
    }
}
