//! Wayfarer integration for Sentry.

use anyhow::Result;
use wayfarer_settings::Settings;

/// Sets up Sentry.
///
/// The returned guard must be held for the duration of the program. Once it is
/// dropped, no more errors will be reported.
pub fn init_sentry(settings: &Settings) -> Result<sentry::ClientInitGuard> {
    let mut options = sentry::ClientOptions {
        debug: settings.sentry.debug(),
        release: sentry::release_name!(),
        environment: Some(settings.env.clone().into()),
        ..Default::default()
    };

    if settings.sentry.debug() {
        options = options.add_integration(SentryTracer);
    };

    let guard = sentry::init((settings.sentry.dsn(), options));
    if guard.is_enabled() {
        tracing::info!(r#type = "app.sentry.enabled", "Reporting errors to Sentry");
    }
    Ok(guard)
}

/// Emit tracing::debug events for every Sentry event.
struct SentryTracer;

impl sentry::Integration for SentryTracer {
    fn name(&self) -> &'static str {
        "sentry-tracer"
    }

    fn setup(&self, _options: &mut sentry::ClientOptions) {
        tracing::debug!("setting up SentryTracer");
    }

    fn process_event(
        &self,
        event: sentry::protocol::Event<'static>,
        _options: &sentry::ClientOptions,
    ) -> Option<sentry::protocol::Event<'static>> {
        let exception_descriptions: Vec<_> = event
            .exception
            .values
            .iter()
            .map(|exc| format!("{}: {}", exc.ty, exc.value.as_deref().unwrap_or("--")))
            .collect();

        tracing::debug!(
            event_id = %event.event_id,
            exceptions = ?exception_descriptions,
            "A sentry error was sent"
        );

        Some(event)
    }
}
