use metrics_exporter_prometheus::PrometheusHandle;
use registration_intake::config::AppConfig;
use registration_intake::error::AppError;
use registration_intake::intake::{Envelope, SmtpMailer, SubmissionHandler};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Builds the handler once per process. Missing mail settings do not stop
/// startup; each submission is answered with the configuration error.
pub(crate) fn submission_handler(
    config: &AppConfig,
) -> Result<Arc<SubmissionHandler<SmtpMailer>>, AppError> {
    let handler = match &config.mail {
        Ok(mail) => {
            let mailer = SmtpMailer::from_config(mail)?;
            let envelope = Envelope {
                from: mail.user.clone(),
                to: mail.receiver.clone(),
            };
            SubmissionHandler::new(envelope, Arc::new(mailer), config.intake)
        }
        Err(missing) => {
            error!(
                user_missing = missing.user,
                password_missing = missing.password,
                receiver_missing = missing.receiver,
                "mail settings incomplete; submissions will be refused"
            );
            SubmissionHandler::unconfigured(config.intake)
        }
    };
    Ok(Arc::new(handler))
}

pub(crate) fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}
