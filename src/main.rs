use std::process;

use tessera::{
    application::{
        error::AppError,
        render::{ComrakRenderService, RenderPipelineConfig},
        weave::{WeaveJob, weave},
    },
    config,
    infra::telemetry,
};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

fn main() {
    if let Err(err) = run() {
        report_application_error(&err);
        process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let (args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let service = ComrakRenderService::new(RenderPipelineConfig::from(&settings))?;
    weave(&WeaveJob::from(&args), &service)?;
    Ok(())
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}
