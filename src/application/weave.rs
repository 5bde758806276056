use std::path::PathBuf;

use tracing::info;

use crate::{
    application::{
        error::AppError,
        render::{RenderOutput, RenderRequest, RenderService},
    },
    config::CliArgs,
    infra::io::{read_document, write_document},
};

/// One invocation: where the document comes from, where the HTML goes, and
/// the arguments snippets see.
#[derive(Debug, Clone, Default)]
pub struct WeaveJob {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub argv: Vec<String>,
}

impl From<&CliArgs> for WeaveJob {
    fn from(args: &CliArgs) -> Self {
        Self {
            input: args.input.clone(),
            output: args.output.clone(),
            argv: args.argv.clone(),
        }
    }
}

/// Read, weave, write. Nothing is written unless the whole document succeeded.
pub fn weave(job: &WeaveJob, service: &dyn RenderService) -> Result<RenderOutput, AppError> {
    if let (Some(input), Some(output)) = (job.input.as_ref(), job.output.as_ref()) {
        if input == output {
            return Err(AppError::validation(format!(
                "output `{}` would overwrite the input document",
                output.display()
            )));
        }
    }

    let markdown = read_document(job.input.as_deref())?;
    let request = RenderRequest::new(markdown).with_argv(job.argv.iter().cloned());
    let output = service.render(&request)?;
    write_document(job.output.as_deref(), &output.html)?;

    info!(
        title = %output.title,
        destination = %job
            .output
            .as_ref()
            .map_or_else(|| "stdout".to_string(), |path| path.display().to_string()),
        "document written"
    );
    Ok(output)
}
