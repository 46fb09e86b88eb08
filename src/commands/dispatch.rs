//! Route one request line.

use std::sync::Arc;

use clap::{Args, ValueEnum};

use modhub_core::error::AppError;
use modhub_router::{HttpMethod, RequestContext, Response, SessionUser};

use crate::output::{self, OutputFormat};
use crate::runtime::Runtime;

/// Who is making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    /// Nobody is signed in
    Anonymous,
    /// A signed-in user without administrative privilege
    Member,
    /// A signed-in administrator
    Admin,
}

impl Role {
    fn user(self) -> SessionUser {
        match self {
            Self::Anonymous => SessionUser::anonymous(),
            Self::Member => SessionUser::member(Vec::<String>::new()),
            Self::Admin => SessionUser::admin(),
        }
    }
}

/// Arguments for `dispatch`
#[derive(Debug, Args)]
pub struct DispatchArgs {
    /// Request method
    #[arg(short, long, default_value = "GET")]
    pub method: String,

    /// Requesting user
    #[arg(short, long, value_enum, default_value = "anonymous")]
    pub user: Role,

    /// Request URI, path plus optional query string
    pub uri: String,
}

/// Execute `dispatch`
pub async fn execute(
    args: &DispatchArgs,
    runtime: &Runtime,
    format: OutputFormat,
) -> Result<(), AppError> {
    let method: HttpMethod = args.method.parse()?;
    let request = RequestContext::parse(method, &args.uri, &runtime.config().routing);
    tracing::info!(
        method = %method,
        path = %request.path,
        process = request.is_process,
        backend = request.is_backend,
        "Dispatching request"
    );

    let router = runtime.router(request, Arc::new(args.user.user()));
    router.boot().await?;
    let response = router.run(None).await?;

    match format {
        OutputFormat::Json => output::print_item(&response, format),
        OutputFormat::Text => match &response {
            Response::Page { status, body } => println!("{status}\n\n{body}"),
            Response::Redirect { location } => println!("302 -> {location}"),
        },
    }
    output::print_notices(&runtime.context().notices.drain().await);
    Ok(())
}
