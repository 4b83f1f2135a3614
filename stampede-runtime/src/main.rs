use stampede_runtime::{init_tracing, StampedeRuntime};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    StampedeRuntime::with_args().run().await.into()
}
