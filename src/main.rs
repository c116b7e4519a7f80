use anyhow::Result;
use xscaffold::cli::{App, Args};

#[tokio::main]
async fn main() -> Result<()> {
    // an interrupted prompt is not a failure
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(0);
        }
    });

    let args = Args::parse_args();
    let mut app = App::from_args(&args)?;

    app.run(args).await?;

    Ok(())
}
