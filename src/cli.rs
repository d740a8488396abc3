use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "gav")]
#[command(version)]
#[command(about = "Browse a GitHub Actions run's first artifact locally", long_about = None)]
#[command(after_help = "Example:\n  \
  gav https://github.com/acme/widgets/actions/runs/123456789\n\n\
On first run you will be asked to authorize gav in a browser; the token is\n\
stored under your local config directory and reused afterwards.")]
pub struct Cli {
    /// GitHub Actions run URL
    #[arg(value_name = "RUN_URL")]
    pub url: String,
}
