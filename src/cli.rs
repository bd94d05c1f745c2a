use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliArgs {
    /// Path to the post manifest JSON
    pub manifest: String,

    #[arg(short, long, default_value = "config/conf.json")]
    pub config: String,

    #[arg(short, long)]
    pub verbose: bool,
}
