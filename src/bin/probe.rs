use anyhow::Result;

fn main() -> Result<()> {
    lambda_probe::cli::run()
}
