use ipodesk::{Site, SiteCommand, SiteConf, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd: SiteCommand = argh::from_env();
    let conf = SiteConf::from_env();
    init_tracing(&conf, cmd.verbose);

    let site = Site::builder(conf).build().await?;
    site.run(cmd).await?;
    Ok(())
}
