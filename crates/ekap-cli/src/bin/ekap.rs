fn main() -> anyhow::Result<()> {
    ekap_cli::run()
}
