fn main() -> anyhow::Result<()> {
    snp_tally::cli::run()
}
