fn main() -> anyhow::Result<()> {
    graphql_upload::main()
}
