//! GoStream terminal dashboard.

fn main() -> anyhow::Result<()> {
    gostream_lib::run()
}
