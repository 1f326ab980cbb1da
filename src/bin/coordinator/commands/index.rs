//! `coordinator index` command

use anyhow::Result;

use super::open_session;
use crate::cli::{GlobalOpts, IndexArgs};
use autoload_coordinator::PackageIndex;

pub fn execute(opts: &GlobalOpts, args: IndexArgs) -> Result<()> {
    let session = open_session(opts)?;
    let modules = session.coordinator.merge_order();
    let index = PackageIndex::build(&modules, session.coordinator.config());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&index)?);
        return Ok(());
    }

    if index.is_empty() {
        println!("No shared packages found");
        return Ok(());
    }

    for package in index.iter() {
        println!(
            "{} {} ({}) {}",
            package.name,
            package.version,
            package.owner,
            package.package_dir.display()
        );
    }
    Ok(())
}
