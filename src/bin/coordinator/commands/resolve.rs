//! `coordinator resolve` command

use anyhow::{bail, Result};

use super::open_session;
use crate::cli::{GlobalOpts, ResolveArgs};

pub fn execute(opts: &GlobalOpts, args: ResolveArgs) -> Result<()> {
    let mut session = open_session(opts)?;
    session.coordinator.bootstrap();

    match session.host.find_file(&args.class) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => bail!("class `{}` does not resolve to any file", args.class),
    }
}
