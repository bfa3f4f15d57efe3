//! Session identity commands. These only touch the session file; the
//! remote store is subscribed by the next command that runs.

use anyhow::Result;
use lessondir_core::{SessionFile, SessionIdentity};
use owo_colors::OwoColorize;

pub fn login(identity: &str) -> Result<()> {
    let identity = identity.trim();
    if identity.is_empty() {
        anyhow::bail!("Identity cannot be empty");
    }

    let file = SessionFile::open()?;
    file.save(&SessionIdentity::new(identity))?;
    println!("{}", format!("  Signed in as {identity}").green());
    Ok(())
}

pub fn logout() -> Result<()> {
    let file = SessionFile::open()?;
    match file.load()? {
        Some(identity) => {
            file.clear()?;
            println!("{}", format!("  Signed out of {identity}").yellow());
        }
        None => println!("{}", "Not signed in".dimmed()),
    }
    Ok(())
}

pub fn whoami() -> Result<()> {
    match SessionFile::open()?.load()? {
        Some(identity) => println!("{identity}"),
        None => println!("{}", "Not signed in (using the local store)".dimmed()),
    }
    Ok(())
}
