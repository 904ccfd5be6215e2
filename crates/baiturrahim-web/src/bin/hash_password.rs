use std::io::{self, Write};

use baiturrahim_core::PasswordHasher;

/// Prints a bcrypt hash for a `[[users]]` entry in the server config.
///
/// Usage: `hash_password [cost]` with the password on stdin.
fn main() -> anyhow::Result<()> {
    let cost = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => baiturrahim_core::password::DEFAULT_COST,
    };

    eprint!("Enter password: ");
    io::stderr().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }

    let hash = PasswordHasher::new(cost).hash(password)?;
    println!("{hash}");
    Ok(())
}
