//! Prints an argon2 PHC string for an `[[admins]]` seed entry.

use std::io::{self, Write};

use ride_web::auth::password::hash_password;

fn main() -> anyhow::Result<()> {
    eprint!("Enter password: ");
    io::stderr().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim();

    if password.is_empty() {
        eprintln!("Password cannot be empty");
        std::process::exit(1);
    }

    println!("{}", hash_password(password)?);
    Ok(())
}
