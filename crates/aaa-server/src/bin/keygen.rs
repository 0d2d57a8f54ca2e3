//! Key Store Generator
//!
//! Writes a new sealed signing key:
//!
//! ```text
//! AAA_KEYSTORE_PASSWORD=... aaa-keygen <path> <kid>
//! ```

use std::process::ExitCode;

use aaa_core::KeyPair;
use aaa_server::keys::SealedKeyFile;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let (path, kid) = match args.as_slice() {
        [_, path, kid] => (path, kid),
        _ => {
            eprintln!("usage: aaa-keygen <path> <kid>");
            return ExitCode::from(2);
        }
    };

    let passphrase = match std::env::var("AAA_KEYSTORE_PASSWORD") {
        Ok(p) if !p.is_empty() => p,
        _ => {
            eprintln!("AAA_KEYSTORE_PASSWORD must be set");
            return ExitCode::from(2);
        }
    };

    let key_pair = KeyPair::generate(kid.as_str());
    let result = SealedKeyFile::seal(&key_pair, &passphrase).and_then(|file| file.write_to(path));

    match result {
        Ok(()) => {
            println!("wrote signing key '{}' to {}", kid, path);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("aaa-keygen: {}", e);
            ExitCode::FAILURE
        }
    }
}
