//! CLI tool to sign a webhook payload the way the CI reporter does.
//!
//! Usage:
//!   cargo run --bin sign-payload -- --secret "$WEBHOOK_SECRET" --file event.json
//!   cat event.json | cargo run --bin sign-payload
//!
//! Prints the `X-Hub-Signature-256` header value for the exact input bytes.

use std::env;
use std::io::Read;

use testhub_lib::auth::{WebhookSecret, sign};

fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    let mut secret: Option<String> = None;
    let mut file: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--secret" | "-s" => {
                i += 1;
                if i < args.len() {
                    secret = Some(args[i].clone());
                }
            }
            "--file" | "-f" => {
                i += 1;
                if i < args.len() {
                    file = Some(args[i].clone());
                }
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    // Fall back to the server's own setting
    let secret = match secret.or_else(|| env::var("WEBHOOK_SECRET").ok()) {
        Some(s) if !s.is_empty() => WebhookSecret::new(s),
        _ => {
            eprintln!("Error: --secret is required (or set WEBHOOK_SECRET)");
            print_usage();
            std::process::exit(1);
        }
    };

    let body = match read_body(file.as_deref()) {
        Ok(body) => body,
        Err(e) => {
            eprintln!("Failed to read payload: {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", sign(&secret, &body));
}

fn read_body(file: Option<&str>) -> std::io::Result<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path),
        None => {
            let mut body = Vec::new();
            std::io::stdin().read_to_end(&mut body)?;
            Ok(body)
        }
    }
}

fn print_usage() {
    eprintln!(
        r#"
Usage: sign-payload [OPTIONS]

Options:
  -s, --secret <SECRET>   Shared webhook secret (default: $WEBHOOK_SECRET)
  -f, --file <PATH>       Payload file (default: read stdin)
  -h, --help              Print help

The payload is signed byte-for-byte; do not reformat it after signing.
"#
    );
}
