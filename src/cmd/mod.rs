//! Command-line argument handling.
//!
//! The external contract is deliberately tiny (`<program> <port>`), so this
//! reaches for `std::env::args()` directly rather than pulling in a full
//! argument-parsing crate for a single positional value.

use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
}

impl Args {
    pub fn parse() -> Result<Args> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "cacheproxy".to_string());
        let rest: Vec<String> = args.collect();

        if rest.len() != 1 {
            println!("Usage: {program} <port_number>");
            std::process::exit(1);
        }

        let port: u16 = match rest[0].parse() {
            Ok(p) => p,
            Err(_) => {
                println!("Usage: {program} <port_number>");
                std::process::exit(1);
            }
        };

        Ok(Args { port })
    }
}

